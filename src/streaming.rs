use crate::error::ChatError;
use futures::StreamExt;
use futures::stream::BoxStream;

/// Lazy, finite, non-restartable sequence of reply fragments
pub type ChunkStream = BoxStream<'static, Result<String, ChatError>>;

/// Consumer of reply fragments as they arrive
pub trait ChunkSink: Send {
    fn on_chunk(&mut self, chunk: &str);
}

/// Sink that discards everything
#[derive(Debug, Default)]
pub struct NullSink;

impl ChunkSink for NullSink {
    fn on_chunk(&mut self, _chunk: &str) {}
}

/// Sink that concatenates fragments in arrival order
#[derive(Debug, Default)]
pub struct Accumulator {
    text: String,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

impl ChunkSink for Accumulator {
    fn on_chunk(&mut self, chunk: &str) {
        self.text.push_str(chunk);
    }
}

impl<F> ChunkSink for F
where
    F: FnMut(&str) + Send,
{
    fn on_chunk(&mut self, chunk: &str) {
        self(chunk)
    }
}

/// Drain `stream` into every sink, in order, one fragment at a time.
///
/// Stops at the first error. Returns the number of fragments delivered.
pub async fn pump(
    mut stream: ChunkStream,
    sinks: &mut [&mut dyn ChunkSink],
) -> Result<usize, ChatError> {
    let mut delivered = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if chunk.is_empty() {
            continue;
        }
        for sink in sinks.iter_mut() {
            sink.on_chunk(&chunk);
        }
        delivered += 1;
    }
    Ok(delivered)
}

/// Incremental Server-Sent Events decoder.
///
/// Bytes are buffered until a full line is available, so multi-byte UTF-8
/// sequences split across network reads decode correctly. `data:` lines are
/// joined with `\n` and dispatched on a blank line.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns the payloads of every event completed by them
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(newline_pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }

        events
    }

    /// Flush whatever is left once the byte stream has ended
    pub fn finish(&mut self) -> Vec<String> {
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest);
            if let Some(event) = self.process_line(line.trim_end_matches('\r')) {
                events.push(event);
            }
        }
        if let Some(event) = self.dispatch() {
            events.push(event);
        }
        events
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            self.data.push(value.to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let payload = self.data.join("\n");
        self.data.clear();
        Some(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(items: Vec<Result<&'static str, ChatError>>) -> ChunkStream {
        stream::iter(items.into_iter().map(|item| item.map(str::to_string))).boxed()
    }

    #[tokio::test]
    async fn pump_preserves_arrival_order() {
        let mut acc = Accumulator::new();
        let delivered = pump(chunks(vec![Ok("Hel"), Ok("lo")]), &mut [&mut acc])
            .await
            .unwrap();
        assert_eq!(delivered, 2);
        assert_eq!(acc.text(), "Hello");
    }

    #[tokio::test]
    async fn pump_feeds_every_sink() {
        let mut shown = Vec::new();
        let mut display = |chunk: &str| shown.push(chunk.to_string());
        let mut acc = Accumulator::new();
        pump(
            chunks(vec![Ok("a"), Ok(""), Ok("b")]),
            &mut [&mut display, &mut acc],
        )
        .await
        .unwrap();
        assert_eq!(acc.text(), "ab");
        assert_eq!(shown, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn pump_stops_at_first_error() {
        let mut acc = Accumulator::new();
        let err = pump(
            chunks(vec![Ok("partial"), Err(ChatError::remote("reset")), Ok("never")]),
            &mut [&mut acc],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ChatError::RemoteService(_)));
        assert_eq!(acc.text(), "partial");
    }

    #[test]
    fn decoder_dispatches_on_blank_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"a\":1}\r\n").is_empty());
        assert_eq!(decoder.push(b"\r\n"), vec!["{\"a\":1}".to_string()]);
    }

    #[test]
    fn decoder_handles_lines_split_across_reads() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"da").is_empty());
        assert!(decoder.push(b"ta: one\n").is_empty());
        let events = decoder.push(b"\ndata: two\n\n");
        assert_eq!(events, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn decoder_keeps_utf8_split_across_reads() {
        let bytes = "data: café\n\n".as_bytes();
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(&bytes[..split]).is_empty());
        assert_eq!(decoder.push(&bytes[split..]), vec!["café".to_string()]);
    }

    #[test]
    fn decoder_joins_multi_line_data_and_skips_comments() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b": keep-alive\ndata: a\ndata: b\nevent: x\n\n");
        assert_eq!(events, vec!["a\nb".to_string()]);
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), vec!["tail".to_string()]);
        assert!(decoder.finish().is_empty());
    }
}
