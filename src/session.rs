use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ChatError;
use crate::events::{Message, ResponseMode, Role};
use crate::llm::{ChatBinding, CompletionService};
use crate::streaming::{Accumulator, ChunkSink, pump};

/// Ordered messages of one session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// `(role, text)` pairs in display order
    #[allow(dead_code)]
    pub fn pairs(&self) -> Vec<(Role, &str)> {
        self.messages.iter().map(|m| (m.role(), m.text())).collect()
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append an empty assistant entry and hand it out for streaming into
    fn begin_streaming(&mut self) -> &mut Message {
        self.messages.push(Message::assistant(String::new()));
        let last = self.messages.len() - 1;
        &mut self.messages[last]
    }

    /// Put a question and its reply in front of everything else
    fn prepend_exchange(&mut self, question: Message, reply: Message) {
        self.messages.insert(0, reply);
        self.messages.insert(0, question);
    }

    fn truncate(&mut self, len: usize) {
        self.messages.truncate(len);
    }

    fn clear(&mut self) {
        self.messages.clear();
    }
}

/// Reply texts already added to the transcript
#[derive(Debug, Clone, Default)]
pub struct SeenReplies {
    replies: HashSet<String>,
}

#[allow(dead_code)]
impl SeenReplies {
    pub fn contains(&self, reply: &str) -> bool {
        self.replies.contains(reply)
    }

    /// Returns false when the reply was already seen
    pub fn insert(&mut self, reply: &str) -> bool {
        self.replies.insert(reply.to_string())
    }

    pub fn len(&self) -> usize {
        self.replies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }

    fn clear(&mut self) {
        self.replies.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Active,
}

/// One user's conversation, held for the lifetime of the terminal session
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    transcript: Transcript,
    seen_replies: SeenReplies,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            transcript: Transcript::new(),
            seen_replies: SeenReplies::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    #[allow(dead_code)]
    pub fn seen_replies(&self) -> &SeenReplies {
        &self.seen_replies
    }

    pub fn state(&self) -> SessionState {
        if self.transcript.is_empty() {
            SessionState::Empty
        } else {
            SessionState::Active
        }
    }

    /// Drop every message and every remembered reply
    pub fn clear(&mut self) {
        self.transcript.clear();
        self.seen_replies.clear();
    }
}

/// What a successful submit did to the transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The exchange was recorded
    Appended,
    /// The reply repeated an earlier one and was dropped
    Duplicate,
}

/// Sink that grows the assistant entry currently being streamed
struct StreamingEntry<'a> {
    message: &'a mut Message,
}

impl ChunkSink for StreamingEntry<'_> {
    fn on_chunk(&mut self, chunk: &str) {
        self.message.push_chunk(chunk);
    }
}

/// Mediates between user questions and the completion service
pub struct SessionManager {
    service: Arc<dyn CompletionService>,
    mode: ResponseMode,
    chat: ChatBinding,
}

impl SessionManager {
    pub fn new(service: Arc<dyn CompletionService>, mode: ResponseMode) -> Self {
        Self {
            service,
            mode,
            chat: ChatBinding::new(),
        }
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    /// Running chat history held by the remote binding
    pub fn chat_history(&self) -> &[Message] {
        self.chat.history()
    }

    /// Send `question` and record the reply in `session`.
    ///
    /// Every fragment is also handed to `display` as it arrives (single-shot
    /// replies arrive as one fragment). On error the session is left exactly
    /// as it was.
    pub async fn submit(
        &mut self,
        session: &mut Session,
        question: &str,
        display: &mut dyn ChunkSink,
    ) -> Result<SubmitOutcome, ChatError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ChatError::EmptyInput);
        }

        tracing::info!(
            session = %session.id,
            mode = %self.mode,
            chars = question.len(),
            "submitting question"
        );

        let result = match self.mode {
            ResponseMode::SingleShot => self.submit_single_shot(session, question, display).await,
            ResponseMode::StreamingTransient => {
                self.submit_streaming_transient(session, question, display).await
            }
            ResponseMode::StreamingAccumulated => {
                self.submit_streaming_accumulated(session, question, display).await
            }
        };

        if let Err(err) = &result {
            tracing::warn!(session = %session.id, error = %err, "submit failed");
        }
        result
    }

    /// Reset the session and the remote chat history
    pub fn clear(&mut self, session: &mut Session) {
        let previous = session.state();
        session.clear();
        self.chat.reset();
        tracing::info!(session = %session.id, ?previous, "conversation cleared");
    }

    async fn submit_single_shot(
        &mut self,
        session: &mut Session,
        question: &str,
        display: &mut dyn ChunkSink,
    ) -> Result<SubmitOutcome, ChatError> {
        let checkpoint = session.transcript.len();
        session.transcript.push(Message::user(question));

        let reply = match self.service.generate(question).await {
            Ok(reply) if !reply.trim().is_empty() => reply,
            Ok(_) => {
                session.transcript.truncate(checkpoint);
                return Err(ChatError::remote("empty reply"));
            }
            Err(err) => {
                session.transcript.truncate(checkpoint);
                return Err(err);
            }
        };

        display.on_chunk(&reply);
        tracing::debug!(session = %session.id, chars = reply.len(), "reply received");
        session.transcript.push(Message::assistant(reply));
        Ok(SubmitOutcome::Appended)
    }

    async fn submit_streaming_transient(
        &mut self,
        session: &mut Session,
        question: &str,
        display: &mut dyn ChunkSink,
    ) -> Result<SubmitOutcome, ChatError> {
        let checkpoint = session.transcript.len();
        session.transcript.push(Message::user(question));

        let stream = match self.service.stream(self.chat.history(), question).await {
            Ok(stream) => stream,
            Err(err) => {
                session.transcript.truncate(checkpoint);
                return Err(err);
            }
        };

        let mut accumulated = Accumulator::new();
        let pumped = {
            let mut entry = StreamingEntry {
                message: session.transcript.begin_streaming(),
            };
            pump(stream, &mut [display, &mut entry, &mut accumulated]).await
        };

        let chunks = match pumped {
            Ok(chunks) if !accumulated.text().trim().is_empty() => chunks,
            Ok(_) => {
                session.transcript.truncate(checkpoint);
                return Err(ChatError::remote("empty reply"));
            }
            Err(err) => {
                session.transcript.truncate(checkpoint);
                return Err(err);
            }
        };

        tracing::debug!(session = %session.id, chunks, "stream complete");
        self.chat.record(question, accumulated.into_text());
        Ok(SubmitOutcome::Appended)
    }

    async fn submit_streaming_accumulated(
        &mut self,
        session: &mut Session,
        question: &str,
        display: &mut dyn ChunkSink,
    ) -> Result<SubmitOutcome, ChatError> {
        let stream = self.service.stream(&[], question).await?;

        let mut accumulated = Accumulator::new();
        let chunks = pump(stream, &mut [display, &mut accumulated]).await?;
        let reply = accumulated.into_text();
        if reply.trim().is_empty() {
            return Err(ChatError::remote("empty reply"));
        }

        if !session.seen_replies.insert(&reply) {
            tracing::debug!(session = %session.id, "duplicate reply dropped");
            return Ok(SubmitOutcome::Duplicate);
        }

        tracing::debug!(session = %session.id, chunks, "stream complete");
        session
            .transcript
            .prepend_exchange(Message::user(question), Message::assistant(reply));
        Ok(SubmitOutcome::Appended)
    }
}
