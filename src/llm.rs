use crate::config::Config;
use crate::error::ChatError;
use crate::events::{Message, Role};
use crate::streaming::{ChunkStream, SseDecoder};
use async_trait::async_trait;
use futures::{Stream, StreamExt, stream};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::Display;

/// Remote text-completion service
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// One prompt in, one complete reply out
    async fn generate(&self, prompt: &str) -> Result<String, ChatError>;

    /// Prompt plus prior turns in, reply fragments out
    async fn stream(&self, history: &[Message], prompt: &str) -> Result<ChunkStream, ChatError>;
}

/// Running chat history kept on the client side of the remote chat
#[derive(Debug, Clone, Default)]
pub struct ChatBinding {
    history: Vec<Message>,
}

impl ChatBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Record a completed exchange
    pub fn record(&mut self, question: &str, reply: String) {
        self.history.push(Message::user(question));
        self.history.push(Message::assistant(reply));
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<u16>,
    message: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

impl ApiError {
    fn describe(&self) -> String {
        let message = self.message.as_deref().unwrap_or("unknown error");
        match (&self.status, self.code) {
            (Some(status), _) => format!("{status}: {message}"),
            (None, Some(code)) => format!("{code}: {message}"),
            (None, None) => message.to_string(),
        }
    }
}

impl GenerateResponse {
    /// Text of the first candidate, or the reason there is none
    fn into_text(self) -> Result<Option<String>, ChatError> {
        if let Some(error) = self.error {
            return Err(ChatError::remote(error.describe()));
        }
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ChatError::remote(format!("prompt blocked: {reason}")));
        }

        let Some(candidate) = self.candidates.into_iter().next() else {
            return Ok(None);
        };
        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            if let Some(reason) = candidate.finish_reason.filter(|r| r != "STOP") {
                return Err(ChatError::remote(format!("reply withheld: {reason}")));
            }
            return Ok(None);
        }
        Ok(Some(text))
    }
}

/// Decode one SSE payload into a reply fragment, if it carries one
fn decode_payload(payload: &str) -> Option<Result<String, ChatError>> {
    if payload.trim() == "[DONE]" {
        return None;
    }
    match serde_json::from_str::<GenerateResponse>(payload) {
        Ok(response) => response.into_text().transpose(),
        Err(err) => Some(Err(err.into())),
    }
}

/// Turn a raw SSE byte stream into reply fragments.
///
/// The returned stream ends after the first error.
pub fn decode_sse<S, B, E>(bytes: S) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let pending: VecDeque<Result<String, ChatError>> = VecDeque::new();
    let state = (bytes.boxed(), SseDecoder::new(), pending, false);

    stream::unfold(
        state,
        |(mut bytes, mut decoder, mut pending, mut finished)| async move {
            loop {
                if let Some(item) = pending.pop_front() {
                    if item.is_err() {
                        pending.clear();
                        finished = true;
                    }
                    return Some((item, (bytes, decoder, pending, finished)));
                }
                if finished {
                    return None;
                }
                match bytes.next().await {
                    Some(Ok(chunk)) => {
                        let payloads = decoder.push(chunk.as_ref());
                        pending.extend(payloads.iter().filter_map(|p| decode_payload(p)));
                    }
                    Some(Err(err)) => {
                        let message = format!("stream interrupted: {err}");
                        pending.push_back(Err(ChatError::remote(message)));
                    }
                    None => {
                        finished = true;
                        let payloads = decoder.finish();
                        pending.extend(payloads.iter().filter_map(|p| decode_payload(p)));
                    }
                }
            }
        },
    )
    .boxed()
}

/// Gemini client for single-shot and streamed replies
#[derive(Clone)]
pub struct GeminiClient {
    config: Config,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: Config, api_key: String) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ChatError::configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    /// Build a client from configuration, failing fast when no key is set
    pub fn from_config(config: Config) -> Result<Self, ChatError> {
        let api_key = config.resolve_api_key()?;
        Self::new(config, api_key)
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
            method
        )
    }

    fn build_request<'a>(&self, history: &'a [Message], prompt: &'a str) -> GenerateRequest<'a> {
        let mut contents: Vec<Content<'a>> = history
            .iter()
            .map(|message| Content {
                role: message.role().wire_name(),
                parts: vec![Part {
                    text: message.text(),
                }],
            })
            .collect();
        contents.push(Content {
            role: Role::User.wire_name(),
            parts: vec![Part { text: prompt }],
        });

        let generation_config =
            if self.config.temperature.is_some() || self.config.max_output_tokens.is_some() {
                Some(GenerationConfig {
                    temperature: self.config.temperature,
                    max_output_tokens: self.config.max_output_tokens,
                })
            } else {
                None
            };

        GenerateRequest {
            contents,
            generation_config,
        }
    }

    async fn post(&self, url: &str, body: &GenerateRequest<'_>) -> Result<reqwest::Response, ChatError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorEnvelope>(&error_text)
                .map(|envelope| envelope.error.describe())
                .unwrap_or(error_text);
            tracing::warn!(%status, "Gemini API returned an error");
            return Err(ChatError::remote(format!("Gemini API error ({status}): {detail}")));
        }

        Ok(response)
    }
}

#[async_trait]
impl CompletionService for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        let url = self.endpoint("generateContent");
        let body = self.build_request(&[], prompt);
        tracing::debug!(model = %self.config.model, "sending generateContent request");

        let response = self.post(&url, &body).await?;
        let payload = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&payload)?;

        parsed
            .into_text()?
            .ok_or_else(|| ChatError::remote("empty response from Gemini"))
    }

    async fn stream(&self, history: &[Message], prompt: &str) -> Result<ChunkStream, ChatError> {
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let body = self.build_request(history, prompt);
        tracing::debug!(
            model = %self.config.model,
            context_turns = history.len(),
            "sending streamGenerateContent request"
        );

        let response = self.post(&url, &body).await?;
        Ok(decode_sse(response.bytes_stream()))
    }
}
