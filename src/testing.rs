//! Scripted completion service for unit tests.

use crate::error::ChatError;
use crate::events::Message;
use crate::llm::CompletionService;
use crate::streaming::ChunkStream;
use async_trait::async_trait;
use futures::{StreamExt, stream};
use std::collections::VecDeque;
use std::sync::Mutex;

/// One canned answer
pub enum Script {
    Reply(String),
    Chunks(Vec<String>),
    FailAfter(Vec<String>, String),
    Fail(String),
}

impl Script {
    pub fn reply(text: &str) -> Self {
        Script::Reply(text.to_string())
    }

    pub fn chunks(chunks: &[&str]) -> Self {
        Script::Chunks(chunks.iter().map(|c| c.to_string()).collect())
    }

    pub fn fail_after(chunks: &[&str], message: &str) -> Self {
        Script::FailAfter(
            chunks.iter().map(|c| c.to_string()).collect(),
            message.to_string(),
        )
    }

    pub fn fail(message: &str) -> Self {
        Script::Fail(message.to_string())
    }
}

/// Replays scripts in order and records what it was asked
pub struct ScriptedService {
    scripts: Mutex<VecDeque<Script>>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl ScriptedService {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn context_lengths(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(|(_, n)| *n).collect()
    }

    fn next(&self, prompt: &str, context: usize) -> Script {
        self.calls.lock().unwrap().push((prompt.to_string(), context));
        self.scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Script::fail("script exhausted"))
    }
}

#[async_trait]
impl CompletionService for ScriptedService {
    async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        match self.next(prompt, 0) {
            Script::Reply(text) => Ok(text),
            Script::Chunks(chunks) => Ok(chunks.concat()),
            Script::FailAfter(_, message) | Script::Fail(message) => Err(ChatError::remote(message)),
        }
    }

    async fn stream(&self, history: &[Message], prompt: &str) -> Result<ChunkStream, ChatError> {
        let items: Vec<Result<String, ChatError>> = match self.next(prompt, history.len()) {
            Script::Reply(text) => vec![Ok(text)],
            Script::Chunks(chunks) => chunks.into_iter().map(Ok).collect(),
            Script::FailAfter(chunks, message) => chunks
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(ChatError::remote(message))))
                .collect(),
            Script::Fail(message) => return Err(ChatError::remote(message)),
        };
        Ok(stream::iter(items).boxed())
    }
}
