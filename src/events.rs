use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Role of a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label used when rendering the transcript
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "Bot",
        }
    }

    /// Role name on the Gemini wire
    pub fn wire_name(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "model",
        }
    }
}

/// One exchange unit in a transcript.
///
/// The role is fixed at construction. Text is only mutated through
/// [`Message::push_chunk`], which the session manager uses for the entry it
/// is currently streaming into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn push_chunk(&mut self, chunk: &str) {
        self.text.push_str(chunk);
    }
}

/// How replies from the completion service are obtained and recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum ResponseMode {
    /// One blocking call, one complete reply
    SingleShot,
    /// Chunks shown as they arrive; context kept by the chat binding
    StreamingTransient,
    /// Chunks concatenated into one reply, deduplicated, newest first
    StreamingAccumulated,
}

/// Pages of the full-screen app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum Page {
    #[strum(to_string = "Chatbot")]
    Chatbot,
    #[strum(to_string = "Anonymous Help Requests")]
    HelpRequests,
    #[strum(to_string = "Feelings Questionnaire")]
    Feelings,
}

impl Page {
    pub fn all() -> Vec<Page> {
        Page::iter().collect()
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Page::Chatbot => "🤖",
            Page::HelpRequests => "📝",
            Page::Feelings => "🤔",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn response_mode_parses_kebab_case() {
        assert_eq!(
            ResponseMode::from_str("streaming-accumulated").unwrap(),
            ResponseMode::StreamingAccumulated
        );
        assert_eq!(ResponseMode::SingleShot.to_string(), "single-shot");
    }

    #[test]
    fn pages_keep_sidebar_order() {
        assert_eq!(
            Page::all(),
            vec![Page::Chatbot, Page::HelpRequests, Page::Feelings]
        );
        assert_eq!(Page::Feelings.to_string(), "Feelings Questionnaire");
    }

    #[test]
    fn assistant_maps_to_model_on_the_wire() {
        assert_eq!(Role::Assistant.wire_name(), "model");
        assert_eq!(Role::User.wire_name(), "user");
    }
}
