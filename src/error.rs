use thiserror::Error;

/// Errors surfaced by the conversation core.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The question was empty after trimming. Shown as a warning.
    #[error("please enter a question before submitting")]
    EmptyInput,

    /// Startup configuration is missing or unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The remote completion service failed or returned unusable data.
    #[error("remote service error: {0}")]
    RemoteService(String),
}

impl ChatError {
    pub fn remote(message: impl Into<String>) -> Self {
        Self::RemoteService(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether the user can fix this by changing their input.
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, Self::EmptyInput)
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        Self::RemoteService(err.to_string())
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::RemoteService(format!("malformed response: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_user_correctable() {
        assert!(ChatError::EmptyInput.is_user_correctable());
        assert!(!ChatError::remote("boom").is_user_correctable());
        assert!(!ChatError::configuration("no key").is_user_correctable());
    }

    #[test]
    fn json_errors_become_remote_errors() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = ChatError::from(err);
        assert!(matches!(err, ChatError::RemoteService(_)));
        assert!(err.to_string().contains("malformed response"));
    }
}
