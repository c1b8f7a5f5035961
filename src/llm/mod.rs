//! Outbound text generation — the application's one external call.
//!
//! `TextClient` is the seam: production code uses `GeminiClient`,
//! tests use `MockTextClient`.

pub mod gemini;

pub use gemini::GeminiClient;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Cannot reach the generation API at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Generation API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Malformed generation response: {0}")]
    ResponseParsing(String),

    #[error("Generation response contained no text")]
    EmptyResponse,

    #[error("No API key configured (set GEMINI_API_KEY)")]
    MissingApiKey,
}

/// One side of a replayed conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

/// The unit replayed to the model on every call: the full accumulated
/// list of turns is sent each time (the API itself is stateless).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }
}

/// Generate text from an accumulated turn list.
pub trait TextClient {
    fn generate(&self, turns: &[ChatTurn]) -> Result<String, LlmError>;
}

/// Mock client for testing — canned reply or forced failure.
pub struct MockTextClient {
    reply: String,
    fail: bool,
}

impl MockTextClient {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail: false,
        }
    }

    /// A client whose every call fails (quota-style error).
    pub fn failing() -> Self {
        Self {
            reply: String::new(),
            fail: true,
        }
    }
}

impl TextClient for MockTextClient {
    fn generate(&self, _turns: &[ChatTurn]) -> Result<String, LlmError> {
        if self.fail {
            return Err(LlmError::Api {
                status: 429,
                body: "quota exceeded".into(),
            });
        }
        Ok(self.reply.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_configured_reply() {
        let client = MockTextClient::new("canned answer");
        let reply = client.generate(&[ChatTurn::user("hi")]).unwrap();
        assert_eq!(reply, "canned answer");
    }

    #[test]
    fn failing_mock_reports_quota_error() {
        let client = MockTextClient::failing();
        let err = client.generate(&[]).unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 429, .. }));
    }

    #[test]
    fn turn_role_serializes_lowercase() {
        let turn = ChatTurn::user("hello");
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("\"user\""));

        let turn = ChatTurn::model("hi");
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("\"model\""));
    }
}
