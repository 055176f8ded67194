//! Agent Error Taxonomy
//!
//! Information Hiding:
//! - Failures are classified once, where the external call is first observed
//! - Callers branch on variants, never on error strings
//! - Internal diagnostics stay in logs; `user_message` is safe to show

use thiserror::Error;

/// Every failure a turn can surface to its caller.
///
/// Retrieval failures (`ToolFailure`) are converted into tool payloads inside
/// the loop and never reach the turn boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Rate limited by upstream endpoint: {0}")]
    RateLimited(String),

    #[error("Gave up after {attempts} rate-limited attempts")]
    ExhaustedRetries { attempts: u32 },

    #[error("Upstream rejected credentials: {0}")]
    AuthFailure(String),

    #[error("Upstream endpoint error: {0}")]
    Upstream(String),

    #[error("Tool failure: {0}")]
    ToolFailure(String),

    #[error("Turn exceeded the step budget of {limit}")]
    LoopLimitExceeded { limit: usize },

    #[error("Checkpoint persistence failed: {0}")]
    PersistenceFailure(String),
}

impl AgentError {
    /// Stable tag for logs and callers that map errors to responses
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::InvalidInput(_) => "invalid_input",
            AgentError::RateLimited(_) => "rate_limited",
            AgentError::ExhaustedRetries { .. } => "exhausted_retries",
            AgentError::AuthFailure(_) => "auth_failure",
            AgentError::Upstream(_) => "upstream",
            AgentError::ToolFailure(_) => "tool_failure",
            AgentError::LoopLimitExceeded { .. } => "loop_limit_exceeded",
            AgentError::PersistenceFailure(_) => "persistence_failure",
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AgentError::RateLimited(_))
    }

    /// Generic text for end users; never includes upstream detail
    pub fn user_message(&self) -> &'static str {
        match self {
            AgentError::InvalidInput(_) => "The request was invalid. Please send a non-empty message.",
            AgentError::RateLimited(_) | AgentError::ExhaustedRetries { .. } => {
                "The assistant is busy right now. Please try again shortly."
            }
            _ => "Something went wrong while answering. Please try again.",
        }
    }

    /// Classify a non-success HTTP status from the model or embedding endpoint
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = format!("status {}: {}", status, body);
        match status {
            429 => AgentError::RateLimited(detail),
            401 | 403 => AgentError::AuthFailure(detail),
            _ => AgentError::Upstream(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(AgentError::from_status(429, "slow down").is_rate_limited());
        assert_eq!(AgentError::from_status(401, "").kind(), "auth_failure");
        assert_eq!(AgentError::from_status(403, "").kind(), "auth_failure");
        assert_eq!(AgentError::from_status(500, "").kind(), "upstream");
    }

    #[test]
    fn test_user_message_hides_detail() {
        let err = AgentError::PersistenceFailure("disk /var/lib/secret full".to_string());
        assert!(!err.user_message().contains("secret"));

        let err = AgentError::LoopLimitExceeded { limit: 25 };
        assert_eq!(err.kind(), "loop_limit_exceeded");
        assert!(err.to_string().contains("25"));
    }
}
