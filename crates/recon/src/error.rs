use std::fmt;

use crate::model::Stage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconError {
    /// Malformed upload or unreadable sheet. Session stays in Upload.
    ParseFailure(String),
    /// Product search failed. Transient; registry state is untouched.
    SearchFailure(String),
    /// The whole execution batch call failed. Session stays in Preview.
    ExecutionTransport(String),
    /// Operation not allowed in the session's current stage.
    WrongStage { stage: Stage, action: &'static str },
    /// Preview requested with no regular updates and no manual matches.
    NothingToApply,
    /// Manual match targets an entry that is not an unresolved row.
    UnknownEntry(String),
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Job config validation error.
    ConfigValidation(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParseFailure(msg) => write!(f, "cannot parse upload: {msg}"),
            Self::SearchFailure(msg) => write!(f, "product search failed: {msg}"),
            Self::ExecutionTransport(msg) => write!(f, "update batch was not applied: {msg}"),
            Self::WrongStage { stage, action } => {
                write!(f, "cannot {action} while session is in {stage} stage")
            }
            Self::NothingToApply => write!(f, "no stock updates or manual matches to apply"),
            Self::UnknownEntry(id) => write!(f, "entry '{id}' is not an unresolved row"),
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

impl ReconError {
    /// Transport, search and parse failures can be retried by the user.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ParseFailure(_) | Self::SearchFailure(_) | Self::ExecutionTransport(_)
        )
    }
}
