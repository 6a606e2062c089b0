//! Error types for Goaler.

use std::time::Duration;

/// Top-level error type for the coach.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Provider {provider} server error (status {status}): {reason}")]
    ServerError {
        provider: String,
        status: u16,
        reason: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Model {model} not available on provider {provider}")]
    ModelNotAvailable { provider: String, model: String },

    #[error("Too many tool rounds in one turn ({rounds})")]
    ToolLoopExhausted { rounds: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::ServerError { .. } | Self::RequestFailed { .. }
        )
    }
}

/// Tool call decoding errors.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
}

/// Goal agent errors.
///
/// State errors (`NoActiveConversation`, `DuplicateConversation`,
/// `UnknownConversation`, `InvalidTitle`) are recoverable: the dispatcher turns
/// them into structured tool results. Only `Database` is expected to abort a turn.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("No active conversation: {conversation_id}")]
    NoActiveConversation { conversation_id: String },

    #[error("Conversation already active: {conversation_id}")]
    DuplicateConversation { conversation_id: String },

    #[error("Conversation was never started or already ended: {conversation_id}")]
    UnknownConversation { conversation_id: String },

    #[error("Goal title must not be empty")]
    InvalidTitle,

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl AgentError {
    /// Stable machine-readable reason code for tool results.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::NoActiveConversation { .. } => "NO_ACTIVE_CONVERSATION",
            Self::DuplicateConversation { .. } => "DUPLICATE_CONVERSATION",
            Self::UnknownConversation { .. } => "UNKNOWN_CONVERSATION",
            Self::InvalidTitle => "INVALID_TITLE",
            Self::Database(_) => "STORAGE_FAILURE",
        }
    }

    /// Whether the dialogue can carry on after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Database(_))
    }
}

/// Report generation errors.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Unsupported period: {0}")]
    UnsupportedPeriod(String),

    #[error("Invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the coach.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_codes_are_stable() {
        let err = AgentError::NoActiveConversation {
            conversation_id: "c1".into(),
        };
        assert_eq!(err.reason_code(), "NO_ACTIVE_CONVERSATION");
        assert!(err.is_recoverable());

        let db = AgentError::Database(DatabaseError::Query("boom".into()));
        assert_eq!(db.reason_code(), "STORAGE_FAILURE");
        assert!(!db.is_recoverable());
    }

    #[test]
    fn transient_llm_errors() {
        assert!(
            LlmError::RateLimited {
                provider: "openai".into(),
                retry_after: None
            }
            .is_transient()
        );
        assert!(
            !LlmError::AuthFailed {
                provider: "openai".into()
            }
            .is_transient()
        );
    }
}
