//! Unified error types for `GuildBuddy`.
//!
//! Handler-level errors are translated into corrective replies through
//! [`Error::user_message`]; loop-level errors are logged at the tick boundary.

use crate::core::{calculator::CalcError, tictactoe::MoveError};
use std::time::Duration;
use thiserror::Error;

/// Failures reported by a [`crate::core::store::SettingsStore`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// An insert hit an existing `(namespace, key)`.
    #[error("record {namespace}/{key} already exists")]
    DuplicateKey {
        /// Feature namespace of the record
        namespace: String,
        /// Record key inside the namespace
        key: String,
    },

    /// An update targeted a record that does not exist.
    #[error("record {namespace}/{key} not found")]
    NotFound {
        /// Feature namespace of the record
        namespace: String,
        /// Record key inside the namespace
        key: String,
    },

    /// The backend could not be reached or the statement failed.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Backend error text
        message: String,
    },

    /// A stored value could not be decoded.
    #[error("record {namespace}/{key} is corrupt: {message}")]
    Corrupt {
        /// Feature namespace of the record
        namespace: String,
        /// Record key inside the namespace
        key: String,
        /// Decoder error text
        message: String,
    },
}

/// Failures from outbound calls to the chat gateway.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The bot lacks the platform permission for the call.
    #[error("missing permissions")]
    Forbidden,

    /// The targeted message, role, channel, member or emoji is gone.
    #[error("target not found")]
    NotFound,

    /// The platform rate limit was hit.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// How long to wait before retrying
        retry_after: Duration,
    },

    /// Anything else the gateway client reported.
    #[error("gateway error: {0}")]
    Other(String),
}

/// Main error type for the bot.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Raw database error from `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Settings store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Outbound gateway call failed
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// A role, channel, message or emoji lookup missed
    #[error("Not found: {what}")]
    NotFound {
        /// Human-readable description of the missing thing
        what: String,
    },

    /// A hierarchy or ownership rule rejected the request
    #[error("Permission denied: {reason}")]
    PermissionDenied {
        /// Why the request was rejected
        reason: String,
    },

    /// User input failed validation
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// What was wrong with the input
        message: String,
    },

    /// An operation was attempted in the wrong lifecycle state
    #[error("Invalid state: {message}")]
    InvalidState {
        /// What was attempted
        message: String,
    },

    /// Expression evaluation failed
    #[error("Calculator error: {0}")]
    Calculator(#[from] CalcError),

    /// Illegal tic-tac-toe move
    #[error("Game error: {0}")]
    Game(#[from] MoveError),

    /// JSON encoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// String formatting failure
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// Serenity/Poise framework error
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

impl Error {
    /// Corrective message shown to the user who invoked the failing command.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { what } => format!("❌ {what} doesn't exist."),
            Self::PermissionDenied { reason } => format!("⛔ {reason}"),
            Self::InvalidInput { message } => format!("❌ {message}"),
            Self::Calculator(e) => format!("❌ {e}"),
            Self::Game(e) => format!("❌ {e}"),
            Self::Gateway(GatewayError::Forbidden) => {
                "⛔ I'm missing permissions to do that.".to_string()
            }
            Self::Gateway(GatewayError::NotFound) => {
                "❌ That message, role or emoji no longer exists.".to_string()
            }
            Self::Gateway(GatewayError::RateLimited { retry_after }) => format!(
                "⏳ I'm being rate limited, try again in {:.1}s.",
                retry_after.as_secs_f64()
            ),
            _ => "❌ Something went wrong. Please try again later.".to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_is_specific() {
        let err = Error::NotFound {
            what: "Role 42".to_string(),
        };
        assert_eq!(err.user_message(), "❌ Role 42 doesn't exist.");

        let err = Error::Gateway(GatewayError::Forbidden);
        assert!(err.user_message().contains("missing permissions"));

        let err = Error::Gateway(GatewayError::RateLimited {
            retry_after: Duration::from_millis(2500),
        });
        assert!(err.user_message().contains("2.5s"));
    }

    #[test]
    fn test_user_message_hides_internal_errors() {
        let err = Error::Store(StoreError::Unavailable {
            message: "disk I/O error".to_string(),
        });
        assert!(!err.user_message().contains("disk"));
    }
}
