//! The module contains the errors the console engine can return.
//!
//! The errors split in two groups:
//!
//! - resolved locally, never reaching the server: [`ValidationFailed`] and
//!   [`PreconditionFailed`];
//! - surfaced to the operator as a message: [`InvalidReference`],
//!   [`NotFound`], [`Conflict`], [`Transport`] and [`Unknown`].
//!
//! None of them clears the page or the selection currently on screen.
//!
//!  [`ValidationFailed`]: EngineError::ValidationFailed
//!  [`PreconditionFailed`]: EngineError::PreconditionFailed
//!  [`InvalidReference`]: EngineError::InvalidReference
//!  [`NotFound`]: EngineError::NotFound
//!  [`Conflict`]: EngineError::Conflict
//!  [`Transport`]: EngineError::Transport
//!  [`Unknown`]: EngineError::Unknown
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
    #[error("Invalid reference: {0}")]
    InvalidReference(String),
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("{}", transport_message(.status, .body))]
    Transport { status: Option<u16>, body: String },
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl EngineError {
    pub(crate) fn transport(status: Option<u16>, body: impl Into<String>) -> Self {
        Self::Transport {
            status,
            body: body.into(),
        }
    }

    /// Whether the error was raised before any request left the client.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::ValidationFailed(_) | Self::PreconditionFailed(_))
    }
}

fn transport_message(status: &Option<u16>, body: &str) -> String {
    match status {
        Some(status) => format!("HTTP {status}: {body}"),
        None => format!("Server unreachable: {body}"),
    }
}
