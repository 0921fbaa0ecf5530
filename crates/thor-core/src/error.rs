//! Error types for the simulation controller

use crate::dispatch::DispatchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Result type for controller operations
pub type Result<T> = std::result::Result<T, ThorError>;

/// Controller error types
#[derive(Debug, Error)]
pub enum ThorError {
    /// Action could not be resolved against the signature registry
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The engine refused to dispatch the action
    #[error("{message}")]
    EngineRejected { code: ErrorCode, message: String },

    /// Action was well-formed but reported failure (raise_for_failure)
    #[error("Action {action} failed: {message}")]
    ActionFailed { action: String, message: String },

    /// Broken pipe, reset connection, or undecodable frame stream
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response did not follow the wire contract
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// step/reset before the controller was started
    #[error("Controller has not been started")]
    NotStarted,

    /// step/reset after stop
    #[error("Controller is closed")]
    ControllerClosed,

    /// Invalid controller configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Engine process could not be spawned or supervised
    #[error("Engine process error: {0}")]
    Process(String),
}

impl ThorError {
    /// Dispatch error code, if this error carries one
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            ThorError::Dispatch(err) => Some(err.error_code()),
            ThorError::EngineRejected { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ThorError {
    fn from(err: serde_json::Error) -> Self {
        ThorError::Serialization(err.to_string())
    }
}

/// Dispatch error codes shared with the engine's `errorCode` metadata field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    InvalidAction,
    MissingArguments,
    AmbiguousAction,
    InvalidArgument,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidAction => "InvalidAction",
            ErrorCode::MissingArguments => "MissingArguments",
            ErrorCode::AmbiguousAction => "AmbiguousAction",
            ErrorCode::InvalidArgument => "InvalidArgument",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "InvalidAction" => Ok(ErrorCode::InvalidAction),
            "MissingArguments" => Ok(ErrorCode::MissingArguments),
            "AmbiguousAction" => Ok(ErrorCode::AmbiguousAction),
            "InvalidArgument" => Ok(ErrorCode::InvalidArgument),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_roundtrip() {
        for code in [
            ErrorCode::InvalidAction,
            ErrorCode::MissingArguments,
            ErrorCode::AmbiguousAction,
            ErrorCode::InvalidArgument,
        ] {
            assert_eq!(code.as_str().parse::<ErrorCode>(), Ok(code));
        }
        assert!("NotACode".parse::<ErrorCode>().is_err());
    }

    #[test]
    fn test_engine_rejected_exposes_code() {
        let err = ThorError::EngineRejected {
            code: ErrorCode::MissingArguments,
            message: "action: Foo is missing the following arguments: bar".into(),
        };
        assert_eq!(err.error_code(), Some(ErrorCode::MissingArguments));
        assert_eq!(
            err.to_string(),
            "action: Foo is missing the following arguments: bar"
        );
        assert_eq!(ThorError::ControllerClosed.error_code(), None);
    }
}
