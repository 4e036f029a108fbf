use std::fmt;

use thiserror::Error;

/// Category of a failure that is expected to clear up if the request is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    RateLimit,
    Timeout,
    Connection,
    Upstream,
}

impl fmt::Display for TransientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransientKind::RateLimit => "Rate limit",
            TransientKind::Timeout => "Timeout",
            TransientKind::Connection => "Connection",
            TransientKind::Upstream => "Upstream service",
        };
        f.write_str(name)
    }
}

/// Errors raised while talking to the text-generation service
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("{kind} error: {message}")]
    Transient { kind: TransientKind, message: String },

    #[error("HTTP Error: {status_code} - {message}")]
    Http { status_code: u16, message: String },

    #[error("Fatal transport error: {0}")]
    Fatal(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<TransportError>,
    },
}

impl TransportError {
    pub fn transient(kind: TransientKind, message: impl Into<String>) -> Self {
        TransportError::Transient {
            kind,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        TransportError::Fatal(message.into())
    }

    /// Only transient failures are eligible for backoff and retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Transient { .. })
    }

    pub fn transient_kind(&self) -> Option<TransientKind> {
        match self {
            TransportError::Transient { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Why a model answer was not accepted as an action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("response is not valid JSON: {0}")]
    Parse(String),

    #[error("response has no string `chosen_action` field")]
    MissingChosenAction,

    #[error("`{0}` is not one of the available actions")]
    UnknownAction(String),
}

/// Errors from the game-engine boundary
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to launch engine: {0}")]
    Launch(String),

    #[error("Engine protocol error: {0}")]
    Protocol(String),

    #[error("Engine reported an error: {0}")]
    Remote(String),

    #[error("Engine process closed its output")]
    Closed,

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Model `{0}` not found in the model registry")]
    UnknownModel(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level error for running an episode
#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
}

pub type TransportResult<T> = Result<T, TransportError>;
pub type EngineResult<T> = Result<T, EngineError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type AgentResult<T> = Result<T, AgentError>;
