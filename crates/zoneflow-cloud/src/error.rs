//! Error types for zone reconciliation

use crate::state::LifecycleState;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Classified failure reported by a [`ZoneClient`](crate::provider::ZoneClient)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ClientError {
    pub kind: ClientErrorKind,
    pub message: String,
}

impl ClientError {
    pub fn new(kind: ClientErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Conflict, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::RateLimited, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Unauthorized, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ClientErrorKind::NotFound
    }
}

/// Kind of a client failure, roughly one per backend status class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    /// 400
    BadRequest,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 409
    Conflict,
    /// 429
    RateLimited,
    /// Any other non-success status
    Api(u16),
    /// The request never produced a response
    Transport,
    /// A response arrived but could not be decoded
    InvalidResponse,
}

impl fmt::Display for ClientErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientErrorKind::BadRequest => write!(f, "bad request"),
            ClientErrorKind::Unauthorized => write!(f, "unauthorized"),
            ClientErrorKind::Forbidden => write!(f, "forbidden"),
            ClientErrorKind::NotFound => write!(f, "not found"),
            ClientErrorKind::Conflict => write!(f, "conflict"),
            ClientErrorKind::RateLimited => write!(f, "rate limited"),
            ClientErrorKind::Api(status) => write!(f, "api error (status {})", status),
            ClientErrorKind::Transport => write!(f, "transport error"),
            ClientErrorKind::InvalidResponse => write!(f, "invalid response"),
        }
    }
}

/// Invalid polling or reconcile configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("timeout ({timeout:?}) is shorter than the initial delay ({delay:?})")]
    TimeoutShorterThanDelay { timeout: Duration, delay: Duration },

    #[error("minimum poll interval must be greater than zero")]
    ZeroMinInterval,

    #[error("at least one target state is required")]
    NoTargetStates,

    #[error("state {0} is both a target and a pending state")]
    OverlappingStates(LifecycleState),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Why the polling state machine stopped without reaching a target state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("timed out after {elapsed:?} (last observed state: {})", display_state(.last_state))]
    Timeout {
        last_state: Option<LifecycleState>,
        elapsed: Duration,
    },

    #[error("refresh failed: {0}")]
    Fatal(ClientError),

    #[error("backend reported state {0}")]
    BackendError(LifecycleState),

    #[error("unexpected state {state}, wanted one of [{}]", display_states(.expected))]
    UnexpectedState {
        state: LifecycleState,
        expected: Vec<LifecycleState>,
    },

    #[error("cancelled")]
    Cancelled,
}

fn display_state(state: &Option<LifecycleState>) -> String {
    state
        .map(|s| s.to_string())
        .unwrap_or_else(|| "none".to_string())
}

fn display_states(states: &[LifecycleState]) -> String {
    states
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Import identifier that is neither `<id>` nor `<id>:<project_id>`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unexpected format of ID ({0}), expected zone <id> or <id>:<project_id>")]
pub struct MalformedImportId(pub String);

pub type ClientResult<T> = std::result::Result<T, ClientError>;
pub type PollResult<T> = std::result::Result<T, PollError>;
