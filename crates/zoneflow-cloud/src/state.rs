//! Lifecycle states of a remote zone
//!
//! The backend reports a raw status tag on every read. A [`StateResolver`]
//! turns that tag into a [`LifecycleState`], which is never stored; it is
//! derived again on each poll.

use serde::{Deserialize, Serialize};

/// Lifecycle state reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    /// A change is still being propagated
    Pending,
    /// The zone is serving
    Active,
    /// The zone is gone
    Deleted,
    /// The backend gave up on the zone
    Error,
}

impl LifecycleState {
    /// Whether no further automatic transition is expected from this state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LifecycleState::Pending)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Pending => write!(f, "PENDING"),
            LifecycleState::Active => write!(f, "ACTIVE"),
            LifecycleState::Deleted => write!(f, "DELETED"),
            LifecycleState::Error => write!(f, "ERROR"),
        }
    }
}

/// Maps the client's raw status tag to a [`LifecycleState`]
pub trait StateResolver: Send + Sync {
    fn resolve(&self, status: &str) -> LifecycleState;
}

/// Resolver for Designate-style status tags
///
/// Tags are matched case-insensitively. Anything unrecognised resolves to
/// [`LifecycleState::Error`] so that polling stops instead of spinning on a
/// state it cannot classify.
#[derive(Debug, Clone, Copy, Default)]
pub struct DesignateStatus;

impl StateResolver for DesignateStatus {
    fn resolve(&self, status: &str) -> LifecycleState {
        match status.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => LifecycleState::Active,
            "PENDING" => LifecycleState::Pending,
            "DELETED" => LifecycleState::Deleted,
            _ => LifecycleState::Error,
        }
    }
}

impl<F> StateResolver for F
where
    F: Fn(&str) -> LifecycleState + Send + Sync,
{
    fn resolve(&self, status: &str) -> LifecycleState {
        self(status)
    }
}
