//! Reconciliation controller
//!
//! Each operation issues one mutating call and, unless status checks are
//! skipped, polls until the backend settles. Failures come back as a
//! [`Diagnostic`] that names the phase, the zone id when one is known, and
//! the cause.

use crate::error::{ClientError, ConfigError, PollError};
use crate::plan::ZoneAction;
use crate::poll::{Clock, PollConfig, Poller, TokioClock};
use crate::provider::ZoneClient;
use crate::settings::ReconcileSettings;
use crate::state::{DesignateStatus, LifecycleState, StateResolver};
use crate::zone::{ZoneDescriptor, ZonePatch, ZoneSpec};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Lifecycle phase an operation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Create,
    Read,
    Update,
    Delete,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Create => write!(f, "create"),
            Phase::Read => write!(f, "read"),
            Phase::Update => write!(f, "update"),
            Phase::Delete => write!(f, "delete"),
        }
    }
}

/// Underlying reason for a failed operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticCause {
    /// The initial create/update/delete call (or a plain read) failed
    #[error("{0}")]
    CallFailed(ClientError),

    /// The zone does not exist on the backend
    #[error("zone no longer exists")]
    Gone,

    /// Waiting for the backend to settle failed
    #[error("waiting for zone failed: {0}")]
    Poll(PollError),

    /// Polling parameters could not be built
    #[error("{0}")]
    Config(ConfigError),
}

/// Structured failure of a reconcile operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{phase} of zone{} failed: {cause}", id_suffix(.resource_id))]
pub struct Diagnostic {
    pub phase: Phase,

    /// Set as soon as the backend assigned an id
    pub resource_id: Option<String>,

    #[source]
    pub cause: DiagnosticCause,
}

fn id_suffix(id: &Option<String>) -> String {
    id.as_ref().map(|id| format!(" {}", id)).unwrap_or_default()
}

impl Diagnostic {
    pub fn new(phase: Phase, resource_id: Option<&str>, cause: DiagnosticCause) -> Self {
        Self {
            phase,
            resource_id: resource_id.map(str::to_string),
            cause,
        }
    }

    /// The deadline passed while the zone was still settling
    pub fn is_timeout(&self) -> bool {
        matches!(self.cause, DiagnosticCause::Poll(PollError::Timeout { .. }))
    }

    /// The zone was not found, so the local record is stale
    pub fn is_gone(&self) -> bool {
        self.cause == DiagnosticCause::Gone
    }

    pub fn is_cancelled(&self) -> bool {
        self.cause == DiagnosticCause::Poll(PollError::Cancelled)
    }

    /// The zone was created but never confirmed ACTIVE; it is not rolled back
    pub fn partially_created(&self) -> bool {
        self.phase == Phase::Create
            && self.resource_id.is_some()
            && matches!(self.cause, DiagnosticCause::Poll(_))
    }
}

/// Result of a plain read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Found(ZoneDescriptor),
    /// The zone no longer exists; drop the local record
    Gone,
}

impl ReadOutcome {
    pub fn into_zone(self) -> Option<ZoneDescriptor> {
        match self {
            ReadOutcome::Found(zone) => Some(zone),
            ReadOutcome::Gone => None,
        }
    }
}

const ACTIVE_TARGETS: &[LifecycleState] = &[LifecycleState::Active];
const ACTIVE_PENDING: &[LifecycleState] = &[LifecycleState::Pending];
const DELETED_TARGETS: &[LifecycleState] = &[LifecycleState::Deleted];
const DELETED_PENDING: &[LifecycleState] = &[LifecycleState::Active, LifecycleState::Pending];

/// Drives zones through create, update and delete
///
/// The reconciler holds no mutable state; one instance may serve many zones
/// concurrently. Calls against the same zone id must be serialised by the
/// caller.
pub struct Reconciler<C, K = TokioClock> {
    client: C,
    resolver: Box<dyn StateResolver>,
    clock: K,
    cancel: CancellationToken,
}

impl<C: ZoneClient> Reconciler<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            resolver: Box::new(DesignateStatus),
            clock: TokioClock,
            cancel: CancellationToken::new(),
        }
    }
}

impl<C: ZoneClient, K: Clock> Reconciler<C, K> {
    pub fn with_clock<K2: Clock>(self, clock: K2) -> Reconciler<C, K2> {
        Reconciler {
            client: self.client,
            resolver: self.resolver,
            clock,
            cancel: self.cancel,
        }
    }

    pub fn with_resolver(mut self, resolver: impl StateResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Abort polling at the next tick boundary once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Create a zone and wait for it to become ACTIVE
    ///
    /// The target and pending states of `poll` are replaced by
    /// ACTIVE / PENDING.
    pub async fn create(
        &self,
        spec: &ZoneSpec,
        poll: &PollConfig,
        skip_status_check: bool,
    ) -> Result<ZoneDescriptor, Diagnostic> {
        tracing::debug!("Creating zone {}", spec.name);
        let created = self.client.create(spec).await.map_err(|e| {
            Diagnostic::new(Phase::Create, None, DiagnosticCause::CallFailed(e))
        })?;
        let id = created.id;
        tracing::info!("Created zone {} ({})", spec.name, id);

        if skip_status_check {
            return self.refresh(Phase::Create, &id).await;
        }

        tracing::debug!("Waiting for zone {} to become available", id);
        self.settle(Phase::Create, &id, poll.with_states(ACTIVE_TARGETS, ACTIVE_PENDING))
            .await
    }

    /// Apply `patch` and wait for the zone to become ACTIVE again
    ///
    /// An empty patch never reaches the backend's update endpoint; the zone is
    /// only read.
    pub async fn update(
        &self,
        id: &str,
        patch: &ZonePatch,
        poll: &PollConfig,
        skip_status_check: bool,
    ) -> Result<ZoneDescriptor, Diagnostic> {
        if patch.is_empty() {
            tracing::debug!("No mutable field of zone {} changed, reading only", id);
            return self.refresh(Phase::Update, id).await;
        }

        tracing::debug!("Updating zone {}: {:?}", id, patch.changed_fields());
        self.client.update(id, patch).await.map_err(|e| {
            let cause = if e.is_not_found() {
                DiagnosticCause::Gone
            } else {
                DiagnosticCause::CallFailed(e)
            };
            Diagnostic::new(Phase::Update, Some(id), cause)
        })?;
        tracing::info!("Updated zone {}", id);

        if skip_status_check {
            return self.refresh(Phase::Update, id).await;
        }

        self.settle(Phase::Update, id, poll.with_states(ACTIVE_TARGETS, ACTIVE_PENDING))
            .await
    }

    /// Delete a zone and wait for it to disappear
    ///
    /// Deleting a zone that is already gone succeeds.
    pub async fn delete(
        &self,
        id: &str,
        poll: &PollConfig,
        skip_status_check: bool,
    ) -> Result<(), Diagnostic> {
        tracing::debug!("Deleting zone {}", id);
        match self.client.delete(id).await {
            Ok(()) => tracing::info!("Requested deletion of zone {}", id),
            Err(e) if e.is_not_found() => {
                tracing::debug!("Zone {} not found, nothing to delete", id);
                return Ok(());
            }
            Err(e) => {
                return Err(Diagnostic::new(
                    Phase::Delete,
                    Some(id),
                    DiagnosticCause::CallFailed(e),
                ));
            }
        }

        if skip_status_check {
            return Ok(());
        }

        let config = poll.with_states(DELETED_TARGETS, DELETED_PENDING);
        self.poller(Phase::Delete)
            .wait(id, &config)
            .await
            .map_err(|e| Diagnostic::new(Phase::Delete, Some(id), DiagnosticCause::Poll(e)))?;
        tracing::info!("Deleted zone {}", id);
        Ok(())
    }

    /// Read the zone once
    pub async fn read(&self, id: &str) -> Result<ReadOutcome, Diagnostic> {
        match self.client.read(id).await {
            Ok(zone) => {
                tracing::debug!("Retrieved zone {}: {:?}", id, zone);
                Ok(ReadOutcome::Found(zone))
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!("Zone {} not found", id);
                Ok(ReadOutcome::Gone)
            }
            Err(e) => Err(Diagnostic::new(
                Phase::Read,
                Some(id),
                DiagnosticCause::CallFailed(e),
            )),
        }
    }

    /// Execute a planned action with the phase settings from `settings`
    ///
    /// Returns the resulting zone, or `None` once a zone was deleted.
    pub async fn apply(
        &self,
        action: &ZoneAction,
        settings: &ReconcileSettings,
    ) -> Result<Option<ZoneDescriptor>, Diagnostic> {
        let skip = settings.skip_status_check;
        tracing::debug!("Applying {}", action.description());

        match action {
            ZoneAction::Create(spec) => {
                let poll = settings
                    .poll_for_create()
                    .map_err(|e| Diagnostic::new(Phase::Create, None, DiagnosticCause::Config(e)))?;
                self.create(spec, &poll, skip).await.map(Some)
            }
            ZoneAction::Update { id, patch } => {
                let poll = settings.poll_for_update().map_err(|e| {
                    Diagnostic::new(Phase::Update, Some(id.as_str()), DiagnosticCause::Config(e))
                })?;
                self.update(id, patch, &poll, skip).await.map(Some)
            }
            ZoneAction::Replace { id, spec, .. } => {
                let delete_poll = settings.poll_for_delete().map_err(|e| {
                    Diagnostic::new(Phase::Delete, Some(id.as_str()), DiagnosticCause::Config(e))
                })?;
                let create_poll = settings
                    .poll_for_create()
                    .map_err(|e| Diagnostic::new(Phase::Create, None, DiagnosticCause::Config(e)))?;
                self.delete(id, &delete_poll, skip).await?;
                self.create(spec, &create_poll, skip).await.map(Some)
            }
            ZoneAction::Delete { id } => {
                let poll = settings.poll_for_delete().map_err(|e| {
                    Diagnostic::new(Phase::Delete, Some(id.as_str()), DiagnosticCause::Config(e))
                })?;
                self.delete(id, &poll, skip).await.map(|()| None)
            }
            ZoneAction::NoOp { id } => match self.read(id).await? {
                ReadOutcome::Found(zone) => Ok(Some(zone)),
                ReadOutcome::Gone => Err(Diagnostic::new(
                    Phase::Read,
                    Some(id.as_str()),
                    DiagnosticCause::Gone,
                )),
            },
        }
    }

    fn poller(&self, phase: Phase) -> Poller<'_> {
        Poller::new(
            &self.client,
            self.resolver.as_ref(),
            &self.clock,
            &self.cancel,
            phase,
        )
    }

    /// Poll to ACTIVE and hand back the zone seen by the final read
    async fn settle(
        &self,
        phase: Phase,
        id: &str,
        config: PollConfig,
    ) -> Result<ZoneDescriptor, Diagnostic> {
        let outcome = self
            .poller(phase)
            .wait(id, &config)
            .await
            .map_err(|e| {
                let cause = match e {
                    PollError::UnexpectedState {
                        state: LifecycleState::Deleted,
                        ..
                    } => DiagnosticCause::Gone,
                    e => DiagnosticCause::Poll(e),
                };
                Diagnostic::new(phase, Some(id), cause)
            })?;

        tracing::debug!(
            "Zone {} became {} after {} reads ({:?})",
            id,
            outcome.state,
            outcome.reads,
            outcome.elapsed
        );

        match outcome.zone {
            Some(zone) => Ok(zone),
            None => self.refresh(phase, id).await,
        }
    }

    /// Single read where a missing zone is an error
    async fn refresh(&self, phase: Phase, id: &str) -> Result<ZoneDescriptor, Diagnostic> {
        match self.client.read(id).await {
            Ok(zone) => Ok(zone),
            Err(e) if e.is_not_found() => {
                Err(Diagnostic::new(phase, Some(id), DiagnosticCause::Gone))
            }
            Err(e) => Err(Diagnostic::new(
                phase,
                Some(id),
                DiagnosticCause::CallFailed(e),
            )),
        }
    }
}
