//! zoneflow DNS zone reconciliation
//!
//! This crate drives an eventually-consistent DNS zone through create,
//! update and delete. The backend changes state asynchronously
//! (PENDING → ACTIVE, ACTIVE/PENDING → DELETED) and never notifies, so every
//! mutating call is followed by polling until the zone settles, fails, or the
//! caller's deadline passes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              outer CRUD handler                  │
//! └─────────────────┬───────────────────────────────┘
//!                   │ create / read / update / delete / apply
//! ┌─────────────────▼───────────────────────────────┐
//! │                 zoneflow-cloud                   │
//! │  ┌──────────────┐  ┌──────────────────────────┐ │
//! │  │  Reconciler  │──▶  Poller (Clock, cancel)   │ │
//! │  └──────┬───────┘  └─────────┬────────────────┘ │
//! │         │           retry::classify              │
//! │  ┌──────▼────────────────────▼───────────────┐  │
//! │  │   trait ZoneClient     trait StateResolver │  │
//! │  └──────────────────────────────────────────┘  │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼─────────────────┐
//! │ zoneflow-cloud-designate │
//! └─────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use zoneflow_cloud::{Reconciler, ReconcileSettings, ZoneSpec};
//!
//! let settings = ReconcileSettings::from_env()?;
//! let reconciler = Reconciler::new(client);
//!
//! let spec = ZoneSpec::new("example.com.").with_email("admin@example.com").with_ttl(300);
//! let zone = reconciler
//!     .create(&spec, &settings.poll_for_create()?, settings.skip_status_check)
//!     .await?;
//! ```

pub mod error;
pub mod import;
pub mod plan;
pub mod poll;
pub mod provider;
pub mod reconcile;
pub mod retry;
pub mod settings;
pub mod state;
pub mod zone;

// Re-exports
pub use error::{
    ClientError, ClientErrorKind, ClientResult, ConfigError, MalformedImportId, PollError,
    PollResult,
};
pub use import::ImportId;
pub use plan::{ActionType, ZoneAction, plan};
pub use poll::{Clock, ManualClock, PollConfig, PollOutcome, Poller, TokioClock};
pub use provider::ZoneClient;
pub use reconcile::{Diagnostic, DiagnosticCause, Phase, ReadOutcome, Reconciler};
pub use retry::{RetryConfig, RetryDecision, classify};
pub use settings::ReconcileSettings;
pub use state::{DesignateStatus, LifecycleState, StateResolver};
pub use zone::{ZoneDescriptor, ZoneDiff, ZonePatch, ZoneSpec, ZoneType};
