//! OpenStack Designate client for zoneflow
//!
//! Implements [`zoneflow_cloud::ZoneClient`] over the Designate v2 zones API
//! so the reconciler can manage real zones.
//!
//! # Requirements
//!
//! - `OS_DNS_ENDPOINT`: DNS service endpoint
//! - `OS_AUTH_TOKEN`: a valid Keystone token
//! - `OS_PROJECT_ID` (optional): manage zones of another project
//! - `OS_DNS_REQUEST_TIMEOUT` (optional): per-request timeout, e.g. `30s`
//!
//! # Example
//!
//! ```ignore
//! use zoneflow_cloud::{Reconciler, ReconcileSettings, ZoneSpec};
//! use zoneflow_cloud_designate::{DesignateConfig, DesignateZones};
//!
//! let zones = DesignateZones::new(DesignateConfig::from_env()?)?;
//! let settings = ReconcileSettings::from_env()?;
//! let reconciler = Reconciler::new(zones);
//!
//! let spec = ZoneSpec::new("example.org.").with_email("joe@example.org");
//! let zone = reconciler
//!     .create(&spec, &settings.poll_for_create()?, settings.skip_status_check)
//!     .await?;
//! ```

pub mod client;
pub mod error;

pub use client::{DesignateConfig, DesignateZones, create_body};
pub use error::{DesignateError, Result, kind_for_status};
