#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! App Modules
//!
//! Client for the App Engine modules control plane. Two interchangeable
//! backends sit behind [`ModulesService`]:
//!
//! - the legacy binary RPC service ([`backend::legacy`])
//! - the admin REST API ([`backend::admin`]), selected by `use_admin_api`
//!   or the `MODULES_USE_ADMIN_API` environment variable
//!
//! [`ModulesLocalClient`] implements [`app_modules_sdk::ModulesClient`] on
//! top of the service and adds `submit_*` variants returning a
//! [`PendingCall`].

pub mod backend;
pub mod config;
pub mod domain;
pub mod identity;
pub mod wiring;

pub use backend::BackendMode;
pub use config::{ConfigError, ModulesConfig};
pub use domain::{ModulesLocalClient, ModulesService, PendingCall};
pub use identity::ExecutionIdentity;
pub use wiring::{build_backend, build_client, build_service};
