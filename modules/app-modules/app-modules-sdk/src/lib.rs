#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! App Modules SDK
//!
//! Public surface of the `app-modules` client:
//!
//! - [`ModulesClient`] - async trait consumers program against
//! - [`TrafficSplit`], [`VersionDetails`], [`HostnameRequest`] - topology models
//! - [`ModulesError`] - the closed error taxonomy every backend reports through
//!
//! ## Usage
//!
//! ```ignore
//! use app_modules_sdk::{HostnameRequest, ModulesClient};
//!
//! let modules = client.list_modules().await?;
//! let default = client.get_default_version(Some("backend")).await?;
//! let host = client
//!     .get_hostname(&HostnameRequest::new().module("backend").instance(2))
//!     .await?;
//! ```

pub mod api;
pub mod error;
pub mod models;

pub use api::ModulesClient;
pub use error::{BackendCode, ErrorKind, ModulesError};
pub use models::{
    DEFAULT_MODULE, HostnameRequest, Scaling, ServingStatus, TrafficSplit, VersionDetails,
};
