//! Admin backend: the App Engine admin REST API.

pub mod client;
pub mod dto;
pub mod transport;

pub use client::AdminBackend;
pub use transport::{AdminTransport, HttpAdminTransport};
