//! Legacy backend: the modules RPC service over gRPC.
//!
//! Failures carry an application error code in status metadata. Every RPC
//! declares which codes it expects; unexpected codes surface as generic
//! errors with the code preserved.

pub mod channel;
pub mod client;
pub mod codes;
pub mod proto;

pub use channel::{GrpcChannel, RpcChannel};
pub use client::LegacyBackend;
pub use codes::{ApplicationErrorCode, CallPolicy};
