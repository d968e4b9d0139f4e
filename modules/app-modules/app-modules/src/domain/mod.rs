pub mod default_version;
pub mod hostname;
pub mod local_client;
pub mod pending;
pub mod service;

pub use default_version::{resolve_default_version, select_default_version};
pub use hostname::{TopologySource, parse_instance, resolve_hostname};
pub use local_client::ModulesLocalClient;
pub use pending::PendingCall;
pub use service::ModulesService;
