//! Execution identity of the calling process.
//!
//! Unset module/version arguments fall back to these values. They are read
//! from the environment once and then passed around by value.

use app_modules_sdk::DEFAULT_MODULE;

/// Module, version and instance the caller is running as.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionIdentity {
    module: Option<String>,
    version: Option<String>,
    instance: Option<String>,
}

impl ExecutionIdentity {
    #[must_use]
    pub fn new(module: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            module: Some(module.into()),
            version: Some(version.into()),
            instance: None,
        }
    }

    /// An identity with nothing known; every default falls back to the server.
    #[must_use]
    pub fn unknown() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Reads the identity from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the identity through `lookup`, which maps a variable name to its value.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let module = get("GAE_SERVICE").or_else(|| get("CURRENT_MODULE_ID"));
        let version = get("GAE_VERSION").or_else(|| {
            get("CURRENT_VERSION_ID").and_then(|full| {
                let major = full.split('.').next().unwrap_or_default();
                (!major.is_empty() && major != "None").then(|| major.to_owned())
            })
        });
        let instance = get("GAE_INSTANCE").or_else(|| get("INSTANCE_ID"));

        Self {
            module,
            version,
            instance,
        }
    }

    #[must_use]
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    #[must_use]
    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    /// Current module, or `default` when unknown.
    #[must_use]
    pub fn module_or_default(&self) -> &str {
        self.module().unwrap_or(DEFAULT_MODULE)
    }
}

/// Project id from the process environment.
#[must_use]
pub fn project_id_from_env() -> Option<String> {
    project_id_from_lookup(|key| std::env::var(key).ok())
}

/// Project id: `GAE_PROJECT`, then `GOOGLE_CLOUD_PROJECT`, then the part of
/// `GAE_APPLICATION` after its `partition~` prefix.
#[must_use]
pub fn project_id_from_lookup<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

    get("GAE_PROJECT")
        .or_else(|| get("GOOGLE_CLOUD_PROJECT"))
        .or_else(|| {
            get("GAE_APPLICATION").map(|app| match app.split_once('~') {
                Some((_, project)) => project.to_owned(),
                None => app,
            })
        })
}
