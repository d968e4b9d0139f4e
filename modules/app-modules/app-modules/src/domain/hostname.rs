//! Hostname addressing.
//!
//! Hostnames are dot-joined from the most specific segment outward:
//! `instance.version.module.suffix`. Which segments appear depends on the
//! application's topology and on what the caller named explicitly.

use app_modules_sdk::{DEFAULT_MODULE, ModulesError, VersionDetails};
use async_trait::async_trait;

use crate::backend::{HostnameQuery, NotFound, TransportError, VersionSelector};

/// Topology reads the resolver needs. Each call is a single transport read.
#[async_trait]
pub trait TopologySource: Send + Sync {
    /// Application-wide hostname suffix, e.g. `my-app.appspot.com`.
    async fn default_hostname(&self) -> Result<String, TransportError>;

    async fn module_names(&self) -> Result<Vec<String>, TransportError>;

    async fn version_names(&self, module: &str) -> Result<Vec<String>, TransportError>;

    async fn version_details(
        &self,
        module: &str,
        version: &str,
    ) -> Result<VersionDetails, TransportError>;
}

/// Parses a raw instance argument into a non-negative index.
///
/// # Errors
///
/// `InvalidInstances` when `raw` is not a non-negative integer that fits `u32`.
pub fn parse_instance(raw: Option<&str>) -> Result<Option<u32>, ModulesError> {
    raw.map(|text| {
        text.trim().parse::<u32>().map_err(|_| {
            ModulesError::invalid_instances(format!(
                "instance must be a non-negative integer, got '{text}'"
            ))
        })
    })
    .transpose()
}

fn join(parts: &[&str]) -> String {
    parts.join(".")
}

fn read_failure(err: TransportError) -> ModulesError {
    err.classify(NotFound::Module)
}

fn require_version<'a>(query: &'a HostnameQuery) -> Result<&'a str, ModulesError> {
    query.version.name().ok_or_else(|| {
        ModulesError::invalid_version(format!(
            "no version given for module '{}' and the current version is unknown",
            query.module
        ))
    })
}

/// Resolves `query` into a hostname using reads from `source`.
///
/// Any `404` from a read means the module is unknown.
///
/// # Errors
///
/// - `InvalidModule` if the module is absent from the application
/// - `InvalidInstances` if an instance targets a version without manual
///   scaling or lies beyond its instance count
/// - `InvalidVersion` if a version segment is required but none is known
pub async fn resolve_hostname<S>(source: &S, query: &HostnameQuery) -> Result<String, ModulesError>
where
    S: TopologySource + ?Sized,
{
    let modules = source.module_names().await.map_err(read_failure)?;
    let suffix = source.default_hostname().await.map_err(read_failure)?;

    if !modules.iter().any(|m| *m == query.module) {
        return Err(ModulesError::invalid_module(format!(
            "module '{}' not found",
            query.module
        )));
    }

    if let [only] = modules.as_slice()
        && *only == DEFAULT_MODULE
    {
        let version = require_version(query)?;
        return Ok(match query.instance {
            Some(instance) => join(&[&instance.to_string(), version, &suffix]),
            None => join(&[version, &suffix]),
        });
    }

    if let Some(instance) = query.instance {
        let version = require_version(query)?;
        let details = source
            .version_details(&query.module, version)
            .await
            .map_err(read_failure)?;
        let Some(count) = details.scaling.manual_instances() else {
            return Err(ModulesError::invalid_instances(
                "instance-specific hostnames are only available for manually scaled services",
            ));
        };
        if instance >= count {
            return Err(ModulesError::invalid_instances(format!(
                "instance {instance} does not exist for {}/{version}",
                query.module
            )));
        }
        return Ok(join(&[&instance.to_string(), version, &query.module, &suffix]));
    }

    match &query.version {
        VersionSelector::Explicit(version) => Ok(join(&[version, &query.module, &suffix])),
        VersionSelector::Current(current) => {
            let versions = source
                .version_names(&query.module)
                .await
                .map_err(read_failure)?;
            match current {
                Some(version) if versions.contains(version) => {
                    Ok(join(&[version, &query.module, &suffix]))
                }
                _ => Ok(join(&[&query.module, &suffix])),
            }
        }
    }
}
