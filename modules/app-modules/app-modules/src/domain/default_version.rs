//! Default version selection over a traffic split.

use std::cmp::Ordering;
use std::ops::ControlFlow;

use app_modules_sdk::{ModulesError, TrafficSplit};

const FULL_ALLOCATION: f64 = 1.0;

/// Picks the version receiving a module's traffic.
///
/// A version holding the whole allocation wins outright. Otherwise the
/// largest allocation wins and ties go to the lexicographically smallest
/// name. Returns `None` for an empty split.
#[must_use]
pub fn select_default_version(split: &TrafficSplit) -> Option<&str> {
    let flow = split
        .iter()
        .try_fold(None::<(f64, &str)>, |leader, (version, allocation)| {
            if allocation.total_cmp(&FULL_ALLOCATION) == Ordering::Equal {
                return ControlFlow::Break(version);
            }
            let next = match leader {
                None => (allocation, version),
                Some((best, name)) => match allocation.total_cmp(&best) {
                    Ordering::Greater => (allocation, version),
                    Ordering::Equal if version < name => (allocation, version),
                    Ordering::Equal | Ordering::Less => (best, name),
                },
            };
            ControlFlow::Continue(Some(next))
        });

    match flow {
        ControlFlow::Break(version) => Some(version),
        ControlFlow::Continue(leader) => leader.map(|(_, version)| version),
    }
}

/// Like [`select_default_version`], failing `InvalidVersion` for an empty split.
///
/// # Errors
///
/// `InvalidVersion` when `split` has no usable allocation.
pub fn resolve_default_version(module: &str, split: &TrafficSplit) -> Result<String, ModulesError> {
    select_default_version(split).map(str::to_owned).ok_or_else(|| {
        ModulesError::invalid_version(format!("module '{module}' has no version receiving traffic"))
    })
}
