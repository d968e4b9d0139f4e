//! Application error codes of the modules RPC service and per-call policies.

use app_modules_sdk::ModulesError;

use crate::backend::{NotFound, TransportError};

/// Application error codes carried on failed legacy RPCs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ApplicationErrorCode {
    InvalidModule = 1,
    InvalidVersion = 2,
    InvalidInstances = 3,
    TransientError = 4,
    UnexpectedState = 5,
}

impl ApplicationErrorCode {
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::InvalidModule),
            2 => Some(Self::InvalidVersion),
            3 => Some(Self::InvalidInstances),
            4 => Some(Self::TransientError),
            5 => Some(Self::UnexpectedState),
            _ => None,
        }
    }

    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    fn into_error(self, detail: String) -> ModulesError {
        match self {
            Self::InvalidModule => ModulesError::invalid_module(detail),
            Self::InvalidVersion => ModulesError::invalid_version(detail),
            Self::InvalidInstances => ModulesError::invalid_instances(detail),
            Self::TransientError => ModulesError::transient(detail),
            Self::UnexpectedState => ModulesError::unexpected_state(detail),
        }
    }
}

/// How one RPC treats application errors.
///
/// Expected and ignored codes map to their taxonomy variant; any other code
/// is generic. An ignored code only changes how it is logged, the facade
/// decides whether it is an error.
#[derive(Debug, Clone, Copy)]
pub struct CallPolicy {
    expected: &'static [ApplicationErrorCode],
    ignored: &'static [ApplicationErrorCode],
}

impl CallPolicy {
    #[must_use]
    pub const fn expecting(expected: &'static [ApplicationErrorCode]) -> Self {
        Self {
            expected,
            ignored: &[],
        }
    }

    #[must_use]
    pub const fn ignoring(mut self, ignored: &'static [ApplicationErrorCode]) -> Self {
        self.ignored = ignored;
        self
    }

    #[must_use]
    pub fn classify(&self, err: TransportError) -> ModulesError {
        let TransportError::Application { code, detail } = err else {
            return err.classify(NotFound::Module);
        };
        match ApplicationErrorCode::from_code(code) {
            Some(known) if self.ignored.contains(&known) => {
                tracing::debug!(code, "ignorable application error");
                known.into_error(detail)
            }
            Some(known) if self.expected.contains(&known) => known.into_error(detail),
            _ => TransportError::Application { code, detail }.classify(NotFound::Module),
        }
    }
}
