//! Handles for operations submitted in the background.

use std::future::Future;

use app_modules_sdk::ModulesError;
use tokio::task::{JoinError, JoinHandle};

enum State<T> {
    Running(JoinHandle<Result<T, ModulesError>>),
    Finished(Result<T, ModulesError>),
}

/// An operation running on its own task.
///
/// The outcome, success or error, is held until [`PendingCall::result`]
/// takes it. Dropping the handle detaches the task; it still runs to
/// completion but nobody observes the outcome.
#[must_use = "dropping a PendingCall detaches the operation"]
pub struct PendingCall<T> {
    operation: &'static str,
    state: State<T>,
}

impl<T: Send + 'static> PendingCall<T> {
    /// Spawns `call` on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn<F>(operation: &'static str, call: F) -> Self
    where
        F: Future<Output = Result<T, ModulesError>> + Send + 'static,
    {
        tracing::trace!(operation, "submitting modules operation");
        Self {
            operation,
            state: State::Running(tokio::spawn(call)),
        }
    }
}

impl<T> PendingCall<T> {
    #[must_use]
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// True once the operation has completed, observed or not.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        match &self.state {
            State::Running(handle) => handle.is_finished(),
            State::Finished(_) => true,
        }
    }

    /// Waits for completion without consuming the outcome.
    pub async fn wait(&mut self) {
        if let State::Running(handle) = &mut self.state {
            let outcome = settle(self.operation, handle.await);
            self.state = State::Finished(outcome);
        }
    }

    /// Waits for completion and returns the outcome.
    ///
    /// # Errors
    ///
    /// The operation's own error, or `Generic` if its task panicked.
    pub async fn result(self) -> Result<T, ModulesError> {
        match self.state {
            State::Running(handle) => settle(self.operation, handle.await),
            State::Finished(outcome) => outcome,
        }
    }
}

fn settle<T>(
    operation: &'static str,
    joined: Result<Result<T, ModulesError>, JoinError>,
) -> Result<T, ModulesError> {
    joined.unwrap_or_else(|err| {
        let reason = if err.is_panic() { "panicked" } else { "was cancelled" };
        tracing::error!(operation, "background modules operation {reason}");
        Err(ModulesError::generic(format!("{operation} {reason}")))
    })
}
