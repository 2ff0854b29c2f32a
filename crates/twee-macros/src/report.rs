//! Where configuration errors go.

use std::sync::Mutex;

use crate::error::MacroConfigError;

/// Receives configuration errors so the host can show them to the user.
pub trait ErrorReporter: Send + Sync {
    /// Report one error.
    fn report(&self, error: &MacroConfigError);
}

/// Reports errors as `tracing` error records.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, error: &MacroConfigError) {
        tracing::error!(%error, "error reading SugarCube macro definition file");
    }
}

/// Keeps error messages until they are taken.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    messages: Mutex<Vec<String>>,
}

impl CollectingReporter {
    /// Create an empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every message reported so far.
    pub fn take(&self) -> Vec<String> {
        match self.messages.lock() {
            Ok(mut messages) => std::mem::take(&mut *messages),
            Err(_) => Vec::new(),
        }
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, error: &MacroConfigError) {
        tracing::debug!(%error, "collected macro configuration error");
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(error.to_string());
        }
    }
}
