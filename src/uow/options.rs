//! Unit-of-work configuration.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::uow::error::UnitOfWorkError;
use crate::uow::isolation::{AccessMode, DeferrableMode, IsolationLevel};

/// Options handed to the resource when the transaction actually begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TxOptions {
    /// Isolation level.
    pub iso_level: IsolationLevel,
    /// Read-write or read-only.
    pub access_mode: AccessMode,
    /// Deferrable mode.
    pub deferrable_mode: DeferrableMode,
}

impl TxOptions {
    /// Create options with resource defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the isolation level.
    pub fn iso_level(mut self, level: IsolationLevel) -> Self {
        self.iso_level = level;
        self
    }

    /// Set the access mode.
    pub fn access_mode(mut self, mode: AccessMode) -> Self {
        self.access_mode = mode;
        self
    }

    /// Set the deferrable mode.
    pub fn deferrable_mode(mut self, mode: DeferrableMode) -> Self {
        self.deferrable_mode = mode;
        self
    }
}

/// Callback receiving rollback failures during [`flush`](super::flush).
pub type RollbackErrorLogger = Arc<dyn Fn(&UnitOfWorkError) + Send + Sync>;

/// How [`flush`](super::flush) reports failures.
#[derive(Clone, Default)]
pub struct FlushOptions {
    /// Invoked with the (possibly wrapped) rollback error.
    pub rollback_error_logger: Option<RollbackErrorLogger>,
    /// Prefix for rollback errors. Mostly useful along with a logger.
    pub rollback_error_wrap: Option<String>,
    /// Prefix for commit errors.
    pub commit_error_wrap: Option<String>,
}

impl FlushOptions {
    /// No logger and no wrap messages: errors pass through unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report rollback failures to `log`.
    pub fn with_rollback_error_logger<F>(mut self, log: F) -> Self
    where
        F: Fn(&UnitOfWorkError) + Send + Sync + 'static,
    {
        self.rollback_error_logger = Some(Arc::new(log));
        self
    }

    /// Wrap rollback failures as `"message: <rollback error>"`.
    pub fn with_rollback_error_wrap(mut self, message: impl Into<String>) -> Self {
        self.rollback_error_wrap = Some(message.into());
        self
    }

    /// Wrap commit failures as `"message: <commit error>"`.
    pub fn with_commit_error_wrap(mut self, message: impl Into<String>) -> Self {
        self.commit_error_wrap = Some(message.into());
        self
    }
}

impl fmt::Debug for FlushOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlushOptions")
            .field("rollback_error_logger", &self.rollback_error_logger.is_some())
            .field("rollback_error_wrap", &self.rollback_error_wrap)
            .field("commit_error_wrap", &self.commit_error_wrap)
            .finish()
    }
}
