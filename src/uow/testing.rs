//! Recording fakes shared by the unit-of-work tests.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::context::Context;
use crate::uow::options::TxOptions;
use crate::uow::resource::{Executor, Resource, TxHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Begin,
    Query(String),
    Commit,
    Rollback,
}

#[derive(Debug, Error)]
pub enum FakeError {
    #[error("{0}")]
    Message(String),

    #[error("tx is closed")]
    TxClosed,
}

/// Ordered log of every call the fakes receive.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    calls: Arc<Mutex<Vec<Call>>>,
    options: Arc<Mutex<Vec<TxOptions>>>,
}

impl Journal {
    pub fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn begin_count(&self) -> usize {
        self.calls().iter().filter(|c| **c == Call::Begin).count()
    }

    pub fn begin_options(&self) -> Vec<TxOptions> {
        self.options.lock().clone()
    }

    pub fn begin(&self, fail: bool) -> Result<RecordingTx, FakeError> {
        self.record(Call::Begin);
        if fail {
            return Err(FakeError::Message("failed to begin".into()));
        }
        Ok(RecordingTx {
            journal: self.clone(),
            commit_error: None,
            rollback_error: None,
        })
    }
}

/// Default executor and transaction source.
#[derive(Debug, Clone, Default)]
pub struct RecordingResource {
    pub journal: Journal,
    pub fail_begin: bool,
    pub commit_error: Option<String>,
    pub rollback_error: Option<String>,
    pub rollback_closed: bool,
}

impl RecordingResource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Resource for RecordingResource {
    type Tx = RecordingTx;

    fn begin_tx(&self, _ctx: &Context, options: &TxOptions) -> Result<RecordingTx, FakeError> {
        self.journal.options.lock().push(*options);
        let mut tx = self.journal.begin(self.fail_begin)?;
        tx.commit_error = self.commit_error.clone();
        tx.rollback_error = if self.rollback_closed {
            Some(RollbackFailure::Closed)
        } else {
            self.rollback_error.clone().map(RollbackFailure::Message)
        };
        Ok(tx)
    }
}

impl Executor for RecordingResource {
    type Statement = str;
    type Output = ();
    type Error = FakeError;

    fn execute(&self, _ctx: &Context, statement: &str) -> Result<(), FakeError> {
        self.journal.record(Call::Query(statement.to_string()));
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum RollbackFailure {
    Message(String),
    Closed,
}

#[derive(Debug)]
pub struct RecordingTx {
    journal: Journal,
    commit_error: Option<String>,
    rollback_error: Option<RollbackFailure>,
}

impl TxHandle for RecordingTx {
    type Error = FakeError;

    fn commit(&self, _ctx: &Context) -> Result<(), FakeError> {
        self.journal.record(Call::Commit);
        match &self.commit_error {
            Some(msg) => Err(FakeError::Message(msg.clone())),
            None => Ok(()),
        }
    }

    fn rollback(&self, _ctx: &Context) -> Result<(), FakeError> {
        self.journal.record(Call::Rollback);
        match &self.rollback_error {
            Some(RollbackFailure::Message(msg)) => Err(FakeError::Message(msg.clone())),
            Some(RollbackFailure::Closed) => Err(FakeError::TxClosed),
            None => Ok(()),
        }
    }

    fn is_closed(err: &FakeError) -> bool {
        matches!(err, FakeError::TxClosed)
    }
}

impl Executor for RecordingTx {
    type Statement = str;
    type Output = ();
    type Error = FakeError;

    fn execute(&self, _ctx: &Context, statement: &str) -> Result<(), FakeError> {
        self.journal.record(Call::Query(statement.to_string()));
        Ok(())
    }
}
