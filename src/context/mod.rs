//! Execution context.
//!
//! A [`Context`] carries the cancellation, deadline and value scope of one
//! logical call. Contexts are immutable: every `with_*` method derives a child
//! that points back at its parent, and lookups walk from the child towards the
//! root.
//!
//! ```text
//!   background ──▶ with_timeout(5s) ──▶ with_value(RequestId) ──▶ with_cancel()
//!      (root)          deadline              value                 flag
//! ```
//!
//! Every operation in this crate that talks to a transactional resource
//! passes the caller's context through unchanged.

mod error;

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use error::{ContextError, ContextResult};

/// An immutable, chainable execution context.
///
/// Cloning is cheap (one `Arc` increment).
#[derive(Clone)]
pub struct Context {
    node: Arc<Node>,
}

struct Node {
    parent: Option<Context>,
    kind: NodeKind,
}

enum NodeKind {
    Root,
    Cancel(Arc<AtomicBool>),
    Deadline(Instant),
    Value(Box<dyn Any + Send + Sync>),
}

/// Cancels the context returned alongside it by [`Context::with_cancel`].
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Cancel the associated context and everything derived from it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether `cancel` has been called.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl Context {
    /// The root context: never cancelled, no deadline, no values.
    pub fn background() -> Self {
        Self {
            node: Arc::new(Node {
                parent: None,
                kind: NodeKind::Root,
            }),
        }
    }

    fn derive(&self, kind: NodeKind) -> Self {
        Self {
            node: Arc::new(Node {
                parent: Some(self.clone()),
                kind,
            }),
        }
    }

    /// Derive a child that can be cancelled through the returned handle.
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let flag = Arc::new(AtomicBool::new(false));
        let child = self.derive(NodeKind::Cancel(Arc::clone(&flag)));
        (child, CancelHandle { flag })
    }

    /// Derive a child with a deadline.
    ///
    /// The effective deadline is the earliest one on the chain, so a child can
    /// shorten but never extend its parent's deadline.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        self.derive(NodeKind::Deadline(deadline))
    }

    /// Derive a child whose deadline is `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a child carrying `value`.
    ///
    /// A value of the same type attached further down the chain shadows this
    /// one for lookups made through the deeper context.
    pub fn with_value<T: Any + Send + Sync>(&self, value: T) -> Self {
        self.derive(NodeKind::Value(Box::new(value)))
    }

    /// Look up the nearest value of type `T`.
    pub fn value<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.ancestors().find_map(|node| match &node.kind {
            NodeKind::Value(value) => value.downcast_ref::<T>(),
            _ => None,
        })
    }

    /// The effective deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.ancestors()
            .filter_map(|node| match node.kind {
                NodeKind::Deadline(at) => Some(at),
                _ => None,
            })
            .min()
    }

    /// Whether this context or any ancestor has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.ancestors().any(|node| match &node.kind {
            NodeKind::Cancel(flag) => flag.load(Ordering::Acquire),
            _ => false,
        })
    }

    /// Why the context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<ContextError> {
        if self.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline() {
            Some(at) if Instant::now() >= at => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Whether the context is cancelled or past its deadline.
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// `Err` once the context is done.
    pub fn check(&self) -> ContextResult<()> {
        match self.err() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn ancestors(&self) -> impl Iterator<Item = &Node> {
        std::iter::successors(Some(&*self.node), |node| {
            node.parent.as_ref().map(|parent| &*parent.node)
        })
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("depth", &self.ancestors().count())
            .field("deadline", &self.deadline())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
