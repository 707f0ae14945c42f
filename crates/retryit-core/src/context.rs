//! Cooperative cancellation context
//!
//! A [`Context`] carries a cancellation signal and an optional deadline. It is
//! handed to every operation invocation and raced against every inter-attempt
//! wait. Cancelling a context cancels every context derived from it.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a context fired
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelReason {
    /// `cancel()` was called on this context or one of its ancestors
    #[error("context canceled")]
    Cancelled,

    /// The context deadline passed
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation signal plus optional deadline
///
/// Clones share the same signal. Use [`Context::child`] to derive a context
/// that can be cancelled on its own without affecting the parent.
///
/// The first reason a context reports is latched: once [`Context::err`] or
/// [`Context::done`] has returned a reason, later calls return the same one.
#[derive(Debug, Clone, Default)]
pub struct Context {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    token: CancellationToken,
    deadline: Option<Instant>,
    cancelled_at: OnceLock<Instant>,
    reason: OnceLock<CancelReason>,
    parent: Option<Arc<Inner>>,
}

impl Inner {
    /// Earliest explicit cancellation on this context or an ancestor
    fn first_cancel(&self) -> Option<Instant> {
        let own = self.cancelled_at.get().copied();
        let inherited = self.parent.as_ref().and_then(|p| p.first_cancel());
        match (own, inherited) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn observe(&self) -> Option<CancelReason> {
        if let Some(reason) = self.reason.get() {
            return Some(*reason);
        }

        let cancelled = self.token.is_cancelled();
        let now = Instant::now();

        let reason = match self.deadline {
            Some(deadline) if now >= deadline => match self.first_cancel() {
                Some(at) if cancelled && at < deadline => CancelReason::Cancelled,
                _ => CancelReason::DeadlineExceeded,
            },
            _ if cancelled => CancelReason::Cancelled,
            _ => return None,
        };

        Some(*self.reason.get_or_init(|| reason))
    }
}

impl Context {
    /// Create a root context that fires only when cancelled explicitly
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a context that is cancelled with this one and may also be
    /// cancelled independently
    pub fn child(&self) -> Self {
        self.derive(self.inner.deadline)
    }

    /// Derive a child context that fires after `timeout`
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now()
            .checked_add(timeout)
            .unwrap_or_else(far_future);
        self.with_deadline(deadline)
    }

    /// Derive a child context that fires at `deadline`
    ///
    /// The child never outlives the parent: if the parent's deadline is
    /// earlier it is kept.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.inner.deadline {
            Some(parent) => parent.min(deadline),
            None => deadline,
        };
        self.derive(Some(deadline))
    }

    fn derive(&self, deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner {
                token: self.inner.token.child_token(),
                deadline,
                cancelled_at: OnceLock::new(),
                reason: OnceLock::new(),
                parent: Some(Arc::clone(&self.inner)),
            }),
        }
    }

    /// Fire this context and every context derived from it
    ///
    /// Has no effect on the reason of a context that already fired.
    pub fn cancel(&self) {
        self.inner.cancelled_at.get_or_init(Instant::now);
        self.inner.token.cancel();
    }

    /// The instant this context expires, if it has one
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// The reason this context fired, or `None` while it is still live
    pub fn err(&self) -> Option<CancelReason> {
        self.inner.observe()
    }

    /// Whether this context has fired
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Wait until this context fires and report why
    pub async fn done(&self) -> CancelReason {
        let fired = match self.inner.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.inner.token.cancelled() => CancelReason::Cancelled,
                    _ = tokio::time::sleep_until(deadline) => CancelReason::DeadlineExceeded,
                }
            }
            None => {
                self.inner.token.cancelled().await;
                CancelReason::Cancelled
            }
        };

        self.err().unwrap_or(fired)
    }

    /// The underlying cancellation token
    pub fn token(&self) -> &CancellationToken {
        &self.inner.token
    }
}

impl From<CancellationToken> for Context {
    fn from(token: CancellationToken) -> Self {
        Self {
            inner: Arc::new(Inner {
                token,
                ..Inner::default()
            }),
        }
    }
}

// Roughly 30 years out; used when a timeout overflows Instant.
fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86400 * 365 * 30)
}
