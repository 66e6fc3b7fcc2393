//! Explicit execution scope passed through every data-layer call.
//!
//! A [`Context`] carries cancellation, an optional deadline, and the
//! transactions bound to the logical flow it represents. Clones share all
//! three; [`Context::child`] starts a new flow with its own bindings.

use crate::error::DataError;
use dashmap::DashMap;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub(crate) type Binding = Arc<dyn Any + Send + Sync>;

#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    bindings: DashMap<u64, Binding>,
}

impl Context {
    pub fn new() -> Self {
        Self::from_parts(CancellationToken::new(), None)
    }

    fn from_parts(cancel: CancellationToken, deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                cancel,
                deadline,
                bindings: DashMap::new(),
            }),
        }
    }

    /// A context cancelled together with `token`.
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self::from_parts(token, None)
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::from_parts(CancellationToken::new(), Some(Instant::now() + timeout))
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self::from_parts(CancellationToken::new(), Some(deadline))
    }

    /// A new scope with no bound transactions.
    ///
    /// Cancelling the parent cancels the child; the child keeps the parent's
    /// deadline unless `timeout` is shorter.
    pub fn child(&self, timeout: Option<Duration>) -> Self {
        let deadline = match (self.inner.deadline, timeout) {
            (Some(parent), Some(t)) => Some(parent.min(Instant::now() + t)),
            (Some(parent), None) => Some(parent),
            (None, Some(t)) => Some(Instant::now() + t),
            (None, None) => None,
        };
        Self::from_parts(self.inner.cancel.child_token(), deadline)
    }

    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Drive `fut` unless the context is cancelled or its deadline passes
    /// first, in which case `fut` is dropped.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, DataError>
    where
        F: Future<Output = Result<T, DataError>>,
    {
        if self.is_cancelled() {
            return Err(DataError::Cancelled);
        }
        let deadline = self.inner.deadline;
        let work = async move {
            match deadline {
                Some(at) => match tokio::time::timeout_at(at, fut).await {
                    Ok(res) => res,
                    Err(_) => Err(DataError::DeadlineExceeded),
                },
                None => fut.await,
            }
        };
        tokio::select! {
            biased;
            _ = self.inner.cancel.cancelled() => Err(DataError::Cancelled),
            res = work => res,
        }
    }

    pub(crate) fn binding(&self, key: u64) -> Option<Binding> {
        self.inner.bindings.get(&key).map(|b| b.value().clone())
    }

    /// Bind `value` unless something is already bound; returns the binding
    /// that ends up in place.
    pub(crate) fn bind_if_absent(&self, key: u64, value: Binding) -> Binding {
        self.inner
            .bindings
            .entry(key)
            .or_insert(value)
            .value()
            .clone()
    }

    pub(crate) fn take_binding(&self, key: u64) -> Option<Binding> {
        self.inner.bindings.remove(&key).map(|(_, b)| b)
    }

    /// Remove the binding for `key` only if it is `value`.
    pub(crate) fn unbind(&self, key: u64, value: &Binding) {
        self.inner
            .bindings
            .remove_if(&key, |_, bound| Arc::ptr_eq(bound, value));
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.is_cancelled())
            .field("deadline", &self.inner.deadline)
            .field("bindings", &self.inner.bindings.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_passes_through() {
        let ctx = Context::new();
        let out = ctx.run(async { Ok::<_, DataError>(42) }).await.unwrap();
        assert_eq!(out, 42);
    }

    #[tokio::test]
    async fn test_cancelled_context_fails_fast() {
        let ctx = Context::new();
        ctx.cancel();
        let err = ctx
            .run(async { Ok::<_, DataError>(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_work() {
        let ctx = Context::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });
        let err = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, DataError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Cancelled));
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let ctx = Context::with_timeout(Duration::from_millis(10));
        let err = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, DataError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::DeadlineExceeded));
    }

    #[test]
    fn test_child_has_fresh_bindings_and_inherits_cancel() {
        let parent = Context::new();
        parent.bind_if_absent(1, Arc::new(5u8));
        let child = parent.child(None);
        assert!(child.binding(1).is_none());
        assert!(parent.binding(1).is_some());
        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn test_unbind_only_matching() {
        let ctx = Context::new();
        let first: Binding = Arc::new(1u8);
        let other: Binding = Arc::new(2u8);
        ctx.bind_if_absent(7, first.clone());
        ctx.unbind(7, &other);
        assert!(ctx.binding(7).is_some());
        ctx.unbind(7, &first);
        assert!(ctx.binding(7).is_none());
    }
}
