//! Transaction scoping keyed by execution context.
//!
//! A [`Transactor`] binds at most one transaction per [`Context`]. Asking for
//! the context's transaction while one is active joins it instead of
//! nesting; otherwise a new transaction is begun and bound.
//!
//! # Lifecycle
//!
//! ```text
//! NoTransaction -> Active -> { Committed, RolledBack }
//! ```
//!
//! - A handle that began the transaction is *owned*: committing it commits
//!   the transaction and releases the binding.
//! - A handle that joined an existing binding is *borrowed*: committing it
//!   is a no-op (the owner commits), rolling it back rolls back the shared
//!   transaction and leaves the binding in `RolledBack` for the owner to see.
//! - Dropping an owned handle without finalizing releases the binding; the
//!   driver transaction is discarded with it.
//!
//! # Example
//!
//! ```ignore
//! let scope = txer.begin(&ctx, vec![]).await?;
//! users.insert_one(&ctx, &alice, false).await?;   // joins `scope`
//! audit.insert_one(&ctx, &entry, false).await?;   // joins `scope`
//! scope.commit().await?;
//! ```

use crate::coerce::{coerce, Opaque};
use crate::context::{Binding, Context};
use crate::error::DataError;
use crate::query::Statement;
use crate::store::{Store, StoreTx};
use crate::value::Row;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

static NEXT_TRANSACTOR_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Active,
    Committed,
    RolledBack,
}

impl std::fmt::Display for TxState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxState::Active => f.write_str("active"),
            TxState::Committed => f.write_str("committed"),
            TxState::RolledBack => f.write_str("rolled back"),
        }
    }
}

/// A driver transaction shared by every handle bound to the same context.
pub struct Transaction<S: Store> {
    slot: Mutex<Slot<S::Tx>>,
}

// `tx` is `Some` exactly while `state` is `Active`.
struct Slot<T> {
    state: TxState,
    tx: Option<T>,
}

impl<S: Store> Transaction<S> {
    fn new(tx: S::Tx) -> Self {
        Self {
            slot: Mutex::new(Slot {
                state: TxState::Active,
                tx: Some(tx),
            }),
        }
    }

    pub async fn state(&self) -> TxState {
        self.slot.lock().await.state
    }

    async fn query(&self, ctx: &Context, statement: &Statement) -> Result<Vec<Row>, DataError> {
        let mut slot = self.slot.lock().await;
        let state = slot.state;
        let Some(tx) = slot.tx.as_mut() else {
            return Err(DataError::Finished(state));
        };
        ctx.run(async { tx.query(statement).await.map_err(DataError::Query) })
            .await
    }

    async fn execute(&self, ctx: &Context, statement: &Statement) -> Result<u64, DataError> {
        let mut slot = self.slot.lock().await;
        let state = slot.state;
        let Some(tx) = slot.tx.as_mut() else {
            return Err(DataError::Finished(state));
        };
        ctx.run(async { tx.execute(statement).await.map_err(DataError::Query) })
            .await
    }

    async fn commit(&self, ctx: &Context) -> Result<(), DataError> {
        let mut slot = self.slot.lock().await;
        let Some(tx) = slot.tx.take() else {
            return Err(DataError::Finished(slot.state));
        };
        slot.state = TxState::Committed;
        let res = ctx
            .run(async move { tx.commit().await.map_err(DataError::Commit) })
            .await;
        match &res {
            Ok(()) => tracing::debug!("transaction committed"),
            // A failed COMMIT leaves nothing durable behind.
            Err(_) => slot.state = TxState::RolledBack,
        }
        res
    }

    async fn rollback(&self, ctx: &Context) -> Result<(), DataError> {
        let mut slot = self.slot.lock().await;
        let Some(tx) = slot.tx.take() else {
            return match slot.state {
                TxState::RolledBack => Ok(()),
                state => Err(DataError::Finished(state)),
            };
        };
        slot.state = TxState::RolledBack;
        tracing::debug!("transaction rolled back");
        ctx.run(async move { tx.rollback().await.map_err(DataError::Rollback) })
            .await
            .map_err(|err| match err {
                // The driver transaction is dropped unfinished and discarded.
                DataError::Cancelled | DataError::DeadlineExceeded => DataError::Rollback(Box::new(err)),
                other => other,
            })
    }
}

/// Access to the transaction bound to a context.
pub struct TxHandle<S: Store> {
    tx: Arc<Transaction<S>>,
    key: u64,
    owned: bool,
    ctx: Context,
}

impl<S: Store> TxHandle<S> {
    /// Whether this handle began the transaction (as opposed to joining it).
    pub fn is_owned(&self) -> bool {
        self.owned
    }

    pub async fn state(&self) -> TxState {
        self.tx.state().await
    }

    pub async fn query(&self, statement: &Statement) -> Result<Vec<Row>, DataError> {
        self.tx.query(&self.ctx, statement).await
    }

    pub async fn execute(&self, statement: &Statement) -> Result<u64, DataError> {
        self.tx.execute(&self.ctx, statement).await
    }

    /// Commit if owned; a borrowed handle leaves committing to the owner.
    pub async fn commit(self) -> Result<(), DataError> {
        if !self.owned {
            return Ok(());
        }
        self.tx.commit(&self.ctx).await
    }

    /// Roll back the transaction, owned or not.
    pub async fn rollback(self) -> Result<(), DataError> {
        self.tx.rollback(&self.ctx).await
    }
}

impl<S: Store> Drop for TxHandle<S> {
    fn drop(&mut self) {
        if self.owned {
            let binding: Binding = self.tx.clone();
            self.ctx.unbind(self.key, &binding);
        }
    }
}

/// Hands out context-scoped transactions over a [`Store`].
pub struct Transactor<S: Store> {
    id: u64,
    store: Arc<S>,
}

impl<S: Store> Clone for Transactor<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            store: self.store.clone(),
        }
    }
}

impl<S: Store> Transactor<S> {
    pub fn new(store: S) -> Self {
        Self::from_arc(Arc::new(store))
    }

    pub fn from_arc(store: Arc<S>) -> Self {
        Self {
            id: NEXT_TRANSACTOR_ID.fetch_add(1, Ordering::Relaxed),
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The transaction bound to `ctx`, begun with the store's default
    /// options if none is.
    pub async fn context(&self, ctx: &Context) -> Result<TxHandle<S>, DataError> {
        if let Some(joined) = self.join(ctx).await? {
            return Ok(joined);
        }
        self.start(ctx, self.store.default_options()).await
    }

    /// Begin a transaction with opaque driver options.
    ///
    /// The first option value is coerced to `S::Options`; extra values are
    /// ignored and no value means the store's default options. If `ctx` already has
    /// an active transaction it is joined and the options are not used.
    pub async fn begin(&self, ctx: &Context, options: Vec<Opaque>) -> Result<TxHandle<S>, DataError> {
        if let Some(joined) = self.join(ctx).await? {
            return Ok(joined);
        }
        let options = coerce::<S::Options>(options)?
            .into_iter()
            .next()
            .unwrap_or_else(|| self.store.default_options());
        self.start(ctx, options).await
    }

    /// Begin a transaction with typed driver options.
    pub async fn begin_with(&self, ctx: &Context, options: S::Options) -> Result<TxHandle<S>, DataError> {
        if let Some(joined) = self.join(ctx).await? {
            return Ok(joined);
        }
        self.start(ctx, options).await
    }

    /// Commit the transaction bound to `ctx` and release the binding.
    pub async fn commit(&self, ctx: &Context) -> Result<(), DataError> {
        let tx = self.take(ctx).ok_or(DataError::NoTransaction)?;
        tx.commit(ctx).await
    }

    /// Roll back the transaction bound to `ctx`, if any, and release the binding.
    pub async fn rollback(&self, ctx: &Context) -> Result<(), DataError> {
        match self.take(ctx) {
            Some(tx) => tx.rollback(ctx).await,
            None => Ok(()),
        }
    }

    /// State of the transaction bound to `ctx`.
    pub async fn state(&self, ctx: &Context) -> Option<TxState> {
        match self.bound(ctx) {
            Some(tx) => Some(tx.state().await),
            None => None,
        }
    }

    /// Run `f` inside the context's transaction: commit on success, roll back
    /// and join the rollback outcome on failure.
    pub async fn transact<T, F, Fut>(&self, ctx: &Context, f: F) -> Result<T, DataError>
    where
        F: FnOnce(Context) -> Fut,
        Fut: Future<Output = Result<T, DataError>>,
    {
        let scope = self.context(ctx).await?;
        match f(ctx.clone()).await {
            Ok(value) => scope.commit().await.map(|()| value),
            Err(err) => Err(err.join(scope.rollback().await)),
        }
    }

    fn bound(&self, ctx: &Context) -> Option<Arc<Transaction<S>>> {
        ctx.binding(self.id)
            .and_then(|b| b.downcast::<Transaction<S>>().ok())
    }

    fn take(&self, ctx: &Context) -> Option<Arc<Transaction<S>>> {
        ctx.take_binding(self.id)
            .and_then(|b| b.downcast::<Transaction<S>>().ok())
    }

    fn handle(&self, tx: Arc<Transaction<S>>, owned: bool, ctx: &Context) -> TxHandle<S> {
        TxHandle {
            tx,
            key: self.id,
            owned,
            ctx: ctx.clone(),
        }
    }

    async fn join(&self, ctx: &Context) -> Result<Option<TxHandle<S>>, DataError> {
        let Some(tx) = self.bound(ctx) else {
            return Ok(None);
        };
        match tx.state().await {
            TxState::Active => Ok(Some(self.handle(tx, false, ctx))),
            state => Err(DataError::Finished(state)),
        }
    }

    async fn start(&self, ctx: &Context, options: S::Options) -> Result<TxHandle<S>, DataError> {
        let store = self.store.clone();
        let raw = ctx
            .run(async move { store.begin(options).await.map_err(DataError::Begin) })
            .await?;
        let tx = Arc::new(Transaction::<S>::new(raw));
        let binding: Binding = tx.clone();
        let bound = ctx.bind_if_absent(self.id, binding.clone());
        if !Arc::ptr_eq(&bound, &binding) {
            // A concurrent begin on the same context bound first; join it.
            if let Err(err) = tx.rollback(ctx).await {
                tracing::warn!(error = %err, "failed to discard duplicate transaction");
            }
            return match bound.downcast::<Transaction<S>>() {
                Ok(winner) => Ok(self.handle(winner, false, ctx)),
                Err(_) => Err(DataError::NoTransaction),
            };
        }
        tracing::debug!(transactor = self.id, "transaction started");
        Ok(self.handle(tx, true, ctx))
    }
}
