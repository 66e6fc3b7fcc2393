use crate::classify::Inspect;
use crate::error::BoxError;
use crate::query::Statement;
use crate::value::Row;
use std::future::Future;

/// The database driver consumed by the transaction layer.
///
/// Uses RPITIT (return-position `impl Trait` in traits), no `async-trait` needed.
/// The store owns its connection pool; it only has to hand out transactions.
pub trait Store: Inspect + Send + Sync + 'static {
    /// Driver-native transaction options.
    type Options: Default + Send + Sync + 'static;

    type Tx: StoreTx;

    /// Options used when the caller supplies none.
    fn default_options(&self) -> Self::Options {
        Self::Options::default()
    }

    fn begin(&self, options: Self::Options) -> impl Future<Output = Result<Self::Tx, BoxError>> + Send;
}

/// A live driver transaction.
pub trait StoreTx: Send + 'static {
    /// Run a statement and collect every returned row.
    fn query(&mut self, statement: &Statement) -> impl Future<Output = Result<Vec<Row>, BoxError>> + Send;

    /// Run a statement and report the number of affected rows.
    fn execute(&mut self, statement: &Statement) -> impl Future<Output = Result<u64, BoxError>> + Send;

    fn commit(self) -> impl Future<Output = Result<(), BoxError>> + Send;

    fn rollback(self) -> impl Future<Output = Result<(), BoxError>> + Send;
}
