//! Typed CRUD access to a single table.
//!
//! Every operation runs inside the transaction bound to the caller's
//! [`Context`]: it joins an active scope if there is one, otherwise it begins
//! its own. A transaction begun by the operation is committed when the
//! operation succeeds and rolled back when it fails, with the rollback
//! outcome joined onto the original error.
//!
//! # Example
//!
//! ```ignore
//! #[derive(Record, Default)]
//! struct User {
//!     #[column(read_only)]
//!     id: i64,
//!     email: String,
//!     #[column(write_only)]
//!     password_hash: String,
//! }
//!
//! let users: Table<User, PgStore> = Table::new("users", transactor);
//! let created = users.insert_one(&ctx, &user, true).await?;
//! let found = users.find(&ctx, |q| { q.where_eq("email", "a@b.com"); }).await?;
//! ```

use crate::context::Context;
use crate::error::DataError;
use crate::page::{Page, Pageable};
use crate::query::{
    BuildStatement, CountBuilder, DeleteBuilder, Dialect, IdentifierPolicy, InsertBuilder,
    SelectBuilder, Statement, UpdateBuilder,
};
use crate::record::{Record, Structure};
use crate::store::Store;
use crate::transactor::{Transactor, TxHandle};
use crate::value::{DecodeError, Row};
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

/// Custom row-to-record conversion, replacing [`Record::from_row`].
pub type RowMapper<T> = Arc<dyn Fn(&Row) -> Result<T, DecodeError> + Send + Sync>;

pub struct Table<T: Record, S: Store> {
    name: String,
    transactor: Transactor<S>,
    row_mapper: Option<RowMapper<T>>,
    dialect: Dialect,
    policy: IdentifierPolicy,
    structure: OnceLock<Structure>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record, S: Store> Clone for Table<T, S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            transactor: self.transactor.clone(),
            row_mapper: self.row_mapper.clone(),
            dialect: self.dialect,
            policy: self.policy,
            structure: self.structure.clone(),
            _record: PhantomData,
        }
    }
}

impl<T: Record, S: Store> Table<T, S> {
    /// Postgres placeholders, identifiers validated but left unquoted.
    pub fn new(name: impl Into<String>, transactor: Transactor<S>) -> Self {
        Self {
            name: name.into(),
            transactor,
            row_mapper: None,
            dialect: Dialect::Postgres,
            policy: IdentifierPolicy::Validate,
            structure: OnceLock::new(),
            _record: PhantomData,
        }
    }

    pub fn with_row_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&Row) -> Result<T, DecodeError> + Send + Sync + 'static,
    {
        self.row_mapper = Some(Arc::new(mapper));
        self
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_identifier_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transactor(&self) -> &Transactor<S> {
        &self.transactor
    }

    /// Column layout of `T`, computed on first use and cached.
    pub fn structure(&self) -> &Structure {
        self.structure.get_or_init(Structure::of::<T>)
    }

    /// A SELECT over every readable column of the table.
    pub fn select(&self) -> SelectBuilder {
        let mut sb = SelectBuilder::new(&self.name, self.dialect);
        sb.identifier_policy(self.policy)
            .columns(self.structure().read_columns());
        sb
    }

    pub async fn find_all(&self, ctx: &Context) -> Result<Vec<T>, DataError> {
        self.find_all_by(ctx, |_| {}).await
    }

    /// Like [`Table::find_all`], letting `customize` add predicates,
    /// ordering or limits to the generated SELECT.
    pub async fn find_all_by<F>(&self, ctx: &Context, customize: F) -> Result<Vec<T>, DataError>
    where
        F: FnOnce(&mut SelectBuilder),
    {
        let mut sb = self.select();
        customize(&mut sb);
        let statement = sb.build()?;
        self.run(ctx, statement, true).await
    }

    /// The first matching record, or `None` when nothing matches.
    pub async fn find<F>(&self, ctx: &Context, filter: F) -> Result<Option<T>, DataError>
    where
        F: FnOnce(&mut SelectBuilder),
    {
        let found = self
            .find_all_by(ctx, |sb| {
                filter(sb);
                sb.limit(1);
            })
            .await?;
        Ok(found.into_iter().next())
    }

    /// Insert `records` in one statement.
    ///
    /// With `returning`, the stored rows are read back through the readable
    /// columns; without it the result is always empty. An empty `records`
    /// slice returns immediately without touching the store.
    pub async fn insert(&self, ctx: &Context, records: &[T], returning: bool) -> Result<Vec<T>, DataError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let structure = self.structure();
        let mut ib = InsertBuilder::new(&self.name, self.dialect);
        ib.identifier_policy(self.policy)
            .columns(structure.write_columns());
        for record in records {
            ib.values(structure.write_values(record));
        }
        if returning {
            ib.returning(structure.read_columns());
        }
        let statement = ib.build()?;
        self.run(ctx, statement, returning).await
    }

    pub async fn insert_one(&self, ctx: &Context, record: &T, returning: bool) -> Result<Option<T>, DataError> {
        let inserted = self
            .insert(ctx, std::slice::from_ref(record), returning)
            .await?;
        Ok(inserted.into_iter().next())
    }

    /// Update rows matched by `customize`.
    ///
    /// Assignments start from the writable fields of `record` (or nothing
    /// when `record` is `None`); `customize` may add or override assignments
    /// and add predicates. If no assignment remains the statement is not
    /// issued and the result is empty.
    pub async fn update<F>(
        &self,
        ctx: &Context,
        record: Option<&T>,
        customize: F,
        returning: bool,
    ) -> Result<Vec<T>, DataError>
    where
        F: FnOnce(&mut UpdateBuilder),
    {
        let structure = self.structure();
        let mut ub = UpdateBuilder::new(&self.name, self.dialect);
        ub.identifier_policy(self.policy);
        if let Some(record) = record {
            for (column, value) in structure.write_pairs(record) {
                ub.set(column, value);
            }
        }
        customize(&mut ub);
        if ub.num_assignment() == 0 {
            tracing::debug!(table = %self.name, "update without assignments skipped");
            return Ok(Vec::new());
        }
        if returning {
            ub.returning(structure.read_columns());
        }
        let statement = ub.build()?;
        self.run(ctx, statement, returning).await
    }

    /// Delete rows matched by `filter`.
    ///
    /// A filter that adds no predicate would delete the whole table; such a
    /// call is not issued and returns an empty result.
    pub async fn delete<F>(&self, ctx: &Context, filter: F, returning: bool) -> Result<Vec<T>, DataError>
    where
        F: FnOnce(&mut DeleteBuilder),
    {
        let mut db = DeleteBuilder::new(&self.name, self.dialect);
        db.identifier_policy(self.policy);
        filter(&mut db);
        if db.num_condition() == 0 {
            tracing::debug!(table = %self.name, "delete without conditions skipped");
            return Ok(Vec::new());
        }
        if returning {
            db.returning(self.structure().read_columns());
        }
        let statement = db.build()?;
        self.run(ctx, statement, returning).await
    }

    /// Number of rows matched by `filter`.
    pub async fn count<F>(&self, ctx: &Context, filter: F) -> Result<u64, DataError>
    where
        F: FnOnce(&mut CountBuilder),
    {
        let mut cb = CountBuilder::new(&self.name, self.dialect);
        cb.identifier_policy(self.policy);
        filter(&mut cb);
        let statement = cb.build()?;
        let tx = self.transactor.context(ctx).await?;
        let res = self.count_rows(&tx, &statement).await;
        self.finish(tx, res).await
    }

    /// One page of the records matched by `filter`, with the total count.
    /// Both statements run in the same transaction.
    pub async fn find_page<F>(&self, ctx: &Context, pageable: &Pageable, filter: F) -> Result<Page<T>, DataError>
    where
        F: FnOnce(&mut SelectBuilder),
    {
        let mut sb = self.select();
        filter(&mut sb);
        let count = sb.clone().into_count().build()?;
        if let Some((column, ascending)) = pageable.sort_order() {
            sb.order_by(column, ascending);
        }
        sb.limit(pageable.size).offset(pageable.offset());
        let select = sb.build()?;

        let tx = self.transactor.context(ctx).await?;
        let res = async {
            let total = self.count_rows(&tx, &count).await?;
            let content = self.fetch(&tx, &select).await?;
            Ok::<_, DataError>(Page::new(content, pageable, total))
        }
        .await;
        self.finish(tx, res).await
    }

    async fn run(&self, ctx: &Context, statement: Statement, fetch: bool) -> Result<Vec<T>, DataError> {
        let tx = self.transactor.context(ctx).await?;
        let res = if fetch {
            self.fetch(&tx, &statement).await
        } else {
            self.log(&statement);
            tx.execute(&statement).await.map(|_| Vec::new())
        };
        self.finish(tx, res).await
    }

    async fn fetch(&self, tx: &TxHandle<S>, statement: &Statement) -> Result<Vec<T>, DataError> {
        self.log(statement);
        let rows = tx.query(statement).await?;
        rows.iter().map(|row| self.map_row(row)).collect()
    }

    async fn count_rows(&self, tx: &TxHandle<S>, statement: &Statement) -> Result<u64, DataError> {
        self.log(statement);
        let rows = tx.query(statement).await?;
        match rows.first() {
            Some(row) => {
                let count: i64 = row.try_get("count")?;
                Ok(count.max(0) as u64)
            }
            None => Ok(0),
        }
    }

    /// Commit on success; on failure roll back and keep both errors.
    async fn finish<R>(&self, tx: TxHandle<S>, res: Result<R, DataError>) -> Result<R, DataError> {
        match res {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                let rollback = tx.rollback().await;
                if let Err(rollback_err) = &rollback {
                    tracing::warn!(
                        table = %self.name,
                        error = %err,
                        rollback_error = %rollback_err,
                        "rollback after failed statement also failed"
                    );
                }
                Err(err.join(rollback))
            }
        }
    }

    fn map_row(&self, row: &Row) -> Result<T, DataError> {
        let record = match &self.row_mapper {
            Some(mapper) => mapper(row),
            None => T::from_row(row),
        };
        record.map_err(DataError::Decode)
    }

    fn log(&self, statement: &Statement) {
        tracing::debug!(
            table = %self.name,
            query = %statement.sql,
            args = ?statement.args,
            "executing statement"
        );
    }
}
