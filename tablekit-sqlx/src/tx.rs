//! Driver transaction wrapper.

use crate::bind::bind_all;
use crate::decode::decode_row;
use sqlx::{Postgres, Transaction};
use std::future::Future;
use std::ops::{Deref, DerefMut};
use tablekit_core::{BoxError, Row, Statement, StoreTx};

/// A live PostgreSQL transaction checked out of the pool.
///
/// Dropping it without committing rolls it back when the connection returns
/// to the pool.
pub struct PgTx(pub Transaction<'static, Postgres>);

impl Deref for PgTx {
    type Target = Transaction<'static, Postgres>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for PgTx {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl PgTx {
    pub fn into_inner(self) -> Transaction<'static, Postgres> {
        self.0
    }
}

impl StoreTx for PgTx {
    fn query(&mut self, statement: &Statement) -> impl Future<Output = Result<Vec<Row>, BoxError>> + Send {
        async move {
            let rows = bind_all(sqlx::query(&statement.sql), &statement.args)
                .fetch_all(&mut *self.0)
                .await?;
            let rows = rows.iter().map(decode_row).collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        }
    }

    fn execute(&mut self, statement: &Statement) -> impl Future<Output = Result<u64, BoxError>> + Send {
        async move {
            let done = bind_all(sqlx::query(&statement.sql), &statement.args)
                .execute(&mut *self.0)
                .await?;
            Ok(done.rows_affected())
        }
    }

    fn commit(self) -> impl Future<Output = Result<(), BoxError>> + Send {
        async move {
            self.0.commit().await?;
            Ok(())
        }
    }

    fn rollback(self) -> impl Future<Output = Result<(), BoxError>> + Send {
        async move {
            self.0.rollback().await?;
            Ok(())
        }
    }
}
