//! Binding [`Value`]s as PostgreSQL parameters.

use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::Postgres;
use tablekit_core::{Value, ValueKind};

pub(crate) type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Bind every argument of a statement, in order.
pub(crate) fn bind_all<'q>(mut query: PgQuery<'q>, args: &'q [Value]) -> PgQuery<'q> {
    for value in args {
        query = bind_value(query, value);
    }
    query
}

// NULLs are bound with their column's type so Postgres can infer the
// parameter type.
fn bind_value<'q>(query: PgQuery<'q>, value: &'q Value) -> PgQuery<'q> {
    match value {
        Value::Null(kind) => match kind {
            ValueKind::Bool => query.bind(None::<bool>),
            ValueKind::Int => query.bind(None::<i64>),
            ValueKind::Float => query.bind(None::<f64>),
            ValueKind::Text => query.bind(None::<String>),
            ValueKind::Bytes => query.bind(None::<Vec<u8>>),
            ValueKind::Json => query.bind(None::<serde_json::Value>),
            ValueKind::Uuid => query.bind(None::<uuid::Uuid>),
            ValueKind::Timestamp => query.bind(None::<chrono::DateTime<chrono::Utc>>),
        },
        Value::Bool(b) => query.bind(*b),
        Value::Int(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::Text(s) => query.bind(s.as_str()),
        Value::Bytes(b) => query.bind(b.as_slice()),
        Value::Json(j) => query.bind(j),
        Value::Uuid(u) => query.bind(*u),
        Value::Timestamp(t) => query.bind(*t),
    }
}
