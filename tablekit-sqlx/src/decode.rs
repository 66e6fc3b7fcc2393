//! Converting PostgreSQL rows into name-addressable [`Row`]s.

use sqlx::postgres::PgRow;
use sqlx::{Column, Row as _, TypeInfo};
use tablekit_core::{Row, Value, ValueKind};

/// Read a nullable column as `$ty`, mapping it into a [`Value`].
macro_rules! nullable {
    ($row:expr, $idx:expr, $ty:ty, $kind:expr, $map:expr) => {
        match $row.try_get::<Option<$ty>, _>($idx)? {
            Some(v) => $map(v),
            None => Value::Null($kind),
        }
    };
}

pub(crate) fn decode_row(row: &PgRow) -> Result<Row, sqlx::Error> {
    let mut out = Row::new();
    for column in row.columns() {
        let idx = column.ordinal();
        let value = match column.type_info().name() {
            "BOOL" => nullable!(row, idx, bool, ValueKind::Bool, Value::Bool),
            "INT2" => nullable!(row, idx, i16, ValueKind::Int, |v: i16| Value::Int(v.into())),
            "INT4" => nullable!(row, idx, i32, ValueKind::Int, |v: i32| Value::Int(v.into())),
            "INT8" => nullable!(row, idx, i64, ValueKind::Int, Value::Int),
            "FLOAT4" => nullable!(row, idx, f32, ValueKind::Float, |v: f32| Value::Float(v.into())),
            "FLOAT8" => nullable!(row, idx, f64, ValueKind::Float, Value::Float),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CITEXT" => {
                nullable!(row, idx, String, ValueKind::Text, Value::Text)
            }
            "BYTEA" => nullable!(row, idx, Vec<u8>, ValueKind::Bytes, Value::Bytes),
            "JSON" | "JSONB" => nullable!(row, idx, serde_json::Value, ValueKind::Json, Value::Json),
            "UUID" => nullable!(row, idx, uuid::Uuid, ValueKind::Uuid, Value::Uuid),
            "TIMESTAMPTZ" => nullable!(
                row,
                idx,
                chrono::DateTime<chrono::Utc>,
                ValueKind::Timestamp,
                Value::Timestamp
            ),
            "TIMESTAMP" => nullable!(
                row,
                idx,
                chrono::NaiveDateTime,
                ValueKind::Timestamp,
                |v: chrono::NaiveDateTime| Value::Timestamp(v.and_utc())
            ),
            other => {
                return Err(sqlx::Error::ColumnDecode {
                    index: column.name().to_string(),
                    source: format!("unsupported column type {other}").into(),
                })
            }
        };
        out.push(column.name(), value);
    }
    Ok(out)
}
