//! Recognising PostgreSQL errors inside an error chain.

use sqlx::postgres::PgDatabaseError;
use std::error::Error;
use tablekit_core::ClassifiedError;

/// Classify one link of an error chain if it is a PostgreSQL error.
///
/// Matches both a bare [`PgDatabaseError`] and a [`sqlx::Error::Database`]
/// wrapping one. Other database errors still classify by their SQLSTATE.
pub(crate) fn inspect(err: &(dyn Error + 'static)) -> Option<ClassifiedError> {
    if let Some(pg) = err.downcast_ref::<PgDatabaseError>() {
        return Some(from_pg(pg));
    }
    let Some(sqlx::Error::Database(db)) = err.downcast_ref::<sqlx::Error>() else {
        return None;
    };
    if let Some(pg) = db.try_downcast_ref::<PgDatabaseError>() {
        return Some(from_pg(pg));
    }
    let code = db.code()?;
    Some(
        ClassifiedError::new(code, db.message())
            .with_constraint(db.constraint())
            .with_table(db.table()),
    )
}

fn from_pg(pg: &PgDatabaseError) -> ClassifiedError {
    // Postgres leaves `column` empty for unique violations; the key is only
    // named in the detail text.
    let column = pg
        .column()
        .map(str::to_string)
        .or_else(|| pg.detail().and_then(key_column));
    ClassifiedError::new(pg.code(), pg.message())
        .with_column(column)
        .with_constraint(pg.constraint())
        .with_table(pg.table())
}

/// The column of a single-column key detail such as
/// `Key (email)=(a@b.com) already exists.`
fn key_column(detail: &str) -> Option<String> {
    let rest = detail.strip_prefix("Key (")?;
    let (columns, _) = rest.split_once(")=(")?;
    if columns.contains(',') {
        return None;
    }
    Some(columns.trim().trim_matches('"').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_column_from_detail() {
        assert_eq!(
            key_column("Key (email)=(a@b.com) already exists.").as_deref(),
            Some("email")
        );
        assert_eq!(key_column("Key (org_id, email)=(1, a@b.com) already exists."), None);
        assert_eq!(key_column("Failing row contains (1)."), None);
    }

    #[test]
    fn test_unrelated_errors_are_not_classified() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert!(inspect(&io).is_none());
        assert!(inspect(&sqlx::Error::RowNotFound).is_none());
        assert!(inspect(&sqlx::Error::PoolTimedOut).is_none());
    }
}
