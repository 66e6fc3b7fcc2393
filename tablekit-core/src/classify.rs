//! Best-effort classification of driver errors.
//!
//! Callers test for semantic failures ("unique violation on `email`")
//! through [`ClassifiedError`] instead of matching driver-specific codes.
//! Each driver contributes an [`Inspect`] implementation that recognises its
//! own structured error; [`classify`] walks an error chain looking for one.

use crate::error::DataError;
use std::error::Error;

pub const UNIQUE_VIOLATION: &str = "23505";
pub const FOREIGN_KEY_VIOLATION: &str = "23503";
pub const NOT_NULL_VIOLATION: &str = "23502";
pub const CHECK_VIOLATION: &str = "23514";
pub const SERIALIZATION_FAILURE: &str = "40001";
pub const DEADLOCK_DETECTED: &str = "40P01";

/// A driver error reduced to its SQLSTATE code and constraint details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    code: String,
    message: String,
    column: Option<String>,
    constraint: Option<String>,
    table: Option<String>,
}

impl ClassifiedError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            column: None,
            constraint: None,
            table: None,
        }
    }

    pub fn with_column(mut self, column: Option<impl Into<String>>) -> Self {
        self.column = column.map(Into::into);
        self
    }

    pub fn with_constraint(mut self, constraint: Option<impl Into<String>>) -> Self {
        self.constraint = constraint.map(Into::into);
        self
    }

    pub fn with_table(mut self, table: Option<impl Into<String>>) -> Self {
        self.table = table.map(Into::into);
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    pub fn constraint(&self) -> Option<&str> {
        self.constraint.as_deref()
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Unique violation, optionally restricted to an exact (case-sensitive)
    /// violating column.
    pub fn is_unique_violation(&self, column: Option<&str>) -> bool {
        self.code == UNIQUE_VIOLATION
            && column.map_or(true, |col| self.column.as_deref() == Some(col))
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        self.code == FOREIGN_KEY_VIOLATION
    }

    pub fn is_not_null_violation(&self) -> bool {
        self.code == NOT_NULL_VIOLATION
    }

    pub fn is_check_violation(&self) -> bool {
        self.code == CHECK_VIOLATION
    }

    pub fn is_serialization_failure(&self) -> bool {
        self.code == SERIALIZATION_FAILURE
    }

    pub fn is_deadlock(&self) -> bool {
        self.code == DEADLOCK_DETECTED
    }
}

impl std::fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (SQLSTATE {})", self.message, self.code)
    }
}

impl Error for ClassifiedError {}

/// Driver hook recognising the driver's own structured error.
///
/// `inspect` looks at a single link of an error chain; it must return `None`
/// for any shape it does not know.
pub trait Inspect {
    fn inspect(err: &(dyn Error + 'static)) -> Option<ClassifiedError>;
}

/// Inspector that recognises nothing but already-classified errors.
pub struct NoInspect;

impl Inspect for NoInspect {
    fn inspect(_err: &(dyn Error + 'static)) -> Option<ClassifiedError> {
        None
    }
}

/// Classify `err` using the driver inspector `D`.
///
/// Returns `None` for `None`, returns an already-classified error unchanged,
/// and otherwise wraps the first driver error found in the chain. Every
/// member of a joined [`DataError`] is searched, original failure first.
pub fn classify<D: Inspect>(err: Option<&(dyn Error + 'static)>) -> Option<ClassifiedError> {
    let mut stack: Vec<&(dyn Error + 'static)> = err.into_iter().collect();
    while let Some(current) = stack.pop() {
        if let Some(classified) = current.downcast_ref::<ClassifiedError>() {
            return Some(classified.clone());
        }
        if let Some(classified) = D::inspect(current) {
            return Some(classified);
        }
        match current.downcast_ref::<DataError>() {
            Some(DataError::Joined(errors)) => {
                stack.extend(errors.iter().rev().map(|e| e as &(dyn Error + 'static)));
            }
            _ => stack.extend(current.source()),
        }
    }
    None
}
