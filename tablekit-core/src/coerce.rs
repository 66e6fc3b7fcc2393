//! Bridging loosely-typed option slots back to concrete types.
//!
//! The transaction layer accepts driver options as opaque values so that it
//! never names a driver's option type. [`coerce`] turns those values back into
//! the concrete type at the point where the driver needs them.

use std::any::{type_name, Any};
use std::error::Error;

/// An opaque, type-erased value.
pub type Opaque = Box<dyn Any + Send + Sync>;

/// Sentinel cause of every [`CoercionError`].
///
/// Test for it with [`is_coerce_failure`] when the exact index or type does
/// not matter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoerceFailed;

impl std::fmt::Display for CoerceFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("failed to coerce")
    }
}

impl Error for CoerceFailed {}

/// An opaque value did not have the expected type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionError {
    index: usize,
    expected: &'static str,
}

impl CoercionError {
    /// Zero-based position of the first mismatching element.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Name of the type the element was expected to have.
    pub fn expected(&self) -> &'static str {
        self.expected
    }
}

impl std::fmt::Display for CoercionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot coerce element {} to type {}",
            self.index, self.expected
        )
    }
}

impl Error for CoercionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&CoerceFailed)
    }
}

/// Convert every opaque value into `T`, failing on the first mismatch.
///
/// ```ignore
/// let opts: Vec<Opaque> = vec![Box::new(PgTxOptions::default())];
/// let typed = coerce::<PgTxOptions>(opts)?;
/// ```
pub fn coerce<T: Any>(values: Vec<Opaque>) -> Result<Vec<T>, CoercionError> {
    let mut coerced = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        match value.downcast::<T>() {
            Ok(typed) => coerced.push(*typed),
            Err(_) => {
                return Err(CoercionError {
                    index,
                    expected: type_name::<T>(),
                })
            }
        }
    }
    Ok(coerced)
}

/// Whether `err`, or anything in its source chain, is a coercion failure.
pub fn is_coerce_failure(err: &(dyn Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<CoerceFailed>() || e.is::<CoercionError>() {
            return true;
        }
        current = e.source();
    }
    false
}
