use crate::classify::{classify, ClassifiedError, Inspect};
use crate::coerce::CoercionError;
use crate::query::QueryError;
use crate::transactor::TxState;
use crate::value::DecodeError;
use std::error::Error;

/// Boxed driver error, as returned by a [`Store`](crate::Store).
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Errors that can occur in the data layer.
#[derive(Debug)]
pub enum DataError {
    /// Transaction options did not have the driver's option type.
    Coercion(CoercionError),
    /// The store refused to open a transaction.
    Begin(BoxError),
    /// A statement failed to execute.
    Query(BoxError),
    /// A statement could not be built (invalid identifier).
    Build(QueryError),
    /// A result row could not be mapped to the record type.
    Decode(DecodeError),
    Commit(BoxError),
    Rollback(BoxError),
    /// No transaction is bound to the context.
    NoTransaction,
    /// The bound transaction already left the `Active` state.
    Finished(TxState),
    Cancelled,
    DeadlineExceeded,
    /// Several failures that all happened; the original one comes first.
    Joined(Vec<DataError>),
}

impl DataError {
    /// Construct a `Query` variant from any error type.
    pub fn query(err: impl Error + Send + Sync + 'static) -> Self {
        DataError::Query(Box::new(err))
    }

    /// Combine this error with the outcome of the rollback that followed it.
    ///
    /// The original error is never replaced: a failed rollback is appended
    /// after it and both stay inspectable through [`DataError::causes`].
    pub fn join(self, rollback: Result<(), DataError>) -> DataError {
        match rollback {
            Ok(()) => self,
            Err(other) => {
                let mut errors = Vec::new();
                self.flatten_into(&mut errors);
                other.flatten_into(&mut errors);
                DataError::Joined(errors)
            }
        }
    }

    fn flatten_into(self, out: &mut Vec<DataError>) {
        match self {
            DataError::Joined(errors) => {
                for err in errors {
                    err.flatten_into(out);
                }
            }
            other => out.push(other),
        }
    }

    /// Every individual failure carried by this error, in order.
    pub fn causes(&self) -> Vec<&DataError> {
        match self {
            DataError::Joined(errors) => errors.iter().flat_map(|e| e.causes()).collect(),
            other => vec![other],
        }
    }

    /// Whether any carried failure matches `pred`.
    pub fn any(&self, pred: impl Fn(&DataError) -> bool) -> bool {
        self.causes().into_iter().any(pred)
    }

    pub fn is_rollback(&self) -> bool {
        self.any(|e| matches!(e, DataError::Rollback(_)))
    }

    pub fn is_query(&self) -> bool {
        self.any(|e| matches!(e, DataError::Query(_)))
    }

    /// Classify the driver error carried by this error, if any.
    pub fn classify<D: Inspect>(&self) -> Option<ClassifiedError> {
        classify::<D>(Some(self as &(dyn Error + 'static)))
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::Coercion(err) => write!(f, "Invalid transaction options: {err}"),
            DataError::Begin(err) => write!(f, "Begin transaction error: {err}"),
            DataError::Query(err) => write!(f, "Query error: {err}"),
            DataError::Build(err) => write!(f, "Build error: {err}"),
            DataError::Decode(err) => write!(f, "Decode error: {err}"),
            DataError::Commit(err) => write!(f, "Commit error: {err}"),
            DataError::Rollback(err) => write!(f, "Rollback error: {err}"),
            DataError::NoTransaction => write!(f, "No transaction bound to context"),
            DataError::Finished(state) => write!(f, "Transaction is already {state}"),
            DataError::Cancelled => write!(f, "Context cancelled"),
            DataError::DeadlineExceeded => write!(f, "Context deadline exceeded"),
            DataError::Joined(errors) => {
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{err}")?;
                }
                Ok(())
            }
        }
    }
}

impl Error for DataError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DataError::Coercion(err) => Some(err),
            DataError::Begin(err)
            | DataError::Query(err)
            | DataError::Commit(err)
            | DataError::Rollback(err) => Some(err.as_ref()),
            DataError::Build(err) => Some(err),
            DataError::Decode(err) => Some(err),
            DataError::Joined(errors) => errors.first().map(|e| e as &(dyn Error + 'static)),
            DataError::NoTransaction
            | DataError::Finished(_)
            | DataError::Cancelled
            | DataError::DeadlineExceeded => None,
        }
    }
}

impl From<CoercionError> for DataError {
    fn from(err: CoercionError) -> Self {
        DataError::Coercion(err)
    }
}

impl From<QueryError> for DataError {
    fn from(err: QueryError) -> Self {
        DataError::Build(err)
    }
}

impl From<DecodeError> for DataError {
    fn from(err: DecodeError) -> Self {
        DataError::Decode(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(msg: &str) -> BoxError {
        msg.into()
    }

    #[test]
    fn test_join_with_successful_rollback_keeps_original() {
        let err = DataError::Query(boxed("boom")).join(Ok(()));
        assert!(matches!(err, DataError::Query(_)));
    }

    #[test]
    fn test_join_keeps_both_failures() {
        let err = DataError::Query(boxed("boom")).join(Err(DataError::Rollback(boxed("conn lost"))));
        assert!(err.is_query());
        assert!(err.is_rollback());
        assert_eq!(err.causes().len(), 2);
        assert_eq!(err.to_string(), "Query error: boom; Rollback error: conn lost");
    }

    #[test]
    fn test_join_flattens() {
        let first = DataError::Query(boxed("a")).join(Err(DataError::Rollback(boxed("b"))));
        let err = first.join(Err(DataError::Cancelled));
        let causes = err.causes();
        assert_eq!(causes.len(), 3);
        assert!(matches!(causes[2], DataError::Cancelled));
    }

    #[test]
    fn test_source_chain() {
        let err = DataError::Query(boxed("boom"));
        assert_eq!(err.source().unwrap().to_string(), "boom");
        assert!(DataError::Cancelled.source().is_none());
    }
}
