//! Transaction-scoped, typed table access.
//!
//! The pieces, bottom-up:
//! - [`coerce`]: checked conversion of opaque option values.
//! - [`classify`]: driver-independent classification of database errors.
//! - [`value`], [`record`]: column values, rows and the record description.
//! - [`query`]: parameterized statement builders.
//! - [`context`]: the explicit execution scope carried through every call.
//! - [`store`]: the driver seam.
//! - [`transactor`]: at most one transaction per context.
//! - [`table`]: CRUD over a record type.

pub mod classify;
pub mod coerce;
pub mod config;
pub mod context;
pub mod error;
pub mod page;
pub mod query;
pub mod record;
pub mod store;
pub mod table;
pub mod transactor;
pub mod value;

pub use classify::{classify, ClassifiedError, Inspect, NoInspect};
pub use coerce::{coerce, is_coerce_failure, CoerceFailed, CoercionError, Opaque};
pub use config::{Config, ConfigError, ConfigValue, FromConfigValue};
pub use context::Context;
pub use error::{BoxError, DataError};
pub use page::{Page, Pageable};
pub use query::{
    BuildStatement, CountBuilder, DeleteBuilder, Dialect, Filter, Filtered, IdentifierPolicy,
    InsertBuilder, QueryError, SelectBuilder, Statement, UpdateBuilder,
};
pub use record::{Access, Field, Record, Structure};
pub use store::{Store, StoreTx};
pub use table::{RowMapper, Table};
pub use transactor::{Transaction, Transactor, TxHandle, TxState};
pub use value::{DecodeError, FromValue, Row, ToValue, Value, ValueKind};

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::{
        BuildStatement, Context, DataError, Filtered, Page, Pageable, Record, Row, Store, Table,
        ToValue, Transactor, TxState, Value,
    };
}
