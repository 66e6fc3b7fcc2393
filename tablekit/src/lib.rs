//! tablekit: typed table access over context-scoped SQL transactions.
//!
//! This facade crate re-exports the tablekit sub-crates through a single
//! dependency with feature flags. Import everything you need with:
//!
//! ```ignore
//! use tablekit::prelude::*;
//! ```
//!
//! # Feature flags
//!
//! | Feature      | Default | Crate                      |
//! |--------------|---------|----------------------------|
//! | `postgres`   | no      | `tablekit-sqlx` (`PgStore`) |
//! | `test-utils` | no      | `tablekit-test` (`MemoryStore`) |
//!
//! # Example
//!
//! ```ignore
//! use tablekit::prelude::*;
//! use tablekit::tablekit_sqlx::{DatabaseConfig, PgStore};
//!
//! #[derive(Record, Debug, Default)]
//! struct Account {
//!     #[column(read_only)]
//!     id: i64,
//!     email: String,
//! }
//!
//! let config = Config::load("dev")?;
//! let store = PgStore::connect(&DatabaseConfig::from_config(&config)?).await?;
//! let accounts: Table<Account, PgStore> = Table::new("accounts", Transactor::new(store));
//! let all = accounts.find_all(&Context::new()).await?;
//! ```

// The derive macro uses `proc-macro-crate` to detect whether the user depends
// on `tablekit` (facade) or `tablekit-core`, and generates paths accordingly.
pub extern crate tablekit_core;
pub extern crate tablekit_macros;

pub use tablekit_core::*;
pub use tablekit_macros::Record;

#[cfg(feature = "postgres")]
pub use tablekit_sqlx;

#[cfg(feature = "test-utils")]
pub use tablekit_test;

use tracing_subscriber::EnvFilter;

/// Initialise the global `tracing` subscriber with a standard `fmt` layer.
///
/// Respects `RUST_LOG`; falls back to `default_filter` (for instance
/// `"info,tablekit_core=debug"` to see every statement) when it is unset or
/// invalid. Returns `false` if a global subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

pub mod prelude {
    //! Re-exports of the most commonly used types and the `Record` derive.
    pub use tablekit_core::prelude::*;
    pub use tablekit_core::{Config, Opaque};
    pub use tablekit_macros::Record;

    #[cfg(feature = "postgres")]
    pub use tablekit_sqlx::{DatabaseConfig, PgStore, PgTxOptions};
}
