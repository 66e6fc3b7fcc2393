//! # tablekit-sqlx: PostgreSQL store for tablekit
//!
//! Implements the [`Store`](tablekit_core::Store) driver seam on top of
//! [SQLx](https://github.com/launchbadge/sqlx).
//!
//! # What's in this crate
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PgStore`] | Pool-backed store; also recognises PostgreSQL errors for classification |
//! | [`PgTx`] | A live transaction; rolled back on drop |
//! | [`PgTxOptions`] | Isolation level, access mode and deferrability applied after `BEGIN` |
//! | [`DatabaseConfig`] | Pool and default transaction settings from `database.*` config keys |
//!
//! # Quick start
//!
//! ```ignore
//! use tablekit_core::{Config, Context, Opaque, Table, Transactor};
//! use tablekit_sqlx::{DatabaseConfig, PgStore, PgTxOptions, IsolationLevel};
//!
//! let config = Config::load("dev")?;
//! let store = PgStore::connect(&DatabaseConfig::from_config(&config)?).await?;
//! let transactor = Transactor::new(store);
//! let users: Table<User, PgStore> = Table::new("users", transactor.clone());
//!
//! // A serializable scope shared by every call made with `ctx`
//! let ctx = Context::new();
//! let opts = PgTxOptions::default().isolation(IsolationLevel::Serializable);
//! let scope = transactor.begin(&ctx, vec![Box::new(opts) as Opaque]).await?;
//! users.insert_one(&ctx, &user, true).await?;
//! scope.commit().await?;
//! ```
//!
//! # Error classification
//!
//! ```ignore
//! match users.insert_one(&ctx, &user, false).await {
//!     Err(err) if err
//!         .classify::<PgStore>()
//!         .is_some_and(|c| c.is_unique_violation(Some("email"))) => { /* taken */ }
//!     other => { other?; }
//! }
//! ```

mod bind;
pub mod config;
mod decode;
mod error;
pub mod options;
pub mod store;
pub mod tx;

pub use config::DatabaseConfig;
pub use options::{AccessMode, DeferrableMode, IsolationLevel, ParseOptionError, PgTxOptions};
pub use store::PgStore;
pub use tx::PgTx;

/// Re-exports of the most commonly used types from both `tablekit-core` and this crate.
pub mod prelude {
    pub use crate::{DatabaseConfig, IsolationLevel, PgStore, PgTxOptions};
    pub use tablekit_core::prelude::*;
}
