use crate::config::DatabaseConfig;
use crate::options::PgTxOptions;
use crate::tx::PgTx;
use sqlx::PgPool;
use std::error::Error;
use std::future::Future;
use tablekit_core::{BoxError, ClassifiedError, Inspect, Store};

/// Pool-backed PostgreSQL [`Store`].
///
/// ```ignore
/// let store = PgStore::connect(&DatabaseConfig::from_config(&config)?).await?;
/// let transactor = Transactor::new(store);
/// ```
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    default_options: PgTxOptions,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            default_options: PgTxOptions::default(),
        }
    }

    /// Open a pool sized and timed out per `config`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = config.pool_options().connect(&config.url).await?;
        tracing::info!(
            max_connections = config.max_connections,
            default_options = %config.tx_options,
            "postgres pool ready"
        );
        Ok(Self {
            pool,
            default_options: config.tx_options,
        })
    }

    /// Options applied when a transaction is begun without explicit ones.
    pub fn with_default_options(mut self, options: PgTxOptions) -> Self {
        self.default_options = options;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Inspect for PgStore {
    fn inspect(err: &(dyn Error + 'static)) -> Option<ClassifiedError> {
        crate::error::inspect(err)
    }
}

impl Store for PgStore {
    type Options = PgTxOptions;
    type Tx = PgTx;

    fn default_options(&self) -> PgTxOptions {
        self.default_options
    }

    fn begin(&self, options: PgTxOptions) -> impl Future<Output = Result<PgTx, BoxError>> + Send {
        let pool = self.pool.clone();
        async move {
            let mut tx = pool.begin().await?;
            let set = options.statement();
            sqlx::query(&set).execute(&mut *tx).await?;
            tracing::debug!(options = %options, "postgres transaction begun");
            Ok(PgTx(tx))
        }
    }
}
