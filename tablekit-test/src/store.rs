use std::collections::VecDeque;
use std::error::Error;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tablekit_core::{BoxError, ClassifiedError, Inspect, Row, Statement, Store, StoreTx, Value};

/// Something the store was asked to do, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Begin { tx: u64, options: MemoryOptions },
    Query { tx: u64, sql: String, args: Vec<Value> },
    Execute { tx: u64, sql: String, args: Vec<Value> },
    Commit { tx: u64 },
    Rollback { tx: u64 },
    /// The transaction was dropped without commit or rollback.
    Discard { tx: u64 },
}

/// Transaction options understood by [`MemoryStore`]; only recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryOptions {
    pub isolation: String,
    pub read_only: bool,
}

impl Default for MemoryOptions {
    fn default() -> Self {
        Self {
            isolation: "read committed".to_string(),
            read_only: false,
        }
    }
}

/// A scripted answer to a statement.
#[derive(Debug, Clone)]
pub enum Response {
    Rows(Vec<Row>),
    Affected(u64),
    Error(MemoryDbError),
}

/// A database error raised by [`MemoryStore`], carrying a SQLSTATE code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryDbError {
    pub code: String,
    pub column: Option<String>,
    pub message: String,
}

impl MemoryDbError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            column: None,
            message: message.into(),
        }
    }

    pub fn unique_violation(column: &str) -> Self {
        Self {
            code: tablekit_core::classify::UNIQUE_VIOLATION.to_string(),
            column: Some(column.to_string()),
            message: format!("duplicate key value violates unique constraint on {column}"),
        }
    }

    /// A dropped connection (SQLSTATE `08006`).
    pub fn connection_failure(message: impl Into<String>) -> Self {
        Self::new("08006", message)
    }
}

impl std::fmt::Display for MemoryDbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (SQLSTATE {})", self.message, self.code)
    }
}

impl Error for MemoryDbError {}

type Handler = Arc<dyn Fn(&Statement) -> Option<Response> + Send + Sync>;

#[derive(Default)]
struct State {
    next_tx: u64,
    events: Vec<Event>,
    script: VecDeque<Response>,
    handler: Option<Handler>,
    fail_begin: Option<MemoryDbError>,
    fail_commit: Option<MemoryDbError>,
    fail_rollback: Option<MemoryDbError>,
    latency: Option<Duration>,
    begin_latency: Option<Duration>,
}

/// In-memory [`Store`] for tests.
///
/// Statements are answered by the scripted responses first (in order), then
/// by the handler, then by an empty result.
///
/// ```ignore
/// let store = MemoryStore::new();
/// store.push_rows(vec![Row::new().with("id", 1i64).with("name", "alice")]);
/// let users: Table<User, MemoryStore> = Table::new("users", Transactor::new(store.clone()));
/// users.find_all(&Context::new()).await?;
/// assert_eq!(store.commits(), 1);
/// ```
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking test must not wedge the other assertions.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push_rows(&self, rows: Vec<Row>) -> &Self {
        self.lock().script.push_back(Response::Rows(rows));
        self
    }

    pub fn push_affected(&self, count: u64) -> &Self {
        self.lock().script.push_back(Response::Affected(count));
        self
    }

    pub fn push_error(&self, err: MemoryDbError) -> &Self {
        self.lock().script.push_back(Response::Error(err));
        self
    }

    /// Answer statements the script does not cover. Returning `None` falls
    /// back to an empty result.
    pub fn with_handler<F>(&self, handler: F) -> &Self
    where
        F: Fn(&Statement) -> Option<Response> + Send + Sync + 'static,
    {
        self.lock().handler = Some(Arc::new(handler));
        self
    }

    pub fn fail_begin(&self, err: MemoryDbError) -> &Self {
        self.lock().fail_begin = Some(err);
        self
    }

    pub fn fail_commit(&self, err: MemoryDbError) -> &Self {
        self.lock().fail_commit = Some(err);
        self
    }

    pub fn fail_rollback(&self, err: MemoryDbError) -> &Self {
        self.lock().fail_rollback = Some(err);
        self
    }

    /// Delay every statement by `latency`.
    pub fn latency(&self, latency: Duration) -> &Self {
        self.lock().latency = Some(latency);
        self
    }

    /// Delay every begin by `latency`, after its `Begin` event is recorded.
    pub fn begin_latency(&self, latency: Duration) -> &Self {
        self.lock().begin_latency = Some(latency);
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.lock().events.clone()
    }

    /// SQL text of every statement run, queries and executes alike.
    pub fn statements(&self) -> Vec<String> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                Event::Query { sql, .. } | Event::Execute { sql, .. } => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn begins(&self) -> usize {
        self.count(|e| matches!(e, Event::Begin { .. }))
    }

    pub fn commits(&self) -> usize {
        self.count(|e| matches!(e, Event::Commit { .. }))
    }

    pub fn rollbacks(&self) -> usize {
        self.count(|e| matches!(e, Event::Rollback { .. }))
    }

    fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.lock().events.iter().filter(|e| pred(e)).count()
    }

    fn record(&self, event: Event) {
        self.lock().events.push(event);
    }

    fn respond(&self, statement: &Statement) -> Option<Response> {
        let handler = {
            let mut state = self.lock();
            if let Some(response) = state.script.pop_front() {
                return Some(response);
            }
            state.handler.clone()
        };
        handler.and_then(|h| h(statement))
    }

    async fn delay(&self) {
        let latency = self.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl Inspect for MemoryStore {
    fn inspect(err: &(dyn Error + 'static)) -> Option<ClassifiedError> {
        let db = err.downcast_ref::<MemoryDbError>()?;
        Some(ClassifiedError::new(&db.code, &db.message).with_column(db.column.clone()))
    }
}

impl Store for MemoryStore {
    type Options = MemoryOptions;
    type Tx = MemoryTx;

    fn begin(&self, options: MemoryOptions) -> impl Future<Output = Result<MemoryTx, BoxError>> + Send {
        let store = self.clone();
        async move {
            let (id, delay) = {
                let mut state = store.lock();
                if let Some(err) = state.fail_begin.clone() {
                    return Err(Box::new(err) as BoxError);
                }
                state.next_tx += 1;
                let id = state.next_tx;
                state.events.push(Event::Begin { tx: id, options });
                (id, state.begin_latency)
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok(MemoryTx {
                id,
                store,
                finished: false,
            })
        }
    }
}

/// A transaction handed out by [`MemoryStore`].
pub struct MemoryTx {
    id: u64,
    store: MemoryStore,
    finished: bool,
}

impl MemoryTx {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl StoreTx for MemoryTx {
    fn query(&mut self, statement: &Statement) -> impl Future<Output = Result<Vec<Row>, BoxError>> + Send {
        async move {
            self.store.record(Event::Query {
                tx: self.id,
                sql: statement.sql.clone(),
                args: statement.args.clone(),
            });
            self.store.delay().await;
            match self.store.respond(statement) {
                Some(Response::Rows(rows)) => Ok(rows),
                Some(Response::Error(err)) => Err(Box::new(err) as BoxError),
                Some(Response::Affected(_)) | None => Ok(Vec::new()),
            }
        }
    }

    fn execute(&mut self, statement: &Statement) -> impl Future<Output = Result<u64, BoxError>> + Send {
        async move {
            self.store.record(Event::Execute {
                tx: self.id,
                sql: statement.sql.clone(),
                args: statement.args.clone(),
            });
            self.store.delay().await;
            match self.store.respond(statement) {
                Some(Response::Affected(count)) => Ok(count),
                Some(Response::Rows(rows)) => Ok(rows.len() as u64),
                Some(Response::Error(err)) => Err(Box::new(err) as BoxError),
                None => Ok(0),
            }
        }
    }

    fn commit(mut self) -> impl Future<Output = Result<(), BoxError>> + Send {
        async move {
            self.finished = true;
            if let Some(err) = self.store.lock().fail_commit.clone() {
                return Err(Box::new(err) as BoxError);
            }
            self.store.record(Event::Commit { tx: self.id });
            Ok(())
        }
    }

    fn rollback(mut self) -> impl Future<Output = Result<(), BoxError>> + Send {
        async move {
            self.finished = true;
            self.store.record(Event::Rollback { tx: self.id });
            match self.store.lock().fail_rollback.clone() {
                Some(err) => Err(Box::new(err) as BoxError),
                None => Ok(()),
            }
        }
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if !self.finished {
            self.store.record(Event::Discard { tx: self.id });
        }
    }
}
