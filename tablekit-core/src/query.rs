//! Fluent builders for parameterized single-table statements.
//!
//! Each builder renders to a [`Statement`]: SQL text with dialect-specific
//! placeholders plus the positional arguments bound to them.
//!
//! # Example
//!
//! ```ignore
//! let mut sb = SelectBuilder::new("users", Dialect::Postgres);
//! sb.columns(["id", "name"])
//!     .where_eq("email", "a@b.com")
//!     .where_like("name", "%alice%")
//!     .order_by("id", true)
//!     .limit(10);
//! let stmt = sb.build()?;
//! ```

use crate::value::{ToValue, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Generic SQL using `?` placeholders (default).
    Generic,
    /// SQLite-style `?` placeholders.
    Sqlite,
    /// MySQL-style `?` placeholders with backtick quoting.
    MySql,
    /// Postgres-style `$1, $2, ...` placeholders.
    Postgres,
}

impl Dialect {
    fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Generic | Dialect::Sqlite | Dialect::MySql => "?".to_string(),
        }
    }

    fn quote_char(self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Generic | Dialect::Sqlite | Dialect::Postgres => '"',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierPolicy {
    /// Do not validate or quote identifiers.
    Raw,
    /// Validate identifiers against a conservative pattern.
    Validate,
    /// Validate and quote identifiers using the dialect quoting style.
    Quote,
}

/// A rendered statement: SQL text and its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

/// Anything that renders to a parameterized [`Statement`].
pub trait BuildStatement {
    fn build(&self) -> Result<Statement, QueryError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    InvalidIdentifier { kind: &'static str, ident: String },
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::InvalidIdentifier { kind, ident } => {
                write!(f, "Invalid {kind} identifier: {ident}")
            }
        }
    }
}

impl std::error::Error for QueryError {}

/// Identifier formatting and placeholder numbering shared by all builders.
#[derive(Debug, Clone, Copy)]
struct Syntax {
    dialect: Dialect,
    policy: IdentifierPolicy,
}

impl Syntax {
    fn ident(&self, ident: &str, allow_star: bool, kind: &'static str) -> Result<String, QueryError> {
        if matches!(self.policy, IdentifierPolicy::Raw) {
            return Ok(ident.to_string());
        }
        if !is_valid_identifier(ident, allow_star) {
            return Err(QueryError::InvalidIdentifier {
                kind,
                ident: ident.to_string(),
            });
        }
        match self.policy {
            IdentifierPolicy::Quote => Ok(quote_identifier(ident, self.dialect, allow_star)),
            IdentifierPolicy::Raw | IdentifierPolicy::Validate => Ok(ident.to_string()),
        }
    }

    fn column_list(&self, columns: &[String]) -> Result<String, QueryError> {
        let mut out = Vec::with_capacity(columns.len());
        for col in columns {
            out.push(self.ident(col, true, "column")?);
        }
        Ok(out.join(", "))
    }
}

/// Accumulates arguments and hands out the matching placeholders.
struct Binder {
    dialect: Dialect,
    args: Vec<Value>,
}

impl Binder {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            args: Vec::new(),
        }
    }

    fn bind(&mut self, value: &Value) -> String {
        self.args.push(value.clone());
        self.dialect.placeholder(self.args.len())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Eq(String, Value),
    NotEq(String, Value),
    Like(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    In(String, Vec<Value>),
    IsNull(String),
    IsNotNull(String),
}

/// WHERE predicates, joined with `AND`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    fn render(&self, syntax: &Syntax, binder: &mut Binder, sql: &mut String) -> Result<(), QueryError> {
        if self.conditions.is_empty() {
            return Ok(());
        }
        sql.push_str(" WHERE ");
        let mut first = true;
        for cond in &self.conditions {
            if !first {
                sql.push_str(" AND ");
            }
            first = false;
            let (col, op, val) = match cond {
                Condition::Eq(col, val) => (col, "=", val),
                Condition::NotEq(col, val) => (col, "!=", val),
                Condition::Like(col, val) => (col, "LIKE", val),
                Condition::Gt(col, val) => (col, ">", val),
                Condition::Gte(col, val) => (col, ">=", val),
                Condition::Lt(col, val) => (col, "<", val),
                Condition::Lte(col, val) => (col, "<=", val),
                // `IN ()` is invalid SQL; an empty set matches nothing.
                Condition::In(_, vals) if vals.is_empty() => {
                    sql.push_str("1 = 0");
                    continue;
                }
                Condition::In(col, vals) => {
                    let col = syntax.ident(col, false, "column")?;
                    let placeholders: Vec<_> = vals.iter().map(|v| binder.bind(v)).collect();
                    sql.push_str(&format!("{col} IN ({})", placeholders.join(", ")));
                    continue;
                }
                Condition::IsNull(col) => {
                    let col = syntax.ident(col, false, "column")?;
                    sql.push_str(&format!("{col} IS NULL"));
                    continue;
                }
                Condition::IsNotNull(col) => {
                    let col = syntax.ident(col, false, "column")?;
                    sql.push_str(&format!("{col} IS NOT NULL"));
                    continue;
                }
            };
            let col = syntax.ident(col, false, "column")?;
            let placeholder = binder.bind(val);
            sql.push_str(&format!("{col} {op} {placeholder}"));
        }
        Ok(())
    }
}

/// Predicate methods shared by every builder that has a WHERE clause.
pub trait Filtered {
    fn filter_mut(&mut self) -> &mut Filter;

    fn where_eq(&mut self, column: &str, value: impl ToValue) -> &mut Self {
        self.filter_mut().conditions.push(Condition::Eq(column.to_string(), value.to_value()));
        self
    }

    fn where_not_eq(&mut self, column: &str, value: impl ToValue) -> &mut Self {
        self.filter_mut().conditions.push(Condition::NotEq(column.to_string(), value.to_value()));
        self
    }

    fn where_like(&mut self, column: &str, pattern: impl ToValue) -> &mut Self {
        self.filter_mut().conditions.push(Condition::Like(column.to_string(), pattern.to_value()));
        self
    }

    fn where_gt(&mut self, column: &str, value: impl ToValue) -> &mut Self {
        self.filter_mut().conditions.push(Condition::Gt(column.to_string(), value.to_value()));
        self
    }

    fn where_gte(&mut self, column: &str, value: impl ToValue) -> &mut Self {
        self.filter_mut().conditions.push(Condition::Gte(column.to_string(), value.to_value()));
        self
    }

    fn where_lt(&mut self, column: &str, value: impl ToValue) -> &mut Self {
        self.filter_mut().conditions.push(Condition::Lt(column.to_string(), value.to_value()));
        self
    }

    fn where_lte(&mut self, column: &str, value: impl ToValue) -> &mut Self {
        self.filter_mut().conditions.push(Condition::Lte(column.to_string(), value.to_value()));
        self
    }

    fn where_in<V: ToValue>(&mut self, column: &str, values: impl IntoIterator<Item = V>) -> &mut Self {
        let values = values.into_iter().map(|v| v.to_value()).collect();
        self.filter_mut().conditions.push(Condition::In(column.to_string(), values));
        self
    }

    fn where_null(&mut self, column: &str) -> &mut Self {
        self.filter_mut().conditions.push(Condition::IsNull(column.to_string()));
        self
    }

    fn where_not_null(&mut self, column: &str) -> &mut Self {
        self.filter_mut().conditions.push(Condition::IsNotNull(column.to_string()));
        self
    }
}

fn collect_columns<I, C>(columns: I) -> Vec<String>
where
    I: IntoIterator<Item = C>,
    C: AsRef<str>,
{
    columns.into_iter().map(|c| c.as_ref().to_string()).collect()
}

fn render_returning(syntax: &Syntax, returning: &[String], sql: &mut String) -> Result<(), QueryError> {
    if !returning.is_empty() {
        sql.push_str(" RETURNING ");
        sql.push_str(&syntax.column_list(returning)?);
    }
    Ok(())
}

macro_rules! builder_common {
    ($builder:ty) => {
        impl $builder {
            /// Configure identifier validation/quoting behavior.
            pub fn identifier_policy(&mut self, policy: IdentifierPolicy) -> &mut Self {
                self.syntax.policy = policy;
                self
            }

            pub fn table(&self) -> &str {
                &self.table
            }
        }
    };
}

/// `SELECT <columns> FROM <table> [WHERE ...] [ORDER BY ...] [LIMIT n] [OFFSET n]`
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    table: String,
    columns: Vec<String>,
    filter: Filter,
    order: Vec<(String, bool)>,
    limit_val: Option<u64>,
    offset_val: Option<u64>,
    syntax: Syntax,
}

builder_common!(SelectBuilder);

impl SelectBuilder {
    pub fn new(table: &str, dialect: Dialect) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            filter: Filter::default(),
            order: Vec::new(),
            limit_val: None,
            offset_val: None,
            syntax: Syntax {
                dialect,
                policy: IdentifierPolicy::Raw,
            },
        }
    }

    /// Replace the projected columns. An empty projection renders `*`.
    pub fn columns<I, C>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<str>,
    {
        self.columns = collect_columns(columns);
        self
    }

    pub fn order_by(&mut self, column: &str, ascending: bool) -> &mut Self {
        self.order.push((column.to_string(), ascending));
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit_val = Some(limit);
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.offset_val = Some(offset);
        self
    }

    /// Drop ordering, limit and offset, keeping only the predicates.
    pub(crate) fn into_count(self) -> CountBuilder {
        CountBuilder {
            table: self.table,
            filter: self.filter,
            syntax: self.syntax,
        }
    }

    fn append_order(&self, sql: &mut String) -> Result<(), QueryError> {
        if self.order.is_empty() {
            return Ok(());
        }
        sql.push_str(" ORDER BY ");
        let mut clauses = Vec::with_capacity(self.order.len());
        for (col, asc) in &self.order {
            let col = self.syntax.ident(col, false, "column")?;
            if *asc {
                clauses.push(format!("{col} ASC"));
            } else {
                clauses.push(format!("{col} DESC"));
            }
        }
        sql.push_str(&clauses.join(", "));
        Ok(())
    }

    fn append_limit_offset(&self, sql: &mut String) {
        if let Some(limit) = self.limit_val {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset_val {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
    }
}

impl Filtered for SelectBuilder {
    fn filter_mut(&mut self) -> &mut Filter {
        &mut self.filter
    }
}

impl BuildStatement for SelectBuilder {
    fn build(&self) -> Result<Statement, QueryError> {
        let table = self.syntax.ident(&self.table, false, "table")?;
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.syntax.column_list(&self.columns)?
        };
        let mut sql = format!("SELECT {columns} FROM {table}");
        let mut binder = Binder::new(self.syntax.dialect);
        self.filter.render(&self.syntax, &mut binder, &mut sql)?;
        self.append_order(&mut sql)?;
        self.append_limit_offset(&mut sql);
        Ok(Statement {
            sql,
            args: binder.args,
        })
    }
}

/// `SELECT COUNT(*) FROM <table> [WHERE ...]`
#[derive(Debug, Clone)]
pub struct CountBuilder {
    table: String,
    filter: Filter,
    syntax: Syntax,
}

builder_common!(CountBuilder);

impl CountBuilder {
    pub fn new(table: &str, dialect: Dialect) -> Self {
        SelectBuilder::new(table, dialect).into_count()
    }
}

impl Filtered for CountBuilder {
    fn filter_mut(&mut self) -> &mut Filter {
        &mut self.filter
    }
}

impl BuildStatement for CountBuilder {
    fn build(&self) -> Result<Statement, QueryError> {
        let table = self.syntax.ident(&self.table, false, "table")?;
        let mut sql = format!("SELECT COUNT(*) AS count FROM {table}");
        let mut binder = Binder::new(self.syntax.dialect);
        self.filter.render(&self.syntax, &mut binder, &mut sql)?;
        Ok(Statement {
            sql,
            args: binder.args,
        })
    }
}

/// `INSERT INTO <table> (<columns>) VALUES (...), (...) [RETURNING ...]`
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    returning: Vec<String>,
    syntax: Syntax,
}

builder_common!(InsertBuilder);

impl InsertBuilder {
    pub fn new(table: &str, dialect: Dialect) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            rows: Vec::new(),
            returning: Vec::new(),
            syntax: Syntax {
                dialect,
                policy: IdentifierPolicy::Raw,
            },
        }
    }

    pub fn columns<I, C>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<str>,
    {
        self.columns = collect_columns(columns);
        self
    }

    /// Append one row of values, in column order.
    pub fn values(&mut self, values: Vec<Value>) -> &mut Self {
        self.rows.push(values);
        self
    }

    pub fn returning<I, C>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<str>,
    {
        self.returning = collect_columns(columns);
        self
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }
}

impl BuildStatement for InsertBuilder {
    fn build(&self) -> Result<Statement, QueryError> {
        let table = self.syntax.ident(&self.table, false, "table")?;
        let columns = self.syntax.column_list(&self.columns)?;
        let mut binder = Binder::new(self.syntax.dialect);
        let rows: Vec<String> = self
            .rows
            .iter()
            .map(|row| {
                let placeholders: Vec<_> = row.iter().map(|v| binder.bind(v)).collect();
                format!("({})", placeholders.join(", "))
            })
            .collect();
        let mut sql = format!("INSERT INTO {table} ({columns}) VALUES {}", rows.join(", "));
        render_returning(&self.syntax, &self.returning, &mut sql)?;
        Ok(Statement {
            sql,
            args: binder.args,
        })
    }
}

/// `UPDATE <table> SET col = ?, ... [WHERE ...] [RETURNING ...]`
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    table: String,
    assignments: Vec<(String, Value)>,
    filter: Filter,
    returning: Vec<String>,
    syntax: Syntax,
}

builder_common!(UpdateBuilder);

impl UpdateBuilder {
    pub fn new(table: &str, dialect: Dialect) -> Self {
        Self {
            table: table.to_string(),
            assignments: Vec::new(),
            filter: Filter::default(),
            returning: Vec::new(),
            syntax: Syntax {
                dialect,
                policy: IdentifierPolicy::Raw,
            },
        }
    }

    /// Assign `column`, replacing any earlier assignment to the same column.
    pub fn set(&mut self, column: &str, value: impl ToValue) -> &mut Self {
        let value = value.to_value();
        match self.assignments.iter_mut().find(|(col, _)| col == column) {
            Some((_, existing)) => *existing = value,
            None => self.assignments.push((column.to_string(), value)),
        }
        self
    }

    /// Remove the assignment to `column`, if any.
    pub fn unset(&mut self, column: &str) -> &mut Self {
        self.assignments.retain(|(col, _)| col != column);
        self
    }

    pub fn num_assignment(&self) -> usize {
        self.assignments.len()
    }

    pub fn returning<I, C>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<str>,
    {
        self.returning = collect_columns(columns);
        self
    }
}

impl Filtered for UpdateBuilder {
    fn filter_mut(&mut self) -> &mut Filter {
        &mut self.filter
    }
}

impl BuildStatement for UpdateBuilder {
    fn build(&self) -> Result<Statement, QueryError> {
        let table = self.syntax.ident(&self.table, false, "table")?;
        let mut binder = Binder::new(self.syntax.dialect);
        let mut sets = Vec::with_capacity(self.assignments.len());
        for (col, val) in &self.assignments {
            let col = self.syntax.ident(col, false, "column")?;
            sets.push(format!("{col} = {}", binder.bind(val)));
        }
        let mut sql = format!("UPDATE {table} SET {}", sets.join(", "));
        self.filter.render(&self.syntax, &mut binder, &mut sql)?;
        render_returning(&self.syntax, &self.returning, &mut sql)?;
        Ok(Statement {
            sql,
            args: binder.args,
        })
    }
}

/// `DELETE FROM <table> [WHERE ...] [RETURNING ...]`
#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    table: String,
    filter: Filter,
    returning: Vec<String>,
    syntax: Syntax,
}

builder_common!(DeleteBuilder);

impl DeleteBuilder {
    pub fn new(table: &str, dialect: Dialect) -> Self {
        Self {
            table: table.to_string(),
            filter: Filter::default(),
            returning: Vec::new(),
            syntax: Syntax {
                dialect,
                policy: IdentifierPolicy::Raw,
            },
        }
    }

    pub fn num_condition(&self) -> usize {
        self.filter.len()
    }

    pub fn returning<I, C>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<str>,
    {
        self.returning = collect_columns(columns);
        self
    }
}

impl Filtered for DeleteBuilder {
    fn filter_mut(&mut self) -> &mut Filter {
        &mut self.filter
    }
}

impl BuildStatement for DeleteBuilder {
    fn build(&self) -> Result<Statement, QueryError> {
        let table = self.syntax.ident(&self.table, false, "table")?;
        let mut sql = format!("DELETE FROM {table}");
        let mut binder = Binder::new(self.syntax.dialect);
        self.filter.render(&self.syntax, &mut binder, &mut sql)?;
        render_returning(&self.syntax, &self.returning, &mut sql)?;
        Ok(Statement {
            sql,
            args: binder.args,
        })
    }
}

fn is_valid_identifier(ident: &str, allow_star: bool) -> bool {
    if ident.is_empty() {
        return false;
    }
    let parts: Vec<&str> = ident.split('.').collect();
    for (idx, part) in parts.iter().enumerate() {
        if allow_star && *part == "*" {
            return idx + 1 == parts.len();
        }
        if !is_valid_segment(part) {
            return false;
        }
    }
    true
}

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote_identifier(ident: &str, dialect: Dialect, allow_star: bool) -> String {
    let quote = dialect.quote_char();
    let parts: Vec<&str> = ident.split('.').collect();
    let last_idx = parts.len().saturating_sub(1);
    parts
        .into_iter()
        .enumerate()
        .map(|(idx, part)| {
            if allow_star && part == "*" && idx == last_idx {
                part.to_string()
            } else {
                format!("{quote}{part}{quote}")
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}
