//! Native PostgreSQL transaction options.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    Serializable,
    RepeatableRead,
    #[default]
    ReadCommitted,
    ReadUncommitted,
}

impl IsolationLevel {
    pub fn as_sql(self) -> &'static str {
        match self {
            IsolationLevel::Serializable => "SERIALIZABLE",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
        }
    }
}

/// Unrecognised option text, e.g. from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptionError(String);

impl fmt::Display for ParseOptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown isolation level: {}", self.0)
    }
}

impl std::error::Error for ParseOptionError {}

impl FromStr for IsolationLevel {
    type Err = ParseOptionError;

    /// Accepts `read_committed`, `read committed`, `READ-COMMITTED` and so on.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "serializable" => Ok(IsolationLevel::Serializable),
            "repeatable_read" => Ok(IsolationLevel::RepeatableRead),
            "read_committed" => Ok(IsolationLevel::ReadCommitted),
            "read_uncommitted" => Ok(IsolationLevel::ReadUncommitted),
            _ => Err(ParseOptionError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    #[default]
    ReadWrite,
    ReadOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeferrableMode {
    #[default]
    NotDeferrable,
    Deferrable,
}

/// Options applied with `SET TRANSACTION` right after `BEGIN`.
///
/// The default is read committed, read write, not deferrable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PgTxOptions {
    pub isolation: IsolationLevel,
    pub access_mode: AccessMode,
    pub deferrable: DeferrableMode,
}

impl PgTxOptions {
    pub fn isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.access_mode = AccessMode::ReadOnly;
        self
    }

    pub fn deferrable(mut self) -> Self {
        self.deferrable = DeferrableMode::Deferrable;
        self
    }

    /// The `SET TRANSACTION` statement for these options.
    pub fn statement(&self) -> String {
        format!("SET TRANSACTION {self}")
    }
}

impl fmt::Display for PgTxOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let access = match self.access_mode {
            AccessMode::ReadWrite => "READ WRITE",
            AccessMode::ReadOnly => "READ ONLY",
        };
        let deferrable = match self.deferrable {
            DeferrableMode::NotDeferrable => "NOT DEFERRABLE",
            DeferrableMode::Deferrable => "DEFERRABLE",
        };
        write!(
            f,
            "ISOLATION LEVEL {}, {access}, {deferrable}",
            self.isolation.as_sql()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_statement() {
        assert_eq!(
            PgTxOptions::default().statement(),
            "SET TRANSACTION ISOLATION LEVEL READ COMMITTED, READ WRITE, NOT DEFERRABLE"
        );
    }

    #[test]
    fn test_custom_statement() {
        let opts = PgTxOptions::default()
            .isolation(IsolationLevel::Serializable)
            .read_only()
            .deferrable();
        assert_eq!(
            opts.statement(),
            "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE, READ ONLY, DEFERRABLE"
        );
    }

    #[test]
    fn test_parse_isolation() {
        assert_eq!("repeatable read".parse(), Ok(IsolationLevel::RepeatableRead));
        assert_eq!("READ-COMMITTED".parse(), Ok(IsolationLevel::ReadCommitted));
        assert!("snapshot".parse::<IsolationLevel>().is_err());
    }
}
