use crate::value::{DecodeError, Row, Value};

/// Which statements a field takes part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadWrite,
    /// Never written by the client (e.g. server-generated identifiers).
    ReadOnly,
    /// Never projected by SELECT or RETURNING (e.g. secrets).
    WriteOnly,
}

/// A record field and the column it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub column: &'static str,
    pub access: Access,
}

impl Field {
    pub const fn new(name: &'static str, column: &'static str, access: Access) -> Self {
        Self {
            name,
            column,
            access,
        }
    }

    pub fn is_readable(&self) -> bool {
        !matches!(self.access, Access::WriteOnly)
    }

    pub fn is_writable(&self) -> bool {
        !matches!(self.access, Access::ReadOnly)
    }
}

/// A typed value representing one table row.
///
/// Usually derived with `#[derive(Record)]`; a manual implementation only has
/// to keep `values()` aligned with `fields()`.
///
/// ```ignore
/// impl Record for User {
///     fn fields() -> &'static [Field] {
///         const FIELDS: &[Field] = &[
///             Field::new("id", "id", Access::ReadOnly),
///             Field::new("name", "name", Access::ReadWrite),
///         ];
///         FIELDS
///     }
///     fn values(&self) -> Vec<Value> { vec![self.id.to_value(), self.name.to_value()] }
///     fn from_row(row: &Row) -> Result<Self, DecodeError> {
///         Ok(Self { id: row.get_lax("id")?, name: row.get_lax("name")? })
///     }
/// }
/// ```
pub trait Record: Sized + Send + Sync + 'static {
    /// Mapped fields in declaration order.
    fn fields() -> &'static [Field];

    /// Current field values, one per entry of [`Record::fields`].
    fn values(&self) -> Vec<Value>;

    /// Build a record from a row by column name. Columns absent from the row
    /// leave the field at its default.
    fn from_row(row: &Row) -> Result<Self, DecodeError>;
}

/// Field/column correspondence of a record type, split by access.
#[derive(Debug, Clone)]
pub struct Structure {
    fields: &'static [Field],
    read: Vec<&'static str>,
    write: Vec<usize>,
}

impl Structure {
    pub fn of<T: Record>() -> Self {
        let fields = T::fields();
        let read = fields
            .iter()
            .filter(|f| f.is_readable())
            .map(|f| f.column)
            .collect();
        let write = fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_writable())
            .map(|(i, _)| i)
            .collect();
        Self {
            fields,
            read,
            write,
        }
    }

    pub fn fields(&self) -> &'static [Field] {
        self.fields
    }

    /// Columns projected by SELECT and RETURNING.
    pub fn read_columns(&self) -> &[&'static str] {
        &self.read
    }

    /// Columns written by INSERT and UPDATE.
    pub fn write_columns(&self) -> Vec<&'static str> {
        self.write.iter().map(|&i| self.fields[i].column).collect()
    }

    /// Values of the written columns, aligned with [`Structure::write_columns`].
    pub fn write_values<T: Record>(&self, record: &T) -> Vec<Value> {
        let mut values: Vec<Option<Value>> = record.values().into_iter().map(Some).collect();
        debug_assert_eq!(values.len(), self.fields.len(), "Record::values out of sync with fields");
        self.write
            .iter()
            .filter_map(|&i| values.get_mut(i).and_then(Option::take))
            .collect()
    }

    /// `(column, value)` pairs of the written columns.
    pub fn write_pairs<T: Record>(&self, record: &T) -> Vec<(&'static str, Value)> {
        self.write_columns()
            .into_iter()
            .zip(self.write_values(record))
            .collect()
    }
}
