use chrono::{DateTime, Utc};
use std::error::Error;
use uuid::Uuid;

/// The type of a column value, used to bind typed NULL parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
    Bytes,
    Json,
    Uuid,
    Timestamp,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Bytes => "bytes",
            ValueKind::Json => "json",
            ValueKind::Uuid => "uuid",
            ValueKind::Timestamp => "timestamp",
        }
    }
}

/// A single bound argument or column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null(ValueKind),
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null(kind) => *kind,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Text(_) => ValueKind::Text,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Json(_) => ValueKind::Json,
            Value::Uuid(_) => ValueKind::Uuid,
            Value::Timestamp(_) => ValueKind::Timestamp,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }
}

/// A column value could not be converted into a record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub column: String,
    pub expected: &'static str,
    pub found: String,
}

impl DecodeError {
    pub fn new(column: impl Into<String>, expected: &'static str, found: &Value) -> Self {
        let found = if found.is_null() {
            "null".to_string()
        } else {
            found.kind().name().to_string()
        };
        Self {
            column: column.into(),
            expected,
            found,
        }
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot decode column '{}': expected {}, found {}",
            self.column, self.expected, self.found
        )
    }
}

impl Error for DecodeError {}

/// Conversion of a record field into a bound [`Value`].
pub trait ToValue {
    const KIND: ValueKind;

    fn to_value(&self) -> Value;
}

/// Conversion of a column [`Value`] into a record field.
pub trait FromValue: Sized {
    fn from_value(column: &str, value: &Value) -> Result<Self, DecodeError>;
}

macro_rules! int_value {
    ($($ty:ty),*) => {
        $(
            impl ToValue for $ty {
                const KIND: ValueKind = ValueKind::Int;

                fn to_value(&self) -> Value {
                    Value::Int(i64::from(*self))
                }
            }

            impl FromValue for $ty {
                fn from_value(column: &str, value: &Value) -> Result<Self, DecodeError> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(*i)
                            .map_err(|_| DecodeError::new(column, stringify!($ty), value)),
                        _ => Err(DecodeError::new(column, stringify!($ty), value)),
                    }
                }
            }
        )*
    };
}

int_value!(i16, i32, i64, u16, u32);

impl ToValue for f64 {
    const KIND: ValueKind = ValueKind::Float;

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl FromValue for f64 {
    fn from_value(column: &str, value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            _ => Err(DecodeError::new(column, "f64", value)),
        }
    }
}

impl ToValue for f32 {
    const KIND: ValueKind = ValueKind::Float;

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl FromValue for f32 {
    fn from_value(column: &str, value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Float(f) => Ok(*f as f32),
            _ => Err(DecodeError::new(column, "f32", value)),
        }
    }
}

impl ToValue for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FromValue for bool {
    fn from_value(column: &str, value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Bool(b) => Ok(*b),
            _ => Err(DecodeError::new(column, "bool", value)),
        }
    }
}

impl ToValue for String {
    const KIND: ValueKind = ValueKind::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl ToValue for &str {
    const KIND: ValueKind = ValueKind::Text;

    fn to_value(&self) -> Value {
        Value::Text((*self).to_string())
    }
}

impl FromValue for String {
    fn from_value(column: &str, value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            _ => Err(DecodeError::new(column, "String", value)),
        }
    }
}

impl ToValue for Vec<u8> {
    const KIND: ValueKind = ValueKind::Bytes;

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl FromValue for Vec<u8> {
    fn from_value(column: &str, value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            _ => Err(DecodeError::new(column, "Vec<u8>", value)),
        }
    }
}

impl ToValue for serde_json::Value {
    const KIND: ValueKind = ValueKind::Json;

    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }
}

impl FromValue for serde_json::Value {
    fn from_value(column: &str, value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Json(j) => Ok(j.clone()),
            Value::Null(_) => Ok(serde_json::Value::Null),
            _ => Err(DecodeError::new(column, "json", value)),
        }
    }
}

impl ToValue for Uuid {
    const KIND: ValueKind = ValueKind::Uuid;

    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }
}

impl FromValue for Uuid {
    fn from_value(column: &str, value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Uuid(u) => Ok(*u),
            Value::Text(s) => s
                .parse()
                .map_err(|_| DecodeError::new(column, "Uuid", value)),
            _ => Err(DecodeError::new(column, "Uuid", value)),
        }
    }
}

impl ToValue for DateTime<Utc> {
    const KIND: ValueKind = ValueKind::Timestamp;

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(column: &str, value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Timestamp(t) => Ok(*t),
            _ => Err(DecodeError::new(column, "DateTime<Utc>", value)),
        }
    }
}

impl<T: ToValue> ToValue for Option<T> {
    const KIND: ValueKind = T::KIND;

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null(T::KIND),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(column: &str, value: &Value) -> Result<Self, DecodeError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(column, value).map(Some)
        }
    }
}

impl ToValue for Value {
    // Only meaningful for typed NULLs of an unknown field; text is the
    // widest fallback.
    const KIND: ValueKind = ValueKind::Text;

    fn to_value(&self) -> Value {
        self.clone()
    }
}

/// One result row: column values addressable by name, in projection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column append, mostly useful in tests and custom stores.
    pub fn with(mut self, column: impl Into<String>, value: impl ToValue) -> Self {
        self.push(column, value.to_value());
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.columns.push((column.into(), value));
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Decode a column that must be present.
    pub fn try_get<T: FromValue>(&self, column: &str) -> Result<T, DecodeError> {
        match self.get(column) {
            Some(value) => T::from_value(column, value),
            None => Err(DecodeError {
                column: column.to_string(),
                expected: std::any::type_name::<T>(),
                found: "missing column".to_string(),
            }),
        }
    }

    /// Decode a column, falling back to `T::default()` when it was not projected.
    pub fn get_lax<T: FromValue + Default>(&self, column: &str) -> Result<T, DecodeError> {
        match self.get(column) {
            Some(value) => T::from_value(column, value),
            None => Ok(T::default()),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
