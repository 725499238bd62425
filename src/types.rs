//! SQL value types shared between the generator and the evaluation VM

use std::fmt;

// ============================================================================
// SQL Types
// ============================================================================

/// Declared SQL type of an expression
///
/// Operand values on the evaluation stack are tagged, so the declared type
/// is only consulted when materializing a result into an output slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    /// Three-valued boolean
    Boolean,
    /// 64-bit signed integer
    BigInt,
    /// 64-bit IEEE float
    Double,
    /// UTF-8 string
    Varchar,
    /// Binary blob
    Varbinary,
}

impl SqlType {
    /// Get the type name as it appears in EXPLAIN output
    pub fn name(&self) -> &'static str {
        match self {
            SqlType::Boolean => "boolean",
            SqlType::BigInt => "bigint",
            SqlType::Double => "double",
            SqlType::Varchar => "varchar",
            SqlType::Varbinary => "varbinary",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Runtime Values
// ============================================================================

/// A single SQL scalar value
///
/// `Null` is a distinct variant so that discarding an unused value never
/// needs to know its physical width.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Boolean value
    Boolean(bool),
    /// 64-bit integer
    BigInt(i64),
    /// 64-bit float
    Double(f64),
    /// Text string
    Varchar(String),
    /// Binary blob
    Varbinary(Vec<u8>),
}

impl Value {
    /// Check if the value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Interpret the value as a boolean, if it is one
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the SQL type of this value, if it has one
    pub fn sql_type(&self) -> Option<SqlType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(SqlType::Boolean),
            Value::BigInt(_) => Some(SqlType::BigInt),
            Value::Double(_) => Some(SqlType::Double),
            Value::Varchar(_) => Some(SqlType::Varchar),
            Value::Varbinary(_) => Some(SqlType::Varbinary),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Value::BigInt(i) => write!(f, "{}", i),
            Value::Double(r) => write!(f, "{}", r),
            Value::Varchar(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Varbinary(b) => write!(f, "x'{}'", hex::encode(b)),
        }
    }
}

// ============================================================================
// Datum
// ============================================================================

/// A (value, is-null) pair: the result of evaluating one expression
///
/// When `is_null` is set the carried value is a placeholder and must not be
/// interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct Datum {
    /// The produced value (meaningless when `is_null` is set)
    pub value: Value,
    /// Whether the logical result is NULL
    pub is_null: bool,
}

impl Datum {
    /// Create a non-null datum
    pub fn of(value: Value) -> Self {
        Self {
            value,
            is_null: false,
        }
    }

    /// Create a boolean datum
    pub fn boolean(b: bool) -> Self {
        Self::of(Value::Boolean(b))
    }

    /// Create a NULL datum
    pub fn null() -> Self {
        Self {
            value: Value::Null,
            is_null: true,
        }
    }

    /// Interpret as a three-valued boolean: Some(b) or None for NULL
    pub fn as_tristate(&self) -> Option<bool> {
        if self.is_null {
            None
        } else {
            self.value.as_bool()
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null {
            write!(f, "NULL")
        } else {
            write!(f, "{}", self.value)
        }
    }
}
