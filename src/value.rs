use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::data_type::BaseKind;

/// Runtime value of a single record field.
///
/// This enum is the bridge between user record types and the engine: column
/// storage, uniqueness checks, ordering and predicate activations all match on
/// it. Fields whose kind is not supported project to [Value::Unsupported].
///
/// Equality is kind-dispatched and exact: floats compare by bit pattern (so
/// `NaN == NaN` and `0.0 != -0.0`), timestamps compare by the instant they
/// represent, and values of different kinds are never equal.
#[derive(Debug, Clone)]
pub enum Value {
    /// A boolean value.
    Bool(bool),
    /// A signed integer, widened to 64 bits.
    Int(i64),
    /// An unsigned integer, widened to 64 bits.
    Uint(u64),
    /// A 64-bit floating-point value.
    Float(f64),
    /// A UTF-8 string value, wrapped in an [Arc] for cheap cloning between
    /// column storage and query activations.
    Text(Arc<str>),
    /// An instant in time.
    Timestamp(DateTime<Utc>),
    /// Placeholder for a field the engine does not inspect.
    Unsupported,
}

impl Value {
    /// Returns `true` if the value is [Value::Unsupported].
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported)
    }

    /// Returns the inner integer value if this is a [Value::Int].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the inner unsigned integer value if this is a [Value::Uint].
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Self::Uint(u) => Some(*u),
            _ => None,
        }
    }

    /// Returns the inner float value if this is a [Value::Float].
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns a reference to the inner string slice if this is a [Value::Text].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the inner boolean value if this is a [Value::Bool].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the inner instant if this is a [Value::Timestamp].
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Returns the [BaseKind] this value belongs to.
    pub fn kind(&self) -> BaseKind {
        match self {
            Self::Bool(_) => BaseKind::Bool,
            Self::Int(_) => BaseKind::Int,
            Self::Uint(_) => BaseKind::Uint,
            Self::Float(_) => BaseKind::Float,
            Self::Text(_) => BaseKind::Text,
            Self::Timestamp(_) => BaseKind::Timestamp,
            Self::Unsupported => BaseKind::Unsupported,
        }
    }

    // position of the kind when values of different kinds are ordered
    fn rank(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::Int(_) => 1,
            Self::Uint(_) => 2,
            Self::Float(_) => 3,
            Self::Text(_) => 4,
            Self::Timestamp(_) => 5,
            Self::Unsupported => 6,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(l), Self::Bool(r)) => l == r,
            (Self::Int(l), Self::Int(r)) => l == r,
            (Self::Uint(l), Self::Uint(r)) => l == r,
            (Self::Float(l), Self::Float(r)) => l.to_bits() == r.to_bits(),
            (Self::Text(l), Self::Text(r)) => l.as_bytes() == r.as_bytes(),
            (Self::Timestamp(l), Self::Timestamp(r)) => l == r,
            (Self::Unsupported, Self::Unsupported) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Bool(b) => b.hash(state),
            Self::Int(i) => i.hash(state),
            Self::Uint(u) => u.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::Text(s) => s.hash(state),
            Self::Timestamp(t) => t.hash(state),
            Self::Unsupported => {}
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Total order used by `ORDER BY`: values of the same kind compare naturally
/// (floats with [f64::total_cmp]), values of different kinds by kind.
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(l), Self::Bool(r)) => l.cmp(r),
            (Self::Int(l), Self::Int(r)) => l.cmp(r),
            (Self::Uint(l), Self::Uint(r)) => l.cmp(r),
            (Self::Float(l), Self::Float(r)) => l.total_cmp(r),
            (Self::Text(l), Self::Text(r)) => l.cmp(r),
            (Self::Timestamp(l), Self::Timestamp(r)) => l.cmp(r),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}
