use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};

use crate::data_type::BaseKind;
use crate::value::Value;

/// A Rust type usable as a record field.
///
/// The implementation fixes the field's [BaseKind] and converts between the
/// field and its runtime [Value]. Types the engine does not inspect report
/// [BaseKind::Unsupported], project to [Value::Unsupported] and never accept
/// an assigned value.
pub trait Field {
    /// Kind of every value of this type.
    const KIND: BaseKind;

    /// Projects the field to its runtime value.
    fn to_value(&self) -> Value;

    /// Builds a field from a runtime value, or `None` if the value has another
    /// kind or is out of range for this type.
    fn from_value(value: &Value) -> Option<Self>
    where
        Self: Sized;
}

macro_rules! signed_field {
    ($($ty:ty),*) => {$(
        impl Field for $ty {
            const KIND: BaseKind = BaseKind::Int;

            fn to_value(&self) -> Value {
                Value::Int(*self as i64)
            }

            fn from_value(value: &Value) -> Option<Self> {
                value.as_int().and_then(|i| <$ty>::try_from(i).ok())
            }
        }
    )*};
}

macro_rules! unsigned_field {
    ($($ty:ty),*) => {$(
        impl Field for $ty {
            const KIND: BaseKind = BaseKind::Uint;

            fn to_value(&self) -> Value {
                Value::Uint(*self as u64)
            }

            fn from_value(value: &Value) -> Option<Self> {
                value.as_uint().and_then(|u| <$ty>::try_from(u).ok())
            }
        }
    )*};
}

signed_field!(i8, i16, i32, i64, isize);
unsigned_field!(u8, u16, u32, u64, usize);

impl Field for f32 {
    const KIND: BaseKind = BaseKind::Float;

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: &Value) -> Option<Self> {
        let wide = value.as_float()?;
        let narrow = wide as f32;
        // finite values past f32::MAX would turn into infinities
        (narrow.is_finite() || !wide.is_finite()).then_some(narrow)
    }
}

impl Field for f64 {
    const KIND: BaseKind = BaseKind::Float;

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_float()
    }
}

impl Field for bool {
    const KIND: BaseKind = BaseKind::Bool;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl Field for String {
    const KIND: BaseKind = BaseKind::Text;

    fn to_value(&self) -> Value {
        Value::Text(Arc::from(self.as_str()))
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl Field for Arc<str> {
    const KIND: BaseKind = BaseKind::Text;

    fn to_value(&self) -> Value {
        Value::Text(Arc::clone(self))
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(Arc::clone(s)),
            _ => None,
        }
    }
}

impl Field for DateTime<Utc> {
    const KIND: BaseKind = BaseKind::Timestamp;

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_timestamp()
    }
}

impl Field for SystemTime {
    const KIND: BaseKind = BaseKind::Timestamp;

    fn to_value(&self) -> Value {
        Value::Timestamp(DateTime::<Utc>::from(*self))
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_timestamp().map(SystemTime::from)
    }
}

// Composite types are carried by the record but never inspected.
macro_rules! unsupported_field {
    ($(impl<$($param:ident),*> for $ty:ty;)*) => {$(
        impl<$($param),*> Field for $ty {
            const KIND: BaseKind = BaseKind::Unsupported;

            fn to_value(&self) -> Value {
                Value::Unsupported
            }

            fn from_value(_: &Value) -> Option<Self> {
                None
            }
        }
    )*};
}

unsupported_field! {
    impl<T> for Vec<T>;
    impl<T> for Option<T>;
    impl<T> for Box<T>;
    impl<T> for HashSet<T>;
    impl<K, V> for HashMap<K, V>;
    impl<K, V> for BTreeMap<K, V>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_kinds() {
        assert_eq!(<i8 as Field>::KIND, BaseKind::Int);
        assert_eq!(<isize as Field>::KIND, BaseKind::Int);
        assert_eq!(<u16 as Field>::KIND, BaseKind::Uint);
        assert_eq!(<usize as Field>::KIND, BaseKind::Uint);
        assert_eq!((-3i16).to_value(), Value::Int(-3));
        assert_eq!(7u8.to_value(), Value::Uint(7));
    }

    #[test]
    fn test_from_value_checks_range_and_kind() {
        assert_eq!(u8::from_value(&Value::Uint(255)), Some(255));
        assert_eq!(u8::from_value(&Value::Uint(256)), None);
        assert_eq!(i32::from_value(&Value::Uint(1)), None);
        assert_eq!(i32::from_value(&Value::Int(-5)), Some(-5));
        assert_eq!(String::from_value(&Value::Bool(true)), None);
        assert_eq!(
            String::from_value(&Value::Text("abc".into())),
            Some("abc".to_string())
        );
    }

    #[test]
    fn test_f32_rejects_out_of_range() {
        assert_eq!(f32::from_value(&Value::Float(0.5)), Some(0.5));
        assert_eq!(f32::from_value(&Value::Float(1e300)), None);
        assert_eq!(f32::from_value(&Value::Float(-1e300)), None);
        assert_eq!(f32::from_value(&Value::Float(f64::INFINITY)), Some(f32::INFINITY));
        assert!(f32::from_value(&Value::Float(f64::NAN)).unwrap().is_nan());
        assert_eq!(f32::from_value(&Value::Int(1)), None);
    }

    #[test]
    fn test_timestamps() {
        let now = SystemTime::now();
        let value = now.to_value();
        assert_eq!(value.kind(), BaseKind::Timestamp);
        assert_eq!(SystemTime::from_value(&value), Some(now));

        let utc = Utc::now();
        assert_eq!(DateTime::<Utc>::from_value(&utc.to_value()), Some(utc));
    }

    #[test]
    fn test_composites_are_unsupported() {
        assert_eq!(<Vec<i64> as Field>::KIND, BaseKind::Unsupported);
        assert_eq!(<Option<String> as Field>::KIND, BaseKind::Unsupported);
        assert_eq!(<HashMap<String, i64> as Field>::KIND, BaseKind::Unsupported);
        assert!(vec![1, 2, 3].to_value().is_unsupported());
        assert_eq!(<Vec<i64> as Field>::from_value(&Value::Int(1)), None);
    }
}
