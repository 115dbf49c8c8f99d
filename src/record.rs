//! Type introspection for record types.
//!
//! [Reflect] describes the shape of any type; [Record] adds runtime access to
//! the fields of a record type. Both are usually produced by the
//! [record!](crate::record) macro, but can be written by hand:
//!
//! ```
//! use sqlfly::{BaseKind, Field, FieldInfo, Record, Reflect, TypeInfo, Value};
//!
//! struct Point {
//!     x: i64,
//!     y: i64,
//!     label: String,
//! }
//!
//! impl Reflect for Point {
//!     fn type_info() -> TypeInfo {
//!         TypeInfo::Record {
//!             name: "Point",
//!             fields: vec![
//!                 FieldInfo::visible("x", BaseKind::Int),
//!                 FieldInfo::visible("y", BaseKind::Int),
//!                 FieldInfo::hidden("label", BaseKind::Text),
//!             ],
//!         }
//!     }
//! }
//!
//! impl Record for Point {
//!     fn values(&self) -> Vec<Value> {
//!         vec![self.x.to_value(), self.y.to_value(), self.label.to_value()]
//!     }
//!
//!     fn set_value(&mut self, index: usize, value: &Value) -> bool {
//!         match index {
//!             0 => i64::from_value(value).map(|v| self.x = v).is_some(),
//!             1 => i64::from_value(value).map(|v| self.y = v).is_some(),
//!             2 => String::from_value(value).map(|v| self.label = v).is_some(),
//!             _ => false,
//!         }
//!     }
//! }
//! ```

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};

use crate::data_type::BaseKind;
use crate::field::Field;
use crate::schema::schema_of;
use crate::value::Value;

/// Description of one field of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Field name, used as the column name.
    pub name: &'static str,
    /// Kind of the field's type.
    pub kind: BaseKind,
    /// Whether the field is exposed as a column. Hidden fields are stored with
    /// the record but never constrained or queried.
    pub visible: bool,
}

impl FieldInfo {
    /// A field exposed as a column.
    pub const fn visible(name: &'static str, kind: BaseKind) -> Self {
        Self {
            name,
            kind,
            visible: true,
        }
    }

    /// A field kept out of the schema.
    pub const fn hidden(name: &'static str, kind: BaseKind) -> Self {
        Self {
            name,
            kind,
            visible: false,
        }
    }
}

/// Shape of a Rust type as seen by the schema inspector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeInfo {
    /// A named-field record, fields in declaration order.
    Record {
        name: &'static str,
        fields: Vec<FieldInfo>,
    },
    /// A reference or box pointing at another type.
    Reference(Box<TypeInfo>),
    /// Any type that is not a record.
    Scalar { name: &'static str, kind: BaseKind },
}

impl TypeInfo {
    /// Follows references down to the referenced value type.
    pub fn resolve(&self) -> &TypeInfo {
        let mut info = self;
        while let Self::Reference(inner) = info {
            info = inner;
        }
        info
    }

    /// Returns `true` if this type is a record, without resolving references.
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Human readable type name, `&` marking each reference level.
    pub fn name(&self) -> String {
        match self {
            Self::Record { name, .. } | Self::Scalar { name, .. } => (*name).to_string(),
            Self::Reference(inner) => format!("&{}", inner.name()),
        }
    }
}

/// Types whose shape can be inspected at runtime.
pub trait Reflect: Any {
    /// Describes the shape of `Self`.
    fn type_info() -> TypeInfo
    where
        Self: Sized;
}

/// Record types a [Table](crate::Table) can store.
pub trait Record: Reflect {
    /// Runtime values of every field, in declaration order, hidden and
    /// unsupported fields included.
    fn values(&self) -> Vec<Value>;

    /// Overwrites the field at declaration position `index`. Returns `false`
    /// and leaves the record untouched if the field cannot hold `value`.
    fn set_value(&mut self, index: usize, value: &Value) -> bool;
}

macro_rules! scalar_reflect {
    ($($ty:ty),*) => {$(
        impl Reflect for $ty {
            fn type_info() -> TypeInfo {
                TypeInfo::Scalar {
                    name: std::any::type_name::<$ty>(),
                    kind: <$ty as Field>::KIND,
                }
            }
        }
    )*};
}

scalar_reflect!(
    i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool, String, Arc<str>,
    DateTime<Utc>, SystemTime
);

macro_rules! composite_reflect {
    ($(impl<$($param:ident),*> for $ty:ty;)*) => {$(
        impl<$($param: 'static),*> Reflect for $ty {
            fn type_info() -> TypeInfo {
                TypeInfo::Scalar {
                    name: std::any::type_name::<$ty>(),
                    kind: BaseKind::Unsupported,
                }
            }
        }
    )*};
}

composite_reflect! {
    impl<T> for Vec<T>;
    impl<T> for Option<T>;
    impl<T> for HashSet<T>;
    impl<K, V> for HashMap<K, V>;
    impl<K, V> for BTreeMap<K, V>;
}

impl<T: Reflect> Reflect for &'static T {
    fn type_info() -> TypeInfo {
        TypeInfo::Reference(Box::new(T::type_info()))
    }
}

impl<T: Reflect> Reflect for Box<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::Reference(Box::new(T::type_info()))
    }
}

/// Compares two records field by field.
///
/// Only visible fields of a supported kind take part, using the same exact
/// equality as uniqueness checks. Records of different types are never equal.
pub fn shallow_equals<A: Record, B: Record>(one: &A, two: &B) -> bool {
    if TypeId::of::<A>() != TypeId::of::<B>() {
        return false;
    }
    let Ok(schema) = schema_of::<A>() else {
        return false;
    };
    let (one, two) = (one.values(), two.values());
    schema
        .columns
        .iter()
        .all(|column| one.get(column.field) == two.get(column.field))
}

/// Declares a struct and implements [Reflect] and [Record] for it.
///
/// Every field becomes a column unless it is marked `#[hidden]`; fields whose
/// type has an unsupported [BaseKind] are carried but never become columns.
///
/// ```
/// use sqlfly::record;
///
/// record! {
///     #[derive(Debug, Clone)]
///     pub struct User {
///         pub id: i64,
///         pub name: String,
///         #[hidden]
///         password_hash: String,
///         pub tags: Vec<String>,
///     }
/// }
///
/// let schema = sqlfly::schema_of::<User>().unwrap();
/// let names: Vec<_> = schema.columns.iter().map(|c| c.name.as_str()).collect();
/// assert_eq!(names, ["id", "name"]);
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$marker:ident])?
                $fvis:vis $field:ident : $fty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $fvis $field: $fty, )*
        }

        impl $crate::Reflect for $name {
            fn type_info() -> $crate::TypeInfo {
                $crate::TypeInfo::Record {
                    name: ::std::stringify!($name),
                    fields: ::std::vec![
                        $(
                            $crate::FieldInfo {
                                name: ::std::stringify!($field),
                                kind: <$fty as $crate::Field>::KIND,
                                visible: $crate::__record_field_visible!($($marker)?),
                            },
                        )*
                    ],
                }
            }
        }

        impl $crate::Record for $name {
            fn values(&self) -> ::std::vec::Vec<$crate::Value> {
                ::std::vec![ $( $crate::Field::to_value(&self.$field), )* ]
            }

            #[allow(unused_assignments)]
            fn set_value(&mut self, index: usize, value: &$crate::Value) -> bool {
                let mut position = 0usize;
                $(
                    if position == index {
                        return match <$fty as $crate::Field>::from_value(value) {
                            ::std::option::Option::Some(field) => {
                                self.$field = field;
                                true
                            }
                            ::std::option::Option::None => false,
                        };
                    }
                    position += 1;
                )*
                false
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __record_field_visible {
    () => {
        true
    };
    (hidden) => {
        false
    };
}
