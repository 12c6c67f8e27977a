//! Dynamic value model shared by introspection and conversion
//!
//! Field values cross the engine as [`Value`]s. Declared field types are
//! described by [`ValueKind`], and the [`FieldValue`] trait bridges concrete
//! Rust types to both.
//!
//! Copyright (c) 2025 Beanmorph Team
//! Licensed under the Apache-2.0 license

use crate::reflect::{AsAny, Bean, TypeRef};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Scalar kinds understood by the converter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Char,
    String,
    DateTime,
    Date,
}

impl ScalarKind {
    /// Rust-facing name of the kind
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::I8 => "i8",
            ScalarKind::I16 => "i16",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::U8 => "u8",
            ScalarKind::U16 => "u16",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::Char => "char",
            ScalarKind::String => "String",
            ScalarKind::DateTime => "DateTime<Utc>",
            ScalarKind::Date => "NaiveDate",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ScalarKind::I8
                | ScalarKind::I16
                | ScalarKind::I32
                | ScalarKind::I64
                | ScalarKind::U8
                | ScalarKind::U16
                | ScalarKind::U32
                | ScalarKind::U64
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ScalarKind::F32 | ScalarKind::F64)
    }

    /// The zero value of this kind
    pub fn zero_value(&self) -> Value {
        match self {
            ScalarKind::Bool => Value::Bool(false),
            ScalarKind::I8 => Value::I8(0),
            ScalarKind::I16 => Value::I16(0),
            ScalarKind::I32 => Value::I32(0),
            ScalarKind::I64 => Value::I64(0),
            ScalarKind::U8 => Value::U8(0),
            ScalarKind::U16 => Value::U16(0),
            ScalarKind::U32 => Value::U32(0),
            ScalarKind::U64 => Value::U64(0),
            ScalarKind::F32 => Value::F32(0.0),
            ScalarKind::F64 => Value::F64(0.0),
            ScalarKind::Char => Value::Char('\0'),
            ScalarKind::String => Value::String(String::new()),
            ScalarKind::DateTime => Value::DateTime(DateTime::<Utc>::UNIX_EPOCH),
            ScalarKind::Date => Value::Date(DateTime::<Utc>::UNIX_EPOCH.date_naive()),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Declared kind of a field, constructor parameter or collection element
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Scalar(ScalarKind),
    Object(TypeRef),
    List(Box<ValueKind>),
    Map(Box<ValueKind>, Box<ValueKind>),
    Optional(Box<ValueKind>),
}

impl ValueKind {
    /// Nested bean type, looking through `Optional`
    pub fn object_type(&self) -> Option<TypeRef> {
        match self {
            ValueKind::Object(type_ref) => Some(*type_ref),
            ValueKind::Optional(inner) => inner.object_type(),
            _ => None,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, ValueKind::Optional(_))
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Scalar(scalar) => write!(f, "{}", scalar),
            ValueKind::Object(type_ref) => write!(f, "{}", type_ref.name()),
            ValueKind::List(element) => write!(f, "List<{}>", element),
            ValueKind::Map(key, value) => write!(f, "Map<{}, {}>", key, value),
            ValueKind::Optional(inner) => write!(f, "Option<{}>", inner),
        }
    }
}

/// Shared handle to a bean instance
///
/// Identity is the address of the shared allocation: two handles are the same
/// object exactly when they point at the same `Arc`.
#[derive(Clone)]
pub struct ObjectRef(Arc<dyn Bean>);

impl ObjectRef {
    /// Wrap an owned bean in a fresh handle
    pub fn new<T: Bean>(bean: T) -> Self {
        Self(Arc::new(bean))
    }

    /// Reuse an existing shared allocation, keeping its identity
    pub fn from_arc<T: Bean>(bean: Arc<T>) -> Self {
        Self(bean)
    }

    pub fn from_boxed(bean: Box<dyn Bean>) -> Self {
        Self(Arc::from(bean))
    }

    pub fn bean(&self) -> &dyn Bean {
        &*self.0
    }

    pub fn type_ref(&self) -> TypeRef {
        self.bean().type_ref()
    }

    /// Address-based identity used for cycle detection
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        self.identity() == other.identity()
    }

    pub fn downcast_ref<T: Bean>(&self) -> Option<&T> {
        AsAny::as_any(self.bean()).downcast_ref::<T>()
    }

    /// Recover the concrete `Arc<T>`, handing the handle back on type mismatch
    pub fn downcast_arc<T: Bean>(self) -> std::result::Result<Arc<T>, ObjectRef> {
        let any = AsAny::into_any_arc(Arc::clone(&self.0));
        any.downcast::<T>().map_err(|_| self)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.bean(), f)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// A dynamically typed field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(char),
    String(String),
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
    List(Vec<Value>),
    /// Entries in source iteration order
    Map(Vec<(Value, Value)>),
    Object(ObjectRef),
}

impl Value {
    /// Scalar kind of this value, `None` for null, containers and objects
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        let kind = match self {
            Value::Bool(_) => ScalarKind::Bool,
            Value::I8(_) => ScalarKind::I8,
            Value::I16(_) => ScalarKind::I16,
            Value::I32(_) => ScalarKind::I32,
            Value::I64(_) => ScalarKind::I64,
            Value::U8(_) => ScalarKind::U8,
            Value::U16(_) => ScalarKind::U16,
            Value::U32(_) => ScalarKind::U32,
            Value::U64(_) => ScalarKind::U64,
            Value::F32(_) => ScalarKind::F32,
            Value::F64(_) => ScalarKind::F64,
            Value::Char(_) => ScalarKind::Char,
            Value::String(_) => ScalarKind::String,
            Value::DateTime(_) => ScalarKind::DateTime,
            Value::Date(_) => ScalarKind::Date,
            Value::Null | Value::List(_) | Value::Map(_) | Value::Object(_) => return None,
        };
        Some(kind)
    }

    /// Human readable description of the runtime type
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
            Value::Object(object) => object.type_ref().name().to_string(),
            other => other
                .scalar_kind()
                .map(|kind| kind.name().to_string())
                .unwrap_or_default(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer payload widened to `i128`
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Value::I8(v) => Some(v as i128),
            Value::I16(v) => Some(v as i128),
            Value::I32(v) => Some(v as i128),
            Value::I64(v) => Some(v as i128),
            Value::U8(v) => Some(v as i128),
            Value::U16(v) => Some(v as i128),
            Value::U32(v) => Some(v as i128),
            Value::U64(v) => Some(v as i128),
            _ => None,
        }
    }

    /// Numeric payload as `f64`
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F32(v) => Some(v as f64),
            Value::F64(v) => Some(v),
            _ => self.as_i128().map(|v| v as f64),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::I8(v) => write!(f, "{}", v),
            Value::I16(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::U8(v) => write!(f, "{}", v),
            Value::U16(v) => write!(f, "{}", v),
            Value::U32(v) => write!(f, "{}", v),
            Value::U64(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            Value::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Value::List(items) => write!(f, "[{} items]", items.len()),
            Value::Map(entries) => write!(f, "{{{} entries}}", entries.len()),
            Value::Object(object) => write!(f, "{}@{:x}", object.type_ref().name(), object.identity()),
        }
    }
}

/// Bridge between a concrete Rust type and the dynamic value model
pub trait FieldValue: Sized + Send + Sync + 'static {
    /// Declared kind of the type
    fn kind() -> ValueKind;

    fn to_value(&self) -> Value;

    /// Rebuild the concrete type; the error message names what went wrong
    fn from_value(value: Value) -> std::result::Result<Self, String>;
}

pub(crate) fn mismatch(expected: &str, found: &Value) -> String {
    format!("expected {}, found {}", expected, found.type_name())
}

macro_rules! scalar_field_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                fn kind() -> ValueKind {
                    ValueKind::Scalar(ScalarKind::$variant)
                }

                fn to_value(&self) -> Value {
                    Value::$variant(self.clone())
                }

                fn from_value(value: Value) -> std::result::Result<Self, String> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(mismatch(ScalarKind::$variant.name(), &other)),
                    }
                }
            }
        )*
    };
}

scalar_field_value! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    char => Char,
    String => String,
    DateTime<Utc> => DateTime,
    NaiveDate => Date,
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn kind() -> ValueKind {
        ValueKind::Optional(Box::new(T::kind()))
    }

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> std::result::Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

fn list_items(value: Value) -> std::result::Result<Vec<Value>, String> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(mismatch("List", &other)),
    }
}

fn map_entries(value: Value) -> std::result::Result<Vec<(Value, Value)>, String> {
    match value {
        Value::Map(entries) => Ok(entries),
        other => Err(mismatch("Map", &other)),
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn kind() -> ValueKind {
        ValueKind::List(Box::new(T::kind()))
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(FieldValue::to_value).collect())
    }

    fn from_value(value: Value) -> std::result::Result<Self, String> {
        list_items(value)?.into_iter().map(T::from_value).collect()
    }
}

impl<T: FieldValue + Eq + Hash> FieldValue for HashSet<T> {
    fn kind() -> ValueKind {
        ValueKind::List(Box::new(T::kind()))
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(FieldValue::to_value).collect())
    }

    fn from_value(value: Value) -> std::result::Result<Self, String> {
        list_items(value)?.into_iter().map(T::from_value).collect()
    }
}

impl<T: FieldValue + Ord> FieldValue for BTreeSet<T> {
    fn kind() -> ValueKind {
        ValueKind::List(Box::new(T::kind()))
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(FieldValue::to_value).collect())
    }

    fn from_value(value: Value) -> std::result::Result<Self, String> {
        list_items(value)?.into_iter().map(T::from_value).collect()
    }
}

impl<K: FieldValue + Eq + Hash, V: FieldValue> FieldValue for HashMap<K, V> {
    fn kind() -> ValueKind {
        ValueKind::Map(Box::new(K::kind()), Box::new(V::kind()))
    }

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.to_value(), v.to_value())).collect())
    }

    fn from_value(value: Value) -> std::result::Result<Self, String> {
        map_entries(value)?
            .into_iter()
            .map(|(k, v)| -> std::result::Result<(K, V), String> {
                Ok((K::from_value(k)?, V::from_value(v)?))
            })
            .collect()
    }
}

impl<K: FieldValue + Ord, V: FieldValue> FieldValue for BTreeMap<K, V> {
    fn kind() -> ValueKind {
        ValueKind::Map(Box::new(K::kind()), Box::new(V::kind()))
    }

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.to_value(), v.to_value())).collect())
    }

    fn from_value(value: Value) -> std::result::Result<Self, String> {
        map_entries(value)?
            .into_iter()
            .map(|(k, v)| -> std::result::Result<(K, V), String> {
                Ok((K::from_value(k)?, V::from_value(v)?))
            })
            .collect()
    }
}

/// Shared beans keep their identity, which is what makes cycles observable
impl<T: Bean> FieldValue for Arc<T> {
    fn kind() -> ValueKind {
        ValueKind::Object(TypeRef::of::<T>())
    }

    fn to_value(&self) -> Value {
        Value::Object(ObjectRef::from_arc(Arc::clone(self)))
    }

    fn from_value(value: Value) -> std::result::Result<Self, String> {
        match value {
            Value::Object(object) => {
                let found = object.type_ref();
                object.downcast_arc::<T>().map_err(|_| {
                    format!("expected {}, found {}", TypeRef::of::<T>().name(), found.name())
                })
            }
            other => Err(mismatch(TypeRef::of::<T>().name(), &other)),
        }
    }
}

/// Extract a by-value bean, cloning only when the allocation is still shared
pub fn object_from_value<T: Bean + Clone>(value: Value) -> std::result::Result<T, String> {
    let arc = <Arc<T> as FieldValue>::from_value(value)?;
    Ok(Arc::try_unwrap(arc).unwrap_or_else(|shared| (*shared).clone()))
}

/// Implement [`FieldValue`] for bean types held by value
///
/// Requires `Clone`; reading such a field hands out a fresh [`ObjectRef`].
#[macro_export]
macro_rules! impl_field_value {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::FieldValue for $ty {
                fn kind() -> $crate::ValueKind {
                    $crate::ValueKind::Object($crate::TypeRef::of::<$ty>())
                }

                fn to_value(&self) -> $crate::Value {
                    $crate::Value::Object($crate::ObjectRef::new(::std::clone::Clone::clone(self)))
                }

                fn from_value(
                    value: $crate::Value,
                ) -> ::std::result::Result<Self, ::std::string::String> {
                    $crate::value::object_from_value::<$ty>(value)
                }
            }
        )+
    };
}
