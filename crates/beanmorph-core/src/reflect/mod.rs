//! Introspection surface for transformable types
//!
//! Rust has no runtime reflection, so a type opts in by implementing [`Bean`]
//! and describing itself with a [`TypeInfo`]: its properties (name, declared
//! kind, optional getter and setter) and its constructors (ordered parameters
//! plus an invoker). The Shape Analyzer reads this table the way a reflective
//! analyzer would read a class.
//!
//! The table is written by hand with [`TypeInfo::builder`] or generated by the
//! [`bean!`](crate::bean) macro.
//!
//! Copyright (c) 2025 Beanmorph Team
//! Licensed under the Apache-2.0 license

mod macros;

use crate::transform::validator::Constraint;
use crate::value::{FieldValue, Value, ValueKind};
use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Object-safe access to `Any` for beans behind `dyn`
///
/// Always call these through an explicit `&dyn Bean` (or UFCS): a `Box` or
/// `Arc` is itself `Any` and would otherwise be picked up by auto-ref.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A type the engine can read from and build
pub trait Bean: AsAny + Send + Sync + fmt::Debug {
    /// Static description of the type's properties and constructors
    fn type_info() -> TypeInfo
    where
        Self: Sized;

    /// Handle to this value's concrete type
    fn type_ref(&self) -> TypeRef;
}

/// Lightweight handle to a bean type
///
/// Carries the `TypeId` and a function producing the type's [`TypeInfo`], so
/// nested and recursive types can be described without building their tables
/// eagerly.
#[derive(Clone, Copy)]
pub struct TypeRef {
    id: TypeId,
    name: &'static str,
    info: fn() -> TypeInfo,
}

impl TypeRef {
    pub fn of<T: Bean>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: short_type_name(std::any::type_name::<T>()),
            info: <T as Bean>::type_info,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Build the type's introspection table
    pub fn info(&self) -> TypeInfo {
        (self.info)()
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeRef {}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({})", self.name)
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    let base = match full.find('<') {
        Some(generic_start) => &full[..generic_start],
        None => full,
    };
    match base.rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

pub(crate) type Getter = Arc<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;
pub(crate) type Setter = Arc<dyn Fn(&mut dyn Any, Value) -> Result<(), String> + Send + Sync>;
pub(crate) type Invoker = Arc<dyn Fn(Vec<Value>) -> Result<Box<dyn Bean>, String> + Send + Sync>;

/// One property of a bean type
#[derive(Clone)]
pub struct PropertyInfo {
    pub name: String,
    pub kind: ValueKind,
    pub(crate) getter: Option<Getter>,
    pub(crate) setter: Option<Setter>,
    pub constraints: Vec<Constraint>,
}

impl PropertyInfo {
    pub fn is_readable(&self) -> bool {
        self.getter.is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }
}

impl fmt::Debug for PropertyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyInfo")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("readable", &self.is_readable())
            .field("writable", &self.is_writable())
            .field("constraints", &self.constraints)
            .finish()
    }
}

/// Constructor parameter; unnamed parameters can only be bound positionally
#[derive(Debug, Clone, PartialEq)]
pub struct ParamInfo {
    pub name: Option<String>,
    pub kind: ValueKind,
}

impl ParamInfo {
    pub fn named<F: FieldValue>(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            kind: F::kind(),
        }
    }

    pub fn unnamed<F: FieldValue>() -> Self {
        Self {
            name: None,
            kind: F::kind(),
        }
    }
}

/// A constructor: ordered parameters and the function invoking it
#[derive(Clone)]
pub struct ConstructorInfo {
    pub params: Vec<ParamInfo>,
    pub(crate) invoker: Invoker,
}

impl ConstructorInfo {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn is_no_arg(&self) -> bool {
        self.params.is_empty()
    }

    pub(crate) fn invoke(&self, args: Vec<Value>) -> Result<Box<dyn Bean>, String> {
        (self.invoker)(args)
    }
}

impl fmt::Debug for ConstructorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorInfo")
            .field("params", &self.params)
            .finish()
    }
}

/// Positional constructor arguments, consumed in declaration order
pub struct ConstructorArgs {
    values: std::vec::IntoIter<Value>,
    position: usize,
}

impl ConstructorArgs {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into_iter(),
            position: 0,
        }
    }

    /// Take the next argument as `F`
    pub fn next<F: FieldValue>(&mut self) -> Result<F, String> {
        let position = self.position;
        self.position += 1;
        let value = self
            .values
            .next()
            .ok_or_else(|| format!("missing constructor argument #{}", position))?;
        F::from_value(value).map_err(|e| format!("constructor argument #{}: {}", position, e))
    }
}

/// Introspection table of a bean type
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub name: String,
    pub type_id: TypeId,
    pub properties: Vec<PropertyInfo>,
    pub constructors: Vec<ConstructorInfo>,
}

impl TypeInfo {
    pub fn builder<T: Bean>(name: &str) -> TypeInfoBuilder<T> {
        TypeInfoBuilder {
            name: name.to_string(),
            properties: Vec::new(),
            constructors: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn property(&self, name: &str) -> Option<&PropertyInfo> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Fluent builder for [`TypeInfo`]
pub struct TypeInfoBuilder<T> {
    name: String,
    properties: Vec<PropertyInfo>,
    constructors: Vec<ConstructorInfo>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Bean> TypeInfoBuilder<T> {
    /// Readable and writable property
    pub fn property<F: FieldValue>(self, name: &str, get: fn(&T) -> &F, set: fn(&mut T, F)) -> Self {
        self.push(name, F::kind(), Some(getter_for(get)), Some(setter_for(set)))
    }

    /// Property exposed through a getter only
    pub fn read_only<F: FieldValue>(self, name: &str, get: fn(&T) -> &F) -> Self {
        self.push(name, F::kind(), Some(getter_for(get)), None)
    }

    /// Property with hand-written accessors working on [`Value`]s directly
    pub fn raw_property(
        self,
        name: &str,
        kind: ValueKind,
        get: Option<fn(&T) -> Value>,
        set: Option<fn(&mut T, Value) -> Result<(), String>>,
    ) -> Self {
        let getter = get.map(|get| -> Getter {
            Arc::new(move |any: &dyn Any| any.downcast_ref::<T>().map(get))
        });
        let setter = set.map(|set| -> Setter {
            Arc::new(move |any: &mut dyn Any, value: Value| {
                let bean = any
                    .downcast_mut::<T>()
                    .ok_or_else(|| format!("setter applied to a value that is not {}", std::any::type_name::<T>()))?;
                set(bean, value)
            })
        });
        self.push(name, kind, getter, setter)
    }

    /// Constructor with the given parameters
    pub fn constructor(mut self, params: Vec<ParamInfo>, build: fn(&mut ConstructorArgs) -> Result<T, String>) -> Self {
        let invoker: Invoker = Arc::new(move |values: Vec<Value>| {
            let mut args = ConstructorArgs::new(values);
            let bean = build(&mut args)?;
            Ok(Box::new(bean) as Box<dyn Bean>)
        });
        self.constructors.push(ConstructorInfo { params, invoker });
        self
    }

    pub fn no_arg_constructor(mut self, build: fn() -> T) -> Self {
        let invoker: Invoker = Arc::new(move |_values: Vec<Value>| Ok(Box::new(build()) as Box<dyn Bean>));
        self.constructors.push(ConstructorInfo {
            params: Vec::new(),
            invoker,
        });
        self
    }

    /// Attach a validation constraint to an already declared property
    pub fn constraint(mut self, property: &str, constraint: Constraint) -> Self {
        if let Some(existing) = self.properties.iter_mut().find(|p| p.name == property) {
            existing.constraints.push(constraint);
        } else {
            log::warn!(
                "Constraint {} ignored: '{}' has no property '{}'",
                constraint,
                self.name,
                property
            );
        }
        self
    }

    pub fn build(self) -> TypeInfo {
        TypeInfo {
            name: self.name,
            type_id: TypeId::of::<T>(),
            properties: self.properties,
            constructors: self.constructors,
        }
    }

    fn push(mut self, name: &str, kind: ValueKind, getter: Option<Getter>, setter: Option<Setter>) -> Self {
        self.properties.push(PropertyInfo {
            name: name.to_string(),
            kind,
            getter,
            setter,
            constraints: Vec::new(),
        });
        self
    }
}

impl<T: Bean + Default> TypeInfoBuilder<T> {
    /// No-argument constructor backed by `Default`
    pub fn default_constructor(self) -> Self {
        self.no_arg_constructor(T::default)
    }
}

fn getter_for<T: Bean, F: FieldValue>(get: fn(&T) -> &F) -> Getter {
    Arc::new(move |any: &dyn Any| any.downcast_ref::<T>().map(|bean| get(bean).to_value()))
}

fn setter_for<T: Bean, F: FieldValue>(set: fn(&mut T, F)) -> Setter {
    Arc::new(move |any: &mut dyn Any, value: Value| {
        let bean = any
            .downcast_mut::<T>()
            .ok_or_else(|| format!("setter applied to a value that is not {}", std::any::type_name::<T>()))?;
        set(bean, F::from_value(value)?);
        Ok(())
    })
}

/// Recover a concrete bean from a type-erased box
pub fn downcast_bean<T: Bean>(bean: Box<dyn Bean>) -> Option<T> {
    AsAny::into_any(bean).downcast::<T>().ok().map(|boxed| *boxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Sample {
        id: i64,
        label: String,
    }

    impl Bean for Sample {
        fn type_info() -> TypeInfo {
            TypeInfo::builder::<Sample>("Sample")
                .default_constructor()
                .property("id", |s| &s.id, |s, v| s.id = v)
                .read_only("label", |s| &s.label)
                .constraint("label", Constraint::NotBlank)
                .build()
        }

        fn type_ref(&self) -> TypeRef {
            TypeRef::of::<Sample>()
        }
    }

    #[test]
    fn test_builder_records_accessors() {
        let info = Sample::type_info();
        assert_eq!(info.name, "Sample");
        assert_eq!(info.properties.len(), 2);
        assert!(info.property("id").map_or(false, |p| p.is_writable()));
        assert!(!info.property("label").map_or(true, |p| p.is_writable()));
        assert_eq!(info.property("label").map(|p| p.constraints.len()), Some(1));
        assert_eq!(info.constructors.len(), 1);
        assert!(info.constructors[0].is_no_arg());
    }

    #[test]
    fn test_erased_getter_and_setter() {
        let info = Sample::type_info();
        let mut sample = Sample {
            id: 3,
            label: "x".into(),
        };
        let id = info.property("id").and_then(|p| p.getter.clone()).expect("getter");
        assert_eq!(id(&sample as &dyn Any), Some(Value::I64(3)));

        let set = info.property("id").and_then(|p| p.setter.clone()).expect("setter");
        set(&mut sample as &mut dyn Any, Value::I64(9)).expect("set");
        assert_eq!(sample.id, 9);
        assert!(set(&mut sample as &mut dyn Any, Value::Bool(true)).is_err());
    }

    #[test]
    fn test_type_ref_name_is_short() {
        let type_ref = TypeRef::of::<Sample>();
        assert_eq!(type_ref.name(), "Sample");
        assert_eq!(type_ref.info().name, "Sample");
        assert_eq!(type_ref, TypeRef::of::<Sample>());
    }

    #[test]
    fn test_downcast_bean() {
        let boxed: Box<dyn Bean> = Box::new(Sample::default());
        assert_eq!(downcast_bean::<Sample>(boxed), Some(Sample::default()));
    }

    #[test]
    fn test_constructor_args_report_position() {
        let mut args = ConstructorArgs::new(vec![Value::I64(1)]);
        assert_eq!(args.next::<i64>(), Ok(1));
        let err = args.next::<String>().unwrap_err();
        assert!(err.contains("#1"));
    }
}
