//! Transformation engine for copying object graphs between bean types
//!
//! A [`Transformer`] owns its configuration (field mappings, field
//! transformers, skipped fields and flags) and turns a source bean into a new
//! or existing destination bean. Shapes are analyzed once per process and
//! shared by every transformer.
//!
//! # Example
//!
//! ```
//! use beanmorph_core::{bean, FieldMapping, Transformer};
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! pub struct Dept { pub code: String }
//! bean!(mutable Dept { code: String });
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! pub struct Employee { pub id: i64, pub name: String, pub dept: Dept }
//! bean!(mutable Employee { id: i64, name: String, dept: Dept });
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! pub struct EmployeeDto { pub id: i64, pub full_name: String, pub dept_code: String }
//! bean!(mutable EmployeeDto { id: i64, full_name: String, dept_code: String });
//!
//! # fn main() -> beanmorph_core::Result<()> {
//! let mut transformer = Transformer::new();
//! transformer
//!     .with_field_mapping([FieldMapping::new("name", "full_name"), FieldMapping::new("code", "dept_code")])
//!     .set_flat_field_name_transformation(true);
//!
//! let employee = Employee { id: 1, name: "Ann".into(), dept: Dept { code: "X1".into() } };
//! let dto: EmployeeDto = transformer.transform(&employee)?;
//! assert_eq!(dto, EmployeeDto { id: 1, full_name: "Ann".into(), dept_code: "X1".into() });
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! Transforming takes `&self` and configuring takes `&mut self`, so a
//! transformer cannot be reconfigured while one of its transforms is running.
//! To share one transformer between threads, wrap it (`Arc<Transformer>` for
//! read-only use, `Arc<RwLock<Transformer>>` when it is reconfigured).
//!
//! Copyright (c) 2025 Beanmorph Team
//! Licensed under the Apache-2.0 license

pub mod builder;
pub mod coercion;
pub mod config;
pub mod converter;
pub mod resolver;
pub mod session;
pub mod shape;
pub mod validator;

use crate::error::{Error, Result};
use crate::reflect::{downcast_bean, Bean, TypeRef};
use crate::value::{ObjectRef, ScalarKind, Value};
use std::sync::Arc;

pub use coercion::CoercionRegistry;
pub use config::{ConfigurationStore, FieldMapping, FieldTransformer, TransformerSettings, DEFAULT_MAX_DEPTH};
pub use session::{Session, TransformationContext};
pub use shape::{ConstructionKind, FieldDescriptor, ShapeMetadata};
pub use validator::{BeanValidator, Constraint, ConstraintValidator, ConstraintViolation};

/// Configurable bean-to-bean transformer
#[derive(Debug, Clone)]
pub struct Transformer {
    config: ConfigurationStore,
    validator: Arc<dyn BeanValidator>,
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer {
    /// Transformer with default flags: missing fields fail, no flat matching,
    /// no validation
    pub fn new() -> Self {
        Self {
            config: ConfigurationStore::new(),
            validator: Arc::new(ConstraintValidator::new()),
        }
    }

    /// Transformer configured from loaded settings
    pub fn from_settings(settings: TransformerSettings) -> Result<Self> {
        let mut transformer = Self::new();
        transformer.config.apply_settings(settings)?;
        Ok(transformer)
    }

    /// Snapshot of the data-only configuration
    pub fn settings(&self) -> TransformerSettings {
        self.config.settings()
    }

    /// Replace flags, mappings and skips; transformers and coercions are kept
    pub fn apply_settings(&mut self, settings: TransformerSettings) -> Result<&mut Self> {
        self.config.apply_settings(settings)?;
        Ok(self)
    }

    pub fn config(&self) -> &ConfigurationStore {
        &self.config
    }

    /// Copy `source` into a new `D`
    pub fn transform<S, D>(&self, source: &S) -> Result<D>
    where
        S: Bean + Clone,
        D: Bean,
    {
        self.transform_owned(ObjectRef::new(source.clone()))
    }

    /// Copy a shared source, keeping its identity for cycle detection
    pub fn transform_shared<S, D>(&self, source: &Arc<S>) -> Result<D>
    where
        S: Bean,
        D: Bean,
    {
        self.transform_owned(ObjectRef::from_arc(Arc::clone(source)))
    }

    fn transform_owned<D: Bean>(&self, source: ObjectRef) -> Result<D> {
        let built = self.transform_object(&source, TypeRef::of::<D>())?;
        downcast_bean::<D>(built).ok_or_else(|| {
            Error::internal(format!("built instance is not a {}", TypeRef::of::<D>().name()))
        })
    }

    /// Copy a type-erased source into a new instance of `dest`
    pub fn transform_object(&self, source: &ObjectRef, dest: TypeRef) -> Result<Box<dyn Bean>> {
        let span = tracing::debug_span!(
            "transform",
            source = %source.type_ref().name(),
            destination = %dest.name()
        );
        let _guard = span.enter();

        let built = Session::new(&self.config).run(source, dest)?;
        self.validate(&*built)?;
        log::debug!("Transformed '{}' into '{}'", source.type_ref().name(), dest.name());
        Ok(built)
    }

    /// Copy a dynamic value; only object values can be transformed
    pub fn transform_value(&self, source: &Value, dest: TypeRef) -> Result<Box<dyn Bean>> {
        match source {
            Value::Object(object) => self.transform_object(object, dest),
            Value::Null => Err(Error::InvalidArgument {
                message: format!("cannot transform null into '{}'", dest.name()),
            }),
            other => Err(Error::InvalidArgument {
                message: format!("cannot transform {} into '{}': source must be an object", other.type_name(), dest.name()),
            }),
        }
    }

    /// Populate an existing destination through its setters
    ///
    /// Works on a copy of `dest` that replaces it only when every field was
    /// applied (and validation, if enabled, passed).
    pub fn transform_into<S, D>(&self, source: &S, dest: &mut D) -> Result<()>
    where
        S: Bean + Clone,
        D: Bean + Clone,
    {
        let span = tracing::debug_span!(
            "transform_into",
            source = %source.type_ref().name(),
            destination = %dest.type_ref().name()
        );
        let _guard = span.enter();

        let dest_shape = shape::analyze(TypeRef::of::<D>())?;
        if dest_shape.kind() == ConstructionKind::Immutable {
            return Err(Error::InvalidArgument {
                message: format!(
                    "'{}' is immutable and cannot be populated in place",
                    dest_shape.name()
                ),
            });
        }

        let source = ObjectRef::new(source.clone());
        let mut working = dest.clone();
        Session::new(&self.config).populate(&source, &mut working)?;
        self.validate(&working)?;
        *dest = working;
        Ok(())
    }

    fn validate(&self, bean: &dyn Bean) -> Result<()> {
        if !self.config.validation_enabled {
            return Ok(());
        }
        let violations = self.validator.validate(bean)?;
        if violations.is_empty() {
            Ok(())
        } else {
            log::debug!(
                "Validation of '{}' found {} violation(s)",
                bean.type_ref().name(),
                violations.len()
            );
            Err(Error::Validation { violations })
        }
    }

    /// Register field mappings; a mapping replaces any earlier one for its destination
    pub fn with_field_mapping(&mut self, mappings: impl IntoIterator<Item = FieldMapping>) -> &mut Self {
        for mapping in mappings {
            self.config.add_mapping(mapping);
        }
        self
    }

    pub fn remove_field_mapping(&mut self, destination: &str) -> &mut Self {
        if !self.config.remove_mapping(destination) {
            log::debug!("No field mapping registered for '{}'", destination);
        }
        self
    }

    pub fn reset_fields_mapping(&mut self) -> &mut Self {
        self.config.clear_mappings();
        self
    }

    /// Register field transformers; their output is used verbatim
    pub fn with_field_transformer(&mut self, transformers: impl IntoIterator<Item = FieldTransformer>) -> &mut Self {
        for transformer in transformers {
            self.config.add_transformer(transformer);
        }
        self
    }

    pub fn remove_field_transformer(&mut self, destination: &str) -> &mut Self {
        if !self.config.remove_transformer(destination) {
            log::debug!("No field transformer registered for '{}'", destination);
        }
        self
    }

    pub fn reset_fields_transformer(&mut self) -> &mut Self {
        self.config.clear_transformers();
        self
    }

    /// Zero-fill unmatched destination fields instead of failing with
    /// [`Error::MissingField`]
    pub fn set_default_value_for_missing_field(&mut self, enabled: bool) -> &mut Self {
        self.config.default_value_for_missing_field = enabled;
        self
    }

    /// Match fields and apply transformers by bare name at any depth
    pub fn set_flat_field_name_transformation(&mut self, enabled: bool) -> &mut Self {
        self.config.flat_field_name_transformation = enabled;
        self
    }

    pub fn set_validation_enabled(&mut self, enabled: bool) -> &mut Self {
        self.config.validation_enabled = enabled;
        self
    }

    /// Leave the given destination paths at their zero value
    pub fn skip_transformation_for_field<I, P>(&mut self, paths: I) -> &mut Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        for path in paths {
            self.config.skip(path);
        }
        self
    }

    pub fn reset_fields_transformation_skip(&mut self) -> &mut Self {
        self.config.clear_skipped();
        self
    }

    /// Maximum nesting of destination objects below the root
    pub fn set_max_depth(&mut self, max_depth: usize) -> &mut Self {
        if max_depth == 0 {
            log::warn!("A maximum depth of 0 rejects every nested object");
        }
        self.config.max_depth = max_depth;
        self
    }

    /// Register a scalar coercion, overriding the built-in rule for the pair
    pub fn with_scalar_coercion<F>(&mut self, from: ScalarKind, to: ScalarKind, coercion: F) -> &mut Self
    where
        F: Fn(&Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.config.coercions.register(from, to, coercion);
        self
    }

    /// Replace the validation collaborator
    pub fn with_validator(&mut self, validator: impl BeanValidator + 'static) -> &mut Self {
        self.validator = Arc::new(validator);
        self
    }
}
