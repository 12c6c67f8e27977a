//! Beanmorph Core - object graph transformation between bean types
//!
//! This crate copies data between parallel object models (domain objects and
//! their API/DTO counterparts) without hand-written copy code. Field
//! correspondence is discovered by name, path or explicit configuration, and
//! values are converted recursively through nested objects, collections and
//! scalar coercions.
//!
//! # Main Components
//!
//! - **Introspection**: the [`Bean`] trait and [`TypeInfo`] tables, usually generated with [`bean!`]
//! - **Shape Analyzer**: mutable, immutable and hybrid construction shapes, cached per process
//! - **Field Resolver**: mappings, transformers, skips and flat name matching
//! - **Value Converter**: widening, coercions, nested objects, lists and maps
//! - **Validation**: declarative [`Constraint`]s checked after construction
//! - **Error Handling**: one [`Error`] variant per failure kind, built on `thiserror`
//!
//! # Example
//!
//! ```
//! use beanmorph_core::{bean, Transformer};
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! pub struct User { pub id: i64, pub name: String }
//! bean!(mutable User { id: i64, name: String });
//!
//! #[derive(Debug, Clone, PartialEq)]
//! pub struct UserView { pub id: i64, pub name: String }
//! bean!(immutable UserView { id: i64, name: String });
//!
//! # fn main() -> beanmorph_core::Result<()> {
//! let view: UserView = Transformer::new().transform(&User { id: 7, name: "Ann".into() })?;
//! assert_eq!(view, UserView { id: 7, name: "Ann".into() });
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod reflect;
pub mod transform;
pub mod value;

// Re-export main types for convenience
pub use error::{Error, ErrorKind, Result};
pub use reflect::{downcast_bean, AsAny, Bean, ConstructorArgs, ParamInfo, TypeInfo, TypeInfoBuilder, TypeRef};
pub use transform::{
    BeanValidator, ConstructionKind, Constraint, ConstraintValidator, ConstraintViolation, FieldMapping,
    FieldTransformer, Transformer, TransformerSettings,
};
pub use value::{FieldValue, ObjectRef, ScalarKind, Value, ValueKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
