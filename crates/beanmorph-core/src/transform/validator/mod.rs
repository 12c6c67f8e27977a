//! Post-construction validation of built instances
//!
//! Copyright (c) 2025 Beanmorph Team
//! Licensed under the Apache-2.0 license

mod constraints;

pub use constraints::{Constraint, ConstraintViolation};

use crate::error::Result;
use crate::reflect::Bean;
use crate::transform::config::DEFAULT_MAX_DEPTH;
use crate::transform::resolver::join_path;
use crate::transform::shape;
use crate::value::{ObjectRef, Value};
use std::fmt;

/// Validation collaborator invoked on each top-level built instance
pub trait BeanValidator: Send + Sync + fmt::Debug {
    /// Every violation found on `bean`; an empty list means valid
    fn validate(&self, bean: &dyn Bean) -> Result<Vec<ConstraintViolation>>;
}

/// Default validator: checks declared [`Constraint`]s, cascading into nested
/// beans, list elements and map values
#[derive(Debug, Clone)]
pub struct ConstraintValidator {
    max_depth: usize,
}

impl ConstraintValidator {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Stop cascading below this nesting level
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn validate_bean(
        &self,
        bean: &dyn Bean,
        prefix: &str,
        visiting: &mut Vec<usize>,
        violations: &mut Vec<ConstraintViolation>,
    ) -> Result<()> {
        let shape = shape::analyze(bean.type_ref())?;
        for field in shape.fields() {
            let Some(value) = field.read(bean) else {
                continue;
            };
            let path = join_path(prefix, &field.name);
            for constraint in &field.constraints {
                if let Some(message) = constraint.check(&value) {
                    violations.push(ConstraintViolation {
                        path: path.clone(),
                        constraint: constraint.to_string(),
                        message,
                        value: (!value.is_null()).then(|| value.to_string()),
                    });
                }
            }
            self.cascade(&value, &path, visiting, violations)?;
        }
        Ok(())
    }

    fn cascade(
        &self,
        value: &Value,
        path: &str,
        visiting: &mut Vec<usize>,
        violations: &mut Vec<ConstraintViolation>,
    ) -> Result<()> {
        match value {
            Value::Object(object) => self.cascade_object(object, path, visiting, violations),
            Value::List(items) => {
                for (index, item) in items.iter().enumerate() {
                    self.cascade(item, &format!("{}[{}]", path, index), visiting, violations)?;
                }
                Ok(())
            }
            Value::Map(entries) => {
                for (key, item) in entries {
                    self.cascade(item, &format!("{}[{}]", path, key), visiting, violations)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn cascade_object(
        &self,
        object: &ObjectRef,
        path: &str,
        visiting: &mut Vec<usize>,
        violations: &mut Vec<ConstraintViolation>,
    ) -> Result<()> {
        if visiting.contains(&object.identity()) {
            return Ok(());
        }
        if visiting.len() >= self.max_depth {
            log::warn!("Validation stopped at '{}': nesting deeper than {}", path, self.max_depth);
            return Ok(());
        }
        visiting.push(object.identity());
        let outcome = self.validate_bean(object.bean(), path, visiting, violations);
        visiting.pop();
        outcome
    }
}

impl Default for ConstraintValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl BeanValidator for ConstraintValidator {
    fn validate(&self, bean: &dyn Bean) -> Result<Vec<ConstraintViolation>> {
        let mut violations = Vec::new();
        let mut visiting = Vec::new();
        self.validate_bean(bean, "", &mut visiting, &mut violations)?;
        log::trace!("Validated '{}': {} violation(s)", bean.type_ref().name(), violations.len());
        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bean, TypeInfo, TypeRef};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Tag {
        label: String,
    }

    impl Bean for Tag {
        fn type_info() -> TypeInfo {
            TypeInfo::builder::<Tag>("Tag")
                .default_constructor()
                .property("label", |t| &t.label, |t, v| t.label = v)
                .constraint("label", Constraint::NotBlank)
                .build()
        }

        fn type_ref(&self) -> TypeRef {
            TypeRef::of::<Tag>()
        }
    }
    crate::impl_field_value!(Tag);

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Item {
        code: String,
        quantity: i32,
        tags: Vec<Tag>,
    }

    impl Bean for Item {
        fn type_info() -> TypeInfo {
            TypeInfo::builder::<Item>("Item")
                .default_constructor()
                .property("code", |i| &i.code, |i, v| i.code = v)
                .property("quantity", |i| &i.quantity, |i, v| i.quantity = v)
                .property("tags", |i| &i.tags, |i, v| i.tags = v)
                .constraint("quantity", Constraint::range(Some(1.0), None))
                .build()
        }

        fn type_ref(&self) -> TypeRef {
            TypeRef::of::<Item>()
        }
    }
    crate::impl_field_value!(Item);

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Plain {
        note: Option<String>,
    }
    bean!(mutable Plain { note: Option<String> });

    #[test]
    fn test_valid_instance_has_no_violations() {
        let item = Item {
            code: "A".into(),
            quantity: 2,
            tags: vec![Tag { label: "x".into() }],
        };
        assert!(ConstraintValidator::new().validate(&item).expect("validate").is_empty());
        assert!(ConstraintValidator::new().validate(&Plain::default()).expect("validate").is_empty());
    }

    #[test]
    fn test_cascades_into_list_elements() {
        let item = Item {
            code: "A".into(),
            quantity: 0,
            tags: vec![Tag { label: "ok".into() }, Tag { label: " ".into() }],
        };
        let violations = ConstraintValidator::new().validate(&item).expect("validate");
        let paths: Vec<&str> = violations.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["quantity", "tags[1].label"]);
        assert_eq!(violations[0].constraint, "Range");
        assert_eq!(violations[0].value.as_deref(), Some("0"));
    }

    #[test]
    fn test_default_depth_matches_transform_depth() {
        assert_eq!(ConstraintValidator::default().max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_nested_violation_paths_are_dotted() {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Order {
            item: Item,
        }
        bean!(mutable Order { item: Item });

        let order = Order {
            item: Item {
                code: "A".into(),
                quantity: 0,
                tags: Vec::new(),
            },
        };
        let violations = ConstraintValidator::new().validate(&order).expect("validate");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "item.quantity");
    }

    #[test]
    fn test_depth_limit_stops_cascade() {
        let item = Item {
            code: "A".into(),
            quantity: 1,
            tags: vec![Tag { label: "".into() }],
        };
        let shallow = ConstraintValidator::new().with_max_depth(0);
        assert!(shallow.validate(&item).expect("validate").is_empty());
    }
}
