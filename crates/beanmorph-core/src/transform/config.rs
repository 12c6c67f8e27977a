//! Configuration store: field mappings, field transformers, skips and flags
//!
//! Everything here is keyed by the full dotted destination path
//! (`dept.manager.name`). The store is owned by a
//! [`Transformer`](crate::Transformer) and handed read-only to each session.
//!
//! Copyright (c) 2025 Beanmorph Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::reflect::Bean;
use crate::transform::coercion::CoercionRegistry;
use crate::value::{FieldValue, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Default nesting limit for a single transformation
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Explicit correspondence between a source path and a destination path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Dotted path read from the source object
    pub source: String,
    /// Dotted path of the destination field that receives the value
    pub destination: String,
}

impl FieldMapping {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

/// Function computing a destination field value
pub type TransformFn = Arc<dyn Fn(&Value) -> std::result::Result<Value, String> + Send + Sync>;

/// User function whose output is assigned verbatim to a destination field
///
/// Without a source path the function receives the current source object as
/// a [`Value::Object`]; with one it receives the value found at that path.
#[derive(Clone)]
pub struct FieldTransformer {
    pub destination: String,
    pub source: Option<String>,
    function: TransformFn,
}

impl FieldTransformer {
    pub fn new<F>(destination: impl Into<String>, function: F) -> Self
    where
        F: Fn(&Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            destination: destination.into(),
            source: None,
            function: Arc::new(function),
        }
    }

    /// Feed the function from a source path instead of the whole object
    pub fn with_source_path(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Typed transformer reading one source field
    pub fn from_field<F, D, Func>(destination: impl Into<String>, source: impl Into<String>, function: Func) -> Self
    where
        F: FieldValue,
        D: FieldValue,
        Func: Fn(F) -> D + Send + Sync + 'static,
    {
        Self::new(destination, move |value: &Value| {
            let input = F::from_value(value.clone())?;
            Ok(function(input).to_value())
        })
        .with_source_path(source)
    }

    /// Typed transformer computing the value from the whole source object
    pub fn from_source<S, D, Func>(destination: impl Into<String>, function: Func) -> Self
    where
        S: Bean,
        D: FieldValue,
        Func: Fn(&S) -> D + Send + Sync + 'static,
    {
        Self::new(destination, move |value: &Value| {
            let source = value
                .as_object()
                .and_then(|object| object.downcast_ref::<S>())
                .ok_or_else(|| format!("expected a {} source, found {}", std::any::type_name::<S>(), value.type_name()))?;
            Ok(function(source).to_value())
        })
    }

    pub fn apply(&self, input: &Value) -> std::result::Result<Value, String> {
        (self.function)(input)
    }
}

impl fmt::Debug for FieldTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldTransformer")
            .field("destination", &self.destination)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Mutable configuration owned by a transformer
#[derive(Debug, Clone)]
pub struct ConfigurationStore {
    mappings: HashMap<String, FieldMapping>,
    transformers: HashMap<String, FieldTransformer>,
    skipped: BTreeSet<String>,
    pub default_value_for_missing_field: bool,
    pub flat_field_name_transformation: bool,
    pub validation_enabled: bool,
    pub max_depth: usize,
    pub coercions: CoercionRegistry,
}

impl Default for ConfigurationStore {
    fn default() -> Self {
        Self {
            mappings: HashMap::new(),
            transformers: HashMap::new(),
            skipped: BTreeSet::new(),
            default_value_for_missing_field: false,
            flat_field_name_transformation: false,
            validation_enabled: false,
            max_depth: DEFAULT_MAX_DEPTH,
            coercions: CoercionRegistry::new(),
        }
    }
}

impl ConfigurationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mapping, replacing any earlier one for the same destination
    pub fn add_mapping(&mut self, mapping: FieldMapping) {
        if let Some(previous) = self.mappings.insert(mapping.destination.clone(), mapping) {
            log::debug!("Replaced field mapping for '{}'", previous.destination);
        }
    }

    pub fn remove_mapping(&mut self, destination: &str) -> bool {
        self.mappings.remove(destination).is_some()
    }

    pub fn clear_mappings(&mut self) {
        self.mappings.clear();
    }

    pub fn mapping_for(&self, destination: &str) -> Option<&FieldMapping> {
        self.mappings.get(destination)
    }

    /// Registered mappings ordered by destination
    pub fn mappings(&self) -> Vec<&FieldMapping> {
        let mut mappings: Vec<&FieldMapping> = self.mappings.values().collect();
        mappings.sort_by(|a, b| a.destination.cmp(&b.destination));
        mappings
    }

    /// Register a transformer, replacing any earlier one for the same destination
    pub fn add_transformer(&mut self, transformer: FieldTransformer) {
        if let Some(previous) = self.transformers.insert(transformer.destination.clone(), transformer) {
            log::debug!("Replaced field transformer for '{}'", previous.destination);
        }
    }

    pub fn remove_transformer(&mut self, destination: &str) -> bool {
        self.transformers.remove(destination).is_some()
    }

    pub fn clear_transformers(&mut self) {
        self.transformers.clear();
    }

    pub fn transformer_count(&self) -> usize {
        self.transformers.len()
    }

    /// Transformer for a destination field
    ///
    /// The full path always wins; with flat transformation enabled a
    /// transformer registered under the bare field name applies at any depth.
    pub fn transformer_for(&self, path: &str, name: &str) -> Option<&FieldTransformer> {
        self.transformers.get(path).or_else(|| {
            if self.flat_field_name_transformation {
                self.transformers.get(name)
            } else {
                None
            }
        })
    }

    pub fn skip(&mut self, destination: impl Into<String>) {
        self.skipped.insert(destination.into());
    }

    pub fn clear_skipped(&mut self) {
        self.skipped.clear();
    }

    pub fn is_skipped(&self, destination: &str) -> bool {
        self.skipped.contains(destination)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.skipped.iter().map(String::as_str)
    }

    /// Serializable snapshot of the data-only configuration
    pub fn settings(&self) -> TransformerSettings {
        TransformerSettings {
            default_value_for_missing_field: self.default_value_for_missing_field,
            flat_field_name_transformation: self.flat_field_name_transformation,
            validation_enabled: self.validation_enabled,
            max_depth: self.max_depth,
            field_mappings: self.mappings().into_iter().cloned().collect(),
            skipped_fields: self.skipped.iter().cloned().collect(),
        }
    }

    /// Replace flags, mappings and skips with the given settings
    ///
    /// Transformers and coercions are code-only and left untouched.
    pub fn apply_settings(&mut self, settings: TransformerSettings) -> Result<()> {
        settings.validate()?;
        self.default_value_for_missing_field = settings.default_value_for_missing_field;
        self.flat_field_name_transformation = settings.flat_field_name_transformation;
        self.validation_enabled = settings.validation_enabled;
        self.max_depth = settings.max_depth;
        self.mappings.clear();
        for mapping in settings.field_mappings {
            self.add_mapping(mapping);
        }
        self.skipped = settings.skipped_fields.into_iter().collect();
        Ok(())
    }
}

/// File-loadable transformer settings
///
/// ```json
/// {
///   "flat_field_name_transformation": true,
///   "field_mappings": [{ "source": "name", "destination": "full_name" }],
///   "skipped_fields": ["internal_id"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformerSettings {
    pub default_value_for_missing_field: bool,
    pub flat_field_name_transformation: bool,
    pub validation_enabled: bool,
    pub max_depth: usize,
    pub field_mappings: Vec<FieldMapping>,
    pub skipped_fields: Vec<String>,
}

impl Default for TransformerSettings {
    fn default() -> Self {
        Self {
            default_value_for_missing_field: false,
            flat_field_name_transformation: false,
            validation_enabled: false,
            max_depth: DEFAULT_MAX_DEPTH,
            field_mappings: Vec::new(),
            skipped_fields: Vec::new(),
        }
    }
}

impl TransformerSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::Settings {
            message: format!("failed to read settings file {}: {}", path.display(), e),
            source: Some(e.into()),
        })?;
        log::debug!("Loading transformer settings from {}", path.display());
        Self::from_json_str(&content)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(settings_error("max_depth must be at least 1"));
        }
        for mapping in &self.field_mappings {
            if mapping.source.trim().is_empty() || mapping.destination.trim().is_empty() {
                return Err(settings_error(&format!(
                    "field mapping '{}' -> '{}' has an empty path",
                    mapping.source, mapping.destination
                )));
            }
        }
        if let Some(blank) = self.skipped_fields.iter().find(|f| f.trim().is_empty()) {
            return Err(settings_error(&format!("skipped field '{}' is blank", blank)));
        }
        Ok(())
    }
}

fn settings_error(message: &str) -> Error {
    Error::Settings {
        message: message.to_string(),
        source: None,
    }
}
