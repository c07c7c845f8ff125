//! Field descriptor registry: the per-declaration accumulation of resolved
//! fields, in declaration order.

use super::compiler::VERSION_FIELD;
use super::error::{SchemaError, SchemaResult};
use super::fragment::{Properties, SchemaFragment};
use super::resolver::{resolve, ObjectSource};
use super::types::{DeclaredType, FieldOptions, FieldType, ObjectType};

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub fragment: SchemaFragment,
    pub required: bool,
}

/// Resolved fields of one model or embedded object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    descriptors: Vec<FieldDescriptor>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `options` and records the field.
    ///
    /// When no kind is given it is inferred from `declared`, which only ever
    /// yields a scalar kind.
    pub fn attach(
        &mut self,
        objects: &impl ObjectSource,
        name: impl Into<String>,
        declared: Option<DeclaredType>,
        options: FieldOptions,
    ) -> SchemaResult<()> {
        let name = name.into();

        if name == VERSION_FIELD {
            return Err(SchemaError::ReservedField { field: name });
        }
        if self.contains(&name) {
            return Err(SchemaError::DuplicateField { field: name });
        }

        let kind = match options.kind {
            Some(kind) => kind,
            None => declared.and_then(DeclaredType::infer).ok_or_else(|| {
                SchemaError::CannotDetermineType {
                    field: name.clone(),
                    declared: declared.map_or("nothing", |d| d.as_str()).to_string(),
                }
            })?,
        };

        if let FieldType::Object(ObjectType { object: None, .. }) = kind {
            return Err(SchemaError::MissingObjectReference { field: name });
        }

        let fragment = resolve(&kind, objects).map_err(|e| e.in_field(&name))?;

        tracing::debug!(
            field = %name,
            kind = kind.kind_name(),
            required = options.required,
            "attached field"
        );

        self.descriptors.push(FieldDescriptor {
            name,
            fragment,
            required: options.required,
        });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Property map in declaration order.
    pub fn properties(&self) -> Properties {
        self.descriptors
            .iter()
            .map(|d| (d.name.clone(), d.fragment.clone()))
            .collect()
    }

    /// Names of required fields in declaration order.
    pub fn required(&self) -> Vec<String> {
        self.descriptors
            .iter()
            .filter(|d| d.required)
            .map(|d| d.name.clone())
            .collect()
    }
}
