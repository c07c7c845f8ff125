//! The catalog of compiled declarations and the builders that feed it.
//!
//! Declarations compile one at a time: a builder borrows the catalog mutably
//! until it is finished, and its name is marked as compiling meanwhile so a
//! self-referencing `object` field fails instead of recursing.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::compiler::{
    compile, ModelOptions, SchemaDocument, Timestamps, ValidationAction, ValidationLevel,
};
use super::declared::Declared;
use super::error::{SchemaError, SchemaResult};
use super::fragment::Properties;
use super::registry::FieldSet;
use super::resolver::{Lookup, ObjectSource};
use super::types::{DeclaredType, FieldOptions, FieldType};

/// Property map of a finished declaration, inlined by `object` fields.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledObject {
    pub properties: Properties,
    pub required: Vec<String>,
}

impl From<&FieldSet> for CompiledObject {
    fn from(fields: &FieldSet) -> Self {
        Self {
            properties: fields.properties(),
            required: fields.required(),
        }
    }
}

/// A model together with its compiled schema document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledModel {
    pub name: String,
    pub schema: SchemaDocument,
}

impl CompiledModel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &SchemaDocument {
        &self.schema
    }
}

/// One field of a declaration read from data rather than built in code.
///
/// Unknown keys are rejected, so a misspelt `requried` is an error rather
/// than an optional field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDeclaration {
    pub name: String,
    /// Host-side type of the field, used when `type` is omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared: Option<DeclaredType>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FieldType>,
    #[serde(default)]
    pub required: bool,
}

impl FieldDeclaration {
    pub fn options(&self) -> FieldOptions {
        FieldOptions {
            kind: self.kind.clone(),
            required: self.required,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ModelDeclaration {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDeclaration>,
    #[serde(default)]
    pub timestamps: Timestamps,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<Map<String, Value>>,
    #[serde(default)]
    pub validation_action: ValidationAction,
    #[serde(default)]
    pub validation_level: ValidationLevel,
}

impl ModelDeclaration {
    pub fn options(&self) -> ModelOptions {
        ModelOptions {
            timestamps: self.timestamps.clone(),
            defaults: self.defaults.clone(),
            validation_action: self.validation_action,
            validation_level: self.validation_level,
        }
    }
}

/// An embedded object: fields only, no identity or model options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectDeclaration {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDeclaration>,
}

#[derive(Debug, Default)]
pub struct Catalog {
    objects: HashMap<String, CompiledObject>,
    compiling: HashSet<String>,
}

impl ObjectSource for Catalog {
    fn lookup(&self, name: &str) -> Lookup<'_> {
        if self.compiling.contains(name) {
            return Lookup::Compiling;
        }
        match self.objects.get(name) {
            Some(object) => Lookup::Compiled(object),
            None => Lookup::Missing,
        }
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a model declaration.
    pub fn model(&mut self, name: impl Into<String>) -> SchemaResult<ModelBuilder<'_>> {
        Ok(ModelBuilder {
            draft: Draft::begin(self, name.into())?,
            options: ModelOptions::default(),
        })
    }

    /// Starts an embedded object declaration.
    pub fn object(&mut self, name: impl Into<String>) -> SchemaResult<ObjectBuilder<'_>> {
        Ok(ObjectBuilder {
            draft: Draft::begin(self, name.into())?,
        })
    }

    pub fn compile_model(&mut self, declaration: &ModelDeclaration) -> SchemaResult<CompiledModel> {
        let mut builder = self.model(&declaration.name)?;
        for field in &declaration.fields {
            builder
                .draft
                .attach(field.name.clone(), field.declared, field.options())?;
        }
        builder.options(declaration.options());
        builder.finish()
    }

    pub fn define_object(&mut self, declaration: &ObjectDeclaration) -> SchemaResult<()> {
        let mut builder = self.object(&declaration.name)?;
        for field in &declaration.fields {
            builder
                .draft
                .attach(field.name.clone(), field.declared, field.options())?;
        }
        builder.finish()
    }

    pub fn get(&self, name: &str) -> Option<&CompiledObject> {
        self.objects.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Shared state of an unfinished declaration.
///
/// Dropping it unfinished releases the compiling marker, so a failed
/// declaration leaves the catalog as it was.
#[derive(Debug)]
struct Draft<'c> {
    catalog: &'c mut Catalog,
    name: String,
    fields: FieldSet,
    finished: bool,
}

impl<'c> Draft<'c> {
    fn begin(catalog: &'c mut Catalog, name: String) -> SchemaResult<Self> {
        if catalog.objects.contains_key(&name) || catalog.compiling.contains(&name) {
            return Err(SchemaError::DuplicateModel { name });
        }
        catalog.compiling.insert(name.clone());

        Ok(Self {
            catalog,
            name,
            fields: FieldSet::new(),
            finished: false,
        })
    }

    fn attach(
        &mut self,
        name: String,
        declared: Option<DeclaredType>,
        options: FieldOptions,
    ) -> SchemaResult<()> {
        self.fields.attach(&*self.catalog, name, declared, options)
    }

    fn complete(&mut self) {
        self.catalog.compiling.remove(&self.name);
        self.catalog
            .objects
            .insert(self.name.clone(), CompiledObject::from(&self.fields));
        self.finished = true;
    }
}

impl Drop for Draft<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.catalog.compiling.remove(&self.name);
        }
    }
}

/// Builds a model declaration field by field.
///
/// ```
/// use docmodel_core::schema::{Catalog, FieldOptions};
///
/// let mut catalog = Catalog::new();
/// let mut photo = catalog.model("Photo")?;
/// photo
///     .field::<String>("name", FieldOptions::required())?
///     .field::<u64>("views", FieldOptions::optional())?;
/// let photo = photo.finish()?;
///
/// assert_eq!(photo.schema.required, vec!["_id", "name"]);
/// # Ok::<(), docmodel_core::schema::SchemaError>(())
/// ```
#[derive(Debug)]
pub struct ModelBuilder<'c> {
    draft: Draft<'c>,
    options: ModelOptions,
}

impl ModelBuilder<'_> {
    /// Adds a field whose kind may be inferred from `T`.
    pub fn field<T: Declared>(
        &mut self,
        name: impl Into<String>,
        options: FieldOptions,
    ) -> SchemaResult<&mut Self> {
        self.draft.attach(name.into(), Some(T::DECLARED), options)?;
        Ok(self)
    }

    /// Adds a field with an explicit kind.
    pub fn attach(
        &mut self,
        name: impl Into<String>,
        options: FieldOptions,
    ) -> SchemaResult<&mut Self> {
        self.draft.attach(name.into(), None, options)?;
        Ok(self)
    }

    pub fn options(&mut self, options: ModelOptions) -> &mut Self {
        self.options = options;
        self
    }

    pub fn name(&self) -> &str {
        &self.draft.name
    }

    /// Compiles the model and records it in the catalog.
    pub fn finish(mut self) -> SchemaResult<CompiledModel> {
        let schema = compile(&self.draft.name, &self.draft.fields, &self.options)?;
        self.draft.complete();

        tracing::debug!(model = %self.draft.name, "model defined");

        Ok(CompiledModel {
            name: self.draft.name.clone(),
            schema,
        })
    }
}

/// Builds an embedded object declaration.
pub struct ObjectBuilder<'c> {
    draft: Draft<'c>,
}

impl ObjectBuilder<'_> {
    pub fn field<T: Declared>(
        &mut self,
        name: impl Into<String>,
        options: FieldOptions,
    ) -> SchemaResult<&mut Self> {
        self.draft.attach(name.into(), Some(T::DECLARED), options)?;
        Ok(self)
    }

    pub fn attach(
        &mut self,
        name: impl Into<String>,
        options: FieldOptions,
    ) -> SchemaResult<&mut Self> {
        self.draft.attach(name.into(), None, options)?;
        Ok(self)
    }

    pub fn finish(mut self) -> SchemaResult<()> {
        self.draft.complete();
        tracing::debug!(object = %self.draft.name, "object defined");
        Ok(())
    }
}
