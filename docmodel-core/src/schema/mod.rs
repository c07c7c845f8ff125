//! Declarative schema compiler.
//!
//! Field annotations are resolved into `$jsonSchema` fragments as they are
//! attached, accumulated per declaration, and compiled into a
//! [`SchemaDocument`] when the declaration is finished. Compiled declarations
//! live in a [`Catalog`] so later declarations can embed them.

mod catalog;
mod compiler;
mod declared;
mod error;
mod fragment;
mod registry;
mod resolver;
mod types;

pub use catalog::{
    Catalog, CompiledModel, CompiledObject, FieldDeclaration, ModelBuilder, ModelDeclaration,
    ObjectBuilder, ObjectDeclaration,
};
pub use compiler::{
    compile, ModelOptions, SchemaDocument, TimestampNames, Timestamps, ValidationAction,
    ValidationLevel, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD, VERSION_FIELD,
};
pub use declared::{Binary, Declared, ObjectId};
pub use error::{SchemaError, SchemaResult};
pub use fragment::{BsonKind, BsonType, JsonType, Properties, SchemaFragment};
pub use registry::{FieldDescriptor, FieldSet};
pub use resolver::{resolve, Lookup, ObjectSource, MATCH_ALL_PATTERN};
pub use types::{
    ArrayConstraints, ArrayType, DeclaredType, EnumType, FieldOptions, FieldType,
    GenericObjectType, NoOptions, NumberConstraints, ObjectConstraints, ObjectType,
    StringConstraints,
};
