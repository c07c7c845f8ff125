//! Type resolution: [`FieldType`] to [`SchemaFragment`].

use serde_json::Value;

use super::catalog::CompiledObject;
use super::error::{SchemaError, SchemaResult};
use super::fragment::{BsonKind, BsonType, JsonType, Properties, SchemaFragment};
use super::types::FieldType;

/// Key pattern used by generic objects that do not declare one.
pub const MATCH_ALL_PATTERN: &str = ".+";

/// State of a referenced declaration as seen by the resolver.
#[derive(Debug)]
pub enum Lookup<'a> {
    Compiled(&'a CompiledObject),
    Compiling,
    Missing,
}

/// Supplies compiled property maps for `object` fields.
pub trait ObjectSource {
    fn lookup(&self, name: &str) -> Lookup<'_>;
}

/// Resolves field type options into a schema fragment.
///
/// Pure apart from reading `objects`; fails rather than defaulting on
/// malformed input.
pub fn resolve(kind: &FieldType, objects: &impl ObjectSource) -> SchemaResult<SchemaFragment> {
    let fragment = match kind {
        FieldType::String(constraints) => {
            let mut string = constraints.clone();
            SchemaFragment {
                values: allowed_values(string.values.take())?,
                string,
                ..SchemaFragment::typed(JsonType::String)
            }
        }
        FieldType::Number(constraints) => {
            let mut number = constraints.clone();
            SchemaFragment {
                values: allowed_values(number.values.take())?,
                number,
                ..SchemaFragment::typed(JsonType::Number)
            }
        }
        FieldType::Boolean(_) => SchemaFragment::typed(JsonType::Boolean),
        FieldType::Date(_) => SchemaFragment::bson(BsonKind::Date),
        FieldType::Binary(_) => SchemaFragment::bson(BsonKind::BinData),
        FieldType::ObjectId(_) => SchemaFragment::bson(BsonKind::ObjectId),
        FieldType::Any(_) => SchemaFragment {
            bson_type: Some(BsonType::Many(BsonKind::ALL.to_vec())),
            ..Default::default()
        },
        FieldType::Array(array) => {
            let item = array.item.as_deref().ok_or(SchemaError::MissingItemType)?;
            SchemaFragment {
                items: Some(Box::new(resolve(item, objects)?)),
                array: array.constraints(),
                ..SchemaFragment::typed(JsonType::Array)
            }
        }
        FieldType::Object(object) => {
            let name = object.object.as_deref().ok_or_else(|| SchemaError::MissingObjectReference {
                field: String::new(),
            })?;
            match objects.lookup(name) {
                Lookup::Compiled(compiled) => SchemaFragment {
                    object: object.constraints(),
                    ..SchemaFragment::closed_object(
                        compiled.properties.clone(),
                        compiled.required.clone(),
                    )
                },
                Lookup::Compiling => {
                    return Err(SchemaError::CyclicReference {
                        name: name.to_string(),
                    })
                }
                Lookup::Missing => {
                    return Err(SchemaError::UnknownObject {
                        name: name.to_string(),
                    })
                }
            }
        }
        FieldType::ObjectGeneric(generic) => {
            let value = generic.value.as_deref().ok_or(SchemaError::MissingValueType)?;
            let pattern = generic.pattern.as_deref().unwrap_or(MATCH_ALL_PATTERN);

            let mut pattern_properties = Properties::new();
            pattern_properties.insert(pattern, resolve(value, objects)?);

            SchemaFragment {
                pattern_properties: Some(pattern_properties),
                additional_properties: Some(false),
                object: generic.constraints(),
                ..SchemaFragment::typed(JsonType::Object)
            }
        }
        FieldType::Enum(values) => SchemaFragment {
            values: allowed_values(Some(values.values.clone()))?,
            ..Default::default()
        },
    };

    Ok(fragment)
}

fn allowed_values(values: Option<Vec<Value>>) -> SchemaResult<Option<Vec<Value>>> {
    match values {
        Some(values) if values.is_empty() => Err(SchemaError::EmptyEnum),
        values => Ok(values),
    }
}
