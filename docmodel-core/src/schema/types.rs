//! Field type options: the input grammar of the type resolver.
//!
//! A [`FieldType`] is either a flat scalar kind (optionally constrained) or a
//! compound kind carrying the auxiliary data it needs: the item type of an
//! array, the referenced declaration of an object, the value type and key
//! pattern of a generic object, or the allowed values of an enum.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Options of the `string` kind. Also carries a fragment's string keywords.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StringConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Allowed values. Resolution moves these to the fragment's `enum`.
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
}

/// Options of the `number` kind.
///
/// Bounds keep the literal they were declared with, so `0` stays `0` in the
/// emitted schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NumberConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<Number>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ArrayConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ObjectConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<u64>,
}

/// Payload of the kinds that take no options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoOptions {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ArrayType {
    /// Item type; an array without one fails to resolve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Box<FieldType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,
}

impl ArrayType {
    pub fn constraints(&self) -> ArrayConstraints {
        ArrayConstraints {
            min_items: self.min_items,
            max_items: self.max_items,
            unique_items: self.unique_items,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ObjectType {
    /// Name of the compiled model or object declaration to inline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<u64>,
}

impl ObjectType {
    pub fn constraints(&self) -> ObjectConstraints {
        ObjectConstraints {
            min_properties: self.min_properties,
            max_properties: self.max_properties,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GenericObjectType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Box<FieldType>>,
    /// Key pattern; `.+` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<u64>,
}

impl GenericObjectType {
    pub fn constraints(&self) -> ObjectConstraints {
        ObjectConstraints {
            min_properties: self.min_properties,
            max_properties: self.max_properties,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumType {
    pub values: Vec<Value>,
}

/// How a single field resolves to a schema fragment.
///
/// Every payload rejects keys it does not know, so a misspelt constraint
/// fails to parse instead of vanishing from the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FieldType {
    String(StringConstraints),
    Number(NumberConstraints),
    Boolean(NoOptions),
    Date(NoOptions),
    Binary(NoOptions),
    ObjectId(NoOptions),
    Any(NoOptions),
    Array(ArrayType),
    Object(ObjectType),
    ObjectGeneric(GenericObjectType),
    Enum(EnumType),
}

impl FieldType {
    pub fn string() -> Self {
        Self::String(StringConstraints::default())
    }

    pub fn number() -> Self {
        Self::Number(NumberConstraints::default())
    }

    pub fn boolean() -> Self {
        Self::Boolean(NoOptions {})
    }

    pub fn date() -> Self {
        Self::Date(NoOptions {})
    }

    pub fn binary() -> Self {
        Self::Binary(NoOptions {})
    }

    pub fn object_id() -> Self {
        Self::ObjectId(NoOptions {})
    }

    pub fn any() -> Self {
        Self::Any(NoOptions {})
    }

    pub fn array(item: FieldType) -> Self {
        Self::Array(ArrayType {
            item: Some(Box::new(item)),
            ..Default::default()
        })
    }

    /// Embeds the compiled declaration called `name`.
    pub fn object(name: impl Into<String>) -> Self {
        Self::Object(ObjectType {
            object: Some(name.into()),
            ..Default::default()
        })
    }

    /// A map whose keys all match `.+` and whose values are `value`.
    pub fn object_generic(value: FieldType) -> Self {
        Self::ObjectGeneric(GenericObjectType {
            value: Some(Box::new(value)),
            ..Default::default()
        })
    }

    pub fn object_generic_matching(value: FieldType, pattern: impl Into<String>) -> Self {
        Self::ObjectGeneric(GenericObjectType {
            value: Some(Box::new(value)),
            pattern: Some(pattern.into()),
            ..Default::default()
        })
    }

    pub fn enumeration<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Enum(EnumType {
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    /// Returns the kind tag used in declarations and error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::Date(_) => "date",
            Self::Binary(_) => "binary",
            Self::ObjectId(_) => "objectId",
            Self::Any(_) => "any",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::ObjectGeneric(_) => "objectGeneric",
            Self::Enum(_) => "enum",
        }
    }
}

/// Per-field options handed to the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldOptions {
    /// Explicit kind. When absent the kind is inferred from the declared type.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FieldType>,
    #[serde(default)]
    pub required: bool,
}

impl FieldOptions {
    pub fn optional() -> Self {
        Self::default()
    }

    pub fn required() -> Self {
        Self {
            kind: None,
            required: true,
        }
    }

    pub fn kind(mut self, kind: FieldType) -> Self {
        self.kind = Some(kind);
        self
    }
}

impl From<FieldType> for FieldOptions {
    fn from(kind: FieldType) -> Self {
        Self::optional().kind(kind)
    }
}

/// The host-side type a field was declared with.
///
/// Only the flat scalar variants can be turned into a [`FieldType`]; the rest
/// need auxiliary data that a declared type does not carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeclaredType {
    Boolean,
    Number,
    String,
    Date,
    Binary,
    ObjectId,
    Array,
    Object,
}

impl DeclaredType {
    pub fn infer(self) -> Option<FieldType> {
        match self {
            Self::Boolean => Some(FieldType::boolean()),
            Self::Number => Some(FieldType::number()),
            Self::String => Some(FieldType::string()),
            Self::Date => Some(FieldType::date()),
            Self::Binary => Some(FieldType::binary()),
            Self::ObjectId => Some(FieldType::object_id()),
            Self::Array | Self::Object => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Date => "date",
            Self::Binary => "binary",
            Self::ObjectId => "objectId",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
