//! Resolved schema fragments in the `$jsonSchema` dialect.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::types::{ArrayConstraints, NumberConstraints, ObjectConstraints, StringConstraints};

/// JSON Schema `type` values emitted by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    Array,
    Boolean,
    Number,
    Object,
    String,
}

/// BSON type aliases understood by the store's validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BsonKind {
    Array,
    BinData,
    Bool,
    Date,
    Null,
    Number,
    Object,
    ObjectId,
    String,
}

impl BsonKind {
    /// Every kind a field of type `any` accepts.
    pub const ALL: [BsonKind; 9] = [
        Self::Array,
        Self::BinData,
        Self::Bool,
        Self::Date,
        Self::Null,
        Self::Number,
        Self::Object,
        Self::ObjectId,
        Self::String,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BsonType {
    One(BsonKind),
    Many(Vec<BsonKind>),
}

/// One field's resolved schema.
///
/// Scalars set exactly one of `json_type` / `bson_type`; compound kinds add
/// `items`, `properties`, `pattern_properties` or `values`. Allowed values of
/// a string or number always live in `values`, never in `string`/`number`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaFragment {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub json_type: Option<JsonType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bson_type: Option<BsonType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaFragment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_properties: Option<Properties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<bool>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
    #[serde(flatten)]
    pub string: StringConstraints,
    #[serde(flatten)]
    pub number: NumberConstraints,
    #[serde(flatten)]
    pub array: ArrayConstraints,
    #[serde(flatten)]
    pub object: ObjectConstraints,
}

impl SchemaFragment {
    pub fn typed(json_type: JsonType) -> Self {
        Self {
            json_type: Some(json_type),
            ..Default::default()
        }
    }

    pub fn bson(kind: BsonKind) -> Self {
        Self {
            bson_type: Some(BsonType::One(kind)),
            ..Default::default()
        }
    }

    /// A closed object with the given properties.
    pub fn closed_object(properties: Properties, required: Vec<String>) -> Self {
        Self {
            json_type: Some(JsonType::Object),
            properties: Some(properties),
            required: (!required.is_empty()).then_some(required),
            additional_properties: Some(false),
            ..Default::default()
        }
    }

    /// True when the fragment describes structure rather than a single type.
    pub fn is_compound(&self) -> bool {
        self.items.is_some()
            || self.properties.is_some()
            || self.pattern_properties.is_some()
            || self.values.is_some()
    }
}

/// Property map that keeps insertion order.
///
/// Serialized as a JSON object; field names are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(Vec<(String, SchemaFragment)>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `fragment` under `name`, replacing in place if already present.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        fragment: SchemaFragment,
    ) -> Option<SchemaFragment> {
        let name = name.into();
        match self.0.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, fragment)),
            None => {
                self.0.push((name, fragment));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&SchemaFragment> {
        self.0.iter().find(|(key, _)| key == name).map(|(_, f)| f)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaFragment)> {
        self.0.iter().map(|(key, f)| (key.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, SchemaFragment)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, SchemaFragment)>>(iter: I) -> Self {
        let mut properties = Self::new();
        for (key, fragment) in iter {
            properties.insert(key, fragment);
        }
        properties
    }
}

impl Serialize for Properties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, fragment) in &self.0 {
            map.serialize_entry(key, fragment)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Properties {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PropertiesVisitor;

        impl<'de> Visitor<'de> for PropertiesVisitor {
            type Value = Properties;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to schema fragments")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Properties, A::Error> {
                let mut properties = Properties::new();
                while let Some((key, fragment)) = access.next_entry::<String, SchemaFragment>()? {
                    properties.insert(key, fragment);
                }
                Ok(properties)
            }
        }

        deserializer.deserialize_map(PropertiesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn properties_keep_insertion_order() {
        let properties: Properties = [
            ("zeta", SchemaFragment::typed(JsonType::String)),
            ("alpha", SchemaFragment::typed(JsonType::Number)),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_string(&properties).unwrap();
        assert_eq!(json, r#"{"zeta":{"type":"string"},"alpha":{"type":"number"}}"#);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut properties = Properties::new();
        properties.insert("a", SchemaFragment::typed(JsonType::String));
        properties.insert("b", SchemaFragment::typed(JsonType::String));
        let old = properties.insert("a", SchemaFragment::bson(BsonKind::Date));

        assert_eq!(old, Some(SchemaFragment::typed(JsonType::String)));
        assert_eq!(properties.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(properties.get("a"), Some(&SchemaFragment::bson(BsonKind::Date)));
    }

    #[test]
    fn closed_object_omits_empty_required() {
        let fragment = SchemaFragment::closed_object(Properties::new(), Vec::new());
        assert_eq!(
            serde_json::to_value(&fragment).unwrap(),
            json!({ "type": "object", "properties": {}, "additionalProperties": false })
        );
    }

    #[test]
    fn enum_reads_back_into_values() {
        let fragment = SchemaFragment {
            values: Some(vec![json!("a"), json!("b")]),
            object: ObjectConstraints {
                max_properties: Some(2),
                ..Default::default()
            },
            ..SchemaFragment::typed(JsonType::String)
        };

        let value = serde_json::to_value(&fragment).unwrap();
        assert_eq!(value, json!({ "type": "string", "enum": ["a", "b"], "maxProperties": 2 }));
        assert_eq!(serde_json::from_value::<SchemaFragment>(value).unwrap(), fragment);
    }

    #[test]
    fn bson_union_serializes_as_list() {
        let fragment = SchemaFragment {
            bson_type: Some(BsonType::Many(vec![BsonKind::BinData, BsonKind::ObjectId])),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&fragment).unwrap(),
            json!({ "bsonType": ["binData", "objectId"] })
        );
    }
}
