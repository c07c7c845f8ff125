//! Model compiler: resolved fields plus model options to a [`SchemaDocument`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{SchemaError, SchemaResult};
use super::fragment::{BsonKind, JsonType, Properties, SchemaFragment};
use super::registry::FieldSet;

pub const ID_FIELD: &str = "_id";
pub const VERSION_FIELD: &str = "__v";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationAction {
    /// Reject writes that violate the schema.
    #[default]
    Error,
    /// Accept them but log a warning.
    Warn,
}

impl ValidationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "error" => Some(Self::Error),
            "warn" => Some(Self::Warn),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationLevel {
    Off,
    /// Validate every insert and update.
    #[default]
    Strict,
    /// Validate only documents that already satisfy the schema.
    Moderate,
}

impl ValidationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Strict => "strict",
            Self::Moderate => "moderate",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "off" => Some(Self::Off),
            "strict" => Some(Self::Strict),
            "moderate" => Some(Self::Moderate),
            _ => None,
        }
    }
}

/// Timestamp fields maintained by the store.
///
/// Declared either as a flag or with custom field names:
/// `true` or `{ "createdAt": "created", "updatedAt": "modified" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamps {
    Enabled(bool),
    Named(TimestampNames),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TimestampNames {
    #[serde(default = "default_created_at")]
    pub created_at: String,
    #[serde(default = "default_updated_at")]
    pub updated_at: String,
}

fn default_created_at() -> String {
    CREATED_AT_FIELD.to_string()
}

fn default_updated_at() -> String {
    UPDATED_AT_FIELD.to_string()
}

impl Default for Timestamps {
    fn default() -> Self {
        Self::Enabled(false)
    }
}

impl Timestamps {
    /// Field names to inject, or `None` when disabled.
    pub fn names(&self) -> Option<(&str, &str)> {
        match self {
            Self::Enabled(false) => None,
            Self::Enabled(true) => Some((CREATED_AT_FIELD, UPDATED_AT_FIELD)),
            Self::Named(names) => Some((names.created_at.as_str(), names.updated_at.as_str())),
        }
    }
}

impl From<bool> for Timestamps {
    fn from(enabled: bool) -> Self {
        Self::Enabled(enabled)
    }
}

/// Model-level options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ModelOptions {
    #[serde(default)]
    pub timestamps: Timestamps,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<Map<String, Value>>,
    #[serde(default)]
    pub validation_action: ValidationAction,
    #[serde(default)]
    pub validation_level: ValidationLevel,
}

impl ModelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timestamps(mut self, timestamps: impl Into<Timestamps>) -> Self {
        self.timestamps = timestamps.into();
        self
    }

    pub fn default_value(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults
            .get_or_insert_with(Map::new)
            .insert(field.into(), value.into());
        self
    }

    pub fn validation_action(mut self, action: ValidationAction) -> Self {
        self.validation_action = action;
        self
    }

    pub fn validation_level(mut self, level: ValidationLevel) -> Self {
        self.validation_level = level;
        self
    }
}

/// The compiled validation schema of a model, as handed to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(rename = "type")]
    pub json_type: JsonType,
    pub properties: Properties,
    pub required: Vec<String>,
    #[serde(rename = "additionalProperties")]
    pub additional_properties: bool,
    #[serde(rename = "$validationAction")]
    pub validation_action: ValidationAction,
    #[serde(rename = "$validationLevel")]
    pub validation_level: ValidationLevel,
    #[serde(rename = "$defaults", default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<Map<String, Value>>,
}

impl SchemaDocument {
    /// The validator part of the document, without the `$`-prefixed
    /// store directives.
    pub fn json_schema(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            map.retain(|key, _| !key.starts_with('$'));
        }
        value
    }
}

/// Compiles a model's fields and options into its schema document.
///
/// Deterministic: the same inputs always produce the same document.
pub fn compile(
    name: &str,
    fields: &FieldSet,
    options: &ModelOptions,
) -> SchemaResult<SchemaDocument> {
    let mut properties = Properties::new();
    let mut required = Vec::new();

    match fields.get(ID_FIELD) {
        Some(id) => {
            properties.insert(ID_FIELD, id.fragment.clone());
            if id.required {
                required.push(ID_FIELD.to_string());
            }
        }
        None => {
            properties.insert(ID_FIELD, SchemaFragment::bson(BsonKind::ObjectId));
            required.push(ID_FIELD.to_string());
        }
    }

    properties.insert(VERSION_FIELD, SchemaFragment::typed(JsonType::Number));

    for field in fields.iter().filter(|f| f.name != ID_FIELD) {
        properties.insert(field.name.clone(), field.fragment.clone());
        if field.required {
            required.push(field.name.clone());
        }
    }

    if let Some((created_at, updated_at)) = options.timestamps.names() {
        for stamp in [created_at, updated_at] {
            if properties.contains_key(stamp) {
                return Err(SchemaError::ReservedField {
                    field: stamp.to_string(),
                });
            }
            properties.insert(stamp, SchemaFragment::bson(BsonKind::Date));
            required.push(stamp.to_string());
        }
    }

    if let Some(defaults) = &options.defaults {
        if let Some(field) = defaults.keys().find(|key| !properties.contains_key(key)) {
            return Err(SchemaError::UnknownDefaultField { field: field.clone() });
        }
    }

    tracing::debug!(
        model = name,
        properties = properties.len(),
        required = required.len(),
        "compiled schema"
    );

    Ok(SchemaDocument {
        json_type: JsonType::Object,
        properties,
        required,
        additional_properties: false,
        validation_action: options.validation_action,
        validation_level: options.validation_level,
        defaults: options.defaults.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_model_has_identity_and_revision_only() {
        let doc = compile("Empty", &FieldSet::new(), &ModelOptions::new()).unwrap();

        assert_eq!(doc.required, vec!["_id"]);
        assert_eq!(doc.properties.keys().collect::<Vec<_>>(), vec!["_id", "__v"]);
        assert_eq!(
            doc.properties.get("_id"),
            Some(&SchemaFragment::bson(BsonKind::ObjectId))
        );
        assert_eq!(doc.validation_action, ValidationAction::Error);
        assert_eq!(doc.validation_level, ValidationLevel::Strict);
    }

    #[test]
    fn custom_timestamp_names_are_injected() {
        let options = ModelOptions::new().timestamps(Timestamps::Named(TimestampNames {
            created_at: "created".into(),
            updated_at: "modified".into(),
        }));
        let doc = compile("Stamped", &FieldSet::new(), &options).unwrap();

        assert_eq!(doc.required, vec!["_id", "created", "modified"]);
        assert_eq!(doc.properties.get("modified"), Some(&SchemaFragment::bson(BsonKind::Date)));
    }

    #[test]
    fn default_for_undeclared_field_is_rejected() {
        let options = ModelOptions::new().default_value("ghost", json!(1));
        let err = compile("Haunted", &FieldSet::new(), &options).unwrap_err();
        assert_eq!(err, SchemaError::UnknownDefaultField { field: "ghost".into() });
    }

    #[test]
    fn json_schema_drops_store_directives() {
        let options = ModelOptions::new().default_value("__v", json!(0));
        let doc = compile("Versioned", &FieldSet::new(), &options).unwrap();
        let schema = doc.json_schema();

        assert!(schema.get("$validationAction").is_none());
        assert!(schema.get("$defaults").is_none());
        assert_eq!(schema["additionalProperties"], json!(false));
        assert_eq!(schema["type"], json!("object"));
    }

    #[test]
    fn timestamps_parse_from_flag_or_names() {
        let flag: ModelOptions = serde_json::from_value(json!({ "timestamps": true })).unwrap();
        assert_eq!(flag.timestamps.names(), Some(("createdAt", "updatedAt")));

        let named: ModelOptions =
            serde_json::from_value(json!({ "timestamps": { "createdAt": "born" } })).unwrap();
        assert_eq!(named.timestamps.names(), Some(("born", "updatedAt")));
    }

    #[test]
    fn misspelt_model_options_are_rejected() {
        for options in [
            json!({ "timestamp": true }),
            json!({ "validationActions": "warn" }),
            json!({ "timestamps": { "createdAt": "born", "deletedAt": "gone" } }),
        ] {
            let parsed = serde_json::from_value::<ModelOptions>(options.clone());
            assert!(parsed.is_err(), "{options} should be rejected");
        }
    }
}
