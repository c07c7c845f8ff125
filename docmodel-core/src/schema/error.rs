use thiserror::Error;

/// Result type for schema compilation.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Configuration errors raised while compiling declarations.
///
/// All of these surface synchronously from the call that attached the field
/// or finalized the model; none is deferred to the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Neither an explicit kind nor an inferable declared type was given.
    #[error("could not determine the type for field '{field}' (declared as {declared}); specify the kind explicitly")]
    CannotDetermineType { field: String, declared: String },

    /// An `array` kind was given without an item type.
    #[error("type of array items must be specified")]
    MissingItemType,

    /// An `objectGeneric` kind was given without a value type.
    #[error("type of generic object values must be specified")]
    MissingValueType,

    /// An `object` kind was given without naming the referenced declaration.
    #[error("field '{field}' is an object but does not reference a model")]
    MissingObjectReference { field: String },

    /// The referenced declaration has not been compiled yet.
    #[error("object '{name}' is not compiled; define it before referencing it")]
    UnknownObject { name: String },

    /// The referenced declaration is still being compiled.
    #[error("object '{name}' references itself while it is being compiled")]
    CyclicReference { name: String },

    /// An `enum` kind with no allowed values.
    #[error("enum values must not be empty")]
    EmptyEnum,

    #[error("field '{field}' is declared more than once")]
    DuplicateField { field: String },

    #[error("field '{field}' is reserved and cannot be declared")]
    ReservedField { field: String },

    #[error("'{name}' is already defined")]
    DuplicateModel { name: String },

    #[error("default value given for undeclared field '{field}'")]
    UnknownDefaultField { field: String },

    /// A resolution failure, annotated with the field it occurred in.
    #[error("field '{field}': {source}")]
    Field {
        field: String,
        #[source]
        source: Box<SchemaError>,
    },
}

impl SchemaError {
    pub(crate) fn in_field(self, field: &str) -> Self {
        match self {
            // raised by the resolver for nested object kinds
            Self::MissingObjectReference { field: name } if name.is_empty() => {
                Self::MissingObjectReference {
                    field: field.to_string(),
                }
            }
            // already names the field
            Self::CannotDetermineType { .. }
            | Self::MissingObjectReference { .. }
            | Self::DuplicateField { .. }
            | Self::ReservedField { .. }
            | Self::Field { .. } => self,
            other => Self::Field {
                field: field.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Returns the innermost error, skipping field annotations.
    pub fn root(&self) -> &SchemaError {
        match self {
            Self::Field { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_annotation_wraps_once() {
        let err = SchemaError::MissingItemType.in_field("tags").in_field("outer");
        assert_eq!(err.to_string(), "field 'tags': type of array items must be specified");
        assert_eq!(err.root(), &SchemaError::MissingItemType);
    }

    #[test]
    fn errors_naming_the_field_are_not_wrapped() {
        let err = SchemaError::DuplicateField { field: "a".into() }.in_field("a");
        assert!(matches!(err, SchemaError::DuplicateField { .. }));
    }
}
