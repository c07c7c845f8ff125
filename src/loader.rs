//! Discovers declaration files by pattern and compiles them in name order.
//!
//! A pattern is a shell-style glob such as `models/*.model.json` or
//! `models/**/*.json`; `**` descends into subdirectories. Each file holds one
//! model and any embedded objects it needs:
//!
//! ```json
//! {
//!   "objects": [{ "name": "Address", "fields": [...] }],
//!   "model": { "name": "User", "timestamps": true, "fields": [...] }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use docmodel_core::schema::{
    Catalog, CompiledModel, ModelDeclaration, ObjectDeclaration, SchemaError,
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid model pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed declaration file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} does not declare a model", path.display())]
    MissingModel { path: PathBuf },

    #[error("invalid declaration in {}: {source}", path.display())]
    Schema {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },
}

/// Contents of one declaration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelFile {
    #[serde(default)]
    pub objects: Vec<ObjectDeclaration>,
    #[serde(default)]
    pub model: Option<ModelDeclaration>,
}

/// Files matching `pattern`, sorted by path.
///
/// A pattern that matches nothing, including one under a missing directory,
/// yields no files.
pub fn resolve_pattern(pattern: &str) -> Result<Vec<PathBuf>, LoadError> {
    let entries = glob::glob(pattern).map_err(|source| LoadError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|err| LoadError::Io {
            path: err.path().to_path_buf(),
            source: err.into_error(),
        })?;
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    tracing::debug!(pattern, files = paths.len(), "resolved model pattern");
    Ok(paths)
}

/// Compiles every file matching `pattern` into a fresh catalog.
pub fn load_pattern(pattern: &str) -> Result<Vec<CompiledModel>, LoadError> {
    let paths = resolve_pattern(pattern)?;
    load_files(&mut Catalog::new(), &paths)
}

/// Compiles `paths` in order; declarations from earlier files are visible
/// to later ones.
pub fn load_files(
    catalog: &mut Catalog,
    paths: &[PathBuf],
) -> Result<Vec<CompiledModel>, LoadError> {
    let mut models = Vec::with_capacity(paths.len());
    for path in paths {
        models.push(load_file(catalog, path)?);
    }
    Ok(models)
}

pub fn load_file(catalog: &mut Catalog, path: &Path) -> Result<CompiledModel, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ModelFile = serde_json::from_str(&content).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let model = file.model.ok_or_else(|| LoadError::MissingModel {
        path: path.to_path_buf(),
    })?;

    let schema_err = |source| LoadError::Schema {
        path: path.to_path_buf(),
        source,
    };
    for object in &file.objects {
        catalog.define_object(object).map_err(schema_err)?;
    }
    let compiled = catalog.compile_model(&model).map_err(schema_err)?;

    tracing::debug!(model = %compiled.name, path = %path.display(), "loaded model");
    Ok(compiled)
}
