//! Core library for docmodel.
//!
//! This crate provides the schema compiler and the schema store, independent
//! of how declarations are discovered or how the store is connected to.
//!
//! # Usage
//!
//! ```no_run
//! use docmodel_core::db::Database;
//! use docmodel_core::schema::{Catalog, FieldOptions, FieldType, ModelOptions};
//!
//! let mut catalog = Catalog::new();
//! let mut photo = catalog.model("Photo")?;
//! photo
//!     .field::<String>("name", FieldOptions::required())?
//!     .attach("tags", FieldType::array(FieldType::string()).into())?
//!     .options(ModelOptions::new().timestamps(true));
//! let photo = photo.finish()?;
//!
//! let db = Database::open_default()?;
//! db.migrate()?;
//! db.sync_schemas(&[(photo.name.clone(), photo.schema.clone())])?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod db;
pub mod schema;

// Re-export commonly used types at crate root
pub use db::Database;
pub use schema::{Catalog, CompiledModel, SchemaDocument, SchemaError};
