//! docmodel: discovers model declarations, compiles them with
//! `docmodel_core`, and synchronizes the resulting schemas with a store.

pub mod bootstrap;
pub mod config;
pub mod loader;
pub mod store;

pub use bootstrap::{Bootstrap, BootstrapError, BootstrapState, ModelSource, Ready};
pub use config::BootstrapConfig;
pub use loader::LoadError;
pub use store::{Connector, SqliteConnector, SqliteSession, StoreError, StoreSession};
