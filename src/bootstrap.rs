//! Connects to the store, registers every model schema, and synchronizes once.

use std::fmt;

use docmodel_core::db::SyncReport;
use docmodel_core::CompiledModel;
use thiserror::Error;
use tokio::sync::watch;

use crate::config::BootstrapConfig;
use crate::loader::{self, LoadError};
use crate::store::{Connector, StoreError, StoreSession};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("gave up connecting to the store after {retries} retries: {source}")]
    RetriesExhausted {
        retries: u32,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Where the models come from.
#[derive(Debug, Clone)]
pub enum ModelSource {
    Models(Vec<CompiledModel>),
    /// Declaration files, resolved by [`loader::load_pattern`].
    Pattern(String),
}

impl ModelSource {
    fn load(self) -> Result<Vec<CompiledModel>, LoadError> {
        match self {
            Self::Models(models) => Ok(models),
            Self::Pattern(pattern) => loader::load_pattern(&pattern),
        }
    }
}

impl From<Vec<CompiledModel>> for ModelSource {
    fn from(models: Vec<CompiledModel>) -> Self {
        Self::Models(models)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Disconnected,
    Connecting,
    Connected,
    Ready,
}

impl BootstrapState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Ready => "ready",
        }
    }
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A session with every model registered.
pub struct Ready<S> {
    pub session: S,
    /// Registered model names, in registration order.
    pub models: Vec<String>,
    /// `None` when there was nothing to synchronize.
    pub report: Option<SyncReport>,
}

pub struct Bootstrap<C> {
    connector: C,
    source: ModelSource,
    config: BootstrapConfig,
    state: watch::Sender<BootstrapState>,
}

impl<C: Connector> Bootstrap<C> {
    pub fn new(connector: C, source: impl Into<ModelSource>) -> Self {
        Self {
            connector,
            source: source.into(),
            config: BootstrapConfig::default(),
            state: watch::Sender::new(BootstrapState::Disconnected),
        }
    }

    /// Follows the state while the bootstrap runs. The receiver keeps the
    /// last state after `run` returns.
    pub fn subscribe(&self) -> watch::Receiver<BootstrapState> {
        self.state.subscribe()
    }

    pub fn with_config(mut self, config: BootstrapConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs the bootstrap to completion. Consumes it, so a bootstrap runs
    /// at most once.
    pub async fn run(mut self) -> Result<Ready<C::Session>, BootstrapError> {
        let mut session = self.connect().await?;

        let models = std::mem::replace(&mut self.source, ModelSource::Models(Vec::new())).load()?;
        if models.is_empty() {
            tracing::warn!("No models loaded");
            self.transition(BootstrapState::Ready);
            return Ok(Ready {
                session,
                models: Vec::new(),
                report: None,
            });
        }

        let mut names = Vec::with_capacity(models.len());
        for model in models {
            session.register_model(&model.name, model.schema)?;
            tracing::info!("Model {} created", model.name);
            names.push(model.name);
        }

        let report = session.synchronize_schemas().await?;
        tracing::info!(
            created = report.created.len(),
            updated = report.updated.len(),
            unchanged = report.unchanged.len(),
            "Schemas synchronized"
        );

        self.transition(BootstrapState::Ready);
        Ok(Ready {
            session,
            models: names,
            report: Some(report),
        })
    }

    async fn connect(&mut self) -> Result<C::Session, BootstrapError> {
        let retries = self.config.retries;
        let mut attempt = 0;

        loop {
            self.transition(BootstrapState::Connecting);

            let err = match self.connector.connect().await {
                Ok(session) => {
                    self.transition(BootstrapState::Connected);
                    tracing::info!("Connected to store");
                    return Ok(session);
                }
                Err(err) => err,
            };

            tracing::error!("Unable to connect to the store: {}", err);
            self.transition(BootstrapState::Disconnected);

            if !err.is_transient() {
                return Err(err.into());
            }
            if attempt >= retries {
                return Err(BootstrapError::RetriesExhausted { retries, source: err });
            }

            attempt += 1;
            tracing::warn!("Retrying... {}/{}", attempt, retries);
            tokio::time::sleep(self.config.retry_delay).await;
        }
    }

    fn transition(&self, next: BootstrapState) {
        let previous = self.state.send_replace(next);
        tracing::debug!(from = %previous, to = %next, "bootstrap state");
    }
}
