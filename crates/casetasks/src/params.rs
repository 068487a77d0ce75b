use async_trait::async_trait;
use casecore::TaskError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("Missing parameter: {0}")]
    Missing(String),

    #[error("Invalid parameter {name}: {reason}")]
    Invalid { name: String, reason: String },
}

impl From<ParamError> for TaskError {
    fn from(e: ParamError) -> Self {
        TaskError::Handler(e.to_string())
    }
}

/// Secure parameter/secret store collaborator. Values are injected
/// environment as far as the orchestrator is concerned; it never
/// inspects or validates them beyond shape.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<String, ParamError>;
}

/// Fixed in-memory store for tests and demos.
#[derive(Default)]
pub struct StaticParameterStore {
    values: HashMap<String, String>,
}

impl StaticParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Store preloaded with the datastore parameters the standard
    /// pipeline needs, pointing at a local development database.
    pub fn local_defaults() -> Self {
        Self::new()
            .with("DB_HOST", "localhost")
            .with("DB_USER", "postgres")
            .with("DB_NAME", "openlawnz_db")
            .with("DB_PASS", "pgpass")
            .with("PORT", "5432")
    }
}

#[async_trait]
impl ParameterStore for StaticParameterStore {
    async fn fetch(&self, name: &str) -> Result<String, ParamError> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| ParamError::Missing(name.to_string()))
    }
}

/// Store backed by process environment variables, for deployments where
/// the secret manager injects parameters as env.
pub struct EnvParameterStore;

#[async_trait]
impl ParameterStore for EnvParameterStore {
    async fn fetch(&self, name: &str) -> Result<String, ParamError> {
        std::env::var(name).map_err(|_| ParamError::Missing(name.to_string()))
    }
}

/// Connection parameters for the shared case datastore.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatastoreParams {
    pub host: String,
    pub user: String,
    pub database: String,
    pub password: String,
    pub port: u16,
}

impl DatastoreParams {
    /// Pull the full parameter set from the store.
    pub async fn load(store: &dyn ParameterStore) -> Result<Self, ParamError> {
        let port_raw = store.fetch("PORT").await?;
        let port = port_raw.parse().map_err(|_| ParamError::Invalid {
            name: "PORT".to_string(),
            reason: format!("not a port number: {port_raw}"),
        })?;

        Ok(Self {
            host: store.fetch("DB_HOST").await?,
            user: store.fetch("DB_USER").await?,
            database: store.fetch("DB_NAME").await?,
            password: store.fetch("DB_PASS").await?,
            port,
        })
    }
}
