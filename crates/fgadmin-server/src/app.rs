//! Wiring of the store, worker pool and services from configuration.

use std::sync::Arc;

use fgadmin_domain::{JobRunner, WorkerPool};
use fgadmin_storage::{MemoryTupleStore, TupleStore};
use tracing::{debug, info};

use crate::config::{ConfigLoadError, ServerConfig};
use crate::observability::init_logging;
use crate::services::{GroupService, RoleService};

/// The services of one process, sharing a single pool and store.
pub struct AdminServices {
    pub groups: GroupService,
    pub roles: RoleService,
    pool: Arc<WorkerPool>,
}

impl AdminServices {
    /// Installs logging, builds the store, starts the worker pool and
    /// creates the services.
    ///
    /// A global subscriber installed earlier is left in place. Must be
    /// called from within a Tokio runtime.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigLoadError> {
        config.validate()?;
        if !init_logging(&config.logging)? {
            debug!("keeping existing log subscriber");
        }

        let store: Arc<dyn TupleStore> = match config.store.backend.as_str() {
            "memory" => Arc::new(MemoryTupleStore::with_page_size(config.store.page_size)),
            other => {
                return Err(ConfigLoadError::Invalid {
                    message: format!("unsupported store backend: {other}"),
                })
            }
        };
        Ok(Self::with_store(store, config))
    }

    /// Like [`AdminServices::from_config`], over an existing store.
    pub fn with_store(store: Arc<dyn TupleStore>, config: &ServerConfig) -> Self {
        let pool = Arc::new(WorkerPool::new(config.pool_config()));
        let runner: Arc<dyn JobRunner> = pool.clone();

        info!(
            backend = %config.store.backend,
            workers = pool.workers(),
            "admin services ready"
        );

        Self {
            groups: GroupService::new(Arc::clone(&store), Arc::clone(&runner)),
            roles: RoleService::new(store, runner),
            pool,
        }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Stops the worker pool after queued jobs finish.
    pub async fn shutdown(&self) {
        info!(queued = self.pool.queued_jobs(), "shutting down worker pool");
        self.pool.shutdown().await;
    }
}
