//! Wiring: one place that owns the shared handles.
//!
//! A [`Service`] holds the cache, queue and subprocess runner chosen for a
//! [`ServiceConfig`] and hands the same handles to the gateways and the
//! pipeline workers.

use crate::cache::{FileResultCache, MemoryResultCache, ResultCache};
use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::gateway::Gateway;
use crate::pipeline::command::{CommandRunner, SystemCommandRunner};
use crate::pipeline::Pipeline;
use crate::queue::{JobQueue, MemoryJobQueue};
use crate::worker::WorkerPool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct Service {
    config: Arc<ServiceConfig>,
    gateway: Gateway,
    pipeline: Pipeline,
}

impl Service {
    /// Open the stores named by `config` and use the real external tools.
    pub async fn open(config: ServiceConfig) -> Result<Self, ServiceError> {
        tokio::fs::create_dir_all(&config.workspace_root).await?;

        let cache: Arc<dyn ResultCache> = match config.cache_dir {
            Some(ref dir) => {
                info!("Result cache: {}", dir.display());
                Arc::new(FileResultCache::open(dir).await?)
            }
            None => {
                info!("Result cache: in memory");
                Arc::new(MemoryResultCache::new())
            }
        };

        let queue: Arc<dyn JobQueue> = match config.queue_journal {
            Some(ref path) => Arc::new(MemoryJobQueue::open(path).await?),
            None => Arc::new(MemoryJobQueue::new()),
        };

        Ok(Self::with_parts(
            config,
            queue,
            cache,
            Arc::new(SystemCommandRunner),
        ))
    }

    /// Assemble a service from explicit parts.
    pub fn with_parts(
        config: ServiceConfig,
        queue: Arc<dyn JobQueue>,
        cache: Arc<dyn ResultCache>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let config = Arc::new(config);
        let gateway = Gateway::new(
            Arc::clone(&queue),
            Arc::clone(&cache),
            config.workspace_root.clone(),
        );
        let pipeline = Pipeline::new(Arc::clone(&config), queue, cache, runner);
        Self {
            config,
            gateway,
            pipeline,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Start the configured number of pipeline workers.
    pub fn start_workers(&self) -> WorkerPool {
        WorkerPool::spawn(
            self.pipeline.clone(),
            self.config.workers,
            self.config.poll_interval(),
        )
    }

    /// HTTP router bound to this service's gateway.
    pub fn router(&self) -> axum::Router {
        crate::api::create_router(self.gateway.clone(), self.config.max_upload_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_with_file_stores() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServiceConfig::builder()
            .workspace_root(dir.path().join("ws"))
            .cache_dir(dir.path().join("cache"))
            .queue_journal(dir.path().join("queue.json"))
            .workers(1)
            .build()
            .unwrap();

        let service = Service::open(config).await.unwrap();

        assert!(dir.path().join("ws").is_dir());
        assert!(dir.path().join("cache/ocr/completed").is_dir());
        assert!(dir.path().join("queue.json").is_file());
        assert_eq!(service.config().workers, 1);
    }
}
