use std::sync::Arc;

use ssot_binder::BinderHandle;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;

/// SSOT binder HTTP server.
pub struct SsotServer {
    config: ServerConfig,
    handle: Arc<BinderHandle>,
}

impl SsotServer {
    /// A server that loads its registry from `config.registry_path`.
    pub fn new(config: ServerConfig) -> Self {
        let handle = Arc::new(BinderHandle::new(config.registry_path.clone()));
        Self { config, handle }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn handle(&self) -> &Arc<BinderHandle> {
        &self.handle
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(Arc::clone(&self.handle))
    }

    /// Load the registry, then start serving requests.
    ///
    /// A registry that fails to load aborts startup.
    pub async fn serve(self) -> ServerResult<()> {
        let binder = self.handle.get()?;
        tracing::info!(
            capsule = binder.capsule_id(),
            entries = binder.len(),
            root = %binder.merkle_root(),
            "registry ready"
        );

        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("SSOT server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
