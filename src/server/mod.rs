//! Read-only static file server over the store directory.
//!
//! Serves whatever the generator wrote (per-source sitemap files and the
//! sitemap-index) on the configured address, shutting down gracefully with
//! the rest of the process.

use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::services::ServeDir;
use tracing::info;

/// Static file server bound to its listen address.
pub struct FileServer {
    listener: TcpListener,
    root: PathBuf,
}

impl FileServer {
    /// Bind the listen address. Binding failures are startup failures.
    pub async fn bind(listen: &str, root: impl AsRef<Path>) -> Result<Self> {
        let listener = TcpListener::bind(listen)
            .await
            .with_context(|| format!("failed to bind file server on {listen}"))?;

        Ok(Self {
            listener,
            root: root.as_ref().to_path_buf(),
        })
    }

    /// The address the server actually listens on.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("failed to read file server address")
    }

    /// Serve the store directory until shutdown is signalled.
    pub async fn serve(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let addr = self.local_addr()?;
        let app = Router::new().fallback_service(ServeDir::new(&self.root));

        info!(addr = %addr, "sitemaps served");

        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await
            .context("file server failed")
    }
}
