//! Test utilities for backup-client
//!
//! Runs an axum router on an ephemeral port so the client can be exercised
//! against a local stand-in for an Atlassian instance.

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::Result;

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Start serving `router` on 127.0.0.1 with a random port
    ///
    /// # Example
    ///
    /// ```ignore
    /// use axum::{routing::post, Router};
    /// use backup_client::testing::TestServer;
    ///
    /// let router = Router::new().route("/rest/auth/1/session", post(|| async { "{}" }));
    /// let server = TestServer::start(router).await?;
    /// let profile = BackendProfile::resolve("jira", &server.base_url())?;
    /// ```
    pub async fn start<S>(router: axum::Router<S>) -> Result<Self>
    where
        S: Clone + Send + Sync + 'static,
        axum::Router<S>: Into<axum::Router>,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let router: axum::Router = router.into();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Base URL of the test server, usable as an instance argument
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
