//! Router assembly and listener setup.

use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::handlers;
use keebridge_app::VaultService;

/// Build the router for `service`.
///
/// CORS is fully open: the caller is a browser extension whose origin is
/// not known in advance, and the listener is expected to be loopback only.
pub fn router(service: Arc<VaultService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/unlock", post(handlers::unlock))
        .route("/lock", post(handlers::lock))
        .route("/status", get(handlers::status))
        .route("/search", post(handlers::search))
        .route("/get-credentials", post(handlers::get_credentials))
        .route("/force-reload", post(handlers::force_reload))
        .layer(cors)
        .with_state(service)
}

/// Serve requests on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    service: Arc<VaultService>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Bind `addr` and serve in a background task.
///
/// Returns the bound address, useful when `addr` asked for port 0.
pub async fn start_server_on(
    addr: SocketAddr,
    service: Arc<VaultService>,
) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = serve(listener, service, std::future::pending()).await {
            error!("Server error: {}", e);
        }
    });

    Ok((local_addr, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use keebridge_app::ServiceConfig;
    use keebridge_crypto::KdfParams;
    use keebridge_vault::{LocalLibrary, VaultEntry, VaultWriter};
    use reqwest::StatusCode;
    use serde_json::{json, Value};
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct TestServer {
        _dir: TempDir,
        vault: PathBuf,
        base: String,
        client: reqwest::Client,
        handle: JoinHandle<()>,
        entry: VaultEntry,
    }

    impl TestServer {
        async fn start() -> Self {
            let dir = TempDir::new().unwrap();
            let vault = dir.path().join("Passwords.kbv");
            let entry = VaultEntry::new("GitHub", "octocat", "gh-secret", "https://github.com");

            VaultWriter::new(KdfParams::minimal())
                .save(&vault, "master", None, std::slice::from_ref(&entry))
                .await
                .unwrap();

            let service = Arc::new(VaultService::new(
                Arc::new(LocalLibrary),
                ServiceConfig::default(),
            ));
            let (addr, handle) = start_server_on("127.0.0.1:0".parse().unwrap(), service)
                .await
                .unwrap();

            Self {
                _dir: dir,
                vault,
                base: format!("http://{}", addr),
                client: reqwest::Client::new(),
                handle,
                entry,
            }
        }

        async fn post(&self, route: &str, body: Value) -> (StatusCode, Value) {
            let response = self
                .client
                .post(format!("{}{}", self.base, route))
                .json(&body)
                .send()
                .await
                .unwrap();
            let status = response.status();
            (status, response.json().await.unwrap())
        }

        async fn status(&self) -> Value {
            self.client
                .get(format!("{}/status", self.base))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap()
        }

        async fn unlock(&self) -> (StatusCode, Value) {
            let path = self.vault.display().to_string();
            self.post("/unlock", json!({ "dbPath": path, "password": "master" }))
                .await
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            self.handle.abort();
        }
    }

    #[tokio::test]
    async fn test_unlock_search_fetch_lock() {
        let server = TestServer::start().await;
        assert_eq!(server.status().await["data"]["locked"], true);

        let (status, body) = server.unlock().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, body) = server
            .post("/search", json!({ "url": "https://github.com/login" }))
            .await;
        assert_eq!(status, StatusCode::OK);
        let entries = body["data"]["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["uuid"], server.entry.id.to_string());
        assert!(entries[0].get("password").is_none());

        let (status, body) = server
            .post("/get-credentials", json!({ "uuid": server.entry.id.to_string() }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["password"], "gh-secret");

        let (status, _) = server.post("/lock", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(server.status().await["data"]["locked"], true);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let server = TestServer::start().await;

        let (status, body) = server.post("/search", json!({ "url": "github.com" })).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Database locked");

        let path = server.vault.display().to_string();
        let (status, _) = server
            .post("/unlock", json!({ "dbPath": path, "password": "wrong" }))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = server
            .post("/unlock", json!({ "dbPath": "/nonexistent/v.kbv", "password": "x" }))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        server.unlock().await;

        let (status, _) = server.post("/search", json!({ "url": "" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = server.post("/search", json!({ "nope": 1 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = server
            .post("/get-credentials", json!({ "uuid": "not-a-uuid" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let unknown = keebridge_common::EntryId::new().to_string();
        let (status, _) = server
            .post("/get-credentials", json!({ "uuid": unknown }))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_force_reload_failure_reports_and_locks() {
        let server = TestServer::start().await;
        server.unlock().await;

        let (status, body) = server.post("/force-reload", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["message"], "Database reloaded");

        tokio::fs::write(&server.vault, b"not a vault").await.unwrap();

        let (status, body) = server.post("/force-reload", json!({})).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);

        let status = server.status().await;
        assert_eq!(status["data"]["locked"], true);
        assert!(status["data"]["lastError"].is_string());
    }

    #[tokio::test]
    async fn test_cors_preflight_allowed() {
        let server = TestServer::start().await;
        let response = server
            .client
            .request(reqwest::Method::OPTIONS, format!("{}/search", server.base))
            .header("Origin", "chrome-extension://abcdef")
            .header("Access-Control-Request-Method", "POST")
            .send()
            .await
            .unwrap();

        assert!(response.status().is_success());
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );
    }
}
