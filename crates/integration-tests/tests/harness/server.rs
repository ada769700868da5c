//! Test server wrapper that starts tollgate on a random port

use std::net::SocketAddr;

use tollgate_config::Config;
use tollgate_server::Server;
use tokio_util::sync::CancellationToken;

/// A running test server instance
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    client: reqwest::Client,
}

impl TestServer {
    /// Start a test server with the given configuration
    ///
    /// Binds to port 0 for automatic port assignment
    pub async fn start(config: Config) -> anyhow::Result<Self> {
        let server = Server::new(&config)?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            axum::serve(listener, server.into_router())
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self {
            addr,
            shutdown,
            client: reqwest::Client::new(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// `POST /v1/govern` and return the decoded body
    pub async fn govern(&self, task_type: &str, user_id: &str, prompt: &str) -> serde_json::Value {
        let response = self
            .client
            .post(self.url("/v1/govern"))
            .json(&serde_json::json!({
                "task_type": task_type,
                "user_id": user_id,
                "prompt": prompt,
            }))
            .send()
            .await
            .expect("govern request failed");

        assert_eq!(response.status(), 200, "govern must always answer 200");
        response.json().await.expect("govern body is JSON")
    }

    /// `GET` a JSON status endpoint
    pub async fn get_json(&self, path: &str) -> serde_json::Value {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("status request failed")
            .json()
            .await
            .expect("status body is JSON")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
