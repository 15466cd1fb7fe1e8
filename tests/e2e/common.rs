//! Common E2E Test Infrastructure
//!
//! - a running API server per test
//! - a wiremock server standing in for S3 and the AI services
//! - request helpers carrying a session token

use edulang_api::config::{
    AiConfig, AuthConfig, Config, MetricsConfig, ServerConfig, StorageConfig,
};
use edulang_api::server::Server;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::oneshot;
use wiremock::MockServer;

/// Bucket presigned targets point at
pub const TEST_BUCKET: &str = "edulang-docs";

/// JWT secret for test sessions
pub const JWT_SECRET: &str = "e2e-test-secret-key-for-jwt-tokens";

/// E2E Test Environment
///
/// The server stops when the environment is dropped.
pub struct TestEnv {
    pub base_url: String,
    /// Mock S3 endpoint; also serves the AI routes under `/ai/*`
    pub upstream: MockServer,
    pub client: reqwest::Client,
    _shutdown: oneshot::Sender<()>,
}

impl TestEnv {
    pub async fn start() -> Self {
        let upstream = MockServer::start().await;
        Self::with_config(Self::config(&upstream.uri()), upstream).await
    }

    pub async fn with_config(config: Config, upstream: MockServer) -> Self {
        let server = Server::new(config).await.expect("server should start");
        let base_url = format!("http://{}", server.local_addr());

        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(server.run_until(async {
            let _ = rx.await;
        }));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("client should build");

        Self {
            base_url,
            upstream,
            client,
            _shutdown: tx,
        }
    }

    /// Configuration with storage and AI pointed at `upstream`
    pub fn config(upstream: &str) -> Config {
        Config {
            server: ServerConfig {
                address: "127.0.0.1:0".into(),
            },
            auth: AuthConfig::with_secret(JWT_SECRET),
            storage: StorageConfig {
                bucket: TEST_BUCKET.into(),
                region: "us-east-1".into(),
                endpoint: Some(upstream.to_string()),
                access_key: Some("minioadmin".into()),
                secret_key: Some("minioadmin".into()),
                presign_expiry_secs: 900,
                public_read: true,
            },
            ai: AiConfig {
                text_extraction_url: Some(format!("{}/ai/extract", upstream)),
                translate_url: Some(format!("{}/ai/translate", upstream)),
                text_to_speech_url: Some(format!("{}/ai/speak", upstream)),
                timeout_seconds: 5,
            },
            metrics: MetricsConfig {
                enabled: false,
                port: 0,
            },
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> reqwest::Response {
        let mut request = self.client.post(self.url(path)).json(&body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("request should complete")
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("request should complete")
    }

    /// Sign up and return the session token
    pub async fn signup(&self, email: &str, role: &str) -> String {
        let response = self
            .post(
                "/api/auth/signup",
                None,
                serde_json::json!({
                    "name": "E2E User",
                    "email": email,
                    "password": "correct horse",
                    "role": role
                }),
            )
            .await;
        assert_eq!(response.status(), 200, "signup should succeed");

        let body: Value = response.json().await.expect("signup body");
        body["token"].as_str().expect("token").to_string()
    }

    /// Create a class as `token` and return its id
    pub async fn create_class(&self, token: &str, code: &str) -> String {
        let response = self
            .post(
                "/api/class/create",
                Some(token),
                serde_json::json!({
                    "title": "Spanish I",
                    "description": "Introductory Spanish",
                    "subject": "Languages",
                    "code": code
                }),
            )
            .await;
        assert_eq!(response.status(), 201, "class creation should succeed");

        let body: Value = response.json().await.expect("class body");
        body["classId"].as_str().expect("classId").to_string()
    }
}
