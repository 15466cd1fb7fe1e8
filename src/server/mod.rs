//! HTTP server module
//!
//! A hyper HTTP/1.1 accept loop: every connection runs in its own tokio task
//! and every request is read in full, then handed to [`crate::api::handle`].
//!
//! # Example
//!
//! ```no_run
//! use edulang_api::config::Config;
//! use edulang_api::server::Server;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load("config.yaml")?;
//! let server = Server::new(config).await?;
//! println!("Listening on {}", server.local_addr());
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

use crate::ai::AiClient;
use crate::api::{self, ApiError, ApiRequest, AppState};
use crate::auth::jwt::JwtAuthenticator;
use crate::config::Config;
use crate::metrics::server::MetricsServer;
use crate::s3::S3Presigner;
use crate::store::MemoryStore;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(String),

    #[error("Failed to initialize: {0}")]
    InitError(String),
}

/// EduLang API server
pub struct Server {
    state: Arc<AppState>,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Build the production state from configuration and bind
    ///
    /// Documents are presigned against S3 and records are kept in memory.
    pub async fn new(config: Config) -> Result<Self, ServerError> {
        let state = AppState {
            authenticator: JwtAuthenticator::from_config(&config.auth),
            store: Arc::new(MemoryStore::new()),
            issuer: Arc::new(S3Presigner::new(&config.storage).await),
            ai: AiClient::new(&config.ai)
                .map_err(|e| ServerError::InitError(e.to_string()))?
                .with_storage_endpoint(config.storage.endpoint.as_deref()),
            config,
        };
        Self::with_state(state).await
    }

    /// Bind with caller-supplied collaborators
    pub async fn with_state(state: AppState) -> Result<Self, ServerError> {
        let addr: SocketAddr = state
            .config
            .server
            .address
            .parse()
            .map_err(|e| ServerError::BindError(format!("Invalid address: {}", e)))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(format!("Failed to bind to {}: {}", addr, e)))?;

        // Port 0 binds resolve here
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(format!("Failed to get local address: {}", e)))?;

        info!("Server bound to {}", local_addr);

        Ok(Self {
            state: Arc::new(state),
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until Ctrl-C
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
    }

    /// Serve until `shutdown` completes
    ///
    /// Starts the metrics endpoint first when it is enabled. Connections
    /// already accepted keep running on their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let mut metrics = if self.state.config.metrics.enabled {
            let mut server = MetricsServer::on_port(self.state.config.metrics.port);
            let addr = server
                .start()
                .await
                .map_err(|e| ServerError::BindError(format!("Metrics endpoint: {}", e)))?;
            info!("Metrics available at http://{}/metrics", addr);
            Some(server)
        } else {
            None
        };

        info!("Starting EduLang API on {}", self.local_addr);
        tokio::pin!(shutdown);

        loop {
            let (stream, peer_addr) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                },
            };

            let state = Arc::clone(&self.state);

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let state = Arc::clone(&state);
                    async move { serve_request(req, state).await }
                });

                if let Err(e) = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await
                {
                    warn!("Error serving connection from {}: {}", peer_addr, e);
                }
            });
        }

        info!("Shutting down server");
        if let Some(ref mut server) = metrics {
            server.shutdown().await;
        }
        Ok(())
    }
}

/// Read the request in full and hand it to the API layer
async fn serve_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().to_string();
    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    info!("Handling {} {}", method, path);

    let mut headers = HashMap::new();
    for (name, value) in req.headers() {
        if let Ok(v) = value.to_str() {
            headers.insert(name.as_str().to_ascii_lowercase(), v.to_string());
        }
    }

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("Failed to read request body for {}: {}", path, e);
            return Ok(ApiError::bad_request(format!("Failed to read body: {}", e)).into_response());
        }
    };

    let request = ApiRequest {
        method,
        path,
        headers,
        body,
    };

    let response = api::handle(&state, request).await;
    if response.status() == StatusCode::INTERNAL_SERVER_ERROR {
        crate::metrics::record_error("http_500");
    }
    Ok(response)
}
