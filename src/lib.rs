//! EduLang API Library
//!
//! Backend of the EduLang classroom platform.
//!
//! # Features
//!
//! - **Accounts**: Argon2 password hashing and JWT sessions (cookie or bearer)
//! - **Classes**: professors create classes, students join them by code
//! - **Documents**: presigned S3 upload targets and per-class metadata records
//! - **Upload pipeline**: client-side upload-and-persist of a set of files
//! - **AI proxy**: text extraction, translation and text-to-speech forwarding
//!
//! # Example
//!
//! ```no_run
//! use edulang_api::{config::Config, server::Server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let server = Server::new(config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod ai;
pub mod api;
pub mod auth;
pub mod config;
pub mod metrics;
pub mod router;
pub mod s3;
pub mod server;
pub mod store;
pub mod upload;

// Re-export commonly used types
pub use config::Config;
pub use server::Server;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
