//! E2E Test Suite Entry Point
//!
//! Runs the API server on an ephemeral port with S3 presigning pointed at a
//! mock storage endpoint, then drives it over HTTP.
//!
//! ```bash
//! cargo test --test e2e_test
//! ```
//!
//! ## Test Categories
//!
//! - `auth_flow`: signup, login, session cookie and logout
//! - `class_flow`: class creation and joining
//! - `upload_flow`: presigned targets and the upload-and-persist pipeline
//! - `error_scenarios`: error statuses and bodies

mod e2e;

pub use e2e::*;
