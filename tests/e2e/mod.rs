//! End-to-End Tests for the EduLang API

pub mod auth_flow;
pub mod class_flow;
pub mod common;
pub mod error_scenarios;
pub mod upload_flow;
