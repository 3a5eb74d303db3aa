//! KeyAuth Core - identity and organization service backend
//!
//! Domains, departments, projects, roles and member users behind a REST API,
//! with cached user aggregate views.

pub mod api;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod repository;
pub mod server;
pub mod service;
pub mod state;
pub mod telemetry;

pub use config::Config;
pub use error::{AppError, Result};
