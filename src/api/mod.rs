//! REST API handlers and shared response types

pub mod health;
pub mod metrics;
pub mod organization;
pub mod project;
pub mod role;
pub mod user;

use serde::{Deserialize, Serialize};

/// Success envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse<T> {
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Message response for writes that return no entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result of a batched membership write
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipResponse {
    pub project_id: String,
    pub requested: usize,
    pub affected: u64,
}
