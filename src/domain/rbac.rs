//! Role model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Named permission grouping, bound to users directly or inherited from a
/// department at user creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Role {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: super::new_id(),
            name: String::new(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a role
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateRoleInput {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    pub description: Option<String>,
}
