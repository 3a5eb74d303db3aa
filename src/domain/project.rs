//! Project model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Resource scope users can belong to.
///
/// A project linked to a department is joined automatically by every user
/// created in that department.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: String,
    pub domain_id: String,
    pub department_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Project {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: super::new_id(),
            domain_id: String::new(),
            department_id: None,
            name: String::new(),
            description: None,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a project inside a domain
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateProjectInput {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    pub description: Option<String>,
    /// Department whose members auto-join this project
    pub department_id: Option<String>,
}
