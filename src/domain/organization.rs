//! Domain (tenant) and department models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::BTreeMap;
use validator::Validate;

/// Tenant root owning departments, projects and users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Domain {
    pub id: String,
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub metadata: Json<BTreeMap<String, String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Domain {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: super::new_id(),
            name: String::new(),
            display_name: None,
            description: None,
            metadata: Json(BTreeMap::new()),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a domain
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateDomainInput {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(max = 255))]
    pub display_name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Organizational unit scoped to exactly one domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Department {
    pub id: String,
    pub domain_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Department {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: super::new_id(),
            domain_id: String::new(),
            name: String::new(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a department inside a domain
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateDepartmentInput {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    pub description: Option<String>,
}
