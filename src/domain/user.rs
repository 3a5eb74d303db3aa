//! User models and the aggregated user view

use super::{Department, Domain, Project, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashSet;
use validator::Validate;

/// Persisted user record. Foreign references are bare ids here; see
/// [`UserAggregate`] for the resolved view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub domain_id: String,
    pub department_id: String,
    pub account: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub default_project_id: Option<String>,
    /// Login counters are maintained by the authentication flow
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_login_ip: Option<String>,
    pub login_failed_times: i32,
    pub login_success_times: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for User {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: super::new_id(),
            domain_id: String::new(),
            department_id: String::new(),
            account: String::new(),
            display_name: None,
            email: None,
            mobile: None,
            default_project_id: None,
            last_login_at: None,
            last_login_ip: None,
            login_failed_times: 0,
            login_success_times: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a member user
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(length(min = 1, max = 128))]
    pub account: String,
    #[serde(default)]
    pub domain_id: String,
    /// Falls back to the domain's default department when absent
    pub department_id: Option<String>,
    pub default_project_id: Option<String>,
    #[validate(length(max = 255))]
    pub display_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 32))]
    pub mobile: Option<String>,
}

/// A user ready to be written: the department is always resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub id: String,
    pub domain_id: String,
    pub department_id: String,
    pub account: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub default_project_id: Option<String>,
}

impl NewUser {
    pub fn from_input(input: CreateUserInput, department_id: String) -> Self {
        Self {
            id: super::new_id(),
            domain_id: input.domain_id,
            department_id,
            account: input.account,
            display_name: input.display_name,
            email: input.email,
            mobile: input.mobile,
            default_project_id: input.default_project_id,
        }
    }
}

/// Fully resolved user view returned by the user service and cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAggregate {
    #[serde(flatten)]
    pub user: User,
    pub domain: Domain,
    pub department: Department,
    pub roles: Vec<Role>,
    /// Only loaded on single-user reads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<Project>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_project: Option<Project>,
}

impl UserAggregate {
    pub fn new(user: User, domain: Domain, department: Department, roles: Vec<Role>) -> Self {
        Self {
            user,
            domain,
            department,
            roles: dedup_roles(roles),
            projects: None,
            default_project: None,
        }
    }

    /// Whether this view really belongs to `user_id` and its references
    /// agree with the user record.
    pub fn is_consistent_for(&self, user_id: &str) -> bool {
        self.user.id == user_id
            && self.domain.id == self.user.domain_id
            && self.department.id == self.user.department_id
            && self.department.domain_id == self.domain.id
            && match (&self.user.default_project_id, &self.default_project) {
                (Some(id), Some(project)) => &project.id == id,
                (None, None) => true,
                _ => false,
            }
    }
}

/// Drop repeated role ids, keeping the first occurrence.
pub fn dedup_roles(roles: Vec<Role>) -> Vec<Role> {
    let mut seen = HashSet::new();
    roles
        .into_iter()
        .filter(|role| seen.insert(role.id.clone()))
        .collect()
}
