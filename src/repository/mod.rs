//! Data access layer (Repository pattern)
//!
//! One store per entity. Every call is atomic on its own; calls that touch
//! several tables run inside a single transaction.

pub mod department;
pub mod domain;
pub mod project;
pub mod role;
pub mod user;

pub use department::DepartmentRepository;
pub use domain::DomainRepository;
pub use project::ProjectRepository;
pub use role::RoleRepository;
pub use user::UserRepository;

use crate::error::AppError;

/// Map a MySQL duplicate-key failure (error 1062) to `Conflict`.
pub(crate) fn map_conflict_if_duplicate(error: sqlx::Error, what: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &error {
        if db_err.code().as_deref() == Some("1062") {
            return AppError::Conflict(format!("{} already exists", what));
        }
    }
    AppError::Database(error)
}
