//! Business logic layer

pub mod organization;
pub mod project;
pub mod role;
pub mod user;
pub mod user_cache;

pub use organization::OrganizationService;
pub use project::ProjectService;
pub use role::RoleService;
pub use user::{UserRepositoryBundle, UserService};
pub use user_cache::{CachePolicy, UserCache};
