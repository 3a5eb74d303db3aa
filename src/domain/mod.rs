//! Domain models for KeyAuth Core

pub mod common;
pub mod organization;
pub mod project;
pub mod rbac;
pub mod user;

pub use common::*;
pub use organization::*;
pub use project::*;
pub use rbac::*;
pub use user::*;
