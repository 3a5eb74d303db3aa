//! Application state traits for dependency injection
//!
//! Handlers are generic over `HasServices`, so the same code runs against the
//! production `AppState` and the in-memory test state.

use crate::config::Config;
use crate::repository::{
    DepartmentRepository, DomainRepository, ProjectRepository, RoleRepository, UserRepository,
};
use crate::service::{OrganizationService, ProjectService, RoleService, UserService};
use metrics_exporter_prometheus::PrometheusHandle;

/// Trait for application state that provides access to all services.
pub trait HasServices: Clone + Send + Sync + 'static {
    type UserRepo: UserRepository;
    type DomainRepo: DomainRepository;
    type DepartmentRepo: DepartmentRepository;
    type ProjectRepo: ProjectRepository;
    type RoleRepo: RoleRepository;

    fn config(&self) -> &Config;

    /// User aggregation, creation and role binding
    fn user_service(
        &self,
    ) -> &UserService<
        Self::UserRepo,
        Self::DomainRepo,
        Self::DepartmentRepo,
        Self::ProjectRepo,
        Self::RoleRepo,
    >;

    fn project_service(
        &self,
    ) -> &ProjectService<Self::ProjectRepo, Self::DomainRepo, Self::DepartmentRepo>;

    fn role_service(&self) -> &RoleService<Self::RoleRepo, Self::DepartmentRepo>;

    fn organization_service(
        &self,
    ) -> &OrganizationService<Self::DomainRepo, Self::DepartmentRepo, Self::UserRepo>;

    /// Prometheus registry, present when metrics are enabled
    fn metrics_handle(&self) -> Option<&PrometheusHandle>;

    /// Check if the system is ready (database and cache are healthy)
    /// Returns (db_ok, cache_ok) tuple
    fn check_ready(&self) -> impl std::future::Future<Output = (bool, bool)> + Send;
}
