//! Server initialization and routing

use crate::api;
use crate::cache::{CacheManager, CacheOperations, LocalCacheManager, NoOpCacheManager};
use crate::config::{CacheBackend, Config};
use crate::middleware::ObservabilityLayer;
use crate::repository::{
    department::DepartmentRepositoryImpl, domain::DomainRepositoryImpl,
    project::ProjectRepositoryImpl, role::RoleRepositoryImpl, user::UserRepositoryImpl,
};
use crate::service::{
    CachePolicy, OrganizationService, ProjectService, RoleService, UserCache,
    UserRepositoryBundle, UserService,
};
use crate::state::HasServices;
use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::{mysql::MySqlPoolOptions, MySqlPool};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: MySqlPool,
    pub cache: Arc<dyn CacheOperations>,
    pub user_service: Arc<
        UserService<
            UserRepositoryImpl,
            DomainRepositoryImpl,
            DepartmentRepositoryImpl,
            ProjectRepositoryImpl,
            RoleRepositoryImpl,
        >,
    >,
    pub project_service:
        Arc<ProjectService<ProjectRepositoryImpl, DomainRepositoryImpl, DepartmentRepositoryImpl>>,
    pub role_service: Arc<RoleService<RoleRepositoryImpl, DepartmentRepositoryImpl>>,
    pub organization_service: Arc<
        OrganizationService<DomainRepositoryImpl, DepartmentRepositoryImpl, UserRepositoryImpl>,
    >,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl HasServices for AppState {
    type UserRepo = UserRepositoryImpl;
    type DomainRepo = DomainRepositoryImpl;
    type DepartmentRepo = DepartmentRepositoryImpl;
    type ProjectRepo = ProjectRepositoryImpl;
    type RoleRepo = RoleRepositoryImpl;

    fn config(&self) -> &Config {
        &self.config
    }

    fn user_service(
        &self,
    ) -> &UserService<
        Self::UserRepo,
        Self::DomainRepo,
        Self::DepartmentRepo,
        Self::ProjectRepo,
        Self::RoleRepo,
    > {
        &self.user_service
    }

    fn project_service(
        &self,
    ) -> &ProjectService<Self::ProjectRepo, Self::DomainRepo, Self::DepartmentRepo> {
        &self.project_service
    }

    fn role_service(&self) -> &RoleService<Self::RoleRepo, Self::DepartmentRepo> {
        &self.role_service
    }

    fn organization_service(
        &self,
    ) -> &OrganizationService<Self::DomainRepo, Self::DepartmentRepo, Self::UserRepo> {
        &self.organization_service
    }

    fn metrics_handle(&self) -> Option<&PrometheusHandle> {
        self.metrics_handle.as_ref()
    }

    async fn check_ready(&self) -> (bool, bool) {
        let db_ok = sqlx::query("SELECT 1").execute(&self.db_pool).await.is_ok();
        let cache_ok = self.cache.ping().await.is_ok();
        (db_ok, cache_ok)
    }
}

/// Build the cache backend selected by configuration.
async fn build_cache(config: &Config) -> Result<Arc<dyn CacheOperations>> {
    if !config.cache.is_active() {
        info!("User cache disabled");
        return Ok(Arc::new(NoOpCacheManager::new()));
    }

    let cache: Arc<dyn CacheOperations> = match config.cache.backend {
        CacheBackend::Redis => {
            let manager = CacheManager::new(&config.redis).await?;
            info!("Connected to Redis");
            Arc::new(manager)
        }
        CacheBackend::Memory => {
            info!(
                capacity = config.cache.local_capacity,
                "Using in-process user cache"
            );
            Arc::new(LocalCacheManager::from_config(&config.cache))
        }
        CacheBackend::None => Arc::new(NoOpCacheManager::new()),
    };
    Ok(cache)
}

/// Run the HTTP server until Ctrl-C
pub async fn run(config: Config, metrics_handle: Option<PrometheusHandle>) -> Result<()> {
    let db_pool = MySqlPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;

    info!("Connected to database");

    let cache = build_cache(&config).await?;
    let user_cache = UserCache::new(cache.clone(), CachePolicy::from(&config.cache));

    let user_repo = Arc::new(UserRepositoryImpl::new(db_pool.clone()));
    let domain_repo = Arc::new(DomainRepositoryImpl::new(db_pool.clone()));
    let department_repo = Arc::new(DepartmentRepositoryImpl::new(db_pool.clone()));
    let project_repo = Arc::new(ProjectRepositoryImpl::new(db_pool.clone()));
    let role_repo = Arc::new(RoleRepositoryImpl::new(db_pool.clone()));

    let default_department = config.organization.default_department_name.clone();

    let user_service = Arc::new(UserService::new(
        UserRepositoryBundle::new(
            user_repo.clone(),
            domain_repo.clone(),
            department_repo.clone(),
            project_repo.clone(),
            role_repo.clone(),
        ),
        user_cache.clone(),
        default_department.clone(),
    ));
    let project_service = Arc::new(ProjectService::new(
        project_repo,
        domain_repo.clone(),
        department_repo.clone(),
        user_cache.clone(),
    ));
    let role_service = Arc::new(RoleService::new(
        role_repo,
        department_repo.clone(),
        user_cache,
    ));
    let organization_service = Arc::new(OrganizationService::new(
        domain_repo,
        department_repo,
        user_repo,
        default_department,
    ));

    let http_addr = config.http_addr();
    let state = AppState {
        config: Arc::new(config),
        db_pool: db_pool.clone(),
        cache,
        user_service,
        project_service,
        role_service,
        organization_service,
        metrics_handle,
    };

    let app = build_router(state);

    let listener = TcpListener::bind(&http_addr).await?;
    info!("HTTP server started on {}", http_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db_pool.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Build the HTTP router with generic state type
///
/// Generic over the state so tests can drive it with in-memory repositories.
pub fn build_router<S: HasServices>(state: S) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(api::health::health))
        .route("/ready", get(api::health::ready::<S>))
        .route("/metrics", get(api::metrics::metrics_handler::<S>))
        // Domains
        .route(
            "/api/v1/domains",
            get(api::organization::list_domains::<S>).post(api::organization::create_domain::<S>),
        )
        .route(
            "/api/v1/domains/{domain_id}",
            get(api::organization::get_domain::<S>).delete(api::organization::delete_domain::<S>),
        )
        // Departments
        .route(
            "/api/v1/domains/{domain_id}/departments",
            get(api::organization::list_departments::<S>)
                .post(api::organization::create_department::<S>),
        )
        .route(
            "/api/v1/domains/{domain_id}/departments/{department_id}",
            get(api::organization::get_department::<S>)
                .delete(api::organization::delete_department::<S>),
        )
        .route(
            "/api/v1/domains/{domain_id}/departments/{department_id}/roles",
            get(api::role::list_department_roles::<S>),
        )
        .route(
            "/api/v1/domains/{domain_id}/departments/{department_id}/roles/{role_id}",
            post(api::role::grant_department_role::<S>)
                .delete(api::role::revoke_department_role::<S>),
        )
        // Projects
        .route(
            "/api/v1/domains/{domain_id}/projects",
            get(api::project::list_projects::<S>).post(api::project::create_project::<S>),
        )
        .route(
            "/api/v1/domains/{domain_id}/projects/{project_id}",
            get(api::project::get_project::<S>).delete(api::project::delete_project::<S>),
        )
        .route(
            "/api/v1/domains/{domain_id}/projects/{project_id}/users",
            get(api::project::list_project_users::<S>)
                .post(api::project::add_users_to_project::<S>)
                .delete(api::project::remove_users_from_project::<S>),
        )
        // Users
        .route(
            "/api/v1/domains/{domain_id}/users",
            get(api::user::list_member_users::<S>).post(api::user::create_member_user::<S>),
        )
        .route(
            "/api/v1/domains/{domain_id}/users/{user_id}",
            get(api::user::get_user::<S>).delete(api::user::delete_user::<S>),
        )
        .route(
            "/api/v1/domains/{domain_id}/users/{user_id}/roles/{role_name}",
            post(api::user::bind_role::<S>).delete(api::user::unbind_role::<S>),
        )
        // Roles
        .route(
            "/api/v1/roles",
            get(api::role::list_roles::<S>).post(api::role::create_role::<S>),
        )
        .route(
            "/api/v1/roles/{role_id}",
            get(api::role::get_role::<S>).delete(api::role::delete_role::<S>),
        )
        .layer(TraceLayer::new_for_http())
        .layer(ObservabilityLayer)
        .layer(cors)
        .with_state(state)
}
