//! HTTP-level tests: real router, in-memory state


use super::{
    TestDepartmentRepository, TestDomainRepository, TestOrganizationService,
    TestProjectRepository, TestProjectService, TestRoleRepository, TestRoleService, TestServices,
    TestUserRepository, TestUserService,
};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use keyauth_core::config::Config;
use keyauth_core::server::build_router;
use keyauth_core::state::HasServices;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tower::ServiceExt;

/// State handed to the router in tests
#[derive(Clone)]
pub struct TestAppState {
    pub config: Arc<Config>,
    pub services: Arc<TestServices>,
}

impl TestAppState {
    pub fn new() -> Self {
        Self::with_services(TestServices::new())
    }

    pub fn with_services(services: TestServices) -> Self {
        let config = Config::from_source(|key| match key {
            "DATABASE_URL" => Some("mysql://localhost/keyauth_test".to_string()),
            "CACHE_BACKEND" => Some("memory".to_string()),
            _ => None,
        })
        .expect("test config");

        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}

impl Default for TestAppState {
    fn default() -> Self {
        Self::new()
    }
}

impl HasServices for TestAppState {
    type UserRepo = TestUserRepository;
    type DomainRepo = TestDomainRepository;
    type DepartmentRepo = TestDepartmentRepository;
    type ProjectRepo = TestProjectRepository;
    type RoleRepo = TestRoleRepository;

    fn config(&self) -> &Config {
        &self.config
    }

    fn user_service(&self) -> &TestUserService {
        &self.services.users
    }

    fn project_service(&self) -> &TestProjectService {
        &self.services.projects
    }

    fn role_service(&self) -> &TestRoleService {
        &self.services.roles
    }

    fn organization_service(&self) -> &TestOrganizationService {
        &self.services.organization
    }

    fn metrics_handle(&self) -> Option<&PrometheusHandle> {
        None
    }

    async fn check_ready(&self) -> (bool, bool) {
        (true, true)
    }
}

pub fn build_test_router(state: TestAppState) -> Router {
    build_router(state)
}

async fn send<R: DeserializeOwned>(
    app: &Router,
    request: Request<Body>,
) -> (StatusCode, Option<R>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).ok();
    (status, json)
}

pub async fn get_json<R: DeserializeOwned>(app: &Router, path: &str) -> (StatusCode, Option<R>) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json<T: Serialize, R: DeserializeOwned>(
    app: &Router,
    path: &str,
    body: &T,
) -> (StatusCode, Option<R>) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap();
    send(app, request).await
}

/// POST with no body, for bind/grant routes
pub async fn post_empty<R: DeserializeOwned>(app: &Router, path: &str) -> (StatusCode, Option<R>) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn delete_json<R: DeserializeOwned>(
    app: &Router,
    path: &str,
) -> (StatusCode, Option<R>) {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(path)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn delete_with_body<T: Serialize, R: DeserializeOwned>(
    app: &Router,
    path: &str,
    body: &T,
) -> (StatusCode, Option<R>) {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap();
    send(app, request).await
}
