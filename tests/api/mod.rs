//! API integration tests infrastructure
//!
//! In-memory repositories sharing one `TestDatabase`, plus a `TestCache` that
//! counts calls, so tests can assert on store and cache traffic.

pub mod http;

use async_trait::async_trait;
use chrono::Utc;
use keyauth_core::cache::CacheOperations;
use keyauth_core::domain::{
    new_id, CreateDepartmentInput, CreateDomainInput, CreateProjectInput, CreateRoleInput,
    Department, Domain, NewUser, Project, Role, User,
};
use keyauth_core::error::{AppError, Result};
use keyauth_core::repository::{
    DepartmentRepository, DomainRepository, ProjectRepository, RoleRepository, UserRepository,
};
use keyauth_core::service::{
    CachePolicy, OrganizationService, ProjectService, RoleService, UserCache,
    UserRepositoryBundle, UserService,
};
use sqlx::types::Json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

pub const DEFAULT_DEPARTMENT: &str = "general";

// ============================================================================
// Shared in-memory tables
// ============================================================================

#[derive(Default)]
pub struct TestDatabase {
    pub domains: RwLock<Vec<Domain>>,
    pub departments: RwLock<Vec<Department>>,
    pub projects: RwLock<Vec<Project>>,
    pub roles: RwLock<Vec<Role>>,
    /// (department_id, role_id)
    pub department_roles: RwLock<Vec<(String, String)>>,
    pub users: RwLock<Vec<User>>,
    /// (domain_id, user_id, role_id)
    pub user_roles: RwLock<Vec<(String, String, String)>>,
    /// (project_id, user_id)
    pub project_users: RwLock<Vec<(String, String)>>,
    /// Role ids whose binding fails, to exercise aborted cascades
    pub failing_role_binds: RwLock<Vec<String>>,
}

impl TestDatabase {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

// ============================================================================
// Test Repository Implementations
// ============================================================================

pub struct TestDomainRepository {
    db: Arc<TestDatabase>,
}

impl TestDomainRepository {
    pub fn new(db: Arc<TestDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DomainRepository for TestDomainRepository {
    async fn create(&self, input: &CreateDomainInput) -> Result<Domain> {
        let domain = Domain {
            id: new_id(),
            name: input.name.clone(),
            display_name: input.display_name.clone(),
            description: input.description.clone(),
            metadata: Json(input.metadata.clone()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.db.domains.write().await.push(domain.clone());
        Ok(domain)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Domain>> {
        let domains = self.db.domains.read().await;
        Ok(domains.iter().find(|d| d.id == id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Domain>> {
        let domains = self.db.domains.read().await;
        Ok(domains.iter().find(|d| d.name == name).cloned())
    }

    async fn list(&self) -> Result<Vec<Domain>> {
        Ok(self.db.domains.read().await.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut domains = self.db.domains.write().await;
        let before = domains.len();
        domains.retain(|d| d.id != id);
        if domains.len() == before {
            return Err(AppError::NotFound(format!("Domain {} not found", id)));
        }
        self.db
            .departments
            .write()
            .await
            .retain(|d| d.domain_id != id);
        self.db.projects.write().await.retain(|p| p.domain_id != id);
        Ok(())
    }
}

pub struct TestDepartmentRepository {
    db: Arc<TestDatabase>,
}

impl TestDepartmentRepository {
    pub fn new(db: Arc<TestDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DepartmentRepository for TestDepartmentRepository {
    async fn create(&self, domain_id: &str, input: &CreateDepartmentInput) -> Result<Department> {
        let department = Department {
            id: new_id(),
            domain_id: domain_id.to_string(),
            name: input.name.clone(),
            description: input.description.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.db.departments.write().await.push(department.clone());
        Ok(department)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Department>> {
        let departments = self.db.departments.read().await;
        Ok(departments.iter().find(|d| d.id == id).cloned())
    }

    async fn find_by_name(&self, domain_id: &str, name: &str) -> Result<Option<Department>> {
        let departments = self.db.departments.read().await;
        Ok(departments
            .iter()
            .find(|d| d.domain_id == domain_id && d.name == name)
            .cloned())
    }

    async fn list(&self, domain_id: &str) -> Result<Vec<Department>> {
        let departments = self.db.departments.read().await;
        Ok(departments
            .iter()
            .filter(|d| d.domain_id == domain_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, domain_id: &str, id: &str) -> Result<()> {
        let mut departments = self.db.departments.write().await;
        let before = departments.len();
        departments.retain(|d| !(d.id == id && d.domain_id == domain_id));
        if departments.len() == before {
            return Err(AppError::NotFound(format!("Department {} not found", id)));
        }
        self.db
            .department_roles
            .write()
            .await
            .retain(|(department_id, _)| department_id != id);
        Ok(())
    }
}

pub struct TestProjectRepository {
    db: Arc<TestDatabase>,
    pub add_users_calls: AtomicUsize,
    pub remove_users_calls: AtomicUsize,
}

impl TestProjectRepository {
    pub fn new(db: Arc<TestDatabase>) -> Self {
        Self {
            db,
            add_users_calls: AtomicUsize::new(0),
            remove_users_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ProjectRepository for TestProjectRepository {
    async fn create(&self, domain_id: &str, input: &CreateProjectInput) -> Result<Project> {
        let project = Project {
            id: new_id(),
            domain_id: domain_id.to_string(),
            department_id: input.department_id.clone(),
            name: input.name.clone(),
            description: input.description.clone(),
            enabled: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.db.projects.write().await.push(project.clone());
        Ok(project)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Project>> {
        let projects = self.db.projects.read().await;
        Ok(projects.iter().find(|p| p.id == id).cloned())
    }

    async fn find_by_name(&self, domain_id: &str, name: &str) -> Result<Option<Project>> {
        let projects = self.db.projects.read().await;
        Ok(projects
            .iter()
            .find(|p| p.domain_id == domain_id && p.name == name)
            .cloned())
    }

    async fn list(&self, domain_id: &str) -> Result<Vec<Project>> {
        let projects = self.db.projects.read().await;
        Ok(projects
            .iter()
            .filter(|p| p.domain_id == domain_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, domain_id: &str, id: &str) -> Result<()> {
        let mut projects = self.db.projects.write().await;
        let before = projects.len();
        projects.retain(|p| !(p.id == id && p.domain_id == domain_id));
        if projects.len() == before {
            return Err(AppError::NotFound(format!("Project {} not found", id)));
        }
        self.db
            .project_users
            .write()
            .await
            .retain(|(project_id, _)| project_id != id);
        for user in self.db.users.write().await.iter_mut() {
            if user.default_project_id.as_deref() == Some(id) {
                user.default_project_id = None;
            }
        }
        Ok(())
    }

    async fn list_department_projects(&self, department_id: &str) -> Result<Vec<Project>> {
        let projects = self.db.projects.read().await;
        Ok(projects
            .iter()
            .filter(|p| p.enabled && p.department_id.as_deref() == Some(department_id))
            .cloned()
            .collect())
    }

    async fn list_user_projects(&self, domain_id: &str, user_id: &str) -> Result<Vec<Project>> {
        let memberships = self.db.project_users.read().await;
        let projects = self.db.projects.read().await;
        Ok(projects
            .iter()
            .filter(|p| {
                p.domain_id == domain_id
                    && memberships
                        .iter()
                        .any(|(project_id, uid)| project_id == &p.id && uid == user_id)
            })
            .cloned()
            .collect())
    }

    async fn list_member_ids(&self, project_id: &str) -> Result<Vec<String>> {
        let memberships = self.db.project_users.read().await;
        Ok(memberships
            .iter()
            .filter(|(pid, _)| pid == project_id)
            .map(|(_, uid)| uid.clone())
            .collect())
    }

    async fn list_default_user_ids(&self, project_id: &str) -> Result<Vec<String>> {
        let users = self.db.users.read().await;
        Ok(users
            .iter()
            .filter(|u| u.default_project_id.as_deref() == Some(project_id))
            .map(|u| u.id.clone())
            .collect())
    }

    async fn add_users(
        &self,
        domain_id: &str,
        project_id: &str,
        user_ids: &[String],
    ) -> Result<u64> {
        self.add_users_calls.fetch_add(1, Ordering::SeqCst);
        let users = self.db.users.read().await;
        let mut memberships = self.db.project_users.write().await;
        let mut added = 0;
        for user_id in user_ids {
            if !users
                .iter()
                .any(|u| &u.id == user_id && u.domain_id == domain_id)
            {
                continue;
            }
            let row = (project_id.to_string(), user_id.clone());
            if !memberships.contains(&row) {
                memberships.push(row);
                added += 1;
            }
        }
        Ok(added)
    }

    async fn remove_users(&self, project_id: &str, user_ids: &[String]) -> Result<u64> {
        self.remove_users_calls.fetch_add(1, Ordering::SeqCst);
        let mut memberships = self.db.project_users.write().await;
        let before = memberships.len();
        memberships.retain(|(pid, uid)| !(pid == project_id && user_ids.contains(uid)));
        Ok((before - memberships.len()) as u64)
    }
}

pub struct TestRoleRepository {
    db: Arc<TestDatabase>,
}

impl TestRoleRepository {
    pub fn new(db: Arc<TestDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RoleRepository for TestRoleRepository {
    async fn create(&self, input: &CreateRoleInput) -> Result<Role> {
        let role = Role {
            id: new_id(),
            name: input.name.clone(),
            description: input.description.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.db.roles.write().await.push(role.clone());
        Ok(role)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Role>> {
        let roles = self.db.roles.read().await;
        Ok(roles.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>> {
        let roles = self.db.roles.read().await;
        Ok(roles.iter().find(|r| r.name == name).cloned())
    }

    async fn list(&self) -> Result<Vec<Role>> {
        Ok(self.db.roles.read().await.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut roles = self.db.roles.write().await;
        let before = roles.len();
        roles.retain(|r| r.id != id);
        if roles.len() == before {
            return Err(AppError::NotFound(format!("Role {} not found", id)));
        }
        self.db
            .user_roles
            .write()
            .await
            .retain(|(_, _, role_id)| role_id != id);
        self.db
            .department_roles
            .write()
            .await
            .retain(|(_, role_id)| role_id != id);
        Ok(())
    }

    async fn list_department_roles(&self, department_id: &str) -> Result<Vec<Role>> {
        let grants = self.db.department_roles.read().await;
        let roles = self.db.roles.read().await;
        Ok(grants
            .iter()
            .filter(|(dep, _)| dep == department_id)
            .filter_map(|(_, role_id)| roles.iter().find(|r| &r.id == role_id).cloned())
            .collect())
    }

    async fn list_user_roles(&self, domain_id: &str, user_id: &str) -> Result<Vec<Role>> {
        let bindings = self.db.user_roles.read().await;
        let roles = self.db.roles.read().await;
        Ok(bindings
            .iter()
            .filter(|(did, uid, _)| did == domain_id && uid == user_id)
            .filter_map(|(_, _, role_id)| roles.iter().find(|r| &r.id == role_id).cloned())
            .collect())
    }

    async fn list_role_user_ids(&self, role_id: &str) -> Result<Vec<String>> {
        let bindings = self.db.user_roles.read().await;
        let mut ids: Vec<String> = bindings
            .iter()
            .filter(|(_, _, rid)| rid == role_id)
            .map(|(_, uid, _)| uid.clone())
            .collect();
        ids.dedup();
        Ok(ids)
    }

    async fn grant_to_department(&self, department_id: &str, role_id: &str) -> Result<()> {
        let mut grants = self.db.department_roles.write().await;
        let row = (department_id.to_string(), role_id.to_string());
        if !grants.contains(&row) {
            grants.push(row);
        }
        Ok(())
    }

    async fn revoke_from_department(&self, department_id: &str, role_id: &str) -> Result<()> {
        self.db
            .department_roles
            .write()
            .await
            .retain(|(dep, rid)| !(dep == department_id && rid == role_id));
        Ok(())
    }
}

pub struct TestUserRepository {
    db: Arc<TestDatabase>,
    pub find_by_id_calls: AtomicUsize,
}

impl TestUserRepository {
    pub fn new(db: Arc<TestDatabase>) -> Self {
        Self {
            db,
            find_by_id_calls: AtomicUsize::new(0),
        }
    }

    pub fn find_by_id_count(&self) -> usize {
        self.find_by_id_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserRepository for TestUserRepository {
    async fn create(&self, user: &NewUser) -> Result<User> {
        let mut users = self.db.users.write().await;
        if users
            .iter()
            .any(|u| u.domain_id == user.domain_id && u.account == user.account)
        {
            return Err(AppError::Conflict("Account already exists".to_string()));
        }
        let created = User {
            id: user.id.clone(),
            domain_id: user.domain_id.clone(),
            department_id: user.department_id.clone(),
            account: user.account.clone(),
            display_name: user.display_name.clone(),
            email: user.email.clone(),
            mobile: user.mobile.clone(),
            default_project_id: user.default_project_id.clone(),
            ..Default::default()
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        self.find_by_id_calls.fetch_add(1, Ordering::SeqCst);
        let users = self.db.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_account(&self, domain_id: &str, account: &str) -> Result<Option<User>> {
        let users = self.db.users.read().await;
        Ok(users
            .iter()
            .find(|u| u.domain_id == domain_id && u.account == account)
            .cloned())
    }

    async fn list_domain_users(&self, domain_id: &str) -> Result<Vec<User>> {
        let users = self.db.users.read().await;
        Ok(users
            .iter()
            .filter(|u| u.domain_id == domain_id)
            .cloned()
            .collect())
    }

    async fn list_project_users(&self, project_id: &str) -> Result<Vec<User>> {
        let memberships = self.db.project_users.read().await;
        let users = self.db.users.read().await;
        Ok(users
            .iter()
            .filter(|u| {
                memberships
                    .iter()
                    .any(|(pid, uid)| pid == project_id && uid == &u.id)
            })
            .cloned()
            .collect())
    }

    async fn count_domain_users(&self, domain_id: &str) -> Result<i64> {
        let users = self.db.users.read().await;
        Ok(users.iter().filter(|u| u.domain_id == domain_id).count() as i64)
    }

    async fn count_department_users(&self, department_id: &str) -> Result<i64> {
        let users = self.db.users.read().await;
        Ok(users
            .iter()
            .filter(|u| u.department_id == department_id)
            .count() as i64)
    }

    async fn delete(&self, domain_id: &str, id: &str) -> Result<()> {
        let mut users = self.db.users.write().await;
        let before = users.len();
        users.retain(|u| !(u.id == id && u.domain_id == domain_id));
        if users.len() == before {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        self.db
            .user_roles
            .write()
            .await
            .retain(|(_, uid, _)| uid != id);
        self.db
            .project_users
            .write()
            .await
            .retain(|(_, uid)| uid != id);
        Ok(())
    }

    async fn bind_role(&self, domain_id: &str, user_id: &str, role_id: &str) -> Result<()> {
        if self
            .db
            .failing_role_binds
            .read()
            .await
            .iter()
            .any(|r| r == role_id)
        {
            return Err(AppError::Internal(anyhow::anyhow!(
                "bind of role {} failed",
                role_id
            )));
        }
        let mut bindings = self.db.user_roles.write().await;
        let row = (
            domain_id.to_string(),
            user_id.to_string(),
            role_id.to_string(),
        );
        if !bindings.contains(&row) {
            bindings.push(row);
        }
        Ok(())
    }

    async fn unbind_role(&self, domain_id: &str, user_id: &str, role_id: &str) -> Result<()> {
        self.db
            .user_roles
            .write()
            .await
            .retain(|(did, uid, rid)| !(did == domain_id && uid == user_id && rid == role_id));
        Ok(())
    }

    async fn add_projects_to_user(&self, user_id: &str, project_ids: &[String]) -> Result<()> {
        let mut memberships = self.db.project_users.write().await;
        for project_id in project_ids {
            let row = (project_id.clone(), user_id.to_string());
            if !memberships.contains(&row) {
                memberships.push(row);
            }
        }
        Ok(())
    }
}

// ============================================================================
// Test cache
// ============================================================================

/// In-memory cache that counts calls. TTLs are recorded, not enforced.
#[derive(Default)]
pub struct TestCache {
    entries: RwLock<HashMap<String, String>>,
    pub ttls: RwLock<HashMap<String, Duration>>,
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
    pub deletes: AtomicUsize,
    pub fail_writes: AtomicBool,
}

impl TestCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    pub async fn put_raw(&self, key: &str, value: &str) {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
    }

    pub fn set_count(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheOperations for TestCache {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Internal(anyhow::anyhow!("cache unavailable")));
        }
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        self.ttls.write().await.insert(key.to_string(), ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Internal(anyhow::anyhow!("cache unavailable")));
        }
        self.entries.write().await.remove(key);
        Ok(())
    }
}

// ============================================================================
// Service wiring
// ============================================================================

pub type TestUserService = UserService<
    TestUserRepository,
    TestDomainRepository,
    TestDepartmentRepository,
    TestProjectRepository,
    TestRoleRepository,
>;
pub type TestProjectService =
    ProjectService<TestProjectRepository, TestDomainRepository, TestDepartmentRepository>;
pub type TestRoleService = RoleService<TestRoleRepository, TestDepartmentRepository>;
pub type TestOrganizationService =
    OrganizationService<TestDomainRepository, TestDepartmentRepository, TestUserRepository>;

/// Every service wired to the same tables and cache.
pub struct TestServices {
    pub db: Arc<TestDatabase>,
    pub cache: Arc<TestCache>,
    pub user_repo: Arc<TestUserRepository>,
    pub project_repo: Arc<TestProjectRepository>,
    pub users: Arc<TestUserService>,
    pub projects: Arc<TestProjectService>,
    pub roles: Arc<TestRoleService>,
    pub organization: Arc<TestOrganizationService>,
}

impl TestServices {
    pub fn new() -> Self {
        Self::with_policy(CachePolicy::enabled(Duration::from_secs(300)))
    }

    pub fn with_policy(policy: CachePolicy) -> Self {
        let db = TestDatabase::new();
        let cache = TestCache::new();
        let user_cache = UserCache::new(cache.clone(), policy);

        let user_repo = Arc::new(TestUserRepository::new(db.clone()));
        let domain_repo = Arc::new(TestDomainRepository::new(db.clone()));
        let department_repo = Arc::new(TestDepartmentRepository::new(db.clone()));
        let project_repo = Arc::new(TestProjectRepository::new(db.clone()));
        let role_repo = Arc::new(TestRoleRepository::new(db.clone()));

        let users = Arc::new(UserService::new(
            UserRepositoryBundle::new(
                user_repo.clone(),
                domain_repo.clone(),
                department_repo.clone(),
                project_repo.clone(),
                role_repo.clone(),
            ),
            user_cache.clone(),
            DEFAULT_DEPARTMENT,
        ));
        let projects = Arc::new(ProjectService::new(
            project_repo.clone(),
            domain_repo.clone(),
            department_repo.clone(),
            user_cache.clone(),
        ));
        let roles = Arc::new(RoleService::new(
            role_repo,
            department_repo.clone(),
            user_cache,
        ));
        let organization = Arc::new(OrganizationService::new(
            domain_repo,
            department_repo,
            user_repo.clone(),
            DEFAULT_DEPARTMENT,
        ));

        Self {
            db,
            cache,
            user_repo,
            project_repo,
            users,
            projects,
            roles,
            organization,
        }
    }
}

impl Default for TestServices {
    fn default() -> Self {
        Self::new()
    }
}

/// Domain "D1" whose default department carries project "P1" and role "viewer".
pub struct Fixture {
    pub domain: Domain,
    pub department: Department,
    pub project: Project,
    pub viewer: Role,
}

pub async fn seed_d1(services: &TestServices) -> Fixture {
    let domain = services
        .organization
        .create_domain(CreateDomainInput {
            name: "D1".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let department = services
        .organization
        .list_departments(&domain.id)
        .await
        .unwrap()
        .into_iter()
        .find(|d| d.name == DEFAULT_DEPARTMENT)
        .unwrap();
    let project = services
        .projects
        .create(
            &domain.id,
            CreateProjectInput {
                name: "P1".to_string(),
                description: None,
                department_id: Some(department.id.clone()),
            },
        )
        .await
        .unwrap();
    let viewer = services
        .roles
        .create(CreateRoleInput {
            name: "viewer".to_string(),
            description: Some("Read-only access".to_string()),
        })
        .await
        .unwrap();
    services
        .roles
        .grant_to_department(&domain.id, &department.id, &viewer.id)
        .await
        .unwrap();

    Fixture {
        domain,
        department,
        project,
        viewer,
    }
}
