//! User aggregation, member creation and role binding

use super::UserCache;
use crate::domain::{
    CreateUserInput, Department, Domain, Lookup, NewUser, Project, Role, User, UserAggregate,
};
use crate::error::{AppError, Result};
use crate::repository::{
    DepartmentRepository, DomainRepository, ProjectRepository, RoleRepository, UserRepository,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

/// Repository bundle for UserService
pub struct UserRepositoryBundle<U, D, Dep, P, R>
where
    U: UserRepository,
    D: DomainRepository,
    Dep: DepartmentRepository,
    P: ProjectRepository,
    R: RoleRepository,
{
    pub user: Arc<U>,
    pub domain: Arc<D>,
    pub department: Arc<Dep>,
    pub project: Arc<P>,
    pub role: Arc<R>,
}

impl<U, D, Dep, P, R> UserRepositoryBundle<U, D, Dep, P, R>
where
    U: UserRepository,
    D: DomainRepository,
    Dep: DepartmentRepository,
    P: ProjectRepository,
    R: RoleRepository,
{
    pub fn new(
        user: Arc<U>,
        domain: Arc<D>,
        department: Arc<Dep>,
        project: Arc<P>,
        role: Arc<R>,
    ) -> Self {
        Self {
            user,
            domain,
            department,
            project,
            role,
        }
    }
}

fn record_cascade_failure(step: &'static str) {
    metrics::counter!("keyauth_cascade_failures_total", "step" => step).increment(1);
}

pub struct UserService<U, D, Dep, P, R>
where
    U: UserRepository,
    D: DomainRepository,
    Dep: DepartmentRepository,
    P: ProjectRepository,
    R: RoleRepository,
{
    user_repo: Arc<U>,
    domain_repo: Arc<D>,
    department_repo: Arc<Dep>,
    project_repo: Arc<P>,
    role_repo: Arc<R>,
    cache: UserCache,
    default_department_name: String,
}

impl<U, D, Dep, P, R> UserService<U, D, Dep, P, R>
where
    U: UserRepository,
    D: DomainRepository,
    Dep: DepartmentRepository,
    P: ProjectRepository,
    R: RoleRepository,
{
    pub fn new(
        repos: UserRepositoryBundle<U, D, Dep, P, R>,
        cache: UserCache,
        default_department_name: impl Into<String>,
    ) -> Self {
        Self {
            user_repo: repos.user,
            domain_repo: repos.domain,
            department_repo: repos.department,
            project_repo: repos.project,
            role_repo: repos.role,
            cache,
            default_department_name: default_department_name.into(),
        }
    }

    /// Create a member user and hand it the department's projects and roles.
    ///
    /// The cascade runs after the user row is written and is not rolled back:
    /// if a project or role grant fails, the user exists with the grants made
    /// so far and the error is returned.
    pub async fn create_member_user(&self, input: CreateUserInput) -> Result<UserAggregate> {
        input.validate()?;
        if input.domain_id.is_empty() {
            return Err(AppError::BadRequest("domain id is required".to_string()));
        }

        match Lookup::from(
            self.user_repo
                .find_by_account(&input.domain_id, &input.account)
                .await,
        ) {
            Lookup::Found(_) => {
                return Err(AppError::Conflict(format!(
                    "account: {} is exist",
                    input.account
                )))
            }
            Lookup::NotFound => {}
            Lookup::Failed(e) => return Err(e),
        }

        let department = self
            .resolve_department(&input.domain_id, input.department_id.as_deref())
            .await?;

        if let Some(project_id) = &input.default_project_id {
            self.project_repo
                .find_by_id(project_id)
                .await?
                .filter(|project| project.domain_id == input.domain_id)
                .ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "project {} not found in domain {}",
                        project_id, input.domain_id
                    ))
                })?;
        }

        let new_user = NewUser::from_input(input, department.id.clone());
        let user = self.user_repo.create(&new_user).await?;
        info!(user_id = %user.id, account = %user.account, department = %department.name, "member user created");

        let domain = self.require_domain(&user).await?;

        let projects = self
            .project_repo
            .list_department_projects(&department.id)
            .await
            .inspect_err(|_| record_cascade_failure("list_projects"))?;
        if !projects.is_empty() {
            let project_ids: Vec<String> = projects.into_iter().map(|p| p.id).collect();
            if let Err(e) = self
                .user_repo
                .add_projects_to_user(&user.id, &project_ids)
                .await
            {
                warn!(user_id = %user.id, error = %e, "project cascade aborted");
                record_cascade_failure("projects");
                return Err(e);
            }
            debug!(user_id = %user.id, count = project_ids.len(), "joined department projects");
        }

        let roles = self
            .role_repo
            .list_department_roles(&department.id)
            .await
            .inspect_err(|_| record_cascade_failure("list_roles"))?;
        for role in &roles {
            if let Err(e) = self
                .user_repo
                .bind_role(&user.domain_id, &user.id, &role.id)
                .await
            {
                warn!(user_id = %user.id, role = %role.name, error = %e, "role cascade aborted");
                record_cascade_failure("roles");
                return Err(e);
            }
        }

        Ok(UserAggregate::new(user, domain, department, roles))
    }

    /// Read one user with every reference resolved, through the cache.
    pub async fn get_user(&self, domain_id: &str, user_id: &str) -> Result<UserAggregate> {
        if let Some(aggregate) = self.cache.load(domain_id, user_id).await {
            return Ok(aggregate);
        }

        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .filter(|user| user.domain_id == domain_id)
            .ok_or_else(|| AppError::BadRequest(format!("user {} not found", user_id)))?;

        let mut aggregate = self.assemble(user).await?;
        aggregate.projects = Some(
            self.project_repo
                .list_user_projects(&aggregate.user.domain_id, &aggregate.user.id)
                .await?,
        );
        if let Some(project_id) = aggregate.user.default_project_id.clone() {
            aggregate.default_project = Some(self.require_project(&project_id).await?);
        }

        self.cache.store(&aggregate).await;
        Ok(aggregate)
    }

    /// Every user of the domain. Not cached.
    pub async fn list_member_users(&self, domain_id: &str) -> Result<Vec<UserAggregate>> {
        let users = self.user_repo.list_domain_users(domain_id).await?;
        self.assemble_all(users).await
    }

    /// Every member of the project. Not cached.
    pub async fn list_project_users(
        &self,
        domain_id: &str,
        project_id: &str,
    ) -> Result<Vec<UserAggregate>> {
        self.project_repo
            .find_by_id(project_id)
            .await?
            .filter(|project| project.domain_id == domain_id)
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", project_id)))?;

        let users = self.user_repo.list_project_users(project_id).await?;
        self.assemble_all(users).await
    }

    pub async fn delete_user(&self, domain_id: &str, user_id: &str) -> Result<()> {
        self.user_repo.delete(domain_id, user_id).await?;
        info!(user_id = %user_id, "user deleted");
        self.cache.evict(user_id).await;
        Ok(())
    }

    pub async fn bind_role(&self, domain_id: &str, user_id: &str, role_name: &str) -> Result<()> {
        let role = self.require_role(role_name).await?;
        self.cache.evict(user_id).await;
        self.user_repo.bind_role(domain_id, user_id, &role.id).await
    }

    pub async fn unbind_role(&self, domain_id: &str, user_id: &str, role_name: &str) -> Result<()> {
        let role = self.require_role(role_name).await?;
        self.cache.evict(user_id).await;
        self.user_repo.unbind_role(domain_id, user_id, &role.id).await
    }

    async fn resolve_department(
        &self,
        domain_id: &str,
        department_id: Option<&str>,
    ) -> Result<Department> {
        match department_id {
            Some(id) => self
                .department_repo
                .find_by_id(id)
                .await?
                .filter(|department| department.domain_id == domain_id)
                .ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "department {} not found in domain {}",
                        id, domain_id
                    ))
                }),
            None => self
                .department_repo
                .find_by_name(domain_id, &self.default_department_name)
                .await?
                .ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "default department {} not found in domain {}",
                        self.default_department_name, domain_id
                    ))
                }),
        }
    }

    async fn require_role(&self, role_name: &str) -> Result<Role> {
        self.role_repo
            .find_by_name(role_name)
            .await?
            .ok_or_else(|| AppError::BadRequest(format!("role: {} not exist", role_name)))
    }

    async fn require_domain(&self, user: &User) -> Result<Domain> {
        self.domain_repo
            .find_by_id(&user.domain_id)
            .await?
            .ok_or_else(|| dangling(user, "domain", &user.domain_id))
    }

    async fn require_project(&self, project_id: &str) -> Result<Project> {
        self.project_repo
            .find_by_id(project_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "default project {} does not exist",
                    project_id
                ))
            })
    }

    /// Resolve domain, department and roles. Projects are left to the caller.
    async fn assemble(&self, user: User) -> Result<UserAggregate> {
        let domain = self.require_domain(&user).await?;
        let department = self
            .department_repo
            .find_by_id(&user.department_id)
            .await?
            .ok_or_else(|| dangling(&user, "department", &user.department_id))?;
        let roles = self
            .role_repo
            .list_user_roles(&user.domain_id, &user.id)
            .await?;

        Ok(UserAggregate::new(user, domain, department, roles))
    }

    async fn assemble_all(&self, users: Vec<User>) -> Result<Vec<UserAggregate>> {
        let mut aggregates = Vec::with_capacity(users.len());
        for user in users {
            aggregates.push(self.assemble(user).await?);
        }
        Ok(aggregates)
    }
}

fn dangling(user: &User, what: &str, id: &str) -> AppError {
    AppError::Internal(anyhow::anyhow!(
        "user {} references missing {} {}",
        user.id,
        what,
        id
    ))
}
