//! Role lifecycle and department role grants

use super::UserCache;
use crate::domain::{CreateRoleInput, Department, Lookup, Role};
use crate::error::{AppError, Result};
use crate::repository::{DepartmentRepository, RoleRepository};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

pub struct RoleService<R: RoleRepository, Dep: DepartmentRepository> {
    role_repo: Arc<R>,
    department_repo: Arc<Dep>,
    cache: UserCache,
}

impl<R: RoleRepository, Dep: DepartmentRepository> RoleService<R, Dep> {
    pub fn new(role_repo: Arc<R>, department_repo: Arc<Dep>, cache: UserCache) -> Self {
        Self {
            role_repo,
            department_repo,
            cache,
        }
    }

    pub async fn create(&self, input: CreateRoleInput) -> Result<Role> {
        input.validate()?;

        match Lookup::from(self.role_repo.find_by_name(&input.name).await) {
            Lookup::Found(_) => {
                return Err(AppError::Conflict(format!("role: {} is exist", input.name)))
            }
            Lookup::NotFound => {}
            Lookup::Failed(e) => return Err(e),
        }

        let role = self.role_repo.create(&input).await?;
        info!(role_id = %role.id, name = %role.name, "role created");
        Ok(role)
    }

    pub async fn get(&self, id: &str) -> Result<Role> {
        self.role_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Role {} not found", id)))
    }

    pub async fn list(&self) -> Result<Vec<Role>> {
        self.role_repo.list().await
    }

    /// Delete the role and drop the cached views of everyone who held it.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let holders = self.role_repo.list_role_user_ids(id).await?;
        self.role_repo.delete(id).await?;
        info!(role_id = %id, holders = holders.len(), "role deleted");
        self.cache.evict_all(&holders).await;
        Ok(())
    }

    /// Grant a role to a department. Only members created afterwards receive it.
    pub async fn grant_to_department(
        &self,
        domain_id: &str,
        department_id: &str,
        role_id: &str,
    ) -> Result<()> {
        self.require_department(domain_id, department_id).await?;
        self.get(role_id).await?;
        self.role_repo
            .grant_to_department(department_id, role_id)
            .await
    }

    pub async fn revoke_from_department(
        &self,
        domain_id: &str,
        department_id: &str,
        role_id: &str,
    ) -> Result<()> {
        self.require_department(domain_id, department_id).await?;
        self.role_repo
            .revoke_from_department(department_id, role_id)
            .await
    }

    pub async fn list_department_roles(
        &self,
        domain_id: &str,
        department_id: &str,
    ) -> Result<Vec<Role>> {
        self.require_department(domain_id, department_id).await?;
        self.role_repo.list_department_roles(department_id).await
    }

    async fn require_department(&self, domain_id: &str, department_id: &str) -> Result<Department> {
        self.department_repo
            .find_by_id(department_id)
            .await?
            .filter(|department| department.domain_id == domain_id)
            .ok_or_else(|| AppError::NotFound(format!("Department {} not found", department_id)))
    }
}
