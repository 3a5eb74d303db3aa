//! Project lifecycle and membership

use super::UserCache;
use crate::domain::{CreateProjectInput, Lookup, Project};
use crate::error::{AppError, Result};
use crate::repository::{DepartmentRepository, DomainRepository, ProjectRepository};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

pub struct ProjectService<P: ProjectRepository, D: DomainRepository, Dep: DepartmentRepository> {
    project_repo: Arc<P>,
    domain_repo: Arc<D>,
    department_repo: Arc<Dep>,
    cache: UserCache,
}

impl<P: ProjectRepository, D: DomainRepository, Dep: DepartmentRepository>
    ProjectService<P, D, Dep>
{
    pub fn new(
        project_repo: Arc<P>,
        domain_repo: Arc<D>,
        department_repo: Arc<Dep>,
        cache: UserCache,
    ) -> Self {
        Self {
            project_repo,
            domain_repo,
            department_repo,
            cache,
        }
    }

    pub async fn create(&self, domain_id: &str, input: CreateProjectInput) -> Result<Project> {
        input.validate()?;

        self.domain_repo
            .find_by_id(domain_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Domain {} not found", domain_id)))?;

        match Lookup::from(self.project_repo.find_by_name(domain_id, &input.name).await) {
            Lookup::Found(_) => {
                return Err(AppError::Conflict(format!(
                    "project: {} is exist",
                    input.name
                )))
            }
            Lookup::NotFound => {}
            Lookup::Failed(e) => return Err(e),
        }

        if let Some(department_id) = &input.department_id {
            self.department_repo
                .find_by_id(department_id)
                .await?
                .filter(|department| department.domain_id == domain_id)
                .ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "department {} not found in domain {}",
                        department_id, domain_id
                    ))
                })?;
        }

        let project = self.project_repo.create(domain_id, &input).await?;
        info!(project_id = %project.id, name = %project.name, "project created");
        Ok(project)
    }

    pub async fn get(&self, domain_id: &str, id: &str) -> Result<Project> {
        self.project_repo
            .find_by_id(id)
            .await?
            .filter(|project| project.domain_id == domain_id)
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", id)))
    }

    pub async fn list(&self, domain_id: &str) -> Result<Vec<Project>> {
        self.project_repo.list(domain_id).await
    }

    /// Delete the project, then evict every user whose cached view embeds it:
    /// its members and the users holding it as default project.
    pub async fn delete(&self, domain_id: &str, id: &str) -> Result<()> {
        let members = self.project_repo.list_member_ids(id).await?;
        let defaults = self.project_repo.list_default_user_ids(id).await?;

        let mut seen = HashSet::new();
        let affected: Vec<String> = members
            .into_iter()
            .chain(defaults)
            .filter(|user_id| seen.insert(user_id.clone()))
            .collect();

        self.project_repo.delete(domain_id, id).await?;
        info!(project_id = %id, affected = affected.len(), "project deleted");
        self.cache.evict_all(&affected).await;
        Ok(())
    }

    /// Add users of the domain to the project in one batched write. Ids that
    /// are not users of the domain are skipped and not counted.
    pub async fn add_users(
        &self,
        domain_id: &str,
        project_id: &str,
        user_ids: Vec<String>,
    ) -> Result<u64> {
        let user_ids = normalize_user_ids(user_ids)?;
        self.get(domain_id, project_id).await?;

        self.cache.evict_all(&user_ids).await;
        let added = self
            .project_repo
            .add_users(domain_id, project_id, &user_ids)
            .await?;
        info!(project_id = %project_id, requested = user_ids.len(), added, "users added to project");
        Ok(added)
    }

    /// Remove users from the project in one batched write.
    pub async fn remove_users(
        &self,
        domain_id: &str,
        project_id: &str,
        user_ids: Vec<String>,
    ) -> Result<u64> {
        let user_ids = normalize_user_ids(user_ids)?;
        self.get(domain_id, project_id).await?;

        self.cache.evict_all(&user_ids).await;
        let removed = self.project_repo.remove_users(project_id, &user_ids).await?;
        info!(project_id = %project_id, requested = user_ids.len(), removed, "users removed from project");
        Ok(removed)
    }
}

/// Trim, drop blanks and collapse duplicates. An empty result is rejected.
fn normalize_user_ids(user_ids: Vec<String>) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let ids: Vec<String> = user_ids
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect();

    if ids.is_empty() {
        return Err(AppError::BadRequest("no user id given".to_string()));
    }
    Ok(ids)
}
