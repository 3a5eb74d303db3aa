//! Domain and department lifecycle

use crate::domain::{CreateDepartmentInput, CreateDomainInput, Department, Domain, Lookup};
use crate::error::{AppError, Result};
use crate::repository::{DepartmentRepository, DomainRepository, UserRepository};
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

pub struct OrganizationService<D: DomainRepository, Dep: DepartmentRepository, U: UserRepository>
{
    domain_repo: Arc<D>,
    department_repo: Arc<Dep>,
    user_repo: Arc<U>,
    default_department_name: String,
}

impl<D: DomainRepository, Dep: DepartmentRepository, U: UserRepository>
    OrganizationService<D, Dep, U>
{
    pub fn new(
        domain_repo: Arc<D>,
        department_repo: Arc<Dep>,
        user_repo: Arc<U>,
        default_department_name: impl Into<String>,
    ) -> Self {
        Self {
            domain_repo,
            department_repo,
            user_repo,
            default_department_name: default_department_name.into(),
        }
    }

    /// Create a domain together with its default department.
    ///
    /// If the department cannot be written the domain is removed again.
    pub async fn create_domain(&self, input: CreateDomainInput) -> Result<Domain> {
        input.validate()?;

        match Lookup::from(self.domain_repo.find_by_name(&input.name).await) {
            Lookup::Found(_) => {
                return Err(AppError::Conflict(format!(
                    "domain: {} is exist",
                    input.name
                )))
            }
            Lookup::NotFound => {}
            Lookup::Failed(e) => return Err(e),
        }

        let domain = self.domain_repo.create(&input).await?;

        let department = CreateDepartmentInput {
            name: self.default_department_name.clone(),
            description: Some("Default department".to_string()),
        };
        if let Err(e) = self.department_repo.create(&domain.id, &department).await {
            warn!(domain_id = %domain.id, error = %e, "default department creation failed, removing domain");
            if let Err(cleanup) = self.domain_repo.delete(&domain.id).await {
                warn!(domain_id = %domain.id, error = %cleanup, "failed to remove half-created domain");
            }
            return Err(e);
        }

        info!(domain_id = %domain.id, name = %domain.name, "domain created");
        Ok(domain)
    }

    pub async fn get_domain(&self, id: &str) -> Result<Domain> {
        self.domain_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Domain {} not found", id)))
    }

    pub async fn list_domains(&self) -> Result<Vec<Domain>> {
        self.domain_repo.list().await
    }

    /// Delete an empty domain. Domains that still have users are refused.
    pub async fn delete_domain(&self, id: &str) -> Result<()> {
        self.get_domain(id).await?;

        let users = self.user_repo.count_domain_users(id).await?;
        if users > 0 {
            return Err(AppError::BadRequest(format!(
                "domain {} still has {} users",
                id, users
            )));
        }

        self.domain_repo.delete(id).await?;
        info!(domain_id = %id, "domain deleted");
        Ok(())
    }

    pub async fn create_department(
        &self,
        domain_id: &str,
        input: CreateDepartmentInput,
    ) -> Result<Department> {
        input.validate()?;
        self.get_domain(domain_id).await?;

        match Lookup::from(self.department_repo.find_by_name(domain_id, &input.name).await) {
            Lookup::Found(_) => {
                return Err(AppError::Conflict(format!(
                    "department: {} is exist",
                    input.name
                )))
            }
            Lookup::NotFound => {}
            Lookup::Failed(e) => return Err(e),
        }

        let department = self.department_repo.create(domain_id, &input).await?;
        info!(department_id = %department.id, name = %department.name, "department created");
        Ok(department)
    }

    pub async fn get_department(&self, domain_id: &str, id: &str) -> Result<Department> {
        self.department_repo
            .find_by_id(id)
            .await?
            .filter(|department| department.domain_id == domain_id)
            .ok_or_else(|| AppError::NotFound(format!("Department {} not found", id)))
    }

    pub async fn list_departments(&self, domain_id: &str) -> Result<Vec<Department>> {
        self.department_repo.list(domain_id).await
    }

    /// Delete a department that is neither the default one nor has members.
    pub async fn delete_department(&self, domain_id: &str, id: &str) -> Result<()> {
        let department = self.get_department(domain_id, id).await?;
        if department.name == self.default_department_name {
            return Err(AppError::BadRequest(
                "the default department cannot be deleted".to_string(),
            ));
        }

        let members = self.user_repo.count_department_users(id).await?;
        if members > 0 {
            return Err(AppError::BadRequest(format!(
                "department {} still has {} members",
                department.name, members
            )));
        }

        self.department_repo.delete(domain_id, id).await?;
        info!(department_id = %id, "department deleted");
        Ok(())
    }
}
