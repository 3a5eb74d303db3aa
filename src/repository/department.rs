//! Department repository

use crate::domain::{new_id, CreateDepartmentInput, Department};
use super::map_conflict_if_duplicate;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DepartmentRepository: Send + Sync {
    async fn create(&self, domain_id: &str, input: &CreateDepartmentInput) -> Result<Department>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Department>>;
    async fn find_by_name(&self, domain_id: &str, name: &str) -> Result<Option<Department>>;
    async fn list(&self, domain_id: &str) -> Result<Vec<Department>>;
    async fn delete(&self, domain_id: &str, id: &str) -> Result<()>;
}

pub struct DepartmentRepositoryImpl {
    pool: MySqlPool,
}

impl DepartmentRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DepartmentRepository for DepartmentRepositoryImpl {
    async fn create(&self, domain_id: &str, input: &CreateDepartmentInput) -> Result<Department> {
        let id = new_id();

        sqlx::query(
            r#"
            INSERT INTO departments (id, domain_id, name, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, NOW(), NOW())
            "#,
        )
        .bind(&id)
        .bind(domain_id)
        .bind(&input.name)
        .bind(&input.description)
        .execute(&self.pool)
        .await
        .map_err(|e| map_conflict_if_duplicate(e, "Department"))?;

        self.find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create department")))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Department>> {
        let department = sqlx::query_as::<_, Department>(
            r#"
            SELECT id, domain_id, name, description, created_at, updated_at
            FROM departments
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(department)
    }

    async fn find_by_name(&self, domain_id: &str, name: &str) -> Result<Option<Department>> {
        let department = sqlx::query_as::<_, Department>(
            r#"
            SELECT id, domain_id, name, description, created_at, updated_at
            FROM departments
            WHERE domain_id = ? AND name = ?
            "#,
        )
        .bind(domain_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(department)
    }

    async fn list(&self, domain_id: &str) -> Result<Vec<Department>> {
        let departments = sqlx::query_as::<_, Department>(
            r#"
            SELECT id, domain_id, name, description, created_at, updated_at
            FROM departments
            WHERE domain_id = ?
            ORDER BY name
            "#,
        )
        .bind(domain_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(departments)
    }

    async fn delete(&self, domain_id: &str, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM department_roles WHERE department_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE projects SET department_id = NULL WHERE department_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM departments WHERE id = ? AND domain_id = ?")
            .bind(id)
            .bind(domain_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Department {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }
}
