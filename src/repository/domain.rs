//! Domain repository

use crate::domain::{new_id, CreateDomainInput, Domain};
use super::map_conflict_if_duplicate;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DomainRepository: Send + Sync {
    async fn create(&self, input: &CreateDomainInput) -> Result<Domain>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Domain>>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Domain>>;
    async fn list(&self) -> Result<Vec<Domain>>;
    /// Deletes the domain together with its departments and projects.
    async fn delete(&self, id: &str) -> Result<()>;
}

pub struct DomainRepositoryImpl {
    pool: MySqlPool,
}

impl DomainRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DomainRepository for DomainRepositoryImpl {
    async fn create(&self, input: &CreateDomainInput) -> Result<Domain> {
        let id = new_id();

        sqlx::query(
            r#"
            INSERT INTO domains (id, name, display_name, description, metadata, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, NOW(), NOW())
            "#,
        )
        .bind(&id)
        .bind(&input.name)
        .bind(&input.display_name)
        .bind(&input.description)
        .bind(Json(&input.metadata))
        .execute(&self.pool)
        .await
        .map_err(|e| map_conflict_if_duplicate(e, "Domain"))?;

        self.find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create domain")))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Domain>> {
        let domain = sqlx::query_as::<_, Domain>(
            r#"
            SELECT id, name, display_name, description, metadata, created_at, updated_at
            FROM domains
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(domain)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Domain>> {
        let domain = sqlx::query_as::<_, Domain>(
            r#"
            SELECT id, name, display_name, description, metadata, created_at, updated_at
            FROM domains
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(domain)
    }

    async fn list(&self) -> Result<Vec<Domain>> {
        let domains = sqlx::query_as::<_, Domain>(
            r#"
            SELECT id, name, display_name, description, metadata, created_at, updated_at
            FROM domains
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(domains)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE dr FROM department_roles dr
            INNER JOIN departments d ON d.id = dr.department_id
            WHERE d.domain_id = ?
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            DELETE pu FROM project_users pu
            INNER JOIN projects p ON p.id = pu.project_id
            WHERE p.domain_id = ?
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM projects WHERE domain_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM departments WHERE domain_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM domains WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Domain {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }
}
