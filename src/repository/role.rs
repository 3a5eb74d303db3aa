//! Role repository

use crate::domain::{new_id, CreateRoleInput, Role};
use super::map_conflict_if_duplicate;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn create(&self, input: &CreateRoleInput) -> Result<Role>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Role>>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>>;
    async fn list(&self) -> Result<Vec<Role>>;
    /// Deletes the role with every grant and binding referencing it.
    async fn delete(&self, id: &str) -> Result<()>;
    /// Roles granted to every new member of the department.
    async fn list_department_roles(&self, department_id: &str) -> Result<Vec<Role>>;
    async fn list_user_roles(&self, domain_id: &str, user_id: &str) -> Result<Vec<Role>>;
    /// Users holding the role directly, across all domains.
    async fn list_role_user_ids(&self, role_id: &str) -> Result<Vec<String>>;
    async fn grant_to_department(&self, department_id: &str, role_id: &str) -> Result<()>;
    async fn revoke_from_department(&self, department_id: &str, role_id: &str) -> Result<()>;
}

pub struct RoleRepositoryImpl {
    pool: MySqlPool,
}

impl RoleRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleRepository for RoleRepositoryImpl {
    async fn create(&self, input: &CreateRoleInput) -> Result<Role> {
        let id = new_id();

        sqlx::query(
            r#"
            INSERT INTO roles (id, name, description, created_at, updated_at)
            VALUES (?, ?, ?, NOW(), NOW())
            "#,
        )
        .bind(&id)
        .bind(&input.name)
        .bind(&input.description)
        .execute(&self.pool)
        .await
        .map_err(|e| map_conflict_if_duplicate(e, "Role"))?;

        self.find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create role")))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, name, description, created_at, updated_at
            FROM roles
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, name, description, created_at, updated_at
            FROM roles
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role)
    }

    async fn list(&self) -> Result<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, name, description, created_at, updated_at
            FROM roles
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_roles WHERE role_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM department_roles WHERE role_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM roles WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Role {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_department_roles(&self, department_id: &str) -> Result<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT r.id, r.name, r.description, r.created_at, r.updated_at
            FROM roles r
            INNER JOIN department_roles dr ON dr.role_id = r.id
            WHERE dr.department_id = ?
            ORDER BY dr.created_at, r.name
            "#,
        )
        .bind(department_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    async fn list_user_roles(&self, domain_id: &str, user_id: &str) -> Result<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT r.id, r.name, r.description, r.created_at, r.updated_at
            FROM roles r
            INNER JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.domain_id = ? AND ur.user_id = ?
            ORDER BY ur.created_at, r.name
            "#,
        )
        .bind(domain_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles)
    }

    async fn list_role_user_ids(&self, role_id: &str) -> Result<Vec<String>> {
        let ids: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT user_id FROM user_roles WHERE role_id = ?")
                .bind(role_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn grant_to_department(&self, department_id: &str, role_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT IGNORE INTO department_roles (department_id, role_id, created_at)
            VALUES (?, ?, NOW())
            "#,
        )
        .bind(department_id)
        .bind(role_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn revoke_from_department(&self, department_id: &str, role_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM department_roles WHERE department_id = ? AND role_id = ?")
            .bind(department_id)
            .bind(role_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
