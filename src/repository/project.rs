//! Project repository

use crate::domain::{new_id, CreateProjectInput, Project};
use super::map_conflict_if_duplicate;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::{MySql, MySqlPool, QueryBuilder};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn create(&self, domain_id: &str, input: &CreateProjectInput) -> Result<Project>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Project>>;
    async fn find_by_name(&self, domain_id: &str, name: &str) -> Result<Option<Project>>;
    async fn list(&self, domain_id: &str) -> Result<Vec<Project>>;
    /// Deletes the project and its memberships.
    async fn delete(&self, domain_id: &str, id: &str) -> Result<()>;
    /// Projects new members of the department join automatically.
    async fn list_department_projects(&self, department_id: &str) -> Result<Vec<Project>>;
    async fn list_user_projects(&self, domain_id: &str, user_id: &str) -> Result<Vec<Project>>;
    async fn list_member_ids(&self, project_id: &str) -> Result<Vec<String>>;
    /// Users whose default project is this one, members or not.
    async fn list_default_user_ids(&self, project_id: &str) -> Result<Vec<String>>;
    /// Adds members in one statement. Ids that are not users of the domain
    /// are skipped; existing memberships are kept as is.
    async fn add_users(
        &self,
        domain_id: &str,
        project_id: &str,
        user_ids: &[String],
    ) -> Result<u64>;
    async fn remove_users(&self, project_id: &str, user_ids: &[String]) -> Result<u64>;
}

pub struct ProjectRepositoryImpl {
    pool: MySqlPool,
}

impl ProjectRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectRepository for ProjectRepositoryImpl {
    async fn create(&self, domain_id: &str, input: &CreateProjectInput) -> Result<Project> {
        let id = new_id();

        sqlx::query(
            r#"
            INSERT INTO projects (id, domain_id, department_id, name, description, enabled, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, TRUE, NOW(), NOW())
            "#,
        )
        .bind(&id)
        .bind(domain_id)
        .bind(&input.department_id)
        .bind(&input.name)
        .bind(&input.description)
        .execute(&self.pool)
        .await
        .map_err(|e| map_conflict_if_duplicate(e, "Project"))?;

        self.find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create project")))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, domain_id, department_id, name, description, enabled, created_at, updated_at
            FROM projects
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(project)
    }

    async fn find_by_name(&self, domain_id: &str, name: &str) -> Result<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, domain_id, department_id, name, description, enabled, created_at, updated_at
            FROM projects
            WHERE domain_id = ? AND name = ?
            "#,
        )
        .bind(domain_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(project)
    }

    async fn list(&self, domain_id: &str) -> Result<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, domain_id, department_id, name, description, enabled, created_at, updated_at
            FROM projects
            WHERE domain_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(domain_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(projects)
    }

    async fn delete(&self, domain_id: &str, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM project_users WHERE project_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE users SET default_project_id = NULL WHERE default_project_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM projects WHERE id = ? AND domain_id = ?")
            .bind(id)
            .bind(domain_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Project {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_department_projects(&self, department_id: &str) -> Result<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, domain_id, department_id, name, description, enabled, created_at, updated_at
            FROM projects
            WHERE department_id = ? AND enabled = TRUE
            ORDER BY name
            "#,
        )
        .bind(department_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(projects)
    }

    async fn list_user_projects(&self, domain_id: &str, user_id: &str) -> Result<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT p.id, p.domain_id, p.department_id, p.name, p.description, p.enabled,
                   p.created_at, p.updated_at
            FROM projects p
            INNER JOIN project_users pu ON pu.project_id = p.id
            WHERE pu.user_id = ? AND p.domain_id = ?
            ORDER BY p.name
            "#,
        )
        .bind(user_id)
        .bind(domain_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(projects)
    }

    async fn list_member_ids(&self, project_id: &str) -> Result<Vec<String>> {
        let ids: Vec<(String,)> =
            sqlx::query_as("SELECT user_id FROM project_users WHERE project_id = ?")
                .bind(project_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn list_default_user_ids(&self, project_id: &str) -> Result<Vec<String>> {
        let ids: Vec<(String,)> =
            sqlx::query_as("SELECT id FROM users WHERE default_project_id = ?")
                .bind(project_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn add_users(
        &self,
        domain_id: &str,
        project_id: &str,
        user_ids: &[String],
    ) -> Result<u64> {
        if user_ids.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<MySql> = QueryBuilder::new(
            "INSERT IGNORE INTO project_users (project_id, user_id, created_at) SELECT ",
        );
        builder.push_bind(project_id);
        builder.push(", id, NOW() FROM users WHERE domain_id = ");
        builder.push_bind(domain_id);
        builder.push(" AND id IN (");
        let mut separated = builder.separated(", ");
        for user_id in user_ids {
            separated.push_bind(user_id);
        }
        separated.push_unseparated(")");

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn remove_users(&self, project_id: &str, user_ids: &[String]) -> Result<u64> {
        if user_ids.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<MySql> =
            QueryBuilder::new("DELETE FROM project_users WHERE project_id = ");
        builder.push_bind(project_id);
        builder.push(" AND user_id IN (");
        let mut separated = builder.separated(", ");
        for user_id in user_ids {
            separated.push_bind(user_id);
        }
        separated.push_unseparated(")");

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
