//! User repository

use super::map_conflict_if_duplicate;
use crate::domain::{NewUser, User};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::{MySql, MySqlPool, QueryBuilder};

const USER_COLUMNS: &str = r#"
    id, domain_id, department_id, account, display_name, email, mobile, default_project_id,
    last_login_at, last_login_ip, login_failed_times, login_success_times, created_at, updated_at
"#;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &NewUser) -> Result<User>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;
    async fn find_by_account(&self, domain_id: &str, account: &str) -> Result<Option<User>>;
    async fn list_domain_users(&self, domain_id: &str) -> Result<Vec<User>>;
    async fn list_project_users(&self, project_id: &str) -> Result<Vec<User>>;
    async fn count_domain_users(&self, domain_id: &str) -> Result<i64>;
    async fn count_department_users(&self, department_id: &str) -> Result<i64>;
    /// Deletes the user with its role bindings and project memberships.
    async fn delete(&self, domain_id: &str, id: &str) -> Result<()>;
    /// Binding an already bound role is a no-op.
    async fn bind_role(&self, domain_id: &str, user_id: &str, role_id: &str) -> Result<()>;
    /// Unbinding a role the user does not hold is a no-op.
    async fn unbind_role(&self, domain_id: &str, user_id: &str, role_id: &str) -> Result<()>;
    async fn add_projects_to_user(&self, user_id: &str, project_ids: &[String]) -> Result<()>;
}

pub struct UserRepositoryImpl {
    pool: MySqlPool,
}

impl UserRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for UserRepositoryImpl {
    async fn create(&self, user: &NewUser) -> Result<User> {
        sqlx::query(
            r#"
            INSERT INTO users (id, domain_id, department_id, account, display_name, email, mobile,
                               default_project_id, login_failed_times, login_success_times,
                               created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, 0, NOW(), NOW())
            "#,
        )
        .bind(&user.id)
        .bind(&user.domain_id)
        .bind(&user.department_id)
        .bind(&user.account)
        .bind(&user.display_name)
        .bind(&user.email)
        .bind(&user.mobile)
        .bind(&user.default_project_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_conflict_if_duplicate(e, "Account"))?;

        self.find_by_id(&user.id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create user")))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_account(&self, domain_id: &str, account: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE domain_id = ? AND account = ?",
            USER_COLUMNS
        ))
        .bind(domain_id)
        .bind(account)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list_domain_users(&self, domain_id: &str) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE domain_id = ? ORDER BY created_at DESC",
            USER_COLUMNS
        ))
        .bind(domain_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn list_project_users(&self, project_id: &str) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.domain_id, u.department_id, u.account, u.display_name, u.email,
                   u.mobile, u.default_project_id, u.last_login_at, u.last_login_ip,
                   u.login_failed_times, u.login_success_times, u.created_at, u.updated_at
            FROM users u
            INNER JOIN project_users pu ON pu.user_id = u.id
            WHERE pu.project_id = ?
            ORDER BY pu.created_at DESC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn count_domain_users(&self, domain_id: &str) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE domain_id = ?")
            .bind(domain_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.0)
    }

    async fn count_department_users(&self, department_id: &str) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE department_id = ?")
            .bind(department_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.0)
    }

    async fn delete(&self, domain_id: &str, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM project_users WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = ? AND domain_id = ?")
            .bind(id)
            .bind(domain_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn bind_role(&self, domain_id: &str, user_id: &str, role_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT IGNORE INTO user_roles (domain_id, user_id, role_id, created_at)
            VALUES (?, ?, ?, NOW())
            "#,
        )
        .bind(domain_id)
        .bind(user_id)
        .bind(role_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn unbind_role(&self, domain_id: &str, user_id: &str, role_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM user_roles WHERE domain_id = ? AND user_id = ? AND role_id = ?")
            .bind(domain_id)
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn add_projects_to_user(&self, user_id: &str, project_ids: &[String]) -> Result<()> {
        if project_ids.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<MySql> =
            QueryBuilder::new("INSERT IGNORE INTO project_users (project_id, user_id, created_at) ");
        builder.push_values(project_ids, |mut row, project_id| {
            row.push_bind(project_id).push_bind(user_id).push("NOW()");
        });

        builder.build().execute(&self.pool).await?;
        Ok(())
    }
}
