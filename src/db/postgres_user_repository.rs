use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::user_repository::{CreateUserOutcome, UserRepository};
use crate::models::user::{NewUser, PublicUser, User, UserRole};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at, last_login";
const PUBLIC_USER_COLUMNS: &str = "id, name, email, role, created_at, last_login";

pub struct PostgresUserRepository {
    pub pool: PgPool,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_agent_by_id(&self, agent_id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND role = 'agent'"
        ))
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_user(&self, user: &NewUser) -> Result<CreateUserOutcome, sqlx::Error> {
        let result = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.password_hash.as_deref())
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(created) => Ok(CreateUserOutcome::Created(created)),
            Err(err) if is_unique_violation(&err) => Ok(CreateUserOutcome::EmailTaken),
            Err(err) => Err(err),
        }
    }

    async fn find_or_create_customer(&self, name: &str, email: &str) -> Result<User, sqlx::Error> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, role)
            VALUES ($1, $2, NULL, 'customer')
            ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(email)
        .fetch_one(&self.pool)
        .await
    }

    async fn record_login(&self, user_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<PublicUser>, sqlx::Error> {
        sqlx::query_as::<_, PublicUser>(&format!(
            "SELECT {PUBLIC_USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn list_users_by_roles(&self, roles: &[UserRole]) -> Result<Vec<PublicUser>, sqlx::Error> {
        let roles: Vec<String> = roles.iter().map(|role| role.as_str().to_string()).collect();
        sqlx::query_as::<_, PublicUser>(&format!(
            "SELECT {PUBLIC_USER_COLUMNS} FROM users WHERE role = ANY($1) ORDER BY name"
        ))
        .bind(roles)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_users(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
    }
}
