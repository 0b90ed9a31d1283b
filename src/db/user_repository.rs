use async_trait::async_trait;

use crate::models::user::{NewUser, PublicUser, User, UserRole};

#[derive(Debug, Clone)]
pub enum CreateUserOutcome {
    Created(User),
    EmailTaken,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;
    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>, sqlx::Error>;
    /// Only resolves users whose role is `agent`.
    async fn find_agent_by_id(&self, agent_id: i64) -> Result<Option<User>, sqlx::Error>;
    async fn create_user(&self, user: &NewUser) -> Result<CreateUserOutcome, sqlx::Error>;
    /// Returns the user for `email`, creating a password-less customer if absent.
    async fn find_or_create_customer(&self, name: &str, email: &str) -> Result<User, sqlx::Error>;
    async fn record_login(&self, user_id: i64) -> Result<(), sqlx::Error>;
    async fn list_users(&self) -> Result<Vec<PublicUser>, sqlx::Error>;
    async fn list_users_by_roles(&self, roles: &[UserRole]) -> Result<Vec<PublicUser>, sqlx::Error>;
    async fn count_users(&self) -> Result<i64, sqlx::Error>;
}
