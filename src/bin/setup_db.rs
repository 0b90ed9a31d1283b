use std::env;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use support_portal_backend::models::user::UserRole;
use support_portal_backend::utils::password::hash_password;

const ADMIN_EMAIL: &str = "admin@backupsupport.com";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
const TEST_AGENT_PASSWORD: &str = "agent123";
const TEST_AGENTS: [(&str, &str); 3] = [
    ("Test Agent 1", "agent1@test.com"),
    ("Test Agent 2", "agent2@test.com"),
    ("Test Agent 3", "agent3@test.com"),
];

/// Inserts the user unless the email is already taken. Returns whether a row was written.
async fn seed_user(pool: &PgPool, name: &str, email: &str, password: &str, role: UserRole) -> Result<bool> {
    let password_hash =
        hash_password(password).map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;
    let result = sqlx::query(
        "INSERT INTO users (name, email, password_hash, role) VALUES ($1, $2, $3, $4) \
         ON CONFLICT (email) DO NOTHING",
    )
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role.as_str())
    .execute(pool)
    .await
    .with_context(|| format!("failed to seed {email}"))?;
    Ok(result.rows_affected() > 0)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let with_test_agents = env::args().skip(1).any(|arg| arg == "--with-test-agents");
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL is required to set up the database")?;
    let admin_password =
        env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.to_string());

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .context("failed to connect to DATABASE_URL")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("failed to apply migrations")?;
    println!("Schema is up to date");

    if seed_user(&pool, "Admin User", ADMIN_EMAIL, &admin_password, UserRole::Admin).await? {
        println!("Default admin user created: {ADMIN_EMAIL}");
    } else {
        println!("Admin user already exists");
    }

    let seeded = sqlx::query(
        "INSERT INTO system_status (id, primary_system_status, failover_activated) \
         VALUES (1, 'online', FALSE) ON CONFLICT (id) DO NOTHING",
    )
    .execute(&pool)
    .await
    .context("failed to seed system status")?;
    if seeded.rows_affected() > 0 {
        println!("Initial system status created");
    } else {
        println!("System status already exists");
    }

    if with_test_agents {
        for (name, email) in TEST_AGENTS {
            let created = seed_user(&pool, name, email, TEST_AGENT_PASSWORD, UserRole::Agent).await?;
            println!(
                "  {email}: {}",
                if created { "created" } else { "already exists" }
            );
        }
        println!("Test agents use the password {TEST_AGENT_PASSWORD}");
    }

    Ok(())
}
