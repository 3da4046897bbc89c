//! Applies the database schema and seeds the first admin account.
//!
//! Usage: `migrate` with `DATABASE_URL` set (a `.env` file works too).

use anyhow::Context;
use argon2::{
    Argon2, ParamsBuilder,
    password_hash::{PasswordHasher, SaltString},
};
use rand::RngCore;
use rand::rngs::OsRng;
use uuid::Uuid;

const SCHEMA: &str = include_str!("../../migrations/schema.sql");

const SEED_ADMIN_EMAIL: &str = "admin@example.com";
const SEED_ADMIN_PASSWORD: &str = "admin123";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()))
        .init();

    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let (client, connection) = tokio_postgres::connect(&database_url, tokio_postgres::NoTls)
        .await
        .context("Failed to connect to PostgreSQL")?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("Connection error: {}", e);
        }
    });

    tracing::info!("Applying schema...");
    client
        .batch_execute(SCHEMA)
        .await
        .context("Failed to apply schema")?;
    tracing::info!("✅ Schema applied");

    seed_admin(&client).await?;

    Ok(())
}

/// Inserts a default admin when the users table holds no live account.
async fn seed_admin(client: &tokio_postgres::Client) -> anyhow::Result<()> {
    let row = client
        .query_one("SELECT COUNT(*) FROM users WHERE deleted_at IS NULL", &[])
        .await?;
    let live_users: i64 = row.try_get(0).context("Failed to read user count")?;

    if live_users > 0 {
        tracing::info!("Users already present, skipping seed");
        return Ok(());
    }

    tracing::info!("Seeding initial data...");

    let mut salt_bytes = [0u8; 16];
    OsRng.fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| anyhow::anyhow!("Salt encoding error: {}", e))?;

    // Same parameters the server uses for login.
    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        ParamsBuilder::new()
            .m_cost(19 * 1024)
            .t_cost(3)
            .p_cost(6)
            .build()
            .map_err(|e| anyhow::anyhow!("Argon2 params: {}", e))?,
    );
    let password_hash = argon2
        .hash_password(SEED_ADMIN_PASSWORD.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Argon2 hash error: {}", e))?
        .to_string();

    client
        .execute(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name, role)
            VALUES ($1, $2, $3, 'Admin', 'System', 'admin')
            "#,
            &[&Uuid::new_v4(), &SEED_ADMIN_EMAIL, &password_hash],
        )
        .await
        .context("Failed to seed admin user")?;

    tracing::info!("✅ Admin user created");
    tracing::info!("  Email: {}", SEED_ADMIN_EMAIL);
    tracing::info!("  Password: {}", SEED_ADMIN_PASSWORD);

    Ok(())
}
