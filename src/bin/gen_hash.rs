//! Prints an Argon2id hash for a password, for seeding accounts by hand.
//!
//! Usage: `gen-hash [password]` (defaults to `admin123`).

use argon2::{
    Argon2, ParamsBuilder,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::RngCore;
use rand::rngs::OsRng;

fn main() -> anyhow::Result<()> {
    let password = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "admin123".to_string());

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

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Argon2 hash error: {}", e))?
        .to_string();

    println!("Password: {}", password);
    println!("Hash: {}", hash);

    let parsed = PasswordHash::new(&hash).map_err(|e| anyhow::anyhow!("Hash parse error: {}", e))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => println!("Verification: OK"),
        Err(_) => anyhow::bail!("Verification failed"),
    }

    Ok(())
}
