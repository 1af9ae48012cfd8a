//! Interactive site administrator management.

use anyhow::{bail, Context, Result};
use sqlx::PgPool;

const MIN_PASSWORD_LENGTH: usize = 12;

/// Prompt for a password interactively (hidden input), confirm, hash, and
/// upsert the administrator in `Site_Admin`.
pub async fn create_admin_interactive(pool: &PgPool, admin_id: &str) -> Result<()> {
    validate_admin_id(admin_id)?;

    let password = prompt_password()?;
    validate_password(&password)?;

    let hash = crate::auth::hash_password(&password)?;

    upsert_admin(pool, admin_id, &hash).await?;

    println!("Admin account ready: {admin_id}");
    Ok(())
}

fn prompt_password() -> Result<String> {
    let pass = rpassword::prompt_password("Enter admin password: ")
        .context("Failed to read password")?;
    let confirm = rpassword::prompt_password("Confirm admin password: ")
        .context("Failed to read password confirmation")?;

    if pass != confirm {
        bail!("Passwords do not match");
    }
    Ok(pass)
}

fn validate_admin_id(admin_id: &str) -> Result<()> {
    if admin_id.trim().is_empty() || admin_id.chars().any(char::is_whitespace) {
        bail!("Invalid admin ID: '{admin_id}'");
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        bail!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters (got {})",
            password.len()
        );
    }
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        bail!("Password must contain uppercase, lowercase, and a digit");
    }
    Ok(())
}

async fn upsert_admin(pool: &PgPool, admin_id: &str, hash: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO Site_Admin (Admin_ID, Admin_Password)
         VALUES ($1, $2)
         ON CONFLICT (Admin_ID) DO UPDATE
         SET Admin_Password = EXCLUDED.Admin_Password",
    )
    .bind(admin_id)
    .bind(hash)
    .execute(pool)
    .await
    .context("Failed to upsert site admin")?;

    Ok(())
}
