use crate::error::{ApiError, ApiResult};

pub const MIN_PASSWORD_LEN: usize = 8;

// bcrypt is CPU-bound, so both calls run on the blocking pool

pub async fn hash_password(password: &str, cost: u32) -> ApiResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing task failed: {e}")))?
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("failed to hash password: {e}")))
}

/// A malformed stored hash counts as a mismatch
pub async fn verify_password(password: &str, hash: &str) -> bool {
    let password = password.to_string();
    let hash = hash.to_string();
    match tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await {
        Ok(Ok(matches)) => matches,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Stored password hash could not be verified");
            false
        }
        Err(e) => {
            tracing::error!(error = %e, "Password verification task failed");
            false
        }
    }
}

/// At least eight characters with one letter and one digit
pub fn check_strength(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err("must be at least 8 characters");
    }
    if !password.chars().any(|c| c.is_alphabetic()) {
        return Err("must contain a letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("must contain a digit");
    }
    Ok(())
}
