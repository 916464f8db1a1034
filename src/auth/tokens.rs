use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Fresh opaque bearer token
pub fn generate_token() -> String {
    Uuid::new_v4().to_string()
}

/// Hex SHA-256 of a token; only this digest is persisted
pub fn token_digest(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Token from an `Authorization: Bearer ...` header value
pub fn parse_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
