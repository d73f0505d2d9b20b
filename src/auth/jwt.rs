use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// Claims of the bearer tokens issued by the upstream identity service.
/// This service only validates them; it never mints tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Opaque user id.
    pub sub: String,
    /// Display name as known at token-issue time, if the issuer includes it.
    pub name: Option<String>,
    /// Coarse role label ("admin", "hr", ...), if the issuer includes it.
    pub role: Option<String>,
    pub exp: usize,
    pub jti: Option<String>,
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}
