use crate::auth::{AuthError, AuthResult};

/// Token-validation configuration loaded from environment variables.
///
/// Session issuance lives with the external OAuth identity provider; this
/// server only needs the material to verify the bearer tokens it mints.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub issuer: String,
    pub audience: String,
    pub jwt_secret: String,
    pub access_token_ttl_secs: i64,
}

impl AuthConfig {
    pub fn from_env() -> AuthResult<Self> {
        let issuer =
            std::env::var("GEOFEED_JWT_ISSUER").unwrap_or_else(|_| "http://localhost".into());
        let audience =
            std::env::var("GEOFEED_JWT_AUDIENCE").unwrap_or_else(|_| "geofeed-api".into());
        let jwt_secret = std::env::var("GEOFEED_JWT_SECRET")
            .map_err(|_| AuthError::Config("GEOFEED_JWT_SECRET is required".into()))?;
        let access_token_ttl_secs = std::env::var("GEOFEED_ACCESS_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(900);

        Ok(Self {
            issuer,
            audience,
            jwt_secret,
            access_token_ttl_secs,
        })
    }
}
