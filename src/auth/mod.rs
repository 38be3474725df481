//! Bearer-token validation for identities issued by the external OAuth
//! provider: configuration, token decoding, and the Rocket request guard.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod guards;
pub mod jwt;

pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use guards::AuthUser;
pub use jwt::JwtService;

#[derive(Clone)]
pub struct AuthState {
    pub config: AuthConfig,
    pub jwt_service: Arc<JwtService>,
}

impl AuthState {
    pub fn new(config: AuthConfig) -> AuthResult<Self> {
        let jwt_service = JwtService::from_config(&config)?;
        Ok(Self {
            config,
            jwt_service: Arc::new(jwt_service),
        })
    }
}
