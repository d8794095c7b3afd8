use chrono::{Duration, Utc};
use glow_core::{Actor, OrderService};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::error::AppError;
use crate::middleware::Claims;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

impl AuthConfig {
    /// Sign a session token for `actor`. Tokens are normally minted by the
    /// auth service with the same secret.
    pub fn issue_token(&self, actor: &Actor) -> Result<String, AppError> {
        let claims = Claims {
            sub: actor.user_id.to_string(),
            role: actor.role.as_str().to_string(),
            exp: (Utc::now() + Duration::seconds(self.expiration as i64)).timestamp() as usize,
        };

        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.as_bytes()))
            .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Actor, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| AppError::AuthenticationError(format!("Invalid token: {}", e)))?;

        token_data.claims.into_actor()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub service: OrderService,
    pub auth: AuthConfig,
}
