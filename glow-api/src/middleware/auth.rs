use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use glow_core::{Actor, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

impl Claims {
    pub fn into_actor(self) -> Result<Actor, AppError> {
        let user_id = Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::AuthenticationError("Token subject is not a user id".to_string()))?;
        let role: Role = self
            .role
            .parse::<Role>()
            .map_err(|e| AppError::AuthorizationError(e.to_string()))?;

        Ok(Actor { user_id, role })
    }
}

// ============================================================================
// Authentication Middleware
// ============================================================================

/// Resolves the bearer token into an [`Actor`] and stores it in the request
/// extensions. Role checks happen in the order service.
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.ok_or_else(|| AppError::AuthenticationError("Missing bearer token".to_string()))?;

    let actor = state.auth.verify(bearer.token())?;
    req.extensions_mut().insert(actor);

    Ok(next.run(req).await)
}
