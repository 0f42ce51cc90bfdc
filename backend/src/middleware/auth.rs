//! Authentication middleware
//!
//! Validates HS256 bearer tokens and exposes the caller as [`AuthUser`].
//! Token issuance lives elsewhere; this layer only verifies.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use shared::Actor;
use uuid::Uuid;

use crate::error::AppError;
use crate::AppState;

/// Permission required by every endpoint that changes stock or the catalog
pub const INVENTORY_WRITE: (&str, &str) = ("inventory", "write");

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub restaurant_id: Uuid,
    pub role: String,
    pub permissions: Vec<String>,
}

impl AuthUser {
    /// Check if user has a specific permission
    pub fn has_permission(&self, resource: &str, action: &str) -> bool {
        let permission = format!("{}:{}", resource, action);
        self.permissions.contains(&permission)
    }

    /// The principal as seen by the engine
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id,
            restaurant_id: self.restaurant_id,
        }
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub restaurant_id: String,
    pub role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication middleware that validates JWT tokens against `jwt.secret`
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        Some(token) => token,
        None => {
            return AppError::Unauthorized("Missing or invalid Authorization header".to_string())
                .into_response()
        }
    };

    let auth_user = match decode_jwt(token, &state.config.jwt.secret).and_then(auth_user_from) {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

/// Decode and validate JWT token
fn decode_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    use jsonwebtoken::{decode, DecodingKey, Validation};

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("Rejected token: {}", e);
        AppError::InvalidToken
    })
}

fn auth_user_from(claims: Claims) -> Result<AuthUser, AppError> {
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user ID in token".to_string()))?;
    let restaurant_id = Uuid::parse_str(&claims.restaurant_id)
        .map_err(|_| AppError::Unauthorized("Invalid restaurant ID in token".to_string()))?;

    Ok(AuthUser {
        user_id,
        restaurant_id,
        role: claims.role,
        permissions: claims.permissions,
    })
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

/// Permission guard for use in handlers
pub fn check_permission(user: &AuthUser, (resource, action): (&str, &str)) -> Result<(), AppError> {
    if user.has_permission(resource, action) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %user.user_id,
            role = %user.role,
            "Permission denied: requires {}:{}",
            resource,
            action
        );
        Err(AppError::InsufficientPermissions)
    }
}
