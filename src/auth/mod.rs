/*!
 * # Authentication and Authorization
 *
 * Bearer JWTs (HS256) carry the user's role and the permissions derived
 * from it. `auth_middleware` validates the token and stores an [`AuthUser`]
 * in the request extensions; `permission_middleware` gates route groups on
 * a single permission string. Routers opt in through [`AuthRouterExt`].
 */

pub mod password;
pub mod permissions;
pub mod rbac;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    entities::{user, UserRole},
    errors::ServiceError,
};

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    pub role: UserRole,
    pub permissions: Vec<String>,
    /// Token id, used for revocation
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated caller, available to handlers via extractor
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
    pub role: UserRole,
    pub permissions: Vec<String>,
    pub token_id: String,
    /// Expiry of the presented token (unix seconds)
    pub expires_at: i64,
}

impl AuthUser {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Token issued on login
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime in seconds
    pub expires_in: u64,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_issuer: String,
        jwt_audience: String,
        access_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            access_token_expiration,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.auth_issuer.clone(),
            cfg.auth_audience.clone(),
            Duration::from_secs(cfg.jwt_expiration as u64),
        )
    }
}

/// Issues and validates tokens. Revoked token ids are kept in memory until
/// they would have expired anyway.
pub struct AuthService {
    config: AuthConfig,
    revoked_tokens: Arc<RwLock<HashMap<String, i64>>>,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            revoked_tokens: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn generate_token(&self, user: &user::Model) -> Result<TokenResponse, AuthError> {
        let now = Utc::now();
        let expires_in = self.config.access_token_expiration;
        let exp = now
            + ChronoDuration::from_std(expires_in)
                .map_err(|_| AuthError::TokenCreation("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role,
            permissions: rbac::permissions_for(user.role),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        debug!(user_id = user.id, jti = %claims.jti, "Issued access token");

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: expires_in.as_secs(),
        })
    }

    pub async fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);
        validation.validate_nbf = true;

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        if self.revoked_tokens.read().await.contains_key(&claims.jti) {
            return Err(AuthError::RevokedToken);
        }

        Ok(claims)
    }

    /// Revoke a token id until `expires_at`
    pub async fn revoke(&self, token_id: &str, expires_at: i64) {
        let now = Utc::now().timestamp();
        let mut revoked = self.revoked_tokens.write().await;
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(token_id.to_string(), expires_at);
    }

    fn to_auth_user(claims: Claims) -> Result<AuthUser, AuthError> {
        let user_id = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;
        Ok(AuthUser {
            user_id,
            username: claims.username,
            role: claims.role,
            permissions: claims.permissions,
            token_id: claims.jti,
            expires_at: claims.exp,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    RevokedToken,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Authentication service not available")]
    ServiceUnavailable,
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InsufficientPermissions => ServiceError::Forbidden(err.to_string()),
            AuthError::AccountDisabled => ServiceError::Forbidden(err.to_string()),
            AuthError::TokenCreation(msg) => ServiceError::InternalError(msg),
            AuthError::ServiceUnavailable => ServiceError::InternalError(err.to_string()),
            other => ServiceError::Unauthorized(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ServiceError::from(self).into_response()
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

/// Authentication middleware that validates the bearer token
pub async fn auth_middleware(mut request: Request, next: Next) -> Result<Response, AuthError> {
    let auth_service = request
        .extensions()
        .get::<Arc<AuthService>>()
        .cloned()
        .ok_or(AuthError::ServiceUnavailable)?;

    let token = bearer_token(request.headers()).ok_or(AuthError::MissingAuth)?;
    let claims = auth_service.validate_token(token).await.map_err(|e| {
        debug!(error = %e, "Rejected bearer token");
        e
    })?;
    let user = AuthService::to_auth_user(claims)?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Permission middleware; expects `auth_middleware` to have run first
pub async fn permission_middleware(
    State(required_permission): State<&'static str>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !user.has_permission(required_permission) {
        warn!(
            user_id = user.user_id,
            role = %user.role,
            permission = required_permission,
            "Permission denied"
        );
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Extension trait for gating routers
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_permission(self, permission: &'static str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.route_layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_permission(self, permission: &'static str) -> Self {
        self.route_layer(axum::middleware::from_fn_with_state(
            permission,
            permission_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn service() -> AuthService {
        AuthService::new(AuthConfig::new(
            "k9Vq2mZx7LpR4tWc8YbN3hJd6FsA1gUe".into(),
            "inventory-api".into(),
            "inventory-clients".into(),
            Duration::from_secs(3600),
        ))
    }

    fn user(role: UserRole) -> user::Model {
        let now = Utc::now();
        user::Model {
            id: 7,
            username: "casey".into(),
            email: "casey@example.com".into(),
            password_hash: String::new(),
            role,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn issued_token_round_trips_with_role_permissions() {
        let auth = service();
        let token = auth.generate_token(&user(UserRole::Staff)).unwrap();
        let claims = auth.validate_token(&token.access_token).await.unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.role, UserRole::Staff);
        assert!(claims.permissions.contains(&permissions::STOCK_ADJUST.to_string()));
        assert!(!claims.permissions.contains(&permissions::REPORTS_READ.to_string()));
    }

    #[tokio::test]
    async fn token_from_other_secret_is_rejected() {
        let other = AuthService::new(AuthConfig::new(
            "Zq8Wn3Rt6Yp1Lk4Jh7Gf2Ds5Ax9Cv0Bm".into(),
            "inventory-api".into(),
            "inventory-clients".into(),
            Duration::from_secs(3600),
        ));
        let token = other.generate_token(&user(UserRole::Manager)).unwrap();
        assert_matches!(
            service().validate_token(&token.access_token).await,
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let auth = service();
        let token = auth.generate_token(&user(UserRole::Manager)).unwrap();
        let claims = auth.validate_token(&token.access_token).await.unwrap();
        auth.revoke(&claims.jti, claims.exp).await;
        assert_matches!(
            auth.validate_token(&token.access_token).await,
            Err(AuthError::RevokedToken)
        );
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def"));
        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }
}
