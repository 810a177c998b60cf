use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::jwt::JwtKeys;
use crate::error::AppError;
use crate::users::repo::Role;

/// Identity attached to a request after bearer-token verification.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            AppError::Unauthorized("Invalid or expired token".to_string())
        })?;

        Ok(AuthUser {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        })
    }
}

/// Optional variant: identity when a valid token is present, `None` otherwise.
pub struct MaybeAuthUser(pub Option<AuthUser>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(
            AuthUser::from_request_parts(parts, state).await.ok(),
        ))
    }
}

/// Role gate: verified identity whose role must be `admin`. Runs the bearer
/// check first, so a missing token is still an authentication error.
#[derive(Debug)]
pub struct RequireAdmin(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(RequireAdmin(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::http::header::AUTHORIZATION;

    fn parts_with_auth(value: Option<String>) -> Parts {
        let mut builder = axum::http::Request::builder().uri("/");
        if let Some(v) = value {
            builder = builder.header(AUTHORIZATION, v);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[tokio::test]
    async fn extracts_identity_from_valid_token() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign(7, "u@x.com", Role::User).unwrap();

        let mut parts = parts_with_auth(Some(format!("Bearer {token}")));
        let user = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .expect("valid token");
        assert_eq!(user.id, 7);
        assert_eq!(user.email, "u@x.com");
        assert!(!user.is_admin());
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let state = AppState::fake();
        let mut parts = parts_with_auth(None);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn malformed_scheme_is_unauthorized() {
        let state = AppState::fake();
        let mut parts = parts_with_auth(Some("Token abc".into()));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn role_gate_rejects_non_admin_with_forbidden() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign(7, "u@x.com", Role::User).unwrap();

        let mut parts = parts_with_auth(Some(format!("Bearer {token}")));
        let err = RequireAdmin::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn role_gate_admits_admin() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign(1, "root@x.com", Role::Admin).unwrap();

        let mut parts = parts_with_auth(Some(format!("Bearer {token}")));
        let RequireAdmin(user) = RequireAdmin::from_request_parts(&mut parts, &state)
            .await
            .expect("admin token");
        assert!(user.is_admin());
    }

    #[tokio::test]
    async fn optional_variant_never_rejects() {
        let state = AppState::fake();
        let mut parts = parts_with_auth(Some("Bearer garbage".into()));
        let MaybeAuthUser(user) = MaybeAuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert!(user.is_none());

        let mut parts = parts_with_auth(None);
        let MaybeAuthUser(user) = MaybeAuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert!(user.is_none());
    }
}
