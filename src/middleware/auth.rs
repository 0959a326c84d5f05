use crate::{
    error::{AppError, AppResult},
    models::ProfileRole,
    services::{complaint_state::Actor, profile::ProfileService},
    utils::jwt::decode_jwt,
};
use axum::extract::FromRequestParts;
use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response, Extension};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

/// Caller identity resolved from the bearer token and the local profile.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: ProfileRole,
    pub display_name: String,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.user_id,
            role: self.role,
        }
    }
}

/// JWT authentication middleware
///
/// Verifies the identity provider's token, provisions the profile on first
/// sight, rejects banned users and adds [`AuthUser`] to request extensions.
pub async fn auth_middleware(
    Extension(db): Extension<DatabaseConnection>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&headers).ok_or(AppError::Unauthorized)?;

    let claims = decode_jwt(&token).map_err(|e| {
        tracing::debug!("Rejected bearer token: {}", e);
        AppError::Unauthorized
    })?;

    let user_id = claims.subject_id().ok_or(AppError::Unauthorized)?;

    let profile = ProfileService::new(db)
        .ensure(user_id, claims.name.as_deref())
        .await?;

    if profile.role == ProfileRole::Banned {
        return Err(AppError::Forbidden);
    }

    request.extensions_mut().insert(AuthUser {
        user_id: profile.id,
        role: profile.role,
        display_name: profile.display_name,
    });

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    let token = auth_header.strip_prefix("Bearer ")?;
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Verify the current user has admin role
pub fn require_admin(auth_user: &AuthUser) -> AppResult<Uuid> {
    if auth_user.role != ProfileRole::Admin {
        return Err(AppError::Forbidden);
    }
    Ok(auth_user.user_id)
}

/// Admins and external authorities may move complaints through their lifecycle.
pub fn require_staff(auth_user: &AuthUser) -> AppResult<Actor> {
    if !auth_user.role.can_transition_complaints() {
        return Err(AppError::Forbidden);
    }
    Ok(auth_user.actor())
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn user(role: ProfileRole) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role,
            display_name: "Citizen".to_string(),
        }
    }

    #[test]
    fn bearer_prefix_is_required() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Token abc"),
        );
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc"),
        );
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn empty_bearer_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer "),
        );
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn role_guards() {
        assert!(require_admin(&user(ProfileRole::Admin)).is_ok());
        assert!(require_admin(&user(ProfileRole::Authority)).is_err());
        assert!(require_staff(&user(ProfileRole::Authority)).is_ok());
        assert!(require_staff(&user(ProfileRole::Admin)).is_ok());
        assert!(matches!(
            require_staff(&user(ProfileRole::Citizen)),
            Err(AppError::Forbidden)
        ));
    }
}
