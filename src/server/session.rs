use super::error::ApiError;
use super::state::GuardedTokenVerifier;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

/// Identity of the caller of a protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: usize,
    pub username: String,
}

/// Rejects the request with 401 unless it carries a valid
/// `Authorization: Bearer <token>` header, otherwise stores the [`Session`]
/// in the request extensions for the handler.
pub async fn require_session(
    State(verifier): State<GuardedTokenVerifier>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or_default());

    let claims = match verifier.authenticate(header) {
        Ok(claims) => claims,
        Err(rejection) => {
            debug!(
                "Rejected {} {}: {:?}",
                request.method(),
                request.uri().path(),
                rejection
            );
            return ApiError::from(rejection).into_response();
        }
    };

    request.extensions_mut().insert(Session {
        user_id: claims.user_id,
        username: claims.username,
    });
    next.run(request).await
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| ApiError::Authentication("authorization header required".to_owned()))
    }
}
