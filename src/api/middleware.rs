/// Request extractors and authentication helpers
use crate::{
    context::AppContext,
    error::{AuthError, TokenError, TokenStage},
    token::Claims,
};
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::{request::Parts, HeaderMap},
    Json,
};
use serde::de::DeserializeOwned;

/// JSON request body whose rejections use the service error format.
///
/// A malformed, mistyped or non-JSON body is answered with
/// 400 `InvalidRequest` instead of axum's plain-text rejection.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            tracing::debug!("Rejected request body: {}", rejection.body_text());
            AuthError::Validation(rejection.body_text())
        })?;

        Ok(ApiJson(value))
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Bearer token from the headers, or an access-stage token error
pub fn require_bearer_token(headers: &HeaderMap) -> Result<String, AuthError> {
    extract_bearer_token(headers).ok_or_else(|| {
        AuthError::token(
            TokenStage::Access,
            TokenError::Invalid("missing bearer token".to_string()),
        )
    })
}

/// Authenticated request: the access token was valid and unexpired
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub username: String,
    pub claims: Claims,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = require_bearer_token(&parts.headers)?;
        let claims = state.tokens.validate_access_token(&token)?;

        Ok(AuthContext {
            username: claims.user.clone(),
            claims,
        })
    }
}
