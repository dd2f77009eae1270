/// Registration, login, rotation and session endpoints
use crate::{
    account::{
        AuthWithCode, AuthWithPassword, RegistrationRequest, RestoreTokenRequest, SessionInfo,
        TokenResponse,
    },
    api::middleware::{require_bearer_token, ApiJson, AuthContext},
    context::AppContext,
    error::AuthResult,
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Redirect,
    routing::{get, post, put},
    Json, Router,
};

/// Build account routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/signup", post(sign_up))
        .route("/confirm", post(sign_up))
        .route("/login", post(login))
        .route("/code", post(auth_with_code))
        .route("/password", post(auth_with_password))
        .route("/restore_token", put(restore_token))
        .route("/session", get(get_session))
}

async fn sign_up(
    State(ctx): State<AppContext>,
    ApiJson(req): ApiJson<RegistrationRequest>,
) -> AuthResult<(StatusCode, Json<TokenResponse>)> {
    tracing::debug!("sign_up: {}", req.username);

    let tokens = ctx.registration.register(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse::new("user created", tokens)),
    ))
}

/// Login starts with a one-time code
async fn login() -> Redirect {
    Redirect::permanent("/code")
}

async fn auth_with_code(
    State(ctx): State<AppContext>,
    ApiJson(req): ApiJson<AuthWithCode>,
) -> AuthResult<Json<TokenResponse>> {
    let tokens = ctx.login.with_code(req).await?;

    Ok(Json(TokenResponse::new("authorized", tokens)))
}

async fn auth_with_password(
    State(ctx): State<AppContext>,
    ApiJson(req): ApiJson<AuthWithPassword>,
) -> AuthResult<Json<TokenResponse>> {
    let tokens = ctx.login.with_password(req).await?;

    Ok(Json(TokenResponse::new("authorized", tokens)))
}

/// Rotate a token pair. The access token comes from the Authorization
/// header and may already be expired when lenient rotation is configured.
async fn restore_token(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<RestoreTokenRequest>,
) -> AuthResult<Json<TokenResponse>> {
    let access_token = require_bearer_token(&headers)?;

    let tokens = ctx.tokens.rotate(&access_token, &req.refresh_token).await?;

    Ok(Json(TokenResponse::new("tokens restored", tokens)))
}

async fn get_session(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> AuthResult<Json<SessionInfo>> {
    let user = ctx.store.get_user(&auth.username).await?;

    Ok(Json(SessionInfo {
        username: user.username,
        fullname: user.full_name,
        email: user.email,
        phone_number: user.phone_number,
        expires_at: auth.claims.exp,
    }))
}
