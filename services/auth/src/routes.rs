//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    error::AuthResult,
    jwt::JwtToken,
    middleware::{AuthenticatedUser, auth_middleware},
    models::UserResponse,
    pages::login_page,
};

/// Response for token generation
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

impl TokenResponse {
    fn bearer(token: JwtToken, expires_in: u64) -> Self {
        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

/// Username/password payload for login and signup
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health_check))
        .route("/login", get(login_page))
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/reissue", post(reissue))
        .merge(protected)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = matches!(state.auth_service.health_check().await, Ok(true));
    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if database { "ok" } else { "degraded" },
            "service": "auth-service",
            "database": database,
        })),
    )
}

/// User signup endpoint
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> AuthResult<impl IntoResponse> {
    let user = state
        .auth_service
        .signup(&payload.username, &payload.password)
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> AuthResult<impl IntoResponse> {
    let token = state
        .auth_service
        .login(&payload.username, &payload.password)
        .await?;

    Ok(Json(TokenResponse::bearer(token, state.auth_service.access_token_expiry())))
}

/// Token reissue endpoint
pub async fn reissue(
    State(state): State<AppState>,
    Json(payload): Json<JwtToken>,
) -> AuthResult<impl IntoResponse> {
    let token = state.auth_service.reissue(&payload).await?;

    Ok(Json(TokenResponse::bearer(token, state.auth_service.access_token_expiry())))
}

/// Logout endpoint
pub async fn logout(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> AuthResult<impl IntoResponse> {
    state.auth_service.logout(user_id).await?;

    Ok(Json(serde_json::json!({"message": "Logged out successfully"})))
}

/// Current user endpoint
pub async fn me(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> AuthResult<impl IntoResponse> {
    let user = state.auth_service.current_user(user_id).await?;
    Ok(Json(UserResponse::from(user)))
}
