use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, SignupRequest},
        jwt::AuthUser,
        services,
    },
    error::{ApiError, ApiMessage},
    extract::AppJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let (token, user) = services::signup(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(AuthResponse::new(token, user))))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (token, user) = services::login(&state, payload).await?;
    Ok(Json(AuthResponse::new(token, user)))
}

/// Tokens are self-contained; logout is the client discarding its copy.
#[instrument(skip_all)]
pub async fn logout(AuthUser(user_id): AuthUser) -> Json<ApiMessage> {
    info!(user_id = %user_id, "user logged out");
    Json(ApiMessage::ok("Logged out"))
}
