use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::jwt::AuthUser,
    error::{ApiError, ApiMessage},
    extract::AppJson,
    state::AppState,
    users::{
        dto::{UpdateProfileRequest, UserResponse},
        services,
    },
};

// Multipart framing gets some headroom over the 5 MiB image ceiling; the
// service enforces the exact limit.
const MAX_UPLOAD_BODY_BYTES: usize = 6 * 1024 * 1024;

pub fn profile_routes() -> Router<AppState> {
    Router::new().route(
        "/users/profile",
        get(get_profile).put(update_profile).delete(delete_account),
    )
}

pub fn upload_routes() -> Router<AppState> {
    Router::new().route(
        "/users/upload",
        post(upload_picture).layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES)),
    )
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = services::get_profile(&state, user_id).await?;
    Ok(Json(UserResponse::new(user)))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = services::update_profile(&state, user_id, payload).await?;
    Ok(Json(UserResponse::new(user)))
}

/// POST /users/upload (multipart): single image field named `image`, `file`
/// or `profilePic`.
#[instrument(skip(state, mp))]
pub async fn upload_picture(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<Json<UserResponse>, ApiError> {
    let mut image: Option<(bytes::Bytes, String)> = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(|s| s.to_string());
        if matches!(
            name.as_deref(),
            Some("image") | Some("file") | Some("profilePic")
        ) {
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".into());
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::validation(format!("Could not read image: {e}")))?;
            image = Some((data, content_type));
            break;
        }
    }

    let (body, content_type) =
        image.ok_or_else(|| ApiError::validation("An image field is required"))?;

    let user = services::upload_picture(&state, user_id, body, &content_type).await?;
    Ok(Json(UserResponse::new(user)))
}

#[instrument(skip(state))]
pub async fn delete_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiMessage>, ApiError> {
    services::delete_account(&state, user_id).await?;
    Ok(Json(ApiMessage::ok("Account deleted")))
}
