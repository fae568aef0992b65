use bytes::Bytes;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::services::is_valid_email;
use crate::error::{conflict_on_unique, ApiError};
use crate::state::AppState;
use crate::users::dto::UpdateProfileRequest;
use crate::users::repo::User;

const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn get_profile(state: &AppState, user_id: Uuid) -> Result<User, ApiError> {
    User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

pub async fn update_profile(
    state: &AppState,
    user_id: Uuid,
    mut req: UpdateProfileRequest,
) -> Result<User, ApiError> {
    if req.is_empty() {
        return Err(ApiError::validation("Nothing to update"));
    }

    if let Some(name) = &mut req.name {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ApiError::validation("Name must not be empty"));
        }
        *name = trimmed.to_string();
    }

    if let Some(email) = &mut req.email {
        *email = email.trim().to_lowercase();
        if !is_valid_email(email) {
            return Err(ApiError::validation("Invalid email"));
        }
        // Changing to an address held by someone else is a conflict; keeping
        // your own address is not.
        if let Some(existing) = User::find_by_email(&state.db, email).await? {
            if existing.id != user_id {
                return Err(ApiError::conflict("Email already in use"));
            }
        }
    }

    let updated = User::update_profile(
        &state.db,
        user_id,
        req.name.as_deref(),
        req.email.as_deref(),
        req.bio.as_deref(),
    )
    .await
    .map_err(|e| conflict_on_unique(e, "Email already in use"))?
    .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!(user_id = %user_id, "profile updated");
    Ok(updated)
}

pub async fn upload_picture(
    state: &AppState,
    user_id: Uuid,
    body: Bytes,
    content_type: &str,
) -> Result<User, ApiError> {
    let ext =
        ext_from_mime(content_type).ok_or_else(|| ApiError::validation("Unsupported image type"))?;
    if body.is_empty() {
        return Err(ApiError::validation("Image must not be empty"));
    }
    if body.len() > MAX_IMAGE_BYTES {
        return Err(ApiError::validation("Image exceeds the 5 MiB limit"));
    }

    let current = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let key = format!("avatars/{}/{}.{}", user_id, Uuid::new_v4(), ext);
    let url = match timeout(UPLOAD_TIMEOUT, state.storage.upload(&key, body, content_type)).await {
        Err(_) => {
            warn!(user_id = %user_id, key = %key, "image upload timed out");
            return Err(ApiError::upstream("Image upload timed out"));
        }
        Ok(Err(e)) => {
            error!(error = %e, user_id = %user_id, key = %key, "image upload failed");
            return Err(ApiError::upstream("Image upload failed"));
        }
        Ok(Ok(url)) => url,
    };

    let updated = User::set_profile_pic(&state.db, user_id, &url, &key)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if let Some(old_key) = current.profile_pic_key {
        discard_object(state, old_key);
    }

    info!(user_id = %user_id, key = %key, "profile picture uploaded");
    Ok(updated)
}

pub async fn delete_account(state: &AppState, user_id: Uuid) -> Result<(), ApiError> {
    let user = User::delete(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if let Some(key) = user.profile_pic_key {
        discard_object(state, key);
    }

    info!(user_id = %user_id, "account deleted");
    Ok(())
}

/// Best-effort removal of a stored object; never blocks or fails the request.
fn discard_object(state: &AppState, key: String) {
    let storage = state.storage.clone();
    tokio::spawn(async move {
        if let Err(e) = storage.delete(&key).await {
            warn!(error = %e, key = %key, "failed to delete stored object");
        }
    });
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn ext_from_mime_allows_only_listed_types() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/heic"), None);
        assert_eq!(ext_from_mime("image/gif"), None);
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    // Validation failures must short-circuit before any storage or database
    // call; the fake state's pool would error if they did not.

    #[tokio::test]
    async fn upload_rejects_disallowed_type_before_any_call() {
        let state = AppState::fake();
        let err = upload_picture(
            &state,
            Uuid::new_v4(),
            Bytes::from_static(b"GIF89a"),
            "image/gif",
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upload_rejects_oversized_payload_before_any_call() {
        let state = AppState::fake();
        let body = Bytes::from(vec![0u8; MAX_IMAGE_BYTES + 1]);
        let err = upload_picture(&state, Uuid::new_v4(), body, "image/png")
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upload_rejects_empty_payload() {
        let state = AppState::fake();
        let err = upload_picture(&state, Uuid::new_v4(), Bytes::new(), "image/png")
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn empty_update_is_rejected() {
        let state = AppState::fake();
        let req = UpdateProfileRequest {
            name: None,
            email: None,
            bio: None,
        };
        let err = update_profile(&state, Uuid::new_v4(), req)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_rejects_blank_name_and_bad_email() {
        let state = AppState::fake();

        let req = UpdateProfileRequest {
            name: Some("   ".into()),
            email: None,
            bio: None,
        };
        let err = update_profile(&state, Uuid::new_v4(), req)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let req = UpdateProfileRequest {
            name: None,
            email: Some("not-an-email".into()),
            bio: None,
        };
        let err = update_profile(&state, Uuid::new_v4(), req)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
