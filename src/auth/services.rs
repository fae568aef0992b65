use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::auth::dto::{LoginRequest, SignupRequest};
use crate::auth::jwt::JwtKeys;
use crate::auth::password::{hash_password, verify_password};
use crate::error::{conflict_on_unique, ApiError};
use crate::state::AppState;
use crate::users::repo::User;

const MIN_PASSWORD_LEN: usize = 8;
// One message for both failure modes, so callers cannot probe which
// addresses are registered.
const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub async fn signup(state: &AppState, mut req: SignupRequest) -> Result<(String, User), ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::validation("Name is required"));
    }
    req.email = req.email.trim().to_lowercase();
    if !is_valid_email(&req.email) {
        return Err(ApiError::validation("Invalid email"));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation("Password must be at least 8 characters"));
    }

    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        warn!(email = %req.email, "email already registered");
        return Err(ApiError::conflict("Email already registered"));
    }

    let hash = hash_password(&req.password)?;
    let user = User::create(&state.db, &name, &req.email, &hash)
        .await
        .map_err(|e| conflict_on_unique(e, "Email already registered"))?;

    let token = JwtKeys::from_ref(state).sign(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((token, user))
}

pub async fn login(state: &AppState, mut req: LoginRequest) -> Result<(String, User), ApiError> {
    req.email = req.email.trim().to_lowercase();
    if !is_valid_email(&req.email) {
        return Err(ApiError::validation("Invalid email"));
    }

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %req.email, "login with unknown email");
            ApiError::unauthorized(INVALID_CREDENTIALS)
        })?;

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(email = %req.email, user_id = %user.id, "login with invalid password");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    let token = JwtKeys::from_ref(state).sign(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((token, user))
}
