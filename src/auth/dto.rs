use serde::{Deserialize, Serialize};

use crate::users::dto::PublicUser;
use crate::users::repo::User;

/// Request body for signup.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response returned after signup or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: PublicUser,
}

impl AuthResponse {
    pub fn new(token: String, user: User) -> Self {
        Self {
            success: true,
            token,
            user: user.into(),
        }
    }
}
