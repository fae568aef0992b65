use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo::User;

/// Public part of the user returned to the client. The password hash and the
/// storage key never appear here.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub bio: Option<String>,
    pub profile_pic: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            bio: u.bio,
            profile_pic: u.profile_pic,
            created_at: u.created_at,
        }
    }
}

/// Request body for profile updates. Unknown fields are rejected.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
}

impl UpdateProfileRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.bio.is_none()
    }
}

/// Response wrapping a single user payload.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: PublicUser,
}

impl UserResponse {
    pub fn new(user: User) -> Self {
        Self {
            success: true,
            user: user.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "John Doe".into(),
            email: "john@example.com".into(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$abc$def".into(),
            bio: None,
            profile_pic: None,
            profile_pic_key: None,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn public_user_never_contains_password_material() {
        let json = serde_json::to_string(&PublicUser::from(sample_user())).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("Key"));
    }

    #[test]
    fn public_user_uses_camel_case_with_null_picture() {
        let json = serde_json::to_value(PublicUser::from(sample_user())).unwrap();
        assert_eq!(json["profilePic"], serde_json::Value::Null);
        assert_eq!(json["name"], "John Doe");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("profile_pic").is_none());
    }

    #[test]
    fn update_request_rejects_unknown_fields() {
        let err = serde_json::from_str::<UpdateProfileRequest>(r#"{"role":"admin"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn update_request_accepts_partial_bodies() {
        let req: UpdateProfileRequest = serde_json::from_str(r#"{"bio":"hello"}"#).unwrap();
        assert_eq!(req.bio.as_deref(), Some("hello"));
        assert!(req.name.is_none());
        assert!(!req.is_empty());

        let empty: UpdateProfileRequest = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }
}
