use serde::Deserialize;

use crate::users::model::Role;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role, // CLIENT when omitted
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Login form (`application/x-www-form-urlencoded`).
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}
