use bcrypt::BcryptError;
use diesel::result::Error as DieselError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

// Login specific errors
#[derive(Error, Debug)]
pub enum LoginError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Database error")]
    DatabaseError(DieselError),
    #[error("Database unavailable: {0}")]
    PoolError(String),
    #[error("Hashing error")]
    HashingError(BcryptError),
    #[error("Session error: {0}")]
    SessionError(String),
}

// Registration specific errors
#[derive(Error, Debug)]
pub enum RegisterError {
    #[error("Email already registered")]
    EmailTaken,
    #[error("Invalid registration: {0}")]
    ValidationError(String),
    #[error("Database error")]
    DatabaseError(#[from] DieselError),
    #[error("Database unavailable: {0}")]
    PoolError(String),
    #[error("Hashing error")]
    HashingError(BcryptError),
    #[error("Could not store default settings: {0}")]
    SettingsError(String),
    #[error("Session error: {0}")]
    SessionError(String),
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterForm {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Body returned by login and registration.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: i32,
    pub email: String,
}
