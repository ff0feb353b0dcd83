use common::Track;
use serde::{Deserialize, Serialize};

use crate::entity::user;
use crate::error::AppError;

/// Request body for user registration.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "hunter2hunter2")]
    pub password: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RegisterResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "contestant")]
    pub role: String,
}

impl From<user::Model> for RegisterResponse {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            username: m.username,
            role: m.role,
        }
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    #[schema(example = "alice")]
    pub username: String,
    pub password: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub role: String,
    pub permissions: Vec<String>,
}

/// The authenticated participant's account and competition progress.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MeResponse {
    pub id: i32,
    pub username: String,
    pub role: String,
    pub permissions: Vec<String>,
    /// Highest round this participant may enter.
    #[schema(example = 2)]
    pub current_round: i32,
    pub qualified_for_round3: bool,
    pub round3_track: Option<Track>,
}

/// One account to provision in a bulk admin request.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct ProvisionEntry {
    pub username: String,
    /// Generated when omitted; the plaintext is returned once.
    pub password: Option<String>,
}

/// Request body for bulk participant provisioning.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct BulkProvisionRequest {
    pub participants: Vec<ProvisionEntry>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProvisionedParticipant {
    pub user_id: i32,
    pub username: String,
    /// Plaintext password, surfaced exactly once at creation.
    pub password: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct BulkProvisionResponse {
    pub created: Vec<ProvisionedParticipant>,
    /// Usernames that already existed and were left untouched.
    pub existing: Vec<String>,
}

fn validate_username(username: &str) -> Result<(), AppError> {
    let username = username.trim();
    if username.len() < 3 || username.len() > 32 {
        return Err(AppError::Validation(
            "Username must be 3-32 characters".into(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::Validation(
            "Username may only contain letters, digits, '_' and '-'".into(),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }
    Ok(())
}

pub fn validate_register_request(req: &RegisterRequest) -> Result<(), AppError> {
    validate_username(&req.username)?;
    validate_password(&req.password)
}

pub fn validate_login_request(req: &LoginRequest) -> Result<(), AppError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required".into(),
        ));
    }
    Ok(())
}

pub fn validate_bulk_provision(req: &BulkProvisionRequest) -> Result<(), AppError> {
    if req.participants.is_empty() {
        return Err(AppError::Validation("participants must not be empty".into()));
    }
    if req.participants.len() > 500 {
        return Err(AppError::Validation("Too many participants: max 500".into()));
    }
    let mut seen = std::collections::HashSet::new();
    for entry in &req.participants {
        validate_username(&entry.username)?;
        if let Some(ref password) = entry.password {
            validate_password(password)?;
        }
        if !seen.insert(entry.username.trim().to_string()) {
            return Err(AppError::Validation(format!(
                "Duplicate username '{}'",
                entry.username.trim()
            )));
        }
    }
    Ok(())
}
