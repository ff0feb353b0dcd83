use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{role, role_permission, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::auth::*;
use crate::state::AppState;
use crate::utils::{hash, jwt};

async fn permissions_for_role(db: &DatabaseConnection, role: &str) -> Result<Vec<String>, AppError> {
    let role_perms = role_permission::Entity::find()
        .filter(role_permission::Column::Role.eq(role))
        .all(db)
        .await?;
    Ok(role_perms.into_iter().map(|rp| rp.permission).collect())
}

/// Handle user registration.
#[utoipa::path(
    post,
    path = "/register",
    tag = "Auth",
    operation_id = "register",
    summary = "Register a new participant account",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Username taken (USERNAME_TAKEN)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_register_request(&payload)?;

    let username = payload.username.trim().to_string();

    let password_hash = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let new_user = user::ActiveModel {
        username: Set(username),
        password: Set(password_hash),
        role: Set(role::DEFAULT_ROLE.to_string()),
        current_round: Set(user::INITIAL_ROUND),
        qualified_for_round3: Set(false),
        round3_track: Set(None),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let created = new_user.insert(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            tracing::debug!("Registration race: unique constraint caught on insert");
            AppError::UsernameTaken
        }
        _ => AppError::from(e),
    })?;

    Ok((StatusCode::CREATED, Json(RegisterResponse::from(created))))
}

/// Handle user login.
#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Log in and receive a bearer token",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Bad credentials (INVALID_CREDENTIALS)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    validate_login_request(&payload)?;

    let username = payload.username.trim();

    let account = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let is_valid = hash::verify_password(&payload.password, &account.password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;

    if !is_valid {
        return Err(AppError::InvalidCredentials);
    }

    let permissions = permissions_for_role(&state.db, &account.role).await?;

    let token = jwt::sign(
        account.id,
        &account.username,
        &account.role,
        permissions.clone(),
        &state.config.auth.jwt_secret,
        state.config.auth.token_ttl_days,
    )
    .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;

    Ok(Json(LoginResponse {
        token,
        username: account.username,
        role: account.role,
        permissions,
    }))
}

/// Return the current participant's account and competition progress.
#[utoipa::path(
    get,
    path = "/me",
    tag = "Auth",
    operation_id = "me",
    summary = "Current account and competition progress",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn me(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MeResponse>, AppError> {
    let account = user::Entity::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Participant not found".into()))?;

    Ok(Json(MeResponse {
        id: account.id,
        username: account.username,
        role: account.role,
        permissions: auth_user.permissions,
        current_round: account.current_round,
        qualified_for_round3: account.qualified_for_round3,
        round3_track: account.round3_track,
    }))
}

/// Bulk-provision participant accounts, with generated or custom passwords.
#[utoipa::path(
    post,
    path = "/participants/bulk",
    tag = "Auth",
    operation_id = "bulkProvisionParticipants",
    summary = "Provision participant accounts in bulk",
    description = "Creates participant accounts ahead of the competition. Requires `participant:provision` permission. Existing usernames are reported in `existing` and left untouched.",
    request_body = BulkProvisionRequest,
    responses(
        (status = 200, description = "Accounts provisioned", body = BulkProvisionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn bulk_provision(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<BulkProvisionRequest>,
) -> Result<Json<BulkProvisionResponse>, AppError> {
    auth_user.require_permission("participant:provision")?;
    validate_bulk_provision(&payload)?;

    let entries: Vec<(String, String)> = payload
        .participants
        .iter()
        .map(|e| {
            let username = e.username.trim().to_string();
            let plaintext = e
                .password
                .clone()
                .unwrap_or_else(|| crate::utils::password::generate_password(12));
            (username, plaintext)
        })
        .collect();

    // Argon2 is deliberately slow; keep it off the async workers.
    let hashed: Vec<(String, String, String)> = tokio::task::spawn_blocking(move || {
        entries
            .into_iter()
            .map(|(username, plaintext)| {
                let password_hash = hash::hash_password(&plaintext)
                    .map_err(|e| format!("Password hash error for '{username}': {e}"))?;
                Ok((username, plaintext, password_hash))
            })
            .collect::<Result<Vec<_>, String>>()
    })
    .await
    .map_err(|e| AppError::Internal(format!("Password hashing task failed: {e}")))?
    .map_err(AppError::Internal)?;

    let txn = state.db.begin().await?;

    let mut created = Vec::new();
    let mut existing = Vec::new();

    for (username, plaintext, password_hash) in hashed {
        let new_user = user::ActiveModel {
            username: Set(username.clone()),
            password: Set(password_hash),
            role: Set(role::DEFAULT_ROLE.to_string()),
            current_round: Set(user::INITIAL_ROUND),
            qualified_for_round3: Set(false),
            round3_track: Set(None),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };

        match new_user.insert(&txn).await {
            Ok(m) => created.push(ProvisionedParticipant {
                user_id: m.id,
                username,
                password: plaintext,
            }),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                existing.push(username);
            }
            Err(e) => return Err(e.into()),
        }
    }

    txn.commit().await?;

    tracing::info!(
        created = created.len(),
        existing = existing.len(),
        user_id = auth_user.user_id,
        "Bulk provisioned participants"
    );

    Ok(Json(BulkProvisionResponse { created, existing }))
}
