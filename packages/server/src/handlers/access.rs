use axum::{
    Json,
    extract::{Path, State},
};
use common::Round;
use tracing::{info, instrument};

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::gate::{AccessSnapshot, RoundAccessState};
use crate::models::access::SetAccessRequest;
use crate::state::AppState;

/// Serve the gate snapshot. Participants poll this every 5-10 seconds, so
/// it must stay a lock-free read.
#[utoipa::path(
    get,
    path = "/access",
    tag = "Rounds",
    operation_id = "getAccess",
    summary = "Current access state of all rounds",
    responses(
        (status = 200, description = "Access snapshot", body = AccessSnapshot),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_access(
    _auth_user: AuthUser,
    State(state): State<AppState>,
) -> Json<AccessSnapshot> {
    Json(state.gate.snapshot())
}

/// Toggle a round's gate.
#[utoipa::path(
    put,
    path = "/{round}/access",
    tag = "Rounds",
    operation_id = "setAccess",
    summary = "Enable or disable a round",
    description = "Admin action; requires `round:manage` permission. Idempotent: repeating the current value is a no-op write that still succeeds. `enabled_at` is stamped only on the disabled-to-enabled transition. In-progress sessions of a disabled round are force-submitted by the session engine.",
    params(("round" = i32, Path, description = "Round number (1-3)")),
    request_body = SetAccessRequest,
    responses(
        (status = 200, description = "New round state", body = RoundAccessState),
        (status = 400, description = "Invalid round number (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(round, enabled = payload.enabled))]
pub async fn set_access(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(round): Path<i32>,
    AppJson(payload): AppJson<SetAccessRequest>,
) -> Result<Json<RoundAccessState>, AppError> {
    auth_user.require_permission("round:manage")?;

    let round = Round::try_from(round).map_err(|e| AppError::Validation(e.to_string()))?;

    let new_state = state
        .gate
        .set_access(&state.db, round, payload.enabled)
        .await?;

    info!(
        round = round.number(),
        enabled = payload.enabled,
        user_id = auth_user.user_id,
        "Round access toggled"
    );

    Ok(Json(new_state))
}
