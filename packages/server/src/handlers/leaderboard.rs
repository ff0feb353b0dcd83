use axum::{Json, extract::State};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::leaderboard;
use crate::models::leaderboard::LeaderboardEntry;
use crate::state::AppState;

/// The ranked leaderboard.
#[utoipa::path(
    get,
    path = "/",
    tag = "Leaderboard",
    operation_id = "getLeaderboard",
    summary = "Ranked standings with Round 3 qualification",
    description = "Derived on demand from the quiz submission set: total score descending, ties broken by earliest completion. Reading the leaderboard also refreshes the sticky qualification flags.",
    responses(
        (status = 200, description = "Ordered leaderboard entries", body = Vec<LeaderboardEntry>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_leaderboard(
    _auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let entries =
        leaderboard::compute(&state.db, &state.config.competition.qualification).await?;
    Ok(Json(entries))
}
