use axum::{
    Json,
    extract::{Path, Query, State},
};
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{round3_submission, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::round3::*;
use crate::state::AppState;

/// The admin review queue.
#[utoipa::path(
    get,
    path = "/",
    tag = "Review",
    operation_id = "listRound3Submissions",
    summary = "List Round 3 submissions for review",
    description = "All participants' Round 3 submissions, optionally filtered by scored state. Requires `round3:review` permission.",
    params(ReviewListQuery),
    responses(
        (status = 200, description = "Submissions with participant names", body = Vec<Round3SubmissionResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_submissions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ReviewListQuery>,
) -> Result<Json<Vec<Round3SubmissionResponse>>, AppError> {
    auth_user.require_permission("round3:review")?;

    let mut select = round3_submission::Entity::find();
    if let Some(scored) = query.scored {
        select = select.filter(round3_submission::Column::Scored.eq(scored));
    }

    let rows = select
        .find_also_related(user::Entity)
        .order_by_asc(round3_submission::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let items = rows
        .into_iter()
        .map(|(sub, participant)| {
            Round3SubmissionResponse::from_model(sub, participant.map(|u| u.username))
        })
        .collect();

    Ok(Json(items))
}

/// The manual scoring action.
#[utoipa::path(
    post,
    path = "/{id}/score",
    tag = "Review",
    operation_id = "applyManualScore",
    summary = "Score a Round 3 submission",
    description = "Applies the fixed binary outcome: exactly the configured accept (+4) or reject (-1) delta, anything else is INVALID_SCORE. A submission is scored at most once; re-scoring fails with CONFLICT. Requires `round3:score` permission.",
    params(("id" = i32, Path, description = "Submission ID")),
    request_body = ApplyScoreRequest,
    responses(
        (status = 200, description = "Submission scored", body = Round3SubmissionResponse),
        (status = 400, description = "Score outside the accepted pair (INVALID_SCORE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Submission not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already scored (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(submission_id = %id, score = payload.score))]
pub async fn apply_score(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<ApplyScoreRequest>,
) -> Result<Json<Round3SubmissionResponse>, AppError> {
    auth_user.require_permission("round3:score")?;

    let round3 = &state.config.competition.round3;
    if payload.score != round3.score_accept && payload.score != round3.score_reject {
        return Err(AppError::InvalidScore {
            accept: round3.score_accept,
            reject: round3.score_reject,
        });
    }

    let txn = state.db.begin().await?;

    let submission = round3_submission::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Submission not found".into()))?;

    if submission.scored {
        return Err(AppError::Conflict(
            "Submission is already scored; scoring is final".into(),
        ));
    }

    let mut active: round3_submission::ActiveModel = submission.into();
    active.score = Set(Some(payload.score));
    active.scored = Set(true);
    active.scored_at = Set(Some(chrono::Utc::now()));
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    info!(
        submission_id = id,
        score = payload.score,
        user_id = auth_user.user_id,
        "Round 3 submission scored"
    );

    Ok(Json(Round3SubmissionResponse::from(updated)))
}
