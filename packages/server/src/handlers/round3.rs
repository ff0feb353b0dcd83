use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use common::{Round, Track};
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{round3_submission, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::round3::*;
use crate::state::AppState;

async fn find_participant<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Participant not found".into()))
}

/// Round 3 entry requires the gate (admins bypass) and eligibility.
fn check_round3_entry(
    state: &AppState,
    auth_user: &AuthUser,
    participant: &user::Model,
) -> Result<(), AppError> {
    if auth_user.bypasses_gate() {
        return Ok(());
    }
    if !participant.qualified_for_round3 || participant.current_round < Round::Three.number() {
        return Err(AppError::PermissionDenied);
    }
    if !state.gate.snapshot().is_enabled(Round::Three) {
        return Err(AppError::RoundDisabled(Round::Three));
    }
    Ok(())
}

/// Challenge ids this participant already submitted in a track.
async fn completed_challenge_ids<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    track: Track,
) -> Result<Vec<i32>, AppError> {
    Ok(round3_submission::Entity::find()
        .filter(round3_submission::Column::UserId.eq(user_id))
        .filter(round3_submission::Column::Track.eq(track))
        .select_only()
        .column(round3_submission::Column::ChallengeId)
        .into_tuple::<i32>()
        .all(db)
        .await?)
}

/// The one-time, irreversible track choice.
#[utoipa::path(
    put,
    path = "/track",
    tag = "Round 3",
    operation_id = "setTrack",
    summary = "Choose the Round 3 track",
    description = "Write-once: repeating the same value is a no-op, a different value fails with IMMUTABLE_CHOICE. Requires Round 3 eligibility and the round to be enabled.",
    request_body = SetTrackRequest,
    responses(
        (status = 200, description = "Track set (or already set to the same value)", body = TrackResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not eligible or round disabled (PERMISSION_DENIED, ROUND_DISABLED)", body = ErrorBody),
        (status = 409, description = "Track already chosen (IMMUTABLE_CHOICE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, track = %payload.track))]
pub async fn set_track(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SetTrackRequest>,
) -> Result<Json<TrackResponse>, AppError> {
    let txn = state.db.begin().await?;
    let participant = find_participant(&txn, auth_user.user_id).await?;
    check_round3_entry(&state, &auth_user, &participant)?;

    match participant.round3_track {
        Some(existing) if existing == payload.track => {
            // Idempotent repeat of the same choice.
            return Ok(Json(TrackResponse { track: existing }));
        }
        Some(_) => return Err(AppError::ImmutableChoice),
        None => {}
    }

    let track = payload.track;
    let mut active: user::ActiveModel = participant.into();
    active.round3_track = Set(Some(track));
    active.update(&txn).await?;
    txn.commit().await?;

    info!(user_id = auth_user.user_id, track = %track, "Round 3 track chosen");
    Ok(Json(TrackResponse { track }))
}

/// The participant's challenge catalog.
#[utoipa::path(
    get,
    path = "/challenges",
    tag = "Round 3",
    operation_id = "listChallenges",
    summary = "Challenges of the chosen track",
    description = "Returns the read-only catalog for the participant's track, including starter templates, plus which challenges already have submissions.",
    responses(
        (status = 200, description = "Challenge catalog", body = ChallengeCatalogResponse),
        (status = 400, description = "No track chosen yet (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not eligible or round disabled (PERMISSION_DENIED, ROUND_DISABLED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_challenges(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ChallengeCatalogResponse>, AppError> {
    let participant = find_participant(&state.db, auth_user.user_id).await?;
    check_round3_entry(&state, &auth_user, &participant)?;

    let track = participant.round3_track.ok_or_else(|| {
        AppError::Validation("Choose a track before requesting challenges".into())
    })?;

    let challenges = state
        .bank
        .challenges(track)
        .await
        .map_err(|e| AppError::Internal(format!("Challenge catalog error: {e}")))?;

    let completed = completed_challenge_ids(&state.db, auth_user.user_id, track).await?;
    let track_complete = completed.len() >= state.config.competition.round3.challenges_per_track;

    Ok(Json(ChallengeCatalogResponse {
        track,
        challenges,
        completed_challenge_ids: completed,
        track_complete,
    }))
}

/// Submit a challenge artifact into the review queue.
#[utoipa::path(
    post,
    path = "/submissions",
    tag = "Round 3",
    operation_id = "submitChallenge",
    summary = "Submit a challenge artifact",
    description = "Creates an unscored submission for admin review; nothing is auto-scored. One submission per challenge; a closed track (all challenges submitted) rejects further entry. `auto_submitted` marks revocation-forced submissions.",
    request_body = SubmitChallengeRequest,
    responses(
        (status = 201, description = "Unscored submission created", body = Round3SubmissionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not eligible or round disabled (PERMISSION_DENIED, ROUND_DISABLED)", body = ErrorBody),
        (status = 404, description = "Unknown challenge (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Challenge already submitted or track complete (ALREADY_ATTEMPTED, CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, challenge_id = payload.challenge_id))]
pub async fn submit_challenge(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SubmitChallengeRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_submit_challenge(&payload)?;

    let txn = state.db.begin().await?;
    let participant = find_participant(&txn, auth_user.user_id).await?;
    check_round3_entry(&state, &auth_user, &participant)?;

    let track = participant
        .round3_track
        .ok_or_else(|| AppError::Validation("Choose a track before submitting".into()))?;

    if payload.artifact.track() != track {
        return Err(AppError::Validation(format!(
            "Artifact shape does not match the {track} track"
        )));
    }

    let challenge = state
        .bank
        .challenge(track, payload.challenge_id)
        .await
        .map_err(|e| AppError::Internal(format!("Challenge catalog error: {e}")))?
        .ok_or_else(|| AppError::NotFound("Challenge not found".into()))?;

    let completed = completed_challenge_ids(&txn, auth_user.user_id, track).await?;
    if completed.len() >= state.config.competition.round3.challenges_per_track {
        return Err(AppError::Conflict(
            "Track is complete; no further submissions accepted".into(),
        ));
    }

    let artifact = serde_json::to_value(&payload.artifact)
        .map_err(|e| AppError::Internal(format!("Artifact serialization error: {e}")))?;

    let new_submission = round3_submission::ActiveModel {
        user_id: Set(auth_user.user_id),
        track: Set(track),
        challenge_id: Set(challenge.id),
        challenge_name: Set(challenge.title.clone()),
        artifact: Set(artifact),
        auto_submitted: Set(payload.auto_submitted),
        score: Set(None),
        scored: Set(false),
        scored_at: Set(None),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let model = match new_submission.insert(&txn).await {
        Ok(model) => model,
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            return Err(AppError::AlreadyAttempted(
                "Challenge already has a submission".into(),
            ));
        }
        Err(e) => return Err(e.into()),
    };
    txn.commit().await?;

    info!(
        user_id = auth_user.user_id,
        challenge_id = challenge.id,
        track = %track,
        auto_submitted = payload.auto_submitted,
        "Round 3 artifact submitted for review"
    );

    Ok((StatusCode::CREATED, Json(Round3SubmissionResponse::from(model))))
}

/// The participant's own Round 3 submissions.
#[utoipa::path(
    get,
    path = "/submissions",
    tag = "Round 3",
    operation_id = "listOwnRound3Submissions",
    summary = "Own Round 3 submissions",
    responses(
        (status = 200, description = "Submissions, newest first", body = Vec<Round3SubmissionResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_own_submissions(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Round3SubmissionResponse>>, AppError> {
    let rows = round3_submission::Entity::find()
        .filter(round3_submission::Column::UserId.eq(auth_user.user_id))
        .order_by_desc(round3_submission::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}
