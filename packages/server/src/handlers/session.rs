use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use common::Round;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::session::*;
use crate::session::{self, AnswerError, FinalizeCause, SharedSession};
use crate::state::AppState;

/// Look up a session by id and check it belongs to the caller.
async fn own_session(
    state: &AppState,
    auth_user: &AuthUser,
    id: Uuid,
) -> Result<SharedSession, AppError> {
    let session = state
        .sessions
        .get(id)
        .ok_or_else(|| AppError::NotFound("Session not found".into()))?;
    let owner = session.lock().await.user_id;
    if owner != auth_user.user_id {
        return Err(AppError::NotFound("Session not found".into()));
    }
    Ok(session)
}

/// The session vanished or turned terminal under us: surface the
/// submission that consumed it.
async fn finished_from_store(
    state: &AppState,
    user_id: i32,
    round: Round,
) -> Result<SessionProgressResponse, AppError> {
    let submission = session::find_submission(&state.db, user_id, round)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".into()))?;
    Ok(SessionProgressResponse::finished(submission))
}

/// Start (or resume) a quiz session.
#[utoipa::path(
    post,
    path = "/",
    tag = "Sessions",
    operation_id = "startSession",
    summary = "Start a quiz session for round 1 or 2",
    description = "Requires the round's access gate to be enabled (admins bypass the gate). Rejects with ALREADY_ATTEMPTED when a submission for this round exists — there are no retakes. Starting again while a session is live resumes it.",
    request_body = StartSessionRequest,
    responses(
        (status = 201, description = "Session started or resumed", body = SessionProgressResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Round disabled (ROUND_DISABLED)", body = ErrorBody),
        (status = 404, description = "Unknown participant (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Round already attempted (ALREADY_ATTEMPTED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, round = payload.round))]
pub async fn start_session(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<StartSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_start_session(&payload)?;
    let round = Round::try_from(payload.round).map_err(|e| AppError::Validation(e.to_string()))?;

    let session = session::start_session(&state, &auth_user, round, payload.language).await?;

    let view = {
        let mut guard = session.lock().await;
        let now = Utc::now();
        guard.poll(now);
        SessionView::from_session(&guard, now)
    };

    Ok((
        StatusCode::CREATED,
        Json(SessionProgressResponse::in_progress(view)),
    ))
}

/// The caller's live session for a round.
#[utoipa::path(
    get,
    path = "/current",
    tag = "Sessions",
    operation_id = "currentSession",
    summary = "Live state of the caller's session",
    description = "Returns countdowns at one-second resolution. If the deadline passed or the round was disabled since the last poll, the forced submission is returned instead of an error.",
    params(CurrentSessionQuery),
    responses(
        (status = 200, description = "Session state or terminal submission", body = SessionProgressResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "No session and no submission (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn current_session(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<CurrentSessionQuery>,
) -> Result<Json<SessionProgressResponse>, AppError> {
    let round = Round::try_from(query.round).map_err(|e| AppError::Validation(e.to_string()))?;

    let Some(session) = state.sessions.find_for(auth_user.user_id, round) else {
        return Ok(Json(
            finished_from_store(&state, auth_user.user_id, round).await?,
        ));
    };

    if let Some(submission) = session::enforce_schedule(&state, &session).await? {
        return Ok(Json(SessionProgressResponse::finished(submission)));
    }

    let mut guard = session.lock().await;
    let now = Utc::now();
    guard.poll(now);
    let view = SessionView::from_session(&guard, now);
    Ok(Json(SessionProgressResponse::in_progress(view)))
}

/// Record an answer.
#[utoipa::path(
    post,
    path = "/{id}/answers",
    tag = "Sessions",
    operation_id = "submitAnswer",
    summary = "Record an answer in a live session",
    description = "Round 1 accepts any question index; Round 2 only the question currently on the dial — the dial never rewinds. If the clock ran out, the forced submission is returned.",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer recorded or session force-finalized", body = SessionProgressResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Session not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Question closed (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(session_id = %id))]
pub async fn submit_answer(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<SubmitAnswerRequest>,
) -> Result<Json<SessionProgressResponse>, AppError> {
    validate_submit_answer(&payload)?;
    let session = own_session(&state, &auth_user, id).await?;

    if let Some(submission) = session::enforce_schedule(&state, &session).await? {
        return Ok(Json(SessionProgressResponse::finished(submission)));
    }

    let (result, user_id, round) = {
        let mut guard = session.lock().await;
        let now = Utc::now();
        let result = guard.record_answer(payload.question_index, payload.option_index, now);
        match result {
            Ok(()) => {
                let view = SessionView::from_session(&guard, now);
                return Ok(Json(SessionProgressResponse::in_progress(view)));
            }
            Err(e) => (e, guard.user_id, guard.round),
        }
    };

    match result {
        // The clock beat us between the schedule check and the lock.
        AnswerError::Expired => {
            match session::finalize(&state, &session, FinalizeCause::Deadline).await {
                Ok(submission) => Ok(Json(SessionProgressResponse::finished(submission))),
                Err(AppError::AlreadyAttempted(_)) => {
                    Ok(Json(finished_from_store(&state, user_id, round).await?))
                }
                Err(e) => Err(e),
            }
        }
        AnswerError::Terminal => Ok(Json(finished_from_store(&state, user_id, round).await?)),
        AnswerError::QuestionClosed => Err(AppError::Conflict(
            "Question is closed; the dial never rewinds".into(),
        )),
        AnswerError::QuestionOutOfRange => {
            Err(AppError::Validation("question_index out of range".into()))
        }
        AnswerError::OptionOutOfRange => {
            Err(AppError::Validation("option_index out of range".into()))
        }
        AnswerError::NotSequential => Err(AppError::Validation("Not a sequential round".into())),
    }
}

/// Round 2 "next question".
#[utoipa::path(
    post,
    path = "/{id}/advance",
    tag = "Sessions",
    operation_id = "advanceQuestion",
    summary = "Score the current answer and move to the next question",
    description = "Round 2 only. Scores the current selection, advances the dial and resets the per-question clock. Passing the last question finalizes the session and returns the submission.",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Advanced or finalized", body = SessionProgressResponse),
        (status = 400, description = "Not a sequential round (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Session not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(session_id = %id))]
pub async fn advance_question(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionProgressResponse>, AppError> {
    let session = own_session(&state, &auth_user, id).await?;

    if let Some(submission) = session::enforce_schedule(&state, &session).await? {
        return Ok(Json(SessionProgressResponse::finished(submission)));
    }

    let (outcome, user_id, round) = {
        let mut guard = session.lock().await;
        let now = Utc::now();
        let outcome = guard.advance(now);
        if let Ok(false) = outcome {
            let view = SessionView::from_session(&guard, now);
            return Ok(Json(SessionProgressResponse::in_progress(view)));
        }
        (outcome, guard.user_id, guard.round)
    };

    match outcome {
        // Last question passed: the session completes now.
        Ok(true) => match session::finalize(&state, &session, FinalizeCause::Completed).await {
            Ok(submission) => Ok(Json(SessionProgressResponse::finished(submission))),
            Err(AppError::AlreadyAttempted(_)) => {
                Ok(Json(finished_from_store(&state, user_id, round).await?))
            }
            Err(e) => Err(e),
        },
        Ok(false) => unreachable!("in-progress advance returned above"),
        Err(AnswerError::Terminal) => Ok(Json(finished_from_store(&state, user_id, round).await?)),
        Err(AnswerError::NotSequential) => Err(AppError::Validation(
            "Only Round 2 sessions advance question by question".into(),
        )),
        Err(_) => Err(AppError::Validation("Cannot advance this session".into())),
    }
}

/// Explicit submit.
#[utoipa::path(
    post,
    path = "/{id}/finalize",
    tag = "Sessions",
    operation_id = "finalizeSession",
    summary = "Submit the session now",
    description = "The explicit terminal transition. Races with the deadline auto-submit; whichever write lands first wins and the loser gets ALREADY_ATTEMPTED — never a second submission.",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Submission created", body = QuizSubmissionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Session not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already submitted (ALREADY_ATTEMPTED)", body = ErrorBody),
        (status = 503, description = "Storage unavailable, safe to retry (STORAGE_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(session_id = %id))]
pub async fn finalize_session(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuizSubmissionResponse>, AppError> {
    let session = own_session(&state, &auth_user, id).await?;
    let submission = session::finalize(&state, &session, FinalizeCause::Submit).await?;
    Ok(Json(submission.into()))
}
