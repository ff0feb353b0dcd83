//! The session engine: lifecycle of one participant's attempt at one round.
//!
//! `quiz` holds the pure state machine, `store` the in-memory single-writer
//! map, `sweeper` the background clock/revocation enforcement. This module
//! owns the transitions that touch storage: starting a session and the
//! terminal transition into a `quiz_submission` row.

pub mod quiz;
pub mod store;
pub mod sweeper;

use chrono::Utc;
use common::scoring::QuizPacing;
use common::{Language, Round};
use sea_orm::*;
use tracing::{info, warn};

pub use quiz::{AnswerError, QuizOutcome, QuizSession};
pub use store::SharedSession;

use crate::entity::{quiz_submission, user};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::progression;
use crate::state::AppState;

/// What drove a terminal transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinalizeCause {
    /// Explicit submit by the participant.
    Submit,
    /// Round 2 ran out of questions after an explicit advance.
    Completed,
    /// The session clock ran out.
    Deadline,
    /// The access gate switched off mid-session.
    AccessRevoked,
}

impl FinalizeCause {
    /// Forced terminations are tagged on the submission.
    pub fn is_auto(self) -> bool {
        matches!(self, Self::Deadline | Self::AccessRevoked)
    }
}

/// Load the existing submission for a participant/round, if any.
pub async fn find_submission(
    db: &DatabaseConnection,
    user_id: i32,
    round: Round,
) -> Result<Option<quiz_submission::Model>, AppError> {
    Ok(quiz_submission::Entity::find()
        .filter(quiz_submission::Column::UserId.eq(user_id))
        .filter(quiz_submission::Column::Round.eq(round.number()))
        .one(db)
        .await?)
}

/// Start (or resume) a quiz session for rounds 1 and 2.
pub async fn start_session(
    state: &AppState,
    auth: &AuthUser,
    round: Round,
    language: Language,
) -> Result<SharedSession, AppError> {
    if !round.is_quiz() {
        return Err(AppError::Validation(
            "Round 3 has no quiz session; choose a track and submit challenges".into(),
        ));
    }

    // An unknown participant is fatal to the session, not retryable.
    let participant = user::Entity::find_by_id(auth.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Participant not found".into()))?;

    if find_submission(&state.db, auth.user_id, round).await?.is_some() {
        return Err(AppError::AlreadyAttempted(format!(
            "Round {round} was already attempted and cannot be retaken"
        )));
    }

    let bypass = auth.bypasses_gate();
    if participant.current_round < round.number() && !bypass {
        return Err(AppError::Validation(format!(
            "Round {round} is not unlocked for this participant"
        )));
    }
    if !state.gate.snapshot().is_enabled(round) && !bypass {
        return Err(AppError::RoundDisabled(round));
    }

    // Idempotent start: a live session is resumed, not replaced.
    if let Some(existing) = state.sessions.find_for(auth.user_id, round) {
        return Ok(existing);
    }

    let questions = state
        .bank
        .quiz_questions(round, language)
        .await
        .map_err(|e| AppError::Internal(format!("Question bank error: {e}")))?;
    if questions.is_empty() {
        return Err(AppError::Internal(format!(
            "Question bank has no round {round} questions for {language}"
        )));
    }

    let competition = &state.config.competition;
    let (pacing, cap) = match round {
        Round::One => (
            QuizPacing::pooled(competition.round1.duration_secs, competition.round1.grace_secs),
            usize::MAX,
        ),
        _ => (
            QuizPacing::sequential(competition.round2.per_question_secs),
            competition.round2.question_cap,
        ),
    };

    let session = QuizSession::new(
        auth.user_id,
        round,
        language,
        questions,
        pacing,
        cap,
        Utc::now(),
        bypass,
    );
    info!(
        user_id = auth.user_id,
        round = round.number(),
        language = %language,
        session_id = %session.id,
        "Quiz session started"
    );
    Ok(state.sessions.insert(session))
}

/// Perform the terminal transition for a session: close the state machine,
/// write the submission atomically, advance progression, retire the session.
///
/// Exactly one caller wins; every later caller gets `ALREADY_ATTEMPTED`.
/// If storage fails nothing is committed and the session stays in progress
/// so a retry is safe.
pub async fn finalize(
    state: &AppState,
    session: &SharedSession,
    cause: FinalizeCause,
) -> Result<quiz_submission::Model, AppError> {
    let mut guard = session.lock().await;
    if guard.is_terminal() {
        return Err(AppError::AlreadyAttempted(format!(
            "Round {} was already submitted",
            guard.round
        )));
    }

    let now = Utc::now();
    let outcome = guard.close(now);
    let (session_id, user_id, round, language) =
        (guard.id, guard.user_id, guard.round, guard.language);

    let result: Result<quiz_submission::Model, AppError> = async {
        let txn = state.db.begin().await?;

        let new_submission = quiz_submission::ActiveModel {
            user_id: Set(user_id),
            round: Set(round.number()),
            language: Set(language),
            raw_score: Set(outcome.raw),
            penalty: Set(outcome.penalty),
            score: Set(outcome.score),
            total_questions: Set(outcome.total_questions),
            auto_submitted: Set(cause.is_auto()),
            completed_at: Set(now),
            ..Default::default()
        };

        let model = match new_submission.insert(&txn).await {
            Ok(model) => model,
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(AppError::AlreadyAttempted(format!(
                    "Round {round} was already submitted"
                )));
            }
            Err(e) => return Err(e.into()),
        };

        progression::apply(&txn, user_id, round, outcome.score, &state.config.competition)
            .await?;

        txn.commit().await?;
        Ok(model)
    }
    .await;

    let model = match result {
        Ok(model) => model,
        Err(AppError::AlreadyAttempted(msg)) => {
            // A concurrent writer won the race; this session is spent.
            state.sessions.retire(session_id, user_id, round);
            return Err(AppError::AlreadyAttempted(msg));
        }
        Err(e) => {
            // Nothing was committed: reopen so the terminal transition can
            // be retried.
            guard.reopen();
            return Err(e);
        }
    };

    state.sessions.retire(session_id, user_id, round);
    drop(guard);

    info!(
        user_id,
        round = round.number(),
        raw = outcome.raw,
        penalty = outcome.penalty,
        score = outcome.score,
        cause = ?cause,
        "Session finalized"
    );

    // Round 3 eligibility is a pool-wide decision; refresh it as Round 2
    // results land. Idempotent, so a failure here only delays the flag
    // until the next leaderboard read.
    if round == Round::Two {
        let qualification = &state.config.competition.qualification;
        if let Err(e) = crate::leaderboard::recompute_qualification(&state.db, qualification).await
        {
            warn!(error = ?e, "Qualification recompute failed after Round 2 submission");
        }
    }

    Ok(model)
}

/// Re-check the gate and the clock for a session, forcing the terminal
/// transition when either demands it. Returns the submission when the
/// session was (or already had been) force-finalized — forced termination
/// surfaces as a normal submission, never an error.
pub async fn enforce_schedule(
    state: &AppState,
    session: &SharedSession,
) -> Result<Option<quiz_submission::Model>, AppError> {
    let (cause, user_id, round) = {
        let mut guard = session.lock().await;
        if guard.is_terminal() {
            return Ok(None);
        }
        let revoked = !guard.gate_exempt && !state.gate.snapshot().is_enabled(guard.round);
        let due = guard.poll(Utc::now());
        let cause = if revoked {
            Some(FinalizeCause::AccessRevoked)
        } else if due {
            Some(FinalizeCause::Deadline)
        } else {
            None
        };
        (cause, guard.user_id, guard.round)
    };

    let Some(cause) = cause else {
        return Ok(None);
    };

    match finalize(state, session, cause).await {
        Ok(model) => Ok(Some(model)),
        Err(AppError::AlreadyAttempted(_)) => {
            // Lost the race to another writer; hand back their submission.
            let existing = find_submission(&state.db, user_id, round)
                .await?
                .ok_or_else(|| {
                    AppError::Internal("Submission missing after terminal transition".into())
                })?;
            Ok(Some(existing))
        }
        Err(e) => Err(e),
    }
}
