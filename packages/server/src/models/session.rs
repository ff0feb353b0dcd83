use chrono::{DateTime, Utc};
use common::catalog::QuizQuestion;
use common::{Language, Round};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::quiz_submission;
use crate::error::AppError;
use crate::session::QuizSession;

/// Request body for starting a quiz session.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct StartSessionRequest {
    /// Round number (1 or 2).
    #[schema(example = 1)]
    pub round: i32,
    pub language: Language,
}

/// Request body for recording an answer.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct SubmitAnswerRequest {
    #[schema(example = 0)]
    pub question_index: usize,
    /// Index of the chosen option (0-3).
    #[schema(example = 2)]
    pub option_index: usize,
}

/// Query parameters for looking up the caller's live session.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct CurrentSessionQuery {
    /// Round number (1 or 2).
    #[param(example = 1)]
    pub round: i32,
}

/// A question as shown to a participant. The correct answer stays on the
/// server.
#[derive(Serialize, utoipa::ToSchema)]
pub struct QuestionView {
    pub index: usize,
    pub id: i32,
    pub question: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_images: Option<Vec<Option<String>>>,
}

impl QuestionView {
    fn from_question(index: usize, q: &QuizQuestion) -> Self {
        Self {
            index,
            id: q.id,
            question: q.question.clone(),
            options: q.options.clone(),
            question_image: q.question_image.clone(),
            option_images: q.option_images.clone(),
        }
    }
}

/// Live state of a quiz session, with countdowns at one-second resolution.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SessionView {
    pub session_id: Uuid,
    pub round: i32,
    pub language: Language,
    pub question_count: usize,
    pub answered: usize,
    /// Round 2: the question currently on the dial.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_index: Option<usize>,
    pub time_left_secs: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_time_left_secs: Option<i64>,
    /// Round 1: penalty points that would apply if submitted now.
    pub penalty_points: i32,
    /// Round 1: the whole pool. Round 2: just the current question.
    pub questions: Vec<QuestionView>,
}

impl SessionView {
    pub fn from_session(session: &QuizSession, now: DateTime<Utc>) -> Self {
        let questions = match session.round {
            Round::One => session
                .questions()
                .iter()
                .enumerate()
                .map(|(i, q)| QuestionView::from_question(i, q))
                .collect(),
            _ => session
                .current_question()
                .map(|(i, q)| vec![QuestionView::from_question(i, q)])
                .unwrap_or_default(),
        };

        Self {
            session_id: session.id,
            round: session.round.number(),
            language: session.language,
            question_count: session.question_count(),
            answered: session.answered_count(),
            current_index: session.current_question().map(|(i, _)| i),
            time_left_secs: session.time_left_secs(now),
            question_time_left_secs: session.question_time_left_secs(now),
            penalty_points: session.penalty_points(now),
            questions,
        }
    }
}

/// A finalized quiz submission.
#[derive(Serialize, utoipa::ToSchema)]
pub struct QuizSubmissionResponse {
    pub id: i32,
    pub round: i32,
    pub language: Language,
    #[schema(example = 14)]
    pub raw_score: i32,
    #[schema(example = 12)]
    pub penalty: i32,
    /// `max(0, raw_score - penalty)`.
    #[schema(example = 2)]
    pub score: i32,
    pub total_questions: i32,
    /// True when the deadline or access revocation forced the submission.
    pub auto_submitted: bool,
    pub completed_at: DateTime<Utc>,
}

impl From<quiz_submission::Model> for QuizSubmissionResponse {
    fn from(m: quiz_submission::Model) -> Self {
        Self {
            id: m.id,
            round: m.round,
            language: m.language,
            raw_score: m.raw_score,
            penalty: m.penalty,
            score: m.score,
            total_questions: m.total_questions,
            auto_submitted: m.auto_submitted,
            completed_at: m.completed_at,
        }
    }
}

/// Progress response shared by every session operation: either the session
/// is still live, or it reached its terminal transition and the submission
/// is returned — forced terminations included.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SessionProgressResponse {
    pub finished: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission: Option<QuizSubmissionResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionView>,
}

impl SessionProgressResponse {
    pub fn in_progress(view: SessionView) -> Self {
        Self {
            finished: false,
            submission: None,
            session: Some(view),
        }
    }

    pub fn finished(model: quiz_submission::Model) -> Self {
        Self {
            finished: true,
            submission: Some(model.into()),
            session: None,
        }
    }
}

pub fn validate_start_session(req: &StartSessionRequest) -> Result<(), AppError> {
    if !(1..=2).contains(&req.round) {
        return Err(AppError::Validation(
            "round must be 1 or 2; Round 3 is not session-based".into(),
        ));
    }
    Ok(())
}

pub fn validate_submit_answer(req: &SubmitAnswerRequest) -> Result<(), AppError> {
    if req.option_index > 3 {
        return Err(AppError::Validation("option_index must be 0-3".into()));
    }
    Ok(())
}
