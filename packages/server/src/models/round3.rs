use chrono::{DateTime, Utc};
use common::Track;
use common::catalog::{Artifact, Challenge};
use serde::{Deserialize, Serialize};

use crate::entity::round3_submission;
use crate::error::AppError;

/// Request body for the one-time track choice.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct SetTrackRequest {
    pub track: Track,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TrackResponse {
    pub track: Track,
}

/// The participant's challenge catalog plus their completion state.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ChallengeCatalogResponse {
    pub track: Track,
    pub challenges: Vec<Challenge>,
    pub completed_challenge_ids: Vec<i32>,
    /// True once every challenge in the track has a submission; the track
    /// is then closed for further entry.
    pub track_complete: bool,
}

/// Request body for submitting a challenge artifact.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct SubmitChallengeRequest {
    #[schema(example = 1)]
    pub challenge_id: i32,
    pub artifact: Artifact,
    /// Set by the client when the submission was forced by access
    /// revocation rather than an explicit submit.
    #[serde(default)]
    pub auto_submitted: bool,
}

/// A Round 3 submission, scored or awaiting review.
#[derive(Serialize, utoipa::ToSchema)]
pub struct Round3SubmissionResponse {
    pub id: i32,
    pub user_id: i32,
    /// Present in admin review listings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub track: Track,
    pub challenge_id: i32,
    pub challenge_name: String,
    pub artifact: serde_json::Value,
    pub auto_submitted: bool,
    pub score: Option<i32>,
    pub scored: bool,
    pub created_at: DateTime<Utc>,
    pub scored_at: Option<DateTime<Utc>>,
}

impl Round3SubmissionResponse {
    pub fn from_model(m: round3_submission::Model, username: Option<String>) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            username,
            track: m.track,
            challenge_id: m.challenge_id,
            challenge_name: m.challenge_name,
            artifact: m.artifact,
            auto_submitted: m.auto_submitted,
            score: m.score,
            scored: m.scored,
            created_at: m.created_at,
            scored_at: m.scored_at,
        }
    }
}

impl From<round3_submission::Model> for Round3SubmissionResponse {
    fn from(m: round3_submission::Model) -> Self {
        Self::from_model(m, None)
    }
}

/// Query parameters for the admin review listing.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct ReviewListQuery {
    /// Filter by scored state; omit for all submissions.
    pub scored: Option<bool>,
}

/// Request body for the manual scoring action.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct ApplyScoreRequest {
    /// Must be exactly the configured accept or reject delta.
    #[schema(example = 4)]
    pub score: i32,
}

pub fn validate_submit_challenge(req: &SubmitChallengeRequest) -> Result<(), AppError> {
    if req.artifact.is_empty() {
        return Err(AppError::Validation(
            "Artifact must not be empty".into(),
        ));
    }
    Ok(())
}
