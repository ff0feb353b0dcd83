//! The leaderboard ranker: derives ranks and Round 3 qualification from the
//! set of quiz submissions. Recomputation is idempotent and qualification
//! is sticky — once a participant is flagged, no later recompute clears it,
//! so nobody who already started Round 3 gets pulled back out.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::*;
use tracing::info;

use crate::config::QualificationConfig;
use crate::entity::{quiz_submission, user};
use crate::error::AppError;
use crate::models::leaderboard::LeaderboardEntry;

/// One participant's aggregated quiz results.
#[derive(Clone, Debug)]
struct ScoreRow {
    user_id: i32,
    username: String,
    current_round: i32,
    already_qualified: bool,
    total_score: i32,
    total_questions: i32,
    /// When the participant's total was reached; earlier wins ties.
    latest_completion: DateTime<Utc>,
}

impl ScoreRow {
    fn percentage(&self) -> f64 {
        if self.total_questions == 0 {
            0.0
        } else {
            self.total_score as f64 / self.total_questions as f64 * 100.0
        }
    }
}

/// Sort rows into rank order: total descending, ties broken by earliest
/// completion, then id for determinism.
fn rank_rows(mut rows: Vec<ScoreRow>) -> Vec<ScoreRow> {
    rows.sort_by(|a, b| {
        b.total_score
            .cmp(&a.total_score)
            .then(a.latest_completion.cmp(&b.latest_completion))
            .then(a.user_id.cmp(&b.user_id))
    });
    rows
}

/// Participants newly earning the qualification flag: within the top N
/// ranks and at or above the percentage floor.
fn newly_qualified(ranked: &[ScoreRow], config: &QualificationConfig) -> Vec<i32> {
    ranked
        .iter()
        .take(config.top_n)
        .filter(|row| row.percentage() >= config.min_percentage && !row.already_qualified)
        .map(|row| row.user_id)
        .collect()
}

async fn load_rows(db: &DatabaseConnection) -> Result<Vec<ScoreRow>, AppError> {
    let submissions = quiz_submission::Entity::find()
        .find_also_related(user::Entity)
        .all(db)
        .await?;

    let mut rows: HashMap<i32, ScoreRow> = HashMap::new();
    for (sub, participant) in submissions {
        let Some(participant) = participant else {
            continue;
        };
        let row = rows.entry(sub.user_id).or_insert_with(|| ScoreRow {
            user_id: sub.user_id,
            username: participant.username.clone(),
            current_round: participant.current_round,
            already_qualified: participant.qualified_for_round3,
            total_score: 0,
            total_questions: 0,
            latest_completion: sub.completed_at,
        });
        row.total_score += sub.score;
        row.total_questions += sub.total_questions;
        if sub.completed_at > row.latest_completion {
            row.latest_completion = sub.completed_at;
        }
    }

    Ok(rows.into_values().collect())
}

/// Compute the leaderboard and apply the sticky qualification flags.
pub async fn compute(
    db: &DatabaseConnection,
    config: &QualificationConfig,
) -> Result<Vec<LeaderboardEntry>, AppError> {
    let ranked = rank_rows(load_rows(db).await?);
    let newly = newly_qualified(&ranked, config);

    if !newly.is_empty() {
        user::Entity::update_many()
            .col_expr(
                user::Column::QualifiedForRound3,
                sea_orm::sea_query::Expr::value(true),
            )
            .filter(user::Column::Id.is_in(newly.clone()))
            .exec(db)
            .await?;
        info!(count = newly.len(), "Participants qualified for Round 3");
    }

    let entries = ranked
        .into_iter()
        .enumerate()
        .map(|(i, row)| LeaderboardEntry {
            rank: i as u32 + 1,
            user_id: row.user_id,
            username: row.username.clone(),
            total_score: row.total_score,
            total_questions: row.total_questions,
            percentage: row.percentage(),
            current_round: row.current_round,
            qualified_for_round3: row.already_qualified || newly.contains(&row.user_id),
        })
        .collect();

    Ok(entries)
}

/// Refresh qualification flags without building a response. Idempotent.
pub async fn recompute_qualification(
    db: &DatabaseConnection,
    config: &QualificationConfig,
) -> Result<(), AppError> {
    compute(db, config).await.map(|_| ())
}
