use serde::Serialize;

/// One row of the leaderboard, derived on demand from the submission set.
#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct LeaderboardEntry {
    #[schema(example = 1)]
    pub rank: u32,
    pub user_id: i32,
    #[schema(example = "alice")]
    pub username: String,
    /// Sum of final quiz scores.
    #[schema(example = 27)]
    pub total_score: i32,
    #[schema(example = 40)]
    pub total_questions: i32,
    #[schema(example = 67.5)]
    pub percentage: f64,
    pub current_round: i32,
    pub qualified_for_round3: bool,
}
