use common::Track;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The round every participant starts in.
pub const INITIAL_ROUND: i32 = 1;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,
    pub password: String,
    pub role: String,

    /// Highest round this participant may enter (1-3). Monotonically
    /// non-decreasing; only the progression engine writes it.
    pub current_round: i32,
    /// Sticky Round 3 eligibility flag, set by the leaderboard ranker.
    pub qualified_for_round3: bool,
    /// Write-once track choice; `None` until the participant picks.
    pub round3_track: Option<Track>,

    #[sea_orm(has_many)]
    pub quiz_submissions: HasMany<super::quiz_submission::Entity>,

    #[sea_orm(has_many)]
    pub round3_submissions: HasMany<super::round3_submission::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
