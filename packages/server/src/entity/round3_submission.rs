use common::Track;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A Round 3 challenge artifact awaiting (or holding) an admin score.
///
/// Created unscored; `score` is only ever written once, by the manual
/// review action. Unique per (user_id, track, challenge_id).
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "round3_submission")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub track: Track,
    pub challenge_id: i32,
    pub challenge_name: String,

    /// The submitted artifact as tagged JSON: source code for DSA,
    /// an HTML/CSS/JS bundle for web.
    #[sea_orm(column_type = "JsonBinary")]
    pub artifact: serde_json::Value,

    /// True when submitted by the engine on access revocation.
    pub auto_submitted: bool,

    pub score: Option<i32>,
    pub scored: bool,
    pub scored_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
