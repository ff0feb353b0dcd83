use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Admin-controlled access switch, one row per round.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "round_access")]
pub struct Model {
    /// Round number (1-3).
    #[sea_orm(primary_key, auto_increment = false)]
    pub round: i32,

    pub enabled: bool,
    /// Set on the false-to-true transition, untouched on true-to-true.
    pub enabled_at: Option<DateTimeUtc>,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
