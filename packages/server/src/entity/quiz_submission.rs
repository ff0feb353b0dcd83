use common::Language;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The terminal record of a Round 1 or Round 2 quiz session.
///
/// At most one row per (user_id, round); the unique index created in
/// `seed::ensure_indexes` is the single enforcement point for the
/// no-retakes invariant.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quiz_submission")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    /// Round number (1 or 2).
    pub round: i32,
    pub language: Language,

    /// Count of correctly answered questions.
    pub raw_score: i32,
    /// Time penalty points deducted from the raw score.
    pub penalty: i32,
    /// `max(0, raw_score - penalty)`.
    pub score: i32,
    pub total_questions: i32,

    /// True when the terminal transition was forced by the deadline or by
    /// access revocation rather than an explicit submit.
    pub auto_submitted: bool,

    pub completed_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
