//! The progression engine: decides, after a quiz round closes, whether the
//! participant's `current_round` advances. Round 3 eligibility is decided
//! separately by the leaderboard ranker against the whole pool.

use common::Round;
use sea_orm::*;
use tracing::info;

use crate::config::CompetitionConfig;
use crate::entity::user;

/// The round a participant unlocks with this score, if any.
fn advancement_target(round: Round, final_score: i32, config: &CompetitionConfig) -> Option<i32> {
    match round {
        Round::One if final_score >= config.round1.pass_score => Some(2),
        Round::Two if final_score >= config.round2.pass_score => Some(3),
        _ => None,
    }
}

/// Apply progression inside the submission transaction. `current_round` is
/// monotonic: a failed threshold withholds advancement, it never demotes.
pub async fn apply<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    round: Round,
    final_score: i32,
    config: &CompetitionConfig,
) -> Result<(), DbErr> {
    let Some(target) = advancement_target(round, final_score, config) else {
        return Ok(());
    };

    let Some(participant) = user::Entity::find_by_id(user_id).one(db).await? else {
        return Ok(());
    };
    if participant.current_round >= target {
        return Ok(());
    }

    let mut active: user::ActiveModel = participant.into();
    active.current_round = Set(target);
    active.update(db).await?;

    info!(user_id, round = target, "Participant advanced to next round");
    Ok(())
}
