//! The scoring and penalty calculator.
//!
//! Every terminal transition funnels through these functions — manual
//! submit, deadline auto-submit, and revocation-forced submit all score
//! identically.

/// Pacing parameters for a timed quiz round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuizPacing {
    /// Total wall clock for the whole session, in seconds. `None` for
    /// rounds paced per question.
    pub total_secs: Option<i64>,
    /// Penalty-free window at the start of the session, in seconds.
    pub grace_secs: i64,
    /// Independent deadline per question, in seconds. `None` for rounds
    /// with a single shared clock.
    pub per_question_secs: Option<i64>,
}

impl QuizPacing {
    /// Round 1: all questions at once, 20 minutes total, 5 minute grace.
    pub fn pooled(total_secs: i64, grace_secs: i64) -> Self {
        Self {
            total_secs: Some(total_secs),
            grace_secs,
            per_question_secs: None,
        }
    }

    /// Round 2: sequential questions, an independent clock each.
    pub fn sequential(per_question_secs: i64) -> Self {
        Self {
            total_secs: None,
            grace_secs: 0,
            per_question_secs: Some(per_question_secs),
        }
    }
}

/// Penalty points accrued after `elapsed_secs` of a session with the given
/// grace window: one point per *full* minute beyond the grace period.
pub fn elapsed_penalty(elapsed_secs: i64, grace_secs: i64) -> i32 {
    let beyond_grace = elapsed_secs - grace_secs;
    if beyond_grace <= 0 {
        0
    } else {
        (beyond_grace / 60) as i32
    }
}

/// Final score: raw minus penalty, floored at zero.
pub fn final_score(raw: i32, penalty: i32) -> i32 {
    (raw - penalty).max(0)
}
