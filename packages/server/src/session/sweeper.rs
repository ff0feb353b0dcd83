//! Background enforcement of the session clock and the access gate.
//!
//! Deadlines and access checks are schedule points, not blocking waits: a
//! one-second tick sweeps expired sessions, and a watch subscription on the
//! gate reacts to revocations as they happen. Clients that poll see the
//! same state within their polling interval.

use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::{FinalizeCause, finalize};
use crate::error::AppError;
use crate::gate::AccessSnapshot;
use crate::state::AppState;

/// Run the sweeper until the process exits.
pub async fn run(state: AppState) {
    info!("Starting session sweeper");

    let mut access_rx = state.gate.subscribe();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sweep_deadlines(&state).await;
            }
            changed = access_rx.changed() => {
                if changed.is_err() {
                    // Gate dropped; the server is shutting down.
                    break;
                }
                let snapshot = access_rx.borrow_and_update().clone();
                enforce_revocation(&state, &snapshot).await;
            }
        }
    }
}

/// Force-finalize every session whose clock ran out.
pub async fn sweep_deadlines(state: &AppState) {
    for session in state.sessions.all() {
        let due = {
            let mut guard = session.lock().await;
            !guard.is_terminal() && guard.poll(Utc::now())
        };
        if !due {
            continue;
        }

        match finalize(state, &session, FinalizeCause::Deadline).await {
            Ok(sub) => info!(
                user_id = sub.user_id,
                round = sub.round,
                score = sub.score,
                "Session auto-submitted at deadline"
            ),
            // Another writer performed the terminal transition first.
            Err(AppError::AlreadyAttempted(_)) => {}
            Err(e) => warn!(
                error = ?e,
                "Deadline auto-submit failed; session stays in progress for retry"
            ),
        }
    }
}

/// Force-finalize every non-admin session of a round that just got disabled.
pub async fn enforce_revocation(state: &AppState, snapshot: &AccessSnapshot) {
    for session in state.sessions.all() {
        let revoked = {
            let guard = session.lock().await;
            !guard.is_terminal() && !guard.gate_exempt && !snapshot.is_enabled(guard.round)
        };
        if !revoked {
            continue;
        }

        match finalize(state, &session, FinalizeCause::AccessRevoked).await {
            Ok(sub) => info!(
                user_id = sub.user_id,
                round = sub.round,
                score = sub.score,
                "Session auto-submitted on access revocation"
            ),
            Err(AppError::AlreadyAttempted(_)) => {}
            Err(e) => warn!(
                error = ?e,
                "Revocation auto-submit failed; session stays in progress for retry"
            ),
        }
    }
}
