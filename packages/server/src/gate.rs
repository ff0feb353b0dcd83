//! The per-round access gate.
//!
//! Admin toggles are persisted to `round_access` and published on a watch
//! channel. Reads are lock-free snapshots, cheap enough for every client to
//! poll; the session sweeper subscribes to the channel so revocation is
//! observed without waiting for a poll interval.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::Round;
use sea_orm::*;
use serde::Serialize;
use tokio::sync::watch;

use crate::entity::round_access;
use crate::error::AppError;

/// Current gate state of one round.
#[derive(Clone, Debug, Default, PartialEq, Serialize, utoipa::ToSchema)]
pub struct RoundAccessState {
    pub enabled: bool,
    /// When the round was last switched on; unset until first enabled.
    pub enabled_at: Option<DateTime<Utc>>,
}

/// Snapshot of all three rounds, as served to polling clients.
#[derive(Clone, Debug, Default, PartialEq, Serialize, utoipa::ToSchema)]
pub struct AccessSnapshot {
    pub round1: RoundAccessState,
    pub round2: RoundAccessState,
    pub round3: RoundAccessState,
}

impl AccessSnapshot {
    pub fn round(&self, round: Round) -> &RoundAccessState {
        match round {
            Round::One => &self.round1,
            Round::Two => &self.round2,
            Round::Three => &self.round3,
        }
    }

    fn round_mut(&mut self, round: Round) -> &mut RoundAccessState {
        match round {
            Round::One => &mut self.round1,
            Round::Two => &mut self.round2,
            Round::Three => &mut self.round3,
        }
    }

    pub fn is_enabled(&self, round: Round) -> bool {
        self.round(round).enabled
    }
}

#[derive(Clone)]
pub struct AccessGate {
    tx: Arc<watch::Sender<AccessSnapshot>>,
}

impl AccessGate {
    pub fn new(initial: AccessSnapshot) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Load the gate state from the database at startup.
    pub async fn load(db: &DatabaseConnection) -> Result<Self, DbErr> {
        let rows = round_access::Entity::find().all(db).await?;
        let mut snapshot = AccessSnapshot::default();
        for row in rows {
            if let Ok(round) = Round::try_from(row.round) {
                *snapshot.round_mut(round) = RoundAccessState {
                    enabled: row.enabled,
                    enabled_at: row.enabled_at,
                };
            }
        }
        Ok(Self::new(snapshot))
    }

    /// Lock-free snapshot of all rounds.
    pub fn snapshot(&self) -> AccessSnapshot {
        self.tx.borrow().clone()
    }

    /// Subscribe to gate changes. Used by the session sweeper to force
    /// terminal transitions on revocation.
    pub fn subscribe(&self) -> watch::Receiver<AccessSnapshot> {
        self.tx.subscribe()
    }

    /// Toggle a round. Idempotent: setting the current value again is a
    /// no-op write that still succeeds; `enabled_at` is only stamped on the
    /// false-to-true transition.
    pub async fn set_access(
        &self,
        db: &DatabaseConnection,
        round: Round,
        enabled: bool,
    ) -> Result<RoundAccessState, AppError> {
        let now = Utc::now();

        let txn = db.begin().await?;
        let existing = round_access::Entity::find_by_id(round.number())
            .one(&txn)
            .await?;

        let state = match existing {
            Some(row) => {
                let enabled_at = if enabled && !row.enabled {
                    Some(now)
                } else {
                    row.enabled_at
                };
                let mut active: round_access::ActiveModel = row.into();
                active.enabled = Set(enabled);
                active.enabled_at = Set(enabled_at);
                active.updated_at = Set(now);
                let updated = active.update(&txn).await?;
                RoundAccessState {
                    enabled: updated.enabled,
                    enabled_at: updated.enabled_at,
                }
            }
            None => {
                let enabled_at = enabled.then_some(now);
                let model = round_access::ActiveModel {
                    round: Set(round.number()),
                    enabled: Set(enabled),
                    enabled_at: Set(enabled_at),
                    updated_at: Set(now),
                };
                let inserted = model.insert(&txn).await?;
                RoundAccessState {
                    enabled: inserted.enabled,
                    enabled_at: inserted.enabled_at,
                }
            }
        };
        txn.commit().await?;

        let published = state.clone();
        self.tx.send_if_modified(|snapshot| {
            let slot = snapshot.round_mut(round);
            if *slot == published {
                false
            } else {
                *slot = published.clone();
                true
            }
        });

        Ok(state)
    }
}
