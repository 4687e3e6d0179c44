use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::challenge::ChallengeId;
use crate::store::{Observers, SubscriptionId};

/// Serializable view of the ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub total_points: u64,
    pub completed_challenge_ids: Vec<ChallengeId>,
}

/// Authoritative record of awarded points and completed challenges.
///
/// Points only ever go up, and only through `award`; membership of a
/// challenge id is permanent.
#[derive(Debug, Default)]
pub struct Ledger {
    snapshot: LedgerSnapshot,
    members: HashSet<ChallengeId>,
    observers: Observers<LedgerSnapshot>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        let mut members = HashSet::new();
        let completed_challenge_ids = snapshot
            .completed_challenge_ids
            .into_iter()
            .filter(|id| members.insert(id.clone()))
            .collect();
        Self {
            snapshot: LedgerSnapshot {
                total_points: snapshot.total_points,
                completed_challenge_ids,
            },
            members,
            observers: Observers::new(),
        }
    }

    /// Award `points` for `id` unless it was already awarded.
    /// Returns true when the award went through.
    pub fn award(&mut self, id: &ChallengeId, points: u32) -> bool {
        if !self.members.insert(id.clone()) {
            debug!("award skipped: {id} already completed");
            return false;
        }
        self.snapshot.completed_challenge_ids.push(id.clone());
        self.snapshot.total_points = self.snapshot.total_points.saturating_add(points as u64);
        debug!(
            "awarded {points} points for {id}, total {}",
            self.snapshot.total_points
        );
        self.observers.notify(&self.snapshot);
        true
    }

    pub fn total_points(&self) -> u64 {
        self.snapshot.total_points
    }

    pub fn is_completed(&self, id: &ChallengeId) -> bool {
        self.members.contains(id)
    }

    /// Completed ids in the order they were first awarded
    pub fn completed_ids(&self) -> &[ChallengeId] {
        &self.snapshot.completed_challenge_ids
    }

    pub fn completed_count(&self) -> usize {
        self.snapshot.completed_challenge_ids.len()
    }

    pub fn snapshot(&self) -> &LedgerSnapshot {
        &self.snapshot
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&LedgerSnapshot) + 'static,
    {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }
}
