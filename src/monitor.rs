//! Turns engine position/duration samples into progress updates and a single
//! completion per track.
//!
//! Ticks and events must be fed in arrival order from one thread; the
//! "already triggered" marker is a plain field, not an atomic.

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::challenge::ChallengeId;
use crate::challenge_store::ChallengeStore;
use crate::engine::Sample;
use crate::ledger::Ledger;
use crate::session::SessionStore;

/// Thresholds deciding when a track counts as finished
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionRules {
    /// Percentage at which a track is finished outright
    pub completion_threshold: f64,
    /// Seconds before the end within which `near_end_threshold` suffices
    pub time_threshold_secs: f64,
    pub near_end_threshold: f64,
}

impl Default for CompletionRules {
    fn default() -> Self {
        Self {
            completion_threshold: 100.0,
            time_threshold_secs: 0.5,
            near_end_threshold: 99.5,
        }
    }
}

impl CompletionRules {
    /// Both branches are kept: engines that stall a hair before the end only
    /// ever satisfy the second one.
    pub fn is_complete(&self, sample: &Sample) -> bool {
        let Some(percentage) = sample.percentage() else {
            return false;
        };
        percentage >= self.completion_threshold
            || (sample.time_remaining() <= self.time_threshold_secs
                && percentage >= self.near_end_threshold)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CompletionTrigger {
    /// Position reached the completion predicate
    Progress,
    /// Engine reported the queue ended
    QueueEnded,
    /// Listener completed the challenge by hand
    Manual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionEvent {
    pub challenge_id: ChallengeId,
    pub trigger: CompletionTrigger,
    /// Points added to the ledger by this completion, 0 if already awarded
    pub points_awarded: u32,
    pub first_completion: bool,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ProgressMonitor {
    rules: CompletionRules,
    /// Track identity the marker below belongs to
    tracked: Option<ChallengeId>,
    triggered_for: Option<ChallengeId>,
}

impl ProgressMonitor {
    pub fn new(rules: CompletionRules) -> Self {
        Self {
            rules,
            tracked: None,
            triggered_for: None,
        }
    }

    /// Forget any completion recorded for the current play
    pub fn reset(&mut self) {
        self.tracked = None;
        self.triggered_for = None;
    }

    pub fn has_triggered(&self, id: &ChallengeId) -> bool {
        self.triggered_for.as_ref() == Some(id)
    }

    /// Resets the marker when the current track identity changed since the
    /// last tick, so a new track always starts eligible.
    fn observe_track(&mut self, current: &ChallengeId) {
        if self.tracked.as_ref() != Some(current) {
            if self.tracked.is_some() {
                debug!("track changed to {current}, completion marker reset");
            }
            self.tracked = Some(current.clone());
            self.triggered_for = None;
        }
    }

    /// Process one position/duration sample for the session's current track
    pub fn on_tick(
        &mut self,
        sample: Sample,
        session: &SessionStore,
        challenges: &mut ChallengeStore,
        ledger: &mut Ledger,
    ) -> Option<CompletionEvent> {
        let id = session.current_track_id()?.clone();
        self.observe_track(&id);

        let percentage = sample.percentage()?;
        if sample.position > 0.0 {
            challenges.set_progress(&id, percentage);
        }

        if !self.rules.is_complete(&sample) {
            return None;
        }
        self.fire(id, CompletionTrigger::Progress, challenges, ledger)
    }

    /// Engine finished the queue: an alternate completion trigger
    pub fn on_queue_ended(
        &mut self,
        session: &SessionStore,
        challenges: &mut ChallengeStore,
        ledger: &mut Ledger,
    ) -> Option<CompletionEvent> {
        let id = session.current_track_id()?.clone();
        self.observe_track(&id);
        self.fire(id, CompletionTrigger::QueueEnded, challenges, ledger)
    }

    fn fire(
        &mut self,
        id: ChallengeId,
        trigger: CompletionTrigger,
        challenges: &mut ChallengeStore,
        ledger: &mut Ledger,
    ) -> Option<CompletionEvent> {
        if self.has_triggered(&id) {
            return None;
        }
        self.triggered_for = Some(id.clone());

        let Some(points) = challenges.get(&id).map(|c| c.points) else {
            debug!("completion for unknown challenge {id} ignored");
            return None;
        };
        Some(complete(id, points, trigger, challenges, ledger))
    }
}

/// Mark `id` completed and award its points once. Shared by the monitor and
/// the manual completion action.
pub(crate) fn complete(
    id: ChallengeId,
    points: u32,
    trigger: CompletionTrigger,
    challenges: &mut ChallengeStore,
    ledger: &mut Ledger,
) -> CompletionEvent {
    let at = Utc::now();
    challenges.set_completed_at(&id, at);
    let first_completion = ledger.award(&id, points);
    info!(
        "challenge {id} completed via {trigger}{}",
        if first_completion {
            format!(", +{points} points")
        } else {
            String::new()
        }
    );
    CompletionEvent {
        challenge_id: id,
        trigger,
        points_awarded: if first_completion { points } else { 0 },
        first_completion,
        at,
    }
}
