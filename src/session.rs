use crate::challenge::ChallengeId;
use crate::store::{Observers, SubscriptionId};

/// Transient "what is playing right now" view. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub current_track_id: Option<ChallengeId>,
    pub is_playing: bool,
    /// Seconds elapsed, mirrored from the engine
    pub current_position: f64,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    state: SessionState,
    observers: Observers<SessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current_track_id(&self) -> Option<&ChallengeId> {
        self.state.current_track_id.as_ref()
    }

    /// Select a track. Position starts over whenever the track identity changes.
    pub fn select_track(&mut self, id: ChallengeId) {
        if self.state.current_track_id.as_ref() != Some(&id) {
            self.state.current_position = 0.0;
        }
        self.state.current_track_id = Some(id);
        self.observers.notify(&self.state);
    }

    pub fn set_playing(&mut self, playing: bool) {
        if self.state.is_playing != playing {
            self.state.is_playing = playing;
            self.observers.notify(&self.state);
        }
    }

    pub fn set_position(&mut self, seconds: f64) {
        if !seconds.is_finite() || self.state.current_position == seconds {
            return;
        }
        self.state.current_position = seconds.max(0.0);
        self.observers.notify(&self.state);
    }

    pub fn reset(&mut self) {
        if self.state != SessionState::default() {
            self.state = SessionState::default();
            self.observers.notify(&self.state);
        }
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&SessionState) + 'static,
    {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }
}
