use log::{error, info, warn};

use crate::challenge::{Challenge, ChallengeId};
use crate::challenge_store::ChallengeStore;
use crate::engine::{
    AudioEngine, EngineError, EngineErrorCode, EngineEvent, EngineState, EngineTrack, Sample,
};
use crate::error::PlaybackError;
use crate::ledger::Ledger;
use crate::monitor::{
    complete, CompletionEvent, CompletionRules, CompletionTrigger, ProgressMonitor,
};
use crate::points_counter::PointsCounter;
use crate::session::SessionStore;

/// Owns the stores and wires the engine to the progress monitor.
///
/// All engine failures end up in `error()`; nothing here panics or aborts
/// the tick loop.
#[derive(Debug)]
pub struct Player<E: AudioEngine> {
    engine: E,
    challenges: ChallengeStore,
    ledger: Ledger,
    session: SessionStore,
    monitor: ProgressMonitor,
    counter: PointsCounter,
    loading: bool,
    error: Option<String>,
    is_completed: bool,
    duration: f64,
}

impl<E: AudioEngine> Player<E> {
    pub fn new(
        engine: E,
        challenges: ChallengeStore,
        ledger: Ledger,
        rules: CompletionRules,
    ) -> Self {
        Self {
            engine,
            challenges,
            ledger,
            session: SessionStore::new(),
            monitor: ProgressMonitor::new(rules),
            counter: PointsCounter::new(),
            loading: false,
            error: None,
            is_completed: false,
            duration: 0.0,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn challenges(&self) -> &ChallengeStore {
        &self.challenges
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn points_counter(&self) -> &PointsCounter {
        &self.counter
    }

    pub fn current_track(&self) -> Option<&Challenge> {
        self.session
            .current_track_id()
            .and_then(|id| self.challenges.get(id))
    }

    pub fn is_playing(&self) -> bool {
        self.session.state().is_playing
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the current track has completed during this play
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    pub fn clear_completion(&mut self) {
        self.is_completed = false;
        self.monitor.reset();
    }

    /// Last known duration of the current track in seconds, 0 while loading
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Progress of the current play in percent, 0 until the engine knows the duration
    pub fn progress(&self) -> f64 {
        Sample::new(self.session.state().current_position, self.duration)
            .percentage()
            .unwrap_or(0.0)
    }

    fn fail(&mut self, err: PlaybackError) -> PlaybackError {
        warn!("{err}");
        self.error = Some(err.to_string());
        err
    }

    /// Start playing `id` from the beginning
    pub fn play(&mut self, id: &ChallengeId) -> Result<(), PlaybackError> {
        let Some(challenge) = self.challenges.get(id) else {
            return Err(self.fail(PlaybackError::UnknownChallenge(id.clone())));
        };
        let track = EngineTrack::from(challenge);
        let points = challenge.points;

        self.loading = true;
        self.error = None;
        self.monitor.reset();
        self.is_completed = false;
        self.duration = 0.0;

        let result = self
            .engine
            .reset()
            .and_then(|_| self.engine.play(&track));
        self.loading = false;

        if let Err(e) = result {
            self.session.set_playing(false);
            return Err(self.fail(e.into()));
        }

        info!("playing {} ({})", track.title, track.id);
        self.session.select_track(id.clone());
        self.session.set_playing(true);
        self.counter.start(points);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), PlaybackError> {
        self.engine_call(|e| e.pause())?;
        self.session.set_playing(false);
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), PlaybackError> {
        if self.session.current_track_id().is_none() {
            return Err(self.fail(PlaybackError::NoTrack));
        }
        self.engine_call(|e| e.resume())?;
        self.session.set_playing(true);
        Ok(())
    }

    /// Jump to `seconds`, clamped to the track once its duration is known
    pub fn seek_to(&mut self, seconds: f64) -> Result<(), PlaybackError> {
        let mut target = seconds.max(0.0);
        if self.duration > 0.0 {
            target = target.min(self.duration);
        }
        self.engine_call(|e| e.seek_to(target))?;
        self.session.set_position(target);
        Ok(())
    }

    /// Jump ahead `step` seconds, never past the end
    pub fn seek_forward(&mut self, step: f64) -> Result<bool, PlaybackError> {
        if self.duration <= 0.0 {
            return Ok(false);
        }
        let target = (self.session.state().current_position + step).min(self.duration);
        self.seek_to(target)?;
        Ok(true)
    }

    /// Jump back `step` seconds. Refused once the track reached 100% so a
    /// finished track stays finished on screen.
    pub fn seek_backward(&mut self, step: f64) -> Result<bool, PlaybackError> {
        if self.duration <= 0.0 || self.progress() >= 100.0 {
            return Ok(false);
        }
        let target = (self.session.state().current_position - step).max(0.0);
        self.seek_to(target)?;
        Ok(true)
    }

    fn engine_call<F>(&mut self, call: F) -> Result<(), PlaybackError>
    where
        F: FnOnce(&mut E) -> Result<(), EngineError>,
    {
        call(&mut self.engine).map_err(|e| self.fail(e.into()))
    }

    /// Stop playback and forget the session
    pub fn stop(&mut self) {
        if let Err(e) = self.engine.reset() {
            error!("engine reset failed: {e}");
        }
        self.session.reset();
        self.monitor.reset();
        self.counter.stop();
        self.is_completed = false;
        self.duration = 0.0;
    }

    /// Read the engine once and feed the monitor.
    ///
    /// Track changes queued by the engine are applied before the sample, since
    /// the sample always belongs to the newest track. Every other event is
    /// handled after it, in the order the engine raised them.
    pub fn poll(&mut self) -> Option<CompletionEvent> {
        let (track_changes, events): (Vec<_>, Vec<_>) = self
            .engine
            .drain_events()
            .into_iter()
            .partition(|e| *e == EngineEvent::TrackChanged);
        for event in track_changes {
            self.handle_engine_event(event);
        }

        let sample = self.engine.progress();
        let playing = self.engine.state() == EngineState::Playing;

        let mut completion = None;
        if self.session.current_track_id().is_some() {
            self.session.set_playing(playing);
            if sample.is_loaded() {
                self.duration = sample.duration;
                self.session.set_position(sample.position);
                self.counter.update(sample);
            }
            let ticked =
                self.monitor
                    .on_tick(sample, &self.session, &mut self.challenges, &mut self.ledger);
            completion = self.record(ticked);
        }

        for event in events {
            if let Some(ev) = self.handle_engine_event(event) {
                completion.get_or_insert(ev);
            }
        }
        completion
    }

    pub fn handle_engine_event(&mut self, event: EngineEvent) -> Option<CompletionEvent> {
        match event {
            EngineEvent::Error { code, message } => {
                self.on_engine_error(code, message);
                None
            }
            EngineEvent::TrackChanged => {
                self.monitor.reset();
                self.is_completed = false;
                None
            }
            EngineEvent::QueueEnded => {
                let completion =
                    self.monitor
                        .on_queue_ended(&self.session, &mut self.challenges, &mut self.ledger);
                self.session.set_playing(false);
                self.record(completion)
            }
        }
    }

    fn on_engine_error(&mut self, code: EngineErrorCode, message: String) {
        self.fail(EngineError::new(code.clone(), message).into());
        self.loading = false;
        self.session.set_playing(false);

        if code.is_recoverable() {
            warn!("recovering from {code} by resetting the engine");
            if let Err(e) = self.engine.reset() {
                error!("engine recovery failed: {e}");
            }
        }
    }

    fn record(&mut self, completion: Option<CompletionEvent>) -> Option<CompletionEvent> {
        if completion.is_some() {
            self.is_completed = true;
            self.counter.stop();
        }
        completion
    }

    /// Complete a challenge by hand. Returns `None` when it was already awarded.
    pub fn complete_challenge(
        &mut self,
        id: &ChallengeId,
    ) -> Result<Option<CompletionEvent>, PlaybackError> {
        let Some(points) = self.challenges.get(id).map(|c| c.points) else {
            return Err(self.fail(PlaybackError::UnknownChallenge(id.clone())));
        };
        if self.ledger.is_completed(id) {
            return Ok(None);
        }
        Ok(Some(complete(
            id.clone(),
            points,
            CompletionTrigger::Manual,
            &mut self.challenges,
            &mut self.ledger,
        )))
    }
}
