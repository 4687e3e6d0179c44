//! Seam to the audio playback engine.
//!
//! The real engine (decoding, output, background service) lives outside this
//! crate. `AudioEngine` is the contract the player relies on; the
//! `SimulatedEngine` drives playback from a virtual clock for the CLI and
//! tests.

use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

use crate::challenge::{Challenge, ChallengeId};

/// One position/duration reading from the engine
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    pub position: f64,
    pub duration: f64,
}

impl Sample {
    pub fn new(position: f64, duration: f64) -> Self {
        Self { position, duration }
    }

    /// A sample is usable once the engine knows the duration
    pub fn is_loaded(&self) -> bool {
        self.duration.is_finite()
            && self.duration > 0.0
            && self.position.is_finite()
            && self.position >= 0.0
    }

    pub fn percentage(&self) -> Option<f64> {
        if !self.is_loaded() {
            return None;
        }
        Some((self.position / self.duration * 100.0).min(100.0))
    }

    pub fn time_remaining(&self) -> f64 {
        self.duration - self.position
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineErrorCode {
    PlaybackSource,
    PlaybackQueue,
    Other(String),
}

impl fmt::Display for EngineErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlaybackSource => f.write_str("playback-source"),
            Self::PlaybackQueue => f.write_str("playback-queue"),
            Self::Other(code) => f.write_str(code),
        }
    }
}

impl EngineErrorCode {
    pub fn parse(code: &str) -> Self {
        match code {
            "playback-source" => Self::PlaybackSource,
            "playback-queue" => Self::PlaybackQueue,
            other => Self::Other(other.to_string()),
        }
    }

    /// Codes after which the engine is reset so the next play starts clean
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::PlaybackSource | Self::PlaybackQueue)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EngineError {
    pub code: EngineErrorCode,
    pub message: String,
}

impl EngineError {
    pub fn new(code: EngineErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Error { code: EngineErrorCode, message: String },
    TrackChanged,
    QueueEnded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    Idle,
    Playing,
    Paused,
    Ended,
}

/// What the engine needs to load a track
#[derive(Debug, Clone, PartialEq)]
pub struct EngineTrack {
    pub id: ChallengeId,
    pub url: String,
    pub title: String,
    pub artist: String,
    pub duration: Option<f64>,
}

impl From<&Challenge> for EngineTrack {
    fn from(c: &Challenge) -> Self {
        Self {
            id: c.id.clone(),
            url: c.audio_url.clone(),
            title: c.title.clone(),
            artist: c.artist.clone(),
            duration: Some(c.duration),
        }
    }
}

pub trait AudioEngine {
    /// Load `track` as the only queue entry and start playing it
    fn play(&mut self, track: &EngineTrack) -> Result<(), EngineError>;
    fn pause(&mut self) -> Result<(), EngineError>;
    fn resume(&mut self) -> Result<(), EngineError>;
    fn seek_to(&mut self, seconds: f64) -> Result<(), EngineError>;
    /// Stop playback and clear the queue
    fn reset(&mut self) -> Result<(), EngineError>;
    fn progress(&self) -> Sample;
    fn state(&self) -> EngineState;
    /// Discrete events raised since the last call, oldest first
    fn drain_events(&mut self) -> Vec<EngineEvent>;
}

/// Which engine call a scripted failure applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineCall {
    Play,
    Pause,
    Resume,
    Seek,
    Reset,
}

/// Deterministic engine driven by `advance`.
///
/// Playing a track reports a duration of zero until the first `advance`, the
/// way real engines do while a source is loading.
#[derive(Debug, Default)]
pub struct SimulatedEngine {
    track: Option<EngineTrack>,
    position: f64,
    duration: f64,
    loaded: bool,
    state: EngineState,
    events: VecDeque<EngineEvent>,
    failures: Vec<(EngineCall, EngineError)>,
    stall_before_end: Option<f64>,
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop advancing `secs` before the end of the track, like engines that
    /// never report the exact final position.
    pub fn with_stall(mut self, secs: f64) -> Self {
        self.stall_before_end = Some(secs.max(0.0));
        self
    }

    /// Make the next call of kind `call` fail with `error`
    pub fn fail_next(&mut self, call: EngineCall, error: EngineError) {
        self.failures.push((call, error));
    }

    /// Queue an engine-originated event, e.g. a decoder error mid-track
    pub fn raise(&mut self, event: EngineEvent) {
        self.events.push_back(event);
    }

    pub fn current_track(&self) -> Option<&EngineTrack> {
        self.track.as_ref()
    }

    fn take_failure(&mut self, call: EngineCall) -> Result<(), EngineError> {
        match self.failures.iter().position(|(c, _)| *c == call) {
            Some(i) => Err(self.failures.remove(i).1),
            None => Ok(()),
        }
    }

    /// Move the virtual clock forward by `secs` of playback
    pub fn advance(&mut self, secs: f64) {
        if self.track.is_none() {
            return;
        }
        if !self.loaded {
            self.loaded = true;
            return;
        }
        if self.state != EngineState::Playing || !secs.is_finite() || secs <= 0.0 {
            return;
        }
        let limit = match self.stall_before_end {
            Some(stall) => (self.duration - stall).max(0.0),
            None => self.duration,
        };
        self.position = (self.position + secs).min(limit);
        if self.stall_before_end.is_none() && self.position >= self.duration {
            self.state = EngineState::Ended;
            self.events.push_back(EngineEvent::QueueEnded);
        }
    }

    /// End the queue from wherever playback is, as a stalled engine would
    pub fn end_queue(&mut self) {
        if self.track.is_some() {
            self.state = EngineState::Ended;
            self.events.push_back(EngineEvent::QueueEnded);
        }
    }
}

impl AudioEngine for SimulatedEngine {
    fn play(&mut self, track: &EngineTrack) -> Result<(), EngineError> {
        self.take_failure(EngineCall::Play)?;
        if track.url.is_empty() {
            return Err(EngineError::new(
                EngineErrorCode::PlaybackSource,
                format!("no audio source for {}", track.id),
            ));
        }
        self.duration = track.duration.unwrap_or(0.0).max(0.0);
        self.position = 0.0;
        self.loaded = false;
        self.track = Some(track.clone());
        self.state = EngineState::Playing;
        self.events.push_back(EngineEvent::TrackChanged);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), EngineError> {
        self.take_failure(EngineCall::Pause)?;
        if self.state == EngineState::Playing {
            self.state = EngineState::Paused;
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<(), EngineError> {
        self.take_failure(EngineCall::Resume)?;
        if self.state == EngineState::Paused {
            self.state = EngineState::Playing;
        }
        Ok(())
    }

    fn seek_to(&mut self, seconds: f64) -> Result<(), EngineError> {
        self.take_failure(EngineCall::Seek)?;
        if self.track.is_none() {
            return Err(EngineError::new(
                EngineErrorCode::PlaybackQueue,
                "nothing loaded",
            ));
        }
        self.position = seconds.clamp(0.0, self.duration);
        if self.state == EngineState::Ended && self.position < self.duration {
            self.state = EngineState::Paused;
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<(), EngineError> {
        self.take_failure(EngineCall::Reset)?;
        self.track = None;
        self.position = 0.0;
        self.duration = 0.0;
        self.loaded = false;
        self.state = EngineState::Idle;
        self.events.clear();
        Ok(())
    }

    fn progress(&self) -> Sample {
        if self.loaded {
            Sample::new(self.position, self.duration)
        } else {
            Sample::default()
        }
    }

    fn state(&self) -> EngineState {
        self.state
    }

    fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.events.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::Difficulty;
    use assert_matches::assert_matches;

    fn track(duration: f64) -> EngineTrack {
        let mut c = Challenge::new("t", "Track", Difficulty::Easy, duration, 10);
        c.audio_url = "asset://t.mp3".into();
        EngineTrack::from(&c)
    }

    #[test]
    fn sample_percentage_caps_at_100() {
        assert_eq!(Sample::new(90.0, 180.0).percentage(), Some(50.0));
        assert_eq!(Sample::new(200.0, 180.0).percentage(), Some(100.0));
        assert_eq!(Sample::new(10.0, 0.0).percentage(), None);
        assert_eq!(Sample::new(f64::NAN, 10.0).percentage(), None);
    }

    #[test]
    fn duration_is_unknown_until_loaded() {
        let mut e = SimulatedEngine::new();
        e.play(&track(60.0)).unwrap();
        assert_eq!(e.progress().duration, 0.0);
        e.advance(1.0);
        assert_eq!(e.progress(), Sample::new(0.0, 60.0));
        e.advance(1.5);
        assert_eq!(e.progress(), Sample::new(1.5, 60.0));
    }

    #[test]
    fn reaching_the_end_raises_queue_ended() {
        let mut e = SimulatedEngine::new();
        e.play(&track(10.0)).unwrap();
        e.advance(0.0);
        e.advance(25.0);
        assert_eq!(e.state(), EngineState::Ended);
        assert_eq!(e.progress().position, 10.0);
        assert_eq!(
            e.drain_events(),
            vec![EngineEvent::TrackChanged, EngineEvent::QueueEnded]
        );
        assert!(e.drain_events().is_empty());
    }

    #[test]
    fn stalled_engine_stops_short_of_the_end() {
        let mut e = SimulatedEngine::new().with_stall(0.3);
        e.play(&track(10.0)).unwrap();
        e.advance(0.0);
        e.advance(50.0);
        assert!((e.progress().position - 9.7).abs() < 1e-9);
        assert_eq!(e.state(), EngineState::Playing);
    }

    #[test]
    fn paused_engine_does_not_advance() {
        let mut e = SimulatedEngine::new();
        e.play(&track(10.0)).unwrap();
        e.advance(0.0);
        e.pause().unwrap();
        e.advance(5.0);
        assert_eq!(e.progress().position, 0.0);
        e.resume().unwrap();
        e.advance(5.0);
        assert_eq!(e.progress().position, 5.0);
    }

    #[test]
    fn scripted_failures_fire_once() {
        let mut e = SimulatedEngine::new();
        e.fail_next(
            EngineCall::Play,
            EngineError::new(EngineErrorCode::Other("boom".into()), "nope"),
        );
        assert_matches!(e.play(&track(5.0)), Err(EngineError { .. }));
        assert!(e.play(&track(5.0)).is_ok());
    }

    #[test]
    fn missing_source_is_a_source_error() {
        let mut e = SimulatedEngine::new();
        let mut t = track(5.0);
        t.url.clear();
        let err = e.play(&t).unwrap_err();
        assert_eq!(err.code, EngineErrorCode::PlaybackSource);
        assert!(err.code.is_recoverable());
    }

    #[test]
    fn error_codes_parse_and_display() {
        assert_eq!(
            EngineErrorCode::parse("playback-queue"),
            EngineErrorCode::PlaybackQueue
        );
        assert_eq!(EngineErrorCode::PlaybackSource.to_string(), "playback-source");
        assert_eq!(EngineErrorCode::Other("x".into()).to_string(), "x");
        assert!(!EngineErrorCode::Other("x".into()).is_recoverable());
    }
}
