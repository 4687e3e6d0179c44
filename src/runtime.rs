use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

/// Playback control entered while a track is playing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Pause,
    Resume,
    SeekForward,
    SeekBackward,
    Quit,
}

impl Command {
    /// Single-letter commands: p, r, f, b, q. Anything else is ignored.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "p" | "pause" => Some(Command::Pause),
            "r" | "resume" => Some(Command::Resume),
            "f" | "forward" => Some(Command::SeekForward),
            "b" | "back" => Some(Command::SeekBackward),
            "q" | "quit" => Some(Command::Quit),
            _ => None,
        }
    }
}

/// Unified event type consumed by the playback loop
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayerEvent {
    Command(Command),
    Tick,
}

pub trait PlayerEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<PlayerEvent, RecvTimeoutError>;
}

/// Reads commands line by line from stdin on a background thread
pub struct StdinEventSource {
    rx: Receiver<PlayerEvent>,
}

impl StdinEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if let Some(cmd) = Command::parse(&line) {
                    if tx.send(PlayerEvent::Command(cmd)).is_err() {
                        break;
                    }
                }
            }
        });

        Self { rx }
    }
}

impl Default for StdinEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerEventSource for StdinEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<PlayerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Channel-fed event source for tests
pub struct TestEventSource {
    rx: Receiver<PlayerEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<PlayerEvent>) -> Self {
        Self { rx }
    }
}

impl PlayerEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<PlayerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Advances playback one command or tick at a time
pub struct Runner<E: PlayerEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: PlayerEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    pub fn interval(&self) -> Duration {
        self.ticker.interval()
    }

    /// Blocks up to the tick interval and returns the next event, or Tick on timeout.
    /// A closed source (stdin at EOF) keeps ticking at the same pace so playback
    /// runs to the end.
    pub fn step(&self) -> PlayerEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => PlayerEvent::Tick,
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(self.ticker.interval());
                PlayerEvent::Tick
            }
        }
    }
}
