use thiserror::Error;

use crate::challenge::ChallengeId;
use crate::engine::EngineError;

/// Failures surfaced by the player. None of these are fatal: they become the
/// player's error message and playback carries on for other tracks.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    #[error("Playback error: {0}")]
    Engine(#[from] EngineError),
    #[error("challenge not found: {0}")]
    UnknownChallenge(ChallengeId),
    #[error("no track selected")]
    NoTrack,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("catalog file not found: {0}")]
    MissingCatalog(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineErrorCode;

    #[test]
    fn engine_failures_read_as_playback_errors() {
        let err: PlaybackError =
            EngineError::new(EngineErrorCode::PlaybackSource, "file missing").into();
        assert_eq!(err.to_string(), "Playback error: file missing");
    }

    #[test]
    fn unknown_challenge_names_the_id() {
        let err = PlaybackError::UnknownChallenge(ChallengeId::new("nope"));
        assert_eq!(err.to_string(), "challenge not found: nope");
    }
}
