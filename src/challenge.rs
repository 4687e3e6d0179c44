use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a challenge in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChallengeId(String);

impl ChallengeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChallengeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ChallengeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// A playable track with its reward and the listener's progress on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: Difficulty,
    /// Expected track length in seconds
    pub duration: f64,
    pub points: u32,
    #[serde(default)]
    pub audio_url: String,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Challenge {
    pub fn new(
        id: impl Into<ChallengeId>,
        title: impl Into<String>,
        difficulty: Difficulty,
        duration: f64,
        points: u32,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: String::new(),
            description: String::new(),
            difficulty,
            duration,
            points,
            audio_url: String::new(),
            progress: 0.0,
            completed: false,
            completed_at: None,
        }
    }
}

/// Persisted slice of a challenge: everything the catalog does not own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub id: ChallengeId,
    pub progress: f64,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Challenge> for ProgressRecord {
    fn from(c: &Challenge) -> Self {
        Self {
            id: c.id.clone(),
            progress: c.progress,
            completed: c.completed,
            completed_at: c.completed_at,
        }
    }
}
