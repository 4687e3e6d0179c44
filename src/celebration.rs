use rand::seq::SliceRandom;

use crate::monitor::CompletionEvent;

const ENCOURAGING_WORDS: [&str; 6] = [
    "AWESOME!",
    "AMAZING!",
    "EXCELLENT!",
    "FLAWLESS!",
    "SUPERB!",
    "BRILLIANT!",
];

/// What to show when a song completes
#[derive(Debug, Clone, PartialEq)]
pub struct Celebration {
    pub headline: &'static str,
    pub word: &'static str,
    pub track_title: String,
    pub track_artist: String,
    /// Points earned by this completion, 0 on a replay
    pub points: u32,
}

impl Celebration {
    pub fn new(event: &CompletionEvent, title: &str, artist: &str) -> Self {
        let mut rng = rand::thread_rng();
        let word = ENCOURAGING_WORDS
            .choose(&mut rng)
            .copied()
            .unwrap_or("AWESOME!");

        Self {
            headline: "SONG COMPLETE!",
            word,
            track_title: title.to_string(),
            track_artist: artist.to_string(),
            points: event.points_awarded,
        }
    }

    /// Plain-text rendering, one line per element
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("🎉 {}", self.headline),
            format!("{} - {}", self.track_title, self.track_artist),
        ];
        if self.points > 0 {
            lines.push(format!("+{} POINTS EARNED", self.points));
        } else {
            lines.push("Already completed, no new points".to_string());
        }
        lines.push(self.word.to_string());
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::CompletionTrigger;
    use chrono::Utc;

    fn event(points: u32) -> CompletionEvent {
        CompletionEvent {
            challenge_id: "a".into(),
            trigger: CompletionTrigger::Progress,
            points_awarded: points,
            first_completion: points > 0,
            at: Utc::now(),
        }
    }

    #[test]
    fn celebration_shows_points() {
        let c = Celebration::new(&event(50), "Neon Nights", "Synthwave Collective");
        let lines = c.lines();
        assert_eq!(lines[0], "🎉 SONG COMPLETE!");
        assert_eq!(lines[1], "Neon Nights - Synthwave Collective");
        assert_eq!(lines[2], "+50 POINTS EARNED");
    }

    #[test]
    fn replay_celebration_mentions_no_points() {
        let c = Celebration::new(&event(0), "T", "A");
        assert!(c.lines().iter().any(|l| l.contains("no new points")));
    }

    #[test]
    fn encouraging_word_comes_from_the_list() {
        for _ in 0..10 {
            let c = Celebration::new(&event(1), "T", "A");
            assert!(ENCOURAGING_WORDS.contains(&c.word));
        }
    }
}
