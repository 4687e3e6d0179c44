use itertools::Itertools;

use crate::challenge::{Challenge, Difficulty};
use crate::ledger::Ledger;
use crate::util::mean;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Achievement {
    #[strum(serialize = "FIRST 100 POINTS")]
    FirstHundredPoints,
    #[strum(serialize = "MUSIC LOVER")]
    MusicLover,
    #[strum(serialize = "PERFECT SCORE")]
    PerfectScore,
}

impl Achievement {
    pub fn description(&self) -> &'static str {
        match self {
            Achievement::FirstHundredPoints => "Reached milestone",
            Achievement::MusicLover => "Completed a challenge",
            Achievement::PerfectScore => "100% completion rate",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyBreakdown {
    pub difficulty: Difficulty,
    pub completed: usize,
    pub total: usize,
    pub points_available: u64,
}

/// Everything the profile screen shows, derived from the stores
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSummary {
    pub total_points: u64,
    pub completed: usize,
    pub total_challenges: usize,
    /// Percentage of catalog challenges completed
    pub completion_rate: f64,
    pub average_progress: f64,
    pub by_difficulty: Vec<DifficultyBreakdown>,
    pub achievements: Vec<Achievement>,
}

impl ProfileSummary {
    pub fn compute(challenges: &[Challenge], ledger: &Ledger) -> Self {
        let total_challenges = challenges.len();
        let completed = challenges
            .iter()
            .filter(|c| ledger.is_completed(&c.id))
            .count();
        let completion_rate = if total_challenges > 0 {
            completed as f64 / total_challenges as f64 * 100.0
        } else {
            0.0
        };
        let progresses: Vec<f64> = challenges.iter().map(|c| c.progress).collect();
        let average_progress = mean(&progresses).unwrap_or(0.0);

        let by_difficulty = challenges
            .iter()
            .into_group_map_by(|c| c.difficulty)
            .into_iter()
            .sorted_by_key(|(difficulty, _)| *difficulty)
            .map(|(difficulty, group)| DifficultyBreakdown {
                difficulty,
                completed: group.iter().filter(|c| ledger.is_completed(&c.id)).count(),
                total: group.len(),
                points_available: group.iter().map(|c| c.points as u64).sum(),
            })
            .collect();

        let total_points = ledger.total_points();
        let mut achievements = Vec::new();
        if total_points >= 100 {
            achievements.push(Achievement::FirstHundredPoints);
        }
        if ledger.completed_count() >= 1 {
            achievements.push(Achievement::MusicLover);
        }
        if total_challenges > 0 && completed == total_challenges {
            achievements.push(Achievement::PerfectScore);
        }

        Self {
            total_points,
            completed,
            total_challenges,
            completion_rate,
            average_progress,
            by_difficulty,
            achievements,
        }
    }
}
