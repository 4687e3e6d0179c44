use crate::engine::Sample;

/// Live "points earned so far" readout for the playing challenge.
///
/// Purely cosmetic: the ledger only changes on completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointsCounter {
    total_points: Option<u32>,
    earned: u32,
    progress: f64,
}

impl PointsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, total_points: u32) {
        self.total_points = Some(total_points);
        self.earned = 0;
        self.progress = 0.0;
    }

    pub fn stop(&mut self) {
        self.total_points = None;
    }

    pub fn reset(&mut self) {
        self.earned = 0;
        self.progress = 0.0;
    }

    pub fn is_active(&self) -> bool {
        self.total_points.is_some()
    }

    pub fn earned(&self) -> u32 {
        self.earned
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Earned points follow progress but never go back down while active
    pub fn update(&mut self, sample: Sample) -> u32 {
        let (Some(total), Some(percentage)) = (self.total_points, sample.percentage()) else {
            return self.earned;
        };
        self.progress = percentage;
        let earned = (percentage / 100.0 * total as f64).floor() as u32;
        if earned > self.earned {
            self.earned = earned;
        }
        self.earned
    }
}
