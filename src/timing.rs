//! Per-batch phase timings.

use std::time::Duration;

use web_time::Instant;

/// Timestamps taken at the phase boundaries of one batch.
#[derive(Debug, Clone, Copy)]
pub struct PhaseTimings {
    pub start: Instant,
    pub post_preparation: Instant,
    pub post_texture_creation: Instant,
    pub finish: Instant,
}

impl PhaseTimings {
    /// All marks set to now.
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            post_preparation: now,
            post_texture_creation: now,
            finish: now,
        }
    }

    pub fn mark_preparation(&mut self) {
        self.post_preparation = Instant::now();
    }

    pub fn mark_texture_creation(&mut self) {
        self.post_texture_creation = Instant::now();
    }

    pub fn mark_finish(&mut self) {
        self.finish = Instant::now();
    }

    pub fn preparation(&self) -> Duration {
        self.post_preparation.duration_since(self.start)
    }

    pub fn texture_creation(&self) -> Duration {
        self.post_texture_creation
            .duration_since(self.post_preparation)
    }

    pub fn sprite_frames(&self) -> Duration {
        self.finish.duration_since(self.post_texture_creation)
    }

    pub fn total(&self) -> Duration {
        self.finish.duration_since(self.start)
    }

    /// Estimate lines, one per phase plus the total.
    pub fn report(&self) -> Vec<String> {
        vec![
            format!("-- Preparation: {:?}", self.preparation()),
            format!("-- Image load + texture creation: {:?}", self.texture_creation()),
            format!("-- Creating sprite frames: {:?}", self.sprite_frames()),
            format!("- Total: {:?}", self.total()),
        ]
    }
}

impl Default for PhaseTimings {
    fn default() -> Self {
        Self::start()
    }
}
