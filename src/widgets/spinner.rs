//! Activity indicator

use std::time::Duration;

const LINE_FRAMES: [&str; 4] = ["|", "/", "-", "\\"];
const FRAMES_PER_SECOND: u64 = 10;

/// Self-ticking line spinner. Each tick advances one frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Spinner {
    frame: usize,
}

impl Spinner {
    pub fn new() -> Self {
        Self::default()
    }

    /// How often the driver should deliver ticks
    pub fn interval() -> Duration {
        Duration::from_millis(1000 / FRAMES_PER_SECOND)
    }

    pub fn tick(&mut self) {
        self.frame = (self.frame + 1) % LINE_FRAMES.len();
    }

    pub fn view(&self) -> &'static str {
        LINE_FRAMES[self.frame]
    }
}
