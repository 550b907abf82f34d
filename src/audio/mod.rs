pub mod compositor;

pub use compositor::Compositor;

use std::path::PathBuf;
use std::time::Duration;

/// A synthesized clip positioned on the output timeline.
///
/// The clip file belongs to the compositor once scheduling finishes; it is
/// deleted after a successful merge.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    pub path: PathBuf,
    pub start: Duration,
    pub end: Duration,
}

impl AudioSegment {
    pub fn window(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }
}
