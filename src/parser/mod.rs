pub mod render;
pub mod segment;

use crate::db::Capture;
use segment::{ConfigError, Section, SegmentConfig};

/// Segment the flat page text of one capture into titled sections.
pub fn process_capture(
    capture: &Capture,
    config: &SegmentConfig,
) -> Result<Vec<Section>, ConfigError> {
    segment::segment(capture.text.lines(), config)
}
