//! Media analysis, bitrate math and input selection.

pub mod bitrate;
pub mod probe;
pub mod scan;

pub use bitrate::{compute_bitrate_kbps, effective_duration, FALLBACK_DURATION_SECS};
