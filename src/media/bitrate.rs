//! Target video bitrate calculation.

use crate::config::model::CompressionMode;

/// Duration assumed when the probe cannot report one.
pub const FALLBACK_DURATION_SECS: f64 = 60.0;

/// Returns a usable duration, substituting [`FALLBACK_DURATION_SECS`] for
/// missing, zero, negative or non-finite values.
pub fn effective_duration(probed: Option<f64>) -> f64 {
    match probed {
        Some(d) if d.is_finite() && d > 0.0 => d,
        _ => FALLBACK_DURATION_SECS,
    }
}

/// Computes the video bitrate in kbps for one file.
///
/// Target-size mode spends `size_mb * 1000 * 8` kilobits over the duration
/// after reserving the audio track's share. The result is floored and may be
/// zero or negative for small targets; it is passed to the encoder as is.
pub fn compute_bitrate_kbps(
    mode: &CompressionMode,
    duration_secs: f64,
    audio_bitrate_kbps: u32,
) -> i64 {
    match *mode {
        CompressionMode::Bitrate { bitrate_kbps } => i64::from(bitrate_kbps),
        CompressionMode::TargetSize { size_mb } => {
            let duration = effective_duration(Some(duration_secs));
            let total_kbits = size_mb * 1000.0 * 8.0;
            let audio_kbits = f64::from(audio_bitrate_kbps) * duration;
            ((total_kbits - audio_kbits) / duration).floor() as i64
        }
    }
}
