//! Parser for FFmpeg's `-progress` output.
//!
//! FFmpeg writes blocks of `key=value` lines, each terminated by
//! `progress=continue` or `progress=end`. One reading is produced per block.

/// A progress reading at the end of one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressReading {
    /// Percent of the duration encoded, 0 to 100.
    pub percent: u8,
    /// Frames per second reported for the block.
    pub fps: f64,
}

/// Accumulates `key=value` lines until a block ends.
#[derive(Debug, Clone)]
pub struct ProgressParser {
    duration_secs: f64,
    fps: f64,
    out_time_secs: Option<f64>,
}

impl ProgressParser {
    /// Creates a parser measuring against `duration_secs`.
    pub fn new(duration_secs: f64) -> Self {
        Self {
            duration_secs,
            fps: 0.0,
            out_time_secs: None,
        }
    }

    /// Feeds one line. Returns a reading when the line closes a block.
    pub fn feed(&mut self, line: &str) -> Option<ProgressReading> {
        let (key, value) = line.trim().split_once('=')?;
        let value = value.trim();

        match key.trim() {
            "fps" => {
                if let Ok(fps) = value.parse::<f64>() {
                    if fps.is_finite() && fps >= 0.0 {
                        self.fps = fps;
                    }
                }
            }
            // Both keys carry microseconds.
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.out_time_secs = Some(us.max(0) as f64 / 1_000_000.0);
                }
            }
            "out_time" => {
                if let Some(secs) = parse_timestamp(value) {
                    self.out_time_secs = Some(secs);
                }
            }
            "progress" => {
                let percent = if value == "end" {
                    100
                } else {
                    self.percent()
                };
                return Some(ProgressReading {
                    percent,
                    fps: self.fps,
                });
            }
            _ => {}
        }
        None
    }

    fn percent(&self) -> u8 {
        match self.out_time_secs {
            Some(t) if self.duration_secs > 0.0 => {
                let pct = (t / self.duration_secs * 100.0).floor();
                if pct.is_finite() {
                    pct.clamp(0.0, 100.0) as u8
                } else {
                    0
                }
            }
            _ => 0,
        }
    }
}

/// Parses `HH:MM:SS.ffffff` into seconds.
fn parse_timestamp(value: &str) -> Option<f64> {
    let mut parts = value.split(':');
    let h: f64 = parts.next()?.parse().ok()?;
    let m: f64 = parts.next()?.parse().ok()?;
    let s: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(h * 3600.0 + m * 60.0 + s)
}
