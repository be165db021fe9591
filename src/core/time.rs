//! Tick and Time Helpers
//!
//! Timer durations are kept as whole ticks and only converted to seconds at
//! the edges, so `time == ticks * TICK_INTERVAL` holds exactly.

use crate::{MAX_TRACK, TICK_INTERVAL};

/// Convert a tick count to seconds.
///
/// `TICK_INTERVAL` is a power of two, so the product is exact for any tick
/// count below 2^24 (over 72 hours at 64 Hz).
#[inline]
pub fn ticks_to_seconds(ticks: u32) -> f32 {
    ticks as f32 * TICK_INTERVAL
}

/// Format seconds as `mm:ss.t`, or `mm:ss.mmm` when `precise`.
///
/// Durations of an hour or more get an `h:` prefix.
pub fn format_time(seconds: f32, precise: bool) -> String {
    let negative = seconds < 0.0;
    let total_ms = (seconds.abs() as f64 * 1000.0).round() as u64;

    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let secs = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;

    let fraction = if precise {
        format!("{:03}", millis)
    } else {
        format!("{}", millis / 100)
    };

    let formatted = if hours > 0 {
        format!("{}:{:02}:{:02}.{}", hours, minutes, secs, fraction)
    } else {
        format!("{:02}:{:02}.{}", minutes, secs, fraction)
    };

    if negative {
        format!("-{}", formatted)
    } else {
        formatted
    }
}

/// Human-readable track name: `Main` for track 0, `Bonus N` otherwise.
pub fn track_name(track: u32) -> Option<String> {
    match track {
        0 => Some("Main".to_string()),
        t if (t as usize) < MAX_TRACK => Some(format!("Bonus {}", t)),
        _ => None,
    }
}
