//! Time and duration conversion utilities.
//!
//! Cue times are plain `f64` seconds, while timers and clocks work with
//! [`Duration`]. The helpers here convert between the two with explicit
//! saturation instead of panicking on negative or non-finite input.

use std::fmt::Write;
use std::time::Duration;

const SECS_PER_HOUR: u64 = 3600;
const SECS_PER_MINUTE: u64 = 60;

/// Convert seconds to a [`Duration`].
///
/// Negative and `NaN` inputs map to [`Duration::ZERO`]; values too large to
/// represent (including `+inf`) saturate at [`Duration::MAX`].
#[must_use]
pub fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// Format seconds as `MM:SS.cc`, or `H:MM:SS.cc` from one hour onwards.
///
/// Negative and non-finite values render as `00:00.00`.
#[must_use]
pub fn format_timestamp(secs: f64) -> String {
    let total_cs = to_centiseconds(secs);
    let cs = total_cs % 100;
    let total_secs = total_cs / 100;
    let hours = total_secs / SECS_PER_HOUR;
    let minutes = (total_secs % SECS_PER_HOUR) / SECS_PER_MINUTE;
    let seconds = total_secs % SECS_PER_MINUTE;

    let mut out = String::with_capacity(12);
    if hours > 0 {
        let _ = write!(out, "{hours}:{minutes:02}:{seconds:02}.{cs:02}");
    } else {
        let _ = write!(out, "{minutes:02}:{seconds:02}.{cs:02}");
    }
    out
}

// `as` saturates for out-of-range floats, and u64 centiseconds cover far more
// than any track length.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_centiseconds(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        (secs * 100.0).round() as u64
    } else {
        0
    }
}
