//! Key-Change Detector
//!
//! Slides a four-second window across the piece in two-second hops and
//! reports each point where the window's key differs from the previous one.

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::scale::{Scale, ScaleType};

/// Length of one key window.
pub const KEY_WINDOW_SECONDS: f64 = 4.0;

/// Distance between consecutive window starts.
pub const KEY_HOP_SECONDS: f64 = 2.0;

/// Analyses spanning this many seconds or fewer skip key-change detection.
pub const KEY_CHANGE_MIN_SPAN_SECONDS: f64 = 8.0;

/// The key in force from `time_seconds` on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyChange {
    /// Start of the window where the new key was detected.
    pub time_seconds: f64,
    /// The new key.
    pub scale: Scale,
}

/// Walk windows over `[0, duration)` and collect key changes.
///
/// `window_key` returns the primary scale for a `[start, end]` range. A window
/// emits a change when its key differs in root or type from the previous
/// window's, the previous window had a key at all, and the new key's
/// confidence reaches `min_confidence`. The first window never emits.
pub fn detect_key_changes<F>(duration: f64, min_confidence: f64, mut window_key: F) -> Vec<KeyChange>
where
    F: FnMut(f64, f64) -> Scale,
{
    let mut changes = Vec::new();
    if !duration.is_finite() {
        warn!(duration, "skipping key-change detection over a non-finite duration");
        return changes;
    }
    let mut previous: Option<Scale> = None;

    let mut window = 0u64;
    loop {
        let start = window as f64 * KEY_HOP_SECONDS;
        if start >= duration {
            break;
        }
        let end = (start + KEY_WINDOW_SECONDS).min(duration);
        let scale = window_key(start, end);
        trace!(start, end, key = %scale, confidence = scale.confidence, "key window");

        if let Some(prev) = &previous {
            if prev.scale_type != ScaleType::Unknown
                && !prev.same_key(&scale)
                && scale.confidence >= min_confidence
            {
                changes.push(KeyChange {
                    time_seconds: start,
                    scale: scale.clone(),
                });
            }
        }
        previous = Some(scale);
        window += 1;
    }
    changes
}
