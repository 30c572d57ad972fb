//! Pitch-Class Histogram
//!
//! Folds a time-ordered note-event list into a normalized 12-bin
//! distribution, weighting each note by how long and how hard it was played.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::event::MidiEvent;

const SEMITONES: usize = 12;

/// Energy per pitch class, C = bin 0.
pub type PitchClassHistogram = [f64; SEMITONES];

/// Which factors scale each note's contribution.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramWeighting {
    /// Multiply by the note's length in seconds.
    pub by_duration: bool,
    /// Multiply by `velocity / 127`.
    pub by_velocity: bool,
}

impl Default for HistogramWeighting {
    fn default() -> Self {
        HistogramWeighting {
            by_duration: true,
            by_velocity: true,
        }
    }
}

/// Build a normalized pitch-class histogram from time-ordered note events.
///
/// A note-on stays pending until a note-off for the same note number arrives;
/// a second note-on for a pending note replaces the first. Notes still pending
/// at the end have no known length and contribute their velocity weight only.
pub fn weighted_histogram(events: &[&MidiEvent], weighting: HistogramWeighting) -> PitchClassHistogram {
    let mut histogram = [0.0; SEMITONES];
    let mut active: BTreeMap<u8, (f64, u8)> = BTreeMap::new();

    for event in events {
        if let Some((note, velocity)) = event.note_on() {
            active.insert(note, (event.time_seconds, velocity));
        } else if let Some(note) = event.note_off() {
            if let Some((started, velocity)) = active.remove(&note) {
                let mut weight = 1.0;
                if weighting.by_duration {
                    weight *= event.time_seconds - started;
                }
                if weighting.by_velocity {
                    weight *= f64::from(velocity) / 127.0;
                }
                histogram[usize::from(note) % SEMITONES] += weight;
            }
        }
    }

    for (note, (_, velocity)) in active {
        let mut weight = 1.0;
        if weighting.by_velocity {
            weight *= f64::from(velocity) / 127.0;
        }
        histogram[usize::from(note) % SEMITONES] += weight;
    }

    normalize(&mut histogram);
    histogram
}

/// Scale bins to sum to 1. An all-zero histogram is left untouched.
pub fn normalize(histogram: &mut PitchClassHistogram) {
    let sum: f64 = histogram.iter().sum();
    if sum > 0.0 {
        for bin in histogram.iter_mut() {
            *bin /= sum;
        }
    }
}
