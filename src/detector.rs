//! Scale Detector
//!
//! Composes the histogram, correlator, chord segmenter and key-change detector
//! into one analysis call over a time range of a decoded file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::chords::chord_progression;
use crate::event::{events_between, MidiEvent, MidiFile};
use crate::histogram::{weighted_histogram, HistogramWeighting, PitchClassHistogram};
use crate::key_changes::{detect_key_changes, KeyChange, KEY_CHANGE_MIN_SPAN_SECONDS};
use crate::key_profile::{alternative_scales, best_scale};
use crate::scale::Scale;

/// Default confidence a key needs before it is reported as an alternative or
/// a key change.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.6;

/// Errors when configuring a detector
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// An option was outside its valid range.
    #[error("invalid argument `{arg}`: {msg}")]
    InvalidArgument {
        /// The name of the invalid option.
        arg: &'static str,
        /// A description of what was wrong with it.
        msg: String,
    },
}

/// Detector options in a form a calling layer can store alongside its own
/// configuration.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Threshold for alternatives and key changes, in `[0, 1]`.
    pub min_confidence: f64,
    /// Weight notes by their length.
    pub weight_by_duration: bool,
    /// Weight notes by their velocity.
    pub weight_by_velocity: bool,
    /// Run the key-change detector on long enough ranges.
    pub detect_key_changes: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            weight_by_duration: true,
            weight_by_velocity: true,
            detect_key_changes: true,
        }
    }
}

impl DetectorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::InvalidArgument {
                arg: "min_confidence",
                msg: format!("must be within 0.0..=1.0, got {}", self.min_confidence),
            });
        }
        Ok(())
    }

    fn weighting(&self) -> HistogramWeighting {
        HistogramWeighting {
            by_duration: self.weight_by_duration,
            by_velocity: self.weight_by_velocity,
        }
    }
}

/// Result of analysing a time range of a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmonicAnalysis {
    /// Best-matching key, refined against the scale catalog.
    pub primary_scale: Scale,
    /// Up to three other major/minor keys, best first.
    pub alternative_scales: Vec<Scale>,
    /// Normalized pitch-class histogram of the range.
    pub pitch_class_weights: PitchClassHistogram,
    /// Chord-root labels over the whole file, consecutive repeats removed.
    pub chord_progression: Vec<String>,
    /// Key changes over the whole file.
    pub key_changes: Vec<KeyChange>,
    /// Number of note-on events in the range.
    pub total_notes: u32,
    /// Mean MIDI note number of those note-ons, 0 if there are none.
    pub average_pitch: f64,
    /// Note-on count per MIDI note number.
    pub note_distribution: BTreeMap<u8, u32>,
}

impl HarmonicAnalysis {
    /// The analysis of a range with no notes in it.
    pub fn empty() -> Self {
        HarmonicAnalysis {
            primary_scale: Scale::unknown(),
            alternative_scales: Vec::new(),
            pitch_class_weights: [0.0; 12],
            chord_progression: Vec::new(),
            key_changes: Vec::new(),
            total_notes: 0,
            average_pitch: 0.0,
            note_distribution: BTreeMap::new(),
        }
    }
}

impl Default for HarmonicAnalysis {
    fn default() -> Self {
        Self::empty()
    }
}

/// Builder for `ScaleDetector`
pub struct ScaleDetectorBuilder {
    config: DetectorConfig,
}

impl ScaleDetectorBuilder {
    /// Create a new builder with default options
    pub fn new() -> Self {
        ScaleDetectorBuilder {
            config: DetectorConfig::default(),
        }
    }

    /// Set the confidence threshold (0.0..=1.0)
    pub fn min_confidence(mut self, value: f64) -> Self {
        self.config.min_confidence = value;
        self
    }

    /// Enable or disable duration weighting
    pub fn weight_by_duration(mut self, enabled: bool) -> Self {
        self.config.weight_by_duration = enabled;
        self
    }

    /// Enable or disable velocity weighting
    pub fn weight_by_velocity(mut self, enabled: bool) -> Self {
        self.config.weight_by_velocity = enabled;
        self
    }

    /// Enable or disable key-change detection
    pub fn detect_key_changes(mut self, enabled: bool) -> Self {
        self.config.detect_key_changes = enabled;
        self
    }

    /// Build the `ScaleDetector`
    ///
    /// Returns `Err(ConfigError::InvalidArgument)` if `min_confidence` is out
    /// of range.
    pub fn build(self) -> Result<ScaleDetector, ConfigError> {
        ScaleDetector::from_config(self.config)
    }
}

impl Default for ScaleDetectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Key, scale and chord analysis over decoded MIDI files.
///
/// Holds only configuration, so one detector can be shared by reference
/// across threads analysing different files.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleDetector {
    config: DetectorConfig,
}

impl ScaleDetector {
    /// Return a builder to customize detection options
    pub fn builder() -> ScaleDetectorBuilder {
        ScaleDetectorBuilder::new()
    }

    /// Create a detector with default options
    pub fn new() -> Self {
        ScaleDetector {
            config: DetectorConfig::default(),
        }
    }

    /// Create a detector from stored options, validating them first.
    pub fn from_config(config: DetectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(ScaleDetector { config })
    }

    /// The options in effect.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Analyse the whole file.
    pub fn analyze(&self, file: &MidiFile) -> HarmonicAnalysis {
        self.analyze_range(file, 0.0, file.duration())
    }

    /// Analyse the note events with timestamps in `[start, end]`.
    ///
    /// The key, alternatives and note statistics cover only the range. Chords
    /// always cover the whole file, as do key changes, which run only when
    /// enabled and the range is longer than
    /// [`KEY_CHANGE_MIN_SPAN_SECONDS`](crate::key_changes::KEY_CHANGE_MIN_SPAN_SECONDS).
    pub fn analyze_range(&self, file: &MidiFile, start: f64, end: f64) -> HarmonicAnalysis {
        let all_events = file.note_events();
        let events = events_between(&all_events, start, end);
        if events.is_empty() {
            debug!(start, end, "no notes in range");
            return HarmonicAnalysis::empty();
        }

        let weighting = self.config.weighting();
        let pitch_class_weights = weighted_histogram(events, weighting);
        let primary_scale = best_scale(&pitch_class_weights);
        let alternative_scales =
            alternative_scales(&pitch_class_weights, &primary_scale, self.config.min_confidence);

        let duration = file.duration();
        let chord_progression = chord_progression(&all_events, duration, &primary_scale);

        let key_changes = if self.config.detect_key_changes && end - start > KEY_CHANGE_MIN_SPAN_SECONDS {
            detect_key_changes(duration, self.config.min_confidence, |s, e| {
                self.window_key(&all_events, s, e)
            })
        } else {
            Vec::new()
        };

        let mut total_notes = 0u32;
        let mut pitch_sum = 0u64;
        let mut note_distribution = BTreeMap::new();
        for (note, _) in events.iter().filter_map(|e| e.note_on()) {
            total_notes += 1;
            pitch_sum += u64::from(note);
            *note_distribution.entry(note).or_insert(0u32) += 1;
        }
        let average_pitch = if total_notes > 0 {
            pitch_sum as f64 / f64::from(total_notes)
        } else {
            0.0
        };

        debug!(
            start,
            end,
            key = %primary_scale,
            confidence = primary_scale.confidence,
            total_notes,
            chords = chord_progression.len(),
            key_changes = key_changes.len(),
            "analysed range"
        );

        HarmonicAnalysis {
            primary_scale,
            alternative_scales,
            pitch_class_weights,
            chord_progression,
            key_changes,
            total_notes,
            average_pitch,
            note_distribution,
        }
    }

    /// Primary scale of one key-change window over the file's sorted note events.
    fn window_key(&self, all_events: &[&MidiEvent], start: f64, end: f64) -> Scale {
        let events = events_between(all_events, start, end);
        if events.is_empty() {
            return Scale::unknown();
        }
        best_scale(&weighted_histogram(events, self.config.weighting()))
    }
}

impl Default for ScaleDetector {
    fn default() -> Self {
        Self::new()
    }
}
