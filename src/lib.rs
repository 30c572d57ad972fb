//! # midi_scale_detector
//!
//! Decode Standard MIDI Files and infer their key, scale, chord progression
//! and key changes from weighted pitch-class statistics.
//!
//! ## Example
//! ```rust
//! use midi_scale_detector::{decode, ScaleDetector};
//!
//! fn run(bytes: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
//!     // 1) Decode the file
//!     let file = decode(bytes)?;
//!
//!     // 2) Build a detector
//!     let detector = ScaleDetector::builder()
//!         .min_confidence(0.7)
//!         .weight_by_velocity(false)
//!         .build()?;
//!
//!     // 3) Analyse the whole piece
//!     let analysis = detector.analyze(&file);
//!     println!(
//!         "{} with confidence {:.3}, chords: {}",
//!         analysis.primary_scale,
//!         analysis.primary_scale.confidence,
//!         analysis.chord_progression.join(", ")
//!     );
//!     for change in &analysis.key_changes {
//!         println!("{:>6.1}s -> {}", change.time_seconds, change.scale);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! Every analysis is a pure function of the decoded file and the detector's
//! options, so files can be decoded and analysed on as many threads as the
//! caller likes. The crate logs through `tracing` and never installs a
//! subscriber.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rust_2018_idioms)]
#![deny(clippy::all)]

/// Standard MIDI File decoding.
pub use decoder::{decode, decode_with_path, read_file, ticks_to_seconds, FormatError, LoadError};

/// Decoded file model.
pub use event::{EventKind, MidiEvent, MidiFile, MidiHeader, MidiTrack, Timing};

/// Notes, scale types and the scale catalog.
pub use scale::{NoteName, Scale, ScaleType, SCALE_CATALOG};

/// High-level analysis API.
pub use detector::{ConfigError, DetectorConfig, HarmonicAnalysis, ScaleDetector, ScaleDetectorBuilder};

/// Key-change records.
pub use key_changes::KeyChange;

/// Flattened results for storage.
pub use record::{analyze_path, AnalysisRecord, FileStamp};

/// Bounds-checked big-endian cursor.
pub mod byte_reader;

/// Chord segmentation module.
pub mod chords;

/// Decoder module.
pub mod decoder;

/// Scale detector module.
pub mod detector;

/// Event model module.
pub mod event;

/// Pitch-class histogram module.
pub mod histogram;

/// Key-change detection module.
pub mod key_changes;

/// Key profile correlation module.
pub mod key_profile;

/// Analysis record module.
pub mod record;

/// Note and scale module.
pub mod scale;
