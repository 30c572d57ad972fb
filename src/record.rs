//! Analysis Record
//!
//! Flattens a decoded file and its analysis into the one-row shape a catalog
//! stores, and provides the path-to-record convenience used by scanners.

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decoder::{decode_with_path, LoadError};
use crate::detector::{HarmonicAnalysis, ScaleDetector};
use crate::event::MidiFile;

/// Separator between chord labels in [`AnalysisRecord::chord_progression`].
pub const CHORD_SEPARATOR: &str = ", ";

/// Filesystem facts about an analysed file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct FileStamp {
    /// Size in bytes.
    pub size: u64,
    /// Last modification, Unix seconds. 0 when the platform cannot tell.
    pub last_modified: i64,
}

impl FileStamp {
    /// Read size and modification time from filesystem metadata.
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        FileStamp {
            size: metadata.len(),
            last_modified: metadata.modified().map(unix_seconds).unwrap_or(0),
        }
    }
}

fn unix_seconds(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp()
}

/// One analysed file, flattened for storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// Path as given to the analyser.
    pub file_path: String,
    /// Final path component.
    pub file_name: String,
    /// Size in bytes.
    pub file_size: u64,
    /// Last modification, Unix seconds.
    pub last_modified: i64,
    /// Root of the primary scale, e.g. "Db".
    pub detected_key: String,
    /// Display name of the primary scale type, e.g. "Harmonic Minor".
    pub detected_scale: String,
    /// Confidence of the primary scale.
    pub confidence: f64,
    /// File tempo in BPM.
    pub tempo: f64,
    /// Time of the last event, in seconds.
    pub duration: f64,
    /// Note-on count.
    pub total_notes: u32,
    /// Mean MIDI note number.
    pub average_pitch: f64,
    /// Chord labels joined with `", "`.
    pub chord_progression: String,
    /// When the record was first created, Unix seconds.
    pub date_added: i64,
    /// When the analysis ran, Unix seconds.
    pub date_analyzed: i64,
}

impl AnalysisRecord {
    /// Flatten `analysis` of `file`, stamping both dates with `analyzed_at`.
    pub fn from_analysis(
        path: &Path,
        file: &MidiFile,
        analysis: &HarmonicAnalysis,
        stamp: FileStamp,
        analyzed_at: DateTime<Utc>,
    ) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .or_else(|| file.file_name())
            .unwrap_or_default();
        let now = analyzed_at.timestamp();

        AnalysisRecord {
            file_path: path.to_string_lossy().into_owned(),
            file_name,
            file_size: stamp.size,
            last_modified: stamp.last_modified,
            detected_key: analysis.primary_scale.root_name().to_string(),
            detected_scale: analysis.primary_scale.scale_type.display_name().to_string(),
            confidence: analysis.primary_scale.confidence,
            tempo: file.tempo_bpm,
            duration: file.duration(),
            total_notes: analysis.total_notes,
            average_pitch: analysis.average_pitch,
            chord_progression: analysis.chord_progression.join(CHORD_SEPARATOR),
            date_added: now,
            date_analyzed: now,
        }
    }

    /// Chord labels split back out of [`chord_progression`](Self::chord_progression).
    pub fn chords(&self) -> Vec<&str> {
        if self.chord_progression.is_empty() {
            return Vec::new();
        }
        self.chord_progression.split(CHORD_SEPARATOR).collect()
    }
}

/// Read, decode and analyse the file at `path`, returning its record.
pub fn analyze_path(path: impl AsRef<Path>, detector: &ScaleDetector) -> Result<AnalysisRecord, LoadError> {
    let path = path.as_ref();
    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };

    let stamp = FileStamp::from_metadata(&std::fs::metadata(path).map_err(io_err)?);
    let bytes = std::fs::read(path).map_err(io_err)?;
    let file = decode_with_path(&bytes, path).map_err(|source| LoadError::Format {
        path: path.to_path_buf(),
        source,
    })?;

    let analysis = detector.analyze(&file);
    debug!(path = %path.display(), key = %analysis.primary_scale, "analysed file");
    Ok(AnalysisRecord::from_analysis(path, &file, &analysis, stamp, Utc::now()))
}
