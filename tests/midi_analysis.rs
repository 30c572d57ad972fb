//! Integration tests decoding generated MIDI files and checking the analysis.

mod common;

use common::{chord, note, phrases, single_track, smf, Note, MAJOR_PHRASE, MINOR_PHRASE};
use lazy_static::lazy_static;
use midi_scale_detector::{
    analyze_path, decode, read_file, FormatError, LoadError, NoteName, ScaleDetector,
    ScaleDetectorBuilder, ScaleType,
};
use pretty_assertions::assert_eq;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Holds the intent encoded in fixture names like "Db-minor.mid"
#[derive(Debug, Clone)]
struct TestFileInfo {
    filename: String,
    path: PathBuf,
    root: NoteName,
    scale_type: ScaleType,
}

impl TestFileInfo {
    fn from_path(path: PathBuf) -> Option<Self> {
        let stem = path.file_stem()?.to_str()?;
        let (root, mode) = stem.split_once('-')?;
        let root = NoteName::ALL.into_iter().find(|n| n.as_str() == root)?;
        let scale_type = match mode {
            "major" => ScaleType::Ionian,
            "minor" => ScaleType::Aeolian,
            other => panic!("unrecognized mode: `{other}`"),
        };

        Some(TestFileInfo {
            filename: path.file_name()?.to_str()?.to_string(),
            path,
            root,
            scale_type,
        })
    }
}

/// Write one four-second file per key into a fresh directory.
fn write_key_fixtures() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for root in NoteName::ALL {
        for (mode, shape) in [("major", &MAJOR_PHRASE), ("minor", &MINOR_PHRASE)] {
            let (notes, _) = phrases(root.pitch_class(), shape, 0.0, 2);
            let path = dir.path().join(format!("{}-{mode}.mid", root.as_str()));
            std::fs::write(path, single_track(&notes)).unwrap();
        }
    }
    std::fs::write(dir.path().join("notes.txt"), "not a fixture").unwrap();
    dir
}

/// Gather all .mid files under `base`
fn collect_test_files(base: &std::path::Path) -> Vec<TestFileInfo> {
    WalkDir::new(base)
        .into_iter()
        .filter_map(Result::ok)
        .map(|e| e.path().to_path_buf())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("mid"))
        .filter_map(TestFileInfo::from_path)
        .collect()
}

lazy_static! {
    static ref FIXTURE_DIR: TempDir = write_key_fixtures();
    static ref TEST_FILES: Vec<TestFileInfo> = collect_test_files(FIXTURE_DIR.path());
}

#[test]
fn test_scale_detector_on_every_key() {
    assert_eq!(TEST_FILES.len(), 24);

    let detector = ScaleDetector::new();
    let failures = Arc::new(Mutex::new(Vec::<String>::new()));

    TEST_FILES.par_iter().for_each(|tf| {
        let record = analyze_path(&tf.path, &detector).unwrap();
        let midi = read_file(&tf.path).unwrap();
        let analysis = detector.analyze(&midi);

        let primary = &analysis.primary_scale;
        let ok = primary.root == tf.root
            && primary.scale_type == tf.scale_type
            && record.detected_key == tf.root.as_str()
            && record.detected_scale == tf.scale_type.display_name()
            && analysis.alternative_scales.len() <= 3
            && analysis.alternative_scales.iter().all(|s| !s.same_key(primary))
            && analysis.key_changes.is_empty();

        if !ok {
            failures.lock().unwrap().push(format!(
                "file:{}\nexpected = {} {}\nactual = {} ({:.3}), alternatives: {:?}\n",
                tf.filename,
                tf.root,
                tf.scale_type,
                primary,
                primary.confidence,
                analysis.alternative_scales
            ));
        }
    });

    let failures = Arc::try_unwrap(failures).unwrap().into_inner().unwrap();
    if !failures.is_empty() {
        panic!("{} key tests failed:\n\n{}", failures.len(), failures.join("\n"));
    }
}

#[test]
fn key_change_from_a_minor_to_g_major() {
    let (mut notes, end) = phrases(NoteName::A.pitch_class(), &MINOR_PHRASE, 0.0, 4);
    let (g_major, end) = phrases(NoteName::G.pitch_class(), &MAJOR_PHRASE, end, 4);
    notes.extend(g_major);
    assert_eq!(end, 16.0);

    let midi = decode(&single_track(&notes)).unwrap();
    assert_eq!(midi.duration(), 16.0);

    let analysis = ScaleDetector::new().analyze(&midi);
    let changes = &analysis.key_changes;
    assert!(!changes.is_empty());
    assert!(changes
        .iter()
        .all(|c| c.time_seconds > 0.0 && c.time_seconds % 2.0 == 0.0 && c.time_seconds < 16.0));
    assert!(changes.windows(2).all(|w| w[0].time_seconds < w[1].time_seconds));

    let last = changes.last().unwrap();
    assert_eq!(last.time_seconds, 6.0);
    assert_eq!(last.scale.root, NoteName::G);
    assert_eq!(last.scale.scale_type, ScaleType::Ionian);

    // The first half alone has no key change to find.
    let first_half = ScaleDetector::new().analyze_range(&midi, 0.0, 7.9);
    assert_eq!(first_half.primary_scale.root, NoteName::A);
    assert_eq!(first_half.primary_scale.scale_type, ScaleType::Aeolian);
    assert!(first_half.key_changes.is_empty());

    let quiet = ScaleDetectorBuilder::new().detect_key_changes(false).build().unwrap();
    assert!(quiet.analyze(&midi).key_changes.is_empty());
}

#[test]
fn block_chords_give_their_lowest_pitch_class() {
    let mut notes: Vec<Note> = Vec::new();
    for (bar, pitches) in [[60, 64, 67], [62, 65, 69], [64, 67, 71], [67, 71, 74]].iter().enumerate() {
        notes.extend(chord(pitches, bar as f64 + 0.125, 0.75));
    }
    // A lone note afterwards is not a chord.
    notes.push(note(60, 4.25, 0.5));

    let midi = decode(&single_track(&notes)).unwrap();
    let analysis = ScaleDetector::new().analyze(&midi);
    // G-B-D spells {2, 7, 11}, so its lowest pitch class is D.
    assert_eq!(analysis.chord_progression, vec!["C", "D", "E", "D"]);
    assert_eq!(analysis.total_notes, 13);
}

#[test]
fn tracks_are_merged_and_tempo_comes_from_the_first_track() {
    let melody = [note(72, 0.0, 1.0), note(74, 1.0, 1.0), note(76, 2.0, 2.0)];
    let bass = [note(48, 0.0, 2.0), note(43, 2.0, 2.0)];
    let bytes = smf(90.0, &[(Some("melody"), &melody[..]), (Some("bass"), &bass[..])]);

    let midi = decode(&bytes).unwrap();
    assert_eq!(midi.header.format, 1);
    assert_eq!(midi.tracks.len(), 2);
    assert_eq!(midi.tracks[0].name.as_deref(), Some("melody"));
    assert_eq!(midi.tracks[1].name.as_deref(), Some("bass"));
    assert!((midi.tempo_bpm - 90.0).abs() < 1e-3);
    assert!((midi.duration() - 4.0).abs() < 1e-2);

    let analysis = ScaleDetector::new().analyze(&midi);
    assert_eq!(analysis.total_notes, 5);
    assert_eq!(analysis.note_distribution.len(), 5);
    let mean = (72 + 74 + 76 + 48 + 43) as f64 / 5.0;
    assert!((analysis.average_pitch - mean).abs() < 1e-9);
}

#[test]
fn decoding_and_analysis_are_repeatable() {
    let (notes, _) = phrases(NoteName::Eb.pitch_class(), &MAJOR_PHRASE, 0.0, 5);
    let bytes = single_track(&notes);
    let a = decode(&bytes).unwrap();
    let b = decode(&bytes).unwrap();
    assert_eq!(a, b);

    let detector = ScaleDetector::new();
    assert_eq!(detector.analyze(&a), detector.analyze(&b));
}

#[test]
fn records_serialize_as_flat_objects() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Bb-major.mid");
    let (notes, _) = phrases(NoteName::Bb.pitch_class(), &MAJOR_PHRASE, 0.0, 1);
    std::fs::write(&path, single_track(&notes)).unwrap();

    let record = analyze_path(&path, &ScaleDetector::new()).unwrap();
    let value = serde_json::to_value(&record).unwrap();
    let object = value.as_object().unwrap();

    let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec![
            "average_pitch",
            "chord_progression",
            "confidence",
            "date_added",
            "date_analyzed",
            "detected_key",
            "detected_scale",
            "duration",
            "file_name",
            "file_path",
            "file_size",
            "last_modified",
            "tempo",
            "total_notes",
        ]
    );
    assert_eq!(object["detected_key"], "Bb");
    assert_eq!(object["detected_scale"], "Major");
    assert_eq!(object["file_name"], "Bb-major.mid");
    assert_eq!(object["total_notes"], 7);
    assert!(object["chord_progression"].is_string());
}

#[test]
fn corrupt_files_are_rejected() {
    let dir = tempfile::tempdir().unwrap();

    let wav = dir.path().join("fake.mid");
    std::fs::write(&wav, b"RIFF\x24\x00\x00\x00WAVEfmt ").unwrap();
    match read_file(&wav) {
        Err(LoadError::Format {
            path,
            source: FormatError::BadMagic { expected, .. },
        }) => {
            assert_eq!(path, wav);
            assert_eq!(expected, "MThd");
        }
        other => panic!("expected bad magic, got {other:?}"),
    }

    // Cut a valid file off in the middle of its only track.
    let bytes = single_track(&[note(60, 0.0, 1.0), note(64, 1.0, 1.0)]);
    let cut = dir.path().join("cut.mid");
    std::fs::write(&cut, &bytes[..bytes.len() - 6]).unwrap();
    let err = analyze_path(&cut, &ScaleDetector::new()).unwrap_err();
    assert!(matches!(err, LoadError::Format { .. }));
    assert!(err.to_string().contains("cut.mid"), "{err}");
}
