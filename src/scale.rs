//! Scales
//!
//! Pitch-class names, the scale-type enumeration and the compile-time
//! template catalog that maps every named scale to its interval set.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

const SEMITONES: u8 = 12;

/// Twelve chromatic pitch classes, C = 0 through B = 11.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum NoteName {
    /// C
    #[default]
    C,
    /// C sharp / D flat
    Db,
    /// D
    D,
    /// D sharp / E flat
    Eb,
    /// E
    E,
    /// F
    F,
    /// F sharp / G flat
    Gb,
    /// G
    G,
    /// G sharp / A flat
    Ab,
    /// A
    A,
    /// A sharp / B flat
    Bb,
    /// B
    B,
}

impl NoteName {
    /// Every pitch class in chromatic order.
    pub const ALL: [NoteName; 12] = [
        NoteName::C,
        NoteName::Db,
        NoteName::D,
        NoteName::Eb,
        NoteName::E,
        NoteName::F,
        NoteName::Gb,
        NoteName::G,
        NoteName::Ab,
        NoteName::A,
        NoteName::Bb,
        NoteName::B,
    ];

    /// Pitch class of a MIDI note number or any value reduced modulo 12.
    pub const fn from_pitch_class(pc: u8) -> NoteName {
        NoteName::ALL[(pc % SEMITONES) as usize]
    }

    /// Semitone offset from C.
    pub const fn pitch_class(self) -> u8 {
        self as u8
    }

    /// Flat spelling used in displays and stored records.
    pub const fn as_str(self) -> &'static str {
        match self {
            NoteName::C => "C",
            NoteName::Db => "Db",
            NoteName::D => "D",
            NoteName::Eb => "Eb",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::Gb => "Gb",
            NoteName::G => "G",
            NoteName::Ab => "Ab",
            NoteName::A => "A",
            NoteName::Bb => "Bb",
            NoteName::B => "B",
        }
    }
}

impl Display for NoteName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every named scale or mode the detector can report.
///
/// Declaration order is significant: the refinement pass walks the catalog in
/// this order and keeps the earliest template on ties.
#[allow(missing_docs)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum ScaleType {
    // Major modes
    Ionian,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Aeolian,
    Locrian,

    // Minor variants
    HarmonicMinor,
    MelodicMinor,

    // Melodic minor modes
    DorianFlat2,
    LydianAugmented,
    LydianDominant,
    MixolydianFlat6,
    LocrianNatural2,
    Altered,

    // Harmonic minor modes
    LocrianNatural6,
    IonianSharp5,
    DorianSharp4,
    PhrygianDominant,
    LydianSharp2,
    SuperLocrianDoubleFlat7,

    // Harmonic major modes
    HarmonicMajor,
    DorianFlat5,
    PhrygianFlat4,
    LydianFlat3,
    MixolydianFlat2,
    LydianAugmentedSharp2,
    LocrianDoubleFlat7,

    // Double harmonic (Byzantine) modes
    DoubleHarmonicMajor,
    LydianSharp2Sharp6,
    Ultraphrygian,
    HungarianMinor,
    Oriental,
    IonianSharp2Sharp5,
    LocrianDoubleFlat3DoubleFlat7,

    // Pentatonic
    MajorPentatonic,
    MinorPentatonic,
    SuspendedPentatonic,
    ManGong,

    // Blues
    Blues,
    MajorBlues,
    BluesNonatonic,

    // Bebop
    BebopDominant,
    BebopMajor,
    BebopMinor,
    BebopDorian,
    BebopMelodicMinor,

    // Symmetric
    Chromatic,
    WholeTone,
    Diminished,
    DiminishedHalfWhole,
    Augmented,
    Tritone,
    MessiaenMode3,

    // World / ethnic
    Hirajoshi,
    InSen,
    Iwato,
    Kumoi,
    Pelog,
    Yo,
    Persian,
    Arabian,
    Enigmatic,
    NeapolitanMajor,
    NeapolitanMinor,
    HungarianMajor,
    SpanishEightTone,
    Flamenco,
    Gypsy,
    Chinese,
    Japanese,
    Prometheus,

    // Jazz
    LeadingWholeTone,
    LydianMinor,
    SixToneSymmetrical,
    DominantPentatonic,
    MinorSixthPentatonic,
    MajorFlat6Pentatonic,

    // Modal variations
    IonianFlat2,
    IonianSharp2,
    MixolydianSharp2,
    LydianSharp6,
    LocrianNatural3,
    DorianFlat4,
    PhrygianDoubleFlat7,

    /// No scale could be determined.
    #[default]
    Unknown,
}

/// Number of named templates (every `ScaleType` except `Unknown`).
pub const NUM_SCALE_TYPES: usize = 85;

/// `(type, display name, intervals)` in `ScaleType` declaration order.
pub static SCALE_CATALOG: [(ScaleType, &str, &[u8]); NUM_SCALE_TYPES] = [
    (ScaleType::Ionian,                        "Major",                      &[0, 2, 4, 5, 7, 9, 11]),
    (ScaleType::Dorian,                        "Dorian",                     &[0, 2, 3, 5, 7, 9, 10]),
    (ScaleType::Phrygian,                      "Phrygian",                   &[0, 1, 3, 5, 7, 8, 10]),
    (ScaleType::Lydian,                        "Lydian",                     &[0, 2, 4, 6, 7, 9, 11]),
    (ScaleType::Mixolydian,                    "Mixolydian",                 &[0, 2, 4, 5, 7, 9, 10]),
    (ScaleType::Aeolian,                       "Minor",                      &[0, 2, 3, 5, 7, 8, 10]),
    (ScaleType::Locrian,                       "Locrian",                    &[0, 1, 3, 5, 6, 8, 10]),
    (ScaleType::HarmonicMinor,                 "Harmonic Minor",             &[0, 2, 3, 5, 7, 8, 11]),
    (ScaleType::MelodicMinor,                  "Melodic Minor",              &[0, 2, 3, 5, 7, 9, 11]),
    (ScaleType::DorianFlat2,                   "Dorian b2",                  &[0, 1, 3, 5, 7, 9, 10]),
    (ScaleType::LydianAugmented,               "Lydian Augmented",           &[0, 2, 4, 6, 8, 9, 11]),
    (ScaleType::LydianDominant,                "Lydian Dominant",            &[0, 2, 4, 6, 7, 9, 10]),
    (ScaleType::MixolydianFlat6,               "Mixolydian b6",              &[0, 2, 4, 5, 7, 8, 10]),
    (ScaleType::LocrianNatural2,               "Locrian #2",                 &[0, 2, 3, 5, 6, 8, 10]),
    (ScaleType::Altered,                       "Altered",                    &[0, 1, 3, 4, 6, 8, 10]),
    (ScaleType::LocrianNatural6,               "Locrian #6",                 &[0, 1, 3, 5, 6, 9, 10]),
    (ScaleType::IonianSharp5,                  "Ionian #5",                  &[0, 2, 4, 5, 8, 9, 11]),
    (ScaleType::DorianSharp4,                  "Dorian #4",                  &[0, 2, 3, 6, 7, 9, 10]),
    (ScaleType::PhrygianDominant,              "Phrygian Dominant",          &[0, 1, 4, 5, 7, 8, 10]),
    (ScaleType::LydianSharp2,                  "Lydian #2",                  &[0, 3, 4, 6, 7, 9, 11]),
    (ScaleType::SuperLocrianDoubleFlat7,       "Super Locrian bb7",          &[0, 1, 3, 4, 6, 8, 9]),
    (ScaleType::HarmonicMajor,                 "Harmonic Major",             &[0, 2, 4, 5, 7, 8, 11]),
    (ScaleType::DorianFlat5,                   "Dorian b5",                  &[0, 2, 3, 5, 6, 9, 10]),
    (ScaleType::PhrygianFlat4,                 "Phrygian b4",                &[0, 1, 3, 4, 7, 8, 10]),
    (ScaleType::LydianFlat3,                   "Lydian b3",                  &[0, 2, 3, 6, 7, 9, 11]),
    (ScaleType::MixolydianFlat2,               "Mixolydian b2",              &[0, 1, 4, 5, 7, 9, 10]),
    (ScaleType::LydianAugmentedSharp2,         "Lydian Augmented #2",        &[0, 3, 4, 6, 8, 9, 11]),
    (ScaleType::LocrianDoubleFlat7,            "Locrian bb7",                &[0, 1, 3, 5, 6, 8, 9]),
    (ScaleType::DoubleHarmonicMajor,           "Double Harmonic Major",      &[0, 1, 4, 5, 7, 8, 11]),
    (ScaleType::LydianSharp2Sharp6,            "Lydian #2 #6",               &[0, 3, 4, 6, 7, 10, 11]),
    (ScaleType::Ultraphrygian,                 "Ultraphrygian",              &[0, 1, 3, 4, 7, 8, 9]),
    (ScaleType::HungarianMinor,                "Hungarian Minor",            &[0, 2, 3, 6, 7, 8, 11]),
    (ScaleType::Oriental,                      "Oriental",                   &[0, 1, 4, 5, 6, 9, 10]),
    (ScaleType::IonianSharp2Sharp5,            "Ionian #2 #5",               &[0, 3, 4, 5, 8, 9, 11]),
    (ScaleType::LocrianDoubleFlat3DoubleFlat7, "Locrian bb3 bb7",            &[0, 1, 2, 5, 6, 8, 9]),
    (ScaleType::MajorPentatonic,               "Major Pentatonic",           &[0, 2, 4, 7, 9]),
    (ScaleType::MinorPentatonic,               "Minor Pentatonic",           &[0, 3, 5, 7, 10]),
    (ScaleType::SuspendedPentatonic,           "Suspended Pentatonic",       &[0, 2, 5, 7, 10]),
    (ScaleType::ManGong,                       "Man Gong",                   &[0, 3, 5, 8, 10]),
    (ScaleType::Blues,                         "Blues",                      &[0, 3, 5, 6, 7, 10]),
    (ScaleType::MajorBlues,                    "Major Blues",                &[0, 2, 3, 4, 7, 9]),
    (ScaleType::BluesNonatonic,                "Blues Nonatonic",            &[0, 2, 3, 4, 5, 7, 9, 10, 11]),
    (ScaleType::BebopDominant,                 "Bebop Dominant",             &[0, 2, 4, 5, 7, 9, 10, 11]),
    (ScaleType::BebopMajor,                    "Bebop Major",                &[0, 2, 4, 5, 7, 8, 9, 11]),
    (ScaleType::BebopMinor,                    "Bebop Minor",                &[0, 2, 3, 4, 5, 7, 9, 10]),
    (ScaleType::BebopDorian,                   "Bebop Dorian",               &[0, 2, 3, 5, 7, 9, 10, 11]),
    (ScaleType::BebopMelodicMinor,             "Bebop Melodic Minor",        &[0, 2, 3, 5, 7, 8, 9, 11]),
    (ScaleType::Chromatic,                     "Chromatic",                  &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]),
    (ScaleType::WholeTone,                     "Whole Tone",                 &[0, 2, 4, 6, 8, 10]),
    (ScaleType::Diminished,                    "Diminished",                 &[0, 2, 3, 5, 6, 8, 9, 11]),
    (ScaleType::DiminishedHalfWhole,           "Diminished Half-Whole",      &[0, 1, 3, 4, 6, 7, 9, 10]),
    (ScaleType::Augmented,                     "Augmented",                  &[0, 3, 4, 7, 8, 11]),
    (ScaleType::Tritone,                       "Tritone",                    &[0, 1, 4, 6, 7, 10]),
    (ScaleType::MessiaenMode3,                 "Messiaen Mode 3",            &[0, 2, 3, 4, 6, 7, 8, 10, 11]),
    (ScaleType::Hirajoshi,                     "Hirajoshi",                  &[0, 2, 3, 7, 8]),
    (ScaleType::InSen,                         "In Sen",                     &[0, 1, 5, 7, 10]),
    (ScaleType::Iwato,                         "Iwato",                      &[0, 1, 5, 6, 10]),
    (ScaleType::Kumoi,                         "Kumoi",                      &[0, 2, 3, 7, 9]),
    (ScaleType::Pelog,                         "Pelog",                      &[0, 1, 3, 7, 8]),
    (ScaleType::Yo,                            "Yo",                         &[0, 2, 5, 7, 9]),
    (ScaleType::Persian,                       "Persian",                    &[0, 1, 4, 5, 6, 8, 11]),
    (ScaleType::Arabian,                       "Arabian",                    &[0, 2, 4, 5, 6, 8, 10]),
    (ScaleType::Enigmatic,                     "Enigmatic",                  &[0, 1, 4, 6, 8, 10, 11]),
    (ScaleType::NeapolitanMajor,               "Neapolitan Major",           &[0, 1, 3, 5, 7, 9, 11]),
    (ScaleType::NeapolitanMinor,               "Neapolitan Minor",           &[0, 1, 3, 5, 7, 8, 11]),
    (ScaleType::HungarianMajor,                "Hungarian Major",            &[0, 3, 4, 6, 7, 9, 10]),
    (ScaleType::SpanishEightTone,              "Spanish 8-Tone",             &[0, 1, 3, 4, 5, 6, 8, 10]),
    (ScaleType::Flamenco,                      "Flamenco",                   &[0, 1, 3, 4, 5, 7, 8, 10]),
    (ScaleType::Gypsy,                         "Gypsy",                      &[0, 2, 3, 6, 7, 8, 10]),
    (ScaleType::Chinese,                       "Chinese",                    &[0, 4, 6, 7, 11]),
    (ScaleType::Japanese,                      "Japanese",                   &[0, 1, 5, 7, 8]),
    (ScaleType::Prometheus,                    "Prometheus",                 &[0, 2, 4, 6, 9, 10]),
    (ScaleType::LeadingWholeTone,              "Leading Whole Tone",         &[0, 2, 4, 6, 8, 10, 11]),
    (ScaleType::LydianMinor,                   "Lydian Minor",               &[0, 2, 4, 6, 7, 8, 10]),
    (ScaleType::SixToneSymmetrical,            "Six Tone Symmetrical",       &[0, 1, 4, 5, 8, 9]),
    (ScaleType::DominantPentatonic,            "Dominant Pentatonic",        &[0, 2, 4, 7, 10]),
    (ScaleType::MinorSixthPentatonic,          "Minor 6th Pentatonic",       &[0, 3, 5, 7, 9]),
    (ScaleType::MajorFlat6Pentatonic,          "Major b6 Pentatonic",        &[0, 2, 4, 7, 8]),
    (ScaleType::IonianFlat2,                   "Ionian b2",                  &[0, 1, 4, 5, 7, 9, 11]),
    (ScaleType::IonianSharp2,                  "Ionian #2",                  &[0, 3, 4, 5, 7, 9, 11]),
    (ScaleType::MixolydianSharp2,              "Mixolydian #2",              &[0, 3, 4, 5, 7, 9, 10]),
    (ScaleType::LydianSharp6,                  "Lydian #6",                  &[0, 2, 4, 6, 7, 10, 11]),
    (ScaleType::LocrianNatural3,               "Locrian #3",                 &[0, 1, 4, 5, 6, 8, 10]),
    (ScaleType::DorianFlat4,                   "Dorian b4",                  &[0, 2, 3, 4, 7, 9, 10]),
    (ScaleType::PhrygianDoubleFlat7,           "Phrygian bb7",               &[0, 1, 3, 5, 7, 8, 9]),
];

impl ScaleType {
    /// Template intervals, or just the root for `Unknown`.
    pub fn intervals(self) -> &'static [u8] {
        match SCALE_CATALOG.get(self as usize) {
            Some(&(_, _, intervals)) => intervals,
            None => &[0],
        }
    }

    /// Exact name stored in analysis records.
    pub fn display_name(self) -> &'static str {
        match SCALE_CATALOG.get(self as usize) {
            Some(&(_, name, _)) => name,
            None => "Unknown",
        }
    }

    /// Inverse of [`ScaleType::display_name`].
    pub fn from_display_name(name: &str) -> Option<ScaleType> {
        if name == "Unknown" {
            return Some(ScaleType::Unknown);
        }
        SCALE_CATALOG
            .iter()
            .find(|(_, n, _)| *n == name)
            .map(|&(t, _, _)| t)
    }

    /// Every named template in declaration order.
    pub fn templates() -> impl Iterator<Item = ScaleType> {
        SCALE_CATALOG.iter().map(|&(t, _, _)| t)
    }
}

impl Display for ScaleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A rooted scale with the confidence it was detected with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    /// Tonal center.
    pub root: NoteName,
    /// Which template the scale follows.
    pub scale_type: ScaleType,
    /// Ascending, unique semitone offsets from the root; always starts with 0.
    pub intervals: Vec<u8>,
    /// Detection strength in `[0.0, 1.0]`; not a probability.
    pub confidence: f64,
}

impl Scale {
    /// Build a scale from the catalog template for `scale_type`.
    pub fn new(root: NoteName, scale_type: ScaleType, confidence: f64) -> Self {
        Scale {
            root,
            scale_type,
            intervals: scale_type.intervals().to_vec(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// The neutral result for silent or degenerate input.
    pub fn unknown() -> Self {
        Scale::new(NoteName::C, ScaleType::Unknown, 0.0)
    }

    /// True iff `(midi_note - root) mod 12` is one of the intervals.
    pub fn contains_note(&self, midi_note: u8) -> bool {
        let offset = (midi_note % SEMITONES + SEMITONES - self.root.pitch_class()) % SEMITONES;
        self.intervals.contains(&offset)
    }

    /// Root spelling, e.g. "Db".
    pub fn root_name(&self) -> &'static str {
        self.root.as_str()
    }

    /// Root and type, e.g. "C Major".
    pub fn name(&self) -> String {
        format!("{} {}", self.root, self.scale_type)
    }

    /// Same root and type, regardless of confidence.
    pub fn same_key(&self, other: &Scale) -> bool {
        self.root == other.root && self.scale_type == other.scale_type
    }
}

impl Default for Scale {
    fn default() -> Self {
        Scale::unknown()
    }
}

impl Display for Scale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.root, self.scale_type)
    }
}
