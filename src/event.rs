//! Event Model
//!
//! The decoded representation of a Standard MIDI File: header, tracks and
//! time-stamped events. Values are immutable once the decoder hands them out.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Tempo assumed until a tempo meta event says otherwise.
pub const DEFAULT_TEMPO_BPM: f64 = 120.0;

/// Ticks per quarter note assumed by an empty header.
pub const DEFAULT_DIVISION: u16 = 480;

/// What happened at a given tick, carrying only the fields relevant to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// Key pressed. Never carries velocity 0; the decoder turns those into `NoteOff`.
    NoteOn {
        /// MIDI channel, 0-15.
        channel: u8,
        /// MIDI note number, 0-127.
        note: u8,
        /// Strike velocity, 1-127.
        velocity: u8,
    },
    /// Key released.
    NoteOff {
        /// MIDI channel, 0-15.
        channel: u8,
        /// MIDI note number, 0-127.
        note: u8,
        /// Release velocity.
        velocity: u8,
    },
    /// Controller value change.
    ControlChange {
        /// MIDI channel, 0-15.
        channel: u8,
        /// Controller number.
        controller: u8,
        /// New controller value.
        value: u8,
    },
    /// Instrument selection.
    ProgramChange {
        /// MIDI channel, 0-15.
        channel: u8,
        /// Program number.
        program: u8,
    },
    /// Set-tempo meta event (`FF 51 03`).
    Tempo {
        /// Raw tempo payload.
        micros_per_quarter: u32,
        /// The same tempo in beats per minute.
        bpm: f64,
    },
    /// Track-name meta event (`FF 03`).
    TrackName(String),
    /// Channel message the model does not interpret (aftertouch, pitch bend).
    Unknown {
        /// Full status byte, channel included.
        status: u8,
    },
}

/// A single decoded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiEvent {
    /// Ticks since the start of the owning track.
    pub tick: u64,
    /// Seconds since the start of the owning track, using that track's running tempo.
    pub time_seconds: f64,
    /// Event payload.
    pub kind: EventKind,
}

impl MidiEvent {
    /// `(note, velocity)` if this event starts a note.
    pub fn note_on(&self) -> Option<(u8, u8)> {
        match self.kind {
            EventKind::NoteOn { note, velocity, .. } if velocity > 0 => Some((note, velocity)),
            _ => None,
        }
    }

    /// The note number if this event ends a note, including velocity-0 note-ons.
    pub fn note_off(&self) -> Option<u8> {
        match self.kind {
            EventKind::NoteOff { note, .. } => Some(note),
            EventKind::NoteOn { note, velocity: 0, .. } => Some(note),
            _ => None,
        }
    }

    /// True for note-on and note-off events.
    pub fn is_note(&self) -> bool {
        matches!(self.kind, EventKind::NoteOn { .. } | EventKind::NoteOff { .. })
    }

    /// Channel of a channel message.
    pub fn channel(&self) -> Option<u8> {
        match self.kind {
            EventKind::NoteOn { channel, .. }
            | EventKind::NoteOff { channel, .. }
            | EventKind::ControlChange { channel, .. }
            | EventKind::ProgramChange { channel, .. } => Some(channel),
            EventKind::Unknown { status } if (0x80..0xF0).contains(&status) => Some(status & 0x0F),
            _ => None,
        }
    }
}

/// One `MTrk` chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MidiTrack {
    /// Text of the track-name meta event, if any.
    pub name: Option<String>,
    /// Events in decode order, which is also tick order.
    pub events: Vec<MidiEvent>,
}

/// Time base declared by the header's division word.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Timing {
    /// Ticks per quarter note; tempo dependent.
    Metrical {
        /// Resolution of one quarter note.
        ticks_per_quarter: u16,
    },
    /// SMPTE frames; tempo independent.
    Timecode {
        /// Nominal frame rate (24, 25, 29 for 29.97 drop-frame, or 30).
        frames_per_second: u8,
        /// Resolution of one frame.
        ticks_per_frame: u8,
    },
}

impl Timing {
    /// Duration of one tick at `tempo_bpm`.
    pub fn seconds_per_tick(&self, tempo_bpm: f64) -> f64 {
        match *self {
            Timing::Metrical { ticks_per_quarter } => {
                (60.0 / tempo_bpm) / f64::from(ticks_per_quarter)
            }
            Timing::Timecode {
                frames_per_second,
                ticks_per_frame,
            } => {
                let fps = if frames_per_second == 29 {
                    29.97
                } else {
                    f64::from(frames_per_second)
                };
                1.0 / (fps * f64::from(ticks_per_frame))
            }
        }
    }
}

/// The `MThd` chunk.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiHeader {
    /// 0 (single track), 1 (simultaneous tracks) or 2 (independent sequences).
    pub format: u16,
    /// Number of `MTrk` chunks that follow.
    pub track_count: u16,
    /// Raw division word; ticks per quarter note unless the high bit is set.
    pub division: u16,
}

impl MidiHeader {
    /// Interpret the division word.
    pub fn timing(&self) -> Timing {
        if self.division & 0x8000 == 0 {
            Timing::Metrical {
                ticks_per_quarter: self.division,
            }
        } else {
            let [hi, lo] = self.division.to_be_bytes();
            Timing::Timecode {
                frames_per_second: (hi as i8).unsigned_abs(),
                ticks_per_frame: lo,
            }
        }
    }
}

impl Default for MidiHeader {
    fn default() -> Self {
        MidiHeader {
            format: 0,
            track_count: 0,
            division: DEFAULT_DIVISION,
        }
    }
}

/// A fully decoded Standard MIDI File.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiFile {
    /// Header chunk.
    pub header: MidiHeader,
    /// Track chunks, `header.track_count` of them.
    pub tracks: Vec<MidiTrack>,
    /// Tempo of the first tempo event in track 0, or 120.
    pub tempo_bpm: f64,
    /// Where the bytes came from, when known.
    pub source_path: Option<PathBuf>,
}

impl MidiFile {
    /// Note-on and note-off events of every track, merged and ordered by time.
    ///
    /// The sort is stable, so simultaneous events keep track order and then
    /// decode order.
    pub fn note_events(&self) -> Vec<&MidiEvent> {
        let mut events: Vec<&MidiEvent> = self
            .tracks
            .iter()
            .flat_map(|t| t.events.iter())
            .filter(|e| e.is_note())
            .collect();
        events.sort_by(|a, b| a.time_seconds.total_cmp(&b.time_seconds));
        events
    }

    /// Merged note events whose time lies in `[start, end]`.
    pub fn note_events_in_range(&self, start: f64, end: f64) -> Vec<&MidiEvent> {
        events_between(&self.note_events(), start, end).to_vec()
    }

    /// Latest event time across all tracks.
    pub fn duration(&self) -> f64 {
        self.tracks
            .iter()
            .flat_map(|t| t.events.iter())
            .map(|e| e.time_seconds)
            .fold(0.0, f64::max)
    }

    /// File name component of `source_path`.
    pub fn file_name(&self) -> Option<String> {
        self.source_path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }
}

/// The run of time-ordered `events` whose time lies in `[start, end]`.
pub fn events_between<'a, 'e>(events: &'a [&'e MidiEvent], start: f64, end: f64) -> &'a [&'e MidiEvent] {
    let from = events.partition_point(|e| e.time_seconds < start);
    let to = events.partition_point(|e| e.time_seconds <= end).max(from);
    &events[from..to]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(tick: u64, time_seconds: f64, kind: EventKind) -> MidiEvent {
        MidiEvent {
            tick,
            time_seconds,
            kind,
        }
    }

    fn on(note: u8) -> EventKind {
        EventKind::NoteOn {
            channel: 0,
            note,
            velocity: 100,
        }
    }

    fn off(note: u8) -> EventKind {
        EventKind::NoteOff {
            channel: 0,
            note,
            velocity: 0,
        }
    }

    fn two_track_file() -> MidiFile {
        MidiFile {
            header: MidiHeader {
                format: 1,
                track_count: 2,
                division: 480,
            },
            tracks: vec![
                MidiTrack {
                    name: Some("lead".into()),
                    events: vec![
                        ev(0, 0.0, on(60)),
                        ev(480, 0.5, off(60)),
                        ev(960, 1.0, EventKind::ControlChange {
                            channel: 0,
                            controller: 7,
                            value: 100,
                        }),
                    ],
                },
                MidiTrack {
                    name: None,
                    events: vec![ev(240, 0.25, on(64)), ev(1440, 1.5, off(64))],
                },
            ],
            tempo_bpm: 120.0,
            source_path: Some(PathBuf::from("/tmp/songs/two.mid")),
        }
    }

    #[test]
    fn merged_note_events_are_time_sorted_and_exclude_controls() {
        let file = two_track_file();
        let times: Vec<f64> = file.note_events().iter().map(|e| e.time_seconds).collect();
        assert_eq!(times, vec![0.0, 0.25, 0.5, 1.5]);
    }

    #[test]
    fn range_query_is_inclusive_on_both_ends() {
        let file = two_track_file();
        let notes: Vec<u8> = file
            .note_events_in_range(0.25, 0.5)
            .iter()
            .filter_map(|e| e.note_on().map(|(n, _)| n).or(e.note_off()))
            .collect();
        assert_eq!(notes, vec![64, 60]);
    }

    #[test]
    fn sorted_slice_lookup_matches_range_filter() {
        let file = two_track_file();
        let all = file.note_events();
        for (start, end) in [(0.0, 1.5), (0.25, 0.5), (0.3, 0.4), (1.5, 1.5), (2.0, 3.0), (1.0, 0.0)] {
            let expected: Vec<f64> = all
                .iter()
                .filter(|e| e.time_seconds >= start && e.time_seconds <= end)
                .map(|e| e.time_seconds)
                .collect();
            let got: Vec<f64> = events_between(&all, start, end).iter().map(|e| e.time_seconds).collect();
            assert_eq!(got, expected, "range [{start}, {end}]");
        }
    }

    #[test]
    fn duration_counts_non_note_events() {
        let mut file = two_track_file();
        assert_eq!(file.duration(), 1.5);
        file.tracks[1].events.pop();
        assert_eq!(file.duration(), 1.0);
    }

    #[test]
    fn velocity_zero_note_on_reads_as_note_off() {
        let e = ev(0, 0.0, EventKind::NoteOn {
            channel: 3,
            note: 61,
            velocity: 0,
        });
        assert_eq!(e.note_on(), None);
        assert_eq!(e.note_off(), Some(61));
        assert_eq!(e.channel(), Some(3));
    }

    #[test]
    fn timecode_division_is_tempo_independent() {
        let header = MidiHeader {
            format: 0,
            track_count: 1,
            division: 0xE728, // -25 fps, 40 ticks per frame
        };
        let timing = header.timing();
        assert_eq!(
            timing,
            Timing::Timecode {
                frames_per_second: 25,
                ticks_per_frame: 40
            }
        );
        assert_eq!(timing.seconds_per_tick(60.0), timing.seconds_per_tick(200.0));
        assert!((timing.seconds_per_tick(120.0) - 0.001).abs() < 1e-12);
    }

    #[test]
    fn file_name_comes_from_source_path() {
        assert_eq!(two_track_file().file_name().as_deref(), Some("two.mid"));
    }
}
