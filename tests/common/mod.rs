//! Minimal Standard MIDI File writer for building test fixtures.

#![allow(dead_code)]

/// Ticks per quarter note. At 120 BPM one tick is exactly 2^-10 seconds,
/// so fixture times survive decoding without rounding.
pub const DIVISION: u16 = 512;

/// A note to be written, times in seconds.
#[derive(Debug, Copy, Clone)]
pub struct Note {
    pub pitch: u8,
    pub start: f64,
    pub length: f64,
    pub velocity: u8,
}

pub fn note(pitch: u8, start: f64, length: f64) -> Note {
    Note {
        pitch,
        start,
        length,
        velocity: 100,
    }
}

/// Notes sounding together.
pub fn chord(pitches: &[u8], start: f64, length: f64) -> Vec<Note> {
    pitches.iter().map(|&p| note(p, start, length)).collect()
}

/// Semitone offsets and lengths (in eighths of a second) of a two-second
/// phrase leaning on the tonic triad of a major key.
pub const MAJOR_PHRASE: [(u8, f64); 7] = [
    (0, 4.0),
    (2, 1.5),
    (4, 3.0),
    (5, 1.5),
    (7, 3.0),
    (9, 1.5),
    (11, 1.5),
];

/// As [`MAJOR_PHRASE`] for the natural minor.
pub const MINOR_PHRASE: [(u8, f64); 7] = [
    (0, 4.0),
    (2, 1.5),
    (3, 3.0),
    (5, 1.5),
    (7, 3.0),
    (8, 1.5),
    (10, 1.5),
];

/// Play `shape` on `root` (a pitch class) starting at `start`, returning the
/// notes and the time the phrase ends.
pub fn phrase(root: u8, shape: &[(u8, f64)], start: f64) -> (Vec<Note>, f64) {
    let mut notes = Vec::with_capacity(shape.len());
    let mut t = start;
    for &(interval, eighths) in shape {
        let length = eighths * 0.125;
        notes.push(note(60 + (root + interval) % 12, t, length));
        t += length;
    }
    (notes, t)
}

/// Repeat a phrase back to back.
pub fn phrases(root: u8, shape: &[(u8, f64)], start: f64, count: usize) -> (Vec<Note>, f64) {
    let mut all = Vec::new();
    let mut t = start;
    for _ in 0..count {
        let (notes, end) = phrase(root, shape, t);
        all.extend(notes);
        t = end;
    }
    (all, t)
}

fn write_varlen(out: &mut Vec<u8>, mut value: u32) {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        bytes.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    bytes.reverse();
    out.extend_from_slice(&bytes);
}

fn ticks(seconds: f64, bpm: f64) -> u32 {
    (seconds * bpm / 60.0 * f64::from(DIVISION)).round() as u32
}

/// Encode one track chunk. Every track starts with the tempo so each one
/// times its events the same way. Note-offs are written as velocity-0
/// note-ons under running status.
fn track(name: Option<&str>, bpm: f64, notes: &[Note]) -> Vec<u8> {
    // (tick, is_on, pitch, velocity); offs sort before ons at the same tick.
    let mut events: Vec<(u32, bool, u8, u8)> = notes
        .iter()
        .flat_map(|n| {
            [
                (ticks(n.start, bpm), true, n.pitch, n.velocity),
                (ticks(n.start + n.length, bpm), false, n.pitch, 0),
            ]
        })
        .collect();
    events.sort_by_key(|&(tick, is_on, _, _)| (tick, is_on));

    let mut body = Vec::new();
    if let Some(name) = name {
        body.push(0);
        body.extend_from_slice(&[0xFF, 0x03]);
        write_varlen(&mut body, name.len() as u32);
        body.extend_from_slice(name.as_bytes());
    }

    let micros = (60_000_000.0 / bpm).round() as u32;
    body.push(0);
    body.extend_from_slice(&[0xFF, 0x51, 0x03]);
    body.extend_from_slice(&micros.to_be_bytes()[1..]);

    let mut last_tick = 0;
    let mut status_written = false;
    for (tick, _, pitch, velocity) in events {
        write_varlen(&mut body, tick - last_tick);
        last_tick = tick;
        if !status_written {
            body.push(0x90);
            status_written = true;
        }
        body.extend_from_slice(&[pitch, velocity]);
    }

    body.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);

    let mut chunk = b"MTrk".to_vec();
    chunk.extend_from_slice(&(body.len() as u32).to_be_bytes());
    chunk.extend_from_slice(&body);
    chunk
}

/// Encode a format 1 file with one track per entry of `tracks`.
pub fn smf(bpm: f64, tracks: &[(Option<&str>, &[Note])]) -> Vec<u8> {
    let mut out = b"MThd".to_vec();
    out.extend_from_slice(&6u32.to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    out.extend_from_slice(&DIVISION.to_be_bytes());
    for &(name, notes) in tracks {
        out.extend(track(name, bpm, notes));
    }
    out
}

/// Encode a single-track file at 120 BPM.
pub fn single_track(notes: &[Note]) -> Vec<u8> {
    smf(120.0, &[(None, notes)])
}
