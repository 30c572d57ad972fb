//! Chord Segmenter
//!
//! Cuts the piece into one-second windows and labels each window that has at
//! least two sounding pitch classes with the lowest of them. Consecutive
//! repeats collapse, so the result reads as a compact progression.

use crate::event::MidiEvent;
use crate::scale::{NoteName, Scale};

const SEMITONES: usize = 12;

/// Length of one chord window.
pub const CHORD_WINDOW_SECONDS: f64 = 1.0;

/// Fewest distinct pitch classes that make a chord.
const MIN_CHORD_PITCH_CLASSES: usize = 2;

/// Label every window of `[0, duration)` and drop consecutive duplicates.
///
/// `events` must be the whole file's merged, time-sorted note events. The
/// reference scale does not influence labelling.
pub fn chord_progression(events: &[&MidiEvent], duration: f64, _scale: &Scale) -> Vec<String> {
    let mut progression: Vec<String> = Vec::new();
    if !duration.is_finite() {
        return progression;
    }

    let mut window = 0u64;
    loop {
        let start = window as f64 * CHORD_WINDOW_SECONDS;
        if start >= duration {
            break;
        }
        let end = start + CHORD_WINDOW_SECONDS;

        if let Some(root) = window_chord_root(events, start, end) {
            if progression.last().map(String::as_str) != Some(root.as_str()) {
                progression.push(root.as_str().to_string());
            }
        }
        window += 1;
    }
    progression
}

/// Lowest pitch class among those sounding at any point in `[start, end]`,
/// or `None` if fewer than two pitch classes sound.
pub fn window_chord_root(events: &[&MidiEvent], start: f64, end: f64) -> Option<NoteName> {
    let mut sounding = [false; SEMITONES];
    let mut events = events.iter().peekable();

    while let Some(event) = events.next_if(|e| e.time_seconds <= start) {
        apply(&mut sounding, event);
    }

    let mut heard = sounding;
    for event in events.take_while(|e| e.time_seconds <= end) {
        apply(&mut sounding, event);
        for (h, s) in heard.iter_mut().zip(sounding) {
            *h |= s;
        }
    }

    if heard.iter().filter(|&&h| h).count() < MIN_CHORD_PITCH_CLASSES {
        return None;
    }
    heard
        .iter()
        .position(|&h| h)
        .map(|pc| NoteName::from_pitch_class(pc as u8))
}

fn apply(sounding: &mut [bool; SEMITONES], event: &MidiEvent) {
    if let Some((note, _)) = event.note_on() {
        sounding[usize::from(note) % SEMITONES] = true;
    } else if let Some(note) = event.note_off() {
        sounding[usize::from(note) % SEMITONES] = false;
    }
}
