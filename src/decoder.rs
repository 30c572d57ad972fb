//! Stream Decoder
//!
//! Decodes a complete Standard MIDI File buffer into a [`MidiFile`]. Any
//! malformation aborts the whole decode; no partial file is ever returned.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::byte_reader::ByteReader;
use crate::event::{EventKind, MidiEvent, MidiFile, MidiHeader, MidiTrack, Timing, DEFAULT_TEMPO_BPM};

const HEADER_MAGIC: &[u8; 4] = b"MThd";
const TRACK_MAGIC: &[u8; 4] = b"MTrk";
const HEADER_LENGTH: u32 = 6;
const HEADER_CHUNK_SIZE: usize = 14;

/// SMPTE frame rates a timecode division may name; 29 stands for 29.97 drop-frame.
const SMPTE_FRAME_RATES: [u8; 4] = [24, 25, 29, 30];

const META_TRACK_NAME: u8 = 0x03;
const META_TEMPO: u8 = 0x51;

/// Errors returned while decoding a Standard MIDI File.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The buffer cannot even hold the 14-byte header chunk.
    #[error("file too small for a MIDI header: {0} bytes")]
    TooShort(usize),

    /// A chunk did not start with the expected four-byte tag.
    #[error("expected `{expected}` chunk at offset {offset}, found {found:02X?}")]
    BadMagic {
        /// Tag that should have been there.
        expected: &'static str,
        /// Bytes that were there instead.
        found: [u8; 4],
        /// Offset of the chunk.
        offset: usize,
    },

    /// The header chunk declared a length other than 6.
    #[error("invalid MIDI header length {0}, expected 6")]
    BadHeaderLength(u32),

    /// Format numbers above 2 are not defined.
    #[error("unsupported MIDI format {0}")]
    UnsupportedFormat(u16),

    /// Division of zero ticks, or a timecode division naming an unknown frame rate.
    #[error("invalid time division {0:#06X}")]
    InvalidDivision(u16),

    /// The header promised more tracks than the buffer holds.
    #[error("header declares {expected} tracks but only {found} are present")]
    MissingTrack {
        /// Track count from the header.
        expected: u16,
        /// Tracks decoded before the buffer ran out.
        found: u16,
    },

    /// A track chunk's length runs past the end of the buffer.
    #[error("track {track} declares {length} bytes but only {available} remain")]
    TrackOutOfBounds {
        /// Zero-based track index.
        track: u16,
        /// Declared chunk length.
        length: u32,
        /// Bytes left in the buffer.
        available: usize,
    },

    /// A read ran past the end of the enclosing chunk.
    #[error("unexpected end of data at offset {offset} (needed {needed} bytes)")]
    Truncated {
        /// Absolute offset of the failed read.
        offset: usize,
        /// Bytes the read required.
        needed: usize,
    },

    /// A variable-length quantity used more than four bytes.
    #[error("variable-length quantity at offset {offset} exceeds four bytes")]
    InvalidVarLen {
        /// Absolute offset of the first byte.
        offset: usize,
    },

    /// A data byte appeared where a status byte was required and no running status was set.
    #[error("data byte at offset {offset} with no running status")]
    MissingRunningStatus {
        /// Absolute offset of the data byte.
        offset: usize,
    },

    /// Wraps a failure inside a specific track.
    #[error("failed to parse track {index}: {source}")]
    Track {
        /// Zero-based track index.
        index: u16,
        /// Underlying failure.
        #[source]
        source: Box<FormatError>,
    },
}

/// Errors returned when decoding from the filesystem.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The file was read but is not a valid Standard MIDI File.
    #[error("invalid MIDI file {path}: {source}")]
    Format {
        /// File that was being decoded.
        path: PathBuf,
        /// Underlying decode failure.
        #[source]
        source: FormatError,
    },
}

/// Convert a tick delta to seconds at a metrical division and tempo.
///
/// `seconds_per_tick = (60 / tempo_bpm) / division`
pub fn ticks_to_seconds(ticks: u32, division: u16, tempo_bpm: f64) -> f64 {
    Timing::Metrical {
        ticks_per_quarter: division,
    }
    .seconds_per_tick(tempo_bpm)
        * f64::from(ticks)
}

/// Decode an in-memory Standard MIDI File.
pub fn decode(bytes: &[u8]) -> Result<MidiFile, FormatError> {
    let mut reader = ByteReader::new(bytes);
    let header = read_header(&mut reader)?;
    let timing = header.timing();

    let mut tracks = Vec::with_capacity(usize::from(header.track_count));
    let mut tempo_bpm = DEFAULT_TEMPO_BPM;

    for index in 0..header.track_count {
        if reader.is_empty() {
            return Err(FormatError::MissingTrack {
                expected: header.track_count,
                found: index,
            });
        }
        let track = read_track(&mut reader, index, timing).map_err(|e| match e {
            e @ (FormatError::TrackOutOfBounds { .. } | FormatError::BadMagic { .. }) => e,
            other => FormatError::Track {
                index,
                source: Box::new(other),
            },
        })?;

        if index == 0 {
            if let Some(bpm) = track.events.iter().find_map(|e| match e.kind {
                EventKind::Tempo { bpm, .. } => Some(bpm),
                _ => None,
            }) {
                tempo_bpm = bpm;
            }
        }
        tracks.push(track);
    }

    if !reader.is_empty() {
        warn!(
            bytes = reader.remaining(),
            "ignoring trailing data after the last declared track"
        );
    }

    debug!(
        format = header.format,
        tracks = tracks.len(),
        division = header.division,
        tempo_bpm,
        "decoded MIDI file"
    );

    Ok(MidiFile {
        header,
        tracks,
        tempo_bpm,
        source_path: None,
    })
}

/// Decode an in-memory buffer and remember where it came from.
pub fn decode_with_path(bytes: &[u8], path: impl Into<PathBuf>) -> Result<MidiFile, FormatError> {
    let mut file = decode(bytes)?;
    file.source_path = Some(path.into());
    Ok(file)
}

/// Read and decode a file from disk.
pub fn read_file(path: impl AsRef<Path>) -> Result<MidiFile, LoadError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_with_path(&bytes, path).map_err(|source| LoadError::Format {
        path: path.to_path_buf(),
        source,
    })
}

fn expect_magic(reader: &mut ByteReader<'_>, magic: &'static [u8; 4]) -> Result<(), FormatError> {
    let offset = reader.position();
    let tag = reader.take(4)?;
    if tag != magic {
        let mut found = [0u8; 4];
        found.copy_from_slice(tag);
        return Err(FormatError::BadMagic {
            expected: std::str::from_utf8(magic).unwrap_or("????"),
            found,
            offset,
        });
    }
    Ok(())
}

fn read_header(reader: &mut ByteReader<'_>) -> Result<MidiHeader, FormatError> {
    if reader.remaining() < HEADER_CHUNK_SIZE {
        return Err(FormatError::TooShort(reader.remaining()));
    }
    expect_magic(reader, HEADER_MAGIC)?;

    let length = reader.read_u32()?;
    if length != HEADER_LENGTH {
        return Err(FormatError::BadHeaderLength(length));
    }

    let format = reader.read_u16()?;
    if format > 2 {
        return Err(FormatError::UnsupportedFormat(format));
    }
    let track_count = reader.read_u16()?;
    let division = reader.read_u16()?;

    let header = MidiHeader {
        format,
        track_count,
        division,
    };
    let valid = match header.timing() {
        Timing::Metrical { ticks_per_quarter } => ticks_per_quarter > 0,
        Timing::Timecode {
            frames_per_second,
            ticks_per_frame,
        } => ticks_per_frame > 0 && SMPTE_FRAME_RATES.contains(&frames_per_second),
    };
    if !valid {
        return Err(FormatError::InvalidDivision(division));
    }
    Ok(header)
}

fn read_track(
    reader: &mut ByteReader<'_>,
    index: u16,
    timing: Timing,
) -> Result<MidiTrack, FormatError> {
    if reader.remaining() < 8 {
        return Err(FormatError::Truncated {
            offset: reader.position(),
            needed: 8,
        });
    }
    expect_magic(reader, TRACK_MAGIC)?;

    let length = reader.read_u32()?;
    let available = reader.remaining();
    if length as usize > available {
        return Err(FormatError::TrackOutOfBounds {
            track: index,
            length,
            available,
        });
    }
    let mut chunk = reader.sub_reader(length as usize)?;

    let mut track = MidiTrack::default();
    let mut tick: u64 = 0;
    let mut time_seconds = 0.0;
    let mut tempo_bpm = DEFAULT_TEMPO_BPM;
    let mut running_status: Option<u8> = None;

    while !chunk.is_empty() {
        let delta = chunk.read_varlen()?;
        tick += u64::from(delta);
        time_seconds += timing.seconds_per_tick(tempo_bpm) * f64::from(delta);

        let mut status = chunk.read_u8()?;
        if status & 0x80 == 0 {
            // Running status: this byte is the first data byte.
            let offset = chunk.position() - 1;
            chunk.rewind(1);
            status = running_status.ok_or(FormatError::MissingRunningStatus { offset })?;
        } else if status < 0xF0 {
            running_status = Some(status);
        }

        let channel = status & 0x0F;
        let kind = match status & 0xF0 {
            0x80 => {
                let note = chunk.read_u8()?;
                let velocity = chunk.read_u8()?;
                Some(EventKind::NoteOff {
                    channel,
                    note,
                    velocity,
                })
            }
            0x90 => {
                let note = chunk.read_u8()?;
                let velocity = chunk.read_u8()?;
                if velocity == 0 {
                    Some(EventKind::NoteOff {
                        channel,
                        note,
                        velocity,
                    })
                } else {
                    Some(EventKind::NoteOn {
                        channel,
                        note,
                        velocity,
                    })
                }
            }
            0xB0 => {
                let controller = chunk.read_u8()?;
                let value = chunk.read_u8()?;
                Some(EventKind::ControlChange {
                    channel,
                    controller,
                    value,
                })
            }
            0xC0 => {
                let program = chunk.read_u8()?;
                Some(EventKind::ProgramChange { channel, program })
            }
            0xA0 | 0xE0 => {
                chunk.skip(2)?;
                Some(EventKind::Unknown { status })
            }
            0xD0 => {
                chunk.skip(1)?;
                Some(EventKind::Unknown { status })
            }
            _ if status == 0xFF => read_meta(&mut chunk, &mut tempo_bpm, &mut track)?,
            _ => {
                // System exclusive (F0/F7) and other system statuses carry a
                // length-prefixed payload.
                let length = chunk.read_varlen()?;
                chunk.skip(length as usize)?;
                None
            }
        };

        if let Some(kind) = kind {
            track.events.push(MidiEvent {
                tick,
                time_seconds,
                kind,
            });
        }
    }

    trace!(
        track = index,
        events = track.events.len(),
        name = track.name.as_deref().unwrap_or(""),
        "decoded track"
    );
    Ok(track)
}

/// Decode a meta event body. Tempo changes take effect for every later delta
/// in the same track.
fn read_meta(
    chunk: &mut ByteReader<'_>,
    tempo_bpm: &mut f64,
    track: &mut MidiTrack,
) -> Result<Option<EventKind>, FormatError> {
    let meta_type = chunk.read_u8()?;
    let length = chunk.read_varlen()?;
    let payload = chunk.take(length as usize)?;

    match meta_type {
        META_TEMPO if payload.len() == 3 => {
            let micros_per_quarter =
                (u32::from(payload[0]) << 16) | (u32::from(payload[1]) << 8) | u32::from(payload[2]);
            if micros_per_quarter == 0 {
                warn!(offset = chunk.position(), "ignoring zero-length tempo");
                return Ok(None);
            }
            let bpm = 60_000_000.0 / f64::from(micros_per_quarter);
            *tempo_bpm = bpm;
            Ok(Some(EventKind::Tempo {
                micros_per_quarter,
                bpm,
            }))
        }
        META_TRACK_NAME => {
            let name = String::from_utf8_lossy(payload).into_owned();
            track.name = Some(name.clone());
            Ok(Some(EventKind::TrackName(name)))
        }
        _ => Ok(None),
    }
}
