//! Byte Reader
//!
//! Big-endian fixed-width and variable-length integer extraction over a
//! borrowed byte buffer with an explicit cursor.

use crate::decoder::FormatError;

/// Largest number of bytes a Standard MIDI File variable-length quantity may use.
const MAX_VARLEN_BYTES: usize = 4;

/// Cursor over an immutable byte slice.
///
/// Every read is bounds-checked; running past the end yields
/// [`FormatError::Truncated`] with the absolute offset of the failed read.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, pos: 0, base: 0 }
    }

    /// Absolute offset of the cursor within the original buffer.
    pub fn position(&self) -> usize {
        self.base + self.pos
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True once every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8, FormatError> {
        let byte = *self.data.get(self.pos).ok_or(FormatError::Truncated {
            offset: self.position(),
            needed: 1,
        })?;
        self.pos += 1;
        Ok(byte)
    }

    /// Read a big-endian 16-bit value.
    pub fn read_u16(&mut self) -> Result<u16, FormatError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Read a big-endian 32-bit value.
    pub fn read_u32(&mut self) -> Result<u32, FormatError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a variable-length quantity: 7 bits per byte, high bit set on every
    /// byte except the last, most significant group first.
    pub fn read_varlen(&mut self) -> Result<u32, FormatError> {
        let start = self.position();
        let mut value: u32 = 0;
        for _ in 0..MAX_VARLEN_BYTES {
            let byte = self.read_u8()?;
            value = (value << 7) | u32::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(FormatError::InvalidVarLen { offset: start })
    }

    /// Borrow the next `len` bytes and advance past them.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], FormatError> {
        if len > self.remaining() {
            return Err(FormatError::Truncated {
                offset: self.position(),
                needed: len,
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Advance past `len` bytes without looking at them.
    pub fn skip(&mut self, len: usize) -> Result<(), FormatError> {
        self.take(len).map(|_| ())
    }

    /// Step the cursor back by `len` bytes, stopping at the start of the buffer.
    pub fn rewind(&mut self, len: usize) {
        self.pos = self.pos.saturating_sub(len);
    }

    /// Split off the next `len` bytes as an independent reader that keeps
    /// reporting absolute offsets.
    pub fn sub_reader(&mut self, len: usize) -> Result<ByteReader<'a>, FormatError> {
        let base = self.position();
        let data = self.take(len)?;
        Ok(ByteReader { data, pos: 0, base })
    }
}
