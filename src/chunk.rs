//! Gorilla-style compressed chunk of `(timestamp, f64)` samples.
//!
//! Timestamps are delta-of-delta coded, values are XOR coded, both into one
//! fixed-capacity bit stream (see [`crate::bitstream`]). The first sample is
//! held verbatim in chunk fields outside the stream.
//!
//! # Timestamp layout
//!
//! The delta-of-delta `dd = delta - prev_delta` is written as a unary run of
//! set bits selecting a bucket, a terminating unset bit, then a
//! two's-complement payload. Control codes are LSB first on the wire:
//!
//! - `0`: dd = 0, no payload
//! - `10` + 5 bits: dd in [-16, 15]
//! - `110` + 8 bits: [-128, 127]
//! - `1110` + 11 bits: [-1024, 1023]
//! - `11110` + 15 bits: [-16384, 16383]
//! - `111110` + 32 bits: [-2^31, 2^31-1]
//! - `111111` + 64 bits: raw two's complement, no terminator
//!
//! # Value layout
//!
//! `xor = bits(value) ^ bits(prev)`. A zero xor is a single unset bit. Else a
//! set bit, then either an unset bit and the xor block in the previous
//! sample's window (when the new leading/trailing runs still cover it and a
//! fresh header would not pay for itself), or a set bit, 5 bits of leading
//! (clamped to 31), 6 bits of block size minus one, and the block itself.

use crate::bitstream::Bits;
use crate::error::Error;
use crate::helper::{from_bin, in_range, to_bin};
use bytes::{Buf, BufMut, Bytes, BytesMut};

type Result<T> = std::result::Result<T, Error>;

/// Delta-of-delta buckets: (control code, control bits, payload bits).
/// Control codes are written LSB first, so 0x01 over 2 bits is `10` on the wire.
const DOD_BUCKETS: [(u64, u8, u8); 5] = [
    (0x01, 2, 5),
    (0x03, 3, 8),
    (0x07, 4, 11),
    (0x0f, 5, 15),
    (0x1f, 6, 32),
];
/// Terminal bucket: full 64-bit two's complement, no terminating unset bit.
const DOD_ESCAPE: (u64, u8, u8) = (0x3f, 6, 64);

const VALUE_LEADING_BITS: u8 = 5;
const VALUE_BLOCK_BITS: u8 = 6;
/// Block size is in [1, 64] and is stored biased by one to fit 6 bits.
const VALUE_BLOCK_ADJUST: u8 = 1;
/// Leading-zero counts are clamped to fit the 5-bit field.
const MAX_LEADING: u8 = 31;

/// Serialized header: capacity, count, cursor, base ts, base value, prev ts,
/// prev delta, prev value (8 x u64/i64) plus prev leading/trailing (2 x u8).
const HEADER_LEN: usize = 8 * 8 + 2;

fn words_for(size: usize) -> usize {
    (size + 7) / 8
}

/// An append-only chunk of Gorilla-compressed samples with a capacity fixed
/// at creation. When an append no longer fits it fails with
/// [`Error::CapacityExceeded`] and leaves the chunk untouched; rotating to a
/// new chunk is the caller's job.
#[derive(Debug, Clone)]
pub struct CompressedChunk {
    /// Capacity of the bit stream in bytes.
    size: usize,
    count: u64,
    base_ts: u64,
    base_value: f64,
    bits: Bits,
    /// Write cursor, in bits. Never exceeds `size * 8`.
    idx: u64,
    prev_ts: u64,
    prev_delta: i64,
    /// IEEE-754 bit pattern of the last appended value.
    prev_value: u64,
    prev_leading: u8,
    prev_trailing: u8,
}

impl CompressedChunk {
    /// Creates an empty chunk whose bit stream holds at most `size` bytes.
    pub fn with_capacity(size: usize) -> Self {
        Self {
            size,
            count: 0,
            base_ts: 0,
            base_value: 0.0,
            bits: Bits::zeroed(words_for(size)),
            idx: 0,
            prev_ts: 0,
            prev_delta: 0,
            prev_value: 0,
            prev_leading: 0,
            prev_trailing: 0,
        }
    }

    pub fn num_samples(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Capacity of the bit stream in bytes, as given at creation.
    pub fn capacity(&self) -> usize {
        self.size
    }

    /// Bits of the stream consumed so far.
    pub fn bits_used(&self) -> u64 {
        self.idx
    }

    /// Appends a sample. All-or-nothing: on [`Error::CapacityExceeded`] the
    /// chunk is byte-for-byte and field-for-field what it was before the call.
    ///
    /// # Panics
    ///
    /// Panics if `timestamp` is lower than the previously appended one;
    /// monotonicity is the caller's contract.
    pub fn append(&mut self, timestamp: u64, value: f64) -> Result<()> {
        if self.count == 0 {
            self.base_ts = timestamp;
            self.base_value = value;
            self.prev_ts = timestamp;
            self.prev_delta = 0;
            self.prev_value = value.to_bits();
        } else {
            let snap_idx = self.idx;
            let snap_ts = self.prev_ts;
            let snap_delta = self.prev_delta;
            let res = self
                .append_integer(timestamp)
                .and_then(|_| self.append_float(value));
            if let Err(e) = res {
                // The float encoder's window state is only mutated after its
                // space check has passed, so these three fields plus zeroing
                // the partially written bits restore the chunk exactly.
                self.bits.clear(snap_idx, self.idx);
                self.idx = snap_idx;
                self.prev_ts = snap_ts;
                self.prev_delta = snap_delta;
                return Err(e);
            }
        }
        self.count += 1;
        Ok(())
    }

    /// Whether `nbits` more bits fit before capacity.
    fn check_space(&self, nbits: u64) -> Result<()> {
        if nbits <= self.size as u64 * 8 - self.idx {
            Ok(())
        } else {
            Err(Error::CapacityExceeded)
        }
    }

    /// Every space check reserves one extra bit so the value that follows
    /// (and the next append, in the zero-xor case) always has room for its
    /// 1-bit minimum encoding.
    fn append_integer(&mut self, timestamp: u64) -> Result<()> {
        assert!(
            timestamp >= self.prev_ts,
            "non-monotonic timestamp: {timestamp} < {}",
            self.prev_ts
        );
        let delta = timestamp - self.prev_ts;
        let dod = (delta as i64).wrapping_sub(self.prev_delta);

        if dod == 0 {
            self.check_space(1 + 1)?;
            self.bits.write(&mut self.idx, 0x00, 1);
        } else if let Some(&(code, cbits, width)) =
            DOD_BUCKETS.iter().find(|&&(_, _, w)| in_range(dod, w))
        {
            self.check_space(cbits as u64 + width as u64 + 1)?;
            self.bits.write(&mut self.idx, code, cbits);
            self.bits.write(&mut self.idx, to_bin(dod, width), width);
        } else {
            let (code, cbits, width) = DOD_ESCAPE;
            self.check_space(cbits as u64 + width as u64 + 1)?;
            self.bits.write(&mut self.idx, code, cbits);
            self.bits.write(&mut self.idx, dod as u64, width);
        }

        self.prev_delta = delta as i64;
        self.prev_ts = timestamp;
        Ok(())
    }

    fn append_float(&mut self, value: f64) -> Result<()> {
        let xor = value.to_bits() ^ self.prev_value;

        // The integer step reserved one bit; the flag writes need no check.
        if xor == 0 {
            self.bits.write(&mut self.idx, 0, 1);
            return Ok(());
        }
        self.bits.write(&mut self.idx, 1, 1);

        let leading = (xor.leading_zeros() as u8).min(MAX_LEADING);
        let trailing = xor.trailing_zeros() as u8;
        let block = 64 - leading - trailing;
        let prev_block = 64 - self.prev_leading - self.prev_trailing;
        let fresh_size = (VALUE_LEADING_BITS + VALUE_BLOCK_BITS) as u64 + block as u64;

        if leading >= self.prev_leading
            && trailing >= self.prev_trailing
            && fresh_size > prev_block as u64
        {
            self.check_space(prev_block as u64 + 1)?;
            self.bits.write(&mut self.idx, 0, 1);
            self.bits
                .write(&mut self.idx, xor >> self.prev_trailing, prev_block);
        } else {
            self.check_space(fresh_size + 1)?;
            self.bits.write(&mut self.idx, 1, 1);
            self.bits
                .write(&mut self.idx, leading as u64, VALUE_LEADING_BITS);
            self.bits.write(
                &mut self.idx,
                (block - VALUE_BLOCK_ADJUST) as u64,
                VALUE_BLOCK_BITS,
            );
            self.bits.write(&mut self.idx, xor >> trailing, block);
            self.prev_leading = leading;
            self.prev_trailing = trailing;
        }

        self.prev_value = value.to_bits();
        Ok(())
    }

    /// Starts a forward decode pass from the first sample. Any number of
    /// iterators may exist over one chunk; appending requires them dropped.
    pub fn iter(&self) -> ChunkIter<'_> {
        ChunkIter {
            chunk: self,
            idx: 0,
            count: 0,
            prev_ts: 0,
            prev_delta: 0,
            prev_value: 0,
            prev_leading: 0,
            prev_trailing: 0,
        }
    }

    /// Serializes the chunk (header plus word buffer, little endian) into an
    /// opaque byte form suitable for persistence.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.bits.words().len() * 8);
        buf.put_u64_le(self.size as u64);
        buf.put_u64_le(self.count);
        buf.put_u64_le(self.idx);
        buf.put_u64_le(self.base_ts);
        buf.put_u64_le(self.base_value.to_bits());
        buf.put_u64_le(self.prev_ts);
        buf.put_i64_le(self.prev_delta);
        buf.put_u64_le(self.prev_value);
        buf.put_u8(self.prev_leading);
        buf.put_u8(self.prev_trailing);
        for &word in self.bits.words() {
            buf.put_u64_le(word);
        }
        buf.freeze()
    }

    /// Restores a chunk from [`Self::to_bytes`] output. Trailing bytes past
    /// the word buffer are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::Truncated {
                expected: HEADER_LEN,
                actual: bytes.len(),
            });
        }
        let mut b = bytes;
        let size = b.get_u64_le() as usize;
        let count = b.get_u64_le();
        let idx = b.get_u64_le();
        let base_ts = b.get_u64_le();
        let base_value = f64::from_bits(b.get_u64_le());
        let prev_ts = b.get_u64_le();
        let prev_delta = b.get_i64_le();
        let prev_value = b.get_u64_le();
        let prev_leading = b.get_u8();
        let prev_trailing = b.get_u8();

        let nwords = words_for(size);
        let expected = HEADER_LEN + nwords * 8;
        if bytes.len() < expected {
            return Err(Error::Truncated {
                expected,
                actual: bytes.len(),
            });
        }
        // Every sample past the first costs at least two bits, so a cursor
        // shorter than that cannot back the claimed count.
        if idx > size as u64 * 8
            || (count == 0 && idx != 0)
            || (count > 1 && idx / 2 < count - 1)
            || prev_leading as u32 + prev_trailing as u32 > 64
        {
            return Err(Error::InvalidHeader);
        }

        let mut words = Vec::with_capacity(nwords);
        for _ in 0..nwords {
            words.push(b.get_u64_le());
        }

        Ok(Self {
            size,
            count,
            base_ts,
            base_value,
            bits: Bits::from_words(words),
            idx,
            prev_ts,
            prev_delta,
            prev_value,
            prev_leading,
            prev_trailing,
        })
    }
}

/// A forward-only decode cursor over one chunk. Its state mirrors the
/// chunk's encoder state sample by sample; restarting means a new iterator.
#[derive(Debug)]
pub struct ChunkIter<'a> {
    chunk: &'a CompressedChunk,
    /// Read cursor, in bits, independent of the chunk's write cursor.
    idx: u64,
    /// Samples consumed so far.
    count: u64,
    prev_ts: u64,
    prev_delta: i64,
    prev_value: u64,
    prev_leading: u8,
    prev_trailing: u8,
}

impl ChunkIter<'_> {
    /// Decodes the next sample, or `None` once all samples are consumed.
    pub fn read_next(&mut self) -> Option<(u64, f64)> {
        if self.count >= self.chunk.count {
            return None;
        }
        let out = if self.count == 0 {
            self.prev_ts = self.chunk.base_ts;
            self.prev_value = self.chunk.base_value.to_bits();
            (self.chunk.base_ts, self.chunk.base_value)
        } else {
            (self.read_integer(), self.read_float())
        };
        self.count += 1;
        Some(out)
    }

    fn read_integer(&mut self) -> u64 {
        let bits = &self.chunk.bits;

        let dod = if !bits.bit_on(&mut self.idx) {
            0
        } else {
            // Count further set bits; the first unset bit selects the bucket,
            // a full run of five selects the 64-bit escape.
            let mut sel = 0;
            while sel < DOD_BUCKETS.len() && bits.bit_on(&mut self.idx) {
                sel += 1;
            }
            if sel < DOD_BUCKETS.len() {
                let width = DOD_BUCKETS[sel].2;
                from_bin(bits.read(&mut self.idx, width), width)
            } else {
                bits.read(&mut self.idx, DOD_ESCAPE.2) as i64
            }
        };

        self.prev_delta = self.prev_delta.wrapping_add(dod);
        self.prev_ts = self.prev_ts.wrapping_add(self.prev_delta as u64);
        self.prev_ts
    }

    fn read_float(&mut self) -> f64 {
        let bits = &self.chunk.bits;

        if !bits.bit_on(&mut self.idx) {
            return f64::from_bits(self.prev_value);
        }

        let xor = if !bits.bit_on(&mut self.idx) {
            let block = 64 - self.prev_leading - self.prev_trailing;
            bits.read(&mut self.idx, block) << self.prev_trailing
        } else {
            let leading = bits.read(&mut self.idx, VALUE_LEADING_BITS) as u8;
            let block = bits.read(&mut self.idx, VALUE_BLOCK_BITS) as u8 + VALUE_BLOCK_ADJUST;
            let trailing = 64 - leading - block;
            self.prev_leading = leading;
            self.prev_trailing = trailing;
            bits.read(&mut self.idx, block) << trailing
        };

        self.prev_value ^= xor;
        f64::from_bits(self.prev_value)
    }
}

impl Iterator for ChunkIter<'_> {
    type Item = (u64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.chunk.count - self.count) as usize;
        (left, Some(left))
    }
}

impl<'a> IntoIterator for &'a CompressedChunk {
    type Item = (u64, f64);
    type IntoIter = ChunkIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
