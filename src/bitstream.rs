use crate::helper::{lsb, mask};

/// A fixed array of 64-bit words addressed as one contiguous bit stream.
///
/// Bit `i` of the stream is bit `i % 64` of word `i / 64` (LSB first), which
/// is the persisted wire layout. Cursors are absolute bit offsets owned by
/// the caller; capacity checks also belong to the caller — every write here
/// assumes the target range is in bounds and currently zero.
#[derive(Debug, Clone)]
pub struct Bits {
    words: Vec<u64>,
}

impl Bits {
    pub fn zeroed(nwords: usize) -> Self {
        Self {
            words: vec![0; nwords],
        }
    }

    pub fn from_words(words: Vec<u64>) -> Self {
        Self { words }
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// ORs the low `nbits` of `data` into the stream at `*bit`, splitting
    /// across the word boundary when needed, and advances the cursor.
    pub fn write(&mut self, bit: &mut u64, data: u64, nbits: u8) {
        debug_assert!(nbits <= 64);
        if nbits == 0 {
            return;
        }
        let data = lsb(data, nbits);
        let word = (*bit / 64) as usize;
        let lbit = (*bit % 64) as u8;
        let available = 64 - lbit;

        self.words[word] |= data << lbit;
        if available < nbits {
            self.words[word + 1] |= data >> available;
        }
        *bit += nbits as u64;
    }

    /// Reads `nbits` at `*bit` as an unsigned value and advances the cursor.
    pub fn read(&self, bit: &mut u64, nbits: u8) -> u64 {
        debug_assert!(nbits <= 64);
        if nbits == 0 {
            return 0;
        }
        let word = (*bit / 64) as usize;
        let lbit = (*bit % 64) as u8;
        let available = 64 - lbit;

        let out = if available >= nbits {
            lsb(self.words[word] >> lbit, nbits)
        } else {
            let left = nbits - available;
            (self.words[word] >> lbit) | (lsb(self.words[word + 1], left) << available)
        };
        *bit += nbits as u64;
        out
    }

    /// Tests the single bit at `*bit` and advances the cursor by one.
    pub fn bit_on(&self, bit: &mut u64) -> bool {
        let on = self.words[(*bit / 64) as usize] & (1_u64 << (*bit % 64)) != 0;
        *bit += 1;
        on
    }

    /// Zeroes the bit range `[from, to)`. Used to roll back a partial append.
    pub fn clear(&mut self, from: u64, to: u64) {
        debug_assert!(from <= to);
        let mut pos = from;
        while pos < to {
            let word = (pos / 64) as usize;
            let lbit = (pos % 64) as u8;
            let n = ((64 - lbit) as u64).min(to - pos) as u8;
            self.words[word] &= !(mask(n) << lbit);
            pos += n as u64;
        }
    }
}
