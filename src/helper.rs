/// The low `nbits` bits set. `mask(64)` is all ones.
pub(crate) fn mask(nbits: u8) -> u64 {
    if nbits >= 64 {
        u64::MAX
    } else {
        (1_u64 << nbits) - 1
    }
}

/// Clears everything above the low `nbits` bits of `x`.
pub(crate) fn lsb(x: u64, nbits: u8) -> u64 {
    x & mask(nbits)
}

/// Narrows a signed value to its `nbits`-bit two's-complement representation,
/// with the remaining high bits cleared. Lossless only when `in_range(x, nbits)`.
pub(crate) fn to_bin(x: i64, nbits: u8) -> u64 {
    lsb(x as u64, nbits)
}

/// Widens an `nbits`-bit two's-complement payload back to a signed value.
pub(crate) fn from_bin(bin: u64, nbits: u8) -> i64 {
    if nbits >= 64 {
        return bin as i64;
    }
    if bin & (1_u64 << (nbits - 1)) == 0 {
        bin as i64
    } else {
        bin as i64 - (1_i64 << nbits)
    }
}

/// Whether `x` fits in `nbits` bits of two's complement,
/// i.e. is in `[-(2^(nbits-1)), 2^(nbits-1) - 1]`.
pub(crate) fn in_range(x: i64, nbits: u8) -> bool {
    x >= -(1_i64 << (nbits - 1)) && x <= (1_i64 << (nbits - 1)) - 1
}
