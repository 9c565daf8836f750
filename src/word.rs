//! 16-bit word primitives.
//!
//! Every value the machine touches is a `u16`. Arithmetic wraps modulo
//! 2^16, and narrower immediate fields are widened with [`sign_extend`]
//! before they take part in any address or value computation.

/// Sign-extend the low `bit_count` bits of `value` to a full 16-bit word.
///
/// The field is read as a `bit_count`-bit two's-complement number: if its
/// sign bit (bit `bit_count - 1`) is set, every bit above it becomes 1.
/// Bits of `value` above the field are ignored.
///
/// # Panics
/// Panics if `bit_count` is not in `1..=16`.
#[inline]
pub fn sign_extend(value: u16, bit_count: u32) -> u16 {
    assert!(
        (1..=16).contains(&bit_count),
        "field width {} out of range (1-16)",
        bit_count
    );
    if bit_count == 16 {
        return value;
    }
    let mask = (1u16 << bit_count) - 1;
    let field = value & mask;
    if (field >> (bit_count - 1)) & 1 == 1 {
        field | !mask
    } else {
        field
    }
}

/// Extract bits `[hi:lo]` (inclusive) of `word`, right-aligned.
#[inline]
pub fn field(word: u16, hi: u32, lo: u32) -> u16 {
    debug_assert!(hi < 16 && lo <= hi);
    let width = hi - lo + 1;
    let mask = if width == 16 { u16::MAX } else { (1u16 << width) - 1 };
    (word >> lo) & mask
}

/// True if bit 15 of `word` is set.
#[inline]
pub fn is_negative(word: u16) -> bool {
    word & 0x8000 != 0
}
