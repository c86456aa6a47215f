//! Link handles.
//!
//! The bus daemon refers to a link by an opaque positive integer derived
//! from the device address: the 31-multiplier string hash shifted right by
//! one as an unsigned value. [`preferred_handle`] computes it so both sides
//! agree on handles without a round trip.

/// `0` is never handed out; it means "no link".
pub const NO_HANDLE: i32 = 0;

/// `h = 31 * h + unit` over the UTF-16 code units of `s`, wrapping.
pub fn string_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32))
}

/// Preferred handle for a device address. Empty addresses map to [`NO_HANDLE`].
pub fn preferred_handle(address: &str) -> i32 {
    if address.is_empty() {
        return NO_HANDLE;
    }
    ((string_hash(address) as u32) >> 1) as i32
}
