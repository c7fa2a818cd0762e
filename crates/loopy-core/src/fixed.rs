use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
///
/// Fill levels, signal magnitudes and distances travelled are all stored in
/// this type so that trajectories are bit-identical across platforms.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Lower bound of a node's fill level.
pub const FILL_MIN: Fixed64 = Fixed64::from_bits(-(1i64 << 32));

/// Upper bound of a node's fill level.
pub const FILL_MAX: Fixed64 = Fixed64::from_bits(1i64 << 32);

/// Convert an f64 to Fixed64. Use only at the configuration boundary.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    if v.is_nan() {
        return Fixed64::ZERO;
    }
    Fixed64::saturating_from_num(v)
}

/// Convert Fixed64 to f64. Use only for display and host-facing queries.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Clamp a value into the fill domain `[-1, 1]`.
#[inline]
pub fn clamp_fill(v: Fixed64) -> Fixed64 {
    v.clamp(FILL_MIN, FILL_MAX)
}

/// Checked division that returns None on a zero divisor or overflow.
#[inline]
pub fn checked_div_64(a: Fixed64, b: Fixed64) -> Option<Fixed64> {
    a.checked_div(b)
}

/// Divide `a` by `b`, saturating toward the sign of the quotient when the
/// result does not fit. A zero divisor yields zero.
#[inline]
pub fn saturating_div_64(a: Fixed64, b: Fixed64) -> Fixed64 {
    if b == Fixed64::ZERO {
        return Fixed64::ZERO;
    }
    match checked_div_64(a, b) {
        Some(q) => q,
        None if (a < Fixed64::ZERO) == (b < Fixed64::ZERO) => Fixed64::MAX,
        None => Fixed64::MIN,
    }
}
