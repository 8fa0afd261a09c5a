//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Floor a f64 and clamp it to the u32 range, returning 0 for non-finite values.
#[must_use]
pub fn floor_f64_to_u32(value: f64) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    let max = f64::from(u32::MAX);
    let clamped = value.clamp(0.0, max).floor();
    cast::<f64, u32>(clamped).unwrap_or(0)
}

/// Convert a count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Scale `amount` by `fraction` and round down, e.g. the credited share of a
/// repeated discovery.
#[must_use]
pub fn scale_floor(amount: u32, fraction: f64) -> u32 {
    floor_f64_to_u32(f64::from(amount) * fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_handles_non_finite_and_negative() {
        assert_eq!(floor_f64_to_u32(f64::NAN), 0);
        assert_eq!(floor_f64_to_u32(f64::INFINITY), 0);
        assert_eq!(floor_f64_to_u32(-3.5), 0);
        assert_eq!(floor_f64_to_u32(4.99), 4);
        assert_eq!(floor_f64_to_u32(f64::from(u32::MAX) * 2.0), u32::MAX);
    }

    #[test]
    fn scale_floor_rounds_down() {
        assert_eq!(scale_floor(40, 0.10), 4);
        assert_eq!(scale_floor(95, 0.10), 9);
        assert_eq!(scale_floor(7, 0.0), 0);
    }

    #[test]
    fn counts_convert() {
        assert!((usize_to_f64(3) - 3.0).abs() < f64::EPSILON);
    }
}
