//! Unit conversion utilities.
//!
//! The document model measures lengths in device-independent pixels
//! (1/96 inch). Persisted formats use points, half-points and twips.

/// Twips per device-independent pixel (1440 twips per inch / 96 px per inch).
pub const TWIPS_PER_PX: f32 = 15.0;

/// Half-points per device-independent pixel (2 × 72 / 96).
pub const HALF_POINTS_PER_PX: f32 = 1.5;

/// Line-spacing unit of both RTF (`\sl` with `\slmult1`) and WordprocessingML
/// (`w:line` with `lineRule="auto"`): 240ths of a single line.
pub const LINE_UNITS: f32 = 240.0;

#[inline]
pub fn px_to_half_points(px: f32) -> i32 {
    (px * HALF_POINTS_PER_PX).round() as i32
}

#[inline]
pub fn half_points_to_px(half_points: i32) -> f32 {
    half_points as f32 / HALF_POINTS_PER_PX
}

#[inline]
pub fn px_to_twips(px: f32) -> i32 {
    (px * TWIPS_PER_PX).round() as i32
}

#[inline]
pub fn twips_to_px(twips: i32) -> f32 {
    twips as f32 / TWIPS_PER_PX
}

/// Encode a line-spacing multiplier as 240ths of a line.
#[inline]
pub fn factor_to_line_units(factor: f32) -> i32 {
    (LINE_UNITS * factor).round() as i32
}

/// Decode 240ths of a line into a multiplier.
///
/// Returns `None` for non-positive values. Multipliers below single spacing
/// are raised to 1.0.
#[inline]
pub fn line_units_to_factor(units: i32) -> Option<f32> {
    (units > 0).then(|| (units as f32 / LINE_UNITS).max(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_points() {
        assert_eq!(px_to_half_points(14.0), 21);
        assert_eq!(px_to_half_points(16.0), 24);
        assert!((half_points_to_px(24) - 16.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_line_units() {
        assert_eq!(factor_to_line_units(1.15), 276);
        assert_eq!(line_units_to_factor(360), Some(1.5));
        assert_eq!(line_units_to_factor(120), Some(1.0));
        assert_eq!(line_units_to_factor(0), None);
    }

    #[test]
    fn test_twips() {
        assert_eq!(px_to_twips(40.0), 600);
        assert!((twips_to_px(1440) - 96.0).abs() < f32::EPSILON);
    }
}
