//! Length units used by the editor
//!
//! Scene geometry lives in world units. Furniture dimensions are entered and
//! displayed in millimetres, with one world unit spanning 320 mm.

/// Millimetres per world unit.
pub const MM_PER_UNIT: f32 = 320.0;

/// Tolerance used when comparing edited values against committed ones.
pub const FLOAT_EPSILON: f32 = 1e-5;

/// Converts a length in millimetres to world units.
pub fn mm_to_units(mm: f32) -> f32 {
    mm / MM_PER_UNIT
}

/// Converts a length in world units to millimetres.
pub fn units_to_mm(units: f32) -> f32 {
    units * MM_PER_UNIT
}

/// Epsilon comparison for scalar edits.
pub fn float_equal(a: f32, b: f32) -> bool {
    (a - b).abs() < FLOAT_EPSILON
}

/// Component-wise [`float_equal`] for vectors.
pub fn vec3_equal(a: cgmath::Vector3<f32>, b: cgmath::Vector3<f32>) -> bool {
    float_equal(a.x, b.x) && float_equal(a.y, b.y) && float_equal(a.z, b.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::Vector3;

    #[test]
    fn test_mm_conversion() {
        assert_relative_eq!(mm_to_units(320.0), 1.0);
        assert_relative_eq!(units_to_mm(2.5), 800.0);
        assert_relative_eq!(units_to_mm(mm_to_units(1837.0)), 1837.0, epsilon = 1e-3);
    }

    #[test]
    fn test_float_equal_uses_tolerance() {
        assert!(float_equal(0.1 + 0.2, 0.3));
        assert!(!float_equal(1.0, 1.001));
        assert!(vec3_equal(
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(1.0 + 1e-7, 2.0, 3.0 - 1e-7)
        ));
        assert!(!vec3_equal(Vector3::new(1.0, 2.0, 3.0), Vector3::new(1.0, 2.1, 3.0)));
    }
}
