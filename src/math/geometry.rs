//! Geometric helpers built on nalgebra.

use nalgebra::Vector3;

/// Squared length under which a limb segment counts as zero-length.
const MIN_SEGMENT_NORM_SQUARED: f64 = 1e-18;

/// Interior angle at `b` between rays `b→a` and `b→c`, in degrees.
///
/// Uses `atan2(|u × v|, u · v)`, which stays accurate near 0° and 180°
/// where an `acos` of the normalized dot product loses precision.
/// The result lies in `[0, 180]`.
///
/// Returns `None` if either ray has zero length.
///
/// # Example
///
/// ```
/// use motion_match::math::interior_angle_degrees;
/// use nalgebra::Vector3;
///
/// let a = Vector3::new(1.0, 0.0, 0.0);
/// let b = Vector3::zeros();
/// let c = Vector3::new(0.0, 1.0, 0.0);
/// let angle = interior_angle_degrees(&a, &b, &c).unwrap();
/// assert!((angle - 90.0).abs() < 1e-9);
/// ```
#[must_use]
pub fn interior_angle_degrees(
    a: &Vector3<f64>,
    b: &Vector3<f64>,
    c: &Vector3<f64>,
) -> Option<f64> {
    let u = a - b;
    let v = c - b;
    if u.norm_squared() < MIN_SEGMENT_NORM_SQUARED || v.norm_squared() < MIN_SEGMENT_NORM_SQUARED {
        return None;
    }

    let cross = u.cross(&v).norm();
    let dot = u.dot(&v);
    Some(cross.atan2(dot).to_degrees().clamp(0.0, 180.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_right_angle() {
        let angle = interior_angle_degrees(
            &Vector3::new(0.0, 2.0, 0.0),
            &Vector3::new(0.0, 0.0, 0.0),
            &Vector3::new(3.0, 0.0, 0.0),
        )
        .unwrap();
        assert_relative_eq!(angle, 90.0, epsilon = 1e-10);
    }

    #[test]
    fn test_straight_and_folded() {
        let b = Vector3::new(1.0, 1.0, 0.0);
        let straight = interior_angle_degrees(
            &Vector3::new(0.0, 1.0, 0.0),
            &b,
            &Vector3::new(2.0, 1.0, 0.0),
        )
        .unwrap();
        assert_relative_eq!(straight, 180.0, epsilon = 1e-10);

        let folded = interior_angle_degrees(
            &Vector3::new(2.0, 1.0, 0.0),
            &b,
            &Vector3::new(3.0, 1.0, 0.0),
        )
        .unwrap();
        assert_relative_eq!(folded, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_orientation_independent() {
        let a = Vector3::new(1.0, 0.0, 0.0);
        let b = Vector3::zeros();
        let c = Vector3::new(1.0, 1.0, 0.0);
        let ccw = interior_angle_degrees(&a, &b, &c).unwrap();
        let cw = interior_angle_degrees(&c, &b, &a).unwrap();
        assert_relative_eq!(ccw, 45.0, epsilon = 1e-10);
        assert_relative_eq!(ccw, cw, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_length_ray() {
        let b = Vector3::new(0.5, 0.5, 0.0);
        assert!(interior_angle_degrees(&b, &b, &Vector3::zeros()).is_none());
        assert!(interior_angle_degrees(&Vector3::zeros(), &b, &b).is_none());
    }
}
