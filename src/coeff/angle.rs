use std::f64::consts::{PI, TAU};

/// Wrap an angle into the canonical range `[-π, π)`
///
/// Non-finite input is returned unchanged.
#[inline]
pub fn wrap_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return angle;
    }
    let wrapped = angle - TAU * ((angle + PI) / TAU).floor();
    // floor() rounding may land exactly on π for inputs just below it
    if wrapped >= PI { wrapped - TAU } else { wrapped }
}

/// Signed shortest-arc displacement going from `from` to `to`, in `[-π, π)`
#[inline]
pub fn shortest_arc(from: f64, to: f64) -> f64 {
    wrap_angle(to - from)
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    #[test]
    fn wrap_keeps_canonical_values() {
        for &x in &[-PI, -1.0, 0.0, 0.5, PI - 1e-9] {
            assert_abs_diff_eq!(wrap_angle(x), x, epsilon = 1e-12);
        }
    }

    #[test]
    fn wrap_maps_pi_to_minus_pi() {
        assert_abs_diff_eq!(wrap_angle(PI), -PI, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_angle(3.0 * PI), -PI, epsilon = 1e-12);
    }

    #[test]
    fn wrap_removes_full_turns() {
        assert_abs_diff_eq!(wrap_angle(0.3 + 4.0 * TAU), 0.3, epsilon = 1e-9);
        assert_abs_diff_eq!(wrap_angle(-0.3 - 7.0 * TAU), -0.3, epsilon = 1e-9);
    }

    #[test]
    fn wrap_passes_non_finite() {
        assert!(wrap_angle(f64::NAN).is_nan());
        assert_eq!(wrap_angle(f64::INFINITY), f64::INFINITY);
    }

    #[test]
    fn shortest_arc_crosses_the_seam() {
        // 179° to -179° is a 2° step forward, not 358° back
        let from = 179.0_f64.to_radians();
        let to = -179.0_f64.to_radians();
        assert_abs_diff_eq!(shortest_arc(from, to), 2.0_f64.to_radians(), epsilon = 1e-12);
        assert_abs_diff_eq!(shortest_arc(to, from), -2.0_f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn shortest_arc_is_plain_difference_near_zero() {
        assert_abs_diff_eq!(shortest_arc(0.1, 0.4), 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(shortest_arc(0.4, 0.1), -0.3, epsilon = 1e-12);
    }
}
