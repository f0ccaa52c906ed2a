use crate::settings::FLOAT_EPS;
use crate::types::{Quat, Vec2, Vec3};
use std::f32::consts::{FRAC_PI_2, PI};

#[inline]
pub fn is_close(a: f32, b: f32) -> bool {
    (a - b).abs() <= FLOAT_EPS
}

/// Component-wise closeness within `tolerance`.
#[inline]
pub fn is_close_vec3(a: Vec3, b: Vec3, tolerance: f32) -> bool {
    (a - b).iter().all(|c| c.abs() <= tolerance)
}

#[inline]
pub fn is_zero_vec2(v: Vec2) -> bool {
    v.x.abs() <= FLOAT_EPS && v.y.abs() <= FLOAT_EPS
}

#[inline]
pub fn is_zero_vec3(v: Vec3) -> bool {
    v.iter().all(|c| c.abs() <= FLOAT_EPS)
}

/// Sign with zero treated as positive.
#[inline]
pub fn sign(x: f32) -> f32 {
    if x >= 0.0 { 1.0 } else { -1.0 }
}

/// Unsigned angle between two planar vectors; zero if either is zero.
pub fn angle_between_2d(a: Vec2, b: Vec2) -> f32 {
    if is_zero_vec2(a) || is_zero_vec2(b) {
        return 0.0;
    }
    let c = a.normalize().dot(&b.normalize()).clamp(-1.0, 1.0);
    c.acos()
}

/// Unsigned angle between two vectors; zero if either is zero.
pub fn angle_between(a: Vec3, b: Vec3) -> f32 {
    if is_zero_vec3(a) || is_zero_vec3(b) {
        return 0.0;
    }
    let c = a.normalize().dot(&b.normalize()).clamp(-1.0, 1.0);
    c.acos()
}

/// Normalize, falling back to +Z for zero input.
#[inline]
pub fn normalize_or_up(v: Vec3) -> Vec3 {
    if is_zero_vec3(v) {
        return Vec3::z();
    }
    v.normalize()
}

/// Wrap an angle into (-π, π]. Non-finite input wraps to 0.
#[inline]
pub fn wrap_angle(a: f32) -> f32 {
    if !a.is_finite() {
        return 0.0;
    }
    if a > -PI && a <= PI {
        return a;
    }
    let r = (a + PI).rem_euclid(2.0 * PI) - PI;
    if r <= -PI { PI } else { r }
}

#[inline]
fn rot_x(angle: f32) -> Quat {
    Quat::from_axis_angle(&Vec3::x_axis(), angle)
}

#[inline]
fn rot_y(angle: f32) -> Quat {
    Quat::from_axis_angle(&Vec3::y_axis(), angle)
}

/// Lift a planar vector onto the plane whose normal is `x_cross_y`.
///
/// The X component is pitched about +Y by the angle the normal leans in XZ and the
/// Y component is rolled about +X by the angle it leans in YZ. A normal pointing
/// down mirrors the X component so "right" stays on the same side when the plane is
/// upside down. A horizontal normal stands the plane up on its edge.
pub fn tilt_vector_x_cross_y(v: Vec2, x_cross_y: Vec3) -> Vec3 {
    let flat = Vec3::new(v.x, v.y, 0.0);
    if is_zero_vec3(x_cross_y) || x_cross_y == Vec3::z() {
        return flat;
    }

    let n = x_cross_y;
    let x_axis = Vec3::new(v.x, 0.0, 0.0);
    let y_axis = Vec3::new(0.0, v.y, 0.0);
    let lean_xz = Vec3::new(n.x, 0.0, n.z);
    let lean_yz = Vec3::new(0.0, n.y, n.z);

    if n.z > 0.0 {
        let ax = angle_between(Vec3::z(), lean_xz);
        let ay = angle_between(Vec3::z(), lean_yz);
        let tilted_x = rot_y(if n.x >= 0.0 { ax } else { -ax }) * x_axis;
        let tilted_y = rot_x(if n.y >= 0.0 { -ay } else { ay }) * y_axis;
        tilted_x + tilted_y
    } else if n.z < 0.0 {
        let ax = angle_between(-Vec3::z(), lean_xz);
        let ay = angle_between(-Vec3::z(), lean_yz);
        let tilted_x = rot_y(if n.x >= 0.0 { -ax } else { ax }) * -x_axis;
        let tilted_y = rot_x(if n.y >= 0.0 { ay } else { -ay }) * y_axis;
        tilted_x + tilted_y
    } else {
        let mut tilted_x = x_axis;
        if !is_close(n.x, 0.0) {
            let flip = if n.x > 0.0 { 1.0 } else { -1.0 };
            tilted_x = rot_y(FRAC_PI_2) * (x_axis * flip);
        }
        let mut tilted_y = y_axis;
        if !is_close(n.y, 0.0) {
            let flip = if n.y > 0.0 { 1.0 } else { -1.0 };
            tilted_y = rot_x(-FRAC_PI_2) * (y_axis * flip);
        }
        tilted_x + tilted_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilt_with_up_normal_is_identity() {
        let v = Vec2::new(3.0, -2.0);
        assert_eq!(tilt_vector_x_cross_y(v, Vec3::z()), Vec3::new(3.0, -2.0, 0.0));
        assert_eq!(tilt_vector_x_cross_y(v, Vec3::zeros()), Vec3::new(3.0, -2.0, 0.0));
    }

    #[test]
    fn tilted_vector_lies_in_plane() {
        // Both tilted axes must be perpendicular to the plane normal.
        let n = Vec3::new(0.3, -0.2, 1.0).normalize();
        for v in [Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)] {
            let t = tilt_vector_x_cross_y(v, n);
            assert!(t.dot(&n).abs() < 1.0e-5, "{t:?}");
            assert!((t.norm() - 1.0).abs() < 1.0e-5);
        }
    }

    #[test]
    fn x_tilts_down_when_normal_leans_toward_x() {
        let n = Vec3::new(1.0, 0.0, 1.0).normalize();
        let t = tilt_vector_x_cross_y(Vec2::new(1.0, 0.0), n);
        assert!(t.x > 0.0 && t.z < 0.0);
    }

    #[test]
    fn upside_down_plane_mirrors_x() {
        let t = tilt_vector_x_cross_y(Vec2::new(1.0, 1.0), -Vec3::z());
        assert!((t - Vec3::new(-1.0, 1.0, 0.0)).norm() < 1.0e-5);
    }

    #[test]
    fn wrap_angle_stays_in_range() {
        assert!((wrap_angle(2.5 * PI) - PI / 2.0).abs() < 1.0e-5);
        assert!((wrap_angle(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1.0e-5);
        assert!((wrap_angle(PI) - PI).abs() < 1.0e-6);
        assert!((wrap_angle(-PI) - PI).abs() < 1.0e-6);
    }

    #[test]
    fn wrap_angle_handles_huge_headings() {
        for a in [1.0e10_f32, -1.0e10, 3.0e7, f32::MAX] {
            let w = wrap_angle(a);
            assert!(w > -PI && w <= PI, "wrap_angle({a}) = {w}");
        }
    }

    #[test]
    fn wrap_angle_zeroes_non_finite() {
        assert_eq!(wrap_angle(f32::INFINITY), 0.0);
        assert_eq!(wrap_angle(f32::NEG_INFINITY), 0.0);
        assert_eq!(wrap_angle(f32::NAN), 0.0);
    }
}
