/*!
Directional speed shaping ("ellipse" scaling).

Each quadrant of the input direction is mapped onto a quarter ellipse whose
semi-axes are the two scales that bound the quadrant:
- +Y (forward) or -Y (back) on the vertical semi-axis,
- +X (right) or -X (left) on the horizontal semi-axis.

The textbook form for the first quadrant is
`x = f·r / sqrt(f² + r²·tan²θ)`, `y = x·tanθ` with θ measured from +X.
Multiplying through by `cosθ` gives the tangent-free form used here:

```text
out = a·c·v / sqrt(a²·vx² + c²·vy²)
```

which is identical for every θ and stays finite at θ = ±90°.

Notes
- A zero input returns exactly zero.
- A unit input keeps the quadrant formula's length; a non-unit input additionally
  scales the result by its own length, so `ellipse(dir * speed)` is a linear speed scale.
*/

use crate::settings::FLOAT_EPS;
use crate::types::Vec2;

/// Squared-length tolerance for treating an input as already normalized.
const NORMALIZED_TOLERANCE: f32 = 1.0e-3;

/// Four per-direction scale factors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalScales {
    pub forward: f32,
    pub back: f32,
    pub left: f32,
    pub right: f32,
}

impl DirectionalScales {
    #[inline]
    pub const fn new(forward: f32, back: f32, left: f32, right: f32) -> Self {
        Self {
            forward,
            back,
            left,
            right,
        }
    }

    pub const fn uniform(scale: f32) -> Self {
        Self::new(scale, scale, scale, scale)
    }

    /// Component-wise product, used to stack sprint scales on top of walk scales.
    #[inline]
    pub fn scaled_by(&self, other: &DirectionalScales) -> Self {
        Self::new(
            self.forward * other.forward,
            self.back * other.back,
            self.left * other.left,
            self.right * other.right,
        )
    }

    /// Scales as an array, in forward/back/left/right order.
    #[inline]
    pub fn as_array(&self) -> [f32; 4] {
        [self.forward, self.back, self.left, self.right]
    }

    /// The scale with the greatest magnitude, starting from `floor`.
    ///
    /// Returned as an absolute value, except when `floor` itself wins.
    pub fn greatest_abs(&self, floor: f32) -> f32 {
        self.as_array()
            .into_iter()
            .fold(floor, |g, s| if g < s.abs() { s.abs() } else { g })
    }

    /// The scale with the greatest magnitude, sign kept; `start` wins ties.
    pub fn greatest_by_magnitude(&self, start: f32) -> f32 {
        self.as_array()
            .into_iter()
            .fold(start, |g, s| if s.abs() > g.abs() { s } else { g })
    }
}

/// Shape `v` by the ellipse spanned by `scales`.
pub fn ellipse_scaled(v: Vec2, scales: &DirectionalScales) -> Vec2 {
    if v.x.abs() <= FLOAT_EPS && v.y.abs() <= FLOAT_EPS {
        return Vec2::zeros();
    }

    let len_sq = v.norm_squared();
    let length_scale = if (len_sq - 1.0).abs() <= NORMALIZED_TOLERANCE {
        1.0
    } else {
        len_sq.sqrt()
    };

    // Semi-axis along Y (forward/back) and along X (right/left) for this quadrant.
    let a = if v.y >= 0.0 { scales.forward } else { scales.back };
    let c = if v.x >= 0.0 { scales.right } else { scales.left };

    let denom = (a * a * v.x * v.x + c * c * v.y * v.y).sqrt();
    if denom <= FLOAT_EPS {
        return Vec2::zeros();
    }

    v * (length_scale * a * c / denom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn walk() -> DirectionalScales {
        DirectionalScales::new(1.0, 0.75, 1.0, 1.0)
    }

    #[test]
    fn unit_scales_preserve_length_at_every_angle() {
        // With every scale at 1 the ellipse is the unit circle.
        let unit = DirectionalScales::uniform(1.0);
        for i in 0..72 {
            let theta = i as f32 * (2.0 * PI / 72.0);
            let v = Vec2::new(theta.cos(), theta.sin());
            let out = ellipse_scaled(v, &unit);
            assert!((out.norm() - 1.0).abs() < 1.0e-5, "theta {theta}");
            assert!((out - v).norm() < 1.0e-5);
        }
    }

    #[test]
    fn axis_directions_hit_their_scale_exactly() {
        let s = walk();
        assert!((ellipse_scaled(Vec2::new(1.0, 0.0), &s).norm() - s.right).abs() < 1.0e-6);
        assert!((ellipse_scaled(Vec2::new(0.0, -1.0), &s).norm() - s.back).abs() < 1.0e-6);
        assert!((ellipse_scaled(Vec2::new(-1.0, 0.0), &s).norm() - s.left).abs() < 1.0e-6);
        assert!((ellipse_scaled(Vec2::new(0.0, 1.0), &s).norm() - s.forward).abs() < 1.0e-6);
    }

    #[test]
    fn matches_tangent_form_inside_a_quadrant() {
        // Quadrant I, θ = 30°: x = f·r / sqrt(f² + r²·tan²θ), y = x·tanθ.
        let s = DirectionalScales::new(1.5, 1.0, 1.25, 1.25);
        let theta = PI / 6.0;
        let t = theta.tan();
        let x = s.forward * s.right / (s.forward * s.forward + s.right * s.right * t * t).sqrt();
        let expected = Vec2::new(x, x * t);

        let out = ellipse_scaled(Vec2::new(theta.cos(), theta.sin()), &s);
        assert!((out - expected).norm() < 1.0e-5);
    }

    #[test]
    fn quadrant_three_uses_back_and_left() {
        let s = DirectionalScales::new(2.0, 0.5, 0.8, 3.0);
        let v = Vec2::new(-1.0, -1.0).normalize();
        let out = ellipse_scaled(v, &s);
        assert!(out.x < 0.0 && out.y < 0.0);
        // On the diagonal the radius is b·l / sqrt((b² + l²)/2).
        let r = s.back * s.left / ((s.back * s.back + s.left * s.left) * 0.5).sqrt();
        assert!((out.norm() - r).abs() < 1.0e-5);
    }

    #[test]
    fn non_unit_input_scales_linearly() {
        let s = walk();
        let dir = Vec2::new(0.0, -1.0);
        let out = ellipse_scaled(dir * 5.0, &s);
        assert!((out.norm() - 5.0 * s.back).abs() < 1.0e-5);
    }

    #[test]
    fn zero_input_returns_zero() {
        assert_eq!(ellipse_scaled(Vec2::zeros(), &walk()), Vec2::zeros());
    }

    #[test]
    fn greatest_abs_starts_from_floor() {
        let s = DirectionalScales::new(1.5, -2.0, 1.25, 1.25);
        assert!((s.greatest_abs(0.0) - 2.0).abs() < 1.0e-6);
        let small = DirectionalScales::uniform(0.5);
        assert!((small.greatest_abs(1.0) - 1.0).abs() < 1.0e-6);
    }
}
