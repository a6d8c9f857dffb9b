use nalgebra::{RealField, Vector2};
use serde::{Deserialize, Serialize};

pub trait DistortionModel<S: RealField + Copy> {
    fn distort(&self, n_undist: &Vector2<S>) -> Vector2<S>;
    fn undistort(&self, n_dist: &Vector2<S>) -> Vector2<S>;
}

/// Odd-degree radial polynomial distortion with three coefficients.
///
/// The distorted radius is `r · (1 + k1·r² + k2·r⁴ + k3·r⁶)`, applied to
/// normalized coordinates before the intrinsics.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Radial3<S: RealField> {
    pub k1: S,
    pub k2: S,
    pub k3: S,
    /// Fixed-point iterations used by `undistort` (0 selects the default of 8).
    pub iters: u32,
}

impl<S: RealField + Copy> Radial3<S> {
    fn distort_impl(&self, x: S, y: S) -> (S, S) {
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;

        let radial = S::one() + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;

        (x * radial, y * radial)
    }
}

impl<S: RealField + Copy> DistortionModel<S> for Radial3<S> {
    fn distort(&self, n_undist: &Vector2<S>) -> Vector2<S> {
        let (xd, yd) = self.distort_impl(n_undist.x, n_undist.y);
        Vector2::new(xd, yd)
    }

    fn undistort(&self, n_dist: &Vector2<S>) -> Vector2<S> {
        let mut x = n_dist.x;
        let mut y = n_dist.y;

        let iters = if self.iters == 0 { 8 } else { self.iters };
        for _ in 0..iters {
            let (xd, yd) = self.distort_impl(x, y);
            let ex = xd - n_dist.x;
            let ey = yd - n_dist.y;
            x = x - ex;
            y = y - ey;
        }
        Vector2::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn center_is_invariant() {
        let dist = Radial3 {
            k1: 0.3,
            k2: -0.1,
            k3: 0.05,
            iters: 0,
        };
        let n = dist.distort(&Vector2::new(0.0, 0.0));
        assert_eq!(n.x, 0.0);
        assert_eq!(n.y, 0.0);
    }

    #[test]
    fn zero_coefficients_are_identity() {
        let dist = Radial3 {
            k1: 0.0,
            k2: 0.0,
            k3: 0.0,
            iters: 0,
        };
        let n = Vector2::new(0.3, -0.2);
        assert_eq!(dist.distort(&n), n);
    }

    #[test]
    fn undistort_inverts_distort() {
        let dist = Radial3 {
            k1: -0.05,
            k2: 0.01,
            k3: 0.0,
            iters: 12,
        };
        let n = Vector2::new(0.2, -0.15);
        let d = dist.distort(&n);
        let back = dist.undistort(&d);
        assert_relative_eq!(back.x, n.x, epsilon = 1e-7);
        assert_relative_eq!(back.y, n.y, epsilon = 1e-7);
    }
}
