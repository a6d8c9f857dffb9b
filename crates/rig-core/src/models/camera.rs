use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

use super::{CameraRole, DistortionModel, Radial3};
use crate::math::{Mat3, Pt3, Real, Vec2};

/// Pinhole camera with a single focal length and radial-3 distortion.
///
/// This is the intrinsics collaborator consumed by the residual factors:
/// it exposes the 3×3 calibration matrix and the ordered parameter vector
/// from which distortion coefficients are read at role-dependent offsets.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PinholeRadial3 {
    /// Focal length in pixels (equal on both axes).
    pub focal: Real,
    /// Principal point X coordinate in pixels.
    pub ppx: Real,
    /// Principal point Y coordinate in pixels.
    pub ppy: Real,
    /// Radial distortion coefficients.
    pub dist: Radial3<Real>,
}

impl PinholeRadial3 {
    pub fn new(focal: Real, ppx: Real, ppy: Real, k1: Real, k2: Real, k3: Real) -> Self {
        Self {
            focal,
            ppx,
            ppy,
            dist: Radial3 {
                k1,
                k2,
                k3,
                iters: 0,
            },
        }
    }

    /// Return the 3×3 camera intrinsics matrix K.
    pub fn k_matrix(&self) -> Mat3 {
        Mat3::new(
            self.focal, 0.0, self.ppx, 0.0, self.focal, self.ppy, 0.0, 0.0, 1.0,
        )
    }

    /// Ordered intrinsics parameter vector in the layout of `role`.
    ///
    /// The distortion triple lands at [`CameraRole::distortion_range`].
    pub fn params(&self, role: CameraRole) -> Vec<Real> {
        match role {
            CameraRole::Main => vec![
                self.focal,
                self.focal,
                self.ppx,
                self.ppy,
                self.dist.k1,
                self.dist.k2,
                self.dist.k3,
            ],
            CameraRole::Secondary => vec![
                self.focal,
                self.ppx,
                self.ppy,
                self.dist.k1,
                self.dist.k2,
                self.dist.k3,
            ],
        }
    }

    /// Project a camera-frame point to pixel coordinates.
    ///
    /// Returns `None` when the point is on or behind the camera plane.
    pub fn project_point_c(&self, p_c: &Vector3<Real>) -> Option<Vec2> {
        if p_c.z <= 0.0 {
            return None;
        }
        let n_u = Vector2::new(p_c.x / p_c.z, p_c.y / p_c.z);
        let n_d = self.dist.distort(&n_u);
        Some(Vec2::new(
            self.ppx + self.focal * n_d.x,
            self.ppy + self.focal * n_d.y,
        ))
    }

    /// Project a camera-frame point given as a [`Pt3`].
    pub fn project_point(&self, p_c: &Pt3) -> Option<Vec2> {
        self.project_point_c(&p_c.coords)
    }
}
