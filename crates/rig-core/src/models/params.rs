//! Shared intrinsics parameter layouts.
//!
//! Residual factors read the radial distortion triple from an ordered
//! intrinsics parameter vector at role-dependent offsets. The layouts are an
//! external contract shared with the intrinsics collaborator; downstream
//! composition over a joint parameter vector depends on these exact offsets.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::math::Real;

/// Position of a camera within the rig, selecting its intrinsics layout.
///
/// - `Main`: `[fx, fy, cx, cy, k1, k2, k3]`, distortion at indices 4..7.
/// - `Secondary`: `[f, cx, cy, k1, k2, k3]`, distortion at indices 3..6.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraRole {
    /// The rig's reference camera; its pose parameterizes the whole rig.
    Main,
    /// A witness camera located by a relative pose to the main camera.
    Secondary,
}

impl CameraRole {
    /// Offset of `k1` within the role's intrinsics parameter vector.
    pub const fn distortion_offset(self) -> usize {
        match self {
            CameraRole::Main => 4,
            CameraRole::Secondary => 3,
        }
    }

    /// Total parameter count of the role's intrinsics layout.
    pub const fn param_count(self) -> usize {
        match self {
            CameraRole::Main => 7,
            CameraRole::Secondary => 6,
        }
    }

    /// Index range of `[k1, k2, k3]` within the role's parameter vector.
    pub fn distortion_range(self) -> Range<usize> {
        let off = self.distortion_offset();
        off..off + 3
    }
}

/// Extract `[k1, k2, k3]` from an intrinsics parameter vector for `role`.
pub fn radial3_coefficients(params: &[Real], role: CameraRole) -> Result<[Real; 3]> {
    let range = role.distortion_range();
    ensure!(
        params.len() >= range.end,
        "intrinsics vector too short for {:?} camera: expected at least {} params, got {}",
        role,
        range.end,
        params.len()
    );
    Ok([
        params[range.start],
        params[range.start + 1],
        params[range.start + 2],
    ])
}
