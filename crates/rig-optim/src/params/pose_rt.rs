//! Axis-angle pose parameter conversions.
//!
//! The storage order is `[rx, ry, rz, tx, ty, tz]`: rotation as a scaled
//! axis (direction = rotation axis, magnitude = angle in radians), then
//! translation.

use anyhow::{ensure, Result};
use nalgebra::{DVector, DVectorView, Rotation3, Vector3};
use rig_core::Iso3;

/// Dimension of an `[r; t]` pose parameter block.
pub const POSE_RT_DIM: usize = 6;

/// Convert an `Iso3` into a 6D `[r; t]` parameter vector.
///
/// The rotation is converted through the matrix logarithm (`scaled_axis`),
/// which round-trips with the exponential map used by the residual factors.
pub fn iso3_to_rt_dvec(pose: &Iso3) -> DVector<f64> {
    let aa = pose.rotation.scaled_axis();
    let t = pose.translation.vector;
    nalgebra::dvector![aa.x, aa.y, aa.z, t.x, t.y, t.z]
}

/// Convert a 6D `[r; t]` vector back into an `Iso3`.
pub fn rt_dvec_to_iso3(v: DVectorView<'_, f64>) -> Result<Iso3> {
    ensure!(
        v.len() == POSE_RT_DIM,
        "expected rt vector of length {}, got {}",
        POSE_RT_DIM,
        v.len()
    );
    let rot = Rotation3::new(Vector3::new(v[0], v[1], v[2]));
    let trans = Vector3::new(v[3], v[4], v[5]);
    Ok(Iso3::from_parts(trans.into(), rot.into()))
}
