//! Reprojection residuals for a rigid multi-camera rig.
//!
//! Three variants share one transform-then-project pipeline:
//! the main camera (one free pose), a witness camera with a jointly refined
//! relative pose (two free poses), and a witness camera whose relative pose
//! is frozen at construction time (one free pose plus stored constants).
//!
//! Poses are `[rx, ry, rz, tx, ty, tz]` blocks: rotation as a scaled axis,
//! then translation. The residual is `(projected - observation)` in pixels.

use anyhow::Result;
use nalgebra::{DVector, DVectorView, RealField, Rotation3, SVector, Vector3};
use tiny_solver::factors::Factor;

use crate::params::pose_rt::POSE_RT_DIM;
use rig_core::{radial3_coefficients, CameraRole, Iso3, Mat3, PinholeRadial3, Pt3, Vec2, Vec3};

/// Rotate `p` by the axis-angle vector `aa` (Rodrigues' formula).
///
/// Near the identity the first-order expansion `p + aa × p` is used, which
/// is exact at `aa = 0` and avoids the `1/θ` singularity.
pub(crate) fn rotate_point_angle_axis<T: RealField>(
    aa: &Vector3<T>,
    p: &Vector3<T>,
) -> Vector3<T> {
    let theta2 = aa.dot(aa);
    if theta2 > T::from_f64(f64::EPSILON).unwrap() {
        let theta = theta2.sqrt();
        let cos_theta = theta.clone().cos();
        let sin_theta = theta.clone().sin();
        let axis = aa / theta;
        let w_cross_p = axis.cross(p);
        let tmp = axis.dot(p) * (T::one() - cos_theta.clone());
        p * cos_theta + w_cross_p * sin_theta + axis * tmp
    } else {
        p + aa.cross(p)
    }
}

/// Apply a 6-parameter `[r; t]` block to a point: `R(aa)·p + t`.
fn transform_point_rt<T: RealField>(rt: DVectorView<'_, T>, p: &Vector3<T>) -> Vector3<T> {
    debug_assert_eq!(rt.len(), POSE_RT_DIM, "pose block must have 6 params");
    let aa = Vector3::new(rt[0].clone(), rt[1].clone(), rt[2].clone());
    let t = Vector3::new(rt[3].clone(), rt[4].clone(), rt[5].clone());
    rotate_point_angle_axis(&aa, p) + t
}

/// Source of the second rigid transform in the chain.
pub(crate) enum RelativeTransform<'a, T: RealField> {
    /// Main camera: the rig pose alone places the point in camera space.
    None,
    /// Jointly refined relative pose supplied by the solver.
    Free(DVectorView<'a, T>),
    /// Relative pose frozen at construction time.
    Frozen(&'a [f64; POSE_RT_DIM]),
}

/// Transform-then-project residual shared by all rig factor variants.
///
/// The rig pose is applied first and the relative offset second; rotation
/// composition is non-commutative, so this order is part of the contract.
/// Depth normalization divides directly: degenerate geometry (z ≤ 0 after
/// the transforms) silently yields extreme or non-finite values for the
/// optimizer to down-weight.
pub(crate) fn rig_reproj_residual_generic<T: RealField>(
    k: &Mat3,
    disto: [f64; 3],
    rig_rt: DVectorView<'_, T>,
    relative: RelativeTransform<'_, T>,
    point: [f64; 3],
    observation: [f64; 2],
) -> SVector<T, 2> {
    debug_assert_eq!(rig_rt.len(), POSE_RT_DIM, "rig pose must have 6 params");

    let pw = Vector3::new(
        T::from_f64(point[0]).unwrap(),
        T::from_f64(point[1]).unwrap(),
        T::from_f64(point[2]).unwrap(),
    );

    let p_rig = transform_point_rt(rig_rt, &pw);
    let p_cam = match relative {
        RelativeTransform::None => p_rig,
        RelativeTransform::Free(rt) => transform_point_rt(rt, &p_rig),
        RelativeTransform::Frozen(rt) => {
            let aa = Vector3::new(
                T::from_f64(rt[0]).unwrap(),
                T::from_f64(rt[1]).unwrap(),
                T::from_f64(rt[2]).unwrap(),
            );
            let t = Vector3::new(
                T::from_f64(rt[3]).unwrap(),
                T::from_f64(rt[4]).unwrap(),
                T::from_f64(rt[5]).unwrap(),
            );
            rotate_point_angle_axis(&aa, &p_rig) + t
        }
    };

    // Homogeneous to euclidean (undistorted normalized coordinates).
    let x_u = p_cam.x.clone() / p_cam.z.clone();
    let y_u = p_cam.y.clone() / p_cam.z.clone();

    let k1 = T::from_f64(disto[0]).unwrap();
    let k2 = T::from_f64(disto[1]).unwrap();
    let k3 = T::from_f64(disto[2]).unwrap();

    // Radial distortion in normalized coordinates, before the intrinsics.
    let r2 = x_u.clone() * x_u.clone() + y_u.clone() * y_u.clone();
    let r4 = r2.clone() * r2.clone();
    let r6 = r4.clone() * r2.clone();
    let r_coeff = T::one() + k1 * r2 + k2 * r4 + k3 * r6;

    let x_d = x_u * r_coeff.clone();
    let y_d = y_u * r_coeff;

    let focal = T::from_f64(k[(0, 0)]).unwrap();
    let ppx = T::from_f64(k[(0, 2)]).unwrap();
    let ppy = T::from_f64(k[(1, 2)]).unwrap();

    let u_proj = ppx + focal.clone() * x_d;
    let v_proj = ppy + focal * y_d;

    let u_meas = T::from_f64(observation[0]).unwrap();
    let v_meas = T::from_f64(observation[1]).unwrap();

    SVector::<T, 2>::new(u_proj - u_meas, v_proj - v_meas)
}

/// Reprojection residual for the rig's main camera.
///
/// Evaluation takes one 6-parameter block: the rig's own pose.
#[derive(Debug, Clone)]
pub struct MainCameraReprojFactor {
    k: Mat3,
    disto: [f64; 3],
    point: [f64; 3],
    observation: [f64; 2],
}

impl MainCameraReprojFactor {
    /// Capture calibration, distortion, observation and 3D point.
    ///
    /// Distortion coefficients are read from the intrinsics parameter vector
    /// at the [`CameraRole::Main`] offsets.
    pub fn new(intrinsics: &PinholeRadial3, pt2d: &Vec2, pt3d: &Pt3) -> Result<Self> {
        let params = intrinsics.params(CameraRole::Main);
        let disto = radial3_coefficients(&params, CameraRole::Main)?;
        Ok(Self {
            k: intrinsics.k_matrix(),
            disto,
            point: [pt3d.x, pt3d.y, pt3d.z],
            observation: [pt2d.x, pt2d.y],
        })
    }
}

impl<T: RealField> Factor<T> for MainCameraReprojFactor {
    fn residual_func(&self, params: &[DVector<T>]) -> DVector<T> {
        debug_assert_eq!(params.len(), 1, "expected [rig_pose] parameter block");
        let r = rig_reproj_residual_generic(
            &self.k,
            self.disto,
            params[0].as_view(),
            RelativeTransform::None,
            self.point,
            self.observation,
        );
        DVector::from_row_slice(r.as_slice())
    }
}

/// Reprojection residual for a witness camera with a refinable offset.
///
/// Evaluation takes two 6-parameter blocks: the rig pose and the witness
/// camera's pose relative to the main camera. Composing both as free
/// variables lets the solver refine the rig trajectory and the inter-camera
/// offset jointly.
#[derive(Debug, Clone)]
pub struct WitnessCameraReprojFactor {
    k: Mat3,
    disto: [f64; 3],
    point: [f64; 3],
    observation: [f64; 2],
}

impl WitnessCameraReprojFactor {
    /// Capture calibration, distortion, observation and 3D point.
    ///
    /// Distortion coefficients are read from the intrinsics parameter vector
    /// at the [`CameraRole::Secondary`] offsets.
    pub fn new(intrinsics: &PinholeRadial3, pt2d: &Vec2, pt3d: &Pt3) -> Result<Self> {
        let params = intrinsics.params(CameraRole::Secondary);
        let disto = radial3_coefficients(&params, CameraRole::Secondary)?;
        Ok(Self {
            k: intrinsics.k_matrix(),
            disto,
            point: [pt3d.x, pt3d.y, pt3d.z],
            observation: [pt2d.x, pt2d.y],
        })
    }
}

impl<T: RealField> Factor<T> for WitnessCameraReprojFactor {
    fn residual_func(&self, params: &[DVector<T>]) -> DVector<T> {
        debug_assert_eq!(
            params.len(),
            2,
            "expected [rig_pose, relative_pose] parameter blocks"
        );
        let r = rig_reproj_residual_generic(
            &self.k,
            self.disto,
            params[0].as_view(),
            RelativeTransform::Free(params[1].as_view()),
            self.point,
            self.observation,
        );
        DVector::from_row_slice(r.as_slice())
    }
}

/// Reprojection residual for a witness camera with a frozen offset.
///
/// The relative pose is converted to axis-angle form exactly once, at
/// construction, and held constant; only the rig pose remains refinable.
/// Use this when the inter-camera calibration is trusted and should not be
/// perturbed by per-frame correspondences.
#[derive(Debug, Clone)]
pub struct FixedWitnessCameraReprojFactor {
    k: Mat3,
    disto: [f64; 3],
    point: [f64; 3],
    observation: [f64; 2],
    relative_rt: [f64; POSE_RT_DIM],
}

impl FixedWitnessCameraReprojFactor {
    /// Capture fixed data plus the relative pose of the witness camera.
    pub fn new(
        intrinsics: &PinholeRadial3,
        pt2d: &Vec2,
        pt3d: &Pt3,
        relative_pose: &Iso3,
    ) -> Result<Self> {
        let aa = relative_pose.rotation.scaled_axis();
        let t = relative_pose.translation.vector;
        Self::with_relative_rt(intrinsics, pt2d, pt3d, [aa.x, aa.y, aa.z, t.x, t.y, t.z])
    }

    /// Construct from the raw external boundary: a rotation matrix plus a
    /// translation vector.
    ///
    /// The matrix is not checked for orthonormality; any artifact of the
    /// one-time axis-angle conversion persists for the factor's lifetime.
    pub fn from_matrix(
        intrinsics: &PinholeRadial3,
        pt2d: &Vec2,
        pt3d: &Pt3,
        rotation: &Mat3,
        translation: &Vec3,
    ) -> Result<Self> {
        let aa = Rotation3::from_matrix_unchecked(*rotation).scaled_axis();
        Self::with_relative_rt(
            intrinsics,
            pt2d,
            pt3d,
            [
                aa.x,
                aa.y,
                aa.z,
                translation.x,
                translation.y,
                translation.z,
            ],
        )
    }

    fn with_relative_rt(
        intrinsics: &PinholeRadial3,
        pt2d: &Vec2,
        pt3d: &Pt3,
        relative_rt: [f64; POSE_RT_DIM],
    ) -> Result<Self> {
        let params = intrinsics.params(CameraRole::Secondary);
        let disto = radial3_coefficients(&params, CameraRole::Secondary)?;
        Ok(Self {
            k: intrinsics.k_matrix(),
            disto,
            point: [pt3d.x, pt3d.y, pt3d.z],
            observation: [pt2d.x, pt2d.y],
            relative_rt,
        })
    }
}

impl<T: RealField> Factor<T> for FixedWitnessCameraReprojFactor {
    fn residual_func(&self, params: &[DVector<T>]) -> DVector<T> {
        debug_assert_eq!(params.len(), 1, "expected [rig_pose] parameter block");
        let r = rig_reproj_residual_generic(
            &self.k,
            self.disto,
            params[0].as_view(),
            RelativeTransform::Frozen(&self.relative_rt),
            self.point,
            self.observation,
        );
        DVector::from_row_slice(r.as_slice())
    }
}
