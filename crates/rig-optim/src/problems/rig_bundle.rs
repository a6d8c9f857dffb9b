//! Rig trajectory bundle adjustment.
//!
//! Refines per-frame rig poses from reprojection residuals of the main
//! camera and any witness cameras. Witness offsets are either refined
//! jointly with the trajectory or frozen at their initial values.
//!
//! Each observation contributes a residual block with two residuals (u, v),
//! enabling robust loss to operate per point rather than per frame.

use crate::factors::{
    FixedWitnessCameraReprojFactor, MainCameraReprojFactor, WitnessCameraReprojFactor,
};
use crate::params::pose_rt::{iso3_to_rt_dvec, rt_dvec_to_iso3, POSE_RT_DIM};
use crate::solver::{final_cost, solve, SolveOptions};
use anyhow::{anyhow, ensure, Result};
use log::debug;
use nalgebra::DVector;
use rig_core::{Iso3, PinholeRadial3, Pt3, Vec2};
use std::collections::HashMap;
use tiny_solver::loss_functions::{ArctanLoss, CauchyLoss, HuberLoss, Loss};
use tiny_solver::problem::Problem;

/// 3D/2D point correspondences seen by one camera in one frame.
#[derive(Debug, Clone)]
pub struct CameraObservations {
    pub points_3d: Vec<Pt3>,
    pub points_2d: Vec<Vec2>,
}

impl CameraObservations {
    pub fn new(points_3d: Vec<Pt3>, points_2d: Vec<Vec2>) -> Result<Self> {
        ensure!(
            points_3d.len() == points_2d.len(),
            "3D / 2D point counts must match: {} vs {}",
            points_3d.len(),
            points_2d.len()
        );
        Ok(Self {
            points_3d,
            points_2d,
        })
    }

    pub fn len(&self) -> usize {
        self.points_3d.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points_3d.is_empty()
    }
}

/// Observations gathered by the whole rig in one frame.
#[derive(Debug, Clone)]
pub struct RigFrame {
    pub main: CameraObservations,
    /// One entry per witness camera (`None` if it saw nothing this frame).
    pub witnesses: Vec<Option<CameraObservations>>,
}

/// Complete dataset for rig trajectory refinement.
#[derive(Debug, Clone)]
pub struct RigBundleDataset {
    pub frames: Vec<RigFrame>,
    pub num_witnesses: usize,
}

impl RigBundleDataset {
    pub fn new(frames: Vec<RigFrame>, num_witnesses: usize) -> Result<Self> {
        ensure!(!frames.is_empty(), "need at least one frame");
        for (idx, frame) in frames.iter().enumerate() {
            ensure!(
                frame.witnesses.len() == num_witnesses,
                "frame {} has {} witness entries, expected {}",
                idx,
                frame.witnesses.len(),
                num_witnesses
            );
            let total = frame.main.len()
                + frame
                    .witnesses
                    .iter()
                    .flatten()
                    .map(CameraObservations::len)
                    .sum::<usize>();
            ensure!(
                total >= 3,
                "frame {} has too few observations to constrain its pose ({}, need >= 3)",
                idx,
                total
            );
        }
        Ok(Self {
            frames,
            num_witnesses,
        })
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }
}

/// Rig cameras: the main camera plus one intrinsics set per witness.
#[derive(Debug, Clone)]
pub struct RigCameras {
    pub main: PinholeRadial3,
    pub witnesses: Vec<PinholeRadial3>,
}

/// Initial values for rig bundle adjustment.
#[derive(Debug, Clone)]
pub struct RigBundleInit {
    /// Per-frame rig poses (world-to-main-camera).
    pub rig_poses: Vec<Iso3>,
    /// Per-witness relative poses (main-camera-to-witness).
    pub relative_poses: Vec<Iso3>,
}

/// Robust loss applied per point residual block.
///
/// Robustification belongs to the optimizer layer; the residual factors
/// themselves always report the raw pixel error.
#[derive(Debug, Clone, Default)]
pub enum RobustLoss {
    #[default]
    None,
    Huber {
        scale: f64,
    },
    Cauchy {
        scale: f64,
    },
    Arctan {
        tol: f64,
    },
}

impl RobustLoss {
    fn to_loss(&self) -> Result<Option<Box<dyn Loss + Send>>> {
        match *self {
            RobustLoss::None => Ok(None),
            RobustLoss::Huber { scale } => {
                ensure!(scale > 0.0, "Huber scale must be positive");
                Ok(Some(Box::new(HuberLoss::new(scale))))
            }
            RobustLoss::Cauchy { scale } => {
                ensure!(scale > 0.0, "Cauchy scale must be positive");
                Ok(Some(Box::new(CauchyLoss::new(scale))))
            }
            RobustLoss::Arctan { tol } => {
                ensure!(tol > 0.0, "Arctan tolerance must be positive");
                Ok(Some(Box::new(ArctanLoss::new(tol))))
            }
        }
    }
}

/// Solve options specific to rig bundle adjustment.
#[derive(Debug, Clone, Default)]
pub struct RigBundleOptions {
    pub robust_loss: RobustLoss,
    /// Refine the witness offsets jointly with the trajectory. When `false`
    /// the initial relative poses are frozen into the witness factors.
    pub refine_relative: bool,
    /// Frame indices whose rig pose stays at its initial value.
    pub fix_rig_poses: Vec<usize>,
}

/// Result of rig bundle adjustment.
#[derive(Debug, Clone)]
pub struct RigBundleResult {
    pub rig_poses: Vec<Iso3>,
    pub relative_poses: Vec<Iso3>,
    pub final_cost: f64,
}

fn rig_pose_key(frame_idx: usize) -> String {
    format!("rig_pose/{}", frame_idx)
}

fn relative_key(witness_idx: usize) -> String {
    format!("relative/{}", witness_idx)
}

/// Build a tiny-solver problem and initial parameter map.
pub fn build_rig_bundle_problem(
    dataset: &RigBundleDataset,
    cameras: &RigCameras,
    initial: &RigBundleInit,
    opts: &RigBundleOptions,
) -> Result<(Problem, HashMap<String, DVector<f64>>)> {
    ensure!(
        cameras.witnesses.len() == dataset.num_witnesses,
        "witness camera count ({}) must match dataset ({})",
        cameras.witnesses.len(),
        dataset.num_witnesses
    );
    ensure!(
        initial.rig_poses.len() == dataset.num_frames(),
        "rig pose count ({}) must match number of frames ({})",
        initial.rig_poses.len(),
        dataset.num_frames()
    );
    ensure!(
        initial.relative_poses.len() == dataset.num_witnesses,
        "relative pose count ({}) must match number of witnesses ({})",
        initial.relative_poses.len(),
        dataset.num_witnesses
    );
    for &idx in &opts.fix_rig_poses {
        ensure!(
            idx < dataset.num_frames(),
            "fixed rig pose index {} out of range ({} frames)",
            idx,
            dataset.num_frames()
        );
    }

    let mut problem = Problem::new();
    let mut initial_map: HashMap<String, DVector<f64>> = HashMap::new();
    let mut num_blocks = 0usize;

    if opts.refine_relative {
        for (witness_idx, relative) in initial.relative_poses.iter().enumerate() {
            initial_map.insert(relative_key(witness_idx), iso3_to_rt_dvec(relative));
        }
    }

    for (frame_idx, frame) in dataset.frames.iter().enumerate() {
        let pose_key = rig_pose_key(frame_idx);
        initial_map.insert(pose_key.clone(), iso3_to_rt_dvec(&initial.rig_poses[frame_idx]));

        if opts.fix_rig_poses.contains(&frame_idx) {
            for idx in 0..POSE_RT_DIM {
                problem.fix_variable(&pose_key, idx);
            }
        }

        for (pw, uv) in frame.main.points_3d.iter().zip(frame.main.points_2d.iter()) {
            let factor = MainCameraReprojFactor::new(&cameras.main, uv, pw)?;
            let loss = opts.robust_loss.to_loss()?;
            problem.add_residual_block(2, &[pose_key.as_str()], Box::new(factor), loss);
            num_blocks += 1;
        }

        for (witness_idx, witness_obs) in frame.witnesses.iter().enumerate() {
            if let Some(obs) = witness_obs {
                let intrinsics = &cameras.witnesses[witness_idx];
                let relative = &initial.relative_poses[witness_idx];

                for (pw, uv) in obs.points_3d.iter().zip(obs.points_2d.iter()) {
                    let loss = opts.robust_loss.to_loss()?;
                    if opts.refine_relative {
                        let factor = WitnessCameraReprojFactor::new(intrinsics, uv, pw)?;
                        let rel_key = relative_key(witness_idx);
                        problem.add_residual_block(
                            2,
                            &[pose_key.as_str(), rel_key.as_str()],
                            Box::new(factor),
                            loss,
                        );
                    } else {
                        let factor =
                            FixedWitnessCameraReprojFactor::new(intrinsics, uv, pw, relative)?;
                        problem.add_residual_block(2, &[pose_key.as_str()], Box::new(factor), loss);
                    }
                    num_blocks += 1;
                }
            }
        }
    }

    debug!(
        "rig bundle: {} frames, {} witness cameras, {} residual blocks, refine_relative={}",
        dataset.num_frames(),
        dataset.num_witnesses,
        num_blocks,
        opts.refine_relative
    );

    Ok((problem, initial_map))
}

/// Optimize the rig trajectory (and optionally the witness offsets).
pub fn optimize_rig_bundle(
    dataset: RigBundleDataset,
    cameras: RigCameras,
    initial: RigBundleInit,
    opts: RigBundleOptions,
    solver: SolveOptions,
) -> Result<RigBundleResult> {
    let (problem, initial_map) = build_rig_bundle_problem(&dataset, &cameras, &initial, &opts)?;
    let solution = solve(&problem, initial_map, &solver)?;

    let mut rig_poses = Vec::with_capacity(dataset.num_frames());
    for i in 0..dataset.num_frames() {
        let key = rig_pose_key(i);
        let pose_vec = solution
            .get(&key)
            .ok_or_else(|| anyhow!("missing rig pose {} in solution", i))?;
        rig_poses.push(rt_dvec_to_iso3(pose_vec.as_view())?);
    }

    let mut relative_poses = Vec::with_capacity(dataset.num_witnesses);
    for i in 0..dataset.num_witnesses {
        if opts.refine_relative {
            let key = relative_key(i);
            let rel_vec = solution
                .get(&key)
                .ok_or_else(|| anyhow!("missing relative pose {} in solution", i))?;
            relative_poses.push(rt_dvec_to_iso3(rel_vec.as_view())?);
        } else {
            relative_poses.push(initial.relative_poses[i]);
        }
    }

    let cost = final_cost(&problem, &solution);

    Ok(RigBundleResult {
        rig_poses,
        relative_poses,
        final_cost: cost,
    })
}
