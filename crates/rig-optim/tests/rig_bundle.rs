//! Integration test for rig trajectory bundle adjustment.
//!
//! This test validates:
//! 1. Rig bundle adjustment compiles and runs against tiny-solver
//! 2. Convergence to ground truth rig poses with a frozen witness offset
//! 3. Joint convergence of trajectory and witness offset when refinable
//! 4. Per-camera distortion handling in the synthetic projections

use nalgebra::{Translation3, UnitQuaternion, Vector3};
use rig_core::{Iso3, PinholeRadial3, Pt3};
use rig_optim::problems::rig_bundle::*;
use rig_optim::SolveOptions;
use tiny_solver::linear::sparse::LinearSolverType;

fn make_pose(aa: [f64; 3], t: [f64; 3]) -> Iso3 {
    Iso3::from_parts(
        Translation3::new(t[0], t[1], t[2]),
        UnitQuaternion::from_scaled_axis(Vector3::new(aa[0], aa[1], aa[2])),
    )
}

struct SyntheticRig {
    dataset: RigBundleDataset,
    cameras: RigCameras,
    rig_poses_gt: Vec<Iso3>,
    relative_gt: Iso3,
}

fn build_synthetic_rig() -> SyntheticRig {
    let main_cam = PinholeRadial3::new(800.0, 640.0, 360.0, -0.05, 0.01, 0.0);
    let witness_cam = PinholeRadial3::new(780.0, 620.0, 350.0, -0.03, 0.005, 0.0);

    // Witness camera 0.12m to the right with a slight yaw.
    let relative_gt = make_pose([0.0, 0.02, 0.0], [0.12, 0.0, 0.0]);

    let rig_poses_gt = vec![
        make_pose([0.1, -0.05, 0.2], [0.1, -0.05, 1.0]),
        make_pose([-0.08, 0.06, -0.15], [-0.08, 0.03, 1.1]),
        make_pose([0.05, -0.08, 0.12], [0.05, 0.08, 0.95]),
    ];

    // Planar target at z = 0 in the world frame.
    let mut target_points = Vec::new();
    for y in -2..=2 {
        for x in -3..=3 {
            target_points.push(Pt3::new(x as f64 * 0.05, y as f64 * 0.05, 0.0));
        }
    }

    let mut frames = Vec::new();
    for rig_pose in &rig_poses_gt {
        let mut main_3d = Vec::new();
        let mut main_2d = Vec::new();
        let mut wit_3d = Vec::new();
        let mut wit_2d = Vec::new();

        for pw in &target_points {
            let p_main = rig_pose.transform_point(pw);
            if let Some(pixel) = main_cam.project_point(&p_main) {
                main_3d.push(*pw);
                main_2d.push(pixel);
            }

            let p_wit = relative_gt.transform_point(&p_main);
            if let Some(pixel) = witness_cam.project_point(&p_wit) {
                wit_3d.push(*pw);
                wit_2d.push(pixel);
            }
        }

        frames.push(RigFrame {
            main: CameraObservations::new(main_3d, main_2d).unwrap(),
            witnesses: vec![Some(CameraObservations::new(wit_3d, wit_2d).unwrap())],
        });
    }

    SyntheticRig {
        dataset: RigBundleDataset::new(frames, 1).unwrap(),
        cameras: RigCameras {
            main: main_cam,
            witnesses: vec![witness_cam],
        },
        rig_poses_gt,
        relative_gt,
    }
}

fn perturb(pose: &Iso3, d_aa: [f64; 3], d_t: [f64; 3]) -> Iso3 {
    let rot = UnitQuaternion::from_scaled_axis(Vector3::new(d_aa[0], d_aa[1], d_aa[2]))
        * pose.rotation;
    let t = pose.translation.vector + Vector3::new(d_t[0], d_t[1], d_t[2]);
    Iso3::from_parts(Translation3::from(t), rot)
}

fn solver_options() -> SolveOptions {
    SolveOptions {
        max_iters: 50,
        verbosity: 0,
        linear_solver: Some(LinearSolverType::SparseCholesky),
        min_abs_decrease: Some(1e-12),
        min_rel_decrease: Some(1e-12),
        min_error: Some(1e-14),
    }
}

#[test]
fn rig_trajectory_converges_with_frozen_offset() {
    let rig = build_synthetic_rig();

    let rig_poses_init = rig
        .rig_poses_gt
        .iter()
        .map(|p| perturb(p, [0.01, -0.008, 0.005], [0.008, -0.005, 0.01]))
        .collect::<Vec<_>>();

    let initial = RigBundleInit {
        rig_poses: rig_poses_init,
        relative_poses: vec![rig.relative_gt],
    };

    let opts = RigBundleOptions {
        refine_relative: false,
        ..RigBundleOptions::default()
    };

    let result =
        optimize_rig_bundle(rig.dataset, rig.cameras, initial, opts, solver_options()).unwrap();

    for (idx, (estimated, gt)) in result.rig_poses.iter().zip(&rig.rig_poses_gt).enumerate() {
        let dt = (estimated.translation.vector - gt.translation.vector).norm();
        let dr = estimated.rotation.angle_to(&gt.rotation);
        println!("frame {} errors: translation={:.2e}, rotation={:.2e}", idx, dt, dr);
        assert!(dt < 1e-4, "frame {} translation error too large: {}", idx, dt);
        assert!(dr < 1e-4, "frame {} rotation error too large: {}", idx, dr);
    }

    // Frozen offsets come back untouched.
    let rel = &result.relative_poses[0];
    assert!((rel.translation.vector - rig.relative_gt.translation.vector).norm() < 1e-15);
    assert!(rel.rotation.angle_to(&rig.relative_gt.rotation) < 1e-15);

    println!("final cost: {:.6e}", result.final_cost);
    assert!(result.final_cost < 1e-8, "cost did not vanish: {}", result.final_cost);
}

#[test]
fn joint_refinement_recovers_trajectory_and_offset() {
    let rig = build_synthetic_rig();

    let rig_poses_init = rig
        .rig_poses_gt
        .iter()
        .map(|p| perturb(p, [-0.008, 0.01, -0.006], [0.01, 0.006, -0.008]))
        .collect::<Vec<_>>();
    let relative_init = perturb(&rig.relative_gt, [0.006, -0.004, 0.008], [0.004, -0.003, 0.002]);

    let initial = RigBundleInit {
        rig_poses: rig_poses_init,
        relative_poses: vec![relative_init],
    };

    let opts = RigBundleOptions {
        refine_relative: true,
        ..RigBundleOptions::default()
    };

    let result =
        optimize_rig_bundle(rig.dataset, rig.cameras, initial, opts, solver_options()).unwrap();

    for (idx, (estimated, gt)) in result.rig_poses.iter().zip(&rig.rig_poses_gt).enumerate() {
        let dt = (estimated.translation.vector - gt.translation.vector).norm();
        let dr = estimated.rotation.angle_to(&gt.rotation);
        assert!(dt < 1e-3, "frame {} translation error too large: {}", idx, dt);
        assert!(dr < 1e-3, "frame {} rotation error too large: {}", idx, dr);
    }

    let rel = &result.relative_poses[0];
    let dt = (rel.translation.vector - rig.relative_gt.translation.vector).norm();
    let dr = rel.rotation.angle_to(&rig.relative_gt.rotation);
    println!("witness offset errors: translation={:.2e}, rotation={:.2e}", dt, dr);
    assert!(dt < 1e-3, "witness translation error too large: {}", dt);
    assert!(dr < 1e-3, "witness rotation error too large: {}", dr);

    println!("final cost: {:.6e}", result.final_cost);
    assert!(result.final_cost < 1e-6, "cost did not vanish: {}", result.final_cost);
}
