//! Rig reprojection residuals and bundle adjustment built on tiny-solver.
//!
//! This crate provides the residual factors for refining the trajectory of a
//! rigid multi-camera rig (one main camera plus witness cameras), reusable
//! pose parameter packing, and a problem builder so different rig datasets
//! can share the same projection and residual machinery.

pub mod factors;
pub mod params;
pub mod problems;
pub mod solver;

pub use crate::problems::rig_bundle;
pub use crate::solver::SolveOptions;
