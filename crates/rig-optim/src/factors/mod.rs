//! Residual factor implementations with automatic differentiation support.
//!
//! Factors compute the difference between observed pixel measurements and
//! predictions from estimated pose parameters. All residual math is generic
//! over [`nalgebra::RealField`] so tiny-solver can evaluate the same function
//! body with f64 and with dual numbers for forward-mode differentiation.
//!
//! Guidelines for residual functions:
//! - use `.clone()` liberally on `T: RealField` values,
//! - convert captured constants with `T::from_f64().unwrap()`,
//! - no in-place mutation, no allocation beyond small temporaries,
//! - `debug_assert!` for parameter block dimension checks.

pub mod rig_reprojection;

pub use rig_reprojection::{
    FixedWitnessCameraReprojFactor, MainCameraReprojFactor, WitnessCameraReprojFactor,
};
