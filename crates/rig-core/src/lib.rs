//! Core math and camera primitives for rig bundle adjustment.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Vec2`, `Pt3`, ...),
//! - the pinhole + radial-3 camera model used by the rig residuals,
//! - the shared intrinsics parameter layout ([`CameraRole`]).
//!
//! Camera pipeline:
//! `pixel = K ∘ distortion ∘ projection(dir)`
//!
//! Distortion is applied in normalized (pre-focal) coordinates; the
//! intrinsics scale distortion-corrected rays, not raw pixel offsets.

/// Linear algebra type aliases.
pub mod math;
/// Camera model, distortion and parameter layouts.
pub mod models;

pub use math::*;
pub use models::*;
