//! Parameter block packing for solver backends.

pub mod pose_rt;
