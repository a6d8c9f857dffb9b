//! Problem builders tying factors and parameter blocks together.

pub mod rig_bundle;
