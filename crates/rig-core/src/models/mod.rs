mod camera;
mod distortion;
mod params;

pub use camera::PinholeRadial3;
pub use distortion::{DistortionModel, Radial3};
pub use params::{radial3_coefficients, CameraRole};
