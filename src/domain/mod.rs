pub mod calibration;
pub mod detection;
pub mod errors;
pub mod estimator;
pub mod model;
pub mod overlay;
