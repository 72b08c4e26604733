pub mod http;
pub mod onnx;
pub mod precomputed;
pub mod render;
