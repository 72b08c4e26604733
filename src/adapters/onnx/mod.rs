pub mod model_catalog;
pub mod model_handle;
pub mod yolo_engine;
