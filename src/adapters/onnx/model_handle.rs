use image::RgbImage;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{error, info};

use crate::adapters::onnx::yolo_engine::OnnxYoloEngine;
use crate::application::ports::DetectorPort;
use crate::domain::{
    detection::Detection,
    errors::{DomainError, DomainResult},
    model::InferenceConfig,
};

type SharedEngine = Arc<Mutex<OnnxYoloEngine>>;

/// Manejador único del modelo para todo el proceso.
/// La sesión ONNX se carga en el primer uso y se reutiliza; `teardown` la libera explícitamente.
pub struct ModelHandle {
    cfg: InferenceConfig,
    slot: RwLock<Option<SharedEngine>>,
}

impl ModelHandle {
    pub fn new(cfg: InferenceConfig) -> Self {
        Self { cfg, slot: RwLock::new(None) }
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.read().map(|s| s.is_some()).unwrap_or(false)
    }

    /// Devuelve el motor, cargándolo si todavía no existe.
    pub fn get_or_init(&self) -> DomainResult<SharedEngine> {
        if let Some(engine) = self.slot.read().map_err(|_| poisoned())?.as_ref() {
            return Ok(engine.clone());
        }

        let mut slot = self.slot.write().map_err(|_| poisoned())?;
        // Otro hilo pudo cargarlo mientras esperábamos el lock de escritura.
        if let Some(engine) = slot.as_ref() {
            return Ok(engine.clone());
        }

        info!("Cargando modelo {} desde {}", self.cfg.model.name, self.cfg.model.onnx_path);
        let engine = OnnxYoloEngine::load(&self.cfg.model.onnx_path).map_err(|e| {
            error!("Error cargando modelo YOLO: {:?}", e);
            DomainError::Inference(format!("no se pudo cargar {}: {e}", self.cfg.model.onnx_path))
        })?;
        let engine = Arc::new(Mutex::new(engine));
        *slot = Some(engine.clone());
        Ok(engine)
    }

    /// Libera la sesión. Un uso posterior la vuelve a cargar.
    pub fn teardown(&self) {
        if let Ok(mut slot) = self.slot.write() {
            if slot.take().is_some() {
                info!("Modelo {} liberado", self.cfg.model.name);
            }
        }
    }
}

impl DetectorPort for ModelHandle {
    fn detect(&self, image: &RgbImage) -> DomainResult<Vec<Detection>> {
        let engine = self.get_or_init()?;
        let mut engine = engine.lock().map_err(|_| poisoned())?;
        engine
            .infer(image, &self.cfg.params)
            .map_err(|e| DomainError::Inference(e.to_string()))
    }
}

fn poisoned() -> DomainError {
    DomainError::OperationFailed("Lock del modelo fallido".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ModelId, YoloParams};

    fn handle(path: &str) -> ModelHandle {
        ModelHandle::new(InferenceConfig {
            model: ModelId { name: "test".into(), onnx_path: path.into() },
            params: YoloParams::default(),
        })
    }

    #[test]
    fn starts_unloaded_and_teardown_is_idempotent() {
        let h = handle("/nonexistent/model.onnx");
        assert!(!h.is_loaded());
        h.teardown();
        h.teardown();
        assert!(!h.is_loaded());
    }

    #[test]
    fn missing_model_is_an_inference_error() {
        let h = handle("/nonexistent/model.onnx");
        let err = h.detect(&RgbImage::new(4, 4)).unwrap_err();
        assert!(matches!(err, DomainError::Inference(_)));
        assert!(!h.is_loaded());
    }
}
