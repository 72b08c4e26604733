use async_trait::async_trait;
use std::path::Path;

use crate::application::ports::ModelCatalogPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::ModelId;

pub struct OnnxModelCatalog;

impl OnnxModelCatalog {
    pub fn new() -> Self { Self }
}

impl Default for OnnxModelCatalog {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl ModelCatalogPort for OnnxModelCatalog {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()> {
        if model.onnx_path.trim().is_empty() {
            return Err(DomainError::InvalidInput("onnx_path vacío".into()));
        }
        let path = Path::new(&model.onnx_path);
        if !path.is_file() {
            return Err(DomainError::NotFound(format!("modelo no encontrado: {}", model.onnx_path)));
        }
        if path.extension().and_then(|e| e.to_str()) != Some("onnx") {
            return Err(DomainError::InvalidInput(format!("se esperaba un fichero .onnx: {}", model.onnx_path)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(path: &str) -> ModelId {
        ModelId { name: "logs".into(), onnx_path: path.into() }
    }

    #[tokio::test]
    async fn validates_paths() {
        let cat = OnnxModelCatalog::new();
        let dir = tempfile::tempdir().unwrap();
        let onnx = dir.path().join("logs.onnx");
        let other = dir.path().join("logs.pt");
        std::fs::write(&onnx, b"stub").unwrap();
        std::fs::write(&other, b"stub").unwrap();

        assert!(cat.validate_model(&model(onnx.to_str().unwrap())).await.is_ok());
        assert!(matches!(
            cat.validate_model(&model(" ")).await,
            Err(DomainError::InvalidInput(_))
        ));
        assert!(matches!(
            cat.validate_model(&model(dir.path().join("missing.onnx").to_str().unwrap())).await,
            Err(DomainError::NotFound(_))
        ));
        assert!(matches!(
            cat.validate_model(&model(other.to_str().unwrap())).await,
            Err(DomainError::InvalidInput(_))
        ));
    }
}
