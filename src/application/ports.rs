use async_trait::async_trait;
use image::RgbImage;

use crate::domain::{
    detection::Detection,
    errors::DomainResult,
    model::ModelId,
    overlay::{Overlay, TextMetrics},
};

/// Fuente de detecciones. Es CPU intensiva y bloqueante: el servicio la invoca desde `spawn_blocking`.
pub trait DetectorPort: Send + Sync {
    fn detect(&self, image: &RgbImage) -> DomainResult<Vec<Detection>>;
}

pub trait AnnotatorPort: Send + Sync {
    /// Caja y ascenso en píxeles que ocupará `text` al dibujarlo.
    fn text_metrics(&self, text: &str) -> TextMetrics;
    /// Dibuja las anotaciones sobre una copia de `image`.
    fn render(&self, image: &RgbImage, overlays: &[Overlay]) -> RgbImage;
}

#[async_trait]
pub trait ModelCatalogPort: Send + Sync {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()>;
}
