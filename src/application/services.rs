use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::{debug, info};

use crate::{
    application::{
        dto::CalibrationUpdate,
        ports::{AnnotatorPort, DetectorPort},
    },
    domain::{
        calibration::{Calibration, WoodDensity},
        errors::{DomainError, DomainResult},
        estimator::{self, MassSummary, Measurement},
        model::YoloParams,
        overlay::Overlay,
    },
};

/// Resultado de una pasada completa sobre una imagen.
#[derive(Debug, Clone)]
pub struct EstimationReport {
    pub width: u32,
    pub height: u32,
    pub infer_ms: f32,
    pub calibration: Calibration,
    pub measurements: Vec<Measurement>,
    pub overlays: Vec<Overlay>,
    pub summary: MassSummary,
    pub annotated: RgbImage,
    pub annotated_png: Vec<u8>,
}

/// Orquestador de la estimación: decodificación, detección, cálculo de masa y anotación.
/// Es dueño de la calibración activa, que solo cambia mediante [`EstimationService::configure`].
#[derive(Clone)]
pub struct EstimationService {
    detector: Arc<dyn DetectorPort>,
    annotator: Arc<dyn AnnotatorPort>,
    calibration: Arc<RwLock<Calibration>>,
    yolo: Option<YoloParams>,
}

impl EstimationService {
    pub fn new(
        detector: Arc<dyn DetectorPort>,
        annotator: Arc<dyn AnnotatorPort>,
        calibration: Calibration,
    ) -> Self {
        Self {
            detector,
            annotator,
            calibration: Arc::new(RwLock::new(calibration)),
            yolo: None,
        }
    }

    pub fn with_yolo_params(mut self, params: YoloParams) -> Self {
        self.yolo = Some(params);
        self
    }

    pub fn yolo_params(&self) -> Option<&YoloParams> {
        self.yolo.as_ref()
    }

    pub fn calibration(&self) -> DomainResult<Calibration> {
        self.calibration
            .read()
            .map(|c| *c)
            .map_err(|_| DomainError::OperationFailed("Lock de calibración fallido".into()))
    }

    /// Valida la actualización y solo entonces reemplaza la calibración activa.
    pub fn configure(&self, update: &CalibrationUpdate) -> DomainResult<Calibration> {
        let mut lock = self
            .calibration
            .write()
            .map_err(|_| DomainError::OperationFailed("Lock de calibración fallido".into()))?;
        let next = update.apply(&lock)?;
        *lock = next;
        info!(
            "Calibración actualizada: {} m/px, {}, {} m",
            next.pixels_to_meters(),
            next.wood(),
            next.log_length_m()
        );
        Ok(next)
    }

    /// Procesa una imagen codificada. `density` sustituye la densidad activa solo para esta pasada.
    pub async fn estimate_image(
        &self,
        bytes: Vec<u8>,
        density: Option<WoodDensity>,
    ) -> DomainResult<EstimationReport> {
        let calibration = match density {
            Some(wood) => self.calibration()?.with_wood(wood)?,
            None => self.calibration()?,
        };
        let detector = self.detector.clone();
        let annotator = self.annotator.clone();

        tokio::task::spawn_blocking(move || {
            let rgb = decode(&bytes)?;
            run_pass(detector.as_ref(), annotator.as_ref(), &rgb, &calibration)
        })
        .await
        .map_err(|e| DomainError::OperationFailed(format!("Tarea de estimación abortada: {e}")))?
    }
}

pub fn decode(bytes: &[u8]) -> DomainResult<RgbImage> {
    if bytes.is_empty() {
        return Err(DomainError::InvalidInput("imagen vacía".into()));
    }
    let img = image::load_from_memory(bytes).map_err(|e| DomainError::ImageDecode(e.to_string()))?;
    Ok(img.to_rgb8())
}

pub fn encode_png(img: &RgbImage) -> DomainResult<Vec<u8>> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img.clone())
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| DomainError::OperationFailed(format!("Error codificando PNG: {e}")))?;
    Ok(buf)
}

/// Pasada síncrona: detectar, medir, maquetar y dibujar.
pub fn run_pass(
    detector: &dyn DetectorPort,
    annotator: &dyn AnnotatorPort,
    rgb: &RgbImage,
    calibration: &Calibration,
) -> DomainResult<EstimationReport> {
    let t_infer_start = Instant::now();
    let detections = detector.detect(rgb)?;
    let infer_ms = t_infer_start.elapsed().as_secs_f32() * 1000.0;
    debug!("{} detecciones en {:.1} ms", detections.len(), infer_ms);

    let estimate = estimator::estimate(&detections, calibration);
    let overlays: Vec<Overlay> = estimate
        .measurements
        .iter()
        .map(|m| Overlay::layout(m, annotator.text_metrics(&m.label())))
        .collect();
    let annotated = annotator.render(rgb, &overlays);
    let annotated_png = encode_png(&annotated)?;
    let summary = estimate.summary();

    info!(
        "Toras detectadas: {} ({} descartadas), masa total {:.1} kg",
        summary.count, summary.skipped, summary.total_mass_kg
    );

    Ok(EstimationReport {
        width: rgb.width(),
        height: rgb.height(),
        infer_ms,
        calibration: *calibration,
        measurements: estimate.measurements,
        overlays,
        summary,
        annotated,
        annotated_png,
    })
}
