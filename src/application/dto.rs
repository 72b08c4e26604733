use base64::{prelude::BASE64_STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::application::services::EstimationReport;
use crate::domain::{
    calibration::{Calibration, WoodDensity, CUSTOM_DENSITY_RANGE},
    errors::DomainResult,
    estimator::{MassSummary, Measurement},
    model::YoloParams,
};

/// Actualización parcial de la calibración; los campos ausentes conservan su valor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalibrationUpdate {
    pub pixels_to_meters_factor: Option<f64>,
    pub wood_density: Option<WoodDensity>,
    pub log_length_m: Option<f64>,
}

impl CalibrationUpdate {
    pub fn apply(&self, current: &Calibration) -> DomainResult<Calibration> {
        Calibration::new(
            self.pixels_to_meters_factor.unwrap_or(current.pixels_to_meters()),
            self.wood_density.unwrap_or(current.wood()),
            self.log_length_m.unwrap_or(current.log_length_m()),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationDto {
    pub pixels_to_meters_factor: f64,
    pub wood_density: WoodDensity,
    pub wood_density_kg_per_m3: f64,
    pub log_length_m: f64,
}

impl From<&Calibration> for CalibrationDto {
    fn from(c: &Calibration) -> Self {
        Self {
            pixels_to_meters_factor: c.pixels_to_meters(),
            wood_density: c.wood(),
            wood_density_kg_per_m3: c.density_kg_per_m3(),
            log_length_m: c.log_length_m(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub calibration: CalibrationDto,
    pub yolo: Option<YoloParams>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DensityPreset {
    pub name: String,
    pub kg_per_m3: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DensitiesResponse {
    pub presets: Vec<DensityPreset>,
    pub custom_min: f64,
    pub custom_max: f64,
}

impl DensitiesResponse {
    pub fn current() -> Self {
        Self {
            presets: WoodDensity::presets()
                .into_iter()
                .map(|(name, kg_per_m3)| DensityPreset { name: name.to_string(), kg_per_m3 })
                .collect(),
            custom_min: CUSTOM_DENSITY_RANGE.0,
            custom_max: CUSTOM_DENSITY_RANGE.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateResponse {
    pub width: u32,
    pub height: u32,
    pub infer_ms: f32,
    pub calibration: CalibrationDto,
    pub measurements: Vec<Measurement>,
    pub summary: MassSummary,
    /// PNG anotado en base64. Se omite en la salida de la CLI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotated_png_base64: Option<String>,
}

impl EstimateResponse {
    pub fn from_report(report: &EstimationReport, with_image: bool) -> Self {
        Self {
            width: report.width,
            height: report.height,
            infer_ms: report.infer_ms,
            calibration: CalibrationDto::from(&report.calibration),
            measurements: report.measurements.clone(),
            summary: report.summary.clone(),
            annotated_png_base64: with_image.then(|| BASE64_STANDARD.encode(&report.annotated_png)),
        }
    }
}

/// Respuesta de `POST /api/config`: la calibración que queda activa.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigUpdatedResponse {
    pub ok: bool,
    pub calibration: CalibrationDto,
}

impl From<&Calibration> for ConfigUpdatedResponse {
    fn from(c: &Calibration) -> Self {
        Self { ok: true, calibration: CalibrationDto::from(c) }
    }
}
