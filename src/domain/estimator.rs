//! Estimación de diámetro y masa por detección: modelo cilíndrico sobre el ancho de la caja.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::warn;

use super::calibration::Calibration;
use super::detection::{BoundingBox, Detection};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub bbox: BoundingBox,
    pub diameter_m: f64,
    pub mass_kg: f64,
    pub confidence: f32,
}

impl Measurement {
    pub fn label(&self) -> String {
        format!("{:.1}kg | {:.2}m | {:.2}", self.mass_kg, self.diameter_m, self.confidence)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassSummary {
    pub count: usize,
    pub total_mass_kg: f64,
    pub mean_diameter_m: Option<f64>,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub measurements: Vec<Measurement>,
    pub skipped: usize,
}

impl Estimate {
    pub fn summary(&self) -> MassSummary {
        let count = self.measurements.len();
        let total_mass_kg = self.measurements.iter().map(|m| m.mass_kg).sum();
        let mean_diameter_m = (count > 0)
            .then(|| self.measurements.iter().map(|m| m.diameter_m).sum::<f64>() / count as f64);
        MassSummary { count, total_mass_kg, mean_diameter_m, skipped: self.skipped }
    }
}

/// Mide una detección. `None` si la caja es degenerada.
pub fn measure(det: &Detection, cal: &Calibration) -> Option<Measurement> {
    if det.degeneracy().is_some() {
        return None;
    }
    let width_px = det.bbox.width() as f64;
    let diameter_m = width_px * cal.pixels_to_meters();
    let radius_m = diameter_m / 2.0;
    let volume_m3 = PI * radius_m * radius_m * cal.log_length_m();
    let mass_kg = cal.density_kg_per_m3() * volume_m3;
    Some(Measurement { bbox: det.bbox, diameter_m, mass_kg, confidence: det.confidence })
}

/// Una pasada sobre todas las detecciones, conservando el orden de entrada.
pub fn estimate(detections: &[Detection], cal: &Calibration) -> Estimate {
    let mut measurements = Vec::with_capacity(detections.len());
    let mut skipped = 0;
    for det in detections {
        match measure(det, cal) {
            Some(m) => measurements.push(m),
            None => {
                skipped += 1;
                warn!(
                    "Detección descartada {:?}: {}",
                    det.bbox,
                    det.degeneracy().unwrap_or_default()
                );
            }
        }
    }
    Estimate { measurements, skipped }
}
