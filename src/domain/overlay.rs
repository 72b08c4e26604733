use serde::{Deserialize, Serialize};

use super::detection::BoundingBox;
use super::estimator::Measurement;

/// Separación entre la línea base del texto y el borde superior de la caja.
pub const LABEL_BASELINE_GAP: i32 = 5;
/// Relleno vertical total del fondo de la etiqueta.
pub const LABEL_PADDING: i32 = 10;

/// Métrica de un texto ya maquetado. `ascent` es la distancia del borde superior a la línea base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMetrics {
    pub width: u32,
    pub height: u32,
    pub ascent: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Geometría de anotación para una medición: caja, fondo de la etiqueta y origen del texto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub bbox: BoundingBox,
    pub label: String,
    pub label_rect: LabelRect,
    /// Esquina superior izquierda del texto; la línea base queda en `y1 - 5`.
    pub text_origin: (i32, i32),
}

impl Overlay {
    /// La etiqueta ocupa de `(x1, y1 - h - 10)` a `(x1 + w, y1)`, justo encima de la caja.
    pub fn layout(m: &Measurement, text: TextMetrics) -> Self {
        let b = m.bbox;
        let text_h = i32::try_from(text.height).unwrap_or(i32::MAX);
        let ascent = i32::try_from(text.ascent).unwrap_or(i32::MAX);
        let label_rect = LabelRect {
            x: b.x1,
            y: b.y1.saturating_sub(text_h).saturating_sub(LABEL_PADDING),
            width: text.width,
            height: text.height.saturating_add(LABEL_PADDING as u32),
        };
        let baseline = b.y1.saturating_sub(LABEL_BASELINE_GAP);
        Self {
            bbox: b,
            label: m.label(),
            label_rect,
            text_origin: (b.x1, baseline.saturating_sub(ascent)),
        }
    }
}
