use serde::{Deserialize, Serialize};

/// Caja delimitadora en píxeles enteros, esquinas (x1, y1) - (x2, y2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// En `i64`: la diferencia de dos `i32` no cabe en `i32`.
    pub fn width(&self) -> i64 {
        self.x2 as i64 - self.x1 as i64
    }

    pub fn height(&self) -> i64 {
        self.y2 as i64 - self.y1 as i64
    }

    pub fn area(&self) -> i128 {
        self.width().max(0) as i128 * self.height().max(0) as i128
    }

    pub fn iou(&self, other: &Self) -> f32 {
        let ix = (self.x2.min(other.x2) as i64 - self.x1.max(other.x1) as i64).max(0) as i128;
        let iy = (self.y2.min(other.y2) as i64 - self.y1.max(other.y1) as i64).max(0) as i128;
        let inter = ix * iy;
        let union = self.area() + other.area() - inter;
        if union <= 0 {
            return 0.0;
        }
        inter as f32 / union as f32
    }
}

/// Salida del detector: una caja y su confianza. Entrada inmutable del estimador.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(flatten)]
    pub bbox: BoundingBox,
    pub confidence: f32,
    #[serde(default)]
    pub class_id: usize,
}

impl Detection {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32, confidence: f32) -> Self {
        Self { bbox: BoundingBox::new(x1, y1, x2, y2), confidence, class_id: 0 }
    }

    /// Motivo por el que la detección no puede medirse, si lo hay.
    pub fn degeneracy(&self) -> Option<String> {
        if self.bbox.width() <= 0 {
            return Some(format!("ancho no positivo ({} px)", self.bbox.width()));
        }
        if self.bbox.height() <= 0 {
            return Some(format!("alto no positivo ({} px)", self.bbox.height()));
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Some(format!("confianza fuera de [0, 1] ({})", self.confidence));
        }
        None
    }
}
