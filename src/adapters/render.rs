use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::application::ports::AnnotatorPort;
use crate::domain::overlay::{LabelRect, Overlay, TextMetrics};

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const BOX_THICKNESS: i32 = 2;
const FONT_PX: f32 = 18.0;

// Métrica aproximada cuando no hay fuente cargada.
const FALLBACK_CHAR_W: u32 = 10;
const FALLBACK_TEXT_H: u32 = 13;

const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Dibuja cajas y etiquetas con imageproc. Sin fuente se dibujan cajas y fondos, pero no texto.
pub struct ImageprocAnnotator {
    font: Option<FontVec>,
    scale: PxScale,
}

impl ImageprocAnnotator {
    /// Usa `font_path` si se indica; si no, la primera fuente del sistema disponible.
    pub fn load(font_path: Option<&Path>) -> Self {
        let candidates: Vec<PathBuf> = match font_path {
            Some(p) => vec![p.to_path_buf()],
            None => SYSTEM_FONTS.iter().map(PathBuf::from).collect(),
        };

        for path in &candidates {
            match fs::read(path).map_err(|e| e.to_string()).and_then(|bytes| {
                FontVec::try_from_vec(bytes).map_err(|e| e.to_string())
            }) {
                Ok(font) => {
                    info!("Fuente de etiquetas: {}", path.display());
                    return Self { font: Some(font), scale: PxScale::from(FONT_PX) };
                }
                Err(e) if font_path.is_some() => {
                    warn!("No se pudo cargar la fuente {}: {}", path.display(), e);
                }
                Err(_) => {}
            }
        }

        warn!("Sin fuente TTF: las etiquetas se dibujarán sin texto");
        Self::without_font()
    }

    pub fn without_font() -> Self {
        Self { font: None, scale: PxScale::from(FONT_PX) }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }
}

/// Contorno con bordes inclusivos, en `i64`. Los bordes fuera del lienzo se llevan
/// a la primera fila o columna exterior: siguen sin verse y las líneas quedan acotadas.
fn outline_rect(left: i64, top: i64, right: i64, bottom: i64, w: u32, h: u32) -> Option<Rect> {
    let (l, r) = (left.clamp(-1, w as i64), right.clamp(-1, w as i64));
    let (t, b) = (top.clamp(-1, h as i64), bottom.clamp(-1, h as i64));
    if r < l || b < t {
        return None;
    }
    Some(Rect::at(l as i32, t as i32).of_size((r - l + 1) as u32, (b - t + 1) as u32))
}

/// Parte visible del fondo de la etiqueta.
fn visible_label(lr: LabelRect, w: u32, h: u32) -> Option<Rect> {
    let l = (lr.x as i64).max(0);
    let t = (lr.y as i64).max(0);
    let r = (lr.x as i64 + lr.width as i64).min(w as i64);
    let b = (lr.y as i64 + lr.height as i64).min(h as i64);
    if r <= l || b <= t {
        return None;
    }
    Some(Rect::at(l as i32, t as i32).of_size((r - l) as u32, (b - t) as u32))
}

impl AnnotatorPort for ImageprocAnnotator {
    fn text_metrics(&self, text: &str) -> TextMetrics {
        match &self.font {
            Some(font) => {
                let (width, height) = text_size(self.scale, font, text);
                let ascent = font.as_scaled(self.scale).ascent().ceil().max(0.0) as u32;
                TextMetrics { width, height, ascent }
            }
            None => TextMetrics {
                width: text.chars().count() as u32 * FALLBACK_CHAR_W,
                height: FALLBACK_TEXT_H,
                ascent: FALLBACK_TEXT_H,
            },
        }
    }

    fn render(&self, image: &RgbImage, overlays: &[Overlay]) -> RgbImage {
        let mut out = image.clone();
        let (w, h) = out.dimensions();

        for o in overlays {
            let b = o.bbox;
            if b.width() <= 0 || b.height() <= 0 {
                continue;
            }

            let (x1, y1, x2, y2) = (b.x1 as i64, b.y1 as i64, b.x2 as i64, b.y2 as i64);
            for t in 0..BOX_THICKNESS as i64 {
                if let Some(rect) = outline_rect(x1 - t, y1 - t, x2 + t - 1, y2 + t - 1, w, h) {
                    draw_hollow_rect_mut(&mut out, rect, BOX_COLOR);
                }
            }

            let lr = o.label_rect;
            if let Some(rect) = visible_label(lr, w, h) {
                draw_filled_rect_mut(&mut out, rect, BOX_COLOR);
            }

            if let Some(font) = &self.font {
                let (x, y) = o.text_origin;
                let visible = (x as i64) < w as i64
                    && (y as i64) < h as i64
                    && x as i64 + lr.width as i64 > 0
                    && y as i64 + lr.height as i64 > 0;
                if visible {
                    draw_text_mut(&mut out, TEXT_COLOR, x, y, self.scale, font, &o.label);
                }
            }
        }

        out
    }
}
