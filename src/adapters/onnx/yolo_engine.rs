use anyhow::{anyhow, Result};
use image::{imageops::FilterType, RgbImage};
use ndarray::{s, Array4, ArrayView2, ArrayViewD, Axis, IxDyn};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Value;
use std::collections::HashMap;
use std::fs;
use tracing::{debug, info};

use crate::domain::detection::{BoundingBox, Detection};
use crate::domain::model::YoloParams;

pub struct OnnxYoloEngine {
    session: Session,
}

impl OnnxYoloEngine {
    pub fn load(path: &str) -> Result<Self> {
        let mut builder = Session::builder()?.with_intra_threads(4)?;

        // CUDA es opcional: si está disponible se registra, si no continuamos en CPU.
        let cuda = CUDAExecutionProvider::default().build();
        if let Ok(builder_with_cuda) = builder.clone().with_execution_providers([cuda]) {
            builder = builder_with_cuda;
        }

        let model_bytes = fs::read(path)?;
        let session = builder.commit_from_memory(&model_bytes)?;
        info!("Modelo YOLO cargado: {} ({} bytes)", path, model_bytes.len());

        Ok(Self { session })
    }

    pub fn infer(&mut self, rgb: &RgbImage, params: &YoloParams) -> Result<Vec<Detection>> {
        let imgsz = params.input_size as usize;
        let input = preprocess(rgb, params.input_size);

        let input_shape = vec![1, 3, imgsz as i64, imgsz as i64];
        let input_tensor = Value::from_array((input_shape, input.into_raw_vec_and_offset().0))?;

        let outputs = self.session.run(ort::inputs![input_tensor])?;
        let (shape_out, data_out) = outputs[0].try_extract_tensor::<f32>()?;

        let dims: Vec<usize> = shape_out.iter().map(|&x| x as usize).collect();
        if dims.len() != 3 || dims[1] < 5 {
            return Err(anyhow!("Salida YOLO inesperada: {:?}", dims));
        }
        let array_view = ArrayViewD::from_shape(IxDyn(&dims), data_out)?;
        let view = array_view.index_axis(Axis(0), 0).into_dimensionality()?;

        let detections = decode_output(view, rgb.width(), rgb.height(), params);
        debug!("{} candidatos, {} detecciones tras NMS", dims[2], detections.len());
        Ok(detections)
    }
}

/// RGB -> tensor NCHW normalizado a [0, 1].
pub fn preprocess(rgb: &RgbImage, input_size: u32) -> Array4<f32> {
    let imgsz = input_size as usize;
    let resized = image::imageops::resize(rgb, input_size, input_size, FilterType::Triangle);

    let mut input = Array4::<f32>::zeros((1, 3, imgsz, imgsz));
    for (x, y, pixel) in resized.enumerate_pixels() {
        input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
        input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
        input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
    }
    input
}

/// Decodifica la salida `[4 + clases, candidatos]` (cx, cy, w, h, puntuaciones) a cajas enteras
/// en coordenadas de la imagen original, aplicando umbral, filtro de clase y NMS.
pub fn decode_output(
    view: ArrayView2<f32>,
    img_w: u32,
    img_h: u32,
    params: &YoloParams,
) -> Vec<Detection> {
    let num_candidates = view.shape()[1];
    let sx = img_w as f32 / params.input_size as f32;
    let sy = img_h as f32 / params.input_size as f32;

    let mut detections = Vec::new();

    for i in 0..num_candidates {
        let scores = view.slice(s![4.., i]);
        let Some((class_id, &max_score)) =
            scores.indexed_iter().max_by(|(_, a), (_, b)| a.total_cmp(b))
        else {
            continue;
        };

        if max_score <= params.conf_threshold {
            continue;
        }
        if params.class_id.is_some_and(|c| c != class_id) {
            continue;
        }

        let cx = view[[0, i]];
        let cy = view[[1, i]];
        let w = view[[2, i]];
        let h = view[[3, i]];

        let clamp_x = |v: f32| (v * sx).clamp(0.0, img_w as f32) as i32;
        let clamp_y = |v: f32| (v * sy).clamp(0.0, img_h as f32) as i32;

        detections.push(Detection {
            bbox: BoundingBox::new(
                clamp_x(cx - w / 2.0),
                clamp_y(cy - h / 2.0),
                clamp_x(cx + w / 2.0),
                clamp_y(cy + h / 2.0),
            ),
            confidence: max_score,
            class_id,
        });
    }

    let mut kept = nms(detections, params.iou_threshold);
    kept.sort_unstable_by(|a, b| b.confidence.total_cmp(&a.confidence));
    kept.truncate(params.max_detections);
    kept
}

/// NMS voraz por clase.
pub fn nms(detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    let mut by_class: HashMap<usize, Vec<Detection>> = HashMap::new();
    for d in detections {
        by_class.entry(d.class_id).or_default().push(d);
    }

    let mut kept = Vec::new();
    for (_, mut group) in by_class {
        group.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        let mut suppressed = vec![false; group.len()];
        for i in 0..group.len() {
            if suppressed[i] {
                continue;
            }
            for j in (i + 1)..group.len() {
                if !suppressed[j] && group[i].bbox.iou(&group[j].bbox) > iou_threshold {
                    suppressed[j] = true;
                }
            }
            kept.push(group[i].clone());
        }
    }
    kept
}
