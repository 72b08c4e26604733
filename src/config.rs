//! Configuración del proceso: argumentos de línea de comandos con respaldo en variables `LOGMASS_*`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::{
    calibration::{Calibration, WoodDensity, DEFAULT_LOG_LENGTH_M, DEFAULT_PIXELS_TO_METERS},
    errors::DomainResult,
    model::{InferenceConfig, ModelId, YoloParams},
};

#[derive(Parser, Debug)]
#[command(name = "logmass")]
#[command(about = "Estimación de masa de toras de madera a partir de una fotografía")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Arranca el servidor HTTP
    Serve(ServeArgs),
    /// Procesa una imagen local e imprime el informe JSON
    Estimate(EstimateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, env = "LOGMASS_BIND", default_value = "0.0.0.0:8090")]
    pub bind: String,

    /// Modelo YOLO exportado a ONNX
    #[arg(long, env = "LOGMASS_MODEL")]
    pub model: PathBuf,

    /// Cargar el modelo al arrancar en lugar de en la primera petición
    #[arg(long, env = "LOGMASS_PRELOAD")]
    pub preload: bool,

    /// Fuente TTF para las etiquetas
    #[arg(long, env = "LOGMASS_FONT")]
    pub font: Option<PathBuf>,

    #[arg(long, env = "LOGMASS_MAX_UPLOAD_MB", default_value_t = 20, value_parser = clap::value_parser!(u64).range(1..=512))]
    pub max_upload_mb: u64,

    #[command(flatten)]
    pub calibration: CalibrationArgs,

    #[command(flatten)]
    pub yolo: YoloArgs,
}

#[derive(Args, Debug, Clone)]
pub struct EstimateArgs {
    /// Imagen de entrada (jpg, png, ...)
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,

    #[arg(long, env = "LOGMASS_MODEL", conflicts_with = "detections", required_unless_present = "detections")]
    pub model: Option<PathBuf>,

    /// JSON con detecciones ya calculadas; sustituye al modelo
    #[arg(long)]
    pub detections: Option<PathBuf>,

    /// Dónde guardar la imagen anotada (el formato se deduce de la extensión)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(long, env = "LOGMASS_FONT")]
    pub font: Option<PathBuf>,

    #[command(flatten)]
    pub calibration: CalibrationArgs,

    #[command(flatten)]
    pub yolo: YoloArgs,
}

#[derive(Args, Debug, Clone)]
pub struct CalibrationArgs {
    /// Metros por píxel (0.002 = 500 px por metro)
    #[arg(long, env = "LOGMASS_PIXELS_TO_METERS", default_value_t = DEFAULT_PIXELS_TO_METERS)]
    pub pixels_to_meters: f64,

    /// Densidad: `pine` (500), `oak` (700) o kg/m³ en [100, 1000]
    #[arg(long, env = "LOGMASS_DENSITY", default_value = "600", value_parser = parse_density)]
    pub density: WoodDensity,

    /// Longitud supuesta de cada tora en metros
    #[arg(long, env = "LOGMASS_LOG_LENGTH", default_value_t = DEFAULT_LOG_LENGTH_M)]
    pub log_length: f64,
}

impl CalibrationArgs {
    pub fn to_calibration(&self) -> DomainResult<Calibration> {
        Calibration::new(self.pixels_to_meters, self.density, self.log_length)
    }
}

#[derive(Args, Debug, Clone)]
pub struct YoloArgs {
    #[arg(long, default_value_t = 640)]
    pub imgsz: u32,

    #[arg(long, default_value_t = 0.25, value_parser = parse_probability)]
    pub conf: f32,

    #[arg(long, default_value_t = 0.45, value_parser = parse_probability)]
    pub iou: f32,

    #[arg(long, default_value_t = 100)]
    pub max_det: usize,

    /// Conservar solo esta clase del modelo
    #[arg(long)]
    pub class_id: Option<usize>,
}

impl YoloArgs {
    pub fn to_params(&self) -> YoloParams {
        YoloParams {
            input_size: self.imgsz,
            conf_threshold: self.conf,
            iou_threshold: self.iou,
            max_detections: self.max_det,
            class_id: self.class_id,
        }
    }

    pub fn inference_config(&self, model: &std::path::Path) -> InferenceConfig {
        let name = model
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "yolo".into());
        InferenceConfig {
            model: ModelId { name, onnx_path: model.to_string_lossy().to_string() },
            params: self.to_params(),
        }
    }
}

pub fn parse_probability(s: &str) -> Result<f32, String> {
    let val = s.parse::<f32>().map_err(|_| format!("Número inválido: '{s}'"))?;
    if !(0.0..=1.0).contains(&val) {
        return Err(format!("Debe estar entre 0.0 y 1.0, recibido {val}"));
    }
    Ok(val)
}

pub fn parse_density(s: &str) -> Result<WoodDensity, String> {
    s.parse::<WoodDensity>().map_err(|e| e.to_string())
}
