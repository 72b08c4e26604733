use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::adapters::http::state::HttpState;
use crate::application::dto::{
    CalibrationDto, CalibrationUpdate, ConfigResponse, ConfigUpdatedResponse, DensitiesResponse,
    EstimateResponse,
};
use crate::domain::{calibration::WoodDensity, errors::DomainError};

fn error_response(e: DomainError) -> Response {
    let status = match &e {
        DomainError::InvalidInput(_) | DomainError::InvalidCalibration(_) => StatusCode::BAD_REQUEST,
        DomainError::ImageDecode(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Inference(_) | DomainError::OperationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!("Petición fallida: {}", e);
    }
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}

pub async fn get_config(State(st): State<HttpState>) -> impl IntoResponse {
    match st.estimation.calibration() {
        Ok(cal) => Json(ConfigResponse {
            calibration: CalibrationDto::from(&cal),
            yolo: st.estimation.yolo_params().cloned(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn apply_config(
    State(st): State<HttpState>,
    Json(req): Json<CalibrationUpdate>,
) -> impl IntoResponse {
    match st.estimation.configure(&req) {
        Ok(cal) => Json(ConfigUpdatedResponse::from(&cal)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn list_densities() -> impl IntoResponse {
    Json(DensitiesResponse::current())
}

/// Multipart: `image` (obligatorio) y `density` (`pine`, `oak` o kg/m³, opcional).
pub async fn estimate(State(st): State<HttpState>, mut multipart: Multipart) -> impl IntoResponse {
    let mut image: Option<Vec<u8>> = None;
    let mut density: Option<WoodDensity> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_response(DomainError::InvalidInput(format!("multipart: {e}"))),
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => match field.bytes().await {
                Ok(bytes) => image = Some(bytes.to_vec()),
                Err(e) => return error_response(DomainError::InvalidInput(format!("imagen: {e}"))),
            },
            "density" => {
                let text = match field.text().await {
                    Ok(t) => t,
                    Err(e) => return error_response(DomainError::InvalidInput(format!("densidad: {e}"))),
                };
                if !text.trim().is_empty() {
                    match text.parse::<WoodDensity>() {
                        Ok(d) => density = Some(d),
                        Err(e) => return error_response(e),
                    }
                }
            }
            _ => {}
        }
    }

    let Some(image) = image else {
        return error_response(DomainError::InvalidInput("falta el campo 'image'".into()));
    };

    match st.estimation.estimate_image(image, density).await {
        Ok(report) => Json(EstimateResponse::from_report(&report, true)).into_response(),
        Err(e) => error_response(e),
    }
}
