use std::sync::Arc;
use crate::application::services::EstimationService;

/// Estado compartido para los manejadores HTTP de Axum.
/// Siguiendo la Arquitectura Hexagonal, el estado contiene los servicios (Casos de Uso).
#[derive(Clone)]
pub struct HttpState {
    /// Servicio de estimación: detección, cálculo de masa, anotación y calibración activa.
    pub estimation: Arc<EstimationService>,
}
