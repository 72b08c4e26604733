use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::{DomainError, DomainResult};

/// 500 px = 1 m
pub const DEFAULT_PIXELS_TO_METERS: f64 = 0.002;
pub const DEFAULT_LOG_LENGTH_M: f64 = 2.0;
pub const DEFAULT_DENSITY_KG_M3: f64 = 600.0;

pub const PINE_KG_M3: f64 = 500.0;
pub const OAK_KG_M3: f64 = 700.0;
pub const CUSTOM_DENSITY_RANGE: (f64, f64) = (100.0, 1000.0);

/// Densidad de la madera seleccionable por el usuario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WoodDensity {
    Pine,
    Oak,
    Custom(f64),
}

impl WoodDensity {
    pub fn kg_per_m3(&self) -> f64 {
        match self {
            WoodDensity::Pine => PINE_KG_M3,
            WoodDensity::Oak => OAK_KG_M3,
            WoodDensity::Custom(v) => *v,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if let WoodDensity::Custom(v) = self {
            let (lo, hi) = CUSTOM_DENSITY_RANGE;
            if !v.is_finite() || *v < lo || *v > hi {
                return Err(DomainError::InvalidCalibration(format!(
                    "densidad personalizada {v} fuera de [{lo}, {hi}] kg/m³"
                )));
            }
        }
        Ok(())
    }

    pub fn presets() -> [(&'static str, f64); 2] {
        [("pine", PINE_KG_M3), ("oak", OAK_KG_M3)]
    }
}

impl Default for WoodDensity {
    fn default() -> Self {
        WoodDensity::Custom(DEFAULT_DENSITY_KG_M3)
    }
}

impl fmt::Display for WoodDensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WoodDensity::Pine => write!(f, "pine ({PINE_KG_M3} kg/m³)"),
            WoodDensity::Oak => write!(f, "oak ({OAK_KG_M3} kg/m³)"),
            WoodDensity::Custom(v) => write!(f, "custom ({v} kg/m³)"),
        }
    }
}

/// Acepta `pine`, `oak` o un número en kg/m³.
impl FromStr for WoodDensity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let density = match s.trim().to_ascii_lowercase().as_str() {
            "pine" => WoodDensity::Pine,
            "oak" => WoodDensity::Oak,
            other => other
                .parse::<f64>()
                .map(WoodDensity::Custom)
                .map_err(|_| DomainError::InvalidInput(format!("densidad no reconocida: {s}")))?,
        };
        density.validate()?;
        Ok(density)
    }
}

/// Parámetros de calibración validados. Solo se construyen mediante [`Calibration::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Calibration {
    pixels_to_meters: f64,
    wood: WoodDensity,
    log_length_m: f64,
}

impl Calibration {
    pub fn new(pixels_to_meters: f64, wood: WoodDensity, log_length_m: f64) -> DomainResult<Self> {
        positive("pixels_to_meters_factor", pixels_to_meters)?;
        positive("log_length_m", log_length_m)?;
        positive("wood_density_kg_per_m3", wood.kg_per_m3())?;
        wood.validate()?;
        Ok(Self { pixels_to_meters, wood, log_length_m })
    }

    pub fn pixels_to_meters(&self) -> f64 {
        self.pixels_to_meters
    }

    pub fn wood(&self) -> WoodDensity {
        self.wood
    }

    pub fn density_kg_per_m3(&self) -> f64 {
        self.wood.kg_per_m3()
    }

    pub fn log_length_m(&self) -> f64 {
        self.log_length_m
    }

    pub fn with_wood(&self, wood: WoodDensity) -> DomainResult<Self> {
        Self::new(self.pixels_to_meters, wood, self.log_length_m)
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            pixels_to_meters: DEFAULT_PIXELS_TO_METERS,
            wood: WoodDensity::default(),
            log_length_m: DEFAULT_LOG_LENGTH_M,
        }
    }
}

fn positive(name: &str, value: f64) -> DomainResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DomainError::InvalidCalibration(format!("{name} debe ser > 0, recibido {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let c = Calibration::default();
        assert_eq!(c.pixels_to_meters(), 0.002);
        assert_eq!(c.density_kg_per_m3(), 600.0);
        assert_eq!(c.log_length_m(), 2.0);
    }

    #[test]
    fn rejects_non_positive_parameters() {
        assert!(Calibration::new(0.0, WoodDensity::Pine, 2.0).is_err());
        assert!(Calibration::new(-0.002, WoodDensity::Pine, 2.0).is_err());
        assert!(Calibration::new(0.002, WoodDensity::Pine, 0.0).is_err());
        assert!(Calibration::new(f64::NAN, WoodDensity::Pine, 2.0).is_err());
        assert!(Calibration::new(0.002, WoodDensity::Custom(-5.0), 2.0).is_err());
        assert!(Calibration::new(0.002, WoodDensity::Oak, 2.0).is_ok());
    }

    #[test]
    fn custom_density_range_is_inclusive() {
        assert!(WoodDensity::Custom(100.0).validate().is_ok());
        assert!(WoodDensity::Custom(1000.0).validate().is_ok());
        assert!(WoodDensity::Custom(99.9).validate().is_err());
        assert!(WoodDensity::Custom(1000.1).validate().is_err());
    }

    #[test]
    fn parses_presets_and_numbers() {
        assert_eq!("pine".parse::<WoodDensity>().unwrap(), WoodDensity::Pine);
        assert_eq!(" OAK ".parse::<WoodDensity>().unwrap(), WoodDensity::Oak);
        assert_eq!("650".parse::<WoodDensity>().unwrap(), WoodDensity::Custom(650.0));
        assert!("birch".parse::<WoodDensity>().is_err());
        assert!("5000".parse::<WoodDensity>().is_err());
    }

    #[test]
    fn serde_shape() {
        assert_eq!(serde_json::to_string(&WoodDensity::Pine).unwrap(), r#""pine""#);
        let custom: WoodDensity = serde_json::from_str(r#"{"custom":650.0}"#).unwrap();
        assert_eq!(custom, WoodDensity::Custom(650.0));
    }
}
