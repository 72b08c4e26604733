//! Estimación de masa de toras de madera a partir de una fotografía.
//!
//! Capas (Arquitectura Hexagonal):
//! - `domain`: detecciones, calibración, fórmula de masa y geometría de anotación.
//! - `application`: puertos y el servicio de estimación.
//! - `adapters`: YOLO sobre ONNX Runtime, render con imageproc, detecciones precalculadas y HTTP.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
