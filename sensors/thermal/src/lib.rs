//! Temperature widget for waygauge.

pub mod thermal;

pub use thermal::{ThermalConfig, ThermalSensor, Temperature};
