//! Package power widget for waygauge.
//!
//! Reads the Intel RAPL energy counters exposed under
//! `/sys/class/powercap` and reports package, core and uncore power.

pub mod rapl;

pub use rapl::{Power, RaplConfig, RaplSensor};
