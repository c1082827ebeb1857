//! CPU usage widget for waygauge.
//!
//! Reads `/proc/stat` and renders the share of busy time between two
//! refreshes through the shared waygauge pipeline.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use waygauge_core::logging::MemoryLogger;
//! use waygauge_cpu::CpuSensor;
//!
//! let sensor = CpuSensor::from_entries(Vec::new(), Arc::new(MemoryLogger::new()))?;
//! let output = sensor.render(42.0);
//! assert_eq!(output.class.as_deref(), Some("warning"));
//! # Ok::<(), waygauge_core::GaugeError>(())
//! ```

pub mod cpu;

pub use cpu::{CpuConfig, CpuSensor, CpuTimes};
