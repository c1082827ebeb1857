//! GPU widget for waygauge.
//!
//! Shows the busy percentage of a DRM GPU, or the VRAM it has in use, and
//! switches between the two on a left click.

pub mod gpu;

pub use gpu::{DisplayMode, GpuConfig, GpuReading, GpuSensor};
