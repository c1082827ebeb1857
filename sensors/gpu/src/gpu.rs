//! GPU busy/VRAM widget for amdgpu-style DRM sysfs files.
//!
//! A left click flips the bar between the `default` format (busy percent)
//! and the `alt` format (VRAM in use).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use waygauge_core::cli::Configured;
use waygauge_core::{
    read_value, ConfigEntry, Direction, EventKind, EventResponse, FormatArg, GaugeError, Logger,
    ParsedConfig, Sensor, WaybarOutput, Widget,
};

/// Widget name, also the configuration file stem.
pub const NAME: &str = "gpu";

const DEFAULT_DRM_ROOT: &str = "/sys/class/drm";
const DEFAULT_DEVICE: &str = "/sys/class/drm/card1/device";
const BUSY_FILE: &str = "gpu_busy_percent";
const VRAM_FILE: &str = "mem_info_vram_used";
const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// GPU widget configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuConfig {
    pub base: ParsedConfig<i64>,
    pub gpu_usage_path: PathBuf,
    pub vram_used_path: PathBuf,
}

impl GpuConfig {
    /// Defaults overlaid with `entries`.
    ///
    /// Paths that are not configured point at the first DRM card exposing
    /// `gpu_busy_percent` below `drm-root`, or at `card1`.
    pub fn parse<I>(entries: I, logger: &dyn Logger) -> Self
    where
        I: IntoIterator<Item = ConfigEntry>,
    {
        let base = ParsedConfig::new()
            .with_icon("default", "󰍹")
            .with_format("default", "{icon}\u{2004}{gpu_usage:>2}%")
            .with_format("alt", "{icon}\u{2004}{vram_used}GB")
            .with_tooltip_format("GPU: {gpu_usage}%\nVRAM: {vram_used}G")
            .parse(entries, logger);

        let device = || {
            let root = base.string("drm-root", DEFAULT_DRM_ROOT);
            find_drm_device(Path::new(&root)).unwrap_or_else(|| PathBuf::from(DEFAULT_DEVICE))
        };
        let gpu_usage_path = base
            .raw("gpu-usage-path")
            .map_or_else(|| device().join(BUSY_FILE), PathBuf::from);
        let vram_used_path = base
            .raw("vram-used-path")
            .map_or_else(|| device().join(VRAM_FILE), PathBuf::from);

        Self {
            base,
            gpu_usage_path,
            vram_used_path,
        }
    }
}

/// First `cardN/device` below `root` that reports a busy percentage.
///
/// Connector entries such as `card0-eDP-1` are skipped.
#[must_use]
pub fn find_drm_device(root: &Path) -> Option<PathBuf> {
    let mut cards: Vec<PathBuf> = fs::read_dir(root)
        .ok()?
        .flatten()
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with("card") && !name.contains('-'))
        })
        .map(|entry| entry.path().join("device"))
        .filter(|device| device.join(BUSY_FILE).exists())
        .collect();
    cards.sort();
    cards.into_iter().next()
}

/// Which template the bar shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayMode {
    #[default]
    Usage,
    Vram,
}

impl DisplayMode {
    /// Format key for this mode.
    #[must_use]
    pub const fn format_key(self) -> &'static str {
        match self {
            Self::Usage => "default",
            Self::Vram => "alt",
        }
    }

    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Usage => Self::Vram,
            Self::Vram => Self::Usage,
        }
    }
}

/// One GPU reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpuReading {
    /// Busy percentage, 0-100.
    pub usage: i64,
    /// VRAM in use, GiB.
    pub vram_used: f64,
}

/// GPU sensor.
#[derive(Debug)]
pub struct GpuSensor {
    widget: Widget<i64>,
    gpu_usage_path: PathBuf,
    vram_used_path: PathBuf,
    mode: DisplayMode,
}

impl GpuSensor {
    #[must_use]
    pub fn new(config: GpuConfig, logger: Arc<dyn Logger>) -> Self {
        Self {
            widget: Widget::new(NAME, config.base, logger),
            gpu_usage_path: config.gpu_usage_path,
            vram_used_path: config.vram_used_path,
            mode: DisplayMode::default(),
        }
    }

    pub fn from_entries(entries: Vec<ConfigEntry>, logger: Arc<dyn Logger>) -> Result<Self, GaugeError> {
        let config = GpuConfig::parse(entries, logger.as_ref());
        Ok(Self::new(config, logger))
    }

    #[must_use]
    pub const fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Read busy percentage and VRAM usage.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be read or parsed.
    pub fn reading(&self) -> Result<GpuReading, GaugeError> {
        let usage = read_value::<i64>(&self.gpu_usage_path)?;
        let vram_bytes = read_value::<u64>(&self.vram_used_path)?;
        Ok(GpuReading {
            usage,
            vram_used: vram_bytes as f64 / BYTES_PER_GIB,
        })
    }

    /// Render a reading with the current display mode.
    #[must_use]
    pub fn render(&self, reading: GpuReading) -> WaybarOutput {
        let state = self.widget.classify(reading.usage, Direction::AscendingIsWorse);
        let format = self.widget.config().format_for_state(self.mode.format_key());
        let args = [
            FormatArg::new("gpu_usage", reading.usage),
            FormatArg::new("vram_used", reading.vram_used),
        ];
        let percentage = u8::try_from(reading.usage.clamp(0, 100)).ok();
        self.widget.present_with(state, format, &args, percentage)
    }
}

impl Sensor for GpuSensor {
    type Error = GaugeError;

    fn read(&mut self) -> Result<WaybarOutput, Self::Error> {
        Ok(self.render(self.reading()?))
    }

    fn name(&self) -> &str {
        self.widget.name()
    }

    fn interval(&self) -> Duration {
        self.widget.config().interval()
    }

    fn check_availability(&self) -> Result<(), Self::Error> {
        self.reading()
            .map(|_| ())
            .map_err(|e| GaugeError::unavailable(format!("GPU sysfs files not readable: {e}")))
    }

    fn handle_event(&mut self, event: EventKind) -> EventResponse {
        if event == EventKind::OnLeftClick {
            self.mode = self.mode.toggled();
            self.widget.logger().info(&format!(
                "GPU format switched to {}",
                self.mode.format_key()
            ));
            return EventResponse::Rerender;
        }
        self.widget.respond(event)
    }
}

impl Configured for GpuSensor {
    fn config_document(&self) -> BTreeMap<String, serde_json::Value> {
        let mut document = self.widget.config().to_document();
        for (key, path) in [
            ("gpu-usage-path", &self.gpu_usage_path),
            ("vram-used-path", &self.vram_used_path),
        ] {
            document.insert(key.to_owned(), serde_json::Value::String(path.display().to_string()));
        }
        document
    }
}
