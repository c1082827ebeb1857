//! Temperature widget backed by a hwmon `temp*_input` file.

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
pub const NAME: &str = "thermal";

const DEFAULT_HWMON_ROOT: &str = "/sys/class/hwmon";

/// Thermal widget configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalConfig {
    pub base: ParsedConfig<i64>,
    /// Explicit `temp*_input` file; discovered under `hwmon_root` when unset.
    pub hwmon_path: Option<PathBuf>,
    pub hwmon_root: PathBuf,
}

impl ThermalConfig {
    pub fn parse<I>(entries: I, logger: &dyn Logger) -> Self
    where
        I: IntoIterator<Item = ConfigEntry>,
    {
        let base = ParsedConfig::new()
            .with_icon("default", "\u{f2c9}")
            .with_format("default", "{icon}\u{2004}{temperature_c}°C")
            .with_tooltip_format(
                "Temperature: {temperature_c}°C\nFahrenheit: {temperature_f}°F\nKelvin: {temperature_k}K",
            )
            .with_threshold("warning", 60)
            .with_threshold("critical", 80)
            .parse(entries, logger);

        let hwmon_path = base
            .raw("hwmon-path")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);
        let hwmon_root = PathBuf::from(base.string("hwmon-root", DEFAULT_HWMON_ROOT));
        Self {
            base,
            hwmon_path,
            hwmon_root,
        }
    }
}

/// One temperature in the three units the templates expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Temperature {
    pub celsius: i64,
    pub fahrenheit: i64,
    pub kelvin: i64,
}

impl Temperature {
    /// Convert a hwmon reading in millidegrees Celsius.
    #[must_use]
    pub fn from_millidegrees(millidegrees: i64) -> Self {
        let celsius = millidegrees as f64 / 1000.0;
        Self {
            celsius: celsius.round() as i64,
            fahrenheit: (celsius * 1.8 + 32.0).round() as i64,
            kelvin: (celsius + 273.15).round() as i64,
        }
    }
}

/// Pick the most CPU-like `temp*_input` below `root`.
///
/// Labeled package/die sensors beat unlabeled ones and inputs reading
/// outside 5-150°C are skipped.
///
/// # Errors
///
/// Returns [`GaugeError::Unavailable`] when no usable input exists.
pub fn find_hwmon_input(root: &Path) -> Result<PathBuf, GaugeError> {
    let mut candidates: Vec<(u8, PathBuf)> = Vec::new();

    for device in fs::read_dir(root)?.flatten() {
        let device_path = device.path();
        let device_name = fs::read_to_string(device_path.join("name"))
            .map(|name| name.trim().to_lowercase())
            .unwrap_or_default();

        let Ok(inputs) = fs::read_dir(&device_path) else {
            continue;
        };
        for input in inputs.flatten() {
            let file_name = input.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if !(name.starts_with("temp") && name.ends_with("_input")) {
                continue;
            }

            let path = input.path();
            let Ok(millidegrees) = read_value::<i64>(&path) else {
                continue;
            };
            if !(5_000..=150_000).contains(&millidegrees) {
                continue;
            }

            let label = fs::read_to_string(path.with_file_name(name.replace("_input", "_label")))
                .map(|label| label.trim().to_lowercase())
                .ok();
            candidates.push((priority(&device_name, label.as_deref()), path));
        }
    }

    // Highest priority first, then path order for stability.
    candidates.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    candidates
        .into_iter()
        .next()
        .map(|(_, path)| path)
        .ok_or_else(|| {
            GaugeError::unavailable(format!(
                "No hwmon temperature inputs found under {}",
                root.display()
            ))
        })
}

fn priority(device: &str, label: Option<&str>) -> u8 {
    let amd = device.contains("zenpower") || device.contains("k10temp");
    match label {
        Some(label) if amd && (label.contains("tdie") || label.contains("tctl")) => 110,
        Some(label)
            if ["cpu", "core", "package", "tctl", "tdie"]
                .iter()
                .any(|hint| label.contains(hint)) =>
        {
            100
        }
        Some(_) => 50,
        None if amd => 90,
        None if device.contains("coretemp") || device.contains("cpu") => 80,
        None => 10,
    }
}

/// Temperature sensor.
#[derive(Debug)]
pub struct ThermalSensor {
    widget: Widget<i64>,
    path: PathBuf,
}

impl ThermalSensor {
    /// Create the sensor, discovering the input file when none is configured.
    ///
    /// # Errors
    ///
    /// Returns an error when no input file is configured and none can be found.
    pub fn new(config: ThermalConfig, logger: Arc<dyn Logger>) -> Result<Self, GaugeError> {
        let path = match config.hwmon_path {
            Some(path) => path,
            None => {
                let found = find_hwmon_input(&config.hwmon_root)?;
                logger.info(&format!("Using temperature input {}", found.display()));
                found
            }
        };
        Ok(Self {
            widget: Widget::new(NAME, config.base, logger),
            path,
        })
    }

    pub fn from_entries(entries: Vec<ConfigEntry>, logger: Arc<dyn Logger>) -> Result<Self, GaugeError> {
        let config = ThermalConfig::parse(entries, logger.as_ref());
        Self::new(config, logger)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current temperature.
    ///
    /// # Errors
    ///
    /// Returns an error if the input file cannot be read or parsed.
    pub fn temperature(&self) -> Result<Temperature, GaugeError> {
        read_value::<i64>(&self.path).map(Temperature::from_millidegrees)
    }

    #[must_use]
    pub fn render(&self, temperature: Temperature) -> WaybarOutput {
        let state = self
            .widget
            .classify(temperature.celsius, Direction::AscendingIsWorse);
        let args = [
            FormatArg::new("temperature_c", temperature.celsius),
            FormatArg::new("temperature_f", temperature.fahrenheit),
            FormatArg::new("temperature_k", temperature.kelvin),
        ];

        // 0°C maps to 0% and the critical threshold to 100%.
        let critical = self
            .widget
            .config()
            .thresholds()
            .get("critical")
            .copied()
            .filter(|critical| *critical > 0);
        let percentage = critical
            .map(|critical| (temperature.celsius.clamp(0, critical) * 100 / critical) as u8);

        self.widget.present(state, &args, percentage)
    }
}

impl Sensor for ThermalSensor {
    type Error = GaugeError;

    fn read(&mut self) -> Result<WaybarOutput, Self::Error> {
        Ok(self.render(self.temperature()?))
    }

    fn name(&self) -> &str {
        self.widget.name()
    }

    fn interval(&self) -> Duration {
        self.widget.config().interval()
    }

    fn check_availability(&self) -> Result<(), Self::Error> {
        self.temperature().map(|_| ()).map_err(|e| {
            GaugeError::unavailable(format!("Cannot read {}: {e}", self.path.display()))
        })
    }

    fn handle_event(&mut self, event: EventKind) -> EventResponse {
        self.widget.respond(event)
    }
}

impl Configured for ThermalSensor {
    fn config_document(&self) -> BTreeMap<String, serde_json::Value> {
        let mut document = self.widget.config().to_document();
        document.insert(
            "hwmon-path".to_owned(),
            serde_json::Value::String(self.path.display().to_string()),
        );
        document
    }
}
