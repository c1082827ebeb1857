//! Package power widget backed by the RAPL powercap interface.
//!
//! Power is the change of the cumulative `energy_uj` counters divided by the
//! time between two readings. The package domain lives at `sysfs-dir`, the
//! core subdomain at `<sysfs-dir>:0`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use waygauge_core::cli::Configured;
use waygauge_core::format::{format_number, DEFAULT_WIDTH};
use waygauge_core::{
    read_value, ConfigEntry, Direction, EventKind, EventResponse, FormatArg, GaugeError, Logger,
    ParsedConfig, Sensor, WaybarOutput, Widget,
};

/// Widget name, also the configuration file stem.
pub const NAME: &str = "rapl";

const DEFAULT_SYSFS_DIR: &str = "/sys/class/powercap/intel-rapl:0";
const MICROJOULES_PER_JOULE: f64 = 1_000_000.0;

/// RAPL widget configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RaplConfig {
    pub base: ParsedConfig<f64>,
    pub sysfs_dir: PathBuf,
}

impl RaplConfig {
    pub fn parse<I>(entries: I, logger: &dyn Logger) -> Self
    where
        I: IntoIterator<Item = ConfigEntry>,
    {
        let base = ParsedConfig::new()
            .with_icon("default", "󰟩")
            .with_format("default", "{icon}\u{2004}{power}W")
            .with_tooltip_format("Package: {package_power}W\nCore: {core_power}W\nOther: {other_power}W")
            .with_threshold("warning", 15.0)
            .with_threshold("critical", 30.0)
            .parse(entries, logger);
        let sysfs_dir = PathBuf::from(base.string("sysfs-dir", DEFAULT_SYSFS_DIR));
        Self { base, sysfs_dir }
    }
}

/// One RAPL power domain: its energy counter and the counter's range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    energy_path: PathBuf,
    max_range: u64,
}

impl Domain {
    /// Open the domain rooted at `dir`, caching `max_energy_range_uj`.
    ///
    /// # Errors
    ///
    /// Returns [`GaugeError::Unavailable`] when the domain files are missing.
    pub fn open(dir: &Path) -> Result<Self, GaugeError> {
        let energy_path = dir.join("energy_uj");
        let max_range = read_value::<u64>(&dir.join("max_energy_range_uj")).map_err(|e| {
            GaugeError::unavailable(format!("RAPL domain {} not usable: {e}", dir.display()))
        })?;
        if !energy_path.exists() {
            return Err(GaugeError::unavailable(format!(
                "RAPL counter {} not found",
                energy_path.display()
            )));
        }
        Ok(Self {
            energy_path,
            max_range,
        })
    }

    /// Current counter value in microjoules.
    ///
    /// # Errors
    ///
    /// Returns an error if the counter cannot be read.
    pub fn energy(&self) -> Result<u64, GaugeError> {
        read_value(&self.energy_path)
    }

    /// Energy consumed between two counter values, across one wrap.
    #[must_use]
    pub const fn consumed(&self, prev: u64, current: u64) -> u64 {
        if current >= prev {
            current - prev
        } else {
            self.max_range.saturating_sub(prev) + current
        }
    }
}

/// Average power per domain over one interval, in watts.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Power {
    pub package: f64,
    pub core: f64,
}

impl Power {
    /// Package power not attributed to the cores.
    #[must_use]
    pub fn other(&self) -> f64 {
        (self.package - self.core).max(0.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    package: u64,
    core: u64,
    at: Instant,
}

/// RAPL power sensor.
#[derive(Debug)]
pub struct RaplSensor {
    widget: Widget<f64>,
    package: Domain,
    core: Domain,
    prev: Option<Sample>,
}

impl RaplSensor {
    /// Open the package and core domains below `config.sysfs_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error when either domain is missing.
    pub fn new(config: RaplConfig, logger: Arc<dyn Logger>) -> Result<Self, GaugeError> {
        let package = Domain::open(&config.sysfs_dir)?;
        let core = Domain::open(&core_dir(&config.sysfs_dir))?;
        Ok(Self {
            widget: Widget::new(NAME, config.base, logger),
            package,
            core,
            prev: None,
        })
    }

    pub fn from_entries(entries: Vec<ConfigEntry>, logger: Arc<dyn Logger>) -> Result<Self, GaugeError> {
        let config = RaplConfig::parse(entries, logger.as_ref());
        Self::new(config, logger)
    }

    /// Read both counters and return the power since the previous sample.
    ///
    /// The first sample, and any sample taken at the same instant as the
    /// previous one, reports zero.
    ///
    /// # Errors
    ///
    /// Returns an error if a counter cannot be read.
    pub fn sample_at(&mut self, at: Instant) -> Result<Power, GaugeError> {
        let current = Sample {
            package: self.package.energy()?,
            core: self.core.energy()?,
            at,
        };

        let power = match self.prev {
            Some(prev) => {
                let seconds = at.saturating_duration_since(prev.at).as_secs_f64();
                if seconds > 0.0 {
                    Power {
                        package: watts(self.package.consumed(prev.package, current.package), seconds),
                        core: watts(self.core.consumed(prev.core, current.core), seconds),
                    }
                } else {
                    Power::default()
                }
            }
            None => Power::default(),
        };

        self.prev = Some(current);
        Ok(power)
    }

    #[must_use]
    pub fn render(&self, power: Power) -> WaybarOutput {
        let state = self
            .widget
            .classify(power.package, Direction::AscendingIsWorse);
        let package = format_number(power.package, DEFAULT_WIDTH);
        let args = [
            FormatArg::new("power", package.clone()),
            FormatArg::new("package_power", package),
            FormatArg::new("core_power", format_number(power.core, DEFAULT_WIDTH)),
            FormatArg::new("other_power", format_number(power.other(), DEFAULT_WIDTH)),
        ];
        self.widget.present(state, &args, None)
    }
}

fn core_dir(package_dir: &Path) -> PathBuf {
    let mut dir = package_dir.as_os_str().to_owned();
    dir.push(":0");
    PathBuf::from(dir)
}

fn watts(microjoules: u64, seconds: f64) -> f64 {
    microjoules as f64 / MICROJOULES_PER_JOULE / seconds
}

impl Sensor for RaplSensor {
    type Error = GaugeError;

    fn read(&mut self) -> Result<WaybarOutput, Self::Error> {
        let power = self.sample_at(Instant::now())?;
        Ok(self.render(power))
    }

    fn name(&self) -> &str {
        self.widget.name()
    }

    fn interval(&self) -> Duration {
        self.widget.config().interval()
    }

    fn check_availability(&self) -> Result<(), Self::Error> {
        self.package.energy()?;
        self.core.energy()?;
        Ok(())
    }

    fn handle_event(&mut self, event: EventKind) -> EventResponse {
        self.widget.respond(event)
    }
}

impl Configured for RaplSensor {
    fn config_document(&self) -> BTreeMap<String, serde_json::Value> {
        let mut document = self.widget.config().to_document();
        if let Some(dir) = self.package.energy_path.parent() {
            document.insert(
                "sysfs-dir".to_owned(),
                serde_json::Value::String(dir.display().to_string()),
            );
        }
        document
    }
}
