//! CPU usage widget.
//!
//! Reads the aggregate `cpu` line of `/proc/stat` and reports the share of
//! non-idle time between two consecutive readings.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use waygauge_core::cli::Configured;
use waygauge_core::format::{format_number, DEFAULT_WIDTH};
use waygauge_core::{
    ConfigEntry, Direction, EventKind, EventResponse, FormatArg, GaugeError, Logger,
    ParsedConfig, Sensor, WaybarOutput, Widget,
};

/// Widget name, also the configuration file stem.
pub const NAME: &str = "cpu";

const DEFAULT_STAT_PATH: &str = "/proc/stat";

/// CPU widget configuration: the shared model plus the stat file location.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuConfig {
    pub base: ParsedConfig<i64>,
    pub stat_path: PathBuf,
}

impl CpuConfig {
    /// Defaults overlaid with `entries`.
    pub fn parse<I>(entries: I, logger: &dyn Logger) -> Self
    where
        I: IntoIterator<Item = ConfigEntry>,
    {
        let base = ParsedConfig::new()
            .with_icon("default", "󰾆")
            .with_format("default", "{icon}\u{2004}{usage}%")
            .with_tooltip_format("CPU Usage: {usage}%\nState: {state}")
            .parse(entries, logger);
        let stat_path = PathBuf::from(base.string("stat-path", DEFAULT_STAT_PATH));
        Self { base, stat_path }
    }
}

/// Cumulative CPU time counters from `/proc/stat`, in clock ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
    pub guest_nice: u64,
}

impl CpuTimes {
    /// Time spent idle, including waiting for I/O.
    #[must_use]
    pub const fn idle_time(&self) -> u64 {
        self.idle + self.iowait
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
            + self.guest
            + self.guest_nice
    }

    /// Percentage of non-idle time since `prev`.
    ///
    /// Returns 0 when the counters did not advance.
    #[must_use]
    pub fn usage_since(&self, prev: &Self) -> f64 {
        if self.total() <= prev.total() {
            return 0.0;
        }
        let total = (self.total() - prev.total()) as f64;
        let idle = self.idle_time().saturating_sub(prev.idle_time()) as f64;
        (100.0 * (1.0 - idle / total)).clamp(0.0, 100.0)
    }

    /// Parse the aggregate `cpu` line.
    ///
    /// # Errors
    ///
    /// Returns a [`GaugeError::Parse`] if the line is not the aggregate line
    /// or has fewer than four counters.
    pub fn parse_line(line: &str) -> Result<Self, GaugeError> {
        let mut fields = line.split_whitespace();
        if fields.next() != Some("cpu") {
            return Err(GaugeError::parse("Line is not the aggregate cpu line"));
        }

        let values = fields
            .take(10)
            .map(str::parse)
            .collect::<Result<Vec<u64>, _>>()
            .map_err(|e| GaugeError::parse_with_source("Failed to parse CPU statistics", e))?;

        if values.len() < 4 {
            return Err(GaugeError::parse(format!(
                "Insufficient CPU statistics: expected at least 4, got {}",
                values.len()
            )));
        }

        let at = |i: usize| values.get(i).copied().unwrap_or(0);
        Ok(Self {
            user: at(0),
            nice: at(1),
            system: at(2),
            idle: at(3),
            iowait: at(4),
            irq: at(5),
            softirq: at(6),
            steal: at(7),
            guest: at(8),
            guest_nice: at(9),
        })
    }

    /// Read the aggregate line from a stat file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn read(path: &Path) -> Result<Self, GaugeError> {
        let content = std::fs::read_to_string(path)?;
        let line = content
            .lines()
            .next()
            .ok_or_else(|| GaugeError::invalid_data(format!("{} is empty", path.display())))?;
        Self::parse_line(line)
    }
}

/// CPU usage sensor.
#[derive(Debug)]
pub struct CpuSensor {
    widget: Widget<i64>,
    stat_path: PathBuf,
    prev: CpuTimes,
}

impl CpuSensor {
    #[must_use]
    pub fn new(config: CpuConfig, logger: Arc<dyn Logger>) -> Self {
        Self {
            widget: Widget::new(NAME, config.base, logger),
            stat_path: config.stat_path,
            prev: CpuTimes::default(),
        }
    }

    /// Build the sensor from raw configuration entries.
    pub fn from_entries(entries: Vec<ConfigEntry>, logger: Arc<dyn Logger>) -> Result<Self, GaugeError> {
        let config = CpuConfig::parse(entries, logger.as_ref());
        Ok(Self::new(config, logger))
    }

    #[must_use]
    pub fn widget(&self) -> &Widget<i64> {
        &self.widget
    }

    /// Take a sample and return usage since the previous one.
    ///
    /// The first sample is measured against zeroed counters, so it reports
    /// the average since boot.
    ///
    /// # Errors
    ///
    /// Returns an error if the stat file cannot be read.
    pub fn sample(&mut self) -> Result<f64, GaugeError> {
        let current = CpuTimes::read(&self.stat_path)?;
        let usage = current.usage_since(&self.prev);
        self.prev = current;
        Ok(usage)
    }

    /// Render a usage percentage.
    #[must_use]
    pub fn render(&self, usage: f64) -> WaybarOutput {
        let state = self.widget.classify(usage as i64, Direction::AscendingIsWorse);
        let args = [FormatArg::new("usage", format_number(usage, DEFAULT_WIDTH))];
        self.widget.present(state, &args, Some(usage.round() as u8))
    }
}

impl Sensor for CpuSensor {
    type Error = GaugeError;

    fn read(&mut self) -> Result<WaybarOutput, Self::Error> {
        let usage = self.sample()?;
        Ok(self.render(usage))
    }

    fn name(&self) -> &str {
        self.widget.name()
    }

    fn interval(&self) -> Duration {
        self.widget.config().interval()
    }

    fn check_availability(&self) -> Result<(), Self::Error> {
        CpuTimes::read(&self.stat_path).map(|_| ()).map_err(|e| {
            GaugeError::unavailable(format!("Cannot read {}: {e}", self.stat_path.display()))
        })
    }

    fn handle_event(&mut self, event: EventKind) -> EventResponse {
        self.widget.respond(event)
    }
}

impl Configured for CpuSensor {
    fn config_document(&self) -> std::collections::BTreeMap<String, serde_json::Value> {
        let mut document = self.widget.config().to_document();
        document.insert(
            "stat-path".to_owned(),
            serde_json::Value::String(self.stat_path.display().to_string()),
        );
        document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use waygauge_core::logging::MemoryLogger;

    fn write_stat(file: &mut tempfile::NamedTempFile, line: &str) {
        let handle = file.as_file_mut();
        handle.set_len(0).unwrap();
        std::io::Seek::rewind(handle).unwrap();
        writeln!(handle, "{line}\ncpu0 1 2 3 4").unwrap();
    }

    fn sensor_for(path: &Path, entries: Vec<ConfigEntry>) -> CpuSensor {
        let logger = Arc::new(MemoryLogger::new());
        let mut entries = entries;
        entries.push(ConfigEntry::new("stat-path", path.display().to_string()));
        CpuSensor::from_entries(entries, logger).unwrap()
    }

    #[test]
    fn test_parse_full_line() {
        let times = CpuTimes::parse_line("cpu  1234 5678 9012 3456 7890 1234 5678 9012 11 12").unwrap();
        assert_eq!(times.user, 1234);
        assert_eq!(times.iowait, 7890);
        assert_eq!(times.guest_nice, 12);
        assert_eq!(times.idle_time(), 3456 + 7890);
    }

    #[test]
    fn test_parse_minimal_line() {
        let times = CpuTimes::parse_line("cpu  100 200 300 400").unwrap();
        assert_eq!(times.idle, 400);
        assert_eq!(times.steal, 0);
        assert_eq!(times.total(), 1000);
    }

    #[test]
    fn test_parse_rejects_other_lines() {
        assert!(CpuTimes::parse_line("cpu0 1 2 3 4").is_err());
        assert!(CpuTimes::parse_line("cpu 1 2").is_err());
        assert!(CpuTimes::parse_line("cpu 1 2 x 4").is_err());
    }

    #[test]
    fn test_usage_since() {
        let prev = CpuTimes {
            user: 100,
            system: 50,
            idle: 850,
            ..CpuTimes::default()
        };
        let current = CpuTimes {
            user: 200,
            system: 100,
            idle: 1700,
            ..CpuTimes::default()
        };
        assert!((current.usage_since(&prev) - 15.0).abs() < 0.01);
        assert_eq!(prev.usage_since(&current), 0.0);
        assert_eq!(current.usage_since(&current), 0.0);
    }

    #[test]
    fn test_first_sample_is_since_boot_then_delta() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write_stat(&mut file, "cpu 100 0 0 900 0 0 0 0 0 0");
        let mut sensor = sensor_for(file.path(), Vec::new());

        assert!((sensor.sample().unwrap() - 10.0).abs() < 0.01);

        write_stat(&mut file, "cpu 160 0 0 940 0 0 0 0 0 0");
        assert!((sensor.sample().unwrap() - 60.0).abs() < 0.01);
    }

    #[test]
    fn test_render_uses_state_icon_and_format() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let sensor = sensor_for(
            file.path(),
            vec![ConfigEntry::new("icons", r#"{"critical":"!"}"#)],
        );

        let output = sensor.render(75.5);
        assert_eq!(output.text, "!\u{2004}75.5%");
        assert_eq!(
            output.tooltip.as_deref(),
            Some("CPU Usage: 75.5%\nState: critical")
        );
        assert_eq!(output.class.as_deref(), Some("critical"));
        assert_eq!(output.percentage, Some(76));

        let idle = sensor.render(5.25);
        assert_eq!(idle.text, "󰾆\u{2004}5.25%");
        assert_eq!(idle.class, None);
    }

    #[test]
    fn test_read_reports_missing_file() {
        let mut sensor = sensor_for(Path::new("/nonexistent/stat"), Vec::new());
        assert!(matches!(sensor.read(), Err(GaugeError::Io(_))));
        assert!(sensor.check_availability().is_err());
    }

    #[test]
    fn test_configured_action() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut sensor = sensor_for(
            file.path(),
            vec![ConfigEntry::new("actions", r#"{"on-middle-click":"htop"}"#)],
        );
        assert_eq!(
            sensor.handle_event(EventKind::OnMiddleClick),
            EventResponse::Command("htop".to_owned())
        );
        assert_eq!(sensor.handle_event(EventKind::OnLeftClick), EventResponse::Ignored);
    }
}
