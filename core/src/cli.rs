//! Command-line surface shared by the widget binaries.

use crate::action::ShellRunner;
use crate::config::{collect_entries, default_config_path, ConfigEntry};
use crate::logging::{self, LogLogger, Logger};
use crate::{runner, GaugeError, Sensor};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Flags every widget binary accepts.
///
/// Flatten into a binary's own arguments with `#[command(flatten)]`.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct CommonArgs {
    /// Configuration file (RON map), defaults to ~/.config/waygauge/<widget>.ron
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override a configuration key, e.g. --set 'states={"critical":90}'
    #[arg(short, long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<ConfigEntry>,

    /// One-shot mode (output once and exit)
    #[arg(short, long)]
    pub once: bool,

    /// Verify the metric source is readable and exit
    #[arg(long)]
    pub check: bool,

    /// Print the effective configuration as RON and exit
    #[arg(long)]
    pub dump_config: bool,

    /// Log informational messages to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    /// Configuration entries for `widget`: file first, then `--set` overrides.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration file cannot be read or parsed.
    pub fn entries(&self, widget: &str) -> Result<Vec<ConfigEntry>, GaugeError> {
        collect_entries(widget, self.config.as_deref(), &self.set)
    }
}

/// A sensor whose effective configuration can be printed.
pub trait Configured {
    /// The configuration in the shape accepted by the configuration file.
    fn config_document(&self) -> BTreeMap<String, serde_json::Value>;
}

/// Run a widget binary.
///
/// Installs logging, builds the sensor from its configuration entries and
/// then either answers `--dump-config`/`--check` or enters the refresh loop.
///
/// # Errors
///
/// Returns startup failures: an unreadable configuration, a sensor that
/// cannot be built, a failed `--check`, or a closed stdout.
pub async fn launch<S, F>(widget: &str, args: &CommonArgs, build: F) -> Result<(), GaugeError>
where
    S: Sensor<Error = GaugeError> + Configured,
    F: FnOnce(Vec<ConfigEntry>, Arc<dyn Logger>) -> Result<S, GaugeError>,
{
    logging::init(args.verbose);
    let logger: Arc<dyn Logger> = Arc::new(LogLogger::new(widget));

    let entries = args.entries(widget)?;
    logger.info(&format!(
        "Loaded {} configuration entries (default file: {})",
        entries.len(),
        default_config_path(widget).map_or_else(|| "none".to_owned(), |p| p.display().to_string())
    ));
    let sensor = build(entries, Arc::clone(&logger))?;

    if args.dump_config {
        let pretty = ron::ser::PrettyConfig::default();
        let document = ron::ser::to_string_pretty(&sensor.config_document(), pretty)
            .map_err(|e| GaugeError::parse_with_source("Failed to serialize config", e))?;
        println!("{document}");
        return Ok(());
    }

    if args.check {
        sensor.check_availability()?;
        println!("{} sensor is available", sensor.name());
        return Ok(());
    }

    runner::run(sensor, args.once, Arc::new(ShellRunner), logger).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct TestArgs {
        #[command(flatten)]
        common: CommonArgs,
    }

    #[test]
    fn test_common_flags() {
        let args = TestArgs::try_parse_from([
            "waygauge-cpu",
            "--once",
            "-v",
            "--set",
            "interval=5",
            "-s",
            "tooltip=off",
        ])
        .unwrap();

        assert!(args.common.once);
        assert!(args.common.verbose);
        assert!(!args.common.check);
        assert_eq!(
            args.common.set,
            vec![
                ConfigEntry::new("interval", "5"),
                ConfigEntry::new("tooltip", "off")
            ]
        );
    }

    #[test]
    fn test_malformed_override_is_rejected() {
        assert!(TestArgs::try_parse_from(["waygauge-cpu", "--set", "interval"]).is_err());
    }

    #[test]
    fn test_entries_with_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cpu.ron");
        std::fs::write(&path, r#"{ "interval": 3 }"#).unwrap();

        let args = CommonArgs {
            config: Some(path),
            set: vec![ConfigEntry::new("tooltip", "false")],
            ..CommonArgs::default()
        };
        assert_eq!(
            args.entries("cpu").unwrap(),
            vec![
                ConfigEntry::new("interval", "3"),
                ConfigEntry::new("tooltip", "false")
            ]
        );
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let args = CommonArgs {
            config: Some(PathBuf::from("/nonexistent/waygauge.ron")),
            ..CommonArgs::default()
        };
        assert!(args.entries("cpu").is_err());
    }
}
