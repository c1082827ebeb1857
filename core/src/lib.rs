//! # waygauge-core
//!
//! Shared rendering pipeline for the waygauge status-bar widgets.
//!
//! Every widget follows the same path on each refresh: a metric reader
//! produces a value, [`classify`] maps it onto a named state, the widget's
//! [`config::ParsedConfig`] supplies the icon and template for that state,
//! [`template`] renders the bar text and tooltip, and the result is printed
//! as one Waybar JSON line. Input events arrive on stdin and are either
//! handled by the widget or dispatched to a configured shell command by
//! [`action`].
//!
//! ## Quick Start
//!
//! ```rust
//! use waygauge_core::classify::Direction;
//! use waygauge_core::config::ParsedConfig;
//! use waygauge_core::logging::MemoryLogger;
//! use waygauge_core::template::FormatArg;
//! use waygauge_core::widget::Widget;
//! use std::sync::Arc;
//!
//! let config = ParsedConfig::<i64>::new()
//!     .with_icon("default", "C")
//!     .with_format("default", "{icon} {usage}%");
//! let widget = Widget::new("cpu", config, Arc::new(MemoryLogger::new()));
//!
//! let state = widget.classify(42, Direction::AscendingIsWorse);
//! let output = widget.present(state, &[FormatArg::new("usage", 42)], Some(42));
//! assert_eq!(output.text, "C 42%");
//! assert_eq!(output.class.as_deref(), Some("warning"));
//! ```

pub mod action;
pub mod classify;
pub mod cli;
pub mod config;
pub mod decode;
pub mod format;
pub mod logging;
pub mod runner;
pub mod template;
pub mod widget;

pub use action::{EventKind, ShellRunner};
pub use classify::{Direction, Threshold};
pub use config::{ConfigEntry, ParsedConfig};
pub use logging::{LogLogger, Logger};
pub use template::{FormatArg, FormatValue};
pub use widget::{EventResponse, Widget};

use serde::Serialize;
use std::time::Duration;

/// Standard Waybar output format compliant with Waybar's JSON protocol.
///
/// All fields except `text` are optional and omitted from the JSON when
/// `None`.
///
/// # Examples
///
/// ```rust
/// use waygauge_core::WaybarOutput;
///
/// let output = WaybarOutput::new("50%".to_string())
///     .with_tooltip("CPU Usage: 50%")
///     .with_class("warning")
///     .with_percentage(50);
/// assert_eq!(
///     serde_json::to_string(&output).unwrap(),
///     r#"{"text":"50%","tooltip":"CPU Usage: 50%","class":"warning","percentage":50}"#
/// );
/// ```
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WaybarOutput {
    /// The main text to display in the bar
    pub text: String,
    /// Optional tooltip text shown on hover
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    /// CSS class: the state the reading was classified into
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Optional percentage value (0-100) for progress indicators
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<u8>,
}

impl WaybarOutput {
    /// Create a new WaybarOutput with just the required text field.
    #[must_use]
    pub const fn new(text: String) -> Self {
        Self {
            text,
            tooltip: None,
            class: None,
            percentage: None,
        }
    }

    #[must_use]
    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Add a percentage value, clamped to 100.
    #[must_use]
    pub fn with_percentage(mut self, percentage: u8) -> Self {
        self.percentage = Some(percentage.min(100));
        self
    }

    /// Serialize as a single JSON line.
    ///
    /// # Errors
    ///
    /// Returns [`GaugeError::Parse`] if serialization fails.
    pub fn to_json(&self) -> Result<String, GaugeError> {
        serde_json::to_string(self)
            .map_err(|e| GaugeError::parse_with_source("Failed to serialize output", e))
    }
}

/// A widget that can be driven by the [`runner`].
///
/// Implementations own their [`Widget`] and metric reader. `read` is called
/// on every tick; `handle_event` on every input event.
pub trait Sensor {
    /// Error type for sensor operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Take a reading and render it.
    ///
    /// # Errors
    ///
    /// Returns an error if the metric cannot be read or parsed.
    fn read(&mut self) -> Result<WaybarOutput, Self::Error>;

    /// Stable name used for logging and the configuration file.
    fn name(&self) -> &str;

    /// Time between two readings.
    fn interval(&self) -> Duration;

    /// Check if the sensor is available on this system.
    ///
    /// # Errors
    ///
    /// Returns an error if the sensor is not available or supported.
    fn check_availability(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// React to an input event.
    ///
    /// Most sensors forward to [`Widget::respond`]; widgets with built-in
    /// behavior handle their events first.
    fn handle_event(&mut self, event: EventKind) -> EventResponse;
}

/// Errors produced while loading configuration or reading a metric.
#[derive(Debug, thiserror::Error)]
pub enum GaugeError {
    /// I/O error occurred while reading sensor data or configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing text data.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of what failed to parse
        message: String,
        /// Optional source error for chaining
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invalid configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration issue
        message: String,
        /// The invalid configuration value if applicable
        value: Option<String>,
    },

    /// The metric source is not available on this system.
    #[error("Sensor unavailable: {reason}")]
    Unavailable {
        /// Reason why the sensor is unavailable
        reason: String,
        /// Whether this is a temporary or permanent condition
        is_temporary: bool,
    },

    /// Invalid data format or unexpected values.
    #[error("Invalid data: {message}")]
    InvalidData {
        /// Description of what makes the data invalid
        message: String,
        /// The invalid data if it can be safely displayed
        data: Option<String>,
    },
}

impl GaugeError {
    /// Create a new parse error with a simple message.
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new parse error with a source error.
    pub fn parse_with_source<S: Into<String>, E>(message: S, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Parse {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn config_with_value<S: Into<String>, V: Into<String>>(message: S, value: V) -> Self {
        Self::Config {
            message: message.into(),
            value: Some(value.into()),
        }
    }

    pub fn unavailable<S: Into<String>>(reason: S) -> Self {
        Self::Unavailable {
            reason: reason.into(),
            is_temporary: false,
        }
    }

    pub fn temporarily_unavailable<S: Into<String>>(reason: S) -> Self {
        Self::Unavailable {
            reason: reason.into(),
            is_temporary: true,
        }
    }

    pub fn invalid_data<S: Into<String>>(message: S) -> Self {
        Self::InvalidData {
            message: message.into(),
            data: None,
        }
    }

    /// Whether retrying on the next tick may succeed.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        match self {
            Self::Unavailable { is_temporary, .. } => *is_temporary,
            Self::Io(_) | Self::InvalidData { .. } => true,
            Self::Parse { .. } | Self::Config { .. } => false,
        }
    }
}

/// Read a sysfs/procfs file and parse its trimmed content.
///
/// # Errors
///
/// Returns [`GaugeError::Io`] if the file cannot be read and
/// [`GaugeError::Parse`] if its content does not parse as `V`.
pub fn read_value<V>(path: &std::path::Path) -> Result<V, GaugeError>
where
    V: std::str::FromStr,
    V::Err: std::error::Error + Send + Sync + 'static,
{
    let content = std::fs::read_to_string(path)?;
    content.trim().parse().map_err(|e| {
        GaugeError::parse_with_source(format!("Failed to parse {}", path.display()), e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_waybar_output_omits_empty_fields() {
        let output = WaybarOutput::new("42%".to_owned());
        assert_eq!(output.to_json().unwrap(), r#"{"text":"42%"}"#);
    }

    #[test]
    fn test_percentage_is_clamped() {
        let output = WaybarOutput::new(String::new()).with_percentage(250);
        assert_eq!(output.percentage, Some(100));
    }

    #[test]
    fn test_error_helpers() {
        assert!(GaugeError::temporarily_unavailable("link down").is_temporary());
        assert!(!GaugeError::unavailable("no hwmon").is_temporary());
        assert!(!GaugeError::config_with_value("bad", "x").is_temporary());
        assert!(GaugeError::invalid_data("empty").is_temporary());
        assert_eq!(
            GaugeError::config_with_value("expected key=value", "x").to_string(),
            "Configuration error: expected key=value"
        );
    }

    #[test]
    fn test_read_value() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  42000").unwrap();
        assert_eq!(read_value::<u64>(file.path()).unwrap(), 42000);
        assert!(matches!(
            read_value::<u64>(std::path::Path::new("/nonexistent/value")),
            Err(GaugeError::Io(_))
        ));

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        writeln!(bad, "hot").unwrap();
        assert!(matches!(
            read_value::<u64>(bad.path()),
            Err(GaugeError::Parse { .. })
        ));
    }
}
