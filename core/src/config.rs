//! Widget configuration: raw entries in, typed maps out.
//!
//! A widget receives its configuration as an ordered list of [`ConfigEntry`]
//! key/value strings. Values are cleaned with [`clean_value`] and merged into
//! a [`ParsedConfig`], which seeds the defaults every widget shares and lets
//! each widget layer its own defaults on top with the `with_*` builders.
//!
//! Entries come from a RON file (see [`load_entries`]) followed by any
//! `--set key=value` overrides, so later entries win.

use crate::action::EventKind;
use crate::classify::Threshold;
use crate::decode::clean_value;
use crate::logging::Logger;
use crate::GaugeError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Name of the state every icon and format map falls back to.
pub const DEFAULT_STATE: &str = "default";

/// Template used when no format is configured at all.
pub const FALLBACK_FORMAT: &str = "{}";

const KNOWN_KEYS: [&str; 7] = [
    "interval",
    "tooltip",
    "format-tooltip",
    "icons",
    "formats",
    "states",
    "actions",
];

/// One raw configuration key/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
}

impl ConfigEntry {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl FromStr for ConfigEntry {
    type Err = GaugeError;

    /// Parse a `key=value` override. The value is kept verbatim.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| GaugeError::config_with_value("expected key=value", s))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(GaugeError::config_with_value("empty configuration key", s));
        }
        Ok(Self::new(key, value))
    }
}

/// Parsed, immutable configuration of one widget instance.
///
/// `T` is the threshold type of the widget's reading (`i64` or `f64`).
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedConfig<T: Threshold> {
    interval: u64,
    tooltip_enabled: bool,
    tooltip_format: String,
    icons: BTreeMap<String, String>,
    formats: BTreeMap<String, String>,
    thresholds: BTreeMap<String, T>,
    actions: BTreeMap<EventKind, String>,
    values: BTreeMap<String, String>,
}

impl<T: Threshold> ParsedConfig<T> {
    /// Configuration holding only the shared defaults.
    ///
    /// `warning` and `critical` start at 20 and 50; widgets override them
    /// with [`with_threshold`](Self::with_threshold).
    #[must_use]
    pub fn new() -> Self {
        Self {
            interval: 1,
            tooltip_enabled: true,
            tooltip_format: String::new(),
            icons: BTreeMap::from([(DEFAULT_STATE.to_owned(), String::new())]),
            formats: BTreeMap::from([(DEFAULT_STATE.to_owned(), FALLBACK_FORMAT.to_owned())]),
            thresholds: BTreeMap::from([
                ("warning".to_owned(), T::from(20)),
                ("critical".to_owned(), T::from(50)),
            ]),
            actions: BTreeMap::new(),
            values: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_icon(mut self, state: impl Into<String>, icon: impl Into<String>) -> Self {
        self.icons.insert(state.into(), icon.into());
        self
    }

    #[must_use]
    pub fn with_format(mut self, state: impl Into<String>, format: impl Into<String>) -> Self {
        self.formats.insert(state.into(), format.into());
        self
    }

    #[must_use]
    pub fn with_threshold(mut self, state: impl Into<String>, threshold: T) -> Self {
        self.thresholds.insert(state.into(), threshold);
        self
    }

    #[must_use]
    pub fn with_tooltip_format(mut self, format: impl Into<String>) -> Self {
        self.tooltip_format = format.into();
        self
    }

    #[must_use]
    pub fn with_action(mut self, event: EventKind, command: impl Into<String>) -> Self {
        self.actions.insert(event, command.into());
        self
    }

    /// Set the refresh interval in seconds; zero is ignored.
    #[must_use]
    pub fn with_interval(mut self, seconds: u64) -> Self {
        if seconds > 0 {
            self.interval = seconds;
        }
        self
    }

    /// Merge `entries` into this configuration.
    ///
    /// Bad values are reported through `logger` and leave the current value in
    /// place; parsing never fails.
    #[must_use]
    pub fn parse<I>(mut self, entries: I, logger: &dyn Logger) -> Self
    where
        I: IntoIterator<Item = ConfigEntry>,
    {
        for entry in entries {
            let value = clean_value(&entry.value, logger);
            self.apply(&entry.key, &entry.value, &value, logger);
            self.values.insert(entry.key, value);
        }
        self
    }

    fn apply(&mut self, key: &str, raw: &str, value: &str, logger: &dyn Logger) {
        match key {
            "interval" => match value.trim().parse::<u64>() {
                Ok(seconds) if seconds > 0 => self.interval = seconds,
                _ => logger.warning(&format!("Invalid interval {value:?}, keeping {}", self.interval)),
            },
            "tooltip" => match parse_bool(value) {
                Some(enabled) => self.tooltip_enabled = enabled,
                None => logger.warning(&format!("Invalid boolean for tooltip: {value:?}")),
            },
            "format-tooltip" => self.tooltip_format = value.to_owned(),
            "icons" => {
                if let Some(object) = parse_object(key, raw, value, logger) {
                    merge_strings(&mut self.icons, &object);
                }
            }
            "formats" => {
                if let Some(object) = parse_object(key, raw, value, logger) {
                    merge_strings(&mut self.formats, &object);
                }
            }
            "states" => {
                if let Some(object) = parse_object(key, raw, value, logger) {
                    for (state, threshold) in &object {
                        if let Some(threshold) = T::from_json(threshold) {
                            self.thresholds.insert(state.clone(), threshold);
                        }
                    }
                }
            }
            "actions" => {
                if let Some(object) = parse_object(key, raw, value, logger) {
                    for (name, command) in &object {
                        let Some(command) = command.as_str() else {
                            continue;
                        };
                        match name.parse::<EventKind>() {
                            Ok(event) => {
                                self.actions.insert(event, command.to_owned());
                            }
                            Err(err) => logger.warning(&err.to_string()),
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// Refresh period between two readings.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    #[must_use]
    pub const fn tooltip_enabled(&self) -> bool {
        self.tooltip_enabled
    }

    #[must_use]
    pub fn icons(&self) -> &BTreeMap<String, String> {
        &self.icons
    }

    #[must_use]
    pub fn formats(&self) -> &BTreeMap<String, String> {
        &self.formats
    }

    #[must_use]
    pub fn thresholds(&self) -> &BTreeMap<String, T> {
        &self.thresholds
    }

    #[must_use]
    pub fn actions(&self) -> &BTreeMap<EventKind, String> {
        &self.actions
    }

    /// Icon for `state`, else the default icon, else the empty string.
    #[must_use]
    pub fn icon_for_state(&self, state: &str) -> &str {
        lookup(&self.icons, state).unwrap_or("")
    }

    /// Template for `state`, else the default template, else `"{}"`.
    #[must_use]
    pub fn format_for_state(&self, state: &str) -> &str {
        lookup(&self.formats, state).unwrap_or(FALLBACK_FORMAT)
    }

    /// Tooltip template: `format-tooltip` when set, else the default format.
    #[must_use]
    pub fn tooltip_format(&self) -> &str {
        if self.tooltip_format.is_empty() {
            self.format_for_state(DEFAULT_STATE)
        } else {
            &self.tooltip_format
        }
    }

    /// Cleaned raw value of any configured key.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// String value of a widget-specific key.
    #[must_use]
    pub fn string(&self, key: &str, default: &str) -> String {
        self.raw(key).unwrap_or(default).to_owned()
    }

    /// Typed value of a widget-specific key.
    ///
    /// Missing keys yield `default` silently; unparsable ones log a warning.
    pub fn value<V>(&self, key: &str, default: V, logger: &dyn Logger) -> V
    where
        V: FromStr,
        V::Err: std::fmt::Display,
    {
        let Some(raw) = self.raw(key) else {
            return default;
        };
        match raw.trim().parse() {
            Ok(value) => value,
            Err(err) => {
                logger.warning(&format!("Invalid value for {key} ({raw:?}): {err}"));
                default
            }
        }
    }

    /// The effective configuration as a map that [`load_entries`] accepts.
    #[must_use]
    pub fn to_document(&self) -> BTreeMap<String, Value> {
        let mut document: BTreeMap<String, Value> = self
            .values
            .iter()
            .filter(|(key, _)| !KNOWN_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect();

        let strings = |map: &BTreeMap<String, String>| {
            Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            )
        };

        document.insert("interval".to_owned(), Value::from(self.interval));
        document.insert("tooltip".to_owned(), Value::Bool(self.tooltip_enabled));
        if !self.tooltip_format.is_empty() {
            document.insert(
                "format-tooltip".to_owned(),
                Value::String(self.tooltip_format.clone()),
            );
        }
        document.insert("icons".to_owned(), strings(&self.icons));
        document.insert("formats".to_owned(), strings(&self.formats));
        document.insert(
            "states".to_owned(),
            Value::Object(
                self.thresholds
                    .iter()
                    .filter_map(|(k, v)| Some((k.clone(), serde_json::to_value(v).ok()?)))
                    .collect(),
            ),
        );
        document.insert(
            "actions".to_owned(),
            Value::Object(
                self.actions
                    .iter()
                    .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
                    .collect(),
            ),
        );
        document
    }
}

impl<T: Threshold> Default for ParsedConfig<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Interpret a configuration boolean.
///
/// Accepts `true/1/yes/on` and `false/0/no/off`, ignoring case.
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn lookup<'a>(map: &'a BTreeMap<String, String>, state: &str) -> Option<&'a str> {
    map.get(state)
        .or_else(|| map.get(DEFAULT_STATE))
        .map(String::as_str)
}

/// Parse an object-valued key.
///
/// The cleaned value is tried first. Cleaning turns JSON escapes such as
/// `\n` inside strings into raw control characters, so the uncleaned text is
/// the second attempt.
fn parse_object(key: &str, raw: &str, value: &str, logger: &dyn Logger) -> Option<Map<String, Value>> {
    let parsed = serde_json::from_str::<Value>(value)
        .or_else(|_| serde_json::from_str::<Value>(raw.trim_end_matches(['\r', '\n'])));
    match parsed {
        Ok(Value::Object(object)) => Some(object),
        Ok(other) => {
            logger.warning(&format!("Expected a JSON object for {key}, got {other}"));
            None
        }
        Err(err) => {
            logger.warning(&format!("Failed to parse {key} JSON: {err}"));
            None
        }
    }
}

fn merge_strings(target: &mut BTreeMap<String, String>, object: &Map<String, Value>) {
    for (name, value) in object {
        if let Some(text) = value.as_str() {
            target.insert(name.clone(), text.to_owned());
        }
    }
}

/// Default location of a widget's configuration file.
///
/// `$XDG_CONFIG_HOME/waygauge/<widget>.ron`, or `None` when no configuration
/// directory can be determined.
#[must_use]
pub fn default_config_path(widget: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("waygauge").join(format!("{widget}.ron")))
}

/// Read configuration entries from a RON map.
///
/// Each value becomes an entry holding its JSON text, so strings arrive
/// quoted and nested maps arrive as JSON objects.
///
/// # Errors
///
/// Returns [`GaugeError::Io`] when the file cannot be read and
/// [`GaugeError::Parse`] when it is not a RON map.
pub fn load_entries(path: &Path) -> Result<Vec<ConfigEntry>, GaugeError> {
    let content = std::fs::read_to_string(path)?;
    parse_entries(&content).map_err(|e| {
        GaugeError::parse(format!("Failed to parse config file {}: {e}", path.display()))
    })
}

/// Parse the body of a configuration file.
///
/// # Errors
///
/// Returns the RON error when `content` is not a map.
pub fn parse_entries(content: &str) -> Result<Vec<ConfigEntry>, ron::error::SpannedError> {
    let document: BTreeMap<String, Value> = ron::from_str(content)?;
    Ok(document
        .into_iter()
        .map(|(key, value)| {
            let text = serde_json::to_string(&value).unwrap_or_default();
            ConfigEntry::new(key, text)
        })
        .collect())
}

/// Collect a widget's entries from its file and command-line overrides.
///
/// An explicit `path` must exist. Without one the default location is used
/// when the file is present.
///
/// # Errors
///
/// Returns an error when the selected file cannot be read or parsed.
pub fn collect_entries(
    widget: &str,
    path: Option<&Path>,
    overrides: &[ConfigEntry],
) -> Result<Vec<ConfigEntry>, GaugeError> {
    let mut entries = match path {
        Some(path) => load_entries(path)?,
        None => match default_config_path(widget) {
            Some(path) if path.exists() => load_entries(&path)?,
            _ => Vec::new(),
        },
    };
    entries.extend_from_slice(overrides);
    Ok(entries)
}
