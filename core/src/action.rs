//! Input events and the shell commands bound to them.

use crate::logging::Logger;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::process::Command;
use std::str::FromStr;

/// Discrete input event delivered to a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    OnLeftClick,
    OnMiddleClick,
    OnRightClick,
    OnScrollUp,
    OnScrollDown,
    OnScrollLeft,
    OnScrollRight,
}

impl EventKind {
    /// Every event kind, in button order.
    pub const ALL: [Self; 7] = [
        Self::OnLeftClick,
        Self::OnMiddleClick,
        Self::OnRightClick,
        Self::OnScrollUp,
        Self::OnScrollDown,
        Self::OnScrollLeft,
        Self::OnScrollRight,
    ];

    /// Configuration key naming this event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OnLeftClick => "on-left-click",
            Self::OnMiddleClick => "on-middle-click",
            Self::OnRightClick => "on-right-click",
            Self::OnScrollUp => "on-scroll-up",
            Self::OnScrollDown => "on-scroll-down",
            Self::OnScrollLeft => "on-scroll-left",
            Self::OnScrollRight => "on-scroll-right",
        }
    }

    /// Map an i3bar/X11 button number; 4-7 are the scroll directions.
    #[must_use]
    pub const fn from_button(button: u32) -> Option<Self> {
        match button {
            1 => Some(Self::OnLeftClick),
            2 => Some(Self::OnMiddleClick),
            3 => Some(Self::OnRightClick),
            4 => Some(Self::OnScrollUp),
            5 => Some(Self::OnScrollDown),
            6 => Some(Self::OnScrollLeft),
            7 => Some(Self::OnScrollRight),
            _ => None,
        }
    }

    /// Parse one line of the event stream.
    ///
    /// Accepts a bare event name (`on-left-click`) or an i3bar click object
    /// carrying a `button` number. Anything else yields `None`.
    #[must_use]
    pub fn from_line(line: &str) -> Option<Self> {
        let line = line.trim().trim_start_matches(',').trim();
        if line.starts_with('{') {
            let event: WireEvent = serde_json::from_str(line).ok()?;
            return Self::from_button(event.button);
        }
        line.parse().ok()
    }
}

#[derive(Debug, Deserialize)]
struct WireEvent {
    button: u32,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = EventKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EventKindParseError {
                input: s.to_owned(),
            })
    }
}

/// Error type for parsing [`EventKind`] from string.
#[derive(Debug, thiserror::Error)]
#[error("Invalid event '{input}'. Valid options: on-left-click, on-middle-click, on-right-click, on-scroll-up, on-scroll-down, on-scroll-left, on-scroll-right")]
pub struct EventKindParseError {
    input: String,
}

/// Failure of a dispatched command.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Failed to spawn action '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to execute action '{command}', exit code: {code}")]
    Failed { command: String, code: i32 },

    #[error("Action '{command}' was terminated by a signal")]
    Terminated { command: String },
}

/// Process-invocation seam for configured commands.
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion.
    ///
    /// # Errors
    ///
    /// Returns an [`ActionError`] when the command cannot be started or does
    /// not exit successfully.
    fn run(&self, command: &str) -> Result<(), ActionError>;
}

/// Runs commands through `sh -c` and waits for them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str) -> Result<(), ActionError> {
        let status = Command::new("sh")
            .arg("-c")
            .arg(command)
            .status()
            .map_err(|source| ActionError::Spawn {
                command: command.to_owned(),
                source,
            })?;

        match status.code() {
            Some(0) => Ok(()),
            Some(code) => Err(ActionError::Failed {
                command: command.to_owned(),
                code,
            }),
            None => Err(ActionError::Terminated {
                command: command.to_owned(),
            }),
        }
    }
}

/// Look up the command bound to `event`.
///
/// # Examples
///
/// ```rust
/// use std::collections::BTreeMap;
/// use waygauge_core::action::{resolve, EventKind};
///
/// let actions = BTreeMap::from([(EventKind::OnLeftClick, "notify-send hi".to_owned())]);
/// assert_eq!(resolve(&actions, EventKind::OnLeftClick), Some("notify-send hi"));
/// assert_eq!(resolve(&actions, EventKind::OnRightClick), None);
/// ```
#[must_use]
pub fn resolve(actions: &BTreeMap<EventKind, String>, event: EventKind) -> Option<&str> {
    actions.get(&event).map(String::as_str)
}

/// Run `command`, logging instead of propagating any failure.
///
/// Returns whether the command ran successfully. Empty commands are skipped.
pub fn execute(command: &str, runner: &dyn CommandRunner, logger: &dyn Logger) -> bool {
    if command.trim().is_empty() {
        return false;
    }

    logger.info(&format!("Executing action '{command}'"));
    match runner.run(command) {
        Ok(()) => true,
        Err(err) => {
            logger.error(&err.to_string());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{Level, MemoryLogger};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRunner {
        commands: Mutex<Vec<String>>,
        exit_code: i32,
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, command: &str) -> Result<(), ActionError> {
            self.commands.lock().unwrap().push(command.to_owned());
            if self.exit_code == 0 {
                Ok(())
            } else {
                Err(ActionError::Failed {
                    command: command.to_owned(),
                    code: self.exit_code,
                })
            }
        }
    }

    fn actions() -> BTreeMap<EventKind, String> {
        BTreeMap::from([(EventKind::OnLeftClick, "notify-send hi".to_owned())])
    }

    #[test]
    fn test_resolve() {
        assert_eq!(resolve(&actions(), EventKind::OnRightClick), None);
        assert_eq!(
            resolve(&actions(), EventKind::OnLeftClick),
            Some("notify-send hi")
        );
    }

    #[test]
    fn test_event_kind_round_trip_names() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
            assert_eq!(kind.to_string(), kind.as_str());
        }
        assert!("on-double-click".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_event_kind_from_button() {
        assert_eq!(EventKind::from_button(1), Some(EventKind::OnLeftClick));
        assert_eq!(EventKind::from_button(5), Some(EventKind::OnScrollDown));
        assert_eq!(EventKind::from_button(7), Some(EventKind::OnScrollRight));
        assert_eq!(EventKind::from_button(8), None);
    }

    #[test]
    fn test_event_kind_from_line() {
        assert_eq!(
            EventKind::from_line("on-middle-click\n"),
            Some(EventKind::OnMiddleClick)
        );
        assert_eq!(
            EventKind::from_line(r#"{"name":"gpu","button":3}"#),
            Some(EventKind::OnRightClick)
        );
        assert_eq!(
            EventKind::from_line(r#",{"button":4,"x":10}"#),
            Some(EventKind::OnScrollUp)
        );
        assert_eq!(EventKind::from_line("["), None);
        assert_eq!(EventKind::from_line(r#"{"button":9}"#), None);
    }

    #[test]
    fn test_execute_runs_resolved_command() {
        let runner = RecordingRunner::default();
        let logger = MemoryLogger::new();

        let bindings = actions();
        let command = resolve(&bindings, EventKind::OnLeftClick).unwrap();
        assert!(execute(command, &runner, &logger));
        assert_eq!(resolve(&actions(), EventKind::OnScrollUp), None);
        assert!(logger.contains(Level::Info, "notify-send hi"));
        assert_eq!(
            *runner.commands.lock().unwrap(),
            vec!["notify-send hi".to_owned()]
        );
    }

    #[test]
    fn test_failed_command_is_logged_not_propagated() {
        let runner = RecordingRunner {
            exit_code: 2,
            ..RecordingRunner::default()
        };
        let logger = MemoryLogger::new();

        assert!(!execute("false", &runner, &logger));
        assert!(logger.contains(Level::Error, "exit code: 2"));
    }

    #[test]
    fn test_empty_command_is_skipped() {
        let runner = RecordingRunner::default();
        let logger = MemoryLogger::new();

        assert!(!execute("  ", &runner, &logger));
        assert!(runner.commands.lock().unwrap().is_empty());
    }

    #[test]
    fn test_shell_runner_reports_exit_codes() {
        assert!(ShellRunner.run("exit 0").is_ok());
        assert!(matches!(
            ShellRunner.run("exit 3"),
            Err(ActionError::Failed { code: 3, .. })
        ));
    }
}
