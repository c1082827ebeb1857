//! One widget instance: configuration, logger and the refresh pipeline.

use crate::action::{resolve, EventKind};
use crate::classify::{classify, Direction, Threshold};
use crate::config::{ParsedConfig, DEFAULT_STATE};
use crate::logging::Logger;
use crate::template::{render, FormatArg};
use crate::WaybarOutput;
use std::sync::Arc;

/// What the runner should do after an input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventResponse {
    /// Nothing is bound to the event.
    Ignored,
    /// Run this shell command.
    Command(String),
    /// The widget changed its own presentation; render again now.
    Rerender,
}

/// Shared state of a widget: its name, parsed configuration and logger.
pub struct Widget<T: Threshold> {
    name: String,
    config: ParsedConfig<T>,
    logger: Arc<dyn Logger>,
}

impl<T: Threshold> std::fmt::Debug for Widget<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Widget")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<T: Threshold> Widget<T> {
    #[must_use]
    pub fn new(name: impl Into<String>, config: ParsedConfig<T>, logger: Arc<dyn Logger>) -> Self {
        Self {
            name: name.into(),
            config,
            logger,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn config(&self) -> &ParsedConfig<T> {
        &self.config
    }

    #[must_use]
    pub fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }

    /// Classify `value` against the configured thresholds.
    #[must_use]
    pub fn classify(&self, value: T, direction: Direction) -> Option<&str> {
        classify(value, self.config.thresholds(), direction)
    }

    /// Icon for `state`, using the default icon for the empty state.
    #[must_use]
    pub fn icon(&self, state: Option<&str>) -> &str {
        self.config.icon_for_state(state.unwrap_or(DEFAULT_STATE))
    }

    /// Template for `state`, using the default template for the empty state.
    #[must_use]
    pub fn format(&self, state: Option<&str>) -> &str {
        self.config.format_for_state(state.unwrap_or(DEFAULT_STATE))
    }

    /// Render one refresh using the format configured for `state`.
    #[must_use]
    pub fn present(
        &self,
        state: Option<&str>,
        args: &[FormatArg],
        percentage: Option<u8>,
    ) -> WaybarOutput {
        self.present_with(state, self.format(state), args, percentage)
    }

    /// Render one refresh with an explicit bar template.
    ///
    /// `icon` and `state` are made available to both templates ahead of
    /// `args`. The tooltip is only rendered when tooltips are enabled.
    #[must_use]
    pub fn present_with(
        &self,
        state: Option<&str>,
        format: &str,
        args: &[FormatArg],
        percentage: Option<u8>,
    ) -> WaybarOutput {
        let mut all = Vec::with_capacity(args.len() + 2);
        all.push(FormatArg::new("icon", self.icon(state)));
        all.push(FormatArg::new("state", state.unwrap_or("")));
        all.extend_from_slice(args);

        let mut output = WaybarOutput::new(render(format, &all, self.logger()));
        if self.config.tooltip_enabled() {
            output = output.with_tooltip(render(self.config.tooltip_format(), &all, self.logger()));
        }
        if let Some(state) = state {
            output = output.with_class(state);
        }
        if let Some(percentage) = percentage {
            output = output.with_percentage(percentage);
        }
        output
    }

    /// Map `event` onto its configured command.
    #[must_use]
    pub fn respond(&self, event: EventKind) -> EventResponse {
        match resolve(self.config.actions(), event) {
            Some(command) if !command.trim().is_empty() => EventResponse::Command(command.to_owned()),
            _ => EventResponse::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigEntry;
    use crate::logging::{Level, MemoryLogger};

    fn widget(logger: Arc<MemoryLogger>) -> Widget<i64> {
        let config = ParsedConfig::new()
            .with_icon("default", "C")
            .with_icon("critical", "!")
            .with_format("default", "{icon} {usage}%")
            .with_tooltip_format("CPU Usage: {usage}%\nState: {state}")
            .with_action(EventKind::OnLeftClick, "notify-send hi");
        Widget::new("cpu", config, logger)
    }

    #[test]
    fn test_present_full_pipeline() {
        let logger = Arc::new(MemoryLogger::new());
        let widget = widget(logger.clone());

        let state = widget.classify(55, Direction::AscendingIsWorse);
        assert_eq!(state, Some("critical"));

        let output = widget.present(state, &[FormatArg::new("usage", "55.0")], Some(55));
        assert_eq!(output.text, "! 55.0%");
        assert_eq!(output.tooltip.as_deref(), Some("CPU Usage: 55.0%\nState: critical"));
        assert_eq!(output.class.as_deref(), Some("critical"));
        assert_eq!(output.percentage, Some(55));
        assert!(logger.is_empty());
    }

    #[test]
    fn test_empty_state_has_no_class() {
        let logger = Arc::new(MemoryLogger::new());
        let widget = widget(logger);

        let state = widget.classify(3, Direction::AscendingIsWorse);
        let output = widget.present(state, &[FormatArg::new("usage", "3.00")], None);
        assert_eq!(output.text, "C 3.00%");
        assert_eq!(output.tooltip.as_deref(), Some("CPU Usage: 3.00%\nState: "));
        assert_eq!(output.class, None);
    }

    #[test]
    fn test_tooltip_disabled() {
        let logger = Arc::new(MemoryLogger::new());
        let config = ParsedConfig::<i64>::new()
            .with_format("default", "{icon}")
            .parse([ConfigEntry::new("tooltip", "false")], logger.as_ref());
        let widget = Widget::new("cpu", config, logger);

        let output = widget.present(None, &[], None);
        assert_eq!(output.tooltip, None);
        assert_eq!(output.text, "");
    }

    #[test]
    fn test_render_failure_shows_template() {
        let logger = Arc::new(MemoryLogger::new());
        let widget = widget(logger.clone());

        let output = widget.present_with(None, "{icon} {missing}", &[], None);
        assert_eq!(output.text, "{icon} {missing}");
        assert!(logger.contains(Level::Error, "argument not found: 'missing'"));
    }

    #[test]
    fn test_respond() {
        let widget = widget(Arc::new(MemoryLogger::new()));
        assert_eq!(
            widget.respond(EventKind::OnLeftClick),
            EventResponse::Command("notify-send hi".to_owned())
        );
        assert_eq!(widget.respond(EventKind::OnRightClick), EventResponse::Ignored);
    }
}
