//! Refresh/event loop shared by every widget binary.
//!
//! One task multiplexes the refresh interval and stdin event lines, so a
//! widget never renders concurrently with itself. Configured commands run on
//! the blocking pool and only their failures are logged.

use crate::action::{execute, CommandRunner, EventKind};
use crate::logging::Logger;
use crate::widget::EventResponse;
use crate::{GaugeError, Sensor, WaybarOutput};
use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{self, MissedTickBehavior};

/// Write one output line and flush it.
///
/// # Errors
///
/// Returns an error when serialization or the write fails.
pub fn emit<W: Write>(out: &mut W, output: &WaybarOutput) -> Result<(), GaugeError> {
    writeln!(out, "{}", output.to_json()?)?;
    out.flush()?;
    Ok(())
}

/// Read the sensor once and print the result.
///
/// Read errors are logged and skipped; the next tick tries again. Errors
/// that may clear up on their own are logged as warnings.
///
/// # Errors
///
/// Returns an error only when the output cannot be written.
pub fn refresh<S, W>(sensor: &mut S, out: &mut W, logger: &dyn Logger) -> Result<(), GaugeError>
where
    S: Sensor<Error = GaugeError>,
    W: Write,
{
    match sensor.read() {
        Ok(output) => emit(out, &output),
        Err(e) => {
            let message = format!("Error reading {}: {e}", sensor.name());
            if e.is_temporary() {
                logger.warning(&message);
            } else {
                logger.error(&message);
            }
            Ok(())
        }
    }
}

/// Process one stdin line.
///
/// Returns the command to run, if the event is bound to one. Events the
/// widget handles itself trigger an immediate refresh.
///
/// # Errors
///
/// Returns an error only when the output cannot be written.
pub fn handle_line<S, W>(
    sensor: &mut S,
    line: &str,
    out: &mut W,
    logger: &dyn Logger,
) -> Result<Option<String>, GaugeError>
where
    S: Sensor<Error = GaugeError>,
    W: Write,
{
    let Some(event) = EventKind::from_line(line) else {
        // The i3bar click stream opens with a bare '['.
        let trimmed = line.trim();
        if !trimmed.is_empty() && trimmed != "[" {
            logger.info(&format!("Ignoring unrecognized event {trimmed:?}"));
        }
        return Ok(None);
    };

    match sensor.handle_event(event) {
        EventResponse::Ignored => Ok(None),
        EventResponse::Command(command) => Ok(Some(command)),
        EventResponse::Rerender => {
            refresh(sensor, out, logger)?;
            Ok(None)
        }
    }
}

/// Drive `sensor` until stdout goes away.
///
/// With `once` set a single reading is printed and a read error is returned
/// instead of logged.
///
/// # Errors
///
/// Returns an error when stdout cannot be written, or when the single
/// reading of `once` mode fails.
pub async fn run<S>(
    mut sensor: S,
    once: bool,
    executor: Arc<dyn CommandRunner>,
    logger: Arc<dyn Logger>,
) -> Result<(), GaugeError>
where
    S: Sensor<Error = GaugeError>,
{
    let mut stdout = io::stdout();

    if once {
        let output = sensor.read()?;
        return emit(&mut stdout, &output);
    }

    let mut ticker = time::interval(sensor.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut events_open = true;

    loop {
        tokio::select! {
            _ = ticker.tick() => refresh(&mut sensor, &mut stdout, logger.as_ref())?,
            line = lines.next_line(), if events_open => match line {
                Ok(Some(line)) => {
                    if let Some(command) = handle_line(&mut sensor, &line, &mut stdout, logger.as_ref())? {
                        let executor = Arc::clone(&executor);
                        let logger = Arc::clone(&logger);
                        tokio::task::spawn_blocking(move || {
                            execute(&command, executor.as_ref(), logger.as_ref());
                        });
                    }
                }
                Ok(None) => events_open = false,
                Err(e) => {
                    logger.warning(&format!("Stopped reading events: {e}"));
                    events_open = false;
                }
            },
        }
    }
}
