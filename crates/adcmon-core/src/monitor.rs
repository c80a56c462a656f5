//! The reader loop: poll the port, print each non-blank line, stop on Ctrl+C.
//!
//! `Monitor` owns the connection for its whole life. Dropping it closes the
//! port and prints the closed message, so release happens exactly once
//! whether the loop ends by interrupt, by error, or by unwinding.

use crate::encoding::clean_line;
use crate::error::{MonitorError, Result};
use crate::serial_service::{LineSource, SerialConfig, SerialConnection};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::io::Write;
use std::time::Duration;

pub const BANNER_TITLE: &str = "=== ESP32-C3 ADC Monitor ===";
pub const STOPPED_MESSAGE: &str = "Monitor stopped by user";
pub const CLOSED_MESSAGE: &str = "Serial port closed";
pub const OPEN_FAILED_PREFIX: &str = "Error opening serial port";

/// Why `Monitor::run` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Interrupted,
    /// Every interrupt sender went away, so no interrupt can ever arrive.
    InterruptSourceClosed,
}

pub struct Monitor<S: LineSource, W: Write> {
    source: Option<S>,
    console: W,
    poll_interval: Duration,
    line_buf: Vec<u8>,
    lines_printed: u64,
}

impl<S: LineSource, W: Write> Monitor<S, W> {
    pub fn new(source: S, console: W) -> Self {
        Self {
            source: Some(source),
            console,
            poll_interval: crate::serial_service::POLL_INTERVAL,
            line_buf: Vec::with_capacity(256),
            lines_printed: 0,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn lines_printed(&self) -> u64 {
        self.lines_printed
    }

    pub fn print_banner(&mut self, port: &str, baud_rate: u32) -> Result<()> {
        writeln!(self.console, "{BANNER_TITLE}")?;
        writeln!(self.console, "Connected to {port} at {baud_rate} baud")?;
        writeln!(self.console, "Press Ctrl+C to exit")?;
        writeln!(self.console, "{}", "=".repeat(40))?;
        self.console.flush()?;
        Ok(())
    }

    /// One check-read-print step. Returns the printed line, if any.
    pub fn poll_once(&mut self) -> Result<Option<String>> {
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };
        if source.bytes_available()? == 0 {
            return Ok(None);
        }

        self.line_buf.clear();
        let n = source.read_line(&mut self.line_buf)?;
        log::debug!("read {n} byte(s)");

        match clean_line(&self.line_buf) {
            Some(line) => {
                writeln!(self.console, "{line}")?;
                self.console.flush()?;
                self.lines_printed += 1;
                Ok(Some(line))
            }
            None => Ok(None),
        }
    }

    /// Polls until an interrupt arrives. The pause between polls doubles as
    /// the wait on `interrupt`.
    pub fn run(&mut self, interrupt: &Receiver<()>) -> Result<StopReason> {
        loop {
            self.poll_once()?;
            match interrupt.recv_timeout(self.poll_interval) {
                Ok(()) => {
                    writeln!(self.console, "\n{STOPPED_MESSAGE}")?;
                    return Ok(StopReason::Interrupted);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    log::warn!("interrupt channel closed, stopping");
                    return Ok(StopReason::InterruptSourceClosed);
                }
            }
        }
    }
}

impl<S: LineSource, W: Write> Drop for Monitor<S, W> {
    fn drop(&mut self) {
        if let Some(source) = self.source.take() {
            drop(source);
            let reported = writeln!(self.console, "{CLOSED_MESSAGE}")
                .and_then(|_| self.console.flush());
            if let Err(e) = reported {
                log::warn!("could not report port closure: {e}");
            }
        }
    }
}

/// Installs a Ctrl+C handler that sends on the returned channel.
pub fn interrupt_channel() -> Result<Receiver<()>> {
    let (tx, rx) = bounded(1);
    ctrlc::set_handler(move || {
        let _ = tx.try_send(());
    })?;
    Ok(rx)
}

/// Opens the port with `open`, prints the banner and runs until interrupted.
///
/// A failed open is reported on `console` and ends the run without error;
/// any other failure is returned after the port has been closed.
pub fn launch<S, W, F>(
    cfg: &SerialConfig,
    open: F,
    interrupt: &Receiver<()>,
    mut console: W,
) -> Result<()>
where
    S: LineSource,
    W: Write,
    F: FnOnce(&SerialConfig) -> Result<S>,
{
    let source = match open(cfg) {
        Ok(source) => source,
        Err(MonitorError::Open { port, source }) => {
            writeln!(console, "{OPEN_FAILED_PREFIX}: {source}")?;
            log::info!("{port} unavailable; ports present: {}", describe_ports());
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let mut monitor = Monitor::new(source, console).with_poll_interval(cfg.poll_interval);
    monitor.print_banner(&cfg.port_name, cfg.baud_rate)?;
    let reason = monitor.run(interrupt)?;
    log::debug!("stopped ({reason:?}) after {} line(s)", monitor.lines_printed());
    Ok(())
}

fn describe_ports() -> String {
    let ports = SerialConnection::list_ports();
    if ports.is_empty() {
        return "none".to_string();
    }
    ports.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
