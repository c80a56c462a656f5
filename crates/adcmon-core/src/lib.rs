//! Core functionalities: serial connection, line decoding, reader loop.

pub mod encoding;
pub mod error;
pub mod monitor;
pub mod serial_service;

pub use encoding::{clean_line, decode_dropping_invalid};
pub use error::{MonitorError, Result};
pub use monitor::{interrupt_channel, launch, Monitor, StopReason};
pub use serial_service::{LineSource, PortInfo, QueuedBytes, SerialConfig, SerialConnection};
