use crate::error::{MonitorError, Result};
use serialport::{SerialPort, SerialPortInfo};
use std::io::{self, BufRead, BufReader, Read};
use std::time::Duration;

#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM7";
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

pub const BAUD_RATE: u32 = 115_200;
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);
/// Pause between polls of the port.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct PortInfo {
    pub port_name: String,
    pub port_type: String,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (port_type, vid, pid, serial_number, manufacturer, product) = match &info.port_type {
            serialport::SerialPortType::UsbPort(usb) => (
                "USB".to_string(),
                Some(usb.vid),
                Some(usb.pid),
                usb.serial_number.clone(),
                usb.manufacturer.clone(),
                usb.product.clone(),
            ),
            serialport::SerialPortType::PciPort => {
                ("PCI".to_string(), None, None, None, None, None)
            }
            serialport::SerialPortType::BluetoothPort => {
                ("Bluetooth".to_string(), None, None, None, None, None)
            }
            serialport::SerialPortType::Unknown => {
                ("Unknown".to_string(), None, None, None, None, None)
            }
        };
        Self {
            port_name: info.port_name,
            port_type,
            vid,
            pid,
            serial_number,
            manufacturer,
            product,
        }
    }
}

impl std::fmt::Display for PortInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.port_name, self.port_type)?;
        if let (Some(vid), Some(pid)) = (self.vid, self.pid) {
            write!(f, " ({vid:04X}:{pid:04X})")?;
        }
        match (&self.manufacturer, &self.product) {
            (Some(manufacturer), Some(product)) => write!(f, " {manufacturer} {product}")?,
            (Some(name), None) | (None, Some(name)) => write!(f, " {name}")?,
            (None, None) => {}
        }
        if let Some(serial) = &self.serial_number {
            write!(f, " s/n {serial}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: serialport::DataBits,
    pub parity: serialport::Parity,
    pub stop_bits: serialport::StopBits,
    pub flow_control: serialport::FlowControl,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_name: DEFAULT_PORT.to_string(),
            baud_rate: BAUD_RATE,
            data_bits: serialport::DataBits::Eight,
            parity: serialport::Parity::None,
            stop_bits: serialport::StopBits::One,
            flow_control: serialport::FlowControl::None,
            timeout: READ_TIMEOUT,
            poll_interval: POLL_INTERVAL,
        }
    }
}

/// A byte stream that delivers newline-terminated lines.
pub trait LineSource {
    /// Number of received bytes not yet consumed.
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Appends one line to `buf`, terminator included, and returns the
    /// number of bytes appended. A line cut short by the read timeout is
    /// returned as is.
    fn read_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize>;
}

/// Reads up to and including `\n`. A timeout ends the line early with
/// whatever was read so far instead of failing.
pub fn read_line_with_timeout<R: BufRead + ?Sized>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> io::Result<usize> {
    let start = buf.len();
    match reader.read_until(b'\n', buf) {
        Ok(n) => Ok(n),
        Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(buf.len() - start),
        Err(e) => Err(e),
    }
}

/// Bytes the driver has received that have not been read yet.
pub trait QueuedBytes {
    fn queued(&self) -> io::Result<u32>;
}

impl QueuedBytes for Box<dyn SerialPort> {
    fn queued(&self) -> io::Result<u32> {
        self.bytes_to_read().map_err(io::Error::from)
    }
}

/// An open serial port. Dropping it closes the port.
pub struct SerialConnection<P = Box<dyn SerialPort>> {
    reader: BufReader<P>,
    port_name: String,
}

impl<P: Read> SerialConnection<P> {
    fn with_port(port: P, port_name: &str) -> Self {
        Self {
            reader: BufReader::new(port),
            port_name: port_name.to_string(),
        }
    }
}

impl SerialConnection {
    pub fn list_ports() -> Vec<PortInfo> {
        serialport::available_ports()
            .unwrap_or_default()
            .into_iter()
            .map(PortInfo::from)
            .collect()
    }

    pub fn open(cfg: &SerialConfig) -> Result<Self> {
        let port = serialport::new(&cfg.port_name, cfg.baud_rate)
            .data_bits(cfg.data_bits)
            .parity(cfg.parity)
            .stop_bits(cfg.stop_bits)
            .flow_control(cfg.flow_control)
            .timeout(cfg.timeout)
            .open()
            .map_err(|source| MonitorError::Open {
                port: cfg.port_name.clone(),
                source,
            })?;

        log::info!("opened {} at {} baud", cfg.port_name, cfg.baud_rate);
        Ok(Self::with_port(port, &cfg.port_name))
    }
}

impl<P: Read + QueuedBytes> LineSource for SerialConnection<P> {
    /// Counts what the `BufReader` already holds as well as the driver queue,
    /// so a second line that arrived in the same chunk is not left waiting.
    fn bytes_available(&mut self) -> io::Result<usize> {
        let queued = self.reader.get_ref().queued()?;
        Ok(self.reader.buffer().len() + queued as usize)
    }

    fn read_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        read_line_with_timeout(&mut self.reader, buf)
    }
}

impl<P> Drop for SerialConnection<P> {
    fn drop(&mut self) {
        log::debug!("closing {}", self.port_name);
    }
}
