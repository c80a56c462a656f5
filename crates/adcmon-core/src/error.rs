use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    /// The port could not be acquired. Nothing was opened, so nothing needs closing.
    #[error("could not open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("serial I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to install Ctrl+C handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
