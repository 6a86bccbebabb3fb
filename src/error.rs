//! Error types for gauge link operations.

use thiserror::Error;

/// Result type alias for gauge operations.
pub type Result<T> = std::result::Result<T, GaugeError>;

/// Reasons a received frame was rejected by the frame codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer bytes than the expected response shape
    #[error("Truncated frame: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Minimum length for the expected response
        expected: usize,
        /// Length actually received
        actual: usize,
    },

    /// Wrong address, function code or byte count
    #[error("Malformed frame: {0}")]
    Malformed(String),

    /// Trailing CRC16 does not match the frame contents
    #[error("Checksum mismatch: computed {computed:#06x}, received {received:#06x}")]
    ChecksumMismatch {
        /// CRC computed over the frame body
        computed: u16,
        /// CRC carried by the frame
        received: u16,
    },
}

/// Error types for gauge communication.
#[derive(Error, Debug)]
pub enum GaugeError {
    /// The transport could not be opened
    #[error("Port {port} unavailable: {reason}")]
    PortUnavailable {
        /// Port identifier
        port: String,
        /// Reason reported by the transport
        reason: String,
    },

    /// No or unusable response while otherwise connected
    #[error("Communication error: {0}")]
    Communication(String),

    /// Fewer bytes than expected arrived within the read timeout
    #[error("Communication timeout: expected {expected} bytes, received {received}")]
    Timeout {
        /// Bytes expected
        expected: usize,
        /// Bytes received before the timeout
        received: usize,
    },

    /// Response frame failed validation
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Requested baud rate is not one of the candidates
    #[error("Unsupported baud rate: {0}")]
    UnsupportedBaudRate(u32),

    /// A poll session currently owns the link
    #[error("Device busy: continuous reading is active")]
    DeviceBusy,

    /// Serial port communication error
    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GaugeError {
    /// Whether the error came from a rejected frame.
    pub fn is_frame_error(&self) -> bool {
        matches!(self, GaugeError::Frame(_))
    }

    pub(crate) fn not_connected() -> Self {
        GaugeError::Communication("not connected".to_string())
    }
}
