//! Link configuration.
//!
//! Every field has a protocol default from [`crate::constants`]; a partial
//! serialized config only needs the fields it overrides.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::*;

/// Timing and calibration settings for a [`crate::GaugeLink`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Per-read timeout while connected
    pub read_timeout: Duration,
    /// Per-read timeout while probing candidate baud rates
    pub detect_timeout: Duration,
    /// Pause after a zero command before reading the echo
    pub zero_settle: Duration,
    /// Pause after a change-baud command before reading the echo
    pub baud_settle: Duration,
    /// Raw counts per millimetre. Firmware specific; some units use 10000.
    pub scale_divisor: f64,
    /// Require a valid CRC when probing during detection
    pub strict_detection: bool,
    /// Slice length of the cancellable wait between polls
    pub poll_slice: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(TIMEOUT_MS),
            detect_timeout: Duration::from_millis(DETECT_TIMEOUT_MS),
            zero_settle: Duration::from_millis(ZERO_SETTLE_MS),
            baud_settle: Duration::from_millis(BAUD_SETTLE_MS),
            scale_divisor: DEFAULT_SCALE_DIVISOR,
            strict_detection: true,
            poll_slice: Duration::from_millis(POLL_SLICE_MS),
        }
    }
}

impl LinkConfig {
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_detect_timeout(mut self, timeout: Duration) -> Self {
        self.detect_timeout = timeout;
        self
    }

    /// Override both settle delays.
    pub fn with_settle_delays(mut self, zero: Duration, baud: Duration) -> Self {
        self.zero_settle = zero;
        self.baud_settle = baud;
        self
    }

    pub fn with_scale_divisor(mut self, divisor: f64) -> Self {
        self.scale_divisor = divisor;
        self
    }

    pub fn with_strict_detection(mut self, strict: bool) -> Self {
        self.strict_detection = strict;
        self
    }
}
