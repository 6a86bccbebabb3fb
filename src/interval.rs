//! Polling interval policy.
//!
//! One measurement moves 17 bytes over the wire (8-byte request, 9-byte
//! response) at 10 bit times per byte. The minimum interval is that
//! transfer time scaled by a fixed 1.5 margin for device latency and
//! scheduling jitter.

use serde::Serialize;
use std::time::Duration;

use crate::constants::*;
use crate::types::BaudRate;

/// Shortest safe polling interval at `baud_rate`, in seconds
pub fn min_interval(baud_rate: BaudRate) -> f64 {
    let bits = (TRANSACTION_BYTES * BITS_PER_BYTE) as f64;
    bits / baud_rate.as_u32() as f64 * INTERVAL_SAFETY_FACTOR
}

/// [`min_interval`] as a `Duration`
pub fn min_interval_duration(baud_rate: BaudRate) -> Duration {
    Duration::from_secs_f64(min_interval(baud_rate))
}

/// Highest sustainable polling frequency at `baud_rate`, in Hz
pub fn max_frequency(baud_rate: BaudRate) -> f64 {
    1.0 / min_interval(baud_rate)
}

/// Whether polling every `interval` seconds is sustainable at `baud_rate`
pub fn is_valid(interval: f64, baud_rate: BaudRate) -> bool {
    interval >= min_interval(baud_rate)
}

/// Slowest candidate that sustains `target_interval`, or the fastest
/// candidate when none does.
pub fn suggest_baud(target_interval: f64) -> BaudRate {
    BaudRate::ALL
        .into_iter()
        .find(|&baud_rate| min_interval(baud_rate) <= target_interval)
        .unwrap_or(BaudRate::FASTEST)
}

/// Raise `interval` to the minimum for `baud_rate` if it is below it.
pub fn clamp(interval: f64, baud_rate: BaudRate) -> f64 {
    interval.max(min_interval(baud_rate))
}

/// Summary of an interval against a baud rate, for status displays
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntervalCheck {
    pub interval: f64,
    pub baud_rate: BaudRate,
    pub min_interval: f64,
    pub max_frequency: f64,
    pub valid: bool,
    /// Rate to switch to when `valid` is false
    pub suggested_baud: Option<BaudRate>,
}

/// Evaluate `interval` at `baud_rate`.
pub fn assess(interval: f64, baud_rate: BaudRate) -> IntervalCheck {
    let valid = is_valid(interval, baud_rate);
    IntervalCheck {
        interval,
        baud_rate,
        min_interval: min_interval(baud_rate),
        max_frequency: max_frequency(baud_rate),
        valid,
        suggested_baud: (!valid).then(|| suggest_baud(interval)),
    }
}
