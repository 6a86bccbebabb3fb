//! Continuous Read Example
//!
//! Polls a gauge at a fixed interval for a few seconds and prints each
//! reading as JSON. The interval is checked against the link's baud rate
//! first and raised to the minimum if it is too short.
//!
//! Usage:
//!   cargo run --example continuous_read -- /dev/ttyUSB0 9600 0.05

use gauge_link::{interval, BaudRate, GaugeLink, PollEvent, PollScheduler, Result};
use log::{error, info, warn};
use std::time::{Duration, Instant};

const RUN_FOR: Duration = Duration::from_secs(5);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let port_name = args.next().unwrap_or_else(|| "/dev/ttyUSB0".to_string());
    let baud_rate = BaudRate::try_from(args.next().and_then(|s| s.parse::<u32>().ok()).unwrap_or(9600))?;
    let requested: f64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(0.2);

    let check = interval::assess(requested, baud_rate);
    info!(
        "Interval {:.3}s | minimum {:.4}s | max {:.1} Hz at {} baud",
        check.interval, check.min_interval, check.max_frequency, baud_rate
    );
    if let Some(suggested) = check.suggested_baud {
        warn!(
            "{:.3}s is too short at {} baud; switch the gauge to {} baud or accept {:.4}s",
            requested, baud_rate, suggested, check.min_interval
        );
    }
    let period = interval::clamp(requested, baud_rate);

    let link = GaugeLink::new();
    link.connect(&port_name, baud_rate.as_u32())?;

    let mut session = PollScheduler::start(&link, Duration::from_secs_f64(period))?;
    let started = Instant::now();
    while started.elapsed() < RUN_FOR {
        match session.next_event(Duration::from_millis(100)) {
            Some(PollEvent::ValueRead(reading)) => match serde_json::to_string(&reading) {
                Ok(json) => println!("{}", json),
                Err(e) => error!("Could not serialize reading: {}", e),
            },
            Some(PollEvent::LinkError(e)) => error!("Reading stopped: {}", e),
            Some(PollEvent::SessionEnded) => break,
            None => {}
        }
    }
    session.stop();

    link.disconnect()?;
    Ok(())
}
