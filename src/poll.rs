//! Continuous reading on a background thread.
//!
//! A [`PollSession`] owns one worker thread that reads the gauge at a fixed
//! interval and pushes [`PollEvent`]s over a channel. The first failed read
//! ends the session; restarting is up to the caller.

use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{GaugeError, Result};
use crate::interval;
use crate::protocol::GaugeLink;
use crate::types::Reading;

/// Events emitted by a poll session
#[derive(Debug)]
pub enum PollEvent {
    /// A measurement was read
    ValueRead(Reading),
    /// A read failed; the session ends right after this event
    LinkError(GaugeError),
    /// Always the last event of a session
    SessionEnded,
}

/// Starts poll sessions
pub struct PollScheduler;

impl PollScheduler {
    /// Start reading `link` every `interval`.
    ///
    /// The link must be connected and not already polling. While the
    /// session runs, the link refuses other commands with
    /// [`GaugeError::DeviceBusy`].
    pub fn start(link: &GaugeLink, interval: Duration) -> Result<PollSession> {
        link.begin_polling()?;
        if !link.is_connected() {
            link.end_polling();
            return Err(GaugeError::not_connected());
        }

        if let Some(baud_rate) = link.baud_rate() {
            let seconds = interval.as_secs_f64();
            if !interval::is_valid(seconds, baud_rate) {
                warn!(
                    "Poll interval {:.4}s is below the {:.4}s minimum at {} baud; readings will lag",
                    seconds,
                    interval::min_interval(baud_rate),
                    baud_rate
                );
            }
        }

        let running = Arc::new(AtomicBool::new(true));
        let (sender, receiver) = mpsc::channel();
        let worker = Worker {
            link: link.clone(),
            interval,
            slice: link.config().poll_slice,
            running: running.clone(),
            events: sender,
        };

        let handle = thread::Builder::new()
            .name("gauge-poll".to_string())
            .spawn(move || worker.run());
        let handle = match handle {
            Ok(handle) => handle,
            Err(e) => {
                link.end_polling();
                return Err(e.into());
            }
        };

        debug!("Continuous reading started, interval {:?}", interval);
        Ok(PollSession {
            interval,
            running,
            handle: Some(handle),
            events: receiver,
        })
    }
}

struct Worker {
    link: GaugeLink,
    interval: Duration,
    slice: Duration,
    running: Arc<AtomicBool>,
    events: Sender<PollEvent>,
}

impl Worker {
    fn run(self) {
        while self.running.load(Ordering::SeqCst) {
            let started = Instant::now();
            match self.link.read_unchecked() {
                Ok(reading) => {
                    if self.events.send(PollEvent::ValueRead(reading)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Continuous reading stopped: {}", e);
                    let _ = self.events.send(PollEvent::LinkError(e));
                    break;
                }
            }
            self.wait_until(started + self.interval);
        }

        self.running.store(false, Ordering::SeqCst);
        self.link.end_polling();
        debug!("Continuous reading ended");
        let _ = self.events.send(PollEvent::SessionEnded);
    }

    /// Sleep in short slices so a stop request is seen promptly.
    fn wait_until(&self, deadline: Instant) {
        while self.running.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(self.slice.min(deadline - now));
        }
    }
}

/// A running (or finished) continuous reading session
pub struct PollSession {
    interval: Duration,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    events: Receiver<PollEvent>,
}

impl PollSession {
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// False once stopped or ended by a read failure
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Event stream; ends after [`PollEvent::SessionEnded`]
    pub fn events(&self) -> &Receiver<PollEvent> {
        &self.events
    }

    /// Wait up to `timeout` for the next event.
    pub fn next_event(&self, timeout: Duration) -> Option<PollEvent> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Request cancellation and wait for the worker to exit.
    ///
    /// A read already in flight completes first. No read is issued after
    /// this returns, and the link accepts commands again.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Poll worker panicked");
            }
        }
    }
}

impl Drop for PollSession {
    fn drop(&mut self) {
        self.stop();
    }
}
