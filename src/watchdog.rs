//! Timeout-based liveness monitor
//!
//! One [`Watchdog`] guards one link. The engine feeds it on every valid
//! inbound packet; if no feed arrives within the timeout it emits
//! [`WatchdogEvent::Expired`] and rearms itself, so a link that stays silent
//! keeps expiring once per interval until it is fed or stopped. The engine
//! treats the repeated demotion of its comms flags as idempotent.
//!
//! The timer runs on a dedicated thread driven by a control channel with
//! `recv_timeout`; `feed()` rearms without any event, `stop()` tears the
//! thread down. Events are delivered on an unbounded channel the engine
//! selects over alongside its sockets and tickers.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use crate::error::{Error, Result};

/// Lifecycle notifications from a [`Watchdog`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogEvent {
    Started,
    Stopped,
    Expired,
}

enum Ctl {
    Feed,
    Stop,
}

/// States: Stopped (no timer thread) or Running
pub struct Watchdog {
    timeout: Duration,
    events_tx: Sender<WatchdogEvent>,
    events_rx: Receiver<WatchdogEvent>,
    ctl: Option<Sender<Ctl>>,
    handle: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Create a stopped watchdog with the given timeout
    pub fn new(timeout: Duration) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            timeout,
            events_tx,
            events_rx,
            ctl: None,
            handle: None,
        }
    }

    /// Event stream; clone freely, the engine selects over it
    pub fn events(&self) -> Receiver<WatchdogEvent> {
        self.events_rx.clone()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn started(&self) -> bool {
        self.ctl.is_some()
    }

    /// Arm a fresh timeout, cancelling any pending one, and emit `Started`
    ///
    /// Valid from either state; restarting a running watchdog replaces its
    /// timer without emitting `Stopped`.
    pub fn start(&mut self) -> Result<()> {
        self.cancel();

        let (ctl_tx, ctl_rx) = unbounded();
        let events = self.events_tx.clone();
        let timeout = self.timeout;

        let handle = thread::Builder::new()
            .name("setu-watchdog".to_string())
            .spawn(move || {
                loop {
                    match ctl_rx.recv_timeout(timeout) {
                        Ok(Ctl::Feed) => continue,
                        Ok(Ctl::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {
                            // Rearm after every expiry; a dead link keeps
                            // reporting until fed or stopped
                            let _ = events.send(WatchdogEvent::Expired);
                        }
                    }
                }
            })
            .map_err(|e| Error::Other(format!("Failed to spawn watchdog thread: {}", e)))?;

        self.ctl = Some(ctl_tx);
        self.handle = Some(handle);
        let _ = self.events_tx.send(WatchdogEvent::Started);
        Ok(())
    }

    /// Rearm the timeout without emitting anything; no-op while stopped
    pub fn feed(&self) {
        if let Some(ctl) = &self.ctl {
            let _ = ctl.send(Ctl::Feed);
        }
    }

    /// Cancel the timer and emit `Stopped`; no-op while already stopped
    pub fn stop(&mut self) {
        if self.cancel() {
            let _ = self.events_tx.send(WatchdogEvent::Stopped);
        }
    }

    /// Tear down the timer thread; returns whether it was running
    fn cancel(&mut self) -> bool {
        let was_running = match self.ctl.take() {
            Some(ctl) => {
                let _ = ctl.send(Ctl::Stop);
                true
            }
            None => false,
        };
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        was_running
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &Receiver<WatchdogEvent>) -> Vec<WatchdogEvent> {
        rx.try_iter().collect()
    }

    #[test]
    fn test_expires_when_not_fed() {
        let mut wd = Watchdog::new(Duration::from_millis(100));
        let events = wd.events();
        wd.start().unwrap();
        assert_eq!(events.recv().unwrap(), WatchdogEvent::Started);

        // Must expire at least once within 1.5x the timeout
        let ev = events.recv_timeout(Duration::from_millis(150)).unwrap();
        assert_eq!(ev, WatchdogEvent::Expired);
        wd.stop();
    }

    #[test]
    fn test_does_not_expire_while_fed() {
        let mut wd = Watchdog::new(Duration::from_millis(100));
        let events = wd.events();
        wd.start().unwrap();

        // Feed at half the timeout for three timeout periods
        for _ in 0..6 {
            std::thread::sleep(Duration::from_millis(50));
            wd.feed();
        }
        wd.stop();

        let expiries = drain(&events)
            .into_iter()
            .filter(|e| *e == WatchdogEvent::Expired)
            .count();
        assert_eq!(expiries, 0);
    }

    #[test]
    fn test_expires_continuously() {
        let mut wd = Watchdog::new(Duration::from_millis(50));
        let events = wd.events();
        wd.start().unwrap();

        std::thread::sleep(Duration::from_millis(300));
        wd.stop();

        let expiries = drain(&events)
            .into_iter()
            .filter(|e| *e == WatchdogEvent::Expired)
            .count();
        assert!(expiries >= 4, "only {} expiries", expiries);
    }

    #[test]
    fn test_stop_emits_once() {
        let mut wd = Watchdog::new(Duration::from_millis(500));
        let events = wd.events();
        wd.start().unwrap();
        wd.stop();
        wd.stop(); // second stop is a no-op

        assert_eq!(
            drain(&events),
            vec![WatchdogEvent::Started, WatchdogEvent::Stopped]
        );
        assert!(!wd.started());
    }

    #[test]
    fn test_restart_rearms() {
        let mut wd = Watchdog::new(Duration::from_millis(80));
        let events = wd.events();
        wd.start().unwrap();
        std::thread::sleep(Duration::from_millis(50));
        wd.start().unwrap(); // restart replaces the pending timer
        std::thread::sleep(Duration::from_millis(50));
        wd.stop();

        // Neither window reached the timeout on its own
        let expiries = drain(&events)
            .into_iter()
            .filter(|e| *e == WatchdogEvent::Expired)
            .count();
        assert_eq!(expiries, 0);
    }
}
