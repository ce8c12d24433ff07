//! Single-flight gate for exchanges
//!
//! The widget's send button mirrors this flag. Holding a [`SendPermit`]
//! keeps sending disabled; dropping it re-enables sending on every exit
//! path, including a dropped exchange future.

use crate::transcript::SurfaceEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

pub struct SendControl {
    in_flight: AtomicBool,
    events: broadcast::Sender<SurfaceEvent>,
}

impl SendControl {
    pub fn new(events: broadcast::Sender<SurfaceEvent>) -> Self {
        Self {
            in_flight: AtomicBool::new(false),
            events,
        }
    }

    /// Disable sending, or return `None` if an exchange is already running
    pub fn try_acquire(&self) -> Option<SendPermit<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        let _ = self.events.send(SurfaceEvent::SendControl { enabled: false });
        Some(SendPermit { control: self })
    }

    pub fn is_enabled(&self) -> bool {
        !self.in_flight.load(Ordering::Acquire)
    }
}

pub struct SendPermit<'a> {
    control: &'a SendControl,
}

impl Drop for SendPermit<'_> {
    fn drop(&mut self) {
        self.control.in_flight.store(false, Ordering::Release);
        let _ = self
            .control
            .events
            .send(SurfaceEvent::SendControl { enabled: true });
    }
}
