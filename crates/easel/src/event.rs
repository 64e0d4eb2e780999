//! Host events and the sources that deliver them to the frame driver.

use std::{collections::VecDeque, time::Duration};

use tokio::{
    sync::mpsc,
    time::{Interval, MissedTickBehavior},
};

use crate::{
    host::{BoxError, Viewport},
    input::PhysicalKey,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    KeyDown(PhysicalKey),
    KeyUp(PhysicalKey),
    Resize(Viewport),
    /// The display is ready for the next frame.
    Refresh,
}

/// A single ordered stream of host events.
///
/// Every source (refresh signal, keyboard, viewport) is multiplexed into one
/// stream so the bridge handles exactly one event at a time. `Ok(None)` means
/// the host is shutting down.
#[async_trait::async_trait]
pub trait EventSource: Send {
    async fn next_event(&mut self) -> core::result::Result<Option<HostEvent>, BoxError>;
}

/// Events queued in memory, drained in order.
#[derive(Debug, Default, Clone)]
pub struct QueuedEvents {
    queue: VecDeque<HostEvent>,
}

impl QueuedEvents {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: HostEvent) -> &mut Self {
        self.queue.push_back(event);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl FromIterator<HostEvent> for QueuedEvents {
    fn from_iter<T: IntoIterator<Item = HostEvent>>(iter: T) -> Self {
        Self {
            queue: iter.into_iter().collect(),
        }
    }
}

#[async_trait::async_trait]
impl EventSource for QueuedEvents {
    async fn next_event(&mut self) -> core::result::Result<Option<HostEvent>, BoxError> {
        Ok(self.queue.pop_front())
    }
}

#[async_trait::async_trait]
impl EventSource for mpsc::UnboundedReceiver<HostEvent> {
    async fn next_event(&mut self) -> core::result::Result<Option<HostEvent>, BoxError> {
        Ok(self.recv().await)
    }
}

/// Display-refresh signal derived from a fixed refresh rate.
///
/// A late frame does not cause a burst of catch-up ticks: missed deadlines are
/// skipped and the next signal lands on the following refresh boundary.
#[derive(Debug)]
pub struct RefreshTimer {
    interval: Interval,
}

impl RefreshTimer {
    pub const DEFAULT_RATE_HZ: u32 = 60;

    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(rate_hz: u32) -> Self {
        let period = Duration::from_secs(1) / rate_hz.max(1);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.interval.period()
    }

    pub async fn wait(&mut self) {
        self.interval.tick().await;
    }
}
