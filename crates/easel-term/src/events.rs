use std::collections::VecDeque;

use crossterm::event::EventStream;
use easel::{BoxError, EventSource, HostEvent, RefreshTimer};
use futures::StreamExt;
use tracing::debug;

use crate::input::{Input, translate};

/// Multiplexes the refresh timer and terminal input into one event stream.
pub struct TerminalEvents {
    stream: EventStream,
    timer: RefreshTimer,
    pending: VecDeque<HostEvent>,
    reports_releases: bool,
}

impl TerminalEvents {
    #[must_use]
    pub fn new(refresh_hz: u32, reports_releases: bool) -> Self {
        Self {
            stream: EventStream::new(),
            timer: RefreshTimer::new(refresh_hz),
            pending: VecDeque::new(),
            reports_releases,
        }
    }
}

#[async_trait::async_trait]
impl EventSource for TerminalEvents {
    async fn next_event(&mut self) -> Result<Option<HostEvent>, BoxError> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }

            tokio::select! {
                () = self.timer.wait() => return Ok(Some(HostEvent::Refresh)),
                event = self.stream.next() => match event {
                    Some(Ok(event)) => match translate(&event, self.reports_releases) {
                        Input::Quit => {
                            debug!("interrupt received");
                            return Ok(None);
                        }
                        Input::Forward(events) => self.pending.extend(events),
                    },
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(None),
                },
            }
        }
    }
}
