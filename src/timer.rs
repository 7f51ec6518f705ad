//! Countdown timer driven by cooperative one-second ticks

use crate::session::SessionEvent;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;

pub const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running(u64),
    Expired,
}

#[derive(Debug, Clone)]
pub struct Countdown {
    duration: u64,
    remaining: u64,
}

impl Countdown {
    pub fn new(duration_secs: u64) -> Self {
        Self {
            duration: duration_secs,
            remaining: duration_secs,
        }
    }

    pub fn tick(&mut self) -> TickOutcome {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            TickOutcome::Expired
        } else {
            TickOutcome::Running(self.remaining)
        }
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn elapsed(&self) -> u64 {
        self.duration - self.remaining
    }
}

/// Format seconds as `mm:ss`
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Feed a `Tick` into the session channel every `period` until aborted or the
/// receiver goes away. The first tick fires one period after spawning.
pub fn spawn_ticker<T>(tx: flume::Sender<T>, period: Duration) -> JoinHandle<()>
where
    T: From<SessionEvent> + Send + 'static,
{
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + period;
        let mut ticks = IntervalStream::new(tokio::time::interval_at(start, period));
        while ticks.next().await.is_some() {
            if tx.send_async(T::from(SessionEvent::Tick)).await.is_err() {
                break;
            }
        }
    })
}
