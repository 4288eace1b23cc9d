//! Log-activity clock used by the progress reporter to stay quiet while
//! other output is already flowing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Target of the periodic progress lines. Events on this target do not
/// count as log activity.
pub const PROGRESS_TARGET: &str = "cloudsift::progress";

const NEVER: u64 = u64::MAX;

/// Remembers when the last log event was emitted.
#[derive(Debug)]
pub struct LogClock {
    origin: Instant,
    last_event_ms: AtomicU64,
}

impl Default for LogClock {
    fn default() -> Self {
        Self::new()
    }
}

impl LogClock {
    /// Clock with no recorded activity.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_event_ms: AtomicU64::new(NEVER),
        }
    }

    /// Record log activity now.
    pub fn touch(&self) {
        let elapsed = self.origin.elapsed().as_millis() as u64;
        self.last_event_ms.store(elapsed, Ordering::Relaxed);
    }

    /// Time of the last recorded event, if any.
    pub fn last_event(&self) -> Option<Instant> {
        match self.last_event_ms.load(Ordering::Relaxed) {
            NEVER => None,
            ms => Some(self.origin + Duration::from_millis(ms)),
        }
    }

    /// How long no log event has been recorded. Before the first event this
    /// is the clock's age.
    pub fn idle_for(&self) -> Duration {
        let since = self.last_event().unwrap_or(self.origin);
        since.elapsed()
    }

    /// A `tracing_subscriber` layer feeding this clock.
    pub fn layer(self: &Arc<Self>) -> LogClockLayer {
        LogClockLayer {
            clock: Arc::clone(self),
        }
    }
}

/// Subscriber layer that touches a [`LogClock`] on every event outside
/// the progress target.
#[derive(Debug, Clone)]
pub struct LogClockLayer {
    clock: Arc<LogClock>,
}

impl<S> Layer<S> for LogClockLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if event.metadata().target() != PROGRESS_TARGET {
            self.clock.touch();
        }
    }
}
