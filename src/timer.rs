use chrono::{DateTime, Duration, Utc};
use std::cell::Cell;
use std::rc::Rc;

/// Source of wall-clock time for sessions and the rest timer.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

/// Rest timer counting whole seconds while running.
///
/// The timer holds no callback or thread: elapsed time is derived from the
/// instant it was started, so stopping or dropping it never leaves anything
/// ticking in the background. At most one running span exists at a time.
#[derive(Debug, Default, Clone)]
pub struct RestTimer {
    accumulated: u64,
    started_at: Option<DateTime<Utc>>,
}

impl RestTimer {
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    pub fn stop(&mut self, now: DateTime<Utc>) {
        if let Some(started) = self.started_at.take() {
            self.accumulated += whole_seconds(now - started);
        }
    }

    /// Starts a stopped timer or stops a running one. Returns the new running state.
    pub fn toggle(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_running() {
            self.stop(now);
        } else {
            self.start(now);
        }
        self.is_running()
    }

    pub fn reset(&mut self) {
        self.accumulated = 0;
        self.started_at = None;
    }

    #[must_use]
    pub fn seconds(&self, now: DateTime<Utc>) -> u64 {
        let running = self
            .started_at
            .map_or(0, |started| whole_seconds(now - started));
        self.accumulated + running
    }
}

fn whole_seconds(span: Duration) -> u64 {
    u64::try_from(span.num_seconds()).unwrap_or(0)
}

/// Formats seconds as `m:ss`.
#[must_use]
pub fn format_time(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
