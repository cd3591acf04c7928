use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

pub const MILLIS_PER_HOUR: f64 = 60.0 * 60.0 * 1000.0;

/// Wall-clock source in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(now_millis),
        }
    }

    pub fn advance_hours(&self, hours: f64) {
        let delta = (hours * MILLIS_PER_HOUR) as i64;
        self.now.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

pub fn hours_between(from_millis: i64, to_millis: i64) -> f64 {
    (to_millis - from_millis) as f64 / MILLIS_PER_HOUR
}

/// Short display date (`M/D/YYYY`, UTC) shown on post cards.
pub fn display_date(timestamp_millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(timestamp_millis) {
        Some(dt) => dt.format("%-m/%-d/%Y").to_string(),
        None => String::new(),
    }
}
