//! Wall-clock access for day rollover and history ids.
//!
//! "Today" is always computed at the moment of a read or write. Nothing in
//! this crate schedules a reset in the background.

use std::cell::Cell;

use chrono::{Local, NaiveDate};

pub trait Clock {
    /// Current calendar date in the local timezone.
    fn today(&self) -> NaiveDate;

    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now_millis(&self) -> i64 {
        Local::now().timestamp_millis()
    }
}

/// Manually driven clock for embedding hosts that supply their own time, and for tests.
#[derive(Debug)]
pub struct FixedClock {
    today: Cell<NaiveDate>,
    millis: Cell<i64>,
}

impl FixedClock {
    pub fn new(today: NaiveDate, millis: i64) -> Self {
        Self {
            today: Cell::new(today),
            millis: Cell::new(millis),
        }
    }

    pub fn set_today(&self, today: NaiveDate) {
        self.today.set(today);
    }

    pub fn advance_millis(&self, delta: i64) {
        self.millis.set(self.millis.get() + delta);
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.today.get()
    }

    fn now_millis(&self) -> i64 {
        self.millis.get()
    }
}
