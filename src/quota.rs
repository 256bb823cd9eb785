//! Daily generation quota.
//!
//! The tracker mirrors one [`QuotaRecord`] in memory and rewrites it on every
//! change. Day rollover is lazy: the stored date is compared with "today"
//! when the tracker loads and again on each `record_generation`, never on a
//! timer. A session left open across midnight keeps showing yesterday's
//! remaining count until the next generation is recorded.

use std::rc::Rc;

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::clock::Clock;
use crate::config::{DAILY_LIMIT, LIMIT_STORAGE_KEY};
use crate::kv_store::{write_json, KeyValueStore};
use crate::models::QuotaRecord;

/// Snapshot handed to the UI for rendering the "N left today" line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatus {
    pub remaining_generations: u32,
    pub generated_today: u32,
    pub daily_limit: u32,
    pub limit_reached: bool,
}

pub struct QuotaTracker {
    store: Rc<dyn KeyValueStore>,
    clock: Rc<dyn Clock>,
    daily_limit: u32,
    record: QuotaRecord,
}

impl QuotaTracker {
    /// Loads today's record with the default limit of [`DAILY_LIMIT`] images.
    pub fn load(store: Rc<dyn KeyValueStore>, clock: Rc<dyn Clock>) -> Self {
        Self::load_with_limit(store, clock, DAILY_LIMIT)
    }

    /// Runs the session-start protocol:
    ///
    /// - no stored record: create `{count: 0, date: today}` and persist it
    /// - stored record for today: adopt its count
    /// - stored record for another day: overwrite with a zeroed record for today
    ///
    /// Unreadable or malformed data is treated as absent.
    pub fn load_with_limit(store: Rc<dyn KeyValueStore>, clock: Rc<dyn Clock>, daily_limit: u32) -> Self {
        let today = clock.today();

        let stored = match store.get(LIMIT_STORAGE_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<QuotaRecord>(&json) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Discarding malformed generation limit record: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                error!("Failed to read generation limit from storage: {e}");
                None
            }
        };

        let mut tracker = Self {
            store,
            clock,
            daily_limit,
            record: QuotaRecord::fresh(today),
        };

        match stored {
            Some(record) if record.is_for(today) => {
                debug!("Adopting {} generations recorded for {}", record.count, today);
                tracker.record = record;
            }
            Some(record) => {
                info!("Generation limit rolled over from {} to {}", record.date, today);
                tracker.persist();
            }
            None => {
                info!("Initializing generation limit for {}", today);
                tracker.persist();
            }
        }

        tracker
    }

    /// `max(0, daily_limit - count)` for the in-memory record.
    pub fn remaining_generations(&self) -> u32 {
        self.daily_limit.saturating_sub(self.record.count)
    }

    /// Whether a request for `count` images fits in what is left today.
    pub fn can_generate(&self, count: u32) -> bool {
        let remaining = self.remaining_generations();
        remaining > 0 && count <= remaining
    }

    pub fn generated_today(&self) -> u32 {
        self.record.count
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    pub fn status(&self) -> QuotaStatus {
        let remaining = self.remaining_generations();
        QuotaStatus {
            remaining_generations: remaining,
            generated_today: self.record.count,
            daily_limit: self.daily_limit,
            limit_reached: remaining == 0,
        }
    }

    /// Adds `count` images to today's total and persists the record.
    ///
    /// The increment is applied to the current in-memory record, so
    /// back-to-back calls accumulate. If the date changed since the record
    /// was loaded, the count restarts from zero for the new day first.
    pub fn record_generation(&mut self, count: u32) {
        if count == 0 {
            debug!("Ignoring record_generation(0)");
            return;
        }

        let today = self.clock.today();
        if !self.record.is_for(today) {
            info!("Generation limit rolled over from {} to {}", self.record.date, today);
            self.record = QuotaRecord::fresh(today);
        }

        self.record.count = self.record.count.saturating_add(count);
        debug!(
            "Recorded {} generations; {} of {} used on {}",
            count, self.record.count, self.daily_limit, self.record.date
        );
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = write_json(&*self.store, LIMIT_STORAGE_KEY, &self.record) {
            warn!("Failed to save generation limit; keeping in-memory count: {e}");
        }
    }
}
