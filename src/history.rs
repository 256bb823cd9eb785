//! Generation history.
//!
//! A newest-first, capped sequence of [`HistoryItem`]s. Each mutation
//! rewrites the whole sequence under [`HISTORY_STORAGE_KEY`]; clearing
//! removes the key instead of writing an empty array.

use std::rc::Rc;

use log::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::{HISTORY_STORAGE_KEY, MAX_HISTORY_ITEMS};
use crate::kv_store::{write_json, KeyValueStore};
use crate::models::{AspectRatio, GeneratedImage, HistoryItem};

/// Dedup rule: a candidate is inserted only if no existing entry has the same
/// prompt, image count and aspect ratio. Matching entries are left untouched.
pub fn should_insert(candidate: &HistoryItem, existing: &[HistoryItem]) -> bool {
    !existing.iter().any(|item| item.same_settings(candidate))
}

pub struct HistoryStore {
    store: Rc<dyn KeyValueStore>,
    clock: Rc<dyn Clock>,
    max_items: usize,
    items: Vec<HistoryItem>,
}

impl HistoryStore {
    pub fn load(store: Rc<dyn KeyValueStore>, clock: Rc<dyn Clock>) -> Self {
        Self::load_with_capacity(store, clock, MAX_HISTORY_ITEMS)
    }

    /// Reads the persisted sequence once. Missing, unreadable or malformed
    /// data yields an empty history; nothing is written back.
    pub fn load_with_capacity(store: Rc<dyn KeyValueStore>, clock: Rc<dyn Clock>, max_items: usize) -> Self {
        let mut items = match store.get(HISTORY_STORAGE_KEY) {
            Ok(Some(json)) => serde_json::from_str::<Vec<HistoryItem>>(&json).unwrap_or_else(|e| {
                warn!("Failed to parse history from storage: {e}");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                error!("Failed to read history from storage: {e}");
                Vec::new()
            }
        };

        if items.len() > max_items {
            warn!("Stored history has {} entries; keeping the newest {}", items.len(), max_items);
            items.truncate(max_items);
        }

        info!("Loaded {} history entries", items.len());
        Self {
            store,
            clock,
            max_items,
            items,
        }
    }

    /// Newest first.
    pub fn history(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn find(&self, id: i64) -> Option<&HistoryItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Records a successful generation.
    ///
    /// Returns the new front entry, or `None` when `images` is empty or an
    /// entry with the same settings already exists. In both of those cases
    /// nothing is written.
    pub fn add_history_item(
        &mut self,
        prompt: &str,
        number_of_images: u32,
        aspect_ratio: AspectRatio,
        images: &[GeneratedImage],
    ) -> Option<&HistoryItem> {
        let Some(first) = images.first() else {
            debug!("No images to record in history");
            return None;
        };

        let candidate = HistoryItem {
            id: self.next_id(),
            prompt: prompt.to_string(),
            number_of_images,
            aspect_ratio,
            thumbnail_src: first.src.clone(),
        };

        if !should_insert(&candidate, &self.items) {
            debug!("Skipping duplicate history entry for prompt {:?} ({}, {})", prompt, number_of_images, aspect_ratio);
            return None;
        }

        self.items.insert(0, candidate);
        if self.items.len() > self.max_items {
            let evicted = self.items.len() - self.max_items;
            self.items.truncate(self.max_items);
            debug!("Evicted {} oldest history entries", evicted);
        }
        self.persist();

        self.items.first()
    }

    /// Removes the entry with `id`. Returns `false` and leaves storage alone
    /// if there is no such entry.
    pub fn delete_history_item(&mut self, id: i64) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        if self.items.len() == before {
            debug!("No history entry with id {id}");
            return false;
        }
        self.persist();
        true
    }

    /// Empties the history and frees the storage key.
    pub fn clear_history(&mut self) {
        self.items.clear();
        if let Err(e) = self.store.remove(HISTORY_STORAGE_KEY) {
            warn!("Failed to remove history from storage: {e}");
        }
        info!("History cleared");
    }

    // Ids come from the clock but must stay unique when two entries land in
    // the same millisecond.
    fn next_id(&self) -> i64 {
        let now = self.clock.now_millis();
        match self.items.iter().map(|item| item.id).max() {
            Some(max) if now <= max => max + 1,
            _ => now,
        }
    }

    fn persist(&self) {
        if let Err(e) = write_json(&*self.store, HISTORY_STORAGE_KEY, &self.items) {
            warn!("Failed to save history; keeping in-memory entries: {e}");
        }
    }
}
