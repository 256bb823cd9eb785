//! Top-level controller composing the quota tracker and the history store.
//!
//! The two managers never talk to each other. `Studio` checks the quota
//! before a submission and, once a generation succeeds, records it in the
//! quota and then in the history. There is no shared transaction: if the
//! process dies between the two writes, one of them is simply missing.

use std::rc::Rc;

use log::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::StudioConfig;
use crate::error::{GenerationError, StorageError};
use crate::history::HistoryStore;
use crate::kv_store::{KeyValueStore, LmdbStore};
use crate::models::{AspectRatio, GeneratedImage, GenerationRequest, HistoryItem};
use crate::quota::QuotaTracker;

/// The remote image generation call. Implemented by the host; a request
/// that the provider blocks should come back as [`GenerationError::Blocked`]
/// or as an empty image list.
pub trait ImageGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<Vec<GeneratedImage>, GenerationError>;
}

/// Quota tracker and history store over one shared storage handle.
///
/// Not `Send`: both managers hold the store and clock through `Rc`.
pub struct Studio {
    quota: QuotaTracker,
    history: HistoryStore,
}

impl Studio {
    pub fn new(quota: QuotaTracker, history: HistoryStore) -> Self {
        Self { quota, history }
    }

    /// Opens the LMDB store named in `config` and loads both records using the system clock.
    pub fn open(config: &StudioConfig) -> Result<Self, StorageError> {
        config.validate().map_err(StorageError::Unavailable)?;
        let store = LmdbStore::init_with_map_size(&config.storage_name, config.map_size_bytes)?;
        Ok(Self::with_store(Rc::new(store), Rc::new(SystemClock), config))
    }

    pub fn with_store(store: Rc<dyn KeyValueStore>, clock: Rc<dyn Clock>, config: &StudioConfig) -> Self {
        let quota = QuotaTracker::load_with_limit(Rc::clone(&store), Rc::clone(&clock), config.daily_limit);
        let history = HistoryStore::load_with_capacity(store, clock, config.max_history_items);
        info!(
            "Studio ready: {} generations left today, {} history entries",
            quota.remaining_generations(),
            history.len()
        );
        Self::new(quota, history)
    }

    pub fn quota(&self) -> &QuotaTracker {
        &self.quota
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn remaining_generations(&self) -> u32 {
        self.quota.remaining_generations()
    }

    pub fn can_generate(&self, count: u32) -> bool {
        self.quota.can_generate(count)
    }

    /// Checks a request against the form guards before anything is sent.
    ///
    /// A blank prompt or an unsupported image count is `InvalidRequest`. A
    /// request that today's remaining quota cannot cover is `QuotaExceeded`.
    pub fn check_request(&self, request: &GenerationRequest) -> Result<(), GenerationError> {
        request.validate().map_err(GenerationError::InvalidRequest)?;

        if !self.quota.can_generate(request.number_of_images) {
            return Err(GenerationError::QuotaExceeded {
                requested: request.number_of_images,
                remaining: self.quota.remaining_generations(),
            });
        }
        Ok(())
    }

    /// Runs one generation end to end.
    ///
    /// The request goes through [`Studio::check_request`] before `generator`
    /// is called. On success the number of images actually returned is
    /// charged to the quota and the request is added to the history.
    pub fn generate<G: ImageGenerator + ?Sized>(
        &mut self,
        generator: &G,
        request: &GenerationRequest,
    ) -> Result<Vec<GeneratedImage>, GenerationError> {
        self.check_request(request)?;

        let images = generator.generate(request)?;
        self.complete_generation(request, &images)?;
        Ok(images)
    }

    /// Books a generation that the host performed itself.
    ///
    /// An empty result means the service refused the prompt: nothing is
    /// charged and `Blocked` is returned.
    pub fn complete_generation(
        &mut self,
        request: &GenerationRequest,
        images: &[GeneratedImage],
    ) -> Result<(), GenerationError> {
        if images.is_empty() {
            warn!("Generator returned no images; treating the prompt as blocked");
            return Err(GenerationError::Blocked);
        }
        let produced = u32::try_from(images.len()).unwrap_or(u32::MAX);
        self.quota.record_generation(produced);
        self.history
            .add_history_item(&request.prompt, request.number_of_images, request.aspect_ratio, images);
        Ok(())
    }

    pub fn record_generation(&mut self, count: u32) {
        self.quota.record_generation(count);
    }

    pub fn add_history_item(
        &mut self,
        prompt: &str,
        number_of_images: u32,
        aspect_ratio: AspectRatio,
        images: &[GeneratedImage],
    ) -> Option<&HistoryItem> {
        self.history.add_history_item(prompt, number_of_images, aspect_ratio, images)
    }

    pub fn delete_history_item(&mut self, id: i64) -> bool {
        self.history.delete_history_item(id)
    }

    pub fn clear_history(&mut self) {
        self.history.clear_history();
    }

    /// The settings of a past generation, for pre-filling the prompt form.
    pub fn regenerate_from_history(&self, id: i64) -> Option<GenerationRequest> {
        self.history.find(id).map(HistoryItem::to_request)
    }
}
