//! Single-flight wrapper around [`SuggestionClient`].
//!
//! At most one request is in flight; a second call while one is pending is
//! rejected with [`SuggestError::Busy`] rather than queued.

use super::{Language, SuggestError, SuggestionClient};
use image::RgbaImage;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug)]
pub struct SuggestionService {
    client: SuggestionClient,
    busy: AtomicBool,
}

/// Marks the service busy until dropped.
#[derive(Debug)]
pub struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl SuggestionService {
    pub fn new(client: SuggestionClient) -> Self {
        Self {
            client,
            busy: AtomicBool::new(false),
        }
    }

    pub fn client(&self) -> &SuggestionClient {
        &self.client
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Claim the single request slot.
    pub fn begin(&self) -> Result<BusyGuard<'_>, SuggestError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SuggestError::Busy)?;
        Ok(BusyGuard { flag: &self.busy })
    }

    /// Fetch suggestions; only fails when another request is pending.
    ///
    /// The slot is released when the request completes or the future is
    /// dropped.
    pub async fn suggest(
        &self,
        image: &RgbaImage,
        lang: Language,
    ) -> Result<Vec<String>, SuggestError> {
        let _guard = self.begin()?;
        Ok(self.client.suggest(image, lang).await)
    }
}
