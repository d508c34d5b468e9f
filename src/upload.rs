//! Selected-file state and preview handle lifecycle

use bytes::Bytes;
use mime::Mime;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

use crate::client::RequestState;

/// An image picked by the user: raw bytes plus the MIME type and file name
/// the picker reported. No content validation happens here; the
/// identification service is the authority on what it accepts.
#[derive(Debug, Clone)]
pub struct ImageBlob {
    pub bytes: Bytes,
    pub mime: Mime,
    pub file_name: String,
}

impl ImageBlob {
    pub fn new(bytes: impl Into<Bytes>, mime: Mime, file_name: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime,
            file_name: file_name.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Registry of live preview handles.
///
/// Each selection owns exactly one [`PreviewHandle`]; the registry only
/// tracks how many are alive so leaks are observable in tests and logs.
#[derive(Debug, Default)]
pub struct PreviewStore {
    live: AtomicUsize,
}

impl PreviewStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn acquire(self: &Arc<Self>) -> PreviewHandle {
        self.live.fetch_add(1, Ordering::Relaxed);
        let handle = PreviewHandle {
            id: Uuid::new_v4(),
            store: Arc::clone(self),
        };
        tracing::debug!(preview_id = %handle.id, "Preview handle created");
        handle
    }

    /// Number of preview handles currently alive
    pub fn live_previews(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }
}

/// Opaque display handle for the selected image's preview.
///
/// Scoped resource: released on drop, which happens when the selection is
/// replaced or the owning [`UploadState`] is torn down.
#[derive(Debug)]
pub struct PreviewHandle {
    id: Uuid,
    store: Arc<PreviewStore>,
}

impl PreviewHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.store.live.fetch_sub(1, Ordering::Relaxed);
        tracing::debug!(preview_id = %self.id, "Preview handle released");
    }
}

/// The current selection: the blob to submit and its preview handle.
/// Replaced wholesale on every new pick; there is no selection history.
#[derive(Debug)]
pub struct UploadSelection {
    pub blob: ImageBlob,
    pub preview: PreviewHandle,
}

/// Holds the selected file, its preview, and the request state for that
/// selection. Exactly one [`RequestState`] is live per selection; picking a
/// new file resets it to `Idle` and releases the prior preview handle.
#[derive(Debug)]
pub struct UploadState {
    selection: Option<UploadSelection>,
    request: RequestState,
    previews: Arc<PreviewStore>,
}

impl UploadState {
    pub fn new() -> Self {
        Self::with_store(PreviewStore::new())
    }

    /// Build against a shared registry, so callers can watch handle counts
    pub fn with_store(previews: Arc<PreviewStore>) -> Self {
        Self {
            selection: None,
            request: RequestState::Idle,
            previews,
        }
    }

    /// Replace the current selection unconditionally.
    ///
    /// The previous preview handle (if any) is released and any prior
    /// request result is discarded.
    pub fn select_file(&mut self, blob: ImageBlob) {
        let preview = self.previews.acquire();
        // Assignment drops the old selection, releasing its handle.
        self.selection = Some(UploadSelection { blob, preview });
        self.request = RequestState::Idle;
    }

    /// Clear the selection and release its preview handle
    pub fn reset(&mut self) {
        self.selection = None;
        self.request = RequestState::Idle;
    }

    pub fn selection(&self) -> Option<&UploadSelection> {
        self.selection.as_ref()
    }

    pub fn request(&self) -> &RequestState {
        &self.request
    }

    /// Mutable access for driving transitions; normally done through
    /// [`crate::client::run_identification`].
    pub fn request_mut(&mut self) -> &mut RequestState {
        &mut self.request
    }
}

impl Default for UploadState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiError;
    use serde_json::json;

    fn blob(name: &str) -> ImageBlob {
        ImageBlob::new(vec![0xFF, 0xD8, 0xFF], mime::IMAGE_JPEG, name)
    }

    #[test]
    fn select_file_replaces_selection_and_resets_request() {
        let mut state = UploadState::new();
        state.select_file(blob("a.jpg"));
        *state.request_mut() = RequestState::Failed(ApiError::unknown());

        state.select_file(blob("b.jpg"));
        assert_eq!(state.request(), &RequestState::Idle);
        assert_eq!(state.selection().unwrap().blob.file_name, "b.jpg");
    }

    #[test]
    fn select_after_success_clears_prior_result() {
        let raw = serde_json::from_value(json!({"manufacturer": "Acme"})).unwrap();
        let mut state = UploadState::new();
        state.select_file(blob("a.jpg"));
        *state.request_mut() = RequestState::Success(raw);

        state.select_file(blob("b.jpg"));
        assert_eq!(state.request(), &RequestState::Idle);
    }

    #[test]
    fn preview_handle_released_on_replacement() {
        let store = PreviewStore::new();
        let mut state = UploadState::with_store(Arc::clone(&store));

        state.select_file(blob("a.jpg"));
        assert_eq!(store.live_previews(), 1);

        state.select_file(blob("b.jpg"));
        assert_eq!(store.live_previews(), 1);

        state.reset();
        assert_eq!(store.live_previews(), 0);
    }

    #[test]
    fn preview_handle_released_on_teardown() {
        let store = PreviewStore::new();
        {
            let mut state = UploadState::with_store(Arc::clone(&store));
            state.select_file(blob("a.jpg"));
            assert_eq!(store.live_previews(), 1);
        }
        assert_eq!(store.live_previews(), 0);
    }

    #[test]
    fn preview_handles_are_distinct() {
        let store = PreviewStore::new();
        let mut state = UploadState::with_store(Arc::clone(&store));
        state.select_file(blob("a.jpg"));
        let first = state.selection().unwrap().preview.id();
        state.select_file(blob("a.jpg"));
        let second = state.selection().unwrap().preview.id();
        assert_ne!(first, second);
    }
}
