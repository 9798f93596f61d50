//! Binary handles for intermediate and published images.
//!
//! A [`BlobStore`] plays the role of the browser's object-URL table. Every
//! [`BlobHandle`] it issues is released when the handle is dropped, so each
//! handle is released exactly once whichever way the owning code exits.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
struct StoreInner {
    entries: Mutex<HashMap<u64, Arc<[u8]>>>,
    next_id: AtomicU64,
    released: AtomicU64,
}

/// Shared table of live binary handles.
#[derive(Clone, Default)]
pub struct BlobStore {
    inner: Arc<StoreInner>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `bytes` and returns the owning handle.
    pub fn create(&self, bytes: Vec<u8>, mime_type: &'static str) -> BlobHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let data: Arc<[u8]> = bytes.into();
        self.inner.entries.lock().insert(id, data.clone());
        log::trace!("blob {} created ({} bytes, {})", id, data.len(), mime_type);
        BlobHandle {
            id,
            mime_type,
            data,
            store: self.inner.clone(),
        }
    }

    /// Looks up a live handle by URL.
    pub fn resolve(&self, url: &str) -> Option<Arc<[u8]>> {
        let id = url.strip_prefix(BLOB_URL_PREFIX)?.parse::<u64>().ok()?;
        self.inner.entries.lock().get(&id).cloned()
    }

    /// Number of handles not yet released.
    pub fn live_count(&self) -> usize {
        self.inner.entries.lock().len()
    }

    pub fn created_count(&self) -> u64 {
        self.inner.next_id.load(Ordering::Relaxed)
    }

    pub fn released_count(&self) -> u64 {
        self.inner.released.load(Ordering::Relaxed)
    }
}

const BLOB_URL_PREFIX: &str = "blob:cutout/";

/// Owning reference to one registered binary artifact.
pub struct BlobHandle {
    id: u64,
    mime_type: &'static str,
    data: Arc<[u8]>,
    store: Arc<StoreInner>,
}

impl BlobHandle {
    pub fn url(&self) -> String {
        format!("{}{}", BLOB_URL_PREFIX, self.id)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Reference-counted copy of the bytes for work that runs off the owning task.
    pub fn shared(&self) -> Arc<[u8]> {
        self.data.clone()
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }
}

impl std::fmt::Debug for BlobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobHandle")
            .field("url", &self.url())
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

impl Drop for BlobHandle {
    fn drop(&mut self) {
        if self.store.entries.lock().remove(&self.id).is_some() {
            self.store.released.fetch_add(1, Ordering::Relaxed);
            log::trace!("blob {} released", self.id);
        }
    }
}

/// Holder for the currently displayed result.
///
/// Installing a new handle releases the previous one; this is the only place
/// the displayed result changes hands.
#[derive(Debug, Default)]
pub struct ResultSlot {
    current: Option<BlobHandle>,
}

impl ResultSlot {
    pub fn replace(&mut self, next: Option<BlobHandle>) {
        // the old handle drops here, after the new one is in place
        let _previous = std::mem::replace(&mut self.current, next);
    }

    pub fn clear(&mut self) {
        self.replace(None);
    }

    pub fn get(&self) -> Option<&BlobHandle> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_a_handle_releases_it_once() {
        let store = BlobStore::new();
        let handle = store.create(vec![1, 2, 3], "image/png");
        let url = handle.url();
        assert_eq!(store.resolve(&url).as_deref(), Some(&[1u8, 2, 3][..]));
        assert_eq!(store.live_count(), 1);

        drop(handle);
        assert_eq!(store.live_count(), 0);
        assert_eq!(store.released_count(), 1);
        assert!(store.resolve(&url).is_none());
    }

    #[test]
    fn slot_releases_previous_on_replace_and_clear() {
        let store = BlobStore::new();
        let mut slot = ResultSlot::default();

        slot.replace(Some(store.create(vec![1], "image/png")));
        slot.replace(Some(store.create(vec![2], "image/png")));
        assert_eq!(store.live_count(), 1);
        assert_eq!(store.released_count(), 1);
        assert_eq!(slot.get().map(|h| h.bytes().to_vec()), Some(vec![2]));

        slot.clear();
        slot.clear();
        assert_eq!(store.live_count(), 0);
        assert_eq!(store.released_count(), 2);
        assert_eq!(store.created_count(), 2);
    }

    #[test]
    fn urls_are_unique() {
        let store = BlobStore::new();
        let a = store.create(vec![], "image/png");
        let b = store.create(vec![], "image/png");
        assert_ne!(a.url(), b.url());
    }
}
