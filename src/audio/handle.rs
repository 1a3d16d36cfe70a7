use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ── Payloads & References ──────────────────────────────

/// Binary payload with its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl Blob {
    pub fn new(bytes: Vec<u8>, mime: &str) -> Self {
        Self {
            bytes,
            mime: mime.to_string(),
        }
    }

    pub fn wav(bytes: Vec<u8>) -> Self {
        Self::new(bytes, "audio/wav")
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Revocable locator that addresses a [`Blob`] as if it were a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Creates and revokes object URLs.
pub trait ObjectUrlFactory: Send + Sync {
    fn create(&self, blob: &Blob) -> ObjectUrl;

    /// Release a URL. Unknown or already revoked URLs are ignored.
    fn revoke(&self, url: &ObjectUrl);
}

// ── Registry ───────────────────────────────────────────

/// In-process object URL table: `blob:<origin>/<uuid>` → payload.
pub struct ObjectUrlRegistry {
    origin: String,
    live: Mutex<HashMap<ObjectUrl, Blob>>,
    created: AtomicUsize,
    revoked: AtomicUsize,
}

impl ObjectUrlRegistry {
    pub fn new(origin: &str) -> Self {
        Self {
            origin: origin.to_string(),
            live: Mutex::new(HashMap::new()),
            created: AtomicUsize::new(0),
            revoked: AtomicUsize::new(0),
        }
    }

    /// Payload behind a live URL.
    pub fn resolve(&self, url: &ObjectUrl) -> Option<Blob> {
        self.live.lock().ok()?.get(url).cloned()
    }

    pub fn is_live(&self, url: &ObjectUrl) -> bool {
        self.live
            .lock()
            .map(|live| live.contains_key(url))
            .unwrap_or(false)
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().map(|live| live.len()).unwrap_or(0)
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    pub fn revoked_count(&self) -> usize {
        self.revoked.load(Ordering::Relaxed)
    }
}

impl Default for ObjectUrlRegistry {
    fn default() -> Self {
        Self::new("yukkuri")
    }
}

impl ObjectUrlFactory for ObjectUrlRegistry {
    fn create(&self, blob: &Blob) -> ObjectUrl {
        let url = ObjectUrl(format!("blob:{}/{}", self.origin, Uuid::new_v4()));
        if let Ok(mut live) = self.live.lock() {
            live.insert(url.clone(), blob.clone());
        }
        self.created.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("[ObjectUrl] Created {} ({} bytes)", url, blob.len());
        url
    }

    fn revoke(&self, url: &ObjectUrl) {
        let removed = self
            .live
            .lock()
            .map(|mut live| live.remove(url).is_some())
            .unwrap_or(false);
        if removed {
            self.revoked.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("[ObjectUrl] Revoked {}", url);
        }
    }
}

// ── ResourceHandle ─────────────────────────────────────

/// Owns at most one live object URL.
///
/// Installing a new payload revokes the previous URL first, and dropping
/// the handle revokes whatever it still holds.
pub struct ResourceHandle {
    factory: Arc<dyn ObjectUrlFactory>,
    current: Option<ObjectUrl>,
}

impl ResourceHandle {
    pub fn new(factory: Arc<dyn ObjectUrlFactory>) -> Self {
        Self {
            factory,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&ObjectUrl> {
        self.current.as_ref()
    }

    pub fn is_live(&self) -> bool {
        self.current.is_some()
    }

    /// Revoke the held URL (if any), then create and hold one for `blob`.
    pub fn install(&mut self, blob: &Blob) -> ObjectUrl {
        self.clear();
        let url = self.factory.create(blob);
        self.current = Some(url.clone());
        url
    }

    pub fn clear(&mut self) {
        if let Some(url) = self.current.take() {
            self.factory.revoke(&url);
        }
    }
}

impl Drop for ResourceHandle {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Arc<ObjectUrlRegistry> {
        Arc::new(ObjectUrlRegistry::default())
    }

    #[test]
    fn second_install_revokes_first() {
        let urls = registry();
        let mut handle = ResourceHandle::new(urls.clone());

        let first = handle.install(&Blob::wav(vec![1, 2, 3]));
        let second = handle.install(&Blob::wav(vec![4, 5, 6]));

        assert_ne!(first, second);
        assert_eq!(urls.live_count(), 1);
        assert_eq!(urls.revoked_count(), 1);
        assert!(!urls.is_live(&first));
        assert_eq!(urls.resolve(&second).unwrap().bytes, vec![4, 5, 6]);
        assert_eq!(handle.current(), Some(&second));
    }

    #[test]
    fn clear_is_idempotent() {
        let urls = registry();
        let mut handle = ResourceHandle::new(urls.clone());
        handle.clear();
        assert_eq!(urls.revoked_count(), 0);

        handle.install(&Blob::wav(vec![0]));
        handle.clear();
        handle.clear();
        assert!(!handle.is_live());
        assert_eq!(urls.revoked_count(), 1);
        assert_eq!(urls.live_count(), 0);
    }

    #[test]
    fn drop_releases_held_url() {
        let urls = registry();
        {
            let mut handle = ResourceHandle::new(urls.clone());
            handle.install(&Blob::wav(vec![9; 16]));
            assert_eq!(urls.live_count(), 1);
        }
        assert_eq!(urls.live_count(), 0);
        assert_eq!(urls.created_count(), 1);
        assert_eq!(urls.revoked_count(), 1);
    }

    #[test]
    fn urls_are_unique_per_create() {
        let urls = registry();
        let blob = Blob::wav(vec![7]);
        let a = urls.create(&blob);
        let b = urls.create(&blob);
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("blob:yukkuri/"));
        urls.revoke(&a);
        urls.revoke(&a);
        assert_eq!(urls.revoked_count(), 1);
    }
}
