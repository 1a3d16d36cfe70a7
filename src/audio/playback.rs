use super::handle::{Blob, ObjectUrl, ObjectUrlFactory, ResourceHandle};
use std::sync::Arc;

/// A reusable audio element.
pub trait AudioOutput {
    fn pause(&mut self);

    /// Point the element at `source`, or detach it with `None`.
    fn set_source(&mut self, source: Option<&ObjectUrl>);

    fn play(&mut self);
}

/// Plays synthesized audio through one element. A new `play` always
/// supersedes whatever was playing; nothing is queued.
pub struct PlaybackSink {
    audio: Box<dyn AudioOutput>,
    handle: ResourceHandle,
}

impl PlaybackSink {
    pub fn new(audio: Box<dyn AudioOutput>, urls: Arc<dyn ObjectUrlFactory>) -> Self {
        Self {
            audio,
            handle: ResourceHandle::new(urls),
        }
    }

    pub fn current(&self) -> Option<&ObjectUrl> {
        self.handle.current()
    }

    pub fn play(&mut self, blob: &Blob) {
        // Detach before the old URL is revoked by `install`
        if self.handle.is_live() {
            self.audio.pause();
            self.audio.set_source(None);
        }
        let url = self.handle.install(blob);
        self.audio.set_source(Some(&url));
        self.audio.play();
        tracing::info!("[Playback] Playing {} bytes ({})", blob.len(), blob.mime);
    }

    /// Stop playback and release the held URL.
    pub fn stop(&mut self) {
        if self.handle.is_live() {
            self.audio.pause();
            self.audio.set_source(None);
            self.handle.clear();
        }
    }
}
