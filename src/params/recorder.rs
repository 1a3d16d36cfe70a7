use super::form::ParameterForm;
use super::timer::{Clock, DebounceTimer};
use crate::store::{VoiceId, VoiceParameterSet, VoiceStore};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Coalesces bursts of form edits into a single write to the voice store.
///
/// Idle → `notify_change` → Pending → (deadline | `force_flush`) → flush → Idle.
pub struct DebouncedRecorder {
    timer: DebounceTimer,
    clock: Rc<dyn Clock>,
    store: VoiceStore,
}

impl DebouncedRecorder {
    pub fn new(store: VoiceStore, clock: Rc<dyn Clock>, delay: Duration) -> Self {
        Self {
            timer: DebounceTimer::new(delay),
            clock,
            store,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Restart the quiet period.
    pub fn notify_change(&mut self) {
        self.timer.arm(self.clock.now());
    }

    /// Run a pending flush immediately. No-op when idle.
    pub fn force_flush(&mut self, form: &ParameterForm, voice: VoiceId) -> bool {
        if !self.timer.cancel() {
            return false;
        }
        self.flush(form, voice);
        true
    }

    /// Write the form now whether or not anything is pending.
    pub fn flush_now(&mut self, form: &ParameterForm, voice: VoiceId) {
        self.timer.cancel();
        self.flush(form, voice);
    }

    /// Flush if the deadline has passed. Returns whether a write happened.
    pub fn poll(&mut self, form: &ParameterForm, voice: VoiceId) -> bool {
        if !self.timer.fire_if_due(self.clock.now()) {
            return false;
        }
        self.flush(form, voice);
        true
    }

    fn flush(&self, form: &ParameterForm, voice: VoiceId) {
        let set = capture(form);
        tracing::debug!("[Params] Flushing {} fields for voice {}", set.len(), voice);
        self.store.save(voice, &set);
    }
}

/// Every named field's current value.
pub fn capture(form: &ParameterForm) -> VoiceParameterSet {
    form.named_values().into_iter().collect()
}
