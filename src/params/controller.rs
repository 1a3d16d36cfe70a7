use super::form::{FieldEvent, ParameterForm, Subscription};
use super::presets::PresetDefinition;
use super::recorder::DebouncedRecorder;
use super::timer::Clock;
use crate::store::{VoiceId, VoiceParameterSet, VoiceStore};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;

/// Keeps the parameter form and the per-voice saved sets in step.
pub struct ParameterController {
    form: ParameterForm,
    store: VoiceStore,
    recorder: DebouncedRecorder,
    current: VoiceId,
    subscription: Option<Subscription>,
}

impl ParameterController {
    pub fn new(
        form: ParameterForm,
        store: VoiceStore,
        clock: Rc<dyn Clock>,
        delay: Duration,
        current: VoiceId,
    ) -> Self {
        Self {
            form,
            recorder: DebouncedRecorder::new(store.clone(), clock, delay),
            store,
            current,
            subscription: None,
        }
    }

    pub fn form(&self) -> &ParameterForm {
        &self.form
    }

    /// Mutable access for delivering user edits (`input`/`change`).
    pub fn form_mut(&mut self) -> &mut ParameterForm {
        &mut self.form
    }

    pub fn current_voice(&self) -> VoiceId {
        self.current
    }

    pub fn is_observing(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn has_pending_write(&self) -> bool {
        self.recorder.is_pending()
    }

    /// When the pending write is due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.recorder.deadline()
    }

    /// Restore the current voice into the form and start observing edits.
    /// Field events are delivered to `events`; feed them back through
    /// [`on_field_event`](Self::on_field_event).
    pub fn start(&mut self, events: UnboundedSender<FieldEvent>) {
        if let Some(set) = self.store.load(self.current) {
            self.apply_values(&set);
        }
        self.subscription = Some(self.form.subscribe(events));
        tracing::info!("[Params] Observing form for voice {}", self.current);
    }

    pub fn stop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.dispose();
        }
    }

    pub fn on_field_event(&mut self, event: &FieldEvent) {
        self.form.sync_label(event.index);
        self.recorder.notify_change();
    }

    /// Save the outgoing voice if it has unsaved edits, then load `voice`.
    pub fn switch_voice(&mut self, voice: VoiceId) {
        self.recorder.force_flush(&self.form, self.current);
        self.current = voice;
        if let Some(set) = self.store.load(voice) {
            self.apply_values(&set);
        }
        tracing::info!("[Params] Switched to voice {}", voice);
    }

    /// Overwrite the named fields with the preset and save immediately.
    /// Callers are expected to have confirmed with the user.
    pub fn apply_preset(&mut self, preset: &PresetDefinition) {
        self.apply_values(&preset.to_set());
        self.recorder.flush_now(&self.form, self.current);
        tracing::info!(
            "[Params] Applied preset {} to voice {}",
            preset.name,
            self.current
        );
    }

    /// Run the debounced write if its quiet period has ended.
    pub fn poll(&mut self) -> bool {
        self.recorder.poll(&self.form, self.current)
    }

    /// Commit any pending write now (e.g. on shutdown).
    pub fn flush_pending(&mut self) -> bool {
        self.recorder.force_flush(&self.form, self.current)
    }

    /// Write matching fields; fields absent from `values` are untouched.
    fn apply_values(&mut self, values: &VoiceParameterSet) {
        for index in 0..self.form.fields().len() {
            let value = match self.form.fields()[index].name.as_ref() {
                Some(name) => values.get(name).cloned(),
                None => None,
            };
            if let Some(value) = value {
                if self.form.set_value(index, &value) {
                    self.form.sync_label(index);
                } else {
                    tracing::debug!(
                        "[Params] Ignoring out-of-range value '{}' for field #{}",
                        value,
                        index
                    );
                }
            }
        }
    }
}

impl Drop for ParameterController {
    fn drop(&mut self) {
        self.stop();
    }
}
