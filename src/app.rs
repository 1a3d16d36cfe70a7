//! The console application: routes UI events to the parameter controller,
//! submits synthesis requests, and hands results to the playback and
//! download sinks.

use crate::audio::{DownloadSink, PlaybackSink};
use crate::params::{find_preset, Clock, FieldEvent, ParameterController, ParameterForm};
use crate::store::{VoiceId, VoiceStore};
use crate::synth::{SynthesisError, SynthesisOutput, SynthesisRequest, Synthesizer};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Synchronous yes/no prompt used before destructive actions.
pub trait Confirm {
    fn confirm(&self, message: &str) -> bool;
}

// ── Events ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Input { name: String, value: String },
    Change { name: String, value: String },
    SelectVoice(VoiceId),
    SetText(String),
    SetNative(bool),
    Preset(String),
    Play,
    Download,
    Unload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Play,
    Download,
}

/// A finished synthesis request, tagged with the sequence number it was issued under.
#[derive(Debug)]
pub struct Completion {
    pub kind: RequestKind,
    pub seq: u64,
    pub result: Result<SynthesisOutput, SynthesisError>,
}

// ── ConsoleApp ─────────────────────────────────────────

pub struct ConsoleApp {
    controller: ParameterController,
    store: VoiceStore,
    player: PlaybackSink,
    downloader: DownloadSink,
    synthesizer: Arc<dyn Synthesizer>,
    confirm: Box<dyn Confirm>,
    text: String,
    native: bool,
    next_seq: u64,
    latest_play: Option<u64>,
    latest_download: Option<u64>,
    field_tx: UnboundedSender<FieldEvent>,
    field_rx: UnboundedReceiver<FieldEvent>,
    completion_tx: UnboundedSender<Completion>,
    completion_rx: UnboundedReceiver<Completion>,
}

impl ConsoleApp {
    /// The last active voice is read from `store` here; nothing else is
    /// restored until [`start`](Self::start).
    pub fn new(
        store: VoiceStore,
        clock: Rc<dyn Clock>,
        debounce: Duration,
        player: PlaybackSink,
        downloader: DownloadSink,
        synthesizer: Arc<dyn Synthesizer>,
        confirm: Box<dyn Confirm>,
    ) -> Self {
        let current = store.current_voice();
        let controller = ParameterController::new(
            ParameterForm::yukkuri(),
            store.clone(),
            clock,
            debounce,
            current,
        );
        let (field_tx, field_rx) = unbounded_channel();
        let (completion_tx, completion_rx) = unbounded_channel();

        Self {
            controller,
            store,
            player,
            downloader,
            synthesizer,
            confirm,
            text: String::new(),
            native: false,
            next_seq: 0,
            latest_play: None,
            latest_download: None,
            field_tx,
            field_rx,
            completion_tx,
            completion_rx,
        }
    }

    pub fn form(&self) -> &ParameterForm {
        self.controller.form()
    }

    pub fn current_voice(&self) -> VoiceId {
        self.controller.current_voice()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn native(&self) -> bool {
        self.native
    }

    pub fn has_pending_write(&self) -> bool {
        self.controller.has_pending_write()
    }

    /// Restore the session (voice, text, native flag) and start observing the form.
    pub fn start(&mut self) {
        self.text = self.store.speech_text();
        self.native = self.store.native();
        self.controller.start(self.field_tx.clone());
        tracing::info!(
            "[App] Started on voice {} (native={})",
            self.controller.current_voice(),
            self.native
        );
    }

    /// Apply one UI event. Returns `false` once the app has been unloaded.
    pub fn handle(&mut self, event: UiEvent) -> bool {
        match event {
            UiEvent::Input { name, value } => {
                if !self.controller.form_mut().input(&name, &value) {
                    tracing::debug!("[App] Input '{}' rejected by field '{}'", value, name);
                }
            }
            UiEvent::Change { name, value } => {
                if !self.controller.form_mut().change(&name, &value) {
                    tracing::debug!("[App] Change '{}' rejected by field '{}'", value, name);
                }
            }
            UiEvent::SelectVoice(voice) => self.select_voice(voice),
            UiEvent::SetText(text) => self.set_text(&text),
            UiEvent::SetNative(native) => self.set_native(native),
            UiEvent::Preset(name) => {
                self.apply_preset(&name);
            }
            UiEvent::Play => {
                self.begin_request(RequestKind::Play);
            }
            UiEvent::Download => {
                self.begin_request(RequestKind::Download);
            }
            UiEvent::Unload => {
                self.unload();
                return false;
            }
        }
        self.drain_field_events();
        true
    }

    pub fn select_voice(&mut self, voice: VoiceId) {
        self.drain_field_events();
        self.controller.switch_voice(voice);
        self.store.set_current_voice(voice);
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.store.set_speech_text(text);
    }

    pub fn set_native(&mut self, native: bool) {
        self.native = native;
        self.store.set_native(native);
    }

    /// Overwrite the current voice with a preset after user confirmation.
    /// Returns whether the preset was applied.
    pub fn apply_preset(&mut self, name: &str) -> bool {
        let Some(preset) = find_preset(name) else {
            tracing::debug!("[App] Unknown preset '{}'", name);
            return false;
        };
        let message = format!(
            "Overwrite voice {} with preset {}?",
            self.controller.current_voice(),
            preset.name
        );
        if !self.confirm.confirm(&message) {
            tracing::debug!("[App] Preset {} declined", preset.name);
            return false;
        }
        self.drain_field_events();
        self.controller.apply_preset(preset);
        true
    }

    /// Snapshot of the current form for submission.
    pub fn snapshot(&self) -> SynthesisRequest {
        SynthesisRequest {
            fields: self.controller.form().named_values(),
            text: self.text.clone(),
            native: self.native,
        }
    }

    /// Submit the form in the background. Only the newest request of each
    /// kind is allowed to reach its sink.
    pub fn begin_request(&mut self, kind: RequestKind) -> u64 {
        self.next_seq += 1;
        let seq = self.next_seq;
        match kind {
            RequestKind::Play => self.latest_play = Some(seq),
            RequestKind::Download => self.latest_download = Some(seq),
        }

        let request = self.snapshot();
        let synthesizer = self.synthesizer.clone();
        let completions = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = synthesizer.synthesize(request).await;
            let _ = completions.send(Completion { kind, seq, result });
        });
        tracing::debug!("[App] Issued {:?} request #{}", kind, seq);
        seq
    }

    /// Hand a finished request to its sink unless a newer one superseded it.
    pub fn on_completion(&mut self, completion: Completion) {
        let latest = match completion.kind {
            RequestKind::Play => self.latest_play,
            RequestKind::Download => self.latest_download,
        };
        if latest != Some(completion.seq) {
            tracing::debug!(
                "[App] Discarding superseded {:?} result #{}",
                completion.kind,
                completion.seq
            );
            return;
        }

        let output = match completion.result {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("[App] No audio produced: {}", e);
                return;
            }
        };
        match completion.kind {
            RequestKind::Play => self.player.play(&output.audio),
            RequestKind::Download => {
                self.downloader.download(&output.headers, &output.audio);
            }
        }
    }

    /// Wait for the next request to finish and apply it.
    /// Returns `false` if no completion can arrive.
    pub async fn next_completion(&mut self) -> bool {
        match self.completion_rx.recv().await {
            Some(completion) => {
                self.on_completion(completion);
                true
            }
            None => false,
        }
    }

    /// Run the debounced write if it is due.
    pub fn tick(&mut self) -> bool {
        self.drain_field_events();
        self.controller.poll()
    }

    /// Commit pending edits and release playback resources.
    pub fn unload(&mut self) {
        self.drain_field_events();
        if self.controller.flush_pending() {
            tracing::info!("[App] Saved pending edits on unload");
        }
        self.controller.stop();
        self.player.stop();
    }

    /// Event loop. Ends on `UiEvent::Unload` or when the sender side closes.
    pub async fn run(&mut self, mut events: UnboundedReceiver<UiEvent>) {
        loop {
            let deadline = self.controller.deadline();
            let wake_at = deadline
                .map(tokio::time::Instant::from_std)
                .unwrap_or_else(|| tokio::time::Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                biased;
                Some(event) = self.field_rx.recv() => {
                    self.controller.on_field_event(&event);
                }
                Some(completion) = self.completion_rx.recv() => {
                    self.on_completion(completion);
                }
                event = events.recv() => match event {
                    Some(event) => {
                        if !self.handle(event) {
                            break;
                        }
                    }
                    None => {
                        self.unload();
                        break;
                    }
                },
                _ = tokio::time::sleep_until(wake_at), if deadline.is_some() => {
                    self.controller.poll();
                }
            }
        }
        tracing::info!("[App] Event loop finished");
    }

    fn drain_field_events(&mut self) {
        while let Ok(event) = self.field_rx.try_recv() {
            self.controller.on_field_event(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{Blob, ObjectUrl, ObjectUrlRegistry, SaveTrigger};
    use crate::params::recorder::tests::CountingStore;
    use crate::params::SystemClock;
    use crate::audio::playback::tests::{Op, RecordingOutput};
    use crate::console::{read_commands, QueuedConfirm};
    use async_trait::async_trait;
    use reqwest::header::{HeaderMap, HeaderValue, CONTENT_DISPOSITION};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const DELAY: Duration = Duration::from_millis(300);

    /// Returns a WAV-ish payload whose bytes encode the call number.
    /// `fail_first` makes the first call fail with HTTP 500.
    struct FakeSynth {
        calls: AtomicUsize,
        requests: Mutex<Vec<SynthesisRequest>>,
        fail_first: bool,
        delays_ms: Vec<u64>,
    }

    impl FakeSynth {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
                fail_first: false,
                delays_ms: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl Synthesizer for FakeSynth {
        async fn synthesize(
            &self,
            request: SynthesisRequest,
        ) -> Result<SynthesisOutput, SynthesisError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request);
            if let Some(ms) = self.delays_ms.get(n) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            if self.fail_first && n == 0 {
                return Err(SynthesisError::Status(500));
            }
            let mut headers = HeaderMap::new();
            headers.insert(
                CONTENT_DISPOSITION,
                HeaderValue::from_str(&format!("attachment; filename=\"take-{}.wav\"", n))
                    .unwrap(),
            );
            Ok(SynthesisOutput {
                headers,
                audio: Blob::wav(vec![n as u8; 4]),
            })
        }
    }

    struct Answer(bool);

    impl Confirm for Answer {
        fn confirm(&self, _message: &str) -> bool {
            self.0
        }
    }

    #[derive(Clone, Default)]
    struct Saves(Arc<Mutex<Vec<String>>>);

    impl SaveTrigger for Saves {
        fn save(&mut self, _url: &ObjectUrl, filename: &str) {
            self.0.lock().unwrap().push(filename.to_string());
        }
    }

    struct Fixture {
        app: ConsoleApp,
        backend: Arc<CountingStore>,
        store: VoiceStore,
        urls: Arc<ObjectUrlRegistry>,
        output: RecordingOutput,
        saves: Saves,
    }

    fn fixture(synth: FakeSynth, confirm: bool) -> Fixture {
        let backend = Arc::new(CountingStore::default());
        let store = VoiceStore::new(backend.clone());
        fixture_with(backend, store, synth, Box::new(Answer(confirm)))
    }

    fn fixture_with(
        backend: Arc<CountingStore>,
        store: VoiceStore,
        synth: FakeSynth,
        confirm: Box<dyn Confirm>,
    ) -> Fixture {
        let urls = Arc::new(ObjectUrlRegistry::default());
        let output = RecordingOutput::new(urls.clone());
        let saves = Saves::default();
        let app = ConsoleApp::new(
            store.clone(),
            Rc::new(SystemClock),
            DELAY,
            PlaybackSink::new(Box::new(output.clone()), urls.clone()),
            DownloadSink::new(Box::new(saves.clone()), urls.clone()),
            Arc::new(synth),
            confirm,
        );
        Fixture {
            app,
            backend,
            store,
            urls,
            output,
            saves,
        }
    }

    fn input(name: &str, value: &str) -> UiEvent {
        UiEvent::Input {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    fn voice(n: u32) -> VoiceId {
        VoiceId::new(n).unwrap()
    }

    #[tokio::test]
    async fn start_restores_session() {
        let backend = Arc::new(CountingStore::default());
        let store = VoiceStore::new(backend.clone());
        store.set_current_voice(voice(3));
        store.set_speech_text("ゆっくりしていってね");
        store.set_native(true);
        store.save(voice(3), &[("spd".to_string(), "150".to_string())].into());

        let mut f = fixture_with(backend, store, FakeSynth::new(), Box::new(Answer(true)));
        f.app.start();

        assert_eq!(f.app.current_voice(), voice(3));
        assert_eq!(f.app.text(), "ゆっくりしていってね");
        assert!(f.app.native());
        assert_eq!(f.app.form().value("spd"), Some("150"));
    }

    #[tokio::test]
    async fn voice_switch_persists_previous_and_current_id() {
        let mut f = fixture(FakeSynth::new(), true);
        f.app.start();
        f.app.handle(input("pit", "66"));
        f.app.handle(UiEvent::SelectVoice(voice(2)));

        assert_eq!(f.store.load(voice(1)).unwrap()["pit"], "66");
        assert_eq!(f.store.current_voice(), voice(2));
        assert!(!f.app.has_pending_write());
    }

    #[tokio::test]
    async fn declined_preset_changes_nothing() {
        let mut f = fixture(FakeSynth::new(), false);
        f.app.start();
        let before = f.app.form().named_values();

        assert!(!f.app.apply_preset("R2"));
        assert_eq!(f.app.form().named_values(), before);
        assert_eq!(f.backend.writes(), 0);
    }

    #[tokio::test]
    async fn confirmed_preset_is_saved_immediately() {
        let mut f = fixture(FakeSynth::new(), true);
        f.app.start();
        f.app.handle(UiEvent::Preset("F2".to_string()));

        assert_eq!(f.app.form().value("pit"), Some("77"));
        assert_eq!(f.app.form().value("type"), Some("0"));
        assert_eq!(f.store.load(voice(1)).unwrap()["acc"], "150");
        assert!(!f.app.apply_preset("nope"));
    }

    #[tokio::test]
    async fn console_answers_reach_the_preset_they_were_given_for() {
        let backend = Arc::new(CountingStore::default());
        let store = VoiceStore::new(backend.clone());
        let confirm = QueuedConfirm::default();
        let mut f = fixture_with(backend, store, FakeSynth::new(), Box::new(confirm.clone()));
        f.app.start();

        let (tx, mut rx) = unbounded_channel();
        let input = std::io::Cursor::new("preset X9\ny\npreset R1\nn\n");
        read_commands(input, &tx, &confirm);
        while let Ok(event) = rx.try_recv() {
            f.app.handle(event);
        }

        assert_eq!(f.app.form().value("pit"), Some("100"));
        assert_eq!(f.backend.writes(), 0);
    }

    #[tokio::test]
    async fn text_and_native_are_persisted() {
        let mut f = fixture(FakeSynth::new(), true);
        f.app.start();
        f.app.handle(UiEvent::SetText("テスト".to_string()));
        f.app.handle(UiEvent::SetNative(true));

        assert_eq!(f.store.speech_text(), "テスト");
        assert!(f.store.native());
    }

    #[tokio::test]
    async fn play_submits_snapshot_and_plays_result() {
        let mut f = fixture(FakeSynth::new(), true);
        f.app.start();
        f.app.handle(input("spd", "130"));
        f.app.handle(UiEvent::SetText("abc".to_string()));
        f.app.handle(UiEvent::Play);
        assert!(f.app.next_completion().await);

        let url = f.output.ops().into_iter().find_map(|op| match op {
            Op::Source(Some(url)) => Some(url),
            _ => None,
        });
        let url = url.expect("audio source should be bound");
        assert_eq!(f.output.ops().last(), Some(&Op::Play));
        assert_eq!(f.urls.live_count(), 1);
        assert!(url.starts_with("blob:"));
    }

    #[tokio::test]
    async fn snapshot_carries_fields_text_and_native() {
        let mut f = fixture(FakeSynth::new(), true);
        f.app.start();
        f.app.handle(input("spd", "130"));
        f.app.handle(UiEvent::SetText("abc".to_string()));
        f.app.handle(UiEvent::SetNative(true));

        let request = f.app.snapshot();
        assert_eq!(request.text, "abc");
        assert!(request.native);
        assert_eq!(request.fields.len(), 8);
        assert!(request
            .fields
            .contains(&("spd".to_string(), "130".to_string())));
    }

    #[tokio::test]
    async fn failed_request_triggers_nothing() {
        let mut synth = FakeSynth::new();
        synth.fail_first = true;
        let mut f = fixture(synth, true);
        f.app.start();
        f.app.handle(UiEvent::Download);
        assert!(f.app.next_completion().await);

        assert!(f.saves.0.lock().unwrap().is_empty());
        assert_eq!(f.urls.created_count(), 0);
    }

    #[tokio::test]
    async fn download_uses_response_filename() {
        let mut f = fixture(FakeSynth::new(), true);
        f.app.start();
        f.app.handle(UiEvent::Download);
        assert!(f.app.next_completion().await);

        assert_eq!(*f.saves.0.lock().unwrap(), vec!["take-0.wav".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_play_result_is_discarded() {
        let mut synth = FakeSynth::new();
        // First request resolves after the second one
        synth.delays_ms = vec![500, 10];
        let mut f = fixture(synth, true);
        f.app.start();
        f.app.handle(UiEvent::Play);
        f.app.handle(UiEvent::Play);

        assert!(f.app.next_completion().await);
        assert!(f.app.next_completion().await);

        // Only the second payload was ever installed
        assert_eq!(f.urls.created_count(), 1);
        let plays = f.output.ops().iter().filter(|op| **op == Op::Play).count();
        assert_eq!(plays, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_download_result_is_discarded() {
        let mut synth = FakeSynth::new();
        synth.delays_ms = vec![500, 10];
        let mut f = fixture(synth, true);
        f.app.start();
        f.app.handle(UiEvent::Download);
        f.app.handle(UiEvent::Download);

        assert!(f.app.next_completion().await);
        assert!(f.app.next_completion().await);

        assert_eq!(*f.saves.0.lock().unwrap(), vec!["take-1.wav".to_string()]);
        assert_eq!(f.urls.created_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_debounces_and_stops_on_close() {
        let mut f = fixture(FakeSynth::new(), true);
        f.app.start();

        let (tx, rx) = unbounded_channel();
        tx.send(input("vol", "10")).unwrap();
        tx.send(input("vol", "20")).unwrap();
        tx.send(input("vol", "30")).unwrap();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            drop(tx);
        });
        f.app.run(rx).await;

        assert_eq!(f.backend.writes(), 1);
        assert_eq!(f.store.load(voice(1)).unwrap()["vol"], "30");
        assert_eq!(f.app.form().label("vol"), Some("(30)"));
    }

    #[tokio::test(start_paused = true)]
    async fn unload_flushes_pending_edit() {
        let mut f = fixture(FakeSynth::new(), true);
        f.app.start();

        let (tx, rx) = unbounded_channel();
        tx.send(input("lmd", "42")).unwrap();
        tx.send(UiEvent::Unload).unwrap();
        f.app.run(rx).await;

        assert_eq!(f.backend.writes(), 1);
        assert_eq!(f.store.load(voice(1)).unwrap()["lmd"], "42");
        assert_eq!(f.app.form().listener_count(), 0);
    }
}
