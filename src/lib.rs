pub mod app;
pub mod audio;
pub mod config;
pub mod console;
pub mod logging;
pub mod params;
pub mod store;
pub mod synth;

pub use app::{ConsoleApp, UiEvent};
pub use config::ConsoleConfig;

use crate::audio::{DownloadSink, ObjectUrlRegistry, PlaybackSink};
use crate::console::{DirectorySaveTrigger, QueuedConfirm, WavFileOutput};
use crate::params::SystemClock;
use crate::store::{FileStore, VoiceStore};
use crate::synth::HttpSynthesizer;
use anyhow::Context;
use std::rc::Rc;
use std::sync::Arc;
use tokio::sync::mpsc::unbounded_channel;

/// Build the console from config and drive it from stdin until `quit` or EOF.
pub async fn run(config: ConsoleConfig) -> anyhow::Result<()> {
    let store_path = config.resolve_store_path();
    let download_dir = config.resolve_download_dir();
    tracing::info!(
        "[App] Store at {}, downloads to {}, endpoint {}",
        store_path.display(),
        download_dir.display(),
        config.endpoint
    );

    let store = VoiceStore::new(Arc::new(FileStore::open(&store_path)));
    let urls = Arc::new(ObjectUrlRegistry::default());
    let playback_dir = std::env::temp_dir().join("yukkuri-console");
    std::fs::create_dir_all(&playback_dir)
        .with_context(|| format!("creating playback directory {}", playback_dir.display()))?;
    let confirm = QueuedConfirm::default();

    let mut app = ConsoleApp::new(
        store,
        Rc::new(SystemClock),
        config.debounce_delay(),
        PlaybackSink::new(
            Box::new(WavFileOutput::new(urls.clone(), &playback_dir)),
            urls.clone(),
        ),
        DownloadSink::with_default_filename(
            Box::new(DirectorySaveTrigger::new(urls.clone(), &download_dir)),
            urls.clone(),
            &config.default_filename,
        ),
        Arc::new(HttpSynthesizer::from_config(&config)),
        Box::new(confirm.clone()),
    );
    app.start();

    let (tx, rx) = unbounded_channel();
    std::thread::spawn(move || console::read_commands(std::io::stdin().lock(), &tx, &confirm));
    app.run(rx).await;
    Ok(())
}
