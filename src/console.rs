//! Headless adapters used by the `yukkuri-console` binary: line commands,
//! a file-backed stand-in for the audio element, a directory save target
//! and a queued confirmation prompt.

use crate::app::{Confirm, UiEvent};
use crate::audio::{AudioOutput, ObjectUrl, ObjectUrlRegistry, SaveTrigger};
use crate::params::find_preset;
use crate::store::VoiceId;
use std::collections::VecDeque;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;

// ── Commands ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Event(UiEvent),
    Help,
    Invalid(String),
}

pub const HELP: &str = "\
commands:
  set <name> <value>   change a parameter (spd, pit, ...)
  voice <id>           switch voice slot
  text <words...>      set the text to speak
  native on|off        send text as phonetic input
  preset <name>        overwrite the voice with a preset (F1 F2 F3 M1 M2 R1 R2)
  play                 synthesize and play
  download             synthesize and save
  quit                 save and exit";

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    match verb {
        "set" => match rest.split_once(char::is_whitespace) {
            Some((name, value)) => Command::Event(UiEvent::Change {
                name: name.to_string(),
                value: value.trim().to_string(),
            }),
            None => Command::Invalid("usage: set <name> <value>".to_string()),
        },
        "voice" => match rest.parse::<VoiceId>() {
            Ok(voice) => Command::Event(UiEvent::SelectVoice(voice)),
            Err(e) => Command::Invalid(e),
        },
        "text" => Command::Event(UiEvent::SetText(rest.to_string())),
        "native" => match rest {
            "on" | "1" | "true" => Command::Event(UiEvent::SetNative(true)),
            "off" | "0" | "false" => Command::Event(UiEvent::SetNative(false)),
            _ => Command::Invalid("usage: native on|off".to_string()),
        },
        "preset" => match find_preset(rest) {
            Some(preset) => Command::Event(UiEvent::Preset(preset.name.to_string())),
            None => Command::Invalid(format!("unknown preset '{}'", rest)),
        },
        "play" => Command::Event(UiEvent::Play),
        "download" => Command::Event(UiEvent::Download),
        "quit" | "exit" => Command::Event(UiEvent::Unload),
        "help" | "" => Command::Help,
        other => Command::Invalid(format!("unknown command '{}'", other)),
    }
}

/// Blocking line reader feeding the app. Preset confirmations are asked
/// here, before the event is sent, and queued for the app to consume; a
/// preset event is only sent for a known preset, so every queued answer
/// is consumed by exactly one confirmation.
pub fn read_commands<R: BufRead>(
    input: R,
    events: &UnboundedSender<UiEvent>,
    confirm: &QueuedConfirm,
) {
    println!("{}", HELP);
    let mut lines = input.lines();

    while let Some(Ok(line)) = lines.next() {
        let event = match parse_command(&line) {
            Command::Event(event) => event,
            Command::Help => {
                println!("{}", HELP);
                continue;
            }
            Command::Invalid(reason) => {
                eprintln!("{}", reason);
                continue;
            }
        };

        if let UiEvent::Preset(ref name) = event {
            println!("Overwrite the current voice with preset {}? [y/N]", name);
            let reply = match lines.next() {
                Some(Ok(reply)) => reply,
                _ => String::new(),
            };
            confirm.push(is_yes(&reply));
        }

        let quit = event == UiEvent::Unload;
        if events.send(event).is_err() || quit {
            return;
        }
    }
}

// ── Confirmation ───────────────────────────────────────

/// Answers collected ahead of time by the input thread, consumed in order.
/// An empty queue answers "no".
#[derive(Clone, Default)]
pub struct QueuedConfirm {
    answers: Arc<Mutex<VecDeque<bool>>>,
}

impl QueuedConfirm {
    pub fn push(&self, answer: bool) {
        if let Ok(mut answers) = self.answers.lock() {
            answers.push_back(answer);
        }
    }
}

impl Confirm for QueuedConfirm {
    fn confirm(&self, message: &str) -> bool {
        let answer = self
            .answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front())
            .unwrap_or(false);
        tracing::info!("[Console] {} -> {}", message, if answer { "yes" } else { "no" });
        answer
    }
}

/// Parse a y/N reply.
pub fn is_yes(reply: &str) -> bool {
    matches!(reply.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

// ── Audio Output ───────────────────────────────────────

/// Stands in for the audio element: "playing" writes the bound payload to
/// `<dir>/playback.wav` and reports its format.
pub struct WavFileOutput {
    urls: Arc<ObjectUrlRegistry>,
    dir: PathBuf,
    source: Option<ObjectUrl>,
}

impl WavFileOutput {
    pub fn new(urls: Arc<ObjectUrlRegistry>, dir: &Path) -> Self {
        Self {
            urls,
            dir: dir.to_path_buf(),
            source: None,
        }
    }

    pub fn playback_path(&self) -> PathBuf {
        self.dir.join("playback.wav")
    }
}

impl AudioOutput for WavFileOutput {
    fn pause(&mut self) {
        tracing::debug!("[Playback] Paused");
    }

    fn set_source(&mut self, source: Option<&ObjectUrl>) {
        self.source = source.cloned();
    }

    fn play(&mut self) {
        let Some(blob) = self.source.as_ref().and_then(|url| self.urls.resolve(url)) else {
            tracing::warn!("[Playback] Nothing to play");
            return;
        };
        let path = self.playback_path();
        if let Err(e) = std::fs::create_dir_all(&self.dir).and_then(|_| std::fs::write(&path, &blob.bytes)) {
            tracing::warn!("[Playback] Failed to write {}: {}", path.display(), e);
            return;
        }
        match describe_wav(&path) {
            Ok(summary) => tracing::info!("[Playback] {} -> {}", summary, path.display()),
            Err(e) => tracing::warn!("[Playback] Not a readable WAV ({}): {}", path.display(), e),
        }
    }
}

/// "<channels>ch <rate>Hz <seconds>s" for a WAV file.
pub fn describe_wav(path: &Path) -> Result<String, hound::Error> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let seconds = reader.duration() as f64 / spec.sample_rate.max(1) as f64;
    Ok(format!(
        "{}ch {}Hz {:.2}s",
        spec.channels, spec.sample_rate, seconds
    ))
}

// ── Save Target ────────────────────────────────────────

/// Saves downloads into a directory, never outside it.
pub struct DirectorySaveTrigger {
    urls: Arc<ObjectUrlRegistry>,
    dir: PathBuf,
}

impl DirectorySaveTrigger {
    pub fn new(urls: Arc<ObjectUrlRegistry>, dir: &Path) -> Self {
        Self {
            urls,
            dir: dir.to_path_buf(),
        }
    }
}

impl SaveTrigger for DirectorySaveTrigger {
    fn save(&mut self, url: &ObjectUrl, filename: &str) {
        let Some(blob) = self.urls.resolve(url) else {
            tracing::warn!("[Download] {} is no longer live", url);
            return;
        };
        let path = self.dir.join(safe_filename(filename));
        match std::fs::create_dir_all(&self.dir).and_then(|_| std::fs::write(&path, &blob.bytes)) {
            Ok(()) => tracing::info!("[Download] Saved {}", path.display()),
            Err(e) => tracing::warn!("[Download] Failed to save {}: {}", path.display(), e),
        }
    }
}

/// Strip path separators and parent references from a suggested filename.
pub fn safe_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').trim();
    if cleaned.is_empty() {
        crate::audio::DEFAULT_FILENAME.to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{Blob, ObjectUrlFactory};
    use tempfile::TempDir;

    fn write_test_wav(path: &Path, samples: usize) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..samples {
            writer.write_sample((i % 100) as i16).unwrap();
        }
        writer.finalize().unwrap();
        std::fs::read(path).unwrap()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            parse_command("set spd 120"),
            Command::Event(UiEvent::Change {
                name: "spd".to_string(),
                value: "120".to_string()
            })
        );
        assert_eq!(
            parse_command("voice 2"),
            Command::Event(UiEvent::SelectVoice(VoiceId::new(2).unwrap()))
        );
        assert_eq!(
            parse_command("text ゆっくり してね"),
            Command::Event(UiEvent::SetText("ゆっくり してね".to_string()))
        );
        assert_eq!(parse_command("native on"), Command::Event(UiEvent::SetNative(true)));
        assert_eq!(
            parse_command("preset F3"),
            Command::Event(UiEvent::Preset("F3".to_string()))
        );
        assert_eq!(parse_command("  play "), Command::Event(UiEvent::Play));
        assert_eq!(parse_command("quit"), Command::Event(UiEvent::Unload));
        assert_eq!(parse_command(""), Command::Help);
    }

    #[test]
    fn rejects_bad_commands() {
        assert!(matches!(parse_command("voice 0"), Command::Invalid(_)));
        assert!(matches!(parse_command("voice x"), Command::Invalid(_)));
        assert!(matches!(parse_command("set spd"), Command::Invalid(_)));
        assert!(matches!(parse_command("native maybe"), Command::Invalid(_)));
        assert!(matches!(parse_command("preset"), Command::Invalid(_)));
        assert!(matches!(parse_command("preset X9"), Command::Invalid(_)));
        assert!(matches!(parse_command("preset f1"), Command::Invalid(_)));
        assert!(matches!(parse_command("dance"), Command::Invalid(_)));
    }

    #[test]
    fn reader_queues_one_answer_per_known_preset() {
        let input = std::io::Cursor::new("preset X9\ny\npreset R1\nn\npreset F2\ny\nquit\n");
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let confirm = QueuedConfirm::default();
        read_commands(input, &tx, &confirm);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                UiEvent::Preset("R1".to_string()),
                UiEvent::Preset("F2".to_string()),
                UiEvent::Unload
            ]
        );
        assert!(!confirm.confirm("R1?"));
        assert!(confirm.confirm("F2?"));
        assert!(!confirm.confirm("nothing queued"));
    }

    #[test]
    fn queued_confirm_defaults_to_no() {
        let confirm = QueuedConfirm::default();
        confirm.push(true);
        assert!(confirm.confirm("first?"));
        assert!(!confirm.confirm("second?"));
        assert!(is_yes(" Y "));
        assert!(!is_yes(""));
    }

    #[test]
    fn safe_filename_stays_in_directory() {
        assert_eq!(safe_filename("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(safe_filename("a b.wav"), "a b.wav");
        assert_eq!(safe_filename(".."), "yukkuri.wav");
    }

    #[test]
    fn save_trigger_writes_payload() {
        let tmp = TempDir::new().unwrap();
        let urls = Arc::new(ObjectUrlRegistry::default());
        let url = urls.create(&Blob::wav(vec![1, 2, 3]));
        let mut trigger = DirectorySaveTrigger::new(urls, tmp.path());

        trigger.save(&url, "あ.wav");
        assert_eq!(std::fs::read(tmp.path().join("あ.wav")).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn wav_output_writes_and_describes() {
        let tmp = TempDir::new().unwrap();
        let bytes = write_test_wav(&tmp.path().join("source.wav"), 8000);
        let urls = Arc::new(ObjectUrlRegistry::default());
        let url = urls.create(&Blob::wav(bytes.clone()));

        let mut output = WavFileOutput::new(urls, &tmp.path().join("out"));
        output.set_source(Some(&url));
        output.play();

        let path = output.playback_path();
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
        assert_eq!(describe_wav(&path).unwrap(), "1ch 8000Hz 1.00s");
    }
}
