use super::interface::KeyValueStore;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;

const VOICE_KEY_PREFIX: &str = "voice";
const CURRENT_VOICE_KEY: &str = "currentVoice";
const SPEECH_TEXT_KEY: &str = "speechText";
const NATIVE_KEY: &str = "native";

/// Parameter name → textual form value for one voice.
pub type VoiceParameterSet = BTreeMap<String, String>;

// ── Voice Identifier ───────────────────────────────────

/// Small positive integer selecting a voice slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(NonZeroU32);

impl VoiceId {
    pub const DEFAULT: VoiceId = VoiceId(NonZeroU32::MIN);

    pub fn new(id: u32) -> Option<Self> {
        NonZeroU32::new(id).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Storage key holding this voice's parameter set.
    pub fn storage_key(self) -> String {
        format!("{}{}", VOICE_KEY_PREFIX, self.0)
    }
}

impl Default for VoiceId {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VoiceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n: u32 = s
            .trim()
            .parse()
            .map_err(|e| format!("invalid voice id '{}': {}", s, e))?;
        Self::new(n).ok_or_else(|| "voice id must be positive".to_string())
    }
}

// ── VoiceStore ─────────────────────────────────────────

/// Typed view over the durable store: one parameter set per voice plus
/// the standalone session keys.
///
/// Persistence is best-effort. Failed writes are logged and dropped,
/// unreadable data reads as absent.
#[derive(Clone)]
pub struct VoiceStore {
    backend: Arc<dyn KeyValueStore>,
}

impl VoiceStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn save(&self, voice: VoiceId, set: &VoiceParameterSet) {
        let json = match serde_json::to_string(set) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("[VoiceStore] Failed to serialize voice {}: {}", voice, e);
                return;
            }
        };
        match self.backend.set(&voice.storage_key(), &json) {
            Ok(()) => tracing::debug!(
                "[VoiceStore] Saved {} parameters for voice {}",
                set.len(),
                voice
            ),
            Err(e) => tracing::warn!("[VoiceStore] Failed to save voice {}: {}", voice, e),
        }
    }

    /// Load a voice's saved set. Missing, empty or corrupt data is `None`.
    pub fn load(&self, voice: VoiceId) -> Option<VoiceParameterSet> {
        let raw = self.backend.get(&voice.storage_key())?;
        if raw.is_empty() {
            return None;
        }
        match parse_parameter_set(&raw) {
            Some(set) => Some(set),
            None => {
                tracing::warn!(
                    "[VoiceStore] Ignoring unreadable data for voice {}",
                    voice
                );
                None
            }
        }
    }

    /// Last active voice; defaults to voice 1 when unset or unreadable.
    pub fn current_voice(&self) -> VoiceId {
        self.backend
            .get(CURRENT_VOICE_KEY)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }

    pub fn set_current_voice(&self, voice: VoiceId) {
        self.put(CURRENT_VOICE_KEY, &voice.to_string());
    }

    pub fn speech_text(&self) -> String {
        self.backend.get(SPEECH_TEXT_KEY).unwrap_or_default()
    }

    pub fn set_speech_text(&self, text: &str) {
        self.put(SPEECH_TEXT_KEY, text);
    }

    /// Whether the text is sent as-is instead of being converted server-side.
    pub fn native(&self) -> bool {
        self.backend
            .get(NATIVE_KEY)
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .map(|n| n != 0)
            .unwrap_or(false)
    }

    pub fn set_native(&self, native: bool) {
        self.put(NATIVE_KEY, if native { "1" } else { "0" });
    }

    fn put(&self, key: &str, value: &str) {
        if let Err(e) = self.backend.set(key, value) {
            tracing::warn!("[VoiceStore] Failed to write '{}': {}", key, e);
        }
    }
}

/// Accepts a JSON object whose values are scalars. Numbers and booleans
/// are kept in their textual form; nested values are skipped.
fn parse_parameter_set(raw: &str) -> Option<VoiceParameterSet> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let set = object
        .iter()
        .filter_map(|(name, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((name.clone(), text))
        })
        .collect();
    Some(set)
}
