use super::handle::{Blob, ObjectUrl, ObjectUrlFactory, ResourceHandle};
use percent_encoding::percent_decode_str;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION};
use std::sync::Arc;

pub const DEFAULT_FILENAME: &str = "yukkuri.wav";

/// Performs the save-as interaction for a URL (the synthetic anchor click).
pub trait SaveTrigger {
    fn save(&mut self, url: &ObjectUrl, filename: &str);
}

/// Offers synthesized audio as a file download.
pub struct DownloadSink {
    trigger: Box<dyn SaveTrigger>,
    handle: ResourceHandle,
    default_filename: String,
}

impl DownloadSink {
    pub fn new(trigger: Box<dyn SaveTrigger>, urls: Arc<dyn ObjectUrlFactory>) -> Self {
        Self::with_default_filename(trigger, urls, DEFAULT_FILENAME)
    }

    pub fn with_default_filename(
        trigger: Box<dyn SaveTrigger>,
        urls: Arc<dyn ObjectUrlFactory>,
        default_filename: &str,
    ) -> Self {
        Self {
            trigger,
            handle: ResourceHandle::new(urls),
            default_filename: default_filename.to_string(),
        }
    }

    pub fn current(&self) -> Option<&ObjectUrl> {
        self.handle.current()
    }

    /// Returns the filename the payload was offered under.
    pub fn download(&mut self, headers: &HeaderMap, blob: &Blob) -> String {
        let disposition = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok());
        let filename = derive_filename(disposition, &self.default_filename);

        // The URL stays live until the next download replaces it
        let url = self.handle.install(blob);
        self.trigger.save(&url, &filename);
        tracing::info!("[Download] Offered {} ({} bytes)", filename, blob.len());
        filename
    }
}

/// Filename from a `Content-Disposition` value, or `default` when the
/// header is absent or carries no usable `filename=`.
pub fn derive_filename(disposition: Option<&str>, default: &str) -> String {
    disposition
        .and_then(filename_from_disposition)
        .unwrap_or_else(|| default.to_string())
}

/// Scan `;`-separated items for `filename=`. The value may be single- or
/// double-quoted and percent-encoded. The last well-formed one wins.
pub fn filename_from_disposition(value: &str) -> Option<String> {
    let mut found = None;
    for item in split_items(value) {
        let item = item.trim_start();
        let Some(rest) = strip_prefix_ignore_case(item, "filename=") else {
            continue;
        };
        let Some(raw) = unquote(rest) else {
            tracing::debug!("[Download] Unterminated filename in '{}'", value);
            continue;
        };
        if let Some(name) = percent_decode_strict(raw).filter(|n| !n.is_empty()) {
            found = Some(name);
        }
    }
    found
}

/// Split on `;`, except inside a value quoted right after `=`.
/// An unterminated quote swallows the rest of the header.
fn split_items(value: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut start = 0;
    let mut quote = None;
    let mut last = None;
    for (i, c) in value.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                ';' => {
                    items.push(&value[start..i]);
                    start = i + 1;
                }
                '"' | '\'' if last == Some('=') => quote = Some(c),
                _ => {}
            },
        }
        if !c.is_whitespace() {
            last = Some(c);
        }
    }
    items.push(&value[start..]);
    items
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &s[prefix.len()..])
}

/// Quoted values run to the matching quote; bare values stop at
/// whitespace or a quote.
fn unquote(rest: &str) -> Option<&str> {
    match rest.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            let inner = &rest[1..];
            inner.find(quote).map(|end| &inner[..end])
        }
        _ => rest
            .split(|c: char| c.is_whitespace() || c == '"' || c == '\'')
            .next(),
    }
}

/// Percent-decode, rejecting stray `%` escapes and invalid UTF-8.
fn percent_decode_strict(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3)?;
            if !escape.iter().all(u8::is_ascii_hexdigit) {
                return None;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    percent_decode_str(raw)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}
