//! Trailing metadata and the attachment mapping derived from it.
//!
//! Trailers arrive as ordered key/value text pairs. Keys are ASCII
//! case-insensitive; values under keys ending in `-bin` carry binary payloads
//! as base64 text. Two keys are reserved by the protocol for exception
//! transport and are consumed by the exception reconstructor.

use base64::{
    Engine,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use bytes::Bytes;

use crate::error::TripleError;

/// Trailer key holding a binary typed exception envelope.
pub const EXCEPTION_TW_BIN: &str = "tri-exception-tw-bin";

/// Trailer key holding a binary structured status-detail record.
pub const STATUS_DETAIL_KEY: &str = "grpc-status-details-bin";

/// Suffix marking a key whose value is base64-encoded binary data.
pub const BINARY_SUFFIX: &str = "-bin";

/// Transport and protocol headers that never become application attachments.
const EXCLUDED_ATTACHMENTS: &[&str] = &[
    "content-type",
    "te",
    "user-agent",
    "grpc-status",
    "grpc-message",
    "grpc-encoding",
    "grpc-accept-encoding",
    "grpc-timeout",
    "tri-service-version",
    "tri-service-group",
    EXCEPTION_TW_BIN,
    STATUS_DETAIL_KEY,
];

/// Base64 engine for `-bin` values: unpadded on encode, padding optional on decode.
pub(crate) const BINARY_HEADER: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode the ASCII-safe representation of a binary metadata value.
///
/// # Errors
/// Returns error if `raw` is not valid base64
#[inline]
pub fn decode_binary(raw: &str) -> Result<Vec<u8>, TripleError> {
    Ok(BINARY_HEADER.decode(raw.trim())?)
}

/// Encode binary data into its ASCII-safe metadata representation.
#[must_use]
#[inline]
pub fn encode_binary(data: &[u8]) -> String {
    BINARY_HEADER.encode(data)
}

/// Whether `key` is a transport header rather than application data.
fn is_excluded(key: &str) -> bool {
    key.starts_with(':') || EXCLUDED_ATTACHMENTS.contains(&key)
}

/// Ordered trailing metadata for a single call.
///
/// Keys are stored lower-cased. Duplicate keys are kept in arrival order and
/// lookups return the last one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Key-value pairs in arrival order
    pairs: Vec<(String, String)>,
}

impl Metadata {
    /// Create a new empty metadata
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Rebuild from key-value pairs received off the wire
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut meta = Self::new();
        for (k, v) in pairs {
            meta.insert(k, v);
        }
        meta
    }

    /// Append a text key-value pair
    #[inline]
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let mut key = key.into();
        key.make_ascii_lowercase();
        self.pairs.push((key, value.into()));
    }

    /// Append a binary value, base64-encoding it and adding the `-bin`
    /// suffix to the key if it is missing
    pub fn insert_bin(&mut self, key: impl Into<String>, value: &[u8]) {
        let mut key = key.into();
        key.make_ascii_lowercase();
        if !key.ends_with(BINARY_SUFFIX) {
            key.push_str(BINARY_SUFFIX);
        }
        self.pairs.push((key, encode_binary(value)));
    }

    /// Check whether `key` is present
    #[must_use]
    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k.eq_ignore_ascii_case(key))
    }

    /// Get value by key (last-wins semantics for duplicate keys)
    #[must_use]
    #[inline]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rfind(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Get a binary value by key, decoding its base64 representation
    pub fn get_bin(&self, key: &str) -> Option<Result<Vec<u8>, TripleError>> {
        self.get(key).map(decode_binary)
    }

    /// Remove every entry for `key` and return the last value.
    ///
    /// This is the consuming read used for reserved keys: once taken, the key
    /// is absent for every later lookup on this instance.
    pub fn take(&mut self, key: &str) -> Option<String> {
        let mut taken = None;
        self.pairs.retain_mut(|(k, v)| {
            if k.eq_ignore_ascii_case(key) {
                taken = Some(std::mem::take(v));
                false
            } else {
                true
            }
        });
        taken
    }

    /// Take a binary value, decoding its base64 representation
    pub fn take_bin(&mut self, key: &str) -> Option<Result<Vec<u8>, TripleError>> {
        self.take(key).map(|raw| decode_binary(&raw))
    }

    /// Remove every entry for `key`, returning whether anything was removed
    #[inline]
    pub fn remove(&mut self, key: &str) -> bool {
        self.take(key).is_some()
    }

    /// Check if metadata is empty
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Get the number of entries
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Iterate over all key-value pairs in arrival order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Convert the remaining entries into the attachment mapping handed to
    /// the application.
    ///
    /// Transport headers and reserved exception keys are skipped. `-bin`
    /// values are decoded; a value that is not valid base64 passes through as
    /// text. Unknown keys pass through verbatim.
    #[must_use]
    pub fn to_attachments(&self) -> Attachments {
        let mut attachments = Attachments::new();
        for (key, value) in self.iter().filter(|(k, _)| !is_excluded(k)) {
            let attachment = if key.ends_with(BINARY_SUFFIX) {
                match decode_binary(value) {
                    Ok(bytes) => AttachmentValue::Binary(Bytes::from(bytes)),
                    Err(e) => {
                        tracing::debug!(%key, error = %e, "binary attachment kept as text");
                        AttachmentValue::Text(value.to_owned())
                    }
                }
            } else {
                AttachmentValue::Text(value.to_owned())
            };
            attachments.insert(key, attachment);
        }
        attachments
    }
}

/// A single application attachment value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentValue {
    /// Plain text value
    Text(String),
    /// Decoded binary value from a `-bin` key
    Binary(Bytes),
}

impl AttachmentValue {
    /// The value as text, if it is a text value
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match *self {
            Self::Text(ref s) => Some(s),
            Self::Binary(_) => None,
        }
    }

    /// The raw bytes of the value
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match *self {
            Self::Text(ref s) => s.as_bytes(),
            Self::Binary(ref b) => b,
        }
    }
}

/// Application-visible key/value data carried alongside an RPC result.
///
/// Keeps the order in which keys first arrived; re-inserting a key replaces
/// its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attachments {
    entries: Vec<(String, AttachmentValue)>,
}

impl Attachments {
    /// Create an empty mapping
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert or replace a value
    pub fn insert(&mut self, key: impl Into<String>, value: AttachmentValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Get a value by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AttachmentValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    /// Check whether `key` is present
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of attachments
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no attachments
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttachmentValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_new() {
        let meta = Metadata::new();
        assert!(meta.is_empty());
        assert_eq!(meta.len(), 0);
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let mut meta = Metadata::new();
        meta.insert("Trace-Id", "abc");

        assert!(meta.contains("trace-id"));
        assert!(meta.contains("TRACE-ID"));
        assert_eq!(meta.get("trace-ID"), Some("abc"));
        assert_eq!(meta.iter().next(), Some(("trace-id", "abc")));
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let meta = Metadata::from_pairs([("k", "first"), ("k", "second")]);
        assert_eq!(meta.len(), 2);
        assert_eq!(meta.get("k"), Some("second"));
    }

    #[test]
    fn test_take_is_consuming() {
        let mut meta = Metadata::from_pairs([("k", "v1"), ("other", "x"), ("k", "v2")]);

        assert_eq!(meta.take("k"), Some("v2".to_owned()));
        assert!(!meta.contains("k"));
        assert_eq!(meta.take("k"), None);
        assert_eq!(meta.len(), 1);
        assert!(!meta.remove("k"));
        assert!(meta.remove("other"));
        assert!(meta.is_empty());
    }

    #[test]
    fn test_binary_values() {
        let mut meta = Metadata::new();
        meta.insert_bin("blob", &[0u8, 255, 1]);

        assert!(meta.contains("blob-bin"));
        assert_eq!(meta.get_bin("blob-bin").unwrap().unwrap(), vec![0u8, 255, 1]);
        assert_eq!(meta.take_bin("blob-bin").unwrap().unwrap(), vec![0u8, 255, 1]);
        assert!(meta.get_bin("blob-bin").is_none());
    }

    #[test]
    fn test_decode_binary_accepts_padding() {
        assert_eq!(decode_binary("AAE").unwrap(), vec![0u8, 1]);
        assert_eq!(decode_binary("AAE=").unwrap(), vec![0u8, 1]);
        assert!(decode_binary("not base64!").is_err());
    }

    #[test]
    fn test_attachments_skip_reserved_and_transport_keys() {
        let mut meta = Metadata::from_pairs([
            (":status", "200"),
            ("grpc-status", "5"),
            ("grpc-message", "no such item"),
            ("content-type", "application/grpc"),
            (EXCEPTION_TW_BIN, "AAAA"),
            (STATUS_DETAIL_KEY, "AAAA"),
            ("x-user", "alice"),
        ]);
        meta.insert_bin("x-token", b"secret");

        let attachments = meta.to_attachments();
        assert_eq!(attachments.len(), 2);
        assert_eq!(
            attachments.get("x-user"),
            Some(&AttachmentValue::Text("alice".into()))
        );
        assert_eq!(
            attachments.get("x-token-bin").map(AttachmentValue::as_bytes),
            Some(b"secret".as_slice())
        );
    }

    #[test]
    fn test_attachments_keep_order_and_bad_binary() {
        let meta = Metadata::from_pairs([
            ("zeta", "1"),
            ("alpha", "2"),
            ("broken-bin", "%%%"),
            ("zeta", "3"),
        ]);

        let attachments = meta.to_attachments();
        let keys: Vec<&str> = attachments.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "broken-bin"]);
        assert_eq!(attachments.get("zeta").and_then(AttachmentValue::as_str), Some("3"));
        assert_eq!(
            attachments.get("broken-bin").and_then(AttachmentValue::as_str),
            Some("%%%")
        );
    }
}
