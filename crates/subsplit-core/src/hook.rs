//! Job payloads and the push hook they carry.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Raw job payload as received by the intake endpoint.
///
/// Payloads are opaque bytes, unique only by content. The queue stores them
/// verbatim and the worker resolves a job by removing the exact same bytes
/// from the in-flight list, so a payload is never rewritten once enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobPayload(Vec<u8>);

impl JobPayload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lossy UTF-8 view, for logs and outcome records.
    pub fn lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    /// Decode the payload as a push hook.
    pub fn decode(&self) -> Result<PushHook, serde_json::Error> {
        serde_json::from_slice(&self.0)
    }
}

impl From<Vec<u8>> for JobPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&str> for JobPayload {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for JobPayload {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

/// The subset of a push event the worker cares about.
///
/// Missing fields decode as empty strings; only malformed JSON or wrongly
/// typed fields fail to decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushHook {
    pub repository: HookRepository,
    pub r#ref: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookRepository {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_push_hook() {
        let payload =
            JobPayload::from(r#"{"repository":{"url":"https://x/y.git"},"ref":"refs/heads/main"}"#);

        let hook = payload.decode().unwrap();
        assert_eq!(hook.repository.url, "https://x/y.git");
        assert_eq!(hook.r#ref, "refs/heads/main");
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        let payload = JobPayload::from(
            r#"{"ref":"refs/tags/v1.0.0","before":"abc","repository":{"url":"u","name":"y"}}"#,
        );

        let hook = payload.decode().unwrap();
        assert_eq!(hook.repository.url, "u");
        assert_eq!(hook.r#ref, "refs/tags/v1.0.0");
    }

    #[test]
    fn test_decode_missing_fields_are_empty() {
        let hook = JobPayload::from("{}").decode().unwrap();
        assert_eq!(hook, PushHook::default());
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        assert!(JobPayload::from("not json").decode().is_err());
        assert!(JobPayload::from(r#"{"ref": 3}"#).decode().is_err());
    }

    #[test]
    fn test_lossy_view() {
        let payload = JobPayload::new(vec![b'o', b'k', 0xff]);
        assert_eq!(payload.lossy(), "ok\u{fffd}");
        assert_eq!(payload.as_bytes().len(), 3);
    }
}
