//! [`ResponseDecoder`]: turns a raw backend JSON body into the caller-visible payload.

use std::sync::Arc;

use common::protocol::{DATA_FIELD, ENCRYPTED_FIELD};
use serde_json::Value;
use tracing::{debug, warn};

use super::error::DecodeError;
use crate::crypto::{SymmetricKey, Token};

/// Whether the trailing token tag is checked before decryption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TagPolicy {
    /// Accept any tag. Matches what the backend's existing clients do.
    #[default]
    Ignore,
    /// Reject tokens whose HMAC-SHA256 tag does not match.
    Verify,
}

/// What the caller wants when a sealed payload cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Surface the [`DecodeError`].
    Propagate,
    /// Hand back the untouched response alongside the error.
    FallbackToRaw,
}

/// Result of [`ResponseDecoder::resolve`].
#[derive(Debug)]
pub enum Outcome {
    /// The payload, decrypted or unwrapped as appropriate.
    Decoded(Value),
    /// Decoding failed and the policy asked for the raw response instead.
    Fallback { raw: Value, error: DecodeError },
    /// Decoding failed and the policy asked for the error.
    Failed(DecodeError),
}

impl Outcome {
    /// Collapse into a `Result`, treating a fallback as success with the raw body.
    pub fn into_result(self) -> Result<Value, DecodeError> {
        match self {
            Outcome::Decoded(v) | Outcome::Fallback { raw: v, .. } => Ok(v),
            Outcome::Failed(e) => Err(e),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Outcome::Fallback { .. })
    }
}

/// Construction-time settings for a [`ResponseDecoder`].
#[derive(Debug, Clone, Default)]
pub struct DecoderConfig {
    /// Master switch for the decryption path.
    pub enabled: bool,
    /// Pre-shared key; required only when `enabled` and a sealed envelope arrives.
    pub key: Option<SymmetricKey>,
    pub tag_policy: TagPolicy,
}

/// How a response body will be handled.
enum Shape {
    Sealed,
    Plain,
    Legacy,
}

/// Stateless decoder holding an immutable key.
///
/// Cheap to clone and safe to share across tasks; the key sits behind an
/// `Arc` and is never mutated after construction.
#[derive(Debug, Clone)]
pub struct ResponseDecoder {
    enabled: bool,
    key: Option<Arc<SymmetricKey>>,
    tag_policy: TagPolicy,
}

impl ResponseDecoder {
    pub fn new(cfg: DecoderConfig) -> Self {
        Self {
            enabled: cfg.enabled,
            key: cfg.key.map(Arc::new),
            tag_policy: cfg.tag_policy,
        }
    }

    /// A decoder with the decryption path switched off.
    pub fn disabled() -> Self {
        Self::new(DecoderConfig::default())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// Decode a bare token with the configured key.
    ///
    /// # Errors
    ///
    /// [`DecodeError::MisconfiguredKey`] without a key, otherwise whatever
    /// [`decode`] returns.
    pub fn decode(&self, token: &str) -> Result<Value, DecodeError> {
        let key = self.key.as_deref().ok_or(DecodeError::MisconfiguredKey)?;
        decode(token, key, self.tag_policy)
    }

    /// Produce the caller-visible payload, failing on any decode error.
    ///
    /// - decryption disabled: `response.data` if present, else `response`;
    /// - `encrypted: true`: the decrypted JSON;
    /// - `encrypted: false` with `data`: `response.data`;
    /// - anything else: `response` unchanged.
    pub fn process_response(&self, response: Value) -> Result<Value, DecodeError> {
        self.resolve(response, FailurePolicy::Propagate).into_result()
    }

    /// Like [`Self::process_response`], with an explicit failure policy.
    pub fn resolve(&self, response: Value, policy: FailurePolicy) -> Outcome {
        match self.shape(&response) {
            Shape::Legacy => Outcome::Decoded(response),
            Shape::Plain => Outcome::Decoded(take_data(response)),
            Shape::Sealed => match self.open(&response) {
                Ok(value) => Outcome::Decoded(value),
                Err(error) => match policy {
                    FailurePolicy::Propagate => Outcome::Failed(error),
                    FailurePolicy::FallbackToRaw => {
                        warn!(
                            kind = error.kind(),
                            error = %error,
                            "response decode failed; falling back to raw body"
                        );
                        Outcome::Fallback {
                            raw: response,
                            error,
                        }
                    }
                },
            },
        }
    }

    fn shape(&self, response: &Value) -> Shape {
        let Some(obj) = response.as_object() else {
            return Shape::Legacy;
        };
        if !self.enabled {
            return if obj.contains_key(DATA_FIELD) {
                Shape::Plain
            } else {
                Shape::Legacy
            };
        }
        match obj.get(ENCRYPTED_FIELD) {
            Some(Value::Bool(true)) => Shape::Sealed,
            Some(Value::Bool(false)) if obj.contains_key(DATA_FIELD) => Shape::Plain,
            _ => Shape::Legacy,
        }
    }

    fn open(&self, response: &Value) -> Result<Value, DecodeError> {
        let token = response
            .get(DATA_FIELD)
            .and_then(Value::as_str)
            .ok_or(DecodeError::NonStringData)?;
        let value = self.decode(token)?;
        debug!(token_len = token.len(), "decrypted response payload");
        Ok(value)
    }
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::disabled()
    }
}

/// True iff `response` is an object whose `encrypted` field is boolean `true`.
pub fn is_encrypted(response: &Value) -> bool {
    matches!(response.get(ENCRYPTED_FIELD), Some(Value::Bool(true)))
}

/// Decode a base64url token to JSON with `key`.
///
/// # Errors
///
/// - [`DecodeError::MalformedToken`] for bad base64, fewer than 57 bytes, or a
///   version byte other than `0x80`;
/// - [`DecodeError::IntegrityMismatch`] under [`TagPolicy::Verify`];
/// - [`DecodeError::CipherFailure`] when CBC decryption or unpadding fails;
/// - [`DecodeError::InvalidPayload`] when the plaintext is not UTF-8 JSON.
pub fn decode(token: &str, key: &SymmetricKey, tag_policy: TagPolicy) -> Result<Value, DecodeError> {
    let token = Token::parse(token)?;

    if tag_policy == TagPolicy::Verify && !token.verify_tag(key) {
        return Err(DecodeError::IntegrityMismatch);
    }

    let plaintext = token.decrypt(key)?;
    let text = String::from_utf8(plaintext)
        .map_err(|_| DecodeError::InvalidPayload("decrypted bytes are not UTF-8".into()))?;
    serde_json::from_str(&text).map_err(|e| DecodeError::InvalidPayload(format!("invalid json: {e}")))
}

fn take_data(response: Value) -> Value {
    match response {
        Value::Object(mut obj) => obj.remove(DATA_FIELD).unwrap_or(Value::Null),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::key::KEY_LEN;
    use serde_json::json;

    fn key() -> SymmetricKey {
        SymmetricKey::from_bytes(&[3u8; KEY_LEN]).unwrap()
    }

    fn enabled(tag_policy: TagPolicy) -> ResponseDecoder {
        ResponseDecoder::new(DecoderConfig {
            enabled: true,
            key: Some(key()),
            tag_policy,
        })
    }

    fn sealed(value: &Value) -> String {
        Token::seal_now(value.to_string().as_bytes(), &key()).encode()
    }

    #[test]
    fn is_encrypted_requires_boolean_true() {
        assert!(is_encrypted(&json!({"encrypted": true, "data": "x"})));
        assert!(!is_encrypted(&json!({"encrypted": false, "data": "x"})));
        assert!(!is_encrypted(&json!({"encrypted": "true", "data": "x"})));
        assert!(!is_encrypted(&json!({"data": "x"})));
        assert!(!is_encrypted(&json!(null)));
        assert!(!is_encrypted(&json!([true])));
    }

    #[test]
    fn sealed_envelope_is_decrypted() {
        let payload = json!({"series": [{"id": "NCD-2024-A", "coupon": 9.1}]});
        let response = json!({"encrypted": true, "data": sealed(&payload)});
        assert_eq!(enabled(TagPolicy::Ignore).process_response(response).unwrap(), payload);
    }

    #[test]
    fn plain_envelope_returns_data() {
        let response = json!({"encrypted": false, "data": {"count": 4}});
        assert_eq!(
            enabled(TagPolicy::Ignore).process_response(response).unwrap(),
            json!({"count": 4})
        );
    }

    #[test]
    fn plain_envelope_needs_no_key() {
        let decoder = ResponseDecoder::new(DecoderConfig {
            enabled: true,
            key: None,
            tag_policy: TagPolicy::Ignore,
        });
        let response = json!({"encrypted": false, "data": [1, 2]});
        assert_eq!(decoder.process_response(response).unwrap(), json!([1, 2]));
    }

    #[test]
    fn legacy_payload_passes_through() {
        let decoder = enabled(TagPolicy::Ignore);
        let legacy = json!({"items": [], "total": 0});
        assert_eq!(decoder.process_response(legacy.clone()).unwrap(), legacy);
        assert_eq!(decoder.process_response(json!([1])).unwrap(), json!([1]));
        // `data` without an `encrypted` flag is not an envelope.
        let bare = json!({"data": 5});
        assert_eq!(decoder.process_response(bare.clone()).unwrap(), bare);
    }

    #[test]
    fn disabled_decoder_unwraps_data_without_decrypting() {
        let decoder = ResponseDecoder::disabled();
        let response = json!({"encrypted": true, "data": "gAAAAA-not-decrypted"});
        assert_eq!(
            decoder.process_response(response).unwrap(),
            json!("gAAAAA-not-decrypted")
        );
        let legacy = json!({"total": 1});
        assert_eq!(decoder.process_response(legacy.clone()).unwrap(), legacy);
    }

    #[test]
    fn missing_key_is_misconfiguration() {
        let decoder = ResponseDecoder::new(DecoderConfig {
            enabled: true,
            key: None,
            tag_policy: TagPolicy::Ignore,
        });
        let response = json!({"encrypted": true, "data": sealed(&json!(1))});
        assert!(matches!(
            decoder.process_response(response),
            Err(DecodeError::MisconfiguredKey)
        ));
    }

    #[test]
    fn non_string_data_is_malformed() {
        let response = json!({"encrypted": true, "data": {"a": 1}});
        let err = enabled(TagPolicy::Ignore).process_response(response).unwrap_err();
        assert!(err.is_malformed_token());
    }

    #[test]
    fn fallback_policy_returns_raw_response() {
        let response = json!({"encrypted": true, "data": "AAAA"});
        let outcome = enabled(TagPolicy::Ignore).resolve(response.clone(), FailurePolicy::FallbackToRaw);
        match outcome {
            Outcome::Fallback { raw, error } => {
                assert_eq!(raw, response);
                assert!(error.is_malformed_token());
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[test]
    fn propagate_policy_returns_error() {
        let response = json!({"encrypted": true, "data": "AAAA"});
        let outcome = enabled(TagPolicy::Ignore).resolve(response, FailurePolicy::Propagate);
        assert!(matches!(outcome, Outcome::Failed(DecodeError::MalformedToken(_))));
    }

    #[test]
    fn fallback_into_result_yields_raw() {
        let response = json!({"encrypted": true, "data": "AAAA"});
        let outcome = enabled(TagPolicy::Ignore).resolve(response.clone(), FailurePolicy::FallbackToRaw);
        assert!(outcome.is_fallback());
        assert_eq!(outcome.into_result().unwrap(), response);
    }

    #[test]
    fn verify_policy_accepts_sealed_tokens() {
        let payload = json!({"ok": true});
        let response = json!({"encrypted": true, "data": sealed(&payload)});
        assert_eq!(enabled(TagPolicy::Verify).process_response(response).unwrap(), payload);
    }

    #[test]
    fn verify_policy_rejects_forged_tag() {
        let mut raw = Token::seal_now(b"{}", &key()).to_bytes();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let token = crate::crypto::encoding::encode_base64url(&raw);
        assert!(matches!(
            enabled(TagPolicy::Verify).decode(&token),
            Err(DecodeError::IntegrityMismatch)
        ));
        // The same token is accepted when the tag is ignored.
        assert_eq!(enabled(TagPolicy::Ignore).decode(&token).unwrap(), json!({}));
    }

    #[test]
    fn non_json_plaintext_is_invalid_payload() {
        let token = Token::seal_now(b"not json", &key()).encode();
        assert!(matches!(
            enabled(TagPolicy::Ignore).decode(&token),
            Err(DecodeError::InvalidPayload(_))
        ));
    }

    #[test]
    fn non_utf8_plaintext_is_invalid_payload() {
        let token = Token::seal_now(&[0xFF, 0xFE, 0xFD], &key()).encode();
        assert!(matches!(
            enabled(TagPolicy::Ignore).decode(&token),
            Err(DecodeError::InvalidPayload(_))
        ));
    }
}
