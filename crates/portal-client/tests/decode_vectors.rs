use aes::Aes128;
use cbc::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};
use portal_client::crypto::encoding::{decode_base64url, encode_base64url};
use portal_client::crypto::key::KEY_LEN;
use portal_client::crypto::token::{MIN_TOKEN_LEN, VERSION};
use portal_client::crypto::{SymmetricKey, Token};
use portal_client::envelope::{
    decode, is_encrypted, DecodeError, DecoderConfig, ResponseDecoder, TagPolicy,
};
use serde_json::{json, Value};

const ZERO_KEY: [u8; KEY_LEN] = [0u8; KEY_LEN];

fn zero_key() -> SymmetricKey {
    SymmetricKey::from_bytes(&ZERO_KEY).unwrap()
}

fn decoder(key: SymmetricKey) -> ResponseDecoder {
    ResponseDecoder::new(DecoderConfig {
        enabled: true,
        key: Some(key),
        tag_policy: TagPolicy::Ignore,
    })
}

/// Assemble a token by hand, independent of `Token::seal`.
fn handmade_token(plaintext: &[u8], key: &[u8; KEY_LEN], iv: [u8; 16], trailer: [u8; 32]) -> Vec<u8> {
    let mut enc_key = [0u8; 16];
    enc_key.copy_from_slice(&key[..16]);
    let ct = cbc::Encryptor::<Aes128>::new(&enc_key.into(), &iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    let mut raw = vec![VERSION];
    raw.extend_from_slice(&0x0000_0000_6553_F100u64.to_be_bytes());
    raw.extend_from_slice(&iv);
    raw.extend_from_slice(&ct);
    raw.extend_from_slice(&trailer);
    raw
}

// ---------------------------------------------------------------------------
// Fixed vectors
// ---------------------------------------------------------------------------

#[test]
fn zero_key_vector_decodes_with_arbitrary_trailer() {
    let iv = [
        0x1f, 0x8b, 0x3c, 0x00, 0x91, 0x42, 0xee, 0x07, 0x5a, 0x6d, 0x20, 0xb4, 0xc8, 0x13, 0x77,
        0x2e,
    ];
    let raw = handmade_token(br#"{"a":1}"#, &ZERO_KEY, iv, [0xAB; 32]);
    let token = encode_base64url(&raw);
    assert_eq!(decode(&token, &zero_key(), TagPolicy::Ignore).unwrap(), json!({"a": 1}));
}

#[test]
fn unpadded_and_standard_alphabet_tokens_decode() {
    let raw = handmade_token(br#"{"a":1}"#, &ZERO_KEY, [0x55; 16], [0; 32]);
    let url_safe = encode_base64url(&raw);
    let unpadded = url_safe.trim_end_matches('=').to_owned();
    let standard = url_safe.replace('-', "+").replace('_', "/");
    for token in [url_safe, unpadded, standard] {
        assert_eq!(
            decode(&token, &zero_key(), TagPolicy::Ignore).unwrap(),
            json!({"a": 1}),
            "{token}"
        );
    }
}

#[test]
fn handmade_trailer_fails_tag_verification() {
    let raw = handmade_token(br#"{"a":1}"#, &ZERO_KEY, [0x55; 16], [0; 32]);
    let err = decode(&encode_base64url(&raw), &zero_key(), TagPolicy::Verify).unwrap_err();
    assert!(matches!(err, DecodeError::IntegrityMismatch));
}

// ---------------------------------------------------------------------------
// Round trips
// ---------------------------------------------------------------------------

#[test]
fn sealed_values_round_trip() {
    let key = SymmetricKey::from_bytes(&[0x5c; KEY_LEN]).unwrap();
    let samples = [
        json!(null),
        json!(true),
        json!(0),
        json!("₹ 1,00,000"),
        json!([]),
        json!({"series_id": "NCD-2025-B", "coupon_rate": 9.35, "tenure_months": 36}),
        json!({"payouts": [{"investor": "INV-001", "amount": "1250.00"}], "next": null}),
    ];
    for value in samples {
        let token = Token::seal_now(value.to_string().as_bytes(), &key).encode();
        assert_eq!(decode(&token, &key, TagPolicy::Ignore).unwrap(), value);
        assert_eq!(decode(&token, &key, TagPolicy::Verify).unwrap(), value);
    }
}

#[test]
fn large_payload_round_trips() {
    let key = zero_key();
    let rows: Vec<Value> = (0..500)
        .map(|i| json!({"id": format!("INV-{i:04}"), "kyc": i % 3 == 0}))
        .collect();
    let value = Value::Array(rows);
    let token = Token::seal_now(value.to_string().as_bytes(), &key).encode();
    assert_eq!(decoder(key).decode(&token).unwrap(), value);
}

// ---------------------------------------------------------------------------
// Malformed tokens
// ---------------------------------------------------------------------------

#[test]
fn every_short_length_is_malformed() {
    for len in 0..MIN_TOKEN_LEN {
        let mut raw = vec![0u8; len];
        if let Some(first) = raw.first_mut() {
            *first = VERSION;
        }
        let err = decode(&encode_base64url(&raw), &zero_key(), TagPolicy::Ignore).unwrap_err();
        assert!(err.is_malformed_token(), "len {len}: {err}");
    }
}

#[test]
fn every_other_version_byte_is_malformed() {
    let good = Token::seal_now(b"{}", &zero_key()).to_bytes();
    for version in (0u8..=255).filter(|v| *v != VERSION) {
        let mut raw = good.clone();
        raw[0] = version;
        let err = decode(&encode_base64url(&raw), &zero_key(), TagPolicy::Ignore).unwrap_err();
        assert!(err.is_malformed_token(), "version {version:#04x}: {err}");
    }
}

#[test]
fn ragged_ciphertext_is_cipher_failure() {
    let mut raw = Token::seal_now(b"{}", &zero_key()).to_bytes();
    // Drop one ciphertext byte; the trailer stays 32 bytes long.
    raw.remove(25);
    let err = decode(&encode_base64url(&raw), &zero_key(), TagPolicy::Ignore).unwrap_err();
    assert!(matches!(err, DecodeError::CipherFailure(_)), "{err}");
}

#[test]
fn wrong_key_never_yields_original() {
    let value = json!({"a": 1});
    let token = Token::seal_now(value.to_string().as_bytes(), &zero_key()).encode();
    let other = SymmetricKey::from_bytes(&[0xEE; KEY_LEN]).unwrap();
    match decode(&token, &other, TagPolicy::Ignore) {
        Ok(v) => assert_ne!(v, value),
        Err(e) => assert!(
            matches!(e, DecodeError::CipherFailure(_) | DecodeError::InvalidPayload(_)),
            "{e}"
        ),
    }
}

// ---------------------------------------------------------------------------
// IV tampering
// ---------------------------------------------------------------------------

#[test]
fn tampered_iv_never_returns_original_plaintext() {
    let value = json!({"a": 1});
    let raw = Token::seal(value.to_string().as_bytes(), &zero_key(), 7, [0x10; 16]).to_bytes();
    for offset in 9..25 {
        for flip in [0x01u8, 0x80, 0xFF] {
            let mut tampered = raw.clone();
            tampered[offset] ^= flip;
            match decode(&encode_base64url(&tampered), &zero_key(), TagPolicy::Ignore) {
                Ok(v) => assert_ne!(v, value, "offset {offset} flip {flip:#04x}"),
                Err(e) => assert!(
                    matches!(e, DecodeError::CipherFailure(_) | DecodeError::InvalidPayload(_)),
                    "offset {offset}: {e}"
                ),
            }
        }
    }
}

#[test]
fn tampered_iv_is_caught_by_tag_verification() {
    let mut raw = Token::seal(br#"{"a":1}"#, &zero_key(), 7, [0x10; 16]).to_bytes();
    raw[9] ^= 0x01;
    let err = decode(&encode_base64url(&raw), &zero_key(), TagPolicy::Verify).unwrap_err();
    assert!(matches!(err, DecodeError::IntegrityMismatch));
}

// ---------------------------------------------------------------------------
// process_response
// ---------------------------------------------------------------------------

#[test]
fn plain_envelopes_pass_data_through_unchanged() {
    // No key at all: the cipher path is unreachable for plain envelopes.
    let d = ResponseDecoder::new(DecoderConfig {
        enabled: true,
        key: None,
        tag_policy: TagPolicy::Verify,
    });
    for data in [
        json!(null),
        json!("gAAAAABl-looks-like-a-token"),
        json!(42),
        json!({"series": []}),
        json!([{"id": 1}, {"id": 2}]),
    ] {
        let response = json!({"encrypted": false, "data": data.clone()});
        assert!(!is_encrypted(&response));
        assert_eq!(d.process_response(response).unwrap(), data);
    }
}

#[test]
fn sealed_envelope_returns_parsed_object() {
    let key = SymmetricKey::from_bytes(&[0x21; KEY_LEN]).unwrap();
    let payload = json!({"grievances": [{"id": "GRV-9", "status": "open"}]});
    let token = Token::seal_now(payload.to_string().as_bytes(), &key).encode();
    let response = json!({"encrypted": true, "data": token});
    assert!(is_encrypted(&response));
    assert_eq!(decoder(key).process_response(response).unwrap(), payload);
}

#[test]
fn token_from_key_string_round_trips() {
    let key = SymmetricKey::from_bytes(&[0x99; KEY_LEN]).unwrap();
    let restored = SymmetricKey::from_base64url(&key.to_base64url()).unwrap();
    let token = Token::seal_now(b"[1,2,3]", &key).encode();
    assert_eq!(decoder(restored).decode(&token).unwrap(), json!([1, 2, 3]));
    assert_eq!(decode_base64url(&token).unwrap()[0], VERSION);
}
