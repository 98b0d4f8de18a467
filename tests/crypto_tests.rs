//! Integration tests for the credvault crypto module.

use credvault::crypto::{decrypt_field, encrypt_field, RecordKey, KEY_LEN};
use credvault::errors::VaultError;

// ---------------------------------------------------------------------------
// Encryption round-trip
// ---------------------------------------------------------------------------

#[test]
fn encrypt_decrypt_roundtrip() {
    let key = RecordKey::generate().expect("generate key");
    let plaintext = b"correct horse battery staple";

    let ciphertext = encrypt_field(key.as_bytes(), plaintext).expect("encrypt should succeed");

    // Ciphertext must be longer than plaintext (12-byte nonce + 16-byte tag).
    assert!(ciphertext.len() > plaintext.len());

    let recovered = decrypt_field(key.as_bytes(), &ciphertext).expect("decrypt should succeed");
    assert_eq!(recovered, plaintext);
}

#[test]
fn empty_plaintext_roundtrips() {
    let key = RecordKey::generate().unwrap();

    let ciphertext = encrypt_field(key.as_bytes(), b"").expect("encrypt empty");
    let recovered = decrypt_field(key.as_bytes(), &ciphertext).expect("decrypt empty");

    assert!(recovered.is_empty(), "empty string must come back empty");
}

#[test]
fn encrypt_produces_different_ciphertext_each_time() {
    let key = RecordKey::generate().unwrap();
    let plaintext = b"hunter2";

    let ct1 = encrypt_field(key.as_bytes(), plaintext).expect("encrypt 1");
    let ct2 = encrypt_field(key.as_bytes(), plaintext).expect("encrypt 2");

    // Because each call generates a new random nonce, the output must differ.
    assert_ne!(ct1, ct2, "two encryptions of the same plaintext must differ");
}

// ---------------------------------------------------------------------------
// Failure modes
// ---------------------------------------------------------------------------

#[test]
fn decrypt_with_wrong_key_fails_integrity() {
    let key = RecordKey::generate().unwrap();
    let wrong_key = RecordKey::generate().unwrap();

    let ciphertext = encrypt_field(key.as_bytes(), b"s3cret").expect("encrypt");
    let result = decrypt_field(wrong_key.as_bytes(), &ciphertext);

    assert!(
        matches!(result, Err(VaultError::IntegrityFailure)),
        "wrong key must fail the auth check"
    );
}

#[test]
fn decrypt_with_truncated_blob_is_malformed() {
    let key = RecordKey::generate().unwrap();

    // Anything shorter than nonce + tag cannot be a valid blob.
    for len in [0usize, 5, 12, 27] {
        let result = decrypt_field(key.as_bytes(), &vec![0u8; len]);
        assert!(
            matches!(result, Err(VaultError::MalformedCiphertext(_))),
            "{len}-byte blob must be rejected as malformed"
        );
    }
}

#[test]
fn any_flipped_bit_fails_integrity() {
    let key = RecordKey::generate().unwrap();
    let ciphertext = encrypt_field(key.as_bytes(), b"field value").expect("encrypt");

    // Flip one bit in every byte position: nonce, payload, and tag alike.
    for pos in 0..ciphertext.len() {
        let mut tampered = ciphertext.clone();
        tampered[pos] ^= 0x01;

        let result = decrypt_field(key.as_bytes(), &tampered);
        assert!(
            matches!(result, Err(VaultError::IntegrityFailure)),
            "bit flip at byte {pos} must fail, never return altered plaintext"
        );
    }
}

// ---------------------------------------------------------------------------
// Key generation
// ---------------------------------------------------------------------------

#[test]
fn generated_keys_have_expected_length_and_differ() {
    let k1 = RecordKey::generate().unwrap();
    let k2 = RecordKey::generate().unwrap();

    assert_eq!(k1.as_bytes().len(), KEY_LEN);
    assert_ne!(k1.as_bytes(), k2.as_bytes(), "keys must be unique");
}

#[test]
fn key_survives_storage_roundtrip() {
    let original = RecordKey::generate().unwrap();
    let stored: Vec<u8> = original.as_bytes().to_vec();

    let restored = RecordKey::from_bytes(&stored).expect("restore key");

    let plaintext = b"persisted and restored";
    let ciphertext = encrypt_field(original.as_bytes(), plaintext).unwrap();
    let recovered = decrypt_field(restored.as_bytes(), &ciphertext).unwrap();
    assert_eq!(recovered, plaintext);
}
