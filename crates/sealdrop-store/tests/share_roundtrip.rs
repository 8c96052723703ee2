//! Integration tests for upload → store → open through the share client.
//!
//! Uses the OpenDAL memory service unless a test needs files on disk.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use opendal::Operator;
use secrecy::SecretString;

use sealdrop_core::{FileId, SealdropError};
use sealdrop_crypto::{CryptoError, KdfParams, KeyMode};
use sealdrop_store::{EnvelopeStore, ShareClient};

const FAST: KdfParams = KdfParams { iterations: 1_000 };

fn memory_operator() -> Operator {
    Operator::new(opendal::services::Memory::default())
        .expect("memory operator")
        .finish()
}

fn client_on(op: Operator) -> ShareClient {
    ShareClient::new(
        EnvelopeStore::new(op, "test/shares"),
        FAST,
        "https://drop.example.com",
        1024 * 1024,
    )
}

fn pw(s: &str) -> SecretString {
    SecretString::from(s)
}

#[tokio::test]
async fn password_share_roundtrip() {
    let client = client_on(memory_operator());

    let receipt = client
        .upload("hello.txt", b"hello world", Some(&pw("Tr0ub4dor&3")))
        .await
        .expect("upload should succeed");

    assert_eq!(receipt.key_mode, KeyMode::PasswordDerived);
    assert_eq!(receipt.ciphertext_bytes, 11 + 16);
    assert_eq!(
        receipt.link.to_string(),
        format!("https://drop.example.com/s/{}", receipt.file_id)
    );

    let opened = client
        .open(&receipt.file_id, |_| Some(pw("Tr0ub4dor&3")))
        .await
        .expect("open should succeed");

    assert_eq!(opened.plaintext, b"hello world");
    assert_eq!(opened.metadata.file_name, "hello.txt");
    assert_eq!(opened.metadata.file_size, 11);
    assert!(opened.metadata.is_password_protected);
}

#[tokio::test]
async fn wrong_password_then_retry() {
    let client = client_on(memory_operator());
    let receipt = client
        .upload("hello.txt", b"hello world", Some(&pw("right")))
        .await
        .unwrap();

    let err = client
        .open(&receipt.file_id, |_| Some(pw("wrong")))
        .await
        .unwrap_err();
    assert!(err.is_authentication_failure());

    // A retry is a fresh attempt from the start
    let opened = client
        .open(&receipt.file_id, |_| Some(pw("right")))
        .await
        .unwrap();
    assert_eq!(opened.plaintext, b"hello world");
}

#[tokio::test]
async fn declined_prompt_is_password_required() {
    let client = client_on(memory_operator());
    let receipt = client
        .upload("a.bin", b"abc", Some(&pw("pw")))
        .await
        .unwrap();

    let err = client.open(&receipt.file_id, |_| None).await.unwrap_err();
    assert!(matches!(err, SealdropError::PasswordRequired));
}

#[tokio::test]
async fn keyless_share_never_prompts() {
    let client = client_on(memory_operator());
    let receipt = client.upload("hello.txt", b"hello world", None).await.unwrap();
    assert_eq!(receipt.key_mode, KeyMode::RandomKey);

    let opened = client
        .open(&receipt.file_id, |_| panic!("keyless share must not prompt"))
        .await
        .unwrap();
    assert_eq!(opened.plaintext, b"hello world");
    assert!(!opened.metadata.is_password_protected);
}

#[tokio::test]
async fn envelope_fetch_respects_key_mode() {
    let client = client_on(memory_operator());
    let store = client.store();

    let protected = client.upload("p", b"secret", Some(&pw("pw"))).await.unwrap();
    let response = store.fetch_envelope(&protected.file_id).await.unwrap();
    assert!(response.salt.is_some());
    assert!(response.key.is_none(), "password shares must never expose a key");

    let keyless = client.upload("k", b"public-ish", None).await.unwrap();
    let response = store.fetch_envelope(&keyless.file_id).await.unwrap();
    assert!(response.key.is_some(), "keyless shares hand out the stored key");
    assert!(response.salt.is_none());
}

#[tokio::test]
async fn stored_objects_hold_no_plaintext_or_password() {
    let op = memory_operator();
    let client = client_on(op.clone());
    let receipt = client
        .upload("diary.txt", b"very private diary entry", Some(&pw("p4ssw0rd-xyz")))
        .await
        .unwrap();

    let envelope_path = format!("test/shares/envelopes/{}.json", receipt.file_id);
    let raw = op.read(&envelope_path).await.unwrap().to_vec();
    let text = String::from_utf8(raw).unwrap();

    assert!(!text.contains("very private diary entry"));
    assert!(!text.contains("p4ssw0rd-xyz"));
    assert!(!text.contains("\"key\""));
}

#[tokio::test]
async fn tampered_envelope_fails_like_wrong_password() {
    let op = memory_operator();
    let client = client_on(op.clone());
    let receipt = client
        .upload("f", b"tamper target", Some(&pw("pw")))
        .await
        .unwrap();

    let path = format!("test/shares/envelopes/{}.json", receipt.file_id);
    let raw = op.read(&path).await.unwrap().to_vec();
    let mut record: sealdrop_crypto::EnvelopeRecord = serde_json::from_slice(&raw).unwrap();
    // Replace the first base64 char of the ciphertext with a different one
    let first = if record.ciphertext.starts_with('A') { "B" } else { "A" };
    record.ciphertext.replace_range(0..1, first);
    op.write(&path, serde_json::to_vec(&record).unwrap())
        .await
        .unwrap();

    let tampered = client
        .open(&receipt.file_id, |_| Some(pw("pw")))
        .await
        .unwrap_err();
    let wrong_pw = client
        .upload("g", b"other", Some(&pw("pw")))
        .await
        .map(|r| r.file_id)
        .unwrap();
    let wrong = client
        .open(&wrong_pw, |_| Some(pw("nope")))
        .await
        .unwrap_err();

    assert!(tampered.is_authentication_failure());
    assert_eq!(tampered.to_string(), wrong.to_string());
}

#[tokio::test]
async fn resized_ciphertext_fails_like_wrong_password() {
    let op = memory_operator();
    let client = client_on(op.clone());

    let wrong_pw = client
        .upload("g", b"other", Some(&pw("pw")))
        .await
        .unwrap()
        .file_id;
    let wrong = client
        .open(&wrong_pw, |_| Some(pw("nope")))
        .await
        .unwrap_err();

    let resizes: [fn(&mut Vec<u8>); 3] = [
        |ct| {
            ct.pop();
        },
        |ct| ct.push(0x42),
        |ct| ct.truncate(4),
    ];
    for resize in resizes {
        let receipt = client
            .upload("hello.txt", b"hello world", Some(&pw("pw")))
            .await
            .unwrap();

        let path = format!("test/shares/envelopes/{}.json", receipt.file_id);
        let raw = op.read(&path).await.unwrap().to_vec();
        let mut record: sealdrop_crypto::EnvelopeRecord = serde_json::from_slice(&raw).unwrap();
        let mut ciphertext = STANDARD.decode(&record.ciphertext).unwrap();
        resize(&mut ciphertext);
        record.ciphertext = STANDARD.encode(&ciphertext);
        op.write(&path, serde_json::to_vec(&record).unwrap())
            .await
            .unwrap();

        let tampered = client
            .open(&receipt.file_id, |_| Some(pw("pw")))
            .await
            .unwrap_err();
        assert!(tampered.is_authentication_failure(), "{tampered}");
        assert_eq!(tampered.to_string(), wrong.to_string());
    }
}

#[tokio::test]
async fn empty_upload_rejected() {
    let client = client_on(memory_operator());
    let err = client.upload("empty", b"", None).await.unwrap_err();
    assert!(matches!(
        err,
        SealdropError::Crypto(CryptoError::EmptyPayload)
    ));
}

#[tokio::test]
async fn oversized_upload_rejected() {
    let client = ShareClient::new(
        EnvelopeStore::new(memory_operator(), "s"),
        FAST,
        "https://x",
        8,
    );
    let err = client.upload("big", &[0u8; 9], None).await.unwrap_err();
    assert!(matches!(err, SealdropError::TooLarge { size: 9, limit: 8 }));
}

#[tokio::test]
async fn unknown_share_not_found() {
    let client = client_on(memory_operator());
    let id = FileId::new();

    assert!(matches!(
        client.metadata(&id).await,
        Err(SealdropError::NotFound(_))
    ));
    assert!(matches!(
        client.open(&id, |_| None).await,
        Err(SealdropError::NotFound(_))
    ));
}

#[tokio::test]
async fn delete_cascades() {
    let client = client_on(memory_operator());
    let receipt = client.upload("f", b"bye", None).await.unwrap();
    let store = client.store();

    assert!(store.exists(&receipt.file_id).await.unwrap());
    client.delete(&receipt.file_id).await.unwrap();

    assert!(!store.exists(&receipt.file_id).await.unwrap());
    assert!(matches!(
        store.fetch_envelope(&receipt.file_id).await,
        Err(SealdropError::NotFound(_))
    ));
    assert!(matches!(
        client.delete(&receipt.file_id).await,
        Err(SealdropError::NotFound(_))
    ));
}

#[tokio::test]
async fn fs_backend_persists_across_clients() {
    let dir = tempfile::tempdir().unwrap();

    let receipt = {
        let op = sealdrop_store::operator::fs_operator(dir.path()).unwrap();
        client_on(op)
            .upload("disk.txt", b"on disk", Some(&pw("pw")))
            .await
            .unwrap()
    };

    let op = sealdrop_store::operator::fs_operator(dir.path()).unwrap();
    let opened = client_on(op)
        .open(&receipt.file_id, |_| Some(pw("pw")))
        .await
        .unwrap();
    assert_eq!(opened.plaintext, b"on disk");
}

#[tokio::test]
async fn delete_clears_orphaned_envelope() {
    let op = memory_operator();
    let client = client_on(op.clone());
    let receipt = client.upload("k", b"keyless", None).await.unwrap();
    let store = client.store();

    // Metadata gone, envelope (holding the key) left behind
    let meta = format!("test/shares/meta/{}.json", receipt.file_id);
    let envelope = format!("test/shares/envelopes/{}.json", receipt.file_id);
    op.delete(&meta).await.unwrap();
    assert!(!store.exists(&receipt.file_id).await.unwrap());

    client.delete(&receipt.file_id).await.unwrap();
    assert!(matches!(
        op.stat(&envelope).await,
        Err(e) if e.kind() == opendal::ErrorKind::NotFound
    ));
    assert!(matches!(
        client.delete(&receipt.file_id).await,
        Err(SealdropError::NotFound(_))
    ));
}
