use std::sync::Arc;

use keeper_store::{
    Context, EncryptedStore, MemoryStore, Secret, SecretStore, SecretType, SqliteStore,
    StoreError, UserId,
};

async fn user(store: &dyn SecretStore, login: &str) -> UserId {
    store
        .create_user(&Context::background(), login, "hash")
        .await
        .expect("create user")
        .id
}

#[tokio::test]
async fn payload_is_ciphertext_at_rest_and_plaintext_through_decorator() {
    let raw = Arc::new(SqliteStore::in_memory().await.expect("open sqlite"));
    let store = EncryptedStore::new(raw.clone(), Some("K"));
    let ctx = Context::background();
    let uid = user(&store, "alice").await;

    let created = store
        .create_secret(&ctx, Secret::new(uid, SecretType::Text, "hello", "note"))
        .await
        .unwrap();

    let stored: Vec<u8> = sqlx::query_scalar("SELECT data FROM secrets WHERE id = ?")
        .bind(created.id)
        .fetch_one(raw.pool())
        .await
        .expect("read raw row");
    assert_ne!(stored, b"hello");
    assert!(!stored.windows(5).any(|w| w == b"hello"));

    let metadata: String = sqlx::query_scalar("SELECT metadata FROM secrets WHERE id = ?")
        .bind(created.id)
        .fetch_one(raw.pool())
        .await
        .expect("read raw metadata");
    assert_eq!(metadata, "note");

    let got = store.get_secret(&ctx, uid, created.id).await.unwrap();
    assert_eq!(got.data, b"hello");
}

#[tokio::test]
async fn same_plaintext_encrypts_differently_each_time() {
    let raw = Arc::new(MemoryStore::new());
    let store = EncryptedStore::new(raw.clone(), Some("K"));
    let ctx = Context::background();
    let uid = user(&store, "alice").await;

    let a = store
        .create_secret(&ctx, Secret::new(uid, SecretType::Text, "same", ""))
        .await
        .unwrap();
    let b = store
        .create_secret(&ctx, Secret::new(uid, SecretType::Text, "same", ""))
        .await
        .unwrap();

    let raw_a = raw.get_secret(&ctx, uid, a.id).await.unwrap().data;
    let raw_b = raw.get_secret(&ctx, uid, b.id).await.unwrap().data;
    assert_ne!(raw_a, raw_b);
}

#[tokio::test]
async fn wrong_key_fails_with_decryption_error() {
    let raw: Arc<dyn SecretStore> = Arc::new(MemoryStore::new());
    let writer = EncryptedStore::new(raw.clone(), Some("key-one"));
    let reader = EncryptedStore::new(raw.clone(), Some("key-two"));
    let ctx = Context::background();
    let uid = user(&writer, "alice").await;

    let s = writer
        .create_secret(&ctx, Secret::new(uid, SecretType::Text, "hello", ""))
        .await
        .unwrap();

    let err = reader.get_secret(&ctx, uid, s.id).await.unwrap_err();
    assert!(matches!(err, StoreError::Decryption { secret_id } if secret_id == s.id));

    let err = reader.list_secrets(&ctx, uid).await.unwrap_err();
    assert!(matches!(err, StoreError::Decryption { .. }));
}

#[tokio::test]
async fn tampered_ciphertext_is_an_integrity_failure_not_absence() {
    let raw = Arc::new(MemoryStore::new());
    let store = EncryptedStore::new(raw.clone(), Some("K"));
    let ctx = Context::background();
    let uid = user(&store, "alice").await;

    let s = store
        .create_secret(&ctx, Secret::new(uid, SecretType::Binary, vec![1, 2, 3], ""))
        .await
        .unwrap();

    let mut at_rest = raw.get_secret(&ctx, uid, s.id).await.unwrap();
    let last = at_rest.data.len() - 1;
    at_rest.data[last] ^= 0x01;
    raw.update_secret(&ctx, at_rest).await.unwrap();

    let err = store.get_secret(&ctx, uid, s.id).await.unwrap_err();
    assert!(matches!(err, StoreError::Decryption { .. }));
}

#[tokio::test]
async fn payload_shorter_than_nonce_fails_to_decrypt() {
    let raw = Arc::new(MemoryStore::new());
    let store = EncryptedStore::new(raw.clone(), Some("K"));
    let ctx = Context::background();
    let uid = user(&store, "alice").await;

    let short = raw
        .create_secret(&ctx, Secret::new(uid, SecretType::Binary, vec![0; 4], ""))
        .await
        .unwrap();

    let err = store.get_secret(&ctx, uid, short.id).await.unwrap_err();
    assert!(matches!(err, StoreError::Decryption { .. }));
}

#[tokio::test]
async fn one_bad_entry_fails_the_whole_list() {
    let raw = Arc::new(MemoryStore::new());
    let store = EncryptedStore::new(raw.clone(), Some("K"));
    let ctx = Context::background();
    let uid = user(&store, "alice").await;

    store
        .create_secret(&ctx, Secret::new(uid, SecretType::Text, "good", ""))
        .await
        .unwrap();
    let plain = raw
        .create_secret(&ctx, Secret::new(uid, SecretType::Text, "written without key", ""))
        .await
        .unwrap();

    let err = store.list_secrets(&ctx, uid).await.unwrap_err();
    assert!(matches!(err, StoreError::Decryption { secret_id } if secret_id == plain.id));
}

#[tokio::test]
async fn update_re_encrypts_payload() {
    let raw = Arc::new(MemoryStore::new());
    let store = EncryptedStore::new(raw.clone(), Some("K"));
    let ctx = Context::background();
    let uid = user(&store, "alice").await;

    let s = store
        .create_secret(&ctx, Secret::new(uid, SecretType::Text, "v1", "m"))
        .await
        .unwrap();
    let updated = store
        .update_secret(
            &ctx,
            Secret {
                data: b"v2".to_vec(),
                ..s.clone()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.data, b"v2");

    assert_ne!(raw.get_secret(&ctx, uid, s.id).await.unwrap().data, b"v2");
    assert_eq!(store.get_secret(&ctx, uid, s.id).await.unwrap().data, b"v2");
}

#[tokio::test]
async fn decorators_stack() {
    let raw: Arc<dyn SecretStore> = Arc::new(MemoryStore::new());
    let inner: Arc<dyn SecretStore> = Arc::new(EncryptedStore::new(raw.clone(), Some("inner")));
    let outer = EncryptedStore::new(inner.clone(), Some("outer"));
    let ctx = Context::background();
    let uid = user(&outer, "alice").await;

    let s = outer
        .create_secret(&ctx, Secret::new(uid, SecretType::Text, "layered", ""))
        .await
        .unwrap();

    assert_eq!(outer.get_secret(&ctx, uid, s.id).await.unwrap().data, b"layered");
    assert_ne!(inner.get_secret(&ctx, uid, s.id).await.unwrap().data, b"layered");
    // Two envelopes: 2 * (nonce + tag) of overhead.
    let at_rest = raw.get_secret(&ctx, uid, s.id).await.unwrap().data;
    assert_eq!(at_rest.len(), "layered".len() + 2 * (12 + 16));
}

#[tokio::test]
async fn user_records_pass_through_untouched() {
    let raw = Arc::new(MemoryStore::new());
    let store = EncryptedStore::new(raw.clone(), Some("K"));
    let ctx = Context::background();

    store.create_user(&ctx, "alice", "$argon2id$stub").await.unwrap();
    let at_rest = raw.get_user_by_login(&ctx, "alice").await.unwrap();
    assert_eq!(at_rest.password_hash, "$argon2id$stub");
}
