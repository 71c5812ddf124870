//! Integration tests for end-to-end encrypted workspaces.
//!
//! The mock service holds a project key sealed under the workspace token's
//! secret segment, the way a real service token is issued.

use keysmith_client::{
    CreateSecretOptions, KeysmithClient, KeysmithError, RetrieveSecretOptions, SecretType,
    UpdateSecretOptions, WorkspaceId, WorkspaceToken,
};
use keysmith_core::crypto::seal_project_key;
use keysmith_core::{ProjectKey, SecretCodec, SecretField};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const WORKSPACE: &str = "6512a9f0c3";
const TOKEN: &str = "st.6512a9f0c3.0123456789abcdef0123456789abcdef";

fn service_token(key: &ProjectKey, sealing_token: &str) -> ResponseTemplate {
    let sealed = seal_project_key(sealing_token, key).unwrap();
    ResponseTemplate::new(200).set_body_json(json!({
        "_id": "st-1",
        "name": "ci",
        "workspace": WORKSPACE,
        "environment": "dev",
        "encryptedKey": sealed.ciphertext,
        "iv": sealed.iv,
        "tag": sealed.tag
    }))
}

async fn mount_service_token(server: &MockServer, key: &ProjectKey, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/api/v2/service-token/"))
        .and(header("Authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(service_token(key, TOKEN))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn client(server: &MockServer, with_api_key: bool) -> KeysmithClient {
    let mut builder = KeysmithClient::builder()
        .workspace_token(WORKSPACE, WorkspaceToken::e2ee(TOKEN))
        .base_url(format!("{}/api", server.uri()));
    if with_api_key {
        builder = builder.api_key("ak-1");
    }
    builder.build().unwrap()
}

/// A stored secret as the service would return it.
fn sealed_secret(key: &ProjectKey, name: &str, value: &str, secret_type: &str) -> Value {
    let codec = SecretCodec::new(key, WORKSPACE);
    let k = codec.seal(SecretField::Key, name).unwrap();
    let v = codec.seal(SecretField::Value, value).unwrap();
    json!({
        "_id": format!("id-{}", name),
        "version": 1,
        "workspace": WORKSPACE,
        "type": secret_type,
        "environment": "dev",
        "secretKeyCiphertext": k.ciphertext,
        "secretKeyIV": k.iv,
        "secretKeyTag": k.tag,
        "secretValueCiphertext": v.ciphertext,
        "secretValueIV": v.iv,
        "secretValueTag": v.tag
    })
}

#[tokio::test]
async fn test_create_then_retrieve_roundtrip() {
    let server = MockServer::start().await;
    let key = ProjectKey::generate();
    mount_service_token(&server, &key, 1).await;

    Mock::given(method("POST"))
        .and(path("/api/v3/secrets/API_TOKEN"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, true);
    let workspace = WorkspaceId::new(WORKSPACE);

    client
        .create_secret(
            "API_TOKEN",
            &workspace,
            "dev",
            "secret123",
            &CreateSecretOptions::new().with_comment("rotated monthly"),
        )
        .await
        .unwrap();

    // Serve back exactly what was stored.
    let requests = server.received_requests().await.unwrap();
    let create = requests
        .iter()
        .find(|r| r.method.as_str() == "POST")
        .unwrap();
    let mut stored: Value = create.body_json().unwrap();
    assert!(stored.get("secretValue").is_none());
    assert!(stored.get("secretComment").is_none());
    assert_ne!(stored["secretValueCiphertext"], json!("secret123"));
    stored["_id"] = json!("s-1");
    stored["workspace"] = json!(WORKSPACE);

    Mock::given(method("GET"))
        .and(path("/api/v3/secrets/API_TOKEN"))
        .and(header("X-API-KEY", "ak-1"))
        .and(header("Authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "secret": stored })))
        .expect(1)
        .mount(&server)
        .await;

    let secret = client
        .retrieve_secret(
            "API_TOKEN",
            &workspace,
            "dev",
            &RetrieveSecretOptions::new().with_type(SecretType::Shared),
        )
        .await
        .unwrap();

    assert_eq!(secret.key, "API_TOKEN");
    assert_eq!(secret.value.expose(), "secret123");
    assert_eq!(secret.comment.as_deref(), Some("rotated monthly"));
}

#[tokio::test]
async fn test_list_decrypts_every_secret_with_one_key_fetch() {
    let server = MockServer::start().await;
    let key = ProjectKey::generate();
    mount_service_token(&server, &key, 1).await;

    Mock::given(method("GET"))
        .and(path("/api/v3/secrets/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "secrets": [
                sealed_secret(&key, "A", "1", "shared"),
                sealed_secret(&key, "B", "2", "personal")
            ]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server, false);
    let workspace = WorkspaceId::new(WORKSPACE);

    for _ in 0..2 {
        let secrets = client
            .retrieve_secrets_at_path("/", &workspace, "dev")
            .await
            .unwrap();
        let pairs: Vec<_> = secrets
            .iter()
            .map(|s| (s.key.as_str(), s.value.expose(), s.secret_type))
            .collect();
        assert_eq!(
            pairs,
            vec![("A", "1", SecretType::Shared), ("B", "2", SecretType::Personal)]
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_use_fetches_project_key_once() {
    let server = MockServer::start().await;
    let key = ProjectKey::generate();

    // Slow enough that every caller arrives while the first fetch is in flight.
    Mock::given(method("GET"))
        .and(path("/api/v2/service-token/"))
        .respond_with(service_token(&key, TOKEN).set_delay(Duration::from_millis(200)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v3/secrets/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "secrets": [sealed_secret(&key, "A", "1", "shared")]
        })))
        .expect(8)
        .mount(&server)
        .await;

    let client = Arc::new(client(&server, false));
    let workspace = WorkspaceId::new(WORKSPACE);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = Arc::clone(&client);
        let workspace = workspace.clone();
        handles.push(tokio::spawn(async move {
            client
                .retrieve_secrets_at_path("/", &workspace, "dev")
                .await
        }));
    }

    for handle in handles {
        let secrets = handle.await.unwrap().unwrap();
        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets[0].value.expose(), "1");
    }
}

#[tokio::test]
async fn test_value_falls_back_to_listing_without_api_key() {
    let server = MockServer::start().await;
    let key = ProjectKey::generate();
    mount_service_token(&server, &key, 1).await;

    Mock::given(method("GET"))
        .and(path("/api/v3/secrets/DB_PASSWORD"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v3/secrets/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "secrets": [
                sealed_secret(&key, "DB_PASSWORD", "shared-pw", "shared"),
                sealed_secret(&key, "DB_PASSWORD", "my-pw", "personal")
            ]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server, false);
    let workspace = WorkspaceId::new(WORKSPACE);

    let value = client
        .retrieve_secret_value("/db/DB_PASSWORD", &workspace, "dev", SecretType::Personal)
        .await
        .unwrap();
    assert_eq!(value.expose(), "my-pw");

    let err = client
        .retrieve_secret_value("/db/MISSING", &workspace, "dev", SecretType::Shared)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_update_seals_value_and_keeps_key_in_path() {
    let server = MockServer::start().await;
    let key = ProjectKey::generate();
    mount_service_token(&server, &key, 1).await;

    Mock::given(method("PATCH"))
        .and(path("/api/v3/secrets/API_TOKEN"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, false);
    client
        .update_secret(
            "API_TOKEN",
            &WorkspaceId::new(WORKSPACE),
            "dev",
            "rotated",
            &UpdateSecretOptions::new().with_path("/app"),
        )
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let update = requests
        .iter()
        .find(|r| r.method.as_str() == "PATCH")
        .unwrap();
    let body: Value = update.body_json().unwrap();
    assert_eq!(body["secretPath"], "/app");
    assert!(body.get("secretKeyCiphertext").is_none());

    let sealed = keysmith_core::SealedField {
        ciphertext: body["secretValueCiphertext"].as_str().unwrap().to_string(),
        iv: body["secretValueIV"].as_str().unwrap().to_string(),
        tag: body["secretValueTag"].as_str().unwrap().to_string(),
    };
    let opened = SecretCodec::new(&key, WORKSPACE)
        .open(SecretField::Value, &sealed)
        .unwrap();
    assert_eq!(opened, "rotated");
}

#[tokio::test]
async fn test_wrong_token_secret_fails_project_key() {
    let server = MockServer::start().await;
    let key = ProjectKey::generate();

    Mock::given(method("GET"))
        .and(path("/api/v2/service-token/"))
        .respond_with(service_token(&key, "st.other.ffffffffffffffffffffffffffffffff"))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/secrets/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "secrets": [] })))
        .mount(&server)
        .await;

    let client = client(&server, false);
    let workspace = WorkspaceId::new(WORKSPACE);

    // Failures are not cached; each attempt fetches the metadata again.
    for _ in 0..2 {
        let err = client
            .retrieve_secrets_at_path("/", &workspace, "dev")
            .await
            .unwrap_err();
        match err {
            KeysmithError::ProjectKeyDecryptionFailed { workspace, .. } => {
                assert_eq!(workspace, WORKSPACE)
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[tokio::test]
async fn test_incomplete_service_token_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/service-token/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "st-1",
            "workspace": WORKSPACE,
            "encryptedKey": "Y2lwaGVy",
            "tag": "dGFn"
        })))
        .mount(&server)
        .await;

    let client = client(&server, true);
    let err = client
        .create_secret(
            "KEY",
            &WorkspaceId::new(WORKSPACE),
            "dev",
            "value",
            &CreateSecretOptions::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, KeysmithError::MalformedServiceToken { field: "iv" }));
}

#[tokio::test]
async fn test_tampered_secret_is_never_returned() {
    let server = MockServer::start().await;
    let key = ProjectKey::generate();
    mount_service_token(&server, &key, 1).await;

    let mut secret = sealed_secret(&key, "KEY", "value", "shared");
    secret["secretValueTag"] = json!("AAAAAAAAAAAAAAAAAAAAAA==");

    Mock::given(method("GET"))
        .and(path("/api/v3/secrets/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "secrets": [secret] })))
        .mount(&server)
        .await;

    let client = client(&server, false);
    let err = client
        .retrieve_secrets_at_path("/", &WorkspaceId::new(WORKSPACE), "dev")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        KeysmithError::DecryptionFailed { field: SecretField::Value, .. }
    ));
}
