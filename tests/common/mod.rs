use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine as _;
use serde_json::json;
use tempfile::TempDir;
use wiremock::MockServer;

use cinearc::auth::storage::{MemoryStorage, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use cinearc::config::Config;
use cinearc::context::SessionContext;

/// Builds an unsigned `header.payload.signature` token carrying `exp` and a
/// `jti` so that tokens minted in the same second still differ.
#[allow(dead_code)]
pub fn make_token(exp: i64, jti: &str) -> String {
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let header = engine.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = engine.encode(
        json!({"exp": exp, "token_type": "access", "jti": jti}).to_string(),
    );
    format!("{header}.{payload}.signature")
}

/// A token that expires an hour from now.
#[allow(dead_code)]
pub fn valid_token(jti: &str) -> String {
    make_token(chrono::Utc::now().timestamp() + 3600, jti)
}

/// Configuration pointing at the mock backend.
#[allow(dead_code)]
pub fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.api.url = server.uri();
    config.api.timeout_seconds = 5;
    config
}

/// A context with an empty in-memory session.
#[allow(dead_code)]
pub fn anonymous_context(server: &MockServer) -> (SessionContext, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let ctx = SessionContext::with_storage(config_for(server), storage.clone())
        .expect("failed to build context");
    (ctx, storage)
}

/// A context rehydrated from storage holding `access` and, when given,
/// `refresh`.
#[allow(dead_code)]
pub fn seeded_context(
    server: &MockServer,
    access: &str,
    refresh: Option<&str>,
) -> (SessionContext, Arc<MemoryStorage>) {
    let mut entries = vec![(ACCESS_TOKEN_KEY, access)];
    if let Some(refresh) = refresh {
        entries.push((REFRESH_TOKEN_KEY, refresh));
    }
    let storage = Arc::new(MemoryStorage::with_entries(entries));
    let ctx = SessionContext::with_storage(config_for(server), storage.clone())
        .expect("failed to build context");
    (ctx, storage)
}

/// The backend's rejection body for an expired or malformed token.
#[allow(dead_code)]
pub fn token_not_valid_body() -> serde_json::Value {
    json!({
        "detail": "Given token not valid for any token type",
        "code": "token_not_valid",
        "messages": [{"token_class": "AccessToken", "token_type": "access", "message": "Token is invalid or expired"}]
    })
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
