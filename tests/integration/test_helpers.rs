//! Shared helpers for HTTP-level integration tests.
//!
//! These tests exercise the full router over real sockets with a lazy
//! database pool that is never connected: every covered path either stops
//! before the repository (auth, validation) or degrades without touching
//! the database (asset uploads with no API key). Paths that do reach the
//! repository fail fast against the unreachable database and surface as
//! opaque server errors.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use recordkeeper::api::{self, AppState};
use recordkeeper::config::GlobalConfig;
use recordkeeper::persistence::db;
use recordkeeper::persistence::executor::{Executor, RetryPolicy};
use recordkeeper::persistence::person_repo::PersonRepo;
use recordkeeper::upload::UploadClient;

pub const TEST_PASSWORD: &str = "correct horse battery staple";

/// Minimal config for HTTP tests: loopback listener, an unreachable
/// database, no upload API key.
pub fn test_config(http_port: u16) -> GlobalConfig {
    let toml = r#"
http_host = "127.0.0.1"

[database]
host = "127.0.0.1"
port = 1
user = "unused"
database = "unused"
ssl_mode = "disable"
max_connections = 2
"#;
    let mut config = GlobalConfig::from_toml_str(toml).expect("valid test config");
    config.http_port = http_port;
    config.web_password = TEST_PASSWORD.into();
    config
}

/// Build an `AppState` over a lazy pool with a single-attempt retry policy
/// so paths that do reach the database fail fast instead of retrying.
pub fn test_state(config: GlobalConfig) -> AppState {
    let pool = db::connect_lazy(&config.database).expect("lazy pool");
    let executor = Executor::new(
        pool,
        RetryPolicy {
            max_attempts: 1,
            delay: Duration::from_millis(1),
        },
    );
    let uploader = UploadClient::new(config.upload.clone());
    AppState {
        config: Arc::new(config),
        repo: PersonRepo::new(executor),
        uploader,
    }
}

/// Spawn the API server on an ephemeral port, returning the base URL.
///
/// Caller must cancel `ct` to shut the server down.
pub async fn spawn_server() -> (String, CancellationToken) {
    // Bind a throwaway listener to discover a free port, then release it
    // for the server to claim.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);

    let state = test_state(test_config(port));
    let ct = CancellationToken::new();

    let server_ct = ct.clone();
    tokio::spawn(async move {
        let _ = api::serve(state, server_ct).await;
    });

    // Give the server a moment to bind.
    tokio::time::sleep(Duration::from_millis(200)).await;

    (format!("http://127.0.0.1:{port}"), ct)
}

/// A draft payload that passes mandatory-field validation.
pub fn valid_draft_json() -> serde_json::Value {
    serde_json::json!({
        "full_name": "Alice Roy",
        "father_name": "Arun Roy",
        "mother_name": "Mita Roy",
        "date_of_birth": "1990-04-21",
        "gender": "female",
        "national_id": "1990123456789",
        "permanent_address": "12 Lake Road, Khulna",
        "present_address": "78 Green Street, Dhaka"
    })
}
