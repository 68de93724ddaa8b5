//! End-to-end tests for the relay webhook.
//!
//! Each test spins up an Axum server on a random port backed by filesystem
//! object and parameter stores plus an `.eml` outbox, posts a bucket
//! notification with reqwest, and inspects what landed in the outbox.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

use robin_relay::config::{ObjectStoreConfig, RelayConfig, TransportConfig};
use robin_relay::pipeline::{IntakeController, IntakeDeps};
use robin_relay::routes::relay_routes;

const BUCKET: &str = "chirpy-robin-emails";

struct Harness {
    port: u16,
    dir: TempDir,
}

impl Harness {
    fn objects(&self) -> PathBuf {
        self.dir.path().join("objects")
    }

    fn outbox(&self) -> PathBuf {
        self.dir.path().join("outbox")
    }

    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    fn store_message(&self, key: &str, raw: &str) {
        let path = self.objects().join(BUCKET).join(key);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, raw).unwrap();
    }

    fn outbox_messages(&self) -> Vec<String> {
        eml_files(&self.outbox())
            .iter()
            .map(|p| std::fs::read_to_string(p).unwrap())
            .collect()
    }

    async fn post_event(&self, keys: &[&str]) -> (u16, Value) {
        let records: Vec<Value> = keys
            .iter()
            .map(|key| {
                json!({
                    "eventSource": "aws:s3",
                    "eventName": "ObjectCreated:Put",
                    "s3": { "bucket": { "name": BUCKET }, "object": { "key": key } }
                })
            })
            .collect();
        let response = reqwest::Client::new()
            .post(self.url("/events"))
            .json(&json!({ "Records": records }))
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }
}

fn eml_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "eml"))
        .collect()
}

/// Start the relay on a random port with `lists` subscriber JSON per list.
async fn start_server(lists: &[(&str, &str)]) -> Harness {
    let dir = TempDir::new().unwrap();
    let params = dir.path().join("params");
    for (list, subscribers) in lists {
        let path = params.join("robin/lists").join(list);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, subscribers).unwrap();
    }

    let config = RelayConfig {
        parameter_root: params,
        object_store: ObjectStoreConfig::Filesystem {
            root: dir.path().join("objects"),
        },
        transport: TransportConfig::Outbox {
            dir: dir.path().join("outbox"),
        },
        ..RelayConfig::default()
    };
    let deps = IntakeDeps::from_config(&config).unwrap();
    let controller = IntakeController::new(&config, deps).unwrap();
    let app = relay_routes(Arc::new(controller));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    Harness { port, dir }
}

#[tokio::test]
async fn health_endpoint() {
    let harness = start_server(&[]).await;
    let body: Value = reqwest::get(harness.url("/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn forwards_to_known_list_only() {
    let harness = start_server(&[("info", r#"["s1@y.com", "s2@y.com"]"#)]).await;
    harness.store_message(
        "incoming/m1",
        "From: Alice <a@x.com>\r\n\
         To: info@chirpy.studio, unknown@chirpy.studio\r\n\
         Subject: Test\r\n\
         Date: Wed, 01 May 2024 12:00:00 +0000\r\n\
         Message-ID: <m1@x.com>\r\n\
         \r\n\
         Hello\r\n",
    );

    let (status, body) = harness.post_event(&["incoming/m1"]).await;
    assert_eq!(status, 200);
    assert_eq!(body["statusCode"], 200);

    let sent = harness.outbox_messages();
    assert_eq!(sent.len(), 1);
    let message = &sent[0];
    assert!(message.contains("Subject: [info@chirpy.studio] Test"));
    assert!(message.contains("<noreply@chirpy.studio>"));
    assert!(message.contains("Reply-To: Alice <a@x.com>"));
    assert!(message.contains("s1@y.com"));
    assert!(message.contains("s2@y.com"));
    assert!(message.contains("---------- Forwarded message ----------"));
    assert!(message.contains("From: Alice <a@x.com>"));
    assert!(message.contains("Hello"));
}

#[tokio::test]
async fn one_forward_per_matching_list() {
    let harness = start_server(&[
        ("alerts", r#"["ops@y.com"]"#),
        ("info", r#"["s1@y.com"]"#),
    ])
    .await;
    harness.store_message(
        "incoming/both",
        "From: a@x.com\r\nTo: alerts@chirpy.studio, INFO@chirpy.studio\r\nSubject: Both\r\n\r\nbody\r\n",
    );

    let (status, _) = harness.post_event(&["incoming/both"]).await;
    assert_eq!(status, 200);

    let sent = harness.outbox_messages();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().any(|m| m.contains("[alerts@chirpy.studio] Both")));
    assert!(sent.iter().any(|m| m.contains("[INFO@chirpy.studio] Both")));
}

#[tokio::test]
async fn list_without_parameter_sends_nothing() {
    let harness = start_server(&[]).await;
    harness.store_message(
        "incoming/m1",
        "From: a@x.com\r\nTo: alerts@chirpy.studio\r\nSubject: x\r\n\r\nbody\r\n",
    );

    let (status, body) = harness.post_event(&["incoming/m1"]).await;
    assert_eq!(status, 200);
    assert_eq!(body["body"], "OK");
    assert!(harness.outbox_messages().is_empty());
}

#[tokio::test]
async fn missing_object_reports_failure_and_continues() {
    let harness = start_server(&[("info", r#"["s1@y.com"]"#)]).await;
    harness.store_message(
        "incoming/present",
        "From: a@x.com\r\nTo: info@chirpy.studio\r\nSubject: x\r\n\r\nbody\r\n",
    );

    let (status, body) = harness
        .post_event(&["incoming/absent", "incoming/present"])
        .await;
    assert_eq!(status, 500);
    assert_eq!(body["statusCode"], 500);
    assert!(body["body"].as_str().unwrap().contains("incoming/absent"));
    assert_eq!(harness.outbox_messages().len(), 1);
}

#[tokio::test]
async fn encoded_key_is_decoded() {
    let harness = start_server(&[("info", r#"["s1@y.com"]"#)]).await;
    harness.store_message(
        "incoming/weekly digest",
        "From: a@x.com\r\nTo: info@chirpy.studio\r\nSubject: Digest\r\n\r\nbody\r\n",
    );

    let (status, _) = harness.post_event(&["incoming/weekly+digest"]).await;
    assert_eq!(status, 200);
    assert_eq!(harness.outbox_messages().len(), 1);
}
