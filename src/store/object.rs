//! Object store clients — filesystem and path-style HTTP.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::error::FetchError;
use crate::store::traits::ObjectStore;

/// Objects stored as `<root>/<container>/<key>` on the local filesystem.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a container/key pair under the root. Absolute paths and `..`
    /// components are rejected.
    pub fn resolve_path(&self, container: &str, key: &str) -> Result<PathBuf, FetchError> {
        for part in [container, key] {
            if part.is_empty() || !is_relative_and_contained(Path::new(part)) {
                return Err(FetchError::InvalidKey(format!("{container}/{key}")));
            }
        }
        Ok(self.root.join(container).join(key))
    }
}

fn is_relative_and_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn get(&self, container: &str, key: &str) -> Result<Vec<u8>, FetchError> {
        let path = self.resolve_path(container, key)?;
        debug!(path = %path.display(), "Reading object from filesystem");
        fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => FetchError::NotFound {
                container: container.to_string(),
                key: key.to_string(),
            },
            _ => FetchError::Io(e),
        })
    }
}

/// Objects fetched with `GET <endpoint>/<container>/<key>` (path-style addressing,
/// e.g. a MinIO or gateway endpoint that authorizes the relay by network).
pub struct HttpObjectStore {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpObjectStore {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(endpoint, reqwest::Client::new())
    }

    pub fn with_client(endpoint: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Build the object URL, percent-encoding each key segment.
    pub fn object_url(&self, container: &str, key: &str) -> String {
        let encoded_key = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}/{}/{}",
            self.endpoint,
            urlencoding::encode(container),
            encoded_key
        )
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    fn name(&self) -> &str {
        "http"
    }

    async fn get(&self, container: &str, key: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.object_url(container, key);
        debug!(url = %url, "Fetching object over HTTP");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Http(format!("GET {url} failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                container: container.to_string(),
                key: key.to_string(),
            });
        }

        let response = response
            .error_for_status()
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Http(format!("Failed to read body of {url}: {e}")))?;

        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn fs_store_reads_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bucket/incoming/msg-1");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"Subject: hi\r\n\r\nbody").unwrap();

        let store = FsObjectStore::new(dir.path());
        let bytes = store.get("bucket", "incoming/msg-1").await.unwrap();
        assert_eq!(bytes, b"Subject: hi\r\n\r\nbody");
    }

    #[tokio::test]
    async fn fs_store_missing_object_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(dir.path());
        let err = store.get("bucket", "incoming/nope").await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound { .. }));
    }

    #[test]
    fn fs_store_rejects_traversal() {
        let store = FsObjectStore::new("/srv/objects");
        assert!(matches!(
            store.resolve_path("bucket", "../../etc/passwd"),
            Err(FetchError::InvalidKey(_))
        ));
        assert!(matches!(
            store.resolve_path("bucket", "/etc/passwd"),
            Err(FetchError::InvalidKey(_))
        ));
        assert!(matches!(
            store.resolve_path("", "incoming/a"),
            Err(FetchError::InvalidKey(_))
        ));
    }

    #[test]
    fn fs_store_resolves_nested_key() {
        let store = FsObjectStore::new("/srv/objects");
        assert_eq!(
            store.resolve_path("bucket", "incoming/a b").unwrap(),
            PathBuf::from("/srv/objects/bucket/incoming/a b")
        );
    }

    #[test]
    fn http_store_encodes_key_segments() {
        let store = HttpObjectStore::new("http://minio:9000/");
        assert_eq!(
            store.object_url("chirpy-robin-emails", "incoming/a b+c"),
            "http://minio:9000/chirpy-robin-emails/incoming/a%20b%2Bc"
        );
    }
}
