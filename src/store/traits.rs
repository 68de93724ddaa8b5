//! Storage traits — the relay's read-only view of its external collaborators.

use async_trait::async_trait;

use crate::error::{DirectoryError, FetchError};

/// Read-only object storage holding raw inbound messages.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Fetch the full object body at `container`/`key`.
    async fn get(&self, container: &str, key: &str) -> Result<Vec<u8>, FetchError>;
}

/// Read-only parameter store holding serialized subscriber lists.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Fetch the raw (decrypted) value of a parameter.
    async fn get_parameter(&self, name: &str) -> Result<String, DirectoryError>;
}
