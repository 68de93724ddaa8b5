//! Subscriber directory — resolves a list to its current subscribers.
//!
//! Lists are stored as JSON arrays of addresses under `<namespace>/<list>`.
//! Every lookup goes to the parameter store; nothing is cached, so
//! membership changes apply to the very next message.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::DirectoryError;
use crate::pipeline::types::{ListName, SubscriberSet};
use crate::store::traits::ParameterStore;

pub struct SubscriberDirectory {
    store: Arc<dyn ParameterStore>,
    namespace: String,
}

impl SubscriberDirectory {
    pub fn new(store: Arc<dyn ParameterStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into().trim_end_matches('/').to_string(),
        }
    }

    /// Parameter name holding the given list.
    pub fn parameter_name(&self, list: &ListName) -> String {
        format!("{}/{}", self.namespace, list)
    }

    /// Resolve a list to its subscribers.
    ///
    /// Any failure (missing parameter, store error, undecodable value) is
    /// logged and degrades to an empty set.
    pub async fn lookup(&self, list: &ListName) -> SubscriberSet {
        match self.try_lookup(list).await {
            Ok(subscribers) => {
                debug!(list = %list, count = subscribers.len(), "Resolved subscribers");
                subscribers
            }
            Err(e) => {
                warn!(list = %list, error = %e, "Failed to get subscribers");
                SubscriberSet::default()
            }
        }
    }

    async fn try_lookup(&self, list: &ListName) -> Result<SubscriberSet, DirectoryError> {
        let name = self.parameter_name(list);
        let raw = self.store.get_parameter(&name).await?;
        decode_subscribers(&name, &raw)
    }
}

/// Decode a stored subscriber list (a JSON array of strings).
pub fn decode_subscribers(name: &str, raw: &str) -> Result<SubscriberSet, DirectoryError> {
    let addresses: Vec<String> =
        serde_json::from_str(raw).map_err(|e| DirectoryError::Decode {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

    Ok(addresses
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect::<Vec<_>>()
        .into())
}
