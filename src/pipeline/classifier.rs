//! Recipient classifier — maps a recipient address to a known list.

use crate::pipeline::types::ListName;

/// Matches the local part of recipient addresses against known list names.
#[derive(Debug, Clone)]
pub struct RecipientClassifier {
    lists: Vec<String>,
}

impl RecipientClassifier {
    /// Create a classifier for the given list names (case-insensitive).
    pub fn new<I, S>(lists: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            lists: lists
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Return the list named by the address's local part, if any.
    ///
    /// The domain is ignored: `Alerts@anywhere` classifies as `alerts`.
    pub fn classify(&self, address: &str) -> Option<ListName> {
        let local = address.split('@').next().unwrap_or_default().to_lowercase();
        self.lists
            .iter()
            .find(|name| **name == local)
            .map(|name| ListName::new(name.clone()))
    }
}

impl Default for RecipientClassifier {
    fn default() -> Self {
        Self::new(["alerts", "info"])
    }
}
