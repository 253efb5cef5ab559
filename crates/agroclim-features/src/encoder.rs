//! Append-only categorical encoding with a reserved unknown id.

use tracing::debug;

/// Sentinel category for values never seen during training.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Maps categorical values to stable integer ids.
///
/// Ids are assigned in first-seen order and never reassigned: re-fitting
/// with new categories only appends, so the numeric meaning of an id a
/// model trained against is immutable. The [`UNKNOWN_CATEGORY`] sentinel
/// is registered at construction with id 0, and every unseen value
/// encodes to it rather than erroring.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CategoryEncoder {
    categories: Vec<String>,
}

impl Default for CategoryEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryEncoder {
    /// An encoder holding only the unknown sentinel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            categories: vec![UNKNOWN_CATEGORY.to_string()],
        }
    }

    /// Register a value, returning its id. Known values keep their id;
    /// new values are appended.
    pub fn register(&mut self, value: &str) -> usize {
        if let Some(id) = self.id_of(value) {
            return id;
        }
        self.categories.push(value.to_string());
        let id = self.categories.len() - 1;
        debug!(value, id, "registered category");
        id
    }

    /// Register every distinct value in order of first appearance.
    pub fn fit<'a>(&mut self, values: impl IntoIterator<Item = &'a str>) {
        for value in values {
            self.register(value);
        }
    }

    /// Id for a value; unseen values encode to the unknown sentinel (0).
    #[must_use]
    pub fn encode(&self, value: &str) -> usize {
        self.id_of(value).unwrap_or(0)
    }

    /// Value for an id, if the id is in range.
    #[must_use]
    pub fn decode(&self, id: usize) -> Option<&str> {
        self.categories.get(id).map(String::as_str)
    }

    /// Registered categories in id order, sentinel first.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Number of registered categories, including the sentinel.
    #[must_use]
    pub fn n_categories(&self) -> usize {
        self.categories.len()
    }

    fn id_of(&self, value: &str) -> Option<usize> {
        self.categories.iter().position(|c| c == value)
    }
}
