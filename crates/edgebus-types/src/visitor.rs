//! Visitor identity attached to every dispatched message event.

use serde::{Deserialize, Serialize};

/// The visitor (browser session) a bus instance acts on behalf of.
///
/// The id comes from the session cookie. When the cookie is missing the id is
/// an empty string rather than an error, so local development without an edge
/// in front still works.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Visitor {
    pub id: String,
}

impl Visitor {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Whether the visitor could not be identified.
    pub fn is_anonymous(&self) -> bool {
        self.id.is_empty()
    }
}
