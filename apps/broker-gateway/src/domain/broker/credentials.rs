//! Opaque credential blobs.
//!
//! The gateway never interprets credential contents; only the adapter for the
//! matching vendor reads the fields it expects. Keeping the blob generic means
//! the connection store needs no vendor-specific schema.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Vendor credentials as an uninterpreted key-value map.
///
/// `Debug` output is redacted so credentials cannot leak through logs.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials(HashMap<String, String>);

impl Credentials {
    /// Create an empty credential blob.
    #[must_use]
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Insert a field, returning self for chained construction.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Look up a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Look up a required field, naming it in the error.
    ///
    /// Adapters use this to type-assert the fields their vendor expects.
    pub fn require(&self, key: &str) -> Result<&str, MissingCredential> {
        self.get(key).ok_or(MissingCredential(key.to_string()))
    }

    /// Number of fields in the blob.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the blob is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credentials({} fields redacted)", self.0.len())
    }
}

impl From<HashMap<String, String>> for Credentials {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

/// A credential field the vendor adapter expected was absent.
#[derive(Debug, Clone, thiserror::Error)]
#[error("missing credential field: {0}")]
pub struct MissingCredential(pub String);
