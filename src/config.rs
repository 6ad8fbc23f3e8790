//! Adapter configuration.
//!
//! Mirrors the shape a host dependency-injection layer supplies: a server
//! url plus an opaque bag of connection options, both forwarded verbatim to
//! the transport factory. No validation happens here -- malformed values
//! surface from the transport itself.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::transport::ConnectOptions;

/// Connection configuration for a [`crate::WrappedSocket`].
///
/// The default is an empty url with no options, which is also what the
/// adapter uses when constructed without a configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocketConfig {
    /// Server url (e.g., "http://localhost:3000").
    #[serde(default)]
    pub url: String,

    /// Transport options, handed to the connection factory untouched.
    #[serde(default)]
    pub options: ConnectOptions,
}

impl SocketConfig {
    /// Create a configuration for the given url with no options.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            options: ConnectOptions::new(),
        }
    }

    /// Add a single transport option.
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}
