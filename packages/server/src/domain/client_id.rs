//! Connection identifier.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Errors raised when constructing a [`ClientId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientIdError {
    #[error("client id must not be empty")]
    Empty,
}

/// Opaque identifier of one connected client.
///
/// The hub keys its registry by this value, so it must be unique per
/// connection. Ids minted by [`ClientId::generate`] are UUID v4 strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(value: String) -> Result<Self, ClientIdError> {
        if value.trim().is_empty() {
            return Err(ClientIdError::Empty);
        }
        Ok(Self(value))
    }

    /// Mint a fresh id for a newly upgraded connection.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for ClientId {
    type Error = ClientIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
