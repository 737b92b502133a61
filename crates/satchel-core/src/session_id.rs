//! Session identifier type

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Maximum length of a session id, matching the width of the relational
/// `session` column.
pub const MAX_SESSION_ID_LEN: usize = 255;

/// Opaque, caller-supplied identifier naming one session's record.
///
/// Only `[A-Za-z0-9,-]` is accepted, so an id can be embedded directly in a
/// file name or bound as a SQL parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Parse and validate a session id
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();

        if id.is_empty() {
            return Err(Error::InvalidSessionId("session id is empty".to_string()));
        }

        if id.len() > MAX_SESSION_ID_LEN {
            return Err(Error::InvalidSessionId(format!(
                "session id is {} bytes, maximum is {}",
                id.len(),
                MAX_SESSION_ID_LEN
            )));
        }

        if let Some(bad) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == ',' || *c == '-'))
        {
            return Err(Error::InvalidSessionId(format!(
                "session id contains invalid character {:?}",
                bad
            )));
        }

        Ok(Self(id))
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for SessionId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<uuid::Uuid> for SessionId {
    /// Render as 32 lowercase hex characters, always a valid id
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid.simple().to_string())
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
