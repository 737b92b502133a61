//! The environment a session manager runs in: id generation and cookies

use satchel_core::SessionId;
use tracing::debug;

/// Session cookie attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieParams {
    /// Cookie lifetime in seconds, 0 means "until the browser closes"
    pub lifetime: u64,
    pub path: String,
    pub domain: String,
    pub secure: bool,
    pub http_only: bool,
}

impl Default for CookieParams {
    fn default() -> Self {
        Self {
            lifetime: 0,
            path: "/".to_string(),
            domain: String::new(),
            secure: false,
            http_only: false,
        }
    }
}

/// Collaborator that owns session identifiers and the cookie transport
pub trait SessionHost: Send + Sync {
    /// Produce a fresh, unguessable session id
    fn generate_id(&self) -> SessionId;

    /// Instruct the client to drop the session cookie
    fn expire_cookie(&self, name: &str, params: &CookieParams);
}

/// Host used when the caller does not provide one
///
/// Ids are UUID v4 rendered as 32 lowercase hex characters. There is no
/// transport, so cookie expiry is only logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSessionHost;

impl SessionHost for DefaultSessionHost {
    fn generate_id(&self) -> SessionId {
        SessionId::from(uuid::Uuid::new_v4())
    }

    fn expire_cookie(&self, name: &str, params: &CookieParams) {
        debug!(
            "Expiring session cookie {} (path={}, domain={:?})",
            name, params.path, params.domain
        );
    }
}
