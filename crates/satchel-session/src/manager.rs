//! SessionManager - the lifecycle and attribute API over a SessionStore

use rand::Rng;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use satchel_core::{Error, Result, SessionId, SessionStore, table::DEFAULT_SESSION_NAME};

use crate::attributes::{self, Attributes};
use crate::host::{CookieParams, DefaultSessionHost, SessionHost};
use crate::options::{SessionOptions, SessionSettings};

/// Explicit per-session state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub id: Option<SessionId>,
    pub attributes: Attributes,
    pub started: bool,
}

/// Drives one logical session: start, attribute access, save, destroy
///
/// A manager is not shared between tasks; every mutating method takes
/// `&mut self`. The store behind it is shared through an `Arc`.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    host: Arc<dyn SessionHost>,
    name: String,
    options: SessionOptions,
    settings: SessionSettings,
    cookie: CookieParams,
    state: SessionState,
    dirty: bool,
}

impl SessionManager {
    /// Create a manager with the default name and host
    pub fn new(store: Arc<dyn SessionStore>, options: SessionOptions) -> Self {
        Self {
            store,
            host: Arc::new(DefaultSessionHost),
            name: DEFAULT_SESSION_NAME.to_string(),
            options,
            settings: SessionSettings::default(),
            cookie: CookieParams::default(),
            state: SessionState::default(),
            dirty: false,
        }
    }

    /// Use a different session name (also the store namespace)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Use a custom host for id generation and cookie handling
    pub fn with_host(mut self, host: Arc<dyn SessionHost>) -> Self {
        self.host = host;
        self
    }

    /// Continue from a state taken with `into_state`
    ///
    /// A started state gets its settings from the options right away, so
    /// `save` and `destroy` reach the same store location as before.
    ///
    /// # Errors
    /// - `Error::StartFailed` if the state is started and the options cannot
    ///   be applied
    pub fn with_state(mut self, state: SessionState) -> Result<Self> {
        if state.started {
            let mut cookie = self.cookie.clone();
            self.settings =
                SessionSettings::from_options(&self.options, &mut cookie).map_err(start_failed)?;
            self.cookie = cookie;
        }
        self.state = state;
        self.dirty = false;
        Ok(self)
    }

    /// Start the session
    ///
    /// # Errors
    /// - `Error::AlreadyStarted` if the session is running
    /// - `Error::StartFailed` if options cannot be applied or the store cannot
    ///   be opened or read
    pub async fn start(&mut self) -> Result<()> {
        if self.state.started {
            return Err(Error::AlreadyStarted);
        }

        let mut cookie = self.cookie.clone();
        let settings =
            SessionSettings::from_options(&self.options, &mut cookie).map_err(start_failed)?;

        self.store
            .open(&settings.save_path, &self.name)
            .await
            .map_err(start_failed)?;

        // Expired records must be gone before the read can resurrect them
        self.maybe_collect_garbage(&settings).await;

        let id = match self.state.id.clone() {
            Some(id) => id,
            None => self.host.generate_id(),
        };

        let blob = self.store.read(&id).await.map_err(start_failed)?;
        let attributes = attributes::decode(&blob).map_err(start_failed)?;

        debug!(
            "Started session {} ({}) with {} attributes",
            self.name,
            id,
            attributes.len()
        );

        self.settings = settings;
        self.cookie = cookie;
        self.state = SessionState {
            id: Some(id),
            attributes,
            started: true,
        };
        self.dirty = false;
        Ok(())
    }

    async fn maybe_collect_garbage(&self, settings: &SessionSettings) {
        if settings.gc_divisor == 0 {
            return;
        }

        let roll = rand::rng().random_range(0..settings.gc_divisor);
        if !settings.gc_due(roll) {
            return;
        }

        match self.store.gc(settings.gc_maxlifetime).await {
            Ok(stats) => {
                if stats.removed > 0 || stats.failed > 0 {
                    info!(
                        "Session gc for {}: removed {}, failed {}",
                        self.name, stats.removed, stats.failed
                    );
                }
            }
            Err(e) => warn!("Session gc for {} failed: {}", self.name, e),
        }
    }

    /// Point the shared store back at this session's namespace
    async fn reopen(&self) -> Result<()> {
        self.store.open(&self.settings.save_path, &self.name).await
    }

    /// Store an attribute, starting the session if `auto_start` allows it
    pub async fn set<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<()> {
        let value = serde_json::to_value(value)?;

        if !self.state.started {
            // An unparsable flag falls through to start(), which reports it
            if matches!(self.options.auto_start(), Ok(false)) {
                return Err(Error::NotStarted);
            }
            self.start().await?;
        }

        self.state.attributes.insert(key.into(), value);
        self.dirty = true;
        Ok(())
    }

    /// Attribute value, or `default` when absent
    pub fn get(&self, key: &str, default: Value) -> Value {
        self.state.attributes.get(key).cloned().unwrap_or(default)
    }

    /// Attribute deserialized into `T`
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.state
            .attributes
            .get(key)
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()
            .map_err(Error::from)
    }

    pub fn has(&self, key: &str) -> bool {
        self.state.attributes.contains_key(key)
    }

    pub fn count(&self) -> usize {
        self.state.attributes.len()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.state.attributes
    }

    /// Remove an attribute, reporting whether it existed
    pub fn unset(&mut self, key: &str) -> bool {
        let removed = self.state.attributes.remove(key).is_some();
        self.dirty |= removed;
        removed
    }

    /// Drop every attribute in memory; the store is untouched until `save`
    pub fn clear(&mut self) {
        if !self.state.attributes.is_empty() {
            self.state.attributes.clear();
            self.dirty = true;
        }
    }

    /// Merge `values` into the attributes
    ///
    /// Nested objects merge recursively; every other value replaces the
    /// existing one.
    pub fn replace(&mut self, values: Attributes) {
        attributes::merge_replace(&mut self.state.attributes, values);
        self.dirty = true;
    }

    /// End the session and remove its record
    ///
    /// # Errors
    /// - `Error::NotStarted` if there is nothing to destroy
    /// - store errors from `destroy` or `close`
    pub async fn destroy(&mut self) -> Result<()> {
        if !self.state.started {
            return Err(Error::NotStarted);
        }

        self.state.attributes.clear();
        if self.settings.use_cookies {
            self.host.expire_cookie(&self.name, &self.cookie);
        }

        let id = self.state.id.take();
        self.state.started = false;
        self.dirty = false;

        self.reopen().await?;
        if let Some(id) = id {
            self.store.destroy(&id).await?;
            debug!("Destroyed session {} ({})", self.name, id);
        }
        self.store.close().await
    }

    /// Persist the attributes and close the store
    ///
    /// The session stays started, so later changes can be saved again.
    pub async fn save(&mut self) -> Result<()> {
        if !self.state.started {
            return Err(Error::NotStarted);
        }

        let id = self.state.id.clone().ok_or(Error::NotStarted)?;
        let blob = attributes::encode(&self.state.attributes)?;

        self.reopen().await?;
        self.store.write(&id, &blob).await?;
        self.dirty = false;
        self.store.close().await
    }

    /// Move the session to a fresh id
    ///
    /// Returns `Ok(false)` when no session is running. With `delete_old` the
    /// old record is removed immediately; the attributes land under the new
    /// id on the next `save`.
    pub async fn regenerate_id(&mut self, delete_old: bool) -> Result<bool> {
        if !self.state.started {
            return Ok(false);
        }

        let new_id = self.host.generate_id();
        if delete_old && let Some(old_id) = &self.state.id {
            self.reopen().await?;
            self.store.destroy(old_id).await?;
        }

        debug!("Regenerated session id for {}: {}", self.name, new_id);
        self.state.id = Some(new_id);
        self.dirty = true;
        Ok(true)
    }

    /// Current id, if one has been set or generated
    pub fn id(&self) -> Option<&SessionId> {
        self.state.id.as_ref()
    }

    /// Choose the id to resume; only allowed before `start`
    pub fn set_id(&mut self, id: SessionId) -> Result<()> {
        if self.state.started {
            return Err(Error::AlreadyStarted);
        }
        self.state.id = Some(id);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_started(&self) -> bool {
        self.state.started
    }

    /// Effective options, including pass-through entries
    pub fn options(&self) -> BTreeMap<String, String> {
        self.settings.to_map(&self.options, &self.cookie)
    }

    pub fn cookie_params(&self) -> &CookieParams {
        &self.cookie
    }

    pub fn set_cookie_params(&mut self, params: CookieParams) {
        self.cookie = params;
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Consume the manager, keeping its state
    pub fn into_state(mut self) -> SessionState {
        self.dirty = false;
        std::mem::take(&mut self.state)
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if self.state.started && self.dirty {
            warn!(
                "Session {} dropped with unsaved changes; call save() before dropping",
                self.name
            );
        }
    }
}

fn start_failed(e: Error) -> Error {
    Error::StartFailed(e.to_string())
}
