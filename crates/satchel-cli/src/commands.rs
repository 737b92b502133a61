//! Subcommand implementations, kept free of printing so they can be tested

use anyhow::Context;
use serde_json::Value;
use std::sync::Arc;

use satchel_core::{GcStats, SessionId, SessionStore};
use satchel_session::{Attributes, SessionManager, SessionOptions, attributes};

/// Where commands find their sessions
pub struct Target {
    pub store: Arc<dyn SessionStore>,
    pub save_path: String,
    pub namespace: String,
}

impl Target {
    async fn open(&self) -> anyhow::Result<()> {
        self.store
            .open(&self.save_path, &self.namespace)
            .await
            .with_context(|| format!("opening session store for {}", self.namespace))
    }

    fn manager(&self, id: SessionId) -> anyhow::Result<SessionManager> {
        // Maintenance commands never trigger a probabilistic sweep
        let options = SessionOptions::new()
            .with("save_path", self.save_path.clone())
            .with("gc_probability", "0")
            .with("use_cookies", "0");

        let mut manager =
            SessionManager::new(self.store.clone(), options).with_name(self.namespace.clone());
        manager.set_id(id)?;
        Ok(manager)
    }
}

pub async fn gc(target: &Target, max_lifetime: u64) -> anyhow::Result<GcStats> {
    target.open().await?;
    let stats = target.store.gc(max_lifetime).await?;
    target.store.close().await?;
    Ok(stats)
}

pub async fn show(target: &Target, id: SessionId) -> anyhow::Result<Attributes> {
    target.open().await?;
    let blob = target.store.read(&id).await?;
    target.store.close().await?;

    attributes::decode(&blob).with_context(|| format!("decoding session {}", id))
}

pub async fn get(target: &Target, id: SessionId, key: &str) -> anyhow::Result<Value> {
    let mut manager = target.manager(id)?;
    manager.start().await?;
    Ok(manager.get(key, Value::Null))
}

pub async fn set(target: &Target, id: SessionId, key: &str, raw: &str) -> anyhow::Result<()> {
    let value: Value =
        serde_json::from_str(raw).with_context(|| format!("value for {} is not valid JSON", key))?;

    let mut manager = target.manager(id)?;
    manager.start().await?;
    manager.set(key, &value).await?;
    manager.save().await?;
    Ok(())
}

pub async fn destroy(target: &Target, id: SessionId) -> anyhow::Result<()> {
    target.open().await?;
    target.store.destroy(&id).await?;
    target.store.close().await?;
    Ok(())
}
