//! End-to-end session persistence through real stores

use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;

use satchel_core::{Error, SessionStore};
use satchel_session::{SessionManager, SessionOptions};
use satchel_session_file::FileSessionStore;
use satchel_session_sqlite::SqliteSessionStore;

fn options_for(dir: &TempDir) -> SessionOptions {
    SessionOptions::new()
        .with("session.save_path", dir.path().to_string_lossy())
        .with("session.gc_probability", "0")
}

#[tokio::test]
async fn test_file_store_survives_new_manager() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new());

    let mut first = SessionManager::new(store.clone(), options_for(&dir));
    first.set("user", &42).await.unwrap();
    first.save().await.unwrap();
    let id = first.id().cloned().unwrap();

    assert!(dir.path().join(format!("sess_{}", id)).exists());

    let mut second = SessionManager::new(store, options_for(&dir));
    second.set_id(id).unwrap();
    second.start().await.unwrap();

    assert_eq!(second.get("user", Value::Null), json!(42));
}

#[tokio::test]
async fn test_file_store_destroy_removes_file() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new());

    let mut session = SessionManager::new(store.clone(), options_for(&dir));
    session.set("cart", &json!({"items": [1, 2]})).await.unwrap();
    session.save().await.unwrap();
    let id = session.id().cloned().unwrap();

    session.destroy().await.unwrap();
    assert!(!dir.path().join(format!("sess_{}", id)).exists());
    assert!(matches!(session.destroy().await, Err(Error::NotStarted)));

    // A fresh manager resuming the old id starts empty
    let mut resumed = SessionManager::new(store, options_for(&dir));
    resumed.set_id(id).unwrap();
    resumed.start().await.unwrap();
    assert_eq!(resumed.count(), 0);
}

#[tokio::test]
async fn test_sqlite_store_survives_new_manager() {
    let store: Arc<dyn SessionStore> = Arc::new(SqliteSessionStore::in_memory().await.unwrap());
    let options = SessionOptions::new().with("gc_probability", "0");

    let mut first = SessionManager::new(store.clone(), options.clone()).with_name("APP");
    first.set("user", &42).await.unwrap();
    first.save().await.unwrap();
    let id = first.id().cloned().unwrap();

    let mut other_name = SessionManager::new(store.clone(), options.clone()).with_name("OTHER");
    other_name.set_id(id.clone()).unwrap();
    other_name.start().await.unwrap();
    assert_eq!(other_name.count(), 0);

    let mut second = SessionManager::new(store, options).with_name("APP");
    second.set_id(id).unwrap();
    second.start().await.unwrap();
    assert_eq!(second.get_as::<u32>("user").unwrap(), Some(42));
}

#[tokio::test]
async fn test_corrupt_record_fails_start() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("sess_broken"), b"{not json").unwrap();

    let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new());
    let mut session = SessionManager::new(store, options_for(&dir));
    session
        .set_id(satchel_core::SessionId::new("broken").unwrap())
        .unwrap();

    assert!(matches!(session.start().await, Err(Error::StartFailed(_))));
}

#[tokio::test]
async fn test_start_collects_expired_record_before_reading() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sess_stale");
    std::fs::write(&path, br#"{"user":42}"#).unwrap();
    let long_ago = std::time::SystemTime::now() - std::time::Duration::from_secs(10_000);
    filetime::set_file_mtime(&path, filetime::FileTime::from_system_time(long_ago)).unwrap();

    let options = SessionOptions::new()
        .with("save_path", dir.path().to_string_lossy())
        .with("gc_probability", "1")
        .with("gc_divisor", "1")
        .with("gc_maxlifetime", "60");

    let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new());
    let mut session = SessionManager::new(store, options);
    session
        .set_id(satchel_core::SessionId::new("stale").unwrap())
        .unwrap();
    session.start().await.unwrap();

    assert!(!path.exists());
    assert_eq!(session.get("user", Value::Null), Value::Null);
    assert_eq!(session.count(), 0);

    // Saving the emptied session must not bring the old data back
    session.save().await.unwrap();
    let blob = std::fs::read(&path).unwrap();
    assert_eq!(serde_json::from_slice::<Value>(&blob).unwrap(), json!({}));
}

#[tokio::test]
async fn test_start_gc_keeps_fresh_records() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new());
    let options = SessionOptions::new()
        .with("save_path", dir.path().to_string_lossy())
        .with("gc_probability", "1")
        .with("gc_divisor", "1")
        .with("gc_maxlifetime", "3600");

    let mut first = SessionManager::new(store.clone(), options.clone());
    first.set("user", &42).await.unwrap();
    first.save().await.unwrap();
    let id = first.id().cloned().unwrap();

    let mut second = SessionManager::new(store, options);
    second.set_id(id).unwrap();
    second.start().await.unwrap();
    assert_eq!(second.get("user", Value::Null), json!(42));
}

#[tokio::test]
async fn test_interleaved_managers_keep_their_namespaces() {
    let store: Arc<dyn SessionStore> = Arc::new(SqliteSessionStore::in_memory().await.unwrap());
    let options = SessionOptions::new().with("gc_probability", "0");

    let mut app = SessionManager::new(store.clone(), options.clone()).with_name("APP");
    let mut other = SessionManager::new(store.clone(), options.clone()).with_name("OTHER");

    app.start().await.unwrap();
    other.start().await.unwrap();

    // OTHER opened the store last; APP still saves into its own namespace
    app.set("user", &42).await.unwrap();
    app.save().await.unwrap();
    other.set("user", &7).await.unwrap();
    other.save().await.unwrap();

    let app_id = app.id().cloned().unwrap();
    let other_id = other.id().cloned().unwrap();

    let mut resumed = SessionManager::new(store.clone(), options.clone()).with_name("APP");
    resumed.set_id(app_id.clone()).unwrap();
    resumed.start().await.unwrap();
    assert_eq!(resumed.get("user", Value::Null), json!(42));
    resumed.save().await.unwrap();

    let mut wrong_name = SessionManager::new(store.clone(), options.clone()).with_name("OTHER");
    wrong_name.set_id(app_id).unwrap();
    wrong_name.start().await.unwrap();
    assert_eq!(wrong_name.count(), 0);
    wrong_name.save().await.unwrap();

    // APP reopened the store last; destroying OTHER's session stays in OTHER
    let mut app_again = SessionManager::new(store.clone(), options.clone()).with_name("APP");
    app_again.set_id(other_id.clone()).unwrap();
    app_again.start().await.unwrap();
    other.destroy().await.unwrap();

    let mut check = SessionManager::new(store, options).with_name("OTHER");
    check.set_id(other_id).unwrap();
    check.start().await.unwrap();
    assert_eq!(check.count(), 0);
}
