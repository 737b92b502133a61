//! File-based SessionStore implementation

use async_trait::async_trait;
use std::fs::{self, Metadata};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

use satchel_core::{Error, GcStats, Result, SessionId, SessionStore};

use crate::atomic_writer::AtomicWriter;

/// Prefix of every session file inside the save path
pub const SESSION_FILE_PREFIX: &str = "sess_";

/// File-based session store
///
/// Each session is one file named `sess_<id>` directly inside the save path.
/// The directory plays the role of the namespace: two applications that need
/// separate session spaces use separate save paths.
#[derive(Debug, Default)]
pub struct FileSessionStore {
    /// Directory used when `open` is called with an empty save path
    default_dir: Option<PathBuf>,
    /// Directory chosen by the last successful `open`
    save_path: RwLock<Option<PathBuf>>,
}

impl FileSessionStore {
    /// Create a store without a default directory
    ///
    /// `open` must then be given an explicit save path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that falls back to `dir` when `open` gets an empty save path
    ///
    /// A leading `~` is expanded to the home directory.
    ///
    /// # Errors
    /// - `Error::Config` if the home directory cannot be determined
    pub fn with_default_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            default_dir: Some(expand_tilde(dir.into())?),
            save_path: RwLock::new(None),
        })
    }

    /// Directory chosen by the last successful `open`, if any
    pub fn save_path(&self) -> Option<PathBuf> {
        self.save_path
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn opened_dir(&self) -> Result<PathBuf> {
        self.save_path().ok_or_else(|| {
            Error::StorageUnavailable("file session store has not been opened".to_string())
        })
    }

    fn session_path(&self, session_id: &SessionId) -> Result<PathBuf> {
        Ok(self
            .opened_dir()?
            .join(format!("{}{}", SESSION_FILE_PREFIX, session_id)))
    }

    fn resolve_dir(&self, save_path: &str) -> Result<PathBuf> {
        if save_path.is_empty() {
            return self.default_dir.clone().ok_or_else(|| {
                Error::StorageUnavailable(
                    "no save path given and no default directory configured".to_string(),
                )
            });
        }

        expand_tilde(PathBuf::from(save_path))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn open(&self, save_path: &str, namespace: &str) -> Result<()> {
        let dir = self.resolve_dir(save_path)?;

        match fs::metadata(&dir) {
            Ok(meta) => {
                if !meta.is_dir() {
                    return Err(Error::StorageUnavailable(format!(
                        "session path {:?} is not a directory",
                        dir
                    )));
                }
                if !is_writable_dir(&dir, &meta) {
                    return Err(Error::StorageUnavailable(format!(
                        "session path {:?} is not writable",
                        dir
                    )));
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fs::create_dir_all(&dir).map_err(|e| {
                    Error::StorageUnavailable(format!(
                        "could not create session path {:?}: {}",
                        dir, e
                    ))
                })?;
                info!("Created session directory {:?}", dir);
            }
            Err(e) => {
                return Err(Error::StorageUnavailable(format!(
                    "could not inspect session path {:?}: {}",
                    dir, e
                )));
            }
        }

        debug!("Opened file session store at {:?} for {}", dir, namespace);
        *self.save_path.write().unwrap_or_else(|e| e.into_inner()) = Some(dir);
        Ok(())
    }

    async fn read(&self, session_id: &SessionId) -> Result<Vec<u8>> {
        let path = self.session_path(session_id)?;

        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::ReadDenied(format!(
                    "could not read from file {:?}: {}",
                    path, e
                )));
            }
        };

        if !is_readable(&path, &meta) {
            return Err(Error::ReadDenied(format!(
                "could not read from file {:?}: permission denied",
                path
            )));
        }

        match fs::read(&path) {
            Ok(data) => Ok(data),
            // Removed by a concurrent destroy or gc
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(Error::ReadDenied(format!(
                "could not read from file {:?}: {}",
                path, e
            ))),
        }
    }

    async fn write(&self, session_id: &SessionId, data: &[u8]) -> Result<()> {
        let path = self.session_path(session_id)?;

        if let Ok(meta) = fs::metadata(&path)
            && !is_writable(&path, &meta)
        {
            return Err(Error::WriteDenied(format!(
                "could not write to file {:?}: permission denied",
                path
            )));
        }

        let write_err =
            |e: std::io::Error| Error::WriteDenied(format!("could not write to file {:?}: {}", path, e));

        let mut writer = AtomicWriter::new(&path).map_err(write_err)?;
        writer.write(data).map_err(write_err)?;
        writer.commit().map_err(write_err)?;

        debug!("Wrote {} bytes to {:?}", data.len(), path);
        Ok(())
    }

    async fn destroy(&self, session_id: &SessionId) -> Result<()> {
        let path = self.session_path(session_id)?;

        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(Error::WriteDenied(format!(
                    "could not unlink file {:?}: {}",
                    path, e
                )));
            }
        };

        if !is_writable(&path, &meta) {
            return Err(Error::WriteDenied(format!(
                "could not unlink file {:?}: permission denied",
                path
            )));
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Destroyed session file {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::WriteDenied(format!(
                "could not unlink file {:?}: {}",
                path, e
            ))),
        }
    }

    async fn gc(&self, max_lifetime_secs: u64) -> Result<GcStats> {
        let dir = self.opened_dir()?;
        let stats = sweep_expired(&dir, Duration::from_secs(max_lifetime_secs), SystemTime::now())?;

        if stats.removed > 0 || stats.failed > 0 {
            info!(
                "Session gc in {:?}: removed {}, failed {}",
                dir, stats.removed, stats.failed
            );
        }

        Ok(stats)
    }
}

/// Delete every prefixed file in `dir` last modified strictly more than
/// `max_lifetime` before `now`
fn sweep_expired(dir: &Path, max_lifetime: Duration, now: SystemTime) -> Result<GcStats> {
    let mut stats = GcStats::default();

    let entries = fs::read_dir(dir).map_err(|e| {
        Error::WriteDenied(format!("could not list session path {:?}: {}", dir, e))
    })?;

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read entry in {:?}: {}", dir, e);
                stats.failed += 1;
                continue;
            }
        };

        if !entry
            .file_name()
            .to_string_lossy()
            .starts_with(SESSION_FILE_PREFIX)
        {
            continue;
        }

        let path = entry.path();
        let meta = match entry.metadata() {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => continue,
            // Already gone
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => {
                warn!("Failed to stat session file {:?}: {}", path, e);
                stats.failed += 1;
                continue;
            }
        };

        let expired = meta
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age > max_lifetime);

        if !expired {
            continue;
        }

        if !is_writable(&path, &meta) {
            warn!("Skipping unwritable expired session file {:?}", path);
            stats.failed += 1;
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => stats.removed += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!("Failed to delete expired session file {:?}: {}", path, e);
                stats.failed += 1;
            }
        }
    }

    Ok(stats)
}

/// Ask the kernel whether the effective user may access `path` with `mode`
#[cfg(unix)]
fn has_access(path: &Path, mode: libc::c_int) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };

    let result =
        unsafe { libc::faccessat(libc::AT_FDCWD, c_path.as_ptr(), mode, libc::AT_EACCESS) };
    result == 0
}

// The mode bits are checked as well since root passes every access check
#[cfg(unix)]
fn is_readable(path: &Path, meta: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o444 != 0 && has_access(path, libc::R_OK)
}

#[cfg(unix)]
fn is_writable(path: &Path, meta: &Metadata) -> bool {
    !meta.permissions().readonly() && has_access(path, libc::W_OK)
}

/// Creating and renaming entries needs both write and search permission
#[cfg(unix)]
fn is_writable_dir(path: &Path, meta: &Metadata) -> bool {
    !meta.permissions().readonly() && has_access(path, libc::W_OK | libc::X_OK)
}

#[cfg(not(unix))]
fn is_readable(_path: &Path, _meta: &Metadata) -> bool {
    true
}

#[cfg(not(unix))]
fn is_writable(_path: &Path, meta: &Metadata) -> bool {
    !meta.permissions().readonly()
}

#[cfg(not(unix))]
fn is_writable_dir(_path: &Path, meta: &Metadata) -> bool {
    !meta.permissions().readonly()
}

/// Expand tilde (~) in path
fn expand_tilde(path: PathBuf) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = dirs::home_dir().ok_or_else(|| {
                Error::Config("Could not determine home directory".to_string())
            })?;
            Ok(home.join(rest))
        }
        Err(_) => Ok(path),
    }
}
