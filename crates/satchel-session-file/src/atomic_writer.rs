//! Atomic file writer so readers never observe a half-written session file

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Writes to a sibling temporary file and renames it over the target on commit
pub(crate) struct AtomicWriter {
    temp_path: PathBuf,
    final_path: PathBuf,
    file: File,
}

impl AtomicWriter {
    /// Create a new atomic writer for the given path
    ///
    /// The temporary file lives next to the target so the final rename never
    /// crosses a filesystem boundary.
    pub(crate) fn new<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let final_path = path.as_ref().to_path_buf();
        let temp_path = Self::temp_path(&final_path);
        let file = File::create(&temp_path)?;

        Ok(Self {
            temp_path,
            final_path,
            file,
        })
    }

    /// Write data to the temporary file
    pub(crate) fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.file.write_all(data)
    }

    /// Commit the write by renaming the temp file to the final path
    pub(crate) fn commit(mut self) -> io::Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;

        let temp_path = std::mem::take(&mut self.temp_path);
        let final_path = std::mem::take(&mut self.final_path);

        // Drop now has an empty path and will not remove anything
        match fs::rename(&temp_path, &final_path) {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }

    /// Unique temporary path per writer, so concurrent writes to the same
    /// session never share a temp file
    fn temp_path(final_path: &Path) -> PathBuf {
        let mut temp = final_path.as_os_str().to_owned();
        temp.push(format!(".{:08x}.tmp", rand::random::<u32>()));
        PathBuf::from(temp)
    }
}

impl Drop for AtomicWriter {
    fn drop(&mut self) {
        if !self.temp_path.as_os_str().is_empty() {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}
