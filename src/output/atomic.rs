//! Atomic file writes
//!
//! Output is written to a temporary file in the target's directory and then
//! renamed over the target, so readers see either the previous file or the
//! complete new one. A dropped, uncommitted writer removes its temporary file.

use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// A file that becomes visible at its target path only on [`commit`](AtomicFile::commit)
pub struct AtomicFile {
    target: PathBuf,
    tmp: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl AtomicFile {
    /// Creates the temporary file next to `target`, creating parent directories
    pub fn create(target: &Path) -> io::Result<Self> {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let file_name = target
            .file_name()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("not a file path: {}", target.display()),
                )
            })?
            .to_string_lossy()
            .into_owned();

        let tmp = dir.join(format!(
            "{}.tmp.{}.{}",
            file_name,
            std::process::id(),
            chrono::Utc::now().timestamp_millis()
        ));
        let file = File::create(&tmp)?;

        Ok(Self {
            target: target.to_path_buf(),
            tmp,
            writer: Some(BufWriter::new(file)),
        })
    }

    /// Flushes, syncs and renames the temporary file over the target
    pub fn commit(self) -> io::Result<()> {
        self.prepare()?.rename()
    }

    /// Flushes and syncs the temporary file without renaming it
    ///
    /// Lets a caller finish several files before making any of them visible.
    pub fn prepare(mut self) -> io::Result<PreparedFile> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "atomic file already closed"))?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);

        Ok(PreparedFile {
            target: std::mem::take(&mut self.target),
            tmp: std::mem::take(&mut self.tmp),
            renamed: false,
        })
    }

    fn writer(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "atomic file already closed"))
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer()?.flush()
    }
}

impl Drop for AtomicFile {
    fn drop(&mut self) {
        // Empty once prepare() handed the file on
        if !self.tmp.as_os_str().is_empty() {
            self.writer.take();
            let _ = fs::remove_file(&self.tmp);
        }
    }
}

/// A fully written temporary file waiting for its rename
pub struct PreparedFile {
    target: PathBuf,
    tmp: PathBuf,
    renamed: bool,
}

impl PreparedFile {
    /// Renames the temporary file over the target
    pub fn rename(mut self) -> io::Result<()> {
        fs::rename(&self.tmp, &self.target)?;
        self.renamed = true;
        tracing::debug!("Renamed {} -> {}", self.tmp.display(), self.target.display());
        Ok(())
    }
}

impl Drop for PreparedFile {
    fn drop(&mut self) {
        if !self.renamed {
            let _ = fs::remove_file(&self.tmp);
        }
    }
}

/// Creates `dir` if needed and checks that files can be created in it
pub fn ensure_writable_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    // Dropped uncommitted, so the check file is removed again
    AtomicFile::create(&dir.join(".write-check"))?;
    Ok(())
}

/// Serializes `value` as pretty JSON and writes it atomically to `path`
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    json_file(path, value)?.commit()
}

/// Serializes `value` as pretty JSON into a temporary file for `path`
pub fn prepare_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<PreparedFile> {
    json_file(path, value)?.prepare()
}

fn json_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<AtomicFile> {
    let mut file = AtomicFile::create(path)?;
    serde_json::to_writer_pretty(&mut file, value)?;
    file.write_all(b"\n")?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_commit_replaces_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("index.json");
        fs::write(&target, "old").unwrap();

        let mut file = AtomicFile::create(&target).unwrap();
        file.write_all(b"new").unwrap();

        // Not visible before commit
        assert_eq!(fs::read_to_string(&target).unwrap(), "old");

        file.commit().unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_drop_without_commit_leaves_target_intact() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("state.json");
        fs::write(&target, "previous").unwrap();

        {
            let mut file = AtomicFile::create(&target).unwrap();
            file.write_all(b"partial").unwrap();
        }

        assert_eq!(fs::read_to_string(&target).unwrap(), "previous");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_prepared_file_is_invisible_until_renamed() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("index.json");

        let prepared = prepare_json(&target, &vec!["a"]).unwrap();
        assert!(!target.exists());

        prepared.rename().unwrap();
        assert!(target.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_dropped_prepared_file_is_removed() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("state.json");

        drop(prepare_json(&target, &vec![1]).unwrap());

        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_ensure_writable_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("artifacts/run");

        ensure_writable_dir(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(fs::read_dir(&nested).unwrap().count(), 0);

        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        assert!(ensure_writable_dir(&blocker.join("artifacts")).is_err());
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested/site/index.json");

        write_json_atomic(&target, &vec![1, 2, 3]).unwrap();

        let parsed: Vec<u32> =
            serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
        assert_eq!(parsed, vec![1, 2, 3]);
    }
}
