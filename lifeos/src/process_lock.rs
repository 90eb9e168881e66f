//! Writer lock for a Life OS database.
//!
//! Every mutating command loads the store, applies one change, and writes
//! it back. Two such commands against the same database must not overlap,
//! so each holds an advisory OS file lock (flock) scoped to the database
//! path until it exits. Read-only commands take no lock.

use anyhow::{Context, Result};
use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{self, Seek, SeekFrom, Write};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

const WRITER_LOCK_FILE: &str = "lifeos-writer.lock";

/// Held by a process that is allowed to write the database.
///
/// Dropping the guard releases the lock but leaves the file in place. Every
/// process must lock the same inode; a process that opened the path before
/// an unlink would otherwise hold a lock nobody else can see.
pub struct WriterGuard {
    file: File,
}

impl Drop for WriterGuard {
    fn drop(&mut self) {
        let _ = unlock_file(&self.file);
    }
}

/// Acquire the writer lock for `db_path`, failing if another process holds it.
pub fn acquire_writer_guard(db_path: &Path) -> Result<WriterGuard> {
    match try_acquire(db_path)? {
        Some(guard) => Ok(guard),
        None => anyhow::bail!(
            "another lifeos command is writing to {}; try again when it finishes",
            db_path.display()
        ),
    }
}

fn try_acquire(db_path: &Path) -> Result<Option<WriterGuard>> {
    let dir = lock_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create runtime lock directory: {}", dir.display()))?;

    let path = lock_path(db_path);
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)
        .with_context(|| format!("failed to open lock file: {}", path.display()))?;

    match lock_file_nonblocking(&file) {
        Ok(()) => {
            // Owner info for debugging
            let _ = file.set_len(0);
            let _ = file.seek(SeekFrom::Start(0));
            let _ = writeln!(file, "pid={}", std::process::id());
            let _ = file.flush();

            Ok(Some(WriterGuard { file }))
        }
        Err(e) if is_lock_busy(&e) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("failed to lock file: {}", path.display())),
    }
}

fn lock_path(db_path: &Path) -> PathBuf {
    lock_dir().join(scoped_lock_filename(WRITER_LOCK_FILE, db_path))
}

fn lock_dir() -> PathBuf {
    let mut dir = match std::env::var_os("XDG_RUNTIME_DIR") {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => std::env::temp_dir(),
    };
    dir.push("lifeos");
    dir
}

/// One lock file per database, so separate databases never contend.
fn scoped_lock_filename(base_filename: &str, db_path: &Path) -> String {
    let mut hasher = DefaultHasher::new();
    db_path.to_string_lossy().hash(&mut hasher);
    let digest = hasher.finish();
    format!("{base_filename}.{digest:016x}")
}

fn is_lock_busy(error: &io::Error) -> bool {
    matches!(error.kind(), io::ErrorKind::WouldBlock)
        || matches!(error.raw_os_error(), Some(11) | Some(35))
}

#[cfg(unix)]
fn lock_file_nonblocking(file: &File) -> io::Result<()> {
    const LOCK_EX: i32 = 2;
    const LOCK_NB: i32 = 4;
    let fd = file.as_raw_fd();
    // SAFETY: flock is called with a valid file descriptor and constant flags.
    let rc = unsafe { flock(fd, LOCK_EX | LOCK_NB) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(unix)]
fn unlock_file(file: &File) -> io::Result<()> {
    const LOCK_UN: i32 = 8;
    let fd = file.as_raw_fd();
    // SAFETY: flock is called with a valid file descriptor and constant flags.
    let rc = unsafe { flock(fd, LOCK_UN) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(unix)]
extern "C" {
    fn flock(fd: i32, operation: i32) -> i32;
}

#[cfg(not(unix))]
compile_error!("lifeos writer locks currently require Unix (macOS/Linux)");

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_writer_is_refused_until_first_drops() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("lifeos.db");

        let first = acquire_writer_guard(&db_path).unwrap();
        let err = acquire_writer_guard(&db_path).err().unwrap();
        assert!(err.to_string().contains("another lifeos command"));

        drop(first);
        assert!(acquire_writer_guard(&db_path).is_ok());
    }

    #[test]
    fn test_released_lock_file_is_reused_by_later_writers() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("lifeos.db");

        let first = acquire_writer_guard(&db_path).unwrap();
        // A process that opened the lock file while `first` was held
        let early = OpenOptions::new()
            .read(true)
            .write(true)
            .open(lock_path(&db_path))
            .unwrap();
        drop(first);
        assert!(lock_path(&db_path).exists());

        let second = acquire_writer_guard(&db_path).unwrap();
        let err = lock_file_nonblocking(&early).unwrap_err();
        assert!(is_lock_busy(&err));

        drop(second);
        assert!(lock_file_nonblocking(&early).is_ok());
    }

    #[test]
    fn test_lock_names_differ_per_database() {
        let a = scoped_lock_filename(WRITER_LOCK_FILE, Path::new("/tmp/a/lifeos.db"));
        let b = scoped_lock_filename(WRITER_LOCK_FILE, Path::new("/tmp/b/lifeos.db"));
        assert_ne!(a, b);
        assert!(a.starts_with(WRITER_LOCK_FILE));
    }
}
