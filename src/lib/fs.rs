//! Filesystem access used by the sync.
//!
//! [`EnvSync`](crate::sync::EnvSync) only touches files through the
//! [`FileSystem`] trait, so the whole backup/restore flow can be exercised
//! against an in-memory implementation in tests.

use std::{
  fs::{self, OpenOptions},
  io::{self, Write},
  path::Path,
};

pub trait FileSystem {
  /// Opens `path` for reading and appending, failing if it doesn't exist or
  /// isn't writable. Nothing is modified.
  fn open_for_update(&self, path: &Path) -> io::Result<()>;

  /// Reads the raw bytes of `path`. Decoding is left to the parser.
  fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

  /// Copies `from` over `to`, creating `to` if needed.
  fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;

  fn remove(&self, path: &Path) -> io::Result<()>;

  /// Truncates an existing file to zero length.
  fn truncate(&self, path: &Path) -> io::Result<()>;

  /// Appends `contents` to an existing file.
  fn append(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
}

/// [`FileSystem`] backed by [`std::fs`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
  fn open_for_update(&self, path: &Path) -> io::Result<()> {
    OpenOptions::new().read(true).append(true).open(path).map(drop)
  }

  fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
    fs::read(path)
  }

  fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to).map(drop)
  }

  fn remove(&self, path: &Path) -> io::Result<()> {
    fs::remove_file(path)
  }

  fn truncate(&self, path: &Path) -> io::Result<()> {
    OpenOptions::new().write(true).open(path)?.set_len(0)
  }

  fn append(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().append(true).open(path)?;
    file.write_all(contents)?;
    file.sync_all()
  }
}

#[cfg(test)]
pub(crate) use memory::{MemoryFileSystem, Op};

#[cfg(test)]
mod memory {
  use std::{
    collections::{HashMap, HashSet},
    io,
    path::{Path, PathBuf},
    sync::Mutex,
  };

  use super::FileSystem;

  /// Operations of [`FileSystem`] that can be made to fail. Copies are matched
  /// on their destination.
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
  pub(crate) enum Op {
    Open,
    Read,
    Copy,
    Remove,
    Truncate,
    Append,
  }

  /// In-memory [`FileSystem`] with injectable failures.
  #[derive(Debug, Default)]
  pub(crate) struct MemoryFileSystem {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    failures: HashSet<(Op, PathBuf)>,
  }

  impl MemoryFileSystem {
    pub(crate) fn new() -> Self {
      Self::default()
    }

    #[must_use]
    pub(crate) fn with_file(self, path: impl Into<PathBuf>, contents: impl AsRef<[u8]>) -> Self {
      self
        .files
        .lock()
        .expect("memory fs poisoned")
        .insert(path.into(), contents.as_ref().to_vec());
      self
    }

    /// Makes every `op` touching `path` fail.
    #[must_use]
    pub(crate) fn failing(mut self, op: Op, path: impl Into<PathBuf>) -> Self {
      self.failures.insert((op, path.into()));
      self
    }

    pub(crate) fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
      self
        .files
        .lock()
        .expect("memory fs poisoned")
        .get(path.as_ref())
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub(crate) fn exists(&self, path: impl AsRef<Path>) -> bool {
      self.contents(path).is_some()
    }

    fn check(&self, op: Op, path: &Path) -> io::Result<()> {
      if self.failures.contains(&(op, path.to_path_buf())) {
        Err(io::Error::other(format!("injected {op:?} failure")))
      } else {
        Ok(())
      }
    }

    fn with_existing<T>(&self, path: &Path, f: impl FnOnce(&mut Vec<u8>) -> T) -> io::Result<T> {
      let mut files = self.files.lock().expect("memory fs poisoned");
      files
        .get_mut(path)
        .map(f)
        .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }
  }

  impl FileSystem for MemoryFileSystem {
    fn open_for_update(&self, path: &Path) -> io::Result<()> {
      self.check(Op::Open, path)?;
      self.with_existing(path, |_| ())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
      self.check(Op::Read, path)?;
      self.with_existing(path, |bytes| bytes.clone())
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
      self.check(Op::Copy, to)?;
      let bytes = self.with_existing(from, |bytes| bytes.clone())?;
      self
        .files
        .lock()
        .expect("memory fs poisoned")
        .insert(to.to_path_buf(), bytes);
      Ok(())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
      self.check(Op::Remove, path)?;
      self
        .files
        .lock()
        .expect("memory fs poisoned")
        .remove(path)
        .map(drop)
        .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn truncate(&self, path: &Path) -> io::Result<()> {
      self.check(Op::Truncate, path)?;
      self.with_existing(path, Vec::clear)
    }

    fn append(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
      self.check(Op::Append, path)?;
      self.with_existing(path, |bytes| bytes.extend_from_slice(contents))
    }
  }
}
