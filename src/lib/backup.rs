use std::{
  ffi::OsString,
  io,
  path::{Path, PathBuf},
};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

use crate::fs::FileSystem;

const BACKUP_SUFFIX: &str = ".bak";

/// Where the snapshot of `target` is kept while it is rewritten.
pub fn backup_path(target: &Path) -> PathBuf {
  let mut path = OsString::from(target.as_os_str());
  path.push(BACKUP_SUFFIX);
  PathBuf::from(path)
}

/// Single-use snapshot of a file taken before it is mutated.
///
/// The snapshot lives next to the original as `<file>.bak` and is removed by
/// [`Backup::discard`] whether or not it was restored.
#[derive(Debug)]
pub struct Backup<'fs, F: FileSystem + ?Sized> {
  fs: &'fs F,
  original: PathBuf,
  path: PathBuf,
}

impl<'fs, F: FileSystem + ?Sized> Backup<'fs, F> {
  /// Copies `original` aside.
  pub fn capture(fs: &'fs F, original: &Path) -> io::Result<Self> {
    let path = backup_path(original);

    #[cfg(feature = "tracing")]
    debug!("Backing up {:?} to {:?}", original, path);

    fs.copy(original, &path)?;

    Ok(Self {
      fs,
      original: original.to_path_buf(),
      path,
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Copies the snapshot back over the original.
  pub fn restore(&self) -> io::Result<()> {
    #[cfg(feature = "tracing")]
    debug!("Restoring {:?} from {:?}", self.original, self.path);

    self.fs.copy(&self.path, &self.original)
  }

  /// Removes the snapshot. A failure leaves a stale `.bak` file behind and is
  /// only logged.
  pub fn discard(self) {
    if let Err(_err) = self.fs.remove(&self.path) {
      #[cfg(feature = "tracing")]
      warn!("Couldn't remove backup {:?}: {}", self.path, _err);
    }
  }
}
