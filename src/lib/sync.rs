//! Environment file synchronization functionality.
//!
//! Adds to a target env file every variable that a source (reference) env file
//! defines and the target lacks. Values already in the target are never
//! changed.
//!
//! # Sync Logic
//!
//! The sync process:
//! 1. Opens the source for reading and the target for updating; both must exist
//! 2. Parses both files, aborting before any write on a malformed line
//! 3. Snapshots the target to `<target>.bak`
//! 4. Merges the variables missing from the target
//! 5. Truncates the target and writes the merged variables, sorted by key
//! 6. Restores the target from the snapshot if step 4 or 5 failed, then removes
//!    the snapshot
//!
//! The rewritten target loses its comments and original ordering. With
//! [`Layout::Grouped`] variables are clustered under `# <prefix>` headers.
//!
//! # Examples
//!
//! ```rust,no_run
//! use env_sync::sync::{EnvSync, EnvSyncOptions};
//! use std::path::PathBuf;
//!
//! let options = EnvSyncOptions {
//!     source_file: PathBuf::from(".env.template"),
//!     target_file: PathBuf::from(".env"),
//!     ..Default::default()
//! };
//!
//! let report = EnvSync::sync_with_options(options).unwrap();
//! print!("{report}");
//! ```

use std::{
  fmt, io,
  path::{Path, PathBuf},
};

#[cfg(feature = "tracing")]
use tracing::{debug, info, warn};

use crate::{
  backup::{Backup, backup_path},
  diff::{Merge, append_new_env},
  fs::{FileSystem, StdFileSystem},
  parse::{EnvMap, ParseError},
  write::{Layout, Rendered, WriteError, render},
};

const DEFAULT_SOURCE_FILENAME: &str = ".env.template";
const DEFAULT_TARGET_FILENAME: &str = ".env";

/// Main synchronization service for environment files.
#[derive(Debug, Clone, Default)]
pub struct EnvSync<F = StdFileSystem> {
  fs: F,
  layout: Layout,
}

impl EnvSync {
  pub fn new() -> Self {
    Self::default()
  }

  /// Synchronizes environment files on disk using the provided options.
  ///
  /// Returns an error if either file doesn't exist.
  pub fn sync_with_options(options: EnvSyncOptions) -> Result<SyncReport, EnvSyncError> {
    let EnvSyncOptions {
      source_file,
      target_file,
      layout,
    } = options;

    Self::new().layout(layout).sync(source_file, target_file)
  }
}

impl<F: FileSystem> EnvSync<F> {
  pub fn with_fs(fs: F) -> Self {
    Self {
      fs,
      layout: Layout::default(),
    }
  }

  #[must_use]
  pub fn layout(mut self, layout: Layout) -> Self {
    self.layout = layout;
    self
  }

  pub fn file_system(&self) -> &F {
    &self.fs
  }

  /// Adds the variables of `source` missing from `target` and rewrites
  /// `target`.
  ///
  /// On a failure after the target was snapshotted, the target is restored to
  /// its previous content before the error is returned. The snapshot is removed
  /// before returning in every case.
  pub fn sync(
    &self,
    source: impl AsRef<Path>,
    target: impl AsRef<Path>,
  ) -> Result<SyncReport, EnvSyncError> {
    let (source, target) = (source.as_ref(), target.as_ref());

    #[cfg(feature = "tracing")]
    info!("Starting env sync");
    #[cfg(feature = "tracing")]
    debug!(?source, ?target, "Resolved file paths");

    let (source_bytes, target_bytes) = self.read(source, target)?;
    let source_env = parse(&source_bytes, FileRole::Source, source)?;
    let target_env = parse(&target_bytes, FileRole::Target, target)?;

    let backup = Backup::capture(&self.fs, target).map_err(|error| EnvSyncError::Backup {
      path: backup_path(target),
      error,
    })?;

    let result = match self.rewrite(target, &source_env, target_env) {
      Ok(report) => Ok(report),
      Err(cause) => match backup.restore() {
        Ok(()) => {
          #[cfg(feature = "tracing")]
          warn!("Sync failed, restored {:?} from backup", target);
          Err(cause)
        }
        Err(error) => {
          #[cfg(feature = "tracing")]
          warn!("Couldn't restore {:?} from {:?}: {}", target, backup.path(), error);
          Err(EnvSyncError::Restore {
            path: target.to_path_buf(),
            cause: Box::new(cause),
            error,
          })
        }
      },
    };

    backup.discard();

    #[cfg(feature = "tracing")]
    if let Ok(report) = &result {
      info!("Sync completed successfully, {} variables added", report.added.len());
    }

    result
  }

  /// Computes what [`EnvSync::sync`] would write without touching any file.
  pub fn preview(
    &self,
    source: impl AsRef<Path>,
    target: impl AsRef<Path>,
  ) -> Result<Merge<'static>, EnvSyncError> {
    let (source, target) = (source.as_ref(), target.as_ref());

    let (source_bytes, target_bytes) = self.read(source, target)?;
    let source_env = parse(&source_bytes, FileRole::Source, source)?;
    let target_env = parse(&target_bytes, FileRole::Target, target)?;

    let Merge { merged, added } = append_new_env(&source_env, target_env);

    Ok(Merge {
      merged: merged.into_owned(),
      added: added.into_owned(),
    })
  }

  fn read(&self, source: &Path, target: &Path) -> Result<(Vec<u8>, Vec<u8>), EnvSyncError> {
    let source_bytes = self
      .fs
      .read(source)
      .map_err(|err| EnvSyncError::open(FileRole::Source, source, err))?;

    let target_bytes = self
      .fs
      .open_for_update(target)
      .and_then(|()| self.fs.read(target))
      .map_err(|err| EnvSyncError::open(FileRole::Target, target, err))?;

    Ok((source_bytes, target_bytes))
  }

  fn rewrite(
    &self,
    target: &Path,
    source_env: &EnvMap,
    target_env: EnvMap,
  ) -> Result<SyncReport, EnvSyncError> {
    let Merge { merged, added } = append_new_env(source_env, target_env);

    #[cfg(feature = "tracing")]
    for (key, value) in added.sorted() {
      info!("New env added: {}={}", key, value);
    }

    self
      .fs
      .truncate(target)
      .map_err(|error| EnvSyncError::Truncate {
        path: target.to_path_buf(),
        error,
      })?;

    let content = render(&merged, self.layout);
    if let Err(error) = self.fs.append(target, content.as_bytes()) {
      return Err(EnvSyncError::Write {
        path: target.to_path_buf(),
        error: WriteError { content, error },
      });
    }

    Ok(SyncReport {
      added: added.into_owned(),
    })
  }
}

fn parse<'a>(bytes: &'a [u8], role: FileRole, path: &Path) -> Result<EnvMap<'a>, EnvSyncError> {
  EnvMap::try_from(bytes).map_err(|error| EnvSyncError::Parse {
    role,
    path: path.to_path_buf(),
    error,
  })
}

/// Outcome of a successful sync.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncReport {
  /// Variables copied from the source into the target.
  pub added: EnvMap<'static>,
}

impl fmt::Display for SyncReport {
  /// Lists the added variables sorted by key, or nothing when none were added.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.added.is_empty() {
      return Ok(());
    }
    writeln!(f, "New env added")?;
    write!(f, "{}", Rendered::new(&self.added, Layout::Flat))
  }
}

/// Which side of the sync a file is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
  Source,
  Target,
}

impl fmt::Display for FileRole {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FileRole::Source => f.write_str("source"),
      FileRole::Target => f.write_str("target"),
    }
  }
}

/// Coarse classification of [`EnvSyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  FileOpen,
  Parse,
  Backup,
  Write,
  Restore,
}

/// Errors that can occur during environment file synchronization.
#[derive(Debug, thiserror::Error)]
pub enum EnvSyncError {
  /// A file is missing or unreadable
  #[error("couldn't open {role} file {path:?}: {error}")]
  Open {
    role: FileRole,
    path: PathBuf,
    error: io::Error,
  },
  /// A file contains invalid UTF-8 or a line that isn't a comment, blank, or
  /// `KEY=VALUE`
  #[error("couldn't parse {role} file {path:?}: {error}")]
  Parse {
    role: FileRole,
    path: PathBuf,
    error: ParseError,
  },
  /// The target couldn't be snapshotted; nothing was modified
  #[error("couldn't back up target file to {path:?}: {error}")]
  Backup { path: PathBuf, error: io::Error },
  /// The target couldn't be emptied before writing
  #[error("couldn't truncate target file {path:?}: {error}")]
  Truncate { path: PathBuf, error: io::Error },
  /// The merged content couldn't be written
  #[error("couldn't write target file {path:?}: {error}")]
  Write { path: PathBuf, error: WriteError },
  /// The sync failed and copying the snapshot back failed too
  #[error("couldn't restore target file {path:?} from backup ({error}) after: {cause}")]
  Restore {
    path: PathBuf,
    cause: Box<EnvSyncError>,
    error: io::Error,
  },
}

impl EnvSyncError {
  fn open(role: FileRole, path: &Path, error: io::Error) -> Self {
    EnvSyncError::Open {
      role,
      path: path.to_path_buf(),
      error,
    }
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      EnvSyncError::Open { .. } => ErrorKind::FileOpen,
      EnvSyncError::Parse { .. } => ErrorKind::Parse,
      EnvSyncError::Backup { .. } => ErrorKind::Backup,
      EnvSyncError::Truncate { .. } | EnvSyncError::Write { .. } => ErrorKind::Write,
      EnvSyncError::Restore { .. } => ErrorKind::Restore,
    }
  }

  /// The file role involved, for open and parse errors.
  pub fn role(&self) -> Option<FileRole> {
    match self {
      EnvSyncError::Open { role, .. } | EnvSyncError::Parse { role, .. } => Some(*role),
      _ => None,
    }
  }
}

/// Configuration options for environment file synchronization.
#[derive(Debug, Clone)]
pub struct EnvSyncOptions {
  /// Path to the reference file whose variables are added to the target.
  pub source_file: PathBuf,
  /// Path to the env file to update. Must already exist.
  pub target_file: PathBuf,
  /// How the rewritten target is laid out.
  pub layout: Layout,
}

impl Default for EnvSyncOptions {
  fn default() -> Self {
    Self {
      source_file: PathBuf::from(DEFAULT_SOURCE_FILENAME),
      target_file: PathBuf::from(DEFAULT_TARGET_FILENAME),
      layout: Layout::default(),
    }
  }
}
