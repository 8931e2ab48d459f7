//! Serialization of env maps back to text.
//!
//! Output is always sorted by key so that repeated syncs produce identical
//! files. With [`Layout::Grouped`] keys sharing the text before their first
//! `_` are clustered under a `# <group>` header:
//!
//! ```text
//! # API
//! API_KEY=secret
//! API_URL=http://localhost
//!
//! # DB
//! DB_HOST=localhost
//! ```

use std::{fmt, io};

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::parse::{ASSIGNMENT_OPERATOR, COMMENT_PREFIX, EnvMap};

const GROUP_SEPARATOR: char = '_';

/// How variables are laid out when written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
  /// One `KEY=VALUE` line per variable.
  Flat,
  /// Variables under a `# <group>` header per key prefix.
  #[default]
  Grouped,
}

/// Label used to group `key`: everything before the first `_`, or the whole key.
pub fn group_of(key: &str) -> &str {
  key
    .split_once(GROUP_SEPARATOR)
    .map_or(key, |(prefix, _)| prefix)
}

/// [`fmt::Display`] of an [`EnvMap`] sorted by key in a given [`Layout`].
#[derive(Debug, Clone, Copy)]
pub struct Rendered<'m, 'a> {
  env: &'m EnvMap<'a>,
  layout: Layout,
}

impl<'m, 'a> Rendered<'m, 'a> {
  pub fn new(env: &'m EnvMap<'a>, layout: Layout) -> Self {
    Self { env, layout }
  }
}

impl fmt::Display for Rendered<'_, '_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut current_group = None;

    for (key, value) in self.env.sorted() {
      if self.layout == Layout::Grouped {
        let group = group_of(key);
        if current_group != Some(group) {
          if current_group.is_some() {
            writeln!(f)?;
          }
          writeln!(f, "{COMMENT_PREFIX} {group}")?;
          current_group = Some(group);
        }
      }
      writeln!(f, "{key}{ASSIGNMENT_OPERATOR}{value}")?;
    }

    Ok(())
  }
}

/// Renders `env` sorted by key.
pub fn render(env: &EnvMap, layout: Layout) -> String {
  Rendered::new(env, layout).to_string()
}

/// Renders `env` and writes it to `sink` in one go.
pub fn write_env<W: io::Write>(
  sink: &mut W,
  env: &EnvMap,
  layout: Layout,
) -> Result<(), WriteError> {
  let content = render(env, layout);

  #[cfg(feature = "tracing")]
  debug!("Writing {} variables ({} bytes)", env.len(), content.len());

  sink
    .write_all(content.as_bytes())
    .and_then(|()| sink.flush())
    .map_err(|error| WriteError { content, error })
}

/// The sink refused the rendered content.
#[derive(Debug, thiserror::Error)]
#[error("error when writing {content:?}: {error}")]
pub struct WriteError {
  pub content: String,
  pub error: io::Error,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn env(pairs: &[(&'static str, &'static str)]) -> EnvMap<'static> {
    pairs.iter().copied().collect()
  }

  #[test]
  fn test_group_of() {
    assert_eq!(group_of("DB_HOST"), "DB");
    assert_eq!(group_of("DB_READ_REPLICA"), "DB");
    assert_eq!(group_of("PORT"), "PORT");
    assert_eq!(group_of("_LEADING"), "");
  }

  #[test]
  fn test_render_flat_sorted() {
    let env = env(&[("ZEBRA", "1"), ("APPLE", "2"), ("apple_b", "3")]);

    assert_eq!(render(&env, Layout::Flat), "APPLE=2\nZEBRA=1\napple_b=3\n");
  }

  #[test]
  fn test_render_grouped() {
    let env = env(&[
      ("DB_PORT", "5432"),
      ("API_URL", "http://localhost"),
      ("DB_HOST", "localhost"),
      ("PORT", "80"),
      ("API_KEY", "x=y"),
    ]);

    let expected = "\
# API
API_KEY=x=y
API_URL=http://localhost

# DB
DB_HOST=localhost
DB_PORT=5432

# PORT
PORT=80
";
    assert_eq!(render(&env, Layout::Grouped), expected);
  }

  #[test]
  fn test_keys_without_underscore_are_their_own_group() {
    let env = env(&[("A", "1"), ("B", "2")]);

    assert_eq!(render(&env, Layout::Grouped), "# A\nA=1\n\n# B\nB=2\n");
  }

  #[test]
  fn test_render_empty() {
    assert_eq!(render(&EnvMap::default(), Layout::Grouped), "");
    assert_eq!(render(&EnvMap::default(), Layout::Flat), "");
  }

  #[test]
  fn test_rendered_display_matches_render() {
    let env = env(&[("DB_HOST", "h"), ("API_KEY", "k")]);

    assert_eq!(
      format!("{}", Rendered::new(&env, Layout::Grouped)),
      "# API\nAPI_KEY=k\n\n# DB\nDB_HOST=h\n"
    );
  }

  #[test]
  fn test_write_env_to_sink() {
    let mut sink = Vec::new();
    write_env(&mut sink, &env(&[("B", "2"), ("A", "1")]), Layout::Flat).unwrap();

    assert_eq!(sink, b"A=1\nB=2\n");
  }

  struct FullDisk;

  impl io::Write for FullDisk {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
      Err(io::Error::other("no space left on device"))
    }

    fn flush(&mut self) -> io::Result<()> {
      Ok(())
    }
  }

  #[test]
  fn test_write_env_failure_keeps_content() {
    let err = write_env(&mut FullDisk, &env(&[("A", "1")]), Layout::Flat).unwrap_err();

    assert_eq!(err.content, "A=1\n");
    assert_eq!(err.error.to_string(), "no space left on device");
  }
}
