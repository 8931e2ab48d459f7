use crate::parse::EnvMap;

#[cfg(feature = "tracing")]
use tracing::trace;

/// Result of merging a source map into a target map.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Merge<'a> {
  /// Target variables plus every source variable the target lacked.
  pub merged: EnvMap<'a>,
  /// Only the variables taken from the source.
  pub added: EnvMap<'a>,
}

/// Adds every key of `source` that `target` lacks, keeping target values as they are.
pub fn append_new_env<'a>(source: &EnvMap<'a>, mut target: EnvMap<'a>) -> Merge<'a> {
  let mut added = EnvMap::default();

  for (key, value) in source.iter() {
    if target.contains_key(key) {
      continue;
    }

    #[cfg(feature = "tracing")]
    trace!("Adding missing variable: {}", key);

    target.insert(key.to_owned(), value.to_owned());
    added.insert(key.to_owned(), value.to_owned());
  }

  Merge {
    merged: target,
    added,
  }
}
