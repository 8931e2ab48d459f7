use std::{
  borrow::Cow,
  collections::{HashMap, hash_map},
  convert::TryFrom,
};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

pub(crate) const COMMENT_PREFIX: &str = "#";
pub(crate) const ASSIGNMENT_OPERATOR: &str = "=";

/// Variables of one env file, keyed by name.
///
/// Iteration order is unspecified; use [`EnvMap::sorted`] when order matters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvMap<'a> {
  vars: HashMap<Cow<'a, str>, Cow<'a, str>>,
}

impl<'a> TryFrom<&'a str> for EnvMap<'a> {
  type Error = ParseError;

  fn try_from(s: &'a str) -> Result<Self, Self::Error> {
    #[cfg(feature = "tracing")]
    debug!("Parsing env file with {} lines", s.lines().count());

    let mut vars: HashMap<Cow<'a, str>, Cow<'a, str>> = HashMap::new();

    for (index, line) in s.lines().enumerate() {
      #[cfg(feature = "tracing")]
      trace!("Parsing line: {:?}", line);

      if line.is_empty() || line.starts_with(COMMENT_PREFIX) {
        continue;
      }

      let EnvEntry { key, value } = EnvEntry::split(line).ok_or_else(|| ParseError::InvalidLine {
        line_number: index + 1,
        line: line.to_string(),
      })?;

      #[cfg(feature = "tracing")]
      if vars.contains_key(&key) {
        trace!("Duplicate key {}, keeping the later value", key);
      }

      vars.insert(key, value);
    }

    #[cfg(feature = "tracing")]
    debug!("Parsed {} variables", vars.len());

    Ok(Self { vars })
  }
}

impl<'a> TryFrom<&'a [u8]> for EnvMap<'a> {
  type Error = ParseError;

  fn try_from(bytes: &'a [u8]) -> Result<Self, Self::Error> {
    let s = std::str::from_utf8(bytes).map_err(|err| {
      let valid = &bytes[..err.valid_up_to()];
      ParseError::InvalidUtf8 {
        line_number: valid.iter().filter(|&&b| b == b'\n').count() + 1,
      }
    })?;

    Self::try_from(s)
  }
}

impl<'a> FromIterator<(&'a str, &'a str)> for EnvMap<'a> {
  fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
    Self {
      vars: iter
        .into_iter()
        .map(|(key, value)| (Cow::Borrowed(key), Cow::Borrowed(value)))
        .collect(),
    }
  }
}

impl<'a> EnvMap<'a> {
  pub fn get(&self, key: &str) -> Option<&str> {
    self.vars.get(key).map(|value| &**value)
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.vars.contains_key(key)
  }

  /// Inserts a variable, returning the value it replaced.
  pub fn insert(
    &mut self,
    key: impl Into<Cow<'a, str>>,
    value: impl Into<Cow<'a, str>>,
  ) -> Option<Cow<'a, str>> {
    self.vars.insert(key.into(), value.into())
  }

  pub fn len(&self) -> usize {
    self.vars.len()
  }

  pub fn is_empty(&self) -> bool {
    self.vars.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.vars.iter().map(|(k, v)| (&**k, &**v))
  }

  /// Variables in ascending byte order of their keys.
  pub fn sorted(&self) -> Vec<(&str, &str)> {
    let mut vars: Vec<_> = self.iter().collect();
    vars.sort_unstable_by(|a, b| a.0.cmp(b.0));
    vars
  }

  pub fn into_owned(self) -> EnvMap<'static> {
    EnvMap {
      vars: self
        .vars
        .into_iter()
        .map(|(k, v)| (Cow::Owned(k.into_owned()), Cow::Owned(v.into_owned())))
        .collect(),
    }
  }
}

impl<'a> IntoIterator for EnvMap<'a> {
  type Item = (Cow<'a, str>, Cow<'a, str>);
  type IntoIter = hash_map::IntoIter<Cow<'a, str>, Cow<'a, str>>;

  fn into_iter(self) -> Self::IntoIter {
    self.vars.into_iter()
  }
}

/// A single `KEY=VALUE` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvEntry<'a> {
  pub key: Cow<'a, str>,
  pub value: Cow<'a, str>,
}

impl<'a> EnvEntry<'a> {
  /// Splits a line on its first `=`. Neither side is trimmed, so the value may
  /// itself contain `=`.
  pub fn split(line: &'a str) -> Option<Self> {
    line
      .split_once(ASSIGNMENT_OPERATOR)
      .map(|(key, value)| EnvEntry {
        key: Cow::Borrowed(key),
        value: Cow::Borrowed(value),
      })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
  #[error("couldn't split line {line_number} ({line:?}) by '=' into two strings")]
  InvalidLine { line_number: usize, line: String },
  #[error("line {line_number} is not valid UTF-8")]
  InvalidUtf8 { line_number: usize },
}
