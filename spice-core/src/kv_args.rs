//! Tolerant key/value parsing for the opaque option lists forwarded to the engines.
//!
//! Three token shapes are accepted:
//!   - `key=value` (split on the first `=` only, value may be empty)
//!   - `key value` (bare key followed by a token that is neither a flag nor a pair)
//!   - `key` alone, which becomes the flag value `"true"`
//!
//! Nothing here fails: malformed input degrades to best-effort pairs.

use serde::Serialize;

/// Ordered string→string mapping. A repeated key keeps its first position
/// and takes the latest value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtraArgs {
    entries: Vec<(String, String)>,
}

impl ExtraArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Layer `other` on top of `self`: keys from `other` win.
    pub fn merged_with(mut self, other: &ExtraArgs) -> Self {
        for (k, v) in other.iter() {
            self.insert(k, v);
        }
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ExtraArgs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = ExtraArgs::new();
        for (k, v) in iter {
            args.insert(k, v);
        }
        args
    }
}

/// Parse raw tokens into an [`ExtraArgs`] mapping.
pub fn parse_key_values<S: AsRef<str>>(tokens: &[S]) -> ExtraArgs {
    let mut args = ExtraArgs::new();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_ref();
        if let Some((key, value)) = token.split_once('=') {
            args.insert(key, value);
        } else {
            match tokens.get(i + 1).map(AsRef::as_ref) {
                Some(next) if !next.starts_with('-') && !next.contains('=') => {
                    args.insert(token, next);
                    i += 1;
                }
                _ => args.insert(token, "true"),
            }
        }
        i += 1;
    }
    tracing::debug!(pairs = args.len(), "Parsed pass-through arguments");
    args
}
