use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::{MogileError, MogileResult, TrackerError};

/// Argument mapping for a tracker command
pub type TrackerArgs = BTreeMap<String, String>;

/// The tracker command protocol, as seen by the data plane
///
/// Implementations own the wire format, host selection and retries; this
/// crate only sends a command name with its arguments and reads the
/// key/value answer.
#[async_trait]
pub trait Tracker: Send + Sync {
    async fn send(
        &self,
        domain: &str,
        command: &str,
        args: &TrackerArgs,
    ) -> Result<TrackerResponse, TrackerError>;
}

/// Key/value answer to a tracker command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerResponse {
    fields: BTreeMap<String, String>,
}

impl TrackerResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(|s| s.as_str())
    }

    /// A field that must be present
    pub fn require(&self, key: &str) -> MogileResult<&str> {
        self.get(key)
            .ok_or_else(|| MogileError::protocol(format!("missing field {key:?}")))
    }

    /// A non-negative count field, in plain decimal digits
    pub fn count(&self, key: &str) -> MogileResult<usize> {
        let raw = self.require(key)?;
        let malformed = || MogileError::protocol(format!("field {key:?} is not a count: {raw:?}"));
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        raw.parse::<usize>().map_err(|_| malformed())
    }

    /// Rebuild a numbered list `prefix1..prefixN`, where N is `count_field`.
    ///
    /// Every index must be present; a gap is a protocol error.
    pub fn numbered(&self, count_field: &str, prefix: &str) -> MogileResult<Vec<String>> {
        let count = self.count(count_field)?;
        (1..=count)
            .map(|i| {
                let key = format!("{prefix}{i}");
                self.get(&key).map(str::to_string).ok_or_else(|| {
                    MogileError::protocol(format!(
                        "{count_field}={count} but {key:?} is missing"
                    ))
                })
            })
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TrackerResponse {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Build an argument mapping from pairs, skipping absent optional values
pub(crate) fn args<'a, I>(pairs: I) -> TrackerArgs
where
    I: IntoIterator<Item = (&'a str, Option<String>)>,
{
    pairs
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k.to_string(), v)))
        .collect()
}
