use std::sync::Arc;

use tracing::{debug, instrument};

use crate::{
    tracker::{args, Tracker},
    MogileError, MogileResult, TrackerError,
};

/// Tracker error code for a listing that matched nothing
const NONE_MATCH: &str = "none_match";

/// One-shot key operations: delete, rename, list
#[derive(Clone)]
pub struct KeyOps {
    domain: String,
    tracker: Arc<dyn Tracker>,
}

impl KeyOps {
    pub fn new<S: Into<String>>(domain: S, tracker: Arc<dyn Tracker>) -> Self {
        Self {
            domain: domain.into(),
            tracker,
        }
    }

    #[instrument(skip(self), fields(domain = %self.domain))]
    pub async fn delete(&self, key: &str, class: Option<&str>) -> MogileResult<()> {
        let request = args([
            ("key", Some(key.to_string())),
            ("class", class.map(str::to_string)),
        ]);
        self.tracker
            .send(&self.domain, "delete", &request)
            .await
            .map_err(|e| MogileError::from_tracker("delete", Some(key), e))?;
        debug!("Deleted {}", key);
        Ok(())
    }

    #[instrument(skip(self), fields(domain = %self.domain))]
    pub async fn rename(&self, from_key: &str, to_key: &str) -> MogileResult<()> {
        let request = args([
            ("from_key", Some(from_key.to_string())),
            ("to_key", Some(to_key.to_string())),
        ]);
        self.tracker
            .send(&self.domain, "rename", &request)
            .await
            .map_err(|e| MogileError::from_tracker("rename", Some(from_key), e))?;
        debug!("Renamed {} to {}", from_key, to_key);
        Ok(())
    }

    /// List keys starting with `prefix`, in tracker order.
    ///
    /// `after` resumes a previous listing past the given key.
    #[instrument(skip(self), fields(domain = %self.domain))]
    pub async fn list_keys(
        &self,
        prefix: &str,
        after: Option<&str>,
        limit: Option<u32>,
    ) -> MogileResult<Vec<String>> {
        let request = args([
            ("prefix", Some(prefix.to_string())),
            ("after", after.map(str::to_string)),
            ("limit", limit.map(|l| l.to_string())),
        ]);
        let response = match self.tracker.send(&self.domain, "list_keys", &request).await {
            Ok(response) => response,
            Err(TrackerError::Rejected { code, .. }) if code == NONE_MATCH => return Ok(Vec::new()),
            Err(e) => return Err(MogileError::from_tracker("list_keys", None, e)),
        };
        response.numbered("key_count", "key")
    }
}
