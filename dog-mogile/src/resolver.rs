use std::sync::Arc;

use tracing::{debug, instrument};

use crate::{
    tracker::{args, Tracker},
    MogileError, MogileResult, StorageLocation,
};

/// Asks the tracker where a key's replicas live
#[derive(Clone)]
pub struct PathResolver {
    domain: String,
    tracker: Arc<dyn Tracker>,
}

impl PathResolver {
    pub fn new<S: Into<String>>(domain: S, tracker: Arc<dyn Tracker>) -> Self {
        Self {
            domain: domain.into(),
            tracker,
        }
    }

    /// Resolve `key` to its storage locations, in tracker order.
    ///
    /// With `verify` off the tracker skips confirming that each replica
    /// physically exists, so a returned location may be stale. An explicit
    /// `paths=0` answer yields an empty list; an unknown key is `NotFound`.
    #[instrument(skip(self), fields(domain = %self.domain))]
    pub async fn resolve_paths(&self, key: &str, verify: bool) -> MogileResult<Vec<StorageLocation>> {
        let request = args([
            ("key", Some(key.to_string())),
            ("noverify", Some(if verify { "0" } else { "1" }.to_string())),
        ]);
        let response = self
            .tracker
            .send(&self.domain, "get_paths", &request)
            .await
            .map_err(|e| MogileError::from_tracker("get_paths", Some(key), e))?;

        let paths = response
            .numbered("paths", "path")?
            .into_iter()
            .map(StorageLocation::parse)
            .collect::<MogileResult<Vec<_>>>()?;

        debug!("Resolved {} location(s) for {}", paths.len(), key);
        Ok(paths)
    }
}
