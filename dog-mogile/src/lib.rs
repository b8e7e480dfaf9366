//! # dog-mogile: client data plane for tracker-coordinated blob domains
//!
//! `dog-mogile` moves object bytes between local storage and the storage
//! nodes of a replicated blob service. A tracker decides where replicas
//! live and coordinates writes; this crate asks it, then streams.
//!
//! ## Key Features
//!
//! - **Flow-controlled downloads**: the network source is suspended whenever the
//!   local sink is saturated and resumed only after it drains
//! - **Transactional uploads**: open a create on the tracker, PUT with a declared
//!   length, commit only after the storage node acknowledges
//! - **Explicit handles**: a [`Domain`] owns its tracker and transport handles; no globals
//! - **Pluggable edges**: bring your own [`Tracker`], [`StorageTransport`],
//!   [`SinkTarget`] or [`ByteSource`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dog_mogile::prelude::*;
//!
//! # async fn run(tracker: Arc<dyn Tracker>) -> MogileResult<()> {
//! // 1. Bind a domain to your tracker client
//! let domain = Domain::with_http("photos", tracker, ClientConfig::default())?;
//!
//! // 2. Upload a file inside a create transaction
//! let sent = domain.upload("cat.jpg", Some("originals"), "/tmp/cat.jpg").await?;
//!
//! // 3. Download it back from the first known replica
//! let received = domain.download("cat.jpg", "/tmp/cat-copy.jpg").await?;
//! assert_eq!(sent, received);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │                 Domain                   │  ← what applications hold
//! ├────────────┬───────────────┬─────────────┤
//! │ Downloader │   Uploader    │   KeyOps    │
//! ├────────────┼───────────────┤             │
//! │PathResolver│ Transaction-  │             │
//! │            │ Coordinator   │             │
//! ├────────────┴───────────────┴─────────────┤
//! │  Tracker (commands)  │ StorageTransport  │  ← collaborators
//! └──────────────────────┴───────────────────┘
//! ```

mod config;
mod domain;
mod download;
mod error;
pub mod flow;
mod keys;
mod resolver;
pub mod sink;
pub mod source;
mod tracker;
mod transaction;
mod transport;
mod types;
mod upload;

pub use config::{ClientConfig, HttpConfig};
pub use domain::Domain;
pub use download::Downloader;
pub use error::{MogileError, MogileResult, TrackerError, UNKNOWN_KEY};
pub use flow::{FlowState, FlowStats};
pub use keys::KeyOps;
pub use resolver::PathResolver;
pub use sink::{ByteSink, FileSink, FileTarget, MemorySink, MemoryTarget, SinkTarget, WriteStatus};
pub use source::{ByteSource, FileSource, MemorySource};
pub use tracker::{Tracker, TrackerArgs, TrackerResponse};
pub use transaction::TransactionCoordinator;
pub use transport::{HttpTransport, StorageTransport};
pub use types::{ByteStream, StorageLocation, Transaction, TransferId};
pub use upload::Uploader;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ByteSource, ClientConfig, Domain, MogileError, MogileResult, SinkTarget,
        StorageTransport, Tracker, TrackerArgs, TrackerError, TrackerResponse,
    };
}
