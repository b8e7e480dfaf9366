use thiserror::Error;

/// Result type for domain operations
pub type MogileResult<T> = Result<T, MogileError>;

/// Errors that can occur while talking to the tracker or a storage node
#[derive(Error, Debug)]
pub enum MogileError {
    #[error("Malformed tracker response: {message}")]
    Protocol { message: String },

    #[error("Tracker command {command} failed: {source}")]
    Tracker {
        command: String,
        #[source]
        source: TrackerError,
    },

    #[error("Key not found: {key}")]
    NotFound { key: String },

    #[error("Storage node transfer failed: {source}")]
    Transport {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Local sink error: {source}")]
    Sink {
        #[source]
        source: std::io::Error,
    },

    #[error("Local source error: {source}")]
    Source {
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration for {key}: {message}")]
    Config { key: String, message: String },

    /// Bytes reached the storage node but the tracker never committed them.
    /// Nothing is rolled back; the orphaned replica stays on the node.
    #[error("Upload of {key} was not committed: {source}")]
    UncommittedUpload {
        key: String,
        #[source]
        source: Box<MogileError>,
    },
}

impl MogileError {
    /// Create a protocol error for a malformed tracker response
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a transport error from any error type
    pub fn transport<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            source: Box::new(error),
        }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(key: S) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a local sink error
    pub fn sink_io(source: std::io::Error) -> Self {
        Self::Sink { source }
    }

    /// Create a local source error
    pub fn source_io(source: std::io::Error) -> Self {
        Self::Source { source }
    }

    /// Create a configuration error
    pub fn config<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::Config {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Wrap a tracker failure, turning `unknown_key` rejections into `NotFound`
    pub fn from_tracker(command: &str, key: Option<&str>, error: TrackerError) -> Self {
        match (key, &error) {
            (Some(key), TrackerError::Rejected { code, .. }) if code == UNKNOWN_KEY => {
                Self::not_found(key)
            }
            _ => Self::Tracker {
                command: command.to_string(),
                source: error,
            },
        }
    }

    /// True for failures that originate in the tracker conversation
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Self::Protocol { .. } | Self::Tracker { .. } | Self::UncommittedUpload { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Tracker error code for a key the domain does not know
pub const UNKNOWN_KEY: &str = "unknown_key";

/// Failure reported by the tracker command collaborator
#[derive(Error, Debug)]
pub enum TrackerError {
    /// The tracker answered, but refused the command
    #[error("{code}: {message}")]
    Rejected { code: String, message: String },

    /// No tracker could be reached or the exchange broke down
    #[error("tracker unavailable: {source}")]
    Unavailable {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl TrackerError {
    pub fn rejected<C: Into<String>, M: Into<String>>(code: C, message: M) -> Self {
        Self::Rejected {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn unavailable<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Unavailable {
            source: Box::new(error),
        }
    }
}
