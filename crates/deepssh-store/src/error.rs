use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The in-memory change stands; only the durable copy is stale.
    #[error("failed to persist {key}: {message}")]
    Persist { key: &'static str, message: String },

    /// Storage refused to drop the saved data; nothing was removed.
    #[error("failed to clear storage: {message}")]
    Clear { message: String },

    #[error("failed to read {key}: {message}")]
    Read { key: &'static str, message: String },

    #[error("stored value under {key} is not valid")]
    Corrupt {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize {key}")]
    Serialize {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
