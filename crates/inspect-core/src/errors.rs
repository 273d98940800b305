use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cannot bind an empty target set")]
    EmptyTargets,

    #[error("No binding builder registered for kind '{kind}'")]
    UnknownKind { kind: String },

    #[error("Failed to construct '{kind}' binding: {source}")]
    ConstructionFailed {
        kind: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Preview provider '{provider}' failed: {source}")]
    ProviderFailed {
        provider: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Binding #{id} is reachable from its own target list")]
    CycleDetected { id: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;
