use thiserror::Error;

/// Errors surfaced by the graph model core.
///
/// Most "nothing here" situations (a vertex that is not a branch point, a
/// chain whose constituents disagree on a tag) are answered with `None`
/// rather than an error; the variants below are the genuine failures.
#[derive(Debug, Error)]
pub enum LineageError {
    /// A handle refers to an object that was removed (or never existed).
    #[error("stale handle: {0}")]
    StaleHandle(&'static str),
    /// A referenced non-graph entity (tag, tag set) does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// A feature map was requested for a key that was never declared.
    #[error("unknown feature: {0}")]
    UnknownFeature(String),
    /// Two features were declared under the same key.
    #[error("duplicate feature key: {0}")]
    DuplicateFeature(String),
    /// An argument is inconsistent with the receiver's configuration.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
    /// The query is deliberately not supported by this view.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    /// A derived structure failed its consistency check.
    #[error("corruption detected: {0}")]
    Corruption(String),
    /// Options could not be parsed.
    #[error("config: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LineageError>;
