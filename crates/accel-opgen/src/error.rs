use std::path::PathBuf;

/// Errors raised while loading an operator schema or writing its sources.
///
/// Every schema error is reported before any file is written.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("no operator schema path given")]
    MissingConfigPath,

    #[error("failed to read or write {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed operator schema")]
    Json(#[from] serde_json::Error),

    #[error("operator '{operator}': {kind} '{name}' has unknown type '{ty}'")]
    UnknownType {
        operator: String,
        kind: &'static str,
        name: String,
        ty: String,
    },

    #[error("operator '{0}': output dtype is not specified")]
    MissingOutputDtype(String),

    #[error("operator '{operator}': default {value} does not fit attribute '{name}' of type {ty}")]
    BadDefault {
        operator: String,
        name: String,
        ty: &'static str,
        value: String,
    },

    #[error("operator '{operator}': required attribute '{name}' follows defaulted '{after}'")]
    RequiredAfterDefault {
        operator: String,
        name: String,
        after: String,
    },
}
