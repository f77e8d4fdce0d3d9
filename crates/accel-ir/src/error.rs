//! Error types for the IR.

/// Errors found while validating a function.
#[derive(Debug, thiserror::Error)]
pub enum IrError {
    /// A handle index is out of bounds for its arena.
    #[error("{arena} handle index {index} out of bounds (arena size: {size})")]
    BadHandle {
        arena: &'static str,
        index: usize,
        size: usize,
    },

    /// The buffer map names a parameter the function does not declare.
    #[error("buffer map entry '{0}' is not a function parameter")]
    UnboundParam(String),
}
