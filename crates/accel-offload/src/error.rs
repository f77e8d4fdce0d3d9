//! Error types for the offload passes.

use std::fmt;

/// How a failed match is classified.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// The function does not have the shape the accelerator routine expects.
    StructuralMismatch,
    /// The function has the right shape but violates a precondition of the
    /// routine (nonzero loop start, unsupported kernel size, ...).
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::StructuralMismatch => "structural mismatch",
            Self::InvariantViolation => "invariant violation",
        })
    }
}

/// Errors raised while matching or rewriting a function.
///
/// None of these abort compilation: the offload pass records them as
/// diagnostics and leaves the function unchanged.
#[derive(Debug, thiserror::Error)]
pub enum OffloadError {
    #[error("block '{0}' not found")]
    BlockNotFound(String),

    #[error("block '{block}' is nested in {found} loop(s), expected {expected}")]
    LoopCount {
        block: String,
        expected: usize,
        found: usize,
    },

    #[error("loop '{var}' has a non-literal {field}")]
    NonLiteral { var: String, field: &'static str },

    #[error("loop '{var}' starts at {start}, expected 0")]
    NonZeroStart { var: String, start: i64 },

    #[error("loop key '{0}' is not bound to a loop level")]
    MissingLoopKey(String),

    #[error("entry loop level {level} is outside a nest of {depth} loop(s)")]
    EntryLevel { level: usize, depth: usize },

    #[error("even kernel size {kh}x{kw} is not supported")]
    EvenKernel { kh: i64, kw: i64 },

    #[error("sequence pruning index {index} is out of range for a sequence of {len}")]
    PruneIndex { index: i64, len: usize },

    #[error("function attribute '{0}' is required when 'in2_zp' is set")]
    IncompleteZeroPointAttrs(&'static str),

    #[error("function attribute '{key}' is not {expected}")]
    AttrType {
        key: &'static str,
        expected: &'static str,
    },

    #[error("reserved store into '{0}' does not hold an integer literal")]
    NonLiteralZeroPoint(String),

    #[error("routine needs {expected} zero-point(s), found {found}")]
    MissingZeroPoints { expected: usize, found: usize },

    #[error("buffer map entry '{0}' has no buffer")]
    UnboundBuffer(String),

    #[error("invalid match spec for '{block}': {reason}")]
    InvalidSpec { block: String, reason: String },

    #[error("malformed function")]
    InvalidIr(#[from] accel_ir::IrError),

    #[error("element count of loop extents {extents:?} overflows a 64-bit integer")]
    ElementCountOverflow { extents: Vec<i64> },
}

impl OffloadError {
    /// Classifies this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::BlockNotFound(_)
            | Self::LoopCount { .. }
            | Self::NonLiteral { .. }
            | Self::MissingLoopKey(_)
            | Self::EntryLevel { .. }
            | Self::UnboundBuffer(_)
            | Self::InvalidSpec { .. }
            | Self::InvalidIr(_) => ErrorClass::StructuralMismatch,
            Self::NonZeroStart { .. }
            | Self::EvenKernel { .. }
            | Self::PruneIndex { .. }
            | Self::IncompleteZeroPointAttrs(_)
            | Self::AttrType { .. }
            | Self::NonLiteralZeroPoint(_)
            | Self::MissingZeroPoints { .. }
            | Self::ElementCountOverflow { .. } => ErrorClass::InvariantViolation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes() {
        let e = OffloadError::LoopCount {
            block: "conv2d_nchw".into(),
            expected: 7,
            found: 6,
        };
        assert_eq!(e.class(), ErrorClass::StructuralMismatch);
        assert_eq!(
            e.to_string(),
            "block 'conv2d_nchw' is nested in 6 loop(s), expected 7"
        );

        let e = OffloadError::EvenKernel { kh: 4, kw: 4 };
        assert_eq!(e.class(), ErrorClass::InvariantViolation);
        assert_eq!(e.to_string(), "even kernel size 4x4 is not supported");
    }

    #[test]
    fn malformed_ir_is_a_structural_mismatch() {
        let e = OffloadError::from(accel_ir::IrError::UnboundParam("A".into()));
        assert_eq!(e.class(), ErrorClass::StructuralMismatch);

        let e = OffloadError::ElementCountOverflow {
            extents: vec![i64::MAX, 2],
        };
        assert_eq!(e.class(), ErrorClass::InvariantViolation);
    }

    #[test]
    fn class_display() {
        assert_eq!(
            ErrorClass::InvariantViolation.to_string(),
            "invariant violation"
        );
    }
}
