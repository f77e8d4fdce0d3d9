//! Declarative description of one offloadable shape.

use std::fmt;

use crate::error::OffloadError;

/// Which child a sequence node collapses to once the match succeeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeqPrune {
    /// Sequence nodes are left as they are.
    Disabled,
    /// Keep the child at a fixed position.
    Keep(usize),
    /// Keep the child at `total_stores - minus`, where `total_stores` counts
    /// every buffer store in the function before the rewrite.
    FromStoreCount { minus: usize },
}

impl SeqPrune {
    /// Resolves the child position for a function with `total_stores` stores.
    pub fn index(self, total_stores: usize) -> Result<Option<usize>, OffloadError> {
        match self {
            Self::Disabled => Ok(None),
            Self::Keep(index) => Ok(Some(index)),
            Self::FromStoreCount { minus } => total_stores
                .checked_sub(minus)
                .map(Some)
                .ok_or(OffloadError::PruneIndex {
                    index: total_stores as i64 - minus as i64,
                    len: total_stores,
                }),
        }
    }
}

impl fmt::Display for SeqPrune {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("none"),
            Self::Keep(index) => write!(f, "seq[{index}]"),
            Self::FromStoreCount { minus } => write!(f, "seq[stores - {minus}]"),
        }
    }
}

/// Everything the rewrite engine needs to offload one compute block.
///
/// Loop keys name the loop levels around the block, outermost first. The
/// call receives the buffers in buffer-map order, then the extents of the
/// loops named by `arg_keys` in that order, then the first
/// `zero_point_args` zero-points, then (optionally) the element count.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchSpec {
    /// Name of the block to find.
    pub block_name: String,
    /// Routine that replaces the block.
    pub extern_name: String,
    /// Required number of enclosing loops, or `None` to accept any depth.
    pub loop_count: Option<usize>,
    pub loop_keys: Vec<String>,
    pub arg_keys: Vec<String>,
    /// Loop level replaced by the call (0 = outermost).
    pub entry_loop: usize,
    /// Append the product of all loop extents to the call.
    pub append_element_count: bool,
    /// Loop keys of the kernel height and width; the match is rejected when
    /// both extents are even.
    pub kernel_parity: Option<(String, String)>,
    pub zero_point_args: usize,
    pub seq_prune: SeqPrune,
}

impl MatchSpec {
    /// A spec with no loop constraints that replaces the outermost loop.
    pub fn new(block_name: impl Into<String>, extern_name: impl Into<String>) -> Self {
        Self {
            block_name: block_name.into(),
            extern_name: extern_name.into(),
            loop_count: None,
            loop_keys: Vec::new(),
            arg_keys: Vec::new(),
            entry_loop: 0,
            append_element_count: false,
            kernel_parity: None,
            zero_point_args: 0,
            seq_prune: SeqPrune::Disabled,
        }
    }

    /// Requires exactly `keys.len()` enclosing loops, named by `keys`.
    pub fn with_loops(mut self, keys: &[&str]) -> Self {
        self.loop_count = Some(keys.len());
        self.loop_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    /// Names the outer loop levels without constraining the depth.
    pub fn with_open_loops(mut self, keys: &[&str]) -> Self {
        self.loop_count = None;
        self.loop_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn with_args(mut self, keys: &[&str]) -> Self {
        self.arg_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn with_entry_loop(mut self, level: usize) -> Self {
        self.entry_loop = level;
        self
    }

    pub fn with_element_count(mut self) -> Self {
        self.append_element_count = true;
        self
    }

    pub fn with_kernel_parity(mut self, kh: &str, kw: &str) -> Self {
        self.kernel_parity = Some((kh.into(), kw.into()));
        self
    }

    pub fn with_zero_points(mut self, count: usize) -> Self {
        self.zero_point_args = count;
        self
    }

    pub fn with_seq_prune(mut self, prune: SeqPrune) -> Self {
        self.seq_prune = prune;
        self
    }

    /// Returns the nest position of loop `key`.
    pub fn loop_position(&self, key: &str) -> Option<usize> {
        self.loop_keys.iter().position(|k| k == key)
    }

    /// Checks that every referenced key is bound to a loop level.
    pub fn validate(&self) -> Result<(), OffloadError> {
        let invalid = |reason: String| OffloadError::InvalidSpec {
            block: self.block_name.clone(),
            reason,
        };
        if self.block_name.is_empty() || self.extern_name.is_empty() {
            return Err(invalid("block and routine names must be non-empty".into()));
        }
        let parity_keys = self
            .kernel_parity
            .iter()
            .flat_map(|(kh, kw)| [kh, kw]);
        for key in self.arg_keys.iter().chain(parity_keys) {
            if self.loop_position(key).is_none() {
                return Err(invalid(format!("key '{key}' is not a loop key")));
            }
        }
        for (i, key) in self.loop_keys.iter().enumerate() {
            if self.loop_keys[..i].contains(key) {
                return Err(invalid(format!("duplicate loop key '{key}'")));
            }
        }
        if let Some(count) = self.loop_count {
            if self.loop_keys.len() > count {
                return Err(invalid(format!(
                    "{} loop keys for {count} loop(s)",
                    self.loop_keys.len()
                )));
            }
            if self.entry_loop >= count {
                return Err(invalid(format!(
                    "entry loop {} outside {count} loop(s)",
                    self.entry_loop
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for MatchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.block_name, self.extern_name)?;
        match self.loop_count {
            Some(n) => write!(f, " [{n} loops: {}]", self.loop_keys.join(","))?,
            None => write!(f, " [any depth: {}]", self.loop_keys.join(","))?,
        }
        if !self.arg_keys.is_empty() {
            write!(f, " args({})", self.arg_keys.join(","))?;
        }
        if self.zero_point_args > 0 {
            write!(f, " +{} zp", self.zero_point_args)?;
        }
        if self.append_element_count {
            f.write_str(" +size")?;
        }
        write!(f, " entry={} prune={}", self.entry_loop, self.seq_prune)
    }
}
