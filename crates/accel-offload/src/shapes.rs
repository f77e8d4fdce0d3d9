//! Built-in shapes for the supported accelerators.

use std::fmt;
use std::str::FromStr;

use crate::match_spec::{MatchSpec, SeqPrune};

/// An accelerator with a built-in set of offloadable shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Accelerator {
    /// Float kernels: conv2d, dense, relu, depthwise conv2d.
    VanillaExtended,
    /// Quantised kernels with zero-point arguments: conv2d, dense, relu.
    ///
    /// There is no quantised depthwise conv2d. Its lowered block is named
    /// `compute_2`, the same as the quantised conv2d block, so a depthwise
    /// shape here would be matched against conv2d functions (and the conv2d
    /// shape against depthwise ones).
    QVanilla,
    /// Quantised batch matmul driven by a command stream.
    QChocolate,
}

impl Accelerator {
    pub const ALL: [Self; 3] = [Self::VanillaExtended, Self::QVanilla, Self::QChocolate];

    pub fn name(self) -> &'static str {
        match self {
            Self::VanillaExtended => "vanilla_extended",
            Self::QVanilla => "q_vanilla_accelerator",
            Self::QChocolate => "qchocolate",
        }
    }

    /// Shapes in the order their passes run.
    pub fn shapes(self) -> Vec<MatchSpec> {
        match self {
            Self::VanillaExtended => vec![
                vanilla_conv2d(),
                vanilla_dense(),
                vanilla_relu(),
                vanilla_depthwise_conv2d(),
            ],
            Self::QVanilla => vec![q_vanilla_conv2d(), q_vanilla_dense(), q_vanilla_relu()],
            Self::QChocolate => vec![qchocolate_batch_matmul()],
        }
    }
}

impl fmt::Display for Accelerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Accelerator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|a| a.name()).collect();
                format!("unknown accelerator '{s}' (known: {})", known.join(", "))
            })
    }
}

const CONV2D_LOOPS: [&str; 7] = ["n", "co", "h", "w", "ci", "kh", "kw"];
const CONV2D_ARGS: [&str; 6] = ["co", "w", "h", "ci", "kh", "kw"];
const DENSE_LOOPS: [&str; 3] = ["hidden", "olen", "ilen"];
const DENSE_ARGS: [&str; 3] = ["ilen", "olen", "hidden"];

/// NCHW conv2d; the call replaces the output-channel loop and the padding
/// stage in front of it is dropped.
pub fn vanilla_conv2d() -> MatchSpec {
    MatchSpec::new("conv2d_nchw", "vanilla_extended_conv2dnchw")
        .with_loops(&CONV2D_LOOPS)
        .with_args(&CONV2D_ARGS)
        .with_entry_loop(1)
        .with_kernel_parity("kh", "kw")
        .with_seq_prune(SeqPrune::Keep(1))
}

pub fn vanilla_dense() -> MatchSpec {
    MatchSpec::new("T_matmul_NT", "vanilla_extended_dense")
        .with_loops(&DENSE_LOOPS)
        .with_args(&DENSE_ARGS)
}

/// Elementwise relu over a tensor of any rank; the call receives the total
/// element count.
pub fn vanilla_relu() -> MatchSpec {
    MatchSpec::new("T_relu", "vanilla_extended_relu")
        .with_open_loops(&["x"])
        .with_element_count()
        .with_seq_prune(SeqPrune::Keep(1))
}

pub fn vanilla_depthwise_conv2d() -> MatchSpec {
    MatchSpec::new("DepthwiseConv2d", "vanilla_extended_depthconv2dnchw")
        .with_loops(&["b", "c", "i", "j", "di", "dj"])
        .with_args(&["b", "c", "i", "j", "di", "dj"])
        .with_entry_loop(1)
        .with_seq_prune(SeqPrune::Keep(1))
}

/// Quantised conv2d. The function body is a sequence of zero-point
/// constants, the convolution and the requantisation stores; the
/// convolution sits three stores from the end.
pub fn q_vanilla_conv2d() -> MatchSpec {
    MatchSpec::new("compute_2", "q_vanilla_accelerator_conv2dnchw")
        .with_loops(&CONV2D_LOOPS)
        .with_args(&CONV2D_ARGS)
        .with_entry_loop(1)
        .with_kernel_parity("kh", "kw")
        .with_zero_points(2)
        .with_seq_prune(SeqPrune::FromStoreCount { minus: 3 })
}

pub fn q_vanilla_dense() -> MatchSpec {
    MatchSpec::new("compute", "q_vanilla_accelerator_dense")
        .with_loops(&DENSE_LOOPS)
        .with_args(&DENSE_ARGS)
        .with_zero_points(2)
        .with_seq_prune(SeqPrune::FromStoreCount { minus: 3 })
}

pub fn q_vanilla_relu() -> MatchSpec {
    MatchSpec::new("compute", "q_vanilla_accelerator_relu")
        .with_open_loops(&["x"])
        .with_element_count()
        .with_seq_prune(SeqPrune::Keep(1))
}

/// Batch matmul `[b, i, j, k]`; only buffers and zero-points are passed.
pub fn qchocolate_batch_matmul() -> MatchSpec {
    MatchSpec::new("T_batch_matmul_NT", "qchocolate_batch_matmul")
        .with_loops(&["b", "i", "j", "k"])
        .with_entry_loop(1)
        .with_zero_points(2)
        .with_seq_prune(SeqPrune::FromStoreCount { minus: 2 })
}
