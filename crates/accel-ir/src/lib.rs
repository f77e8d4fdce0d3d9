//! Accelerator offload intermediate representation.
//!
//! A loop-level tensor IR for primitive functions: nested loops, named
//! compute blocks and buffer stores. Nodes live in per-function arenas and
//! are referenced by [`Handle`]s; rewrites append new nodes rather than
//! mutating existing ones.

pub mod arena;
mod buffer;
mod display;
mod error;
mod expr;
mod func;
mod stmt;
mod types;
pub mod walk;

pub use arena::{Arena, Handle};
pub use buffer::{Buffer, StorageScope};
pub use display::{dump_function, dump_module, format_expr};
pub use error::IrError;
pub use expr::{BinaryOp, Callee, Expression, Var};
pub use func::{Attr, Module, PrimFunc};
pub use stmt::{ForKind, Statement, StatementKind};
pub use types::{DataType, TypeCode};
pub use walk::{Rewrite, Visit, find_path, post_order_visit, transform};
