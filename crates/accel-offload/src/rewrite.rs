//! The rewrite engine: replaces a matched block with an extern call.
//!
//! A rewrite runs in two phases. [`RewriteEngine::scan`] collects everything
//! the call needs into a [`MatchState`] and checks every precondition; only
//! then does [`RewriteEngine::rewrite`] walk the tree. The walk replaces the
//! entry loop with the call and collapses each statement sequence to the
//! child selected by the shape's pruning rule. Any failure happens before the
//! walk, so a function is either fully rewritten or returned as it was.

use accel_ir::{Handle, PrimFunc, Rewrite, Statement, StatementKind, Visit, transform};

use crate::error::OffloadError;
use crate::extern_call::ExternCall;
use crate::match_spec::MatchSpec;
use crate::matcher::{BufferBinding, LoopNest, buffer_bindings, extract_loop_nest, find_block};
use crate::params::{
    ZeroPoints, check_kernel_parity, check_loop_starts, count_stores, extract_zero_points,
};

/// Scratch state of one match, built per function and never shared.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchState<'s> {
    pub spec: &'s MatchSpec,
    pub loops: LoopNest,
    /// The loop replaced by the call.
    pub entry: Handle<Statement>,
    pub buffers: Vec<BufferBinding>,
    /// Present when the shape passes zero-points.
    pub zero_points: Option<ZeroPoints>,
    pub total_stores: usize,
    pub prune_index: Option<usize>,
    /// Product of the loop extents, when the shape passes it.
    pub element_count: Option<i64>,
}

/// A successful rewrite.
#[derive(Clone, Debug)]
pub struct Rewritten {
    pub func: PrimFunc,
    pub call: ExternCall,
}

/// Offloads one [`MatchSpec`].
#[derive(Clone, Debug)]
pub struct RewriteEngine {
    spec: MatchSpec,
}

impl RewriteEngine {
    pub fn new(spec: MatchSpec) -> Result<Self, OffloadError> {
        spec.validate()?;
        Ok(Self { spec })
    }

    pub fn spec(&self) -> &MatchSpec {
        &self.spec
    }

    /// Matches the block and checks every precondition of the rewrite.
    ///
    /// Returns `Ok(None)` when the function has no block of this shape.
    pub fn scan<'s>(&'s self, func: &PrimFunc) -> Result<Option<MatchState<'s>>, OffloadError> {
        let spec = &self.spec;
        func.validate()?;
        if !find_block(func, &spec.block_name) {
            return Ok(None);
        }

        let loops = extract_loop_nest(func, &spec.block_name, spec.loop_count)?;
        let entry = loops
            .loops
            .get(spec.entry_loop)
            .map(|l| l.stmt)
            .ok_or(OffloadError::EntryLevel {
                level: spec.entry_loop,
                depth: loops.depth(),
            })?;
        for key in &spec.loop_keys {
            loops.get(spec, key)?;
        }
        check_loop_starts(&loops)?;
        check_kernel_parity(spec, &loops)?;
        let element_count = if spec.append_element_count {
            Some(loops.element_count()?)
        } else {
            None
        };

        let buffers = buffer_bindings(func)?;
        let zero_points = if spec.zero_point_args > 0 {
            let zp = extract_zero_points(func)?;
            if zp.values.len() < spec.zero_point_args {
                return Err(OffloadError::MissingZeroPoints {
                    expected: spec.zero_point_args,
                    found: zp.values.len(),
                });
            }
            Some(zp)
        } else {
            None
        };

        let total_stores = count_stores(func);
        let prune_index = spec.seq_prune.index(total_stores)?;
        if let Some(index) = prune_index {
            check_sequences(func, func.body, entry, index)?;
        }

        Ok(Some(MatchState {
            spec,
            loops,
            entry,
            buffers,
            zero_points,
            total_stores,
            prune_index,
            element_count,
        }))
    }

    /// Builds the call for a scanned match: buffers, extents in key order,
    /// zero-points, then the element count if requested.
    pub fn build_call(&self, state: &MatchState<'_>) -> Result<ExternCall, OffloadError> {
        let mut call = ExternCall::new(self.spec.extern_name.clone());
        for binding in &state.buffers {
            call.push_buffer(&binding.data);
        }
        for extent in state.loops.arg_extents(&self.spec)? {
            call.push_int(extent);
        }
        if let Some(zp) = &state.zero_points {
            for &value in zp.values.iter().take(self.spec.zero_point_args) {
                call.push_int(value);
            }
        }
        if let Some(count) = state.element_count {
            call.push_int(count);
        }
        Ok(call)
    }

    /// Rewrites `func`, or returns `Ok(None)` if it has no matching block.
    pub fn rewrite(&self, func: &PrimFunc) -> Result<Option<Rewritten>, OffloadError> {
        let Some(state) = self.scan(func)? else {
            return Ok(None);
        };
        let call = self.build_call(&state)?;
        log::debug!("'{}': replacing {:?} with {call}", func.name, state.entry);

        let mut out = func.clone();
        let call_expr = call.lower(&mut out);
        let entry = state.entry;
        let prune_index = state.prune_index;
        let body = transform(
            &mut out.statements,
            out.body,
            &[StatementKind::For, StatementKind::Seq],
            &mut |visit: Visit<'_>| match visit.stmt {
                Statement::For { .. } if visit.origin == entry => {
                    Rewrite::Replace(Statement::Evaluate(call_expr))
                }
                Statement::Seq(children) => match prune_index.and_then(|i| children.get(i)) {
                    Some(&kept) => Rewrite::Redirect(kept),
                    None => Rewrite::Keep,
                },
                _ => Rewrite::Keep,
            },
        );
        Ok(Some(Rewritten {
            func: out.with_body(body),
            call,
        }))
    }
}

/// Every sequence that survives the rewrite must have a child at `index`.
/// Sequences under the entry loop are discarded with it and are not checked.
fn check_sequences(
    func: &PrimFunc,
    root: Handle<Statement>,
    entry: Handle<Statement>,
    index: usize,
) -> Result<(), OffloadError> {
    if root == entry {
        return Ok(());
    }
    let stmt = &func.statements[root];
    if let Statement::Seq(children) = stmt
        && index >= children.len()
    {
        return Err(OffloadError::PruneIndex {
            index: index as i64,
            len: children.len(),
        });
    }
    for child in stmt.children() {
        check_sequences(func, child, entry, index)?;
    }
    Ok(())
}
