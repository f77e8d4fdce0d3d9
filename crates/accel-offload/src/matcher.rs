//! Locating a named block and reading the loops around it.

use accel_ir::{Buffer, Expression, Handle, PrimFunc, Statement, Var, find_path};

use crate::error::OffloadError;
use crate::match_spec::MatchSpec;

/// One loop level around a matched block.
#[derive(Clone, Debug, PartialEq)]
pub struct LoopDescriptor {
    pub var: String,
    pub start: i64,
    pub extent: i64,
    /// The `For` statement of this level.
    pub stmt: Handle<Statement>,
}

/// The loops enclosing a block, outermost first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoopNest {
    pub loops: Vec<LoopDescriptor>,
}

impl LoopNest {
    pub fn depth(&self) -> usize {
        self.loops.len()
    }

    /// Returns the loop bound to `key` by `spec`.
    pub fn get(&self, spec: &MatchSpec, key: &str) -> Result<&LoopDescriptor, OffloadError> {
        spec.loop_position(key)
            .and_then(|pos| self.loops.get(pos))
            .ok_or_else(|| OffloadError::MissingLoopKey(key.into()))
    }

    /// Extents of the loops named by `spec.arg_keys`, in key order.
    pub fn arg_extents(&self, spec: &MatchSpec) -> Result<Vec<i64>, OffloadError> {
        spec.arg_keys
            .iter()
            .map(|key| self.get(spec, key).map(|l| l.extent))
            .collect()
    }

    /// Product of all extents.
    pub fn element_count(&self) -> Result<i64, OffloadError> {
        self.loops
            .iter()
            .try_fold(1i64, |acc, l| acc.checked_mul(l.extent))
            .ok_or_else(|| OffloadError::ElementCountOverflow {
                extents: self.loops.iter().map(|l| l.extent).collect(),
            })
    }
}

/// A buffer-map entry, in call-argument order.
#[derive(Clone, Debug, PartialEq)]
pub struct BufferBinding {
    pub param: String,
    pub buffer: Handle<Buffer>,
    /// The buffer's data pointer; this is what the extern call receives.
    pub data: Var,
}

fn is_block_named(name: &str) -> impl Fn(&Statement) -> bool + '_ {
    move |stmt: &Statement| matches!(stmt, Statement::Block { name: n, .. } if n == name)
}

/// Returns `true` if `func` contains a block called `name`.
pub fn find_block(func: &PrimFunc, name: &str) -> bool {
    find_path(&func.statements, func.body, &is_block_named(name)).is_some()
}

/// Reads the loops between block `name` and its nearest enclosing block (or
/// the function root).
///
/// With `expected` set, the number of loops must match exactly.
pub fn extract_loop_nest(
    func: &PrimFunc,
    name: &str,
    expected: Option<usize>,
) -> Result<LoopNest, OffloadError> {
    let path = find_path(&func.statements, func.body, &is_block_named(name))
        .ok_or_else(|| OffloadError::BlockNotFound(name.into()))?;

    let mut loops = Vec::new();
    // The last entry is the block itself.
    for &handle in path[..path.len() - 1].iter().rev() {
        match &func.statements[handle] {
            Statement::For {
                var, min, extent, ..
            } => {
                let literal = |h: Handle<Expression>, field: &'static str| {
                    func.expressions[h]
                        .as_int()
                        .ok_or_else(|| OffloadError::NonLiteral {
                            var: var.name.clone(),
                            field,
                        })
                };
                loops.push(LoopDescriptor {
                    var: var.name.clone(),
                    start: literal(*min, "start")?,
                    extent: literal(*extent, "extent")?,
                    stmt: handle,
                });
            }
            Statement::Block { .. } => break,
            _ => {}
        }
    }
    loops.reverse();

    if let Some(expected) = expected
        && loops.len() != expected
    {
        return Err(OffloadError::LoopCount {
            block: name.into(),
            expected,
            found: loops.len(),
        });
    }
    log::debug!(
        "block '{name}' in '{}': {} loop(s) [{}]",
        func.name,
        loops.len(),
        loops
            .iter()
            .map(|l| format!("{}:{}", l.var, l.extent))
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(LoopNest { loops })
}

/// Returns the function's buffer bindings in buffer-map order.
pub fn buffer_bindings(func: &PrimFunc) -> Result<Vec<BufferBinding>, OffloadError> {
    func.buffer_map
        .iter()
        .map(|(param, handle)| {
            let buffer = func
                .buffers
                .try_get(*handle)
                .ok_or_else(|| OffloadError::UnboundBuffer(param.clone()))?;
            Ok(BufferBinding {
                param: param.clone(),
                buffer: *handle,
                data: buffer.data.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use accel_ir::DataType;

    fn dense(loops: &[(&str, i64, i64)]) -> PrimFunc {
        let mut f = PrimFunc::new("dense");
        f.add_param_buffer("p0", Buffer::new("A", DataType::INT8, vec![1, 16]));
        f.add_param_buffer("p1", Buffer::new("B", DataType::INT8, vec![8, 16]));
        let out = f.add_param_buffer("p2", Buffer::new("T_matmul_NT", DataType::INT32, vec![1, 8]));
        let zero = f.int(0);
        let store = f.store(out, vec![zero, zero], zero);
        let block = f.block("T_matmul_NT", store);
        let nest = f.loop_nest(loops, block);
        f.with_body(nest)
    }

    #[test]
    fn nest_outermost_first() {
        let f = dense(&[("i0", 0, 1), ("i1", 0, 8), ("k", 0, 16)]);
        assert!(find_block(&f, "T_matmul_NT"));
        assert!(!find_block(&f, "conv2d_nchw"));
        let nest = extract_loop_nest(&f, "T_matmul_NT", Some(3)).unwrap();
        let extents: Vec<_> = nest.loops.iter().map(|l| l.extent).collect();
        assert_eq!(extents, [1, 8, 16]);
        assert_eq!(nest.loops[0].stmt, f.body);
        assert_eq!(nest.element_count().unwrap(), 128);
    }

    #[test]
    fn wrong_depth_is_a_mismatch() {
        let f = dense(&[("i1", 0, 8), ("k", 0, 16)]);
        let err = extract_loop_nest(&f, "T_matmul_NT", Some(3)).unwrap_err();
        assert!(matches!(
            err,
            OffloadError::LoopCount {
                expected: 3,
                found: 2,
                ..
            }
        ));
        assert_eq!(extract_loop_nest(&f, "T_matmul_NT", None).unwrap().depth(), 2);
    }

    #[test]
    fn nest_stops_at_enclosing_block() {
        let mut f = PrimFunc::new("k");
        let out = f.add_param_buffer("p0", Buffer::new("C", DataType::INT32, vec![4]));
        let zero = f.int(0);
        let store = f.store(out, vec![zero], zero);
        let inner = f.block("compute", store);
        let inner_loop = f.serial_loop("j", 0, 4, inner);
        let root = f.block("root", inner_loop);
        let outer = f.serial_loop("i", 0, 2, root);
        let f = f.with_body(outer);
        let nest = extract_loop_nest(&f, "compute", None).unwrap();
        assert_eq!(nest.depth(), 1);
        assert_eq!(nest.loops[0].var, "j");
    }

    #[test]
    fn symbolic_extent_is_rejected() {
        let mut f = dense(&[("i0", 0, 1)]);
        let n = f.append_expr(Expression::Var(Var::new("n", DataType::INT32)));
        let zero = f.int(0);
        let body = f.body;
        let for_ = f.append_stmt(Statement::For {
            var: Var::new("outer", DataType::INT32),
            min: zero,
            extent: n,
            kind: Default::default(),
            body,
        });
        let f = f.with_body(for_);
        let err = extract_loop_nest(&f, "T_matmul_NT", None).unwrap_err();
        assert!(matches!(err, OffloadError::NonLiteral { field: "extent", .. }));
    }

    #[test]
    fn arg_extents_in_key_order() {
        let spec = crate::shapes::vanilla_dense();
        let f = dense(&[("i0", 0, 1), ("i1", 0, 8), ("k", 0, 16)]);
        let nest = extract_loop_nest(&f, "T_matmul_NT", Some(3)).unwrap();
        // ilen, olen, hidden
        assert_eq!(nest.arg_extents(&spec).unwrap(), [16, 8, 1]);
    }

    #[test]
    fn bindings_follow_buffer_map() {
        let f = dense(&[("i0", 0, 1)]);
        let names: Vec<_> = buffer_bindings(&f)
            .unwrap()
            .into_iter()
            .map(|b| b.data.name)
            .collect();
        assert_eq!(names, ["A", "B", "T_matmul_NT"]);
    }
}
