//! Zero-point and scale extraction, and loop-nest precondition checks.

use accel_ir::{Attr, Expression, Handle, PrimFunc, Statement, post_order_visit};

use crate::error::OffloadError;
use crate::match_spec::MatchSpec;
use crate::matcher::LoopNest;

/// Data-pointer name prefix of the constant buffers that carry zero-points.
pub const RESERVED_CONST_PREFIX: &str = "compile_engine_const";

pub const ATTR_IN1_ZP: &str = "in1_zp";
pub const ATTR_IN2_ZP: &str = "in2_zp";
pub const ATTR_OUT_ZP: &str = "out_zp";
pub const ATTR_SCALE: &str = "scale";

/// Where a function's zero-points came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZeroPointSource {
    /// `in1_zp`, `in2_zp` and `out_zp` function attributes.
    Attributes,
    /// Literal stores into reserved constant buffers.
    ReservedStores,
}

/// Quantisation parameters of a function.
#[derive(Clone, Debug, PartialEq)]
pub struct ZeroPoints {
    pub values: Vec<i64>,
    /// Only known when the parameters come from attributes.
    pub scale: Option<f64>,
    pub source: ZeroPointSource,
}

/// Extracts zero-points and scale from `func`.
///
/// When `in2_zp` is set, the values are `[in1_zp, in2_zp, out_zp]` and the
/// scale is read from `scale`. Otherwise every store into a reserved constant
/// buffer contributes one value, in post-order; the scale is then unknown.
pub fn extract_zero_points(func: &PrimFunc) -> Result<ZeroPoints, OffloadError> {
    if func.attrs.contains_key(ATTR_IN2_ZP) {
        let values = [ATTR_IN1_ZP, ATTR_IN2_ZP, ATTR_OUT_ZP]
            .into_iter()
            .map(|key| match func.attrs.get(key) {
                Some(Attr::Int(v)) => Ok(*v),
                Some(_) => Err(OffloadError::AttrType {
                    key,
                    expected: "an integer",
                }),
                None => Err(OffloadError::IncompleteZeroPointAttrs(key)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let scale = match func.attrs.get(ATTR_SCALE) {
            Some(Attr::Float(v)) => Some(*v),
            Some(Attr::Int(v)) => Some(*v as f64),
            Some(Attr::Str(_)) => {
                return Err(OffloadError::AttrType {
                    key: ATTR_SCALE,
                    expected: "a number",
                });
            }
            None => None,
        };
        return Ok(ZeroPoints {
            values,
            scale,
            source: ZeroPointSource::Attributes,
        });
    }

    let mut values = Vec::new();
    let mut error = None;
    post_order_visit(&func.statements, func.body, &mut |_, stmt: &Statement| {
        let Statement::Store { buffer, value, .. } = stmt else {
            return;
        };
        let Some(buf) = func.buffers.try_get(*buffer) else {
            return;
        };
        if !buf.data.name.starts_with(RESERVED_CONST_PREFIX) {
            return;
        }
        match int_literal(func, *value) {
            Some(v) => values.push(v),
            None => {
                error.get_or_insert_with(|| {
                    OffloadError::NonLiteralZeroPoint(buf.data.name.clone())
                });
            }
        }
    });
    if let Some(err) = error {
        return Err(err);
    }
    Ok(ZeroPoints {
        values,
        scale: None,
        source: ZeroPointSource::ReservedStores,
    })
}

/// Reads an integer literal, looking through casts.
fn int_literal(func: &PrimFunc, handle: Handle<Expression>) -> Option<i64> {
    match func.expressions.try_get(handle)? {
        Expression::IntImm { value, .. } => Some(*value),
        Expression::Cast { value, .. } => int_literal(func, *value),
        _ => None,
    }
}

/// Counts every buffer store in the function body.
pub fn count_stores(func: &PrimFunc) -> usize {
    let mut count = 0;
    post_order_visit(&func.statements, func.body, &mut |_, stmt: &Statement| {
        if matches!(stmt, Statement::Store { .. }) {
            count += 1;
        }
    });
    count
}

/// Every loop must start at 0.
pub fn check_loop_starts(nest: &LoopNest) -> Result<(), OffloadError> {
    match nest.loops.iter().find(|l| l.start != 0) {
        Some(l) => Err(OffloadError::NonZeroStart {
            var: l.var.clone(),
            start: l.start,
        }),
        None => Ok(()),
    }
}

/// Rejects kernels whose height and width are both even.
pub fn check_kernel_parity(spec: &MatchSpec, nest: &LoopNest) -> Result<(), OffloadError> {
    let Some((kh, kw)) = &spec.kernel_parity else {
        return Ok(());
    };
    let kh = nest.get(spec, kh)?.extent;
    let kw = nest.get(spec, kw)?.extent;
    if kh % 2 == 0 && kw % 2 == 0 {
        return Err(OffloadError::EvenKernel { kh, kw });
    }
    Ok(())
}
