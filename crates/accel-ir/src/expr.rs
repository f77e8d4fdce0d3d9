//! Expressions: pure values with no side effects.

use crate::arena::Handle;
use crate::buffer::Buffer;
use crate::types::DataType;

/// A named scalar variable (loop iterator, parameter or buffer data pointer).
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Var {
    pub name: String,
    pub dtype: DataType,
}

impl Var {
    pub fn new(name: impl Into<String>, dtype: DataType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }

    /// A pointer-typed variable, as used for buffer data.
    pub fn handle(name: impl Into<String>) -> Self {
        Self::new(name, DataType::HANDLE)
    }
}

/// A binary operator.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    FloorDivide,
    FloorModulo,
    Min,
    Max,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    LogicalAnd,
    LogicalOr,
}

/// Who implements a [`Expression::Call`].
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum Callee {
    /// An externally implemented routine, opaque to the IR.
    Extern(String),
    /// A runtime packed function.
    Packed(String),
    /// A built-in intrinsic (e.g. `exp`, `q_multiply_shift`).
    Intrinsic(String),
}

impl Callee {
    pub fn name(&self) -> &str {
        match self {
            Self::Extern(name) | Self::Packed(name) | Self::Intrinsic(name) => name,
        }
    }
}

/// An expression node. Stored in a per-function arena and referenced by
/// [`Handle<Expression>`].
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    IntImm {
        value: i64,
        dtype: DataType,
    },
    FloatImm {
        value: f64,
        dtype: DataType,
    },
    StringImm(String),
    Var(Var),
    /// Read one element of a buffer.
    BufferLoad {
        buffer: Handle<Buffer>,
        indices: Vec<Handle<Expression>>,
    },
    Binary {
        op: BinaryOp,
        left: Handle<Expression>,
        right: Handle<Expression>,
    },
    Cast {
        dtype: DataType,
        value: Handle<Expression>,
    },
    Select {
        condition: Handle<Expression>,
        accept: Handle<Expression>,
        reject: Handle<Expression>,
    },
    Call {
        callee: Callee,
        dtype: DataType,
        args: Vec<Handle<Expression>>,
    },
}

impl Expression {
    /// A 32-bit integer literal.
    pub fn int(value: i64) -> Self {
        Self::IntImm {
            value,
            dtype: DataType::INT32,
        }
    }

    /// Returns the value of an integer literal.
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Self::IntImm { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Returns the value of a numeric literal, widening integers.
    pub fn as_float(&self) -> Option<f64> {
        match *self {
            Self::FloatImm { value, .. } => Some(value),
            Self::IntImm { value, .. } => Some(value as f64),
            _ => None,
        }
    }

    /// Returns the operand handles of this expression.
    pub fn operands(&self) -> Vec<Handle<Expression>> {
        match self {
            Self::IntImm { .. } | Self::FloatImm { .. } | Self::StringImm(_) | Self::Var(_) => {
                vec![]
            }
            Self::BufferLoad { indices, .. } => indices.clone(),
            Self::Binary { left, right, .. } => vec![*left, *right],
            Self::Cast { value, .. } => vec![*value],
            Self::Select {
                condition,
                accept,
                reject,
            } => vec![*condition, *accept, *reject],
            Self::Call { args, .. } => args.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;

    #[test]
    fn literal_accessors() {
        assert_eq!(Expression::int(-5).as_int(), Some(-5));
        assert_eq!(Expression::int(3).as_float(), Some(3.0));
        let f = Expression::FloatImm {
            value: 0.5,
            dtype: DataType::FLOAT32,
        };
        assert_eq!(f.as_int(), None);
        assert_eq!(f.as_float(), Some(0.5));
        assert_eq!(Expression::StringImm("x".into()).as_int(), None);
    }

    #[test]
    fn operands_of_binary() {
        let mut exprs = Arena::new();
        let a = exprs.append(Expression::int(1));
        let b = exprs.append(Expression::int(2));
        let add = Expression::Binary {
            op: BinaryOp::Add,
            left: a,
            right: b,
        };
        assert_eq!(add.operands(), vec![a, b]);
        assert!(exprs[a].operands().is_empty());
    }

    #[test]
    fn callee_name() {
        assert_eq!(Callee::Extern("uop_gemm".into()).name(), "uop_gemm");
        assert_eq!(Callee::Intrinsic("exp".into()).name(), "exp");
    }
}
