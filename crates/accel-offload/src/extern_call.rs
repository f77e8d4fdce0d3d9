//! Extern calls: building them for a rewrite and reading them back.

use std::fmt;

use accel_ir::{Callee, DataType, Expression, Handle, PrimFunc, Statement, Var, post_order_visit};

/// One argument of an extern call.
#[derive(Clone, Debug, PartialEq)]
pub enum CallArg {
    /// A buffer data pointer, by name.
    Buffer(String),
    Int(i64),
    /// Any other expression (kept so argument positions stay stable).
    Other,
}

impl fmt::Display for CallArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffer(name) => f.write_str(name),
            Self::Int(v) => write!(f, "{v}"),
            Self::Other => f.write_str("_"),
        }
    }
}

/// A call to an externally implemented routine.
#[derive(Clone, Debug, PartialEq)]
pub struct ExternCall {
    pub name: String,
    pub args: Vec<CallArg>,
}

impl ExternCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn push_buffer(&mut self, data: &Var) {
        self.args.push(CallArg::Buffer(data.name.clone()));
    }

    pub fn push_int(&mut self, value: i64) {
        self.args.push(CallArg::Int(value));
    }

    /// Returns argument `index` if it is an integer literal.
    pub fn int_arg(&self, index: usize) -> Option<i64> {
        match self.args.get(index)? {
            CallArg::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Names of the buffer arguments, in order.
    pub fn buffer_args(&self) -> impl Iterator<Item = &str> {
        self.args.iter().filter_map(|arg| match arg {
            CallArg::Buffer(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Appends the call expression to `func` and returns it.
    pub fn lower(&self, func: &mut PrimFunc) -> Handle<Expression> {
        let args = self
            .args
            .iter()
            .map(|arg| match arg {
                CallArg::Buffer(name) => {
                    func.append_expr(Expression::Var(Var::handle(name.clone())))
                }
                CallArg::Int(v) => func.int(*v),
                CallArg::Other => func.int(0),
            })
            .collect();
        func.append_expr(Expression::Call {
            callee: Callee::Extern(self.name.clone()),
            dtype: DataType::INT32,
            args,
        })
    }

    /// Reads an extern call expression back; `None` for anything else.
    pub fn from_expr(func: &PrimFunc, handle: Handle<Expression>) -> Option<Self> {
        let Expression::Call {
            callee: Callee::Extern(name),
            args,
            ..
        } = func.expressions.try_get(handle)?
        else {
            return None;
        };
        let args = args
            .iter()
            .map(|&arg| match func.expressions.try_get(arg) {
                Some(Expression::Var(var)) if var.dtype == DataType::HANDLE => {
                    CallArg::Buffer(var.name.clone())
                }
                Some(Expression::IntImm { value, .. }) => CallArg::Int(*value),
                _ => CallArg::Other,
            })
            .collect();
        Some(Self {
            name: name.clone(),
            args,
        })
    }
}

impl fmt::Display for ExternCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}

fn visit_expr(func: &PrimFunc, handle: Handle<Expression>, out: &mut Vec<ExternCall>) {
    let Some(expr) = func.expressions.try_get(handle) else {
        return;
    };
    for operand in expr.operands() {
        visit_expr(func, operand, out);
    }
    if let Some(call) = ExternCall::from_expr(func, handle) {
        out.push(call);
    }
}

/// Collects every extern call in the function body, in post-order.
pub fn extract_extern_calls(func: &PrimFunc) -> Vec<ExternCall> {
    let mut calls = Vec::new();
    post_order_visit(&func.statements, func.body, &mut |_, stmt: &Statement| {
        let roots: Vec<Handle<Expression>> = match stmt {
            Statement::Evaluate(e) => vec![*e],
            Statement::Let { value, .. } => vec![*value],
            Statement::Store { indices, value, .. } => {
                indices.iter().copied().chain([*value]).collect()
            }
            Statement::For { min, extent, .. } => vec![*min, *extent],
            Statement::IfThenElse { condition, .. } => vec![*condition],
            Statement::Seq(_) | Statement::Block { .. } | Statement::Allocate { .. } => vec![],
        };
        for root in roots {
            visit_expr(func, root, &mut calls);
        }
    });
    calls
}
