//! Display implementations and text dump for debugging.

use std::fmt;

use crate::arena::Handle;
use crate::buffer::StorageScope;
use crate::expr::{BinaryOp, Callee, Expression};
use crate::func::{Module, PrimFunc};
use crate::stmt::{ForKind, Statement};

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::FloorDivide => "//",
            Self::FloorModulo => "%",
            Self::Min => "min",
            Self::Max => "max",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LogicalAnd => "&&",
            Self::LogicalOr => "||",
        })
    }
}

impl fmt::Display for ForKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Serial => "serial",
            Self::Parallel => "parallel",
            Self::Vectorized => "vectorized",
            Self::Unrolled => "unroll",
        })
    }
}

impl fmt::Display for StorageScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Global => "global",
            Self::Shared => "shared",
            Self::Local => "local",
        })
    }
}

/// Formats one expression of `func` as inline text.
pub fn format_expr(func: &PrimFunc, handle: Handle<Expression>) -> String {
    let mut out = String::new();
    write_expr(&mut out, func, handle);
    out
}

fn write_expr(out: &mut String, func: &PrimFunc, handle: Handle<Expression>) {
    let Some(expr) = func.expressions.try_get(handle) else {
        out.push_str(&format!("<bad {handle:?}>"));
        return;
    };
    match expr {
        Expression::IntImm { value, .. } => {
            out.push_str(&format!("{value}"));
        }
        Expression::FloatImm { value, .. } => {
            out.push_str(&format!("{value:?}f"));
        }
        Expression::StringImm(s) => {
            out.push_str(&format!("{s:?}"));
        }
        Expression::Var(var) => out.push_str(&var.name),
        Expression::BufferLoad { buffer, indices } => {
            out.push_str(buffer_name(func, *buffer));
            write_index_list(out, func, indices);
        }
        Expression::Binary { op, left, right } => match op {
            BinaryOp::Min | BinaryOp::Max => {
                out.push_str(&format!("{op}("));
                write_expr(out, func, *left);
                out.push_str(", ");
                write_expr(out, func, *right);
                out.push(')');
            }
            _ => {
                out.push('(');
                write_expr(out, func, *left);
                out.push_str(&format!(" {op} "));
                write_expr(out, func, *right);
                out.push(')');
            }
        },
        Expression::Cast { dtype, value } => {
            out.push_str(&format!("{dtype}("));
            write_expr(out, func, *value);
            out.push(')');
        }
        Expression::Select {
            condition,
            accept,
            reject,
        } => {
            out.push_str("select(");
            write_expr(out, func, *condition);
            out.push_str(", ");
            write_expr(out, func, *accept);
            out.push_str(", ");
            write_expr(out, func, *reject);
            out.push(')');
        }
        Expression::Call { callee, args, .. } => {
            let prefix = match callee {
                Callee::Extern(_) => "call_extern",
                Callee::Packed(_) => "call_packed",
                Callee::Intrinsic(_) => "call",
            };
            out.push_str(&format!("{prefix}({:?}", callee.name()));
            for &arg in args {
                out.push_str(", ");
                write_expr(out, func, arg);
            }
            out.push(')');
        }
    }
}

fn write_index_list(out: &mut String, func: &PrimFunc, indices: &[Handle<Expression>]) {
    out.push('[');
    for (i, &index) in indices.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_expr(out, func, index);
    }
    out.push(']');
}

fn buffer_name(func: &PrimFunc, handle: Handle<crate::Buffer>) -> &str {
    func.buffers
        .try_get(handle)
        .map_or("<bad buffer>", |b| b.name.as_str())
}

fn write_stmt(out: &mut String, func: &PrimFunc, handle: Handle<Statement>, depth: usize) {
    let pad = "  ".repeat(depth);
    let Some(stmt) = func.statements.try_get(handle) else {
        out.push_str(&format!("{pad}<bad {handle:?}>\n"));
        return;
    };
    match stmt {
        Statement::For {
            var,
            min,
            extent,
            kind,
            body,
        } => {
            out.push_str(&format!("{pad}for {} in {kind}(", var.name));
            write_expr(out, func, *min);
            out.push_str(", ");
            write_expr(out, func, *extent);
            out.push_str(") {\n");
            write_stmt(out, func, *body, depth + 1);
            out.push_str(&format!("{pad}}}\n"));
        }
        Statement::Seq(stmts) => {
            for &s in stmts {
                write_stmt(out, func, s, depth);
            }
        }
        Statement::Block { name, init, body } => {
            out.push_str(&format!("{pad}block {name:?} {{\n"));
            if let Some(init) = init {
                out.push_str(&format!("{pad}  init {{\n"));
                write_stmt(out, func, *init, depth + 2);
                out.push_str(&format!("{pad}  }}\n"));
            }
            write_stmt(out, func, *body, depth + 1);
            out.push_str(&format!("{pad}}}\n"));
        }
        Statement::Store {
            buffer,
            indices,
            value,
        } => {
            out.push_str(&pad);
            out.push_str(buffer_name(func, *buffer));
            write_index_list(out, func, indices);
            out.push_str(" = ");
            write_expr(out, func, *value);
            out.push('\n');
        }
        Statement::Evaluate(expr) => {
            out.push_str(&pad);
            write_expr(out, func, *expr);
            out.push('\n');
        }
        Statement::Let { var, value, body } => {
            out.push_str(&format!("{pad}let {} = ", var.name));
            write_expr(out, func, *value);
            out.push('\n');
            write_stmt(out, func, *body, depth);
        }
        Statement::IfThenElse {
            condition,
            then_case,
            else_case,
        } => {
            out.push_str(&format!("{pad}if "));
            write_expr(out, func, *condition);
            out.push_str(" {\n");
            write_stmt(out, func, *then_case, depth + 1);
            if let Some(else_case) = else_case {
                out.push_str(&format!("{pad}}} else {{\n"));
                write_stmt(out, func, *else_case, depth + 1);
            }
            out.push_str(&format!("{pad}}}\n"));
        }
        Statement::Allocate { buffer, body } => {
            if let Some(buf) = func.buffers.try_get(*buffer) {
                out.push_str(&format!(
                    "{pad}allocate {}: {}{:?} @{}\n",
                    buf.name, buf.dtype, buf.shape, buf.scope
                ));
            }
            write_stmt(out, func, *body, depth);
        }
    }
}

/// Produces a human-readable dump of one function.
pub fn dump_function(func: &PrimFunc) -> String {
    let mut out = String::new();
    let params: Vec<_> = func.params.iter().map(|p| p.name.as_str()).collect();
    out.push_str(&format!("func {}({}) {{\n", func.name, params.join(", ")));
    for (param, buffer) in &func.buffer_map {
        if let Some(buf) = func.buffers.try_get(*buffer) {
            out.push_str(&format!(
                "  // {param} -> {}: {}{:?}\n",
                buf.name, buf.dtype, buf.shape
            ));
        }
    }
    for (key, value) in &func.attrs {
        out.push_str(&format!("  // attr {key} = {value}\n"));
    }
    write_stmt(&mut out, func, func.body, 1);
    out.push_str("}\n");
    out
}

/// Produces a human-readable dump of every function in `module`.
pub fn dump_module(module: &Module) -> String {
    module
        .functions
        .iter()
        .map(dump_function)
        .collect::<Vec<_>>()
        .join("\n")
}
