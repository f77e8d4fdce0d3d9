//! Primitive functions and their construction helpers.

use std::collections::BTreeMap;
use std::fmt;

use crate::arena::{Arena, Handle};
use crate::buffer::Buffer;
use crate::error::IrError;
use crate::expr::{Expression, Var};
use crate::stmt::{ForKind, Statement};
use crate::types::DataType;

/// A function-level attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum Attr {
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// A lowered kernel: loops over buffers.
///
/// All nodes live in the function's own arenas. Rewrites append new nodes and
/// point [`body`](Self::body) at a new root; existing nodes are never changed.
#[derive(Clone, Debug, PartialEq)]
pub struct PrimFunc {
    pub name: String,
    /// Formal parameters, one pointer per bound buffer.
    pub params: Vec<Var>,
    pub buffers: Arena<Buffer>,
    /// Parameter name to buffer, in declaration order. The order is the
    /// positional order of buffer arguments in generated extern calls.
    pub buffer_map: Vec<(String, Handle<Buffer>)>,
    pub attrs: BTreeMap<String, Attr>,
    pub expressions: Arena<Expression>,
    pub statements: Arena<Statement>,
    pub body: Handle<Statement>,
}

impl PrimFunc {
    /// Creates a function whose body is an empty sequence.
    pub fn new(name: impl Into<String>) -> Self {
        let mut statements = Arena::new();
        let body = statements.append(Statement::Seq(Vec::new()));
        Self {
            name: name.into(),
            params: Vec::new(),
            buffers: Arena::new(),
            buffer_map: Vec::new(),
            attrs: BTreeMap::new(),
            expressions: Arena::new(),
            statements,
            body,
        }
    }

    /// Returns this function with `body` as its root statement.
    pub fn with_body(mut self, body: Handle<Statement>) -> Self {
        self.body = body;
        self
    }

    /// Declares a buffer that is not a parameter (e.g. a scratch allocation).
    pub fn add_buffer(&mut self, buffer: Buffer) -> Handle<Buffer> {
        self.buffers.append(buffer)
    }

    /// Declares a parameter bound to a new buffer.
    pub fn add_param_buffer(&mut self, param: impl Into<String>, buffer: Buffer) -> Handle<Buffer> {
        let param = param.into();
        self.params.push(Var::handle(param.clone()));
        let handle = self.buffers.append(buffer);
        self.buffer_map.push((param, handle));
        handle
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: Attr) {
        self.attrs.insert(key.into(), value);
    }

    pub fn append_expr(&mut self, expr: Expression) -> Handle<Expression> {
        self.expressions.append(expr)
    }

    pub fn append_stmt(&mut self, stmt: Statement) -> Handle<Statement> {
        self.statements.append(stmt)
    }

    /// Appends an `int32` literal.
    pub fn int(&mut self, value: i64) -> Handle<Expression> {
        self.append_expr(Expression::int(value))
    }

    /// Appends a reference to `var`.
    pub fn var(&mut self, var: &Var) -> Handle<Expression> {
        self.append_expr(Expression::Var(var.clone()))
    }

    /// Appends `buffer[indices] = value`.
    pub fn store(
        &mut self,
        buffer: Handle<Buffer>,
        indices: Vec<Handle<Expression>>,
        value: Handle<Expression>,
    ) -> Handle<Statement> {
        self.append_stmt(Statement::Store {
            buffer,
            indices,
            value,
        })
    }

    /// Appends a serial loop `for name in start..start + extent { body }`.
    pub fn serial_loop(
        &mut self,
        name: &str,
        start: i64,
        extent: i64,
        body: Handle<Statement>,
    ) -> Handle<Statement> {
        let min = self.int(start);
        let extent = self.int(extent);
        self.append_stmt(Statement::For {
            var: Var::new(name, DataType::INT32),
            min,
            extent,
            kind: ForKind::Serial,
            body,
        })
    }

    /// Wraps `body` in serial loops, `loops[0]` outermost. Each entry is
    /// `(name, start, extent)`.
    pub fn loop_nest(
        &mut self,
        loops: &[(&str, i64, i64)],
        body: Handle<Statement>,
    ) -> Handle<Statement> {
        loops
            .iter()
            .rev()
            .fold(body, |inner, &(name, start, extent)| {
                self.serial_loop(name, start, extent, inner)
            })
    }

    /// Appends a named block around `body`.
    pub fn block(&mut self, name: &str, body: Handle<Statement>) -> Handle<Statement> {
        self.append_stmt(Statement::Block {
            name: name.into(),
            init: None,
            body,
        })
    }

    pub fn seq(&mut self, stmts: Vec<Handle<Statement>>) -> Handle<Statement> {
        self.append_stmt(Statement::Seq(stmts))
    }

    /// Returns the buffer bound to parameter `param`.
    pub fn param_buffer(&self, param: &str) -> Option<Handle<Buffer>> {
        self.buffer_map
            .iter()
            .find(|(name, _)| name == param)
            .map(|&(_, handle)| handle)
    }

    /// Checks that every handle reachable from the body is in bounds.
    pub fn validate(&self) -> Result<(), IrError> {
        let check_expr = |h: Handle<Expression>| {
            if self.expressions.try_get(h).is_none() {
                return Err(IrError::BadHandle {
                    arena: "expressions",
                    index: h.index(),
                    size: self.expressions.len(),
                });
            }
            Ok(())
        };
        let check_buffer = |h: Handle<Buffer>| {
            if self.buffers.try_get(h).is_none() {
                return Err(IrError::BadHandle {
                    arena: "buffers",
                    index: h.index(),
                    size: self.buffers.len(),
                });
            }
            Ok(())
        };

        for (_, expr) in self.expressions.iter() {
            for operand in expr.operands() {
                check_expr(operand)?;
            }
            if let Expression::BufferLoad { buffer, .. } = expr {
                check_buffer(*buffer)?;
            }
        }

        let mut worklist = vec![self.body];
        while let Some(handle) = worklist.pop() {
            let stmt = self.statements.try_get(handle).ok_or(IrError::BadHandle {
                arena: "statements",
                index: handle.index(),
                size: self.statements.len(),
            })?;
            match stmt {
                Statement::For { min, extent, .. } => {
                    check_expr(*min)?;
                    check_expr(*extent)?;
                }
                Statement::Store {
                    buffer,
                    indices,
                    value,
                } => {
                    check_buffer(*buffer)?;
                    for &index in indices {
                        check_expr(index)?;
                    }
                    check_expr(*value)?;
                }
                Statement::Evaluate(e) | Statement::Let { value: e, .. } => check_expr(*e)?,
                Statement::IfThenElse { condition, .. } => check_expr(*condition)?,
                Statement::Allocate { buffer, .. } => check_buffer(*buffer)?,
                Statement::Seq(_) | Statement::Block { .. } => {}
            }
            worklist.extend(stmt.children());
        }

        for (param, buffer) in &self.buffer_map {
            if !self.params.iter().any(|p| &p.name == param) {
                return Err(IrError::UnboundParam(param.clone()));
            }
            check_buffer(*buffer)?;
        }
        Ok(())
    }
}

/// A collection of primitive functions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Module {
    pub functions: Vec<PrimFunc>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a function, replacing any existing function with the same name.
    pub fn add(&mut self, func: PrimFunc) {
        match self.functions.iter_mut().find(|f| f.name == func.name) {
            Some(slot) => *slot = func,
            None => self.functions.push(func),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PrimFunc> {
        self.functions.iter().find(|f| f.name == name)
    }
}
