//! Statements: loops, sequences, blocks and side effects.

use std::fmt;

use crate::arena::Handle;
use crate::buffer::Buffer;
use crate::expr::{Expression, Var};

/// How a loop is executed.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
pub enum ForKind {
    #[default]
    Serial,
    Parallel,
    Vectorized,
    Unrolled,
}

/// A statement node. Stored in a per-function arena and referenced by
/// [`Handle<Statement>`].
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    /// `for var in min..min + extent { body }`
    For {
        var: Var,
        min: Handle<Expression>,
        extent: Handle<Expression>,
        kind: ForKind,
        body: Handle<Statement>,
    },
    /// Statements executed in order.
    Seq(Vec<Handle<Statement>>),
    /// A named compute region.
    Block {
        name: String,
        init: Option<Handle<Statement>>,
        body: Handle<Statement>,
    },
    /// `buffer[indices] = value`
    Store {
        buffer: Handle<Buffer>,
        indices: Vec<Handle<Expression>>,
        value: Handle<Expression>,
    },
    /// Evaluate an expression for its side effects (e.g. an extern call).
    Evaluate(Handle<Expression>),
    Let {
        var: Var,
        value: Handle<Expression>,
        body: Handle<Statement>,
    },
    IfThenElse {
        condition: Handle<Expression>,
        then_case: Handle<Statement>,
        else_case: Option<Handle<Statement>>,
    },
    /// Scoped allocation of `buffer` for the duration of `body`.
    Allocate {
        buffer: Handle<Buffer>,
        body: Handle<Statement>,
    },
}

/// The variant of a [`Statement`], used to filter tree transforms.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum StatementKind {
    For,
    Seq,
    Block,
    Store,
    Evaluate,
    Let,
    IfThenElse,
    Allocate,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::For => "for",
            Self::Seq => "seq",
            Self::Block => "block",
            Self::Store => "store",
            Self::Evaluate => "evaluate",
            Self::Let => "let",
            Self::IfThenElse => "if",
            Self::Allocate => "allocate",
        })
    }
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Self::For { .. } => StatementKind::For,
            Self::Seq(_) => StatementKind::Seq,
            Self::Block { .. } => StatementKind::Block,
            Self::Store { .. } => StatementKind::Store,
            Self::Evaluate(_) => StatementKind::Evaluate,
            Self::Let { .. } => StatementKind::Let,
            Self::IfThenElse { .. } => StatementKind::IfThenElse,
            Self::Allocate { .. } => StatementKind::Allocate,
        }
    }

    /// Returns the child statements in evaluation order.
    pub fn children(&self) -> Vec<Handle<Statement>> {
        match self {
            Self::For { body, .. } | Self::Let { body, .. } | Self::Allocate { body, .. } => {
                vec![*body]
            }
            Self::Seq(stmts) => stmts.clone(),
            Self::Block { init, body, .. } => init.iter().copied().chain([*body]).collect(),
            Self::IfThenElse {
                then_case,
                else_case,
                ..
            } => [*then_case].into_iter().chain(*else_case).collect(),
            Self::Store { .. } | Self::Evaluate(_) => vec![],
        }
    }

    /// Returns a copy of this statement with its children replaced.
    ///
    /// `children` must have the same length and order as [`children`](Self::children).
    pub fn with_children(&self, children: &[Handle<Statement>]) -> Statement {
        assert_eq!(
            children.len(),
            self.children().len(),
            "with_children: child count mismatch for {} statement",
            self.kind()
        );
        let mut stmt = self.clone();
        match &mut stmt {
            Self::For { body, .. } | Self::Let { body, .. } | Self::Allocate { body, .. } => {
                *body = children[0];
            }
            Self::Seq(stmts) => stmts.copy_from_slice(children),
            Self::Block { init, body, .. } => {
                if let Some(init) = init {
                    *init = children[0];
                }
                *body = children[children.len() - 1];
            }
            Self::IfThenElse {
                then_case,
                else_case,
                ..
            } => {
                *then_case = children[0];
                if let Some(else_case) = else_case {
                    *else_case = children[1];
                }
            }
            Self::Store { .. } | Self::Evaluate(_) => {}
        }
        stmt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::types::DataType;

    fn leaf(stmts: &mut Arena<Statement>, exprs: &mut Arena<Expression>) -> Handle<Statement> {
        let e = exprs.append(Expression::int(0));
        stmts.append(Statement::Evaluate(e))
    }

    #[test]
    fn children_of_block_with_init() {
        let mut stmts = Arena::new();
        let mut exprs = Arena::new();
        let init = leaf(&mut stmts, &mut exprs);
        let body = leaf(&mut stmts, &mut exprs);
        let block = Statement::Block {
            name: "compute".into(),
            init: Some(init),
            body,
        };
        assert_eq!(block.children(), vec![init, body]);
        assert_eq!(block.kind(), StatementKind::Block);
    }

    #[test]
    fn with_children_replaces_in_order() {
        let mut stmts = Arena::new();
        let mut exprs = Arena::new();
        let a = leaf(&mut stmts, &mut exprs);
        let b = leaf(&mut stmts, &mut exprs);
        let c = leaf(&mut stmts, &mut exprs);
        let seq = Statement::Seq(vec![a, b]);
        assert_eq!(seq.with_children(&[c, a]), Statement::Seq(vec![c, a]));

        let zero = exprs.append(Expression::int(0));
        let four = exprs.append(Expression::int(4));
        let for_ = Statement::For {
            var: Var::new("i", DataType::INT32),
            min: zero,
            extent: four,
            kind: ForKind::Serial,
            body: a,
        };
        let replaced = for_.with_children(&[b]);
        assert_eq!(replaced.children(), vec![b]);
    }

    #[test]
    fn if_without_else_has_one_child() {
        let mut stmts = Arena::new();
        let mut exprs = Arena::new();
        let then_case = leaf(&mut stmts, &mut exprs);
        let cond = exprs.append(Expression::int(1));
        let stmt = Statement::IfThenElse {
            condition: cond,
            then_case,
            else_case: None,
        };
        assert_eq!(stmt.children(), vec![then_case]);
    }

    #[test]
    #[should_panic(expected = "child count mismatch")]
    fn with_children_rejects_wrong_arity() {
        let mut stmts = Arena::new();
        let mut exprs = Arena::new();
        let a = leaf(&mut stmts, &mut exprs);
        Statement::Seq(vec![a]).with_children(&[]);
    }

    #[test]
    fn kind_display() {
        assert_eq!(StatementKind::For.to_string(), "for");
        assert_eq!(StatementKind::Seq.to_string(), "seq");
    }
}
