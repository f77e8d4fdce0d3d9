//! Statement tree traversal.
//!
//! [`post_order_visit`] is a read-only walk. [`transform`] rebuilds the tree
//! bottom-up: children are transformed first, a parent whose children changed
//! is re-appended with the new children, and then the callback may substitute
//! the node. Untouched subtrees keep their original handles.

use crate::arena::{Arena, Handle};
use crate::stmt::{Statement, StatementKind};

/// Calls `visit` on every statement reachable from `root`, children first.
pub fn post_order_visit(
    statements: &Arena<Statement>,
    root: Handle<Statement>,
    visit: &mut impl FnMut(Handle<Statement>, &Statement),
) {
    let stmt = &statements[root];
    for child in stmt.children() {
        post_order_visit(statements, child, visit);
    }
    visit(root, stmt);
}

/// Returns the chain of statements from `root` down to the first node (in
/// pre-order) that satisfies `pred`, both ends included.
pub fn find_path(
    statements: &Arena<Statement>,
    root: Handle<Statement>,
    pred: &impl Fn(&Statement) -> bool,
) -> Option<Vec<Handle<Statement>>> {
    let mut path = Vec::new();
    find_path_rec(statements, root, pred, &mut path).then_some(path)
}

fn find_path_rec(
    statements: &Arena<Statement>,
    handle: Handle<Statement>,
    pred: &impl Fn(&Statement) -> bool,
    path: &mut Vec<Handle<Statement>>,
) -> bool {
    path.push(handle);
    let stmt = &statements[handle];
    if pred(stmt) {
        return true;
    }
    for child in stmt.children() {
        if find_path_rec(statements, child, pred, path) {
            return true;
        }
    }
    path.pop();
    false
}

/// A node offered to a [`transform`] callback.
#[derive(Clone, Copy, Debug)]
pub struct Visit<'a> {
    /// The node's handle in the tree being transformed. Compare this against
    /// handles recorded before the walk.
    pub origin: Handle<Statement>,
    /// The node after its children were transformed. Equal to `origin` when
    /// no child changed.
    pub current: Handle<Statement>,
    pub stmt: &'a Statement,
}

/// What a [`transform`] callback does with a node.
#[derive(Clone, Debug, PartialEq)]
pub enum Rewrite {
    /// Keep the (child-transformed) node.
    Keep,
    /// Append a new statement and use it instead.
    Replace(Statement),
    /// Use an existing statement instead, e.g. one of the node's children.
    Redirect(Handle<Statement>),
}

/// Transforms the tree under `root` in post-order and returns the new root.
///
/// Only nodes whose kind is listed in `kinds` are offered to `callback`.
pub fn transform(
    statements: &mut Arena<Statement>,
    root: Handle<Statement>,
    kinds: &[StatementKind],
    callback: &mut impl FnMut(Visit<'_>) -> Rewrite,
) -> Handle<Statement> {
    let stmt = statements[root].clone();
    let children = stmt.children();
    let new_children: Vec<_> = children
        .iter()
        .map(|&child| transform(statements, child, kinds, callback))
        .collect();

    let current = if new_children == children {
        root
    } else {
        statements.append(stmt.with_children(&new_children))
    };

    if !kinds.contains(&statements[current].kind()) {
        return current;
    }
    let rewrite = callback(Visit {
        origin: root,
        current,
        stmt: &statements[current],
    });
    match rewrite {
        Rewrite::Keep => current,
        Rewrite::Replace(stmt) => statements.append(stmt),
        Rewrite::Redirect(handle) => handle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Buffer, DataType, PrimFunc};

    /// seq { for i { block "compute" { A[0] = 1 } }, A[0] = 2 }
    fn sample() -> (PrimFunc, Handle<Statement>, Handle<Statement>) {
        let mut f = PrimFunc::new("sample");
        let a = f.add_param_buffer("a", Buffer::new("A", DataType::INT32, vec![4]));
        let zero = f.int(0);
        let one = f.int(1);
        let two = f.int(2);
        let s1 = f.store(a, vec![zero], one);
        let block = f.block("compute", s1);
        let outer = f.serial_loop("i", 0, 4, block);
        let s2 = f.store(a, vec![zero], two);
        let body = f.seq(vec![outer, s2]);
        (f.with_body(body), outer, block)
    }

    #[test]
    fn post_order_children_first() {
        let (f, outer, block) = sample();
        let mut order = Vec::new();
        post_order_visit(&f.statements, f.body, &mut |_, s: &Statement| {
            order.push(s.kind())
        });
        assert_eq!(
            order,
            [
                StatementKind::Store,
                StatementKind::Block,
                StatementKind::For,
                StatementKind::Store,
                StatementKind::Seq,
            ]
        );
        let mut handles = Vec::new();
        post_order_visit(&f.statements, f.body, &mut |h, _: &Statement| {
            handles.push(h)
        });
        assert_eq!(handles[1], block);
        assert_eq!(handles[2], outer);
    }

    #[test]
    fn find_path_reaches_block() {
        let (f, outer, block) = sample();
        let path = find_path(&f.statements, f.body, &|s: &Statement| {
            matches!(s, Statement::Block { name, .. } if name == "compute")
        })
        .expect("block exists");
        assert_eq!(path, vec![f.body, outer, block]);
        let is_let = |s: &Statement| matches!(s, Statement::Let { .. });
        assert!(find_path(&f.statements, f.body, &is_let).is_none());
    }

    #[test]
    fn keep_everything_is_identity() {
        let (mut f, _, _) = sample();
        let before = f.statements.len();
        let root = transform(&mut f.statements, f.body, &[StatementKind::For], &mut |_: Visit<'_>| {
            Rewrite::Keep
        });
        assert_eq!(root, f.body);
        assert_eq!(f.statements.len(), before);
    }

    #[test]
    fn replace_by_origin_handle() {
        let (mut f, outer, _) = sample();
        let marker = f.int(42);
        let new_root = transform(
            &mut f.statements,
            f.body,
            &[StatementKind::For, StatementKind::Seq],
            &mut |visit: Visit<'_>| {
                if visit.origin == outer {
                    Rewrite::Replace(Statement::Evaluate(marker))
                } else {
                    Rewrite::Keep
                }
            },
        );
        assert_ne!(new_root, f.body);
        let Statement::Seq(children) = &f.statements[new_root] else {
            panic!("expected Seq");
        };
        assert_eq!(f.statements[children[0]], Statement::Evaluate(marker));
        // The original tree is left intact.
        assert!(matches!(f.statements[f.body], Statement::Seq(ref c) if c[0] == outer));
    }

    #[test]
    fn redirect_to_child() {
        let (mut f, outer, _) = sample();
        let root = f.body;
        let new_root = transform(
            &mut f.statements,
            root,
            &[StatementKind::Seq],
            &mut |visit: Visit<'_>| match visit.stmt {
                Statement::Seq(children) => Rewrite::Redirect(children[0]),
                _ => Rewrite::Keep,
            },
        );
        assert_eq!(new_root, outer);
    }

    #[test]
    fn filter_skips_other_kinds() {
        let (mut f, _, _) = sample();
        let mut seen = Vec::new();
        transform(&mut f.statements, f.body, &[StatementKind::Store], &mut |visit: Visit<'_>| {
            seen.push(visit.stmt.kind());
            Rewrite::Keep
        });
        assert_eq!(seen, [StatementKind::Store, StatementKind::Store]);
    }
}
