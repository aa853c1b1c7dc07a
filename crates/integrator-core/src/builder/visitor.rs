// Tree visitors. Each one is a pure function from a statement list to a new
// statement list; the input is never modified.
//
// Class bodies are reached through namespaces. A container whose children
// changed is rebuilt with `dirty` set, so the printer re-emits its original
// header around the new member list.

use crate::ast::{visit_stmts_mut, ClassDecl, ClassMethod, NodeIdGenerator, Stmt, StmtKind};

/// Deep copy with fresh node ids from `ids` and no source positions, ready
/// to be inserted into another tree and printed in default style.
pub fn clone_with_cleared_positions(nodes: &[Stmt], ids: &mut NodeIdGenerator) -> Vec<Stmt> {
    let mut copy = nodes.to_vec();
    visit_stmts_mut(&mut copy, &mut |stmt: &mut Stmt| {
        stmt.id = ids.next();
        stmt.span = None;
        stmt.dirty = false;
    });
    copy
}

/// Appends `method` to every class body that has no method of that name.
pub fn add_method(nodes: &[Stmt], method: &Stmt) -> Vec<Stmt> {
    let Some(name) = method.as_method().map(|method| method.name.as_str()) else {
        return nodes.to_vec();
    };
    edit_class_members(nodes, &mut |members: &[Stmt]| {
        if members.iter().any(|member| member.is_method_named(name)) {
            return None;
        }
        let mut members = members.to_vec();
        members.push(method.clone());
        Some(members)
    })
    .0
}

/// Drops the first method called `name`, from `nodes` itself when it holds
/// methods, otherwise from the class bodies below it.
pub fn remove_method(nodes: &[Stmt], name: &str) -> Vec<Stmt> {
    if let Some(remaining) = without_method(nodes, name) {
        return remaining;
    }
    edit_class_members(nodes, &mut |members: &[Stmt]| without_method(members, name)).0
}

/// Swaps the body of every method called `name` for `body`. Abstract methods
/// become concrete.
pub fn replace_method_body(nodes: &[Stmt], name: &str, body: &[Stmt]) -> Vec<Stmt> {
    replace_in(nodes, name, body).0
}

fn replace_in(nodes: &[Stmt], name: &str, body: &[Stmt]) -> (Vec<Stmt>, bool) {
    let mut changed = false;
    let replaced = nodes
        .iter()
        .map(|stmt| match &stmt.kind {
            StmtKind::ClassMethod(method) if method.name.eq_ignore_ascii_case(name) => {
                changed = true;
                let mut method = method.clone();
                method.body = Some(body.to_vec());
                method.modifiers.is_abstract = false;
                rebuilt(stmt, StmtKind::ClassMethod(method))
            }
            StmtKind::Namespace { name: ns, stmts } => match replace_in(stmts, name, body) {
                (stmts, true) => {
                    changed = true;
                    rebuilt(
                        stmt,
                        StmtKind::Namespace {
                            name: ns.clone(),
                            stmts,
                        },
                    )
                }
                _ => stmt.clone(),
            },
            StmtKind::Class(class) => match replace_in(&class.members, name, body) {
                (members, true) => {
                    changed = true;
                    rebuilt(stmt, StmtKind::Class(with_members(class, members)))
                }
                _ => stmt.clone(),
            },
            _ => stmt.clone(),
        })
        .collect();
    (replaced, changed)
}

fn without_method(members: &[Stmt], name: &str) -> Option<Vec<Stmt>> {
    let index = members.iter().position(|member| member.is_method_named(name))?;
    let mut remaining = members.to_vec();
    remaining.remove(index);
    Some(remaining)
}

/// Runs `edit` over each class body; `None` from `edit` leaves the class as is.
fn edit_class_members(
    nodes: &[Stmt],
    edit: &mut dyn FnMut(&[Stmt]) -> Option<Vec<Stmt>>,
) -> (Vec<Stmt>, bool) {
    let mut changed = false;
    let edited = nodes
        .iter()
        .map(|stmt| match &stmt.kind {
            StmtKind::Namespace { name, stmts } => match edit_class_members(stmts, edit) {
                (stmts, true) => {
                    changed = true;
                    rebuilt(
                        stmt,
                        StmtKind::Namespace {
                            name: name.clone(),
                            stmts,
                        },
                    )
                }
                _ => stmt.clone(),
            },
            StmtKind::Class(class) => match edit(&class.members) {
                Some(members) => {
                    changed = true;
                    rebuilt(stmt, StmtKind::Class(with_members(class, members)))
                }
                None => stmt.clone(),
            },
            _ => stmt.clone(),
        })
        .collect();
    (edited, changed)
}

fn with_members(class: &ClassDecl, members: Vec<Stmt>) -> ClassDecl {
    ClassDecl {
        modifiers: class.modifiers,
        name: class.name.clone(),
        extends: class.extends.clone(),
        implements: class.implements.clone(),
        members,
    }
}

/// Same node, new content, marked dirty.
fn rebuilt(stmt: &Stmt, kind: StmtKind) -> Stmt {
    Stmt {
        id: stmt.id,
        span: stmt.span,
        dirty: true,
        comments: stmt.comments.clone(),
        kind,
    }
}

/// Method declaration node with the given id and no position.
pub fn method_stmt(ids: &mut NodeIdGenerator, method: ClassMethod) -> Stmt {
    Stmt::new(ids.next(), StmtKind::ClassMethod(method))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Modifiers, PhpPrinter, Printer, SyntaxTree};
    use crate::builder::finder::find_class_node;
    use crate::parser::{Parser, PhpParser};
    use pretty_assertions::assert_eq;

    const SOURCE: &str = "<?php\n\nnamespace App;\n\nclass Provider\n{\n    public function first(): array\n    {\n        return [];\n    }\n\n    public function second()\n    {\n        return 1;\n    }\n}\n";

    fn tree() -> SyntaxTree {
        PhpParser.parse(SOURCE).unwrap()
    }

    fn print(tree: &SyntaxTree, stmts: Vec<Stmt>) -> String {
        let mut tree = tree.clone();
        tree.stmts = stmts;
        PhpPrinter.print(&tree)
    }

    fn member_names(stmts: &[Stmt]) -> Vec<String> {
        find_class_node(stmts)
            .unwrap()
            .members
            .iter()
            .filter_map(|m| m.as_method().map(|m| m.name.clone()))
            .collect()
    }

    #[test]
    fn test_clone_clears_positions_and_renumbers() {
        let tree = tree();
        let mut ids = NodeIdGenerator::starting_at(500);
        let copy = clone_with_cleared_positions(&tree.stmts, &mut ids);

        let mut seen = Vec::new();
        let mut copy = copy;
        visit_stmts_mut(&mut copy, &mut |stmt: &mut Stmt| {
            assert!(stmt.span.is_none());
            assert!(stmt.id.as_u32() >= 500);
            seen.push(stmt.id);
        });
        let count = seen.len();
        seen.dedup();
        assert_eq!(seen.len(), count);
        assert!(tree.stmts[0].span.is_some());
    }

    #[test]
    fn test_add_method_appends_once() {
        let tree = tree();
        let mut ids = tree.ids.clone();
        let body = vec![Stmt::new(ids.next(), StmtKind::Return(Some(Expr::bool(true))))];
        let method = method_stmt(
            &mut ids,
            ClassMethod {
                modifiers: Modifiers::public(),
                by_ref: false,
                name: "third".into(),
                params: vec![],
                return_type: Some("bool".into()),
                body: Some(body),
            },
        );

        let added = add_method(&tree.stmts, &method);
        assert_eq!(member_names(&added), vec!["first", "second", "third"]);
        assert_eq!(add_method(&added, &method), added);

        assert_eq!(
            print(&tree, added),
            "<?php\n\nnamespace App;\n\nclass Provider\n{\n    public function first(): array\n    {\n        return [];\n    }\n\n    public function second()\n    {\n        return 1;\n    }\n\n    public function third(): bool\n    {\n        return true;\n    }\n}\n"
        );
    }

    #[test]
    fn test_add_existing_name_is_noop() {
        let tree = tree();
        let mut ids = tree.ids.clone();
        let method = method_stmt(
            &mut ids,
            ClassMethod {
                modifiers: Modifiers::public(),
                by_ref: false,
                name: "FIRST".into(),
                params: vec![],
                return_type: None,
                body: Some(vec![]),
            },
        );
        assert_eq!(add_method(&tree.stmts, &method), tree.stmts);
    }

    #[test]
    fn test_remove_method() {
        let tree = tree();
        let removed = remove_method(&tree.stmts, "first");
        assert_eq!(member_names(&removed), vec!["second"]);
        assert_eq!(
            print(&tree, removed),
            "<?php\n\nnamespace App;\n\nclass Provider\n{\n    public function second()\n    {\n        return 1;\n    }\n}\n"
        );
        assert_eq!(remove_method(&tree.stmts, "missing"), tree.stmts);
    }

    #[test]
    fn test_remove_from_bare_method_list() {
        let tree = tree();
        let class = find_class_node(&tree.stmts).unwrap();
        let remaining = remove_method(&class.members, "second");
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].is_method_named("first"));
    }

    #[test]
    fn test_replace_body_keeps_header() {
        let tree = tree();
        let body = PhpParser.parse_statements("return [1, 2];").unwrap();
        let mut ids = tree.ids.clone();
        let body = clone_with_cleared_positions(&body, &mut ids);

        let replaced = replace_method_body(&tree.stmts, "first", &body);
        assert_eq!(
            print(&tree, replaced),
            "<?php\n\nnamespace App;\n\nclass Provider\n{\n    public function first(): array\n    {\n        return [1, 2];\n    }\n\n    public function second()\n    {\n        return 1;\n    }\n}\n"
        );
    }

    #[test]
    fn test_replace_missing_method_is_noop() {
        let tree = tree();
        assert_eq!(replace_method_body(&tree.stmts, "missing", &[]), tree.stmts);
    }

    #[test]
    fn test_replace_makes_abstract_concrete() {
        let tree = PhpParser
            .parse("<?php\nabstract class Base\n{\n    abstract protected function make(): array;\n}\n")
            .unwrap();
        let replaced = replace_method_body(&tree.stmts, "make", &[]);
        let class = find_class_node(&replaced).unwrap();
        let method = class.members[0].as_method().unwrap();
        assert!(!method.modifiers.is_abstract);
        assert_eq!(method.body, Some(vec![]));
    }
}
