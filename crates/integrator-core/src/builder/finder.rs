// Node lookup: the class of a file, its methods, and names in scope.

use super::ClassDescriptor;
use crate::ast::{ClassDecl, ClassMethod, Name, Stmt, StmtKind, UseItem};

/// The class declared by a statement list, looking inside namespaces.
pub fn find_class_node(stmts: &[Stmt]) -> Option<&ClassDecl> {
    find_class_stmt(stmts).and_then(Stmt::as_class)
}

pub fn find_class_stmt(stmts: &[Stmt]) -> Option<&Stmt> {
    stmts.iter().find_map(|stmt| match &stmt.kind {
        StmtKind::Class(_) => Some(stmt),
        StmtKind::Namespace { stmts, .. } => find_class_stmt(stmts),
        _ => None,
    })
}

/// A method declared in the descriptor's own class body. Inherited methods
/// are not considered; see [`find_inherited_method_node`].
pub fn find_method_node<'a>(class: &'a ClassDescriptor, name: &str) -> Option<&'a ClassMethod> {
    find_method_stmt(class, name).and_then(Stmt::as_method)
}

pub fn find_method_stmt<'a>(class: &'a ClassDescriptor, name: &str) -> Option<&'a Stmt> {
    class
        .class_node()?
        .members
        .iter()
        .find(|member| member.is_method_named(name))
}

/// Nearest ancestor declaring `name`, with the declaring statement.
pub fn find_inherited_method_node<'a>(
    class: &'a ClassDescriptor,
    name: &str,
) -> Option<(&'a ClassDescriptor, &'a Stmt)> {
    class
        .ancestors()
        .find_map(|ancestor| find_method_stmt(ancestor, name).map(|stmt| (ancestor, stmt)))
}

pub fn find_namespace(stmts: &[Stmt]) -> Option<&Name> {
    stmts.iter().find_map(|stmt| match &stmt.kind {
        StmtKind::Namespace { name, .. } => Some(name),
        _ => None,
    })
}

/// `use` imports of the file, namespaced or not.
pub fn find_imports(stmts: &[Stmt]) -> Vec<&UseItem> {
    let mut imports = Vec::new();
    for stmt in stmts {
        match &stmt.kind {
            StmtKind::Use(items) => imports.extend(items),
            StmtKind::Namespace { stmts, .. } => imports.extend(find_imports(stmts)),
            _ => {}
        }
    }
    imports
}

/// Fully-qualified name of the class declared in the file.
pub fn declared_class_name(stmts: &[Stmt]) -> Option<String> {
    let class = find_class_node(stmts)?;
    Some(match find_namespace(stmts) {
        Some(namespace) => format!("{}\\{}", namespace.trimmed(), class.name),
        None => class.name.clone(),
    })
}

/// Resolves a class reference the way PHP does for class names: fully
/// qualified names stand as written, a leading segment matching an import is
/// replaced by it, anything else is relative to the current namespace.
pub fn resolve_class_name(stmts: &[Stmt], name: &Name) -> String {
    if name.is_fully_qualified() {
        return name.trimmed().to_string();
    }
    let first = name.first_segment();
    let rest = name.trimmed().get(first.len()..).unwrap_or_default();
    let imported = find_imports(stmts)
        .into_iter()
        .find(|item| item.local_name().eq_ignore_ascii_case(first));
    if let Some(item) = imported {
        return format!("{}{}", item.name.trimmed(), rest);
    }
    match find_namespace(stmts) {
        Some(namespace) => format!("{}\\{}", namespace.trimmed(), name.trimmed()),
        None => name.trimmed().to_string(),
    }
}
