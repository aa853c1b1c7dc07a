//! Class mutation engine
//!
//! The finder, checker and visitors are free functions over syntax trees;
//! [`ClassModifier`] composes them into the four mutation operations.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::ast::{ClassDecl, Printer, Stmt, SyntaxTree};
use crate::parser::{Parser, SyntaxError};

pub mod checker;
pub mod finder;
pub mod modifier;
pub mod value;
pub mod visitor;

pub use modifier::ClassModifier;
pub use value::ReturnValue;

/// One class under mutation: its tree plus the resolved ancestor chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDescriptor {
    /// Fully-qualified name without the leading separator
    pub class_name: String,
    pub file_path: Option<PathBuf>,
    pub tree: SyntaxTree,
    pub parent: Option<Box<ClassDescriptor>>,
}

impl ClassDescriptor {
    pub fn new(class_name: impl Into<String>, tree: SyntaxTree) -> Self {
        Self {
            class_name: class_name.into().trim_start_matches('\\').to_string(),
            file_path: None,
            tree,
            parent: None,
        }
    }

    /// Parses `source` and names the descriptor after the class it declares.
    pub fn from_source(parser: &dyn Parser, source: &str) -> Result<Self, SyntaxError> {
        let tree = parser.parse(source)?;
        let class_name = finder::declared_class_name(&tree.stmts).unwrap_or_default();
        Ok(Self::new(class_name, tree))
    }

    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_parent(mut self, parent: ClassDescriptor) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    pub fn class_node(&self) -> Option<&ClassDecl> {
        finder::find_class_node(&self.tree.stmts)
    }

    /// Fully-qualified name of the declared parent class, resolved against the
    /// file's namespace and imports.
    pub fn parent_name(&self) -> Option<String> {
        let extends = self.class_node()?.extends.as_ref()?;
        Some(finder::resolve_class_name(&self.tree.stmts, extends))
    }

    /// Follows `extends` through `resolver` until the chain ends, loops back
    /// or reaches `max_depth` ancestors.
    pub fn resolve_parents(&mut self, resolver: &dyn ParentResolver, max_depth: usize) {
        let mut seen = HashSet::from([self.class_name.to_ascii_lowercase()]);
        let mut current = self;
        for _ in 0..max_depth {
            let Some(name) = current.parent_name() else {
                break;
            };
            if !seen.insert(name.to_ascii_lowercase()) {
                tracing::warn!(class = %current.class_name, parent = %name, "Inheritance cycle, parent chain cut");
                break;
            }
            let Some(parent) = resolver.resolve_parent(&name) else {
                tracing::debug!(class = %current.class_name, parent = %name, "Parent class not loadable");
                break;
            };
            current.parent = Some(Box::new(parent));
            let Some(next) = current.parent.as_deref_mut() else {
                break;
            };
            current = next;
        }
    }

    /// Ancestors, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = &ClassDescriptor> {
        std::iter::successors(self.parent.as_deref(), |class| class.parent.as_deref())
    }

    pub fn print(&self, printer: &dyn Printer) -> String {
        printer.print(&self.tree)
    }
}

/// Loads the descriptor of a parent class by its fully-qualified name.
pub trait ParentResolver {
    fn resolve_parent(&self, class_name: &str) -> Option<ClassDescriptor>;
}

/// One mutation of one method.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationRequest {
    OverrideFromParent { method: String },
    ReplaceBody { method: String, stmts: Vec<Stmt> },
    RemoveMethod { method: String },
    SetReturnValue { method: String, value: ReturnValue },
}

impl MutationRequest {
    pub fn method_name(&self) -> &str {
        match self {
            MutationRequest::OverrideFromParent { method }
            | MutationRequest::ReplaceBody { method, .. }
            | MutationRequest::RemoveMethod { method }
            | MutationRequest::SetReturnValue { method, .. } => method,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MutationRequest::OverrideFromParent { .. } => "override",
            MutationRequest::ReplaceBody { .. } => "replace-body",
            MutationRequest::RemoveMethod { .. } => "remove",
            MutationRequest::SetReturnValue { .. } => "set-return-value",
        }
    }
}
