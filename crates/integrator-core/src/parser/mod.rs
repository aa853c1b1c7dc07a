// Parser module - boundary between source text and the syntax tree
use std::path::Path;

use crate::ast::{Expr, Stmt, SyntaxTree};
use crate::IntegratorError;

pub mod php;

#[cfg(test)]
mod tests;

pub use php::PhpParser;

/// Malformed source, located by 1-based line and column.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Syntax error on line {line}, column {column}: {message}")]
pub struct SyntaxError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl SyntaxError {
    /// Error at a byte offset of `source`.
    pub fn at(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let offset = offset.min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let column = before
            .rfind('\n')
            .map_or(before.chars().count(), |nl| before[nl + 1..].chars().count())
            + 1;
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

/// Trait for source parsers
pub trait Parser: Send + Sync {
    /// Parse a complete source file
    fn parse(&self, source: &str) -> Result<SyntaxTree, SyntaxError>;

    /// Parse a fragment that must hold exactly one expression. A single
    /// trailing `;` is accepted.
    fn parse_expression(&self, fragment: &str) -> Result<Expr, SyntaxError>;

    /// Parse a fragment of method-body statements
    fn parse_statements(&self, fragment: &str) -> Result<Vec<Stmt>, SyntaxError>;

    /// Parse a file
    fn parse_file(&self, path: &Path) -> crate::Result<SyntaxTree> {
        let source = std::fs::read_to_string(path).map_err(|source| IntegratorError::ClassIo {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse(&source).map_err(|error| IntegratorError::Syntax {
            path: Some(path.to_path_buf()),
            error,
        })
    }

    /// Get parser name for debugging
    fn name(&self) -> &'static str;
}
