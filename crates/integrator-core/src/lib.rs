//! # Integrator Core
//!
//! Structural edits to generated PHP dependency-provider classes:
//! - Syntax tree, PHP-subset parser and format-preserving printer
//! - Node finder, method shape checker and tree visitors
//! - Class modifier with the four mutation operations
//! - Change ledger (lock file) that keeps repeated runs idempotent
//! - Manifest, class loader and the batch integrator driving them
//!
//! The command-line front end lives in the `integrator-cli` crate.

#![warn(clippy::all)]

pub mod ast;
pub mod builder;
pub mod integrator;
pub mod loader;
pub mod lock;
pub mod manifest;
pub mod parser;

use std::path::{Path, PathBuf};

// Re-export commonly used types
pub use ast::{ClassMethod, Expr, PhpPrinter, Printer, Stmt, StmtKind, SyntaxTree, ToSource};
pub use builder::{
    ClassDescriptor, ClassModifier, MutationRequest, ParentResolver, ReturnValue,
};
pub use integrator::{Integrator, IoNotifier, LogNotifier, RunSummary};
pub use loader::SourceTreeLoader;
pub use lock::{Fingerprint, LockData, LockPlan, LockReader, LockWriter, PlanStep};
pub use manifest::{Manifest, ManifestAction};
pub use parser::{Parser, PhpParser, SyntaxError};

/// Integrator version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_DIRECTIVE: &str = "integrator_core=info";

/// Initialize tracing for integrator components. `RUST_LOG` wins over the
/// default `integrator_core=info`.
pub fn init_tracing() {
    init_tracing_with(DEFAULT_DIRECTIVE);
}

/// Initialize tracing with a fallback directive used when `RUST_LOG` is unset.
pub fn init_tracing_with(directive: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(directive));
    // A subscriber installed earlier (tests, embedding host) stays in place.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Integrator run configuration
#[derive(Debug, Clone)]
pub struct IntegratorConfig {
    /// Project the classes and files belong to
    pub project_root: PathBuf,
    /// Directories under the project root searched for class files
    pub source_roots: Vec<PathBuf>,
    /// Ledger location, relative to the project root unless absolute
    pub lock_file: PathBuf,
    /// Manifest location, relative to the project root unless absolute
    pub manifest_file: PathBuf,
    /// Compute and report changes without writing class files or the ledger
    pub dry_run: bool,
    /// Longest ancestor chain followed when resolving parent classes
    pub max_parent_depth: usize,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            project_root: ".".into(),
            source_roots: vec!["src".into()],
            lock_file: "integrator.lock".into(),
            manifest_file: "integrator.json".into(),
            dry_run: false,
            max_parent_depth: 16,
        }
    }
}

impl IntegratorConfig {
    pub fn with_project_root(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            ..Self::default()
        }
    }

    pub fn lock_file_path(&self) -> PathBuf {
        self.resolve(&self.lock_file)
    }

    pub fn manifest_file_path(&self) -> PathBuf {
        self.resolve(&self.manifest_file)
    }

    pub fn source_root_paths(&self) -> Vec<PathBuf> {
        self.source_roots.iter().map(|root| self.resolve(root)).collect()
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}

/// Error types for integrator operations
#[derive(thiserror::Error, Debug)]
pub enum IntegratorError {
    /// A raw literal return value is not one stand-alone expression
    #[error("Value is not valid PHP code: `{value}` ({reason})")]
    LiteralParse { value: String, reason: String },

    /// Source rejected by the parser
    #[error("{}{error}", path.as_ref().map(|p| format!("{}: ", p.display())).unwrap_or_default())]
    Syntax {
        path: Option<PathBuf>,
        error: SyntaxError,
    },

    /// Ledger could not be read or persisted
    #[error("Could not access lock file {}: {source}", path.display())]
    LockIo {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Ledger exists but is not a map of classes to method fingerprints
    #[error("Malformed lock file {}: {source}", path.display())]
    LockFormat {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Manifest could not be read or decoded
    #[error("Invalid manifest {}: {reason}", path.display())]
    Manifest { path: PathBuf, reason: String },

    /// Class source could not be read or written
    #[error("Could not access class file {}: {source}", path.display())]
    ClassIo {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<SyntaxError> for IntegratorError {
    fn from(error: SyntaxError) -> Self {
        IntegratorError::Syntax { path: None, error }
    }
}

/// Result type for integrator operations
pub type Result<T> = std::result::Result<T, IntegratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_paths_resolve_against_project_root() {
        let config = IntegratorConfig::with_project_root("/srv/shop");
        assert_eq!(config.lock_file_path(), PathBuf::from("/srv/shop/integrator.lock"));
        assert_eq!(config.manifest_file_path(), PathBuf::from("/srv/shop/integrator.json"));
        assert_eq!(config.source_root_paths(), vec![PathBuf::from("/srv/shop/src")]);
    }

    #[test]
    fn absolute_lock_path_is_kept() {
        let config = IntegratorConfig {
            lock_file: "/tmp/other.lock".into(),
            ..IntegratorConfig::with_project_root("/srv/shop")
        };
        assert_eq!(config.lock_file_path(), PathBuf::from("/tmp/other.lock"));
    }

    #[test]
    fn literal_error_names_the_value() {
        let error = IntegratorError::LiteralParse {
            value: "1 +".into(),
            reason: "expected right operand".into(),
        };
        assert!(error.to_string().contains("`1 +`"));
    }

    #[test]
    fn syntax_error_without_path_is_bare() {
        let error: IntegratorError = SyntaxError::at("<?php x", 6, "expected ';'").into();
        assert_eq!(
            error.to_string(),
            "Syntax error on line 1, column 7: expected ';'"
        );
    }
}
