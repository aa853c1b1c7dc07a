// Class loading from the project's source roots.
//
// Class names map to files PSR-4 style: `Pyz\Zed\Shop\ShopDependencyProvider`
// lives at `<root>/Pyz/Zed/Shop/ShopDependencyProvider.php` under the first
// source root that has it.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::ast::Printer;
use crate::builder::{ClassDescriptor, ParentResolver};
use crate::parser::Parser;
use crate::{IntegratorConfig, IntegratorError, Result};

const PHP_EXTENSION: &str = "php";

pub struct SourceTreeLoader<'p> {
    parser: &'p dyn Parser,
    source_roots: Vec<PathBuf>,
    max_parent_depth: usize,
}

impl<'p> SourceTreeLoader<'p> {
    pub fn new(parser: &'p dyn Parser, config: &IntegratorConfig) -> Self {
        Self {
            parser,
            source_roots: config.source_root_paths(),
            max_parent_depth: config.max_parent_depth,
        }
    }

    pub fn source_roots(&self) -> &[PathBuf] {
        &self.source_roots
    }

    /// File that should hold `class_name`, if one exists under a source root.
    pub fn locate(&self, class_name: &str) -> Option<PathBuf> {
        let relative = class_name
            .trim_start_matches('\\')
            .split('\\')
            .collect::<PathBuf>()
            .with_extension(PHP_EXTENSION);
        self.source_roots
            .iter()
            .map(|root| root.join(&relative))
            .find(|path| path.is_file())
    }

    /// Loads a class with its ancestor chain. `Ok(None)` when no file holds it.
    pub fn load_class(&self, class_name: &str) -> Result<Option<ClassDescriptor>> {
        let Some(mut class) = self.read_class(class_name)? else {
            return Ok(None);
        };
        class.resolve_parents(self, self.max_parent_depth);
        debug!(
            class = %class.class_name,
            ancestors = class.ancestors().count(),
            "Class loaded"
        );
        Ok(Some(class))
    }

    /// Prints the class and writes it back to the file it came from.
    pub fn store_class(&self, class: &ClassDescriptor, printer: &dyn Printer) -> Result<PathBuf> {
        let path = match &class.file_path {
            Some(path) => path.clone(),
            None => self.locate(&class.class_name).ok_or_else(|| IntegratorError::ClassIo {
                path: PathBuf::from(&class.class_name),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "class file not found"),
            })?,
        };
        fs::write(&path, class.print(printer)).map_err(|source| IntegratorError::ClassIo {
            path: path.clone(),
            source,
        })?;
        debug!(class = %class.class_name, path = %path.display(), "Class written");
        Ok(path)
    }

    fn read_class(&self, class_name: &str) -> Result<Option<ClassDescriptor>> {
        let Some(path) = self.locate(class_name) else {
            return Ok(None);
        };
        let tree = self.parser.parse_file(&path)?;
        Ok(Some(ClassDescriptor::new(class_name, tree).with_file_path(path)))
    }
}

impl ParentResolver for SourceTreeLoader<'_> {
    fn resolve_parent(&self, class_name: &str) -> Option<ClassDescriptor> {
        match self.read_class(class_name) {
            Ok(class) => class,
            Err(error) => {
                warn!(class = class_name, %error, "Parent class could not be loaded");
                None
            }
        }
    }
}
