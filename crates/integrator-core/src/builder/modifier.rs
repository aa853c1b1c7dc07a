//! Class modifier: the four mutation operations over one class descriptor.
//!
//! Every operation takes the descriptor by value and hands it back, mutated
//! or untouched. A missing target is never an error; the only failure is a
//! raw literal return value that does not parse.

use tracing::{debug, warn};

use super::checker::{self, ReturnShape};
use super::finder;
use super::visitor;
use super::{ClassDescriptor, MutationRequest, ReturnValue};
use crate::ast::{Arg, ClassMethod, Expr, Modifiers, Name, NodeIdGenerator, Stmt, StmtKind};
use crate::parser::Parser;
use crate::Result;

const ARRAY_MERGE: &str = "array_merge";
const PARENT: &str = "parent";

pub struct ClassModifier<'p> {
    parser: &'p dyn Parser,
}

impl<'p> ClassModifier<'p> {
    pub fn new(parser: &'p dyn Parser) -> Self {
        Self { parser }
    }

    /// Runs one request against the class.
    pub fn apply(&self, class: ClassDescriptor, request: &MutationRequest) -> Result<ClassDescriptor> {
        match request {
            MutationRequest::OverrideFromParent { method } => {
                Ok(self.override_method_from_parent(class, method))
            }
            MutationRequest::ReplaceBody { method, stmts } => {
                Ok(self.replace_method_body(class, method, stmts))
            }
            MutationRequest::RemoveMethod { method } => Ok(self.remove_class_method(class, method)),
            MutationRequest::SetReturnValue { method, value } => {
                self.set_method_return_value(class, method, value)
            }
        }
    }

    /// Materializes an inherited method locally with a delegating body.
    ///
    /// No-op without a parent, when no ancestor declares the method, or when
    /// the class already has it.
    pub fn override_method_from_parent(
        &self,
        mut class: ClassDescriptor,
        method_name: &str,
    ) -> ClassDescriptor {
        if class.parent.is_none() {
            debug!(class = %class.class_name, method = method_name, "No parent class, nothing to override");
            return class;
        }
        if finder::find_method_node(&class, method_name).is_some() {
            debug!(class = %class.class_name, method = method_name, "Method already declared locally");
            return class;
        }
        let Some((owner, inherited)) = finder::find_inherited_method_node(&class, method_name) else {
            debug!(class = %class.class_name, method = method_name, "Method not found on any parent");
            return class;
        };
        debug!(
            class = %class.class_name,
            method = method_name,
            parent = %owner.class_name,
            "Overriding method from parent"
        );
        let inherited = inherited.clone();

        let ids = &mut class.tree.ids;
        let cloned = visitor::clone_with_cleared_positions(std::slice::from_ref(&inherited), ids);
        let body = match cloned.first().and_then(Stmt::as_method) {
            Some(method) => override_body(method, ids),
            None => return class,
        };
        let cloned = visitor::replace_method_body(&cloned, method_name, &body);

        if let Some(method) = cloned.first() {
            class.tree.stmts = visitor::add_method(&class.tree.stmts, method);
        }
        class
    }

    /// Replaces the body of a local method; no-op when the class lacks it.
    pub fn replace_method_body(
        &self,
        mut class: ClassDescriptor,
        method_name: &str,
        stmts: &[Stmt],
    ) -> ClassDescriptor {
        if finder::find_method_node(&class, method_name).is_none() {
            debug!(class = %class.class_name, method = method_name, "Method not declared, body left alone");
            return class;
        }
        let body = visitor::clone_with_cleared_positions(stmts, &mut class.tree.ids);
        class.tree.stmts = visitor::replace_method_body(&class.tree.stmts, method_name, &body);
        debug!(class = %class.class_name, method = method_name, "Replaced method body");
        class
    }

    pub fn remove_class_method(&self, mut class: ClassDescriptor, method_name: &str) -> ClassDescriptor {
        if finder::find_method_node(&class, method_name).is_none() {
            debug!(class = %class.class_name, method = method_name, "Method not declared, nothing to remove");
            return class;
        }
        class.tree.stmts = visitor::remove_method(&class.tree.stmts, method_name);
        debug!(class = %class.class_name, method = method_name, "Removed method");
        class
    }

    /// Makes the method return `value`, overriding it from the parent first
    /// when it is not declared locally. A method unknown to the whole chain
    /// is created as a public method.
    pub fn set_method_return_value(
        &self,
        mut class: ClassDescriptor,
        method_name: &str,
        value: &ReturnValue,
    ) -> Result<ClassDescriptor> {
        let returned = value.to_expr(self.parser)?;

        if finder::find_method_node(&class, method_name).is_none() {
            class = self.override_method_from_parent(class, method_name);
        }
        if finder::find_method_node(&class, method_name).is_none() {
            warn!(
                class = %class.class_name,
                method = method_name,
                "Method not declared by the class or its parents, creating it"
            );
            let return_stmt = Stmt::new(class.tree.ids.next(), StmtKind::Return(Some(returned)));
            let method = ClassMethod {
                modifiers: Modifiers::public(),
                by_ref: false,
                name: method_name.to_string(),
                params: Vec::new(),
                return_type: value.inferred_type().map(str::to_string),
                body: Some(vec![return_stmt]),
            };
            let method = visitor::method_stmt(&mut class.tree.ids, method);
            class.tree.stmts = visitor::add_method(&class.tree.stmts, &method);
            return Ok(class);
        }

        let return_stmt = Stmt::new(class.tree.ids.next(), StmtKind::Return(Some(returned)));
        Ok(self.replace_method_body(class, method_name, &[return_stmt]))
    }
}

/// Body for an overriding copy of `method`: extend an inherited array, pass a
/// single argument through, or nothing.
fn override_body(method: &ClassMethod, ids: &mut NodeIdGenerator) -> Vec<Stmt> {
    let returned = match checker::classify(method) {
        ReturnShape::EmptyArray => Expr::empty_array(),
        ReturnShape::Array => Expr::FuncCall {
            name: Name::new(ARRAY_MERGE),
            args: vec![
                Arg::positional(Expr::StaticCall {
                    class: Name::new(PARENT),
                    name: method.name.clone(),
                    args: Vec::new(),
                }),
                Arg::positional(Expr::empty_array()),
            ],
        },
        ReturnShape::PassThrough(param) => Expr::Variable(param.name.clone()),
        ReturnShape::Other => return Vec::new(),
    };
    vec![Stmt::new(ids.next(), StmtKind::Return(Some(returned)))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{PhpPrinter, ToSource};
    use crate::parser::PhpParser;
    use serde_json::json;

    fn class(source: &str) -> ClassDescriptor {
        ClassDescriptor::from_source(&PhpParser, source).unwrap()
    }

    fn parent() -> ClassDescriptor {
        class(
            "<?php\nclass Base\n{\n    public function getPlugins(): array\n    {\n        return [new APlugin()];\n    }\n\n    public function isEnabled(): bool\n    {\n        return false;\n    }\n}\n",
        )
    }

    fn method_source(class: &ClassDescriptor, name: &str) -> Option<String> {
        finder::find_method_node(class, name).map(ToSource::to_source)
    }

    #[test]
    fn test_apply_dispatches() {
        let modifier = ClassModifier::new(&PhpParser);
        let child = class("<?php\nclass Child extends Base\n{\n}\n").with_parent(parent());

        let child = modifier
            .apply(child, &MutationRequest::OverrideFromParent { method: "getPlugins".into() })
            .unwrap();
        assert!(finder::find_method_node(&child, "getPlugins").is_some());

        let child = modifier
            .apply(child, &MutationRequest::RemoveMethod { method: "getPlugins".into() })
            .unwrap();
        assert!(finder::find_method_node(&child, "getPlugins").is_none());
    }

    #[test]
    fn test_set_return_value_overrides_first() {
        let modifier = ClassModifier::new(&PhpParser);
        let child = class("<?php\nclass Child extends Base\n{\n}\n").with_parent(parent());

        let child = modifier
            .set_method_return_value(child, "isEnabled", &ReturnValue::from_json(json!(true)))
            .unwrap();
        assert_eq!(
            method_source(&child, "isEnabled").unwrap(),
            "public function isEnabled(): bool\n{\n    return true;\n}"
        );
    }

    #[test]
    fn test_set_return_value_on_local_method() {
        let modifier = ClassModifier::new(&PhpParser);
        let child = class(
            "<?php\nclass Child\n{\n    public function getLimit(): int\n    {\n        return 5;\n    }\n}\n",
        );
        let child = modifier
            .set_method_return_value(child, "getLimit", &ReturnValue::raw("static::LIMIT * 2"))
            .unwrap();
        assert_eq!(
            child.print(&PhpPrinter),
            "<?php\nclass Child\n{\n    public function getLimit(): int\n    {\n        return static::LIMIT * 2;\n    }\n}\n"
        );
    }

    #[test]
    fn test_set_return_value_creates_unknown_method() {
        let modifier = ClassModifier::new(&PhpParser);
        let child = class("<?php\nclass Foo\n{\n}\n");

        let child = modifier
            .set_method_return_value(child, "isEnabled", &ReturnValue::from_json(json!(true)))
            .unwrap();
        assert_eq!(
            child.print(&PhpPrinter),
            "<?php\nclass Foo\n{\n    public function isEnabled(): bool\n    {\n        return true;\n    }\n}\n"
        );
    }

    #[test]
    fn test_bad_literal_leaves_nothing_half_done() {
        let modifier = ClassModifier::new(&PhpParser);
        let child = class("<?php\nclass Child extends Base\n{\n}\n").with_parent(parent());

        let result = modifier.set_method_return_value(child, "isEnabled", &ReturnValue::raw("1 +"));
        assert!(matches!(result, Err(crate::IntegratorError::LiteralParse { .. })));
    }

    #[test]
    fn test_override_keeps_existing_local_method() {
        let modifier = ClassModifier::new(&PhpParser);
        let source = "<?php\nclass Child extends Base\n{\n    public function getPlugins(): array\n    {\n        return [];\n    }\n}\n";
        let child = class(source).with_parent(parent());

        let child = modifier.override_method_from_parent(child, "getPlugins");
        assert_eq!(child.print(&PhpPrinter), source);
    }
}
