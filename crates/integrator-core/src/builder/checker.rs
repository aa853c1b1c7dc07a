// Return-shape heuristics used to pick the body of an overriding method.

use crate::ast::{find_first_expr, ClassMethod, Expr, Param, Stmt, StmtKind};

/// Shape of a method as far as body synthesis cares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReturnShape<'a> {
    /// Returns an array literal and the first array in the body is empty
    EmptyArray,
    /// Returns an array literal with something in it
    Array,
    /// Not array-returning, takes exactly one parameter
    PassThrough(&'a Param),
    Other,
}

pub fn classify(method: &ClassMethod) -> ReturnShape<'_> {
    if returns_array(method) {
        if is_returned_array_empty(method) {
            ReturnShape::EmptyArray
        } else {
            ReturnShape::Array
        }
    } else if let [param] = method.params.as_slice() {
        ReturnShape::PassThrough(param)
    } else {
        ReturnShape::Other
    }
}

/// True when any reachable `return` yields an array literal. Returns inside
/// closures belong to the closure and are not counted.
pub fn returns_array(method: &ClassMethod) -> bool {
    any_return(method.stmts(), &mut |value: &Expr| value.is_array_literal())
}

/// True when the first array literal of the body, in depth-first order, has
/// no items. A body without array literals is not empty-array returning.
pub fn is_returned_array_empty(method: &ClassMethod) -> bool {
    matches!(
        find_first_expr(method.stmts(), &mut Expr::is_array_literal),
        Some(Expr::Array { items, .. }) if items.is_empty()
    )
}

fn any_return(stmts: &[Stmt], accept: &mut dyn FnMut(&Expr) -> bool) -> bool {
    stmts.iter().any(|stmt| match &stmt.kind {
        StmtKind::Return(Some(value)) => accept(value),
        StmtKind::If {
            then,
            else_ifs,
            otherwise,
            ..
        } => {
            any_return(then, accept)
                || else_ifs.iter().any(|(_, stmts)| any_return(stmts, accept))
                || otherwise.as_deref().is_some_and(|stmts| any_return(stmts, accept))
        }
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Parser, PhpParser};

    fn method(source: &str) -> ClassMethod {
        let code = format!("<?php\nclass Probe\n{{\n{source}\n}}\n");
        let tree = PhpParser.parse(&code).unwrap();
        let class = crate::builder::finder::find_class_node(&tree.stmts).unwrap();
        class.members[0].as_method().unwrap().clone()
    }

    #[test]
    fn test_empty_array_return() {
        let m = method("public function getPlugins(): array { return []; }");
        assert!(returns_array(&m));
        assert!(is_returned_array_empty(&m));
        assert_eq!(classify(&m), ReturnShape::EmptyArray);
    }

    #[test]
    fn test_filled_array_return() {
        let m = method("public function getPlugins(): array { return [new APlugin(), new BPlugin()]; }");
        assert!(returns_array(&m));
        assert!(!is_returned_array_empty(&m));
        assert_eq!(classify(&m), ReturnShape::Array);
    }

    #[test]
    fn test_first_array_decides_emptiness() {
        let m = method(
            "public function getPlugins(): array { $extra = []; return [new APlugin()]; }",
        );
        assert!(is_returned_array_empty(&m));
    }

    #[test]
    fn test_array_returned_from_branch() {
        let m = method("public function get($flag) { if ($flag) { return ['x']; } return null; }");
        assert!(returns_array(&m));
    }

    #[test]
    fn test_closure_returns_do_not_count() {
        let m = method("public function get() { return function () { return []; }; }");
        assert!(!returns_array(&m));
    }

    #[test]
    fn test_merge_call_is_not_an_array_literal() {
        let m = method("public function getPlugins() { return array_merge(parent::getPlugins(), []); }");
        assert!(!returns_array(&m));
    }

    #[test]
    fn test_single_parameter_pass_through() {
        let m = method("public function extend(Container $container): Container { $container->set('a', 1); return $container; }");
        assert!(matches!(classify(&m), ReturnShape::PassThrough(param) if param.name == "container"));
    }

    #[test]
    fn test_other_shapes() {
        assert_eq!(classify(&method("public function run($a, $b) { }")), ReturnShape::Other);
        assert_eq!(classify(&method("abstract public function run();")), ReturnShape::Other);
    }
}
