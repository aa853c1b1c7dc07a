use super::*;
use crate::parser::{Parser, PhpParser};
use pretty_assertions::assert_eq;

const PROVIDER: &str = r#"<?php

/**
 * Copyright notice
 */

declare(strict_types=1);

namespace Pyz\Zed\Shop;

use Spryker\Zed\Kernel\Container;
use Spryker\Zed\Shop\ShopDependencyProvider as SprykerShopDependencyProvider;

class ShopDependencyProvider extends SprykerShopDependencyProvider
{
    public const PLUGINS_SHOP = 'PLUGINS_SHOP';

    /**
     * @return array<\Spryker\Zed\Shop\Dependency\PluginInterface>
     */
    protected function getShopPlugins(): array
    {
        return [
            new FirstPlugin(),   // keeps trailing comment
            new SecondPlugin(),
        ];
    }

    public function provideBusinessLayerDependencies(Container $container): Container
    {
        $container = parent::provideBusinessLayerDependencies($container);

        if ($container->has(static::PLUGINS_SHOP)) {
            return $container;
        }

        return $container;
    }
    // end of class
}
"#;

fn print(source: &str) -> String {
    let tree = PhpParser.parse(source).unwrap();
    PhpPrinter.print(&tree)
}

#[test]
fn test_unmodified_tree_round_trips() {
    assert_eq!(print(PROVIDER), PROVIDER);
}

#[test]
fn test_round_trip_keeps_odd_formatting() {
    let source = "<?php\nclass  Odd   extends Base {\n  function  a( $x ){ return $x+1 ; }\n\n\n\tfunction b() {}\n}";
    assert_eq!(print(source), source);
}

#[test]
fn test_round_trip_without_trailing_newline_or_namespace() {
    let source = "<?php\n\nuse Foo\\Bar;\n\nfinal class Plain implements Bar, \\Countable\n{\n}";
    assert_eq!(print(source), source);
}

#[test]
fn test_detached_tree_uses_default_style() {
    let tree = PhpParser.parse(PROVIDER).unwrap();
    let detached = SyntaxTree::detached(tree.stmts.clone(), tree.ids.clone());
    // Spans are ignored without source text.
    let printed = PhpPrinter.print(&detached);
    assert!(printed.starts_with("<?php\n\n/**\n * Copyright notice\n */\ndeclare(strict_types=1);\n\nnamespace Pyz\\Zed\\Shop;\n\nuse Spryker\\Zed\\Kernel\\Container;\nuse Spryker\\Zed\\Shop\\ShopDependencyProvider as SprykerShopDependencyProvider;\n\nclass ShopDependencyProvider extends SprykerShopDependencyProvider\n{\n    public const PLUGINS_SHOP = 'PLUGINS_SHOP';\n"));
    assert_eq!(print(&printed), printed);
}

#[test]
fn test_pretty_print_method() {
    let method = ClassMethod {
        modifiers: Modifiers {
            visibility: Some(Visibility::Protected),
            is_static: true,
            ..Modifiers::default()
        },
        by_ref: false,
        name: "getPlugins".into(),
        params: vec![Param {
            type_hint: Some("Container".into()),
            by_ref: false,
            variadic: false,
            name: "container".into(),
            default: Some(Expr::null()),
        }],
        return_type: Some("array".into()),
        body: Some(vec![Stmt::new(
            NodeId::new(1),
            StmtKind::Return(Some(Expr::FuncCall {
                name: Name::new("array_merge"),
                args: vec![
                    Arg::positional(Expr::StaticCall {
                        class: Name::new("parent"),
                        name: "getPlugins".into(),
                        args: vec![],
                    }),
                    Arg::positional(Expr::empty_array()),
                ],
            })),
        )]),
    };
    assert_eq!(
        method.to_source(),
        "protected static function getPlugins(Container $container = null): array\n{\n    return array_merge(parent::getPlugins(), []);\n}"
    );
}

#[test]
fn test_pretty_print_nested_array() {
    let expr = PhpParser
        .parse_expression("[Foo::class => ['a', 'b'], 'closure' => function () { return 1; }]")
        .unwrap();
    assert_eq!(
        expr.to_source(),
        "[\n    Foo::class => ['a', 'b'],\n    'closure' => function () {\n        return 1;\n    },\n]"
    );
}

#[test]
fn test_float_and_string_literals() {
    assert_eq!(Expr::Float(2.0).to_source(), "2.0");
    assert_eq!(Expr::Float(f64::INFINITY).to_source(), "INF");
    assert_eq!(Expr::String("a\\b'c".into()).to_source(), "'a\\\\b\\'c'");
}

#[test]
fn test_unary_and_ternary_parenthesize() {
    let expr = Expr::UnaryOp {
        op: UnaryOp::Not,
        operand: Box::new(Expr::BinaryOp {
            op: BinaryOp::BoolAnd,
            left: Box::new(Expr::Variable("a".into())),
            right: Box::new(Expr::Variable("b".into())),
        }),
    };
    assert_eq!(expr.to_source(), "!($a && $b)");

    let nested = Expr::Ternary {
        cond: Box::new(Expr::Variable("a".into())),
        then: Some(Box::new(Expr::Int(1))),
        otherwise: Box::new(Expr::Ternary {
            cond: Box::new(Expr::Variable("b".into())),
            then: Some(Box::new(Expr::Int(2))),
            otherwise: Box::new(Expr::Int(3)),
        }),
    };
    assert_eq!(nested.to_source(), "$a ? 1 : ($b ? 2 : 3)");
}

#[test]
fn test_dirty_class_keeps_trailing_comment() {
    let mut tree = PhpParser.parse(PROVIDER).unwrap();
    let StmtKind::Namespace { stmts, .. } = &mut tree.stmts[1].kind else {
        panic!("expected namespace");
    };
    let class_stmt = stmts.last_mut().unwrap();
    class_stmt.dirty = true;
    let StmtKind::Class(class) = &mut class_stmt.kind else {
        panic!("expected class");
    };
    class.members.remove(0);
    tree.stmts[1].dirty = true;

    let printed = PhpPrinter.print(&tree);
    let expected = PROVIDER.replace("    public const PLUGINS_SHOP = 'PLUGINS_SHOP';\n\n", "");
    assert_eq!(printed, expected);
}
