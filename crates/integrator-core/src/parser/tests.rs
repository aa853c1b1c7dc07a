use super::*;
use crate::ast::{BinaryOp, Expr, StmtKind, ToSource, UnaryOp};

fn expr(code: &str) -> Expr {
    PhpParser.parse_expression(code).unwrap()
}

fn class_members(source: &str) -> Vec<crate::ast::Stmt> {
    let tree = PhpParser.parse(source).unwrap();
    crate::builder::finder::find_class_node(&tree.stmts)
        .unwrap()
        .members
        .clone()
}

#[test]
fn test_parse_provider_file() {
    let source = r#"<?php

/**
 * Copyright notice
 */

declare(strict_types=1);

namespace Pyz\Zed\Shop;

use Spryker\Zed\Shop\ShopDependencyProvider as SprykerShopDependencyProvider;
use Spryker\Zed\Kernel\Container;

class ShopDependencyProvider extends SprykerShopDependencyProvider
{
    use LoggerTrait;

    public const PLUGINS = 'PLUGINS';

    protected ?string $name = null;

    /**
     * @return array<\Spryker\Zed\Shop\Dependency\PluginInterface>
     */
    protected function getShopPlugins(): array
    {
        return [
            new FirstPlugin(),
            new SecondPlugin(),
        ];
    }

    public function provideBusinessLayerDependencies(Container $container): Container
    {
        $container = parent::provideBusinessLayerDependencies($container);
        $container->set(static::PLUGINS, function (Container $container) {
            return $this->getShopPlugins();
        });

        return $container;
    }
}
"#;
    let tree = PhpParser.parse(source).unwrap();
    assert_eq!(tree.stmts.len(), 2);
    assert_eq!(tree.stmts[0].comments.len(), 1);
    assert!(matches!(tree.stmts[0].kind, StmtKind::Declare(_)));

    let StmtKind::Namespace { name, stmts } = &tree.stmts[1].kind else {
        panic!("expected namespace");
    };
    assert_eq!(name.0, "Pyz\\Zed\\Shop");
    assert_eq!(stmts.len(), 3);

    let class = stmts[2].as_class().unwrap();
    assert_eq!(class.extends.as_ref().unwrap().0, "SprykerShopDependencyProvider");
    assert_eq!(class.members.len(), 5);
    let method = class.members[3].as_method().unwrap();
    assert_eq!(method.name, "getShopPlugins");
    assert_eq!(method.return_type.as_deref(), Some("array"));
    assert_eq!(class.members[3].comments.len(), 1);
}

#[test]
fn test_spans_cover_leading_comments() {
    let source = "<?php\nclass A\n{\n    // note\n    public function a() {}\n}\n";
    let members = class_members(source);
    let span = members[0].span.unwrap();
    assert_eq!(&source[span.start..span.end], "// note\n    public function a() {}");
    assert_eq!(&source[span.body.unwrap() - 1..span.body.unwrap()], "{");
}

#[test]
fn test_namespace_span_extends_over_children() {
    let source = "<?php\nnamespace App;\n\nuse Foo;\n\nclass A\n{\n}\n";
    let tree = PhpParser.parse(source).unwrap();
    let span = tree.stmts[0].span.unwrap();
    assert_eq!(&source[span.start..span.end], "namespace App;\n\nuse Foo;\n\nclass A\n{\n}");
    assert_eq!(&source[span.start..span.body.unwrap()], "namespace App;");
}

#[test]
fn test_method_signatures() {
    let members = class_members(
        "<?php\nabstract class A\n{\n    abstract protected function make(?int $a, string|int &$b = 'x', ...$rest): static;\n    final public static function &build(array $items = [], $flag = true) {}\n}\n",
    );
    let make = members[0].as_method().unwrap();
    assert!(make.modifiers.is_abstract);
    assert!(make.body.is_none());
    assert_eq!(make.params.len(), 3);
    assert_eq!(make.params[0].type_hint.as_deref(), Some("?int"));
    assert!(make.params[1].by_ref);
    assert_eq!(make.params[1].type_hint.as_deref(), Some("string|int"));
    assert!(make.params[2].variadic);
    assert_eq!(make.return_type.as_deref(), Some("static"));

    let build = members[1].as_method().unwrap();
    assert!(build.by_ref && build.modifiers.is_static && build.modifiers.is_final);
    assert_eq!(build.params[0].default, Some(Expr::empty_array()));
}

#[test]
fn test_operator_precedence() {
    let parsed = expr("1 + 2 * 3");
    let Expr::BinaryOp { op, right, .. } = parsed else {
        panic!("expected binary op");
    };
    assert_eq!(op, BinaryOp::Plus);
    assert!(matches!(*right, Expr::BinaryOp { op: BinaryOp::Mul, .. }));

    assert_eq!(expr("$a ?? $b ?? $c").to_source(), "$a ?? $b ?? $c");
    assert_eq!(expr("($a + $b) * $c").to_source(), "($a + $b) * $c");
    assert_eq!(expr("$a - ($b - $c)").to_source(), "$a - ($b - $c)");
    assert_eq!(expr("!$a && $b || $c").to_source(), "!$a && $b || $c");
    assert_eq!(expr("$a === 'x' ? 1 : 2").to_source(), "$a === 'x' ? 1 : 2");
    assert_eq!(expr("$a ?: 'fallback'").to_source(), "$a ?: 'fallback'");
    assert!(matches!(expr("-1"), Expr::UnaryOp { op: UnaryOp::Minus, .. }));
}

#[test]
fn test_postfix_chains() {
    assert_eq!(
        expr("$this->getFactory()?->createReader()->items[0]").to_source(),
        "$this->getFactory()?->createReader()->items[0]"
    );
    assert_eq!(expr("Foo\\Bar::class").to_source(), "Foo\\Bar::class");
    assert_eq!(expr("static::$cache").to_source(), "static::$cache");
    assert_eq!(expr("parent::getPlugins()").to_source(), "parent::getPlugins()");
    assert_eq!(expr("new \\ArrayObject([1])").to_source(), "new \\ArrayObject([1])");
    assert_eq!(expr("foo(name: $x, ...$rest)").to_source(), "foo(name: $x, ...$rest)");
}

#[test]
fn test_arrays() {
    assert_eq!(expr("array(1, 2,)").to_source(), "array(1, 2)");
    assert_eq!(
        expr("['a' => 1, 'b' => [2]]").to_source(),
        "[\n    'a' => 1,\n    'b' => [2],\n]"
    );
    assert_eq!(expr("[]").to_source(), "[]");
}

#[test]
fn test_strings() {
    assert_eq!(expr(r"'it\'s \\ \n'"), Expr::String(r"it's \ \n".to_string()));
    assert_eq!(expr(r#""Hello $name\n""#), Expr::InterpolatedString(r"Hello $name\n".to_string()));
}

#[test]
fn test_numbers() {
    assert_eq!(expr("42"), Expr::Int(42));
    assert_eq!(expr("1.5"), Expr::Float(1.5));
    assert_eq!(expr("1e3"), Expr::Float(1000.0));
}

#[test]
fn test_closures_and_arrow_functions() {
    assert_eq!(
        expr("function (Container $c) use ($self, &$count): array { return []; }").to_source(),
        "function (Container $c) use ($self, &$count): array {\n    return [];\n}"
    );
    assert_eq!(expr("static fn($x) => $x * 2").to_source(), "static fn ($x) => $x * 2");
}

#[test]
fn test_assignment_is_right_associative() {
    assert_eq!(expr("$a = $b = 1").to_source(), "$a = $b = 1");
    assert!(PhpParser.parse_expression("1 = 2").is_err());
}

#[test]
fn test_if_statements() {
    let stmts = PhpParser
        .parse_statements("if ($a) { return 1; } elseif ($b) { return 2; } else if ($c) { return 3; } else { return 4; }")
        .unwrap();
    let StmtKind::If { else_ifs, otherwise, .. } = &stmts[0].kind else {
        panic!("expected if");
    };
    assert_eq!(else_ifs.len(), 2);
    assert_eq!(otherwise.as_ref().map(Vec::len), Some(1));
}

#[test]
fn test_expression_must_be_complete() {
    assert!(PhpParser.parse_expression("1 +").is_err());
    assert!(PhpParser.parse_expression("").is_err());
    assert!(PhpParser.parse_expression("1; 2").is_err());
    assert!(PhpParser.parse_expression("foo(").is_err());
    assert!(PhpParser.parse_expression("'open").is_err());
}

#[test]
fn test_error_position() {
    let error = PhpParser
        .parse("<?php\nclass A\n{\n    public function a()\n    {\n        return 1 +;\n    }\n}\n")
        .unwrap_err();
    assert_eq!(error.line, 6);
    assert_eq!(error.column, 19);
}

#[test]
fn test_missing_open_tag() {
    let error = PhpParser.parse("class A {}").unwrap_err();
    assert_eq!((error.line, error.column), (1, 1));
    assert!(error.message.contains("<?php"));
}

#[test]
fn test_unclosed_class() {
    assert!(PhpParser.parse("<?php\nclass A\n{\n    public function a() {}\n").is_err());
}

#[test]
fn test_parse_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Broken.php");
    std::fs::write(&path, "<?php\nclass {").unwrap();

    match PhpParser.parse_file(&path) {
        Err(IntegratorError::Syntax { path: Some(reported), .. }) => assert_eq!(reported, path),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(matches!(
        PhpParser.parse_file(&dir.path().join("Missing.php")),
        Err(IntegratorError::ClassIo { .. })
    ));
}

#[test]
fn test_trivia_detection() {
    assert!(php::is_trivia("\n    // comment\n    /* block */\n"));
    assert!(php::is_trivia(""));
    assert!(!php::is_trivia("\n  return 1;"));
}
