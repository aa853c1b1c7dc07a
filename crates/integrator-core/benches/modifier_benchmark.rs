use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use integrator_core::{
    ClassDescriptor, ClassModifier, Parser, PhpParser, PhpPrinter, Printer, ReturnValue,
};
use serde_json::json;

const PARENT: &str = r#"<?php

namespace Spryker\Zed\Shop;

class ShopDependencyProvider
{
    protected function getCartPlugins(): array
    {
        return [
            new CartPlugin(),
        ];
    }
}
"#;

/// Child class with `methods` local methods in front of the ones we touch.
fn child_source(methods: usize) -> String {
    let mut source = String::from(
        "<?php\n\nnamespace Pyz\\Zed\\Shop;\n\nuse Spryker\\Zed\\Shop\\ShopDependencyProvider as SprykerShopDependencyProvider;\n\nclass ShopDependencyProvider extends SprykerShopDependencyProvider\n{\n",
    );
    for i in 0..methods {
        source.push_str(&format!(
            "    /**\n     * @return array\n     */\n    protected function getPlugins{i}(): array\n    {{\n        return [\n            new Plugin{i}(),\n            'key' => static::VALUE_{i},\n        ];\n    }}\n\n"
        ));
    }
    source.push_str("}\n");
    source
}

fn bench_parse_print(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_print");
    for methods in [1, 10, 50] {
        let source = child_source(methods);
        group.bench_with_input(BenchmarkId::from_parameter(methods), &source, |b, source| {
            b.iter(|| {
                let tree = PhpParser.parse(black_box(source)).unwrap();
                black_box(PhpPrinter.print(&tree))
            })
        });
    }
    group.finish();
}

fn bench_mutations(c: &mut Criterion) {
    let modifier = ClassModifier::new(&PhpParser);
    let parent = ClassDescriptor::from_source(&PhpParser, PARENT).unwrap();
    let child = ClassDescriptor::from_source(&PhpParser, &child_source(10))
        .unwrap()
        .with_parent(parent);

    c.bench_function("override_and_print", |b| {
        b.iter(|| {
            let class = modifier.override_method_from_parent(black_box(child.clone()), "getCartPlugins");
            black_box(class.print(&PhpPrinter))
        })
    });

    let value = ReturnValue::from_json(json!({"is_literal": true, "value": "static::LIMIT * 2"}));
    c.bench_function("set_return_value", |b| {
        b.iter(|| {
            black_box(
                modifier
                    .set_method_return_value(child.clone(), "getLimit", &value)
                    .unwrap(),
            )
        })
    });

    c.bench_function("remove_method", |b| {
        b.iter(|| black_box(modifier.remove_class_method(child.clone(), "getPlugins5")))
    });
}

criterion_group!(benches, bench_parse_print, bench_mutations);
criterion_main!(benches);
