//! Benchmarks for synthesis hot paths.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stacksmith::core::construct::logical_id;
use stacksmith::core::parser;
use stacksmith::core::stack::{Stack, StackProps};
use stacksmith::core::types::Value;
use stacksmith::resources::{BucketProps, ConstructProps, RoleProps};

/// A chain where every role names itself after its predecessor.
fn chain(n: usize) -> Stack {
    let mut stack = Stack::new("bench", StackProps::default()).unwrap();
    stack
        .add_construct(None, "n0", ConstructProps::Role(RoleProps::new("svc")))
        .unwrap();
    for i in 1..n {
        let mut role = RoleProps::new("svc");
        role.role_name = Some(Value::reference(format!("n{}", i - 1), "arn"));
        stack
            .add_construct(None, &format!("n{}", i), ConstructProps::Role(role))
            .unwrap();
    }
    stack
}

/// Independent constructs: ordering falls back to insertion order.
fn flat(n: usize) -> Stack {
    let mut stack = Stack::new("bench", StackProps::default()).unwrap();
    for i in 0..n {
        stack
            .add_construct(
                None,
                &format!("b{}", i),
                ConstructProps::Bucket(BucketProps::default()),
            )
            .unwrap();
    }
    stack
}

fn bench_synthesize(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthesize");
    for n in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("chain", n), &n, |b, &n| {
            b.iter_batched(
                || chain(n),
                |mut stack| black_box(stack.synthesize().unwrap()),
                criterion::BatchSize::SmallInput,
            );
        });
        group.bench_with_input(BenchmarkId::new("flat", n), &n, |b, &n| {
            b.iter_batched(
                || flat(n),
                |mut stack| black_box(stack.synthesize().unwrap()),
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_logical_id(c: &mut Criterion) {
    let mut group = c.benchmark_group("logical_id");
    for depth in [1, 4, 16] {
        let path = vec!["service-component"; depth].join("/");
        group.bench_with_input(BenchmarkId::from_parameter(depth), &path, |b, path| {
            b.iter(|| black_box(logical_id(black_box(path))));
        });
    }
    group.finish();
}

fn bench_manifest_parse(c: &mut Criterion) {
    let yaml = r#"
version: "1.0"
app: bench
stacks:
  api:
    constructs:
      role:
        type: role
        assumed_by: lambda.amazonaws.com
      code:
        type: asset
        path: lambda/package
      handler:
        type: function
        runtime: python3.12
        handler: app.main.handler
        code: { ref: code.location }
        role: { ref: role.arn }
        environment:
          STAGE: prod
      http:
        type: rest_api
        handler: { ref: handler.arn }
"#;

    c.bench_function("manifest_parse_and_build", |b| {
        b.iter(|| {
            let manifest = parser::parse_manifest(black_box(yaml)).unwrap();
            black_box(parser::build_app(&manifest).unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_synthesize,
    bench_logical_id,
    bench_manifest_parse
);
criterion_main!(benches);
