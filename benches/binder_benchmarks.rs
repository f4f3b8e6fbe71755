//! Binder benchmarks.
//!
//! - `concat`: flattening long `&` chains, all constant and mixed with locals
//! - `overloads`: resolving a call against a growing overload set

use basalt::symbols::{ParamEntry, ProcedureEntry, TypeEntry};
use basalt::syntax::BinaryOp;
use basalt::{AstBuilder, CompileOptions, DataType, ExpressionFlags, InterpretationContext, PrimitiveKind, Session, Span, TypeHash};
use bumpalo::Bump;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

fn bench_concat(c: &mut Criterion) {
    let mut group = c.benchmark_group("concat");
    let session = Session::new(CompileOptions::lenient()).expect("runtime types register");

    for operands in [8usize, 64, 512] {
        group.throughput(Throughput::Elements(operands as u64));

        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let constants: Vec<_> = (0..operands).map(|i| ast.string(&format!("s{i}"))).collect();
        let constant_chain = ast.alloc(ast.chain(BinaryOp::Concatenate, &constants));
        group.bench_with_input(BenchmarkId::new("constant", operands), &constant_chain, |bench, expr| {
            bench.iter(|| {
                let mut body = session.body(InterpretationContext::new());
                black_box(body.expression(expr, ExpressionFlags::VALUE, None))
            });
        });

        let mixed: Vec<_> = (0..operands)
            .map(|i| if i % 2 == 0 { ast.name("text") } else { ast.int(i as u64) })
            .collect();
        let mixed_chain = ast.alloc(ast.chain(BinaryOp::Concatenate, &mixed));
        group.bench_with_input(BenchmarkId::new("mixed", operands), &mixed_chain, |bench, expr| {
            bench.iter(|| {
                let mut body = session.body(InterpretationContext::new());
                body.scope_mut()
                    .declare("text", Some(DataType::string()), Span::new(0, 1, 1))
                    .expect("fresh scope");
                black_box(body.expression(expr, ExpressionFlags::VALUE, None))
            });
        });
    }
    group.finish();
}

/// `M.F` overloaded on each primitive parameter type, called with a `Short`.
fn overload_session(count: usize) -> (Session, TypeHash) {
    let mut session = Session::new(CompileOptions::strict()).expect("runtime types register");
    let table = session.table_mut();
    let module = table.register_type(TypeEntry::module("M")).expect("module registers");
    let kinds = [
        PrimitiveKind::Double,
        PrimitiveKind::Single,
        PrimitiveKind::Decimal,
        PrimitiveKind::Long,
        PrimitiveKind::Integer,
        PrimitiveKind::Short,
        PrimitiveKind::String,
        PrimitiveKind::Boolean,
    ];
    for (i, kind) in kinds.iter().cycle().take(count).enumerate() {
        let mut params = vec![ParamEntry::new("x", DataType::primitive(*kind))];
        params.extend((0..i / kinds.len()).map(|n| ParamEntry::new(&format!("extra{n}"), DataType::integer())));
        table
            .register_procedure(ProcedureEntry::sub(module, "F", params).shared())
            .expect("overload registers");
    }
    (session, module)
}

fn bench_overloads(c: &mut Criterion) {
    let mut group = c.benchmark_group("overloads");
    for count in [2usize, 8, 32] {
        let (session, module) = overload_session(count);
        let arena = Bump::new();
        let ast = AstBuilder::new(&arena);
        let expr = ast.alloc(ast.call(ast.name("F"), &[ast.name("n")]));

        group.bench_with_input(BenchmarkId::from_parameter(count), &expr, |bench, expr| {
            bench.iter(|| {
                let mut body = session.body(InterpretationContext::in_type(module).with_shared(true));
                body.scope_mut()
                    .declare("n", Some(DataType::primitive(PrimitiveKind::Short)), Span::new(0, 1, 1))
                    .expect("fresh scope");
                black_box(body.expression(expr, ExpressionFlags::STATEMENT, None))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_concat, bench_overloads);
criterion_main!(benches);
