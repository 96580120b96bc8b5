//! vm_hotpath.rs : micro-benchs « hot path » de la boucle de dispatch
//!
//! Les chunks sont compilés une fois ; seule la passe `run_chunk` est mesurée.
//!
//! Lancer :
//!   cargo bench -p lox-benches --bench vm_hotpath
//!   cargo bench -p lox-benches --bench vm_hotpath -- --save-baseline hot
//!   cargo bench -p lox-benches --bench vm_hotpath -- --baseline hot

use std::hint::black_box;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use lox_vm::prelude::*;

// ────────────────────────────────────────────────────────────────────────────
// Cas « hot path » : expressions auto-contenues
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct Micro {
    name: &'static str,
    src: String,
}

/// `1 + 2 + ... + n` (tient dans le pool de constantes si `n <= 256`).
fn arith_chain(n: usize) -> String { (1..=n).map(|i| i.to_string()).collect::<Vec<_>>().join(" + ") }

/// Parenthésage à droite : la pile monte à `depth`.
fn nested(depth: usize) -> String {
    let mut s = String::new();
    for i in 0..depth {
        s.push_str(&format!("{i} * ("));
    }
    s.push('1');
    s.push_str(&")".repeat(depth));
    s
}

fn compare_chain(n: usize) -> String {
    (0..n).map(|i| format!("!({i} < {}) == false", i + 1)).collect::<Vec<_>>().join(" == ")
}

fn micros() -> Vec<Micro> {
    vec![
        Micro { name: "arith/chain_200", src: arith_chain(200) },
        Micro { name: "arith/nested_100", src: nested(100) },
        Micro { name: "logic/compare_60", src: compare_chain(60) },
    ]
}

fn compile(vm: &mut Vm, src: &str) -> Chunk {
    vm.compile(src).unwrap_or_else(|e| panic!("bench source does not compile:\n{e}"))
}

// ────────────────────────────────────────────────────────────────────────────
// Benchs
// ────────────────────────────────────────────────────────────────────────────

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("vm/hotpath/dispatch");
    group.sample_size(60);
    group.warm_up_time(Duration::from_millis(300));
    group.measurement_time(Duration::from_secs(4));

    for m in micros() {
        let mut vm = Vm::default();
        let chunk = compile(&mut vm, &m.src);
        group.throughput(Throughput::Bytes(chunk.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(m.name), &chunk, |b, chunk| {
            b.iter(|| {
                let result = vm.run_chunk(black_box(chunk));
                assert!(result.is_ok());
                black_box(result)
            });
        });
    }
    group.finish();
}

fn bench_concat(c: &mut Criterion) {
    // chaque passe alloue : VM neuve par lot pour borner le tas
    let src = vec!["\"ab\""; 64].join(" + ");
    let mut group = c.benchmark_group("vm/hotpath/concat");
    group.sample_size(40);
    group.bench_function("strings_64", |b| {
        b.iter_batched(
            || {
                let mut vm = Vm::default();
                let chunk = compile(&mut vm, &src);
                (vm, chunk)
            },
            |(mut vm, chunk)| {
                let result = vm.run_chunk(&chunk);
                black_box(vm.teardown());
                result
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn bench_verify(c: &mut Criterion) {
    let src = arith_chain(200);
    let mut plain = Vm::default();
    let mut checked = Vm::new(VmConfig::default().with_verify_chunks(true));
    let chunk = compile(&mut plain, &src);

    let mut group = c.benchmark_group("vm/hotpath/verify");
    group.bench_function("off", |b| b.iter(|| black_box(plain.run_chunk(&chunk))));
    group.bench_function("on", |b| b.iter(|| black_box(checked.run_chunk(&chunk))));
    group.finish();
}

criterion_group!(benches, bench_dispatch, bench_concat, bench_verify);
criterion_main!(benches);
