//! Linearization and lookup benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use graft_core::{AttributeSpec, ImplHandle, LookupCache, TypeNodeId, TypeRegistry};

/// Build a layered lattice: `layers` rows of `width` types, each type
/// inheriting from two types of the previous row. Returns the registry
/// and one type from the deepest row.
fn build_lattice(layers: usize, width: usize) -> (TypeRegistry, TypeNodeId) {
    let registry = TypeRegistry::new("object");
    let mut previous: Vec<TypeNodeId> = (0..width)
        .map(|i| {
            registry
                .register_guest_type(
                    format!("L0_{i}"),
                    vec![],
                    vec![AttributeSpec::method(format!("m{i}"), ImplHandle(i as u64))],
                )
                .unwrap()
        })
        .collect();

    for layer in 1..layers {
        previous = (0..width)
            .map(|i| {
                let bases = vec![previous[i], previous[(i + 1) % width]];
                registry
                    .register_guest_type(format!("L{layer}_{i}"), bases, vec![])
                    .unwrap()
            })
            .collect();
    }
    let leaf = previous[0];
    (registry, leaf)
}

fn bench_linearize(c: &mut Criterion) {
    c.bench_function("linearize_lattice_8x8", |b| {
        b.iter(|| {
            let (registry, leaf) = build_lattice(8, 8);
            black_box(registry.get(leaf).unwrap().mro().len())
        })
    });
}

fn bench_lookup(c: &mut Criterion) {
    let (registry, leaf) = build_lattice(8, 8);
    let cache = LookupCache::new();

    c.bench_function("resolve_cold_to_warm", |b| {
        b.iter(|| black_box(cache.resolve(&registry, leaf, "m3")))
    });

    cache.resolve(&registry, leaf, "m0");
    c.bench_function("resolve_cached_hit", |b| {
        b.iter(|| black_box(cache.resolve(&registry, leaf, "m0")))
    });
}

criterion_group!(benches, bench_linearize, bench_lookup);
criterion_main!(benches);
