use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use vouchsafe_crypto::{candidate_leaf, hash_pair, MerkleTree};
use vouchsafe_types::{Address, Hash};

fn bench_address_to_string(c: &mut Criterion) {
    let mut group = c.benchmark_group("address");
    let addr = Address::from_bytes([7u8; 20]);
    group.bench_function("to_string", |b| b.iter(|| black_box(addr.to_string())));
    group.bench_function("derive", |b| {
        b.iter(|| black_box(Address::derive(&addr, &[b"escrow", addr.as_bytes()])))
    });
    group.finish();
}

fn bench_hashing(c: &mut Criterion) {
    let mut group = c.benchmark_group("hashing");
    let left = Hash::compute(b"left");
    let right = Hash::compute(b"right");
    let addr = Address::from_bytes([9u8; 20]);

    group.bench_function("hash_pair", |b| b.iter(|| black_box(hash_pair(&left, &right))));
    group.bench_function("candidate_leaf", |b| b.iter(|| black_box(candidate_leaf(&addr))));
    group.finish();
}

fn bench_tree_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("commitment");
    for size in [16u32, 256, 4096] {
        let leaves: Vec<Hash> = (0..size)
            .map(|i| candidate_leaf(&Address::from_bytes([(i % 251) as u8; 20])))
            .collect();
        group.throughput(Throughput::Elements(u64::from(size)));
        group.bench_with_input(BenchmarkId::new("build_root", size), &leaves, |b, leaves| {
            b.iter(|| MerkleTree::from_leaves(black_box(leaves)).unwrap().root())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_address_to_string, bench_hashing, bench_tree_sizes);
criterion_main!(benches);
