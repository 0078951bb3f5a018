use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::sync::Arc;
use vouchsafe_crypto::{candidate_leaf, MerkleTree};
use vouchsafe_escrow::{
    CandidateProof, CustodyAuthority, EscrowAccount, EscrowConfig, EscrowEngine, InMemoryLedger, Ledger,
    ManualClock, OpenEscrow,
};
use vouchsafe_types::{Address, Hash};

const CANDIDATES: u32 = 1024;

fn candidates() -> (Vec<Address>, MerkleTree) {
    let candidates: Vec<Address> = (0..CANDIDATES)
        .map(|i| {
            let mut bytes = [0u8; 20];
            bytes[..4].copy_from_slice(&i.to_be_bytes());
            Address::from_bytes(bytes)
        })
        .collect();
    let leaves: Vec<Hash> = candidates.iter().map(candidate_leaf).collect();
    let tree = MerkleTree::from_leaves(&leaves).unwrap();
    (candidates, tree)
}

fn setup() -> (EscrowEngine<InMemoryLedger, ManualClock>, CustodyAuthority, Address) {
    let ledger = Arc::new(InMemoryLedger::new());
    let depositor = Address::from_bytes([0xd0u8; 20]);
    ledger.credit_native(&depositor, u64::MAX / 2).unwrap();
    let engine = EscrowEngine::new(EscrowConfig::default(), ledger, ManualClock::new(0)).unwrap();
    let authority = engine.initialize_custody_authority(&depositor).unwrap();
    (engine, authority, depositor)
}

fn bench_collect(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");
    let (candidates, tree) = candidates();
    let position = 777u64;
    let claimant = candidates[position as usize];
    let proof = CandidateProof::new(tree.path(position).unwrap(), position);

    group.bench_function("open_collect_1024", |b| {
        b.iter_batched(
            setup,
            |(engine, authority, depositor)| {
                let handle = engine
                    .open_escrow(&authority, OpenEscrow::native(depositor, tree.root(), tree.len(), 100, 0))
                    .unwrap();
                black_box(engine.collect(&authority, &claimant, &handle.address, &proof).unwrap())
            },
            BatchSize::SmallInput,
        )
    });

    // Quorum at half of a large deposit keeps the escrow in voting
    let (engine, authority, depositor) = setup();
    let handle = engine
        .open_escrow(&authority, OpenEscrow::native(depositor, tree.root(), tree.len(), 1 << 60, 3_600))
        .unwrap();
    let voter = Address::from_bytes([0x71u8; 20]);
    group.bench_function("vote", |b| {
        b.iter(|| black_box(engine.vote(&voter, &handle.address, position, 1).is_ok()))
    });

    group.finish();
}

fn bench_account_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("account");
    let (engine, authority, depositor) = setup();
    let (_, tree) = candidates();
    let handle = engine
        .open_escrow(&authority, OpenEscrow::native(depositor, tree.root(), tree.len(), 100, 3_600))
        .unwrap();
    let escrow = engine.escrow(&handle.address).unwrap();
    let bytes = escrow.to_bytes().unwrap();

    group.bench_function("encode", |b| b.iter(|| black_box(escrow.to_bytes().unwrap())));
    group.bench_function("decode", |b| {
        b.iter(|| black_box(EscrowAccount::from_bytes(&bytes).unwrap()))
    });
    group.finish();
}

criterion_group!(benches, bench_collect, bench_account_layout);
criterion_main!(benches);
