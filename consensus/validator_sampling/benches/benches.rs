use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use validator_sampling::compute_sync_committee_indices_electra;

const MAX_EFFECTIVE_BALANCE_ELECTRA: u64 = 2_048_000_000_000;
const EFFECTIVE_BALANCE_INCREMENT: u32 = 1_000_000_000;
const SHUFFLE_ROUND_COUNT: u8 = 90;
const SYNC_COMMITTEE_SIZE: usize = 512;

fn sync_committee(c: &mut Criterion) {
    let seed = vec![1; 32];

    let mut group = c.benchmark_group("compute_sync_committee_indices");
    group.sample_size(10);
    for validator_count in [16_384_u32, 250_000] {
        let active_indices: Vec<u32> = (0..validator_count).collect();
        let effective_balance_increments: Vec<u16> = (0..validator_count)
            .map(|i| (32 + 32 * (i % 64)) as u16)
            .collect();
        group.bench_with_input(
            BenchmarkId::from_parameter(validator_count),
            &validator_count,
            |b, _| {
                b.iter(|| {
                    compute_sync_committee_indices_electra(
                        black_box(&seed),
                        &active_indices,
                        &effective_balance_increments,
                        SYNC_COMMITTEE_SIZE,
                        MAX_EFFECTIVE_BALANCE_ELECTRA,
                        EFFECTIVE_BALANCE_INCREMENT,
                        SHUFFLE_ROUND_COUNT,
                    )
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, sync_committee);
criterion_main!(benches);
