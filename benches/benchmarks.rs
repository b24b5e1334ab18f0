//! Performance benchmarks for tally operations

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use elgamal_tally::{
    GroupParameters, HomomorphicOperations, KeyPair, SecretVault, TallyDecoder, VoteEncoder,
};

fn benchmark_key_generation(c: &mut Criterion) {
    let params = GroupParameters::reference();

    c.bench_function("key_generation", |b| {
        b.iter(|| KeyPair::generate(black_box(&params)).expect("Failed to generate keys"));
    });
}

fn benchmark_encryption(c: &mut Criterion) {
    let mut group = c.benchmark_group("encrypt_vote");

    let params = GroupParameters::reference();
    let keypair = KeyPair::generate(&params).expect("Failed to generate keys");
    let encoder = VoteEncoder::new(params, keypair.public_key);

    for candidates in [1usize, 5, 20].iter() {
        let mut choices = vec![0u64; *candidates];
        choices[0] = 1;
        group.bench_with_input(
            BenchmarkId::from_parameter(candidates),
            &choices,
            |b, choices| {
                b.iter(|| {
                    encoder
                        .encrypt_vote(black_box(choices))
                        .expect("Encryption failed")
                });
            },
        );
    }

    group.finish();
}

fn benchmark_tally_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("decrypt_tally");

    let params = GroupParameters::reference();
    let keypair = KeyPair::generate(&params).expect("Failed to generate keys");
    let encoder = VoteEncoder::new(params.clone(), keypair.public_key.clone());

    // Worst case for each bound: the largest tally it admits
    for bound in [10u64, 100, 1000, 3900].iter() {
        let decoder = TallyDecoder::new(params.clone(), *bound).expect("Invalid bound");
        let ct = encoder
            .encrypt_vote(&[bound - 1])
            .expect("Encryption failed")
            .remove(0);

        group.bench_with_input(BenchmarkId::new("search", bound), &ct, |b, ct| {
            b.iter(|| {
                decoder
                    .decrypt(black_box(ct), &keypair.private_key)
                    .expect("Decoding failed")
            });
        });

        group.bench_with_input(BenchmarkId::new("table_build", bound), bound, |b, &bound| {
            b.iter(|| TallyDecoder::new(params.clone(), black_box(bound)).expect("Invalid bound"));
        });
    }

    group.finish();
}

fn benchmark_aggregation(c: &mut Criterion) {
    let params = GroupParameters::reference();
    let keypair = KeyPair::generate(&params).expect("Failed to generate keys");
    let encoder = VoteEncoder::new(params.clone(), keypair.public_key);

    let ballots: Vec<_> = (0..100)
        .map(|i| {
            let mut choices = vec![0u64; 3];
            choices[i % 3] = 1;
            encoder.encrypt_vote(&choices).expect("Encryption failed")
        })
        .collect();

    c.bench_function("aggregate_100_ballots", |b| {
        b.iter(|| {
            params
                .aggregate_votes(black_box(&ballots))
                .expect("Aggregation failed")
        });
    });
}

fn benchmark_vault(c: &mut Criterion) {
    let vault = SecretVault::default();
    let sealed = vault.seal("5318", "operator secret").expect("Seal failed");

    let mut group = c.benchmark_group("vault");
    group.sample_size(10);
    group.bench_function("seal", |b| {
        b.iter(|| vault.seal(black_box("5318"), "operator secret").expect("Seal failed"));
    });
    group.bench_function("unseal", |b| {
        b.iter(|| {
            vault
                .unseal(black_box(&sealed), "operator secret")
                .expect("Unseal failed")
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_key_generation,
    benchmark_encryption,
    benchmark_tally_decoding,
    benchmark_aggregation,
    benchmark_vault
);
criterion_main!(benches);
