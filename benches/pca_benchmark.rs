use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ndarray::{Array, Array2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use omics_embedding_analyses::{ClinicalTable, PcaProjector};

fn generate_data(n_samples: usize, n_features: usize) -> Array2<f64> {
    Array::random((n_samples, n_features), Uniform::new(0., 10.))
}

fn bench_decompose(c: &mut Criterion) {
    let mut group = c.benchmark_group("PcaProjector_decompose");

    for &(n_samples, n_features) in [(100, 50), (500, 100), (100, 200), (1000, 300)].iter() {
        let data = generate_data(n_samples, n_features);
        group.throughput(Throughput::Elements((n_samples * n_features) as u64));
        group.bench_with_input(
            BenchmarkId::new("decompose", format!("{}x{}", n_samples, n_features)),
            &data,
            |b, data_matrix| {
                let projector = PcaProjector::new();
                b.iter(|| projector.decompose(data_matrix.view()).unwrap());
            },
        );
    }
    group.finish();
}

fn bench_align(c: &mut Criterion) {
    let mut group = c.benchmark_group("ClinicalTable_align_to");

    for &n_records in [1_000usize, 10_000].iter() {
        let sample_ids: Vec<String> = (0..n_records).map(|i| format!("TCGA-{:06}", i)).collect();
        let values = Array2::from_shape_fn((n_records, 2), |(i, j)| {
            if (i + j) % 7 == 0 {
                "nan".to_string()
            } else {
                format!("v{}", j)
            }
        });
        let table = ClinicalTable::new(
            sample_ids,
            vec!["gender".to_string(), "hpv_status".to_string()],
            values,
        )
        .unwrap();
        // Every other target is absent from the table.
        let targets: Vec<String> = (0..n_records)
            .rev()
            .map(|i| format!("TCGA-{:06}", i * 2))
            .collect();

        group.throughput(Throughput::Elements(n_records as u64));
        group.bench_with_input(BenchmarkId::new("align_to", n_records), &targets, |b, keys| {
            b.iter(|| table.align_to(keys));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decompose, bench_align);
criterion_main!(benches);
