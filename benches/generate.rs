use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ndarray_rand::rand::{SeedableRng, rngs::StdRng};
use tracegen::{
    config::GeneratorConfig, generator::Generator, leakage_model::LeakPolicy,
    processors::MeanVar,
};

fn generate_sequential(generator: &Generator) -> MeanVar {
    // Seed rng to get the same output each run
    let mut rng = StdRng::seed_from_u64(0);
    let mut mean_var = MeanVar::new(generator.config().num_samples);
    generator.generate(&mut rng, &mut mean_var, |_| {}).unwrap();
    mean_var
}

fn generate_parallel(generator: &Generator) -> MeanVar {
    let mut mean_var = MeanVar::new(generator.config().num_samples);
    generator.generate_par(0, &mut mean_var, |_| {}).unwrap();
    mean_var
}

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");

    group.measurement_time(std::time::Duration::from_secs(30));

    for num_traces in [1000, 5000].into_iter() {
        let generator = Generator::new(GeneratorConfig {
            num_traces,
            num_samples: 5000,
            leak_policy: LeakPolicy::Simulate,
            ..Default::default()
        })
        .unwrap();

        group.bench_with_input(
            BenchmarkId::new("sequential", num_traces),
            &generator,
            |b, generator| b.iter(|| generate_sequential(generator)),
        );

        group.bench_with_input(
            BenchmarkId::new("parallel", num_traces),
            &generator,
            |b, generator| b.iter(|| generate_parallel(generator)),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_generate);
criterion_main!(benches);
