use criterion::*;
use rand::prelude::*;
use std::time::Duration;
use trimax::*;

fn bench_cfr(c: &mut Criterion) {
    let trainer = Trainer::new(Config {
        threads: 1,
        ..Config::default()
    });
    let mut rng = StdRng::seed_from_u64(0);
    let mut group = c.benchmark_group("cfr");
    group.warm_up_time(Duration::new(10, 0));
    group.bench_function("cfr_iteration", |b| {
        b.iter(|| trainer.cfr_iteration(&mut rng))
    });
    group.finish();
}

fn bench_postflop_bucket(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    c.bench_function("postflop_bucket", |b| {
        b.iter(|| {
            // Fresh cache so every call samples
            let bucketer = Bucketer::new();
            Deal::new(&mut rng).and_then(|deal| {
                bucketer.bucket(
                    &RsPokerEvaluator,
                    deal.hole(0),
                    deal.board_for(Street::River),
                    Street::River,
                    &mut rng,
                )
            })
        })
    });
}

criterion_group!(
    name=benches;
    config=Criterion::default().configure_from_args();
    targets=bench_cfr, bench_postflop_bucket
);
criterion_main!(benches);
