use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use racket_draw::bracket::generator::generate;
use racket_draw::groups::group_matches;
use racket_draw::matches::validate;
use racket_draw::standings::{group_standings, knockout_standings};
use racket_draw::{KnockoutPoints, Match, MatchFormat, MatchStatus, SeedingMethod, SetScore, Side};
use rand::SeedableRng;
use rand::rngs::StdRng;
use uuid::Uuid;

fn teams(n: usize) -> Vec<Uuid> {
    (0..n).map(|_| Uuid::new_v4()).collect()
}

/// Complete every match, side one always winning
fn finish_all(matches: &mut [Match]) {
    for m in matches.iter_mut() {
        if m.is_finished() || !m.is_ready() {
            continue;
        }
        m.sets = vec![SetScore::new(6, 3), SetScore::new(6, 4)];
        m.winner = Some(Side::One);
        m.status = MatchStatus::Completed;
    }
}

/// Benchmark knockout generation for growing team counts
fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_knockout");
    for n in [8usize, 64, 512] {
        let ids = teams(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &ids, |b, ids| {
            let mut rng = StdRng::seed_from_u64(1);
            b.iter(|| generate(Uuid::new_v4(), ids, SeedingMethod::Random, &mut rng));
        });
    }
    group.finish();
}

/// Benchmark set-score validation
fn bench_validate(c: &mut Criterion) {
    let sets = vec![
        SetScore::new(6, 4),
        SetScore::new(5, 7),
        SetScore::new(7, 6),
    ];
    c.bench_function("validate_three_sets", |b| {
        b.iter(|| validate(&sets, MatchFormat::BestOfThree));
    });
}

/// Benchmark standings over a played group and a played first round
fn bench_standings(c: &mut Criterion) {
    let bracket_id = Uuid::new_v4();

    let mut round_robin = group_matches(bracket_id, 1, &teams(16));
    finish_all(&mut round_robin);
    c.bench_function("group_standings_16", |b| {
        b.iter(|| group_standings(bracket_id, &round_robin, 3));
    });

    let mut rng = StdRng::seed_from_u64(2);
    let mut knockout = generate(bracket_id, &teams(64), SeedingMethod::Manual, &mut rng)
        .unwrap()
        .matches;
    finish_all(&mut knockout);
    let points = KnockoutPoints::default();
    c.bench_function("knockout_standings_64", |b| {
        b.iter(|| knockout_standings(bracket_id, &knockout, &points));
    });
}

criterion_group!(benches, bench_generate, bench_validate, bench_standings);
criterion_main!(benches);
