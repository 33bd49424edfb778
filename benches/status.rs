use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use correlativas::config::Config;
use correlativas::layout::compute_plan_layout;
use correlativas::overlay::OverlayCoordinator;
use correlativas::plan::{Correlative, CorrelativeKind, Plan, Status, YEAR_COUNT};
use correlativas::status::evaluate;
use std::hint::black_box;

/// Plan with `per_year` subjects in each year; every subject requires up to
/// `fan_in` subjects of the previous year.
fn dense_plan(per_year: usize, fan_in: usize) -> Plan {
    let mut plan = Plan::new();
    let mut previous: Vec<String> = Vec::new();
    for year in 1..=YEAR_COUNT as u8 {
        let mut current = Vec::new();
        for i in 0..per_year {
            let correlatives = previous
                .iter()
                .skip(i % previous.len().max(1))
                .take(fan_in)
                .enumerate()
                .map(|(n, id)| {
                    let kind = if n % 2 == 0 {
                        CorrelativeKind::Regularize
                    } else {
                        CorrelativeKind::Approve
                    };
                    Correlative::new(id.clone(), kind)
                })
                .collect();
            let subject = plan
                .add_subject(year, &format!("Materia {year}.{i}"), correlatives)
                .expect("add failed");
            current.push(subject.id);
        }
        previous = current;
    }
    let ids: Vec<String> = plan.subjects().map(|s| s.id.clone()).collect();
    for (idx, id) in ids.iter().enumerate() {
        let status = match idx % 4 {
            0 => Status::Aprobada,
            1 => Status::Regular,
            2 => Status::Cursando,
            _ => continue,
        };
        plan.set_manual_status(id, status).expect("status failed");
    }
    plan
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    for (name, per_year, fan_in) in [("small", 6, 2), ("medium", 20, 4), ("large", 80, 8)] {
        let plan = dense_plan(per_year, fan_in);
        group.bench_with_input(BenchmarkId::from_parameter(name), &plan, |b, plan| {
            b.iter(|| black_box(evaluate(black_box(plan))));
        });
    }
    group.finish();
}

fn bench_overlay(c: &mut Criterion) {
    let mut group = c.benchmark_group("overlay_frame");
    let config = Config::default();
    for (name, per_year, fan_in) in [("medium", 20, 4), ("large", 80, 8)] {
        let plan = dense_plan(per_year, fan_in);
        let statuses = evaluate(&plan).statuses;
        let layout = compute_plan_layout(&plan, &statuses, &config.theme, &config.layout);
        let selected = plan
            .subjects()
            .last()
            .map(|s| s.id.clone())
            .expect("plan is empty");
        group.bench_with_input(BenchmarkId::from_parameter(name), &plan, |b, plan| {
            b.iter(|| {
                let mut overlay = OverlayCoordinator::new(config.overlay);
                if let Some(ticket) = overlay.select(plan, Some(&selected)) {
                    overlay.run_frame(ticket, plan, &layout);
                }
                black_box(overlay.edges().len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_evaluate, bench_overlay
);
criterion_main!(benches);
