use criterion::{black_box, criterion_group, criterion_main, Criterion};

use examscore_core::engine::{score, score_all};
use examscore_core::model::{AnswerGrid, Cell, Column, QuestionType, TypeAssignments};
use examscore_core::statistics::std_dev;

fn make_column(id: &str, key: Cell, respondents: usize, answer: impl Fn(usize) -> Cell) -> Column {
    Column::new(id, key, (0..respondents).map(answer).collect())
}

fn bench_score_column(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_column");

    let mc = make_column("Q1", Cell::Text("A".into()), 1000, |i| {
        Cell::Text(["A", "B", "C", "D"][i % 4].into())
    });
    let short = make_column("Q2", Cell::Text("Paris".into()), 1000, |i| {
        Cell::Text([" Paris ", "paris", "London"][i % 3].into())
    });
    let essay = make_column("E1", Cell::Int(10), 1000, |i| {
        if i % 10 == 0 {
            Cell::Text("absen".into())
        } else {
            Cell::Int((i % 11) as i64)
        }
    });

    group.bench_function("multiple_choice", |b| {
        b.iter(|| score(black_box(&mc), &QuestionType::MultipleChoice))
    });

    group.bench_function("short_answer", |b| {
        b.iter(|| score(black_box(&short), &QuestionType::ShortAnswer))
    });

    group.bench_function("essay", |b| {
        b.iter(|| score(black_box(&essay), &QuestionType::Essay))
    });

    group.finish();
}

fn bench_score_all(c: &mut Criterion) {
    let columns: Vec<Column> = (0..60)
        .map(|q| {
            make_column(&format!("Q{q}"), Cell::Text("A".into()), 500, |i| {
                Cell::Text(["A", "B"][(i + q) % 2].into())
            })
        })
        .collect();
    let grid = AnswerGrid::new("bench.csv", columns).expect("non-empty grid");
    let assignments = TypeAssignments::new(QuestionType::MultipleChoice);

    c.bench_function("score_all/60q_x_500", |b| {
        b.iter(|| score_all(black_box(&grid), black_box(&assignments)))
    });
}

fn bench_std_dev(c: &mut Criterion) {
    let values: Vec<f64> = (0..10_000).map(|i| (i % 11) as f64).collect();
    c.bench_function("std_dev/10k", |b| b.iter(|| std_dev(black_box(&values))));
}

criterion_group!(benches, bench_score_column, bench_score_all, bench_std_dev);
criterion_main!(benches);
