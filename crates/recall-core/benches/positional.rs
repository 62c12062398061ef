//! Benchmarks for positional statistics and recall matrix construction
//!
//! Tests recalls matrix building, intrusion classification, serial position
//! curves and stopping probability over growing trial counts.

#![allow(clippy::expect_used)] // Fine in benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ndarray::Array2;
use rand::Rng;
use recall_core::{
	create_intrusions, make_recalls_matrix, prob_stopping, serial_position_curve,
};

const LIST_LENGTH: usize = 16;

/// Presented items drawn without repeats inside a trial; recalls mostly from the
/// current list with some prior-list and extra-list items.
fn generate_item_numbers(trials: usize) -> (Array2<i64>, Array2<i64>) {
	let mut rng = rand::thread_rng();
	let ll = i64::try_from(LIST_LENGTH).expect("list length fits i64");
	let pres = Array2::from_shape_fn((trials, LIST_LENGTH), |(t, j)| {
		i64::try_from(t * LIST_LENGTH + j + 1).expect("item fits i64")
	});
	let rec = Array2::from_shape_fn((trials, LIST_LENGTH), |(t, _)| {
		let base = i64::try_from(t).expect("trial fits i64") * ll;
		match rng.gen_range(0..10) {
			0 => 0,
			1 => -1,
			2 => (base - rng.gen_range(1..=ll)).max(1),
			_ => base + rng.gen_range(1..=ll),
		}
	});
	(pres, rec)
}

fn bench_recalls_matrix(c: &mut Criterion) {
	let mut group = c.benchmark_group("make_recalls_matrix");

	for trials in &[100, 1000, 10_000] {
		let (pres, rec) = generate_item_numbers(*trials);

		let _ = group.throughput(Throughput::Elements(*trials as u64));
		let _ = group.bench_with_input(BenchmarkId::new("trials", trials), trials, |bench, _| {
			bench.iter(|| make_recalls_matrix(black_box(pres.view()), black_box(rec.view())));
		});
	}

	group.finish();
}

fn bench_intrusions(c: &mut Criterion) {
	let mut group = c.benchmark_group("create_intrusions");

	for trials in &[100, 1000, 10_000] {
		let (pres, rec) = generate_item_numbers(*trials);
		let subjects: Vec<usize> = (0..*trials).map(|t| t / 50).collect();
		let sessions = vec![1; *trials];

		let _ = group.throughput(Throughput::Elements(*trials as u64));
		let _ = group.bench_with_input(BenchmarkId::new("trials", trials), trials, |bench, _| {
			bench.iter(|| {
				create_intrusions(
					black_box(rec.view()),
					black_box(pres.view()),
					black_box(&subjects),
					black_box(Some(sessions.as_slice())),
				)
			});
		});
	}

	group.finish();
}

fn bench_positional(c: &mut Criterion) {
	let mut group = c.benchmark_group("positional");
	let trials = 5000;
	let (pres, rec) = generate_item_numbers(trials);
	let recalls = make_recalls_matrix(pres.view(), rec.view()).expect("valid trials");
	let subjects: Vec<usize> = (0..trials).map(|t| t % 40).collect();

	let _ = group.throughput(Throughput::Elements(trials as u64));
	let _ = group.bench_function("serial_position_curve", |bench| {
		bench.iter(|| {
			serial_position_curve(black_box(recalls.view()), black_box(&subjects), LIST_LENGTH, None)
		});
	});
	let _ = group.bench_function("prob_stopping", |bench| {
		bench.iter(|| prob_stopping(black_box(recalls.view()), black_box(&subjects), None, None));
	});

	group.finish();
}

criterion_group!(benches, bench_recalls_matrix, bench_intrusions, bench_positional);
criterion_main!(benches);
