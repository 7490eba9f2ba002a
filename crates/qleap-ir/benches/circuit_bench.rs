//! Benchmarks for qleap circuit operations
//!
//! Run with: cargo bench -p qleap-ir

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use qleap_ir::{Circuit, ClbitId, QubitId};
use std::f64::consts::PI;

/// Benchmark circuit creation
fn bench_circuit_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("circuit_creation");

    for num_qubits in &[2, 5, 10, 20, 50] {
        group.bench_with_input(
            BenchmarkId::new("with_size", num_qubits),
            num_qubits,
            |b, &n| {
                b.iter(|| Circuit::with_size(black_box("bench"), black_box(n), black_box(n)));
            },
        );
    }

    group.finish();
}

/// Benchmark adding gates to a circuit
fn bench_gate_addition(c: &mut Criterion) {
    let mut group = c.benchmark_group("gate_addition");

    group.bench_function("sqrt_x_gate", |b| {
        let mut circuit = Circuit::with_size("bench", 10, 0);
        b.iter(|| {
            circuit.sqrt_x(black_box(QubitId(0))).unwrap();
        });
    });

    group.bench_function("rz_gate", |b| {
        let mut circuit = Circuit::with_size("bench", 10, 0);
        b.iter(|| {
            circuit
                .rz(black_box(PI / 4.0), black_box(QubitId(0)))
                .unwrap();
        });
    });

    group.bench_function("cnot_gate", |b| {
        let mut circuit = Circuit::with_size("bench", 10, 0);
        b.iter(|| {
            circuit
                .cnot(black_box(QubitId(0)), black_box(QubitId(1)))
                .unwrap();
        });
    });

    group.bench_function("swap_gate", |b| {
        let mut circuit = Circuit::with_size("bench", 10, 0);
        b.iter(|| {
            circuit
                .swap(black_box(QubitId(0)), black_box(QubitId(1)))
                .unwrap();
        });
    });

    group.finish();
}

/// Benchmark GHZ state circuit creation
fn bench_ghz_circuit(c: &mut Criterion) {
    let mut group = c.benchmark_group("ghz_circuit");

    for num_qubits in &[3, 5, 10, 20, 50, 100] {
        group.bench_with_input(
            BenchmarkId::new("create", num_qubits),
            num_qubits,
            |b, &n| {
                b.iter(|| black_box(Circuit::ghz(n).unwrap()));
            },
        );
    }

    group.finish();
}

/// Benchmark circuit depth calculation
fn bench_circuit_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("circuit_depth");

    for num_qubits in &[5, 10, 20, 50] {
        // Create a circuit with some depth
        let mut circuit = Circuit::with_size("bench", *num_qubits, 0);

        // Add multiple layers
        for _layer in 0..5 {
            for i in 0..*num_qubits {
                circuit.sqrt_x(QubitId(i)).unwrap();
            }
            for i in (0..*num_qubits - 1).step_by(2) {
                circuit.cnot(QubitId(i), QubitId(i + 1)).unwrap();
            }
        }

        group.bench_with_input(
            BenchmarkId::new("depth", num_qubits),
            &circuit,
            |b, circuit| {
                b.iter(|| black_box(circuit.depth()));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_circuit_creation,
    bench_gate_addition,
    bench_ghz_circuit,
    bench_circuit_depth,
);

criterion_main!(benches);
