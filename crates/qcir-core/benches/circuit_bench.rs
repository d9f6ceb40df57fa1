//! Benchmarks for circuit construction, metrics and composition
//!
//! Run with: cargo bench -p qcir-core

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use qcir_core::{Circuit, ClbitId, ComposeOptions, Parameter, ParameterVector, QubitId};
use std::f64::consts::PI;

fn ghz(n: u32) -> Circuit {
    let mut circuit = Circuit::with_size("ghz", n, n);
    circuit.h(QubitId(0)).unwrap();
    for i in 0..n - 1 {
        circuit.cx(QubitId(i), QubitId(i + 1)).unwrap();
    }
    for i in 0..n {
        circuit.measure(QubitId(i), ClbitId(i)).unwrap();
    }
    circuit
}

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

    group.bench_function("h_gate", |b| {
        let mut circuit = Circuit::with_size("bench", 10, 0);
        b.iter(|| {
            circuit.h(black_box(QubitId(0))).unwrap();
        });
    });

    group.bench_function("rx_gate", |b| {
        let mut circuit = Circuit::with_size("bench", 10, 0);
        b.iter(|| {
            circuit
                .rx(black_box(PI / 4.0), black_box(QubitId(0)))
                .unwrap();
        });
    });

    group.bench_function("cx_gate", |b| {
        let mut circuit = Circuit::with_size("bench", 10, 0);
        b.iter(|| {
            circuit
                .cx(black_box(QubitId(0)), black_box(QubitId(1)))
                .unwrap();
        });
    });

    // Broadcast over a whole register
    group.bench_function("h_register", |b| {
        let mut circuit = Circuit::with_size("bench", 10, 0);
        let q = circuit.qregs().next().unwrap().clone();
        b.iter(|| {
            circuit.h(black_box(&q)).unwrap();
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
                b.iter(|| black_box(ghz(n)));
            },
        );
    }

    group.finish();
}

/// Benchmark circuit depth calculation
fn bench_circuit_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("circuit_depth");

    for num_qubits in &[5u32, 10, 20, 50] {
        let mut circuit = Circuit::with_size("bench", *num_qubits, 0);

        for _layer in 0..5 {
            for i in 0..*num_qubits {
                circuit.h(QubitId(i)).unwrap();
            }
            for i in (0..*num_qubits - 1).step_by(2) {
                circuit.cx(QubitId(i), QubitId(i + 1)).unwrap();
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

/// Benchmark building nested control flow through the scoped builders
fn bench_control_flow(c: &mut Criterion) {
    let mut group = c.benchmark_group("control_flow");

    for num_qubits in &[4u32, 16, 64] {
        group.bench_with_input(
            BenchmarkId::new("if_in_for", num_qubits),
            num_qubits,
            |b, &n| {
                b.iter(|| {
                    let mut circuit = Circuit::with_size("bench", n, 1);
                    let flag = circuit.clbits()[0].clone();
                    circuit
                        .for_loop(0i64..4, None, |body| {
                            body.measure(QubitId(0), ClbitId(0))?;
                            body.if_test((&flag, true), |inner| {
                                for i in 1..n {
                                    inner.x(QubitId(i))?;
                                }
                                Ok(())
                            })?;
                            Ok(())
                        })
                        .unwrap();
                    black_box(circuit)
                });
            },
        );
    }

    group.finish();
}

/// Benchmark composing and tensoring
fn bench_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose");

    for num_qubits in &[5u32, 20, 50] {
        let source = ghz(*num_qubits);
        group.bench_with_input(
            BenchmarkId::new("compose", num_qubits),
            &source,
            |b, source| {
                b.iter(|| {
                    let mut dest = Circuit::with_size("dest", source.num_qubits() as u32, 0);
                    dest.compose(black_box(source), ComposeOptions::new())
                        .unwrap();
                    black_box(dest)
                });
            },
        );
        group.bench_with_input(
            BenchmarkId::new("tensor", num_qubits),
            &source,
            |b, source| {
                b.iter(|| black_box(source.tensor(source).unwrap()));
            },
        );
    }

    group.finish();
}

/// Benchmark binding a parameter vector
fn bench_parameter_assignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("parameter_assignment");

    for num_params in &[8u32, 64, 256] {
        let theta = ParameterVector::new("theta", *num_params);
        let mut circuit = Circuit::with_size("ansatz", 4, 0);
        for (i, p) in theta.params().iter().enumerate() {
            circuit.ry(p, QubitId((i % 4) as u32)).unwrap();
        }
        let values: Vec<f64> = (0..*num_params).map(|i| f64::from(i) * 0.01).collect();

        group.bench_with_input(
            BenchmarkId::new("from_values", num_params),
            &circuit,
            |b, circuit| {
                b.iter(|| {
                    let mut bound = circuit.clone();
                    bound
                        .assign_parameters_from_values(values.iter().copied())
                        .unwrap();
                    black_box(bound)
                });
            },
        );
    }

    group.bench_function("by_name", |b| {
        let alpha = Parameter::new("alpha");
        let mut circuit = Circuit::with_size("bench", 2, 0);
        circuit.rz(&alpha, QubitId(0)).unwrap();
        b.iter(|| {
            let mut bound = circuit.clone();
            bound.assign_parameters_by_name([("alpha", 0.5)]).unwrap();
            black_box(bound)
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_circuit_creation,
    bench_gate_addition,
    bench_ghz_circuit,
    bench_circuit_depth,
    bench_control_flow,
    bench_compose,
    bench_parameter_assignment,
);

criterion_main!(benches);
