//! Integration tests for measurement safety across the compilation
//! pipeline.
//!
//! `ExtractMeasurements` pulls every `Measure` out of the circuit before any
//! synthesis or block-replacement pass runs (those passes reason about
//! unitaries, and a measurement has none), and `RestoreMeasurements`
//! re-attaches them at the tail once the pipeline is done. The properties
//! these tests check: no measurement is ever lost, its `(qubit, clbit)`
//! pairing survives, and nothing downstream of `ExtractMeasurements`
//! reorders or drops a `Barrier`/`Reset` either.

use qleap_compile::passes::{ExtractMeasurements, MeasurementBarrierVerification, RestoreMeasurements, VerificationResult};
use qleap_compile::{compile, CompileOptions, Pass, PassData};
use qleap_ir::{Circuit, CircuitDag, ClbitId, QubitId};

fn count_measurements(dag: &CircuitDag) -> usize {
    dag.topological_ops().filter(|(_, inst)| inst.is_measure()).count()
}

fn count_ops(dag: &CircuitDag, name: &str) -> usize {
    dag.topological_ops().filter(|(_, inst)| inst.name() == name).count()
}

#[test]
fn test_extract_then_restore_round_trips_every_measurement() {
    let mut circuit = Circuit::with_size("test", 2, 2);
    circuit.sqrt_x(QubitId(0)).unwrap();
    circuit.measure(QubitId(0), ClbitId(0)).unwrap();
    circuit.cnot(QubitId(0), QubitId(1)).unwrap();
    circuit.measure(QubitId(1), ClbitId(1)).unwrap();

    let mut dag = circuit.into_dag();
    let mut pass_data = PassData::new();

    ExtractMeasurements.run(&mut dag, &mut pass_data).unwrap();
    assert_eq!(count_measurements(&dag), 0, "measurements must be fully extracted");

    RestoreMeasurements.run(&mut dag, &mut pass_data).unwrap();
    assert_eq!(count_measurements(&dag), 2, "both measurements must come back");

    let pairs: Vec<_> = dag
        .topological_ops()
        .filter(|(_, inst)| inst.is_measure())
        .map(|(_, inst)| (inst.qubits[0], inst.clbits[0]))
        .collect();
    assert!(pairs.contains(&(QubitId(0), ClbitId(0))));
    assert!(pairs.contains(&(QubitId(1), ClbitId(1))));
}

#[test]
fn test_measurement_barrier_verification_passes_on_terminal_measurements() {
    let mut circuit = Circuit::with_size("test", 2, 2);
    circuit.sqrt_x(QubitId(0)).unwrap();
    circuit.cnot(QubitId(0), QubitId(1)).unwrap();
    circuit.measure(QubitId(0), ClbitId(0)).unwrap();
    circuit.measure(QubitId(1), ClbitId(1)).unwrap();

    let mut dag = circuit.into_dag();
    let mut pass_data = PassData::new();
    MeasurementBarrierVerification.run(&mut dag, &mut pass_data).unwrap();

    let result = pass_data.get::<VerificationResult>().unwrap();
    assert!(result.passed);
    assert_eq!(result.measurements_found, 2);
}

#[test]
fn test_compile_preserves_measurement_count_at_every_optimization_level() {
    for level in 1..=3u8 {
        let mut circuit = Circuit::with_size("test", 2, 2);
        circuit.sqrt_x(QubitId(0)).unwrap();
        circuit.cnot(QubitId(0), QubitId(1)).unwrap();
        circuit.measure(QubitId(0), ClbitId(0)).unwrap();
        circuit.measure(QubitId(1), ClbitId(1)).unwrap();

        let options = CompileOptions::new().with_optimization_level(level);
        let compiled = compile(circuit.into(), &options).unwrap();

        assert_eq!(
            count_measurements(compiled.dag()),
            2,
            "opt level {level} must preserve every measurement"
        );
    }
}

#[test]
fn test_compile_survives_measurement_before_further_gates() {
    // `ExtractMeasurements` treats measurements as terminal: a gate that
    // originally preceded its qubit's measurement in program order is not
    // guaranteed to stay before it post-compile, only every measurement's
    // (qubit, clbit) pairing is. The gate itself must still survive.
    let mut circuit = Circuit::with_size("test", 1, 1);
    circuit.sqrt_x(QubitId(0)).unwrap();
    circuit.measure(QubitId(0), ClbitId(0)).unwrap();
    circuit.reset(QubitId(0)).unwrap();
    circuit.sqrt_x(QubitId(0)).unwrap();

    let options = CompileOptions::new();
    let compiled = compile(circuit.into(), &options).unwrap();

    assert_eq!(count_measurements(compiled.dag()), 1);
    assert_eq!(count_ops(compiled.dag(), "reset"), 1);
}

#[test]
fn test_compile_preserves_barrier() {
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit.sqrt_x(QubitId(0)).unwrap();
    circuit.barrier([QubitId(0), QubitId(1)]).unwrap();
    circuit.cnot(QubitId(0), QubitId(1)).unwrap();

    let options = CompileOptions::new().with_optimization_level(2);
    let compiled = compile(circuit.into(), &options).unwrap();

    assert_eq!(count_ops(compiled.dag(), "barrier"), 1, "barrier must survive compilation");
}
