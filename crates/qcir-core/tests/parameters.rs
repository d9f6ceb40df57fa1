//! Integration tests for parameter tracking and binding.

use std::f64::consts::PI;

use qcir_core::{
    Circuit, CircuitError, ClbitId, Parameter, ParameterExpression, ParameterVector, QubitId,
};
use rustc_hash::FxHashMap;

fn value_of(circuit: &Circuit, index: usize) -> Option<f64> {
    circuit.data()[index].operation.params()[0].as_f64()
}

#[test]
fn test_canonical_order() {
    let x = ParameterVector::new("x", 12);
    let alpha = Parameter::new("alpha");
    let zeta = Parameter::new("zeta");
    let mut circuit = Circuit::with_size("order", 1, 0);
    circuit.rz(&zeta, QubitId(0)).unwrap();
    circuit.rx(&x[10], QubitId(0)).unwrap();
    circuit.rx(&x[2], QubitId(0)).unwrap();
    circuit.ry(&alpha, QubitId(0)).unwrap();

    let names: Vec<&str> = circuit.parameters().iter().map(Parameter::name).collect();
    assert_eq!(names, vec!["alpha", "x[2]", "x[10]", "zeta"]);
}

#[test]
fn test_bind_from_values() {
    let a = Parameter::new("a");
    let b = Parameter::new("b");
    let mut circuit = Circuit::with_size("bind", 2, 0);
    circuit
        .rx(&b, QubitId(0))
        .unwrap()
        .ry(&a, QubitId(1))
        .unwrap()
        .cx(QubitId(0), QubitId(1))
        .unwrap();

    let err = circuit
        .assign_parameters_from_values([0.5])
        .unwrap_err();
    assert!(matches!(
        err,
        CircuitError::ParameterCountMismatch {
            expected: 2,
            got: 1
        }
    ));
    assert_eq!(circuit.num_parameters(), 2);

    circuit.assign_parameters_from_values([0.5, 1.5]).unwrap();
    assert_eq!(circuit.num_parameters(), 0);
    assert_eq!(value_of(&circuit, 0), Some(1.5));
    assert_eq!(value_of(&circuit, 1), Some(0.5));
}

#[test]
fn test_partial_binding_keeps_expressions() {
    let a = Parameter::new("a");
    let b = Parameter::new("b");
    let mut circuit = Circuit::with_size("partial", 1, 0);
    let sum = ParameterExpression::symbol(&a) + ParameterExpression::symbol(&b);
    circuit.rz(sum, QubitId(0)).unwrap();

    circuit.assign_parameters_by_name([("a", 1.0)]).unwrap();
    assert_eq!(circuit.parameters(), &[b.clone()]);
    assert_eq!(value_of(&circuit, 0), None);

    circuit.assign_parameters_by_name([("b", 2.0)]).unwrap();
    assert_eq!(value_of(&circuit, 0), Some(3.0));
}

#[test]
fn test_rebinding_to_new_parameter() {
    let a = Parameter::new("a");
    let renamed = Parameter::new("renamed");
    let mut circuit = Circuit::with_size("rebind", 1, 0);
    circuit.p(&a, QubitId(0)).unwrap();

    let mut map = FxHashMap::default();
    map.insert(a, ParameterExpression::symbol(&renamed));
    circuit.assign_parameters(&map, true).unwrap();
    assert_eq!(circuit.parameters(), &[renamed]);
}

#[test]
fn test_strict_and_lenient_binding() {
    let a = Parameter::new("a");
    let stranger = Parameter::new("stranger");
    let mut circuit = Circuit::with_size("strict", 1, 0);
    circuit.rx(&a, QubitId(0)).unwrap();

    let mut map = FxHashMap::default();
    map.insert(stranger, ParameterExpression::constant(1.0));
    assert!(matches!(
        circuit.assign_parameters(&map, true),
        Err(CircuitError::ParameterNotFound { .. })
    ));
    circuit.assign_parameters(&map, false).unwrap();
    assert_eq!(circuit.num_parameters(), 1);

    assert!(matches!(
        circuit.assign_parameters_by_name([("missing", 0.0)]),
        Err(CircuitError::ParameterNotFound { .. })
    ));
}

#[test]
fn test_same_name_different_parameter() {
    let mut circuit = Circuit::with_size("clash", 1, 0);
    circuit.rx(&Parameter::new("theta"), QubitId(0)).unwrap();
    let err = circuit
        .ry(&Parameter::new("theta"), QubitId(0))
        .unwrap_err();
    assert!(matches!(err, CircuitError::ParameterNameConflict { .. }));
    assert_eq!(circuit.size(), 1);
}

#[test]
fn test_binding_reaches_bodies_and_phase() {
    let theta = Parameter::new("theta");
    let mut circuit = Circuit::with_size("nested", 1, 1);
    circuit
        .set_global_phase(ParameterExpression::symbol(&theta))
        .unwrap();
    circuit.measure(QubitId(0), ClbitId(0)).unwrap();
    let flag = circuit.clbits()[0].clone();
    circuit
        .if_test((&flag, true), |body| {
            body.rx(&theta, QubitId(0))?;
            Ok(())
        })
        .unwrap();
    assert_eq!(circuit.parameters(), &[theta.clone()]);

    circuit.assign_parameters_by_name([("theta", PI / 2.0)]).unwrap();
    assert_eq!(circuit.num_parameters(), 0);
    let phase = circuit.global_phase().as_f64().unwrap();
    assert!((phase - PI / 2.0).abs() < 1e-12);
    let body = circuit.data()[1].operation.blocks()[0];
    assert_eq!(body.num_parameters(), 0);
    assert_eq!(value_of(body, 0), Some(PI / 2.0));
}

#[test]
fn test_parameter_serde_keeps_identity() {
    let theta = Parameter::new("theta");
    let json = serde_json::to_string(&theta).unwrap();
    let back: Parameter = serde_json::from_str(&json).unwrap();
    assert_eq!(back, theta);
    assert_eq!(back.uuid(), theta.uuid());

    // A deserialized parameter binds the original's uses.
    let mut circuit = Circuit::with_size("serde", 1, 0);
    circuit.rx(&theta, QubitId(0)).unwrap();
    let mut map = FxHashMap::default();
    map.insert(back, ParameterExpression::constant(0.1));
    circuit.assign_parameters(&map, true).unwrap();
    assert_eq!(circuit.num_parameters(), 0);
}
