//! Property-based tests for circuit bookkeeping.
//!
//! Random gate sequences over random widths check that bit lookups stay
//! consistent, that an empty copy plus re-appending reproduces the circuit,
//! and that compose either fits or leaves the destination alone.

use qcir_core::{Circuit, ClbitId, ComposeOptions, QubitId, VarsMode};
use proptest::prelude::*;

/// Operations that can be applied to a circuit.
#[derive(Debug, Clone)]
enum Op {
    H(u32),
    X(u32),
    Rz(u32, f64),
    CX(u32, u32),
    Measure(u32, u32),
    Barrier,
}

impl Op {
    fn apply(self, circuit: &mut Circuit) {
        let _ = match self {
            Op::H(q) => circuit.h(QubitId(q)),
            Op::X(q) => circuit.x(QubitId(q)),
            Op::Rz(q, angle) => circuit.rz(angle, QubitId(q)),
            Op::CX(c, t) => circuit.cx(QubitId(c), QubitId(t)),
            Op::Measure(q, c) => circuit.measure(QubitId(q), ClbitId(c)),
            Op::Barrier => circuit.barrier_all(),
        };
    }
}

fn arb_op(num_qubits: u32, num_clbits: u32) -> impl Strategy<Value = Op> {
    let q = 0..num_qubits;
    let mut ops = vec![
        q.clone().prop_map(Op::H).boxed(),
        q.clone().prop_map(Op::X).boxed(),
        (q.clone(), -3.0f64..3.0)
            .prop_map(|(q, a)| Op::Rz(q, a))
            .boxed(),
        Just(Op::Barrier).boxed(),
    ];
    if num_qubits >= 2 {
        ops.push(
            (q.clone(), q.clone())
                .prop_filter("distinct qubits", |(c, t)| c != t)
                .prop_map(|(c, t)| Op::CX(c, t))
                .boxed(),
        );
    }
    if num_clbits > 0 {
        ops.push(
            (q, 0..num_clbits)
                .prop_map(|(q, c)| Op::Measure(q, c))
                .boxed(),
        );
    }
    proptest::strategy::Union::new(ops)
}

fn arb_circuit() -> impl Strategy<Value = Circuit> {
    (1_u32..=5, 0_u32..=3).prop_flat_map(|(nq, nc)| {
        prop::collection::vec(arb_op(nq, nc), 0..=20).prop_map(move |ops| {
            let mut circuit = Circuit::with_size("random", nq, nc);
            for op in ops {
                op.apply(&mut circuit);
            }
            circuit
        })
    })
}

proptest! {
    #[test]
    fn test_find_qubit_matches_position(circuit in arb_circuit()) {
        for (i, qubit) in circuit.qubits().iter().enumerate() {
            let location = circuit.find_qubit(qubit).unwrap();
            prop_assert_eq!(location.index() as usize, i);
            prop_assert_eq!(location.registers().len(), 1);
        }
        for (i, clbit) in circuit.clbits().iter().enumerate() {
            prop_assert_eq!(circuit.find_clbit(clbit).unwrap().index() as usize, i);
        }
    }

    #[test]
    fn test_find_qubit_stable_under_appends(circuit in arb_circuit(), extra in 1_u32..4) {
        let mut grown = circuit.clone();
        let before: Vec<u32> = circuit
            .qubits()
            .iter()
            .map(|q| circuit.find_qubit(q).unwrap().index())
            .collect();
        grown.add_qubits(extra).unwrap();
        grown.h(QubitId(0)).unwrap();
        for (qubit, index) in circuit.qubits().iter().zip(before) {
            prop_assert_eq!(grown.find_qubit(qubit).unwrap().index(), index);
        }
        prop_assert_eq!(grown.num_qubits(), circuit.num_qubits() + extra as usize);
    }

    #[test]
    fn test_copy_empty_like_round_trip(circuit in arb_circuit()) {
        let mut copy = circuit.copy_empty_like(None, VarsMode::Alike);
        prop_assert_eq!(copy.size(), 0);
        prop_assert_eq!(copy.num_qubits(), circuit.num_qubits());
        for inst in circuit.data() {
            copy.append_instruction(inst.clone()).unwrap();
        }
        prop_assert_eq!(&copy, &circuit);
        prop_assert_eq!(copy.depth(), circuit.depth());
    }

    #[test]
    fn test_compose_width_invariant(dest in arb_circuit(), source in arb_circuit()) {
        let mut out = dest.clone();
        let fits = source.num_qubits() <= dest.num_qubits()
            && (source.num_clbits() <= dest.num_clbits() || dest.num_clbits() == 0);
        match out.compose(&source, ComposeOptions::new()) {
            Ok(_) => {
                prop_assert!(fits);
                prop_assert_eq!(out.data().len(), dest.data().len() + source.data().len());
                prop_assert_eq!(out.num_qubits(), dest.num_qubits());
                prop_assert_eq!(&out.data()[..dest.data().len()], dest.data());
            }
            Err(_) => {
                prop_assert!(!fits);
                prop_assert_eq!(&out, &dest);
            }
        }
    }
}
