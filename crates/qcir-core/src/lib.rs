//! Quantum circuit intermediate representation
//!
//! This crate provides the in-memory model of a quantum circuit: bits and
//! registers, a flat instruction list, symbolic parameters, real-time classical
//! variables and structured control flow.
//!
//! # Overview
//!
//! A [`Circuit`] owns a [`CircuitData`]: the ordered qubits and clbits, the
//! registers over them, the instruction sequence, the parameter table and the
//! circuit's real-time identifiers. Instructions refer to bits by position
//! ([`QubitId`], [`ClbitId`]); bits themselves are shareable handles
//! ([`Qubit`], [`Clbit`]) so the same bit can appear in several circuits.
//!
//! # Core Components
//!
//! - **Bits and registers**: [`Qubit`], [`Clbit`], [`QuantumRegister`],
//!   [`ClassicalRegister`]
//! - **Operations**: [`StandardGate`], [`CustomOp`], [`Store`], [`ControlFlowOp`]
//! - **Parameters**: [`Parameter`], [`ParameterVector`], [`ParameterExpression`]
//! - **Classical values**: [`Var`], [`Stretch`], [`Expr`]
//! - **Control-flow builders**: [`Circuit::if_test`], [`Circuit::for_loop`],
//!   [`Circuit::switch`] and friends, which size each block to what its body
//!   touches
//! - **Composition**: [`Circuit::compose`], [`Circuit::tensor`]
//!
//! # Example: Building a Bell State
//!
//! ```rust
//! use qcir_core::{Circuit, QubitId};
//!
//! // Create a new circuit with 2 qubits and 2 classical bits
//! let mut circuit = Circuit::with_size("bell_state", 2, 2);
//!
//! circuit.h(QubitId(0)).unwrap();
//! circuit.cx(QubitId(0), QubitId(1)).unwrap();
//! circuit.measure_all().unwrap();
//!
//! assert_eq!(circuit.num_qubits(), 2);
//! assert_eq!(circuit.depth(), 3);
//! ```
//!
//! # Example: Control Flow
//!
//! ```rust
//! use qcir_core::{Circuit, ClbitId, QubitId};
//!
//! let mut circuit = Circuit::with_size("feedback", 2, 1);
//! circuit.h(QubitId(0)).unwrap();
//! circuit.measure(QubitId(0), ClbitId(0)).unwrap();
//!
//! let flag = circuit.clbits()[0].clone();
//! circuit
//!     .if_test((flag, true), |body| {
//!         body.x(QubitId(1))?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! // The block only spans the qubit and clbit its body used.
//! let block = &circuit.data()[2];
//! assert_eq!(block.qubits.as_slice(), &[QubitId(1)]);
//! assert_eq!(block.clbits.as_slice(), &[ClbitId(0)]);
//! ```
//!
//! # Example: Parameterized Circuit
//!
//! ```rust
//! use qcir_core::{Circuit, Parameter, QubitId};
//! use std::f64::consts::PI;
//!
//! let theta = Parameter::new("theta");
//! let mut circuit = Circuit::with_size("variational", 1, 0);
//! circuit.rx(&theta, QubitId(0)).unwrap();
//!
//! assert_eq!(circuit.num_parameters(), 1);
//!
//! circuit.assign_parameters_from_values([PI / 4.0]).unwrap();
//! assert_eq!(circuit.num_parameters(), 0);
//! ```

pub mod bit;
pub mod bit_data;
mod builder;
pub mod circuit;
pub mod circuit_data;
pub mod classical;
mod compose;
pub mod control_flow;
pub mod error;
pub mod identifiers;
pub mod instruction;
pub mod operation;
pub mod parameter;
pub mod parameter_table;
pub mod register;
mod scope;

pub use bit::{Clbit, ClbitId, Qubit, QubitId};
pub use bit_data::{BitData, BitLocation};
pub use builder::SwitchCases;
pub use circuit::{Circuit, ClbitSpec, QubitSpec};
pub use circuit_data::CircuitData;
pub use classical::{BinaryOp, Expr, Identifier, Stretch, Type, UnaryOp, Value, Var};
pub use compose::{ComposeOptions, RemapTarget, VarRemap};
pub use control_flow::{CaseLabel, Condition, ControlFlowOp, LoopIndices, SwitchTarget};
pub use error::{CircuitError, CircuitResult};
pub use identifiers::{IdentifierKind, Identifiers, VarsMode};
pub use instruction::{CircuitInstruction, Instruction};
pub use operation::{CustomOp, Duration, Operation, StandardGate, Store};
pub use parameter::{Parameter, ParameterExpression, ParameterVector};
pub use parameter_table::{ParameterTable, ParameterUse};
pub use register::{ClassicalRegister, NameSequence, QuantumRegister, Register};
pub use scope::CircuitScopeInterface;
