//! Circuit instructions combining operations with operands.

use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use std::fmt::Display;
use std::hash::Hash;

use crate::bit::{Clbit, ClbitId, Qubit, QubitId};
use crate::error::{CircuitError, CircuitResult};
use crate::operation::{Operation, StandardGate};

/// A complete instruction with operands, addressed by position in one circuit.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The operation.
    pub operation: Operation,
    /// Qubits this instruction operates on.
    pub qubits: SmallVec<[QubitId; 2]>,
    /// Classical bits this instruction operates on.
    pub clbits: SmallVec<[ClbitId; 2]>,
    /// Optional label.
    pub label: Option<String>,
}

impl Instruction {
    /// Create an instruction.
    pub fn new(
        operation: impl Into<Operation>,
        qubits: impl IntoIterator<Item = QubitId>,
        clbits: impl IntoIterator<Item = ClbitId>,
    ) -> Self {
        Self {
            operation: operation.into(),
            qubits: qubits.into_iter().collect(),
            clbits: clbits.into_iter().collect(),
            label: None,
        }
    }

    /// Create a gate instruction.
    pub fn gate(gate: StandardGate, qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self::new(gate, qubits, [])
    }

    /// Create a measurement instruction.
    pub fn measure(qubit: QubitId, clbit: ClbitId) -> Self {
        Self::new(Operation::Measure, [qubit], [clbit])
    }

    /// Create a barrier instruction.
    pub fn barrier(qubits: impl IntoIterator<Item = QubitId>) -> Self {
        let qubits: SmallVec<[QubitId; 2]> = qubits.into_iter().collect();
        let width = u32::try_from(qubits.len()).unwrap_or(u32::MAX);
        Self {
            operation: Operation::Barrier(width),
            qubits,
            clbits: SmallVec::new(),
            label: None,
        }
    }

    /// Add a label to the instruction.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Get the name of this instruction.
    pub fn name(&self) -> &str {
        self.operation.name()
    }

    /// Check if this is a directive (barrier).
    pub fn is_directive(&self) -> bool {
        self.operation.is_directive()
    }

    /// Check operand counts against the operation and that no operand repeats.
    pub fn check_shape(&self) -> CircuitResult<()> {
        let op = &self.operation;
        if self.qubits.len() != op.num_qubits() as usize {
            return Err(CircuitError::ArgumentCount {
                operation: op.name().to_string(),
                kind: "qubit",
                expected: op.num_qubits() as usize,
                got: self.qubits.len(),
            });
        }
        if self.clbits.len() != op.num_clbits() as usize {
            return Err(CircuitError::ArgumentCount {
                operation: op.name().to_string(),
                kind: "clbit",
                expected: op.num_clbits() as usize,
                got: self.clbits.len(),
            });
        }
        check_unique(&self.qubits, "qubit", op.name())?;
        check_unique(&self.clbits, "clbit", op.name())
    }

    /// The same instruction with operands passed through the given maps.
    pub fn remapped(
        &self,
        qubit_map: impl Fn(QubitId) -> QubitId,
        clbit_map: impl Fn(ClbitId) -> ClbitId,
    ) -> Self {
        Self {
            operation: self.operation.clone(),
            qubits: self.qubits.iter().map(|q| qubit_map(*q)).collect(),
            clbits: self.clbits.iter().map(|c| clbit_map(*c)).collect(),
            label: self.label.clone(),
        }
    }
}

fn check_unique<T: Copy + Eq + Hash + Display>(
    items: &[T],
    kind: &'static str,
    operation: &str,
) -> CircuitResult<()> {
    let repeated = if items.len() <= 8 {
        (1..items.len()).find_map(|i| items[..i].contains(&items[i]).then_some(items[i]))
    } else {
        let mut seen = FxHashSet::default();
        items.iter().copied().find(|item| !seen.insert(*item))
    };
    match repeated {
        Some(bit) => Err(CircuitError::DuplicateOperand {
            kind,
            bit: bit.to_string(),
            operation: operation.to_string(),
        }),
        None => Ok(()),
    }
}

/// An instruction whose operands are bit handles rather than positions.
///
/// This is the form used to move instructions between circuits.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitInstruction {
    /// The operation.
    pub operation: Operation,
    /// Qubit operands.
    pub qubits: Vec<Qubit>,
    /// Clbit operands.
    pub clbits: Vec<Clbit>,
}

impl CircuitInstruction {
    /// Create an instruction record.
    pub fn new(
        operation: impl Into<Operation>,
        qubits: impl IntoIterator<Item = Qubit>,
        clbits: impl IntoIterator<Item = Clbit>,
    ) -> Self {
        Self {
            operation: operation.into(),
            qubits: qubits.into_iter().collect(),
            clbits: clbits.into_iter().collect(),
        }
    }
}
