//! High-level circuit builder API.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::ops::Range;

use crate::bit::{Clbit, ClbitId, Qubit, QubitId};
use crate::bit_data::BitLocation;
use crate::builder::ControlFlowBuilderBlock;
use crate::circuit_data::CircuitData;
use crate::classical::{Expr, Identifier, Stretch, Var};
use crate::error::{CircuitError, CircuitResult};
use crate::identifiers::{IdentifierKind, Identifiers, VarsMode};
use crate::instruction::{CircuitInstruction, Instruction};
use crate::operation::{Duration, Operation, StandardGate, Store};
use crate::parameter::{Parameter, ParameterExpression};
use crate::register::{ClassicalRegister, NameSequence, QuantumRegister, Register};
use crate::scope::lookup_identifier;

macro_rules! bit_spec {
    ($(#[$doc:meta])* $spec:ident, $id:ident, $bit:ident, $reg:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub enum $spec {
            /// One bit by position.
            Index($id),
            /// One bit by handle.
            Bit($bit),
            /// Every bit of a register, in order.
            Register($reg),
            /// A range of positions.
            Range(Range<u32>),
            /// Several bits by position.
            Indices(Vec<$id>),
            /// Several bits by handle.
            Bits(Vec<$bit>),
        }

        impl From<$id> for $spec {
            fn from(id: $id) -> Self {
                $spec::Index(id)
            }
        }

        impl From<u32> for $spec {
            fn from(index: u32) -> Self {
                $spec::Index($id(index))
            }
        }

        impl From<$bit> for $spec {
            fn from(bit: $bit) -> Self {
                $spec::Bit(bit)
            }
        }

        impl From<&$bit> for $spec {
            fn from(bit: &$bit) -> Self {
                $spec::Bit(bit.clone())
            }
        }

        impl From<$reg> for $spec {
            fn from(register: $reg) -> Self {
                $spec::Register(register)
            }
        }

        impl From<&$reg> for $spec {
            fn from(register: &$reg) -> Self {
                $spec::Register(register.clone())
            }
        }

        impl From<Range<u32>> for $spec {
            fn from(range: Range<u32>) -> Self {
                $spec::Range(range)
            }
        }

        impl From<Vec<$id>> for $spec {
            fn from(ids: Vec<$id>) -> Self {
                $spec::Indices(ids)
            }
        }

        impl From<&[$id]> for $spec {
            fn from(ids: &[$id]) -> Self {
                $spec::Indices(ids.to_vec())
            }
        }

        impl<const N: usize> From<[$id; N]> for $spec {
            fn from(ids: [$id; N]) -> Self {
                $spec::Indices(ids.to_vec())
            }
        }

        impl From<Vec<$bit>> for $spec {
            fn from(bits: Vec<$bit>) -> Self {
                $spec::Bits(bits)
            }
        }
    };
}

bit_spec!(
    /// Ways to name the qubits of one operand slot.
    QubitSpec,
    QubitId,
    Qubit,
    QuantumRegister
);

bit_spec!(
    /// Ways to name the clbits of one operand slot.
    ClbitSpec,
    ClbitId,
    Clbit,
    ClassicalRegister
);

/// A quantum circuit.
///
/// Instruction methods take operand specs: a position, a bit handle, a
/// register, or a list of those. Passing a list to a single-qubit gate applies
/// it to every bit; see [`Operation::broadcast_arguments`].
///
/// While a control-flow builder such as [`Circuit::if_test`] is running, the
/// same methods append to the open block instead of the circuit.
#[derive(Debug, Clone, Default)]
pub struct Circuit {
    pub(crate) name: String,
    pub(crate) data: CircuitData,
    pub(crate) builder_stack: Vec<ControlFlowBuilderBlock>,
}

impl PartialEq for Circuit {
    /// Circuits compare by content; the name is not part of it.
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Circuit {
    /// Create a new empty circuit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create a circuit with a quantum register `q` and a classical register
    /// `c` of the given sizes. Empty registers are left out.
    pub fn with_size(name: impl Into<String>, num_qubits: u32, num_clbits: u32) -> Self {
        let mut data = CircuitData::with_capacity(num_qubits as usize, num_clbits as usize, 0);
        if num_qubits > 0 {
            let added = data.add_qreg(QuantumRegister::new("q", num_qubits));
            debug_assert!(added.is_ok(), "fresh register in an empty store");
        }
        if num_clbits > 0 {
            let added = data.add_creg(ClassicalRegister::new("c", num_clbits));
            debug_assert!(added.is_ok(), "fresh register in an empty store");
        }
        Self {
            name: name.into(),
            data,
            builder_stack: Vec::new(),
        }
    }

    /// Wrap an existing store.
    pub fn from_data(name: impl Into<String>, data: CircuitData) -> Self {
        Self {
            name: name.into(),
            data,
            builder_stack: Vec::new(),
        }
    }

    // =========================================================================
    // Bits and registers
    // =========================================================================

    /// Add a loose qubit.
    pub fn add_qubit(&mut self, qubit: Qubit) -> CircuitResult<QubitId> {
        self.data.add_qubit(qubit)
    }

    /// Add a loose clbit.
    pub fn add_clbit(&mut self, clbit: Clbit) -> CircuitResult<ClbitId> {
        self.data.add_clbit(clbit)
    }

    /// Add `count` fresh loose qubits, returning their positions.
    pub fn add_qubits(&mut self, count: u32) -> CircuitResult<Vec<QubitId>> {
        (0..count).map(|_| self.add_qubit(Qubit::new())).collect()
    }

    /// Add `count` fresh loose clbits, returning their positions.
    pub fn add_clbits(&mut self, count: u32) -> CircuitResult<Vec<ClbitId>> {
        (0..count).map(|_| self.add_clbit(Clbit::new())).collect()
    }

    /// Add a quantum register.
    pub fn add_qreg(&mut self, register: QuantumRegister) -> CircuitResult<&mut Self> {
        self.data.add_qreg(register)?;
        Ok(self)
    }

    /// Add a classical register.
    pub fn add_creg(&mut self, register: ClassicalRegister) -> CircuitResult<&mut Self> {
        self.data.add_creg(register)?;
        Ok(self)
    }

    fn resolve_qubits(&self, spec: QubitSpec) -> CircuitResult<Vec<QubitId>> {
        let checked = |id: QubitId| {
            if id.index() < self.num_qubits() {
                Ok(id)
            } else {
                Err(CircuitError::QubitIndexOutOfRange {
                    index: id.0,
                    num_qubits: self.num_qubits(),
                })
            }
        };
        match spec {
            QubitSpec::Index(id) => Ok(vec![checked(id)?]),
            QubitSpec::Bit(bit) => Ok(vec![self.data.resolve_qubit(&bit, None)?]),
            QubitSpec::Register(register) => register
                .bits()
                .iter()
                .map(|bit| self.data.resolve_qubit(bit, None))
                .collect(),
            QubitSpec::Range(range) => range.map(|i| checked(QubitId(i))).collect(),
            QubitSpec::Indices(ids) => ids.into_iter().map(checked).collect(),
            QubitSpec::Bits(bits) => bits
                .iter()
                .map(|bit| self.data.resolve_qubit(bit, None))
                .collect(),
        }
    }

    fn resolve_clbits(&self, spec: ClbitSpec) -> CircuitResult<Vec<ClbitId>> {
        let checked = |id: ClbitId| {
            if id.index() < self.num_clbits() {
                Ok(id)
            } else {
                Err(CircuitError::ClbitIndexOutOfRange {
                    index: id.0,
                    num_clbits: self.num_clbits(),
                })
            }
        };
        match spec {
            ClbitSpec::Index(id) => Ok(vec![checked(id)?]),
            ClbitSpec::Bit(bit) => Ok(vec![self.data.resolve_clbit(&bit, None)?]),
            ClbitSpec::Register(register) => register
                .bits()
                .iter()
                .map(|bit| self.data.resolve_clbit(bit, None))
                .collect(),
            ClbitSpec::Range(range) => range.map(|i| checked(ClbitId(i))).collect(),
            ClbitSpec::Indices(ids) => ids.into_iter().map(checked).collect(),
            ClbitSpec::Bits(bits) => bits
                .iter()
                .map(|bit| self.data.resolve_clbit(bit, None))
                .collect(),
        }
    }

    // =========================================================================
    // Appending
    // =========================================================================

    /// Broadcast `operation` over the operand specs and append every
    /// resulting instruction to the active scope.
    ///
    /// Nothing is appended unless every instruction is valid.
    pub fn append_operation(
        &mut self,
        operation: impl Into<Operation>,
        qargs: Vec<QubitSpec>,
        cargs: Vec<ClbitSpec>,
    ) -> CircuitResult<&mut Self> {
        let operation = operation.into();
        let qargs = qargs
            .into_iter()
            .map(|spec| self.resolve_qubits(spec))
            .collect::<CircuitResult<Vec<_>>>()?;
        let cargs = cargs
            .into_iter()
            .map(|spec| self.resolve_clbits(spec))
            .collect::<CircuitResult<Vec<_>>>()?;
        let instructions: Vec<Instruction> = operation
            .broadcast_arguments(&qargs, &cargs)?
            .into_iter()
            .map(|(q, c)| Instruction::new(operation.clone(), q, c))
            .collect();
        for inst in &instructions {
            if self.in_scope() {
                self.data.check_operands(inst)?;
            } else {
                self.data.check(inst)?;
            }
        }
        self.with_scope(|scope| {
            for inst in instructions {
                scope.append(inst)?;
            }
            Ok(())
        })?;
        Ok(self)
    }

    /// Append a positional instruction to the active scope.
    pub fn append_instruction(&mut self, instruction: Instruction) -> CircuitResult<&mut Self> {
        self.with_scope(|scope| scope.append(instruction))?;
        Ok(self)
    }

    /// Append an instruction whose operands are bit handles.
    pub fn append(&mut self, instruction: CircuitInstruction) -> CircuitResult<&mut Self> {
        let name = Some(instruction.operation.name());
        let qubits = instruction
            .qubits
            .iter()
            .map(|q| self.data.resolve_qubit(q, name))
            .collect::<CircuitResult<Vec<_>>>()?;
        let clbits = instruction
            .clbits
            .iter()
            .map(|c| self.data.resolve_clbit(c, name))
            .collect::<CircuitResult<Vec<_>>>()?;
        self.append_instruction(Instruction::new(instruction.operation, qubits, clbits))
    }

    fn gate1(&mut self, gate: StandardGate, qubit: impl Into<QubitSpec>) -> CircuitResult<&mut Self> {
        self.append_operation(gate, vec![qubit.into()], vec![])
    }

    fn gate2(
        &mut self,
        gate: StandardGate,
        a: impl Into<QubitSpec>,
        b: impl Into<QubitSpec>,
    ) -> CircuitResult<&mut Self> {
        self.append_operation(gate, vec![a.into(), b.into()], vec![])
    }

    // =========================================================================
    // Single-qubit gates
    // =========================================================================

    /// Apply identity gate.
    pub fn id(&mut self, qubit: impl Into<QubitSpec>) -> CircuitResult<&mut Self> {
        self.gate1(StandardGate::I, qubit)
    }

    /// Apply Hadamard gate.
    pub fn h(&mut self, qubit: impl Into<QubitSpec>) -> CircuitResult<&mut Self> {
        self.gate1(StandardGate::H, qubit)
    }

    /// Apply Pauli-X gate.
    pub fn x(&mut self, qubit: impl Into<QubitSpec>) -> CircuitResult<&mut Self> {
        self.gate1(StandardGate::X, qubit)
    }

    /// Apply Pauli-Y gate.
    pub fn y(&mut self, qubit: impl Into<QubitSpec>) -> CircuitResult<&mut Self> {
        self.gate1(StandardGate::Y, qubit)
    }

    /// Apply Pauli-Z gate.
    pub fn z(&mut self, qubit: impl Into<QubitSpec>) -> CircuitResult<&mut Self> {
        self.gate1(StandardGate::Z, qubit)
    }

    /// Apply S gate.
    pub fn s(&mut self, qubit: impl Into<QubitSpec>) -> CircuitResult<&mut Self> {
        self.gate1(StandardGate::S, qubit)
    }

    /// Apply S-dagger gate.
    pub fn sdg(&mut self, qubit: impl Into<QubitSpec>) -> CircuitResult<&mut Self> {
        self.gate1(StandardGate::Sdg, qubit)
    }

    /// Apply T gate.
    pub fn t(&mut self, qubit: impl Into<QubitSpec>) -> CircuitResult<&mut Self> {
        self.gate1(StandardGate::T, qubit)
    }

    /// Apply T-dagger gate.
    pub fn tdg(&mut self, qubit: impl Into<QubitSpec>) -> CircuitResult<&mut Self> {
        self.gate1(StandardGate::Tdg, qubit)
    }

    /// Apply sqrt(X) gate.
    pub fn sx(&mut self, qubit: impl Into<QubitSpec>) -> CircuitResult<&mut Self> {
        self.gate1(StandardGate::SX, qubit)
    }

    /// Apply sqrt(X)-dagger gate.
    pub fn sxdg(&mut self, qubit: impl Into<QubitSpec>) -> CircuitResult<&mut Self> {
        self.gate1(StandardGate::SXdg, qubit)
    }

    /// Apply Rx rotation gate.
    pub fn rx(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: impl Into<QubitSpec>,
    ) -> CircuitResult<&mut Self> {
        self.gate1(StandardGate::Rx(theta.into()), qubit)
    }

    /// Apply Ry rotation gate.
    pub fn ry(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: impl Into<QubitSpec>,
    ) -> CircuitResult<&mut Self> {
        self.gate1(StandardGate::Ry(theta.into()), qubit)
    }

    /// Apply Rz rotation gate.
    pub fn rz(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: impl Into<QubitSpec>,
    ) -> CircuitResult<&mut Self> {
        self.gate1(StandardGate::Rz(theta.into()), qubit)
    }

    /// Apply phase gate.
    pub fn p(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: impl Into<QubitSpec>,
    ) -> CircuitResult<&mut Self> {
        self.gate1(StandardGate::P(theta.into()), qubit)
    }

    /// Apply universal U gate.
    pub fn u(
        &mut self,
        theta: impl Into<ParameterExpression>,
        phi: impl Into<ParameterExpression>,
        lambda: impl Into<ParameterExpression>,
        qubit: impl Into<QubitSpec>,
    ) -> CircuitResult<&mut Self> {
        self.gate1(StandardGate::U(theta.into(), phi.into(), lambda.into()), qubit)
    }

    // =========================================================================
    // Two-qubit gates
    // =========================================================================

    /// Apply CNOT (CX) gate.
    pub fn cx(
        &mut self,
        control: impl Into<QubitSpec>,
        target: impl Into<QubitSpec>,
    ) -> CircuitResult<&mut Self> {
        self.gate2(StandardGate::CX, control, target)
    }

    /// Apply CY gate.
    pub fn cy(
        &mut self,
        control: impl Into<QubitSpec>,
        target: impl Into<QubitSpec>,
    ) -> CircuitResult<&mut Self> {
        self.gate2(StandardGate::CY, control, target)
    }

    /// Apply CZ gate.
    pub fn cz(
        &mut self,
        control: impl Into<QubitSpec>,
        target: impl Into<QubitSpec>,
    ) -> CircuitResult<&mut Self> {
        self.gate2(StandardGate::CZ, control, target)
    }

    /// Apply controlled-Hadamard gate.
    pub fn ch(
        &mut self,
        control: impl Into<QubitSpec>,
        target: impl Into<QubitSpec>,
    ) -> CircuitResult<&mut Self> {
        self.gate2(StandardGate::CH, control, target)
    }

    /// Apply SWAP gate.
    pub fn swap(&mut self, q1: impl Into<QubitSpec>, q2: impl Into<QubitSpec>) -> CircuitResult<&mut Self> {
        self.gate2(StandardGate::Swap, q1, q2)
    }

    /// Apply iSWAP gate.
    pub fn iswap(&mut self, q1: impl Into<QubitSpec>, q2: impl Into<QubitSpec>) -> CircuitResult<&mut Self> {
        self.gate2(StandardGate::ISwap, q1, q2)
    }

    /// Apply controlled Rx gate.
    pub fn crx(
        &mut self,
        theta: impl Into<ParameterExpression>,
        control: impl Into<QubitSpec>,
        target: impl Into<QubitSpec>,
    ) -> CircuitResult<&mut Self> {
        self.gate2(StandardGate::CRx(theta.into()), control, target)
    }

    /// Apply controlled Ry gate.
    pub fn cry(
        &mut self,
        theta: impl Into<ParameterExpression>,
        control: impl Into<QubitSpec>,
        target: impl Into<QubitSpec>,
    ) -> CircuitResult<&mut Self> {
        self.gate2(StandardGate::CRy(theta.into()), control, target)
    }

    /// Apply controlled Rz gate.
    pub fn crz(
        &mut self,
        theta: impl Into<ParameterExpression>,
        control: impl Into<QubitSpec>,
        target: impl Into<QubitSpec>,
    ) -> CircuitResult<&mut Self> {
        self.gate2(StandardGate::CRz(theta.into()), control, target)
    }

    /// Apply controlled phase gate.
    pub fn cp(
        &mut self,
        theta: impl Into<ParameterExpression>,
        control: impl Into<QubitSpec>,
        target: impl Into<QubitSpec>,
    ) -> CircuitResult<&mut Self> {
        self.gate2(StandardGate::CP(theta.into()), control, target)
    }

    /// Apply XX rotation gate.
    pub fn rxx(
        &mut self,
        theta: impl Into<ParameterExpression>,
        q1: impl Into<QubitSpec>,
        q2: impl Into<QubitSpec>,
    ) -> CircuitResult<&mut Self> {
        self.gate2(StandardGate::RXX(theta.into()), q1, q2)
    }

    /// Apply YY rotation gate.
    pub fn ryy(
        &mut self,
        theta: impl Into<ParameterExpression>,
        q1: impl Into<QubitSpec>,
        q2: impl Into<QubitSpec>,
    ) -> CircuitResult<&mut Self> {
        self.gate2(StandardGate::RYY(theta.into()), q1, q2)
    }

    /// Apply ZZ rotation gate.
    pub fn rzz(
        &mut self,
        theta: impl Into<ParameterExpression>,
        q1: impl Into<QubitSpec>,
        q2: impl Into<QubitSpec>,
    ) -> CircuitResult<&mut Self> {
        self.gate2(StandardGate::RZZ(theta.into()), q1, q2)
    }

    // =========================================================================
    // Three-qubit gates
    // =========================================================================

    /// Apply Toffoli (CCX) gate.
    pub fn ccx(
        &mut self,
        c1: impl Into<QubitSpec>,
        c2: impl Into<QubitSpec>,
        target: impl Into<QubitSpec>,
    ) -> CircuitResult<&mut Self> {
        self.append_operation(StandardGate::CCX, vec![c1.into(), c2.into(), target.into()], vec![])
    }

    /// Apply Fredkin (CSWAP) gate.
    pub fn cswap(
        &mut self,
        control: impl Into<QubitSpec>,
        t1: impl Into<QubitSpec>,
        t2: impl Into<QubitSpec>,
    ) -> CircuitResult<&mut Self> {
        self.append_operation(StandardGate::CSwap, vec![control.into(), t1.into(), t2.into()], vec![])
    }

    // =========================================================================
    // Other operations
    // =========================================================================

    /// Measure qubits into clbits.
    pub fn measure(
        &mut self,
        qubit: impl Into<QubitSpec>,
        clbit: impl Into<ClbitSpec>,
    ) -> CircuitResult<&mut Self> {
        self.append_operation(Operation::Measure, vec![qubit.into()], vec![clbit.into()])
    }

    /// Add a `meas` register as wide as the circuit, a barrier, and a
    /// measurement of every qubit into it.
    pub fn measure_all(&mut self) -> CircuitResult<&mut Self> {
        if self.in_scope() {
            return Err(CircuitError::ActiveScope(
                "cannot add a measurement register inside a control-flow scope",
            ));
        }
        let num_qubits = u32::try_from(self.num_qubits()).unwrap_or(u32::MAX);
        if num_qubits == 0 {
            return Ok(self);
        }
        let name = if self.data.get_creg("meas").is_some() || self.data.get_identifier("meas").is_some() {
            let mut names = NameSequence::new("meas");
            names.fresh_name(|name| {
                self.data.get_creg(name).is_some() || self.data.get_identifier(name).is_some()
            })
        } else {
            "meas".to_string()
        };
        let meas = ClassicalRegister::new(name, num_qubits);
        let mut staged = self.data.clone();
        staged.add_creg(meas.clone())?;
        staged.push(Instruction::barrier((0..num_qubits).map(QubitId)))?;
        for (q, clbit) in meas.bits().iter().enumerate() {
            let c = staged.resolve_clbit(clbit, Some("measure"))?;
            staged.push(Instruction::measure(QubitId::from(q), c))?;
        }
        self.data = staged;
        Ok(self)
    }

    /// Reset qubits to |0⟩.
    pub fn reset(&mut self, qubit: impl Into<QubitSpec>) -> CircuitResult<&mut Self> {
        self.append_operation(Operation::Reset, vec![qubit.into()], vec![])
    }

    /// Apply a barrier to the given qubits.
    pub fn barrier<S: Into<QubitSpec>>(
        &mut self,
        qubits: impl IntoIterator<Item = S>,
    ) -> CircuitResult<&mut Self> {
        let mut ids = Vec::new();
        for spec in qubits {
            ids.extend(self.resolve_qubits(spec.into())?);
        }
        self.append_instruction(Instruction::barrier(ids))
    }

    /// Apply a barrier to all qubits.
    pub fn barrier_all(&mut self) -> CircuitResult<&mut Self> {
        let n = u32::try_from(self.num_qubits()).unwrap_or(u32::MAX);
        self.append_instruction(Instruction::barrier((0..n).map(QubitId)))
    }

    /// Idle the given qubits for `duration`.
    pub fn delay(
        &mut self,
        duration: impl Into<Duration>,
        qubit: impl Into<QubitSpec>,
    ) -> CircuitResult<&mut Self> {
        let duration = duration.into();
        duration.validate()?;
        self.append_operation(Operation::Delay(duration), vec![qubit.into()], vec![])
    }

    /// Assign `rvalue` to `lvalue` in real time.
    pub fn store(&mut self, lvalue: impl Into<Expr>, rvalue: impl Into<Expr>) -> CircuitResult<&mut Self> {
        let store = Store::new(lvalue, rvalue)?;
        self.append_instruction(Instruction::new(store, [], []))
    }

    // =========================================================================
    // Real-time variables
    // =========================================================================

    /// Declare `var` in the active scope and initialize it.
    pub fn add_var(&mut self, var: Var, initial: impl Into<Expr>) -> CircuitResult<&mut Self> {
        let store = Store::new(&var, initial)?;
        let declared = Identifier::Var(var.clone());
        if store.rvalue().identifiers().contains(&declared) {
            return Err(CircuitError::UndeclaredIdentifier {
                name: var.name().to_string(),
            });
        }
        let instruction = Instruction::new(store, [], []);
        self.with_scope(|scope| {
            scope.check_declaration(&declared)?;
            scope.check_append(&instruction, std::slice::from_ref(&declared))?;
            scope.add_uninitialized_var(var)?;
            scope.append(instruction)
        })?;
        Ok(self)
    }

    /// Declare `var` in the active scope without initializing it.
    pub fn add_uninitialized_var(&mut self, var: Var) -> CircuitResult<&mut Self> {
        self.with_scope(|scope| scope.add_uninitialized_var(var))?;
        Ok(self)
    }

    /// Declare a stretch in the active scope.
    pub fn add_stretch(&mut self, stretch: Stretch) -> CircuitResult<&mut Self> {
        self.with_scope(|scope| scope.add_stretch(stretch))?;
        Ok(self)
    }

    /// Declare an input variable of the circuit.
    pub fn add_input(&mut self, var: Var) -> CircuitResult<&mut Self> {
        self.add_top_level(Identifier::Var(var), IdentifierKind::Input)
    }

    /// Declare an identifier captured from an enclosing circuit.
    pub fn add_capture(&mut self, identifier: impl Into<Identifier>) -> CircuitResult<&mut Self> {
        self.add_top_level(identifier.into(), IdentifierKind::Capture)
    }

    fn add_top_level(&mut self, identifier: Identifier, kind: IdentifierKind) -> CircuitResult<&mut Self> {
        if self.in_scope() {
            return Err(CircuitError::ActiveScope(
                "inputs and captures can only be declared at the top level",
            ));
        }
        self.data.add_identifier(identifier, kind)?;
        Ok(self)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the circuit.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.data.num_qubits()
    }

    /// Get the number of classical bits.
    pub fn num_clbits(&self) -> usize {
        self.data.num_clbits()
    }

    /// The qubits, in order.
    pub fn qubits(&self) -> &[Qubit] {
        self.data.qubits()
    }

    /// The clbits, in order.
    pub fn clbits(&self) -> &[Clbit] {
        self.data.clbits()
    }

    /// Quantum registers, in insertion order.
    pub fn qregs(&self) -> impl ExactSizeIterator<Item = &QuantumRegister> {
        self.data.qregs()
    }

    /// Classical registers, in insertion order.
    pub fn cregs(&self) -> impl ExactSizeIterator<Item = &ClassicalRegister> {
        self.data.cregs()
    }

    /// Where `qubit` lives in this circuit.
    pub fn find_qubit(&self, qubit: &Qubit) -> CircuitResult<&BitLocation<QuantumRegister>> {
        self.data.find_qubit(qubit)
    }

    /// Where `clbit` lives in this circuit.
    pub fn find_clbit(&self, clbit: &Clbit) -> CircuitResult<&BitLocation<ClassicalRegister>> {
        self.data.find_clbit(clbit)
    }

    /// The instruction records.
    pub fn data(&self) -> &[Instruction] {
        self.data.data()
    }

    /// The underlying store.
    pub fn circuit_data(&self) -> &CircuitData {
        &self.data
    }

    /// The record at `index` with handle operands.
    pub fn circuit_instruction(&self, index: usize) -> Option<CircuitInstruction> {
        self.data.circuit_instruction(index)
    }

    /// The global phase.
    pub fn global_phase(&self) -> &ParameterExpression {
        self.data.global_phase()
    }

    /// Set the global phase.
    pub fn set_global_phase(&mut self, phase: impl Into<ParameterExpression>) -> CircuitResult<&mut Self> {
        self.data.set_global_phase(phase)?;
        Ok(self)
    }

    /// The cached total duration in device time steps, if scheduled.
    pub fn duration(&self) -> Option<u64> {
        self.data.duration()
    }

    /// The identifiers of the circuit.
    pub fn identifiers(&self) -> &Identifiers {
        self.data.identifiers()
    }

    /// The variable called `name`, visible from the active scope.
    pub fn get_var(&self, name: &str) -> Option<Var> {
        self.get_identifier(name).and_then(|i| i.as_var().cloned())
    }

    /// The stretch called `name`, visible from the active scope.
    pub fn get_stretch(&self, name: &str) -> Option<Stretch> {
        self.get_identifier(name).and_then(|i| i.as_stretch().cloned())
    }

    /// The identifier called `name`, visible from the active scope.
    pub fn get_identifier(&self, name: &str) -> Option<Identifier> {
        lookup_identifier(&self.builder_stack, &self.data, name)
    }

    /// Whether exactly this identifier belongs to the circuit.
    pub fn has_identifier(&self, identifier: &Identifier) -> bool {
        self.data.has_identifier(identifier)
    }

    /// Whether exactly this variable belongs to the circuit.
    pub fn has_var(&self, var: &Var) -> bool {
        self.data.has_identifier(&Identifier::Var(var.clone()))
    }

    /// Whether exactly this stretch belongs to the circuit.
    pub fn has_stretch(&self, stretch: &Stretch) -> bool {
        self.data.has_identifier(&Identifier::Stretch(stretch.clone()))
    }

    /// Remove every instruction, keeping bits, registers and identifiers.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// A circuit with the same bits, registers and phase, and no instructions.
    pub fn copy_empty_like(&self, name: Option<&str>, vars_mode: VarsMode) -> Self {
        Self {
            name: name.map_or_else(|| self.name.clone(), str::to_string),
            data: self.data.copy_empty_like(vars_mode),
            builder_stack: Vec::new(),
        }
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// Free parameters in canonical binding order.
    pub fn parameters(&self) -> &[Parameter] {
        self.data.parameters()
    }

    /// Number of free parameters.
    pub fn num_parameters(&self) -> usize {
        self.data.num_parameters()
    }

    /// Whether `parameter` is used.
    pub fn has_parameter(&self, parameter: &Parameter) -> bool {
        self.data.has_parameter(parameter)
    }

    /// The used parameter called `name`.
    pub fn get_parameter_by_name(&self, name: &str) -> Option<&Parameter> {
        self.data.get_parameter_by_name(name)
    }

    /// Substitute parameters. With `strict`, every key must be used.
    pub fn assign_parameters(
        &mut self,
        map: &FxHashMap<Parameter, ParameterExpression>,
        strict: bool,
    ) -> CircuitResult<&mut Self> {
        self.data.assign_parameters(map, strict)?;
        Ok(self)
    }

    /// Bind values to the free parameters in canonical order.
    pub fn assign_parameters_from_values<V: Into<ParameterExpression>>(
        &mut self,
        values: impl IntoIterator<Item = V>,
    ) -> CircuitResult<&mut Self> {
        self.data.assign_parameters_from_values(values)?;
        Ok(self)
    }

    /// Bind values to parameters looked up by name.
    pub fn assign_parameters_by_name<S: AsRef<str>, V: Into<ParameterExpression>>(
        &mut self,
        values: impl IntoIterator<Item = (S, V)>,
    ) -> CircuitResult<&mut Self> {
        self.data.assign_parameters_by_name(values)?;
        Ok(self)
    }

    pub(crate) fn assign_parameters_partial(
        &mut self,
        map: &FxHashMap<Parameter, ParameterExpression>,
    ) -> CircuitResult<()> {
        self.data.assign_parameters(map, false)
    }

    // =========================================================================
    // Metrics
    // =========================================================================

    /// Number of instructions, not counting barriers.
    pub fn size(&self) -> usize {
        self.data().iter().filter(|inst| !inst.is_directive()).count()
    }

    /// Total number of qubits and clbits.
    pub fn width(&self) -> usize {
        self.num_qubits() + self.num_clbits()
    }

    /// Length of the critical path, not counting barriers.
    ///
    /// Qubits, clbits and real-time identifiers are all wires. Clbits read by
    /// a condition count as used by the instruction.
    pub fn depth(&self) -> usize {
        let mut levels: FxHashMap<Wire, usize> = FxHashMap::default();
        let mut depth = 0;
        for inst in self.data() {
            if inst.is_directive() {
                continue;
            }
            let mut wires: Vec<Wire> = inst.qubits.iter().map(|q| Wire::Qubit(*q)).collect();
            wires.extend(inst.clbits.iter().map(|c| Wire::Clbit(*c)));
            let (clbits, registers) = inst.operation.classical_resources();
            let read = clbits
                .iter()
                .chain(registers.iter().flat_map(|r| r.bits().iter()));
            for clbit in read {
                if let Ok(id) = self.data.resolve_clbit(clbit, None) {
                    wires.push(Wire::Clbit(id));
                }
            }
            wires.extend(inst.operation.identifiers().into_iter().map(Wire::Identifier));

            let level = wires
                .iter()
                .filter_map(|w| levels.get(w))
                .max()
                .copied()
                .unwrap_or(0)
                + 1;
            for wire in wires {
                levels.insert(wire, level);
            }
            depth = depth.max(level);
        }
        depth
    }

    /// Count of each operation name, most frequent first.
    pub fn count_ops(&self) -> IndexMap<String, usize> {
        let mut counts: IndexMap<String, usize> = IndexMap::new();
        for inst in self.data() {
            *counts.entry(inst.name().to_string()).or_default() += 1;
        }
        counts.sort_by(|_, a, _, b| b.cmp(a));
        counts
    }

    /// Number of non-directive instructions acting on more than one qubit.
    pub fn num_nonlocal_gates(&self) -> usize {
        self.data()
            .iter()
            .filter(|inst| !inst.is_directive() && inst.qubits.len() > 1)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Wire {
    Qubit(QubitId),
    Clbit(ClbitId),
    Identifier(Identifier),
}
