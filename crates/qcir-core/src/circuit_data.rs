//! The instruction store behind a [`Circuit`](crate::Circuit).
//!
//! [`CircuitData`] owns the bit lists, registers, instruction records, global
//! phase and identifiers of one circuit, and keeps the reverse indices over
//! them (bit → position, parameter → use sites) current on every mutation.

use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use std::f64::consts::TAU;
use tracing::debug;

use crate::bit::{Clbit, ClbitId, Qubit, QubitId};
use crate::bit_data::{BitData, BitLocation};
use crate::classical::{Identifier, Stretch, Var};
use crate::error::{CircuitError, CircuitResult};
use crate::identifiers::{IdentifierKind, Identifiers, VarsMode};
use crate::instruction::{CircuitInstruction, Instruction};
use crate::parameter::{Parameter, ParameterExpression};
use crate::parameter_table::ParameterTable;
use crate::register::{ClassicalRegister, QuantumRegister, Register};

/// Append-only instruction log with O(1) bit and parameter lookups.
#[derive(Debug, Clone, Default)]
pub struct CircuitData {
    qubits: BitData<QuantumRegister>,
    clbits: BitData<ClassicalRegister>,
    data: Vec<Instruction>,
    param_table: ParameterTable,
    global_phase: ParameterExpression,
    identifiers: Identifiers,
    duration: Option<u64>,
}

impl CircuitData {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with room for the given numbers of bits and
    /// instructions.
    pub fn with_capacity(num_qubits: usize, num_clbits: usize, num_instructions: usize) -> Self {
        Self {
            qubits: BitData::with_capacity(num_qubits),
            clbits: BitData::with_capacity(num_clbits),
            data: Vec::with_capacity(num_instructions),
            ..Self::default()
        }
    }

    // =========================================================================
    // Bits and registers
    // =========================================================================

    /// The qubits, in order.
    pub fn qubits(&self) -> &[Qubit] {
        self.qubits.bits()
    }

    /// The clbits, in order.
    pub fn clbits(&self) -> &[Clbit] {
        self.clbits.bits()
    }

    /// The qubit at position `id`.
    pub fn qubit(&self, id: QubitId) -> Option<&Qubit> {
        self.qubits.get(id.0)
    }

    /// The clbit at position `id`.
    pub fn clbit(&self, id: ClbitId) -> Option<&Clbit> {
        self.clbits.get(id.0)
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.qubits.len()
    }

    /// Number of clbits.
    pub fn num_clbits(&self) -> usize {
        self.clbits.len()
    }

    /// Quantum registers, in insertion order.
    pub fn qregs(&self) -> impl ExactSizeIterator<Item = &QuantumRegister> {
        self.qubits.registers()
    }

    /// Classical registers, in insertion order.
    pub fn cregs(&self) -> impl ExactSizeIterator<Item = &ClassicalRegister> {
        self.clbits.registers()
    }

    /// The quantum register called `name`.
    pub fn get_qreg(&self, name: &str) -> Option<&QuantumRegister> {
        self.qubits.get_register(name)
    }

    /// The classical register called `name`.
    pub fn get_creg(&self, name: &str) -> Option<&ClassicalRegister> {
        self.clbits.get_register(name)
    }

    /// Whether exactly this quantum register is present.
    pub fn has_qreg(&self, register: &QuantumRegister) -> bool {
        self.qubits.has_register(register)
    }

    /// Whether exactly this classical register is present.
    pub fn has_creg(&self, register: &ClassicalRegister) -> bool {
        self.clbits.has_register(register)
    }

    /// Add a qubit, failing if it is already present.
    pub fn add_qubit(&mut self, qubit: Qubit) -> CircuitResult<QubitId> {
        self.qubits.add(qubit, true).map(QubitId)
    }

    /// Add a clbit, failing if it is already present.
    pub fn add_clbit(&mut self, clbit: Clbit) -> CircuitResult<ClbitId> {
        self.clbits.add(clbit, true).map(ClbitId)
    }

    /// Add a quantum register and any of its bits not yet present.
    pub fn add_qreg(&mut self, register: QuantumRegister) -> CircuitResult<()> {
        self.qubits.add_register(register)
    }

    /// Add a classical register and any of its bits not yet present.
    ///
    /// The name must also differ from every identifier in the circuit.
    pub fn add_creg(&mut self, register: ClassicalRegister) -> CircuitResult<()> {
        if self.identifiers.contains_name(register.name()) {
            return Err(CircuitError::DuplicateName {
                kind: ClassicalRegister::KIND,
                name: register.name().to_string(),
            });
        }
        self.clbits.add_register(register)
    }

    /// Where `qubit` lives in this circuit.
    pub fn find_qubit(&self, qubit: &Qubit) -> CircuitResult<&BitLocation<QuantumRegister>> {
        self.qubits.find(qubit).ok_or_else(|| CircuitError::NotFound {
            kind: Qubit::KIND,
            name: qubit.to_string(),
        })
    }

    /// Where `clbit` lives in this circuit.
    pub fn find_clbit(&self, clbit: &Clbit) -> CircuitResult<&BitLocation<ClassicalRegister>> {
        self.clbits.find(clbit).ok_or_else(|| CircuitError::NotFound {
            kind: Clbit::KIND,
            name: clbit.to_string(),
        })
    }

    /// Position of `qubit`, or a resource error naming `operation`.
    pub fn resolve_qubit(&self, qubit: &Qubit, operation: Option<&str>) -> CircuitResult<QubitId> {
        self.qubits
            .index_of(qubit)
            .map(QubitId)
            .ok_or_else(|| CircuitError::Resource {
                kind: Qubit::KIND,
                bit: qubit.to_string(),
                operation: operation.map(str::to_string),
            })
    }

    /// Position of `clbit`, or a resource error naming `operation`.
    pub fn resolve_clbit(&self, clbit: &Clbit, operation: Option<&str>) -> CircuitResult<ClbitId> {
        self.clbits
            .index_of(clbit)
            .map(ClbitId)
            .ok_or_else(|| CircuitError::Resource {
                kind: Clbit::KIND,
                bit: clbit.to_string(),
                operation: operation.map(str::to_string),
            })
    }

    // =========================================================================
    // Identifiers
    // =========================================================================

    /// The identifiers of this circuit.
    pub fn identifiers(&self) -> &Identifiers {
        &self.identifiers
    }

    /// Check that `identifier` could be added as `kind`.
    pub fn check_identifier(&self, identifier: &Identifier, kind: IdentifierKind) -> CircuitResult<()> {
        if self.clbits.get_register(identifier.name()).is_some() {
            return Err(CircuitError::IdentifierShadowing {
                name: identifier.name().to_string(),
            });
        }
        self.identifiers.check_add(identifier, kind)
    }

    /// Add an identifier of the given kind.
    pub fn add_identifier(&mut self, identifier: Identifier, kind: IdentifierKind) -> CircuitResult<()> {
        self.check_identifier(&identifier, kind)?;
        self.identifiers.add(identifier, kind)
    }

    /// The identifier called `name`.
    pub fn get_identifier(&self, name: &str) -> Option<&Identifier> {
        self.identifiers.get(name)
    }

    /// The variable called `name`.
    pub fn get_var(&self, name: &str) -> Option<&Var> {
        self.identifiers.get_var(name)
    }

    /// The stretch called `name`.
    pub fn get_stretch(&self, name: &str) -> Option<&Stretch> {
        self.identifiers.get_stretch(name)
    }

    /// Whether exactly this identifier is present.
    pub fn has_identifier(&self, identifier: &Identifier) -> bool {
        self.identifiers.contains(identifier)
    }

    // =========================================================================
    // Instructions
    // =========================================================================

    /// The instruction records, in order.
    pub fn data(&self) -> &[Instruction] {
        &self.data
    }

    /// Number of instruction records.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether there are no instruction records.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check operand positions and shape, but not classical context.
    pub(crate) fn check_operands(&self, instruction: &Instruction) -> CircuitResult<()> {
        for q in &instruction.qubits {
            if q.index() >= self.num_qubits() {
                return Err(CircuitError::QubitIndexOutOfRange {
                    index: q.0,
                    num_qubits: self.num_qubits(),
                });
            }
        }
        for c in &instruction.clbits {
            if c.index() >= self.num_clbits() {
                return Err(CircuitError::ClbitIndexOutOfRange {
                    index: c.0,
                    num_clbits: self.num_clbits(),
                });
            }
        }
        instruction.check_shape()
    }

    /// Check that `instruction` could be pushed without changing anything.
    pub fn check(&self, instruction: &Instruction) -> CircuitResult<()> {
        self.check_with(instruction, &[])
    }

    /// Like [`CircuitData::check`], counting `pending` as already declared.
    pub(crate) fn check_with(
        &self,
        instruction: &Instruction,
        pending: &[Identifier],
    ) -> CircuitResult<()> {
        self.check_operands(instruction)?;
        let operation = &instruction.operation;
        self.param_table.check_operation(operation)?;
        for ident in operation.identifiers() {
            if !self.identifiers.contains(&ident) && !pending.contains(&ident) {
                return Err(CircuitError::UndeclaredIdentifier {
                    name: ident.name().to_string(),
                });
            }
        }
        let (clbits, registers) = operation.classical_resources();
        for clbit in &clbits {
            self.resolve_clbit(clbit, Some(operation.name()))?;
        }
        for register in registers {
            if !self.clbits.has_register(&register) {
                return Err(CircuitError::NotFound {
                    kind: ClassicalRegister::KIND,
                    name: register.name().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Append a positional instruction record.
    pub fn push(&mut self, instruction: Instruction) -> CircuitResult<()> {
        self.check(&instruction)?;
        self.param_table
            .track_operation(self.data.len(), &instruction.operation);
        self.data.push(instruction);
        self.duration = None;
        Ok(())
    }

    /// Append an instruction whose operands are bit handles.
    pub fn append(&mut self, instruction: CircuitInstruction) -> CircuitResult<()> {
        let name = Some(instruction.operation.name());
        let qubits = instruction
            .qubits
            .iter()
            .map(|q| self.resolve_qubit(q, name))
            .collect::<CircuitResult<Vec<_>>>()?;
        let clbits = instruction
            .clbits
            .iter()
            .map(|c| self.resolve_clbit(c, name))
            .collect::<CircuitResult<Vec<_>>>()?;
        self.push(Instruction::new(instruction.operation, qubits, clbits))
    }

    /// The record at `index` with its operands turned back into handles.
    pub fn circuit_instruction(&self, index: usize) -> Option<CircuitInstruction> {
        let inst = self.data.get(index)?;
        Some(CircuitInstruction {
            operation: inst.operation.clone(),
            qubits: inst
                .qubits
                .iter()
                .filter_map(|q| self.qubit(*q).cloned())
                .collect(),
            clbits: inst
                .clbits
                .iter()
                .filter_map(|c| self.clbit(*c).cloned())
                .collect(),
        })
    }

    /// Insert records before all existing ones.
    ///
    /// Every record is checked before any is inserted. The parameter table is
    /// rebuilt afterwards since all existing positions shift.
    pub fn insert_front(&mut self, instructions: Vec<Instruction>) -> CircuitResult<()> {
        for inst in &instructions {
            self.check(inst)?;
        }
        let mut incoming = Vec::new();
        for inst in &instructions {
            inst.operation
                .for_each_parameter(|_, p| incoming.push(p.clone()));
        }
        self.param_table.check(&incoming)?;
        self.data.splice(0..0, instructions);
        self.param_table.rebuild(&self.data, &self.global_phase);
        self.duration = None;
        Ok(())
    }

    /// Remove and return the last record.
    pub fn pop(&mut self) -> Option<Instruction> {
        let inst = self.data.pop()?;
        self.param_table
            .untrack_operation(self.data.len(), &inst.operation);
        self.duration = None;
        Some(inst)
    }

    /// Remove every record, keeping bits, registers, identifiers and phase.
    pub fn clear(&mut self) {
        self.data.clear();
        self.param_table.rebuild(&self.data, &self.global_phase);
        self.duration = None;
    }

    // =========================================================================
    // Phase and duration
    // =========================================================================

    /// The global phase.
    pub fn global_phase(&self) -> &ParameterExpression {
        &self.global_phase
    }

    /// Set the global phase. Numeric phases are normalized into `[0, 2π)`.
    pub fn set_global_phase(&mut self, phase: impl Into<ParameterExpression>) -> CircuitResult<()> {
        let phase = normalize_phase(phase.into());
        self.param_table.untrack_global_phase(&self.global_phase);
        if let Err(err) = self.param_table.check(&phase.parameters()) {
            self.param_table.track_global_phase(&self.global_phase);
            return Err(err);
        }
        self.param_table.track_global_phase(&phase);
        self.global_phase = phase;
        Ok(())
    }

    /// The cached total duration in device time steps.
    ///
    /// Cleared by every change to the instruction records.
    pub fn duration(&self) -> Option<u64> {
        self.duration
    }

    /// Record the total duration.
    pub fn set_duration(&mut self, duration: Option<u64>) {
        self.duration = duration;
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// Free parameters in canonical binding order.
    pub fn parameters(&self) -> &[Parameter] {
        self.param_table.sorted()
    }

    /// Number of free parameters.
    pub fn num_parameters(&self) -> usize {
        self.param_table.len()
    }

    /// Whether `parameter` is used.
    pub fn has_parameter(&self, parameter: &Parameter) -> bool {
        self.param_table.contains(parameter)
    }

    /// The used parameter called `name`.
    pub fn get_parameter_by_name(&self, name: &str) -> Option<&Parameter> {
        self.param_table.get_by_name(name)
    }

    /// The parameter table.
    pub fn parameter_table(&self) -> &ParameterTable {
        &self.param_table
    }

    /// Substitute parameters throughout the records, their nested bodies and
    /// definitions, and the global phase.
    ///
    /// With `strict`, every key must be a parameter of this circuit.
    pub fn assign_parameters(
        &mut self,
        map: &FxHashMap<Parameter, ParameterExpression>,
        strict: bool,
    ) -> CircuitResult<()> {
        if strict {
            if let Some(missing) = map.keys().find(|p| !self.param_table.contains(p)) {
                return Err(CircuitError::ParameterNotFound {
                    name: missing.name().to_string(),
                });
            }
        }

        let mut incoming = IndexSet::new();
        for expr in map.values() {
            expr.collect_parameters(&mut incoming);
        }
        for param in &incoming {
            let clash = self
                .param_table
                .get_by_name(param.name())
                .is_some_and(|existing| existing != param && !map.contains_key(existing));
            if clash {
                return Err(CircuitError::ParameterNameConflict {
                    name: param.name().to_string(),
                });
            }
        }

        let (indices, global_phase) = self.param_table.affected(map.keys());
        let mut updated = Vec::with_capacity(indices.len());
        for &index in &indices {
            let mut operation = self.data[index].operation.clone();
            operation.assign_parameters(map)?;
            updated.push((index, operation));
        }

        for (index, operation) in updated {
            self.param_table
                .untrack_operation(index, &self.data[index].operation);
            self.data[index].operation = operation;
            self.param_table
                .track_operation(index, &self.data[index].operation);
        }
        if global_phase {
            self.param_table.untrack_global_phase(&self.global_phase);
            self.global_phase = normalize_phase(self.global_phase.subs(map));
            self.param_table.track_global_phase(&self.global_phase);
        }
        debug!(
            assigned = map.len(),
            instructions = indices.len(),
            global_phase,
            remaining = self.param_table.len(),
            "assigned parameters"
        );
        Ok(())
    }

    /// Bind values to the free parameters in canonical order.
    pub fn assign_parameters_from_values<V: Into<ParameterExpression>>(
        &mut self,
        values: impl IntoIterator<Item = V>,
    ) -> CircuitResult<()> {
        let values: Vec<ParameterExpression> = values.into_iter().map(Into::into).collect();
        if values.len() != self.num_parameters() {
            return Err(CircuitError::ParameterCountMismatch {
                expected: self.num_parameters(),
                got: values.len(),
            });
        }
        let map: FxHashMap<Parameter, ParameterExpression> =
            self.parameters().iter().cloned().zip(values).collect();
        self.assign_parameters(&map, true)
    }

    /// Bind values to parameters looked up by name.
    pub fn assign_parameters_by_name<S: AsRef<str>, V: Into<ParameterExpression>>(
        &mut self,
        values: impl IntoIterator<Item = (S, V)>,
    ) -> CircuitResult<()> {
        let mut map = FxHashMap::default();
        for (name, value) in values {
            let name = name.as_ref();
            let param = self
                .get_parameter_by_name(name)
                .ok_or_else(|| CircuitError::ParameterNotFound {
                    name: name.to_string(),
                })?;
            map.insert(param.clone(), value.into());
        }
        self.assign_parameters(&map, true)
    }

    // =========================================================================
    // Copies
    // =========================================================================

    /// Same bits, registers and global phase with no records.
    pub fn copy_empty_like(&self, vars_mode: VarsMode) -> Self {
        let identifiers = match vars_mode {
            VarsMode::Alike => self.identifiers.clone(),
            VarsMode::Captures => self.identifiers.clone_as_captures(),
            VarsMode::Drop => Identifiers::new(),
        };
        let mut param_table = ParameterTable::new();
        param_table.track_global_phase(&self.global_phase);
        Self {
            qubits: self.qubits.clone(),
            clbits: self.clbits.clone(),
            data: Vec::new(),
            param_table,
            global_phase: self.global_phase.clone(),
            identifiers,
            duration: None,
        }
    }
}

impl PartialEq for CircuitData {
    fn eq(&self, other: &Self) -> bool {
        self.qubits() == other.qubits()
            && self.clbits() == other.clbits()
            && self.qregs().eq(other.qregs())
            && self.cregs().eq(other.cregs())
            && self.global_phase == other.global_phase
            && self.identifiers == other.identifiers
            && self.data == other.data
    }
}

fn normalize_phase(phase: ParameterExpression) -> ParameterExpression {
    match phase.as_f64() {
        Some(value) => ParameterExpression::Constant(value.rem_euclid(TAU)),
        None => phase,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classical::Type;
    use crate::operation::{Operation, StandardGate};
    use std::f64::consts::PI;

    fn two_qubit_data() -> (CircuitData, QuantumRegister) {
        let mut data = CircuitData::new();
        let qr = QuantumRegister::new("q", 2);
        data.add_qreg(qr.clone()).unwrap();
        (data, qr)
    }

    fn rz(p: &Parameter) -> Operation {
        Operation::Standard(StandardGate::Rz(ParameterExpression::symbol(p)))
    }

    #[test]
    fn test_append_resolves_handles() {
        let (mut data, qr) = two_qubit_data();
        data.append(CircuitInstruction::new(
            StandardGate::CX,
            [qr.bits()[1].clone(), qr.bits()[0].clone()],
            [],
        ))
        .unwrap();
        assert_eq!(data.data()[0].qubits.as_slice(), &[QubitId(1), QubitId(0)]);
        assert_eq!(data.circuit_instruction(0).unwrap().qubits[0], qr.bits()[1]);
    }

    #[test]
    fn test_append_unknown_bit() {
        let (mut data, _) = two_qubit_data();
        let err = data
            .append(CircuitInstruction::new(StandardGate::H, [Qubit::new()], []))
            .unwrap_err();
        assert!(matches!(err, CircuitError::Resource { kind: "qubit", .. }));
        assert!(data.is_empty());
    }

    #[test]
    fn test_push_checks_range_and_duplicates() {
        let (mut data, _) = two_qubit_data();
        assert!(matches!(
            data.push(Instruction::gate(StandardGate::H, [QubitId(5)])),
            Err(CircuitError::QubitIndexOutOfRange { index: 5, .. })
        ));
        assert!(matches!(
            data.push(Instruction::gate(StandardGate::CX, [QubitId(0), QubitId(0)])),
            Err(CircuitError::DuplicateOperand { .. })
        ));
        assert!(data.is_empty());
    }

    #[test]
    fn test_find_bits_and_registers() {
        let (mut data, qr) = two_qubit_data();
        let loose = Qubit::new();
        assert_eq!(data.add_qubit(loose.clone()).unwrap(), QubitId(2));
        assert_eq!(data.find_qubit(&loose).unwrap().index(), 2);
        assert_eq!(data.find_qubit(&qr.bits()[1]).unwrap().registers(), &[(qr, 1)]);
        assert!(matches!(
            data.find_clbit(&Clbit::new()),
            Err(CircuitError::NotFound { .. })
        ));
        assert!(matches!(
            data.add_qubit(loose),
            Err(CircuitError::DuplicateBit { .. })
        ));
    }

    #[test]
    fn test_register_and_identifier_names_disjoint() {
        let mut data = CircuitData::new();
        data.add_identifier(Var::new("a", Type::Bool).into(), IdentifierKind::Declare)
            .unwrap();
        assert!(matches!(
            data.add_creg(ClassicalRegister::new("a", 1)),
            Err(CircuitError::DuplicateName { .. })
        ));
        data.add_creg(ClassicalRegister::new("b", 1)).unwrap();
        assert!(matches!(
            data.add_identifier(Var::new("b", Type::Bool).into(), IdentifierKind::Declare),
            Err(CircuitError::IdentifierShadowing { .. })
        ));
    }

    #[test]
    fn test_undeclared_identifier_in_store() {
        let mut data = CircuitData::new();
        let a = Var::new("a", Type::Bool);
        let store = crate::operation::Store::new(&a, true).unwrap();
        assert!(matches!(
            data.push(Instruction::new(store, [], [])),
            Err(CircuitError::UndeclaredIdentifier { .. })
        ));
    }

    #[test]
    fn test_pop_untracks_parameters() {
        let (mut data, _) = two_qubit_data();
        let theta = Parameter::new("theta");
        data.push(Instruction::new(rz(&theta), [QubitId(0)], []))
            .unwrap();
        assert!(data.has_parameter(&theta));
        data.pop().unwrap();
        assert_eq!(data.num_parameters(), 0);
    }

    #[test]
    fn test_assign_parameters() {
        let (mut data, _) = two_qubit_data();
        let a = Parameter::new("a");
        let b = Parameter::new("b");
        data.push(Instruction::new(rz(&a), [QubitId(0)], [])).unwrap();
        data.push(Instruction::new(rz(&b), [QubitId(1)], [])).unwrap();
        data.set_global_phase(ParameterExpression::symbol(&a)).unwrap();

        let mut map = FxHashMap::default();
        map.insert(a.clone(), ParameterExpression::constant(PI));
        data.assign_parameters(&map, true).unwrap();
        assert_eq!(data.parameters(), &[b.clone()]);
        assert_eq!(data.global_phase().as_f64(), Some(PI));
        assert_eq!(data.data()[0].operation.params()[0].as_f64(), Some(PI));

        let mut unknown = FxHashMap::default();
        unknown.insert(Parameter::new("z"), ParameterExpression::constant(1.0));
        assert!(matches!(
            data.assign_parameters(&unknown, true),
            Err(CircuitError::ParameterNotFound { .. })
        ));
        data.assign_parameters(&unknown, false).unwrap();
    }

    #[test]
    fn test_assign_parameters_from_values() {
        let (mut data, _) = two_qubit_data();
        let a = Parameter::new("a");
        let b = Parameter::new("b");
        data.push(Instruction::new(rz(&b), [QubitId(0)], [])).unwrap();
        data.push(Instruction::new(rz(&a), [QubitId(1)], [])).unwrap();
        assert!(matches!(
            data.assign_parameters_from_values([1.0]),
            Err(CircuitError::ParameterCountMismatch { expected: 2, got: 1 })
        ));
        data.assign_parameters_from_values([1.0, 2.0]).unwrap();
        // `a` sorts first, so it binds to the first value.
        assert_eq!(data.data()[1].operation.params()[0].as_f64(), Some(1.0));
        assert_eq!(data.num_parameters(), 0);
    }

    #[test]
    fn test_global_phase_normalized() {
        let mut data = CircuitData::new();
        data.set_global_phase(-PI / 2.0).unwrap();
        let phase = data.global_phase().as_f64().unwrap();
        assert!((phase - 3.0 * PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_copy_empty_like() {
        let (mut data, _) = two_qubit_data();
        data.add_identifier(Var::new("a", Type::Bool).into(), IdentifierKind::Input)
            .unwrap();
        data.push(Instruction::gate(StandardGate::H, [QubitId(0)])).unwrap();

        let alike = data.copy_empty_like(VarsMode::Alike);
        assert!(alike.is_empty());
        assert_eq!(alike.qubits(), data.qubits());
        assert_eq!(alike.identifiers().num_input_vars(), 1);

        let captures = data.copy_empty_like(VarsMode::Captures);
        assert_eq!(captures.identifiers().num_captured_vars(), 1);
        assert!(data.copy_empty_like(VarsMode::Drop).identifiers().is_empty());
    }

    #[test]
    fn test_insert_front_rebuilds_table() {
        let (mut data, _) = two_qubit_data();
        let a = Parameter::new("a");
        data.push(Instruction::new(rz(&a), [QubitId(0)], [])).unwrap();
        data.insert_front(vec![Instruction::gate(StandardGate::H, [QubitId(1)])])
            .unwrap();
        assert_eq!(data.data()[0].name(), "h");
        let (indices, _) = data.parameter_table().affected([&a]);
        assert_eq!(indices, vec![1]);
    }
}
