//! The target that instruction-adding methods append to.
//!
//! Outside control flow this is the circuit itself. While a control-flow
//! builder is open it is the innermost builder block, which records what the
//! appended instructions touch so the finished operation can be sized to fit.

use crate::bit::{Clbit, ClbitId};
use crate::builder::ControlFlowBuilderBlock;
use crate::circuit::Circuit;
use crate::circuit_data::CircuitData;
use crate::classical::{Identifier, Stretch, Var};
use crate::error::{CircuitError, CircuitResult};
use crate::identifiers::IdentifierKind;
use crate::instruction::Instruction;
use crate::register::{ClassicalRegister, Register};

/// Append and identifier-resolution interface shared by the circuit and its
/// open builder blocks.
pub trait CircuitScopeInterface {
    /// Append an instruction whose operands are positions in the outermost
    /// circuit.
    fn append(&mut self, instruction: Instruction) -> CircuitResult<()>;

    /// Make sure the given clbits and registers exist and are tracked by
    /// this scope.
    fn resolve_classical_resource(
        &mut self,
        clbits: &[Clbit],
        registers: &[ClassicalRegister],
    ) -> CircuitResult<()>;

    /// Declare a variable without initializing it.
    fn add_uninitialized_var(&mut self, var: Var) -> CircuitResult<()>;

    /// Declare a stretch.
    fn add_stretch(&mut self, stretch: Stretch) -> CircuitResult<()>;

    /// The identifier called `name` visible from this scope.
    fn get_identifier(&self, name: &str) -> Option<Identifier>;

    /// Record a use of `identifier`, capturing it if it comes from an
    /// enclosing scope.
    fn use_identifier(&mut self, identifier: &Identifier) -> CircuitResult<()>;

    /// Check that `identifier` could be declared here, without declaring it.
    fn check_declaration(&self, identifier: &Identifier) -> CircuitResult<()>;

    /// Check that `instruction` could be appended, without recording
    /// anything. Identifiers in `pending` count as declared.
    fn check_append(&self, instruction: &Instruction, pending: &[Identifier]) -> CircuitResult<()>;

    /// The variable called `name` visible from this scope.
    fn get_var(&self, name: &str) -> Option<Var> {
        self.get_identifier(name).and_then(|i| i.as_var().cloned())
    }

    /// The stretch called `name` visible from this scope.
    fn get_stretch(&self, name: &str) -> Option<Stretch> {
        self.get_identifier(name).and_then(|i| i.as_stretch().cloned())
    }

    /// Record a use of `var`.
    fn use_var(&mut self, var: &Var) -> CircuitResult<()> {
        self.use_identifier(&Identifier::Var(var.clone()))
    }

    /// Record a use of `stretch`.
    fn use_stretch(&mut self, stretch: &Stretch) -> CircuitResult<()> {
        self.use_identifier(&Identifier::Stretch(stretch.clone()))
    }
}

/// The circuit itself, when no builder is open.
pub(crate) struct OuterScope<'a> {
    data: &'a mut CircuitData,
}

impl CircuitScopeInterface for OuterScope<'_> {
    fn append(&mut self, instruction: Instruction) -> CircuitResult<()> {
        self.data.push(instruction)
    }

    fn resolve_classical_resource(
        &mut self,
        clbits: &[Clbit],
        registers: &[ClassicalRegister],
    ) -> CircuitResult<()> {
        check_classical_resource(self.data, clbits, registers)
    }

    fn add_uninitialized_var(&mut self, var: Var) -> CircuitResult<()> {
        self.data
            .add_identifier(Identifier::Var(var), IdentifierKind::Declare)
    }

    fn add_stretch(&mut self, stretch: Stretch) -> CircuitResult<()> {
        self.data
            .add_identifier(Identifier::Stretch(stretch), IdentifierKind::Declare)
    }

    fn get_identifier(&self, name: &str) -> Option<Identifier> {
        self.data.get_identifier(name).cloned()
    }

    fn use_identifier(&mut self, identifier: &Identifier) -> CircuitResult<()> {
        check_in_stack(&[], self.data, identifier)
    }

    fn check_declaration(&self, identifier: &Identifier) -> CircuitResult<()> {
        self.data
            .check_identifier(identifier, IdentifierKind::Declare)
    }

    fn check_append(&self, instruction: &Instruction, pending: &[Identifier]) -> CircuitResult<()> {
        self.data.check_with(instruction, pending)
    }
}

/// The innermost open builder block, with the circuit underneath it.
pub(crate) struct BlockScope<'a> {
    root: &'a CircuitData,
    stack: &'a mut [ControlFlowBuilderBlock],
}

impl BlockScope<'_> {
    fn top(&mut self) -> CircuitResult<&mut ControlFlowBuilderBlock> {
        self.stack
            .last_mut()
            .ok_or(CircuitError::ActiveScope("no control-flow scope is open"))
    }

    fn is_visible(&self, name: &str) -> bool {
        self.root.identifiers().contains_name(name)
            || self.root.get_creg(name).is_some()
            || self
                .stack
                .iter()
                .any(|block| block.locals.contains_name(name) || block.captures_name(name))
    }

    fn add_local(&mut self, identifier: Identifier) -> CircuitResult<()> {
        self.check_declaration(&identifier)?;
        self.top()?
            .locals
            .add(identifier, IdentifierKind::Declare)
    }

    /// Positions of every clbit named by `clbits` and `registers`.
    fn classical_ids(
        &self,
        clbits: &[Clbit],
        registers: &[ClassicalRegister],
    ) -> CircuitResult<Vec<ClbitId>> {
        check_classical_resource(self.root, clbits, registers)?;
        let mut ids = Vec::new();
        for clbit in clbits {
            ids.push(self.root.resolve_clbit(clbit, None)?);
        }
        for register in registers {
            for clbit in register.bits() {
                ids.push(self.root.resolve_clbit(clbit, None)?);
            }
        }
        Ok(ids)
    }
}

/// Clbits and registers an operation needs from its scope, including the
/// registers its bodies declare.
fn classical_footprint(instruction: &Instruction) -> (Vec<Clbit>, Vec<ClassicalRegister>) {
    let operation = &instruction.operation;
    let (clbits, mut registers) = operation.classical_resources();
    for block in operation.blocks() {
        registers.extend(block.cregs().cloned());
    }
    (clbits, registers)
}

impl CircuitScopeInterface for BlockScope<'_> {
    fn append(&mut self, instruction: Instruction) -> CircuitResult<()> {
        self.check_append(&instruction, &[])?;
        for ident in instruction.operation.identifiers() {
            self.use_identifier(&ident)?;
        }
        let (clbits, registers) = classical_footprint(&instruction);
        self.resolve_classical_resource(&clbits, &registers)?;

        let top = self.top()?;
        top.resources.qubits.extend(instruction.qubits.iter().copied());
        top.resources.clbits.extend(instruction.clbits.iter().copied());
        top.push_concrete(instruction);
        Ok(())
    }

    fn resolve_classical_resource(
        &mut self,
        clbits: &[Clbit],
        registers: &[ClassicalRegister],
    ) -> CircuitResult<()> {
        let ids = self.classical_ids(clbits, registers)?;
        let top = self.top()?;
        top.resources.clbits.extend(ids);
        top.resources.registers.extend(registers.iter().cloned());
        Ok(())
    }

    fn add_uninitialized_var(&mut self, var: Var) -> CircuitResult<()> {
        self.add_local(Identifier::Var(var))
    }

    fn add_stretch(&mut self, stretch: Stretch) -> CircuitResult<()> {
        self.add_local(Identifier::Stretch(stretch))
    }

    fn get_identifier(&self, name: &str) -> Option<Identifier> {
        lookup_identifier(self.stack, self.root, name)
    }

    fn use_identifier(&mut self, identifier: &Identifier) -> CircuitResult<()> {
        check_in_stack(self.stack, self.root, identifier)?;
        for block in self.stack.iter_mut().rev() {
            if block.locals.contains(identifier) || block.resources.captures.contains(identifier) {
                break;
            }
            block.resources.captures.insert(identifier.clone());
        }
        Ok(())
    }

    fn check_declaration(&self, identifier: &Identifier) -> CircuitResult<()> {
        if self.is_visible(identifier.name()) {
            return Err(CircuitError::IdentifierShadowing {
                name: identifier.name().to_string(),
            });
        }
        match self.stack.last() {
            Some(top) => top.locals.check_add(identifier, IdentifierKind::Declare),
            None => Err(CircuitError::ActiveScope("no control-flow scope is open")),
        }
    }

    fn check_append(&self, instruction: &Instruction, pending: &[Identifier]) -> CircuitResult<()> {
        self.root.check_operands(instruction)?;
        for ident in instruction.operation.identifiers() {
            if !pending.contains(&ident) {
                check_in_stack(self.stack, self.root, &ident)?;
            }
        }
        let (clbits, registers) = classical_footprint(instruction);
        self.classical_ids(&clbits, &registers)?;
        Ok(())
    }
}

/// The identifier called `name` seen from the innermost block of `stack`:
/// block locals and captures first, then the circuit itself.
pub(crate) fn lookup_identifier(
    stack: &[ControlFlowBuilderBlock],
    root: &CircuitData,
    name: &str,
) -> Option<Identifier> {
    for block in stack.iter().rev() {
        if let Some(ident) = block.locals.get(name) {
            return Some(ident.clone());
        }
        if let Some(ident) = block.resources.captures.iter().find(|i| i.name() == name) {
            return Some(ident.clone());
        }
    }
    root.get_identifier(name).cloned()
}

/// Check that `identifier` resolves from the innermost block outwards
/// without being shadowed by a same-named local on the way.
fn check_in_stack(
    stack: &[ControlFlowBuilderBlock],
    root: &CircuitData,
    identifier: &Identifier,
) -> CircuitResult<()> {
    for block in stack.iter().rev() {
        if block.locals.contains(identifier) || block.resources.captures.contains(identifier) {
            return Ok(());
        }
        if block.locals.contains_name(identifier.name()) {
            return Err(CircuitError::IdentifierShadowing {
                name: identifier.name().to_string(),
            });
        }
    }
    if root.has_identifier(identifier) {
        Ok(())
    } else {
        Err(CircuitError::UndeclaredIdentifier {
            name: identifier.name().to_string(),
        })
    }
}

fn check_classical_resource(
    data: &CircuitData,
    clbits: &[Clbit],
    registers: &[ClassicalRegister],
) -> CircuitResult<()> {
    for clbit in clbits {
        data.find_clbit(clbit)?;
    }
    for register in registers {
        if !data.has_creg(register) {
            return Err(CircuitError::NotFound {
                kind: ClassicalRegister::KIND,
                name: register.name().to_string(),
            });
        }
    }
    Ok(())
}

impl Circuit {
    /// Run `f` against the active scope: the innermost open builder block, or
    /// the circuit itself.
    pub(crate) fn with_scope<T>(
        &mut self,
        f: impl FnOnce(&mut dyn CircuitScopeInterface) -> CircuitResult<T>,
    ) -> CircuitResult<T> {
        if self.builder_stack.is_empty() {
            f(&mut OuterScope {
                data: &mut self.data,
            })
        } else {
            f(&mut BlockScope {
                root: &self.data,
                stack: &mut self.builder_stack,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit::QubitId;
    use crate::classical::Type;
    use crate::operation::{Operation, StandardGate, Store};

    #[test]
    fn test_outer_scope_appends_directly() {
        let mut circuit = Circuit::with_size("c", 1, 0);
        circuit
            .with_scope(|scope| scope.append(Instruction::gate(StandardGate::H, [QubitId(0)])))
            .unwrap();
        assert_eq!(circuit.size(), 1);
    }

    #[test]
    fn test_outer_scope_identifier_lookup() {
        let mut circuit = Circuit::new("c");
        let a = Var::new("a", Type::Bool);
        circuit
            .with_scope(|scope| scope.add_uninitialized_var(a.clone()))
            .unwrap();
        let found = circuit.with_scope(|scope| Ok(scope.get_var("a"))).unwrap();
        assert_eq!(found, Some(a.clone()));
        assert!(
            circuit
                .with_scope(|scope| scope.use_var(&Var::new("a", Type::Bool)))
                .is_err()
        );
    }

    #[test]
    fn test_block_scope_captures_through_stack() {
        let mut circuit = Circuit::with_size("c", 1, 0);
        let a = Var::new("a", Type::Bool);
        circuit.add_input(a.clone()).unwrap();
        circuit.builder_stack.push(ControlFlowBuilderBlock::new(None));
        circuit.builder_stack.push(ControlFlowBuilderBlock::new(None));
        circuit.with_scope(|scope| scope.use_var(&a)).unwrap();
        let ident = Identifier::Var(a);
        assert!(circuit.builder_stack[0].resources.captures.contains(&ident));
        assert!(circuit.builder_stack[1].resources.captures.contains(&ident));
    }

    #[test]
    fn test_block_scope_check_records_nothing() {
        let mut circuit = Circuit::with_size("c", 1, 1);
        let a = Var::new("a", Type::Bool);
        circuit.add_input(a.clone()).unwrap();
        circuit.builder_stack.push(ControlFlowBuilderBlock::new(None));
        let store = Instruction::new(Store::new(&a, true).unwrap(), [], []);
        circuit
            .with_scope(|scope| scope.check_append(&store, &[]))
            .unwrap();
        assert!(circuit.builder_stack[0].resources.captures.is_empty());

        // A failing append leaves the captures alone too.
        let stray = Instruction::new(Store::new(&a, &Clbit::new()).unwrap(), [], []);
        let err = circuit.with_scope(|scope| scope.append(stray)).unwrap_err();
        assert!(matches!(err, CircuitError::NotFound { .. }));
        assert!(circuit.builder_stack[0].resources.captures.is_empty());
        assert!(circuit.builder_stack[0].resources.clbits.is_empty());

        circuit.with_scope(|scope| scope.append(store)).unwrap();
        assert!(circuit.builder_stack[0].resources.captures.contains(&Identifier::Var(a)));
    }

    #[test]
    fn test_block_scope_rejects_shadowing_local() {
        let mut circuit = Circuit::with_size("c", 1, 0);
        circuit.add_input(Var::new("a", Type::Bool)).unwrap();
        circuit.builder_stack.push(ControlFlowBuilderBlock::new(None));
        let err = circuit
            .with_scope(|scope| scope.add_uninitialized_var(Var::new("a", Type::Uint(2))))
            .unwrap_err();
        assert!(matches!(err, CircuitError::IdentifierShadowing { .. }));
    }

    #[test]
    fn test_block_scope_records_footprint() {
        let mut circuit = Circuit::with_size("c", 3, 1);
        circuit.builder_stack.push(ControlFlowBuilderBlock::new(None));
        circuit
            .with_scope(|scope| {
                scope.append(Instruction::new(
                    Operation::Measure,
                    [QubitId(2)],
                    [crate::bit::ClbitId(0)],
                ))
            })
            .unwrap();
        let block = &circuit.builder_stack[0];
        assert_eq!(block.resources.qubits.iter().copied().collect::<Vec<_>>(), vec![QubitId(2)]);
        assert_eq!(block.resources.clbits.len(), 1);
        // Nothing reached the circuit itself yet.
        assert_eq!(circuit.size(), 0);
    }
}
