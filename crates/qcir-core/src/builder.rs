//! Closure-based control-flow builders.
//!
//! Each builder pushes a [`ControlFlowBuilderBlock`] onto the circuit's
//! builder stack, runs the body closure against the circuit (so every
//! instruction method appends to the block), then pops the block and turns it
//! into a single control-flow instruction in the enclosing scope.
//!
//! ```rust
//! use qcir_core::{Circuit, ClassicalRegister, QubitId};
//!
//! let mut circuit = Circuit::with_size("feedback", 3, 0);
//! let cr = ClassicalRegister::new("cr", 1);
//! circuit.add_creg(cr.clone()).unwrap();
//! circuit.measure(QubitId(0), &cr).unwrap();
//! circuit
//!     .if_test((&cr, 1), |body| {
//!         body.x(QubitId(2))?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! // The `if` only spans the qubit it touches and the clbit it reads.
//! let inst = circuit.data().last().unwrap();
//! assert_eq!(inst.qubits.as_slice(), &[QubitId(2)]);
//! ```
//!
//! `break_loop` and `continue_loop` inside an `if` or `switch` within a loop
//! are buffered as placeholders: they only learn their width once the
//! enclosing loop closes.

use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use std::ops::{Deref, DerefMut};
use tracing::{debug, trace};

use crate::bit::{Clbit, ClbitId, QubitId};
use crate::circuit::Circuit;
use crate::circuit_data::CircuitData;
use crate::classical::Identifier;
use crate::control_flow::{CaseLabel, Condition, ControlFlowOp, LoopIndices, SwitchTarget};
use crate::error::{CircuitError, CircuitResult};
use crate::identifiers::{IdentifierKind, Identifiers};
use crate::instruction::Instruction;
use crate::operation::Duration;
use crate::parameter::Parameter;
use crate::register::{ClassicalRegister, Register};

const NOT_IN_LOOP: &str = "not inside a loop";
const IN_BOX: &str = "jumps cannot leave a box";

/// Bits, registers and captured identifiers touched by a block.
#[derive(Debug, Clone, Default)]
pub(crate) struct Resources {
    pub(crate) qubits: IndexSet<QubitId>,
    pub(crate) clbits: IndexSet<ClbitId>,
    pub(crate) registers: IndexSet<ClassicalRegister>,
    pub(crate) captures: IndexSet<Identifier>,
}

impl Resources {
    fn merge(&mut self, other: &Resources) {
        self.qubits.extend(other.qubits.iter().copied());
        self.clbits.extend(other.clbits.iter().copied());
        self.registers.extend(other.registers.iter().cloned());
        self.captures.extend(other.captures.iter().cloned());
    }

    /// Put bits into the order they have in the outermost circuit.
    fn sorted(mut self) -> Self {
        self.qubits.sort();
        self.clbits.sort();
        self
    }
}

/// A jump, or a branch containing one, waiting for its loop to close.
#[derive(Debug, Clone)]
pub(crate) enum Placeholder {
    Break,
    Continue,
    IfElse {
        condition: Condition,
        true_block: ControlFlowBuilderBlock,
        false_block: Option<ControlFlowBuilderBlock>,
    },
    Switch {
        target: SwitchTarget,
        cases: Vec<(Vec<CaseLabel>, ControlFlowBuilderBlock)>,
    },
}

impl Placeholder {
    fn footprint(&self) -> Resources {
        let mut out = Resources::default();
        match self {
            Placeholder::Break | Placeholder::Continue => {}
            Placeholder::IfElse {
                true_block,
                false_block,
                ..
            } => {
                out.merge(&true_block.footprint());
                if let Some(block) = false_block {
                    out.merge(&block.footprint());
                }
            }
            Placeholder::Switch { cases, .. } => {
                for (_, block) in cases {
                    out.merge(&block.footprint());
                }
            }
        }
        out
    }

    /// Build the concrete instruction spanning the whole enclosing loop.
    fn resolve(&self, resources: &Resources, root: &CircuitData) -> CircuitResult<Instruction> {
        let num_qubits = width(resources.qubits.len());
        let num_clbits = width(resources.clbits.len());
        let op = match self {
            Placeholder::Break => ControlFlowOp::BreakLoop {
                num_qubits,
                num_clbits,
            },
            Placeholder::Continue => ControlFlowOp::ContinueLoop {
                num_qubits,
                num_clbits,
            },
            Placeholder::IfElse {
                condition,
                true_block,
                false_block,
            } => {
                let true_body = true_block.build("if_body", resources, root)?;
                let false_body = false_block
                    .as_ref()
                    .map(|block| block.build("else_body", resources, root))
                    .transpose()?;
                ControlFlowOp::if_else(condition.clone(), true_body, false_body)?
            }
            Placeholder::Switch { target, cases } => {
                let cases = cases
                    .iter()
                    .map(|(labels, block)| Ok((labels.clone(), block.build("case_body", resources, root)?)))
                    .collect::<CircuitResult<Vec<_>>>()?;
                ControlFlowOp::switch(target.clone(), cases)?
            }
        };
        Ok(Instruction::new(
            op,
            resources.qubits.iter().copied(),
            resources.clbits.iter().copied(),
        ))
    }
}

#[derive(Debug, Clone)]
enum BlockInstruction {
    Concrete(Instruction),
    Placeholder(Placeholder),
}

/// Accumulator for the body of one open control-flow builder.
///
/// Instructions are buffered with operands addressed in the outermost
/// circuit; [`build`](Self::build) renumbers them onto the body's own bits.
#[derive(Debug, Clone)]
pub(crate) struct ControlFlowBuilderBlock {
    pub(crate) resources: Resources,
    pub(crate) locals: Identifiers,
    instructions: Vec<BlockInstruction>,
    pub(crate) forbidden_jump: Option<&'static str>,
}

impl ControlFlowBuilderBlock {
    /// An empty block. `forbidden_jump` gives the reason jumps are rejected,
    /// or `None` if they are allowed.
    pub(crate) fn new(forbidden_jump: Option<&'static str>) -> Self {
        Self {
            resources: Resources::default(),
            locals: Identifiers::new(),
            instructions: Vec::new(),
            forbidden_jump,
        }
    }

    /// An empty block already using the given classical resources.
    fn seeded(
        root: &CircuitData,
        clbits: &[Clbit],
        registers: &[ClassicalRegister],
        forbidden_jump: Option<&'static str>,
    ) -> CircuitResult<Self> {
        let mut block = Self::new(forbidden_jump);
        for clbit in clbits {
            block.resources.clbits.insert(root.resolve_clbit(clbit, None)?);
        }
        for register in registers {
            for clbit in register.bits() {
                block.resources.clbits.insert(root.resolve_clbit(clbit, None)?);
            }
            block.resources.registers.insert(register.clone());
        }
        Ok(block)
    }

    pub(crate) fn captures_name(&self, name: &str) -> bool {
        self.resources.captures.iter().any(|i| i.name() == name)
    }

    pub(crate) fn push_concrete(&mut self, instruction: Instruction) {
        trace!(operation = instruction.name(), "buffered instruction in scope");
        self.instructions.push(BlockInstruction::Concrete(instruction));
    }

    fn push_placeholder(&mut self, placeholder: Placeholder) {
        self.instructions
            .push(BlockInstruction::Placeholder(placeholder));
    }

    fn has_placeholders(&self) -> bool {
        self.instructions
            .iter()
            .any(|inst| matches!(inst, BlockInstruction::Placeholder(_)))
    }

    /// Everything this block and its buffered placeholders touch.
    fn footprint(&self) -> Resources {
        let mut out = self.resources.clone();
        for inst in &self.instructions {
            if let BlockInstruction::Placeholder(placeholder) = inst {
                out.merge(&placeholder.footprint());
            }
        }
        out
    }

    /// Materialize the block as a body circuit over `resources`.
    fn build(&self, name: &str, resources: &Resources, root: &CircuitData) -> CircuitResult<Circuit> {
        let mut body = Circuit::new(name);
        let mut qubit_map = FxHashMap::default();
        for &id in &resources.qubits {
            let qubit = root.qubit(id).ok_or(CircuitError::QubitIndexOutOfRange {
                index: id.0,
                num_qubits: root.num_qubits(),
            })?;
            let local = body.data.add_qubit(qubit.clone())?;
            qubit_map.insert(id, local);
        }
        let mut clbit_map = FxHashMap::default();
        for &id in &resources.clbits {
            let clbit = root.clbit(id).ok_or(CircuitError::ClbitIndexOutOfRange {
                index: id.0,
                num_clbits: root.num_clbits(),
            })?;
            let local = body.data.add_clbit(clbit.clone())?;
            clbit_map.insert(id, local);
        }
        for register in &resources.registers {
            body.data.add_creg(register.clone())?;
        }
        let mut captures = resources.captures.clone();
        captures.extend(self.footprint().captures);
        for ident in captures {
            if !self.locals.contains(&ident) {
                body.data.add_identifier(ident, IdentifierKind::Capture)?;
            }
        }
        for (ident, _) in self.locals.iter() {
            body.data
                .add_identifier(ident.clone(), IdentifierKind::Declare)?;
        }

        for inst in &self.instructions {
            let inst = match inst {
                BlockInstruction::Concrete(inst) => inst.clone(),
                BlockInstruction::Placeholder(placeholder) => placeholder.resolve(resources, root)?,
            };
            body.data.push(localize(inst, &qubit_map, &clbit_map)?)?;
        }
        Ok(body)
    }
}

fn localize(
    mut inst: Instruction,
    qubit_map: &FxHashMap<QubitId, QubitId>,
    clbit_map: &FxHashMap<ClbitId, ClbitId>,
) -> CircuitResult<Instruction> {
    for q in &mut inst.qubits {
        *q = *qubit_map.get(q).ok_or_else(|| CircuitError::Resource {
            kind: "qubit",
            bit: q.to_string(),
            operation: Some(inst.operation.name().to_string()),
        })?;
    }
    for c in &mut inst.clbits {
        *c = *clbit_map.get(c).ok_or_else(|| CircuitError::Resource {
            kind: "clbit",
            bit: c.to_string(),
            operation: Some(inst.operation.name().to_string()),
        })?;
    }
    Ok(inst)
}

fn width(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Keeps one builder block on the circuit's stack for the lifetime of a body
/// closure. Dropping the guard without [`exit`](Self::exit) discards the
/// block, so a failing or panicking body leaves nothing behind.
pub(crate) struct ScopeGuard<'a> {
    circuit: &'a mut Circuit,
    depth: usize,
}

impl<'a> ScopeGuard<'a> {
    fn enter(circuit: &'a mut Circuit, block: ControlFlowBuilderBlock) -> Self {
        let depth = circuit.builder_stack.len();
        circuit.builder_stack.push(block);
        debug!(depth = depth + 1, "entered control-flow scope");
        Self { circuit, depth }
    }

    fn exit(self) -> CircuitResult<ControlFlowBuilderBlock> {
        let expected = self.depth + 1;
        let found = self.circuit.builder_stack.len();
        if found != expected {
            return Err(CircuitError::ScopeMismatch { expected, found });
        }
        let block = self
            .circuit
            .builder_stack
            .pop()
            .ok_or(CircuitError::ScopeMismatch { expected, found })?;
        debug!(depth = expected, "left control-flow scope");
        Ok(block)
    }
}

impl Deref for ScopeGuard<'_> {
    type Target = Circuit;

    fn deref(&self) -> &Circuit {
        self.circuit
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut Circuit {
        self.circuit
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        if self.circuit.builder_stack.len() > self.depth {
            self.circuit.builder_stack.truncate(self.depth);
            debug!(depth = self.depth + 1, "discarded control-flow scope");
        }
    }
}

/// Case collector passed to the closure of [`Circuit::switch`].
pub struct SwitchCases<'a> {
    circuit: &'a mut Circuit,
    template: ControlFlowBuilderBlock,
    cases: Vec<(Vec<CaseLabel>, ControlFlowBuilderBlock)>,
}

impl SwitchCases<'_> {
    /// Add a case matching any of `labels`.
    pub fn case<L: Into<CaseLabel>>(
        &mut self,
        labels: impl IntoIterator<Item = L>,
        body: impl FnOnce(&mut Circuit) -> CircuitResult<()>,
    ) -> CircuitResult<&mut Self> {
        let labels: Vec<CaseLabel> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(CircuitError::Invalid("a switch case needs at least one label".into()));
        }
        for (i, label) in labels.iter().enumerate() {
            let seen = labels[..i].contains(label)
                || self.cases.iter().any(|(existing, _)| existing.contains(label));
            if seen {
                return Err(CircuitError::DuplicateCaseLabel(label.to_string()));
            }
        }
        let block = self.circuit.run_block(self.template.clone(), body)?;
        self.cases.push((labels, block));
        Ok(self)
    }

    /// Add the default case.
    pub fn default(
        &mut self,
        body: impl FnOnce(&mut Circuit) -> CircuitResult<()>,
    ) -> CircuitResult<&mut Self> {
        self.case([CaseLabel::Default], body)
    }
}

impl Circuit {
    // =========================================================================
    // Control-flow builders
    // =========================================================================

    /// Whether a control-flow builder is open.
    pub fn in_scope(&self) -> bool {
        !self.builder_stack.is_empty()
    }

    /// Apply `body` only if `condition` holds.
    pub fn if_test(
        &mut self,
        condition: impl Into<Condition>,
        body: impl FnOnce(&mut Circuit) -> CircuitResult<()>,
    ) -> CircuitResult<&mut Self> {
        let condition = condition.into();
        let template = self.branch_block(&condition)?;
        let true_block = self.run_block(template, body)?;
        self.finish_if(condition, true_block, None)?;
        Ok(self)
    }

    /// Apply `true_body` if `condition` holds and `false_body` otherwise.
    pub fn if_else(
        &mut self,
        condition: impl Into<Condition>,
        true_body: impl FnOnce(&mut Circuit) -> CircuitResult<()>,
        false_body: impl FnOnce(&mut Circuit) -> CircuitResult<()>,
    ) -> CircuitResult<&mut Self> {
        let condition = condition.into();
        let template = self.branch_block(&condition)?;
        let true_block = self.run_block(template.clone(), true_body)?;
        let false_block = self.run_block(template, false_body)?;
        self.finish_if(condition, true_block, Some(false_block))?;
        Ok(self)
    }

    /// Repeat `body` while `condition` holds.
    pub fn while_loop(
        &mut self,
        condition: impl Into<Condition>,
        body: impl FnOnce(&mut Circuit) -> CircuitResult<()>,
    ) -> CircuitResult<&mut Self> {
        let condition = condition.into();
        condition.validate()?;
        let (clbits, registers) = condition.classical_resources();
        self.resolve_in_scope(&clbits, &registers, &condition.identifiers())?;
        let template = ControlFlowBuilderBlock::seeded(&self.data, &clbits, &registers, None)?;
        let block = self.run_block(template, body)?;
        let resources = block.footprint().sorted();
        let body = block.build("while_body", &resources, &self.data)?;
        self.append_built(ControlFlowOp::while_loop(condition, body)?, &resources)?;
        Ok(self)
    }

    /// Run `body` once for every value of `indices`, with `loop_parameter`
    /// bound to the current value.
    pub fn for_loop(
        &mut self,
        indices: impl Into<LoopIndices>,
        loop_parameter: Option<Parameter>,
        body: impl FnOnce(&mut Circuit) -> CircuitResult<()>,
    ) -> CircuitResult<&mut Self> {
        let block = self.run_block(ControlFlowBuilderBlock::new(None), body)?;
        let resources = block.footprint().sorted();
        let body = block.build("for_body", &resources, &self.data)?;
        let op = ControlFlowOp::for_loop(indices, loop_parameter, body);
        self.append_built(op, &resources)?;
        Ok(self)
    }

    /// Dispatch on `target`; `cases` adds the case bodies.
    ///
    /// ```rust
    /// use qcir_core::{Circuit, ClassicalRegister, QubitId};
    ///
    /// let mut circuit = Circuit::with_size("dispatch", 2, 0);
    /// let cr = ClassicalRegister::new("cr", 2);
    /// circuit.add_creg(cr.clone()).unwrap();
    /// circuit
    ///     .switch(&cr, |cases| {
    ///         cases.case([0u64], |body| {
    ///             body.x(QubitId(0))?;
    ///             Ok(())
    ///         })?;
    ///         cases.default(|body| {
    ///             body.x(QubitId(1))?;
    ///             Ok(())
    ///         })?;
    ///         Ok(())
    ///     })
    ///     .unwrap();
    /// assert_eq!(circuit.count_ops()["switch_case"], 1);
    /// ```
    pub fn switch(
        &mut self,
        target: impl Into<SwitchTarget>,
        cases: impl FnOnce(&mut SwitchCases<'_>) -> CircuitResult<()>,
    ) -> CircuitResult<&mut Self> {
        let target = target.into();
        target.validate()?;
        let (clbits, registers) = target.classical_resources();
        let identifiers = match &target {
            SwitchTarget::Expr(expr) => expr.identifiers(),
            _ => vec![],
        };
        self.resolve_in_scope(&clbits, &registers, &identifiers)?;
        let forbidden = self.branch_jump_rule();
        let template = ControlFlowBuilderBlock::seeded(&self.data, &clbits, &registers, forbidden)?;

        let mut collector = SwitchCases {
            circuit: &mut *self,
            template,
            cases: Vec::new(),
        };
        cases(&mut collector)?;
        let collected = collector.cases;
        if collected.is_empty() {
            return Err(CircuitError::Invalid("switch needs at least one case".into()));
        }

        if collected.iter().any(|(_, block)| block.has_placeholders()) {
            self.push_placeholder(Placeholder::Switch {
                target,
                cases: collected,
            })?;
            return Ok(self);
        }
        let mut resources = Resources::default();
        for (_, block) in &collected {
            resources.merge(&block.footprint());
        }
        let resources = resources.sorted();
        let bodies = collected
            .iter()
            .map(|(labels, block)| Ok((labels.clone(), block.build("case_body", &resources, &self.data)?)))
            .collect::<CircuitResult<Vec<_>>>()?;
        self.append_built(ControlFlowOp::switch(target, bodies)?, &resources)?;
        Ok(self)
    }

    /// Group `body` into a box, optionally with a fixed or stretch duration.
    pub fn box_block(
        &mut self,
        duration: Option<Duration>,
        body: impl FnOnce(&mut Circuit) -> CircuitResult<()>,
    ) -> CircuitResult<&mut Self> {
        if let Some(duration) = &duration {
            duration.validate()?;
            let identifiers = duration.expr().map(|e| e.identifiers()).unwrap_or_default();
            self.resolve_in_scope(&[], &[], &identifiers)?;
        }
        let block = self.run_block(ControlFlowBuilderBlock::new(Some(IN_BOX)), body)?;
        let resources = block.footprint().sorted();
        let body = block.build("box_body", &resources, &self.data)?;
        self.append_built(ControlFlowOp::box_op(body, duration)?, &resources)?;
        Ok(self)
    }

    /// Leave the innermost loop.
    ///
    /// Outside any builder this appends a `break_loop` over every bit, for
    /// circuits that are assembled into loop bodies by hand.
    pub fn break_loop(&mut self) -> CircuitResult<&mut Self> {
        self.jump(Placeholder::Break, "break_loop")?;
        Ok(self)
    }

    /// Skip to the next iteration of the innermost loop.
    pub fn continue_loop(&mut self) -> CircuitResult<&mut Self> {
        self.jump(Placeholder::Continue, "continue_loop")?;
        Ok(self)
    }

    fn jump(&mut self, placeholder: Placeholder, kind: &'static str) -> CircuitResult<()> {
        let Some(block) = self.builder_stack.last_mut() else {
            let num_qubits = width(self.num_qubits());
            let num_clbits = width(self.num_clbits());
            let op = match placeholder {
                Placeholder::Break => ControlFlowOp::BreakLoop {
                    num_qubits,
                    num_clbits,
                },
                _ => ControlFlowOp::ContinueLoop {
                    num_qubits,
                    num_clbits,
                },
            };
            let inst = Instruction::new(
                op,
                (0..num_qubits).map(QubitId),
                (0..num_clbits).map(ClbitId),
            );
            return self.data.push(inst);
        };
        if let Some(reason) = block.forbidden_jump {
            return Err(CircuitError::JumpOutsideLoop { kind, reason });
        }
        block.push_placeholder(placeholder);
        Ok(())
    }

    /// Jump rule for an `if`/`switch` body opened in the current scope.
    fn branch_jump_rule(&self) -> Option<&'static str> {
        match self.builder_stack.last() {
            Some(block) => block.forbidden_jump,
            None => Some(NOT_IN_LOOP),
        }
    }

    /// Validate a branch condition in the current scope and seed a block
    /// with what it reads.
    fn branch_block(&mut self, condition: &Condition) -> CircuitResult<ControlFlowBuilderBlock> {
        condition.validate()?;
        let (clbits, registers) = condition.classical_resources();
        self.resolve_in_scope(&clbits, &registers, &condition.identifiers())?;
        let forbidden = self.branch_jump_rule();
        ControlFlowBuilderBlock::seeded(&self.data, &clbits, &registers, forbidden)
    }

    fn resolve_in_scope(
        &mut self,
        clbits: &[Clbit],
        registers: &[ClassicalRegister],
        identifiers: &[Identifier],
    ) -> CircuitResult<()> {
        self.with_scope(|scope| {
            scope.resolve_classical_resource(clbits, registers)?;
            for ident in identifiers {
                scope.use_identifier(ident)?;
            }
            Ok(())
        })
    }

    fn run_block(
        &mut self,
        block: ControlFlowBuilderBlock,
        body: impl FnOnce(&mut Circuit) -> CircuitResult<()>,
    ) -> CircuitResult<ControlFlowBuilderBlock> {
        let mut guard = ScopeGuard::enter(self, block);
        body(&mut *guard)?;
        guard.exit()
    }

    fn finish_if(
        &mut self,
        condition: Condition,
        true_block: ControlFlowBuilderBlock,
        false_block: Option<ControlFlowBuilderBlock>,
    ) -> CircuitResult<()> {
        let placeholders = true_block.has_placeholders()
            || false_block
                .as_ref()
                .is_some_and(ControlFlowBuilderBlock::has_placeholders);
        if placeholders {
            return self.push_placeholder(Placeholder::IfElse {
                condition,
                true_block,
                false_block,
            });
        }
        let mut resources = true_block.footprint();
        if let Some(block) = &false_block {
            resources.merge(&block.footprint());
        }
        let resources = resources.sorted();
        let true_body = true_block.build("if_body", &resources, &self.data)?;
        let false_body = false_block
            .map(|block| block.build("else_body", &resources, &self.data))
            .transpose()?;
        let op = ControlFlowOp::if_else(condition, true_body, false_body)?;
        self.append_built(op, &resources)
    }

    fn push_placeholder(&mut self, placeholder: Placeholder) -> CircuitResult<()> {
        let block = self
            .builder_stack
            .last_mut()
            .ok_or(CircuitError::JumpOutsideLoop {
                kind: "break_loop",
                reason: NOT_IN_LOOP,
            })?;
        trace!("buffered branch containing a jump");
        block.push_placeholder(placeholder);
        Ok(())
    }

    fn append_built(&mut self, op: ControlFlowOp, resources: &Resources) -> CircuitResult<()> {
        debug!(
            operation = op.name(),
            qubits = resources.qubits.len(),
            clbits = resources.clbits.len(),
            captures = resources.captures.len(),
            "finalized control-flow block"
        );
        let inst = Instruction::new(
            op,
            resources.qubits.iter().copied(),
            resources.clbits.iter().copied(),
        );
        self.with_scope(|scope| scope.append(inst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit::QubitId;
    use crate::classical::{Expr, Type, Var};
    use crate::operation::Operation;

    fn circuit_with_creg(num_qubits: u32) -> (Circuit, ClassicalRegister) {
        let mut circuit = Circuit::with_size("c", num_qubits, 0);
        let cr = ClassicalRegister::new("cr", 1);
        circuit.add_creg(cr.clone()).unwrap();
        (circuit, cr)
    }

    #[test]
    fn test_if_test_footprint() {
        let (mut circuit, cr) = circuit_with_creg(3);
        circuit
            .if_test((&cr.bits()[0], true), |body| {
                body.x(QubitId(2))?;
                Ok(())
            })
            .unwrap();
        let inst = &circuit.data()[0];
        assert_eq!(inst.name(), "if_else");
        assert_eq!(inst.qubits.as_slice(), &[QubitId(2)]);
        assert_eq!(inst.clbits.as_slice(), &[ClbitId(0)]);
        let body = inst.operation.blocks()[0];
        assert_eq!(body.num_qubits(), 1);
        assert_eq!(body.data()[0].qubits.as_slice(), &[QubitId(0)]);
        assert!(!circuit.in_scope());
    }

    #[test]
    fn test_if_else_union_of_resources() {
        let (mut circuit, cr) = circuit_with_creg(3);
        circuit
            .if_else(
                (&cr, 1),
                |body| {
                    body.x(QubitId(0))?;
                    Ok(())
                },
                |body| {
                    body.z(QubitId(2))?;
                    Ok(())
                },
            )
            .unwrap();
        let inst = &circuit.data()[0];
        assert_eq!(inst.qubits.as_slice(), &[QubitId(0), QubitId(2)]);
        let blocks = inst.operation.blocks();
        assert_eq!(blocks[0].num_qubits(), 2);
        assert_eq!(blocks[1].num_qubits(), 2);
        assert_eq!(blocks[1].data()[0].qubits.as_slice(), &[QubitId(1)]);
        assert_eq!(blocks[0].cregs().count(), 1);
    }

    #[test]
    fn test_failed_body_leaves_nothing() {
        let (mut circuit, cr) = circuit_with_creg(1);
        let err = circuit
            .if_test((&cr, 1), |body| {
                body.x(QubitId(0))?;
                body.x(QubitId(7))?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, CircuitError::QubitIndexOutOfRange { .. }));
        assert_eq!(circuit.size(), 0);
        assert!(!circuit.in_scope());
    }

    #[test]
    fn test_break_outside_loop() {
        let (mut circuit, cr) = circuit_with_creg(1);
        let err = circuit
            .if_test((&cr, 1), |body| {
                body.break_loop()?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, CircuitError::JumpOutsideLoop { kind: "break_loop", .. }));
    }

    #[test]
    fn test_break_in_box_rejected() {
        let mut circuit = Circuit::with_size("c", 1, 0);
        let err = circuit
            .for_loop(0..2i64, None, |body| {
                body.box_block(None, |inner| {
                    inner.continue_loop()?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(
            err,
            CircuitError::JumpOutsideLoop {
                reason: IN_BOX,
                ..
            }
        ));
    }

    #[test]
    fn test_placeholder_resolves_to_loop_width() {
        let (mut circuit, cr) = circuit_with_creg(3);
        circuit
            .while_loop((&cr, 1), |body| {
                body.h(QubitId(0))?;
                body.if_test((&cr, 0), |inner| {
                    inner.x(QubitId(1))?;
                    inner.break_loop()?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap();

        let inst = &circuit.data()[0];
        assert_eq!(inst.name(), "while_loop");
        assert_eq!(inst.qubits.as_slice(), &[QubitId(0), QubitId(1)]);
        let loop_body = inst.operation.blocks()[0];
        let if_inst = &loop_body.data()[1];
        assert_eq!(if_inst.name(), "if_else");
        // The branch was widened to the whole loop.
        assert_eq!(if_inst.qubits.len(), 2);
        let if_body = if_inst.operation.blocks()[0];
        let jump = &if_body.data()[1];
        assert!(matches!(
            jump.operation,
            Operation::ControlFlow(ControlFlowOp::BreakLoop {
                num_qubits: 2,
                num_clbits: 1
            })
        ));
    }

    #[test]
    fn test_top_level_break_spans_circuit() {
        let mut circuit = Circuit::with_size("body", 2, 1);
        circuit.break_loop().unwrap();
        assert_eq!(circuit.data()[0].qubits.len(), 2);
        assert_eq!(circuit.data()[0].clbits.len(), 1);
    }

    #[test]
    fn test_switch_cases() {
        let mut circuit = Circuit::with_size("c", 2, 0);
        let cr = ClassicalRegister::new("cr", 2);
        circuit.add_creg(cr.clone()).unwrap();
        circuit
            .switch(&cr, |cases| {
                cases.case([0u64, 1], |body| {
                    body.x(QubitId(0))?;
                    Ok(())
                })?;
                let err = cases
                    .case([1u64], |_| Ok(()))
                    .err()
                    .map(|e| matches!(e, CircuitError::DuplicateCaseLabel(_)));
                assert_eq!(err, Some(true));
                cases.default(|body| {
                    body.x(QubitId(1))?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap();
        let inst = &circuit.data()[0];
        assert_eq!(inst.operation.blocks().len(), 2);
        assert_eq!(inst.qubits.len(), 2);
        assert_eq!(inst.clbits.len(), 2);
    }

    #[test]
    fn test_for_loop_parameter_is_bound() {
        let mut circuit = Circuit::with_size("c", 1, 0);
        let i = Parameter::new("i");
        let theta = Parameter::new("theta");
        circuit
            .for_loop(0..4i64, Some(i.clone()), |body| {
                body.rx(&i, QubitId(0))?;
                body.rz(&theta, QubitId(0))?;
                Ok(())
            })
            .unwrap();
        assert_eq!(circuit.parameters(), &[theta]);
    }

    #[test]
    fn test_nested_capture_propagates() {
        let (mut circuit, cr) = circuit_with_creg(1);
        let flag = Var::new("flag", Type::Bool);
        circuit.add_input(flag.clone()).unwrap();
        circuit
            .for_loop(0..2i64, None, |outer| {
                outer.if_test((&cr, 1), |inner| {
                    inner.store(&flag, false)?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap();

        let loop_body = circuit.data()[0].operation.blocks()[0];
        let ident = Identifier::Var(flag);
        assert_eq!(
            loop_body.identifiers().kind_of(&ident),
            Some(IdentifierKind::Capture)
        );
        let if_body = loop_body.data()[0].operation.blocks()[0];
        assert_eq!(if_body.identifiers().kind_of(&ident), Some(IdentifierKind::Capture));
    }

    #[test]
    fn test_local_var_stays_local() {
        let mut circuit = Circuit::with_size("c", 1, 0);
        circuit
            .box_block(None, |body| {
                let local = Var::new("tmp", Type::Uint(4));
                body.add_var(local, 3u64)?;
                Ok(())
            })
            .unwrap();
        assert!(circuit.identifiers().is_empty());
        let body = circuit.data()[0].operation.blocks()[0];
        assert_eq!(body.identifiers().num_declared_vars(), 1);
    }

    #[test]
    fn test_undeclared_identifier_in_body() {
        let mut circuit = Circuit::with_size("c", 1, 0);
        let ghost = Var::new("ghost", Type::Bool);
        let err = circuit
            .while_loop(Expr::from(&ghost), |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, CircuitError::UndeclaredIdentifier { .. }));
    }
}
