//! Composing, tensoring and wrapping circuits.
//!
//! [`Circuit::compose`] splices another circuit's instructions into this one
//! under a bit map and an identifier map. Everything that can fail is checked
//! before the destination is touched.
//!
//! ```rust
//! use qcir_core::{Circuit, ComposeOptions, QubitId};
//!
//! let mut bell = Circuit::with_size("bell", 2, 0);
//! bell.h(QubitId(0)).unwrap().cx(QubitId(0), QubitId(1)).unwrap();
//!
//! let mut wide = Circuit::with_size("wide", 3, 0);
//! wide.compose(&bell, ComposeOptions::new().with_qubits([2u32, 0])).unwrap();
//! assert_eq!(wide.data()[1].qubits.as_slice(), &[QubitId(2), QubitId(0)]);
//! ```
//!
//! Clbits inside nested control-flow bodies keep their source identity: only
//! identifiers are renamed inside bodies.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, instrument, trace};

use crate::bit::{Clbit, ClbitId, QubitId};
use crate::circuit::Circuit;
use crate::classical::{Expr, Identifier};
use crate::error::{CircuitError, CircuitResult};
use crate::identifiers::{IdentifierKind, VarsMode};
use crate::instruction::Instruction;
use crate::operation::{CustomOp, Duration, Operation};
use crate::parameter::ParameterExpression;
use crate::register::{ClassicalRegister, NameSequence, Register};

type IdentifierMap = FxHashMap<Identifier, Identifier>;

/// What a remapped identifier becomes.
#[derive(Debug, Clone, PartialEq)]
pub enum RemapTarget {
    /// A fresh identifier of the same kind and type under this name.
    Name(String),
    /// This exact identifier. Kind and type must match.
    Identifier(Identifier),
}

/// Renames applied to the source's identifiers during compose.
///
/// Lookups by identifier take precedence over lookups by name.
#[derive(Debug, Clone, Default)]
pub struct VarRemap {
    by_name: FxHashMap<String, RemapTarget>,
    by_identifier: FxHashMap<Identifier, RemapTarget>,
}

impl VarRemap {
    /// Create an empty remap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Give the identifier called `from` the name `to`.
    #[must_use]
    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.by_name.insert(from.into(), RemapTarget::Name(to.into()));
        self
    }

    /// Replace the identifier called `from` with `to`.
    #[must_use]
    pub fn replace(mut self, from: impl Into<String>, to: impl Into<Identifier>) -> Self {
        self.by_name
            .insert(from.into(), RemapTarget::Identifier(to.into()));
        self
    }

    /// Give exactly this identifier the name `to`.
    #[must_use]
    pub fn rename_identifier(mut self, from: impl Into<Identifier>, to: impl Into<String>) -> Self {
        self.by_identifier
            .insert(from.into(), RemapTarget::Name(to.into()));
        self
    }

    /// Replace exactly this identifier with `to`.
    #[must_use]
    pub fn replace_identifier(mut self, from: impl Into<Identifier>, to: impl Into<Identifier>) -> Self {
        self.by_identifier
            .insert(from.into(), RemapTarget::Identifier(to.into()));
        self
    }

    /// Whether no renames are registered.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty() && self.by_identifier.is_empty()
    }

    fn lookup(&self, identifier: &Identifier) -> Option<&RemapTarget> {
        self.by_identifier
            .get(identifier)
            .or_else(|| self.by_name.get(identifier.name()))
    }

    fn resolve(&self, identifier: &Identifier) -> CircuitResult<Identifier> {
        match self.lookup(identifier) {
            None => Ok(identifier.clone()),
            Some(RemapTarget::Name(name)) if name == identifier.name() => Ok(identifier.clone()),
            Some(RemapTarget::Name(name)) => Ok(identifier.renamed(name)),
            Some(RemapTarget::Identifier(target)) => {
                if target.kind_name() != identifier.kind_name() {
                    return Err(CircuitError::IdentifierKindMismatch {
                        name: identifier.name().to_string(),
                        expected: identifier.kind_name(),
                        got: target.kind_name(),
                    });
                }
                if target.ty() != identifier.ty() {
                    return Err(CircuitError::TypeMismatch {
                        name: identifier.name().to_string(),
                        expected: identifier.ty(),
                        got: target.ty(),
                    });
                }
                Ok(target.clone())
            }
        }
    }
}

/// Options for [`Circuit::compose`].
#[derive(Debug, Clone, Default)]
pub struct ComposeOptions {
    /// Destination qubits for the source's qubits, in order.
    pub qubits: Option<Vec<QubitId>>,
    /// Destination clbits for the source's clbits, in order.
    pub clbits: Option<Vec<ClbitId>>,
    /// Insert before the existing instructions.
    pub front: bool,
    /// Append the source as one custom instruction.
    pub wrap: bool,
    /// Renames for the source's identifiers.
    pub var_remap: VarRemap,
    /// Unify the source's captures with existing destination identifiers.
    pub inline_captures: bool,
}

impl ComposeOptions {
    /// Default options: low bits, appended at the back.
    pub fn new() -> Self {
        Self::default()
    }

    /// Target these destination qubits.
    #[must_use]
    pub fn with_qubits(mut self, qubits: impl IntoIterator<Item = impl Into<QubitId>>) -> Self {
        self.qubits = Some(qubits.into_iter().map(Into::into).collect());
        self
    }

    /// Target these destination clbits.
    #[must_use]
    pub fn with_clbits(mut self, clbits: impl IntoIterator<Item = impl Into<ClbitId>>) -> Self {
        self.clbits = Some(clbits.into_iter().map(Into::into).collect());
        self
    }

    /// Set whether to insert at the front.
    #[must_use]
    pub fn with_front(mut self, front: bool) -> Self {
        self.front = front;
        self
    }

    /// Set whether to wrap the source into one instruction.
    #[must_use]
    pub fn with_wrap(mut self, wrap: bool) -> Self {
        self.wrap = wrap;
        self
    }

    /// Set the identifier renames.
    #[must_use]
    pub fn with_var_remap(mut self, var_remap: VarRemap) -> Self {
        self.var_remap = var_remap;
        self
    }

    /// Set whether captures are unified with destination identifiers.
    #[must_use]
    pub fn with_inline_captures(mut self, inline_captures: bool) -> Self {
        self.inline_captures = inline_captures;
        self
    }
}

/// Rewrites classical leaves of the source's top-level records.
struct ClassicalRemap<'a> {
    identifiers: &'a IdentifierMap,
    clbits: FxHashMap<Clbit, Clbit>,
    dest_cregs: Vec<ClassicalRegister>,
    registers: FxHashMap<ClassicalRegister, ClassicalRegister>,
    aliases: Vec<ClassicalRegister>,
    names: NameSequence,
    taken: FxHashSet<String>,
}

impl ClassicalRemap<'_> {
    fn leaf(&mut self, expr: &Expr) -> CircuitResult<Option<Expr>> {
        match expr {
            Expr::Clbit(bit) => Ok(Some(Expr::Clbit(self.clbit(bit)?))),
            Expr::Register(register) => Ok(Some(Expr::Register(self.register(register)?))),
            _ => Ok(rename_leaf(self.identifiers, expr)),
        }
    }

    fn clbit(&self, bit: &Clbit) -> CircuitResult<Clbit> {
        self.clbits
            .get(bit)
            .cloned()
            .ok_or_else(|| CircuitError::Resource {
                kind: Clbit::KIND,
                bit: bit.to_string(),
                operation: None,
            })
    }

    /// The destination register over the mapped bits, creating an alias
    /// register if no existing one matches.
    fn register(&mut self, register: &ClassicalRegister) -> CircuitResult<ClassicalRegister> {
        if let Some(mapped) = self.registers.get(register) {
            return Ok(mapped.clone());
        }
        let bits = register
            .bits()
            .iter()
            .map(|bit| self.clbit(bit))
            .collect::<CircuitResult<Vec<_>>>()?;
        let existing = self
            .dest_cregs
            .iter()
            .chain(&self.aliases)
            .find(|r| r.bits() == bits.as_slice())
            .cloned();
        let mapped = match existing {
            Some(r) => r,
            None => {
                let Self { names, taken, .. } = self;
                let name = names.fresh_name(|n| taken.contains(n));
                trace!(source = register.name(), alias = %name, "synthesized alias register");
                taken.insert(name.clone());
                let alias = ClassicalRegister::from_bits(name, bits)?;
                self.aliases.push(alias.clone());
                alias
            }
        };
        self.registers.insert(register.clone(), mapped.clone());
        Ok(mapped)
    }
}

fn rename_leaf(map: &IdentifierMap, expr: &Expr) -> Option<Expr> {
    match expr {
        Expr::Var(var) => match map.get(&Identifier::Var(var.clone())) {
            Some(Identifier::Var(mapped)) if mapped != var => Some(Expr::Var(mapped.clone())),
            _ => None,
        },
        Expr::Stretch(stretch) => match map.get(&Identifier::Stretch(stretch.clone())) {
            Some(Identifier::Stretch(mapped)) if mapped != stretch => {
                Some(Expr::Stretch(mapped.clone()))
            }
            _ => None,
        },
        _ => None,
    }
}

fn renames_any(map: &IdentifierMap) -> bool {
    map.iter().any(|(from, to)| from != to)
}

fn remap_operation(
    operation: &Operation,
    map: &IdentifierMap,
    leaf: &mut impl FnMut(&Expr) -> CircuitResult<Option<Expr>>,
) -> CircuitResult<Operation> {
    Ok(match operation {
        Operation::Store(store) => Operation::Store(store.map_exprs(leaf)?),
        Operation::Delay(Duration::Expr(expr)) => {
            Operation::Delay(Duration::Expr(expr.map_leaves(leaf)?))
        }
        Operation::ControlFlow(cf) => {
            let mut cf = cf.map_condition(leaf)?;
            if renames_any(map) {
                let blocks = cf
                    .blocks()
                    .into_iter()
                    .map(|block| rename_body(block, map))
                    .collect::<CircuitResult<Vec<_>>>()?;
                cf = cf.replace_blocks(blocks)?;
            }
            Operation::ControlFlow(cf)
        }
        other => other.clone(),
    })
}

/// A copy of a control-flow body with identifiers renamed through `map`.
fn rename_body(body: &Circuit, map: &IdentifierMap) -> CircuitResult<Circuit> {
    let mut out = body.copy_empty_like(None, VarsMode::Drop);
    for (ident, kind) in body.identifiers().iter() {
        let mapped = map.get(ident).cloned().unwrap_or_else(|| ident.clone());
        out.data.add_identifier(mapped, kind)?;
    }
    for inst in body.data() {
        let operation = remap_operation(&inst.operation, map, &mut |e| Ok(rename_leaf(map, e)))?;
        out.data.push(Instruction {
            operation,
            ..inst.clone()
        })?;
    }
    Ok(out)
}

fn target_positions(
    explicit: Option<Vec<u32>>,
    source: usize,
    destination: usize,
    kind: &'static str,
) -> CircuitResult<Vec<u32>> {
    let Some(targets) = explicit else {
        return Ok((0..source).map(width).collect());
    };
    let invalid = |reason: String| CircuitError::ComposeTargets { kind, reason };
    if targets.len() != source {
        return Err(invalid(format!(
            "expected {source} targets, got {}",
            targets.len()
        )));
    }
    let mut seen = FxHashSet::default();
    for &t in &targets {
        if t as usize >= destination {
            return Err(invalid(format!(
                "{kind} {t} is out of range for a destination with {destination}"
            )));
        }
        if !seen.insert(t) {
            return Err(invalid(format!("{kind} {t} is targeted more than once")));
        }
    }
    Ok(targets)
}

fn width(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

impl Circuit {
    // =========================================================================
    // Compose
    // =========================================================================

    /// Splice `other` into this circuit.
    ///
    /// Inside an open control-flow builder the records go to the active
    /// block; `front`, new inputs and non-inlined captures are rejected there.
    #[instrument(skip_all, fields(destination = %self.name, source = %other.name, front = options.front))]
    pub fn compose(&mut self, other: &Circuit, options: ComposeOptions) -> CircuitResult<&mut Self> {
        let in_scope = self.in_scope();
        if options.front && in_scope {
            return Err(CircuitError::ActiveScope(
                "cannot compose to the front of a circuit inside a control-flow scope",
            ));
        }
        if other.num_qubits() > self.num_qubits() {
            return Err(CircuitError::ComposeWidth {
                kind: "qubits",
                source_count: other.num_qubits(),
                destination_count: self.num_qubits(),
            });
        }
        let add_clbits = options.clbits.is_none()
            && !in_scope
            && self.num_clbits() == 0
            && other.num_clbits() > 0;
        if !add_clbits && other.num_clbits() > self.num_clbits() {
            return Err(CircuitError::ComposeWidth {
                kind: "clbits",
                source_count: other.num_clbits(),
                destination_count: self.num_clbits(),
            });
        }
        if add_clbits {
            for creg in other.cregs() {
                if self.data.get_identifier(creg.name()).is_some() {
                    return Err(CircuitError::DuplicateName {
                        kind: ClassicalRegister::KIND,
                        name: creg.name().to_string(),
                    });
                }
            }
        }
        let destination_clbits = if add_clbits {
            other.num_clbits()
        } else {
            self.num_clbits()
        };
        let qubit_map = target_positions(
            options.qubits.map(|v| v.into_iter().map(|q| q.0).collect()),
            other.num_qubits(),
            self.num_qubits(),
            "qubit",
        )?;
        let clbit_map = target_positions(
            options.clbits.map(|v| v.into_iter().map(|c| c.0).collect()),
            other.num_clbits(),
            destination_clbits,
            "clbit",
        )?;
        self.data.parameter_table().check(other.parameters())?;
        let phase = other.global_phase();
        let has_phase = phase.as_f64() != Some(0.0);
        if in_scope && has_phase {
            return Err(CircuitError::ActiveScope(
                "cannot add a global phase inside a control-flow scope",
            ));
        }

        if options.wrap {
            let op = match other.to_gate() {
                Ok(gate) => gate,
                Err(_) => other.to_instruction()?,
            };
            let inst = Instruction::new(
                op,
                qubit_map.iter().copied().map(QubitId),
                clbit_map.iter().copied().map(ClbitId),
            );
            if add_clbits {
                self.add_source_clbits(other)?;
            }
            if options.front {
                self.data.insert_front(vec![inst])?;
            } else {
                self.append_instruction(inst)?;
            }
            debug!(wrapped = other.name.as_str(), "composed circuit as one instruction");
            return Ok(self);
        }

        let mut identifier_map = IdentifierMap::default();
        for (ident, _) in other.identifiers().iter() {
            identifier_map.insert(ident.clone(), options.var_remap.resolve(ident)?);
        }

        // Identifier plan, checked against a scratch copy of the destination's.
        let mut planned = self.data.identifiers().clone();
        let mut additions: Vec<(Identifier, IdentifierKind)> = Vec::new();
        let mut scope_uses: Vec<Identifier> = Vec::new();
        let mut scope_declarations: Vec<Identifier> = Vec::new();
        for (ident, kind) in other.identifiers().iter() {
            let mapped = identifier_map
                .get(ident)
                .cloned()
                .unwrap_or_else(|| ident.clone());
            match kind {
                IdentifierKind::Capture if options.inline_captures => {
                    if in_scope {
                        scope_uses.push(mapped);
                    } else if !self.data.has_identifier(&mapped) {
                        return Err(CircuitError::InlineCaptureMissing {
                            name: mapped.name().to_string(),
                        });
                    }
                }
                IdentifierKind::Input | IdentifierKind::Capture if in_scope => {
                    return Err(CircuitError::ActiveScope(
                        "inputs and captures can only be added at the top level",
                    ));
                }
                IdentifierKind::Declare if in_scope => scope_declarations.push(mapped),
                _ => {
                    let register_clash = self.data.get_creg(mapped.name()).is_some()
                        || (add_clbits && other.data.get_creg(mapped.name()).is_some());
                    if register_clash {
                        return Err(CircuitError::IdentifierShadowing {
                            name: mapped.name().to_string(),
                        });
                    }
                    planned.add(mapped.clone(), kind)?;
                    additions.push((mapped, kind));
                }
            }
        }

        let mut clbits = FxHashMap::default();
        for (i, bit) in other.clbits().iter().enumerate() {
            let target = if add_clbits {
                bit.clone()
            } else {
                self.clbits()[clbit_map[i] as usize].clone()
            };
            clbits.insert(bit.clone(), target);
        }
        let dest_cregs: Vec<ClassicalRegister> = if add_clbits {
            other.cregs().cloned().collect()
        } else {
            self.cregs().cloned().collect()
        };
        let mut taken: FxHashSet<String> = dest_cregs.iter().map(|r| r.name().to_string()).collect();
        taken.extend(planned.iter().map(|(ident, _)| ident.name().to_string()));
        let mut remap = ClassicalRemap {
            identifiers: &identifier_map,
            clbits,
            dest_cregs,
            registers: FxHashMap::default(),
            aliases: Vec::new(),
            names: NameSequence::new(ClassicalRegister::PREFIX),
            taken,
        };

        let mut records = Vec::with_capacity(other.data().len());
        for inst in other.data() {
            let operation = remap_operation(&inst.operation, &identifier_map, &mut |e| remap.leaf(e))?;
            records.push(Instruction {
                operation,
                qubits: inst
                    .qubits
                    .iter()
                    .map(|q| QubitId(qubit_map[q.index()]))
                    .collect(),
                clbits: inst
                    .clbits
                    .iter()
                    .map(|c| ClbitId(clbit_map[c.index()]))
                    .collect(),
                label: inst.label.clone(),
            });
        }
        let aliases = remap.aliases;
        let num_records = records.len();

        if in_scope {
            if !aliases.is_empty() {
                return Err(CircuitError::ActiveScope(
                    "composing needs a new classical register, which cannot be added inside a control-flow scope",
                ));
            }
            let saved = self.builder_stack.clone();
            let result = self.with_scope(|scope| {
                for ident in &scope_uses {
                    scope.use_identifier(ident)?;
                }
                for ident in scope_declarations {
                    match ident {
                        Identifier::Var(var) => scope.add_uninitialized_var(var)?,
                        Identifier::Stretch(stretch) => scope.add_stretch(stretch)?,
                    }
                }
                for inst in records {
                    scope.append(inst)?;
                }
                Ok(())
            });
            if result.is_err() {
                self.builder_stack = saved;
            }
            result?;
        } else {
            if add_clbits {
                self.add_source_clbits(other)?;
            }
            for alias in &aliases {
                self.data.add_creg(alias.clone())?;
            }
            for (ident, kind) in &additions {
                self.data.add_identifier(ident.clone(), *kind)?;
            }
            if options.front {
                self.data.insert_front(records)?;
            } else {
                for inst in records {
                    self.data.push(inst)?;
                }
            }
            if has_phase {
                let total = (self.global_phase().clone() + phase.clone()).simplify();
                self.data.set_global_phase(total)?;
            }
        }

        debug!(
            records = num_records,
            identifiers = additions.len(),
            aliases = aliases.len(),
            "composed circuit"
        );
        Ok(self)
    }

    /// A new circuit with `other` composed onto a copy of this one.
    pub fn composed(&self, other: &Circuit, options: ComposeOptions) -> CircuitResult<Circuit> {
        if self.in_scope() {
            return Err(CircuitError::ActiveScope(
                "cannot build a new circuit while a control-flow scope is open",
            ));
        }
        let mut out = self.clone();
        out.compose(other, options)?;
        Ok(out)
    }

    fn add_source_clbits(&mut self, other: &Circuit) -> CircuitResult<()> {
        for bit in other.clbits() {
            self.data.add_clbit(bit.clone())?;
        }
        for creg in other.cregs() {
            self.data.add_creg(creg.clone())?;
        }
        Ok(())
    }

    // =========================================================================
    // Tensor
    // =========================================================================

    /// Stack `self` on top of `other`: `other` takes the low bits and `self`
    /// the high bits of a new circuit.
    ///
    /// ```rust
    /// use qcir_core::{Circuit, QubitId};
    ///
    /// let mut top = Circuit::with_size("top", 1, 0);
    /// top.x(QubitId(0)).unwrap();
    /// let mut bottom = Circuit::with_size("bottom", 2, 0);
    /// bottom.h(QubitId(0)).unwrap();
    ///
    /// let both = top.tensor(&bottom).unwrap();
    /// assert_eq!(both.num_qubits(), 3);
    /// assert_eq!(both.data()[1].qubits.as_slice(), &[QubitId(2)]);
    /// ```
    #[instrument(skip_all, fields(top = %self.name, bottom = %other.name))]
    pub fn tensor(&self, other: &Circuit) -> CircuitResult<Circuit> {
        if self.in_scope() || other.in_scope() {
            return Err(CircuitError::ActiveScope(
                "cannot tensor circuits while a control-flow scope is open",
            ));
        }
        let num_qubits = self.num_qubits() + other.num_qubits();
        let num_clbits = self.num_clbits() + other.num_clbits();
        let only_register = |regs: Vec<&str>, name: &str| regs.len() == 1 && regs[0] == name;

        let default_qregs = only_register(self.qregs().map(Register::name).collect(), "q")
            && only_register(other.qregs().map(Register::name).collect(), "q");
        let measure_cregs = only_register(self.cregs().map(Register::name).collect(), "meas")
            && only_register(other.cregs().map(Register::name).collect(), "meas");

        let mut dest = if default_qregs {
            Circuit::with_size(self.name.clone(), width(num_qubits), width(num_clbits))
        } else {
            let mut dest = Circuit::new(self.name.clone());
            for bit in other.qubits().iter().chain(self.qubits()) {
                dest.data.add_qubit(bit.clone())?;
            }
            for register in other.qregs().chain(self.qregs()) {
                dest.data.add_qreg(register.clone())?;
            }
            if measure_cregs {
                dest.data
                    .add_creg(ClassicalRegister::new("meas", width(num_clbits)))?;
            } else {
                for bit in other.clbits().iter().chain(self.clbits()) {
                    dest.data.add_clbit(bit.clone())?;
                }
                for register in other.cregs().chain(self.cregs()) {
                    dest.data.add_creg(register.clone())?;
                }
            }
            dest
        };

        let (low_q, low_c) = (width(other.num_qubits()), width(other.num_clbits()));
        dest.compose(
            other,
            ComposeOptions::new()
                .with_qubits(0..low_q)
                .with_clbits(0..low_c),
        )?;
        dest.compose(
            self,
            ComposeOptions::new()
                .with_qubits(low_q..width(num_qubits))
                .with_clbits(low_c..width(num_clbits)),
        )?;
        debug!(
            qubits = num_qubits,
            clbits = num_clbits,
            default_qregs,
            "tensored circuits"
        );
        Ok(dest)
    }

    // =========================================================================
    // Wrapping and decomposition
    // =========================================================================

    fn definition_params(&self) -> Vec<ParameterExpression> {
        self.parameters()
            .iter()
            .map(ParameterExpression::symbol)
            .collect()
    }

    /// Wrap the circuit into a custom instruction whose definition is the
    /// circuit.
    pub fn to_instruction(&self) -> CircuitResult<CustomOp> {
        if self.in_scope() {
            return Err(CircuitError::ActiveScope(
                "cannot wrap a circuit while a control-flow scope is open",
            ));
        }
        if !self.identifiers().is_empty() {
            return Err(CircuitError::Invalid(format!(
                "circuit '{}' has real-time identifiers and cannot be wrapped",
                self.name
            )));
        }
        Ok(CustomOp::instruction(
            self.name.clone(),
            width(self.num_qubits()),
            width(self.num_clbits()),
        )
        .with_params(self.definition_params())
        .with_definition(self.clone()))
    }

    /// Wrap the circuit into a custom gate. Only unitary circuits qualify.
    pub fn to_gate(&self) -> CircuitResult<CustomOp> {
        if self.num_clbits() > 0 {
            return Err(CircuitError::NotAGate(format!(
                "circuit '{}' has {} clbits",
                self.name,
                self.num_clbits()
            )));
        }
        if let Some(inst) = self.data().iter().find(|inst| !inst.operation.is_gate()) {
            return Err(CircuitError::NotAGate(format!(
                "'{}' is not a gate",
                inst.name()
            )));
        }
        let mut op = self.to_instruction()?;
        op.unitary = true;
        Ok(op)
    }

    /// Replace every custom operation that has a definition by that
    /// definition, one level deep.
    #[instrument(skip_all, fields(name = %self.name))]
    pub fn decompose(&self) -> CircuitResult<Circuit> {
        if self.in_scope() {
            return Err(CircuitError::ActiveScope(
                "cannot decompose while a control-flow scope is open",
            ));
        }
        let mut out = self.copy_empty_like(None, VarsMode::Alike);
        let mut expanded = 0usize;
        for inst in self.data() {
            match &inst.operation {
                Operation::Custom(CustomOp {
                    definition: Some(definition),
                    ..
                }) => {
                    let options = ComposeOptions::new()
                        .with_qubits(inst.qubits.iter().copied())
                        .with_clbits(inst.clbits.iter().copied());
                    out.compose(definition, options)?;
                    expanded += 1;
                }
                _ => out.data.push(inst.clone())?,
            }
        }
        debug!(expanded, "decomposed circuit");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classical::{Stretch, Type, Var};
    use crate::control_flow::Condition;
    use std::f64::consts::PI;

    fn bell() -> Circuit {
        let mut circuit = Circuit::with_size("bell", 2, 0);
        circuit
            .h(QubitId(0))
            .unwrap()
            .cx(QubitId(0), QubitId(1))
            .unwrap();
        circuit
    }

    #[test]
    fn test_compose_default_targets() {
        let mut dest = Circuit::with_size("dest", 3, 0);
        dest.x(QubitId(2)).unwrap();
        dest.compose(&bell(), ComposeOptions::new()).unwrap();
        assert_eq!(dest.size(), 3);
        assert_eq!(dest.data()[2].qubits.as_slice(), &[QubitId(0), QubitId(1)]);
    }

    #[test]
    fn test_compose_too_wide_leaves_destination() {
        let mut dest = Circuit::with_size("dest", 1, 0);
        dest.h(QubitId(0)).unwrap();
        let before = dest.clone();
        let err = dest.compose(&bell(), ComposeOptions::new()).unwrap_err();
        assert!(matches!(err, CircuitError::ComposeWidth { kind: "qubits", .. }));
        assert_eq!(dest, before);
    }

    #[test]
    fn test_compose_bad_targets() {
        let mut dest = Circuit::with_size("dest", 3, 0);
        let repeated = ComposeOptions::new().with_qubits([1u32, 1]);
        assert!(matches!(
            dest.compose(&bell(), repeated),
            Err(CircuitError::ComposeTargets { kind: "qubit", .. })
        ));
        let short = ComposeOptions::new().with_qubits([1u32]);
        assert!(dest.compose(&bell(), short).is_err());
        assert_eq!(dest.size(), 0);
    }

    #[test]
    fn test_compose_front() {
        let mut dest = Circuit::with_size("dest", 2, 0);
        dest.z(QubitId(1)).unwrap();
        dest.compose(&bell(), ComposeOptions::new().with_front(true))
            .unwrap();
        let names: Vec<&str> = dest.data().iter().map(Instruction::name).collect();
        assert_eq!(names, vec!["h", "cx", "z"]);
    }

    #[test]
    fn test_compose_adds_clbits_to_empty_destination() {
        let mut source = Circuit::with_size("source", 1, 1);
        source.measure(QubitId(0), ClbitId(0)).unwrap();
        let mut dest = Circuit::with_size("dest", 2, 0);
        dest.compose(&source, ComposeOptions::new()).unwrap();
        assert_eq!(dest.num_clbits(), 1);
        assert_eq!(dest.cregs().len(), 1);
        assert_eq!(dest.count_ops()["measure"], 1);
    }

    #[test]
    fn test_compose_sums_phase() {
        let mut source = bell();
        source.set_global_phase(PI / 2.0).unwrap();
        let mut dest = Circuit::with_size("dest", 2, 0);
        dest.set_global_phase(PI).unwrap();
        dest.compose(&source, ComposeOptions::new()).unwrap();
        let phase = dest.global_phase().as_f64().unwrap();
        assert!((phase - 3.0 * PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_condition_register_gets_alias() {
        let mut source = Circuit::with_size("source", 1, 0);
        let cr = ClassicalRegister::new("cr", 2);
        source.add_creg(cr.clone()).unwrap();
        source
            .if_test((&cr, 1), |body| {
                body.x(QubitId(0))?;
                Ok(())
            })
            .unwrap();

        let mut dest = Circuit::with_size("dest", 1, 3);
        dest.compose(&source, ComposeOptions::new().with_clbits([2u32, 0]))
            .unwrap();
        assert_eq!(dest.cregs().len(), 2);
        let alias = dest.cregs().nth(1).unwrap().clone();
        assert!(!alias.is_owning());
        assert_eq!(alias.bits(), &[dest.clbits()[2].clone(), dest.clbits()[0].clone()]);
        let inst = &dest.data()[0];
        assert_eq!(
            inst.operation.control_flow().unwrap().condition(),
            Some(&Condition::Register(alias, 1))
        );
        assert_eq!(inst.clbits.as_slice(), &[ClbitId(2), ClbitId(0)]);
    }

    #[test]
    fn test_inline_captures() {
        let a = Var::new("a", Type::Bool);
        let mut source = Circuit::with_size("source", 1, 0);
        source.add_capture(a.clone()).unwrap();
        source.store(&a, true).unwrap();

        let mut missing = Circuit::with_size("dest", 1, 0);
        let err = missing
            .compose(&source, ComposeOptions::new().with_inline_captures(true))
            .unwrap_err();
        assert!(matches!(err, CircuitError::InlineCaptureMissing { .. }));

        let mut dest = Circuit::with_size("dest", 1, 0);
        dest.add_var(a.clone(), false).unwrap();
        dest.compose(&source, ComposeOptions::new().with_inline_captures(true))
            .unwrap();
        assert_eq!(dest.identifiers().len(), 1);
        assert_eq!(dest.size(), 2);

        // Without inlining the capture would be redeclared.
        assert!(matches!(
            dest.compose(&source, ComposeOptions::new()),
            Err(CircuitError::DuplicateIdentifier { .. })
        ));
    }

    #[test]
    fn test_var_remap_by_name() {
        let a = Var::new("a", Type::Uint(4));
        let mut source = Circuit::with_size("source", 1, 0);
        source.add_input(a.clone()).unwrap();
        source.store(&a, 3u64).unwrap();

        let mut dest = Circuit::with_size("dest", 1, 0);
        let remap = VarRemap::new().rename("a", "b");
        dest.compose(&source, ComposeOptions::new().with_var_remap(remap))
            .unwrap();
        let b = dest.get_var("b").unwrap();
        assert_eq!(b.ty(), Type::Uint(4));
        assert!(dest.get_var("a").is_none());
        assert_eq!(dest.data()[0].operation.identifiers(), vec![Identifier::Var(b)]);
    }

    #[test]
    fn test_var_remap_kind_and_type_checked() {
        let a = Var::new("a", Type::Bool);
        let mut source = Circuit::with_size("source", 1, 0);
        source.add_input(a).unwrap();
        let mut dest = Circuit::with_size("dest", 1, 0);

        let to_stretch = VarRemap::new().replace("a", Stretch::new("s"));
        assert!(matches!(
            dest.compose(&source, ComposeOptions::new().with_var_remap(to_stretch)),
            Err(CircuitError::IdentifierKindMismatch { .. })
        ));
        let to_uint = VarRemap::new().replace("a", Var::new("b", Type::Uint(2)));
        assert!(matches!(
            dest.compose(&source, ComposeOptions::new().with_var_remap(to_uint)),
            Err(CircuitError::TypeMismatch { .. })
        ));
        assert!(dest.identifiers().is_empty());
    }

    #[test]
    fn test_compose_inside_scope() {
        let mut dest = Circuit::with_size("dest", 3, 0);
        let cr = ClassicalRegister::new("cr", 1);
        dest.add_creg(cr.clone()).unwrap();
        dest.if_test((&cr, 1), |body| {
            body.compose(&bell(), ComposeOptions::new().with_qubits([1u32, 2]))?;
            let err = body
                .compose(&bell(), ComposeOptions::new().with_front(true))
                .unwrap_err();
            assert!(matches!(err, CircuitError::ActiveScope(_)));
            Ok(())
        })
        .unwrap();
        let inst = &dest.data()[0];
        assert_eq!(inst.qubits.as_slice(), &[QubitId(1), QubitId(2)]);
        assert_eq!(inst.operation.blocks()[0].size(), 2);
    }

    #[test]
    fn test_tensor_default_registers() {
        let mut top = Circuit::with_size("top", 1, 0);
        top.x(QubitId(0)).unwrap();
        let both = top.tensor(&bell()).unwrap();
        assert_eq!(both.num_qubits(), 3);
        assert_eq!(both.qregs().len(), 1);
        assert_eq!(both.name(), "top");
        assert_eq!(both.data()[0].qubits.as_slice(), &[QubitId(0)]);
        assert_eq!(both.data()[1].qubits.as_slice(), &[QubitId(0), QubitId(1)]);
        assert_eq!(both.data()[2].qubits.as_slice(), &[QubitId(2)]);
    }

    #[test]
    fn test_tensor_keeps_named_registers() {
        let mut top = Circuit::new("top");
        top.add_qreg(crate::register::QuantumRegister::new("a", 1))
            .unwrap();
        let mut bottom = Circuit::new("bottom");
        bottom
            .add_qreg(crate::register::QuantumRegister::new("b", 2))
            .unwrap();
        let both = top.tensor(&bottom).unwrap();
        let names: Vec<&str> = both.qregs().map(Register::name).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(both.qubits()[2], top.qubits()[0]);
    }

    #[test]
    fn test_to_gate_and_decompose() {
        let gate = bell().to_gate().unwrap();
        assert!(gate.unitary);
        assert_eq!(gate.num_qubits, 2);

        let mut outer = Circuit::with_size("outer", 3, 0);
        outer
            .append_operation(
                gate,
                vec![QubitId(2).into(), QubitId(0).into()],
                vec![],
            )
            .unwrap();
        assert_eq!(outer.size(), 1);
        let flat = outer.decompose().unwrap();
        assert_eq!(flat.size(), 2);
        assert_eq!(flat.data()[0].qubits.as_slice(), &[QubitId(2)]);
        assert_eq!(flat.data()[1].qubits.as_slice(), &[QubitId(2), QubitId(0)]);

        let measured = Circuit::with_size("m", 1, 1);
        assert!(matches!(measured.to_gate(), Err(CircuitError::NotAGate(_))));
    }

    #[test]
    fn test_compose_wrap() {
        let mut dest = Circuit::with_size("dest", 2, 0);
        dest.compose(&bell(), ComposeOptions::new().with_wrap(true))
            .unwrap();
        assert_eq!(dest.size(), 1);
        assert_eq!(dest.data()[0].name(), "bell");
        assert!(dest.data()[0].operation.is_gate());
    }
}
