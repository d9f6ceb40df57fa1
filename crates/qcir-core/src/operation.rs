//! The closed set of operations a circuit can hold.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::bit::Clbit;
use crate::circuit::Circuit;
use crate::classical::{Expr, Identifier, Stretch, Type};
use crate::control_flow::ControlFlowOp;
use crate::error::{CircuitError, CircuitResult};
use crate::parameter::{Parameter, ParameterExpression};
use crate::register::ClassicalRegister;

/// Standard gates with known semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    // Single-qubit Pauli gates
    /// Identity gate.
    I,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,

    // Single-qubit Clifford gates
    /// Hadamard gate.
    H,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdg,
    /// sqrt(X) gate.
    SX,
    /// sqrt(X)-dagger gate.
    SXdg,

    // Single-qubit rotation gates
    /// Rotation around X axis.
    Rx(ParameterExpression),
    /// Rotation around Y axis.
    Ry(ParameterExpression),
    /// Rotation around Z axis.
    Rz(ParameterExpression),
    /// Phase gate.
    P(ParameterExpression),
    /// Universal single-qubit gate U(θ, φ, λ).
    U(
        ParameterExpression,
        ParameterExpression,
        ParameterExpression,
    ),

    // Two-qubit gates
    /// Controlled-X (CNOT) gate.
    CX,
    /// Controlled-Y gate.
    CY,
    /// Controlled-Z gate.
    CZ,
    /// Controlled-Hadamard gate.
    CH,
    /// SWAP gate.
    Swap,
    /// iSWAP gate.
    ISwap,
    /// Controlled rotation around X.
    CRx(ParameterExpression),
    /// Controlled rotation around Y.
    CRy(ParameterExpression),
    /// Controlled rotation around Z.
    CRz(ParameterExpression),
    /// Controlled phase gate.
    CP(ParameterExpression),
    /// XX rotation gate.
    RXX(ParameterExpression),
    /// YY rotation gate.
    RYY(ParameterExpression),
    /// ZZ rotation gate.
    RZZ(ParameterExpression),

    // Three-qubit gates
    /// Toffoli gate (CCX).
    CCX,
    /// Fredkin gate (CSWAP).
    CSwap,
}

impl StandardGate {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::I => "id",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::H => "h",
            StandardGate::S => "s",
            StandardGate::Sdg => "sdg",
            StandardGate::T => "t",
            StandardGate::Tdg => "tdg",
            StandardGate::SX => "sx",
            StandardGate::SXdg => "sxdg",
            StandardGate::Rx(_) => "rx",
            StandardGate::Ry(_) => "ry",
            StandardGate::Rz(_) => "rz",
            StandardGate::P(_) => "p",
            StandardGate::U(_, _, _) => "u",
            StandardGate::CX => "cx",
            StandardGate::CY => "cy",
            StandardGate::CZ => "cz",
            StandardGate::CH => "ch",
            StandardGate::Swap => "swap",
            StandardGate::ISwap => "iswap",
            StandardGate::CRx(_) => "crx",
            StandardGate::CRy(_) => "cry",
            StandardGate::CRz(_) => "crz",
            StandardGate::CP(_) => "cp",
            StandardGate::RXX(_) => "rxx",
            StandardGate::RYY(_) => "ryy",
            StandardGate::RZZ(_) => "rzz",
            StandardGate::CCX => "ccx",
            StandardGate::CSwap => "cswap",
        }
    }

    /// Get the number of qubits this gate operates on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::I
            | StandardGate::X
            | StandardGate::Y
            | StandardGate::Z
            | StandardGate::H
            | StandardGate::S
            | StandardGate::Sdg
            | StandardGate::T
            | StandardGate::Tdg
            | StandardGate::SX
            | StandardGate::SXdg
            | StandardGate::Rx(_)
            | StandardGate::Ry(_)
            | StandardGate::Rz(_)
            | StandardGate::P(_)
            | StandardGate::U(_, _, _) => 1,

            StandardGate::CX
            | StandardGate::CY
            | StandardGate::CZ
            | StandardGate::CH
            | StandardGate::Swap
            | StandardGate::ISwap
            | StandardGate::CRx(_)
            | StandardGate::CRy(_)
            | StandardGate::CRz(_)
            | StandardGate::CP(_)
            | StandardGate::RXX(_)
            | StandardGate::RYY(_)
            | StandardGate::RZZ(_) => 2,

            StandardGate::CCX | StandardGate::CSwap => 3,
        }
    }

    /// Check if this gate has unbound parameters.
    pub fn is_parameterized(&self) -> bool {
        self.parameters().iter().any(|p| p.is_symbolic())
    }

    /// Get parameters of this gate.
    pub fn parameters(&self) -> Vec<&ParameterExpression> {
        match self {
            StandardGate::Rx(p)
            | StandardGate::Ry(p)
            | StandardGate::Rz(p)
            | StandardGate::P(p)
            | StandardGate::CRx(p)
            | StandardGate::CRy(p)
            | StandardGate::CRz(p)
            | StandardGate::CP(p)
            | StandardGate::RXX(p)
            | StandardGate::RYY(p)
            | StandardGate::RZZ(p) => vec![p],

            StandardGate::U(a, b, c) => vec![a, b, c],

            _ => vec![],
        }
    }

    /// Mutable access to the parameters of this gate.
    pub fn parameters_mut(&mut self) -> Vec<&mut ParameterExpression> {
        match self {
            StandardGate::Rx(p)
            | StandardGate::Ry(p)
            | StandardGate::Rz(p)
            | StandardGate::P(p)
            | StandardGate::CRx(p)
            | StandardGate::CRy(p)
            | StandardGate::CRz(p)
            | StandardGate::CP(p)
            | StandardGate::RXX(p)
            | StandardGate::RYY(p)
            | StandardGate::RZZ(p) => vec![p],

            StandardGate::U(a, b, c) => vec![a, b, c],

            _ => vec![],
        }
    }
}

/// A user-defined gate or instruction, optionally carrying its decomposition.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomOp {
    /// The name of the operation.
    pub name: String,
    /// The number of qubits it operates on.
    pub num_qubits: u32,
    /// The number of classical bits it operates on.
    pub num_clbits: u32,
    /// Parameters of the operation.
    pub params: Vec<ParameterExpression>,
    /// The circuit this operation stands for.
    pub definition: Option<Box<Circuit>>,
    /// Whether the operation is a unitary gate.
    pub unitary: bool,
}

impl CustomOp {
    /// Create a new custom gate.
    pub fn gate(name: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            num_clbits: 0,
            params: vec![],
            definition: None,
            unitary: true,
        }
    }

    /// Create a new custom, possibly non-unitary, instruction.
    pub fn instruction(name: impl Into<String>, num_qubits: u32, num_clbits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            num_clbits,
            params: vec![],
            definition: None,
            unitary: false,
        }
    }

    /// Add parameters to the operation.
    #[must_use]
    pub fn with_params(mut self, params: Vec<ParameterExpression>) -> Self {
        self.params = params;
        self
    }

    /// Attach a decomposition.
    ///
    /// The definition's bits map positionally onto the operands.
    #[must_use]
    pub fn with_definition(mut self, definition: Circuit) -> Self {
        self.definition = Some(Box::new(definition));
        self
    }
}

/// How long a delay (or a box) lasts.
#[derive(Debug, Clone, PartialEq)]
pub enum Duration {
    /// A fixed number of device time steps.
    Dt(u64),
    /// A `duration`-typed expression, usually involving stretches.
    Expr(Expr),
}

impl Duration {
    /// Check the expression form is duration-typed.
    pub fn validate(&self) -> CircuitResult<()> {
        match self {
            Duration::Expr(expr) if expr.ty() != Type::Duration => {
                Err(CircuitError::TypeMismatch {
                    name: expr.to_string(),
                    expected: Type::Duration,
                    got: expr.ty(),
                })
            }
            _ => Ok(()),
        }
    }

    /// The expression form, if any.
    pub fn expr(&self) -> Option<&Expr> {
        match self {
            Duration::Expr(expr) => Some(expr),
            Duration::Dt(_) => None,
        }
    }
}

impl From<u64> for Duration {
    fn from(dt: u64) -> Self {
        Duration::Dt(dt)
    }
}

impl From<Expr> for Duration {
    fn from(expr: Expr) -> Self {
        Duration::Expr(expr)
    }
}

impl From<&Stretch> for Duration {
    fn from(stretch: &Stretch) -> Self {
        Duration::Expr(Expr::from(stretch))
    }
}

/// Assignment of a classical expression to an lvalue.
#[derive(Debug, Clone, PartialEq)]
pub struct Store {
    lvalue: Expr,
    rvalue: Expr,
}

impl Store {
    /// Create a store, lifting `rvalue` to the type of `lvalue`.
    pub fn new(lvalue: impl Into<Expr>, rvalue: impl Into<Expr>) -> CircuitResult<Self> {
        let lvalue = lvalue.into();
        if !lvalue.is_lvalue() {
            return Err(CircuitError::InvalidLvalue(lvalue.to_string()));
        }
        let rvalue = Expr::lift(rvalue, Some(lvalue.ty()))?;
        Ok(Self { lvalue, rvalue })
    }

    /// The assigned location.
    pub fn lvalue(&self) -> &Expr {
        &self.lvalue
    }

    /// The assigned value.
    pub fn rvalue(&self) -> &Expr {
        &self.rvalue
    }

    pub(crate) fn map_exprs(
        &self,
        f: &mut impl FnMut(&Expr) -> CircuitResult<Option<Expr>>,
    ) -> CircuitResult<Self> {
        Ok(Self {
            lvalue: self.lvalue.map_leaves(f)?,
            rvalue: self.rvalue.map_leaves(f)?,
        })
    }
}

/// An operation in a circuit.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// A standard gate.
    Standard(StandardGate),
    /// A user-defined gate or instruction.
    Custom(CustomOp),
    /// Measurement of one qubit into one clbit.
    Measure,
    /// Reset of a qubit to |0⟩.
    Reset,
    /// Synchronization point across the given number of qubits.
    Barrier(u32),
    /// Idle time on one qubit.
    Delay(Duration),
    /// Classical assignment.
    Store(Store),
    /// Structured control flow.
    ControlFlow(ControlFlowOp),
}

impl Operation {
    /// The operation name.
    pub fn name(&self) -> &str {
        match self {
            Operation::Standard(g) => g.name(),
            Operation::Custom(op) => &op.name,
            Operation::Measure => "measure",
            Operation::Reset => "reset",
            Operation::Barrier(_) => "barrier",
            Operation::Delay(_) => "delay",
            Operation::Store(_) => "store",
            Operation::ControlFlow(cf) => cf.name(),
        }
    }

    /// Number of qubit operands.
    pub fn num_qubits(&self) -> u32 {
        match self {
            Operation::Standard(g) => g.num_qubits(),
            Operation::Custom(op) => op.num_qubits,
            Operation::Measure | Operation::Reset | Operation::Delay(_) => 1,
            Operation::Barrier(n) => *n,
            Operation::Store(_) => 0,
            Operation::ControlFlow(cf) => cf.num_qubits(),
        }
    }

    /// Number of clbit operands.
    pub fn num_clbits(&self) -> u32 {
        match self {
            Operation::Custom(op) => op.num_clbits,
            Operation::Measure => 1,
            Operation::ControlFlow(cf) => cf.num_clbits(),
            _ => 0,
        }
    }

    /// Numeric or symbolic parameters.
    pub fn params(&self) -> Vec<&ParameterExpression> {
        match self {
            Operation::Standard(g) => g.parameters(),
            Operation::Custom(op) => op.params.iter().collect(),
            _ => vec![],
        }
    }

    /// Whether this is a compiler directive rather than an operation.
    pub fn is_directive(&self) -> bool {
        matches!(self, Operation::Barrier(_))
    }

    /// Whether this operation is a unitary gate.
    pub fn is_gate(&self) -> bool {
        match self {
            Operation::Standard(_) => true,
            Operation::Custom(op) => op.unitary,
            _ => false,
        }
    }

    /// The control-flow operation, if this is one.
    pub fn control_flow(&self) -> Option<&ControlFlowOp> {
        match self {
            Operation::ControlFlow(cf) => Some(cf),
            _ => None,
        }
    }

    /// Sub-circuits of a control-flow operation.
    pub fn blocks(&self) -> Vec<&Circuit> {
        match self {
            Operation::ControlFlow(cf) => cf.blocks(),
            _ => vec![],
        }
    }

    /// Identifiers this operation reads, writes or closes over.
    pub fn identifiers(&self) -> Vec<Identifier> {
        match self {
            Operation::Store(store) => {
                let mut out = store.lvalue.identifiers();
                for ident in store.rvalue.identifiers() {
                    if !out.contains(&ident) {
                        out.push(ident);
                    }
                }
                out
            }
            Operation::Delay(duration) => duration
                .expr()
                .map(Expr::identifiers)
                .unwrap_or_default(),
            Operation::ControlFlow(cf) => cf.identifiers(),
            _ => vec![],
        }
    }

    /// Clbits and registers named by conditions, targets and stores.
    ///
    /// These are not operands but must exist wherever the operation lives.
    pub fn classical_resources(&self) -> (Vec<Clbit>, Vec<ClassicalRegister>) {
        let mut exprs: Vec<&Expr> = Vec::new();
        match self {
            Operation::Store(store) => {
                exprs.push(&store.lvalue);
                exprs.push(&store.rvalue);
            }
            Operation::ControlFlow(cf) => return cf.classical_resources(),
            _ => {}
        }
        let mut clbits = Vec::new();
        let mut registers = Vec::new();
        for expr in exprs {
            clbits.extend(expr.clbits());
            registers.extend(expr.registers());
        }
        (clbits, registers)
    }

    /// Expand the operand lists into one argument set per instruction.
    ///
    /// Each entry of `qargs`/`cargs` is the list of bits supplied for one
    /// operand slot. Single-qubit gates map over every bit; two-qubit gates
    /// pair lists of equal length or repeat a single bit; barriers collapse
    /// into one instruction.
    pub fn broadcast_arguments<Q: Clone, C: Clone>(
        &self,
        qargs: &[Vec<Q>],
        cargs: &[Vec<C>],
    ) -> CircuitResult<Vec<(Vec<Q>, Vec<C>)>> {
        match self {
            Operation::Standard(_) | Operation::Custom(CustomOp { unitary: true, .. }) => {
                self.broadcast_gate(qargs, cargs)
            }
            Operation::Measure => {
                self.check_slots(qargs.len(), cargs.len())?;
                let (qarg, carg) = (&qargs[0], &cargs[0]);
                if qarg.len() == carg.len() {
                    Ok(qarg
                        .iter()
                        .zip(carg)
                        .map(|(q, c)| (vec![q.clone()], vec![c.clone()]))
                        .collect())
                } else if qarg.len() == 1 && !carg.is_empty() {
                    Ok(carg
                        .iter()
                        .map(|c| (qarg.clone(), vec![c.clone()]))
                        .collect())
                } else {
                    Err(self.broadcast_error(format!(
                        "{} qubits cannot be measured into {} clbits",
                        qarg.len(),
                        carg.len()
                    )))
                }
            }
            Operation::Reset | Operation::Delay(_) => {
                self.check_slots(qargs.len(), cargs.len())?;
                Ok(qargs[0]
                    .iter()
                    .map(|q| (vec![q.clone()], vec![]))
                    .collect())
            }
            Operation::Barrier(_) => Ok(vec![(qargs.concat(), cargs.concat())]),
            _ => {
                self.check_slots(qargs.len(), cargs.len())?;
                Ok(vec![(qargs.concat(), cargs.concat())])
            }
        }
    }

    fn broadcast_gate<Q: Clone, C: Clone>(
        &self,
        qargs: &[Vec<Q>],
        cargs: &[Vec<C>],
    ) -> CircuitResult<Vec<(Vec<Q>, Vec<C>)>> {
        self.check_slots(qargs.len(), cargs.len())?;
        if qargs.iter().any(Vec::is_empty) {
            return Err(self.broadcast_error("an operand slot has no qubits".into()));
        }
        match qargs {
            [] => Ok(vec![(vec![], vec![])]),
            [only] => Ok(only.iter().map(|q| (vec![q.clone()], vec![])).collect()),
            [a, b] if a.len() == b.len() => Ok(a
                .iter()
                .zip(b)
                .map(|(x, y)| (vec![x.clone(), y.clone()], vec![]))
                .collect()),
            [a, b] if a.len() == 1 => Ok(b
                .iter()
                .map(|y| (vec![a[0].clone(), y.clone()], vec![]))
                .collect()),
            [a, b] if b.len() == 1 => Ok(a
                .iter()
                .map(|x| (vec![x.clone(), b[0].clone()], vec![]))
                .collect()),
            [a, _] => Err(self.broadcast_error(format!(
                "operand lists of length {} and {} cannot be combined",
                a.len(),
                qargs[1].len()
            ))),
            many => {
                let len = many[0].len();
                if many.iter().any(|arg| arg.len() != len) {
                    return Err(self.broadcast_error(
                        "operands of gates with three or more qubits must have equal lengths"
                            .into(),
                    ));
                }
                Ok((0..len)
                    .map(|i| (many.iter().map(|arg| arg[i].clone()).collect(), vec![]))
                    .collect())
            }
        }
    }

    fn check_slots(&self, qslots: usize, cslots: usize) -> CircuitResult<()> {
        if qslots != self.num_qubits() as usize {
            return Err(CircuitError::ArgumentCount {
                operation: self.name().to_string(),
                kind: "qubit",
                expected: self.num_qubits() as usize,
                got: qslots,
            });
        }
        if cslots != self.num_clbits() as usize {
            return Err(CircuitError::ArgumentCount {
                operation: self.name().to_string(),
                kind: "clbit",
                expected: self.num_clbits() as usize,
                got: cslots,
            });
        }
        Ok(())
    }

    fn broadcast_error(&self, reason: String) -> CircuitError {
        CircuitError::Broadcast {
            operation: self.name().to_string(),
            reason,
        }
    }

    /// Call `f(slot, parameter)` for every free parameter.
    ///
    /// Gate parameters are reported per parameter slot, control-flow
    /// parameters per block. A for-loop's own loop parameter is bound by the
    /// loop and not reported.
    pub(crate) fn for_each_parameter(&self, mut f: impl FnMut(usize, &Parameter)) {
        match self {
            Operation::Standard(_) | Operation::Custom(_) => {
                for (slot, param) in self.params().into_iter().enumerate() {
                    for p in param.parameters() {
                        f(slot, &p);
                    }
                }
            }
            Operation::ControlFlow(cf) => {
                let bound = cf.loop_parameter();
                for (slot, block) in cf.blocks().into_iter().enumerate() {
                    for p in block.parameters() {
                        if bound != Some(p) {
                            f(slot, p);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// Substitute parameters in place, including inside definitions and blocks.
    pub(crate) fn assign_parameters(
        &mut self,
        map: &FxHashMap<Parameter, ParameterExpression>,
    ) -> CircuitResult<()> {
        match self {
            Operation::Standard(g) => {
                for param in g.parameters_mut() {
                    *param = param.subs(map);
                }
            }
            Operation::Custom(op) => {
                for param in &mut op.params {
                    *param = param.subs(map);
                }
                if let Some(definition) = op.definition.as_mut() {
                    definition.assign_parameters_partial(map)?;
                }
            }
            Operation::ControlFlow(cf) => {
                // The loop parameter is rebound on every iteration.
                let inner = match cf.loop_parameter() {
                    Some(bound) if map.contains_key(bound) => {
                        let mut inner = map.clone();
                        inner.remove(bound);
                        Some(inner)
                    }
                    _ => None,
                };
                let map = inner.as_ref().unwrap_or(map);
                for block in cf.blocks_mut() {
                    block.assign_parameters_partial(map)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl From<StandardGate> for Operation {
    fn from(gate: StandardGate) -> Self {
        Operation::Standard(gate)
    }
}

impl From<CustomOp> for Operation {
    fn from(op: CustomOp) -> Self {
        Operation::Custom(op)
    }
}

impl From<Store> for Operation {
    fn from(store: Store) -> Self {
        Operation::Store(store)
    }
}

impl From<ControlFlowOp> for Operation {
    fn from(op: ControlFlowOp) -> Self {
        Operation::ControlFlow(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classical::Var;
    use std::f64::consts::PI;

    #[test]
    fn test_standard_gate_properties() {
        assert_eq!(StandardGate::H.num_qubits(), 1);
        assert_eq!(StandardGate::CX.num_qubits(), 2);
        assert_eq!(StandardGate::CCX.num_qubits(), 3);

        let theta = Parameter::new("theta");
        assert!(!StandardGate::H.is_parameterized());
        assert!(!StandardGate::Rx(ParameterExpression::constant(PI)).is_parameterized());
        assert!(StandardGate::Rx(ParameterExpression::symbol(&theta)).is_parameterized());
    }

    #[test]
    fn test_custom_op() {
        let custom = CustomOp::gate("my_gate", 2)
            .with_params(vec![ParameterExpression::constant(PI / 4.0)]);
        let op = Operation::from(custom);
        assert_eq!(op.name(), "my_gate");
        assert_eq!(op.num_qubits(), 2);
        assert_eq!(op.params().len(), 1);
        assert!(op.is_gate());
        assert!(!Operation::from(CustomOp::instruction("m", 1, 1)).is_gate());
    }

    #[test]
    fn test_broadcast_single_qubit() {
        let op = Operation::from(StandardGate::H);
        let out = op
            .broadcast_arguments::<u32, u32>(&[vec![0, 1, 2]], &[])
            .unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[2].0, vec![2]);
    }

    #[test]
    fn test_broadcast_two_qubit() {
        let op = Operation::from(StandardGate::CX);
        let fan_out = op
            .broadcast_arguments::<u32, u32>(&[vec![0], vec![1, 2]], &[])
            .unwrap();
        assert_eq!(fan_out, vec![(vec![0, 1], vec![]), (vec![0, 2], vec![])]);

        let zipped = op
            .broadcast_arguments::<u32, u32>(&[vec![0, 1], vec![2, 3]], &[])
            .unwrap();
        assert_eq!(zipped[1].0, vec![1, 3]);

        let err = op
            .broadcast_arguments::<u32, u32>(&[vec![0, 1], vec![2, 3, 4]], &[])
            .unwrap_err();
        assert!(matches!(err, CircuitError::Broadcast { .. }));
    }

    #[test]
    fn test_broadcast_arity_mismatch() {
        let op = Operation::from(StandardGate::CX);
        let err = op
            .broadcast_arguments::<u32, u32>(&[vec![0]], &[])
            .unwrap_err();
        assert!(matches!(
            err,
            CircuitError::ArgumentCount {
                expected: 2,
                got: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_broadcast_measure_and_barrier() {
        let out = Operation::Measure
            .broadcast_arguments(&[vec![0u32, 1]], &[vec![5u32, 6]])
            .unwrap();
        assert_eq!(out, vec![(vec![0], vec![5]), (vec![1], vec![6])]);

        let barrier = Operation::Barrier(3)
            .broadcast_arguments::<u32, u32>(&[vec![0, 1], vec![2]], &[])
            .unwrap();
        assert_eq!(barrier, vec![(vec![0, 1, 2], vec![])]);
    }

    #[test]
    fn test_store_lifts_rvalue() {
        let a = Var::new("a", Type::Uint(8));
        let store = Store::new(&a, 3u64).unwrap();
        assert_eq!(store.rvalue().ty(), Type::Uint(8));
        assert!(matches!(
            Store::new(true, &a),
            Err(CircuitError::InvalidLvalue(_))
        ));
        let op = Operation::from(store);
        assert_eq!(op.identifiers(), vec![Identifier::Var(a)]);
        assert_eq!(op.num_qubits(), 0);
    }
}
