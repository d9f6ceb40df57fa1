//! Structured control-flow operations.
//!
//! Every body is a full [`Circuit`] whose bits correspond positionally to the
//! operands of the instruction holding it. All bodies of one operation have
//! the same width.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::bit::Clbit;
use crate::circuit::Circuit;
use crate::classical::{Expr, Identifier, Type};
use crate::error::{CircuitError, CircuitResult};
use crate::identifiers::IdentifierKind;
use crate::operation::Duration;
use crate::parameter::Parameter;
use crate::register::ClassicalRegister;

/// The predicate of an `if` or `while`.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// A single clbit compared with a value.
    Clbit(Clbit, bool),
    /// A register compared with an integer.
    Register(ClassicalRegister, u64),
    /// A `bool`-typed expression.
    Expr(Expr),
}

impl Condition {
    /// Check an expression condition is `bool`-typed.
    pub fn validate(&self) -> CircuitResult<()> {
        match self {
            Condition::Expr(expr) if expr.ty() != Type::Bool => Err(CircuitError::TypeMismatch {
                name: expr.to_string(),
                expected: Type::Bool,
                got: expr.ty(),
            }),
            _ => Ok(()),
        }
    }

    /// Clbits and registers the condition reads.
    pub fn classical_resources(&self) -> (Vec<Clbit>, Vec<ClassicalRegister>) {
        match self {
            Condition::Clbit(bit, _) => (vec![bit.clone()], vec![]),
            Condition::Register(register, _) => (vec![], vec![register.clone()]),
            Condition::Expr(expr) => (expr.clbits(), expr.registers()),
        }
    }

    /// Identifiers the condition reads.
    pub fn identifiers(&self) -> Vec<Identifier> {
        match self {
            Condition::Expr(expr) => expr.identifiers(),
            _ => vec![],
        }
    }
}

impl From<(Clbit, bool)> for Condition {
    fn from((bit, value): (Clbit, bool)) -> Self {
        Condition::Clbit(bit, value)
    }
}

impl From<(&Clbit, bool)> for Condition {
    fn from((bit, value): (&Clbit, bool)) -> Self {
        Condition::Clbit(bit.clone(), value)
    }
}

impl From<(ClassicalRegister, u64)> for Condition {
    fn from((register, value): (ClassicalRegister, u64)) -> Self {
        Condition::Register(register, value)
    }
}

impl From<(&ClassicalRegister, u64)> for Condition {
    fn from((register, value): (&ClassicalRegister, u64)) -> Self {
        Condition::Register(register.clone(), value)
    }
}

impl From<Expr> for Condition {
    fn from(expr: Expr) -> Self {
        Condition::Expr(expr)
    }
}

/// The value a `switch` dispatches on.
#[derive(Debug, Clone, PartialEq)]
pub enum SwitchTarget {
    /// A single clbit.
    Clbit(Clbit),
    /// A classical register read as an unsigned integer.
    Register(ClassicalRegister),
    /// A `bool` or `uint` expression.
    Expr(Expr),
}

impl SwitchTarget {
    /// Check an expression target is `bool` or `uint`.
    pub fn validate(&self) -> CircuitResult<()> {
        match self {
            SwitchTarget::Expr(expr) if !matches!(expr.ty(), Type::Bool | Type::Uint(_)) => {
                Err(CircuitError::TypeMismatch {
                    name: expr.to_string(),
                    expected: Type::Uint(64),
                    got: expr.ty(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Clbits and registers the target reads.
    pub fn classical_resources(&self) -> (Vec<Clbit>, Vec<ClassicalRegister>) {
        match self {
            SwitchTarget::Clbit(bit) => (vec![bit.clone()], vec![]),
            SwitchTarget::Register(register) => (vec![], vec![register.clone()]),
            SwitchTarget::Expr(expr) => (expr.clbits(), expr.registers()),
        }
    }
}

impl From<Clbit> for SwitchTarget {
    fn from(bit: Clbit) -> Self {
        SwitchTarget::Clbit(bit)
    }
}

impl From<&Clbit> for SwitchTarget {
    fn from(bit: &Clbit) -> Self {
        SwitchTarget::Clbit(bit.clone())
    }
}

impl From<ClassicalRegister> for SwitchTarget {
    fn from(register: ClassicalRegister) -> Self {
        SwitchTarget::Register(register)
    }
}

impl From<&ClassicalRegister> for SwitchTarget {
    fn from(register: &ClassicalRegister) -> Self {
        SwitchTarget::Register(register.clone())
    }
}

impl From<Expr> for SwitchTarget {
    fn from(expr: Expr) -> Self {
        SwitchTarget::Expr(expr)
    }
}

/// One label of a `switch` case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseLabel {
    /// Matches exactly this value.
    Value(u64),
    /// Matches anything no other case matches.
    Default,
}

impl fmt::Display for CaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseLabel::Value(v) => write!(f, "{v}"),
            CaseLabel::Default => f.write_str("default"),
        }
    }
}

impl From<u64> for CaseLabel {
    fn from(value: u64) -> Self {
        CaseLabel::Value(value)
    }
}

/// The values a `for` loop iterates over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopIndices {
    /// `start..stop` in increments of `step`.
    Range {
        /// First value.
        start: i64,
        /// Exclusive end.
        stop: i64,
        /// Increment.
        step: i64,
    },
    /// An explicit list of values.
    Values(Vec<i64>),
}

impl From<std::ops::Range<i64>> for LoopIndices {
    fn from(range: std::ops::Range<i64>) -> Self {
        LoopIndices::Range {
            start: range.start,
            stop: range.end,
            step: 1,
        }
    }
}

impl From<Vec<i64>> for LoopIndices {
    fn from(values: Vec<i64>) -> Self {
        LoopIndices::Values(values)
    }
}

/// A control-flow operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlFlowOp {
    /// `if (condition) { true_body } else { false_body }`.
    IfElse {
        /// The predicate.
        condition: Condition,
        /// Body run when the predicate holds.
        true_body: Box<Circuit>,
        /// Optional body run otherwise.
        false_body: Option<Box<Circuit>>,
    },
    /// `while (condition) { body }`.
    While {
        /// The predicate.
        condition: Condition,
        /// The loop body.
        body: Box<Circuit>,
    },
    /// `for loop_parameter in indices { body }`.
    For {
        /// Values iterated over.
        indices: LoopIndices,
        /// Parameter bound to the current value inside the body.
        loop_parameter: Option<Parameter>,
        /// The loop body.
        body: Box<Circuit>,
    },
    /// `switch (target) { case ...: body }`.
    Switch {
        /// The value dispatched on.
        target: SwitchTarget,
        /// Labels and bodies, in order.
        cases: Vec<(Vec<CaseLabel>, Box<Circuit>)>,
    },
    /// A scheduling box around a body.
    Box {
        /// The boxed body.
        body: Box<Circuit>,
        /// Optional fixed or stretch-based duration.
        duration: Option<Duration>,
    },
    /// Exit the innermost loop.
    BreakLoop {
        /// Width of the enclosing loop in qubits.
        num_qubits: u32,
        /// Width of the enclosing loop in clbits.
        num_clbits: u32,
    },
    /// Skip to the next iteration of the innermost loop.
    ContinueLoop {
        /// Width of the enclosing loop in qubits.
        num_qubits: u32,
        /// Width of the enclosing loop in clbits.
        num_clbits: u32,
    },
}

impl ControlFlowOp {
    /// Create an if/else, checking that both bodies have the same width.
    pub fn if_else(
        condition: impl Into<Condition>,
        true_body: Circuit,
        false_body: Option<Circuit>,
    ) -> CircuitResult<Self> {
        let condition = condition.into();
        condition.validate()?;
        if let Some(false_body) = &false_body {
            check_same_width("if_else", &true_body, false_body)?;
        }
        Ok(ControlFlowOp::IfElse {
            condition,
            true_body: Box::new(true_body),
            false_body: false_body.map(Box::new),
        })
    }

    /// Create a while loop.
    pub fn while_loop(condition: impl Into<Condition>, body: Circuit) -> CircuitResult<Self> {
        let condition = condition.into();
        condition.validate()?;
        Ok(ControlFlowOp::While {
            condition,
            body: Box::new(body),
        })
    }

    /// Create a for loop.
    pub fn for_loop(
        indices: impl Into<LoopIndices>,
        loop_parameter: Option<Parameter>,
        body: Circuit,
    ) -> Self {
        ControlFlowOp::For {
            indices: indices.into(),
            loop_parameter,
            body: Box::new(body),
        }
    }

    /// Create a switch, checking labels are unique and bodies agree in width.
    pub fn switch(
        target: impl Into<SwitchTarget>,
        cases: Vec<(Vec<CaseLabel>, Circuit)>,
    ) -> CircuitResult<Self> {
        let target = target.into();
        target.validate()?;
        let mut seen = Vec::new();
        for (labels, body) in &cases {
            for label in labels {
                if seen.contains(label) {
                    return Err(CircuitError::DuplicateCaseLabel(label.to_string()));
                }
                seen.push(*label);
            }
            if let Some((_, first)) = cases.first() {
                check_same_width("switch_case", first, body)?;
            }
        }
        Ok(ControlFlowOp::Switch {
            target,
            cases: cases
                .into_iter()
                .map(|(labels, body)| (labels, Box::new(body)))
                .collect(),
        })
    }

    /// Create a box.
    pub fn box_op(body: Circuit, duration: Option<Duration>) -> CircuitResult<Self> {
        if let Some(duration) = &duration {
            duration.validate()?;
        }
        Ok(ControlFlowOp::Box {
            body: Box::new(body),
            duration,
        })
    }

    /// The operation name.
    pub fn name(&self) -> &'static str {
        match self {
            ControlFlowOp::IfElse { .. } => "if_else",
            ControlFlowOp::While { .. } => "while_loop",
            ControlFlowOp::For { .. } => "for_loop",
            ControlFlowOp::Switch { .. } => "switch_case",
            ControlFlowOp::Box { .. } => "box",
            ControlFlowOp::BreakLoop { .. } => "break_loop",
            ControlFlowOp::ContinueLoop { .. } => "continue_loop",
        }
    }

    /// Number of qubit operands.
    pub fn num_qubits(&self) -> u32 {
        match self {
            ControlFlowOp::BreakLoop { num_qubits, .. }
            | ControlFlowOp::ContinueLoop { num_qubits, .. } => *num_qubits,
            _ => self
                .blocks()
                .first()
                .map_or(0, |b| u32::try_from(b.num_qubits()).unwrap_or(u32::MAX)),
        }
    }

    /// Number of clbit operands.
    pub fn num_clbits(&self) -> u32 {
        match self {
            ControlFlowOp::BreakLoop { num_clbits, .. }
            | ControlFlowOp::ContinueLoop { num_clbits, .. } => *num_clbits,
            _ => self
                .blocks()
                .first()
                .map_or(0, |b| u32::try_from(b.num_clbits()).unwrap_or(u32::MAX)),
        }
    }

    /// The predicate of an `if` or `while`.
    pub fn condition(&self) -> Option<&Condition> {
        match self {
            ControlFlowOp::IfElse { condition, .. } | ControlFlowOp::While { condition, .. } => {
                Some(condition)
            }
            _ => None,
        }
    }

    /// The parameter bound by a `for` loop.
    pub fn loop_parameter(&self) -> Option<&Parameter> {
        match self {
            ControlFlowOp::For { loop_parameter, .. } => loop_parameter.as_ref(),
            _ => None,
        }
    }

    /// The bodies, in order.
    pub fn blocks(&self) -> Vec<&Circuit> {
        match self {
            ControlFlowOp::IfElse {
                true_body,
                false_body,
                ..
            } => std::iter::once(true_body.as_ref())
                .chain(false_body.as_deref())
                .collect(),
            ControlFlowOp::While { body, .. }
            | ControlFlowOp::For { body, .. }
            | ControlFlowOp::Box { body, .. } => vec![body.as_ref()],
            ControlFlowOp::Switch { cases, .. } => cases.iter().map(|(_, b)| b.as_ref()).collect(),
            ControlFlowOp::BreakLoop { .. } | ControlFlowOp::ContinueLoop { .. } => vec![],
        }
    }

    pub(crate) fn blocks_mut(&mut self) -> Vec<&mut Circuit> {
        match self {
            ControlFlowOp::IfElse {
                true_body,
                false_body,
                ..
            } => std::iter::once(true_body.as_mut())
                .chain(false_body.as_deref_mut())
                .collect(),
            ControlFlowOp::While { body, .. }
            | ControlFlowOp::For { body, .. }
            | ControlFlowOp::Box { body, .. } => vec![body.as_mut()],
            ControlFlowOp::Switch { cases, .. } => {
                cases.iter_mut().map(|(_, b)| b.as_mut()).collect()
            }
            ControlFlowOp::BreakLoop { .. } | ControlFlowOp::ContinueLoop { .. } => vec![],
        }
    }

    /// A copy of this operation with its bodies replaced, in order.
    pub fn replace_blocks(&self, blocks: Vec<Circuit>) -> CircuitResult<Self> {
        let current = self.blocks();
        if blocks.len() != current.len() {
            return Err(CircuitError::Invalid(format!(
                "'{}' has {} blocks, got {} replacements",
                self.name(),
                current.len(),
                blocks.len()
            )));
        }
        if let Some(first) = current.first() {
            for block in &blocks {
                check_same_width(self.name(), first, block)?;
            }
        }
        let mut out = self.clone();
        for (slot, block) in out.blocks_mut().into_iter().zip(blocks) {
            *slot = block;
        }
        Ok(out)
    }

    /// Identifiers read by the predicate or duration, or captured by a body.
    pub fn identifiers(&self) -> Vec<Identifier> {
        let mut out: Vec<Identifier> = match self {
            ControlFlowOp::IfElse { condition, .. } | ControlFlowOp::While { condition, .. } => {
                condition.identifiers()
            }
            ControlFlowOp::Switch {
                target: SwitchTarget::Expr(expr),
                ..
            } => expr.identifiers(),
            ControlFlowOp::Box {
                duration: Some(duration),
                ..
            } => duration.expr().map(Expr::identifiers).unwrap_or_default(),
            _ => vec![],
        };
        for block in self.blocks() {
            for ident in block.identifiers().iter_kind(IdentifierKind::Capture) {
                if !out.contains(ident) {
                    out.push(ident.clone());
                }
            }
        }
        out
    }

    /// Clbits and registers read by the predicate or switch target.
    pub fn classical_resources(&self) -> (Vec<Clbit>, Vec<ClassicalRegister>) {
        match self {
            ControlFlowOp::IfElse { condition, .. } | ControlFlowOp::While { condition, .. } => {
                condition.classical_resources()
            }
            ControlFlowOp::Switch { target, .. } => target.classical_resources(),
            _ => (vec![], vec![]),
        }
    }

    /// Rewrite the predicate or target through `f`, leaving bodies untouched.
    pub(crate) fn map_condition(
        &self,
        f: &mut impl FnMut(&Expr) -> CircuitResult<Option<Expr>>,
    ) -> CircuitResult<Self> {
        let mut out = self.clone();
        match &mut out {
            ControlFlowOp::IfElse { condition, .. } | ControlFlowOp::While { condition, .. } => {
                *condition = map_condition_leaves(condition, f)?;
            }
            ControlFlowOp::Switch { target, .. } => {
                *target = match target {
                    SwitchTarget::Clbit(bit) => match f(&Expr::Clbit(bit.clone()))? {
                        Some(Expr::Clbit(mapped)) => SwitchTarget::Clbit(mapped),
                        _ => SwitchTarget::Clbit(bit.clone()),
                    },
                    SwitchTarget::Register(register) => {
                        match f(&Expr::Register(register.clone()))? {
                            Some(Expr::Register(mapped)) => SwitchTarget::Register(mapped),
                            _ => SwitchTarget::Register(register.clone()),
                        }
                    }
                    SwitchTarget::Expr(expr) => SwitchTarget::Expr(expr.map_leaves(f)?),
                };
            }
            ControlFlowOp::Box {
                duration: Some(Duration::Expr(expr)),
                ..
            } => {
                *expr = expr.map_leaves(f)?;
            }
            _ => {}
        }
        Ok(out)
    }
}

fn map_condition_leaves(
    condition: &Condition,
    f: &mut impl FnMut(&Expr) -> CircuitResult<Option<Expr>>,
) -> CircuitResult<Condition> {
    Ok(match condition {
        Condition::Clbit(bit, value) => match f(&Expr::Clbit(bit.clone()))? {
            Some(Expr::Clbit(mapped)) => Condition::Clbit(mapped, *value),
            _ => condition.clone(),
        },
        Condition::Register(register, value) => match f(&Expr::Register(register.clone()))? {
            Some(Expr::Register(mapped)) => Condition::Register(mapped, *value),
            _ => condition.clone(),
        },
        Condition::Expr(expr) => Condition::Expr(expr.map_leaves(f)?),
    })
}

fn check_same_width(operation: &str, first: &Circuit, other: &Circuit) -> CircuitResult<()> {
    if first.num_qubits() != other.num_qubits() || first.num_clbits() != other.num_clbits() {
        return Err(CircuitError::Invalid(format!(
            "bodies of '{operation}' must have the same width: ({}, {}) vs ({}, {})",
            first.num_qubits(),
            first.num_clbits(),
            other.num_qubits(),
            other.num_clbits()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit::QubitId;
    use crate::classical::Var;

    #[test]
    fn test_if_else_width_check() {
        let a = Circuit::with_size("a", 1, 0);
        let b = Circuit::with_size("b", 2, 0);
        let c = Clbit::new();
        assert!(ControlFlowOp::if_else((&c, true), a.clone(), Some(b)).is_err());
        let op = ControlFlowOp::if_else((&c, true), a.clone(), Some(a)).unwrap();
        assert_eq!(op.blocks().len(), 2);
        assert_eq!(op.num_qubits(), 1);
        assert_eq!(op.name(), "if_else");
    }

    #[test]
    fn test_condition_must_be_bool() {
        let v = Var::new("v", Type::Uint(4));
        let body = Circuit::with_size("body", 1, 0);
        let err = ControlFlowOp::while_loop(Expr::from(&v), body).unwrap_err();
        assert!(matches!(err, CircuitError::TypeMismatch { .. }));
    }

    #[test]
    fn test_switch_duplicate_labels() {
        let cr = ClassicalRegister::new("cr", 2);
        let body = Circuit::with_size("body", 1, 0);
        let err = ControlFlowOp::switch(
            &cr,
            vec![
                (vec![CaseLabel::Value(0)], body.clone()),
                (vec![CaseLabel::Value(1), CaseLabel::Value(0)], body),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, CircuitError::DuplicateCaseLabel(_)));
    }

    #[test]
    fn test_replace_blocks() {
        let mut body = Circuit::with_size("body", 1, 0);
        let op = ControlFlowOp::for_loop(0..4i64, None, body.clone());
        body.x(QubitId(0)).unwrap();
        let replaced = op.replace_blocks(vec![body]).unwrap();
        assert_eq!(replaced.blocks()[0].size(), 1);
        assert!(op.replace_blocks(vec![]).is_err());
    }

    #[test]
    fn test_case_label_serde() {
        let labels = vec![CaseLabel::Value(3), CaseLabel::Default];
        let json = serde_json::to_string(&labels).unwrap();
        let back: Vec<CaseLabel> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, labels);
    }
}
