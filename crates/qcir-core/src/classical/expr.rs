//! Typed real-time classical expressions.
//!
//! This is a value tree with type inference at construction, identifier
//! iteration and leaf remapping. It does not evaluate anything.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::{Identifier, Stretch, Type, Value, Var};
use crate::bit::Clbit;
use crate::error::{CircuitError, CircuitResult};
use crate::register::{ClassicalRegister, Register};

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Bitwise negation.
    BitNot,
    /// Logical negation.
    LogicNot,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Bitwise and.
    BitAnd,
    /// Bitwise or.
    BitOr,
    /// Bitwise exclusive or.
    BitXor,
    /// Logical and.
    LogicAnd,
    /// Logical or.
    LogicOr,
    /// Equality.
    Equal,
    /// Inequality.
    NotEqual,
    /// Less than.
    Less,
    /// Less than or equal.
    LessEqual,
    /// Greater than.
    Greater,
    /// Greater than or equal.
    GreaterEqual,
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::LogicAnd => "&&",
            BinaryOp::LogicOr => "||",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

/// A typed classical expression.
///
/// Leaves are identifiers, single clbits (typed `bool`), classical registers
/// (typed `uint[len]`) and literals.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A classical variable.
    Var(Var),
    /// A stretch.
    Stretch(Stretch),
    /// A single classical bit.
    Clbit(Clbit),
    /// A classical register read as an unsigned integer.
    Register(ClassicalRegister),
    /// A literal with its type.
    Value(Value, Type),
    /// A unary operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<Expr>,
        /// Result type.
        ty: Type,
    },
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
        /// Result type.
        ty: Type,
    },
    /// A type conversion.
    Cast {
        /// The converted expression.
        operand: Box<Expr>,
        /// Target type.
        ty: Type,
        /// Whether the cast was inserted by type inference.
        implicit: bool,
    },
    /// Bit indexing into an unsigned integer.
    Index {
        /// The indexed expression.
        target: Box<Expr>,
        /// The index.
        index: Box<Expr>,
        /// Result type.
        ty: Type,
    },
}

impl Expr {
    /// Lift a value into an expression, optionally forcing its type.
    ///
    /// Literals are retyped if they fit the requested type; any other
    /// expression must already have it.
    pub fn lift(value: impl Into<Expr>, ty: Option<Type>) -> CircuitResult<Expr> {
        let expr = value.into();
        let Some(ty) = ty else {
            return Ok(expr);
        };
        match expr {
            Expr::Value(value, _) if value.fits(ty) => Ok(Expr::Value(value, ty)),
            expr if expr.ty() == ty => Ok(expr),
            expr => Err(CircuitError::TypeMismatch {
                name: expr.to_string(),
                expected: ty,
                got: expr.ty(),
            }),
        }
    }

    /// The type of this expression.
    pub fn ty(&self) -> Type {
        match self {
            Expr::Var(v) => v.ty(),
            Expr::Stretch(_) => Type::Duration,
            Expr::Clbit(_) => Type::Bool,
            Expr::Register(r) => Type::Uint(u32::try_from(r.len()).unwrap_or(u32::MAX)),
            Expr::Value(_, ty)
            | Expr::Unary { ty, .. }
            | Expr::Binary { ty, .. }
            | Expr::Cast { ty, .. }
            | Expr::Index { ty, .. } => *ty,
        }
    }

    /// Build a unary expression.
    pub fn unary(op: UnaryOp, operand: impl Into<Expr>) -> CircuitResult<Expr> {
        let operand = operand.into();
        let ty = match (op, operand.ty()) {
            (UnaryOp::BitNot, ty @ (Type::Bool | Type::Uint(_))) => ty,
            (UnaryOp::LogicNot, Type::Bool | Type::Uint(_)) => Type::Bool,
            (_, got) => {
                return Err(CircuitError::TypeMismatch {
                    name: operand.to_string(),
                    expected: Type::Bool,
                    got,
                });
            }
        };
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            ty,
        })
    }

    /// Build a binary expression, inferring the result type.
    pub fn binary(op: BinaryOp, left: impl Into<Expr>, right: impl Into<Expr>) -> CircuitResult<Expr> {
        let left = left.into();
        let right = right.into();
        let (lt, rt) = (left.ty(), right.ty());
        let ty = match op {
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => match (lt, rt) {
                (Type::Uint(a), Type::Uint(b)) => Some(Type::Uint(a.max(b))),
                (Type::Bool, Type::Bool) => Some(Type::Bool),
                _ => None,
            },
            BinaryOp::LogicAnd | BinaryOp::LogicOr => {
                let truthy = |t: Type| matches!(t, Type::Bool | Type::Uint(_));
                (truthy(lt) && truthy(rt)).then_some(Type::Bool)
            }
            BinaryOp::Equal | BinaryOp::NotEqual => match (lt, rt) {
                (Type::Uint(_), Type::Uint(_)) => Some(Type::Bool),
                (a, b) if a == b => Some(Type::Bool),
                _ => None,
            },
            BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
                match (lt, rt) {
                    (Type::Uint(_), Type::Uint(_))
                    | (Type::Float, Type::Float)
                    | (Type::Duration, Type::Duration) => Some(Type::Bool),
                    _ => None,
                }
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => match (op, lt, rt) {
                (_, Type::Uint(a), Type::Uint(b)) => Some(Type::Uint(a.max(b))),
                (_, Type::Float, Type::Float) => Some(Type::Float),
                (BinaryOp::Add | BinaryOp::Sub, Type::Duration, Type::Duration) => {
                    Some(Type::Duration)
                }
                (BinaryOp::Div, Type::Duration, Type::Duration) => Some(Type::Float),
                (BinaryOp::Mul | BinaryOp::Div, Type::Duration, Type::Float)
                | (BinaryOp::Mul, Type::Float, Type::Duration) => Some(Type::Duration),
                _ => None,
            },
        };
        let Some(ty) = ty else {
            return Err(CircuitError::TypeMismatch {
                name: format!("{left} {} {right}", op.symbol()),
                expected: lt,
                got: rt,
            });
        };
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            ty,
        })
    }

    /// `left == right`.
    pub fn equal(left: impl Into<Expr>, right: impl Into<Expr>) -> CircuitResult<Expr> {
        Self::binary(BinaryOp::Equal, left, right)
    }

    /// `left < right`.
    pub fn less(left: impl Into<Expr>, right: impl Into<Expr>) -> CircuitResult<Expr> {
        Self::binary(BinaryOp::Less, left, right)
    }

    /// `left && right`.
    pub fn logic_and(left: impl Into<Expr>, right: impl Into<Expr>) -> CircuitResult<Expr> {
        Self::binary(BinaryOp::LogicAnd, left, right)
    }

    /// `left & right`.
    pub fn bit_and(left: impl Into<Expr>, right: impl Into<Expr>) -> CircuitResult<Expr> {
        Self::binary(BinaryOp::BitAnd, left, right)
    }

    /// `!operand`.
    pub fn logic_not(operand: impl Into<Expr>) -> CircuitResult<Expr> {
        Self::unary(UnaryOp::LogicNot, operand)
    }

    /// `target[index]`, reading one bit of an unsigned integer.
    pub fn index(target: impl Into<Expr>, index: impl Into<Expr>) -> CircuitResult<Expr> {
        let target = target.into();
        let index = index.into();
        match (target.ty(), index.ty()) {
            (Type::Uint(_), Type::Uint(_)) => Ok(Expr::Index {
                target: Box::new(target),
                index: Box::new(index),
                ty: Type::Bool,
            }),
            (Type::Uint(_), got) => Err(CircuitError::TypeMismatch {
                name: index.to_string(),
                expected: Type::Uint(64),
                got,
            }),
            (got, _) => Err(CircuitError::TypeMismatch {
                name: target.to_string(),
                expected: Type::Uint(64),
                got,
            }),
        }
    }

    /// An explicit cast to `ty`.
    pub fn cast(operand: impl Into<Expr>, ty: Type) -> Expr {
        Expr::Cast {
            operand: Box::new(operand.into()),
            ty,
            implicit: false,
        }
    }

    /// Whether the expression can be the target of a store.
    pub fn is_lvalue(&self) -> bool {
        match self {
            Expr::Var(_) | Expr::Clbit(_) | Expr::Register(_) => true,
            Expr::Index { target, .. } => target.is_lvalue(),
            _ => false,
        }
    }

    /// Visit every node, parents before children.
    pub fn visit(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        match self {
            Expr::Unary { operand, .. } | Expr::Cast { operand, .. } => operand.visit(f),
            Expr::Binary { left, right, .. } => {
                left.visit(f);
                right.visit(f);
            }
            Expr::Index { target, index, .. } => {
                target.visit(f);
                index.visit(f);
            }
            _ => {}
        }
    }

    /// The identifiers referenced by this expression, without repeats.
    pub fn identifiers(&self) -> Vec<Identifier> {
        let mut out: Vec<Identifier> = Vec::new();
        self.visit(&mut |node| {
            let ident = match node {
                Expr::Var(v) => Identifier::Var(v.clone()),
                Expr::Stretch(s) => Identifier::Stretch(s.clone()),
                _ => return,
            };
            if !out.contains(&ident) {
                out.push(ident);
            }
        });
        out
    }

    /// The single clbits referenced by this expression.
    pub fn clbits(&self) -> Vec<Clbit> {
        let mut out = Vec::new();
        self.visit(&mut |node| {
            if let Expr::Clbit(bit) = node {
                out.push(bit.clone());
            }
        });
        out
    }

    /// The classical registers referenced by this expression.
    pub fn registers(&self) -> Vec<ClassicalRegister> {
        let mut out = Vec::new();
        self.visit(&mut |node| {
            if let Expr::Register(register) = node {
                out.push(register.clone());
            }
        });
        out
    }

    /// Rebuild the expression, replacing leaves for which `f` returns a value.
    ///
    /// Replacements are expected to keep the leaf's type.
    pub fn map_leaves(
        &self,
        f: &mut impl FnMut(&Expr) -> CircuitResult<Option<Expr>>,
    ) -> CircuitResult<Expr> {
        Ok(match self {
            Expr::Unary { op, operand, ty } => Expr::Unary {
                op: *op,
                operand: Box::new(operand.map_leaves(f)?),
                ty: *ty,
            },
            Expr::Binary {
                op,
                left,
                right,
                ty,
            } => Expr::Binary {
                op: *op,
                left: Box::new(left.map_leaves(f)?),
                right: Box::new(right.map_leaves(f)?),
                ty: *ty,
            },
            Expr::Cast {
                operand,
                ty,
                implicit,
            } => Expr::Cast {
                operand: Box::new(operand.map_leaves(f)?),
                ty: *ty,
                implicit: *implicit,
            },
            Expr::Index { target, index, ty } => Expr::Index {
                target: Box::new(target.map_leaves(f)?),
                index: Box::new(index.map_leaves(f)?),
                ty: *ty,
            },
            leaf => f(leaf)?.unwrap_or_else(|| leaf.clone()),
        })
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Var(v) => write!(f, "{v}"),
            Expr::Stretch(s) => write!(f, "{s}"),
            Expr::Clbit(bit) => write!(f, "{bit}"),
            Expr::Register(register) => write!(f, "{register}"),
            Expr::Value(value, _) => write!(f, "{value}"),
            Expr::Unary {
                op: UnaryOp::BitNot,
                operand,
                ..
            } => write!(f, "~{operand}"),
            Expr::Unary {
                op: UnaryOp::LogicNot,
                operand,
                ..
            } => write!(f, "!{operand}"),
            Expr::Binary {
                op, left, right, ..
            } => write!(f, "({left} {} {right})", op.symbol()),
            Expr::Cast { operand, ty, .. } => write!(f, "{ty}({operand})"),
            Expr::Index { target, index, .. } => write!(f, "{target}[{index}]"),
        }
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Expr::Value(Value::Bool(value), Type::Bool)
    }
}

impl From<u64> for Expr {
    fn from(value: u64) -> Self {
        let value = Value::Uint(value);
        Expr::Value(value, value.natural_type())
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Value(Value::Float(value), Type::Float)
    }
}

impl From<Var> for Expr {
    fn from(var: Var) -> Self {
        Expr::Var(var)
    }
}

impl From<&Var> for Expr {
    fn from(var: &Var) -> Self {
        Expr::Var(var.clone())
    }
}

impl From<Stretch> for Expr {
    fn from(stretch: Stretch) -> Self {
        Expr::Stretch(stretch)
    }
}

impl From<&Stretch> for Expr {
    fn from(stretch: &Stretch) -> Self {
        Expr::Stretch(stretch.clone())
    }
}

impl From<Identifier> for Expr {
    fn from(ident: Identifier) -> Self {
        match ident {
            Identifier::Var(v) => Expr::Var(v),
            Identifier::Stretch(s) => Expr::Stretch(s),
        }
    }
}

impl From<Clbit> for Expr {
    fn from(bit: Clbit) -> Self {
        Expr::Clbit(bit)
    }
}

impl From<&Clbit> for Expr {
    fn from(bit: &Clbit) -> Self {
        Expr::Clbit(bit.clone())
    }
}

impl From<ClassicalRegister> for Expr {
    fn from(register: ClassicalRegister) -> Self {
        Expr::Register(register)
    }
}

impl From<&ClassicalRegister> for Expr {
    fn from(register: &ClassicalRegister) -> Self {
        Expr::Register(register.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lift_retypes_literals() {
        let e = Expr::lift(3u64, Some(Type::Uint(8))).unwrap();
        assert_eq!(e.ty(), Type::Uint(8));

        let err = Expr::lift(300u64, Some(Type::Uint(8))).unwrap_err();
        assert!(matches!(err, CircuitError::TypeMismatch { .. }));

        let b = Var::new("b", Type::Bool);
        let err = Expr::lift(&b, Some(Type::Uint(1))).unwrap_err();
        assert!(matches!(
            err,
            CircuitError::TypeMismatch {
                expected: Type::Uint(1),
                got: Type::Bool,
                ..
            }
        ));
    }

    #[test]
    fn test_register_and_clbit_types() {
        let cr = ClassicalRegister::new("cr", 3);
        assert_eq!(Expr::from(&cr).ty(), Type::Uint(3));
        assert_eq!(Expr::from(&cr.bits()[0]).ty(), Type::Bool);
    }

    #[test]
    fn test_binary_inference() {
        let a = Var::new("a", Type::Uint(4));
        let e = Expr::equal(&a, 7u64).unwrap();
        assert_eq!(e.ty(), Type::Bool);

        let sum = Expr::binary(BinaryOp::Add, &a, Var::new("b", Type::Uint(8))).unwrap();
        assert_eq!(sum.ty(), Type::Uint(8));

        assert!(Expr::less(&a, 1.5).is_err());
    }

    #[test]
    fn test_identifiers_deduplicated() {
        let a = Var::new("a", Type::Bool);
        let s = Stretch::new("s");
        let e = Expr::logic_and(&a, Expr::logic_not(&a).unwrap()).unwrap();
        assert_eq!(e.identifiers(), vec![Identifier::Var(a.clone())]);

        let d = Expr::binary(BinaryOp::Add, &s, &s).unwrap();
        assert_eq!(d.ty(), Type::Duration);
        assert_eq!(d.identifiers(), vec![Identifier::Stretch(s)]);
    }

    #[test]
    fn test_map_leaves() {
        let a = Var::new("a", Type::Uint(2));
        let b = Var::new("b", Type::Uint(2));
        let e = Expr::equal(&a, 1u64).unwrap();
        let mapped = e
            .map_leaves(&mut |leaf| {
                Ok(match leaf {
                    Expr::Var(v) if *v == a => Some(Expr::from(&b)),
                    _ => None,
                })
            })
            .unwrap();
        assert_eq!(mapped.identifiers(), vec![Identifier::Var(b)]);
        assert_eq!(mapped.to_string(), "(b == 1)");
    }

    #[test]
    fn test_lvalues() {
        let cr = ClassicalRegister::new("cr", 2);
        assert!(Expr::from(&cr).is_lvalue());
        assert!(Expr::index(&cr, 0u64).unwrap().is_lvalue());
        assert!(!Expr::from(true).is_lvalue());
    }
}
