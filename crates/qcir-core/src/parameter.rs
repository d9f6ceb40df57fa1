//! Parameters and parameter expressions for parameterized circuits.

use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use uuid::Uuid;

/// Membership of a parameter in a [`ParameterVector`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
struct VectorElement {
    vector: String,
    index: u32,
}

/// A symbolic circuit parameter.
///
/// Parameters are values: cloning one yields the same parameter, and two
/// parameters are the same only if they share a uuid. A serde round-trip keeps
/// the uuid and therefore the identity.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    name: String,
    uuid: Uuid,
    vector: Option<VectorElement>,
}

impl Parameter {
    /// Create a fresh parameter.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: Uuid::new_v4(),
            vector: None,
        }
    }

    /// The parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The identity of the parameter.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Name of the vector this parameter belongs to.
    pub fn vector_name(&self) -> Option<&str> {
        self.vector.as_ref().map(|v| v.vector.as_str())
    }

    /// Position of this parameter within its vector.
    pub fn vector_index(&self) -> Option<u32> {
        self.vector.as_ref().map(|v| v.index)
    }

    /// Key giving the canonical binding order: by name, except that elements
    /// of one vector order by index (`x[2]` before `x[10]`).
    pub(crate) fn sort_key(&self) -> (&str, Option<u32>) {
        match &self.vector {
            Some(element) => (&element.vector, Some(element.index)),
            None => (&self.name, None),
        }
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parameter({})", self.name)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A named, fixed-length sequence of parameters (`theta[0]`, `theta[1]`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterVector {
    name: String,
    params: Vec<Parameter>,
}

impl ParameterVector {
    /// Create a vector of `len` fresh parameters.
    pub fn new(name: impl Into<String>, len: u32) -> Self {
        let name = name.into();
        let params = (0..len)
            .map(|index| Parameter {
                name: format!("{name}[{index}]"),
                uuid: Uuid::new_v4(),
                vector: Some(VectorElement {
                    vector: name.clone(),
                    index,
                }),
            })
            .collect();
        Self { name, params }
    }

    /// The vector name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the vector has no elements.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// The element at `index`.
    pub fn get(&self, index: usize) -> Option<&Parameter> {
        self.params.get(index)
    }

    /// The elements, in order.
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }
}

impl std::ops::Index<usize> for ParameterVector {
    type Output = Parameter;

    fn index(&self, index: usize) -> &Self::Output {
        &self.params[index]
    }
}

/// A symbolic or concrete parameter expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterExpression {
    /// A constant numeric value.
    Constant(f64),
    /// A symbolic parameter.
    Symbol(Parameter),
    /// The constant π.
    Pi,
    /// Negation.
    Neg(Box<ParameterExpression>),
    /// Addition.
    Add(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Subtraction.
    Sub(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Multiplication.
    Mul(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Division.
    Div(Box<ParameterExpression>, Box<ParameterExpression>),
}

impl Default for ParameterExpression {
    fn default() -> Self {
        ParameterExpression::Constant(0.0)
    }
}

impl ParameterExpression {
    /// Create a constant parameter.
    pub fn constant(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }

    /// Create an expression consisting of a single parameter.
    pub fn symbol(parameter: &Parameter) -> Self {
        ParameterExpression::Symbol(parameter.clone())
    }

    /// Create a π constant.
    pub fn pi() -> Self {
        ParameterExpression::Pi
    }

    /// Check if this expression contains any parameters.
    pub fn is_symbolic(&self) -> bool {
        match self {
            ParameterExpression::Symbol(_) => true,
            ParameterExpression::Constant(_) | ParameterExpression::Pi => false,
            ParameterExpression::Neg(e) => e.is_symbolic(),
            ParameterExpression::Add(a, b)
            | ParameterExpression::Sub(a, b)
            | ParameterExpression::Mul(a, b)
            | ParameterExpression::Div(a, b) => a.is_symbolic() || b.is_symbolic(),
        }
    }

    /// Try to evaluate as a concrete f64 value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterExpression::Constant(v) => Some(*v),
            ParameterExpression::Symbol(_) => None,
            ParameterExpression::Pi => Some(PI),
            ParameterExpression::Neg(e) => e.as_f64().map(|v| -v),
            ParameterExpression::Add(a, b) => Some(a.as_f64()? + b.as_f64()?),
            ParameterExpression::Sub(a, b) => Some(a.as_f64()? - b.as_f64()?),
            ParameterExpression::Mul(a, b) => Some(a.as_f64()? * b.as_f64()?),
            ParameterExpression::Div(a, b) => {
                let divisor = b.as_f64()?;
                if divisor == 0.0 {
                    return None;
                }
                Some(a.as_f64()? / divisor)
            }
        }
    }

    /// All parameters in this expression, in first-occurrence order.
    pub fn parameters(&self) -> IndexSet<Parameter> {
        let mut set = IndexSet::new();
        self.collect_parameters(&mut set);
        set
    }

    pub(crate) fn collect_parameters(&self, set: &mut IndexSet<Parameter>) {
        match self {
            ParameterExpression::Constant(_) | ParameterExpression::Pi => {}
            ParameterExpression::Symbol(parameter) => {
                set.insert(parameter.clone());
            }
            ParameterExpression::Neg(e) => e.collect_parameters(set),
            ParameterExpression::Add(a, b)
            | ParameterExpression::Sub(a, b)
            | ParameterExpression::Mul(a, b)
            | ParameterExpression::Div(a, b) => {
                a.collect_parameters(set);
                b.collect_parameters(set);
            }
        }
    }

    /// Whether `parameter` occurs in this expression.
    pub fn contains(&self, parameter: &Parameter) -> bool {
        match self {
            ParameterExpression::Constant(_) | ParameterExpression::Pi => false,
            ParameterExpression::Symbol(p) => p == parameter,
            ParameterExpression::Neg(e) => e.contains(parameter),
            ParameterExpression::Add(a, b)
            | ParameterExpression::Sub(a, b)
            | ParameterExpression::Mul(a, b)
            | ParameterExpression::Div(a, b) => a.contains(parameter) || b.contains(parameter),
        }
    }

    /// Bind a parameter to a value, returning a new expression.
    pub fn bind(&self, parameter: &Parameter, value: f64) -> Self {
        let mut map = FxHashMap::default();
        map.insert(parameter.clone(), ParameterExpression::Constant(value));
        self.subs(&map)
    }

    /// Substitute parameters by expressions, returning a new expression.
    ///
    /// Fully numeric results are folded to a single constant.
    pub fn subs(&self, map: &FxHashMap<Parameter, ParameterExpression>) -> Self {
        let out = self.subs_inner(map);
        if out.is_symbolic() { out } else { out.simplify() }
    }

    fn subs_inner(&self, map: &FxHashMap<Parameter, ParameterExpression>) -> Self {
        match self {
            ParameterExpression::Symbol(p) => match map.get(p) {
                Some(replacement) => replacement.clone(),
                None => self.clone(),
            },
            ParameterExpression::Constant(_) | ParameterExpression::Pi => self.clone(),
            ParameterExpression::Neg(e) => ParameterExpression::Neg(Box::new(e.subs_inner(map))),
            ParameterExpression::Add(a, b) => ParameterExpression::Add(
                Box::new(a.subs_inner(map)),
                Box::new(b.subs_inner(map)),
            ),
            ParameterExpression::Sub(a, b) => ParameterExpression::Sub(
                Box::new(a.subs_inner(map)),
                Box::new(b.subs_inner(map)),
            ),
            ParameterExpression::Mul(a, b) => ParameterExpression::Mul(
                Box::new(a.subs_inner(map)),
                Box::new(b.subs_inner(map)),
            ),
            ParameterExpression::Div(a, b) => ParameterExpression::Div(
                Box::new(a.subs_inner(map)),
                Box::new(b.subs_inner(map)),
            ),
        }
    }

    /// Simplify the expression by evaluating constant subexpressions.
    pub fn simplify(&self) -> Self {
        if let Some(v) = self.as_f64() {
            return ParameterExpression::Constant(v);
        }
        match self {
            ParameterExpression::Neg(e) => {
                let e = e.simplify();
                if let Some(v) = e.as_f64() {
                    ParameterExpression::Constant(-v)
                } else {
                    ParameterExpression::Neg(Box::new(e))
                }
            }
            ParameterExpression::Add(a, b) => {
                let a = a.simplify();
                let b = b.simplify();
                match (a.as_f64(), b.as_f64()) {
                    (Some(av), Some(bv)) => ParameterExpression::Constant(av + bv),
                    (Some(av), None) if av == 0.0 => b,
                    (None, Some(bv)) if bv == 0.0 => a,
                    _ => ParameterExpression::Add(Box::new(a), Box::new(b)),
                }
            }
            ParameterExpression::Sub(a, b) => {
                let a = a.simplify();
                let b = b.simplify();
                match (a.as_f64(), b.as_f64()) {
                    (Some(av), Some(bv)) => ParameterExpression::Constant(av - bv),
                    (None, Some(bv)) if bv == 0.0 => a,
                    _ => ParameterExpression::Sub(Box::new(a), Box::new(b)),
                }
            }
            ParameterExpression::Mul(a, b) => {
                let a = a.simplify();
                let b = b.simplify();
                match (a.as_f64(), b.as_f64()) {
                    (Some(av), Some(bv)) => ParameterExpression::Constant(av * bv),
                    _ => ParameterExpression::Mul(Box::new(a), Box::new(b)),
                }
            }
            ParameterExpression::Div(a, b) => {
                let a = a.simplify();
                let b = b.simplify();
                match (a.as_f64(), b.as_f64()) {
                    (Some(av), Some(bv)) if bv != 0.0 => ParameterExpression::Constant(av / bv),
                    _ => ParameterExpression::Div(Box::new(a), Box::new(b)),
                }
            }
            _ => self.clone(),
        }
    }
}

impl fmt::Display for ParameterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterExpression::Constant(v) => write!(f, "{v}"),
            ParameterExpression::Symbol(p) => write!(f, "{p}"),
            ParameterExpression::Pi => write!(f, "π"),
            ParameterExpression::Neg(e) => write!(f, "-({e})"),
            ParameterExpression::Add(a, b) => write!(f, "({a} + {b})"),
            ParameterExpression::Sub(a, b) => write!(f, "({a} - {b})"),
            ParameterExpression::Mul(a, b) => write!(f, "({a} * {b})"),
            ParameterExpression::Div(a, b) => write!(f, "({a} / {b})"),
        }
    }
}

impl From<f64> for ParameterExpression {
    fn from(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }
}

impl From<i32> for ParameterExpression {
    fn from(value: i32) -> Self {
        ParameterExpression::Constant(f64::from(value))
    }
}

impl From<Parameter> for ParameterExpression {
    fn from(parameter: Parameter) -> Self {
        ParameterExpression::Symbol(parameter)
    }
}

impl From<&Parameter> for ParameterExpression {
    fn from(parameter: &Parameter) -> Self {
        ParameterExpression::Symbol(parameter.clone())
    }
}

impl std::ops::Add for ParameterExpression {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        ParameterExpression::Add(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Sub for ParameterExpression {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        ParameterExpression::Sub(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Mul for ParameterExpression {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        ParameterExpression::Mul(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Div for ParameterExpression {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        ParameterExpression::Div(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Neg for ParameterExpression {
    type Output = Self;

    fn neg(self) -> Self::Output {
        ParameterExpression::Neg(Box::new(self))
    }
}
