//! Classical types and the identity-compared real-time handles.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The type of a real-time classical value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// A single bit of truth.
    Bool,
    /// An unsigned integer of the given bit width.
    Uint(u32),
    /// A floating-point number.
    Float,
    /// A length of time.
    Duration,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => f.write_str("bool"),
            Type::Uint(width) => write!(f, "uint[{width}]"),
            Type::Float => f.write_str("float"),
            Type::Duration => f.write_str("duration"),
        }
    }
}

/// A literal classical value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// A boolean literal.
    Bool(bool),
    /// An unsigned integer literal.
    Uint(u64),
    /// A floating-point literal.
    Float(f64),
}

impl Value {
    /// The narrowest type that holds this value.
    pub fn natural_type(&self) -> Type {
        match self {
            Value::Bool(_) => Type::Bool,
            Value::Uint(v) => Type::Uint((u64::BITS - v.leading_zeros()).max(1)),
            Value::Float(_) => Type::Float,
        }
    }

    /// Whether the value can be given type `ty` without losing information.
    pub fn fits(&self, ty: Type) -> bool {
        match (self, ty) {
            (Value::Bool(_), Type::Bool) | (Value::Float(_), Type::Float) => true,
            (Value::Uint(v), Type::Uint(width)) => width >= u64::BITS || *v >> width == 0,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Uint(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
        }
    }
}

/// A typed real-time classical variable.
///
/// Equality is identity: two variables created separately are different even
/// if they share a name and type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Var {
    name: String,
    ty: Type,
    uuid: Uuid,
}

impl Var {
    /// Create a fresh variable.
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            uuid: Uuid::new_v4(),
        }
    }

    /// The variable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The variable type.
    pub fn ty(&self) -> Type {
        self.ty
    }

    /// The identity of the variable.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A named duration placeholder, resolved by a scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stretch {
    name: String,
    uuid: Uuid,
}

impl Stretch {
    /// Create a fresh stretch.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: Uuid::new_v4(),
        }
    }

    /// The stretch name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stretches are always durations.
    pub fn ty(&self) -> Type {
        Type::Duration
    }

    /// The identity of the stretch.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }
}

impl fmt::Display for Stretch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Either kind of real-time identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identifier {
    /// A storage variable.
    Var(Var),
    /// A duration placeholder.
    Stretch(Stretch),
}

impl Identifier {
    /// The identifier name.
    pub fn name(&self) -> &str {
        match self {
            Identifier::Var(v) => v.name(),
            Identifier::Stretch(s) => s.name(),
        }
    }

    /// The identifier type.
    pub fn ty(&self) -> Type {
        match self {
            Identifier::Var(v) => v.ty(),
            Identifier::Stretch(s) => s.ty(),
        }
    }

    /// "var" or "stretch".
    pub fn kind_name(&self) -> &'static str {
        match self {
            Identifier::Var(_) => "var",
            Identifier::Stretch(_) => "stretch",
        }
    }

    /// The variable, if this is one.
    pub fn as_var(&self) -> Option<&Var> {
        match self {
            Identifier::Var(v) => Some(v),
            Identifier::Stretch(_) => None,
        }
    }

    /// The stretch, if this is one.
    pub fn as_stretch(&self) -> Option<&Stretch> {
        match self {
            Identifier::Stretch(s) => Some(s),
            Identifier::Var(_) => None,
        }
    }

    /// A fresh identifier of the same kind and type under a new name.
    pub(crate) fn renamed(&self, name: &str) -> Self {
        match self {
            Identifier::Var(v) => Identifier::Var(Var::new(name, v.ty())),
            Identifier::Stretch(_) => Identifier::Stretch(Stretch::new(name)),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Var> for Identifier {
    fn from(var: Var) -> Self {
        Identifier::Var(var)
    }
}

impl From<&Var> for Identifier {
    fn from(var: &Var) -> Self {
        Identifier::Var(var.clone())
    }
}

impl From<Stretch> for Identifier {
    fn from(stretch: Stretch) -> Self {
        Identifier::Stretch(stretch)
    }
}

impl From<&Stretch> for Identifier {
    fn from(stretch: &Stretch) -> Self {
        Identifier::Stretch(stretch.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_display() {
        assert_eq!(Type::Bool.to_string(), "bool");
        assert_eq!(Type::Uint(8).to_string(), "uint[8]");
        assert_eq!(Type::Duration.to_string(), "duration");
    }

    #[test]
    fn test_value_natural_type() {
        assert_eq!(Value::Uint(0).natural_type(), Type::Uint(1));
        assert_eq!(Value::Uint(5).natural_type(), Type::Uint(3));
        assert_eq!(Value::Uint(u64::MAX).natural_type(), Type::Uint(64));
        assert!(Value::Uint(255).fits(Type::Uint(8)));
        assert!(!Value::Uint(256).fits(Type::Uint(8)));
        assert!(!Value::Bool(true).fits(Type::Uint(1)));
    }

    #[test]
    fn test_var_identity() {
        let a = Var::new("a", Type::Bool);
        let other = Var::new("a", Type::Bool);
        assert_ne!(a, other);
        assert_eq!(Identifier::from(&a), Identifier::Var(a.clone()));
    }

    #[test]
    fn test_identifier_serde_keeps_identity() {
        let s = Identifier::from(Stretch::new("s"));
        let json = serde_json::to_string(&s).unwrap();
        let back: Identifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
        assert_eq!(back.ty(), Type::Duration);
        assert_eq!(back.kind_name(), "stretch");
    }
}
