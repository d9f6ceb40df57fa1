//! Bookkeeping for the real-time identifiers a circuit knows about.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::classical::{Identifier, Stretch, Var};
use crate::error::{CircuitError, CircuitResult};

/// How an identifier entered a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentifierKind {
    /// A variable supplied when the circuit is run.
    Input,
    /// An identifier closed over from an enclosing scope.
    Capture,
    /// An identifier declared by the circuit itself.
    Declare,
}

/// Controls how [`copy_empty_like`](crate::Circuit::copy_empty_like) treats identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarsMode {
    /// Keep every identifier with its kind.
    #[default]
    Alike,
    /// Turn every identifier into a capture.
    Captures,
    /// Drop all identifiers.
    Drop,
}

/// Name-indexed identifiers with their declaration kinds.
///
/// Names are unique across both identifier kinds, and a container never holds
/// input variables together with captures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identifiers {
    entries: IndexMap<String, (Identifier, IdentifierKind)>,
    num_input_vars: usize,
    num_captured_vars: usize,
    num_captured_stretches: usize,
    num_declared_vars: usize,
    num_declared_stretches: usize,
}

impl Identifiers {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an identifier of the given kind.
    pub fn add(&mut self, identifier: Identifier, kind: IdentifierKind) -> CircuitResult<()> {
        self.check_add(&identifier, kind)?;
        match (&identifier, kind) {
            (Identifier::Var(_), IdentifierKind::Input) => self.num_input_vars += 1,
            (Identifier::Var(_), IdentifierKind::Capture) => self.num_captured_vars += 1,
            (Identifier::Var(_), IdentifierKind::Declare) => self.num_declared_vars += 1,
            (Identifier::Stretch(_), IdentifierKind::Capture) => self.num_captured_stretches += 1,
            (Identifier::Stretch(_), _) => self.num_declared_stretches += 1,
        }
        self.entries
            .insert(identifier.name().to_string(), (identifier, kind));
        Ok(())
    }

    /// Check that `identifier` could be added as `kind`, without adding it.
    pub fn check_add(&self, identifier: &Identifier, kind: IdentifierKind) -> CircuitResult<()> {
        if let Some((existing, _)) = self.entries.get(identifier.name()) {
            if existing == identifier {
                return Err(CircuitError::DuplicateIdentifier {
                    name: identifier.name().to_string(),
                });
            }
            return Err(CircuitError::IdentifierShadowing {
                name: identifier.name().to_string(),
            });
        }
        match (identifier, kind) {
            (Identifier::Stretch(_), IdentifierKind::Input) => Err(CircuitError::Invalid(format!(
                "stretch '{}' cannot be an input",
                identifier.name()
            ))),
            (_, IdentifierKind::Input) if self.num_captures() > 0 => {
                Err(CircuitError::InputCaptureConflict)
            }
            (_, IdentifierKind::Capture) if self.num_input_vars > 0 => {
                Err(CircuitError::InputCaptureConflict)
            }
            _ => Ok(()),
        }
    }

    /// The identifier called `name`.
    pub fn get(&self, name: &str) -> Option<&Identifier> {
        self.entries.get(name).map(|(ident, _)| ident)
    }

    /// The variable called `name`.
    pub fn get_var(&self, name: &str) -> Option<&Var> {
        self.get(name).and_then(Identifier::as_var)
    }

    /// The stretch called `name`.
    pub fn get_stretch(&self, name: &str) -> Option<&Stretch> {
        self.get(name).and_then(Identifier::as_stretch)
    }

    /// Declaration kind of exactly this identifier.
    pub fn kind_of(&self, identifier: &Identifier) -> Option<IdentifierKind> {
        self.entries
            .get(identifier.name())
            .filter(|(ident, _)| ident == identifier)
            .map(|(_, kind)| *kind)
    }

    /// Whether exactly this identifier is present.
    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.kind_of(identifier).is_some()
    }

    /// Whether any identifier is called `name`.
    pub fn contains_name(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All identifiers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, IdentifierKind)> {
        self.entries.values().map(|(ident, kind)| (ident, *kind))
    }

    /// Identifiers of one kind, in insertion order.
    pub fn iter_kind(&self, kind: IdentifierKind) -> impl Iterator<Item = &Identifier> {
        self.iter()
            .filter(move |(_, k)| *k == kind)
            .map(|(ident, _)| ident)
    }

    /// Variables of one kind, in insertion order.
    pub fn vars(&self, kind: IdentifierKind) -> impl Iterator<Item = &Var> {
        self.iter_kind(kind).filter_map(Identifier::as_var)
    }

    /// Stretches of one kind, in insertion order.
    pub fn stretches(&self, kind: IdentifierKind) -> impl Iterator<Item = &Stretch> {
        self.iter_kind(kind).filter_map(Identifier::as_stretch)
    }

    /// Number of identifiers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no identifiers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of input variables.
    pub fn num_input_vars(&self) -> usize {
        self.num_input_vars
    }

    /// Number of captured variables.
    pub fn num_captured_vars(&self) -> usize {
        self.num_captured_vars
    }

    /// Number of captured stretches.
    pub fn num_captured_stretches(&self) -> usize {
        self.num_captured_stretches
    }

    /// Number of captured identifiers of either kind.
    pub fn num_captures(&self) -> usize {
        self.num_captured_vars + self.num_captured_stretches
    }

    /// Number of locally declared variables.
    pub fn num_declared_vars(&self) -> usize {
        self.num_declared_vars
    }

    /// Number of locally declared stretches.
    pub fn num_declared_stretches(&self) -> usize {
        self.num_declared_stretches
    }

    /// Same identifiers, all turned into captures.
    pub fn clone_as_captures(&self) -> Self {
        let mut out = Self::new();
        for (ident, _) in self.entries.values() {
            out.entries.insert(
                ident.name().to_string(),
                (ident.clone(), IdentifierKind::Capture),
            );
            match ident {
                Identifier::Var(_) => out.num_captured_vars += 1,
                Identifier::Stretch(_) => out.num_captured_stretches += 1,
            }
        }
        out
    }

    /// Rebuild with every identifier passed through `f`, keeping kinds.
    pub fn map(&self, mut f: impl FnMut(&Identifier) -> Identifier) -> CircuitResult<Self> {
        let mut out = Self::new();
        for (ident, kind) in self.iter() {
            out.add(f(ident), kind)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classical::Type;

    #[test]
    fn test_add_and_lookup() {
        let mut idents = Identifiers::new();
        let a = Var::new("a", Type::Bool);
        let s = Stretch::new("s");
        idents.add(a.clone().into(), IdentifierKind::Input).unwrap();
        idents.add(s.clone().into(), IdentifierKind::Declare).unwrap();

        assert_eq!(idents.get_var("a"), Some(&a));
        assert_eq!(idents.get_stretch("s"), Some(&s));
        assert!(idents.get_var("s").is_none());
        assert_eq!(idents.kind_of(&a.into()), Some(IdentifierKind::Input));
        assert_eq!(idents.num_input_vars(), 1);
        assert_eq!(idents.num_declared_stretches(), 1);
    }

    #[test]
    fn test_duplicate_and_shadowing() {
        let mut idents = Identifiers::new();
        let a = Var::new("a", Type::Bool);
        idents.add(a.clone().into(), IdentifierKind::Declare).unwrap();
        assert!(matches!(
            idents.add(a.into(), IdentifierKind::Declare),
            Err(CircuitError::DuplicateIdentifier { .. })
        ));
        assert!(matches!(
            idents.add(Stretch::new("a").into(), IdentifierKind::Declare),
            Err(CircuitError::IdentifierShadowing { .. })
        ));
    }

    #[test]
    fn test_inputs_and_captures_exclusive() {
        let mut idents = Identifiers::new();
        idents
            .add(Var::new("a", Type::Bool).into(), IdentifierKind::Input)
            .unwrap();
        assert!(matches!(
            idents.add(Stretch::new("s").into(), IdentifierKind::Capture),
            Err(CircuitError::InputCaptureConflict)
        ));

        let mut idents = Identifiers::new();
        idents
            .add(Var::new("b", Type::Bool).into(), IdentifierKind::Capture)
            .unwrap();
        assert!(matches!(
            idents.add(Var::new("a", Type::Bool).into(), IdentifierKind::Input),
            Err(CircuitError::InputCaptureConflict)
        ));
    }

    #[test]
    fn test_stretch_cannot_be_input() {
        let mut idents = Identifiers::new();
        assert!(
            idents
                .add(Stretch::new("s").into(), IdentifierKind::Input)
                .is_err()
        );
    }

    #[test]
    fn test_clone_as_captures() {
        let mut idents = Identifiers::new();
        idents
            .add(Var::new("a", Type::Bool).into(), IdentifierKind::Input)
            .unwrap();
        idents
            .add(Stretch::new("s").into(), IdentifierKind::Declare)
            .unwrap();
        let captures = idents.clone_as_captures();
        assert_eq!(captures.num_captured_vars(), 1);
        assert_eq!(captures.num_captured_stretches(), 1);
        assert_eq!(captures.num_input_vars(), 0);
        assert_eq!(captures.iter_kind(IdentifierKind::Capture).count(), 2);
    }
}
