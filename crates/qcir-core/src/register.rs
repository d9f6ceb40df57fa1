//! Quantum and classical registers.
//!
//! A register is a named, fixed-length, ordered group of bits of one kind. An
//! *owning* register creates its bits; an *alias* register groups bits that
//! already exist (typically bits of another register or loose bits).

use rustc_hash::FxHashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::bit::{Clbit, Qubit};
use crate::error::{CircuitError, CircuitResult};

/// Common surface of [`QuantumRegister`] and [`ClassicalRegister`].
pub trait Register: Clone + Eq + Hash + fmt::Debug {
    /// The kind of bit this register groups.
    type Bit: Clone + Eq + Hash + fmt::Debug + fmt::Display;

    /// Kind of register, used in error messages.
    const KIND: &'static str;

    /// The register name.
    fn name(&self) -> &str;

    /// The bits of the register, in order.
    fn bits(&self) -> &[Self::Bit];

    /// Number of bits in the register.
    fn len(&self) -> usize {
        self.bits().len()
    }

    /// Whether the register has no bits.
    fn is_empty(&self) -> bool {
        self.bits().is_empty()
    }
}

#[derive(Debug)]
struct RegisterInfo<B> {
    name: Arc<str>,
    bits: Vec<B>,
    owning: bool,
}

macro_rules! register_handle {
    ($(#[$meta:meta])* $name:ident, $bit:ident, $kind:literal, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name(Arc<RegisterInfo<$bit>>);

        impl $name {
            /// Create an owning register of `size` fresh bits.
            pub fn new(name: impl Into<String>, size: u32) -> Self {
                let name: Arc<str> = Arc::from(name.into());
                let bits = (0..size).map(|i| $bit::owned(name.clone(), i)).collect();
                Self(Arc::new(RegisterInfo {
                    name,
                    bits,
                    owning: true,
                }))
            }

            /// Create an owning register whose name is drawn from `names`.
            pub fn anonymous(names: &mut NameSequence, size: u32) -> Self {
                Self::new(names.next_name(), size)
            }

            /// Create an alias register over existing bits.
            ///
            /// Fails if a bit appears more than once.
            pub fn from_bits(
                name: impl Into<String>,
                bits: impl IntoIterator<Item = $bit>,
            ) -> CircuitResult<Self> {
                let bits: Vec<$bit> = bits.into_iter().collect();
                let mut seen = FxHashSet::default();
                for bit in &bits {
                    if !seen.insert(bit) {
                        return Err(CircuitError::Invalid(format!(
                            "register bits must not be duplicated ({bit})"
                        )));
                    }
                }
                Ok(Self(Arc::new(RegisterInfo {
                    name: Arc::from(name.into()),
                    bits,
                    owning: false,
                })))
            }

            /// The bit at `index`, if in range.
            pub fn bit(&self, index: usize) -> Option<&$bit> {
                self.0.bits.get(index)
            }

            /// Position of `bit` within this register.
            pub fn index_of(&self, bit: &$bit) -> Option<usize> {
                self.0.bits.iter().position(|b| b == bit)
            }

            /// Whether this register created its own bits.
            pub fn is_owning(&self) -> bool {
                self.0.owning
            }

            /// Default name prefix for anonymous registers of this kind.
            pub const PREFIX: &'static str = $prefix;
        }

        impl Register for $name {
            type Bit = $bit;
            const KIND: &'static str = $kind;

            fn name(&self) -> &str {
                &self.0.name
            }

            fn bits(&self) -> &[$bit] {
                &self.0.bits
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.0, &other.0)
                    || (self.0.name == other.0.name && self.0.bits == other.0.bits)
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.name.hash(state);
                self.0.bits.len().hash(state);
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(
                    f,
                    "{}({}, '{}')",
                    stringify!($name),
                    self.0.bits.len(),
                    self.0.name
                )
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0.name)
            }
        }
    };
}

register_handle!(
    /// A named group of qubits.
    QuantumRegister,
    Qubit,
    "quantum register",
    "q"
);

register_handle!(
    /// A named group of classical bits.
    ClassicalRegister,
    Clbit,
    "classical register",
    "c"
);

/// A caller-owned source of fresh names (`q0`, `q1`, ...).
///
/// Anonymous naming is always explicit: nothing in the crate keeps a global
/// counter, so two runs that build the same circuits produce the same names.
#[derive(Debug, Clone)]
pub struct NameSequence {
    prefix: String,
    next: u64,
}

impl NameSequence {
    /// Create a sequence producing `{prefix}0`, `{prefix}1`, ...
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }

    /// The next name in the sequence.
    pub fn next_name(&mut self) -> String {
        let name = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        name
    }

    /// The next name for which `taken` returns `false`.
    pub fn fresh_name(&mut self, taken: impl Fn(&str) -> bool) -> String {
        loop {
            let name = self.next_name();
            if !taken(&name) {
                return name;
            }
        }
    }
}
