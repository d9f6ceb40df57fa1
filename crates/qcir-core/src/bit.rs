//! Qubit and classical bit handles.
//!
//! Two kinds of bit reference live side by side:
//!
//! - [`Qubit`] / [`Clbit`] are identity-compared handles. Two handles are equal
//!   only if they were cloned from the same original, so the same handle can be
//!   shared by several circuits and still be recognised by each of them.
//! - [`QubitId`] / [`ClbitId`] are positions inside one particular circuit's bit
//!   list. They are what instruction records store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Position of a qubit within a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QubitId(pub u32);

impl QubitId {
    /// The position as a `usize`, for indexing.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for QubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

impl From<u32> for QubitId {
    fn from(id: u32) -> Self {
        QubitId(id)
    }
}

impl From<usize> for QubitId {
    fn from(id: usize) -> Self {
        QubitId(u32::try_from(id).expect("QubitId overflow: exceeds u32::MAX"))
    }
}

/// Position of a classical bit within a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClbitId(pub u32);

impl ClbitId {
    /// The position as a `usize`, for indexing.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClbitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl From<u32> for ClbitId {
    fn from(id: u32) -> Self {
        ClbitId(id)
    }
}

impl From<usize> for ClbitId {
    fn from(id: usize) -> Self {
        ClbitId(u32::try_from(id).expect("ClbitId overflow: exceeds u32::MAX"))
    }
}

/// The register that created a bit, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BitOwner {
    pub(crate) register: Arc<str>,
    pub(crate) index: u32,
}

#[derive(Debug)]
pub(crate) struct BitInfo {
    owner: Option<BitOwner>,
}

macro_rules! bit_handle {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name(Arc<BitInfo>);

        impl $name {
            /// Create a new loose bit that belongs to no register.
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(Arc::new(BitInfo { owner: None }))
            }

            /// Create a bit owned by the register `register` at position `index`.
            pub(crate) fn owned(register: Arc<str>, index: u32) -> Self {
                Self(Arc::new(BitInfo {
                    owner: Some(BitOwner { register, index }),
                }))
            }

            /// Name of the register that created this bit.
            pub fn register_name(&self) -> Option<&str> {
                self.0.owner.as_ref().map(|o| &*o.register)
            }

            /// Position of this bit within its owning register.
            pub fn register_index(&self) -> Option<u32> {
                self.0.owner.as_ref().map(|o| o.index)
            }

            /// Whether the bit was created without a register.
            pub fn is_loose(&self) -> bool {
                self.0.owner.is_none()
            }

            /// Kind of bit, used in error messages.
            pub const KIND: &'static str = $kind;
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.0, &other.0)
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                std::ptr::hash(Arc::as_ptr(&self.0), state);
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match &self.0.owner {
                    Some(owner) => write!(
                        f,
                        "{}({}, {})",
                        stringify!($name),
                        owner.register,
                        owner.index
                    ),
                    None => write!(f, "{}({:p})", stringify!($name), Arc::as_ptr(&self.0)),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match &self.0.owner {
                    Some(owner) => write!(f, "{}[{}]", owner.register, owner.index),
                    None => write!(f, "<loose {} {:p}>", $kind, Arc::as_ptr(&self.0)),
                }
            }
        }
    };
}

bit_handle!(
    /// An identity-compared quantum bit handle.
    Qubit,
    "qubit"
);

bit_handle!(
    /// An identity-compared classical bit handle.
    Clbit,
    "clbit"
);
