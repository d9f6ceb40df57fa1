//! Bit lists with O(1) reverse lookup and register bookkeeping.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::error::{CircuitError, CircuitResult};
use crate::register::Register;

/// Where a bit lives in a circuit: its index and every register containing it.
#[derive(Debug, Clone, PartialEq)]
pub struct BitLocation<R> {
    index: u32,
    registers: Vec<(R, usize)>,
}

impl<R> BitLocation<R> {
    fn new(index: u32) -> Self {
        Self {
            index,
            registers: Vec::new(),
        }
    }

    /// Index of the bit in the circuit's bit list.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Registers containing the bit, with the bit's position in each.
    pub fn registers(&self) -> &[(R, usize)] {
        &self.registers
    }
}

/// Ordered bits of one kind, their reverse index and their registers.
///
/// The reverse map is updated on every insertion, so `find` never scans.
#[derive(Debug, Clone)]
pub struct BitData<R: Register> {
    bits: Vec<R::Bit>,
    locations: FxHashMap<R::Bit, BitLocation<R>>,
    registers: IndexMap<String, R>,
}

impl<R: Register> Default for BitData<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Register> BitData<R> {
    /// Create an empty bit list.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty bit list with room for `capacity` bits.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bits: Vec::with_capacity(capacity),
            locations: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            registers: IndexMap::new(),
        }
    }

    /// Number of bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Whether there are no bits.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// The bits, in insertion order.
    #[inline]
    pub fn bits(&self) -> &[R::Bit] {
        &self.bits
    }

    /// The bit at `index`.
    #[inline]
    pub fn get(&self, index: u32) -> Option<&R::Bit> {
        self.bits.get(index as usize)
    }

    /// Location of `bit`, if present.
    #[inline]
    pub fn find(&self, bit: &R::Bit) -> Option<&BitLocation<R>> {
        self.locations.get(bit)
    }

    /// Index of `bit`, if present.
    #[inline]
    pub fn index_of(&self, bit: &R::Bit) -> Option<u32> {
        self.locations.get(bit).map(BitLocation::index)
    }

    /// Whether `bit` is present.
    #[inline]
    pub fn contains(&self, bit: &R::Bit) -> bool {
        self.locations.contains_key(bit)
    }

    /// Append `bit`, returning its index.
    ///
    /// With `strict`, adding a bit that is already present is an error;
    /// otherwise the existing index is returned.
    pub fn add(&mut self, bit: R::Bit, strict: bool) -> CircuitResult<u32> {
        if let Some(location) = self.locations.get(&bit) {
            if strict {
                return Err(CircuitError::DuplicateBit {
                    kind: bit_kind::<R>(),
                    bit: bit.to_string(),
                });
            }
            return Ok(location.index);
        }
        let index = u32::try_from(self.bits.len())
            .map_err(|_| CircuitError::Invalid("too many bits in circuit".into()))?;
        self.bits.push(bit.clone());
        self.locations.insert(bit, BitLocation::new(index));
        Ok(index)
    }

    /// Registers, in insertion order.
    pub fn registers(&self) -> impl ExactSizeIterator<Item = &R> {
        self.registers.values()
    }

    /// Number of registers.
    pub fn num_registers(&self) -> usize {
        self.registers.len()
    }

    /// The register called `name`.
    pub fn get_register(&self, name: &str) -> Option<&R> {
        self.registers.get(name)
    }

    /// Whether exactly this register is present.
    pub fn has_register(&self, register: &R) -> bool {
        self.registers
            .get(register.name())
            .is_some_and(|r| r == register)
    }

    /// Add a register, first adding any of its bits that are not yet present.
    ///
    /// Fails without side effects if a register of the same name exists.
    pub fn add_register(&mut self, register: R) -> CircuitResult<()> {
        if self.registers.contains_key(register.name()) {
            return Err(CircuitError::DuplicateName {
                kind: R::KIND,
                name: register.name().to_string(),
            });
        }
        for (position, bit) in register.bits().iter().enumerate() {
            self.add(bit.clone(), false)?;
            if let Some(location) = self.locations.get_mut(bit) {
                location.registers.push((register.clone(), position));
            }
        }
        self.registers.insert(register.name().to_string(), register);
        Ok(())
    }
}

fn bit_kind<R: Register>() -> &'static str {
    if R::KIND.starts_with("quantum") {
        "qubit"
    } else {
        "clbit"
    }
}
