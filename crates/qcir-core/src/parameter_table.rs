//! Index from parameters to the places they are used.

use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::OnceLock;

use crate::error::{CircuitError, CircuitResult};
use crate::instruction::Instruction;
use crate::operation::Operation;
use crate::parameter::{Parameter, ParameterExpression};

/// A place a parameter appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterUse {
    /// The circuit's global phase.
    GlobalPhase,
    /// Parameter slot `slot` of instruction `index`. For control flow the
    /// slot is the block position.
    Instruction {
        /// Index of the instruction.
        index: usize,
        /// Parameter slot or block position.
        slot: usize,
    },
}

/// Incrementally maintained parameter → use-site index.
///
/// Parameter names are unique: two different parameters with the same name
/// cannot both be tracked.
#[derive(Debug, Clone, Default)]
pub struct ParameterTable {
    uses: FxHashMap<Parameter, FxHashSet<ParameterUse>>,
    by_name: FxHashMap<String, Parameter>,
    order: OnceLock<Vec<Parameter>>,
}

impl ParameterTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked parameters.
    pub fn len(&self) -> usize {
        self.uses.len()
    }

    /// Whether no parameters are tracked.
    pub fn is_empty(&self) -> bool {
        self.uses.is_empty()
    }

    /// Whether `parameter` is tracked.
    pub fn contains(&self, parameter: &Parameter) -> bool {
        self.uses.contains_key(parameter)
    }

    /// The tracked parameter called `name`.
    pub fn get_by_name(&self, name: &str) -> Option<&Parameter> {
        self.by_name.get(name)
    }

    /// The use sites of `parameter`.
    pub fn uses(&self, parameter: &Parameter) -> Option<&FxHashSet<ParameterUse>> {
        self.uses.get(parameter)
    }

    /// Tracked parameters in canonical binding order.
    ///
    /// Parameters sort by name, except that elements of one parameter vector
    /// sort by index. The order is computed once per change.
    pub fn sorted(&self) -> &[Parameter] {
        self.order.get_or_init(|| {
            let mut params: Vec<Parameter> = self.uses.keys().cloned().collect();
            params.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
            params
        })
    }

    /// Fail if any of `parameters` shares a name with a different parameter,
    /// either one already tracked or another in the same batch.
    pub fn check<'a>(&self, parameters: impl IntoIterator<Item = &'a Parameter>) -> CircuitResult<()> {
        let mut batch: FxHashMap<&str, &Parameter> = FxHashMap::default();
        for param in parameters {
            let clash = self.by_name.get(param.name()).is_some_and(|p| p != param)
                || batch.insert(param.name(), param).is_some_and(|p| p != param);
            if clash {
                return Err(CircuitError::ParameterNameConflict {
                    name: param.name().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Check the free parameters of `operation`.
    pub fn check_operation(&self, operation: &Operation) -> CircuitResult<()> {
        let mut params = Vec::new();
        operation.for_each_parameter(|_, p| params.push(p.clone()));
        self.check(&params)
    }

    fn track(&mut self, site: ParameterUse, parameter: &Parameter) {
        if let Some(uses) = self.uses.get_mut(parameter) {
            uses.insert(site);
            return;
        }
        self.uses
            .insert(parameter.clone(), FxHashSet::from_iter([site]));
        self.by_name
            .insert(parameter.name().to_string(), parameter.clone());
        self.order = OnceLock::new();
    }

    fn untrack(&mut self, site: ParameterUse, parameter: &Parameter) {
        let Some(uses) = self.uses.get_mut(parameter) else {
            return;
        };
        uses.remove(&site);
        if uses.is_empty() {
            self.uses.remove(parameter);
            self.by_name.remove(parameter.name());
            self.order = OnceLock::new();
        }
    }

    /// Record every parameter of the operation at instruction `index`.
    pub fn track_operation(&mut self, index: usize, operation: &Operation) {
        operation.for_each_parameter(|slot, p| {
            self.track(ParameterUse::Instruction { index, slot }, p);
        });
    }

    /// Forget every parameter use of the operation at instruction `index`.
    pub fn untrack_operation(&mut self, index: usize, operation: &Operation) {
        operation.for_each_parameter(|slot, p| {
            self.untrack(ParameterUse::Instruction { index, slot }, p);
        });
    }

    /// Record the parameters of a global phase.
    pub fn track_global_phase(&mut self, phase: &ParameterExpression) {
        for p in phase.parameters() {
            self.track(ParameterUse::GlobalPhase, &p);
        }
    }

    /// Forget the parameters of a global phase.
    pub fn untrack_global_phase(&mut self, phase: &ParameterExpression) {
        for p in phase.parameters() {
            self.untrack(ParameterUse::GlobalPhase, &p);
        }
    }

    /// Indices of instructions using any of `parameters`, ascending, and
    /// whether the global phase uses one.
    pub fn affected<'a>(
        &self,
        parameters: impl IntoIterator<Item = &'a Parameter>,
    ) -> (Vec<usize>, bool) {
        let mut indices = FxHashSet::default();
        let mut global_phase = false;
        for param in parameters {
            for site in self.uses.get(param).into_iter().flatten() {
                match site {
                    ParameterUse::GlobalPhase => global_phase = true,
                    ParameterUse::Instruction { index, .. } => {
                        indices.insert(*index);
                    }
                }
            }
        }
        let mut indices: Vec<usize> = indices.into_iter().collect();
        indices.sort_unstable();
        (indices, global_phase)
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.uses.clear();
        self.by_name.clear();
        self.order = OnceLock::new();
    }

    /// Rebuild from scratch after instructions moved.
    pub fn rebuild(&mut self, instructions: &[Instruction], global_phase: &ParameterExpression) {
        self.clear();
        self.track_global_phase(global_phase);
        for (index, inst) in instructions.iter().enumerate() {
            self.track_operation(index, &inst.operation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::StandardGate;
    use crate::parameter::ParameterVector;

    fn rz(p: &Parameter) -> Operation {
        Operation::Standard(StandardGate::Rz(ParameterExpression::symbol(p)))
    }

    #[test]
    fn test_track_and_untrack() {
        let theta = Parameter::new("theta");
        let mut table = ParameterTable::new();
        table.track_operation(0, &rz(&theta));
        table.track_operation(3, &rz(&theta));
        assert_eq!(table.uses(&theta).unwrap().len(), 2);

        table.untrack_operation(0, &rz(&theta));
        assert!(table.contains(&theta));
        table.untrack_operation(3, &rz(&theta));
        assert!(!table.contains(&theta));
        assert!(table.get_by_name("theta").is_none());
    }

    #[test]
    fn test_name_conflict() {
        let mut table = ParameterTable::new();
        table.track_operation(0, &rz(&Parameter::new("a")));
        let other = Parameter::new("a");
        assert!(matches!(
            table.check_operation(&rz(&other)),
            Err(CircuitError::ParameterNameConflict { .. })
        ));
    }

    #[test]
    fn test_sorted_order() {
        let x = ParameterVector::new("x", 11);
        let b = Parameter::new("b");
        let mut table = ParameterTable::new();
        table.track_operation(0, &rz(&x[10]));
        table.track_operation(1, &rz(&b));
        table.track_operation(2, &rz(&x[2]));
        let names: Vec<&str> = table.sorted().iter().map(Parameter::name).collect();
        assert_eq!(names, vec!["b", "x[2]", "x[10]"]);

        // The cached order is dropped when a parameter arrives.
        let a = Parameter::new("a");
        table.track_global_phase(&ParameterExpression::symbol(&a));
        assert_eq!(table.sorted()[0], a);
    }

    #[test]
    fn test_affected() {
        let a = Parameter::new("a");
        let mut table = ParameterTable::new();
        table.track_operation(4, &rz(&a));
        table.track_operation(1, &rz(&a));
        table.track_global_phase(&ParameterExpression::symbol(&a));
        assert_eq!(table.affected([&a]), (vec![1, 4], true));
    }
}
