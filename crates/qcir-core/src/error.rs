//! Error types for the circuit IR.

use thiserror::Error;

use crate::classical::Type;

/// Errors that can occur while building, mutating or querying a circuit.
///
/// Every fallible mutation validates before it writes, so a returned error
/// means the circuit is unchanged.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CircuitError {
    /// A bit was added to a circuit that already contains it.
    #[error("{kind} {bit} is already present in the circuit")]
    DuplicateBit {
        /// "qubit" or "clbit".
        kind: &'static str,
        /// Display form of the offending bit.
        bit: String,
    },

    /// A register (or identifier) name is already in use.
    #[error("{kind} name '{name}' already exists in the circuit")]
    DuplicateName {
        /// What carries the name ("quantum register", "classical register", ...).
        kind: &'static str,
        /// The duplicated name.
        name: String,
    },

    /// A bit, register or parameter was looked up but never added.
    #[error("{kind} {name} not found in circuit")]
    NotFound {
        /// What was looked up.
        kind: &'static str,
        /// Display form of the missing object.
        name: String,
    },

    /// An instruction references a bit the circuit does not contain.
    #[error("{kind} {bit} is not in the circuit{}", format_op_context(.operation))]
    Resource {
        /// "qubit" or "clbit".
        kind: &'static str,
        /// Display form of the missing bit.
        bit: String,
        /// Operation being appended, for context.
        operation: Option<String>,
    },

    /// A qubit index is out of range.
    #[error("qubit index {index} out of range for a circuit with {num_qubits} qubits")]
    QubitIndexOutOfRange {
        /// The requested index.
        index: u32,
        /// The number of qubits in the circuit.
        num_qubits: usize,
    },

    /// A clbit index is out of range.
    #[error("clbit index {index} out of range for a circuit with {num_clbits} clbits")]
    ClbitIndexOutOfRange {
        /// The requested index.
        index: u32,
        /// The number of clbits in the circuit.
        num_clbits: usize,
    },

    /// The same bit appears twice in one operand list.
    #[error("duplicate {kind} {bit} in operands of '{operation}'")]
    DuplicateOperand {
        /// "qubit" or "clbit".
        kind: &'static str,
        /// Display form of the repeated bit.
        bit: String,
        /// Name of the operation.
        operation: String,
    },

    /// Operand count disagrees with the operation's declared arity.
    #[error("operation '{operation}' expects {expected} {kind} argument(s), got {got}")]
    ArgumentCount {
        /// Name of the operation.
        operation: String,
        /// "qubit" or "clbit".
        kind: &'static str,
        /// Declared arity.
        expected: usize,
        /// Supplied count.
        got: usize,
    },

    /// Operand lists could not be broadcast against each other.
    #[error("cannot broadcast arguments of '{operation}': {reason}")]
    Broadcast {
        /// Name of the operation.
        operation: String,
        /// Why broadcasting failed.
        reason: String,
    },

    /// A parameter in an assignment is not used by the circuit.
    #[error("cannot bind parameter '{name}': not present in the circuit")]
    ParameterNotFound {
        /// Name of the parameter.
        name: String,
    },

    /// Positional assignment with the wrong number of values.
    #[error("mismatching number of values and parameters: expected {expected}, got {got}")]
    ParameterCountMismatch {
        /// Number of free parameters.
        expected: usize,
        /// Number of values supplied.
        got: usize,
    },

    /// Two distinct parameters share a name.
    #[error("name conflict on adding parameter '{name}'")]
    ParameterNameConflict {
        /// The conflicting name.
        name: String,
    },

    /// An identifier is added twice.
    #[error("identifier '{name}' is already present in the circuit")]
    DuplicateIdentifier {
        /// Name of the identifier.
        name: String,
    },

    /// An identifier name shadows another visible name.
    #[error("cannot add '{name}' as its name shadows an existing identifier")]
    IdentifierShadowing {
        /// The shadowing name.
        name: String,
    },

    /// Inputs and captures were mixed in one circuit.
    #[error("circuits with input variables cannot be enclosed, so they cannot be closures")]
    InputCaptureConflict,

    /// An identifier is used but not declared in any visible scope.
    #[error("identifier '{name}' is not present in this circuit or any enclosing scope")]
    UndeclaredIdentifier {
        /// Name of the identifier.
        name: String,
    },

    /// A `Var` was given where a `Stretch` was expected, or vice versa.
    #[error("identifier '{name}' is a {got}, expected a {expected}")]
    IdentifierKindMismatch {
        /// Name of the identifier.
        name: String,
        /// Expected kind ("var" or "stretch").
        expected: &'static str,
        /// Supplied kind.
        got: &'static str,
    },

    /// An expression or replacement has the wrong classical type.
    #[error("mismatched types for '{name}': '{expected}' cannot become '{got}'")]
    TypeMismatch {
        /// Name of the identifier or target.
        name: String,
        /// Expected type.
        expected: Type,
        /// Supplied type.
        got: Type,
    },

    /// The target of a store is not assignable.
    #[error("invalid lvalue: {0}")]
    InvalidLvalue(String),

    /// `break_loop`/`continue_loop` outside a loop.
    #[error("'{kind}' is not valid here: {reason}")]
    JumpOutsideLoop {
        /// "break_loop" or "continue_loop".
        kind: &'static str,
        /// Why jumps are forbidden in the current scope.
        reason: &'static str,
    },

    /// An operation that needs a closed builder stack was called inside one.
    #[error("{0}")]
    ActiveScope(&'static str),

    /// A builder scope was closed out of order.
    #[error("control-flow scope mismatch: expected depth {expected}, found {found}")]
    ScopeMismatch {
        /// Expected stack depth.
        expected: usize,
        /// Actual stack depth.
        found: usize,
    },

    /// A switch case label was used twice.
    #[error("duplicate case label {0}")]
    DuplicateCaseLabel(String),

    /// A capture to be inlined by compose does not exist in the destination.
    #[error(
        "variable '{name}' to be inlined is not in the base circuit; use `inline_captures = false` to add it"
    )]
    InlineCaptureMissing {
        /// Name of the capture (after remapping).
        name: String,
    },

    /// The composed circuit is wider than the destination.
    #[error(
        "trying to compose with another circuit which has more {kind} ({source_count}) than the destination ({destination_count})"
    )]
    ComposeWidth {
        /// "qubits" or "clbits".
        kind: &'static str,
        /// Source width.
        source_count: usize,
        /// Destination width.
        destination_count: usize,
    },

    /// Explicit compose targets are malformed.
    #[error("invalid {kind} targets for compose: {reason}")]
    ComposeTargets {
        /// "qubit" or "clbit".
        kind: &'static str,
        /// What is wrong with them.
        reason: String,
    },

    /// A circuit cannot be converted into a gate.
    #[error("circuit cannot be converted to a gate: {0}")]
    NotAGate(String),

    /// Generic invalid operation.
    #[error("{0}")]
    Invalid(String),
}

/// Helper function to format optional operation context.
#[allow(clippy::ref_option)]
fn format_op_context(operation: &Option<String>) -> String {
    match operation {
        Some(name) => format!(" (operation: {name})"),
        None => String::new(),
    }
}

/// Result type for circuit operations.
pub type CircuitResult<T> = Result<T, CircuitError>;
