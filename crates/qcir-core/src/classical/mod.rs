//! Real-time classical values: types, variables, stretches and expressions.

mod expr;
mod types;

pub use expr::{BinaryOp, Expr, UnaryOp};
pub use types::{Identifier, Stretch, Type, Value, Var};
