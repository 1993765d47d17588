//! Command implementations.

pub mod assign;
pub mod check;
