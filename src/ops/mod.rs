//! High-level operations: layout planning, file materialization, and the
//! isolation pipeline itself.

pub mod isolate;
pub mod layout;
pub mod materialize;
