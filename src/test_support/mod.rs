//! Test fixtures shared by unit tests.

pub mod fixtures;
