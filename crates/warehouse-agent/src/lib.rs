//! Warehouse station agent: operator input parsing shared by the binary
//! and its tests.

pub mod input;
