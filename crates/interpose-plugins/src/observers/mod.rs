//! Builtin observers.
//!
//! Each observer is a self-contained module. To add a new one:
//! 1. Create a new file in this directory
//! 2. Implement the Observer trait
//! 3. Add `pub mod <name>;` here
//! 4. Register it in create_default_registry() in ../lib.rs

pub mod read_only;
pub mod row_limit;
pub mod statement_filter;
pub mod timing;
