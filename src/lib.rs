//! interpose - observer chains over an in-memory SQL mapper
//!
//! The interception machinery lives in `interpose-core`, the builtin
//! observers in `interpose-plugins`. This crate supplies the core objects
//! and the subsystem that creates them.

pub mod engine;
pub mod script;
pub mod session;

pub use engine::MemoryDatabase;
pub use session::Configuration;
