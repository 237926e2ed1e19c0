//! interpose core - call interception for core objects
//!
//! Observers declare which role methods they want to see. The chain wraps
//! each new core object so those calls reach the observer while everything
//! else goes straight to the object.

pub mod chain;
pub mod error;
pub mod invocation;
pub mod observer;
pub mod plugin;
pub mod role;
pub mod signature;
pub mod target;

pub use chain::ObserverChain;
pub use error::{Error, Result};
pub use invocation::Invocation;
pub use observer::{Binding, Observer};
pub use plugin::Plugin;
pub use role::{Method, Role, RoleSet};
pub use signature::{Signature, SignatureSet};
pub use target::*;
