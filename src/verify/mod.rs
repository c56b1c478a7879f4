//! Structural checks over emitted class files
//!
//! The emitter runs these on every class before it is written. A failure
//! means the compiler itself produced an inconsistent class, so callers
//! report it as an internal error rather than a user diagnostic.

mod verifier;
pub mod class_access_flags;
pub mod constant_pool;
pub mod fields;
pub mod method_access_flags;

pub use verifier::{verify, VerifyError, VerifyResult};
