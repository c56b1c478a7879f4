//! Shared infrastructure: options, diagnostics, the class path and the
//! batch environment that ties them together.

pub mod classloader;
pub mod classpath;
pub mod config;
pub mod consts;
pub mod diagnostics;
pub mod env;
pub mod error;
pub mod manager;
pub mod rt;

pub use config::Config;
pub use consts::*;
pub use env::BatchEnvironment;
pub use error::{Error, ExitStatus, Result};
