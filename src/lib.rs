//! jbatch: a batch Java compiler with demand-driven class resolution
//!
//! ## Architecture
//!
//! - **symtab**: declaration table, class and member definitions, types
//! - **common**: configuration, errors, diagnostics, class path lookup, the
//!   batch environment and the loader
//! - **parser**: lexer and recursive-descent parser reporting declarations
//!   through callbacks
//! - **ast**: member bodies
//! - **wash**: parser adapter, structural resolution, class checking, body
//!   attribution, flow analysis and synthetic members
//! - **codegen**: class-file structures, bytecode generation, the class
//!   reader and the emitter
//! - **verify**: consistency checks on emitted class files
//! - **driver**: the fixpoint compilation loop
//! - **bin**: command-line interface (similar to javac)
//!
//! ## Class lifecycle
//!
//! ```text
//! UNDEFINED -> UNDECIDED -> SOURCE | BINARY
//!                              |
//!                           PARSED -> CHECKED -> COMPILED
//! ```
//!
//! Declarations that cannot be found end in NOTFOUND.

pub mod ast;
pub mod codegen;
pub mod common;
pub mod driver;
pub mod parser;
pub mod symtab;
pub mod verify;
pub mod wash;

pub use common::config::{Config, DebugInfo, Target};
pub use common::error::{Error, ExitStatus, Result};
pub use driver::{CompileOutput, Compiler};

use codegen::sink::MemorySink;
use std::collections::BTreeMap;

/// Compile source texts in memory and return the class files by binary
/// name, with the run's outcome
pub fn compile_in_memory(config: Config, sources: &[(&str, &str)]) -> Result<(CompileOutput, BTreeMap<String, Vec<u8>>)> {
    let mut compiler = Compiler::new(config);
    for (path, text) in sources {
        compiler.add_source_text(*path, *text)?;
    }
    let mut sink = MemorySink::new();
    let output = compiler.compile(&mut sink);
    Ok((output, sink.classes))
}
