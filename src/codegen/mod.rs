//! Class-file generation
//!
//! Structures of the class-file format and their serialization, the
//! bytecode assembler and body generator, the reader used for binary
//! classes on the class path, and the emitter that turns a checked source
//! class into bytes.

pub mod attribute;
pub mod class;
pub mod class_writer;
pub mod code;
pub mod constpool;
pub mod defs;
pub mod gen;
pub mod opcodes;
pub mod reader;
pub mod registry;
pub mod sink;
pub mod writer;

pub use class::{ClassFile, FieldInfo, MethodInfo};
pub use class_writer::{write_class, ClassWriter, EmittedClass};
pub use constpool::{Constant, ConstantPool};
pub use registry::{ActiveCompilations, ActiveGuard};
pub use sink::{ClassSink, DirectorySink, MemorySink};
pub use writer::ClassfileWritable;
