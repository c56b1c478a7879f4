//! Body trees for fields, methods and initializers
//!
//! Class and member skeletons are not trees: the parser hands them to the
//! parser adapter through callbacks, which builds `symtab` definitions.
//! Only executable code (initializers and method bodies) lives here.

pub mod nodes;

pub use nodes::*;
