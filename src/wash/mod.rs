//! Semantic analysis of source classes
//!
//! - `enter`: parse a file and declare its classes
//! - `resolve`: imports, supertypes, member types and cycle detection
//! - `check`: inheritance rules, then attribution and flow of every body
//! - `attr`: expression and statement attribution, constant folding
//! - `flow`: definite assignment, reachability and checked exceptions
//! - `lower`: synthetic members (access bridges, outer-instance links,
//!   captured locals, default constructors, class literal helpers)

pub mod attr;
pub mod check;
pub mod enter;
pub mod flow;
pub mod lower;
pub mod resolve;

pub use check::check_nest;
pub use enter::parse_source;
pub use resolve::resolve_class;
