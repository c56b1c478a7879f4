//! Symbol tables: declarations, class and member definitions, types
//!
//! Classes live in an arena owned by the [`DeclarationTable`] and are
//! addressed by dense [`ClassId`]s. Members are stored in per-class vectors
//! and addressed by [`MemberRef`]. Every upward link (member to class, inner
//! to outer) is a plain id.

pub mod class;
pub mod decl;
pub mod member;
pub mod types;

pub use class::{Captured, ClassDefinition, Origin};
pub use decl::{ClassDeclaration, DeclarationTable, Status};
pub use member::{AccessKind, ConstValue, MemberDefinition, MemberKind, MemberStatus, Param};
pub use types::{internal_name, package_of, MethodType, Type};

use std::fmt;

/// Handle of a class declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

impl ClassId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A member, addressed by its class and its position in the member list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberRef {
    pub class: ClassId,
    pub index: u32,
}

impl MemberRef {
    pub fn new(class: ClassId, index: usize) -> Self {
        Self { class, index: index as u32 }
    }
}

/// Progress tag of a re-entrant phase. Entry checks and sets it; callers
/// that find `InProgress` are looking at a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    NotStarted,
    InProgress,
    Done,
}
