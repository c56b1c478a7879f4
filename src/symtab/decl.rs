//! Declaration table: one interned handle per qualified class name

use super::class::ClassDefinition;
use super::ClassId;
use std::collections::HashMap;
use std::fmt;
use std::ops::{Index, IndexMut};

/// Lifecycle of a class declaration.
///
/// `Undefined -> Undecided -> {Source | Binary} -> Parsed -> Checked -> Compiled`,
/// with `NotFound` absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Undefined,
    Undecided,
    Source,
    Binary,
    Parsed,
    Checked,
    Compiled,
    NotFound,
}

impl Status {
    /// Position in the progress order; `Source` and `Binary` share a rank.
    pub fn rank(self) -> u8 {
        match self {
            Status::Undefined => 0,
            Status::Undecided => 1,
            Status::Source | Status::Binary => 2,
            Status::Parsed => 3,
            Status::Checked => 4,
            Status::Compiled => 5,
            Status::NotFound => 6,
        }
    }

    /// Whether the loader still has work to do before a definition exists
    pub fn is_undetermined(self) -> bool {
        matches!(self, Status::Undefined | Status::Undecided | Status::Source)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Undefined => "UNDEFINED",
            Status::Undecided => "UNDECIDED",
            Status::Source => "SOURCE",
            Status::Binary => "BINARY",
            Status::Parsed => "PARSED",
            Status::Checked => "CHECKED",
            Status::Compiled => "COMPILED",
            Status::NotFound => "NOTFOUND",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub struct ClassDeclaration {
    pub name: String,
    pub status: Status,
    pub definition: Option<ClassDefinition>,
}

/// Maps qualified names to declarations and owns every class definition.
/// Ids are dense and handed out in first-seen order.
#[derive(Debug, Default)]
pub struct DeclarationTable {
    by_name: HashMap<String, ClassId>,
    decls: Vec<ClassDeclaration>,
}

impl DeclarationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing handle for `name`, or a fresh UNDEFINED one
    pub fn get(&mut self, name: &str) -> ClassId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = ClassId(self.decls.len() as u32);
        self.decls.push(ClassDeclaration { name: name.to_string(), status: Status::Undefined, definition: None });
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Handle for `name` if one was ever created
    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// Every id in creation order. Collected up front so callers may grow the
    /// table while walking the snapshot.
    pub fn ids(&self) -> Vec<ClassId> {
        (0..self.decls.len() as u32).map(ClassId).collect()
    }

    pub fn name(&self, id: ClassId) -> &str {
        &self.decls[id.index()].name
    }

    pub fn status(&self, id: ClassId) -> Status {
        self.decls[id.index()].status
    }

    pub fn set_status(&mut self, id: ClassId, status: Status) {
        let decl = &mut self.decls[id.index()];
        if status.rank() < decl.status.rank() && status != Status::Source {
            log::warn!("declaration {} moves back from {} to {}", decl.name, decl.status, status);
        }
        log::trace!("status: {} {} -> {}", decl.name, decl.status, status);
        decl.status = status;
    }

    pub fn def(&self, id: ClassId) -> Option<&ClassDefinition> {
        self.decls[id.index()].definition.as_ref()
    }

    pub fn def_mut(&mut self, id: ClassId) -> Option<&mut ClassDefinition> {
        self.decls[id.index()].definition.as_mut()
    }

    pub fn set_definition(&mut self, id: ClassId, def: ClassDefinition, status: Status) {
        let decl = &mut self.decls[id.index()];
        decl.definition = Some(def);
        decl.status = status;
    }

    /// Drop the definition, e.g. after a wrong-class binary
    pub fn clear_definition(&mut self, id: ClassId) -> Option<ClassDefinition> {
        self.decls[id.index()].definition.take()
    }
}

/// Indexing requires a definition to be present, like slice indexing
/// requires the index to be in bounds.
impl Index<ClassId> for DeclarationTable {
    type Output = ClassDefinition;

    fn index(&self, id: ClassId) -> &ClassDefinition {
        let decl = &self.decls[id.index()];
        match decl.definition.as_ref() {
            Some(def) => def,
            None => panic!("class {} has no definition", decl.name),
        }
    }
}

impl IndexMut<ClassId> for DeclarationTable {
    fn index_mut(&mut self, id: ClassId) -> &mut ClassDefinition {
        let decl = &mut self.decls[id.index()];
        match decl.definition.as_mut() {
            Some(def) => def,
            None => panic!("class {} has no definition", decl.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_handle_per_name_in_first_seen_order() {
        let mut table = DeclarationTable::new();
        let a = table.get("p.A");
        let b = table.get("p.B");
        assert_eq!(table.get("p.A"), a);
        assert_ne!(a, b);
        assert_eq!(table.ids(), vec![a, b]);
        assert_eq!(table.status(a), Status::Undefined);
        assert_eq!(table.lookup("p.C"), None);
    }

    #[test]
    fn ranks_follow_progress() {
        assert!(Status::Undecided.rank() < Status::Binary.rank());
        assert_eq!(Status::Source.rank(), Status::Binary.rank());
        assert!(Status::Checked.rank() < Status::Compiled.rank());
        assert!(Status::Source.is_undetermined());
        assert!(!Status::Parsed.is_undetermined());
    }
}
