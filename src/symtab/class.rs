//! Class definitions, source and binary

use super::member::{AccessKind, MemberDefinition, MemberKind};
use super::types::Type;
use super::{ClassId, MemberRef, Phase};
use crate::ast::TypeName;
use crate::common::consts::*;
use crate::common::diagnostics::FileId;
use crate::parser::span::Where;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Where a definition came from
#[derive(Debug, Clone)]
pub enum Origin {
    Source { file: FileId },
    Binary { path: PathBuf, source_name: Option<String>, dependencies: Vec<String> },
    /// Built-in description of a bootstrap class
    Builtin,
}

/// A local of an enclosing method copied into a `val$` field
#[derive(Debug, Clone)]
pub struct Captured {
    pub name: String,
    pub ty: Type,
    pub field: u32,
}

#[derive(Debug, Clone)]
pub struct ClassDefinition {
    pub id: ClassId,
    /// Binary name, `p.Outer$Inner`
    pub name: String,
    /// None for anonymous classes
    pub simple_name: Option<String>,
    pub package: String,
    pub origin: Origin,
    pub pos: Where,
    pub end_pos: Where,
    pub modifiers: u32,
    pub doc: Option<String>,

    pub super_name: Option<TypeName>,
    pub interface_names: Vec<TypeName>,
    pub super_class: Option<ClassId>,
    pub interfaces: Vec<ClassId>,

    pub outer: Option<ClassId>,
    pub members: Vec<MemberDefinition>,
    /// Numbering for local and anonymous classes declared below this one
    pub local_counter: u32,
    /// Local or anonymous class declared in a static method or initializer
    pub in_static_context: bool,

    pub resolve_phase: Phase,
    pub check_phase: Phase,
    pub erroneous: bool,

    /// Other declarations this class depends on
    pub dependencies: BTreeSet<ClassId>,
    pub inherited_collected: bool,
    /// Set when an abstract package-private method of a superclass in
    /// another package can never be implemented here
    pub permanently_abstract: bool,

    /// Synthetic accessors carried by this class, by target and kind
    pub access_methods: BTreeMap<(MemberRef, AccessKind), MemberRef>,
    /// Marker type for constructor accessors, on the outermost class
    pub dummy_marker: Option<ClassId>,
    /// The `class$` helper serving this nest, recorded on the outermost class
    pub class_lookup: Option<MemberRef>,
    pub outer_this_field: Option<u32>,
    pub captured: Vec<Captured>,
    /// Nested classes mentioned by this class file
    pub inner_refs: BTreeSet<ClassId>,
}

impl ClassDefinition {
    pub fn new(id: ClassId, name: impl Into<String>, origin: Origin, pos: Where, modifiers: u32) -> Self {
        let name = name.into();
        let package = super::types::package_of(&name).to_string();
        let simple = match name.rfind(|c| c == '.' || c == '$') {
            Some(i) => name[i + 1..].to_string(),
            None => name.clone(),
        };
        Self {
            id,
            simple_name: Some(simple),
            package,
            name,
            origin,
            pos,
            end_pos: pos,
            modifiers,
            doc: None,
            super_name: None,
            interface_names: Vec::new(),
            super_class: None,
            interfaces: Vec::new(),
            outer: None,
            members: Vec::new(),
            local_counter: 0,
            in_static_context: false,
            resolve_phase: Phase::NotStarted,
            check_phase: Phase::NotStarted,
            erroneous: false,
            dependencies: BTreeSet::new(),
            inherited_collected: false,
            permanently_abstract: false,
            access_methods: BTreeMap::new(),
            dummy_marker: None,
            class_lookup: None,
            outer_this_field: None,
            captured: Vec::new(),
            inner_refs: BTreeSet::new(),
        }
    }

    pub fn ty(&self) -> Type {
        Type::Class(self.name.clone())
    }

    pub fn source_file(&self) -> Option<FileId> {
        match self.origin {
            Origin::Source { file } => Some(file),
            _ => None,
        }
    }

    pub fn is_source(&self) -> bool {
        matches!(self.origin, Origin::Source { .. })
    }

    pub fn is_binary(&self) -> bool {
        !self.is_source()
    }

    pub fn is_interface(&self) -> bool {
        self.modifiers & M_INTERFACE != 0
    }

    pub fn is_class(&self) -> bool {
        !self.is_interface()
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers & M_ABSTRACT != 0
    }

    pub fn is_final(&self) -> bool {
        self.modifiers & M_FINAL != 0
    }

    pub fn is_public(&self) -> bool {
        self.modifiers & M_PUBLIC != 0
    }

    pub fn is_private(&self) -> bool {
        self.modifiers & M_PRIVATE != 0
    }

    pub fn is_protected(&self) -> bool {
        self.modifiers & M_PROTECTED != 0
    }

    pub fn is_static(&self) -> bool {
        self.modifiers & M_STATIC != 0
    }

    pub fn is_deprecated(&self) -> bool {
        self.modifiers & M_DEPRECATED != 0
    }

    pub fn is_synthetic(&self) -> bool {
        self.modifiers & M_SYNTHETIC != 0
    }

    pub fn is_inner(&self) -> bool {
        self.outer.is_some()
    }

    pub fn is_top_level(&self) -> bool {
        self.outer.is_none()
    }

    pub fn is_local(&self) -> bool {
        self.modifiers & M_LOCAL != 0
    }

    pub fn is_anonymous(&self) -> bool {
        self.modifiers & M_ANONYMOUS != 0
    }

    /// Member classes, as opposed to local and anonymous ones
    pub fn is_member_class(&self) -> bool {
        self.is_inner() && !self.is_local() && !self.is_anonymous()
    }

    /// Whether instances carry a reference to an enclosing instance
    pub fn need_outer_this(&self) -> bool {
        self.is_inner() && !self.is_static() && !self.is_interface() && !self.in_static_context
    }

    pub fn add_member(&mut self, member: MemberDefinition) -> MemberRef {
        self.members.push(member);
        MemberRef::new(self.id, self.members.len() - 1)
    }

    pub fn member(&self, r: MemberRef) -> &MemberDefinition {
        &self.members[r.index as usize]
    }

    pub fn member_refs(&self) -> impl Iterator<Item = MemberRef> + '_ {
        (0..self.members.len()).map(move |i| MemberRef::new(self.id, i))
    }

    pub fn find_field(&self, name: &str) -> Option<MemberRef> {
        self.members
            .iter()
            .position(|m| m.is_field() && m.name == name)
            .map(|i| MemberRef::new(self.id, i))
    }

    /// Methods (or, with `<init>`, constructors) with the given name
    pub fn find_methods(&self, name: &str) -> Vec<MemberRef> {
        self.members
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_invocable() && m.name == name)
            .map(|(i, _)| MemberRef::new(self.id, i))
            .collect()
    }

    pub fn find_method_by_signature(&self, key: &str) -> Option<MemberRef> {
        self.members
            .iter()
            .position(|m| m.is_invocable() && m.signature_key() == key)
            .map(|i| MemberRef::new(self.id, i))
    }

    pub fn constructors(&self) -> Vec<MemberRef> {
        self.find_methods(INIT_NAME)
    }

    pub fn nested_classes(&self) -> Vec<ClassId> {
        self.members.iter().filter_map(|m| m.nested_class()).collect()
    }

    /// Member class with the given simple name
    pub fn find_nested(&self, simple: &str) -> Option<ClassId> {
        self.members.iter().find_map(|m| match &m.kind {
            MemberKind::NestedClass(id) if m.name == simple => Some(*id),
            _ => None,
        })
    }

    /// Name of the source file for the SourceFile attribute
    pub fn source_name(&self, paths: &[PathBuf]) -> Option<String> {
        match &self.origin {
            Origin::Source { file } => paths
                .get(*file)
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned()),
            Origin::Binary { source_name, .. } => source_name.clone(),
            Origin::Builtin => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_split_into_package_and_simple() {
        let def = ClassDefinition::new(ClassId(0), "p.q.Outer$Inner", Origin::Builtin, Where::NOWHERE, 0);
        assert_eq!(def.package, "p.q");
        assert_eq!(def.simple_name.as_deref(), Some("Inner"));
        let top = ClassDefinition::new(ClassId(1), "A", Origin::Builtin, Where::NOWHERE, 0);
        assert_eq!(top.package, "");
        assert_eq!(top.simple_name.as_deref(), Some("A"));
    }

    #[test]
    fn outer_this_needs_an_instance_context() {
        let mut def = ClassDefinition::new(ClassId(0), "A$B", Origin::Builtin, Where::NOWHERE, 0);
        assert!(!def.need_outer_this());
        def.outer = Some(ClassId(1));
        assert!(def.need_outer_this());
        def.modifiers |= M_STATIC;
        assert!(!def.need_outer_this());
    }
}
