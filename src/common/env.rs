//! The batch environment
//!
//! Owns everything a compilation session shares: the declaration table
//! (and through it every class definition), the source files read so far,
//! the diagnostics sink, the options and the class path.

use crate::common::config::Config;
use crate::common::diagnostics::{Diagnostics, FileId, SourceText};
use crate::common::manager::ClasspathManager;
use crate::common::rt;
use crate::parser::span::Where;
use crate::symtab::{ClassDefinition, ClassId, DeclarationTable, MemberDefinition, MemberRef, Status};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// An `import` declaration
#[derive(Debug, Clone)]
pub struct Import {
    pub name: String,
    pub pos: Where,
}

/// A source file that has been read and parsed
#[derive(Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
    pub package: String,
    pub package_pos: Where,
    pub single_imports: Vec<Import>,
    pub package_imports: Vec<Import>,
    /// Package-level classes in declaration order
    pub classes: Vec<ClassId>,
    pub imports_resolved: bool,
    /// Simple name to class, from single-type imports
    pub import_table: HashMap<String, ClassId>,
    /// Errors reported against this file
    pub errors: usize,
    /// A deprecated API was used and not reported individually
    pub uses_deprecated: bool,
}

impl SourceFile {
    pub fn new(path: PathBuf, text: String) -> Self {
        Self {
            path,
            text,
            package: String::new(),
            package_pos: Where::NOWHERE,
            single_imports: Vec::new(),
            package_imports: Vec::new(),
            classes: Vec::new(),
            imports_resolved: false,
            import_table: HashMap::new(),
            errors: 0,
            uses_deprecated: false,
        }
    }
}

pub struct BatchEnvironment {
    pub config: Config,
    pub table: DeclarationTable,
    pub files: Vec<SourceFile>,
    pub diags: Diagnostics,
    pub manager: ClasspathManager,
    /// Source file to parse for a declaration in SOURCE state
    pub source_hints: HashMap<ClassId, PathBuf>,
    /// Local classes in scope at the statement being attributed
    pub local_types: Vec<(String, ClassId)>,
    /// Nesting of structural resolution and attribution, bounded by
    /// `MAX_RESOLVE_DEPTH`
    pub depth: usize,
    package_cache: HashMap<String, bool>,
}

impl BatchEnvironment {
    pub fn new(config: Config) -> Self {
        let manager = ClasspathManager::new(&config);
        Self::with_manager(config, manager)
    }

    pub fn with_manager(config: Config, manager: ClasspathManager) -> Self {
        let diags = Diagnostics::new(config.max_errors, config.nowarn);
        Self {
            config,
            table: DeclarationTable::new(),
            files: Vec::new(),
            diags,
            manager,
            source_hints: HashMap::new(),
            local_types: Vec::new(),
            depth: 0,
            package_cache: HashMap::new(),
        }
    }

    /// Declaration handle for a binary name
    pub fn declare(&mut self, name: &str) -> ClassId {
        self.table.get(name)
    }

    pub fn add_file(&mut self, path: PathBuf, text: String) -> FileId {
        self.files.push(SourceFile::new(path, text));
        self.files.len() - 1
    }

    pub fn file_by_path(&self, path: &Path) -> Option<FileId> {
        self.files.iter().position(|f| f.path == path)
    }

    /// Whether a class of this name exists. Known declarations answer from
    /// their status; unknown ones consult the class path, and a failed
    /// lookup counts as existing.
    pub fn exists(&mut self, name: &str) -> bool {
        if let Some(id) = self.table.lookup(name) {
            match self.table.status(id) {
                Status::NotFound => return false,
                Status::Undefined => {}
                _ => return self.table.name(id) == name,
            }
        }
        if rt::lookup(name).is_some() {
            return true;
        }
        match self.manager.lookup(name) {
            Ok(files) => files.binary.is_some() || files.source.is_some(),
            Err(e) => {
                log::debug!("env: probing {} failed: {}", name, e);
                true
            }
        }
    }

    pub fn package_exists(&mut self, package: &str) -> bool {
        if package.is_empty() {
            return true;
        }
        if let Some(&known) = self.package_cache.get(package) {
            return known;
        }
        let exists = rt::is_builtin_package(package)
            || self.exempt_packages().contains(package)
            || self.manager.package_exists(package);
        self.package_cache.insert(package.to_string(), exists);
        exists
    }

    /// Packages containing a class being compiled from source
    pub fn exempt_packages(&self) -> BTreeSet<String> {
        self.table
            .ids()
            .into_iter()
            .filter_map(|id| self.table.def(id))
            .filter(|def| def.is_source())
            .map(|def| def.package.clone())
            .collect()
    }

    pub fn error(&mut self, file: Option<FileId>, pos: Where, text: impl Into<String>) {
        if self.diags.error(file, pos, text) {
            if let Some(f) = file.and_then(|f| self.files.get_mut(f)) {
                f.errors += 1;
            }
        }
    }

    pub fn warning(&mut self, file: Option<FileId>, pos: Where, text: impl Into<String>) {
        self.diags.warning(file, pos, text);
    }

    /// Report an error against a class and mark it erroneous
    pub fn class_error(&mut self, class: ClassId, pos: Where, text: impl Into<String>) {
        let file = self.file_of(class);
        if let Some(def) = self.table.def_mut(class) {
            def.erroneous = true;
        }
        self.error(file, pos, text);
    }

    pub fn file_of(&self, class: ClassId) -> Option<FileId> {
        self.table.def(class).and_then(ClassDefinition::source_file)
    }

    pub fn source_texts(&self) -> Vec<SourceText> {
        self.files.iter().map(|f| SourceText { path: f.path.clone(), text: f.text.clone() }).collect()
    }

    pub fn source_paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    /// Render everything pending for one file, or for all files
    pub fn flush_errors(&mut self, file: Option<FileId>) {
        let texts = self.source_texts();
        match file {
            Some(_) => self.diags.flush(file, &texts),
            None => self.diags.flush_all(&texts),
        }
    }

    pub fn member(&self, r: MemberRef) -> &MemberDefinition {
        self.table[r.class].member(r)
    }

    pub fn member_mut(&mut self, r: MemberRef) -> &mut MemberDefinition {
        &mut self.table[r.class].members[r.index as usize]
    }

    pub fn class_name(&self, id: ClassId) -> &str {
        self.table.name(id)
    }

    /// The top-level class enclosing `id`, or `id` itself
    pub fn outermost(&self, id: ClassId) -> ClassId {
        let mut cur = id;
        while let Some(outer) = self.table.def(cur).and_then(|d| d.outer) {
            cur = outer;
        }
        cur
    }

    /// Every source class whose top-level class is `top`, `top` first
    pub fn nest_of(&self, top: ClassId) -> Vec<ClassId> {
        let mut nest = vec![top];
        for id in self.table.ids() {
            if id != top && self.table.def(id).map_or(false, |d| d.is_source()) && self.outermost(id) == top {
                nest.push(id);
            }
        }
        nest
    }

    /// Nearest enclosing class that is neither local nor anonymous; it
    /// numbers the local classes declared below it.
    pub fn naming_ancestor(&self, id: ClassId) -> ClassId {
        let mut cur = id;
        while let Some(def) = self.table.def(cur) {
            match def.outer {
                Some(outer) if def.is_local() || def.is_anonymous() => cur = outer,
                _ => break,
            }
        }
        cur
    }

    /// Local class in scope under `name`, visible from `ctx`
    pub fn local_type(&self, ctx: ClassId, name: &str) -> Option<ClassId> {
        self.local_types
            .iter()
            .rev()
            .filter(|(n, _)| n == name)
            .map(|(_, id)| *id)
            .find(|&id| match self.table.def(id).and_then(|d| d.outer) {
                Some(owner) => self.is_enclosed_by(ctx, owner),
                None => false,
            })
    }

    /// Whether `inner` is `outer` or lexically nested in it
    pub fn is_enclosed_by(&self, inner: ClassId, outer: ClassId) -> bool {
        let mut cur = Some(inner);
        while let Some(id) = cur {
            if id == outer {
                return true;
            }
            cur = self.table.def(id).and_then(|d| d.outer);
        }
        false
    }

    /// Report use of a deprecated class or member from another class
    pub fn deprecation(&mut self, from: ClassId, pos: Where, what: &str) {
        let file = self.file_of(from);
        if self.config.deprecation {
            self.warning(file, pos, format!("{} has been deprecated.", what));
        } else if let Some(f) = file.and_then(|f| self.files.get_mut(f)) {
            f.uses_deprecated = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::classpath::SearchPath;
    use crate::symtab::Origin;
    use std::fs;
    use tempfile::TempDir;

    fn env_in(dir: &Path) -> BatchEnvironment {
        let manager = ClasspathManager::from_search_path(SearchPath {
            binary: vec![dir.to_path_buf()],
            source: vec![dir.to_path_buf()],
        });
        BatchEnvironment::with_manager(Config::default(), manager)
    }

    #[test]
    fn exists_consults_status_then_class_path() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("p")).unwrap();
        fs::write(temp.path().join("p/A.java"), "package p; class A {}").unwrap();
        let mut env = env_in(temp.path());

        assert!(env.exists("p.A"));
        assert!(!env.exists("p.B"));
        assert!(env.exists("java.lang.String"));

        let gone = env.declare("p.A");
        env.table.set_status(gone, Status::NotFound);
        assert!(!env.exists("p.A"));
    }

    #[test]
    fn packages_with_sources_are_exempt() {
        let temp = TempDir::new().unwrap();
        let mut env = env_in(temp.path());
        let file = env.add_file(PathBuf::from("q/C.java"), String::new());
        let id = env.declare("q.C");
        let def = ClassDefinition::new(id, "q.C", Origin::Source { file }, Where::NOWHERE, 0);
        env.table.set_definition(id, def, Status::Parsed);

        assert!(env.exempt_packages().contains("q"));
        assert!(env.package_exists("q"));
        assert!(env.package_exists("java.lang"));
        assert!(!env.package_exists("nowhere"));
    }

    #[test]
    fn class_errors_mark_the_class_and_count_per_file() {
        let temp = TempDir::new().unwrap();
        let mut env = env_in(temp.path());
        let file = env.add_file(PathBuf::from("A.java"), "class A {}\n".to_string());
        let id = env.declare("A");
        env.table.set_definition(id, ClassDefinition::new(id, "A", Origin::Source { file }, Where::new(1, 6), 0), Status::Parsed);

        env.class_error(id, Where::new(1, 6), "broken");
        assert!(env.table[id].erroneous);
        assert_eq!(env.files[file].errors, 1);
        assert_eq!(env.diags.error_count(), 1);
    }
}
