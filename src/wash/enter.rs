//! Enter phase - the parser adapter
//!
//! [`BatchParser`] receives the parser's structural callbacks for one source
//! file and builds the class and member skeletons in the environment. It
//! applies the modifier normalization rules, names local and anonymous
//! classes, validates member modifiers and links the package-level classes
//! of the file into a ring of dependencies.

use crate::ast::{TypeExpr, TypeName};
use crate::common::consts::*;
use crate::common::diagnostics::FileId;
use crate::common::env::{BatchEnvironment, Import};
use crate::common::error::Result;
use crate::parser::{self, ClassHeader, MemberDecl, ParserActions, Where};
use crate::symtab::{ClassDefinition, ClassId, MemberDefinition, MemberKind, Origin, Param, Status};
use crate::wash::resolve;
use std::path::PathBuf;

pub struct BatchParser<'a> {
    env: &'a mut BatchEnvironment,
    file: FileId,
    /// Classes whose bodies are open, innermost last
    stack: Vec<ClassId>,
    duplicates: u32,
}

/// Parse one source file into the environment and return its id
pub fn parse_source(env: &mut BatchEnvironment, path: PathBuf, text: String) -> Result<FileId> {
    if env.config.verbose {
        log::info!("[parsing {}]", path.display());
    }
    let file = env.add_file(path, text.clone());
    let mut adapter = BatchParser::new(env, file);
    parser::parse_file(&text, &mut adapter);
    adapter.finish()?;
    Ok(file)
}

impl<'a> BatchParser<'a> {
    pub fn new(env: &'a mut BatchEnvironment, file: FileId) -> Self {
        Self { env, file, stack: Vec::new(), duplicates: 0 }
    }

    fn report(&mut self, pos: Where, msg: impl Into<String>) {
        self.env.error(Some(self.file), pos, msg);
    }

    /// Close the ring of package-level classes; resolve imports right
    /// away when the file defined no class at all.
    pub fn finish(self) -> Result<()> {
        let classes = self.env.files[self.file].classes.clone();
        if classes.len() > 1 {
            for (i, &id) in classes.iter().enumerate() {
                let next = classes[(i + 1) % classes.len()];
                self.env.table[id].dependencies.insert(next);
            }
        }
        if classes.is_empty() {
            resolve::resolve_imports(self.env, self.file)?;
        }
        if self.env.config.verbose {
            log::info!("[parsed {}]", self.env.files[self.file].path.display());
        }
        Ok(())
    }

    fn current(&self) -> Option<ClassId> {
        self.stack.last().copied()
    }

    /// Binary name for a class declared at this point
    fn class_name(&mut self, header: &ClassHeader, outer: Option<ClassId>) -> String {
        let is_local = header.modifiers & M_LOCAL != 0;
        let is_anonymous = header.modifiers & M_ANONYMOUS != 0;
        match outer {
            None => {
                let package = &self.env.files[self.file].package;
                if package.is_empty() {
                    header.name.clone()
                } else {
                    format!("{}.{}", package, header.name)
                }
            }
            Some(outer) if is_local || is_anonymous => {
                let ancestor = self.env.naming_ancestor(outer);
                let def = &mut self.env.table[ancestor];
                def.local_counter += 1;
                format!("{}${}{}", def.name, def.local_counter, header.name)
            }
            Some(outer) => format!("{}${}", self.env.class_name(outer), header.name),
        }
    }

    fn normalize_class_modifiers(&mut self, header: &ClassHeader, outer: Option<ClassId>) -> u32 {
        let mut mods = header.modifiers;
        let pos = header.pos;
        let is_interface = mods & M_INTERFACE != 0;
        match outer {
            None => {
                for (bit, word) in [(M_STATIC, "static"), (M_PRIVATE, "private"), (M_PROTECTED, "protected")] {
                    if mods & bit != 0 {
                        self.report(pos, format!("The type {} can't be {}.", header.name, word));
                        mods &= !bit;
                    }
                }
            }
            Some(outer) => {
                if mods & M_ANONYMOUS != 0 {
                    mods |= M_FINAL | M_PRIVATE;
                } else if mods & M_LOCAL != 0 {
                    let illegal = mods & MM_ACCESS | mods & M_STATIC;
                    if illegal != 0 {
                        self.report(pos, format!("Modifier {} not allowed here.", modifier_names(illegal)));
                        mods &= !illegal;
                    }
                    mods |= M_PRIVATE;
                }
                if is_interface {
                    mods |= M_STATIC;
                }
                if self.env.table[outer].is_interface() {
                    if mods & (M_PRIVATE | M_PROTECTED) == 0 {
                        mods |= M_PUBLIC;
                    }
                    mods |= M_STATIC;
                }
            }
        }
        if is_interface {
            mods |= M_ABSTRACT;
            if mods & M_FINAL != 0 {
                self.report(pos, format!("Interface {} can't be final.", header.name));
                mods &= !M_FINAL;
            }
        }
        if mods & M_FINAL != 0 && mods & M_ABSTRACT != 0 && !is_interface {
            self.report(pos, format!("Illegal combination of modifiers: abstract and final in class {}.", header.name));
        }
        mods
    }

    /// Claim the declaration for `name`, or a placeholder when the class was
    /// already defined from source
    fn claim(&mut self, name: &str, pos: Where) -> (ClassId, bool) {
        let id = self.env.declare(name);
        if let Some(existing) = self.env.table.def(id).filter(|d| d.is_source()) {
            let other = existing
                .source_file()
                .and_then(|f| self.env.files.get(f))
                .map(|f| f.path.display().to_string())
                .unwrap_or_default();
            self.report(pos, format!("Class {} already defined in {}.", name, other));
            self.duplicates += 1;
            let placeholder = self.env.declare(&format!("{}#duplicate{}", name, self.duplicates));
            return (placeholder, true);
        }
        (id, false)
    }

    fn check_public_file_name(&mut self, header: &ClassHeader) {
        let path = &self.env.files[self.file].path;
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        if stem != header.name {
            self.report(
                header.pos,
                format!("Public class {} must be defined in a file called \"{}.java\".", header.name, header.name),
            );
        }
    }

    fn check_member_modifiers(&mut self, class: ClassId, pos: Where, name: &str, mut mods: u32, decl: &MemberDecl) -> u32 {
        let in_interface = self.env.table[class].is_interface();
        let access = mods & MM_ACCESS;
        if access.count_ones() > 1 {
            self.report(
                pos,
                "Inconsistent member declaration.  At most one of public, private, or protected may be specified.",
            );
            mods &= !(MM_ACCESS & !(access & access.wrapping_neg()));
        }
        let allowed = match decl {
            MemberDecl::Field { .. } => MM_SOURCE_FIELD,
            MemberDecl::Method { name, .. } if name == INIT_NAME => MM_ACCESS,
            MemberDecl::Method { .. } => MM_SOURCE_METHOD,
            MemberDecl::Initializer { .. } => M_STATIC,
        };
        let illegal = mods & !(allowed | M_DEPRECATED);
        if illegal != 0 {
            let what = match decl {
                MemberDecl::Method { name: n, .. } if n == INIT_NAME => {
                    "Constructors can't be native, abstract, static, synchronized, or final".to_string()
                }
                _ => format!("Modifier {} not allowed here", modifier_names(illegal)),
            };
            self.report(pos, format!("{}: {}.", what, name));
            mods &= !illegal;
        }

        match decl {
            MemberDecl::Field { init, .. } => {
                if in_interface {
                    if mods & (M_PRIVATE | M_PROTECTED) != 0 {
                        self.report(pos, format!("Interface fields can't be private or protected: {}.", name));
                        mods &= !(M_PRIVATE | M_PROTECTED);
                    }
                    mods |= M_PUBLIC | M_STATIC | M_FINAL;
                    if init.is_none() {
                        self.report(pos, format!("Interface fields must be initialized: {}.", name));
                    }
                }
            }
            MemberDecl::Method { name: n, body, .. } if n == INIT_NAME => {
                if in_interface {
                    self.report(pos, "Interfaces can't have constructors.");
                }
                if body.is_none() {
                    self.report(pos, "Missing method body, or declare abstract.");
                }
            }
            MemberDecl::Method { body, .. } => {
                if in_interface {
                    let bad = mods & (M_STATIC | M_FINAL | M_NATIVE | M_SYNCHRONIZED | M_PRIVATE | M_PROTECTED);
                    if bad != 0 {
                        self.report(pos, format!("Interface methods can't be {}: {}.", modifier_names(bad), name));
                        mods &= !bad;
                    }
                    mods |= M_PUBLIC | M_ABSTRACT;
                }
                if mods & M_ABSTRACT != 0 {
                    let bad = mods & (M_PRIVATE | M_STATIC | M_FINAL | M_NATIVE | M_SYNCHRONIZED);
                    if bad != 0 {
                        self.report(
                            pos,
                            format!("Illegal combination of modifiers: abstract and {} in {}.", modifier_names(bad), name),
                        );
                    }
                }
                let bodiless = mods & (M_ABSTRACT | M_NATIVE) != 0;
                match (bodiless, body.is_some()) {
                    (false, false) => self.report(pos, "Missing method body, or declare abstract."),
                    (true, true) if in_interface => self.report(pos, "Interface methods can't have a body."),
                    (true, true) => self.report(pos, "Abstract and native methods can't have a body."),
                    _ => {}
                }
            }
            MemberDecl::Initializer { .. } => {
                if in_interface {
                    self.report(pos, "Interfaces can't have initializers.");
                }
            }
        }
        mods
    }

    fn check_void_params(&mut self, params: &[Param]) {
        for p in params {
            if matches!(p.type_expr, Some(ref t) if t.is_void()) {
                self.report(p.pos, format!("Argument can't have type void: {}", p.name));
            }
        }
    }

    fn add_member(&mut self, class: ClassId, member: MemberDefinition) {
        let duplicate = {
            let def = &self.env.table[class];
            match &member.kind {
                MemberKind::Field { .. } => def.find_field(&member.name).is_some(),
                MemberKind::NestedClass(_) => def.find_nested(&member.name).is_some(),
                _ => false,
            }
        };
        if duplicate {
            let what = if member.is_field() { "Variable" } else { "Class" };
            let class_name = self.env.class_name(class).to_string();
            self.report(member.pos, format!("{} {} is already defined in {}.", what, member.name, class_name));
            return;
        }
        self.env.table[class].add_member(member);
    }
}

impl<'a> ParserActions for BatchParser<'a> {
    fn package_declaration(&mut self, pos: Where, name: &str) {
        let file = &mut self.env.files[self.file];
        file.package = name.to_string();
        file.package_pos = pos;
    }

    fn import_class(&mut self, pos: Where, name: &str) {
        self.env.files[self.file].single_imports.push(Import { name: name.to_string(), pos });
    }

    fn import_package(&mut self, pos: Where, name: &str) {
        self.env.files[self.file].package_imports.push(Import { name: name.to_string(), pos });
    }

    fn begin_class(&mut self, header: ClassHeader) -> ClassId {
        let outer = self.current();
        if outer.is_none() && header.modifiers & M_PUBLIC != 0 {
            self.check_public_file_name(&header);
        }
        let modifiers = self.normalize_class_modifiers(&header, outer);
        let name = self.class_name(&header, outer);
        let (id, is_duplicate) = self.claim(&name, header.pos);

        let mut def = ClassDefinition::new(id, name.clone(), Origin::Source { file: self.file }, header.pos, modifiers);
        if modifiers & M_ANONYMOUS != 0 {
            def.simple_name = None;
        } else {
            def.simple_name = Some(header.name.clone());
        }
        def.doc = header.doc.clone();
        def.super_name = header.super_name.clone();
        def.interface_names = header.interfaces.clone();
        def.outer = outer;
        def.in_static_context = header.in_static_context && modifiers & (M_LOCAL | M_ANONYMOUS) != 0;
        def.erroneous = is_duplicate;
        let status = if is_duplicate { Status::Compiled } else { Status::Parsed };
        self.env.table.set_definition(id, def, status);
        log::debug!("enter: class {}", name);

        match outer {
            None => {
                if !is_duplicate {
                    self.env.files[self.file].classes.push(id);
                }
            }
            Some(outer) => {
                let mut enclosing = Some(outer);
                while let Some(o) = enclosing {
                    let def = &self.env.table[o];
                    if !header.name.is_empty() && def.simple_name.as_deref() == Some(header.name.as_str()) {
                        self.report(
                            header.pos,
                            format!("An inner class may not have the same simple name as its enclosing class: {}", header.name),
                        );
                        break;
                    }
                    enclosing = def.outer;
                }
                if modifiers & (M_LOCAL | M_ANONYMOUS) == 0 {
                    let marker =
                        MemberDefinition::new(outer, header.pos, header.name.clone(), modifiers, MemberKind::NestedClass(id));
                    self.add_member(outer, marker);
                }
            }
        }
        self.stack.push(id);
        id
    }

    fn define_field(&mut self, pos: Where, doc: Option<String>, modifiers: u32, member: MemberDecl) {
        let Some(class) = self.current() else { return };
        let name = match &member {
            MemberDecl::Field { name, .. } | MemberDecl::Method { name, .. } => name.clone(),
            MemberDecl::Initializer { .. } => String::new(),
        };
        let mods = self.check_member_modifiers(class, pos, &name, modifiers, &member);
        let def = match member {
            MemberDecl::Field { type_expr, name, init } => {
                if type_expr.is_void() {
                    self.report(pos, format!("Instance variables can't be void: {}", name));
                }
                MemberDefinition::new(class, pos, name, mods, MemberKind::Field { type_expr: Some(type_expr), init, value: None })
            }
            MemberDecl::Method { ret, name, params, throws, body } if name == INIT_NAME => {
                let expected = self.env.table[class].simple_name.clone();
                let matches = matches!((&ret, &expected), (TypeExpr::Named(TypeName { name: n, .. }), Some(e)) if n == e);
                if !matches {
                    self.report(pos, "Invalid method declaration; return type required.");
                    return;
                }
                self.check_void_params(&params);
                let mut ctor = MemberDefinition::new(class, pos, INIT_NAME, mods, MemberKind::Constructor { params, body });
                ctor.exception_names = throws;
                ctor
            }
            MemberDecl::Method { ret, name, params, throws, body } => {
                self.check_void_params(&params);
                let mut method =
                    MemberDefinition::new(class, pos, name, mods, MemberKind::Method { ret_expr: Some(ret), params, body });
                method.exception_names = throws;
                method
            }
            MemberDecl::Initializer { body } => {
                let name = if mods & M_STATIC != 0 { CLINIT_NAME } else { "" };
                MemberDefinition::new(class, pos, name, mods, MemberKind::Initializer { body: Some(body) })
            }
        };
        let mut def = def;
        def.doc = doc;
        self.add_member(class, def);
    }

    fn end_class(&mut self, pos: Where, class: ClassId) {
        if let Some(def) = self.env.table.def_mut(class) {
            def.end_pos = pos;
        }
        if self.stack.last() == Some(&class) {
            self.stack.pop();
        }
    }

    fn error(&mut self, pos: Where, message: &str) {
        self.report(pos, message);
        if let Some(class) = self.current() {
            self.env.table[class].erroneous = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::Config;

    fn parse(env: &mut BatchEnvironment, path: &str, text: &str) -> FileId {
        parse_source(env, PathBuf::from(path), text.to_string()).unwrap()
    }

    fn env() -> BatchEnvironment {
        BatchEnvironment::new(Config::default())
    }

    #[test]
    fn modifier_normalization() {
        let mut env = env();
        parse(
            &mut env,
            "A.java",
            "class A { interface I { class K {} } void m() { class L {} Object o = new Object() {}; } }",
        );
        let i = env.table.lookup("A$I").unwrap();
        assert_eq!(env.table[i].modifiers & (M_ABSTRACT | M_STATIC), M_ABSTRACT | M_STATIC);
        let k = env.table.lookup("A$I$K").unwrap();
        assert_eq!(env.table[k].modifiers & (M_PUBLIC | M_STATIC), M_PUBLIC | M_STATIC);
        let l = env.table.lookup("A$1L").unwrap();
        assert!(env.table[l].is_private() && env.table[l].is_local());
        let anon = env.table.lookup("A$2").unwrap();
        assert!(env.table[anon].is_private() && env.table[anon].is_final() && env.table[anon].is_anonymous());
        assert!(env.table[anon].simple_name.is_none());
    }

    #[test]
    fn package_level_classes_form_a_ring() {
        let mut env = env();
        parse(&mut env, "p/X.java", "package p; class X {} class Y {} class Z {}");
        let ids: Vec<ClassId> = ["p.X", "p.Y", "p.Z"].iter().map(|n| env.table.lookup(n).unwrap()).collect();
        assert!(env.table[ids[0]].dependencies.contains(&ids[1]));
        assert!(env.table[ids[1]].dependencies.contains(&ids[2]));
        assert!(env.table[ids[2]].dependencies.contains(&ids[0]));

        parse(&mut env, "p/W.java", "package p; class W {}");
        let w = env.table.lookup("p.W").unwrap();
        assert!(env.table[w].dependencies.is_empty());
    }

    #[test]
    fn constructor_name_mismatch_is_an_error() {
        let mut env = env();
        parse(&mut env, "A.java", "class A { B() {} }");
        let a = env.table.lookup("A").unwrap();
        assert!(env.table[a].constructors().is_empty());
        assert!(env.diags.all_texts().iter().any(|m| m.contains("return type required")));
    }

    #[test]
    fn top_level_modifiers_are_stripped() {
        let mut env = env();
        parse(&mut env, "A.java", "private static class A {}");
        let a = env.table.lookup("A").unwrap();
        assert_eq!(env.table[a].modifiers & (M_PRIVATE | M_STATIC), 0);
        assert_eq!(env.diags.error_count(), 2);
    }

    #[test]
    fn duplicate_class_gets_a_placeholder() {
        let mut env = env();
        parse(&mut env, "A.java", "class A { int x; }");
        parse(&mut env, "A2.java", "class A { int y; }");
        let a = env.table.lookup("A").unwrap();
        assert!(env.table[a].find_field("x").is_some());
        let dup = env.table.lookup("A#duplicate1").unwrap();
        assert!(env.table[dup].erroneous);
        assert!(env.diags.all_texts().iter().any(|m| m.contains("already defined")));
    }

    #[test]
    fn classless_file_still_checks_imports() {
        let mut env = env();
        parse(&mut env, "Empty.java", "import no.such.Thing;\n");
        assert!(env.files[0].imports_resolved);
        assert!(env.diags.all_texts().iter().any(|m| m.contains("no.such.Thing")));
    }

    #[test]
    fn interface_members_are_implicitly_public() {
        let mut env = env();
        parse(&mut env, "I.java", "interface I { int K = 1; void m(); }");
        let i = env.table.lookup("I").unwrap();
        let k = env.table[i].find_field("K").unwrap();
        assert_eq!(env.member(k).modifiers & (M_PUBLIC | M_STATIC | M_FINAL), M_PUBLIC | M_STATIC | M_FINAL);
        let m = env.table[i].find_methods("m")[0];
        assert!(env.member(m).is_abstract() && env.member(m).is_public());
        assert_eq!(env.diags.error_count(), 0);
    }
}
