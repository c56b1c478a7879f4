//! The emitter: one checked source class to class-file bytes
//!
//! Layout is deterministic. The constant pool is filled in a fixed order:
//! the attribute names the enabled debug tables and member features need,
//! this class, the superclass and interfaces, then fields and methods in
//! order, then the InnerClasses rows. Methods are sorted by name and
//! descriptor before any of their entries are added.

use super::attribute::{AttributeInfo, CodeAttribute, InnerClassRow, NamedAttribute};
use super::class::{ClassFile, FieldInfo, MethodInfo};
use super::defs::attribute_names as names;
use super::gen::{self, MethodCode};
use super::writer::ClassfileWritable;
use crate::common::config::DebugInfo;
use crate::common::consts::*;
use crate::common::env::BatchEnvironment;
use crate::common::error::{Error, Result};
use crate::parser::Where;
use crate::symtab::{internal_name, ClassDefinition, ClassId, MemberRef};
use crate::verify::{self, class_access_flags};
use std::path::Path;

/// A class file ready to be written
#[derive(Debug, Clone)]
pub struct EmittedClass {
    pub class: ClassId,
    /// Binary name, `p.A$B`
    pub name: String,
    pub bytes: Vec<u8>,
    /// Classes named by the constant pool, this one excluded, in pool order
    pub dependencies: Vec<ClassId>,
    /// Nested classes described by the InnerClasses attribute
    pub inner_refs: Vec<ClassId>,
}

/// Problems in the input that only show up when writing, such as a method
/// too large for the class format. They are reported against the class.
pub type Rejections = Vec<(Where, String)>;

/// Emit `id`, reporting rejections as class errors. `None` when the class
/// could not be written.
pub fn write_class(env: &mut BatchEnvironment, id: ClassId) -> Result<Option<EmittedClass>> {
    let outcome = ClassWriter::new(env, id)?.write()?;
    match outcome {
        Ok(emitted) => {
            let def = &mut env.table[id];
            def.dependencies.extend(emitted.dependencies.iter().copied());
            def.inner_refs.extend(emitted.inner_refs.iter().copied());
            Ok(Some(emitted))
        }
        Err(rejections) => {
            for (pos, msg) in rejections {
                env.class_error(id, pos, msg);
            }
            Ok(None)
        }
    }
}

/// Method slots in emission order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MethodSlot {
    Member(MemberRef),
    ClassInit,
}

pub struct ClassWriter<'a> {
    env: &'a BatchEnvironment,
    id: ClassId,
    def: &'a ClassDefinition,
    debug: DebugInfo,
    class_file: ClassFile,
    rejections: Rejections,
}

impl<'a> ClassWriter<'a> {
    pub fn new(env: &'a BatchEnvironment, id: ClassId) -> Result<Self> {
        let def = env
            .table
            .def(id)
            .filter(|d| d.is_source())
            .ok_or_else(|| Error::internal(format!("no source definition to emit for {}", env.class_name(id))))?;
        if def.erroneous {
            return Err(Error::internal(format!("erroneous class {} reached the emitter", def.name)));
        }
        let mut class_file = ClassFile::new();
        let (major, minor) = env.config.target.version();
        class_file.major_version = major;
        class_file.minor_version = minor;
        Ok(Self { env, id, def, debug: env.config.debug, class_file, rejections: Vec::new() })
    }

    pub fn write(mut self) -> Result<std::result::Result<EmittedClass, Rejections>> {
        log::debug!("emit: {}", self.def.name);
        self.attribute_names();
        self.header();
        self.fields();
        self.methods()?;
        self.class_attributes();
        let inner_refs = self.inner_classes()?;

        if self.class_file.constant_pool.overflowed() {
            self.rejections.push((self.def.pos, format!("too many constants in class {}", self.def.name)));
        }
        if !self.rejections.is_empty() {
            return Ok(Err(self.rejections));
        }
        verify::verify(&self.class_file)
            .map_err(|e| Error::internal(format!("inconsistent class file for {}: {}", self.def.name, e)))?;

        let dependencies = self.dependencies();
        Ok(Ok(EmittedClass {
            class: self.id,
            name: self.def.name.clone(),
            bytes: self.class_file.to_classfile_bytes(),
            dependencies,
            inner_refs,
        }))
    }

    /// Names of the attributes this class will carry, ahead of everything else
    fn attribute_names(&mut self) {
        let members = &self.def.members;
        let has_code = members.iter().any(|m| m.is_invocable() && !m.is_abstract() && !m.is_native())
            || members.iter().any(|m| m.is_initializer() || (m.is_field() && m.has_field_init()));
        let pool = &mut self.class_file.constant_pool;
        if has_code {
            pool.add_utf8(names::CODE);
        }
        if self.debug.source {
            pool.add_utf8(names::SOURCE_FILE);
        }
        if has_code && self.debug.lines {
            pool.add_utf8(names::LINE_NUMBER_TABLE);
        }
        if has_code && self.debug.vars {
            pool.add_utf8(names::LOCAL_VARIABLE_TABLE);
        }
        if self.def.is_deprecated() || members.iter().any(|m| m.is_deprecated()) {
            pool.add_utf8(names::DEPRECATED);
        }
        if self.def.is_synthetic() || members.iter().any(|m| m.is_synthetic() && !m.is_initializer()) {
            pool.add_utf8(names::SYNTHETIC);
        }
        if members.iter().any(|m| m.is_field() && m.is_static() && m.constant_value().is_some()) {
            pool.add_utf8(names::CONSTANT_VALUE);
        }
        if members.iter().any(|m| m.is_invocable() && !m.exceptions.is_empty()) {
            pool.add_utf8(names::EXCEPTIONS);
        }
        if self.def.is_inner() || !self.def.nested_classes().is_empty() {
            pool.add_utf8(names::INNER_CLASSES);
        }
    }

    fn header(&mut self) {
        let def = self.def;
        let pool = &mut self.class_file.constant_pool;
        self.class_file.this_class = pool.add_class(&internal_name(&def.name));
        if let Some(sup) = def.super_class {
            self.class_file.super_class = pool.add_class(&internal_name(self.env.class_name(sup)));
        }
        for &intf in &def.interfaces {
            let index = pool.add_class(&internal_name(self.env.class_name(intf)));
            self.class_file.interfaces.push(index);
        }
        self.class_file.access_flags = class_flags(def);
    }

    fn marker_attributes(&mut self, synthetic: bool, deprecated: bool) -> Vec<NamedAttribute> {
        let pool = &mut self.class_file.constant_pool;
        let mut attributes = Vec::new();
        if synthetic {
            attributes.push(NamedAttribute::new(pool, AttributeInfo::Synthetic));
        }
        if deprecated {
            attributes.push(NamedAttribute::new(pool, AttributeInfo::Deprecated));
        }
        attributes
    }

    fn fields(&mut self) {
        for m in self.def.members.iter().filter(|m| m.is_field()) {
            let pool = &mut self.class_file.constant_pool;
            let name_index = pool.add_utf8(&m.name);
            let descriptor_index = pool.add_utf8(&m.ty.descriptor());
            let mut attributes = Vec::new();
            if let Some(value) = m.constant_value().filter(|_| m.is_static()) {
                let value_index = pool.add_value(value);
                attributes.push(NamedAttribute::new(pool, AttributeInfo::ConstantValue { value_index }));
            }
            attributes.extend(self.marker_attributes(m.is_synthetic(), m.is_deprecated()));
            self.class_file.fields.push(FieldInfo {
                access_flags: (m.modifiers & MM_FIELD) as u16,
                name_index,
                descriptor_index,
                attributes,
            });
        }
    }

    /// Methods and constructors sorted by name then descriptor; `<clinit>`
    /// takes its place among them when the class needs one
    fn method_order(&self) -> Vec<MethodSlot> {
        let mut slots: Vec<(String, String, MethodSlot)> = self
            .def
            .member_refs()
            .filter(|&r| self.env.member(r).is_invocable())
            .map(|r| {
                let m = self.env.member(r);
                (m.name.clone(), m.descriptor(), MethodSlot::Member(r))
            })
            .collect();
        slots.push((CLINIT_NAME.to_string(), "()V".to_string(), MethodSlot::ClassInit));
        slots.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
        slots.into_iter().map(|(_, _, slot)| slot).collect()
    }

    fn methods(&mut self) -> Result<()> {
        for slot in self.method_order() {
            match slot {
                MethodSlot::Member(r) => self.method(r)?,
                MethodSlot::ClassInit => {
                    let code = gen::class_init_code(self.env, &mut self.class_file.constant_pool, self.debug, self.id)?;
                    if let Some(code) = code {
                        let pool = &mut self.class_file.constant_pool;
                        let name_index = pool.add_utf8(CLINIT_NAME);
                        let descriptor_index = pool.add_utf8("()V");
                        let attributes = vec![self.code_attribute(code, CLINIT_NAME, self.def.pos)];
                        self.class_file.methods.push(MethodInfo {
                            access_flags: ACC_STATIC,
                            name_index,
                            descriptor_index,
                            attributes,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn method(&mut self, r: MemberRef) -> Result<()> {
        let m = self.env.member(r);
        let pool = &mut self.class_file.constant_pool;
        let name_index = pool.add_utf8(&m.name);
        let descriptor_index = pool.add_utf8(&m.descriptor());
        let mut attributes = Vec::new();
        if !m.exceptions.is_empty() {
            let exception_indices =
                m.exceptions.iter().map(|&e| pool.add_class(&internal_name(self.env.class_name(e)))).collect();
            attributes.push(NamedAttribute::new(pool, AttributeInfo::Exceptions { exception_indices }));
        }
        if let Some(code) = gen::method_code(self.env, &mut self.class_file.constant_pool, self.debug, r)? {
            attributes.push(self.code_attribute(code, &m.describe(), m.pos));
        }
        attributes.extend(self.marker_attributes(m.is_synthetic(), m.is_deprecated()));
        self.class_file.methods.push(MethodInfo {
            access_flags: (m.modifiers & MM_METHOD) as u16,
            name_index,
            descriptor_index,
            attributes,
        });
        Ok(())
    }

    fn code_attribute(&mut self, code: MethodCode, what: &str, pos: Where) -> NamedAttribute {
        if code.too_large {
            self.rejections.push((pos, format!("code of method {} is too large", what)));
        }
        let pool = &mut self.class_file.constant_pool;
        let mut attribute = CodeAttribute::new(code.max_stack, code.max_locals, code.code);
        attribute.exception_table = code.handlers;
        if self.debug.lines && !code.lines.is_empty() {
            attribute.attributes.push(NamedAttribute::new(pool, AttributeInfo::LineNumberTable(code.lines)));
        }
        if self.debug.vars && !code.vars.is_empty() {
            attribute.attributes.push(NamedAttribute::new(pool, AttributeInfo::LocalVariableTable(code.vars)));
        }
        NamedAttribute::new(pool, AttributeInfo::Code(attribute))
    }

    fn class_attributes(&mut self) {
        if self.debug.source {
            let file_name = self
                .def
                .source_file()
                .and_then(|f| self.env.files.get(f))
                .and_then(|f| f.path.file_name().map(|n| n.to_string_lossy().into_owned()));
            if let Some(file_name) = file_name {
                let pool = &mut self.class_file.constant_pool;
                let file_index = pool.add_utf8(&file_name);
                let attribute = NamedAttribute::new(pool, AttributeInfo::SourceFile { file_index });
                self.class_file.attributes.push(attribute);
            }
        }
        let markers = self.marker_attributes(self.def.is_synthetic(), self.def.is_deprecated());
        self.class_file.attributes.extend(markers);
    }

    /// Add `id` and its enclosing classes to `rows`, outermost first
    fn collect_nested(&self, id: ClassId, rows: &mut Vec<ClassId>) {
        let Some(def) = self.env.table.def(id) else { return };
        let Some(outer) = def.outer else { return };
        self.collect_nested(outer, rows);
        if !rows.contains(&id) {
            rows.push(id);
        }
    }

    /// The InnerClasses attribute: every nested class this class names or
    /// declares, and this class itself if it is nested
    fn inner_classes(&mut self) -> Result<Vec<ClassId>> {
        let mut rows = Vec::new();
        self.collect_nested(self.id, &mut rows);
        for name in self.class_file.constant_pool.class_names() {
            if let Some(id) = self.lookup_internal(&name) {
                self.collect_nested(id, &mut rows);
            }
        }
        for nested in self.def.nested_classes() {
            self.collect_nested(nested, &mut rows);
        }
        if rows.is_empty() {
            return Ok(rows);
        }

        let mut table = Vec::with_capacity(rows.len());
        for &id in &rows {
            let def = &self.env.table[id];
            let outer = def.outer.map(|o| &self.env.table[o]);
            let member_of_interface = def.is_member_class() && outer.map_or(false, |o| o.is_interface());
            let flags = (def.modifiers & ACCM_INNERCLASS) as u16;
            class_access_flags::verify_inner(&def.name, flags, member_of_interface)
                .map_err(|e| Error::internal(e.to_string()))?;

            let pool = &mut self.class_file.constant_pool;
            let inner_class_info_index = pool.add_class(&internal_name(&def.name));
            let outer_class_info_index = match outer {
                Some(o) if def.is_member_class() => pool.add_class(&internal_name(&o.name)),
                _ => 0,
            };
            let inner_name_index = match &def.simple_name {
                Some(simple) if !def.is_anonymous() => pool.add_utf8(simple),
                _ => 0,
            };
            table.push(InnerClassRow {
                inner_class_info_index,
                outer_class_info_index,
                inner_name_index,
                inner_class_access_flags: flags,
            });
        }
        let attribute = NamedAttribute::new(&mut self.class_file.constant_pool, AttributeInfo::InnerClasses(table));
        self.class_file.attributes.push(attribute);
        Ok(rows)
    }

    fn lookup_internal(&self, name: &str) -> Option<ClassId> {
        if name.starts_with('[') {
            return None;
        }
        self.env.table.lookup(&name.replace('/', "."))
    }

    fn dependencies(&self) -> Vec<ClassId> {
        let mut deps = Vec::new();
        for name in self.class_file.constant_pool.class_names() {
            // arrays depend on their element class
            let element = name.trim_start_matches('[');
            let element = match element.strip_prefix('L') {
                Some(rest) if name.starts_with('[') => rest.trim_end_matches(';'),
                _ if name.starts_with('[') => continue,
                _ => element,
            };
            if let Some(id) = self.lookup_internal(element) {
                if id != self.id && !deps.contains(&id) {
                    deps.push(id);
                }
            }
        }
        deps
    }
}

/// Access flags of the class itself. A nested class is written with the
/// access its top-level counterpart would have: private becomes package
/// access and protected becomes public.
pub fn class_flags(def: &ClassDefinition) -> u16 {
    let mut mods = def.modifiers;
    if def.is_inner() {
        if mods & M_PROTECTED != 0 {
            mods |= M_PUBLIC;
        }
        mods &= !(M_PRIVATE | M_PROTECTED);
    }
    let mut flags = (mods & MM_CLASS) as u16;
    if def.is_interface() {
        flags |= ACC_ABSTRACT;
    } else {
        flags |= ACC_SUPER;
    }
    flags
}

/// Where `name` goes under `dir`: `p.A$B` becomes `dir/p/A$B.class`
pub fn class_file_path(dir: &Path, name: &str) -> std::path::PathBuf {
    let mut path = dir.to_path_buf();
    let mut parts = name.split('.').peekable();
    while let Some(part) = parts.next() {
        if parts.peek().is_some() {
            path.push(part);
        } else {
            path.push(format!("{}.class", part));
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::reader::read_class;
    use crate::common::config::Config;
    use crate::wash::check::check_nest;
    use crate::wash::enter::parse_source;
    use std::path::PathBuf;

    fn checked(config: Config, text: &str) -> BatchEnvironment {
        let mut env = BatchEnvironment::new(config);
        parse_source(&mut env, PathBuf::from("A.java"), text.to_string()).unwrap();
        let a = env.table.lookup("A").unwrap();
        check_nest(&mut env, a).unwrap();
        assert!(env.diags.all_texts().is_empty(), "{:?}", env.diags.all_texts());
        env
    }

    fn emit(env: &mut BatchEnvironment, name: &str) -> EmittedClass {
        let id = env.table.lookup(name).unwrap();
        write_class(env, id).unwrap().unwrap()
    }

    #[test]
    fn methods_are_sorted_and_output_is_stable() {
        let text = "class A { void z() {} static int k = f(); static int f() { return 1; } void a(int x) {} void a() {} }";
        let mut env = checked(Config::default(), text);
        let first = emit(&mut env, "A");
        let second = emit(&mut env, "A");
        assert_eq!(first.bytes, second.bytes);

        let info = read_class(&first.bytes, Path::new("A.class")).unwrap();
        let order: Vec<(String, String)> = info.methods.iter().map(|m| (m.name.clone(), m.descriptor.clone())).collect();
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted);
        assert_eq!(order[0].0, "<clinit>");
        assert!(order.iter().any(|(n, d)| n == "<init>" && d == "()V"));
    }

    #[test]
    fn attribute_names_lead_the_pool() {
        let mut env = checked(Config::default(), "class A { void m() {} }");
        let bytes = emit(&mut env, "A").bytes;
        // magic, version, count, then CONSTANT_Utf8 "Code"
        assert_eq!(bytes[10], 1);
        assert_eq!(&bytes[11..13], &[0, 4]);
        assert_eq!(&bytes[13..17], b"Code");
    }

    #[test]
    fn class_flags_follow_the_kind() {
        let mut env = checked(Config::default(), "class A { interface I { void m(); } private static class P {} protected class Q {} }");
        let a = read_class(&emit(&mut env, "A").bytes, Path::new("A.class")).unwrap();
        assert_eq!(a.access_flags & ACC_SUPER, ACC_SUPER);

        let i = read_class(&emit(&mut env, "A$I").bytes, Path::new("A$I.class")).unwrap();
        assert_eq!(i.access_flags & (ACC_INTERFACE | ACC_ABSTRACT), ACC_INTERFACE | ACC_ABSTRACT);
        assert_eq!(i.access_flags & ACC_SUPER, 0);
        assert_eq!(i.methods[0].access_flags, ACC_PUBLIC | ACC_ABSTRACT);

        let p = read_class(&emit(&mut env, "A$P").bytes, Path::new("A$P.class")).unwrap();
        assert_eq!(p.access_flags & (ACC_PRIVATE | ACC_PUBLIC), 0);
        let row = p.self_entry().unwrap();
        assert_eq!(row.access_flags, ACC_PRIVATE | ACC_STATIC);
        assert_eq!(row.outer.as_deref(), Some("A"));
        assert_eq!(row.simple_name.as_deref(), Some("P"));

        let q = read_class(&emit(&mut env, "A$Q").bytes, Path::new("A$Q.class")).unwrap();
        assert_eq!(q.access_flags & ACC_PUBLIC, ACC_PUBLIC);
    }

    #[test]
    fn outer_class_lists_its_members() {
        let mut env = checked(Config::default(), "class A { class B {} static class C {} }");
        let a = read_class(&emit(&mut env, "A").bytes, Path::new("A.class")).unwrap();
        let inner: Vec<&str> = a.inner_classes.iter().map(|e| e.inner.as_str()).collect();
        assert!(inner.contains(&"A$B") && inner.contains(&"A$C"));
    }

    #[test]
    fn anonymous_rows_have_no_outer_or_name() {
        let text = "class A { Object f() { return new Object() { }; } }";
        let mut env = checked(Config::default(), text);
        let anon = read_class(&emit(&mut env, "A$1").bytes, Path::new("A$1.class")).unwrap();
        let row = anon.self_entry().unwrap();
        assert_eq!(row.outer, None);
        assert_eq!(row.simple_name, None);
        let a = emit(&mut env, "A");
        let anon_id = env.table.lookup("A$1").unwrap();
        assert!(a.inner_refs.contains(&anon_id));
        assert!(a.dependencies.contains(&anon_id));
    }

    #[test]
    fn static_constants_carry_their_value() {
        let mut env = checked(Config::default(), "class A { static final int N = 6 * 7; final int m = 1; }");
        let a = read_class(&emit(&mut env, "A").bytes, Path::new("A.class")).unwrap();
        let n = a.fields.iter().find(|f| f.name == "N").unwrap();
        assert_eq!(n.constant, Some(crate::symtab::ConstValue::Int(42)));
        let m = a.fields.iter().find(|f| f.name == "m").unwrap();
        assert_eq!(m.constant, None);
        assert!(!a.methods.iter().any(|m| m.name == "<clinit>"));
    }

    #[test]
    fn debug_flags_select_tables() {
        let mut config = Config::default();
        config.debug = DebugInfo::none();
        let mut env = checked(config, "class A { int f(int x) { return x; } }");
        let a = read_class(&emit(&mut env, "A").bytes, Path::new("A.class")).unwrap();
        assert_eq!(a.source_file, None);
        let f = a.methods.iter().find(|m| m.name == "f").unwrap();
        assert!(f.code.as_ref().unwrap().attributes.is_empty());

        let mut config = Config::default();
        config.debug = DebugInfo::all();
        let mut env = checked(config, "class A { int f(int x) { return x; } }");
        let a = read_class(&emit(&mut env, "A").bytes, Path::new("A.class")).unwrap();
        assert_eq!(a.source_file.as_deref(), Some("A.java"));
        let f = a.methods.iter().find(|m| m.name == "f").unwrap();
        let attributes = &f.code.as_ref().unwrap().attributes;
        assert_eq!(attributes, &vec!["LineNumberTable".to_string(), "LocalVariableTable".to_string()]);
    }

    #[test]
    fn deprecated_and_synthetic_markers() {
        let text = "class A { /** @deprecated */ void old() {} private int x; class B { int g() { return x; } } }";
        let mut env = checked(Config::default(), text);
        let a = read_class(&emit(&mut env, "A").bytes, Path::new("A.class")).unwrap();
        assert!(a.methods.iter().find(|m| m.name == "old").unwrap().deprecated);
        let bridge = a.methods.iter().find(|m| m.name.starts_with(PREFIX_ACCESS)).unwrap();
        assert!(bridge.synthetic);
        assert_eq!(bridge.access_flags, ACC_STATIC);
        let b = read_class(&emit(&mut env, "A$B").bytes, Path::new("A$B.class")).unwrap();
        assert!(b.fields.iter().any(|f| f.name.starts_with(PREFIX_THIS) && f.synthetic));
    }

    #[test]
    fn target_selects_version() {
        let mut config = Config::default();
        config.target = crate::common::config::Target::Jdk1_2;
        let mut env = checked(config, "class A {}");
        let a = read_class(&emit(&mut env, "A").bytes, Path::new("A.class")).unwrap();
        assert_eq!((a.major_version, a.minor_version), (46, 0));
    }

    #[test]
    fn class_files_land_in_package_directories() {
        assert_eq!(class_file_path(Path::new("out"), "p.q.A$B"), PathBuf::from("out/p/q/A$B.class"));
        assert_eq!(class_file_path(Path::new("out"), "A"), PathBuf::from("out/A.class"));
    }
}
