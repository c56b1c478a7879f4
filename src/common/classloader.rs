//! The loader
//!
//! Moves a declaration through the undetermined part of its lifecycle, one
//! transition per call to [`advance`]:
//!
//! - `UNDEFINED`: search the class path for a binary and a source file
//! - `UNDECIDED`: decide whether a binary's dependency closure forces a
//!   recompilation
//! - `SOURCE`: find and parse the source file that should define the class
//!
//! Every failure leaves the declaration in a settled state (usually
//! `NOTFOUND`) with one diagnostic, so callers looping on [`load_definition`]
//! always terminate.

use crate::codegen::reader::{self, ClassFileInfo};
use crate::common::consts::*;
use crate::common::env::BatchEnvironment;
use crate::common::error::{Error, Result};
use crate::common::manager::Candidate;
use crate::common::rt::{self, Builtin};
use crate::parser::span::Where;
use crate::symtab::{
    ClassDefinition, ClassId, ConstValue, MemberDefinition, MemberKind, MemberStatus, MethodType, Origin, Phase,
    Status, Type,
};
use crate::ast::TypeName;
use crate::wash::enter;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Perform one lifecycle transition
pub fn advance(env: &mut BatchEnvironment, id: ClassId) -> Result<()> {
    match env.table.status(id) {
        Status::Undefined => advance_undefined(env, id),
        Status::Undecided => advance_undecided(env, id),
        Status::Source => advance_source(env, id),
        _ => Ok(()),
    }
}

/// Advance until the declaration has a definition or is known not to
pub fn load_definition(env: &mut BatchEnvironment, id: ClassId) -> Result<()> {
    loop {
        let before = env.table.status(id);
        if !before.is_undetermined() {
            return Ok(());
        }
        advance(env, id)?;
        if env.table.status(id) == before {
            return Err(Error::internal(format!("loader made no progress on {}", env.class_name(id))));
        }
    }
}

/// Load and report whether a usable definition exists
pub fn load(env: &mut BatchEnvironment, id: ClassId) -> Result<bool> {
    load_definition(env, id)?;
    Ok(env.table.status(id) != Status::NotFound && env.table.def(id).is_some())
}

fn set_status(env: &mut BatchEnvironment, id: ClassId, status: Status) {
    log::debug!("loader: {} {} -> {}", env.class_name(id), env.table.status(id), status);
    env.table.set_status(id, status);
}

fn advance_undefined(env: &mut BatchEnvironment, id: ClassId) -> Result<()> {
    let name = env.class_name(id).to_string();
    let files = match env.manager.lookup(&name) {
        Ok(files) => files,
        Err(e) => {
            env.error(None, Where::NOWHERE, format!("I/O error while looking up class {}: {}", name, e));
            set_status(env, id, Status::NotFound);
            return Ok(());
        }
    };
    match (files.binary, files.source) {
        (None, Some(source)) => {
            env.source_hints.insert(id, source.path);
            set_status(env, id, Status::Source);
        }
        (Some(binary), Some(source)) if source.is_newer_than(&binary) => {
            log::debug!("loader: {} is newer than {}", source.path.display(), binary.path.display());
            env.source_hints.insert(id, source.path);
            set_status(env, id, Status::Source);
        }
        (Some(binary), _) => load_binary(env, id, &binary)?,
        (None, None) => match rt::lookup(&name) {
            Some(builtin) => {
                define_builtin(env, id, builtin);
                set_status(env, id, Status::Binary);
            }
            None => set_status(env, id, Status::NotFound),
        },
    }
    Ok(())
}

fn load_binary(env: &mut BatchEnvironment, id: ClassId, binary: &Candidate) -> Result<()> {
    let name = env.class_name(id).to_string();
    let bytes = match fs::read(&binary.path) {
        Ok(bytes) => bytes,
        Err(e) => {
            env.error(None, Where::NOWHERE, format!("Can't read {}: {}", binary.path.display(), e));
            set_status(env, id, Status::NotFound);
            return Ok(());
        }
    };
    let info = match reader::read_class(&bytes, &binary.path) {
        Ok(info) => info,
        Err(e @ Error::ClassFormat { .. }) => {
            env.error(None, Where::NOWHERE, e.to_string());
            set_status(env, id, Status::NotFound);
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    if info.name != name {
        env.error(
            None,
            Where::NOWHERE,
            format!("class file has wrong class: {}, expected {} ({})", info.name, name, binary.path.display()),
        );
        set_status(env, id, Status::NotFound);
        return Ok(());
    }
    if env.config.verbose {
        log::info!("[loaded {}]", binary.path.display());
    }
    define_binary(env, id, info, &binary.path);
    let status = if env.config.depend { Status::Undecided } else { Status::Binary };
    set_status(env, id, status);
    Ok(())
}

/// Whether `id` or anything in its dependency closure must be compiled
/// from source. Declarations already visited answer false, which breaks
/// dependency cycles.
pub fn needs_compile(env: &mut BatchEnvironment, id: ClassId, visited: &mut BTreeSet<ClassId>) -> Result<bool> {
    if !visited.insert(id) {
        return Ok(false);
    }
    if env.table.status(id) == Status::Undefined {
        advance_undefined(env, id)?;
    }
    match env.table.status(id) {
        Status::Source => return Ok(true),
        Status::Undecided => {}
        _ => return Ok(env.table.def(id).map_or(false, ClassDefinition::is_source)),
    }
    let deps: Vec<ClassId> = env.table.def(id).map(|d| d.dependencies.iter().copied().collect()).unwrap_or_default();
    for dep in deps {
        if needs_compile(env, dep, visited)? {
            log::debug!("loader: {} depends on {} which needs compiling", env.class_name(id), env.class_name(dep));
            return Ok(true);
        }
    }
    Ok(false)
}

fn advance_undecided(env: &mut BatchEnvironment, id: ClassId) -> Result<()> {
    let mut visited = BTreeSet::new();
    if needs_compile(env, id, &mut visited)? {
        set_status(env, id, Status::Source);
        return Ok(());
    }
    for v in visited {
        if env.table.status(v) == Status::Undecided {
            set_status(env, v, Status::Binary);
        }
    }
    Ok(())
}

/// Source file to parse for a declaration in SOURCE state
fn find_source(env: &mut BatchEnvironment, id: ClassId) -> Option<PathBuf> {
    if let Some(path) = env.source_hints.remove(&id) {
        return Some(path);
    }
    if let Some(Origin::Binary { path, source_name: Some(source), .. }) = env.table.def(id).map(|d| &d.origin) {
        let recorded = path.parent().map(|dir| dir.join(source)).unwrap_or_else(|| PathBuf::from(source));
        if let Ok(Some(found)) = env.manager.source_at(&recorded) {
            return Some(found.path);
        }
    }
    let name = env.class_name(id).to_string();
    match env.manager.lookup(&name) {
        Ok(files) => files.source.map(|c| c.path),
        Err(e) => {
            log::debug!("loader: source lookup for {} failed: {}", name, e);
            None
        }
    }
}

fn advance_source(env: &mut BatchEnvironment, id: ClassId) -> Result<()> {
    let name = env.class_name(id).to_string();
    let Some(path) = find_source(env, id) else {
        let status = match env.table.def(id) {
            Some(def) if def.is_binary() => Status::Binary,
            _ => Status::NotFound,
        };
        set_status(env, id, status);
        return Ok(());
    };

    let file = match env.file_by_path(&path) {
        Some(file) => Some(file),
        None => read_and_parse(env, &path)?,
    };
    let Some(file) = file else {
        set_status(env, id, Status::NotFound);
        return Ok(());
    };

    if matches!(env.table.status(id), Status::Source | Status::Undefined) {
        let package = package_of_name(&name);
        let place = if package.is_empty() { "unnamed package".to_string() } else { format!("package {}", package) };
        env.error(
            Some(file),
            Where::NOWHERE,
            format!(
                "File {} does not contain type {} as expected. Please adjust the class path so that the file does not appear in the {}.",
                path.display(),
                name,
                place
            ),
        );
        env.table.clear_definition(id);
        set_status(env, id, Status::NotFound);
    }
    Ok(())
}

fn package_of_name(name: &str) -> &str {
    crate::symtab::package_of(name)
}

/// Read, decode and parse one source file. Unreadable files are reported
/// and yield None.
pub fn read_and_parse(env: &mut BatchEnvironment, path: &Path) -> Result<Option<usize>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            env.error(None, Where::NOWHERE, format!("Can't read {}: {}", path.display(), e));
            return Ok(None);
        }
    };
    if bytes.len() as u64 > MAXFILESIZE {
        env.error(None, Where::NOWHERE, format!("{} is too large", path.display()));
        return Ok(None);
    }
    let text = match env.config.decode(bytes) {
        Ok(text) => text,
        Err(e) => {
            env.error(None, Where::NOWHERE, format!("{}: cannot decode source: {}", path.display(), e));
            return Ok(None);
        }
    };
    Ok(Some(enter::parse_source(env, path.to_path_buf(), text)?))
}

fn class_type_name(name: &str) -> TypeName {
    TypeName::new(name, Where::NOWHERE)
}

/// Build the binary definition of `id` from a class file
pub fn define_binary(env: &mut BatchEnvironment, id: ClassId, info: ClassFileInfo, path: &Path) {
    let dependencies = info.dependencies();
    let origin =
        Origin::Binary { path: path.to_path_buf(), source_name: info.source_file.clone(), dependencies: dependencies.clone() };
    let mut modifiers = info.access_flags as u32 & MM_CLASS;
    let mut outer = None;
    let mut simple_name = None;
    if let Some(entry) = info.self_entry() {
        modifiers = entry.access_flags as u32 & ACCM_INNERCLASS;
        match (&entry.outer, &entry.simple_name) {
            (Some(o), Some(s)) => {
                outer = Some(env.declare(o));
                simple_name = Some(s.clone());
            }
            (None, Some(s)) => {
                modifiers |= M_LOCAL;
                simple_name = Some(s.clone());
            }
            _ => modifiers |= M_ANONYMOUS,
        }
    }
    if info.deprecated {
        modifiers |= M_DEPRECATED;
    }

    let mut def = ClassDefinition::new(id, info.name.clone(), origin, Where::NOWHERE, modifiers);
    if simple_name.is_some() || modifiers & M_ANONYMOUS != 0 {
        def.simple_name = simple_name;
    }
    def.outer = outer;
    def.super_name = info.super_name.as_deref().map(class_type_name);
    def.interface_names = info.interfaces.iter().map(|n| class_type_name(n)).collect();
    def.super_class = info.super_name.as_deref().map(|n| env.declare(n));
    def.interfaces = info.interfaces.iter().map(|n| env.declare(n)).collect();
    let need_outer_this = def.need_outer_this();

    for field in &info.fields {
        let Some((ty, _)) = Type::parse_descriptor(&field.descriptor) else {
            log::warn!("loader: bad field descriptor {} in {}", field.descriptor, info.name);
            continue;
        };
        let mut mods = field.access_flags as u32 & MM_FIELD;
        if field.synthetic || field.access_flags & ACC_SYNTHETIC != 0 {
            mods |= M_SYNTHETIC;
        }
        if field.deprecated {
            mods |= M_DEPRECATED;
        }
        let kind = MemberKind::Field { type_expr: None, init: None, value: field.constant.clone() };
        let mut member = MemberDefinition::new(id, Where::NOWHERE, field.name.clone(), mods, kind);
        member.ty = ty;
        member.status = MemberStatus::Inlined;
        def.add_member(member);
    }

    for method in &info.methods {
        if method.name == CLINIT_NAME {
            continue;
        }
        let Some(method_type) = MethodType::parse_descriptor(&method.descriptor) else {
            log::warn!("loader: bad method descriptor {} in {}", method.descriptor, info.name);
            continue;
        };
        let mut mods = method.access_flags as u32 & MM_METHOD;
        if method.synthetic || method.access_flags & ACC_SYNTHETIC != 0 {
            mods |= M_SYNTHETIC;
        }
        if method.deprecated {
            mods |= M_DEPRECATED;
        }
        let is_ctor = method.name == INIT_NAME;
        let kind = if is_ctor {
            MemberKind::Constructor { params: Vec::new(), body: None }
        } else {
            MemberKind::Method { ret_expr: None, params: Vec::new(), body: None }
        };
        let mut member = MemberDefinition::new(id, Where::NOWHERE, method.name.clone(), mods, kind);
        member.outer_this_arg = is_ctor && need_outer_this && !method_type.args.is_empty();
        member.ty = method_type.ret.clone();
        member.method_type = method_type;
        member.exceptions = method.exceptions.iter().map(|n| env.declare(n)).collect();
        member.status = MemberStatus::Checked;
        def.add_member(member);
    }

    for entry in &info.inner_classes {
        let (Some(o), Some(simple)) = (&entry.outer, &entry.simple_name) else { continue };
        if *o != info.name {
            continue;
        }
        let nested = env.declare(&entry.inner);
        let mods = entry.access_flags as u32 & ACCM_INNERCLASS;
        def.add_member(MemberDefinition::new(id, Where::NOWHERE, simple.clone(), mods, MemberKind::NestedClass(nested)));
    }

    for dep in &dependencies {
        let dep_id = env.declare(dep);
        def.dependencies.insert(dep_id);
    }
    def.resolve_phase = Phase::Done;
    def.check_phase = Phase::Done;
    env.table.set_definition(id, def, env.table.status(id));
}

fn builtin_constant(descriptor: &str, text: &str) -> Option<ConstValue> {
    match descriptor {
        "I" | "S" | "B" | "C" => text.parse::<i32>().ok().map(ConstValue::Int),
        "Z" => Some(ConstValue::Int(i32::from(text == "true"))),
        "J" => text.parse::<i64>().ok().map(ConstValue::Long),
        "F" => text.parse::<f32>().ok().map(ConstValue::float),
        "D" => text.parse::<f64>().ok().map(ConstValue::double),
        "Ljava/lang/String;" => Some(ConstValue::Str(text.to_string())),
        _ => None,
    }
}

/// Build a definition from a bootstrap description
pub fn define_builtin(env: &mut BatchEnvironment, id: ClassId, builtin: &Builtin) {
    let mut def = ClassDefinition::new(id, builtin.name, Origin::Builtin, Where::NOWHERE, builtin.modifiers);
    def.super_name = builtin.super_name.map(class_type_name);
    def.interface_names = builtin.interfaces.iter().map(|n| class_type_name(n)).collect();
    def.super_class = builtin.super_name.map(|n| env.declare(n));
    def.interfaces = builtin.interfaces.iter().map(|n| env.declare(n)).collect();
    def.dependencies.extend(def.super_class);
    def.dependencies.extend(def.interfaces.iter().copied());

    for m in builtin.members() {
        let is_method = m.descriptor.starts_with('(');
        let mut member = if is_method {
            let Some(method_type) = MethodType::parse_descriptor(m.descriptor) else { continue };
            let kind = if m.name == INIT_NAME {
                MemberKind::Constructor { params: Vec::new(), body: None }
            } else {
                MemberKind::Method { ret_expr: None, params: Vec::new(), body: None }
            };
            let mut member = MemberDefinition::new(id, Where::NOWHERE, m.name, m.modifiers, kind);
            member.ty = method_type.ret.clone();
            member.method_type = method_type;
            member.exceptions = m.throws.iter().map(|n| env.declare(n)).collect();
            member.status = MemberStatus::Checked;
            member
        } else {
            let Some((ty, _)) = Type::parse_descriptor(m.descriptor) else { continue };
            let value = m.constant.and_then(|c| builtin_constant(m.descriptor, c));
            let kind = MemberKind::Field { type_expr: None, init: None, value };
            let mut member = MemberDefinition::new(id, Where::NOWHERE, m.name, m.modifiers, kind);
            member.ty = ty;
            member.status = MemberStatus::Inlined;
            member
        };
        member.pos = Where::NOWHERE;
        def.add_member(member);
    }
    def.resolve_phase = Phase::Done;
    def.check_phase = Phase::Done;
    env.table.set_definition(id, def, env.table.status(id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::classpath::SearchPath;
    use crate::common::config::Config;
    use crate::common::manager::ClasspathManager;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn env_in(dir: &Path, depend: bool) -> BatchEnvironment {
        let manager = ClasspathManager::from_search_path(SearchPath {
            binary: vec![dir.to_path_buf()],
            source: vec![dir.to_path_buf()],
        });
        let config = Config { depend, ..Config::default() };
        BatchEnvironment::with_manager(config, manager)
    }

    fn set_mtime(path: &Path, secs_ago: u64) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(secs_ago)).unwrap();
    }

    #[test]
    fn source_only_class_parses() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("A.java"), "class A { }\n").unwrap();
        let mut env = env_in(temp.path(), false);
        let a = env.declare("A");
        load_definition(&mut env, a).unwrap();
        assert_eq!(env.table.status(a), Status::Parsed);
        assert!(env.table[a].is_source());
    }

    #[test]
    fn missing_class_is_not_found_without_diagnostic() {
        let temp = TempDir::new().unwrap();
        let mut env = env_in(temp.path(), false);
        let id = env.declare("nowhere.Missing");
        assert!(!load(&mut env, id).unwrap());
        assert_eq!(env.table.status(id), Status::NotFound);
        assert_eq!(env.diags.error_count(), 0);
    }

    #[test]
    fn builtins_fill_in_for_the_bootstrap_classes() {
        let temp = TempDir::new().unwrap();
        let mut env = env_in(temp.path(), false);
        let string = env.declare(JAVA_LANG_STRING);
        assert!(load(&mut env, string).unwrap());
        assert_eq!(env.table.status(string), Status::Binary);
        assert!(!env.table[string].find_methods("length").is_empty());
    }

    #[test]
    fn wrong_source_file_is_reported() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("B.java"), "class NotB { }\n").unwrap();
        let mut env = env_in(temp.path(), false);
        let b = env.declare("B");
        load_definition(&mut env, b).unwrap();
        assert_eq!(env.table.status(b), Status::NotFound);
        assert!(env.diags.all_texts().iter().any(|m| m.contains("does not contain type B as expected")));
    }

    #[test]
    fn corrupt_binary_is_not_found_with_diagnostic() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("C.class"), b"garbage").unwrap();
        let mut env = env_in(temp.path(), false);
        let c = env.declare("C");
        load_definition(&mut env, c).unwrap();
        assert_eq!(env.table.status(c), Status::NotFound);
        assert_eq!(env.diags.error_count(), 1);
    }

    #[test]
    fn newer_source_wins_over_binary() {
        let temp = TempDir::new().unwrap();
        let class = temp.path().join("D.class");
        let source = temp.path().join("D.java");
        fs::write(&class, b"not even read").unwrap();
        fs::write(&source, "class D { }\n").unwrap();
        set_mtime(&class, 100);
        let mut env = env_in(temp.path(), false);
        let d = env.declare("D");
        advance(&mut env, d).unwrap();
        assert_eq!(env.table.status(d), Status::Source);
    }
}
