//! Structural resolution
//!
//! Resolves imports, type names, supertypes and member signatures of source
//! classes. [`resolve_class`] is re-entrant: the class's `resolve_phase` is
//! checked and set at entry, so a class reached again while it is being
//! resolved (an inheritance cycle, or an inner class naming its outer) is
//! left alone and the caller sees the edges set so far.
//!
//! Also home to the type relations (subclassing, widening, casting) and the
//! access rules, since both need classes loaded and resolved on demand.

use crate::ast::{TypeExpr, TypeName};
use crate::common::classloader;
use crate::common::consts::*;
use crate::common::diagnostics::FileId;
use crate::common::env::BatchEnvironment;
use crate::common::error::{Error, Result};
use crate::parser::Where;
use crate::symtab::{ClassId, ConstValue, MemberKind, MemberRef, MethodType, Phase, Status, Type};
use crate::wash::lower;
use std::collections::BTreeSet;

/// Check the imports of a file once
pub fn resolve_imports(env: &mut BatchEnvironment, file: FileId) -> Result<()> {
    if env.files[file].imports_resolved {
        return Ok(());
    }
    env.files[file].imports_resolved = true;

    let singles = env.files[file].single_imports.clone();
    for import in singles {
        match find_qualified(env, &import.name)? {
            Some(id) => {
                let simple = env.table[id].simple_name.clone().unwrap_or_default();
                match env.files[file].import_table.get(&simple).copied() {
                    Some(other) if other != id => {
                        let msg = format!("Ambiguous class: {} and {}", env.class_name(other), env.class_name(id));
                        env.error(Some(file), import.pos, msg);
                    }
                    _ => {
                        env.files[file].import_table.insert(simple, id);
                    }
                }
            }
            None => env.error(Some(file), import.pos, format!("Class {} not found in import.", import.name)),
        }
    }

    let packages = env.files[file].package_imports.clone();
    for import in packages {
        if find_qualified(env, &import.name)?.is_some() {
            continue;
        }
        if !env.package_exists(&import.name) {
            env.error(Some(file), import.pos, format!("Package {} not found in import.", import.name));
        }
    }
    log::debug!("resolve: imports of {} checked", env.files[file].path.display());
    Ok(())
}

/// Find a class by its dotted name, trying package prefixes from the
/// longest down so that `p.Outer.Inner` finds `p.Outer$Inner`.
pub fn find_qualified(env: &mut BatchEnvironment, name: &str) -> Result<Option<ClassId>> {
    let parts: Vec<&str> = name.split('.').collect();
    for split in (1..=parts.len()).rev() {
        let mut candidate = parts[..split].join(".");
        for nested in &parts[split..] {
            candidate.push('$');
            candidate.push_str(nested);
        }
        if env.exists(&candidate) {
            let id = env.declare(&candidate);
            if classloader::load(env, id)? {
                return Ok(Some(id));
            }
        }
    }
    Ok(None)
}

/// Look up a type name in the scope of class `ctx`. Reports ambiguity but
/// not absence.
pub fn lookup_class(env: &mut BatchEnvironment, ctx: ClassId, name: &str, pos: Where) -> Result<Option<ClassId>> {
    if let Some((first, rest)) = name.split_once('.') {
        if let Some(mut cur) = lookup_simple(env, ctx, first, pos)? {
            for part in rest.split('.') {
                match find_member_class(env, cur, part)? {
                    Some(next) => cur = next,
                    None => return Ok(None),
                }
            }
            return Ok(Some(cur));
        }
        return find_qualified(env, name);
    }
    lookup_simple(env, ctx, name, pos)
}

fn lookup_simple(env: &mut BatchEnvironment, ctx: ClassId, name: &str, pos: Where) -> Result<Option<ClassId>> {
    if let Some(local) = env.local_type(ctx, name) {
        return Ok(Some(local));
    }

    let mut scope = Some(ctx);
    while let Some(c) = scope {
        let def = &env.table[c];
        if !def.is_anonymous() && def.simple_name.as_deref() == Some(name) && !def.is_local() {
            return Ok(Some(c));
        }
        if let Some(member) = find_member_class(env, c, name)? {
            return Ok(Some(member));
        }
        scope = env.table[c].outer;
    }

    let file = env.file_of(ctx);
    if let Some(file) = file {
        if let Some(&imported) = env.files[file].import_table.get(name) {
            return Ok(Some(imported));
        }
    }

    let package = env.table[env.outermost(ctx)].package.clone();
    let in_package = if package.is_empty() { name.to_string() } else { format!("{}.{}", package, name) };
    if env.exists(&in_package) {
        let id = env.declare(&in_package);
        if classloader::load(env, id)? {
            return Ok(Some(id));
        }
    }

    let mut prefixes = vec![JAVA_LANG.to_string()];
    if let Some(file) = file {
        for import in &env.files[file].package_imports {
            if !prefixes.contains(&import.name) {
                prefixes.push(import.name.clone());
            }
        }
    }
    let mut found: Vec<ClassId> = Vec::new();
    for prefix in prefixes {
        let id = match find_qualified(env, &prefix)? {
            Some(class) => find_member_class(env, class, name)?,
            None => {
                let candidate = format!("{}.{}", prefix, name);
                if env.exists(&candidate) {
                    let id = env.declare(&candidate);
                    classloader::load(env, id)?.then_some(id)
                } else {
                    None
                }
            }
        };
        if let Some(id) = id {
            if !found.contains(&id) {
                found.push(id);
            }
        }
    }
    if found.len() > 1 {
        let msg = format!("Ambiguous class: {} and {}", env.class_name(found[0]), env.class_name(found[1]));
        env.error(file, pos, msg);
    }
    Ok(found.first().copied())
}

/// Member class `name` of `class` or one of its supertypes
pub fn find_member_class(env: &mut BatchEnvironment, class: ClassId, name: &str) -> Result<Option<ClassId>> {
    let mut visited = BTreeSet::new();
    let mut pending = vec![class];
    while let Some(c) = pending.pop() {
        if !visited.insert(c) || !classloader::load(env, c)? {
            continue;
        }
        if env.table[c].resolve_phase == Phase::NotStarted {
            resolve_class(env, c)?;
        }
        let def = &env.table[c];
        if let Some(nested) = def.find_nested(name) {
            return Ok(Some(nested));
        }
        pending.extend(def.interfaces.iter().rev().copied());
        pending.extend(def.super_class);
    }
    Ok(None)
}

/// Resolve a type name in the scope of `ctx`, reporting it if missing
pub fn resolve_type_name(env: &mut BatchEnvironment, ctx: ClassId, name: &TypeName) -> Result<Option<ClassId>> {
    match lookup_class(env, ctx, &name.name, name.pos)? {
        Some(id) => {
            if !can_access_class(env, ctx, id)? {
                let msg = format!("Class {} is not accessible from {}.", env.class_name(id), env.class_name(ctx));
                env.class_error(ctx, name.pos, msg);
            } else if env.table[id].is_deprecated() && env.outermost(id) != env.outermost(ctx) {
                let what = format!("The class {}", env.class_name(id));
                env.deprecation(ctx, name.pos, &what);
            }
            Ok(Some(id))
        }
        None => {
            env.class_error(ctx, name.pos, format!("Class {} not found.", name.name));
            Ok(None)
        }
    }
}

pub fn resolve_type_expr(env: &mut BatchEnvironment, ctx: ClassId, expr: &TypeExpr) -> Result<Type> {
    Ok(match expr {
        TypeExpr::Primitive(ty, _) => ty.clone(),
        TypeExpr::Named(name) => match resolve_type_name(env, ctx, name)? {
            Some(id) => env.table[id].ty(),
            None => Type::Error,
        },
        TypeExpr::Array(elem) => match resolve_type_expr(env, ctx, elem)? {
            Type::Error => Type::Error,
            ty => Type::array_of(ty),
        },
    })
}

/// Structural resolution of one class: outer class, imports, supertypes,
/// then member signatures.
pub fn resolve_class(env: &mut BatchEnvironment, id: ClassId) -> Result<()> {
    let Some(def) = env.table.def(id) else { return Ok(()) };
    if !def.is_source() || def.resolve_phase != Phase::NotStarted {
        return Ok(());
    }
    env.table[id].resolve_phase = Phase::InProgress;
    env.depth += 1;
    if env.depth > MAX_RESOLVE_DEPTH {
        return Err(Error::out_of_resources());
    }
    log::debug!("resolve: {}", env.class_name(id));

    if let Some(outer) = env.table[id].outer {
        resolve_class(env, outer)?;
    }
    if let Some(file) = env.file_of(id) {
        resolve_imports(env, file)?;
    }
    check_supers(env, id)?;
    resolve_members(env, id)?;
    lower::add_default_constructor(env, id);

    env.table[id].resolve_phase = Phase::Done;
    env.depth -= 1;
    Ok(())
}

fn check_supers(env: &mut BatchEnvironment, id: ClassId) -> Result<()> {
    let def = &env.table[id];
    let name = def.name.clone();
    let is_interface = def.is_interface();
    let is_anonymous = def.is_anonymous();
    let super_name = def.super_name.clone();
    let interface_names = def.interface_names.clone();
    let pos = def.pos;
    let object = env.declare(JAVA_LANG_OBJECT);

    if name == JAVA_LANG_OBJECT {
        env.table[id].super_class = None;
    } else if is_interface || super_name.is_none() {
        env.table[id].super_class = Some(object);
        classloader::load(env, object)?;
    } else if let Some(super_name) = super_name {
        let mut sup = Some(object);
        match lookup_class(env, id, &super_name.name, super_name.pos)? {
            None => {
                let msg = format!("Superclass {} of class {} not found.", super_name.name, name);
                env.class_error(id, super_name.pos, msg);
            }
            Some(s) if env.table[s].is_interface() => {
                if is_anonymous {
                    env.table[id].interfaces.push(s);
                    resolve_class(env, s)?;
                } else {
                    env.class_error(id, super_name.pos, format!("Can't subclass interfaces: {}", env.class_name(s)));
                }
            }
            Some(s) => {
                if env.table[s].is_final() {
                    env.class_error(id, super_name.pos, format!("Can't subclass final classes: {}", env.class_name(s)));
                }
                if !can_access_class(env, id, s)? {
                    let msg = format!("Superclass {} of class {} is not accessible.", env.class_name(s), name);
                    env.class_error(id, super_name.pos, msg);
                }
                if env.table[s].is_deprecated() && env.outermost(s) != env.outermost(id) {
                    let what = format!("The class {}", env.class_name(s));
                    env.deprecation(id, super_name.pos, &what);
                }
                sup = Some(s);
            }
        }
        env.table[id].super_class = sup;
        if let Some(s) = sup.filter(|&s| s != object) {
            resolve_class(env, s)?;
            if superclass_chain_reaches(env, s, id) {
                env.class_error(id, pos, "Cyclic class inheritance.");
                env.table[id].super_class = Some(object);
            } else if env.is_enclosed_by(s, id) {
                let msg = format!("Class {} can't extend its own inner class {}.", name, env.class_name(s));
                env.class_error(id, super_name.pos, msg);
                env.table[id].super_class = Some(object);
            }
        }
    }

    for iname in interface_names {
        let Some(i) = lookup_class(env, id, &iname.name, iname.pos)? else {
            let msg = format!("Interface {} of class {} not found.", iname.name, name);
            env.class_error(id, iname.pos, msg);
            continue;
        };
        if !env.table[i].is_interface() {
            env.class_error(id, iname.pos, format!("Interface expected here: {}", env.class_name(i)));
            continue;
        }
        if !can_access_class(env, id, i)? {
            let msg = format!("Interface {} of class {} is not accessible.", env.class_name(i), name);
            env.class_error(id, iname.pos, msg);
        }
        if env.table[id].interfaces.contains(&i) {
            env.class_error(id, iname.pos, format!("Interface {} repeated.", env.class_name(i)));
            continue;
        }
        env.table[id].interfaces.push(i);
        resolve_class(env, i)?;
        if interface_edges_reach(env, i, id) {
            env.class_error(id, iname.pos, "Cyclic interface inheritance.");
            env.table[id].interfaces.retain(|&x| x != i);
        }
    }
    Ok(())
}

/// Whether walking superclass links from `from` (inclusive) meets `target`
fn superclass_chain_reaches(env: &BatchEnvironment, from: ClassId, target: ClassId) -> bool {
    let mut seen = BTreeSet::new();
    let mut cur = Some(from);
    while let Some(c) = cur {
        if c == target {
            return true;
        }
        if !seen.insert(c) {
            return false;
        }
        cur = env.table.def(c).and_then(|d| d.super_class);
    }
    false
}

fn interface_edges_reach(env: &BatchEnvironment, from: ClassId, target: ClassId) -> bool {
    let mut seen = BTreeSet::new();
    let mut pending = vec![from];
    while let Some(c) = pending.pop() {
        if c == target {
            return true;
        }
        if seen.insert(c) {
            if let Some(def) = env.table.def(c) {
                pending.extend(def.interfaces.iter().copied());
            }
        }
    }
    false
}

fn resolve_members(env: &mut BatchEnvironment, id: ClassId) -> Result<()> {
    let count = env.table[id].members.len();
    let outer_ty = env.table[id].outer.map(|o| env.table[o].ty());
    let need_outer_this = env.table[id].need_outer_this();
    for index in 0..count {
        let r = MemberRef::new(id, index);
        let member = env.member(r);
        match member.kind.clone() {
            MemberKind::Field { type_expr: Some(te), .. } => {
                let ty = resolve_type_expr(env, id, &te)?;
                env.member_mut(r).ty = ty;
            }
            MemberKind::Method { ret_expr, params, .. } => {
                let ret = match ret_expr {
                    Some(te) => resolve_type_expr(env, id, &te)?,
                    None => env.member(r).method_type.ret.clone(),
                };
                let args = resolve_params(env, id, r, &params)?;
                let m = env.member_mut(r);
                m.ty = ret.clone();
                m.method_type = MethodType::new(ret, args);
                resolve_throws(env, id, r)?;
            }
            MemberKind::Constructor { params, .. } => {
                let mut args = resolve_params(env, id, r, &params)?;
                let m = env.member_mut(r);
                if need_outer_this && !m.outer_this_arg {
                    if let Some(outer) = outer_ty.clone() {
                        args.insert(0, outer);
                        m.outer_this_arg = true;
                    }
                }
                m.ty = Type::Void;
                m.method_type = MethodType::new(Type::Void, args);
                resolve_throws(env, id, r)?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn resolve_params(
    env: &mut BatchEnvironment,
    ctx: ClassId,
    r: MemberRef,
    params: &[crate::symtab::Param],
) -> Result<Vec<Type>> {
    let mut types = Vec::with_capacity(params.len());
    for p in params {
        let ty = match &p.type_expr {
            Some(te) => resolve_type_expr(env, ctx, te)?,
            None => p.ty.clone(),
        };
        types.push(ty);
    }
    if let Some(list) = env.member_mut(r).params_mut() {
        for (p, ty) in list.iter_mut().zip(&types) {
            p.ty = ty.clone();
        }
    }
    Ok(types)
}

fn resolve_throws(env: &mut BatchEnvironment, ctx: ClassId, r: MemberRef) -> Result<()> {
    let names = env.member(r).exception_names.clone();
    let mut exceptions = Vec::new();
    for name in &names {
        if let Some(id) = resolve_type_name(env, ctx, name)? {
            exceptions.push(id);
        }
    }
    if !names.is_empty() {
        env.member_mut(r).exceptions = exceptions;
    }
    Ok(())
}

// Type relations

/// The class of a class type, loaded
pub fn class_of(env: &mut BatchEnvironment, ty: &Type) -> Result<Option<ClassId>> {
    match ty {
        Type::Class(name) => {
            let id = env.declare(name);
            Ok(classloader::load(env, id)?.then_some(id))
        }
        _ => Ok(None),
    }
}

/// Load `id` and resolve its supertypes; false when it cannot be found
pub fn ensure_supers(env: &mut BatchEnvironment, id: ClassId) -> Result<bool> {
    if !classloader::load(env, id)? {
        return Ok(false);
    }
    if env.table[id].resolve_phase == Phase::NotStarted {
        resolve_class(env, id)?;
    }
    Ok(true)
}

/// Every superclass of `id`, nearest first
pub fn superclasses(env: &mut BatchEnvironment, id: ClassId) -> Result<Vec<ClassId>> {
    let mut out = Vec::new();
    let mut cur = id;
    while ensure_supers(env, cur)? {
        match env.table[cur].super_class {
            Some(s) if !out.contains(&s) && s != id => {
                out.push(s);
                cur = s;
            }
            _ => break,
        }
    }
    Ok(out)
}

pub fn is_subclass_of(env: &mut BatchEnvironment, sub: ClassId, sup: ClassId) -> Result<bool> {
    Ok(sub == sup || superclasses(env, sub)?.contains(&sup))
}

/// Whether `class` or one of its superclasses implements `intf`
pub fn implements(env: &mut BatchEnvironment, class: ClassId, intf: ClassId) -> Result<bool> {
    let mut seen = BTreeSet::new();
    let mut pending = vec![class];
    while let Some(c) = pending.pop() {
        if c == intf {
            return Ok(true);
        }
        if !seen.insert(c) || !ensure_supers(env, c)? {
            continue;
        }
        let def = &env.table[c];
        pending.extend(def.interfaces.iter().copied());
        pending.extend(def.super_class);
    }
    Ok(false)
}

pub fn is_subtype_class(env: &mut BatchEnvironment, sub: ClassId, sup: ClassId) -> Result<bool> {
    if sub == sup || env.class_name(sup) == JAVA_LANG_OBJECT {
        return Ok(true);
    }
    if !classloader::load(env, sup)? {
        return Ok(false);
    }
    if env.table[sup].is_interface() {
        implements(env, sub, sup)
    } else {
        is_subclass_of(env, sub, sup)
    }
}

/// Widening reference conversion (identity included)
pub fn is_subtype(env: &mut BatchEnvironment, from: &Type, to: &Type) -> Result<bool> {
    if from == to {
        return Ok(true);
    }
    match (from, to) {
        (Type::Null, t) => Ok(t.is_reference()),
        (Type::Class(_), Type::Class(_)) => {
            let (Some(a), Some(b)) = (class_of(env, from)?, class_of(env, to)?) else { return Ok(false) };
            is_subtype_class(env, a, b)
        }
        (Type::Array(_), Type::Class(name)) => {
            Ok(name == JAVA_LANG_OBJECT || name == "java.lang.Cloneable" || name == "java.io.Serializable")
        }
        (Type::Array(a), Type::Array(b)) if a.is_reference() && b.is_reference() => is_subtype(env, a, b),
        _ => Ok(false),
    }
}

/// Method invocation conversion
pub fn is_convertible(env: &mut BatchEnvironment, from: &Type, to: &Type) -> Result<bool> {
    if from.is_error() || to.is_error() {
        return Ok(true);
    }
    if from.is_primitive() && to.is_primitive() {
        return Ok(from.widens_to(to));
    }
    is_subtype(env, from, to)
}

/// Assignment conversion; int constants narrow to byte, short and char
/// when they fit.
pub fn is_assignable(env: &mut BatchEnvironment, from: &Type, to: &Type, value: Option<&ConstValue>) -> Result<bool> {
    if is_convertible(env, from, to)? {
        return Ok(true);
    }
    if let (Some(ConstValue::Int(v)), true) = (value, matches!(from, Type::Byte | Type::Short | Type::Char | Type::Int)) {
        let fits = match to {
            Type::Byte => i8::try_from(*v).is_ok(),
            Type::Short => i16::try_from(*v).is_ok(),
            Type::Char => u16::try_from(*v).is_ok(),
            _ => false,
        };
        return Ok(fits);
    }
    Ok(false)
}

pub fn is_castable(env: &mut BatchEnvironment, from: &Type, to: &Type) -> Result<bool> {
    if from.is_error() || to.is_error() || from == to {
        return Ok(true);
    }
    if from.is_numeric() && to.is_numeric() {
        return Ok(true);
    }
    if from.is_primitive() || to.is_primitive() {
        return Ok(false);
    }
    if is_subtype(env, from, to)? || is_subtype(env, to, from)? {
        return Ok(true);
    }
    match (class_of(env, from)?, class_of(env, to)?) {
        (Some(a), Some(b)) => {
            let (da, db) = (&env.table[a], &env.table[b]);
            Ok((da.is_interface() && !db.is_final()) || (db.is_interface() && !da.is_final()))
        }
        _ => Ok(false),
    }
}

// Access

pub fn can_access_class(env: &mut BatchEnvironment, from: ClassId, target: ClassId) -> Result<bool> {
    let def = &env.table[target];
    if def.is_public() {
        return Ok(true);
    }
    if def.is_private() {
        return Ok(env.outermost(from) == env.outermost(target));
    }
    let same_package = env.table[env.outermost(from)].package == def.package;
    if same_package || !def.is_protected() {
        return Ok(same_package);
    }
    match def.outer {
        Some(owner) => subclass_in_scope(env, from, owner),
        None => Ok(false),
    }
}

fn subclass_in_scope(env: &mut BatchEnvironment, from: ClassId, owner: ClassId) -> Result<bool> {
    let mut scope = Some(from);
    while let Some(c) = scope {
        if is_subclass_of(env, c, owner)? {
            return Ok(true);
        }
        scope = env.table[c].outer;
    }
    Ok(false)
}

pub fn can_access_member(env: &mut BatchEnvironment, from: ClassId, r: MemberRef) -> Result<bool> {
    let m = env.member(r);
    if m.is_public() {
        return Ok(true);
    }
    if m.is_private() {
        return Ok(env.outermost(from) == env.outermost(r.class));
    }
    let same_package = env.table[env.outermost(from)].package == env.table[r.class].package;
    if same_package || !m.is_protected() {
        return Ok(same_package);
    }
    subclass_in_scope(env, from, r.class)
}

/// Whether `id` has a definition that lookups may use
pub fn is_usable(env: &BatchEnvironment, id: ClassId) -> bool {
    env.table.status(id) != Status::NotFound && env.table.def(id).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::Config;
    use crate::wash::enter::parse_source;
    use std::path::PathBuf;

    fn env_with(files: &[(&str, &str)]) -> BatchEnvironment {
        let mut env = BatchEnvironment::new(Config::default());
        for (path, text) in files {
            parse_source(&mut env, PathBuf::from(path), text.to_string()).unwrap();
        }
        env
    }

    fn id(env: &BatchEnvironment, name: &str) -> ClassId {
        env.table.lookup(name).unwrap()
    }

    #[test]
    fn class_cycle_reports_once_and_severs() {
        let mut env = env_with(&[("A.java", "class A extends B {}"), ("B.java", "class B extends A {}")]);
        let a = id(&env, "A");
        let b = id(&env, "B");
        resolve_class(&mut env, a).unwrap();
        resolve_class(&mut env, b).unwrap();
        let cyclic: Vec<String> =
            env.diags.all_texts().into_iter().filter(|m| m.contains("Cyclic class inheritance")).collect();
        assert_eq!(cyclic.len(), 1);
        let object = id(&env, JAVA_LANG_OBJECT);
        assert!(env.table[a].super_class == Some(object) || env.table[b].super_class == Some(object));
    }

    #[test]
    fn self_inheritance_is_a_cycle() {
        let mut env = env_with(&[("A.java", "class A extends A {}")]);
        let a = id(&env, "A");
        resolve_class(&mut env, a).unwrap();
        assert_eq!(env.diags.error_count(), 1);
        assert_eq!(env.table[a].super_class, Some(id(&env, JAVA_LANG_OBJECT)));
    }

    #[test]
    fn interface_cycle_reports_once() {
        let mut env = env_with(&[("I.java", "interface I extends J {} interface J extends I {}")]);
        let i = id(&env, "I");
        resolve_class(&mut env, i).unwrap();
        let j = id(&env, "J");
        resolve_class(&mut env, j).unwrap();
        let cyclic = env.diags.all_texts().iter().filter(|m| m.contains("Cyclic interface inheritance")).count();
        assert_eq!(cyclic, 1);
    }

    #[test]
    fn outer_this_argument_is_inserted_once() {
        let mut env = env_with(&[("A.java", "class A { class B { B(int x) {} } }")]);
        let b = id(&env, "A$B");
        resolve_class(&mut env, b).unwrap();
        resolve_class(&mut env, b).unwrap();
        let ctor = env.table[b].constructors()[0];
        assert_eq!(env.member(ctor).method_type.descriptor(), "(LA;I)V");
        assert_eq!(env.member(ctor).declared_args(), &[Type::Int]);
    }

    #[test]
    fn nested_names_and_imports() {
        let mut env = env_with(&[
            ("p/Outer.java", "package p; public class Outer { public static class Inner {} }"),
            ("q/User.java", "package q; import p.Outer; class User { Outer.Inner f; }"),
        ]);
        let user = id(&env, "q.User");
        resolve_class(&mut env, user).unwrap();
        let f = env.table[user].find_field("f").unwrap();
        assert_eq!(env.member(f).ty, Type::class("p.Outer$Inner"));
        assert_eq!(env.diags.error_count(), 0);
    }

    #[test]
    fn final_and_interface_superclasses_are_rejected() {
        let mut env = env_with(&[("A.java", "final class F {} interface I {} class A extends F {} class B extends I {}")]);
        let a = id(&env, "A");
        let b = id(&env, "B");
        resolve_class(&mut env, a).unwrap();
        resolve_class(&mut env, b).unwrap();
        let texts = env.diags.all_texts();
        assert!(texts.iter().any(|m| m.contains("Can't subclass final classes: F")));
        assert!(texts.iter().any(|m| m.contains("Can't subclass interfaces: I")));
    }

    #[test]
    fn widening_and_casting() {
        let mut env = env_with(&[("A.java", "class A {} class B extends A {} interface I {}")]);
        let a = Type::class("A");
        let b = Type::class("B");
        assert!(is_subtype(&mut env, &b, &a).unwrap());
        assert!(!is_subtype(&mut env, &a, &b).unwrap());
        assert!(is_castable(&mut env, &a, &b).unwrap());
        assert!(is_castable(&mut env, &a, &Type::class("I")).unwrap());
        assert!(is_subtype(&mut env, &Type::array_of(Type::Int), &Type::class(JAVA_LANG_OBJECT)).unwrap());
        assert!(is_assignable(&mut env, &Type::Int, &Type::Byte, Some(&ConstValue::Int(100))).unwrap());
        assert!(!is_assignable(&mut env, &Type::Int, &Type::Byte, Some(&ConstValue::Int(300))).unwrap());
    }
}
