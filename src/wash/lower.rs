//! Synthetic members
//!
//! Everything here is created on demand while a nest is being checked, and
//! always before any class of the nest is written:
//!
//! - access bridges `access$N` for private members used across the nest
//!   and for protected members of another package used from an inner
//!   class of a subclass, cached on the class that carries them, and
//!   bridge constructors taking a null argument of the nest's dummy
//!   marker class
//! - default constructors and anonymous-class constructors
//! - the `class$` helper and its per-literal cache fields
//! - the `this$N` link to the enclosing instance and `val$x` copies of
//!   captured locals

use crate::ast::{Block, Catch, Expr, ExprKind, InvokeMode, LocalId, LocalVar, Stmt, StmtKind, TypeExpr, TypeName};
use crate::common::classloader;
use crate::common::consts::*;
use crate::common::env::BatchEnvironment;
use crate::common::error::{Error, Result};
use crate::parser::Where;
use crate::symtab::{
    AccessKind, Captured, ClassDefinition, ClassId, MemberDefinition, MemberKind, MemberRef, MemberStatus, MethodType,
    Origin, Param, Phase, Status, Type,
};

/// Class that carries the bridge for reaching `member` from code in `from`,
/// or None when `from` may access it directly.
///
/// Private members of a source class get their bridge in the declaring
/// class. Protected members of a class in another package, used from a
/// nested class that does not inherit them, get it in the nearest
/// enclosing class that does.
pub fn bridge_host(env: &BatchEnvironment, from: ClassId, member: MemberRef) -> Option<ClassId> {
    let m = env.member(member);
    if member.class == from {
        return None;
    }
    if m.is_private() {
        return env.table.def(member.class).filter(|d| d.is_source()).map(|_| member.class);
    }
    if !m.is_protected() || m.is_constructor() {
        return None;
    }
    let package = env.table.def(env.outermost(from)).map(|d| d.package.as_str());
    if package == env.table.def(member.class).map(|d| d.package.as_str()) || inherits_from(env, from, member.class) {
        return None;
    }
    let mut scope = env.table.def(from).and_then(|d| d.outer);
    while let Some(c) = scope {
        if inherits_from(env, c, member.class) {
            return Some(c);
        }
        scope = env.table.def(c).and_then(|d| d.outer);
    }
    None
}

/// Superclass walk over definitions already loaded
fn inherits_from(env: &BatchEnvironment, class: ClassId, sup: ClassId) -> bool {
    let mut cur = Some(class);
    let mut steps = 0;
    while let Some(c) = cur {
        if c == sup {
            return true;
        }
        steps += 1;
        if steps > env.table.len() {
            return false;
        }
        cur = env.table.def(c).and_then(|d| d.super_class);
    }
    false
}

/// Whether reaching `member` from code in `from` needs a bridge
pub fn needs_bridge(env: &BatchEnvironment, from: ClassId, member: MemberRef) -> bool {
    bridge_host(env, from, member).is_some()
}

/// The bridge in `host` for `target`, created the first time it is asked
/// for
pub fn access_bridge(env: &mut BatchEnvironment, host: ClassId, target: MemberRef, kind: AccessKind) -> Result<MemberRef> {
    let top = env.outermost(host);
    if let Some(&bridge) = env.table[host].access_methods.get(&(target, kind)) {
        return Ok(bridge);
    }

    let class = host;
    let class_ty = env.table[class].ty();
    let m = env.member(target).clone();
    let bridge = match kind {
        AccessKind::Construct => {
            let marker = dummy_marker(env, top)?;
            let mut args = m.method_type.args.clone();
            args.insert(args.len() - m.captured_args, env.table[marker].ty());
            let mut ctor = MemberDefinition::new(
                class,
                m.pos,
                INIT_NAME,
                M_SYNTHETIC,
                MemberKind::Constructor { params: Vec::new(), body: None },
            );
            ctor.ty = Type::Void;
            ctor.method_type = MethodType::new(Type::Void, args);
            ctor.outer_this_arg = m.outer_this_arg;
            ctor.captured_args = m.captured_args;
            ctor.exceptions = m.exceptions.clone();
            ctor
        }
        _ => {
            let mut args = Vec::new();
            if !m.is_static() {
                args.push(class_ty);
            }
            let ret = match kind {
                AccessKind::Get => m.ty.clone(),
                AccessKind::Set => {
                    args.push(m.ty.clone());
                    m.ty.clone()
                }
                _ => {
                    args.extend(m.method_type.args.iter().cloned());
                    m.method_type.ret.clone()
                }
            };
            let name = unused_access_name(&env.table[class]);
            let mut method = MemberDefinition::new(
                class,
                m.pos,
                name,
                M_STATIC | M_SYNTHETIC,
                MemberKind::Method { ret_expr: None, params: Vec::new(), body: None },
            );
            method.ty = ret.clone();
            method.method_type = MethodType::new(ret, args);
            if kind == AccessKind::Call {
                method.exceptions = m.exceptions.clone();
            }
            method
        }
    };
    let mut bridge = bridge;
    bridge.access_target = Some((target, kind));
    bridge.status = MemberStatus::Checked;
    let r = env.table[class].add_member(bridge);
    env.table[class].access_methods.insert((target, kind), r);
    log::debug!("lower: {:?} bridge {} for {}", kind, env.member(r).describe(), env.member(target).describe());
    Ok(r)
}

fn unused_access_name(def: &ClassDefinition) -> String {
    (0..)
        .map(|n| format!("{}{}", PREFIX_ACCESS, n))
        .find(|name| !def.members.iter().any(|m| &m.name == name))
        .unwrap_or_default()
}

/// A fresh static synthetic class nested in `top`, numbered like the
/// anonymous classes of `top`
fn synthetic_holder(env: &mut BatchEnvironment, top: ClassId) -> Result<ClassId> {
    let file = env.file_of(top).ok_or_else(|| Error::internal("synthetic class outside a source file"))?;
    let def = &mut env.table[top];
    def.local_counter += 1;
    let name = format!("{}${}", def.name, def.local_counter);
    let pos = def.pos;
    let id = env.declare(&name);
    let object = env.declare(JAVA_LANG_OBJECT);
    let mut holder = ClassDefinition::new(id, name, Origin::Source { file }, pos, M_STATIC | M_SYNTHETIC | M_ANONYMOUS);
    holder.simple_name = None;
    holder.outer = Some(top);
    holder.super_class = Some(object);
    holder.resolve_phase = Phase::Done;
    holder.check_phase = Phase::Done;
    env.table.set_definition(id, holder, Status::Checked);
    Ok(id)
}

/// The marker class whose null instance tells a bridge constructor apart
/// from the private one it calls; one per nest
pub fn dummy_marker(env: &mut BatchEnvironment, top: ClassId) -> Result<ClassId> {
    if let Some(marker) = env.table[top].dummy_marker {
        return Ok(marker);
    }
    let marker = synthetic_holder(env, top)?;
    env.table[top].dummy_marker = Some(marker);
    Ok(marker)
}

/// Give a class without constructors its default one. A private class
/// gets a package-private constructor so the rest of the nest can use it.
pub fn add_default_constructor(env: &mut BatchEnvironment, id: ClassId) {
    let def = &env.table[id];
    if def.is_interface() || def.is_anonymous() || !def.constructors().is_empty() {
        return;
    }
    let access = def.modifiers & (M_PUBLIC | M_PROTECTED);
    let pos = def.pos;
    let outer = def.outer.filter(|_| def.need_outer_this()).map(|o| env.table[o].ty());
    let body = Block::new(Vec::new(), pos, pos);
    let mut ctor = MemberDefinition::new(
        id,
        pos,
        INIT_NAME,
        access,
        MemberKind::Constructor { params: Vec::new(), body: Some(body) },
    );
    ctor.ty = Type::Void;
    ctor.outer_this_arg = outer.is_some();
    ctor.method_type = MethodType::new(Type::Void, outer.into_iter().collect());
    env.table[id].add_member(ctor);
    log::debug!("lower: default constructor for {}", env.class_name(id));
}

/// Constructor of an anonymous class: takes the arguments of the chosen
/// superclass constructor and passes them on.
pub fn anonymous_constructor(
    env: &mut BatchEnvironment,
    anon: ClassId,
    arg_types: &[Type],
    exceptions: Vec<ClassId>,
) -> MemberRef {
    if let Some(&existing) = env.table[anon].constructors().first() {
        return existing;
    }
    let def = &env.table[anon];
    let pos = def.pos;
    let outer = def.outer.filter(|_| def.need_outer_this()).map(|o| env.table[o].ty());
    let params: Vec<Param> =
        arg_types.iter().enumerate().map(|(i, ty)| Param::resolved(format!("x{}", i), ty.clone(), pos)).collect();
    let args: Vec<Expr> = params.iter().map(|p| Expr::new(ExprKind::Name(p.name.clone()), pos)).collect();
    let call = Expr::new(ExprKind::CtorCall { is_super: true, args }, pos);
    let body = Block::new(vec![Stmt::new(StmtKind::Expr(call), pos)], pos, pos);

    let mut method_args: Vec<Type> = outer.iter().cloned().collect();
    method_args.extend(arg_types.iter().cloned());
    let mut ctor =
        MemberDefinition::new(anon, pos, INIT_NAME, 0, MemberKind::Constructor { params, body: Some(body) });
    ctor.ty = Type::Void;
    ctor.outer_this_arg = outer.is_some();
    ctor.method_type = MethodType::new(Type::Void, method_args);
    ctor.exceptions = exceptions;
    env.table[anon].add_member(ctor)
}

/// The `this$N` field of a class with an enclosing instance
pub fn outer_this_field(env: &mut BatchEnvironment, id: ClassId) -> Option<MemberRef> {
    let def = &env.table[id];
    if !def.need_outer_this() {
        return None;
    }
    if let Some(index) = def.outer_this_field {
        return Some(MemberRef::new(id, index as usize));
    }
    let outer = def.outer?;
    let mut depth = 0;
    let mut cur = env.table[outer].outer;
    while let Some(o) = cur {
        depth += 1;
        cur = env.table[o].outer;
    }
    let ty = env.table[outer].ty();
    let pos = env.table[id].pos;
    let mut field = MemberDefinition::new(
        id,
        pos,
        format!("{}{}", PREFIX_THIS, depth),
        M_FINAL | M_SYNTHETIC,
        MemberKind::Field { type_expr: None, init: None, value: None },
    );
    field.ty = ty;
    field.status = MemberStatus::Inlined;
    let r = env.table[id].add_member(field);
    env.table[id].outer_this_field = Some(r.index);
    Some(r)
}

/// The `val$name` field holding a captured local in `class`
pub fn capture(env: &mut BatchEnvironment, class: ClassId, name: &str, ty: &Type, pos: Where) -> MemberRef {
    if let Some(c) = env.table[class].captured.iter().find(|c| c.name == name) {
        return MemberRef::new(class, c.field as usize);
    }
    let mut field = MemberDefinition::new(
        class,
        pos,
        format!("{}{}", PREFIX_VAL, name),
        M_PRIVATE | M_FINAL | M_SYNTHETIC,
        MemberKind::Field { type_expr: None, init: None, value: None },
    );
    field.ty = ty.clone();
    field.status = MemberStatus::Inlined;
    let r = env.table[class].add_member(field);
    env.table[class].captured.push(Captured { name: name.to_string(), ty: ty.clone(), field: r.index });
    log::debug!("lower: {} captures {}", env.class_name(class), name);
    r
}

/// Append the captured locals to every constructor of `id`
pub fn finish_captures(env: &mut BatchEnvironment, id: ClassId) {
    let captured: Vec<Type> = env.table[id].captured.iter().map(|c| c.ty.clone()).collect();
    for r in env.table[id].constructors() {
        let m = env.member_mut(r);
        let have = m.captured_args;
        m.method_type.args.extend(captured[have..].iter().cloned());
        m.captured_args = captured.len();
    }
}

/// Name under which `Class.forName` finds a type
pub fn class_literal_name(ty: &Type) -> String {
    match ty {
        Type::Class(name) => name.clone(),
        other => other.descriptor().replace('/', "."),
    }
}

fn cache_field_name(ty: &Type) -> String {
    match ty {
        Type::Class(name) => format!("{}{}", PREFIX_CLASS, name.replace('.', "$")),
        other => {
            let desc = other.descriptor();
            let mangled: String = desc[1..].chars().filter(|&c| c != ';').map(|c| match c {
                '[' | '/' | '.' => '$',
                c => c,
            }).collect();
            format!("{}{}", PREFIX_ARRAY, mangled)
        }
    }
}

/// The expression for `T.class` with `T` a class or array type
pub fn class_literal(env: &mut BatchEnvironment, from: ClassId, ty: &Type) -> Result<ExprKind> {
    let top = env.outermost(from);
    let helper = match env.table[top].class_lookup {
        Some(helper) => helper,
        None => {
            let holder = literal_holder(env, top)?;
            let helper = class_lookup_helper(env, holder)?;
            env.table[top].class_lookup = Some(helper);
            helper
        }
    };
    let holder = helper.class;
    let name = cache_field_name(ty);
    let class_ty = Type::class(JAVA_LANG_CLASS);
    let cache = match env.table[holder].find_field(&name) {
        Some(r) => r,
        None => {
            let mut field = MemberDefinition::new(
                holder,
                env.table[holder].pos,
                name,
                M_STATIC | M_SYNTHETIC,
                MemberKind::Field { type_expr: None, init: None, value: None },
            );
            field.ty = class_ty;
            field.status = MemberStatus::Inlined;
            env.table[holder].add_member(field)
        }
    };
    Ok(ExprKind::ClassLookup { cache, helper, name: class_literal_name(ty) })
}

fn literal_holder(env: &mut BatchEnvironment, top: ClassId) -> Result<ClassId> {
    if !env.table[top].is_interface() {
        return Ok(top);
    }
    let candidate = env
        .nest_of(top)
        .into_iter()
        .find(|&c| c != top && !env.table[c].is_interface() && Some(c) != env.table[top].dummy_marker);
    match candidate {
        Some(c) => Ok(c),
        None => synthetic_holder(env, top),
    }
}

fn runtime_class(env: &mut BatchEnvironment, name: &str) -> Result<ClassId> {
    let id = env.declare(name);
    if !classloader::load(env, id)? {
        return Err(Error::environment(format!("Fatal error: class {} not found", name)));
    }
    Ok(id)
}

fn runtime_member(env: &mut BatchEnvironment, class: ClassId, key: &str) -> Result<MemberRef> {
    env.table[class]
        .find_method_by_signature(key)
        .ok_or_else(|| Error::environment(format!("Fatal error: {}.{} not found", env.class_name(class), key)))
}

/// `static Class class$(String)` wrapping `Class.forName`, with its body
/// already in resolved form
fn class_lookup_helper(env: &mut BatchEnvironment, holder: ClassId) -> Result<MemberRef> {
    let class_class = runtime_class(env, JAVA_LANG_CLASS)?;
    let not_found = runtime_class(env, JAVA_LANG_CLASS_NOT_FOUND)?;
    let no_def = runtime_class(env, JAVA_LANG_NO_CLASS_DEF_FOUND)?;
    let throwable = runtime_class(env, JAVA_LANG_THROWABLE)?;
    let for_name = runtime_member(env, class_class, "forName(Ljava/lang/String;)")?;
    let no_def_ctor = runtime_member(env, no_def, "<init>(Ljava/lang/String;)")?;
    let get_message = runtime_member(env, throwable, "getMessage()")?;

    let pos = env.table[holder].pos;
    let string = Type::class(JAVA_LANG_STRING);
    let class_ty = Type::class(JAVA_LANG_CLASS);
    let e_ty = env.table[not_found].ty();
    let local = |id: u32, ty: &Type| Expr::typed(ExprKind::Local(LocalId(id)), pos, ty.clone());

    let lookup = Expr::typed(
        ExprKind::Invoke { target: None, method: for_name, args: vec![local(0, &string)], mode: InvokeMode::Static },
        pos,
        class_ty.clone(),
    );
    let message = Expr::typed(
        ExprKind::Invoke {
            target: Some(Box::new(local(1, &e_ty))),
            method: get_message,
            args: Vec::new(),
            mode: InvokeMode::Virtual,
        },
        pos,
        string.clone(),
    );
    let error = Expr::typed(
        ExprKind::NewInstance { class: no_def, ctor: no_def_ctor, outer: None, args: vec![message], marker: false },
        pos,
        env.table[no_def].ty(),
    );
    let handler = Catch {
        name: "e".to_string(),
        type_expr: TypeExpr::Named(TypeName::new(JAVA_LANG_CLASS_NOT_FOUND, pos)),
        pos,
        local: Some(LocalId(1)),
        class: Some(not_found),
        body: Block::new(vec![Stmt::new(StmtKind::Throw(error), pos)], pos, pos),
    };
    let body = Block::new(
        vec![Stmt::new(
            StmtKind::Try {
                body: Block::new(vec![Stmt::new(StmtKind::Return(Some(lookup)), pos)], pos, pos),
                catches: vec![handler],
            },
            pos,
        )],
        pos,
        pos,
    );

    let mut helper = MemberDefinition::new(
        holder,
        pos,
        PREFIX_CLASS,
        M_STATIC | M_SYNTHETIC,
        MemberKind::Method {
            ret_expr: None,
            params: vec![Param::resolved("s", string.clone(), pos)],
            body: Some(body),
        },
    );
    helper.ty = class_ty.clone();
    helper.method_type = MethodType::new(class_ty, vec![string.clone()]);
    helper.locals = vec![
        LocalVar { name: "s".to_string(), ty: string, slot: 0, pos, is_final: false, number: 0, synthetic: false },
        LocalVar { name: "e".to_string(), ty: e_ty, slot: 1, pos, is_final: false, number: 1, synthetic: false },
    ];
    helper.max_locals = 2;
    helper.status = MemberStatus::Checked;
    let r = env.table[holder].add_member(helper);
    log::debug!("lower: class$ helper in {}", env.class_name(holder));
    Ok(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::Config;
    use crate::wash::enter::parse_source;
    use crate::wash::resolve::resolve_class;
    use std::path::PathBuf;

    fn env_with(text: &str) -> BatchEnvironment {
        let mut env = BatchEnvironment::new(Config::default());
        parse_source(&mut env, PathBuf::from("A.java"), text.to_string()).unwrap();
        env
    }

    #[test]
    fn bridges_are_cached_per_target() {
        let mut env = env_with("class A { private int x; private void m(int i) {} class B {} }");
        let a = env.table.lookup("A").unwrap();
        resolve_class(&mut env, a).unwrap();
        let x = env.table[a].find_field("x").unwrap();
        let get = access_bridge(&mut env, a, x, AccessKind::Get).unwrap();
        assert_eq!(access_bridge(&mut env, a, x, AccessKind::Get).unwrap(), get);
        let set = access_bridge(&mut env, a, x, AccessKind::Set).unwrap();
        assert_eq!(env.member(get).name, "access$0");
        assert_eq!(env.member(set).name, "access$1");
        assert_eq!(env.member(get).method_type.descriptor(), "(LA;)I");
        assert_eq!(env.member(set).method_type.descriptor(), "(LA;I)I");
        let m = env.table[a].find_methods("m")[0];
        let call = access_bridge(&mut env, a, m, AccessKind::Call).unwrap();
        assert_eq!(env.member(call).method_type.descriptor(), "(LA;I)V");
    }

    #[test]
    fn protected_members_are_bridged_in_the_inheriting_outer_class() {
        let mut env = BatchEnvironment::new(Config::default());
        let super_text = "package p; public class S { protected int v; }";
        parse_source(&mut env, PathBuf::from("p/S.java"), super_text.to_string()).unwrap();
        let sub_text = "package q; import p.S; public class M extends S { class B {} }";
        parse_source(&mut env, PathBuf::from("q/M.java"), sub_text.to_string()).unwrap();
        let s = env.table.lookup("p.S").unwrap();
        let m = env.table.lookup("q.M").unwrap();
        let b = env.table.lookup("q.M$B").unwrap();
        resolve_class(&mut env, b).unwrap();
        let v = env.table[s].find_field("v").unwrap();
        assert_eq!(bridge_host(&env, b, v), Some(m));
        assert_eq!(bridge_host(&env, m, v), None);
        let get = access_bridge(&mut env, m, v, AccessKind::Get).unwrap();
        assert_eq!(get.class, m);
        assert_eq!(env.member(get).method_type.descriptor(), "(Lq/M;)I");
        assert!(env.table[s].access_methods.is_empty());
    }

    #[test]
    fn constructor_bridges_share_one_marker() {
        let mut env = env_with("class A { private A() {} private A(int i) {} class B {} }");
        let a = env.table.lookup("A").unwrap();
        resolve_class(&mut env, a).unwrap();
        let ctors = env.table[a].constructors();
        let first = access_bridge(&mut env, a, ctors[0], AccessKind::Construct).unwrap();
        let second = access_bridge(&mut env, a, ctors[1], AccessKind::Construct).unwrap();
        let marker = env.table[a].dummy_marker.unwrap();
        assert_eq!(env.class_name(marker), "A$1");
        assert_eq!(env.member(first).method_type.descriptor(), "(LA$1;)V");
        assert_eq!(env.member(second).method_type.descriptor(), "(ILA$1;)V");
        assert!(env.table[marker].is_synthetic());
    }

    #[test]
    fn private_class_default_constructor_is_package_private() {
        let mut env = env_with("class A { private static class P {} public class Q {} }");
        let p = env.table.lookup("A$P").unwrap();
        let q = env.table.lookup("A$Q").unwrap();
        resolve_class(&mut env, q).unwrap();
        add_default_constructor(&mut env, p);
        add_default_constructor(&mut env, q);
        let pc = env.table[p].constructors()[0];
        assert!(env.member(pc).is_package_private());
        let qc = env.table[q].constructors()[0];
        assert!(env.member(qc).is_public());
        assert_eq!(env.member(qc).method_type.descriptor(), "(LA;)V");
    }

    #[test]
    fn class_literals_share_the_helper() {
        let mut env = env_with("class A {}");
        let a = env.table.lookup("A").unwrap();
        let first = class_literal(&mut env, a, &Type::class("java.lang.String")).unwrap();
        let second = class_literal(&mut env, a, &Type::array_of(Type::class("java.lang.String"))).unwrap();
        let (ExprKind::ClassLookup { helper: h1, cache: c1, .. }, ExprKind::ClassLookup { helper: h2, cache: c2, name }) =
            (first, second)
        else {
            panic!("expected class lookups");
        };
        assert_eq!(h1, h2);
        assert_ne!(c1, c2);
        assert_eq!(env.member(c1).name, "class$java$lang$String");
        assert_eq!(env.member(h1).name, "class$");
        assert_eq!(name, "[Ljava.lang.String;");
    }

    #[test]
    fn captures_extend_constructors_once() {
        let mut env = env_with("class A { void m() { class L {} } }");
        let l = env.table.lookup("A$1L").unwrap();
        resolve_class(&mut env, l).unwrap();
        add_default_constructor(&mut env, l);
        capture(&mut env, l, "x", &Type::Int, Where::NOWHERE);
        capture(&mut env, l, "x", &Type::Int, Where::NOWHERE);
        finish_captures(&mut env, l);
        finish_captures(&mut env, l);
        let ctor = env.table[l].constructors()[0];
        assert_eq!(env.member(ctor).method_type.descriptor(), "(LA;I)V");
        assert!(env.table[l].find_field("val$x").is_some());
    }
}
