//! Semantic checking of source classes
//!
//! [`Checker::check_class`] runs once per class, after structural
//! resolution: member-level rules, inheritance and overriding, abstractness
//! (with miranda methods for old targets), then attribution of every body,
//! flow analysis and the synthetic members those need. Member classes are
//! checked right after their outer class. Local and anonymous classes are
//! checked when attribution reaches their declaration.

use crate::common::consts::*;
use crate::common::env::BatchEnvironment;
use crate::common::error::Result;
use crate::symtab::{ClassId, MemberDefinition, MemberKind, MemberRef, MemberStatus, Phase, Type};
use crate::wash::attr::Frame;
use crate::wash::resolve::{self, resolve_class};
use crate::wash::{flow, lower};
use std::collections::BTreeMap;

/// Checks classes and attributes their bodies. The frame stack mirrors the
/// lexical nesting of the bodies being attributed, so that local and
/// anonymous classes can reach the locals of their enclosing method.
pub struct Checker<'a> {
    pub env: &'a mut BatchEnvironment,
    pub(super) frames: Vec<Frame>,
    /// Nesting of expressions being attributed
    pub(super) depth: usize,
}

/// Check a top-level class and everything nested in it
pub fn check_nest(env: &mut BatchEnvironment, top: ClassId) -> Result<()> {
    Checker::new(env).check_class(top)
}

fn access_rank(m: &MemberDefinition) -> u8 {
    if m.is_public() {
        3
    } else if m.is_protected() {
        2
    } else if m.is_private() {
        0
    } else {
        1
    }
}

fn class_kind(env: &BatchEnvironment, id: ClassId) -> &'static str {
    match env.table.def(id) {
        Some(def) if def.is_interface() => "interface",
        _ => "class",
    }
}

impl<'a> Checker<'a> {
    pub fn new(env: &'a mut BatchEnvironment) -> Self {
        Self { env, frames: Vec::new(), depth: 0 }
    }

    pub fn check_class(&mut self, id: ClassId) -> Result<()> {
        match self.env.table.def(id) {
            Some(def) if def.is_source() && def.check_phase == Phase::NotStarted => {}
            _ => return Ok(()),
        }
        self.env.table[id].check_phase = Phase::InProgress;
        resolve_class(self.env, id)?;
        if self.env.config.verbose {
            log::info!("[checking class {}]", self.env.class_name(id));
        }
        log::debug!("check: {}", self.env.class_name(id));

        self.check_duplicate_methods(id);
        self.check_throws_clauses(id)?;
        self.collect_inherited(id)?;
        lower::outer_this_field(self.env, id);
        self.attribute_members(id)?;
        self.check_inner_statics(id);
        flow::check_class(self.env, id)?;
        lower::finish_captures(self.env, id);

        self.env.table[id].check_phase = Phase::Done;
        for nested in self.env.table[id].nested_classes() {
            self.check_class(nested)?;
        }
        Ok(())
    }

    fn check_duplicate_methods(&mut self, id: ClassId) {
        let mut seen: BTreeMap<String, MemberRef> = BTreeMap::new();
        let refs: Vec<MemberRef> = self.env.table[id].member_refs().collect();
        for r in refs {
            let m = self.env.member(r);
            if !m.is_invocable() || m.is_synthetic() {
                continue;
            }
            let key = m.signature_key();
            if seen.contains_key(&key) {
                let msg = format!("Duplicate method declaration: {}", m.describe());
                let pos = m.pos;
                self.env.class_error(id, pos, msg);
                self.env.member_mut(r).status = MemberStatus::Error;
            } else {
                seen.insert(key, r);
            }
        }
    }

    fn check_throws_clauses(&mut self, id: ClassId) -> Result<()> {
        let throwable = self.env.declare(JAVA_LANG_THROWABLE);
        let refs: Vec<MemberRef> = self.env.table[id].member_refs().collect();
        for r in refs {
            let (exceptions, pos) = {
                let m = self.env.member(r);
                (m.exceptions.clone(), m.pos)
            };
            for e in exceptions {
                if !resolve::is_subclass_of(self.env, e, throwable)? {
                    let msg = format!(
                        "Class {} in throws clause must be a subclass of class {}.",
                        self.env.class_name(e),
                        JAVA_LANG_THROWABLE
                    );
                    self.env.class_error(id, pos, msg);
                }
            }
        }
        Ok(())
    }

    /// Methods of `id` visible to inheritance: its own methods proper
    fn own_methods(&self, id: ClassId) -> Vec<MemberRef> {
        let Some(def) = self.env.table.def(id) else { return Vec::new() };
        def.member_refs().filter(|&r| self.env.member(r).is_method()).collect()
    }

    /// Walk the superclass chain collecting inherited methods by signature,
    /// nearest first, and the abstract ones that can never be implemented
    fn superclass_methods(&mut self, id: ClassId) -> Result<(BTreeMap<String, MemberRef>, Vec<MemberRef>)> {
        let mut inherited = BTreeMap::new();
        let mut unreachable = Vec::new();
        let package = self.env.table[id].package.clone();
        for c in resolve::superclasses(self.env, id)? {
            self.collect_inherited(c)?;
            let Some(def) = self.env.table.def(c) else { continue };
            let other_package = def.package != package;
            for r in self.own_methods(c) {
                let m = self.env.member(r);
                if m.is_private() {
                    continue;
                }
                let key = m.signature_key();
                if m.is_package_private() && other_package {
                    if m.is_abstract() && !inherited.contains_key(&key) {
                        unreachable.push(r);
                    }
                    continue;
                }
                inherited.entry(key).or_insert(r);
            }
        }
        Ok((inherited, unreachable))
    }

    /// Every method of every interface `id` implements, directly or through
    /// its superclasses and superinterfaces
    fn interface_methods(&mut self, id: ClassId) -> Result<Vec<MemberRef>> {
        let mut pending = vec![id];
        pending.extend(resolve::superclasses(self.env, id)?);
        let mut seen = Vec::new();
        let mut out = Vec::new();
        while let Some(c) = pending.pop() {
            if !resolve::ensure_supers(self.env, c)? {
                continue;
            }
            let Some(def) = self.env.table.def(c) else { continue };
            for &i in &def.interfaces {
                if !seen.contains(&i) {
                    seen.push(i);
                    pending.push(i);
                }
            }
        }
        seen.sort();
        for i in seen {
            if !resolve::ensure_supers(self.env, i)? {
                continue;
            }
            out.extend(self.own_methods(i).into_iter().filter(|&r| self.env.member(r).is_abstract()));
        }
        Ok(out)
    }

    /// Inheritance rules for one class: overriding, abstract coverage and
    /// miranda methods
    pub(super) fn collect_inherited(&mut self, id: ClassId) -> Result<()> {
        match self.env.table.def(id) {
            Some(def) if def.is_source() && !def.inherited_collected => {}
            _ => return Ok(()),
        }
        self.env.table[id].inherited_collected = true;
        resolve_class(self.env, id)?;

        let own = self.own_methods(id);
        let own_keys: BTreeMap<String, MemberRef> =
            own.iter().map(|&r| (self.env.member(r).signature_key(), r)).collect();
        let (inherited, unreachable) = self.superclass_methods(id)?;

        for &r in &own {
            let key = self.env.member(r).signature_key();
            if let Some(&over) = inherited.get(&key) {
                self.check_override(id, r, over)?;
            }
        }

        let is_abstract = self.env.table[id].is_abstract();
        let is_interface = self.env.table[id].is_interface();
        let mut missing: Vec<MemberRef> = Vec::new();
        let mut by_interface: BTreeMap<String, MemberRef> = BTreeMap::new();
        for im in self.interface_methods(id)? {
            let key = self.env.member(im).signature_key();
            if let Some(&other) = by_interface.get(&key) {
                if other.class != im.class && self.env.member(other).ty != self.env.member(im).ty {
                    let msg = format!(
                        "The method {} is inherited with different return types from interface {} and interface {}.",
                        self.env.member(im).describe(),
                        self.env.class_name(other.class),
                        self.env.class_name(im.class)
                    );
                    let pos = self.env.table[id].pos;
                    self.env.class_error(id, pos, msg);
                }
                continue;
            }
            by_interface.insert(key.clone(), im);
            if let Some(&r) = own_keys.get(&key) {
                self.check_override(id, r, im)?;
            } else if let Some(&r) = inherited.get(&key) {
                if !self.env.member(r).is_abstract() {
                    self.check_implementation(id, r, im);
                }
            } else if !is_interface {
                missing.push(im);
            }
        }

        if !is_abstract {
            let mut obligations: Vec<MemberRef> =
                inherited.values().copied().filter(|&r| self.env.member(r).is_abstract()).collect();
            obligations.extend(unreachable.iter().copied());
            obligations.extend(missing.iter().copied());
            if let Some(&first) = obligations.iter().find(|&&r| {
                let key = self.env.member(r).signature_key();
                !own_keys.contains_key(&key)
            }) {
                let m = self.env.member(first);
                let msg = format!(
                    "Class {} must be declared abstract. It does not define {} from {} {}.",
                    self.env.class_name(id),
                    m.describe(),
                    class_kind(self.env, first.class),
                    self.env.class_name(first.class)
                );
                let pos = self.env.table[id].pos;
                self.env.class_error(id, pos, msg);
            }
        } else if !unreachable.is_empty() {
            self.env.table[id].permanently_abstract = true;
        }

        if is_abstract && !is_interface && self.env.config.miranda() {
            for im in missing {
                self.add_miranda(id, im);
            }
        }
        Ok(())
    }

    fn add_miranda(&mut self, id: ClassId, im: MemberRef) {
        let source = self.env.member(im);
        let mut copy = MemberDefinition::new(
            id,
            self.env.table[id].pos,
            source.name.clone(),
            M_PUBLIC | M_ABSTRACT,
            MemberKind::Method { ret_expr: None, params: Vec::new(), body: None },
        );
        copy.ty = source.ty.clone();
        copy.method_type = source.method_type.clone();
        copy.exceptions = source.exceptions.clone();
        copy.status = MemberStatus::Checked;
        log::debug!("check: miranda {} in {}", copy.describe(), self.env.class_name(id));
        self.env.table[id].add_member(copy);
    }

    fn describe_with_return(&self, r: MemberRef) -> String {
        let m = self.env.member(r);
        format!("{} {}", m.ty, m.describe())
    }

    /// `r`, declared in `id`, overrides or hides `over`
    fn check_override(&mut self, id: ClassId, r: MemberRef, over: MemberRef) -> Result<()> {
        let (m, o) = (self.env.member(r), self.env.member(over));
        let pos = m.pos;
        let describe = m.describe();
        let thrown = m.exceptions.clone();
        let allowed = o.exceptions.clone();
        let where_from = format!("{} {}", class_kind(self.env, over.class), self.env.class_name(over.class));

        let error = if m.is_static() && !o.is_static() {
            Some(format!(
                "The static method {} can't hide the instance method of the same signature declared in {}. It is illegal to hide an instance method.",
                describe, where_from
            ))
        } else if !m.is_static() && o.is_static() {
            Some(format!(
                "The instance method {} can't override the static method of the same signature declared in {}. It is illegal to override a static method.",
                describe, where_from
            ))
        } else if o.is_final() {
            Some(format!(
                "The method {} can't override the final method of the same signature declared in {}. Final methods can't be overridden.",
                describe, where_from
            ))
        } else if m.ty != o.ty {
            Some(format!(
                "The method {} declared in class {} cannot override the method of the same signature declared in {}. They must have the same return type.",
                self.describe_with_return(r),
                self.env.class_name(id),
                where_from
            ))
        } else if access_rank(m) < access_rank(o) {
            Some(format!(
                "The method {} declared in class {} cannot override the method of the same signature declared in {}. The access modifier is made more restrictive.",
                describe,
                self.env.class_name(id),
                where_from
            ))
        } else {
            None
        };
        if let Some(msg) = error {
            self.env.class_error(id, pos, msg);
            return Ok(());
        }

        for e in thrown {
            if !self.is_checked_exception(e)? {
                continue;
            }
            let mut covered = false;
            for &a in &allowed {
                if resolve::is_subclass_of(self.env, e, a)? {
                    covered = true;
                    break;
                }
            }
            if !covered {
                let msg = format!(
                    "Invalid exception class {} in throws clause. The exception must be a subclass of an exception thrown by the method {} from {}.",
                    self.env.class_name(e),
                    describe,
                    where_from
                );
                self.env.class_error(id, pos, msg);
            }
        }
        Ok(())
    }

    /// An inherited method `r` implements interface method `im` for `id`
    fn check_implementation(&mut self, id: ClassId, r: MemberRef, im: MemberRef) {
        let (m, i) = (self.env.member(r), self.env.member(im));
        let msg = if m.ty != i.ty {
            format!(
                "The method {} inherited from class {} is incompatible with the method of the same signature in interface {}. They must have the same return type.",
                self.describe_with_return(r),
                self.env.class_name(r.class),
                self.env.class_name(im.class)
            )
        } else if !m.is_public() {
            format!(
                "The method {} inherited from class {} cannot implement the method of the same signature in interface {}. It must be public.",
                m.describe(),
                self.env.class_name(r.class),
                self.env.class_name(im.class)
            )
        } else {
            return;
        };
        let pos = self.env.table[id].pos;
        self.env.class_error(id, pos, msg);
    }

    /// Checked exceptions are the throwables outside `RuntimeException`
    /// and `Error`
    pub(super) fn is_checked_exception(&mut self, e: ClassId) -> Result<bool> {
        is_checked_exception(self.env, e)
    }

    fn attribute_members(&mut self, id: ClassId) -> Result<()> {
        let refs: Vec<MemberRef> = self.env.table[id].member_refs().collect();
        for r in refs {
            let m = self.env.member(r);
            if m.status != MemberStatus::Parsed {
                continue;
            }
            match m.kind {
                MemberKind::Field { .. } => self.check_field(r, false)?,
                MemberKind::Method { .. } | MemberKind::Constructor { .. } | MemberKind::Initializer { .. } => {
                    self.check_body(r)?
                }
                MemberKind::NestedClass(_) => {}
            }
        }
        Ok(())
    }

    /// Inner classes may declare static constants and nothing else static
    fn check_inner_statics(&mut self, id: ClassId) {
        let def = &self.env.table[id];
        if !def.is_inner() || def.is_static() || def.is_interface() {
            return;
        }
        let mut offenders = Vec::new();
        for m in &def.members {
            let allowed = m.is_synthetic()
                || match &m.kind {
                    MemberKind::Field { .. } => m.is_final() && m.constant_value().is_some(),
                    MemberKind::NestedClass(nested) => {
                        self.env.table.def(*nested).map_or(true, |d| !d.is_static() || d.is_anonymous())
                    }
                    _ => false,
                };
            if m.is_static() && !allowed {
                let what = match &m.kind {
                    MemberKind::Initializer { .. } => "static initializer".to_string(),
                    _ => m.describe(),
                };
                offenders.push((m.pos, what));
            }
        }
        let class = def.name.clone();
        for (pos, what) in offenders {
            let msg = format!("Inner class {} can't declare static member {}; only top-level classes can.", class, what);
            self.env.class_error(id, pos, msg);
        }
    }

    /// Constant value of a field, evaluating its initializer on first use.
    /// A field reached again while its own initializer is being evaluated
    /// is part of a cycle and is not a constant.
    pub(super) fn field_constant(&mut self, r: MemberRef) -> Result<Option<crate::symtab::ConstValue>> {
        resolve_class(self.env, r.class)?;
        let m = self.env.member(r);
        if let Some(value) = m.constant_value() {
            return Ok(Some(value.clone()));
        }
        let candidate = m.is_final() && m.has_field_init() && (m.ty.is_primitive() || m.ty == Type::class(JAVA_LANG_STRING));
        if !candidate || m.status != MemberStatus::Parsed {
            return Ok(None);
        }
        let def = &self.env.table[r.class];
        if !def.is_source() || def.is_local() || def.is_anonymous() {
            return Ok(None);
        }
        self.check_field(r, true)?;
        Ok(self.env.member(r).constant_value().cloned())
    }
}

pub(super) fn is_checked_exception(env: &mut BatchEnvironment, e: ClassId) -> Result<bool> {
    let runtime = env.declare(JAVA_LANG_RUNTIME_EXCEPTION);
    let error = env.declare(JAVA_LANG_ERROR);
    Ok(!resolve::is_subclass_of(env, e, runtime)? && !resolve::is_subclass_of(env, e, error)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::{Config, Target};
    use crate::wash::enter::parse_source;
    use std::path::PathBuf;

    fn checked(files: &[(&str, &str)], config: Config) -> BatchEnvironment {
        let mut env = BatchEnvironment::new(config);
        for (path, text) in files {
            parse_source(&mut env, PathBuf::from(path), text.to_string()).unwrap();
        }
        let tops: Vec<ClassId> = env
            .table
            .ids()
            .into_iter()
            .filter(|&id| env.table.def(id).map_or(false, |d| d.is_source() && d.is_top_level()))
            .collect();
        for top in tops {
            check_nest(&mut env, top).unwrap();
        }
        env
    }

    fn errors(env: &BatchEnvironment) -> Vec<String> {
        env.diags.all_texts()
    }

    #[test]
    fn concrete_class_must_implement_abstract_methods() {
        let env = checked(
            &[("A.java", "abstract class S { abstract void m(); } interface I { int n(); } class A extends S implements I {}")],
            Config::default(),
        );
        let errs = errors(&env);
        assert_eq!(errs.len(), 1, "{:?}", errs);
        assert!(errs[0].contains("Class A must be declared abstract. It does not define"), "{:?}", errs);
    }

    #[test]
    fn user_exceptions_extend_the_bootstrap_throwables() {
        let env = checked(
            &[(
                "E.java",
                "class E extends Exception {} class R extends RuntimeException {} \
                 class U { void f() throws E { throw new E(); } void g() { throw new R(); } }",
            )],
            Config::default(),
        );
        assert_eq!(errors(&env), Vec::<String>::new());
        let e = env.table.lookup("E").unwrap();
        assert!(!env.table[e].erroneous);
    }

    #[test]
    fn override_rules() {
        let env = checked(
            &[(
                "A.java",
                "class S { final void f() {} public void p() {} int r() { return 0; } static void s() {} } \
                 class A extends S { void f() {} void p() {} long r() { return 0; } void s() {} }",
            )],
            Config::default(),
        );
        let errs = errors(&env).join("\n");
        assert!(errs.contains("can't override the final method"), "{}", errs);
        assert!(errs.contains("The access modifier is made more restrictive."), "{}", errs);
        assert!(errs.contains("They must have the same return type."), "{}", errs);
        assert!(errs.contains("can't override the static method"), "{}", errs);
    }

    #[test]
    fn overriding_exceptions_must_be_covered() {
        let env = checked(
            &[(
                "A.java",
                "class E1 extends Exception {} class E2 extends Exception {} \
                 class S { void m() throws E1 {} } class A extends S { void m() throws E2, RuntimeException {} }",
            )],
            Config::default(),
        );
        let errs = errors(&env);
        assert_eq!(errs.len(), 1, "{:?}", errs);
        assert!(errs[0].contains("Invalid exception class E2 in throws clause."));
    }

    #[test]
    fn duplicate_methods_are_reported() {
        let env = checked(&[("A.java", "class A { void m(int a) {} void m(int b) {} void m() {} }")], Config::default());
        assert_eq!(errors(&env), vec!["Duplicate method declaration: m(int)".to_string()]);
    }

    #[test]
    fn miranda_methods_follow_the_target() {
        let src = [("A.java", "interface I { void run(); } abstract class A implements I {}")];
        let env = checked(&src, Config::default());
        let a = env.table.lookup("A").unwrap();
        assert_eq!(env.table[a].find_methods("run").len(), 1);

        let config = Config { target: Target::Jdk1_2, ..Config::default() };
        let env = checked(&src, config);
        let a = env.table.lookup("A").unwrap();
        assert!(env.table[a].find_methods("run").is_empty());
    }

    #[test]
    fn checking_twice_changes_nothing() {
        let mut env = checked(&[("A.java", "class A { class B { int x; } }")], Config::default());
        let b = env.table.lookup("A$B").unwrap();
        let before = env.table[b].members.len();
        let top = env.table.lookup("A").unwrap();
        check_nest(&mut env, top).unwrap();
        assert_eq!(env.table[b].members.len(), before);
        assert_eq!(env.diags.error_count(), 0);
        assert!(env.table[b].find_field("this$0").is_some());
    }

    #[test]
    fn inner_classes_keep_only_constant_statics() {
        let env = checked(
            &[("A.java", "class A { class B { static final int K = 1; static int n; static void m() {} } }")],
            Config::default(),
        );
        let errs = errors(&env);
        assert_eq!(errs.len(), 2, "{:?}", errs);
        assert!(errs.iter().all(|e| e.starts_with("Inner class A$B can't declare static member")));
    }
}
