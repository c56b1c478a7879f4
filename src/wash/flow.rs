//! Flow analysis of checked bodies
//!
//! Definite assignment of locals and blank finals, reachability of
//! statements, and checked exceptions. Runs once per class after its
//! bodies have been attributed.

use crate::ast::*;
use crate::common::env::BatchEnvironment;
use crate::common::error::Result;
use crate::parser::Where;
use crate::symtab::{ClassId, ConstValue, MemberRef, MemberStatus, Type};
use crate::wash::check::is_checked_exception;
use crate::wash::resolve;
use std::collections::BTreeSet;

/// Bit set over variable numbers: blank finals first, then the locals
/// of the body being analyzed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct VSet(Vec<u64>);

impl VSet {
    fn full(n: usize) -> Self {
        Self(vec![u64::MAX; (n + 63) / 64])
    }

    fn contains(&self, i: usize) -> bool {
        self.0.get(i / 64).map_or(false, |w| w & (1 << (i % 64)) != 0)
    }

    fn insert(&mut self, i: usize) {
        if self.0.len() <= i / 64 {
            self.0.resize(i / 64 + 1, 0);
        }
        self.0[i / 64] |= 1 << (i % 64);
    }

    fn remove(&mut self, i: usize) {
        if let Some(w) = self.0.get_mut(i / 64) {
            *w &= !(1 << (i % 64));
        }
    }

    fn intersect(&mut self, other: &VSet) {
        for (i, w) in self.0.iter_mut().enumerate() {
            *w &= other.0.get(i).copied().unwrap_or(0);
        }
    }

    fn union(&mut self, other: &VSet) {
        if self.0.len() < other.0.len() {
            self.0.resize(other.0.len(), 0);
        }
        for (w, o) in self.0.iter_mut().zip(&other.0) {
            *w |= o;
        }
    }
}

/// Definitely assigned and possibly assigned variables at a point
#[derive(Debug, Clone)]
struct Vars {
    da: VSet,
    pa: VSet,
    alive: bool,
}

fn merge(a: Vars, b: Vars) -> Vars {
    match (a.alive, b.alive) {
        (false, _) => b,
        (_, false) => a,
        _ => {
            let (mut da, mut pa) = (a.da, a.pa);
            da.intersect(&b.da);
            pa.union(&b.pa);
            Vars { da, pa, alive: true }
        }
    }
}

fn merge_into(slot: &mut Option<Vars>, vars: Vars) {
    *slot = Some(match slot.take() {
        Some(prev) => merge(prev, vars),
        None => vars,
    });
}

fn is_true(e: &Expr) -> bool {
    e.ty == Type::Boolean && matches!(e.const_value(), Some(ConstValue::Int(v)) if *v != 0)
}

fn attributed(env: &BatchEnvironment, r: MemberRef) -> bool {
    let m = env.member(r);
    !m.is_synthetic() && matches!(m.status, MemberStatus::Checked | MemberStatus::Inlined)
}

#[derive(Clone, Copy)]
enum Context {
    Body(MemberRef),
    StaticInit,
    InstanceInit,
}

#[derive(Default)]
struct Jumps {
    breaks: Option<Vars>,
    continues: Option<Vars>,
}

struct Catcher {
    class: Option<ClassId>,
    used: bool,
}

struct Flow<'a> {
    env: &'a mut BatchEnvironment,
    class: ClassId,
    blank: Vec<MemberRef>,
    locals: Vec<LocalVar>,
    vars: Vars,
    context: Context,
    is_ctor: bool,
    jumps: Vec<Jumps>,
    catchers: Vec<Vec<Catcher>>,
    /// Variables assigned anywhere inside each enclosing `try` body
    assigned: Vec<VSet>,
    scopes: Vec<Vec<(String, LocalId)>>,
    /// Speculative passes over loop bodies report nothing
    quiet: usize,
    unassigned_reported: BTreeSet<usize>,
    /// An unreachable statement was reported in the current body
    unreached: bool,
}

pub fn check_class(env: &mut BatchEnvironment, id: ClassId) -> Result<()> {
    let refs: Vec<MemberRef> = env.table[id].member_refs().collect();
    let blank: Vec<MemberRef> = refs
        .iter()
        .copied()
        .filter(|&r| {
            let m = env.member(r);
            m.is_field() && m.is_blank_final()
        })
        .collect();
    log::debug!("flow: {} ({} blank finals)", env.class_name(id), blank.len());
    let mut flow = Flow {
        env,
        class: id,
        blank,
        locals: Vec::new(),
        vars: Vars { da: VSet::default(), pa: VSet::default(), alive: true },
        context: Context::StaticInit,
        is_ctor: false,
        jumps: Vec::new(),
        catchers: Vec::new(),
        assigned: Vec::new(),
        scopes: Vec::new(),
        quiet: 0,
        unassigned_reported: BTreeSet::new(),
        unreached: false,
    };
    flow.check_members(&refs)
}

impl Flow<'_> {
    fn error(&mut self, pos: Where, msg: impl Into<String>) {
        if self.quiet == 0 {
            self.env.class_error(self.class, pos, msg);
        }
    }

    fn universe(&self) -> usize {
        self.blank.len() + self.locals.len()
    }

    fn dead(&self) -> Vars {
        Vars { da: VSet::full(self.universe()), pa: VSet::default(), alive: false }
    }

    /// State after a branch that can't be taken: everything is assigned
    fn vacuous(&self) -> Vars {
        Vars { da: VSet::full(self.universe()), pa: self.vars.pa.clone(), alive: self.vars.alive }
    }

    /// Entry state where only blank finals of the other kind are assigned
    fn entry(&self, is_static: Option<bool>) -> Vars {
        let mut da = VSet::default();
        for (k, &r) in self.blank.iter().enumerate() {
            if is_static != Some(self.env.member(r).is_static()) {
                da.insert(k);
            }
        }
        Vars { da, pa: VSet::default(), alive: true }
    }

    fn check_members(&mut self, refs: &[MemberRef]) -> Result<()> {
        for is_static in [true, false] {
            self.vars = self.entry(Some(is_static));
            self.context = if is_static { Context::StaticInit } else { Context::InstanceInit };
            for &r in refs {
                let m = self.env.member(r);
                if !attributed(self.env, r) || m.is_static() != is_static {
                    continue;
                }
                if m.is_field() {
                    self.check_field_init(r)?;
                } else if m.is_initializer() {
                    self.check_body(r)?;
                }
            }
            if is_static {
                self.check_blank_finals(true);
            } else {
                let initialized = self.vars.clone();
                for &r in refs {
                    if !attributed(self.env, r) || !self.env.member(r).is_constructor() {
                        continue;
                    }
                    self.vars = initialized.clone();
                    self.context = Context::Body(r);
                    self.is_ctor = true;
                    self.check_body(r)?;
                    self.is_ctor = false;
                }
            }
        }

        for &r in refs {
            let m = self.env.member(r);
            if attributed(self.env, r) && m.is_method() {
                self.vars = self.entry(None);
                self.context = Context::Body(r);
                self.check_body(r)?;
            }
        }
        Ok(())
    }

    fn check_field_init(&mut self, r: MemberRef) -> Result<()> {
        let Some(init) = self.env.member_mut(r).take_field_init() else { return Ok(()) };
        self.locals.clear();
        let result = self.expr(&init);
        self.env.member_mut(r).put_field_init(init);
        result
    }

    fn check_body(&mut self, r: MemberRef) -> Result<()> {
        let Some(body) = self.env.member_mut(r).take_body() else { return Ok(()) };
        let m = self.env.member(r);
        self.locals = m.locals.clone();
        let params = usize::from(m.outer_this_arg) + m.params().len();
        let ret = m.method_type.ret.clone();
        let is_method = m.is_method();

        self.unreached = false;
        self.scopes.push(Vec::new());
        for i in 0..params.min(self.locals.len()) {
            let k = self.blank.len() + i;
            self.vars.da.insert(k);
            self.vars.pa.insert(k);
            let name = self.locals[i].name.clone();
            self.declare(name, LocalId(i as u32));
        }
        let result = self.block(&body);
        self.scopes.pop();
        if result.is_ok() && self.vars.alive {
            if self.is_ctor {
                self.check_blank_finals(false);
            }
            if is_method && !ret.is_void() && !self.unreached {
                let what = format!("{} {}", ret, self.env.member(r).describe());
                self.error(body.end, format!("Return required at end of {}.", what));
            }
        }
        self.env.member_mut(r).put_body(body);
        result
    }

    fn check_blank_finals(&mut self, is_static: bool) {
        if !self.vars.alive || self.quiet > 0 {
            return;
        }
        for k in 0..self.blank.len() {
            let r = self.blank[k];
            let m = self.env.member(r);
            if m.is_static() != is_static || self.vars.da.contains(k) || !self.unassigned_reported.insert(k) {
                continue;
            }
            let msg = format!(
                "Blank final variable '{}' may not have been initialized. It must be assigned a value in an initializer, or in every constructor.",
                m.name
            );
            let pos = m.pos;
            self.env.class_error(self.class, pos, msg);
        }
    }

    // Scopes

    fn declare(&mut self, name: String, id: LocalId) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push((name, id));
        }
    }

    fn find(&self, name: &str) -> Option<LocalId> {
        self.scopes.iter().rev().flat_map(|s| s.iter().rev()).find(|(n, _)| n == name).map(|(_, id)| *id)
    }

    fn local_name(&self, id: LocalId) -> String {
        self.locals.get(id.0 as usize).map(|v| v.name.clone()).unwrap_or_default()
    }

    // Variables

    fn read(&mut self, k: usize, name: &str, pos: Where) {
        if self.vars.alive && !self.vars.da.contains(k) {
            self.error(pos, format!("Variable {} may not have been initialized.", name));
            self.vars.da.insert(k);
        }
    }

    fn assign(&mut self, k: usize, is_final: bool, what: &str, name: &str, pos: Where) {
        if is_final && self.vars.alive && self.vars.pa.contains(k) {
            self.error(pos, format!("Can't assign a second value to a {}: {}", what, name));
        }
        self.vars.da.insert(k);
        self.vars.pa.insert(k);
        for set in &mut self.assigned {
            set.insert(k);
        }
    }

    fn read_local(&mut self, id: LocalId, pos: Where) {
        let name = self.local_name(id);
        self.read(self.blank.len() + id.0 as usize, &name, pos);
    }

    fn assign_local(&mut self, id: LocalId, pos: Where) {
        let is_final = self.locals.get(id.0 as usize).map_or(false, |v| v.is_final);
        let name = self.local_name(id);
        self.assign(self.blank.len() + id.0 as usize, is_final, "final variable", &name, pos);
    }

    /// Number of a blank final accessed through its simple name or `this`
    fn tracked(&self, target: &Option<Box<Expr>>, field: MemberRef) -> Option<usize> {
        let own = target.as_ref().map_or(true, |t| matches!(t.kind, ExprKind::This));
        if !own {
            return None;
        }
        self.blank.iter().position(|&b| b == field)
    }

    // Exceptions

    fn throw(&mut self, e: ClassId, pos: Where) -> Result<()> {
        for frame in self.catchers.iter_mut().rev() {
            let mut caught = false;
            for c in frame.iter_mut() {
                let Some(class) = c.class else { continue };
                if resolve::is_subclass_of(self.env, e, class)? {
                    c.used = true;
                    caught = true;
                    break;
                }
                if resolve::is_subclass_of(self.env, class, e)? {
                    c.used = true;
                }
            }
            if caught {
                return Ok(());
            }
        }
        if !is_checked_exception(self.env, e)? {
            return Ok(());
        }
        let name = self.env.class_name(e).to_string();
        match self.context {
            Context::Body(member) => {
                let declared = self.env.member(member).exceptions.clone();
                if !self.covered(e, &declared)? {
                    let msg = format!(
                        "Exception {} must be caught, or it must be declared in the throws clause of this method.",
                        name
                    );
                    self.error(pos, msg);
                }
            }
            Context::StaticInit => self.error(pos, format!("Exception {} can't be thrown in initializer.", name)),
            Context::InstanceInit => {
                let ctors = self.env.table[self.class].constructors();
                if self.env.table[self.class].is_anonymous() {
                    for ctor in ctors {
                        let declared = self.env.member(ctor).exceptions.clone();
                        if self.quiet == 0 && !self.covered(e, &declared)? {
                            self.env.member_mut(ctor).exceptions.push(e);
                        }
                    }
                    return Ok(());
                }
                let mut all = !ctors.is_empty();
                for ctor in ctors {
                    let declared = self.env.member(ctor).exceptions.clone();
                    all &= self.covered(e, &declared)?;
                }
                if !all {
                    self.error(pos, format!("Exception {} can't be thrown in initializer.", name));
                }
            }
        }
        Ok(())
    }

    fn covered(&mut self, e: ClassId, declared: &[ClassId]) -> Result<bool> {
        for &d in declared {
            if resolve::is_subclass_of(self.env, e, d)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// A catch clause whose class no statement of the `try` body can throw
    fn report_unused_catch(&mut self, class: ClassId, pos: Where) -> Result<()> {
        if !is_checked_exception(self.env, class)? {
            return Ok(());
        }
        let runtime = self.env.declare(crate::common::consts::JAVA_LANG_RUNTIME_EXCEPTION);
        let error = self.env.declare(crate::common::consts::JAVA_LANG_ERROR);
        if resolve::is_subclass_of(self.env, runtime, class)? || resolve::is_subclass_of(self.env, error, class)? {
            return Ok(());
        }
        let msg = format!(
            "Exception {} is never thrown in the body of the corresponding try statement.",
            self.env.class_name(class)
        );
        self.error(pos, msg);
        Ok(())
    }

    // Statements

    fn block(&mut self, block: &Block) -> Result<()> {
        self.scopes.push(Vec::new());
        let mut reported = false;
        for stmt in &block.stmts {
            if !self.vars.alive {
                if !reported {
                    self.error(stmt.pos, "Statement not reached.");
                    reported = true;
                    self.unreached |= self.quiet == 0;
                }
                self.vars = Vars { alive: true, ..self.vacuous() };
            }
            self.stmt(stmt)?;
        }
        self.scopes.pop();
        Ok(())
    }

    fn scoped(&mut self, stmt: &Stmt) -> Result<()> {
        self.scopes.push(Vec::new());
        let result = self.stmt(stmt);
        self.scopes.pop();
        result
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match &stmt.kind {
            StmtKind::Block(block) => self.block(block)?,
            StmtKind::LocalVar { vars, .. } => {
                for var in vars {
                    let Some(id) = var.local else { continue };
                    let k = self.blank.len() + id.0 as usize;
                    self.vars.da.remove(k);
                    self.vars.pa.remove(k);
                    if let Some(init) = &var.init {
                        self.expr(init)?;
                        self.assign_local(id, var.pos);
                    }
                    self.declare(var.name.clone(), id);
                }
            }
            StmtKind::LocalClass(_) | StmtKind::Empty => {}
            StmtKind::Expr(e) => self.expr(e)?,
            StmtKind::If { cond, then, otherwise } => {
                let (t, f) = self.cond(cond)?;
                self.vars = t;
                self.scoped(then)?;
                let after_then = std::mem::replace(&mut self.vars, f);
                if let Some(otherwise) = otherwise {
                    self.scoped(otherwise)?;
                }
                let after_else = self.vars.clone();
                self.vars = merge(after_then, after_else);
            }
            StmtKind::While { cond, body } => self.loop_stmt(Some(cond), body, &[])?,
            StmtKind::For { init, cond, update, body } => {
                self.scopes.push(Vec::new());
                for s in init {
                    self.stmt(s)?;
                }
                let result = self.loop_stmt(cond.as_ref(), body, update);
                self.scopes.pop();
                result?;
            }
            StmtKind::Break => {
                let dead = self.dead();
                let vars = std::mem::replace(&mut self.vars, dead);
                if let Some(j) = self.jumps.last_mut() {
                    merge_into(&mut j.breaks, vars);
                }
            }
            StmtKind::Continue => {
                let dead = self.dead();
                let vars = std::mem::replace(&mut self.vars, dead);
                if let Some(j) = self.jumps.last_mut() {
                    merge_into(&mut j.continues, vars);
                }
            }
            StmtKind::Return(value) => {
                if let Some(v) = value {
                    self.expr(v)?;
                }
                if self.is_ctor {
                    self.check_blank_finals(false);
                }
                self.vars = self.dead();
            }
            StmtKind::Throw(e) => {
                self.expr(e)?;
                if let Some(c) = resolve::class_of(self.env, &e.ty)? {
                    self.throw(c, e.pos)?;
                }
                self.vars = self.dead();
            }
            StmtKind::Try { body, catches } => self.try_stmt(body, catches)?,
        }
        Ok(())
    }

    fn loop_pass(&mut self, cond: Option<&Expr>, body: &Stmt, update: &[Expr]) -> Result<(Vars, Vars)> {
        let (t, f) = match cond {
            Some(c) if !is_true(c) => self.cond(c)?,
            Some(c) => {
                self.cond(c)?;
                (self.vars.clone(), self.dead())
            }
            None => (self.vars.clone(), self.dead()),
        };
        self.vars = t;
        self.jumps.push(Jumps::default());
        let result = self.scoped(body);
        let jumps = self.jumps.pop().unwrap_or_default();
        result?;
        let mut back = Some(self.vars.clone());
        if let Some(c) = jumps.continues {
            merge_into(&mut back, c);
        }
        if let Some(back) = back {
            self.vars = back;
        }
        for u in update {
            self.expr(u)?;
        }
        let back = self.vars.clone();
        let mut exit = Some(f);
        if let Some(b) = jumps.breaks {
            merge_into(&mut exit, b);
        }
        Ok((exit.unwrap_or_else(|| self.dead()), back))
    }

    fn loop_stmt(&mut self, cond: Option<&Expr>, body: &Stmt, update: &[Expr]) -> Result<()> {
        let entry = self.vars.clone();
        self.quiet += 1;
        let speculative = self.loop_pass(cond, body, update);
        self.quiet -= 1;
        let (_, back) = speculative?;
        self.vars = entry;
        if back.alive {
            self.vars.pa.union(&back.pa);
        }
        let (exit, _) = self.loop_pass(cond, body, update)?;
        self.vars = exit;
        Ok(())
    }

    fn try_stmt(&mut self, body: &Block, catches: &[Catch]) -> Result<()> {
        let before = self.vars.clone();
        self.catchers.push(catches.iter().map(|c| Catcher { class: c.class, used: false }).collect());
        self.assigned.push(VSet::default());
        let result = self.block(body);
        let catchers = self.catchers.pop().unwrap_or_default();
        let assigned = self.assigned.pop().unwrap_or_default();
        result?;

        let mut out = self.vars.clone();
        for (c, catcher) in catches.iter().zip(catchers) {
            if let (Some(class), false) = (catcher.class, catcher.used) {
                self.report_unused_catch(class, c.pos)?;
            }
            let mut pa = before.pa.clone();
            pa.union(&assigned);
            self.vars = Vars { da: before.da.clone(), pa, alive: before.alive };
            self.scopes.push(Vec::new());
            if let Some(id) = c.local {
                self.assign_local(id, c.pos);
                self.declare(c.name.clone(), id);
            }
            let result = self.block(&c.body);
            self.scopes.pop();
            result?;
            out = merge(out, self.vars.clone());
        }
        self.vars = out;
        Ok(())
    }

    // Expressions

    /// States after `e` when it yields true and when it yields false
    fn cond(&mut self, e: &Expr) -> Result<(Vars, Vars)> {
        match &e.kind {
            ExprKind::Const(ConstValue::Int(v)) if e.ty == Type::Boolean => {
                let vacuous = self.vacuous();
                Ok(if *v != 0 { (self.vars.clone(), vacuous) } else { (vacuous, self.vars.clone()) })
            }
            ExprKind::Binary { op: BinaryOp::And, lhs, rhs } => {
                let (t, f) = self.cond(lhs)?;
                self.vars = t;
                let (t2, f2) = self.cond(rhs)?;
                Ok((t2, merge(f, f2)))
            }
            ExprKind::Binary { op: BinaryOp::Or, lhs, rhs } => {
                let (t, f) = self.cond(lhs)?;
                self.vars = f;
                let (t2, f2) = self.cond(rhs)?;
                Ok((merge(t, t2), f2))
            }
            ExprKind::Unary { op: UnaryOp::Not, operand } => {
                let (t, f) = self.cond(operand)?;
                Ok((f, t))
            }
            _ => {
                self.expr(e)?;
                Ok((self.vars.clone(), self.vars.clone()))
            }
        }
    }

    fn exprs(&mut self, es: &[Expr]) -> Result<()> {
        for e in es {
            self.expr(e)?;
        }
        Ok(())
    }

    fn throws_of(&mut self, r: MemberRef, pos: Where) -> Result<()> {
        for e in self.env.member(r).exceptions.clone() {
            self.throw(e, pos)?;
        }
        Ok(())
    }

    fn expr(&mut self, e: &Expr) -> Result<()> {
        match &e.kind {
            ExprKind::Local(id) => self.read_local(*id, e.pos),
            ExprKind::Field { target, field } => {
                if let Some(t) = target {
                    self.expr(t)?;
                }
                if let Some(k) = self.tracked(target, *field) {
                    let name = self.env.member(*field).name.clone();
                    self.read(k, &name, e.pos);
                }
            }
            ExprKind::Assign { op, lhs, rhs } => match &lhs.kind {
                ExprKind::Local(id) => {
                    if op.is_some() {
                        self.read_local(*id, lhs.pos);
                    }
                    self.expr(rhs)?;
                    self.assign_local(*id, e.pos);
                }
                ExprKind::Field { target, field } => {
                    if let Some(t) = target {
                        self.expr(t)?;
                    }
                    let tracked = self.tracked(target, *field);
                    let name = self.env.member(*field).name.clone();
                    if let (Some(k), true) = (tracked, op.is_some()) {
                        self.read(k, &name, lhs.pos);
                    }
                    self.expr(rhs)?;
                    if let Some(k) = tracked {
                        self.assign(k, true, "blank final variable", &name, e.pos);
                    }
                }
                _ => {
                    self.expr(lhs)?;
                    self.expr(rhs)?;
                }
            },
            ExprKind::IncDec { operand, .. } => match &operand.kind {
                ExprKind::Local(id) => {
                    self.read_local(*id, operand.pos);
                    self.assign_local(*id, e.pos);
                }
                _ => self.expr(operand)?,
            },
            ExprKind::Binary { op: BinaryOp::And | BinaryOp::Or, .. } | ExprKind::Unary { op: UnaryOp::Not, .. } => {
                let (t, f) = self.cond(e)?;
                self.vars = merge(t, f);
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.expr(lhs)?;
                self.expr(rhs)?;
            }
            ExprKind::Unary { operand, .. } => self.expr(operand)?,
            ExprKind::Conditional { cond, then, otherwise } => {
                let (t, f) = self.cond(cond)?;
                self.vars = t;
                self.expr(then)?;
                let after_then = std::mem::replace(&mut self.vars, f);
                self.expr(otherwise)?;
                let after_else = self.vars.clone();
                self.vars = merge(after_then, after_else);
            }
            ExprKind::Invoke { target, method, args, .. } => {
                if let Some(t) = target {
                    self.expr(t)?;
                }
                self.exprs(args)?;
                self.throws_of(*method, e.pos)?;
            }
            ExprKind::NewInstance { class, ctor, outer, args, .. } => {
                if let Some(o) = outer {
                    self.expr(o)?;
                }
                self.exprs(args)?;
                let captured: Vec<String> = self.env.table[*class].captured.iter().map(|c| c.name.clone()).collect();
                for name in captured {
                    if let Some(id) = self.find(&name) {
                        self.read_local(id, e.pos);
                    }
                }
                self.throws_of(*ctor, e.pos)?;
            }
            ExprKind::Init { ctor, is_super, outer, args, .. } => {
                if let Some(o) = outer {
                    self.expr(o)?;
                }
                self.exprs(args)?;
                self.throws_of(*ctor, e.pos)?;
                if !is_super {
                    for k in 0..self.blank.len() {
                        self.vars.da.insert(k);
                        self.vars.pa.insert(k);
                    }
                }
            }
            ExprKind::Convert(inner) | ExprKind::ArrayLength(inner) => self.expr(inner)?,
            ExprKind::Checkcast { expr, .. } | ExprKind::InstanceTest { expr, .. } => self.expr(expr)?,
            ExprKind::NewArrayOf { len } => self.expr(len)?,
            ExprKind::ArrayElem { array, index } => {
                self.expr(array)?;
                self.expr(index)?;
            }
            ExprKind::Concat(parts) => self.exprs(parts)?,
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::common::config::Config;
    use crate::common::env::BatchEnvironment;
    use crate::symtab::ClassId;
    use crate::wash::check::check_nest;
    use crate::wash::enter::parse_source;
    use std::path::PathBuf;

    fn errors(text: &str) -> Vec<String> {
        let mut env = BatchEnvironment::new(Config::default());
        parse_source(&mut env, PathBuf::from("A.java"), text.to_string()).unwrap();
        let tops: Vec<ClassId> = env
            .table
            .ids()
            .into_iter()
            .filter(|&id| env.table.def(id).map_or(false, |d| d.is_source() && d.is_top_level()))
            .collect();
        for top in tops {
            check_nest(&mut env, top).unwrap();
        }
        env.diags.all_texts()
    }

    #[test]
    fn definite_assignment_of_locals() {
        let errs = errors(
            "class A { int m(boolean b) { int x; int y; if (b) { x = 1; } else { x = 2; } \
             if (b && (y = 3) > 0) { return x + y; } return y; } }",
        );
        assert_eq!(errs, vec!["Variable y may not have been initialized.".to_string()]);
    }

    #[test]
    fn unreachable_code_and_missing_return() {
        let errs = errors(
            "class A { int f() { return 1; int x = 2; } int g(boolean b) { if (b) return 1; } void h() { while (true) {} } }",
        );
        assert_eq!(errs.len(), 2, "{:?}", errs);
        assert!(errs.contains(&"Statement not reached.".to_string()), "{:?}", errs);
        assert!(errs.contains(&"Return required at end of int g(boolean).".to_string()), "{:?}", errs);
    }

    #[test]
    fn blank_finals_must_be_assigned_once() {
        let errs = errors(
            "class A { final int a; final int b; static final int S; \
             A() { a = 1; b = 2; b = 3; } A(int x) { this(); } A(boolean z) { a = 1; } }",
        );
        let joined = errs.join("\n");
        assert!(joined.contains("Can't assign a second value to a blank final variable: b"), "{}", joined);
        assert!(joined.contains("Blank final variable 'S' may not have been initialized."), "{}", joined);
        assert!(joined.contains("Blank final variable 'b' may not have been initialized."), "{}", joined);
        assert_eq!(errs.len(), 3, "{}", joined);
    }

    #[test]
    fn checked_exceptions_must_be_handled() {
        let errs = errors(
            "class E extends Exception {} \
             class A { void t() throws E { throw new E(); } \
               void ok() { try { t(); } catch (E e) {} } \
               void bad() { t(); } \
               void never() { try { int x = 1; } catch (E e) {} catch (RuntimeException r) {} } }",
        );
        let joined = errs.join("\n");
        assert!(joined.contains("Exception E must be caught, or it must be declared in the throws clause of this method."), "{}", joined);
        assert!(joined.contains("Exception E is never thrown in the body of the corresponding try statement."), "{}", joined);
        assert_eq!(errs.len(), 2, "{}", joined);
    }

    #[test]
    fn initializer_exceptions() {
        let errs = errors(
            "class E extends Exception {} \
             class A { static void t() throws E {} static { t(); } } \
             class B { { A.t(); } B() throws E {} } \
             class C { void m() throws E { Object o = new Object() { { A.t(); } }; } }",
        );
        assert_eq!(errs, vec!["Exception E can't be thrown in initializer.".to_string()]);
    }

    #[test]
    fn loops_track_final_assignment() {
        let errs = errors("class A { void m() { final int x; for (int i = 0; i < 2; i++) { x = i; } } }");
        assert_eq!(errs, vec!["Can't assign a second value to a final variable: x".to_string()]);
    }
}
