//! Attribution of member bodies
//!
//! Rewrites the source forms of a body in place into resolved forms:
//! names become locals, fields or captured copies; calls and allocations
//! are bound to a member (through an access bridge where the member is
//! private to another class of the nest); operands get explicit
//! conversions; constant expressions are folded.

use crate::ast::*;
use crate::common::classloader;
use crate::common::consts::*;
use crate::common::error::{Error, Result};
use crate::common::rt;
use crate::parser::Where;
use crate::symtab::{AccessKind, ClassId, ConstValue, MemberRef, MemberStatus, Type};
use crate::wash::check::Checker;
use crate::wash::lower;
use crate::wash::resolve::{self, resolve_class};
use std::collections::BTreeSet;

struct Scope {
    vars: Vec<(String, LocalId)>,
    types_mark: usize,
    slot_mark: u16,
}

/// Attribution state of one body
pub(crate) struct Frame {
    pub class: ClassId,
    pub member: MemberRef,
    pub is_static: bool,
    pub is_ctor: bool,
    /// Evaluation of a constant reached from another body; the locals of
    /// the frames below are out of reach
    pub barrier: bool,
    scopes: Vec<Scope>,
    pub locals: Vec<LocalVar>,
    next_slot: u16,
    max_slot: u16,
    loop_depth: usize,
    ctor_call_allowed: bool,
    in_prologue: bool,
}

impl Frame {
    fn new(class: ClassId, member: MemberRef, is_static: bool, is_ctor: bool, barrier: bool, types_mark: usize) -> Self {
        let first = u16::from(!is_static);
        Self {
            class,
            member,
            is_static,
            is_ctor,
            barrier,
            scopes: vec![Scope { vars: Vec::new(), types_mark, slot_mark: first }],
            locals: Vec::new(),
            next_slot: first,
            max_slot: first,
            loop_depth: 0,
            ctor_call_allowed: false,
            in_prologue: false,
        }
    }

    fn find(&self, name: &str) -> Option<LocalId> {
        self.scopes.iter().rev().flat_map(|s| s.vars.iter().rev()).find(|(n, _)| n == name).map(|(_, id)| *id)
    }

    fn declare(&mut self, name: String, ty: Type, pos: Where, is_final: bool, synthetic: bool) -> LocalId {
        let id = LocalId(self.locals.len() as u32);
        let width = ty.width().max(1);
        self.locals.push(LocalVar {
            name: name.clone(),
            ty,
            slot: self.next_slot,
            pos,
            is_final,
            number: id.0 as usize,
            synthetic,
        });
        self.next_slot += width;
        self.max_slot = self.max_slot.max(self.next_slot);
        if let Some(scope) = self.scopes.last_mut() {
            scope.vars.push((name, id));
        }
        id
    }

    fn push_scope(&mut self, types_mark: usize) {
        self.scopes.push(Scope { vars: Vec::new(), types_mark, slot_mark: self.next_slot });
    }

    fn pop_scope(&mut self) -> Option<usize> {
        let scope = self.scopes.pop()?;
        self.next_slot = scope.slot_mark;
        Some(scope.types_mark)
    }

    fn local(&self, id: LocalId) -> Option<&LocalVar> {
        self.locals.get(id.0 as usize)
    }
}

enum Selection {
    Found(MemberRef),
    NoneApplicable,
    Ambiguous(MemberRef, MemberRef),
}

fn type_list(types: &[Type]) -> String {
    types.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
}

fn has_error(types: &[Type]) -> bool {
    types.iter().any(Type::is_error)
}

fn literal(lit: Literal) -> (ExprKind, Type) {
    match lit {
        Literal::Int(v) => (ExprKind::Const(ConstValue::Int(v)), Type::Int),
        Literal::Long(v) => (ExprKind::Const(ConstValue::Long(v)), Type::Long),
        Literal::Float(v) => (ExprKind::Const(ConstValue::float(v)), Type::Float),
        Literal::Double(v) => (ExprKind::Const(ConstValue::double(v)), Type::Double),
        Literal::Char(c) => (ExprKind::Const(ConstValue::Int(c as i32)), Type::Char),
        Literal::Str(s) => (ExprKind::Const(ConstValue::Str(s)), Type::class(JAVA_LANG_STRING)),
        Literal::Bool(b) => (ExprKind::Const(ConstValue::Int(b as i32)), Type::Boolean),
        Literal::Null => (ExprKind::Literal(Literal::Null), Type::Null),
    }
}

impl Checker<'_> {
    fn frame(&self) -> Result<&Frame> {
        self.frames.last().ok_or_else(|| Error::internal("attribution outside a body"))
    }

    fn frame_mut(&mut self) -> Result<&mut Frame> {
        self.frames.last_mut().ok_or_else(|| Error::internal("attribution outside a body"))
    }

    fn ctx(&self) -> Result<ClassId> {
        Ok(self.frame()?.class)
    }

    fn error(&mut self, pos: Where, msg: impl Into<String>) {
        if let Some(class) = self.frames.last().map(|f| f.class) {
            self.env.class_error(class, pos, msg);
        }
    }

    fn note_deprecated(&mut self, r: MemberRef, pos: Where) -> Result<()> {
        let ctx = self.ctx()?;
        let m = self.env.member(r);
        if m.is_deprecated() && self.env.outermost(r.class) != self.env.outermost(ctx) {
            let what = if m.is_field() {
                format!("The variable {} in class {}", m.name, self.env.class_name(r.class))
            } else {
                format!("The method {} in class {}", m.describe(), self.env.class_name(r.class))
            };
            self.env.deprecation(ctx, pos, &what);
        }
        Ok(())
    }

    // Members

    /// Attribute a field initializer, recording its constant value
    pub(super) fn check_field(&mut self, r: MemberRef, barrier: bool) -> Result<()> {
        let m = self.env.member(r);
        if m.status != MemberStatus::Parsed {
            return Ok(());
        }
        let ty = m.ty.clone();
        let is_static = m.is_static();
        let inlinable = m.is_final() && (ty.is_primitive() || ty.is_string());
        self.env.member_mut(r).status = if inlinable { MemberStatus::Inlining } else { MemberStatus::Checking };
        let Some(mut init) = self.env.member_mut(r).take_field_init() else {
            self.env.member_mut(r).status = MemberStatus::Checked;
            return Ok(());
        };

        let types_mark = self.env.local_types.len();
        self.frames.push(Frame::new(r.class, r, is_static, false, barrier, types_mark));
        let result = self.check_value(&mut init, &ty, "declaration");
        self.frames.pop();
        result?;

        let value = init.const_value().filter(|_| inlinable).cloned();
        let m = self.env.member_mut(r);
        m.put_field_init(init);
        match value {
            Some(v) => {
                if let crate::symtab::MemberKind::Field { value, .. } = &mut m.kind {
                    *value = Some(v);
                }
                m.status = MemberStatus::Inlined;
            }
            None => m.status = MemberStatus::Checked,
        }
        Ok(())
    }

    /// Attribute the body of a method, constructor or initializer
    pub(super) fn check_body(&mut self, r: MemberRef) -> Result<()> {
        let m = self.env.member(r);
        if m.status != MemberStatus::Parsed {
            return Ok(());
        }
        let is_static = m.is_static();
        let is_ctor = m.is_constructor();
        let params = m.params().to_vec();
        let outer_ty = if m.outer_this_arg { m.method_type.args.first().cloned() } else { None };
        self.env.member_mut(r).status = MemberStatus::Checking;
        let Some(mut body) = self.env.member_mut(r).take_body() else {
            self.env.member_mut(r).status = MemberStatus::Checked;
            return Ok(());
        };

        let mut frame = Frame::new(r.class, r, is_static, is_ctor, false, self.env.local_types.len());
        if let Some(ty) = outer_ty {
            frame.declare(PREFIX_THIS.to_string(), ty, Where::NOWHERE, true, true);
        }
        let mut duplicates = Vec::new();
        for p in &params {
            if frame.find(&p.name).is_some() {
                duplicates.push(p.clone());
            }
            frame.declare(p.name.clone(), p.ty.clone(), p.pos, p.is_final, false);
        }
        self.frames.push(frame);
        for p in duplicates {
            self.error(p.pos, format!("Variable {} is already defined in this method.", p.name));
        }

        let result = self.check_member_block(&mut body, is_ctor);
        let frame = self.frames.pop();
        result?;
        let frame = frame.ok_or_else(|| Error::internal("frame stack underflow"))?;
        let m = self.env.member_mut(r);
        m.put_body(body);
        m.locals = frame.locals;
        m.max_locals = frame.max_slot;
        m.status = MemberStatus::Checked;
        Ok(())
    }

    fn check_member_block(&mut self, body: &mut Block, is_ctor: bool) -> Result<()> {
        if is_ctor {
            let class = self.ctx()?;
            let explicit = matches!(
                body.stmts.first(),
                Some(Stmt { kind: StmtKind::Expr(Expr { kind: ExprKind::CtorCall { .. }, .. }), .. })
            );
            let has_super = self.env.table[class].super_class.is_some();
            if !explicit && has_super {
                let call = Expr::new(ExprKind::CtorCall { is_super: true, args: Vec::new() }, body.pos);
                body.stmts.insert(0, Stmt::new(StmtKind::Expr(call), body.pos));
            }
            self.frame_mut()?.ctor_call_allowed = explicit || has_super;
        }
        self.check_block(body)
    }

    // Statements

    fn push_scope(&mut self) -> Result<()> {
        let mark = self.env.local_types.len();
        self.frame_mut()?.push_scope(mark);
        Ok(())
    }

    fn pop_scope(&mut self) -> Result<()> {
        if let Some(mark) = self.frame_mut()?.pop_scope() {
            self.env.local_types.truncate(mark);
        }
        Ok(())
    }

    fn check_block(&mut self, block: &mut Block) -> Result<()> {
        self.push_scope()?;
        for stmt in &mut block.stmts {
            self.check_stmt(stmt)?;
        }
        self.pop_scope()
    }

    fn check_scoped(&mut self, stmt: &mut Stmt) -> Result<()> {
        self.push_scope()?;
        self.check_stmt(stmt)?;
        self.pop_scope()
    }

    fn check_loop_body(&mut self, body: &mut Stmt) -> Result<()> {
        self.frame_mut()?.loop_depth += 1;
        let result = self.check_scoped(body);
        self.frame_mut()?.loop_depth -= 1;
        result
    }

    fn check_stmt(&mut self, stmt: &mut Stmt) -> Result<()> {
        let pos = stmt.pos;
        match &mut stmt.kind {
            StmtKind::Block(block) => self.check_block(block)?,
            StmtKind::LocalVar { modifiers, type_expr, vars } => {
                let ctx = self.ctx()?;
                let base = resolve::resolve_type_expr(self.env, ctx, type_expr)?;
                let is_final = *modifiers & M_FINAL != 0;
                for var in vars {
                    let ty = (0..var.dims).fold(base.clone(), |t, _| Type::array_of(t));
                    if ty.is_void() {
                        self.error(var.pos, format!("Invalid type void for variable {}.", var.name));
                    }
                    if self.frame()?.find(&var.name).is_some() {
                        self.error(var.pos, format!("Variable {} is already defined in this method.", var.name));
                    }
                    let id = self.frame_mut()?.declare(var.name.clone(), ty.clone(), var.pos, is_final, false);
                    var.local = Some(id);
                    if let Some(init) = &mut var.init {
                        self.check_value(init, &ty, "declaration")?;
                    }
                }
            }
            StmtKind::LocalClass(id) => {
                let id = *id;
                if let Some(name) = self.env.table[id].simple_name.clone() {
                    self.env.local_types.push((name, id));
                }
                self.check_class(id)?;
            }
            StmtKind::Expr(expr) => {
                self.check_expr(expr)?;
            }
            StmtKind::If { cond, then, otherwise } => {
                self.check_condition(cond, "if")?;
                self.check_scoped(then)?;
                if let Some(otherwise) = otherwise {
                    self.check_scoped(otherwise)?;
                }
            }
            StmtKind::While { cond, body } => {
                self.check_condition(cond, "while")?;
                self.check_loop_body(body)?;
            }
            StmtKind::For { init, cond, update, body } => {
                self.push_scope()?;
                for s in init {
                    self.check_stmt(s)?;
                }
                if let Some(cond) = cond {
                    self.check_condition(cond, "for")?;
                }
                for u in update {
                    self.check_expr(u)?;
                }
                self.check_loop_body(body)?;
                self.pop_scope()?;
            }
            StmtKind::Break => {
                if self.frame()?.loop_depth == 0 {
                    self.error(pos, "'break' outside of loop.");
                }
            }
            StmtKind::Continue => {
                if self.frame()?.loop_depth == 0 {
                    self.error(pos, "'continue' outside of loop.");
                }
            }
            StmtKind::Return(value) => self.check_return(value, pos)?,
            StmtKind::Throw(expr) => {
                let ty = self.check_expr(expr)?;
                if !ty.is_error() {
                    let throwable = Type::class(JAVA_LANG_THROWABLE);
                    if !resolve::is_subtype(self.env, &ty, &throwable)? {
                        let msg = format!("Can't throw {}; it must be a subclass of class {}.", ty, JAVA_LANG_THROWABLE);
                        self.error(expr.pos, msg);
                    }
                }
            }
            StmtKind::Try { body, catches } => {
                self.check_block(body)?;
                for c in catches {
                    self.push_scope()?;
                    let ctx = self.ctx()?;
                    let ty = resolve::resolve_type_expr(self.env, ctx, &c.type_expr)?;
                    let throwable = Type::class(JAVA_LANG_THROWABLE);
                    if !ty.is_error() && !resolve::is_subtype(self.env, &ty, &throwable)? {
                        let msg = format!("Type {} of catch parameter must be a subclass of class {}.", ty, JAVA_LANG_THROWABLE);
                        self.error(c.pos, msg);
                    }
                    c.class = resolve::class_of(self.env, &ty)?;
                    c.local = Some(self.frame_mut()?.declare(c.name.clone(), ty, c.pos, false, false));
                    self.check_block(&mut c.body)?;
                    self.pop_scope()?;
                }
            }
            StmtKind::Empty => {}
        }
        Ok(())
    }

    fn check_return(&mut self, value: &mut Option<Expr>, pos: Where) -> Result<()> {
        let member = self.frame()?.member;
        let m = self.env.member(member);
        if !m.is_invocable() {
            self.error(pos, "'return' not allowed in initializer.");
            return Ok(());
        }
        let ret = m.method_type.ret.clone();
        match value {
            Some(e) if ret.is_void() => {
                self.check_expr(e)?;
                self.error(e.pos, "'return' with value from void method.");
            }
            Some(e) => self.check_value(e, &ret, "return")?,
            None if !ret.is_void() => self.error(pos, "Missing return value."),
            None => {}
        }
        Ok(())
    }

    fn check_condition(&mut self, e: &mut Expr, what: &str) -> Result<()> {
        let ty = self.check_expr(e)?;
        if !ty.is_error() && ty != Type::Boolean {
            self.error(e.pos, format!("Incompatible type for {}. Can't convert {} to boolean.", what, ty));
        }
        Ok(())
    }

    /// Attribute `e` and convert it to `ty` by assignment conversion
    fn check_value(&mut self, e: &mut Expr, ty: &Type, what: &str) -> Result<()> {
        self.check_expr(e)?;
        self.coerce_assign(e, ty, what)
    }

    fn coerce_assign(&mut self, e: &mut Expr, to: &Type, what: &str) -> Result<()> {
        let from = e.ty.clone();
        if from.is_error() || to.is_error() {
            return Ok(());
        }
        if !resolve::is_assignable(self.env, &from, to, e.const_value())? {
            let msg = if from.is_reference() && to.is_reference() && resolve::is_castable(self.env, &from, to)? {
                format!("Incompatible type for {}. Explicit cast needed to convert {} to {}.", what, from, to)
            } else {
                format!("Incompatible type for {}. Can't convert {} to {}.", what, from, to)
            };
            self.error(e.pos, msg);
            return Ok(());
        }
        coerce(e, to);
        Ok(())
    }

    // Expressions

    pub(super) fn check_expr(&mut self, e: &mut Expr) -> Result<Type> {
        self.attribute(e, false, false)
    }

    fn check_qualifier(&mut self, e: &mut Expr) -> Result<Type> {
        self.attribute(e, true, false)
    }

    fn check_args(&mut self, args: &mut [Expr]) -> Result<Vec<Type>> {
        args.iter_mut().map(|a| self.check_expr(a)).collect()
    }

    fn attribute(&mut self, e: &mut Expr, qualifier: bool, lvalue: bool) -> Result<Type> {
        self.depth += 1;
        if self.depth > MAX_EXPR_DEPTH {
            return Err(Error::out_of_resources());
        }
        let pos = e.pos;
        let ty0 = e.ty.clone();
        let kind = std::mem::replace(&mut e.kind, ExprKind::Error);
        let result = self.attribute_kind(kind, ty0, pos, qualifier, lvalue);
        self.depth -= 1;
        let (kind, ty) = match result? {
            (ExprKind::TypeRef(t), _) if !qualifier => {
                self.error(pos, format!("Undefined variable: {}", t));
                (ExprKind::Error, Type::Error)
            }
            (ExprKind::PackageRef(p), _) if !qualifier => {
                self.error(pos, format!("Undefined variable or class name: {}", p));
                (ExprKind::Error, Type::Error)
            }
            other => other,
        };
        e.kind = kind;
        e.ty = ty.clone();
        Ok(ty)
    }

    fn attribute_kind(
        &mut self,
        kind: ExprKind,
        ty0: Type,
        pos: Where,
        qualifier: bool,
        lvalue: bool,
    ) -> Result<(ExprKind, Type)> {
        match kind {
            ExprKind::Literal(lit) => Ok(literal(lit)),
            ExprKind::Name(name) => self.attribute_name(name, pos, qualifier, lvalue),
            ExprKind::Select { target, name } => self.attribute_select(*target, name, pos, lvalue),
            ExprKind::Call { target, is_super, name, args } => self.attribute_call(target, is_super, name, args, pos),
            ExprKind::New { class, args, body } => self.attribute_new(class, args, body, pos),
            ExprKind::NewArray { elem, mut len } => {
                let ctx = self.ctx()?;
                let elem_ty = resolve::resolve_type_expr(self.env, ctx, &elem)?;
                self.check_index(&mut len, "array dimension")?;
                if elem_ty.is_error() {
                    return Ok((ExprKind::Error, Type::Error));
                }
                Ok((ExprKind::NewArrayOf { len }, Type::array_of(elem_ty)))
            }
            ExprKind::Index { mut array, mut index } => {
                let aty = self.check_expr(&mut array)?;
                self.check_index(&mut index, "array index")?;
                match aty {
                    Type::Array(elem) => Ok((ExprKind::ArrayElem { array, index }, *elem)),
                    Type::Error => Ok((ExprKind::Error, Type::Error)),
                    other => {
                        self.error(pos, format!("[] can only be applied to arrays. It can't be applied to {}.", other));
                        Ok((ExprKind::Error, Type::Error))
                    }
                }
            }
            ExprKind::This => {
                let this = self.this_expr(pos)?;
                Ok((this.kind, this.ty))
            }
            ExprKind::Super => {
                self.error(pos, "Invalid use of super.");
                Ok((ExprKind::Error, Type::Error))
            }
            ExprKind::QualifiedThis(name) => self.attribute_qualified_this(&name, pos),
            ExprKind::ClassLit(te) => self.attribute_class_literal(&te, pos),
            ExprKind::CtorCall { is_super, args } => self.attribute_ctor_call(is_super, args, pos),
            ExprKind::Assign { op, lhs, rhs } => self.attribute_assign(op, lhs, rhs, pos),
            ExprKind::Binary { op, lhs, rhs } => self.attribute_binary(op, lhs, rhs, pos),
            ExprKind::Unary { op, operand } => self.attribute_unary(op, operand, pos),
            ExprKind::IncDec { op, mut operand } => {
                let ty = self.attribute(&mut operand, false, true)?;
                match operand.kind {
                    ExprKind::Local(id) => {
                        let var = self.frame()?.local(id).cloned();
                        if let Some(var) = var.filter(|v| v.is_final) {
                            self.error(pos, format!("Can't assign a value to a final variable: {}", var.name));
                        }
                        if !ty.is_numeric() {
                            self.error(pos, format!("Incompatible type for ++ or --. Can't convert {} to int.", ty));
                            return Ok((ExprKind::Error, Type::Error));
                        }
                        Ok((ExprKind::IncDec { op, operand }, ty))
                    }
                    ExprKind::Error => Ok((ExprKind::Error, Type::Error)),
                    _ => {
                        self.error(pos, "Only local variables can be incremented or decremented.");
                        Ok((ExprKind::Error, Type::Error))
                    }
                }
            }
            ExprKind::Conditional { cond, then, otherwise } => self.attribute_conditional(cond, then, otherwise, pos),
            ExprKind::Cast { type_expr, expr } => self.attribute_cast(&type_expr, expr, pos),
            ExprKind::InstanceOf { mut expr, type_expr } => {
                let from = self.check_expr(&mut expr)?;
                let ctx = self.ctx()?;
                let target = resolve::resolve_type_expr(self.env, ctx, &type_expr)?;
                if from.is_error() || target.is_error() {
                    return Ok((ExprKind::Error, Type::Error));
                }
                if !from.is_reference() || !target.is_reference() || !resolve::is_castable(self.env, &from, &target)? {
                    self.error(pos, format!("Impossible for {} to be instance of {}.", from, target));
                }
                Ok((ExprKind::InstanceTest { expr, target }, Type::Boolean))
            }
            resolved => Ok((resolved, ty0)),
        }
    }

    fn check_index(&mut self, e: &mut Expr, what: &str) -> Result<()> {
        let ty = self.check_expr(e)?;
        if ty.is_error() {
            return Ok(());
        }
        if !ty.is_integral() || ty == Type::Long {
            self.error(e.pos, format!("Incompatible type for {}. Can't convert {} to int.", what, ty));
            return Ok(());
        }
        coerce(e, &Type::Int);
        Ok(())
    }

    // Names

    /// `this`, checked against static context and the constructor prologue
    fn this_expr(&mut self, pos: Where) -> Result<Expr> {
        let frame = self.frame()?;
        let (class, is_static, prologue) = (frame.class, frame.is_static, frame.in_prologue);
        if is_static {
            self.error(pos, "Undefined variable: this");
            return Ok(Expr::error(pos));
        }
        if prologue {
            self.error(pos, "Can't reference this before the superclass constructor has been called.");
        }
        Ok(Expr::typed(ExprKind::This, pos, self.env.table[class].ty()))
    }

    /// An instance of `wanted` reachable from the current body: `this`, or
    /// an enclosing instance reached through the `this$N` links. With
    /// `exact`, the instance must be of `wanted` itself rather than a
    /// subclass of it.
    fn enclosing_instance(&mut self, wanted: ClassId, skip_self: bool, exact: bool, pos: Where) -> Result<Option<Expr>> {
        let frame = self.frame()?;
        let (class, is_static) = (frame.class, frame.is_static);
        if is_static {
            return Ok(None);
        }
        let matches = |checker: &mut Self, c: ClassId| -> Result<bool> {
            if exact {
                Ok(c == wanted)
            } else {
                resolve::is_subclass_of(checker.env, c, wanted)
            }
        };
        if !skip_self && matches(self, class)? {
            return self.this_expr(pos).map(Some);
        }
        let mut c = class;
        loop {
            let def = &self.env.table[c];
            let Some(outer) = def.outer.filter(|_| def.need_outer_this()) else { return Ok(None) };
            if matches(self, outer)? {
                return Ok(Some(Expr::typed(ExprKind::OuterThis(outer), pos, self.env.table[outer].ty())));
            }
            c = outer;
        }
    }

    /// A local of this body or, from a local or anonymous class, of an
    /// enclosing body, copied into a `val$` field of every class in between
    fn lookup_var(&mut self, name: &str, pos: Where) -> Result<Option<(ExprKind, Type)>> {
        let Some(top) = self.frames.len().checked_sub(1) else { return Ok(None) };
        if let Some(id) = self.frames[top].find(name) {
            let ty = self.frames[top].local(id).map(|v| v.ty.clone()).unwrap_or(Type::Error);
            return Ok(Some((ExprKind::Local(id), ty)));
        }
        let mut i = top;
        let (k, id) = loop {
            let f = &self.frames[i];
            if f.barrier || i == 0 {
                return Ok(None);
            }
            let def = &self.env.table[f.class];
            if !(def.is_local() || def.is_anonymous()) || def.outer != Some(self.frames[i - 1].class) {
                return Ok(None);
            }
            if let Some(id) = self.frames[i - 1].find(name) {
                break (i - 1, id);
            }
            i -= 1;
        };
        let Some(var) = self.frames[k].local(id).cloned() else { return Ok(None) };
        if !var.is_final {
            let msg = format!(
                "Attempt to use a non-final variable {} from a different method. From enclosing blocks, only final local variables are available.",
                name
            );
            self.error(pos, msg);
        }
        let mut field = None;
        for j in k + 1..=top {
            let class = self.frames[j].class;
            field = Some(lower::capture(self.env, class, name, &var.ty, pos));
        }
        let Some(field) = field else { return Ok(None) };
        let this = Expr::typed(ExprKind::This, pos, self.env.table[self.frames[top].class].ty());
        Ok(Some((ExprKind::Field { target: Some(Box::new(this)), field }, var.ty)))
    }

    /// Field `name` of `class`, its superinterfaces or superclasses
    fn find_field(&mut self, class: ClassId, name: &str) -> Result<Option<MemberRef>> {
        let mut seen = BTreeSet::new();
        let mut pending = vec![class];
        while let Some(c) = pending.pop() {
            if !seen.insert(c) || !classloader::load(self.env, c)? {
                continue;
            }
            resolve_class(self.env, c)?;
            let def = &self.env.table[c];
            if let Some(f) = def.find_field(name) {
                return Ok(Some(f));
            }
            pending.extend(def.super_class);
            pending.extend(def.interfaces.iter().rev().copied());
        }
        Ok(None)
    }

    /// Field visible under a simple name, and the class of the scope
    /// that has it
    fn find_field_in_scope(&mut self, name: &str) -> Result<Option<(MemberRef, ClassId)>> {
        let mut scope = Some(self.ctx()?);
        while let Some(c) = scope {
            if let Some(f) = self.find_field(c, name)? {
                return Ok(Some((f, c)));
            }
            scope = self.env.table[c].outer;
        }
        Ok(None)
    }

    fn attribute_name(&mut self, name: String, pos: Where, qualifier: bool, lvalue: bool) -> Result<(ExprKind, Type)> {
        if let Some(var) = self.lookup_var(&name, pos)? {
            return Ok(var);
        }
        if let Some((field, holder)) = self.find_field_in_scope(&name)? {
            let target = if self.env.member(field).is_static() {
                None
            } else {
                match self.enclosing_instance(holder, false, false, pos)? {
                    Some(t) => Some(Box::new(t)),
                    None => {
                        let msg = format!(
                            "Can't make a static reference to nonstatic variable {} in class {}.",
                            name,
                            self.env.class_name(holder)
                        );
                        self.error(pos, msg);
                        return Ok((ExprKind::Error, Type::Error));
                    }
                }
            };
            return self.field_value(target, field, pos, lvalue);
        }
        if qualifier {
            let ctx = self.ctx()?;
            if let Some(c) = resolve::lookup_class(self.env, ctx, &name, pos)? {
                self.check_class_access(c, pos)?;
                let ty = self.env.table[c].ty();
                return Ok((ExprKind::TypeRef(ty.clone()), ty));
            }
            return Ok((ExprKind::PackageRef(name), Type::Error));
        }
        self.error(pos, format!("Undefined variable: {}", name));
        Ok((ExprKind::Error, Type::Error))
    }

    fn check_class_access(&mut self, c: ClassId, pos: Where) -> Result<()> {
        let ctx = self.ctx()?;
        if !resolve::can_access_class(self.env, ctx, c)? {
            let msg = format!("Class {} is not accessible from {}.", self.env.class_name(c), self.env.class_name(ctx));
            self.error(pos, msg);
        }
        Ok(())
    }

    /// Read (or, as an lvalue, the location) of `field` on `target`
    fn field_value(
        &mut self,
        target: Option<Box<Expr>>,
        field: MemberRef,
        pos: Where,
        lvalue: bool,
    ) -> Result<(ExprKind, Type)> {
        let ctx = self.ctx()?;
        if !resolve::can_access_member(self.env, ctx, field)? {
            let msg = format!(
                "Variable {} in class {} not accessible from class {}.",
                self.env.member(field).name,
                self.env.class_name(field.class),
                self.env.class_name(ctx)
            );
            self.error(pos, msg);
        }
        self.note_deprecated(field, pos)?;
        let m = self.env.member(field);
        let ty = m.ty.clone();
        let plain_target = target.as_ref().map_or(true, |t| matches!(t.kind, ExprKind::This | ExprKind::OuterThis(_)));
        if !lvalue && m.is_final() && plain_target {
            if let Some(value) = self.field_constant(field)? {
                return Ok((ExprKind::Const(value), ty));
            }
        }
        if let (false, Some(host)) = (lvalue, lower::bridge_host(self.env, ctx, field)) {
            lower::access_bridge(self.env, host, field, AccessKind::Get)?;
        }
        Ok((ExprKind::Field { target, field }, ty))
    }

    fn attribute_select(&mut self, target: Expr, name: String, pos: Where, lvalue: bool) -> Result<(ExprKind, Type)> {
        if matches!(target.kind, ExprKind::Super) {
            let ctx = self.ctx()?;
            let this = self.this_expr(target.pos)?;
            let found = match self.env.table[ctx].super_class {
                Some(s) => self.find_field(s, &name)?,
                None => None,
            };
            return match found {
                Some(f) => self.field_value(Some(Box::new(this)), f, pos, lvalue),
                None => {
                    self.error(pos, format!("No variable {} defined in the superclass of {}.", name, self.env.class_name(ctx)));
                    Ok((ExprKind::Error, Type::Error))
                }
            };
        }

        let mut target = target;
        let tty = self.check_qualifier(&mut target)?;
        match &target.kind {
            ExprKind::PackageRef(p) => {
                let full = format!("{}.{}", p, name);
                if let Some(c) = resolve::find_qualified(self.env, &full)? {
                    self.check_class_access(c, pos)?;
                    let ty = self.env.table[c].ty();
                    return Ok((ExprKind::TypeRef(ty.clone()), ty));
                }
                return Ok((ExprKind::PackageRef(full), Type::Error));
            }
            ExprKind::TypeRef(ty) => {
                let Some(c) = resolve::class_of(self.env, ty)? else { return Ok((ExprKind::Error, Type::Error)) };
                if let Some(f) = self.find_field(c, &name)? {
                    if !self.env.member(f).is_static() {
                        let msg = format!(
                            "Can't make a static reference to nonstatic variable {} in class {}.",
                            name,
                            self.env.class_name(c)
                        );
                        self.error(pos, msg);
                        return Ok((ExprKind::Error, Type::Error));
                    }
                    return self.field_value(None, f, pos, lvalue);
                }
                if let Some(inner) = resolve::find_member_class(self.env, c, &name)? {
                    self.check_class_access(inner, pos)?;
                    let ty = self.env.table[inner].ty();
                    return Ok((ExprKind::TypeRef(ty.clone()), ty));
                }
                self.error(pos, format!("No variable {} defined in class {}.", name, self.env.class_name(c)));
                return Ok((ExprKind::Error, Type::Error));
            }
            ExprKind::Error => return Ok((ExprKind::Error, Type::Error)),
            _ => {}
        }
        match &tty {
            Type::Array(_) if name == "length" && !lvalue => Ok((ExprKind::ArrayLength(Box::new(target)), Type::Int)),
            Type::Class(_) => {
                let Some(c) = resolve::class_of(self.env, &tty)? else { return Ok((ExprKind::Error, Type::Error)) };
                match self.find_field(c, &name)? {
                    Some(f) => self.field_value(Some(Box::new(target)), f, pos, lvalue),
                    None => {
                        self.error(pos, format!("No variable {} defined in class {}.", name, self.env.class_name(c)));
                        Ok((ExprKind::Error, Type::Error))
                    }
                }
            }
            Type::Error => Ok((ExprKind::Error, Type::Error)),
            other => {
                self.error(pos, format!("Attempt to reference field {} in a {}.", name, other));
                Ok((ExprKind::Error, Type::Error))
            }
        }
    }

    fn attribute_qualified_this(&mut self, name: &TypeName, pos: Where) -> Result<(ExprKind, Type)> {
        let ctx = self.ctx()?;
        let Some(c) = resolve::resolve_type_name(self.env, ctx, name)? else { return Ok((ExprKind::Error, Type::Error)) };
        if !self.env.is_enclosed_by(ctx, c) {
            self.error(pos, format!("No enclosing instance of class {} is in scope.", self.env.class_name(c)));
            return Ok((ExprKind::Error, Type::Error));
        }
        match self.enclosing_instance(c, false, true, pos)? {
            Some(e) => Ok((e.kind, e.ty)),
            None => {
                self.error(pos, format!("No enclosing instance of class {} is in scope.", self.env.class_name(c)));
                Ok((ExprKind::Error, Type::Error))
            }
        }
    }

    fn attribute_class_literal(&mut self, te: &TypeExpr, pos: Where) -> Result<(ExprKind, Type)> {
        let ctx = self.ctx()?;
        let ty = resolve::resolve_type_expr(self.env, ctx, te)?;
        let class_ty = Type::class(JAVA_LANG_CLASS);
        if ty.is_error() {
            return Ok((ExprKind::Error, Type::Error));
        }
        if let Some(wrapper) = rt::wrapper_class(&ty) {
            let w = self.env.declare(wrapper);
            if classloader::load(self.env, w)? {
                if let Some(field) = self.env.table[w].find_field("TYPE") {
                    return Ok((ExprKind::Field { target: None, field }, class_ty));
                }
            }
            self.error(pos, format!("Class {} not found.", wrapper));
            return Ok((ExprKind::Error, Type::Error));
        }
        Ok((lower::class_literal(self.env, ctx, &ty)?, class_ty))
    }

    // Methods and constructors

    /// Methods named `name` that `class` declares or inherits, nearest
    /// first, one per signature
    fn collect_methods(&mut self, class: ClassId, name: &str) -> Result<Vec<MemberRef>> {
        let mut out: Vec<MemberRef> = Vec::new();
        let mut keys = BTreeSet::new();
        let mut seen = BTreeSet::new();
        let mut pending = std::collections::VecDeque::from([class]);
        let mut reached_object = false;
        while let Some(c) = pending.pop_front() {
            if !seen.insert(c) || !classloader::load(self.env, c)? {
                continue;
            }
            resolve_class(self.env, c)?;
            let def = &self.env.table[c];
            reached_object |= def.name == JAVA_LANG_OBJECT;
            for r in def.find_methods(name) {
                let m = self.env.member(r);
                if m.is_method() && keys.insert(m.signature_key()) {
                    out.push(r);
                }
            }
            pending.extend(def.super_class);
            pending.extend(def.interfaces.iter().copied());
        }
        if !reached_object {
            let object = self.env.declare(JAVA_LANG_OBJECT);
            if classloader::load(self.env, object)? {
                for r in self.env.table[object].find_methods(name) {
                    if keys.insert(self.env.member(r).signature_key()) {
                        out.push(r);
                    }
                }
            }
        }
        Ok(out)
    }

    fn is_applicable(&mut self, r: MemberRef, args: &[Type]) -> Result<bool> {
        let params = self.env.member(r).declared_args().to_vec();
        if params.len() != args.len() {
            return Ok(false);
        }
        for (a, p) in args.iter().zip(&params) {
            if !resolve::is_convertible(self.env, a, p)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn more_specific(&mut self, a: MemberRef, b: MemberRef) -> Result<bool> {
        let params = self.env.member(a).declared_args().to_vec();
        self.is_applicable(b, &params)
    }

    fn select(&mut self, candidates: Vec<MemberRef>, args: &[Type]) -> Result<Selection> {
        let mut applicable = Vec::new();
        for r in candidates {
            if self.is_applicable(r, args)? {
                applicable.push(r);
            }
        }
        let mut best: Vec<MemberRef> = Vec::new();
        for &r in &applicable {
            let mut maximal = true;
            for &other in &applicable {
                if other != r && !self.more_specific(r, other)? {
                    maximal = false;
                    break;
                }
            }
            if maximal {
                best.push(r);
            }
        }
        Ok(match (best.as_slice(), applicable.as_slice()) {
            (_, []) => Selection::NoneApplicable,
            ([only], _) => Selection::Found(*only),
            ([first, second, ..], _) => Selection::Ambiguous(*first, *second),
            ([], [first, second, ..]) => Selection::Ambiguous(*first, *second),
            ([], [only]) => Selection::Found(*only),
        })
    }

    fn report_selection(
        &mut self,
        selection: Selection,
        (kind, name): (&str, &str),
        class: ClassId,
        args: &[Type],
        pos: Where,
    ) -> Option<MemberRef> {
        match selection {
            Selection::Found(r) => Some(r),
            Selection::NoneApplicable => {
                let msg = format!(
                    "No {} matching {}({}) found in class {}.",
                    kind,
                    name,
                    type_list(args),
                    self.env.class_name(class)
                );
                self.error(pos, msg);
                None
            }
            Selection::Ambiguous(a, b) => {
                let msg = format!(
                    "Reference to {} is ambiguous. It is defined in {} and {}.",
                    name,
                    self.env.member(a).describe(),
                    self.env.member(b).describe()
                );
                self.error(pos, msg);
                None
            }
        }
    }

    fn resolve_method(&mut self, class: ClassId, name: &str, args: &[Type], pos: Where) -> Result<Option<MemberRef>> {
        let candidates = self.collect_methods(class, name)?;
        if candidates.is_empty() {
            let msg = format!("Method {}({}) not found in class {}.", name, type_list(args), self.env.class_name(class));
            self.error(pos, msg);
            return Ok(None);
        }
        let selection = self.select(candidates, args)?;
        Ok(self.report_selection(selection, ("method", name), class, args, pos))
    }

    fn resolve_constructor(&mut self, class: ClassId, args: &[Type], pos: Where) -> Result<Option<MemberRef>> {
        resolve_class(self.env, class)?;
        let candidates = self.env.table[class].constructors();
        let simple = self.env.table[class].simple_name.clone().unwrap_or_else(|| self.env.class_name(class).to_string());
        let selection = self.select(candidates, args)?;
        Ok(self.report_selection(selection, ("constructor", &simple), class, args, pos))
    }

    /// Convert arguments to the declared parameter types of `r`
    fn coerce_args(&mut self, r: MemberRef, args: &mut [Expr]) {
        let params = self.env.member(r).declared_args().to_vec();
        for (a, p) in args.iter_mut().zip(&params) {
            coerce(a, p);
        }
    }

    fn check_member_access(&mut self, r: MemberRef, pos: Where) -> Result<()> {
        let ctx = self.ctx()?;
        if !resolve::can_access_member(self.env, ctx, r)? {
            let msg = format!(
                "{} in class {} is not accessible from class {}.",
                self.env.member(r).describe(),
                self.env.class_name(r.class),
                self.env.class_name(ctx)
            );
            self.error(pos, msg);
        }
        self.note_deprecated(r, pos)
    }

    /// The class in scope that has a method named `name`
    fn method_holder(&mut self, name: &str) -> Result<Option<ClassId>> {
        let mut scope = Some(self.ctx()?);
        while let Some(c) = scope {
            if !self.collect_methods(c, name)?.is_empty() {
                return Ok(Some(c));
            }
            scope = self.env.table[c].outer;
        }
        Ok(None)
    }

    fn attribute_call(
        &mut self,
        target: Option<Box<Expr>>,
        is_super: bool,
        name: String,
        mut args: Vec<Expr>,
        pos: Where,
    ) -> Result<(ExprKind, Type)> {
        let arg_types = self.check_args(&mut args)?;
        let ctx = self.ctx()?;
        let error = Ok((ExprKind::Error, Type::Error));

        let (method, receiver) = if is_super {
            let this = self.this_expr(pos)?;
            let Some(sup) = self.env.table[ctx].super_class else {
                self.error(pos, "Invalid use of super.");
                return error;
            };
            if has_error(&arg_types) {
                return error;
            }
            let Some(m) = self.resolve_method(sup, &name, &arg_types, pos)? else { return error };
            if self.env.member(m).is_abstract() {
                self.error(pos, format!("Can't directly invoke abstract method {} in class {}.", self.env.member(m).describe(), self.env.class_name(m.class)));
            }
            (m, Some(this))
        } else if let Some(mut t) = target {
            let tty = self.check_qualifier(&mut t)?;
            match &t.kind {
                ExprKind::PackageRef(p) => {
                    self.error(t.pos, format!("Undefined variable or class name: {}", p));
                    return error;
                }
                ExprKind::Error => return error,
                _ => {}
            }
            let static_only = matches!(t.kind, ExprKind::TypeRef(_));
            let class = match &tty {
                Type::Class(_) => resolve::class_of(self.env, &tty)?,
                Type::Array(_) => {
                    let object = self.env.declare(JAVA_LANG_OBJECT);
                    classloader::load(self.env, object)?.then_some(object)
                }
                other => {
                    self.error(pos, format!("Can't invoke a method on a {}.", other));
                    return error;
                }
            };
            let Some(class) = class else { return error };
            if has_error(&arg_types) {
                return error;
            }
            let Some(m) = self.resolve_method(class, &name, &arg_types, pos)? else { return error };
            if static_only {
                if !self.env.member(m).is_static() {
                    let msg = format!(
                        "Can't make static reference to method {} in class {}.",
                        self.env.member(m).describe(),
                        self.env.class_name(class)
                    );
                    self.error(pos, msg);
                    return error;
                }
                (m, None)
            } else {
                (m, Some(*t))
            }
        } else {
            let Some(holder) = self.method_holder(&name)? else {
                let msg = format!("Method {}({}) not found in class {}.", name, type_list(&arg_types), self.env.class_name(ctx));
                self.error(pos, msg);
                return error;
            };
            if has_error(&arg_types) {
                return error;
            }
            let Some(m) = self.resolve_method(holder, &name, &arg_types, pos)? else { return error };
            if self.env.member(m).is_static() {
                (m, None)
            } else {
                match self.enclosing_instance(holder, false, false, pos)? {
                    Some(this) => (m, Some(this)),
                    None => {
                        let msg = format!(
                            "Can't make static reference to method {} in class {}.",
                            self.env.member(m).describe(),
                            self.env.class_name(holder)
                        );
                        self.error(pos, msg);
                        return error;
                    }
                }
            }
        };

        self.check_member_access(method, pos)?;
        self.coerce_args(method, &mut args);
        let m = self.env.member(method);
        let ret = m.method_type.ret.clone();
        let is_static = m.is_static();
        let mode = if is_static {
            InvokeMode::Static
        } else if is_super || m.is_private() {
            InvokeMode::Special
        } else if self.env.table[method.class].is_interface() {
            InvokeMode::Interface
        } else {
            InvokeMode::Virtual
        };

        if let Some(host) = lower::bridge_host(self.env, ctx, method) {
            let bridge = lower::access_bridge(self.env, host, method, AccessKind::Call)?;
            let mut bridge_args = Vec::with_capacity(args.len() + 1);
            if !is_static {
                bridge_args.extend(receiver);
            }
            bridge_args.extend(args);
            let kind = ExprKind::Invoke { target: None, method: bridge, args: bridge_args, mode: InvokeMode::Static };
            return Ok((kind, ret));
        }
        Ok((ExprKind::Invoke { target: receiver.map(Box::new), method, args, mode }, ret))
    }

    /// Make sure every class between the current body and a local class
    /// carries the locals that class captured
    fn forward_captures(&mut self, class: ClassId, pos: Where) -> Result<()> {
        let names: Vec<String> = self.env.table[class].captured.iter().map(|c| c.name.clone()).collect();
        for name in names {
            self.lookup_var(&name, pos)?;
        }
        Ok(())
    }

    fn attribute_new(
        &mut self,
        class: TypeExpr,
        mut args: Vec<Expr>,
        body: Option<ClassId>,
        pos: Where,
    ) -> Result<(ExprKind, Type)> {
        let arg_types = self.check_args(&mut args)?;
        let ctx = self.ctx()?;
        let error = Ok((ExprKind::Error, Type::Error));

        if let Some(anon) = body {
            resolve_class(self.env, anon)?;
            let def = &self.env.table[anon];
            let implements = !def.interfaces.is_empty();
            let sup = def.super_class;
            if has_error(&arg_types) {
                self.env.table[anon].erroneous = true;
                return error;
            }
            let (super_args, exceptions) = if implements {
                if !args.is_empty() {
                    self.error(pos, "Anonymous class implementing an interface can't have constructor arguments.");
                    return error;
                }
                (Vec::new(), Vec::new())
            } else {
                let Some(sup) = sup else { return error };
                let Some(ctor) = self.resolve_constructor(sup, &arg_types, pos)? else { return error };
                let m = self.env.member(ctor);
                (m.declared_args().to_vec(), m.exceptions.clone())
            };
            let ctor = lower::anonymous_constructor(self.env, anon, &super_args, exceptions);
            self.check_class(anon)?;
            for (a, p) in args.iter_mut().zip(&super_args) {
                coerce(a, p);
            }
            let outer = if self.env.table[anon].need_outer_this() { Some(Box::new(self.this_expr(pos)?)) } else { None };
            let ty = self.env.table[anon].ty();
            return Ok((ExprKind::NewInstance { class: anon, ctor, outer, args, marker: false }, ty));
        }

        let TypeExpr::Named(name) = &class else { return error };
        let Some(c) = resolve::resolve_type_name(self.env, ctx, name)? else { return error };
        resolve_class(self.env, c)?;
        let def = &self.env.table[c];
        let refusal = if def.is_interface() {
            Some(format!("{} is an interface. It can't be instantiated.", def.name))
        } else if def.is_abstract() {
            Some(format!("{} is an abstract class. It can't be instantiated.", def.name))
        } else {
            None
        };
        if let Some(msg) = refusal {
            self.error(pos, msg);
            return error;
        }
        if has_error(&arg_types) {
            return error;
        }
        let Some(ctor) = self.resolve_constructor(c, &arg_types, pos)? else { return error };
        self.check_member_access(ctor, pos)?;
        self.coerce_args(ctor, &mut args);

        let def = &self.env.table[c];
        let outer = match def.outer.filter(|_| def.need_outer_this()) {
            Some(o) => match self.enclosing_instance(o, false, false, pos)? {
                Some(e) => Some(Box::new(e)),
                None => {
                    let msg = format!(
                        "No enclosing instance of class {} is in scope; an explicit one must be provided when creating inner class {}.",
                        self.env.class_name(o),
                        self.env.class_name(c)
                    );
                    self.error(pos, msg);
                    return error;
                }
            },
            None => None,
        };
        if self.env.table[c].is_local() {
            self.forward_captures(c, pos)?;
        }
        let (ctor, marker) = if let Some(host) = lower::bridge_host(self.env, ctx, ctor) {
            (lower::access_bridge(self.env, host, ctor, AccessKind::Construct)?, true)
        } else {
            (ctor, false)
        };
        let ty = self.env.table[c].ty();
        Ok((ExprKind::NewInstance { class: c, ctor, outer, args, marker }, ty))
    }

    fn attribute_ctor_call(&mut self, is_super: bool, mut args: Vec<Expr>, pos: Where) -> Result<(ExprKind, Type)> {
        let frame = self.frame_mut()?;
        let allowed = std::mem::replace(&mut frame.ctor_call_allowed, false);
        let is_ctor = frame.is_ctor;
        let class = frame.class;
        if !allowed {
            let msg = if is_ctor {
                "Constructor invocation must be the first thing in a constructor."
            } else {
                "Only constructors can invoke constructors."
            };
            self.error(pos, msg);
            return Ok((ExprKind::Error, Type::Error));
        }

        self.frame_mut()?.in_prologue = true;
        let arg_types = self.check_args(&mut args);
        self.frame_mut()?.in_prologue = false;
        let arg_types = arg_types?;
        let error = Ok((ExprKind::Error, Type::Void));

        let target = if is_super { self.env.table[class].super_class } else { Some(class) };
        let Some(target) = target else { return error };
        if has_error(&arg_types) {
            return error;
        }
        let Some(ctor) = self.resolve_constructor(target, &arg_types, pos)? else { return error };
        if !is_super && Some(ctor) == self.frames.last().map(|f| f.member) {
            self.error(pos, "Recursive constructor invocation.");
            return error;
        }
        self.check_member_access(ctor, pos)?;
        self.coerce_args(ctor, &mut args);

        let def = &self.env.table[target];
        let outer = match def.outer.filter(|_| def.need_outer_this()) {
            Some(o) if !is_super => Some(Box::new(Expr::typed(ExprKind::OuterThis(o), pos, self.env.table[o].ty()))),
            Some(o) => match self.enclosing_instance(o, true, false, pos)? {
                Some(e) => Some(Box::new(e)),
                None => {
                    let msg = format!(
                        "No enclosing instance of class {} is in scope; the superclass constructor of {} needs one.",
                        self.env.class_name(o),
                        self.env.class_name(class)
                    );
                    self.error(pos, msg);
                    return error;
                }
            },
            None => None,
        };
        if is_super && (self.env.table[target].is_local() || self.env.table[target].is_anonymous()) {
            self.forward_captures(target, pos)?;
        }
        let ctx = self.ctx()?;
        let (ctor, marker) = if let Some(host) = lower::bridge_host(self.env, ctx, ctor) {
            (lower::access_bridge(self.env, host, ctor, AccessKind::Construct)?, true)
        } else {
            (ctor, false)
        };
        Ok((ExprKind::Init { ctor, is_super, outer, args, marker }, Type::Void))
    }

    // Operators

    fn attribute_assign(
        &mut self,
        op: Option<BinaryOp>,
        mut lhs: Box<Expr>,
        mut rhs: Box<Expr>,
        pos: Where,
    ) -> Result<(ExprKind, Type)> {
        let lty = self.attribute(&mut lhs, false, true)?;
        let rty = self.check_expr(&mut rhs)?;
        let ctx = self.ctx()?;
        match &lhs.kind {
            ExprKind::Local(_) | ExprKind::ArrayElem { .. } => {}
            ExprKind::Field { target, field } => {
                let field = *field;
                let m = self.env.member(field);
                if m.is_final() {
                    let frame = self.frame()?;
                    let own = target.as_ref().map_or(true, |t| matches!(t.kind, ExprKind::This));
                    let in_init = frame.is_ctor || !self.env.member(frame.member).is_invocable();
                    let ok = m.is_blank_final()
                        && field.class == frame.class
                        && own
                        && m.is_static() == frame.is_static
                        && in_init;
                    if !ok {
                        let msg = format!("Can't assign a value to a final variable: {}", m.name);
                        self.error(pos, msg);
                    }
                }
                if let Some(host) = lower::bridge_host(self.env, ctx, field) {
                    lower::access_bridge(self.env, host, field, AccessKind::Set)?;
                    if op.is_some() {
                        lower::access_bridge(self.env, host, field, AccessKind::Get)?;
                    }
                }
            }
            ExprKind::Error => return Ok((ExprKind::Error, Type::Error)),
            _ => {
                self.error(lhs.pos, "Invalid left hand side of assignment.");
                return Ok((ExprKind::Error, Type::Error));
            }
        }
        if lty.is_error() || rty.is_error() {
            return Ok((ExprKind::Error, Type::Error));
        }

        match op {
            None => self.coerce_assign(&mut rhs, &lty, "=")?,
            Some(BinaryOp::Add) if lty.is_string() => {
                if rty.is_void() {
                    self.error(rhs.pos, "Incompatible type for +=. Can't convert void to java.lang.String.");
                }
            }
            Some(op) => {
                let valid = if op.is_shift() {
                    lty.is_integral() && rty.is_integral()
                } else if matches!(op, BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor) {
                    (lty == Type::Boolean && rty == Type::Boolean) || (lty.is_integral() && rty.is_integral())
                } else {
                    lty.is_numeric() && rty.is_numeric()
                };
                if !valid {
                    let msg = format!("Incompatible type for {}=. Can't convert {} to {}.", op.symbol(), rty, lty);
                    self.error(pos, msg);
                    return Ok((ExprKind::Error, Type::Error));
                }
                if op.is_shift() {
                    coerce(&mut rhs, &Type::Int);
                } else if lty != Type::Boolean {
                    coerce(&mut rhs, &Type::promote(&lty, &rty));
                }
            }
        }
        Ok((ExprKind::Assign { op, lhs, rhs }, lty))
    }

    fn binary_error(&mut self, op: BinaryOp, bad: &Type, expected: &str, pos: Where) -> (ExprKind, Type) {
        self.error(pos, format!("Incompatible type for {}. Can't convert {} to {}.", op.symbol(), bad, expected));
        (ExprKind::Error, Type::Error)
    }

    fn attribute_binary(
        &mut self,
        op: BinaryOp,
        mut lhs: Box<Expr>,
        mut rhs: Box<Expr>,
        pos: Where,
    ) -> Result<(ExprKind, Type)> {
        let lt = self.check_expr(&mut lhs)?;
        let rt = self.check_expr(&mut rhs)?;
        if lt.is_error() || rt.is_error() {
            return Ok((ExprKind::Error, Type::Error));
        }
        let string = Type::class(JAVA_LANG_STRING);

        match op {
            BinaryOp::Add if lt.is_string() || rt.is_string() => {
                if lt.is_void() || rt.is_void() {
                    return Ok(self.binary_error(op, &Type::Void, "java.lang.String", pos));
                }
                if let (Some(a), Some(b)) = (lhs.const_value(), rhs.const_value()) {
                    let text = a.to_display_string(&lt) + &b.to_display_string(&rt);
                    return Ok((ExprKind::Const(ConstValue::Str(text)), string));
                }
                let mut parts = match *lhs {
                    Expr { kind: ExprKind::Concat(parts), .. } => parts,
                    other => vec![other],
                };
                parts.push(*rhs);
                Ok((ExprKind::Concat(parts), string))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                if !lt.is_numeric() {
                    return Ok(self.binary_error(op, &lt, "int", pos));
                }
                if !rt.is_numeric() {
                    return Ok(self.binary_error(op, &rt, "int", pos));
                }
                let ty = Type::promote(&lt, &rt);
                Ok(self.finish_binary(op, lhs, rhs, &ty, &ty))
            }
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => {
                if !lt.is_integral() {
                    return Ok(self.binary_error(op, &lt, "int", pos));
                }
                if !rt.is_integral() {
                    return Ok(self.binary_error(op, &rt, "int", pos));
                }
                let ty = lt.promote_unary();
                coerce(&mut lhs, &ty);
                coerce(&mut rhs, &Type::Int);
                let folded = match (lhs.const_value(), rhs.const_value()) {
                    (Some(a), Some(b)) => fold_binary(op, &ty, a, b),
                    _ => None,
                };
                Ok(match folded {
                    Some(v) => (ExprKind::Const(v), ty),
                    None => (ExprKind::Binary { op, lhs, rhs }, ty),
                })
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                if !lt.is_numeric() {
                    return Ok(self.binary_error(op, &lt, "int", pos));
                }
                if !rt.is_numeric() {
                    return Ok(self.binary_error(op, &rt, "int", pos));
                }
                let ty = Type::promote(&lt, &rt);
                Ok(self.finish_binary(op, lhs, rhs, &ty, &Type::Boolean))
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                if lt.is_numeric() && rt.is_numeric() {
                    let ty = Type::promote(&lt, &rt);
                    return Ok(self.finish_binary(op, lhs, rhs, &ty, &Type::Boolean));
                }
                if lt == Type::Boolean && rt == Type::Boolean {
                    return Ok(self.finish_binary(op, lhs, rhs, &Type::Boolean, &Type::Boolean));
                }
                if lt.is_reference() && rt.is_reference() && resolve::is_castable(self.env, &lt, &rt)? {
                    return Ok((ExprKind::Binary { op, lhs, rhs }, Type::Boolean));
                }
                Ok(self.binary_error(op, &rt, &lt.to_string(), pos))
            }
            BinaryOp::And | BinaryOp::Or => {
                if lt != Type::Boolean {
                    return Ok(self.binary_error(op, &lt, "boolean", pos));
                }
                if rt != Type::Boolean {
                    return Ok(self.binary_error(op, &rt, "boolean", pos));
                }
                Ok(self.finish_binary(op, lhs, rhs, &Type::Boolean, &Type::Boolean))
            }
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
                if lt == Type::Boolean && rt == Type::Boolean {
                    return Ok(self.finish_binary(op, lhs, rhs, &Type::Boolean, &Type::Boolean));
                }
                if !lt.is_integral() {
                    return Ok(self.binary_error(op, &lt, "int", pos));
                }
                if !rt.is_integral() {
                    return Ok(self.binary_error(op, &rt, "int", pos));
                }
                let ty = Type::promote(&lt, &rt);
                Ok(self.finish_binary(op, lhs, rhs, &ty, &ty))
            }
        }
    }

    /// Convert both operands to `operand_ty` and fold when both are constant
    fn finish_binary(
        &mut self,
        op: BinaryOp,
        mut lhs: Box<Expr>,
        mut rhs: Box<Expr>,
        operand_ty: &Type,
        result_ty: &Type,
    ) -> (ExprKind, Type) {
        coerce(&mut lhs, operand_ty);
        coerce(&mut rhs, operand_ty);
        let folded = match (lhs.const_value(), rhs.const_value()) {
            (Some(a), Some(b)) => fold_binary(op, operand_ty, a, b),
            _ => None,
        };
        match folded {
            Some(v) => (ExprKind::Const(v), result_ty.clone()),
            None => (ExprKind::Binary { op, lhs, rhs }, result_ty.clone()),
        }
    }

    fn attribute_unary(&mut self, op: UnaryOp, mut operand: Box<Expr>, pos: Where) -> Result<(ExprKind, Type)> {
        let ty = self.check_expr(&mut operand)?;
        if ty.is_error() {
            return Ok((ExprKind::Error, Type::Error));
        }
        let (valid, result, symbol) = match op {
            UnaryOp::Plus | UnaryOp::Neg => (ty.is_numeric(), ty.promote_unary(), if op == UnaryOp::Plus { "+" } else { "-" }),
            UnaryOp::Not => (ty == Type::Boolean, Type::Boolean, "!"),
            UnaryOp::BitNot => (ty.is_integral(), ty.promote_unary(), "~"),
        };
        if !valid {
            let expected = if op == UnaryOp::Not { "boolean" } else { "int" };
            self.error(pos, format!("Incompatible type for {}. Can't convert {} to {}.", symbol, ty, expected));
            return Ok((ExprKind::Error, Type::Error));
        }
        coerce(&mut operand, &result);
        if op == UnaryOp::Plus {
            return Ok((operand.kind, result));
        }
        if let Some(v) = operand.const_value().and_then(|v| fold_unary(op, &result, v)) {
            return Ok((ExprKind::Const(v), result));
        }
        Ok((ExprKind::Unary { op, operand }, result))
    }

    fn attribute_conditional(
        &mut self,
        mut cond: Box<Expr>,
        mut then: Box<Expr>,
        mut otherwise: Box<Expr>,
        pos: Where,
    ) -> Result<(ExprKind, Type)> {
        self.check_condition(&mut cond, "?:")?;
        let tt = self.check_expr(&mut then)?;
        let ot = self.check_expr(&mut otherwise)?;
        if tt.is_error() || ot.is_error() || cond.ty.is_error() {
            return Ok((ExprKind::Error, Type::Error));
        }
        let ty = if tt == ot {
            tt.clone()
        } else if tt.is_numeric() && ot.is_numeric() {
            Type::promote(&tt, &ot)
        } else if tt == Type::Null && ot.is_reference() {
            ot.clone()
        } else if ot == Type::Null && tt.is_reference() {
            tt.clone()
        } else if tt.is_reference() && ot.is_reference() && resolve::is_subtype(self.env, &tt, &ot)? {
            ot.clone()
        } else if tt.is_reference() && ot.is_reference() && resolve::is_subtype(self.env, &ot, &tt)? {
            tt.clone()
        } else {
            self.error(pos, format!("Incompatible type for ?:. Can't convert {} to {}.", ot, tt));
            return Ok((ExprKind::Error, Type::Error));
        };
        coerce(&mut then, &ty);
        coerce(&mut otherwise, &ty);
        if let (Some(ConstValue::Int(c)), true, true) = (cond.const_value(), then.is_const(), otherwise.is_const()) {
            let chosen = if *c != 0 { then } else { otherwise };
            return Ok((chosen.kind, ty));
        }
        Ok((ExprKind::Conditional { cond, then, otherwise }, ty))
    }

    fn attribute_cast(&mut self, te: &TypeExpr, mut expr: Box<Expr>, pos: Where) -> Result<(ExprKind, Type)> {
        let from = self.check_expr(&mut expr)?;
        let ctx = self.ctx()?;
        let target = resolve::resolve_type_expr(self.env, ctx, te)?;
        if from.is_error() || target.is_error() {
            return Ok((ExprKind::Error, Type::Error));
        }
        if !resolve::is_castable(self.env, &from, &target)? {
            self.error(pos, format!("Invalid cast from {} to {}.", from, target));
            return Ok((ExprKind::Error, Type::Error));
        }
        if from.is_primitive() {
            coerce(&mut expr, &target);
            return Ok((expr.kind, target));
        }
        if resolve::is_subtype(self.env, &from, &target)? {
            return Ok((expr.kind, target));
        }
        Ok((ExprKind::Checkcast { expr, target: target.clone() }, target))
    }
}

/// Convert a primitive expression to `to`, folding constants
pub(crate) fn coerce(e: &mut Expr, to: &Type) {
    if e.ty == *to || !e.ty.is_primitive() || !to.is_primitive() || e.ty.is_error() {
        return;
    }
    if let Some(v) = e.const_value() {
        let value = convert_const(v, to);
        e.kind = ExprKind::Const(value);
        e.ty = to.clone();
        return;
    }
    let pos = e.pos;
    let inner = std::mem::replace(e, Expr::error(pos));
    *e = Expr::typed(ExprKind::Convert(Box::new(inner)), pos, to.clone());
}

pub(crate) fn convert_const(v: &ConstValue, to: &Type) -> ConstValue {
    let as_int = |v: &ConstValue| -> i32 {
        match v {
            ConstValue::Int(x) => *x,
            ConstValue::Long(x) => *x as i32,
            other => other.as_f64().map_or(0, |f| f as i32),
        }
    };
    match to {
        Type::Long => ConstValue::Long(match v {
            ConstValue::Int(x) => *x as i64,
            ConstValue::Long(x) => *x,
            other => other.as_f64().map_or(0, |f| f as i64),
        }),
        Type::Float => ConstValue::float(match v {
            ConstValue::Int(x) => *x as f32,
            ConstValue::Long(x) => *x as f32,
            other => other.as_f64().unwrap_or_default() as f32,
        }),
        Type::Double => ConstValue::double(v.as_f64().unwrap_or_default()),
        Type::Byte => ConstValue::Int(as_int(v) as i8 as i32),
        Type::Short => ConstValue::Int(as_int(v) as i16 as i32),
        Type::Char => ConstValue::Int(as_int(v) as u16 as i32),
        Type::Int | Type::Boolean => ConstValue::Int(as_int(v)),
        _ => v.clone(),
    }
}

fn bool_const(b: bool) -> ConstValue {
    ConstValue::Int(b as i32)
}

/// Fold `a op b` with both operands already of type `ty`
pub(crate) fn fold_binary(op: BinaryOp, ty: &Type, a: &ConstValue, b: &ConstValue) -> Option<ConstValue> {
    use BinaryOp::*;
    match (a, b) {
        (ConstValue::Int(x), ConstValue::Int(y)) => {
            let (x, y) = (*x, *y);
            Some(match op {
                Add => ConstValue::Int(x.wrapping_add(y)),
                Sub => ConstValue::Int(x.wrapping_sub(y)),
                Mul => ConstValue::Int(x.wrapping_mul(y)),
                Div if y != 0 => ConstValue::Int(x.wrapping_div(y)),
                Rem if y != 0 => ConstValue::Int(x.wrapping_rem(y)),
                Shl => ConstValue::Int(x.wrapping_shl(y as u32 & 31)),
                Shr => ConstValue::Int(x.wrapping_shr(y as u32 & 31)),
                UShr => ConstValue::Int(((x as u32) >> (y as u32 & 31)) as i32),
                BitAnd | And => ConstValue::Int(x & y),
                BitOr | Or => ConstValue::Int(x | y),
                BitXor => ConstValue::Int(x ^ y),
                Eq => bool_const(x == y),
                Ne => bool_const(x != y),
                Lt => bool_const(x < y),
                Le => bool_const(x <= y),
                Gt => bool_const(x > y),
                Ge => bool_const(x >= y),
                _ => return None,
            })
        }
        (ConstValue::Long(x), ConstValue::Int(y)) if op.is_shift() => {
            let s = *y as u32 & 63;
            Some(match op {
                Shl => ConstValue::Long(x.wrapping_shl(s)),
                Shr => ConstValue::Long(x.wrapping_shr(s)),
                _ => ConstValue::Long(((*x as u64) >> s) as i64),
            })
        }
        (ConstValue::Long(x), ConstValue::Long(y)) => {
            let (x, y) = (*x, *y);
            Some(match op {
                Add => ConstValue::Long(x.wrapping_add(y)),
                Sub => ConstValue::Long(x.wrapping_sub(y)),
                Mul => ConstValue::Long(x.wrapping_mul(y)),
                Div if y != 0 => ConstValue::Long(x.wrapping_div(y)),
                Rem if y != 0 => ConstValue::Long(x.wrapping_rem(y)),
                BitAnd => ConstValue::Long(x & y),
                BitOr => ConstValue::Long(x | y),
                BitXor => ConstValue::Long(x ^ y),
                Eq => bool_const(x == y),
                Ne => bool_const(x != y),
                Lt => bool_const(x < y),
                Le => bool_const(x <= y),
                Gt => bool_const(x > y),
                Ge => bool_const(x >= y),
                _ => return None,
            })
        }
        (ConstValue::Float(_), ConstValue::Float(_)) | (ConstValue::Double(_), ConstValue::Double(_)) => {
            let (x, y) = (a.as_f64()?, b.as_f64()?);
            let arith = |v: f64| {
                if *ty == Type::Float {
                    ConstValue::float(v as f32)
                } else {
                    ConstValue::double(v)
                }
            };
            let (xf, yf) = (x as f32, y as f32);
            Some(match op {
                Add if *ty == Type::Float => ConstValue::float(xf + yf),
                Sub if *ty == Type::Float => ConstValue::float(xf - yf),
                Mul if *ty == Type::Float => ConstValue::float(xf * yf),
                Div if *ty == Type::Float => ConstValue::float(xf / yf),
                Rem if *ty == Type::Float => ConstValue::float(xf % yf),
                Add => arith(x + y),
                Sub => arith(x - y),
                Mul => arith(x * y),
                Div => arith(x / y),
                Rem => arith(x % y),
                Eq => bool_const(x == y),
                Ne => bool_const(x != y),
                Lt => bool_const(x < y),
                Le => bool_const(x <= y),
                Gt => bool_const(x > y),
                Ge => bool_const(x >= y),
                _ => return None,
            })
        }
        _ => None,
    }
}

fn fold_unary(op: UnaryOp, ty: &Type, v: &ConstValue) -> Option<ConstValue> {
    Some(match (op, v) {
        (UnaryOp::Neg, ConstValue::Int(x)) => ConstValue::Int(x.wrapping_neg()),
        (UnaryOp::Neg, ConstValue::Long(x)) => ConstValue::Long(x.wrapping_neg()),
        (UnaryOp::Neg, ConstValue::Float(b)) => ConstValue::float(-f32::from_bits(*b)),
        (UnaryOp::Neg, ConstValue::Double(b)) => ConstValue::double(-f64::from_bits(*b)),
        (UnaryOp::Not, ConstValue::Int(x)) if *ty == Type::Boolean => bool_const(*x == 0),
        (UnaryOp::BitNot, ConstValue::Int(x)) => ConstValue::Int(!x),
        (UnaryOp::BitNot, ConstValue::Long(x)) => ConstValue::Long(!x),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::Config;
    use crate::common::env::BatchEnvironment;
    use crate::symtab::MemberKind;
    use crate::wash::check::check_nest;
    use crate::wash::enter::parse_source;
    use std::path::PathBuf;

    fn checked(text: &str) -> BatchEnvironment {
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
        env
    }

    fn errors(env: &BatchEnvironment) -> String {
        env.diags.all_texts().join("\n")
    }

    fn field_value(env: &BatchEnvironment, class: &str, field: &str) -> Option<ConstValue> {
        let c = env.table.lookup(class).unwrap();
        let f = env.table[c].find_field(field).unwrap();
        env.member(f).constant_value().cloned()
    }

    #[test]
    fn constants_fold_across_fields() {
        let env = checked(
            "class A { static final int K = B.J * 2 + 1; static final String S = \"k=\" + K + 'c'; \
             static final long L = 1L << 40; static final byte NB = (byte) 200; int plain = 3; } \
             class B { static final int J = 20; }",
        );
        assert_eq!(errors(&env), "");
        assert_eq!(field_value(&env, "A", "K"), Some(ConstValue::Int(41)));
        assert_eq!(field_value(&env, "A", "S"), Some(ConstValue::Str("k=41c".to_string())));
        assert_eq!(field_value(&env, "A", "L"), Some(ConstValue::Long(1 << 40)));
        assert_eq!(field_value(&env, "A", "NB"), Some(ConstValue::Int(-56)));
        assert_eq!(field_value(&env, "A", "plain"), None);
    }

    #[test]
    fn cyclic_constants_are_not_constant() {
        let env = checked("class A { static final int X = Y + 1; static final int Y = X + 1; }");
        assert_eq!(errors(&env), "");
        assert_eq!(field_value(&env, "A", "X"), None);
    }

    #[test]
    fn private_access_from_inner_class_makes_one_bridge() {
        let env = checked(
            "class A { private int x; private void m() {} \
             class B { int f() { m(); m(); return x + x; } } }",
        );
        assert_eq!(errors(&env), "");
        let a = env.table.lookup("A").unwrap();
        let bridges: Vec<_> = env.table[a].members.iter().filter(|m| m.name.starts_with("access$")).collect();
        assert_eq!(bridges.len(), 2);
        assert_eq!(env.table[a].access_methods.len(), 2);
    }

    #[test]
    fn locals_are_captured_only_when_final() {
        let env = checked(
            "class A { void m(final int x, int y) { \
               class L { int get() { return x; } } \
               Runnable r = new Runnable() { public void run() { int z = y; } }; } }",
        );
        let errs = errors(&env);
        assert!(errs.contains("Attempt to use a non-final variable y"), "{}", errs);
        let l = env.table.lookup("A$1L").unwrap();
        assert!(env.table[l].find_field("val$x").is_some());
        let ctor = env.table[l].constructors()[0];
        assert_eq!(env.member(ctor).method_type.descriptor(), "(LA;I)V");
        assert_eq!(env.member(ctor).captured_args, 1);
    }

    #[test]
    fn anonymous_class_gets_constructor_from_superclass() {
        let env = checked(
            "class S { S(int a, String b) throws Exception {} } \
             class A { void m() throws Exception { S s = new S(1, \"x\") { }; } }",
        );
        assert_eq!(errors(&env), "");
        let anon = env.table.lookup("A$1").unwrap();
        let ctor = env.table[anon].constructors()[0];
        let m = env.member(ctor);
        assert_eq!(m.method_type.descriptor(), "(LA;ILjava/lang/String;)V");
        assert_eq!(m.exceptions.len(), 1);
        assert!(matches!(m.kind, MemberKind::Constructor { .. }));
    }

    #[test]
    fn method_resolution_picks_most_specific() {
        let env = checked(
            "class A { void f(Object o) {} void f(String s) {} void g(long a, int b) {} void g(int a, long b) {} \
             void m() { f(\"s\"); f(null); f(new Object()); g(1, 2); } }",
        );
        let errs = errors(&env);
        assert!(errs.contains("Reference to g is ambiguous"), "{}", errs);
        assert_eq!(env.diags.error_count(), 1, "{}", errs);
    }

    #[test]
    fn type_errors_are_reported() {
        let env = checked(
            "class A { final int k = 1; void m() { int i = \"s\"; boolean b = 1 + true; k = 2; \
             undefined = 1; String s = (String) new Object(); Integer n = (Integer) \"x\"; } }",
        );
        let errs = errors(&env);
        assert!(errs.contains("Incompatible type for declaration. Can't convert java.lang.String to int."), "{}", errs);
        assert!(errs.contains("Incompatible type for +. Can't convert boolean to int."), "{}", errs);
        assert!(errs.contains("Can't assign a value to a final variable: k"), "{}", errs);
        assert!(errs.contains("Undefined variable: undefined"), "{}", errs);
        assert!(errs.contains("Invalid cast from java.lang.String to java.lang.Integer."), "{}", errs);
    }

    #[test]
    fn class_literals_and_static_context() {
        let env = checked(
            "class A { int f; static Object m() { Object a = int.class; Object b = String.class; return this; } \
             static int n() { return f; } }",
        );
        let errs = errors(&env);
        assert!(errs.contains("Undefined variable: this"), "{}", errs);
        assert!(errs.contains("Can't make a static reference to nonstatic variable f in class A."), "{}", errs);
        let a = env.table.lookup("A").unwrap();
        assert!(env.table[a].find_methods("class$").len() == 1);
        assert!(env.table[a].find_field("class$java$lang$String").is_some());
    }

    #[test]
    fn constructor_calls_must_come_first() {
        let env = checked("class A { A() { int x = 1; this(2); } A(int y) { super(); } void m() { super(); } }");
        let errs = errors(&env);
        assert!(errs.contains("Constructor invocation must be the first thing in a constructor."), "{}", errs);
        assert!(errs.contains("Only constructors can invoke constructors."), "{}", errs);
    }

    #[test]
    fn folding_helpers() {
        assert_eq!(fold_binary(BinaryOp::Div, &Type::Int, &ConstValue::Int(1), &ConstValue::Int(0)), None);
        assert_eq!(
            fold_binary(BinaryOp::Add, &Type::Int, &ConstValue::Int(i32::MAX), &ConstValue::Int(1)),
            Some(ConstValue::Int(i32::MIN))
        );
        assert_eq!(convert_const(&ConstValue::double(3.9), &Type::Int), ConstValue::Int(3));
        assert_eq!(convert_const(&ConstValue::Int(65), &Type::Char), ConstValue::Int(65));
        assert_eq!(convert_const(&ConstValue::Int(70000), &Type::Char), ConstValue::Int(4464));
    }
}
