//! Method bodies to bytecode
//!
//! Works on attributed trees: names are resolved, conversions are explicit
//! and bridges, captured variables and class-literal caches already exist
//! as members. What is left is choosing instructions.
//!
//! Constructors get more than their own statements. Before the superclass
//! constructor runs they store the enclosing instance and the captured
//! values into their synthetic fields; after it, they run the instance
//! field initializers and initializer blocks in declaration order.
//! Captured values arrive as trailing arguments that the attributed frame
//! does not know about, so locals past the declared parameters shift by
//! their width.

use super::attribute::{ExceptionTableEntry, LineNumberEntry, LocalVariableEntry};
use super::code::{Chain, Code};
use super::constpool::ConstantPool;
use super::opcodes::{self, array_types::*, *};
use crate::ast::{BinaryOp, Block, Expr, ExprKind, IncDecOp, InvokeMode, Literal, LocalId, LocalVar, Stmt, StmtKind, UnaryOp};
use crate::common::config::DebugInfo;
use crate::common::consts::*;
use crate::common::env::BatchEnvironment;
use crate::common::error::{Error, Result};
use crate::symtab::{internal_name, AccessKind, ClassId, ConstValue, MemberDefinition, MemberKind, MemberRef, Type};
use crate::wash::lower;

/// Generated body of one method, ready for a Code attribute
#[derive(Debug)]
pub struct MethodCode {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub handlers: Vec<ExceptionTableEntry>,
    pub lines: Vec<LineNumberEntry>,
    pub vars: Vec<LocalVariableEntry>,
    /// The body or one of its jumps does not fit the class format
    pub too_large: bool,
}

/// Code for method or constructor `r`; `None` for abstract and native methods
pub fn method_code(
    env: &BatchEnvironment,
    pool: &mut ConstantPool,
    debug: DebugInfo,
    r: MemberRef,
) -> Result<Option<MethodCode>> {
    let m = env.member(r);
    if m.is_abstract() || m.is_native() {
        return Ok(None);
    }
    let mut gen = Gen::new(env, pool, debug, r.class, m);
    if let Some((target, kind)) = m.access_target {
        gen.gen_bridge(m, target, kind)?;
    } else if m.is_constructor() {
        gen.gen_constructor(m)?;
    } else {
        let body = m.body().ok_or_else(|| Error::internal(format!("method {} has no body", m.describe())))?;
        gen.open_params(m)?;
        gen.gen_block(body)?;
        if gen.code.is_alive() {
            gen.code.emitop(RETURN);
        }
    }
    Ok(Some(gen.finish()))
}

/// Code for `<clinit>`: non-constant static field initializers and static
/// initializer blocks, in declaration order. `None` when there are none.
pub fn class_init_code(
    env: &BatchEnvironment,
    pool: &mut ConstantPool,
    debug: DebugInfo,
    class: ClassId,
) -> Result<Option<MethodCode>> {
    let def = &env.table[class];
    if !def.members.iter().any(needs_class_init) {
        return Ok(None);
    }
    let mut gen = Gen::bare(env, pool, debug, class);
    for r in def.member_refs() {
        let m = env.member(r);
        if !m.is_static() || !needs_class_init(m) {
            continue;
        }
        match &m.kind {
            MemberKind::Field { init: Some(init), .. } => {
                gen.code.stat_begin(m.pos.line());
                gen.gen_expr(init)?;
                gen.field_insn(PUTSTATIC, r)?;
            }
            MemberKind::Initializer { body: Some(body) } => gen.gen_initializer(m, body, 0)?,
            _ => {}
        }
    }
    gen.code.emitop(RETURN);
    Ok(Some(gen.finish()))
}

/// Static members that contribute to `<clinit>`; constant fields are
/// written as ConstantValue attributes instead
fn needs_class_init(m: &MemberDefinition) -> bool {
    if !m.is_static() {
        return false;
    }
    match &m.kind {
        MemberKind::Field { init: Some(_), value, .. } => !(value.is_some() && m.is_final()),
        MemberKind::Initializer { body: Some(_) } => true,
        _ => false,
    }
}

/// Offset of a type within the int, long, float, double, reference
/// opcode families
fn type_code(ty: &Type) -> u8 {
    match ty {
        Type::Long => 1,
        Type::Float => 2,
        Type::Double => 3,
        t if t.is_reference() => 4,
        _ => 0,
    }
}

fn array_load_op(elem: &Type) -> u8 {
    match elem {
        Type::Boolean | Type::Byte => BALOAD,
        Type::Char => CALOAD,
        Type::Short => SALOAD,
        t => IALOAD + type_code(t),
    }
}

fn array_store_op(elem: &Type) -> u8 {
    match elem {
        Type::Boolean | Type::Byte => BASTORE,
        Type::Char => CASTORE,
        Type::Short => SASTORE,
        t => IASTORE + type_code(t),
    }
}

fn dup_op(width: u16) -> u8 {
    if width == 2 {
        DUP2
    } else {
        DUP
    }
}

/// Duplicate a value of `width` below one stack slot
fn dup_x1_op(width: u16) -> u8 {
    if width == 2 {
        DUP2_X1
    } else {
        DUP_X1
    }
}

/// Duplicate a value of `width` below two stack slots
fn dup_x2_op(width: u16) -> u8 {
    if width == 2 {
        DUP2_X2
    } else {
        DUP_X2
    }
}

fn pop_op(width: u16) -> u8 {
    if width == 2 {
        POP2
    } else {
        POP
    }
}

/// `ifeq`-family branch taken when `op` holds
fn if_op(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Eq => IFEQ,
        BinaryOp::Ne => IFNE,
        BinaryOp::Lt => IFLT,
        BinaryOp::Ge => IFGE,
        BinaryOp::Gt => IFGT,
        _ => IFLE,
    }
}

fn arith_op(op: BinaryOp, ty: &Type) -> Result<u8> {
    let t = type_code(ty);
    let base = match op {
        BinaryOp::Add => IADD,
        BinaryOp::Sub => ISUB,
        BinaryOp::Mul => IMUL,
        BinaryOp::Div => IDIV,
        BinaryOp::Rem => IREM,
        BinaryOp::Shl => return Ok(ISHL + t.min(1)),
        BinaryOp::Shr => return Ok(ISHR + t.min(1)),
        BinaryOp::UShr => return Ok(IUSHR + t.min(1)),
        BinaryOp::BitAnd => return Ok(IAND + t.min(1)),
        BinaryOp::BitOr => return Ok(IOR + t.min(1)),
        BinaryOp::BitXor => return Ok(IXOR + t.min(1)),
        other => return Err(Error::internal(format!("{} is not an arithmetic operator", other.symbol()))),
    };
    Ok(base + t)
}

fn newarray_code(elem: &Type) -> Option<u8> {
    match elem {
        Type::Boolean => Some(T_BOOLEAN),
        Type::Char => Some(T_CHAR),
        Type::Float => Some(T_FLOAT),
        Type::Double => Some(T_DOUBLE),
        Type::Byte => Some(T_BYTE),
        Type::Short => Some(T_SHORT),
        Type::Int => Some(T_INT),
        Type::Long => Some(T_LONG),
        _ => None,
    }
}

/// Argument descriptor of the `StringBuffer.append` overload for `ty`
fn append_arg(ty: &Type) -> String {
    match ty {
        Type::Boolean => "Z".to_string(),
        Type::Char => "C".to_string(),
        Type::Byte | Type::Short | Type::Int => "I".to_string(),
        Type::Long => "J".to_string(),
        Type::Float => "F".to_string(),
        Type::Double => "D".to_string(),
        t if t.is_string() => t.descriptor(),
        _ => Type::class(JAVA_LANG_OBJECT).descriptor(),
    }
}

/// Where a local's attributed slot lands in the emitted frame
#[derive(Debug, Clone, Copy, Default)]
struct SlotMap {
    /// First slot after the declared parameters
    base: u16,
    /// Width of the captured arguments inserted at `base`
    shift: u16,
    /// Initializer bodies inlined into a constructor: slot `from` moves to `to`
    relocate: Option<(u16, u16)>,
}

impl SlotMap {
    fn map(&self, slot: u16) -> u16 {
        if let Some((from, to)) = self.relocate {
            return slot.saturating_sub(from) + to;
        }
        if self.shift > 0 && slot >= self.base {
            slot + self.shift
        } else {
            slot
        }
    }
}

/// Constructor arguments that have no local of their own
#[derive(Debug, Default)]
struct CtorArgs {
    outer: Option<u16>,
    captured: Vec<(MemberRef, u16, Type)>,
}

#[derive(Debug, Default)]
struct Jumps {
    breaks: Option<Chain>,
    continues: Option<Chain>,
}

struct Gen<'a> {
    env: &'a BatchEnvironment,
    pool: &'a mut ConstantPool,
    class: ClassId,
    debug: DebugInfo,
    code: Code,
    is_static: bool,
    ret: Type,
    locals: &'a [LocalVar],
    slots: SlotMap,
    /// Visible locals per scope, with the pc where each became live
    scopes: Vec<Vec<(LocalId, usize)>>,
    loops: Vec<Jumps>,
    ctor_args: Option<CtorArgs>,
}

impl<'a> Gen<'a> {
    fn new(
        env: &'a BatchEnvironment,
        pool: &'a mut ConstantPool,
        debug: DebugInfo,
        class: ClassId,
        m: &'a MemberDefinition,
    ) -> Self {
        Self {
            env,
            pool,
            class,
            debug,
            code: Code::new(m.max_locals, debug.lines),
            is_static: m.is_static(),
            ret: m.method_type.ret.clone(),
            locals: &m.locals,
            slots: SlotMap::default(),
            scopes: Vec::new(),
            loops: Vec::new(),
            ctor_args: None,
        }
    }

    /// A static void body without locals of its own
    fn bare(env: &'a BatchEnvironment, pool: &'a mut ConstantPool, debug: DebugInfo, class: ClassId) -> Self {
        Self {
            env,
            pool,
            class,
            debug,
            code: Code::new(0, debug.lines),
            is_static: true,
            ret: Type::Void,
            locals: &[],
            slots: SlotMap::default(),
            scopes: Vec::new(),
            loops: Vec::new(),
            ctor_args: None,
        }
    }

    fn finish(mut self) -> MethodCode {
        while !self.scopes.is_empty() {
            self.close_scope();
        }
        if self.debug.vars && !self.is_static {
            let end = self.code.cp();
            let ty = self.env.table[self.class].ty();
            self.add_var_entry("this", &ty, 0, 0, end);
        }
        let (max_stack, max_locals, too_large) = (self.code.max_stack(), self.code.max_locals(), self.code.is_too_large());
        let (code, handlers, lines, vars) = self.code.into_parts();
        MethodCode { max_stack, max_locals, code, handlers, lines, vars, too_large }
    }

    // Locals

    fn local(&self, id: LocalId) -> Result<(u16, &'a LocalVar)> {
        let locals = self.locals;
        let var = locals.get(id.0 as usize).ok_or_else(|| Error::internal(format!("unknown local #{}", id.0)))?;
        Ok((self.slots.map(var.slot), var))
    }

    fn open_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    fn close_scope(&mut self) {
        let Some(scope) = self.scopes.pop() else { return };
        if !self.debug.vars {
            return;
        }
        let end = self.code.cp();
        for (id, start) in scope {
            let Ok((slot, var)) = self.local(id) else { continue };
            if !var.synthetic {
                self.add_var_entry(&var.name, &var.ty, slot, start, end);
            }
        }
    }

    fn add_var_entry(&mut self, name: &str, ty: &Type, slot: u16, start: usize, end: usize) {
        let name_index = self.pool.add_utf8(name);
        let descriptor_index = self.pool.add_utf8(&ty.descriptor());
        self.code.add_local_var(LocalVariableEntry {
            start_pc: start as u16,
            length: end.saturating_sub(start) as u16,
            name_index,
            descriptor_index,
            index: slot,
        });
    }

    /// Make `id` visible from here to the end of the innermost scope
    fn declare(&mut self, id: LocalId) -> Result<()> {
        let (slot, var) = self.local(id)?;
        self.code.reserve_local(slot, var.ty.width());
        let pc = self.code.cp();
        if let Some(scope) = self.scopes.last_mut() {
            scope.push((id, pc));
        }
        Ok(())
    }

    /// The innermost visible local called `name`
    fn visible(&self, name: &str) -> Option<LocalId> {
        let locals = self.locals;
        self.scopes
            .iter()
            .rev()
            .flat_map(|s| s.iter().rev())
            .map(|(id, _)| *id)
            .find(|id| locals.get(id.0 as usize).map_or(false, |v| v.name == name && !v.synthetic))
    }

    fn open_params(&mut self, m: &MemberDefinition) -> Result<()> {
        self.open_scope();
        let count = m.params().len() + usize::from(m.outer_this_arg);
        for i in 0..count.min(self.locals.len()) {
            self.declare(LocalId(i as u32))?;
        }
        Ok(())
    }

    fn load_slot(&mut self, ty: &Type, slot: u16) {
        self.code.emit_local(ILOAD + type_code(ty), slot);
    }

    fn store_slot(&mut self, ty: &Type, slot: u16) {
        self.code.emit_local(ISTORE + type_code(ty), slot);
    }

    fn emit_return(&mut self, ty: &Type) {
        if ty.is_void() {
            self.code.emitop(RETURN);
        } else {
            self.code.emitop(IRETURN + type_code(ty));
        }
    }

    // Pool references

    fn owner_name(&self, class: ClassId) -> String {
        internal_name(&self.env.table[class].name)
    }

    fn class_index(&mut self, ty: &Type) -> u16 {
        self.pool.add_class(&ty.class_constant_name())
    }

    /// A field instruction on `field`, with its stack effect
    fn field_insn(&mut self, op: u8, field: MemberRef) -> Result<()> {
        let env = self.env;
        let m = env.member(field);
        if !m.is_field() {
            return Err(Error::internal(format!("{} is not a field", m.describe())));
        }
        let width = m.ty.width() as i16;
        let delta = match op {
            GETSTATIC => width,
            PUTSTATIC => -width,
            GETFIELD => width - 1,
            _ => -width - 1,
        };
        let owner = self.owner_name(field.class);
        let index = self.pool.add_field_ref(&owner, &m.name, &m.ty.descriptor());
        self.code.emitop2_with_effect(op, index, delta);
        Ok(())
    }

    fn invoke_member(&mut self, op: u8, method: MemberRef) -> Result<()> {
        let env = self.env;
        let m = env.member(method);
        if !m.is_invocable() {
            return Err(Error::internal(format!("{} is not a method", m.describe())));
        }
        let owner = self.owner_name(method.class);
        self.invoke_raw(op, &owner, &m.name, &m.method_type.descriptor(), m.method_type.arg_slots(), m.method_type.ret.width())
    }

    fn invoke_raw(&mut self, op: u8, owner: &str, name: &str, desc: &str, arg_slots: u16, ret_width: u16) -> Result<()> {
        let receiver = i16::from(op != INVOKESTATIC);
        let delta = ret_width as i16 - arg_slots as i16 - receiver;
        if op == INVOKEINTERFACE {
            let index = self.pool.add_interface_method_ref(owner, name, desc);
            self.code.emit_invokeinterface(index, arg_slots, delta);
        } else {
            let index = self.pool.add_method_ref(owner, name, desc);
            self.code.emitop2_with_effect(op, index, delta);
        }
        Ok(())
    }

    fn needs_bridge(&self, member: MemberRef) -> bool {
        lower::needs_bridge(self.env, self.class, member)
    }

    fn bridge(&self, member: MemberRef, kind: AccessKind) -> Result<MemberRef> {
        let host = lower::bridge_host(self.env, self.class, member).unwrap_or(member.class);
        self.env.table[host].access_methods.get(&(member, kind)).copied().ok_or_else(|| {
            Error::internal(format!("no {:?} accessor for {}", kind, self.env.member(member).describe()))
        })
    }

    fn ldc(&mut self, value: &ConstValue) {
        let index = self.pool.add_value(value);
        match value {
            ConstValue::Long(_) | ConstValue::Double(_) => self.code.emitop2(LDC2_W, index),
            _ if index <= 255 => self.code.emitop1(LDC, index as u8),
            _ => self.code.emitop2(LDC_W, index),
        }
    }

    // Special bodies

    fn gen_bridge(&mut self, bridge: &MemberDefinition, target: MemberRef, kind: AccessKind) -> Result<()> {
        let env = self.env;
        let t = env.member(target);
        let args = &bridge.method_type.args;
        if kind == AccessKind::Construct {
            self.code.reserve_local(0, 1 + bridge.method_type.arg_slots());
            self.code.emit_local(ALOAD, 0);
            let marker = args.len().saturating_sub(bridge.captured_args + 1);
            let mut slot = 1;
            for (i, ty) in args.iter().enumerate() {
                if i != marker {
                    self.load_slot(ty, slot);
                }
                slot += ty.width();
            }
            self.invoke_member(INVOKESPECIAL, target)?;
            self.code.emitop(RETURN);
            return Ok(());
        }

        self.code.reserve_local(0, bridge.method_type.arg_slots());
        let mut slot = 0;
        for ty in args {
            self.load_slot(ty, slot);
            slot += ty.width();
        }
        match kind {
            AccessKind::Get => self.field_insn(if t.is_static() { GETSTATIC } else { GETFIELD }, target)?,
            AccessKind::Set => {
                let width = t.ty.width();
                if t.is_static() {
                    self.code.emitop(dup_op(width));
                    self.field_insn(PUTSTATIC, target)?;
                } else {
                    self.code.emitop(dup_x1_op(width));
                    self.field_insn(PUTFIELD, target)?;
                }
            }
            _ if t.is_static() => self.invoke_member(INVOKESTATIC, target)?,
            _ if t.is_private() => self.invoke_member(INVOKESPECIAL, target)?,
            _ => self.invoke_member(INVOKEVIRTUAL, target)?,
        }
        let ret = bridge.method_type.ret.clone();
        self.emit_return(&ret);
        Ok(())
    }

    fn gen_constructor(&mut self, m: &'a MemberDefinition) -> Result<()> {
        let env = self.env;
        let def = &env.table[self.class];
        let body = m.body().ok_or_else(|| Error::internal(format!("constructor {} has no body", m.describe())))?;

        let declared: u16 = m.declared_args().iter().map(Type::width).sum();
        let base = 1 + u16::from(m.outer_this_arg) + declared;
        let mut args = CtorArgs { outer: m.outer_this_arg.then_some(1), captured: Vec::new() };
        let mut slot = base;
        for c in def.captured.iter().take(m.captured_args) {
            args.captured.push((MemberRef::new(self.class, c.field as usize), slot, c.ty.clone()));
            slot += c.ty.width();
        }
        let shift = slot - base;
        self.slots = SlotMap { base, shift, relocate: None };
        self.code.reserve_local(0, m.max_locals.max(base) + shift);
        self.ctor_args = Some(args);
        self.open_params(m)?;

        let calls_this = matches!(
            body.stmts.first(),
            Some(Stmt { kind: StmtKind::Expr(Expr { kind: ExprKind::Init { is_super: false, .. }, .. }), .. })
        );
        let calls_super = matches!(
            body.stmts.first(),
            Some(Stmt { kind: StmtKind::Expr(Expr { kind: ExprKind::Init { is_super: true, .. }, .. }), .. })
        );
        if !calls_this {
            self.store_ctor_args()?;
        }
        let mut stmts = body.stmts.iter();
        if calls_this || calls_super {
            if let Some(first) = stmts.next() {
                self.gen_stmt(first)?;
            }
        }
        if !calls_this {
            let frame_end = self.code.max_locals();
            self.gen_instance_inits(frame_end)?;
        }
        self.open_scope();
        for stmt in stmts {
            self.gen_stmt(stmt)?;
        }
        self.close_scope();
        if self.code.is_alive() {
            self.code.emitop(RETURN);
        }
        Ok(())
    }

    /// Copy the enclosing instance and the captured values into their fields
    fn store_ctor_args(&mut self) -> Result<()> {
        let env = self.env;
        let def = &env.table[self.class];
        let Some(args) = self.ctor_args.take() else { return Ok(()) };
        if let (Some(index), Some(slot)) = (def.outer_this_field, args.outer) {
            self.code.emit_local(ALOAD, 0);
            self.code.emit_local(ALOAD, slot);
            self.field_insn(PUTFIELD, MemberRef::new(self.class, index as usize))?;
        }
        for (field, slot, ty) in &args.captured {
            self.code.emit_local(ALOAD, 0);
            self.load_slot(ty, *slot);
            self.field_insn(PUTFIELD, *field)?;
        }
        self.ctor_args = Some(args);
        Ok(())
    }

    fn gen_instance_inits(&mut self, frame_end: u16) -> Result<()> {
        let env = self.env;
        let def = &env.table[self.class];
        for r in def.member_refs() {
            let m = env.member(r);
            if m.is_static() {
                continue;
            }
            match &m.kind {
                MemberKind::Field { init: Some(init), .. } => {
                    self.code.stat_begin(m.pos.line());
                    self.code.emit_local(ALOAD, 0);
                    self.gen_expr(init)?;
                    self.field_insn(PUTFIELD, r)?;
                }
                MemberKind::Initializer { body: Some(body) } => self.gen_initializer(m, body, frame_end)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// An initializer block, its locals moved to start at `first_slot`
    fn gen_initializer(&mut self, m: &'a MemberDefinition, body: &'a Block, first_slot: u16) -> Result<()> {
        let saved = (self.locals, self.slots);
        let from = u16::from(!m.is_static());
        self.locals = &m.locals;
        self.slots = SlotMap { base: 0, shift: 0, relocate: Some((from, first_slot)) };
        self.code.reserve_local(0, m.max_locals.saturating_sub(from) + first_slot);
        let result = self.gen_block(body);
        (self.locals, self.slots) = saved;
        result
    }

    // Statements

    fn gen_block(&mut self, block: &Block) -> Result<()> {
        self.open_scope();
        for stmt in &block.stmts {
            self.gen_stmt(stmt)?;
        }
        self.close_scope();
        Ok(())
    }

    fn gen_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        self.code.stat_begin(stmt.pos.line());
        match &stmt.kind {
            StmtKind::Block(block) => self.gen_block(block)?,
            StmtKind::LocalVar { vars, .. } => {
                for var in vars {
                    let Some(id) = var.local else { continue };
                    if let Some(init) = &var.init {
                        self.gen_expr(init)?;
                        let (slot, local) = self.local(id)?;
                        self.store_slot(&local.ty, slot);
                    }
                    self.declare(id)?;
                }
            }
            StmtKind::LocalClass(_) | StmtKind::Empty => {}
            StmtKind::Expr(e) => self.gen_effect(e)?,
            StmtKind::If { cond, then, otherwise } => {
                let skip = self.gen_cond(cond, false)?;
                self.gen_stmt(then)?;
                match otherwise {
                    Some(otherwise) => {
                        let exit = self.code.branch(GOTO);
                        self.code.resolve(skip);
                        self.gen_stmt(otherwise)?;
                        self.code.resolve(exit);
                    }
                    None => self.code.resolve(skip),
                }
            }
            StmtKind::While { cond, body } => {
                let start = self.code.cp();
                let exit = self.gen_cond(cond, false)?;
                let jumps = self.gen_loop_body(body)?;
                self.code.resolve(jumps.continues);
                self.code.jump_back(GOTO, start);
                self.code.resolve(Chain::merge(exit, jumps.breaks));
            }
            StmtKind::For { init, cond, update, body } => {
                self.open_scope();
                for s in init {
                    self.gen_stmt(s)?;
                }
                let start = self.code.cp();
                let exit = match cond {
                    Some(cond) => self.gen_cond(cond, false)?,
                    None => None,
                };
                let jumps = self.gen_loop_body(body)?;
                self.code.resolve(jumps.continues);
                for u in update {
                    self.gen_effect(u)?;
                }
                self.code.jump_back(GOTO, start);
                self.code.resolve(Chain::merge(exit, jumps.breaks));
                self.close_scope();
            }
            StmtKind::Break | StmtKind::Continue => {
                let jump = self.code.branch(GOTO);
                let is_break = matches!(stmt.kind, StmtKind::Break);
                let jumps = self.loops.last_mut().ok_or_else(|| Error::internal("jump outside a loop"))?;
                let chain = if is_break { &mut jumps.breaks } else { &mut jumps.continues };
                *chain = Chain::merge(chain.take(), jump);
            }
            StmtKind::Return(value) => match value {
                Some(e) => {
                    self.gen_expr(e)?;
                    let ret = self.ret.clone();
                    self.emit_return(&ret);
                }
                None => self.code.emitop(RETURN),
            },
            StmtKind::Throw(e) => {
                self.gen_expr(e)?;
                self.code.emitop(ATHROW);
            }
            StmtKind::Try { body, catches } => {
                let start = self.code.cp();
                self.gen_block(body)?;
                let end = self.code.cp();
                let mut exit = self.code.branch(GOTO);
                if start != end {
                    for catch in catches {
                        let class = catch.class.ok_or_else(|| Error::internal("unresolved catch type"))?;
                        let catch_ty = self.env.table[class].ty();
                        let catch_type = self.class_index(&catch_ty);
                        let handler = self.code.entry_point(1);
                        self.code.add_exception_handler(start, end, handler, catch_type);
                        self.open_scope();
                        if let Some(id) = catch.local {
                            let (slot, local) = self.local(id)?;
                            self.store_slot(&local.ty, slot);
                            self.declare(id)?;
                        } else {
                            self.code.emitop(POP);
                        }
                        self.gen_block(&catch.body)?;
                        self.close_scope();
                        exit = Chain::merge(exit, self.code.branch(GOTO));
                    }
                }
                self.code.resolve(exit);
            }
        }
        Ok(())
    }

    fn gen_loop_body(&mut self, body: &Stmt) -> Result<Jumps> {
        self.loops.push(Jumps::default());
        let result = self.gen_stmt(body);
        let jumps = self.loops.pop().unwrap_or_default();
        result.map(|_| jumps)
    }

    /// Evaluate `e` for its side effects only
    fn gen_effect(&mut self, e: &Expr) -> Result<()> {
        match &e.kind {
            ExprKind::Assign { op, lhs, rhs } => self.gen_assign(*op, lhs, rhs, false),
            ExprKind::IncDec { op, operand } => self.gen_incdec(*op, operand, false),
            _ => {
                self.gen_expr(e)?;
                let width = e.ty.width();
                if width > 0 {
                    self.code.emitop(pop_op(width));
                }
                Ok(())
            }
        }
    }

    // Conditions

    /// Jump when `e` evaluates to `jump_if`, fall through otherwise
    fn gen_cond(&mut self, e: &Expr, jump_if: bool) -> Result<Option<Chain>> {
        match &e.kind {
            ExprKind::Const(ConstValue::Int(v)) => {
                Ok(if (*v != 0) == jump_if { self.code.branch(GOTO) } else { None })
            }
            ExprKind::Unary { op: UnaryOp::Not, operand } => self.gen_cond(operand, !jump_if),
            ExprKind::Binary { op: BinaryOp::And, lhs, rhs } => {
                if jump_if {
                    let skip = self.gen_cond(lhs, false)?;
                    let taken = self.gen_cond(rhs, true)?;
                    self.code.resolve(skip);
                    Ok(taken)
                } else {
                    let first = self.gen_cond(lhs, false)?;
                    let second = self.gen_cond(rhs, false)?;
                    Ok(Chain::merge(first, second))
                }
            }
            ExprKind::Binary { op: BinaryOp::Or, lhs, rhs } => {
                if jump_if {
                    let first = self.gen_cond(lhs, true)?;
                    let second = self.gen_cond(rhs, true)?;
                    Ok(Chain::merge(first, second))
                } else {
                    let skip = self.gen_cond(lhs, true)?;
                    let taken = self.gen_cond(rhs, false)?;
                    self.code.resolve(skip);
                    Ok(taken)
                }
            }
            ExprKind::Binary { op, lhs, rhs } if op.is_comparison() => self.gen_compare(*op, lhs, rhs, jump_if),
            _ => {
                self.gen_expr(e)?;
                Ok(self.code.branch(if jump_if { IFNE } else { IFEQ }))
            }
        }
    }

    fn gen_compare(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, jump_if: bool) -> Result<Option<Chain>> {
        let is_null = |e: &Expr| matches!(e.kind, ExprKind::Literal(Literal::Null));
        let is_zero = |e: &Expr| matches!(e.kind, ExprKind::Const(ConstValue::Int(0)));
        let jump = if lhs.ty.is_reference() || rhs.ty.is_reference() {
            let eq = op == BinaryOp::Eq;
            if is_null(rhs) || is_null(lhs) {
                let value = if is_null(rhs) { lhs } else { rhs };
                self.gen_expr(value)?;
                if eq {
                    IFNULL
                } else {
                    IFNONNULL
                }
            } else {
                self.gen_expr(lhs)?;
                self.gen_expr(rhs)?;
                if eq {
                    IF_ACMPEQ
                } else {
                    IF_ACMPNE
                }
            }
        } else {
            match &lhs.ty {
                Type::Long | Type::Float | Type::Double => {
                    self.gen_expr(lhs)?;
                    self.gen_expr(rhs)?;
                    // NaN must make every ordered comparison false
                    let nan_high = matches!(op, BinaryOp::Lt | BinaryOp::Le);
                    let cmp = match (&lhs.ty, nan_high) {
                        (Type::Long, _) => LCMP,
                        (Type::Float, true) => FCMPG,
                        (Type::Float, false) => FCMPL,
                        (_, true) => DCMPG,
                        (_, false) => DCMPL,
                    };
                    self.code.emitop(cmp);
                    if_op(op)
                }
                _ if is_zero(rhs) => {
                    self.gen_expr(lhs)?;
                    if_op(op)
                }
                _ => {
                    self.gen_expr(lhs)?;
                    self.gen_expr(rhs)?;
                    if_op(op) + (IF_ICMPEQ - IFEQ)
                }
            }
        };
        let jump = if jump_if { jump } else { opcodes::negate(jump) };
        Ok(self.code.branch(jump))
    }

    /// A boolean-valued condition as 0 or 1 on the stack
    fn gen_cond_value(&mut self, e: &Expr) -> Result<()> {
        let when_false = self.gen_cond(e, false)?;
        self.code.emit_int(1);
        let end = self.code.branch(GOTO);
        self.code.resolve(when_false);
        self.code.emit_int(0);
        self.code.resolve(end);
        Ok(())
    }

    // Expressions

    fn gen_expr(&mut self, e: &Expr) -> Result<()> {
        match &e.kind {
            ExprKind::Const(value) => self.gen_const(value),
            ExprKind::Literal(Literal::Null) => self.code.emitop(ACONST_NULL),
            ExprKind::Local(id) => {
                let (slot, var) = self.local(*id)?;
                self.load_slot(&var.ty, slot);
            }
            ExprKind::This => self.code.emit_local(ALOAD, 0),
            ExprKind::OuterThis(target) => self.gen_outer_this(*target)?,
            ExprKind::Field { target, field } => self.gen_field_read(target.as_deref(), *field)?,
            ExprKind::Invoke { target, method, args, mode } => self.gen_invoke(target.as_deref(), *method, args, *mode)?,
            ExprKind::NewInstance { class, ctor, outer, args, marker } => {
                let owner = self.owner_name(*class);
                let index = self.pool.add_class(&owner);
                self.code.emitop2(NEW, index);
                self.code.emitop(DUP);
                self.gen_ctor_args(*ctor, outer.as_deref(), args, *marker, false)?;
                self.invoke_member(INVOKESPECIAL, *ctor)?;
            }
            ExprKind::Init { ctor, is_super, outer, args, marker } => {
                self.code.emit_local(ALOAD, 0);
                self.gen_ctor_args(*ctor, outer.as_deref(), args, *marker, !*is_super)?;
                self.invoke_member(INVOKESPECIAL, *ctor)?;
            }
            ExprKind::Convert(inner) => {
                self.gen_expr(inner)?;
                self.convert(&inner.ty, &e.ty);
            }
            ExprKind::ArrayLength(array) => {
                self.gen_expr(array)?;
                self.code.emitop(ARRAYLENGTH);
            }
            ExprKind::NewArrayOf { len } => {
                self.gen_expr(len)?;
                let elem = e.ty.element().ok_or_else(|| Error::internal("array creation of a non-array type"))?;
                match newarray_code(elem) {
                    Some(code) => self.code.emitop1(NEWARRAY, code),
                    None => {
                        let index = self.class_index(elem);
                        self.code.emitop2(ANEWARRAY, index);
                    }
                }
            }
            ExprKind::ArrayElem { array, index } => {
                self.gen_expr(array)?;
                self.gen_expr(index)?;
                self.code.emitop(array_load_op(&e.ty));
            }
            ExprKind::Concat(parts) => self.gen_concat(parts)?,
            ExprKind::ClassLookup { cache, helper, name } => {
                self.field_insn(GETSTATIC, *cache)?;
                self.code.emitop(DUP);
                let cached = self.code.branch(IFNONNULL);
                self.code.emitop(POP);
                self.ldc(&ConstValue::Str(name.clone()));
                self.invoke_member(INVOKESTATIC, *helper)?;
                self.code.emitop(DUP);
                self.field_insn(PUTSTATIC, *cache)?;
                self.code.resolve(cached);
            }
            ExprKind::Checkcast { expr, target } => {
                self.gen_expr(expr)?;
                let index = self.class_index(target);
                self.code.emitop2(CHECKCAST, index);
            }
            ExprKind::InstanceTest { expr, target } => {
                self.gen_expr(expr)?;
                let index = self.class_index(target);
                self.code.emitop2(INSTANCEOF, index);
            }
            ExprKind::Assign { op, lhs, rhs } => self.gen_assign(*op, lhs, rhs, true)?,
            ExprKind::IncDec { op, operand } => self.gen_incdec(*op, operand, true)?,
            ExprKind::Binary { op, .. } if op.is_comparison() || matches!(op, BinaryOp::And | BinaryOp::Or) => {
                self.gen_cond_value(e)?
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.gen_expr(lhs)?;
                self.gen_expr(rhs)?;
                self.code.emitop(arith_op(*op, &e.ty)?);
            }
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Plus => self.gen_expr(operand)?,
                UnaryOp::Neg => {
                    self.gen_expr(operand)?;
                    self.code.emitop(INEG + type_code(&e.ty));
                }
                UnaryOp::BitNot => {
                    self.gen_expr(operand)?;
                    if e.ty == Type::Long {
                        self.ldc(&ConstValue::Long(-1));
                        self.code.emitop(LXOR);
                    } else {
                        self.code.emitop(ICONST_M1);
                        self.code.emitop(IXOR);
                    }
                }
                UnaryOp::Not => self.gen_cond_value(e)?,
            },
            ExprKind::Conditional { cond, then, otherwise } => {
                let when_false = self.gen_cond(cond, false)?;
                self.gen_expr(then)?;
                let end = self.code.branch(GOTO);
                self.code.resolve(when_false);
                self.gen_expr(otherwise)?;
                self.code.resolve(end);
            }
            _ => return Err(Error::internal(format!("unexpected expression in code generation: {:?}", e.kind))),
        }
        Ok(())
    }

    fn gen_const(&mut self, value: &ConstValue) {
        match value {
            ConstValue::Int(v) => {
                if !self.code.emit_int(*v) {
                    self.ldc(value);
                }
            }
            ConstValue::Long(v @ (0 | 1)) => self.code.emitop(LCONST_0 + *v as u8),
            ConstValue::Float(bits) => {
                let v = f32::from_bits(*bits);
                if *bits == 0.0f32.to_bits() || v == 1.0 || v == 2.0 {
                    self.code.emitop(FCONST_0 + v as u8);
                } else {
                    self.ldc(value);
                }
            }
            ConstValue::Double(bits) => {
                let v = f64::from_bits(*bits);
                if *bits == 0.0f64.to_bits() || v == 1.0 {
                    self.code.emitop(DCONST_0 + v as u8);
                } else {
                    self.ldc(value);
                }
            }
            _ => self.ldc(value),
        }
    }

    fn convert(&mut self, from: &Type, to: &Type) {
        if from == to || !from.is_primitive() || !to.is_primitive() {
            return;
        }
        let op = match (type_code(from), type_code(to)) {
            (0, 1) => Some(I2L),
            (0, 2) => Some(I2F),
            (0, 3) => Some(I2D),
            (1, 0) => Some(L2I),
            (1, 2) => Some(L2F),
            (1, 3) => Some(L2D),
            (2, 0) => Some(F2I),
            (2, 1) => Some(F2L),
            (2, 3) => Some(F2D),
            (3, 0) => Some(D2I),
            (3, 1) => Some(D2L),
            (3, 2) => Some(D2F),
            _ => None,
        };
        if let Some(op) = op {
            self.code.emitop(op);
        }
        if !from.widens_to(to) {
            match to {
                Type::Byte => self.code.emitop(I2B),
                Type::Char => self.code.emitop(I2C),
                Type::Short => self.code.emitop(I2S),
                _ => {}
            }
        }
    }

    /// Evaluate the qualifier of a static member for its side effects
    fn gen_discarded_target(&mut self, target: Option<&Expr>) -> Result<()> {
        let Some(t) = target else { return Ok(()) };
        if matches!(t.kind, ExprKind::This | ExprKind::OuterThis(_) | ExprKind::TypeRef(_) | ExprKind::PackageRef(_)) {
            return Ok(());
        }
        self.gen_expr(t)?;
        let width = t.ty.width();
        if width > 0 {
            self.code.emitop(pop_op(width));
        }
        Ok(())
    }

    fn gen_receiver(&mut self, target: Option<&Expr>) -> Result<()> {
        match target {
            Some(t) => self.gen_expr(t),
            None => {
                self.code.emit_local(ALOAD, 0);
                Ok(())
            }
        }
    }

    /// Constructor argument slot holding the value of `field`
    fn ctor_arg_slot(&self, field: MemberRef) -> Option<(u16, Type)> {
        let args = self.ctor_args.as_ref()?;
        args.captured.iter().find(|(f, ..)| *f == field).map(|(_, slot, ty)| (*slot, ty.clone()))
    }

    fn gen_field_read(&mut self, target: Option<&Expr>, field: MemberRef) -> Result<()> {
        let own_target = target.map_or(true, |t| matches!(t.kind, ExprKind::This));
        if own_target {
            if let Some((slot, ty)) = self.ctor_arg_slot(field) {
                self.load_slot(&ty, slot);
                return Ok(());
            }
        }
        let is_static = self.env.member(field).is_static();
        if is_static {
            self.gen_discarded_target(target)?;
        } else {
            self.gen_receiver(target)?;
        }
        if self.needs_bridge(field) {
            let bridge = self.bridge(field, AccessKind::Get)?;
            self.invoke_member(INVOKESTATIC, bridge)
        } else {
            self.field_insn(if is_static { GETSTATIC } else { GETFIELD }, field)
        }
    }

    fn gen_invoke(&mut self, target: Option<&Expr>, method: MemberRef, args: &[Expr], mode: InvokeMode) -> Result<()> {
        let op = match mode {
            InvokeMode::Static => INVOKESTATIC,
            InvokeMode::Virtual => INVOKEVIRTUAL,
            InvokeMode::Interface => INVOKEINTERFACE,
            InvokeMode::Special => INVOKESPECIAL,
        };
        if mode == InvokeMode::Static {
            self.gen_discarded_target(target)?;
        } else {
            self.gen_receiver(target)?;
        }
        for arg in args {
            self.gen_expr(arg)?;
        }
        self.invoke_member(op, method)
    }

    /// Arguments of a constructor call after the receiver: enclosing
    /// instance, declared arguments, the marker of a bridge constructor,
    /// then the captured values
    fn gen_ctor_args(&mut self, ctor: MemberRef, outer: Option<&Expr>, args: &[Expr], marker: bool, own: bool) -> Result<()> {
        if let Some(o) = outer {
            self.gen_expr(o)?;
        }
        for arg in args {
            self.gen_expr(arg)?;
        }
        if marker {
            self.code.emitop(ACONST_NULL);
        }
        let env = self.env;
        let count = env.member(ctor).captured_args;
        if own {
            let captured: Vec<(u16, Type)> = match &self.ctor_args {
                Some(a) => a.captured.iter().take(count).map(|(_, slot, ty)| (*slot, ty.clone())).collect(),
                None => Vec::new(),
            };
            for (slot, ty) in captured {
                self.load_slot(&ty, slot);
            }
            return Ok(());
        }
        for c in env.table[ctor.class].captured.iter().take(count) {
            self.load_captured(&c.name)?;
        }
        Ok(())
    }

    /// The current value of captured local `name`: a visible local, or this
    /// class's own copy of it
    fn load_captured(&mut self, name: &str) -> Result<()> {
        if let Some(id) = self.visible(name) {
            let (slot, var) = self.local(id)?;
            self.load_slot(&var.ty, slot);
            return Ok(());
        }
        let env = self.env;
        let own = env.table[self.class].captured.iter().find(|c| c.name == name);
        let Some(c) = own else {
            return Err(Error::internal(format!("captured variable {} is out of reach", name)));
        };
        let field = MemberRef::new(self.class, c.field as usize);
        if let Some((slot, ty)) = self.ctor_arg_slot(field) {
            self.load_slot(&ty, slot);
            return Ok(());
        }
        self.code.emit_local(ALOAD, 0);
        self.field_insn(GETFIELD, field)
    }

    /// Walk the `this$N` links from the current class out to `target`
    fn gen_outer_this(&mut self, target: ClassId) -> Result<()> {
        let env = self.env;
        let outer_of = |c: ClassId| -> Result<(ClassId, MemberRef)> {
            let def = &env.table[c];
            match (def.outer, def.outer_this_field) {
                (Some(outer), Some(index)) => Ok((outer, MemberRef::new(c, index as usize))),
                _ => Err(Error::internal(format!("{} has no enclosing instance", def.name))),
            }
        };
        let (mut current, link) = outer_of(self.class)?;
        match self.ctor_args.as_ref().and_then(|a| a.outer) {
            Some(slot) => self.code.emit_local(ALOAD, slot),
            None => {
                self.code.emit_local(ALOAD, 0);
                self.field_insn(GETFIELD, link)?;
            }
        }
        while current != target {
            let (next, link) = outer_of(current)?;
            self.field_insn(GETFIELD, link)?;
            current = next;
        }
        Ok(())
    }

    fn gen_concat(&mut self, parts: &[Expr]) -> Result<()> {
        let buffer = internal_name(JAVA_LANG_STRING_BUFFER);
        let index = self.pool.add_class(&buffer);
        self.code.emitop2(NEW, index);
        self.code.emitop(DUP);
        self.invoke_raw(INVOKESPECIAL, &buffer, INIT_NAME, "()V", 0, 0)?;
        for part in parts {
            self.gen_expr(part)?;
            self.append(&buffer, &part.ty)?;
        }
        self.buffer_to_string(&buffer)
    }

    fn append(&mut self, buffer: &str, ty: &Type) -> Result<()> {
        let desc = format!("({})L{};", append_arg(ty), buffer);
        self.invoke_raw(INVOKEVIRTUAL, buffer, "append", &desc, ty.width().max(1), 1)
    }

    fn buffer_to_string(&mut self, buffer: &str) -> Result<()> {
        let desc = format!("(){}", Type::class(JAVA_LANG_STRING).descriptor());
        self.invoke_raw(INVOKEVIRTUAL, buffer, "toString", &desc, 0, 1)
    }

    fn gen_assign(&mut self, op: Option<BinaryOp>, lhs: &Expr, rhs: &Expr, needed: bool) -> Result<()> {
        let width = lhs.ty.width();
        match &lhs.kind {
            ExprKind::Local(id) => {
                let (slot, var) = self.local(*id)?;
                match op {
                    Some(op) => {
                        self.load_slot(&var.ty, slot);
                        self.gen_compound(op, &var.ty, rhs)?;
                    }
                    None => self.gen_expr(rhs)?,
                }
                if needed {
                    self.code.emitop(dup_op(width));
                }
                self.store_slot(&var.ty, slot);
            }
            ExprKind::Field { target, field } => {
                let field = *field;
                let is_static = self.env.member(field).is_static();
                let bridged = self.needs_bridge(field);
                if is_static {
                    self.gen_discarded_target(target.as_deref())?;
                } else {
                    self.gen_receiver(target.as_deref())?;
                }
                match op {
                    Some(op) => {
                        if !is_static {
                            self.code.emitop(DUP);
                        }
                        if bridged {
                            let get = self.bridge(field, AccessKind::Get)?;
                            self.invoke_member(INVOKESTATIC, get)?;
                        } else {
                            self.field_insn(if is_static { GETSTATIC } else { GETFIELD }, field)?;
                        }
                        self.gen_compound(op, &lhs.ty, rhs)?;
                    }
                    None => self.gen_expr(rhs)?,
                }
                if bridged {
                    // the setter leaves the stored value on the stack
                    let set = self.bridge(field, AccessKind::Set)?;
                    self.invoke_member(INVOKESTATIC, set)?;
                    if !needed {
                        self.code.emitop(pop_op(width));
                    }
                } else {
                    if needed {
                        self.code.emitop(if is_static { dup_op(width) } else { dup_x1_op(width) });
                    }
                    self.field_insn(if is_static { PUTSTATIC } else { PUTFIELD }, field)?;
                }
            }
            ExprKind::ArrayElem { array, index } => {
                self.gen_expr(array)?;
                self.gen_expr(index)?;
                match op {
                    Some(op) => {
                        self.code.emitop(DUP2);
                        self.code.emitop(array_load_op(&lhs.ty));
                        self.gen_compound(op, &lhs.ty, rhs)?;
                    }
                    None => self.gen_expr(rhs)?,
                }
                if needed {
                    self.code.emitop(dup_x2_op(width));
                }
                self.code.emitop(array_store_op(&lhs.ty));
            }
            _ => return Err(Error::internal("invalid assignment target")),
        }
        Ok(())
    }

    /// With the current value of type `lty` on the stack, compute `value op rhs`
    /// and leave it converted back to `lty`
    fn gen_compound(&mut self, op: BinaryOp, lty: &Type, rhs: &Expr) -> Result<()> {
        if op == BinaryOp::Add && lty.is_string() {
            let buffer = internal_name(JAVA_LANG_STRING_BUFFER);
            let string = Type::class(JAVA_LANG_STRING).descriptor();
            let object = Type::class(JAVA_LANG_OBJECT).descriptor();
            let index = self.pool.add_class(&buffer);
            self.code.emitop2(NEW, index);
            self.code.emitop(DUP_X1);
            self.code.emitop(SWAP);
            let value_of = format!("({}){}", object, string);
            self.invoke_raw(INVOKESTATIC, &internal_name(JAVA_LANG_STRING), "valueOf", &value_of, 1, 1)?;
            self.invoke_raw(INVOKESPECIAL, &buffer, INIT_NAME, &format!("({})V", string), 1, 0)?;
            self.gen_expr(rhs)?;
            self.append(&buffer, &rhs.ty)?;
            return self.buffer_to_string(&buffer);
        }
        let op_ty = if op.is_shift() {
            lty.promote_unary()
        } else if *lty == Type::Boolean {
            Type::Boolean
        } else {
            Type::promote(lty, &rhs.ty)
        };
        self.convert(lty, &op_ty);
        self.gen_expr(rhs)?;
        self.code.emitop(arith_op(op, &op_ty)?);
        self.convert(&op_ty, lty);
        Ok(())
    }

    fn gen_incdec(&mut self, op: IncDecOp, operand: &Expr, needed: bool) -> Result<()> {
        let ExprKind::Local(id) = operand.kind else {
            return Err(Error::internal("increment of a non-local"));
        };
        let (slot, var) = self.local(id)?;
        let ty = var.ty.clone();
        if ty == Type::Int {
            if needed && !op.is_prefix() {
                self.load_slot(&ty, slot);
            }
            self.code.emit_iinc(slot, op.delta());
            if needed && op.is_prefix() {
                self.load_slot(&ty, slot);
            }
            return Ok(());
        }
        let width = ty.width();
        self.load_slot(&ty, slot);
        if needed && !op.is_prefix() {
            self.code.emitop(dup_op(width));
        }
        let op_ty = ty.promote_unary();
        self.convert(&ty, &op_ty);
        let one = match op_ty {
            Type::Long => ConstValue::Long(1),
            Type::Float => ConstValue::float(1.0),
            Type::Double => ConstValue::double(1.0),
            _ => ConstValue::Int(1),
        };
        self.gen_const(&one);
        let arith = if op.delta() > 0 { BinaryOp::Add } else { BinaryOp::Sub };
        self.code.emitop(arith_op(arith, &op_ty)?);
        self.convert(&op_ty, &ty);
        if needed && op.is_prefix() {
            self.code.emitop(dup_op(width));
        }
        self.store_slot(&ty, slot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::Config;
    use crate::wash::check::check_nest;
    use crate::wash::enter::parse_source;
    use std::path::PathBuf;

    fn checked(text: &str) -> BatchEnvironment {
        let mut env = BatchEnvironment::new(Config::default());
        parse_source(&mut env, PathBuf::from("A.java"), text.to_string()).unwrap();
        let a = env.table.lookup("A").unwrap();
        check_nest(&mut env, a).unwrap();
        assert!(env.diags.all_texts().is_empty(), "{:?}", env.diags.all_texts());
        env
    }

    fn code_of(env: &BatchEnvironment, class: &str, method: &str) -> MethodCode {
        let c = env.table.lookup(class).unwrap();
        let r = env.table[c].find_methods(method)[0];
        let mut pool = ConstantPool::new();
        method_code(env, &mut pool, DebugInfo::none(), r).unwrap().unwrap()
    }

    #[test]
    fn arithmetic_on_parameters() {
        let env = checked("class A { int f(int a, int b) { return a + b; } }");
        let code = code_of(&env, "A", "f");
        assert_eq!(code.code, vec![ILOAD_0 + 1, ILOAD_0 + 2, IADD, IRETURN]);
        assert_eq!((code.max_stack, code.max_locals), (2, 3));
    }

    #[test]
    fn conditions_branch_forward() {
        let env = checked("class A { static int abs(int x) { if (x < 0) return -x; return x; } }");
        let code = code_of(&env, "A", "abs");
        assert_eq!(code.code, vec![ILOAD_0, IFGE, 0, 6, ILOAD_0, INEG, IRETURN, ILOAD_0, IRETURN]);
    }

    #[test]
    fn loops_jump_back() {
        let env = checked("class A { static void f(int n) { for (int i = 0; i < n; i++) {} } }");
        let code = code_of(&env, "A", "f");
        // i = 0; test; iinc; goto test
        assert_eq!(&code.code[..2], &[ICONST_0, ISTORE_0 + 1]);
        assert_eq!(code.code[2], ILOAD_0 + 1);
        assert_eq!(code.code[4], IF_ICMPGE);
        assert_eq!(&code.code[7..10], &[IINC, 1, 1]);
        assert_eq!(code.code[10], GOTO);
        assert_eq!(*code.code.last().unwrap(), RETURN);
        assert_eq!(code.max_locals, 2);
    }

    #[test]
    fn constructors_run_field_initializers_after_super() {
        let env = checked("class A { int x = 5; A() { } }");
        let a = env.table.lookup("A").unwrap();
        let ctor = env.table[a].constructors()[0];
        let mut pool = ConstantPool::new();
        let code = method_code(&env, &mut pool, DebugInfo::none(), ctor).unwrap().unwrap();
        assert_eq!(code.code[0], ALOAD_0);
        assert_eq!(code.code[1], INVOKESPECIAL);
        assert_eq!(&code.code[4..7], &[ALOAD_0, ICONST_0 + 5, PUTFIELD]);
        assert_eq!(code.code[9], RETURN);
    }

    #[test]
    fn string_concatenation_uses_a_buffer() {
        let env = checked("class A { String f(String s, int i) { return s + i; } }");
        let c = env.table.lookup("A").unwrap();
        let r = env.table[c].find_methods("f")[0];
        let mut pool = ConstantPool::new();
        let code = method_code(&env, &mut pool, DebugInfo::none(), r).unwrap().unwrap();
        assert_eq!(code.code[0], NEW);
        let appends: Vec<_> = pool
            .constants
            .iter()
            .filter(|c| matches!(c, crate::codegen::constpool::Constant::Utf8(s) if s.starts_with("(I)") || s.starts_with("(Ljava/lang/String;)")))
            .collect();
        assert_eq!(appends.len(), 2);
        assert_eq!(*code.code.last().unwrap(), ARETURN);
    }

    #[test]
    fn bridges_reach_private_fields() {
        let env = checked("class A { private int x; class B { int get() { return x; } } }");
        let code = code_of(&env, "A$B", "get");
        // this.this$0, then the static accessor
        assert_eq!(&code.code[..2], &[ALOAD_0, GETFIELD]);
        assert_eq!(code.code[4], INVOKESTATIC);
        let a = env.table.lookup("A").unwrap();
        let bridge = env.table[a].find_methods("access$0")[0];
        let mut pool = ConstantPool::new();
        let body = method_code(&env, &mut pool, DebugInfo::none(), bridge).unwrap().unwrap();
        assert_eq!(body.code[..2], [ALOAD_0, GETFIELD]);
        assert_eq!(body.code[4], IRETURN);
    }

    #[test]
    fn static_initializer_skips_constants() {
        let env = checked("class A { static final int K = 3; static int n = K + 1; static { n = n * 2; } }");
        let a = env.table.lookup("A").unwrap();
        let mut pool = ConstantPool::new();
        let code = class_init_code(&env, &mut pool, DebugInfo::none(), a).unwrap().unwrap();
        assert_eq!(&code.code[..2], &[ICONST_0 + 4, PUTSTATIC]);
        assert_eq!(*code.code.last().unwrap(), RETURN);
        let b = checked("class A { static final int K = 3; }");
        let a = b.table.lookup("A").unwrap();
        assert!(class_init_code(&b, &mut pool, DebugInfo::none(), a).unwrap().is_none());
    }

    #[test]
    fn local_variable_table_when_requested() {
        let env = checked("class A { int f(int a) { int b = a; return b; } }");
        let c = env.table.lookup("A").unwrap();
        let r = env.table[c].find_methods("f")[0];
        let mut pool = ConstantPool::new();
        let code = method_code(&env, &mut pool, DebugInfo::all(), r).unwrap().unwrap();
        let slots: Vec<u16> = code.vars.iter().map(|v| v.index).collect();
        assert_eq!(slots.len(), 3);
        assert!(slots.contains(&0) && slots.contains(&1) && slots.contains(&2));
        assert!(!code.lines.is_empty());
    }
}
