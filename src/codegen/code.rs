//! Code generation buffer
//!
//! Bytecode for one method body, with operand-stack depth tracking,
//! forward-jump chains, the exception table, and the line-number and
//! local-variable debug tables. Unreachable code is never emitted: after an
//! unconditional transfer the buffer is dead until a jump target or handler
//! entry revives it.

use super::attribute::{ExceptionTableEntry, LineNumberEntry, LocalVariableEntry};
use super::defs::MAX_CODE_LENGTH;
use super::opcodes::{self, *};

/// Pending forward jumps to one target, with the stack depth they carry
#[derive(Debug, Clone)]
pub struct Chain {
    pcs: Vec<usize>,
    stack: u16,
}

impl Chain {
    /// Join two chains that jump to the same place
    pub fn merge(a: Option<Chain>, b: Option<Chain>) -> Option<Chain> {
        match (a, b) {
            (None, other) | (other, None) => other,
            (Some(mut a), Some(b)) => {
                a.pcs.extend(b.pcs);
                a.stack = a.stack.max(b.stack);
                Some(a)
            }
        }
    }
}

#[derive(Debug)]
pub struct Code {
    code: Vec<u8>,
    stack: u16,
    max_stack: u16,
    max_locals: u16,
    alive: bool,
    exception_table: Vec<ExceptionTableEntry>,
    line_numbers: Vec<LineNumberEntry>,
    local_vars: Vec<LocalVariableEntry>,
    /// Line of the statement being generated, recorded at its first opcode
    pending_line: Option<u16>,
    line_debug_info: bool,
    /// A jump or the whole body exceeds what the class format can express
    too_large: bool,
}

impl Code {
    pub fn new(max_locals: u16, line_debug_info: bool) -> Self {
        Self {
            code: Vec::with_capacity(64),
            stack: 0,
            max_stack: 0,
            max_locals,
            alive: true,
            exception_table: Vec::new(),
            line_numbers: Vec::new(),
            local_vars: Vec::new(),
            pending_line: None,
            line_debug_info,
            too_large: false,
        }
    }

    /// Current code pointer
    pub fn cp(&self) -> usize {
        self.code.len()
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn mark_dead(&mut self) {
        self.alive = false;
    }

    pub fn stack_depth(&self) -> u16 {
        self.stack
    }

    pub fn max_stack(&self) -> u16 {
        self.max_stack
    }

    pub fn max_locals(&self) -> u16 {
        self.max_locals
    }

    /// Make sure `slot` (of the given width) fits in the frame
    pub fn reserve_local(&mut self, slot: u16, width: u16) {
        self.max_locals = self.max_locals.max(slot + width);
    }

    pub fn is_too_large(&self) -> bool {
        self.too_large || self.code.len() > MAX_CODE_LENGTH
    }

    pub fn into_parts(self) -> (Vec<u8>, Vec<ExceptionTableEntry>, Vec<LineNumberEntry>, Vec<LocalVariableEntry>) {
        (self.code, self.exception_table, self.line_numbers, self.local_vars)
    }

    // Stack

    pub fn adjust_stack(&mut self, delta: i16) {
        let depth = (self.stack as i32 + delta as i32).max(0) as u16;
        self.stack = depth;
        self.max_stack = self.max_stack.max(depth);
    }

    // Emission

    /// Record the source line for the next opcode
    pub fn stat_begin(&mut self, line: u32) {
        if self.line_debug_info && line > 0 {
            self.pending_line = Some(line.min(u16::MAX as u32) as u16);
        }
    }

    fn emit_line_number(&mut self) {
        let Some(line) = self.pending_line.take() else { return };
        let pc = self.cp() as u16;
        match self.line_numbers.last_mut() {
            Some(last) if last.start_pc == pc => last.line_number = line,
            Some(last) if last.line_number == line => {}
            _ => self.line_numbers.push(LineNumberEntry { start_pc: pc, line_number: line }),
        }
    }

    fn emit1(&mut self, od: u8) {
        self.code.push(od);
    }

    fn emit2(&mut self, od: u16) {
        self.code.extend_from_slice(&od.to_be_bytes());
    }

    /// Start an instruction; false when the code is unreachable
    fn begin(&mut self, op: u8) -> bool {
        if !self.alive {
            return false;
        }
        self.emit_line_number();
        self.emit1(op);
        true
    }

    /// An instruction without operands
    pub fn emitop(&mut self, op: u8) {
        if self.begin(op) {
            self.adjust_stack(opcodes::stack_effect(op));
            if matches!(op, ATHROW | RETURN | IRETURN | LRETURN | FRETURN | DRETURN | ARETURN) {
                self.alive = false;
            }
        }
    }

    /// An instruction with a one-byte operand
    pub fn emitop1(&mut self, op: u8, od: u8) {
        if self.begin(op) {
            self.emit1(od);
            self.adjust_stack(opcodes::stack_effect(op));
        }
    }

    /// An instruction with a two-byte operand
    pub fn emitop2(&mut self, op: u8, od: u16) {
        if self.begin(op) {
            self.emit2(od);
            self.adjust_stack(opcodes::stack_effect(op));
        }
    }

    /// An instruction with a two-byte operand and an explicit stack effect,
    /// for field accesses and calls
    pub fn emitop2_with_effect(&mut self, op: u8, od: u16, delta: i16) {
        if self.begin(op) {
            self.emit2(od);
            self.adjust_stack(delta);
        }
    }

    pub fn emit_invokeinterface(&mut self, index: u16, arg_slots: u16, delta: i16) {
        if self.begin(INVOKEINTERFACE) {
            self.emit2(index);
            self.emit1((arg_slots + 1) as u8);
            self.emit1(0);
            self.adjust_stack(delta);
        }
    }

    /// A load or store of local `slot`, with the short forms for slots 0-3
    /// and `wide` above 255
    pub fn emit_local(&mut self, op: u8, slot: u16) {
        let short_base = match op {
            ILOAD => Some(ILOAD_0),
            LLOAD => Some(LLOAD_0),
            FLOAD => Some(FLOAD_0),
            DLOAD => Some(DLOAD_0),
            ALOAD => Some(ALOAD_0),
            ISTORE => Some(ISTORE_0),
            LSTORE => Some(LSTORE_0),
            FSTORE => Some(FSTORE_0),
            DSTORE => Some(DSTORE_0),
            ASTORE => Some(ASTORE_0),
            _ => None,
        };
        match short_base {
            Some(base) if slot <= 3 => {
                if self.begin(base + slot as u8) {
                    self.adjust_stack(opcodes::stack_effect(op));
                }
            }
            _ if slot > 255 => {
                if self.begin(WIDE) {
                    self.emit1(op);
                    self.emit2(slot);
                    self.adjust_stack(opcodes::stack_effect(op));
                }
            }
            _ => self.emitop1(op, slot as u8),
        }
    }

    pub fn emit_iinc(&mut self, slot: u16, delta: i32) {
        if slot > 255 || !(-128..=127).contains(&delta) {
            if self.begin(WIDE) {
                self.emit1(IINC);
                self.emit2(slot);
                self.emit2(delta as i16 as u16);
            }
        } else if self.begin(IINC) {
            self.emit1(slot as u8);
            self.emit1(delta as i8 as u8);
        }
    }

    /// Push an int constant with the shortest instruction
    pub fn emit_int(&mut self, value: i32) -> bool {
        match value {
            -1..=5 => self.emitop((ICONST_0 as i32 + value) as u8),
            -128..=127 => self.emitop1(BIPUSH, value as i8 as u8),
            -32768..=32767 => self.emitop2(SIPUSH, value as i16 as u16),
            _ => return false,
        }
        true
    }

    // Jumps

    /// Emit a jump with a placeholder offset and return the chain to
    /// resolve once the target is known
    pub fn branch(&mut self, op: u8) -> Option<Chain> {
        if !self.alive {
            return None;
        }
        let pc = self.cp();
        self.begin(op);
        self.emit2(0);
        self.adjust_stack(opcodes::stack_effect(op));
        let chain = Chain { pcs: vec![pc], stack: self.stack };
        if op == GOTO {
            self.alive = false;
        }
        Some(chain)
    }

    /// Point every jump of `chain` at the current code pointer
    pub fn resolve(&mut self, chain: Option<Chain>) {
        let Some(chain) = chain else { return };
        let target = self.cp();
        self.patch(&chain, target);
        if self.alive {
            self.stack = self.stack.max(chain.stack);
        } else {
            self.stack = chain.stack;
            self.alive = true;
        }
    }

    fn patch(&mut self, chain: &Chain, target: usize) {
        for &pc in &chain.pcs {
            let offset = target as i64 - pc as i64;
            if offset < i16::MIN as i64 || offset > i16::MAX as i64 {
                self.too_large = true;
                continue;
            }
            let bytes = (offset as i16).to_be_bytes();
            self.code[pc + 1] = bytes[0];
            self.code[pc + 2] = bytes[1];
        }
    }

    /// A jump back to an already emitted `target`
    pub fn jump_back(&mut self, op: u8, target: usize) {
        if !self.alive {
            return;
        }
        let pc = self.cp();
        let offset = target as i64 - pc as i64;
        if offset < i16::MIN as i64 {
            self.too_large = true;
        }
        self.begin(op);
        self.emit2(offset as i16 as u16);
        self.adjust_stack(opcodes::stack_effect(op));
        if op == GOTO {
            self.alive = false;
        }
    }

    /// Revive the code at a handler entry with `stack` values on the stack
    pub fn entry_point(&mut self, stack: u16) -> usize {
        self.alive = true;
        self.stack = 0;
        self.adjust_stack(stack as i16);
        self.cp()
    }

    // Tables

    pub fn add_exception_handler(&mut self, start_pc: usize, end_pc: usize, handler_pc: usize, catch_type: u16) {
        if start_pc == end_pc {
            return;
        }
        self.exception_table.push(ExceptionTableEntry::new(
            start_pc as u16,
            end_pc as u16,
            handler_pc as u16,
            catch_type,
        ));
    }

    pub fn add_local_var(&mut self, entry: LocalVariableEntry) {
        self.local_vars.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_forms_and_stack_depth() {
        let mut code = Code::new(2, false);
        code.emit_local(ALOAD, 0);
        code.emit_local(ILOAD, 1);
        code.emit_int(100);
        code.emitop(IADD);
        code.emitop(POP2);
        code.emitop(RETURN);
        assert_eq!(code.max_stack(), 3);
        assert_eq!(code.stack_depth(), 0);
        let (bytes, ..) = code.into_parts();
        assert_eq!(bytes, vec![0x2a, 0x1b, BIPUSH, 100, IADD, POP2, RETURN]);
    }

    #[test]
    fn forward_jumps_are_patched() {
        let mut code = Code::new(1, false);
        code.emit_local(ILOAD, 0);
        let skip = code.branch(IFEQ);
        code.emit_int(1);
        code.emitop(POP);
        code.resolve(skip);
        code.emitop(RETURN);
        let (bytes, ..) = code.into_parts();
        assert_eq!(&bytes[1..4], &[IFEQ, 0, 5]);
    }

    #[test]
    fn nothing_is_emitted_after_goto() {
        let mut code = Code::new(0, false);
        let exit = code.branch(GOTO);
        code.emit_int(7);
        assert_eq!(code.cp(), 3);
        code.resolve(exit);
        assert!(code.is_alive());
        code.emitop(RETURN);
        assert_eq!(code.cp(), 4);
    }

    #[test]
    fn line_numbers_are_recorded_lazily() {
        let mut code = Code::new(0, true);
        code.stat_begin(3);
        code.stat_begin(4);
        code.emit_int(0);
        code.emitop(POP);
        code.stat_begin(4);
        code.emitop(RETURN);
        let (_, _, lines, _) = code.into_parts();
        assert_eq!(lines, vec![LineNumberEntry { start_pc: 0, line_number: 4 }]);
    }

    #[test]
    fn wide_locals_and_increments() {
        let mut code = Code::new(300, false);
        code.emit_local(ISTORE, 300);
        code.emit_iinc(2, 1000);
        let (bytes, ..) = code.into_parts();
        assert_eq!(&bytes[..4], &[WIDE, ISTORE, 1, 44]);
        assert_eq!(&bytes[4..], &[WIDE, IINC, 0, 2, 3, 232]);
    }
}
