mod flags;
pub mod opcodes;
mod registers;

pub use flags::Flags;
pub use registers::Registers;

use crate::cpu::opcodes::{
    AluOp, Condition, Opcode, Operation, Pointer, Reg8, Reg16, RotateOp, Source, Target,
    OPCODES_MAPPING,
};
use crate::diagnostics::Diagnostics;
use crate::interrupts::{DISPATCH_CYCLES, DISPATCH_ORDER, Interrupt};
use crate::utils::NthBit;
use crate::{Address, Byte};

const INTERRUPT_FLAG: Address = 0xff0f;
const INTERRUPT_ENABLE: Address = 0xffff;
const HIGH_PAGE: Address = 0xff00;

/// Total, infallible view of the 16-bit address space. The bus implements
/// it for the real machine; CPU tests substitute flat storage.
pub trait Memory {
    fn read(&self, addr: Address) -> Byte;
    fn write(&mut self, addr: Address, value: Byte);

    fn read_word(&self, addr: Address) -> Address {
        u16::from_le_bytes([self.read(addr), self.read(addr.wrapping_add(1))])
    }

    fn write_word(&mut self, addr: Address, value: Address) {
        let [low, high] = value.to_le_bytes();
        self.write(addr, low);
        self.write(addr.wrapping_add(1), high);
    }
}

/// Fetch/decode/execute engine. Every step executes exactly one
/// instruction-equivalent unit and reports its cost in cycles, always a
/// multiple of four; all side effects go through the borrowed memory.
#[derive(Debug)]
pub struct Cpu {
    pub registers: Registers,
    interrupt_master_enable: bool,
    /// EI takes effect one instruction late; this latch commits at the
    /// start of the following step, before interrupts are evaluated.
    pending_enable_interrupts: bool,
    halted: bool,
    stopped: bool,
    diagnostics: Diagnostics,
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            registers: Registers::post_boot(),
            interrupt_master_enable: false,
            pending_enable_interrupts: false,
            halted: false,
            stopped: false,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Documented post-boot state; also drops any accumulated diagnostics.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn step(&mut self, memory: &mut impl Memory) -> u8 {
        if self.stopped {
            // STOP parks the clock until a joypad edge is latched.
            if memory.read(INTERRUPT_FLAG) & Interrupt::Joypad.mask() != 0 {
                self.stopped = false;
            } else {
                return 4;
            }
        }

        if self.halted {
            if self.pending_interrupts(memory) != 0 {
                self.halted = false;
            }
            return 4;
        }

        if self.pending_enable_interrupts {
            self.interrupt_master_enable = true;
            self.pending_enable_interrupts = false;
        }

        if self.interrupt_master_enable {
            if let Some(interrupt) = self.highest_pending(memory) {
                return self.dispatch_interrupt(memory, interrupt);
            }
        }

        let code = self.fetch_byte(memory);
        match OPCODES_MAPPING.get(&code) {
            Some(opcode) => self.execute(memory, opcode),
            None => {
                self.diagnostics
                    .record_unimplemented(code, self.registers.pc.wrapping_sub(1));
                4
            }
        }
    }

    fn pending_interrupts(&self, memory: &impl Memory) -> Byte {
        memory.read(INTERRUPT_ENABLE) & memory.read(INTERRUPT_FLAG) & 0x1f
    }

    fn highest_pending(&self, memory: &impl Memory) -> Option<Interrupt> {
        let pending = self.pending_interrupts(memory);

        DISPATCH_ORDER
            .into_iter()
            .find(|interrupt| pending & interrupt.mask() != 0)
    }

    fn dispatch_interrupt(&mut self, memory: &mut impl Memory, interrupt: Interrupt) -> u8 {
        self.interrupt_master_enable = false;

        let flags = memory.read(INTERRUPT_FLAG);
        memory.write(INTERRUPT_FLAG, flags & !interrupt.mask());

        self.push_word(memory, self.registers.pc);
        self.registers.pc = interrupt.vector();

        DISPATCH_CYCLES
    }

    fn fetch_byte(&mut self, memory: &impl Memory) -> Byte {
        let value = memory.read(self.registers.pc);
        self.registers.pc = self.registers.pc.wrapping_add(1);

        value
    }

    fn fetch_word(&mut self, memory: &impl Memory) -> Address {
        let low = self.fetch_byte(memory);
        let high = self.fetch_byte(memory);

        u16::from_le_bytes([low, high])
    }

    fn execute(&mut self, memory: &mut impl Memory, opcode: &Opcode) -> u8 {
        match opcode.operation {
            Operation::Nop => {}
            Operation::Halt => self.halted = true,
            Operation::Stop => self.stopped = true,
            Operation::DisableInterrupts => {
                self.interrupt_master_enable = false;
                // DI also withdraws an EI that has not committed yet.
                self.pending_enable_interrupts = false;
            }
            Operation::EnableInterrupts => self.pending_enable_interrupts = true,
            Operation::Load { dst, src } => {
                let value = self.read_source(memory, src);
                self.write_target(memory, dst, value);
            }
            Operation::LoadWideImmediate(pair) => {
                let value = self.fetch_word(memory);
                self.set_reg16(pair, value);
            }
            Operation::StoreAccumulator(pointer) => {
                let addr = self.pointer_address(pointer);
                memory.write(addr, self.registers.a);
            }
            Operation::LoadAccumulator(pointer) => {
                let addr = self.pointer_address(pointer);
                self.registers.a = memory.read(addr);
            }
            Operation::StoreAccumulatorDirect => {
                let addr = self.fetch_word(memory);
                memory.write(addr, self.registers.a);
            }
            Operation::LoadAccumulatorDirect => {
                let addr = self.fetch_word(memory);
                self.registers.a = memory.read(addr);
            }
            Operation::StoreHigh => {
                let offset = self.fetch_byte(memory);
                memory.write(HIGH_PAGE + Address::from(offset), self.registers.a);
            }
            Operation::LoadHigh => {
                let offset = self.fetch_byte(memory);
                self.registers.a = memory.read(HIGH_PAGE + Address::from(offset));
            }
            Operation::StoreHighC => {
                memory.write(HIGH_PAGE + Address::from(self.registers.c), self.registers.a);
            }
            Operation::LoadHighC => {
                self.registers.a = memory.read(HIGH_PAGE + Address::from(self.registers.c));
            }
            Operation::StoreStackPointer => {
                let addr = self.fetch_word(memory);
                memory.write_word(addr, self.registers.sp);
            }
            Operation::LoadStackPointerHl => self.registers.sp = self.registers.hl(),
            Operation::LoadHlStackOffset => {
                let value = self.stack_offset(memory);
                self.registers.set_hl(value);
            }
            Operation::AddStackPointer => self.registers.sp = self.stack_offset(memory),
            Operation::Alu { op, src } => {
                let value = self.read_source(memory, src);
                self.alu(op, value);
            }
            Operation::Increment(target) => {
                let value = self.read_target(memory, target).wrapping_add(1);
                self.write_target(memory, target, value);

                let flags = &mut self.registers.flags;
                flags.set_zero(value == 0);
                flags.set_subtract(false);
                flags.set_half_carry(value & 0x0f == 0);
            }
            Operation::Decrement(target) => {
                let value = self.read_target(memory, target).wrapping_sub(1);
                self.write_target(memory, target, value);

                let flags = &mut self.registers.flags;
                flags.set_zero(value == 0);
                flags.set_subtract(true);
                flags.set_half_carry(value & 0x0f == 0x0f);
            }
            Operation::IncrementWide(pair) => {
                self.set_reg16(pair, self.reg16(pair).wrapping_add(1));
            }
            Operation::DecrementWide(pair) => {
                self.set_reg16(pair, self.reg16(pair).wrapping_sub(1));
            }
            Operation::AddHl(pair) => self.add_hl(self.reg16(pair)),
            Operation::RotateAccumulator(op) => {
                let value = self.rotate(op, self.registers.a);
                self.registers.a = value;
                // Unlike the prefixed forms, the accumulator rotates never
                // report zero.
                self.registers.flags.set_zero(false);
            }
            Operation::DecimalAdjust => self.decimal_adjust(),
            Operation::Complement => {
                self.registers.a = !self.registers.a;
                self.registers.flags.set_subtract(true);
                self.registers.flags.set_half_carry(true);
            }
            Operation::SetCarryFlag => {
                let flags = &mut self.registers.flags;
                flags.set_subtract(false);
                flags.set_half_carry(false);
                flags.set_carry(true);
            }
            Operation::ComplementCarryFlag => {
                let carry = self.registers.flags.contains(Flags::CARRY);
                let flags = &mut self.registers.flags;
                flags.set_subtract(false);
                flags.set_half_carry(false);
                flags.set_carry(!carry);
            }
            Operation::Jump(condition) => {
                let target = self.fetch_word(memory);
                if self.condition_met(condition) {
                    self.registers.pc = target;
                    return opcode.branch_cycles;
                }
            }
            Operation::JumpHl => self.registers.pc = self.registers.hl(),
            Operation::JumpRelative(condition) => {
                let offset = self.fetch_byte(memory) as i8;
                if self.condition_met(condition) {
                    self.registers.pc = self.registers.pc.wrapping_add(offset as Address);
                    return opcode.branch_cycles;
                }
            }
            Operation::Call(condition) => {
                let target = self.fetch_word(memory);
                if self.condition_met(condition) {
                    self.push_word(memory, self.registers.pc);
                    self.registers.pc = target;
                    return opcode.branch_cycles;
                }
            }
            Operation::Return(condition) => {
                if self.condition_met(condition) {
                    self.registers.pc = self.pop_word(memory);
                    return opcode.branch_cycles;
                }
            }
            Operation::ReturnInterrupt => {
                self.registers.pc = self.pop_word(memory);
                self.interrupt_master_enable = true;
            }
            Operation::Restart(vector) => {
                self.push_word(memory, self.registers.pc);
                self.registers.pc = Address::from(vector);
            }
            Operation::Push(pair) => self.push_word(memory, self.reg16(pair)),
            Operation::Pop(pair) => {
                let value = self.pop_word(memory);
                self.set_reg16(pair, value);
            }
            Operation::Prefixed => return self.execute_prefixed(memory),
        }

        opcode.cycles
    }

    /// CB-prefixed instructions are fully regular: bits 7-6 select the
    /// class, bits 5-3 the sub-operation or bit index, bits 2-0 the operand.
    fn execute_prefixed(&mut self, memory: &mut impl Memory) -> u8 {
        let code = self.fetch_byte(memory);
        let target = opcodes::target_for(code & 0x07);
        let bit = (code >> 3) & 0x07;
        let indirect = target == Target::HlIndirect;

        match code >> 6 {
            0 => {
                let value = self.read_target(memory, target);
                let result = match bit {
                    0 => self.rotate(RotateOp::Rlc, value),
                    1 => self.rotate(RotateOp::Rrc, value),
                    2 => self.rotate(RotateOp::Rl, value),
                    3 => self.rotate(RotateOp::Rr, value),
                    4 => self.shift_left(value),
                    5 => self.shift_right_arithmetic(value),
                    6 => self.swap(value),
                    _ => self.shift_right_logical(value),
                };
                self.write_target(memory, target, result);

                if indirect { 16 } else { 8 }
            }
            1 => {
                let value = self.read_target(memory, target);
                let flags = &mut self.registers.flags;
                flags.set_zero(!value.nth_bit(bit));
                flags.set_subtract(false);
                flags.set_half_carry(true);

                if indirect { 12 } else { 8 }
            }
            2 => {
                let value = self.read_target(memory, target) & !(1 << bit);
                self.write_target(memory, target, value);

                if indirect { 16 } else { 8 }
            }
            _ => {
                let value = self.read_target(memory, target) | 1 << bit;
                self.write_target(memory, target, value);

                if indirect { 16 } else { 8 }
            }
        }
    }

    fn reg8(&self, register: Reg8) -> Byte {
        match register {
            Reg8::B => self.registers.b,
            Reg8::C => self.registers.c,
            Reg8::D => self.registers.d,
            Reg8::E => self.registers.e,
            Reg8::H => self.registers.h,
            Reg8::L => self.registers.l,
            Reg8::A => self.registers.a,
        }
    }

    fn set_reg8(&mut self, register: Reg8, value: Byte) {
        match register {
            Reg8::B => self.registers.b = value,
            Reg8::C => self.registers.c = value,
            Reg8::D => self.registers.d = value,
            Reg8::E => self.registers.e = value,
            Reg8::H => self.registers.h = value,
            Reg8::L => self.registers.l = value,
            Reg8::A => self.registers.a = value,
        }
    }

    fn reg16(&self, pair: Reg16) -> Address {
        match pair {
            Reg16::Bc => self.registers.bc(),
            Reg16::De => self.registers.de(),
            Reg16::Hl => self.registers.hl(),
            Reg16::Sp => self.registers.sp,
            Reg16::Af => self.registers.af(),
        }
    }

    fn set_reg16(&mut self, pair: Reg16, value: Address) {
        match pair {
            Reg16::Bc => self.registers.set_bc(value),
            Reg16::De => self.registers.set_de(value),
            Reg16::Hl => self.registers.set_hl(value),
            Reg16::Sp => self.registers.sp = value,
            Reg16::Af => self.registers.set_af(value),
        }
    }

    fn read_source(&mut self, memory: &impl Memory, source: Source) -> Byte {
        match source {
            Source::Register(register) => self.reg8(register),
            Source::HlIndirect => memory.read(self.registers.hl()),
            Source::Immediate => self.fetch_byte(memory),
        }
    }

    fn read_target(&mut self, memory: &impl Memory, target: Target) -> Byte {
        match target {
            Target::Register(register) => self.reg8(register),
            Target::HlIndirect => memory.read(self.registers.hl()),
        }
    }

    fn write_target(&mut self, memory: &mut impl Memory, target: Target, value: Byte) {
        match target {
            Target::Register(register) => self.set_reg8(register, value),
            Target::HlIndirect => memory.write(self.registers.hl(), value),
        }
    }

    fn pointer_address(&mut self, pointer: Pointer) -> Address {
        match pointer {
            Pointer::Bc => self.registers.bc(),
            Pointer::De => self.registers.de(),
            Pointer::HlIncrement => {
                let addr = self.registers.hl();
                self.registers.set_hl(addr.wrapping_add(1));
                addr
            }
            Pointer::HlDecrement => {
                let addr = self.registers.hl();
                self.registers.set_hl(addr.wrapping_sub(1));
                addr
            }
        }
    }

    fn condition_met(&self, condition: Condition) -> bool {
        let flags = self.registers.flags;

        match condition {
            Condition::Always => true,
            Condition::NotZero => !flags.contains(Flags::ZERO),
            Condition::Zero => flags.contains(Flags::ZERO),
            Condition::NotCarry => !flags.contains(Flags::CARRY),
            Condition::Carry => flags.contains(Flags::CARRY),
        }
    }

    fn push_word(&mut self, memory: &mut impl Memory, value: Address) {
        self.registers.sp = self.registers.sp.wrapping_sub(2);
        memory.write_word(self.registers.sp, value);
    }

    fn pop_word(&mut self, memory: &impl Memory) -> Address {
        let value = memory.read_word(self.registers.sp);
        self.registers.sp = self.registers.sp.wrapping_add(2);

        value
    }

    fn alu(&mut self, op: AluOp, value: Byte) {
        let a = self.registers.a;
        let carry = self.registers.flags.carry_bit();
        let flags = &mut self.registers.flags;

        match op {
            AluOp::Add => {
                let (result, overflow) = a.overflowing_add(value);
                flags.set_zero(result == 0);
                flags.set_subtract(false);
                flags.set_half_carry((a & 0x0f) + (value & 0x0f) > 0x0f);
                flags.set_carry(overflow);
                self.registers.a = result;
            }
            AluOp::Adc => {
                let result = u16::from(a) + u16::from(value) + u16::from(carry);
                flags.set_zero(result & 0xff == 0);
                flags.set_subtract(false);
                flags.set_half_carry((a & 0x0f) + (value & 0x0f) + carry > 0x0f);
                flags.set_carry(result > 0xff);
                self.registers.a = result as Byte;
            }
            AluOp::Sub => {
                let result = a.wrapping_sub(value);
                flags.set_zero(result == 0);
                flags.set_subtract(true);
                flags.set_half_carry(a & 0x0f < value & 0x0f);
                flags.set_carry(a < value);
                self.registers.a = result;
            }
            AluOp::Sbc => {
                let result = i16::from(a) - i16::from(value) - i16::from(carry);
                flags.set_zero(result & 0xff == 0);
                flags.set_subtract(true);
                flags.set_half_carry(
                    i16::from(a & 0x0f) - i16::from(value & 0x0f) - i16::from(carry) < 0,
                );
                flags.set_carry(result < 0);
                self.registers.a = result as Byte;
            }
            AluOp::And => {
                self.registers.a = a & value;
                flags.set_zero(self.registers.a == 0);
                flags.set_subtract(false);
                flags.set_half_carry(true);
                flags.set_carry(false);
            }
            AluOp::Xor => {
                self.registers.a = a ^ value;
                flags.set_zero(self.registers.a == 0);
                flags.set_subtract(false);
                flags.set_half_carry(false);
                flags.set_carry(false);
            }
            AluOp::Or => {
                self.registers.a = a | value;
                flags.set_zero(self.registers.a == 0);
                flags.set_subtract(false);
                flags.set_half_carry(false);
                flags.set_carry(false);
            }
            AluOp::Cp => {
                flags.set_zero(a == value);
                flags.set_subtract(true);
                flags.set_half_carry(a & 0x0f < value & 0x0f);
                flags.set_carry(a < value);
            }
        }
    }

    fn add_hl(&mut self, value: Address) {
        let hl = self.registers.hl();
        let (result, overflow) = hl.overflowing_add(value);

        let flags = &mut self.registers.flags;
        flags.set_subtract(false);
        flags.set_half_carry((hl & 0x0fff) + (value & 0x0fff) > 0x0fff);
        flags.set_carry(overflow);

        self.registers.set_hl(result);
    }

    /// SP plus a signed immediate; the half-carry and carry come from the
    /// unsigned low-byte addition.
    fn stack_offset(&mut self, memory: &impl Memory) -> Address {
        let byte = self.fetch_byte(memory);
        let sp = self.registers.sp;

        let flags = &mut self.registers.flags;
        flags.set_zero(false);
        flags.set_subtract(false);
        flags.set_half_carry((sp & 0x0f) + Address::from(byte & 0x0f) > 0x0f);
        flags.set_carry((sp & 0xff) + Address::from(byte) > 0xff);

        sp.wrapping_add(byte as i8 as Address)
    }

    fn rotate(&mut self, op: RotateOp, value: Byte) -> Byte {
        let carry = self.registers.flags.carry_bit();
        let (result, carry_out) = match op {
            RotateOp::Rlc => (value.rotate_left(1), value.nth_bit(7)),
            RotateOp::Rrc => (value.rotate_right(1), value.nth_bit(0)),
            RotateOp::Rl => (value << 1 | carry, value.nth_bit(7)),
            RotateOp::Rr => (value >> 1 | carry << 7, value.nth_bit(0)),
        };

        self.set_shift_flags(result, carry_out);
        result
    }

    fn shift_left(&mut self, value: Byte) -> Byte {
        let result = value << 1;
        self.set_shift_flags(result, value.nth_bit(7));

        result
    }

    fn shift_right_arithmetic(&mut self, value: Byte) -> Byte {
        let result = value >> 1 | value & 0x80;
        self.set_shift_flags(result, value.nth_bit(0));

        result
    }

    fn shift_right_logical(&mut self, value: Byte) -> Byte {
        let result = value >> 1;
        self.set_shift_flags(result, value.nth_bit(0));

        result
    }

    fn swap(&mut self, value: Byte) -> Byte {
        let result = value.rotate_left(4);
        self.set_shift_flags(result, false);

        result
    }

    fn set_shift_flags(&mut self, result: Byte, carry: bool) {
        let flags = &mut self.registers.flags;
        flags.set_zero(result == 0);
        flags.set_subtract(false);
        flags.set_half_carry(false);
        flags.set_carry(carry);
    }

    /// Adjusts the accumulator back to packed BCD after an 8-bit add or
    /// subtract.
    fn decimal_adjust(&mut self) {
        let flags = self.registers.flags;
        let subtract = flags.contains(Flags::SUBTRACT);
        let mut correction = 0u8;
        let mut carry = flags.contains(Flags::CARRY);

        if flags.contains(Flags::HALF_CARRY) || (!subtract && self.registers.a & 0x0f > 0x09) {
            correction |= 0x06;
        }
        if carry || (!subtract && self.registers.a > 0x99) {
            correction |= 0x60;
            carry = true;
        }

        self.registers.a = match subtract {
            true => self.registers.a.wrapping_sub(correction),
            false => self.registers.a.wrapping_add(correction),
        };

        let flags = &mut self.registers.flags;
        flags.set_zero(self.registers.a == 0);
        flags.set_half_carry(false);
        flags.set_carry(carry);
    }
}
