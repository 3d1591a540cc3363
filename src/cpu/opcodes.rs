//! Decode table for the base instruction set: a pure mapping from opcode
//! byte to a tagged operation descriptor (operand source/destination, cycle
//! cost, branch cycle cost). The regular 8-bit load and ALU blocks
//! (0x40-0xbf) are generated from their bit patterns; the irregular rows are
//! explicit entries. Bytes with no entry are the non-fatal unknown-opcode
//! path. CB-prefixed instructions are fully regular and decode
//! arithmetically in the CPU instead of through this table.

use crate::Byte;
use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg8 {
    B,
    C,
    D,
    E,
    H,
    L,
    A,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg16 {
    Bc,
    De,
    Hl,
    Sp,
    Af,
}

/// Write destination of an 8-bit operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Register(Reg8),
    HlIndirect,
}

/// Read source of an 8-bit operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Register(Reg8),
    HlIndirect,
    Immediate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateOp {
    Rlc,
    Rrc,
    Rl,
    Rr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Always,
    NotZero,
    Zero,
    NotCarry,
    Carry,
}

/// Pointer registers usable for accumulator load/store, including the
/// post-increment/post-decrement HL forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pointer {
    Bc,
    De,
    HlIncrement,
    HlDecrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Nop,
    Halt,
    Stop,
    DisableInterrupts,
    EnableInterrupts,
    Load { dst: Target, src: Source },
    LoadWideImmediate(Reg16),
    StoreAccumulator(Pointer),
    LoadAccumulator(Pointer),
    StoreAccumulatorDirect,
    LoadAccumulatorDirect,
    StoreHigh,
    LoadHigh,
    StoreHighC,
    LoadHighC,
    StoreStackPointer,
    LoadStackPointerHl,
    LoadHlStackOffset,
    AddStackPointer,
    Alu { op: AluOp, src: Source },
    Increment(Target),
    Decrement(Target),
    IncrementWide(Reg16),
    DecrementWide(Reg16),
    AddHl(Reg16),
    RotateAccumulator(RotateOp),
    DecimalAdjust,
    Complement,
    SetCarryFlag,
    ComplementCarryFlag,
    Jump(Condition),
    JumpHl,
    JumpRelative(Condition),
    Call(Condition),
    Return(Condition),
    ReturnInterrupt,
    Restart(Byte),
    Push(Reg16),
    Pop(Reg16),
    Prefixed,
}

#[derive(Debug, Clone, Copy)]
pub struct Opcode {
    pub code: Byte,
    pub name: &'static str,
    /// Cycle cost; for conditional control flow, the not-taken cost.
    pub cycles: u8,
    /// Cycle cost when a conditional branch is taken.
    pub branch_cycles: u8,
    pub operation: Operation,
}

impl Opcode {
    pub const fn new(code: Byte, name: &'static str, cycles: u8, operation: Operation) -> Self {
        Self {
            code,
            name,
            cycles,
            branch_cycles: cycles,
            operation,
        }
    }

    pub const fn branching(
        code: Byte,
        name: &'static str,
        cycles: u8,
        branch_cycles: u8,
        operation: Operation,
    ) -> Self {
        Self {
            code,
            name,
            cycles,
            branch_cycles,
            operation,
        }
    }
}

/// Operand encoding shared by the generated blocks and the CB prefix:
/// bit triplet 0-7 selects B, C, D, E, H, L, (HL), A.
pub(crate) const fn target_for(bits: Byte) -> Target {
    match bits {
        0 => Target::Register(Reg8::B),
        1 => Target::Register(Reg8::C),
        2 => Target::Register(Reg8::D),
        3 => Target::Register(Reg8::E),
        4 => Target::Register(Reg8::H),
        5 => Target::Register(Reg8::L),
        6 => Target::HlIndirect,
        _ => Target::Register(Reg8::A),
    }
}

const fn source_for(bits: Byte) -> Source {
    match target_for(bits) {
        Target::Register(register) => Source::Register(register),
        Target::HlIndirect => Source::HlIndirect,
    }
}

const ALU_OPS: [(AluOp, &str); 8] = [
    (AluOp::Add, "ADD"),
    (AluOp::Adc, "ADC"),
    (AluOp::Sub, "SUB"),
    (AluOp::Sbc, "SBC"),
    (AluOp::And, "AND"),
    (AluOp::Xor, "XOR"),
    (AluOp::Or, "OR"),
    (AluOp::Cp, "CP"),
];

#[rustfmt::skip]
const IRREGULAR_OPCODES: &[Opcode] = &[
    // 0x00 row
    Opcode::new(0x00, "NOP", 4, Operation::Nop),
    Opcode::new(0x01, "LD", 12, Operation::LoadWideImmediate(Reg16::Bc)),
    Opcode::new(0x02, "LD", 8, Operation::StoreAccumulator(Pointer::Bc)),
    Opcode::new(0x03, "INC", 8, Operation::IncrementWide(Reg16::Bc)),
    Opcode::new(0x04, "INC", 4, Operation::Increment(Target::Register(Reg8::B))),
    Opcode::new(0x05, "DEC", 4, Operation::Decrement(Target::Register(Reg8::B))),
    Opcode::new(0x06, "LD", 8, Operation::Load { dst: Target::Register(Reg8::B), src: Source::Immediate }),
    Opcode::new(0x07, "RLCA", 4, Operation::RotateAccumulator(RotateOp::Rlc)),
    Opcode::new(0x08, "LD", 20, Operation::StoreStackPointer),
    Opcode::new(0x09, "ADD", 8, Operation::AddHl(Reg16::Bc)),
    Opcode::new(0x0a, "LD", 8, Operation::LoadAccumulator(Pointer::Bc)),
    Opcode::new(0x0b, "DEC", 8, Operation::DecrementWide(Reg16::Bc)),
    Opcode::new(0x0c, "INC", 4, Operation::Increment(Target::Register(Reg8::C))),
    Opcode::new(0x0d, "DEC", 4, Operation::Decrement(Target::Register(Reg8::C))),
    Opcode::new(0x0e, "LD", 8, Operation::Load { dst: Target::Register(Reg8::C), src: Source::Immediate }),
    Opcode::new(0x0f, "RRCA", 4, Operation::RotateAccumulator(RotateOp::Rrc)),
    // 0x10 row
    Opcode::new(0x10, "STOP", 4, Operation::Stop),
    Opcode::new(0x11, "LD", 12, Operation::LoadWideImmediate(Reg16::De)),
    Opcode::new(0x12, "LD", 8, Operation::StoreAccumulator(Pointer::De)),
    Opcode::new(0x13, "INC", 8, Operation::IncrementWide(Reg16::De)),
    Opcode::new(0x14, "INC", 4, Operation::Increment(Target::Register(Reg8::D))),
    Opcode::new(0x15, "DEC", 4, Operation::Decrement(Target::Register(Reg8::D))),
    Opcode::new(0x16, "LD", 8, Operation::Load { dst: Target::Register(Reg8::D), src: Source::Immediate }),
    Opcode::new(0x17, "RLA", 4, Operation::RotateAccumulator(RotateOp::Rl)),
    Opcode::branching(0x18, "JR", 12, 12, Operation::JumpRelative(Condition::Always)),
    Opcode::new(0x19, "ADD", 8, Operation::AddHl(Reg16::De)),
    Opcode::new(0x1a, "LD", 8, Operation::LoadAccumulator(Pointer::De)),
    Opcode::new(0x1b, "DEC", 8, Operation::DecrementWide(Reg16::De)),
    Opcode::new(0x1c, "INC", 4, Operation::Increment(Target::Register(Reg8::E))),
    Opcode::new(0x1d, "DEC", 4, Operation::Decrement(Target::Register(Reg8::E))),
    Opcode::new(0x1e, "LD", 8, Operation::Load { dst: Target::Register(Reg8::E), src: Source::Immediate }),
    Opcode::new(0x1f, "RRA", 4, Operation::RotateAccumulator(RotateOp::Rr)),
    // 0x20 row
    Opcode::branching(0x20, "JR", 8, 12, Operation::JumpRelative(Condition::NotZero)),
    Opcode::new(0x21, "LD", 12, Operation::LoadWideImmediate(Reg16::Hl)),
    Opcode::new(0x22, "LD", 8, Operation::StoreAccumulator(Pointer::HlIncrement)),
    Opcode::new(0x23, "INC", 8, Operation::IncrementWide(Reg16::Hl)),
    Opcode::new(0x24, "INC", 4, Operation::Increment(Target::Register(Reg8::H))),
    Opcode::new(0x25, "DEC", 4, Operation::Decrement(Target::Register(Reg8::H))),
    Opcode::new(0x26, "LD", 8, Operation::Load { dst: Target::Register(Reg8::H), src: Source::Immediate }),
    Opcode::new(0x27, "DAA", 4, Operation::DecimalAdjust),
    Opcode::branching(0x28, "JR", 8, 12, Operation::JumpRelative(Condition::Zero)),
    Opcode::new(0x29, "ADD", 8, Operation::AddHl(Reg16::Hl)),
    Opcode::new(0x2a, "LD", 8, Operation::LoadAccumulator(Pointer::HlIncrement)),
    Opcode::new(0x2b, "DEC", 8, Operation::DecrementWide(Reg16::Hl)),
    Opcode::new(0x2c, "INC", 4, Operation::Increment(Target::Register(Reg8::L))),
    Opcode::new(0x2d, "DEC", 4, Operation::Decrement(Target::Register(Reg8::L))),
    Opcode::new(0x2e, "LD", 8, Operation::Load { dst: Target::Register(Reg8::L), src: Source::Immediate }),
    Opcode::new(0x2f, "CPL", 4, Operation::Complement),
    // 0x30 row
    Opcode::branching(0x30, "JR", 8, 12, Operation::JumpRelative(Condition::NotCarry)),
    Opcode::new(0x31, "LD", 12, Operation::LoadWideImmediate(Reg16::Sp)),
    Opcode::new(0x32, "LD", 8, Operation::StoreAccumulator(Pointer::HlDecrement)),
    Opcode::new(0x33, "INC", 8, Operation::IncrementWide(Reg16::Sp)),
    Opcode::new(0x34, "INC", 12, Operation::Increment(Target::HlIndirect)),
    Opcode::new(0x35, "DEC", 12, Operation::Decrement(Target::HlIndirect)),
    Opcode::new(0x36, "LD", 12, Operation::Load { dst: Target::HlIndirect, src: Source::Immediate }),
    Opcode::new(0x37, "SCF", 4, Operation::SetCarryFlag),
    Opcode::branching(0x38, "JR", 8, 12, Operation::JumpRelative(Condition::Carry)),
    Opcode::new(0x39, "ADD", 8, Operation::AddHl(Reg16::Sp)),
    Opcode::new(0x3a, "LD", 8, Operation::LoadAccumulator(Pointer::HlDecrement)),
    Opcode::new(0x3b, "DEC", 8, Operation::DecrementWide(Reg16::Sp)),
    Opcode::new(0x3c, "INC", 4, Operation::Increment(Target::Register(Reg8::A))),
    Opcode::new(0x3d, "DEC", 4, Operation::Decrement(Target::Register(Reg8::A))),
    Opcode::new(0x3e, "LD", 8, Operation::Load { dst: Target::Register(Reg8::A), src: Source::Immediate }),
    Opcode::new(0x3f, "CCF", 4, Operation::ComplementCarryFlag),
    // 0x76 is the hole in the register-to-register load block.
    Opcode::new(0x76, "HALT", 4, Operation::Halt),
    // 0xc0 row
    Opcode::branching(0xc0, "RET", 8, 20, Operation::Return(Condition::NotZero)),
    Opcode::new(0xc1, "POP", 12, Operation::Pop(Reg16::Bc)),
    Opcode::branching(0xc2, "JP", 12, 16, Operation::Jump(Condition::NotZero)),
    Opcode::branching(0xc3, "JP", 16, 16, Operation::Jump(Condition::Always)),
    Opcode::branching(0xc4, "CALL", 12, 24, Operation::Call(Condition::NotZero)),
    Opcode::new(0xc5, "PUSH", 16, Operation::Push(Reg16::Bc)),
    Opcode::new(0xc6, "ADD", 8, Operation::Alu { op: AluOp::Add, src: Source::Immediate }),
    Opcode::new(0xc7, "RST", 16, Operation::Restart(0x00)),
    Opcode::branching(0xc8, "RET", 8, 20, Operation::Return(Condition::Zero)),
    Opcode::branching(0xc9, "RET", 16, 16, Operation::Return(Condition::Always)),
    Opcode::branching(0xca, "JP", 12, 16, Operation::Jump(Condition::Zero)),
    Opcode::new(0xcb, "PREFIX", 0, Operation::Prefixed),
    Opcode::branching(0xcc, "CALL", 12, 24, Operation::Call(Condition::Zero)),
    Opcode::branching(0xcd, "CALL", 24, 24, Operation::Call(Condition::Always)),
    Opcode::new(0xce, "ADC", 8, Operation::Alu { op: AluOp::Adc, src: Source::Immediate }),
    Opcode::new(0xcf, "RST", 16, Operation::Restart(0x08)),
    // 0xd0 row
    Opcode::branching(0xd0, "RET", 8, 20, Operation::Return(Condition::NotCarry)),
    Opcode::new(0xd1, "POP", 12, Operation::Pop(Reg16::De)),
    Opcode::branching(0xd2, "JP", 12, 16, Operation::Jump(Condition::NotCarry)),
    Opcode::branching(0xd4, "CALL", 12, 24, Operation::Call(Condition::NotCarry)),
    Opcode::new(0xd5, "PUSH", 16, Operation::Push(Reg16::De)),
    Opcode::new(0xd6, "SUB", 8, Operation::Alu { op: AluOp::Sub, src: Source::Immediate }),
    Opcode::new(0xd7, "RST", 16, Operation::Restart(0x10)),
    Opcode::branching(0xd8, "RET", 8, 20, Operation::Return(Condition::Carry)),
    Opcode::new(0xd9, "RETI", 16, Operation::ReturnInterrupt),
    Opcode::branching(0xda, "JP", 12, 16, Operation::Jump(Condition::Carry)),
    Opcode::branching(0xdc, "CALL", 12, 24, Operation::Call(Condition::Carry)),
    Opcode::new(0xde, "SBC", 8, Operation::Alu { op: AluOp::Sbc, src: Source::Immediate }),
    Opcode::new(0xdf, "RST", 16, Operation::Restart(0x18)),
    // 0xe0 row
    Opcode::new(0xe0, "LDH", 12, Operation::StoreHigh),
    Opcode::new(0xe1, "POP", 12, Operation::Pop(Reg16::Hl)),
    Opcode::new(0xe2, "LDH", 8, Operation::StoreHighC),
    Opcode::new(0xe5, "PUSH", 16, Operation::Push(Reg16::Hl)),
    Opcode::new(0xe6, "AND", 8, Operation::Alu { op: AluOp::And, src: Source::Immediate }),
    Opcode::new(0xe7, "RST", 16, Operation::Restart(0x20)),
    Opcode::new(0xe8, "ADD", 16, Operation::AddStackPointer),
    Opcode::new(0xe9, "JP", 4, Operation::JumpHl),
    Opcode::new(0xea, "LD", 16, Operation::StoreAccumulatorDirect),
    Opcode::new(0xee, "XOR", 8, Operation::Alu { op: AluOp::Xor, src: Source::Immediate }),
    Opcode::new(0xef, "RST", 16, Operation::Restart(0x28)),
    // 0xf0 row
    Opcode::new(0xf0, "LDH", 12, Operation::LoadHigh),
    Opcode::new(0xf1, "POP", 12, Operation::Pop(Reg16::Af)),
    Opcode::new(0xf2, "LDH", 8, Operation::LoadHighC),
    Opcode::new(0xf3, "DI", 4, Operation::DisableInterrupts),
    Opcode::new(0xf5, "PUSH", 16, Operation::Push(Reg16::Af)),
    Opcode::new(0xf6, "OR", 8, Operation::Alu { op: AluOp::Or, src: Source::Immediate }),
    Opcode::new(0xf7, "RST", 16, Operation::Restart(0x30)),
    Opcode::new(0xf8, "LD", 12, Operation::LoadHlStackOffset),
    Opcode::new(0xf9, "LD", 8, Operation::LoadStackPointerHl),
    Opcode::new(0xfa, "LD", 16, Operation::LoadAccumulatorDirect),
    Opcode::new(0xfb, "EI", 4, Operation::EnableInterrupts),
    Opcode::new(0xfe, "CP", 8, Operation::Alu { op: AluOp::Cp, src: Source::Immediate }),
    Opcode::new(0xff, "RST", 16, Operation::Restart(0x38)),
];

pub static OPCODES_MAPPING: Lazy<HashMap<Byte, Opcode>> = Lazy::new(|| {
    let mut mapping = HashMap::with_capacity(256);

    for opcode in IRREGULAR_OPCODES {
        mapping.insert(opcode.code, *opcode);
    }

    // 0x40-0x7f: LD dst,src generated from the operand bit triplets. 0x76
    // would decode as LD (HL),(HL) and is HALT instead.
    for code in 0x40..=0x7fu8 {
        if code == 0x76 {
            continue;
        }

        let dst = target_for((code >> 3) & 0x07);
        let src = source_for(code & 0x07);
        let cycles = match (dst, src) {
            (Target::HlIndirect, _) | (_, Source::HlIndirect) => 8,
            _ => 4,
        };

        mapping.insert(
            code,
            Opcode::new(code, "LD", cycles, Operation::Load { dst, src }),
        );
    }

    // 0x80-0xbf: the eight-operation ALU block.
    for code in 0x80..=0xbfu8 {
        let (op, name) = ALU_OPS[((code >> 3) & 0x07) as usize];
        let src = source_for(code & 0x07);
        let cycles = match src {
            Source::HlIndirect => 8,
            _ => 4,
        };

        mapping.insert(code, Opcode::new(code, name, cycles, Operation::Alu { op, src }));
    }

    mapping
});

#[cfg(test)]
mod tests {
    use super::*;

    /// Bytes deliberately absent from the table.
    const HOLES: [Byte; 11] = [
        0xd3, 0xdb, 0xdd, 0xe3, 0xe4, 0xeb, 0xec, 0xed, 0xf4, 0xfc, 0xfd,
    ];

    #[test]
    fn covers_everything_but_the_documented_holes() {
        assert_eq!(256 - HOLES.len(), OPCODES_MAPPING.len());

        for hole in HOLES {
            assert!(OPCODES_MAPPING.get(&hole).is_none(), "{hole:#04x}");
        }
    }

    #[test]
    fn every_entry_is_stored_under_its_own_code() {
        for (&code, opcode) in OPCODES_MAPPING.iter() {
            assert_eq!(code, opcode.code);
        }
    }

    #[test]
    fn generated_load_block_decodes_operands() {
        let opcode = &OPCODES_MAPPING[&0x41];

        assert_eq!(
            Operation::Load {
                dst: Target::Register(Reg8::B),
                src: Source::Register(Reg8::C),
            },
            opcode.operation
        );
        assert_eq!(4, opcode.cycles);
    }

    #[test]
    fn indirect_loads_cost_a_memory_access() {
        assert_eq!(8, OPCODES_MAPPING[&0x46].cycles); // LD B,(HL)
        assert_eq!(8, OPCODES_MAPPING[&0x70].cycles); // LD (HL),B
        assert_eq!(8, OPCODES_MAPPING[&0x86].cycles); // ADD A,(HL)
    }

    #[test]
    fn halt_interrupts_the_load_block() {
        assert_eq!(Operation::Halt, OPCODES_MAPPING[&0x76].operation);
    }

    #[test]
    fn conditional_branches_carry_both_costs() {
        let jump = &OPCODES_MAPPING[&0xc2];

        assert_eq!(12, jump.cycles);
        assert_eq!(16, jump.branch_cycles);
    }
}
