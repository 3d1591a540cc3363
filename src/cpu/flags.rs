//! The flags register packs four condition bits into the high nibble of F:
//!
//! ```text
//! 7  bit  0
//! ---- ----
//! ZNHC ----
//! ||||
//! |||+------ Carry
//! ||+------- Half-carry (carry out of bit 3)
//! |+-------- Subtract (last operation was a subtraction)
//! +--------- Zero
//! ```
//!
//! The low nibble always reads back as zero; cartridges can observe the raw
//! byte through `PUSH AF`, so truncation on every write matters.

use crate::Byte;
use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Flags: Byte {
        const ZERO       = 0b1000_0000;
        const SUBTRACT   = 0b0100_0000;
        const HALF_CARRY = 0b0010_0000;
        const CARRY      = 0b0001_0000;
    }
}

impl From<Byte> for Flags {
    fn from(value: Byte) -> Self {
        Self::from_bits_truncate(value)
    }
}

impl Flags {
    #[inline]
    pub fn set_zero(&mut self, value: bool) {
        self.set(Flags::ZERO, value);
    }

    #[inline]
    pub fn set_subtract(&mut self, value: bool) {
        self.set(Flags::SUBTRACT, value);
    }

    #[inline]
    pub fn set_half_carry(&mut self, value: bool) {
        self.set(Flags::HALF_CARRY, value);
    }

    #[inline]
    pub fn set_carry(&mut self, value: bool) {
        self.set(Flags::CARRY, value);
    }

    /// The carry flag as a 0/1 operand for ADC/SBC and the rotate family.
    #[inline]
    pub fn carry_bit(self) -> Byte {
        self.contains(Flags::CARRY) as Byte
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_nibble_is_truncated() {
        let flags = Flags::from(0xbf);

        assert_eq!(0xb0, flags.bits());
    }

    #[test]
    fn carry_bit_mirrors_the_carry_flag() {
        assert_eq!(1, Flags::CARRY.carry_bit());
        assert_eq!(0, Flags::ZERO.carry_bit());
    }
}
