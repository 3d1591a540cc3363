pub trait NthBit {
    fn nth_bit(&self, bit_n: u8) -> bool;
}

impl NthBit for u8 {
    fn nth_bit(&self, bit_n: u8) -> bool {
        self >> bit_n & 1 == 1
    }
}

impl NthBit for u16 {
    fn nth_bit(&self, bit_n: u8) -> bool {
        self >> bit_n & 1 == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_of_a_byte() {
        let value = 0b1000_0010u8;

        assert!(value.nth_bit(1));
        assert!(value.nth_bit(7));
        assert!(!value.nth_bit(0));
    }

    #[test]
    fn bits_of_a_word() {
        let value = 0b0100_0000_0000_0001u16;

        assert!(value.nth_bit(0));
        assert!(value.nth_bit(14));
        assert!(!value.nth_bit(15));
    }
}
