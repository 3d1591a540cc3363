use sabi_gb::Byte;

pub const ROM_BANK_SIZE: usize = 0x4000;

/// Builds a synthetic cartridge image: a valid header, the first byte of
/// every 16KB bank stamped with the bank index, everything else zero (which
/// executes as NOP).
pub fn rom_image(kind: Byte, rom_banks: usize, ram_size_code: Byte) -> Vec<Byte> {
    let mut data = vec![0u8; rom_banks * ROM_BANK_SIZE];

    for (bank, chunk) in data.chunks_mut(ROM_BANK_SIZE).enumerate() {
        chunk[0] = bank as Byte;
    }

    data[0x134..0x138].copy_from_slice(b"TEST");
    data[0x147] = kind;
    data[0x148] = (rom_banks / 2).trailing_zeros() as Byte;
    data[0x149] = ram_size_code;

    data
}

/// Same image with the header text and bank markers blanked, so the whole
/// execution path is NOPs.
#[allow(unused)]
pub fn nop_image(kind: Byte, rom_banks: usize) -> Vec<Byte> {
    let mut data = rom_image(kind, rom_banks, 0);

    data[0x134..0x138].fill(0);
    for bank in 1..rom_banks {
        data[bank * ROM_BANK_SIZE] = 0;
    }

    data
}
