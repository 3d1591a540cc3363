use crate::cartridge::{Cartridge, ColorSupport};
use crate::cpu::Memory;
use crate::interrupts::Interrupt;
use crate::utils::NthBit;
use crate::{Address, Byte};

pub const VRAM_BANK_SIZE: usize = 0x2000;
pub const WRAM_BANK_SIZE: usize = 0x1000;
pub const OAM_SIZE: usize = 0xa0;
pub const IO_SIZE: usize = 0x80;
pub const HRAM_SIZE: usize = 0x7f;
const PALETTE_RAM_SIZE: usize = 64;

/// Bus-visible I/O register addresses.
pub mod registers {
    use crate::Address;

    pub const JOYPAD: Address = 0xff00;
    pub const INTERRUPT_FLAG: Address = 0xff0f;
    pub const LCD_CONTROL: Address = 0xff40;
    pub const LCD_STATUS: Address = 0xff41;
    pub const SCROLL_Y: Address = 0xff42;
    pub const SCROLL_X: Address = 0xff43;
    pub const LCD_LINE: Address = 0xff44;
    pub const LCD_LINE_COMPARE: Address = 0xff45;
    pub const OAM_DMA: Address = 0xff46;
    pub const BG_PALETTE: Address = 0xff47;
    pub const OBJ_PALETTE_0: Address = 0xff48;
    pub const OBJ_PALETTE_1: Address = 0xff49;
    pub const WINDOW_Y: Address = 0xff4a;
    pub const WINDOW_X: Address = 0xff4b;
    pub const VRAM_BANK: Address = 0xff4f;
    pub const VRAM_DMA_SOURCE_HIGH: Address = 0xff51;
    pub const VRAM_DMA_SOURCE_LOW: Address = 0xff52;
    pub const VRAM_DMA_DEST_HIGH: Address = 0xff53;
    pub const VRAM_DMA_DEST_LOW: Address = 0xff54;
    pub const VRAM_DMA_CONTROL: Address = 0xff55;
    pub const BG_PALETTE_INDEX: Address = 0xff68;
    pub const BG_PALETTE_DATA: Address = 0xff69;
    pub const OBJ_PALETTE_INDEX: Address = 0xff6a;
    pub const OBJ_PALETTE_DATA: Address = 0xff6b;
    pub const WRAM_BANK: Address = 0xff70;
    pub const INTERRUPT_ENABLE: Address = 0xffff;

    pub const AUDIO_START: Address = 0xff10;
    pub const AUDIO_END: Address = 0xff26;
    pub const WAVE_RAM_START: Address = 0xff30;
    pub const WAVE_RAM_END: Address = 0xff3f;
}

/// One session either behaves as the monochrome unit or the color unit;
/// picked once at load time from the cartridge header. Color-only state
/// (second video-RAM bank, palette files, high working-RAM banks) simply
/// stays unused in monochrome mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMode {
    Monochrome,
    Color,
}

/// 5-bit-per-channel palette memory behind an index latch with an
/// auto-increment-on-write bit.
#[derive(Debug)]
struct PaletteFile {
    data: [Byte; PALETTE_RAM_SIZE],
    index: Byte,
    auto_increment: bool,
}

impl Default for PaletteFile {
    fn default() -> Self {
        Self {
            data: [0xff; PALETTE_RAM_SIZE],
            index: 0,
            auto_increment: false,
        }
    }
}

impl PaletteFile {
    fn write_index(&mut self, value: Byte) {
        self.index = value & 0x3f;
        self.auto_increment = value.nth_bit(7);
    }

    fn read_index(&self) -> Byte {
        self.index | (self.auto_increment as Byte) << 7
    }

    fn write_data(&mut self, value: Byte) {
        self.data[self.index as usize] = value;
        if self.auto_increment {
            self.index = (self.index + 1) & 0x3f;
        }
    }

    fn read_data(&self) -> Byte {
        self.data[self.index as usize]
    }

    /// Raw 15-bit color for entry `color` of palette `palette`.
    fn color(&self, palette: usize, color: usize) -> u16 {
        let base = palette * 8 + color * 2;

        u16::from_le_bytes([self.data[base], self.data[base + 1]])
    }
}

/// Bulk VRAM transfer in flight. Partial H-Blank-paced state persists
/// across hook invocations until the block count runs out.
#[derive(Debug, Default)]
struct VramDma {
    source: Address,
    dest: Address,
    blocks_remaining: Byte,
    active: bool,
}

/// Owns every addressable byte of the machine and the bank-switching and
/// DMA logic that routes the 16-bit address space onto it. The CPU, PPU,
/// APU and joypad all borrow the bus; none of them copy or own it.
#[derive(Debug)]
pub struct Bus {
    cartridge: Option<Cartridge>,
    vram: [[Byte; VRAM_BANK_SIZE]; 2],
    wram: [[Byte; WRAM_BANK_SIZE]; 8],
    oam: [Byte; OAM_SIZE],
    io: [Byte; IO_SIZE],
    hram: [Byte; HRAM_SIZE],
    interrupt_enable: Byte,
    vram_bank: usize,
    wram_bank: usize,
    bg_palettes: PaletteFile,
    obj_palettes: PaletteFile,
    joypad_latch: Byte,
    mode: DeviceMode,
    vram_dma: VramDma,
    audio_writes: Vec<(Address, Byte)>,
}

impl Bus {
    pub fn new() -> Self {
        Self {
            cartridge: None,
            vram: [[0; VRAM_BANK_SIZE]; 2],
            wram: [[0; WRAM_BANK_SIZE]; 8],
            oam: [0; OAM_SIZE],
            io: power_on_io(),
            hram: [0; HRAM_SIZE],
            interrupt_enable: 0,
            vram_bank: 0,
            wram_bank: 1,
            bg_palettes: PaletteFile::default(),
            obj_palettes: PaletteFile::default(),
            joypad_latch: 0xff,
            mode: DeviceMode::Monochrome,
            vram_dma: VramDma::default(),
            audio_writes: Vec::new(),
        }
    }

    /// Installs a parsed cartridge and picks the session color mode from
    /// its header.
    pub fn insert_cartridge(&mut self, cartridge: Cartridge) {
        self.mode = match cartridge.info().color_support {
            ColorSupport::Monochrome => DeviceMode::Monochrome,
            ColorSupport::Compatible | ColorSupport::ColorOnly => DeviceMode::Color,
        };
        self.cartridge = Some(cartridge);
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.cartridge.as_ref()
    }

    pub(crate) fn take_cartridge(&mut self) -> Option<Cartridge> {
        self.cartridge.take()
    }

    pub fn mode(&self) -> DeviceMode {
        self.mode
    }

    pub fn request_interrupt(&mut self, interrupt: Interrupt) {
        self.io[(registers::INTERRUPT_FLAG & 0x7f) as usize] |= interrupt.mask();
    }

    /// Direct register poke for subsystems that own a read-only counter
    /// (LY, STAT mode bits, NR52 status). Skips the write-side routing.
    pub(crate) fn set_io_direct(&mut self, addr: Address, value: Byte) {
        self.io[(addr & 0x7f) as usize] = value;
    }

    pub(crate) fn set_joypad_latch(&mut self, latch: Byte) {
        self.joypad_latch = latch;
    }

    pub(crate) fn take_audio_writes(&mut self) -> Vec<(Address, Byte)> {
        std::mem::take(&mut self.audio_writes)
    }

    pub(crate) fn wave_ram(&self) -> &[Byte] {
        &self.io[0x30..0x40]
    }

    pub(crate) fn vram_bank_data(&self, bank: usize) -> &[Byte; VRAM_BANK_SIZE] {
        &self.vram[bank]
    }

    pub(crate) fn oam_data(&self) -> &[Byte; OAM_SIZE] {
        &self.oam
    }

    pub(crate) fn bg_palette_color(&self, palette: usize, color: usize) -> u16 {
        self.bg_palettes.color(palette, color)
    }

    pub(crate) fn obj_palette_color(&self, palette: usize, color: usize) -> u16 {
        self.obj_palettes.color(palette, color)
    }

    /// Synchronous 160-byte copy into OAM from `source_high << 8`.
    fn oam_dma(&mut self, source_high: Byte) {
        let base = Address::from(source_high) << 8;

        for offset in 0..OAM_SIZE {
            self.oam[offset] = self.read(base + offset as Address);
        }
    }

    fn start_vram_dma(&mut self, control: Byte) {
        if self.vram_dma.active && !control.nth_bit(7) {
            // Writing with bit 7 clear while a paced transfer runs stops it.
            self.vram_dma.active = false;
            return;
        }

        let source = u16::from_be_bytes([
            self.io[(registers::VRAM_DMA_SOURCE_HIGH & 0x7f) as usize],
            self.io[(registers::VRAM_DMA_SOURCE_LOW & 0x7f) as usize],
        ]) & 0xfff0;
        let dest = 0x8000
            | (u16::from_be_bytes([
                self.io[(registers::VRAM_DMA_DEST_HIGH & 0x7f) as usize],
                self.io[(registers::VRAM_DMA_DEST_LOW & 0x7f) as usize],
            ]) & 0x1ff0);
        let blocks = (control & 0x7f) + 1;

        self.vram_dma = VramDma {
            source,
            dest,
            blocks_remaining: blocks,
            active: control.nth_bit(7),
        };

        if !self.vram_dma.active {
            // All-at-once mode finishes before the write returns.
            for _ in 0..blocks {
                self.copy_vram_dma_block();
            }
            self.vram_dma.blocks_remaining = 0;
        }
    }

    fn copy_vram_dma_block(&mut self) {
        for _ in 0..16 {
            let value = self.read(self.vram_dma.source);
            self.write(self.vram_dma.dest, value);
            self.vram_dma.source = self.vram_dma.source.wrapping_add(1);
            self.vram_dma.dest = self.vram_dma.dest.wrapping_add(1);
        }
    }

    /// H-Blank-paced transfer hook, invoked once per H-Blank by the pixel
    /// processor. Moves one 16-byte block while a paced transfer is active.
    pub(crate) fn hblank_dma_step(&mut self) {
        if !self.vram_dma.active {
            return;
        }

        self.copy_vram_dma_block();
        self.vram_dma.blocks_remaining -= 1;
        if self.vram_dma.blocks_remaining == 0 {
            self.vram_dma.active = false;
        }
    }

    fn io_read(&self, addr: Address) -> Byte {
        let offset = (addr & 0x7f) as usize;

        match addr {
            registers::JOYPAD => self.joypad_snapshot(),
            registers::VRAM_BANK => self.vram_bank as Byte | 0xfe,
            registers::VRAM_DMA_CONTROL => match self.vram_dma.active {
                true => self.vram_dma.blocks_remaining - 1,
                false => 0xff,
            },
            registers::BG_PALETTE_INDEX => self.bg_palettes.read_index(),
            registers::BG_PALETTE_DATA => self.bg_palettes.read_data(),
            registers::OBJ_PALETTE_INDEX => self.obj_palettes.read_index(),
            registers::OBJ_PALETTE_DATA => self.obj_palettes.read_data(),
            _ => self.io[offset],
        }
    }

    /// Polled joypad snapshot: select bits as written, button nibble
    /// composed from the active-low latch. Both select groups pull the
    /// same four lines, so a selected group ANDs into the nibble.
    fn joypad_snapshot(&self) -> Byte {
        let select = self.io[0] & 0x30;
        let mut nibble = 0x0f;

        if !select.nth_bit(4) {
            nibble &= self.joypad_latch & 0x0f;
        }
        if !select.nth_bit(5) {
            nibble &= self.joypad_latch >> 4;
        }

        0xc0 | select | nibble
    }

    fn io_write(&mut self, addr: Address, value: Byte) {
        let offset = (addr & 0x7f) as usize;

        match addr {
            registers::JOYPAD => {
                self.io[offset] = (self.io[offset] & 0xcf) | (value & 0x30);
            }
            registers::LCD_LINE => {} // read-only scanline counter
            registers::OAM_DMA => {
                self.io[offset] = value;
                self.oam_dma(value);
            }
            registers::VRAM_BANK => {
                if self.mode == DeviceMode::Color {
                    self.vram_bank = (value & 0x01) as usize;
                }
                self.io[offset] = value;
            }
            registers::WRAM_BANK => {
                if self.mode == DeviceMode::Color {
                    self.wram_bank = ((value & 0x07).max(1)) as usize;
                }
                self.io[offset] = value;
            }
            registers::BG_PALETTE_INDEX => self.bg_palettes.write_index(value),
            registers::BG_PALETTE_DATA => self.bg_palettes.write_data(value),
            registers::OBJ_PALETTE_INDEX => self.obj_palettes.write_index(value),
            registers::OBJ_PALETTE_DATA => self.obj_palettes.write_data(value),
            registers::VRAM_DMA_CONTROL => self.start_vram_dma(value),
            registers::AUDIO_START..=registers::AUDIO_END => {
                self.io[offset] = value;
                self.audio_writes.push((addr, value));
            }
            _ => self.io[offset] = value,
        }
    }
}

impl Memory for Bus {
    fn read(&self, addr: Address) -> Byte {
        match addr {
            0x0000..=0x7fff => match &self.cartridge {
                Some(cartridge) => cartridge.read_rom(addr),
                None => 0xff,
            },
            0x8000..=0x9fff => self.vram[self.vram_bank][(addr - 0x8000) as usize],
            0xa000..=0xbfff => match &self.cartridge {
                Some(cartridge) => cartridge.read_ram(addr - 0xa000),
                None => 0xff,
            },
            0xc000..=0xcfff => self.wram[0][(addr - 0xc000) as usize],
            0xd000..=0xdfff => self.wram[self.wram_bank][(addr - 0xd000) as usize],
            0xe000..=0xfdff => self.read(addr - 0x2000),
            0xfe00..=0xfe9f => self.oam[(addr - 0xfe00) as usize],
            0xfea0..=0xfeff => 0,
            0xff00..=0xff7f => self.io_read(addr),
            0xff80..=0xfffe => self.hram[(addr - 0xff80) as usize],
            registers::INTERRUPT_ENABLE => self.interrupt_enable,
        }
    }

    fn write(&mut self, addr: Address, value: Byte) {
        match addr {
            0x0000..=0x7fff => {
                if let Some(cartridge) = &mut self.cartridge {
                    cartridge.control_write(addr, value);
                }
            }
            0x8000..=0x9fff => self.vram[self.vram_bank][(addr - 0x8000) as usize] = value,
            0xa000..=0xbfff => {
                if let Some(cartridge) = &mut self.cartridge {
                    cartridge.write_ram(addr - 0xa000, value);
                }
            }
            0xc000..=0xcfff => self.wram[0][(addr - 0xc000) as usize] = value,
            0xd000..=0xdfff => self.wram[self.wram_bank][(addr - 0xd000) as usize] = value,
            0xe000..=0xfdff => self.write(addr - 0x2000, value),
            0xfe00..=0xfe9f => self.oam[(addr - 0xfe00) as usize] = value,
            0xfea0..=0xfeff => {}
            0xff00..=0xff7f => self.io_write(addr, value),
            0xff80..=0xfffe => self.hram[(addr - 0xff80) as usize] = value,
            registers::INTERRUPT_ENABLE => self.interrupt_enable = value,
        }
    }
}

/// I/O state the boot code leaves behind when it hands control to the
/// cartridge entry point.
fn power_on_io() -> [Byte; IO_SIZE] {
    let mut io = [0; IO_SIZE];

    io[0x00] = 0xcf; // JOYP
    io[0x0f] = 0xe1; // IF
    io[0x24] = 0x77; // NR50
    io[0x25] = 0xf3; // NR51
    io[0x26] = 0xf1; // NR52
    io[0x40] = 0x91; // LCDC
    io[0x41] = 0x85; // STAT
    io[0x47] = 0xfc; // BGP
    io[0x48] = 0xff; // OBP0
    io[0x49] = 0xff; // OBP1

    io
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::test_support::rom_image;
    use pretty_assertions::assert_eq;

    fn bus_with_cartridge(kind: Byte, rom_banks: usize, ram_size_code: Byte) -> Bus {
        let mut bus = Bus::new();
        let cartridge =
            Cartridge::new(&rom_image(kind, rom_banks, ram_size_code)).expect("valid image");
        bus.insert_cartridge(cartridge);

        bus
    }

    fn color_bus() -> Bus {
        let mut data = rom_image(0x00, 2, 0);
        data[0x143] = 0x80;
        let mut bus = Bus::new();
        bus.insert_cartridge(Cartridge::new(&data).expect("valid image"));

        bus
    }

    mod round_trips {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn video_ram() {
            let mut bus = Bus::new();
            bus.write(0x8123, 0xaa);

            assert_eq!(0xaa, bus.read(0x8123));
        }

        #[test]
        fn working_ram_both_windows() {
            let mut bus = Bus::new();
            bus.write(0xc005, 0x11);
            bus.write(0xd005, 0x22);

            assert_eq!(0x11, bus.read(0xc005));
            assert_eq!(0x22, bus.read(0xd005));
        }

        #[test]
        fn object_attribute_table() {
            let mut bus = Bus::new();
            bus.write(0xfe10, 0x42);

            assert_eq!(0x42, bus.read(0xfe10));
        }

        #[test]
        fn high_ram() {
            let mut bus = Bus::new();
            bus.write(0xff80, 0x99);
            bus.write(0xfffe, 0x17);

            assert_eq!(0x99, bus.read(0xff80));
            assert_eq!(0x17, bus.read(0xfffe));
        }

        #[test]
        fn interrupt_registers() {
            let mut bus = Bus::new();
            bus.write(registers::INTERRUPT_ENABLE, 0x1f);
            bus.write(registers::INTERRUPT_FLAG, 0x05);

            assert_eq!(0x1f, bus.read(registers::INTERRUPT_ENABLE));
            assert_eq!(0x05, bus.read(registers::INTERRUPT_FLAG));
        }

        #[test]
        fn plain_io_register() {
            let mut bus = Bus::new();
            bus.write(registers::SCROLL_Y, 0x53);

            assert_eq!(0x53, bus.read(registers::SCROLL_Y));
        }
    }

    mod echo_ram {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn working_ram_write_shows_in_echo() {
            let mut bus = Bus::new();
            bus.write(0xc005, 0xab);

            assert_eq!(0xab, bus.read(0xe005));
        }

        #[test]
        fn echo_write_shows_in_working_ram() {
            let mut bus = Bus::new();
            bus.write(0xe005, 0xcd);

            assert_eq!(0xcd, bus.read(0xc005));
        }
    }

    #[test]
    fn unused_region_reads_zero_and_ignores_writes() {
        let mut bus = Bus::new();
        bus.write(0xfeb0, 0xff);

        assert_eq!(0, bus.read(0xfeb0));
    }

    #[test]
    fn missing_cartridge_reads_open_bus() {
        let bus = Bus::new();

        assert_eq!(0xff, bus.read(0x0100));
        assert_eq!(0xff, bus.read(0xa000));
    }

    mod banking {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn rom_bank_select_moves_the_switchable_window() {
            let mut bus = bus_with_cartridge(0x01, 8, 0);

            bus.write(0x2000, 5);

            assert_eq!(5, bus.read(0x4000));
            // Fixed low window is untouched by bank selects.
            assert_eq!(0, bus.read(0x0000));
        }

        #[test]
        fn rom_bank_zero_coerces_to_one() {
            let mut bus = bus_with_cartridge(0x01, 8, 0);

            bus.write(0x2000, 0);

            assert_eq!(1, bus.read(0x4000));
        }

        #[test]
        fn cartridge_ram_gated_by_enable_latch() {
            let mut bus = bus_with_cartridge(0x03, 2, 0x03);

            bus.write(0xa000, 0x42);
            assert_eq!(0xff, bus.read(0xa000));

            bus.write(0x0000, 0x0a);
            bus.write(0xa000, 0x42);
            assert_eq!(0x42, bus.read(0xa000));
        }

        #[test]
        fn video_ram_banks_switch_in_color_mode() {
            let mut bus = color_bus();

            bus.write(0x8000, 0x11);
            bus.write(registers::VRAM_BANK, 1);
            bus.write(0x8000, 0x22);

            assert_eq!(0x22, bus.read(0x8000));
            bus.write(registers::VRAM_BANK, 0);
            assert_eq!(0x11, bus.read(0x8000));
        }

        #[test]
        fn video_ram_bank_select_ignored_in_monochrome_mode() {
            let mut bus = bus_with_cartridge(0x00, 2, 0);

            bus.write(0x8000, 0x11);
            bus.write(registers::VRAM_BANK, 1);

            assert_eq!(0x11, bus.read(0x8000));
        }

        #[test]
        fn working_ram_bank_zero_coerces_to_one() {
            let mut bus = color_bus();

            bus.write(0xd000, 0x11);
            bus.write(registers::WRAM_BANK, 0);

            assert_eq!(0x11, bus.read(0xd000));
        }
    }

    #[test]
    fn oam_dma_copies_one_page_prefix() {
        let mut bus = Bus::new();
        for offset in 0..OAM_SIZE as Address {
            bus.write(0xc000 + offset, offset as Byte);
        }

        bus.write(registers::OAM_DMA, 0xc0);

        assert_eq!(0x00, bus.read(0xfe00));
        assert_eq!(0x9f, bus.read(0xfe9f));
    }

    mod vram_dma {
        use super::*;
        use pretty_assertions::assert_eq;

        fn prime_transfer(bus: &mut Bus, blocks: Byte) {
            for offset in 0..(blocks as Address * 16) {
                bus.write(0xc100 + offset, (offset + 1) as Byte);
            }
            bus.write(registers::VRAM_DMA_SOURCE_HIGH, 0xc1);
            bus.write(registers::VRAM_DMA_SOURCE_LOW, 0x00);
            bus.write(registers::VRAM_DMA_DEST_HIGH, 0x00);
            bus.write(registers::VRAM_DMA_DEST_LOW, 0x00);
        }

        #[test]
        fn all_at_once_mode_finishes_immediately() {
            let mut bus = color_bus();
            prime_transfer(&mut bus, 2);

            bus.write(registers::VRAM_DMA_CONTROL, 0x01);

            assert_eq!(1, bus.read(0x8000));
            assert_eq!(32, bus.read(0x801f));
            assert_eq!(0xff, bus.read(registers::VRAM_DMA_CONTROL));
        }

        #[test]
        fn paced_mode_moves_one_block_per_hblank() {
            let mut bus = color_bus();
            prime_transfer(&mut bus, 2);

            bus.write(registers::VRAM_DMA_CONTROL, 0x81);

            // Nothing moves until the H-Blank hook runs.
            assert_eq!(0, bus.read(0x8000));

            bus.hblank_dma_step();
            assert_eq!(1, bus.read(0x8000));
            assert_eq!(0, bus.read(0x8010));
            assert_eq!(0, bus.read(registers::VRAM_DMA_CONTROL));

            bus.hblank_dma_step();
            assert_eq!(17, bus.read(0x8010));
            assert_eq!(0xff, bus.read(registers::VRAM_DMA_CONTROL));
        }
    }

    mod palette_file {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn auto_increment_advances_the_index() {
            let mut bus = color_bus();

            bus.write(registers::BG_PALETTE_INDEX, 0x80);
            bus.write(registers::BG_PALETTE_DATA, 0x1f);
            bus.write(registers::BG_PALETTE_DATA, 0x2a);

            bus.write(registers::BG_PALETTE_INDEX, 0x00);
            assert_eq!(0x1f, bus.read(registers::BG_PALETTE_DATA));
            bus.write(registers::BG_PALETTE_INDEX, 0x01);
            assert_eq!(0x2a, bus.read(registers::BG_PALETTE_DATA));

            assert_eq!(0x2a1f, bus.bg_palette_color(0, 0));
        }

        #[test]
        fn reads_do_not_advance_the_index() {
            let mut bus = color_bus();

            bus.write(registers::OBJ_PALETTE_INDEX, 0x80);
            bus.read(registers::OBJ_PALETTE_DATA);

            assert_eq!(0x80, bus.read(registers::OBJ_PALETTE_INDEX));
        }
    }

    #[test]
    fn joypad_snapshot_composes_selected_groups() {
        let mut bus = Bus::new();
        // Directions: RIGHT pressed; buttons: A pressed (active-low latch).
        bus.set_joypad_latch(!0x11);

        bus.write(registers::JOYPAD, 0x20); // select directions only
        assert_eq!(0xe0 | 0x0e, bus.read(registers::JOYPAD));

        bus.write(registers::JOYPAD, 0x10); // select buttons only
        assert_eq!(0xd0 | 0x0e, bus.read(registers::JOYPAD));

        bus.write(registers::JOYPAD, 0x30); // nothing selected
        assert_eq!(0xff, bus.read(registers::JOYPAD));
    }
}
