mod frame;
pub mod registers;

pub use frame::Frame;

use crate::bus::{registers as io, Bus, DeviceMode};
use crate::cpu::Memory;
use crate::interrupts::Interrupt;
use crate::ppu::registers::{LcdControl, TileAttributes};
use crate::utils::NthBit;
use crate::Byte;

pub type Rgb = (Byte, Byte, Byte);

pub const SCANLINE_CYCLES: u32 = 456;
pub const SCANLINE_COUNT: Byte = 154;
pub const VISIBLE_SCANLINES: Byte = 144;
const MAX_SPRITES_PER_LINE: usize = 10;
const OAM_ENTRY_COUNT: usize = 40;

/// Shades for the single-palette-register color path, light to dark.
const MONO_SHADES: [Rgb; 4] = [
    (0xff, 0xff, 0xff),
    (0xaa, 0xaa, 0xaa),
    (0x55, 0x55, 0x55),
    (0x00, 0x00, 0x00),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    HBlank,
    VBlank,
    OamScan,
    Transfer,
}

impl Mode {
    const fn bits(self) -> Byte {
        match self {
            Self::HBlank => 0,
            Self::VBlank => 1,
            Self::OamScan => 2,
            Self::Transfer => 3,
        }
    }
}

/// One OAM entry, normalized to screen coordinates during discovery.
#[derive(Debug, Clone, Copy)]
struct Sprite {
    y: i16,
    x: i16,
    tile: Byte,
    attributes: TileAttributes,
}

/// Scanline state machine with a 456-cycle period. Crossing the period
/// boundary advances the line counter modulo 154; visible lines render
/// into the pixel buffer, line 144 raises the V-Blank interrupt.
#[derive(Debug)]
pub struct Ppu {
    scanline_cycles: u32,
    scanline: Byte,
    mode: Mode,
    frame: Frame,
    /// Per-pixel record of whether the background drew color index 0 on
    /// the current line; sprite priority consults this instead of reading
    /// pixels back out of the buffer.
    bg_zero: [bool; Frame::WIDTH],
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            scanline_cycles: 0,
            scanline: 0,
            mode: Mode::OamScan,
            frame: Frame::default(),
            bg_zero: [true; Frame::WIDTH],
        }
    }

    /// The most recently completed buffer; valid until the next render.
    pub fn frame_buffer(&self) -> &[Byte] {
        self.frame.as_bytes()
    }

    pub fn scanline(&self) -> Byte {
        self.scanline
    }

    pub fn step(&mut self, bus: &mut Bus, cycles: u32) {
        self.scanline_cycles += cycles;

        while self.scanline_cycles >= SCANLINE_CYCLES {
            self.scanline_cycles -= SCANLINE_CYCLES;

            // Coarse steps can jump a whole line; the H-Blank entry must
            // still happen exactly once per visible line.
            if self.scanline < VISIBLE_SCANLINES && self.mode != Mode::HBlank {
                self.enter_mode(bus, Mode::HBlank);
            }

            self.advance_scanline(bus);
        }

        let mode = self.current_mode();
        if mode != self.mode {
            self.enter_mode(bus, mode);
        }
    }

    fn current_mode(&self) -> Mode {
        if self.scanline >= VISIBLE_SCANLINES {
            return Mode::VBlank;
        }

        match self.scanline_cycles {
            0..80 => Mode::OamScan,
            80..252 => Mode::Transfer,
            _ => Mode::HBlank,
        }
    }

    fn advance_scanline(&mut self, bus: &mut Bus) {
        self.scanline = (self.scanline + 1) % SCANLINE_COUNT;
        bus.set_io_direct(io::LCD_LINE, self.scanline);
        self.compare_line(bus);

        if self.scanline < VISIBLE_SCANLINES {
            self.enter_mode(bus, Mode::OamScan);
            self.render_scanline(bus);
        } else if self.scanline == VISIBLE_SCANLINES {
            bus.request_interrupt(Interrupt::VBlank);
            self.enter_mode(bus, Mode::VBlank);
        }
    }

    fn enter_mode(&mut self, bus: &mut Bus, mode: Mode) {
        self.mode = mode;

        let stat = bus.read(io::LCD_STATUS);
        let source_enabled = match mode {
            Mode::HBlank => {
                bus.hblank_dma_step();
                stat.nth_bit(3)
            }
            Mode::VBlank => stat.nth_bit(4),
            Mode::OamScan => stat.nth_bit(5),
            Mode::Transfer => false,
        };
        if source_enabled {
            bus.request_interrupt(Interrupt::Lcd);
        }

        self.write_status(bus);
    }

    fn compare_line(&mut self, bus: &mut Bus) {
        let matches = bus.read(io::LCD_LINE_COMPARE) == self.scanline;

        if matches && bus.read(io::LCD_STATUS).nth_bit(6) {
            bus.request_interrupt(Interrupt::Lcd);
        }

        self.write_status(bus);
    }

    fn write_status(&mut self, bus: &mut Bus) {
        let stat = bus.read(io::LCD_STATUS);
        let coincidence = (bus.read(io::LCD_LINE_COMPARE) == self.scanline) as Byte;

        bus.set_io_direct(
            io::LCD_STATUS,
            (stat & 0xf8) | coincidence << 2 | self.mode.bits(),
        );
    }

    fn render_scanline(&mut self, bus: &mut Bus) {
        let control = LcdControl::from(bus.read(io::LCD_CONTROL));
        if !control.contains(LcdControl::LCD_ENABLE) {
            return;
        }

        self.render_background(bus, control);
        if control.contains(LcdControl::SPRITES_ENABLE) {
            self.render_sprites(bus, control);
        }
    }

    /// Background and window pass. Also records, per pixel, whether the
    /// color index was 0, which the sprite pass needs for priority.
    fn render_background(&mut self, bus: &Bus, control: LcdControl) {
        let ly = self.scanline;
        let color_mode = bus.mode() == DeviceMode::Color;
        let scroll_y = bus.read(io::SCROLL_Y);
        let scroll_x = bus.read(io::SCROLL_X);
        let window_y = bus.read(io::WINDOW_Y);
        let window_x = bus.read(io::WINDOW_X).wrapping_sub(7);
        let mono_palette = bus.read(io::BG_PALETTE);

        let bg_enabled = control.contains(LcdControl::BG_ENABLE);
        let window_enabled = control.contains(LcdControl::WINDOW_ENABLE) && window_y <= ly;

        for px in 0..Frame::WIDTH as Byte {
            if !bg_enabled {
                self.bg_zero[px as usize] = true;
                self.frame.set_pixel(px.into(), ly.into(), MONO_SHADES[0]);
                continue;
            }

            let in_window = window_enabled && px >= window_x;
            let (x, y, map_offset) = match in_window {
                true => (
                    px - window_x,
                    ly - window_y,
                    control.window_tilemap_offset(),
                ),
                false => (
                    scroll_x.wrapping_add(px),
                    scroll_y.wrapping_add(ly),
                    control.bg_tilemap_offset(),
                ),
            };

            let entry = map_offset + usize::from(y / 8) * 32 + usize::from(x / 8);
            let tile_number = bus.vram_bank_data(0)[entry];
            let attributes = match color_mode {
                true => TileAttributes::from(bus.vram_bank_data(1)[entry]),
                false => TileAttributes::default(),
            };

            let row = match attributes.flip_y() {
                true => 7 - y % 8,
                false => y % 8,
            };
            let tile_data = bus.vram_bank_data(attributes.vram_bank());
            let base = control.tile_data_offset(tile_number) + usize::from(row) * 2;
            let bit = match attributes.flip_x() {
                true => x % 8,
                false => 7 - x % 8,
            };
            let color_index =
                (tile_data[base + 1].nth_bit(bit) as Byte) << 1 | tile_data[base].nth_bit(bit) as Byte;

            self.bg_zero[px as usize] = color_index == 0;

            let rgb = match color_mode {
                true => expand_color(
                    bus.bg_palette_color(attributes.color_palette(), color_index.into()),
                ),
                false => mono_shade(mono_palette, color_index),
            };
            self.frame.set_pixel(px.into(), ly.into(), rgb);
        }
    }

    /// Sprite pass: up to ten sprites in OAM discovery order, re-sorted by
    /// ascending x with ties keeping discovery order. Drawing back to front
    /// leaves the lowest x on top.
    fn render_sprites(&mut self, bus: &Bus, control: LcdControl) {
        let ly = i16::from(self.scanline);
        let height = control.sprite_height();
        let color_mode = bus.mode() == DeviceMode::Color;
        let oam = bus.oam_data();

        let mut visible: Vec<Sprite> = Vec::with_capacity(MAX_SPRITES_PER_LINE);
        for index in 0..OAM_ENTRY_COUNT {
            let entry = &oam[index * 4..index * 4 + 4];
            let y = i16::from(entry[0]) - 16;

            if (y..y + height).contains(&ly) {
                visible.push(Sprite {
                    y,
                    x: i16::from(entry[1]) - 8,
                    tile: entry[2],
                    attributes: entry[3].into(),
                });

                if visible.len() == MAX_SPRITES_PER_LINE {
                    break;
                }
            }
        }

        visible.sort_by_key(|sprite| sprite.x);

        for sprite in visible.iter().rev() {
            let attributes = sprite.attributes;
            let mut row = ly - sprite.y;
            if attributes.flip_y() {
                row = height - 1 - row;
            }

            // Tall sprites span two consecutive tile records; the row
            // offset walks straight across both.
            let tile = match height {
                16 => sprite.tile & 0xfe,
                _ => sprite.tile,
            };
            let bank = match color_mode {
                true => attributes.vram_bank(),
                false => 0,
            };
            let tile_data = bus.vram_bank_data(bank);
            let base = usize::from(tile) * 16 + row as usize * 2;
            let low = tile_data[base];
            let high = tile_data[base + 1];

            for column in 0..8i16 {
                let px = sprite.x + column;
                if !(0..Frame::WIDTH as i16).contains(&px) {
                    continue;
                }

                let bit = match attributes.flip_x() {
                    true => column as u8,
                    false => 7 - column as u8,
                };
                let color_index = (high.nth_bit(bit) as Byte) << 1 | low.nth_bit(bit) as Byte;

                // Color 0 is transparent for sprites.
                if color_index == 0 {
                    continue;
                }
                if attributes.behind_background() && !self.bg_zero[px as usize] {
                    continue;
                }

                let rgb = match color_mode {
                    true => expand_color(
                        bus.obj_palette_color(attributes.color_palette(), color_index.into()),
                    ),
                    false => {
                        let palette = match attributes.mono_palette() {
                            true => bus.read(io::OBJ_PALETTE_1),
                            false => bus.read(io::OBJ_PALETTE_0),
                        };
                        mono_shade(palette, color_index)
                    }
                };
                self.frame.set_pixel(px as usize, ly as usize, rgb);
            }
        }
    }
}

fn mono_shade(palette: Byte, color_index: Byte) -> Rgb {
    MONO_SHADES[usize::from(palette >> (color_index * 2) & 0x03)]
}

/// Expands one 15-bit palette entry, rounding each 5-bit channel to the
/// nearest 8-bit value.
fn expand_color(raw: u16) -> Rgb {
    let channel = |shift: u16| (u32::from(raw >> shift & 0x1f) * 510 + 31) / 62;

    (
        channel(0) as Byte,
        channel(5) as Byte,
        channel(10) as Byte,
    )
}
