use crate::utils::NthBit;
use crate::Byte;
use bitflags::bitflags;

bitflags! {
    /// LCDC: master switch plus the addressing and enable bits the
    /// renderer consults every scanline.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LcdControl: Byte {
        const BG_ENABLE      = 0b0000_0001;
        const SPRITES_ENABLE = 0b0000_0010;
        const SPRITE_SIZE    = 0b0000_0100;
        const BG_TILEMAP     = 0b0000_1000;
        const TILE_DATA      = 0b0001_0000;
        const WINDOW_ENABLE  = 0b0010_0000;
        const WINDOW_TILEMAP = 0b0100_0000;
        const LCD_ENABLE     = 0b1000_0000;
    }
}

impl From<Byte> for LcdControl {
    fn from(value: Byte) -> Self {
        Self::from_bits_truncate(value)
    }
}

impl LcdControl {
    /// Tilemap offsets are relative to the 0x8000 video-RAM base.
    pub fn bg_tilemap_offset(&self) -> usize {
        match self.contains(Self::BG_TILEMAP) {
            true => 0x1c00,
            false => 0x1800,
        }
    }

    pub fn window_tilemap_offset(&self) -> usize {
        match self.contains(Self::WINDOW_TILEMAP) {
            true => 0x1c00,
            false => 0x1800,
        }
    }

    /// Video-RAM offset of the 16-byte tile record; the low region indexes
    /// tiles unsigned from 0x0000, the high region signed around 0x1000.
    pub fn tile_data_offset(&self, tile_number: Byte) -> usize {
        match self.contains(Self::TILE_DATA) {
            true => tile_number as usize * 16,
            false => (0x1000 + isize::from(tile_number as i8) * 16) as usize,
        }
    }

    pub fn sprite_height(&self) -> i16 {
        match self.contains(Self::SPRITE_SIZE) {
            true => 16,
            false => 8,
        }
    }
}

/// Attribute byte layout shared by sprites (OAM byte 3) and, in color
/// mode, background tiles (the tilemap entry in video-RAM bank 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileAttributes(Byte);

impl From<Byte> for TileAttributes {
    fn from(value: Byte) -> Self {
        Self(value)
    }
}

impl TileAttributes {
    pub fn behind_background(self) -> bool {
        self.0.nth_bit(7)
    }

    pub fn flip_y(self) -> bool {
        self.0.nth_bit(6)
    }

    pub fn flip_x(self) -> bool {
        self.0.nth_bit(5)
    }

    /// Monochrome sprites pick OBP0 or OBP1 with this bit.
    pub fn mono_palette(self) -> bool {
        self.0.nth_bit(4)
    }

    pub fn vram_bank(self) -> usize {
        usize::from(self.0.nth_bit(3))
    }

    /// Color-mode palette number in the palette file.
    pub fn color_palette(self) -> usize {
        usize::from(self.0 & 0x07)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilemap_bases_follow_their_control_bits() {
        let control = LcdControl::from(0b0100_1000);

        assert_eq!(0x1c00, control.bg_tilemap_offset());
        assert_eq!(0x1c00, control.window_tilemap_offset());
        assert_eq!(0x1800, LcdControl::empty().bg_tilemap_offset());
    }

    #[test]
    fn unsigned_tile_addressing() {
        let control = LcdControl::TILE_DATA;

        assert_eq!(0x0000, control.tile_data_offset(0));
        assert_eq!(0x0ff0, control.tile_data_offset(0xff));
    }

    #[test]
    fn signed_tile_addressing() {
        let control = LcdControl::empty();

        assert_eq!(0x1000, control.tile_data_offset(0));
        assert_eq!(0x17f0, control.tile_data_offset(0x7f));
        assert_eq!(0x0800, control.tile_data_offset(0x80));
        assert_eq!(0x0ff0, control.tile_data_offset(0xff));
    }

    #[test]
    fn attribute_bits_decode() {
        let attributes = TileAttributes::from(0b1010_1101);

        assert!(attributes.behind_background());
        assert!(!attributes.flip_y());
        assert!(attributes.flip_x());
        assert_eq!(1, attributes.vram_bank());
        assert_eq!(5, attributes.color_palette());
    }
}
