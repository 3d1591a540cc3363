use crate::bus::Bus;
use crate::interrupts::Interrupt;
use crate::Byte;
use bitflags::bitflags;
use derive_more::Display;

bitflags! {
    /// Held-button state, one bit per button. The bus-facing latch is the
    /// complement of this (the hardware lines are active-low).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Buttons: Byte {
        const RIGHT  = 0b0000_0001;
        const LEFT   = 0b0000_0010;
        const UP     = 0b0000_0100;
        const DOWN   = 0b0000_1000;
        const A      = 0b0001_0000;
        const B      = 0b0010_0000;
        const SELECT = 0b0100_0000;
        const START  = 0b1000_0000;
    }
}

/// Host-facing button identifiers.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Right,
    Left,
    Up,
    Down,
    A,
    B,
    Select,
    Start,
}

impl Button {
    fn flag(self) -> Buttons {
        match self {
            Self::Right => Buttons::RIGHT,
            Self::Left => Buttons::LEFT,
            Self::Up => Buttons::UP,
            Self::Down => Buttons::DOWN,
            Self::A => Buttons::A,
            Self::B => Buttons::B,
            Self::Select => Buttons::SELECT,
            Self::Start => Buttons::START,
        }
    }
}

/// Edge-triggered input latch. Press/release events mutate the held state
/// and push the active-low latch byte to the bus; the polled register
/// snapshot is composed by the bus on read, so late select-line writes see
/// fresh button state.
#[derive(Debug, Default)]
pub struct Joypad {
    pressed: Buttons,
}

impl Joypad {
    pub fn press(&mut self, bus: &mut Bus, button: Button) {
        self.pressed.insert(button.flag());
        bus.set_joypad_latch(!self.pressed.bits());
        bus.request_interrupt(Interrupt::Joypad);
    }

    pub fn release(&mut self, bus: &mut Bus, button: Button) {
        self.pressed.remove(button.flag());
        bus.set_joypad_latch(!self.pressed.bits());
    }
}
