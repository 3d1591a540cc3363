mod noise_channel;
mod pulse_channel;
mod wave_channel;

pub use noise_channel::NoiseChannel;
pub use pulse_channel::PulseChannel;
pub use wave_channel::WaveChannel;

use crate::utils::NthBit;
use crate::Byte;

/// Length counter shared by all four channels. Clocked at 256 Hz by the
/// frame sequencer; reaching zero while counting is enabled silences the
/// owning channel.
#[derive(Debug, Default)]
pub struct LengthCounter {
    remaining: u16,
    maximum: u16,
    pub enabled: bool,
}

impl LengthCounter {
    pub fn new(maximum: u16) -> Self {
        Self {
            remaining: 0,
            maximum,
            enabled: false,
        }
    }

    /// Loads the counter from the register value (remaining time is the
    /// maximum minus the written length).
    pub fn load(&mut self, value: u16) {
        self.remaining = self.maximum - value;
    }

    /// A trigger with an expired counter rearms it at the maximum.
    pub fn trigger(&mut self) {
        if self.remaining == 0 {
            self.remaining = self.maximum;
        }
    }

    /// Returns false when the counter expires and the channel must shut off.
    pub fn clock(&mut self) -> bool {
        if !self.enabled || self.remaining == 0 {
            return true;
        }

        self.remaining -= 1;
        self.remaining > 0
    }
}

/// Volume envelope for the pulse and noise channels: a 4-bit volume walked
/// up or down at the configured sub-rate of the frame sequencer.
#[derive(Debug, Default)]
pub struct Envelope {
    raw: Byte,
    volume: Byte,
    countdown: Byte,
}

impl Envelope {
    pub fn configure(&mut self, value: Byte) {
        self.raw = value;
    }

    /// The channel DAC runs while any of the upper five register bits are
    /// set; switching it off silences the channel immediately.
    pub fn dac_enabled(&self) -> bool {
        self.raw & 0xf8 != 0
    }

    pub fn trigger(&mut self) {
        self.volume = self.raw >> 4;
        self.countdown = self.period();
    }

    pub fn clock(&mut self) {
        if self.period() == 0 {
            return;
        }

        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown > 0 {
            return;
        }
        self.countdown = self.period();

        if self.raw.nth_bit(3) {
            if self.volume < 15 {
                self.volume += 1;
            }
        } else if self.volume > 0 {
            self.volume -= 1;
        }
    }

    pub fn volume(&self) -> Byte {
        self.volume
    }

    fn period(&self) -> Byte {
        self.raw & 0x07
    }
}
