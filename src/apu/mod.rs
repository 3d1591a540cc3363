mod channels;
mod frame_sequencer;

use crate::apu::channels::{NoiseChannel, PulseChannel, WaveChannel};
use crate::apu::frame_sequencer::{
    clocks_envelope, clocks_length, clocks_sweep, FrameSequencer,
};
use crate::bus::Bus;
use crate::utils::NthBit;
use crate::{Address, Byte, CLOCK_RATE};
use std::collections::VecDeque;

pub const SAMPLE_RATE: u32 = 48_000;
const CYCLES_PER_SAMPLE: u32 = CLOCK_RATE / SAMPLE_RATE;
/// Roughly a third of a second of buffered stereo pairs; older samples are
/// dropped if the host stops draining.
const SAMPLE_BUFFER_LIMIT: usize = 16_384;

const NR10: Address = 0xff10;
const NR11: Address = 0xff11;
const NR12: Address = 0xff12;
const NR13: Address = 0xff13;
const NR14: Address = 0xff14;
const NR21: Address = 0xff16;
const NR22: Address = 0xff17;
const NR23: Address = 0xff18;
const NR24: Address = 0xff19;
const NR30: Address = 0xff1a;
const NR31: Address = 0xff1b;
const NR32: Address = 0xff1c;
const NR33: Address = 0xff1d;
const NR34: Address = 0xff1e;
const NR41: Address = 0xff20;
const NR42: Address = 0xff21;
const NR43: Address = 0xff22;
const NR44: Address = 0xff23;
const NR50: Address = 0xff24;
const NR51: Address = 0xff25;
const NR52: Address = 0xff26;

/// Four-channel programmable sound generator. Oscillators advance with the
/// CPU clock, a shared frame sequencer paces the slow units, and samples
/// are captured into a ring the host drains once per frame.
#[derive(Debug)]
pub struct Apu {
    pulse1: PulseChannel,
    pulse2: PulseChannel,
    wave: WaveChannel,
    noise: NoiseChannel,
    sequencer: FrameSequencer,
    power: bool,
    /// NR51: per-channel left/right routing mask.
    routing: Byte,
    /// NR50: master volume for each output terminal.
    master_volume: Byte,
    sample_timer: u32,
    samples: VecDeque<(f32, f32)>,
}

impl Apu {
    pub fn new() -> Self {
        Self {
            pulse1: PulseChannel::new(true),
            pulse2: PulseChannel::new(false),
            wave: WaveChannel::new(),
            noise: NoiseChannel::new(),
            sequencer: FrameSequencer::default(),
            power: true,
            routing: 0xf3,
            master_volume: 0x77,
            sample_timer: 0,
            samples: VecDeque::new(),
        }
    }

    pub fn step(&mut self, bus: &mut Bus, cycles: u32) {
        for (addr, value) in bus.take_audio_writes() {
            self.register_write(addr, value);
        }

        if !self.power {
            bus.set_io_direct(NR52, 0x70);
            return;
        }

        self.pulse1.step(cycles);
        self.pulse2.step(cycles);
        self.wave.step(cycles, bus.wave_ram());
        self.noise.step(cycles);

        if let Some(tick) = self.sequencer.tick(cycles) {
            if clocks_length(tick) {
                self.pulse1.clock_length();
                self.pulse2.clock_length();
                self.wave.clock_length();
                self.noise.clock_length();
            }
            if clocks_sweep(tick) {
                self.pulse1.clock_sweep();
            }
            if clocks_envelope(tick) {
                self.pulse1.clock_envelope();
                self.pulse2.clock_envelope();
                self.noise.clock_envelope();
            }
        }

        self.capture_samples(cycles);
        bus.set_io_direct(NR52, self.status());
    }

    fn register_write(&mut self, addr: Address, value: Byte) {
        if addr == NR52 {
            let power = value.nth_bit(7);
            if !power && self.power {
                self.power_off();
            }
            self.power = power;
            return;
        }

        // Everything below NR52 is dead while the master enable is off.
        if !self.power {
            return;
        }

        match addr {
            NR10 => self.pulse1.set_sweep(value),
            NR11 => self.pulse1.set_duty_length(value),
            NR12 => self.pulse1.set_envelope(value),
            NR13 => self.pulse1.set_frequency_low(value),
            NR14 => self.pulse1.set_frequency_high(value),
            NR21 => self.pulse2.set_duty_length(value),
            NR22 => self.pulse2.set_envelope(value),
            NR23 => self.pulse2.set_frequency_low(value),
            NR24 => self.pulse2.set_frequency_high(value),
            NR30 => self.wave.set_dac(value),
            NR31 => self.wave.set_length(value),
            NR32 => self.wave.set_volume(value),
            NR33 => self.wave.set_frequency_low(value),
            NR34 => self.wave.set_frequency_high(value),
            NR41 => self.noise.set_length(value),
            NR42 => self.noise.set_envelope(value),
            NR43 => self.noise.set_polynomial(value),
            NR44 => self.noise.set_control(value),
            NR50 => self.master_volume = value,
            NR51 => self.routing = value,
            _ => {}
        }
    }

    /// Clearing the master enable resets every channel and the sequencer
    /// to power-on defaults; the host-facing sample ring survives.
    fn power_off(&mut self) {
        self.pulse1 = PulseChannel::new(true);
        self.pulse2 = PulseChannel::new(false);
        self.wave = WaveChannel::new();
        self.noise = NoiseChannel::new();
        self.sequencer.reset();
        self.routing = 0;
        self.master_volume = 0;
    }

    fn status(&self) -> Byte {
        0xf0 | self.pulse1.enabled as Byte
            | (self.pulse2.enabled as Byte) << 1
            | (self.wave.enabled as Byte) << 2
            | (self.noise.enabled as Byte) << 3
    }

    fn capture_samples(&mut self, cycles: u32) {
        self.sample_timer += cycles;

        while self.sample_timer >= CYCLES_PER_SAMPLE {
            self.sample_timer -= CYCLES_PER_SAMPLE;

            if self.samples.len() == SAMPLE_BUFFER_LIMIT {
                self.samples.pop_front();
            }
            let sample = self.sample();
            self.samples.push_back(sample);
        }
    }

    /// Current mixer output: channel DACs routed through NR51 and scaled
    /// by the NR50 terminal volumes, one stereo pair in [-1, 1].
    pub fn sample(&self) -> (f32, f32) {
        if !self.power {
            return (0.0, 0.0);
        }

        let dacs = [
            channel_dac(self.pulse1.enabled, self.pulse1.output()),
            channel_dac(self.pulse2.enabled, self.pulse2.output()),
            channel_dac(self.wave.enabled, self.wave.output()),
            channel_dac(self.noise.enabled, self.noise.output()),
        ];

        let mut left = 0.0;
        let mut right = 0.0;
        for (index, dac) in dacs.iter().enumerate() {
            if self.routing.nth_bit(index as u8 + 4) {
                left += dac;
            }
            if self.routing.nth_bit(index as u8) {
                right += dac;
            }
        }

        let left_volume = f32::from((self.master_volume >> 4 & 0x07) + 1) / 8.0;
        let right_volume = f32::from((self.master_volume & 0x07) + 1) / 8.0;

        (left * left_volume / 4.0, right * right_volume / 4.0)
    }

    /// Drains `count` captured stereo pairs into an interleaved buffer,
    /// padding any underrun with the current mixer output.
    pub fn take_samples(&mut self, count: usize) -> Vec<f32> {
        let mut buffer = Vec::with_capacity(count * 2);

        for _ in 0..count {
            let (left, right) = self.samples.pop_front().unwrap_or_else(|| self.sample());
            buffer.push(left);
            buffer.push(right);
        }

        buffer
    }
}

fn channel_dac(enabled: bool, level: Byte) -> f32 {
    match enabled {
        true => f32::from(level) / 7.5 - 1.0,
        false => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::Memory;
    use pretty_assertions::assert_eq;

    fn playing_pulse1(bus: &mut Bus, apu: &mut Apu) {
        bus.write(NR12, 0xf0); // volume 15, DAC on
        bus.write(NR11, 0x80); // duty 2: starts high
        bus.write(NR14, 0x80); // trigger
        apu.step(bus, 4);
    }

    #[test]
    fn status_register_reports_enabled_channels() {
        let mut bus = Bus::new();
        let mut apu = Apu::new();

        playing_pulse1(&mut bus, &mut apu);

        assert_eq!(0xf1, bus.read(NR52));
    }

    #[test]
    fn length_counter_expiry_silences_the_channel() {
        let mut bus = Bus::new();
        let mut apu = Apu::new();
        bus.write(NR12, 0xf0);
        bus.write(NR11, 0xbf); // length 63: one clock left
        bus.write(NR14, 0xc0); // trigger with length counting on

        apu.step(&mut bus, 4);
        assert_eq!(0x01, bus.read(NR52) & 0x01);

        // Cross the first sequencer tick, which clocks lengths.
        apu.step(&mut bus, frame_sequencer::FRAME_SEQUENCER_PERIOD);

        assert_eq!(0x00, bus.read(NR52) & 0x01);
    }

    #[test]
    fn routing_mask_gates_each_terminal() {
        let mut bus = Bus::new();
        let mut apu = Apu::new();
        bus.write(NR50, 0x77);
        bus.write(NR51, 0x01); // channel 1 to the right terminal only
        playing_pulse1(&mut bus, &mut apu);

        let (left, right) = apu.sample();

        assert_eq!(0.0, left);
        assert_eq!(0.25, right);
    }

    #[test]
    fn master_volume_scales_the_mix() {
        let mut bus = Bus::new();
        let mut apu = Apu::new();
        bus.write(NR50, 0x30); // left 4/8, right 1/8
        bus.write(NR51, 0x11);
        playing_pulse1(&mut bus, &mut apu);

        let (left, right) = apu.sample();

        assert_eq!(0.125, left);
        assert_eq!(0.03125, right);
    }

    #[test]
    fn clearing_the_master_enable_resets_and_silences() {
        let mut bus = Bus::new();
        let mut apu = Apu::new();
        playing_pulse1(&mut bus, &mut apu);

        bus.write(NR52, 0x00);
        apu.step(&mut bus, 4);

        assert_eq!(0x70, bus.read(NR52));
        assert_eq!((0.0, 0.0), apu.sample());

        // Channel state was reset, not just muted: re-enabling power does
        // not bring the old voice back.
        bus.write(NR52, 0x80);
        apu.step(&mut bus, 4);
        assert_eq!(0xf0, bus.read(NR52));
    }

    #[test]
    fn writes_are_ignored_while_powered_off() {
        let mut bus = Bus::new();
        let mut apu = Apu::new();
        bus.write(NR52, 0x00);
        apu.step(&mut bus, 4);

        bus.write(NR12, 0xf0);
        bus.write(NR14, 0x80);
        bus.write(NR52, 0x80);
        apu.step(&mut bus, 4);

        assert_eq!(0xf0, bus.read(NR52));
    }

    #[test]
    fn take_samples_interleaves_and_pads_underruns() {
        let mut bus = Bus::new();
        let mut apu = Apu::new();
        bus.write(NR51, 0x00);
        apu.step(&mut bus, CYCLES_PER_SAMPLE * 3);

        let buffer = apu.take_samples(5);

        assert_eq!(10, buffer.len());
        assert!(buffer.iter().all(|&sample| sample == 0.0));
    }

    #[test]
    fn capture_paces_one_sample_per_interval() {
        let mut bus = Bus::new();
        let mut apu = Apu::new();

        apu.step(&mut bus, CYCLES_PER_SAMPLE * 4);

        assert_eq!(4, apu.samples.len());
    }
}
