use crate::apu::Apu;
use crate::bus::Bus;
use crate::cartridge::{Cartridge, CartridgeInfo};
use crate::cpu::Cpu;
use crate::diagnostics::Diagnostics;
use crate::input::joypad::{Button, Joypad};
use crate::ppu::Ppu;
use crate::{Byte, Result, CLOCK_RATE};

/// Documented output refresh rate of the machine.
pub const FRAME_RATE: f64 = 59.727_500_569_606;

/// Clock rate over frame rate, rounded: the fixed cycle budget one
/// `run_frame` call works through (70 224).
pub const CYCLES_PER_FRAME: u32 = (CLOCK_RATE as f64 / FRAME_RATE + 0.5) as u32;

/// One emulation session: owns the bus and every subsystem, and drives the
/// lot for exactly one frame's worth of cycles per `run_frame` call. Not
/// reentrant; the host serializes calls, one per display refresh. Dropping
/// the session releases all owned storage.
#[derive(Debug)]
pub struct Emulator {
    pub bus: Bus,
    pub cpu: Cpu,
    pub ppu: Ppu,
    pub apu: Apu,
    pub joypad: Joypad,
}

impl Emulator {
    pub fn new() -> Self {
        Self {
            bus: Bus::new(),
            cpu: Cpu::new(),
            ppu: Ppu::new(),
            apu: Apu::new(),
            joypad: Joypad::default(),
        }
    }

    /// Parses and installs a cartridge image, power-cycling the session.
    /// On failure the session is left untouched, still in its pre-load
    /// state.
    pub fn load_cartridge(&mut self, data: &[Byte]) -> Result<()> {
        let cartridge = Cartridge::new(data)?;
        log_rom_info(cartridge.info());

        self.power_cycle();
        self.bus.insert_cartridge(cartridge);

        Ok(())
    }

    /// Power cycle retaining the loaded cartridge (its banking latches
    /// reset with everything else).
    pub fn reset(&mut self) {
        let cartridge = self.bus.take_cartridge();

        self.power_cycle();
        if let Some(cartridge) = cartridge {
            self.bus.insert_cartridge(cartridge);
        }
    }

    fn power_cycle(&mut self) {
        self.bus = Bus::new();
        self.cpu.reset();
        self.ppu = Ppu::new();
        self.apu = Apu::new();
        self.joypad = Joypad::default();
    }

    /// Runs the CPU until the per-frame cycle budget is spent, forwarding
    /// each instruction's cycles to the pixel and sound processors.
    /// Overshoot is bounded by one instruction; the loop is never
    /// re-entered once the budget is reached. Returns the cycles executed.
    pub fn run_frame(&mut self) -> u32 {
        let mut cycles = 0;

        while cycles < CYCLES_PER_FRAME {
            let step = u32::from(self.cpu.step(&mut self.bus));
            cycles += step;
            self.ppu.step(&mut self.bus, step);
            self.apu.step(&mut self.bus, step);
        }

        cycles
    }

    /// The most recently completed RGBA buffer, row-major from the
    /// top-left corner. Valid until the next `run_frame` call.
    pub fn frame_buffer(&self) -> &[Byte] {
        self.ppu.frame_buffer()
    }

    /// Drains `count` interleaved stereo samples from the sound processor.
    pub fn audio_samples(&mut self, count: usize) -> Vec<f32> {
        self.apu.take_samples(count)
    }

    pub fn button_pressed(&mut self, button: Button) {
        self.joypad.press(&mut self.bus, button);
    }

    pub fn button_released(&mut self, button: Button) {
        self.joypad.release(&mut self.bus, button);
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        self.cpu.diagnostics()
    }

    pub fn cartridge_info(&self) -> Option<&CartridgeInfo> {
        self.bus.cartridge().map(Cartridge::info)
    }
}

fn log_rom_info(info: &CartridgeInfo) {
    log::info!("title: {}", info.title);
    log::info!("cartridge type: {:#04x} ({})", info.kind, info.scheme);
    log::info!(
        "ROM size: {}KB, RAM size: {}KB",
        info.rom_size_bytes() / 1024,
        info.ram_size_bytes() / 1024,
    );
    log::info!(
        "color support: {}, super functions: {}",
        info.color_support,
        match info.super_console {
            true => "yes",
            false => "no",
        },
    );
}
