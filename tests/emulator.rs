use sabi_gb::cartridge::CartridgeError;
use sabi_gb::emulator::CYCLES_PER_FRAME;
use sabi_gb::{Button, Emulator, Memory};

mod common;

use common::{nop_image, rom_image};

#[test]
fn loading_a_truncated_image_fails_and_blocks_nothing_else() {
    let mut emulator = Emulator::new();

    let error = emulator
        .load_cartridge(&[0u8; 0x40])
        .expect_err("image is shorter than the header");

    assert!(matches!(
        error.downcast_ref::<CartridgeError>(),
        Some(CartridgeError::TooShort { length: 0x40 })
    ));

    // A valid image loads fine afterwards.
    emulator
        .load_cartridge(&nop_image(0x00, 2))
        .expect("valid image");
}

#[test]
fn one_frame_consumes_exactly_the_cycle_budget() {
    let mut emulator = Emulator::new();
    emulator
        .load_cartridge(&nop_image(0x00, 2))
        .expect("valid image");

    assert_eq!(CYCLES_PER_FRAME, emulator.run_frame());
}

#[test]
fn one_frame_walks_all_scanlines_and_raises_vblank() {
    let mut emulator = Emulator::new();
    emulator
        .load_cartridge(&nop_image(0x00, 2))
        .expect("valid image");
    emulator.bus.write(0xff0f, 0); // drop the power-on interrupt flags

    emulator.run_frame();

    // 70224 cycles = exactly 154 scanlines: the counter is back at zero.
    assert_eq!(0, emulator.bus.read(0xff44));
    assert_eq!(0x01, emulator.bus.read(0xff0f) & 0x01);
}

#[test]
fn frame_buffer_is_a_full_rgba_screen() {
    let mut emulator = Emulator::new();
    emulator
        .load_cartridge(&nop_image(0x00, 2))
        .expect("valid image");

    emulator.run_frame();

    let buffer = emulator.frame_buffer();
    assert_eq!(160 * 144 * 4, buffer.len());
    // Empty tile data renders the lightest shade, fully opaque.
    assert_eq!([0xff, 0xff, 0xff, 0xff], buffer[0..4]);
}

#[test]
fn rom_bank_switching_through_the_bus() {
    let mut emulator = Emulator::new();
    emulator
        .load_cartridge(&rom_image(0x01, 8, 0x03))
        .expect("valid image");

    for bank in 1..8u8 {
        emulator.bus.write(0x2000, bank);
        assert_eq!(bank, emulator.bus.read(0x4000));
    }

    emulator.bus.write(0x2000, 0);
    assert_eq!(1, emulator.bus.read(0x4000));
}

#[test]
fn echo_ram_mirrors_working_ram_both_ways() {
    let mut emulator = Emulator::new();

    emulator.bus.write(0xc005, 0x42);
    assert_eq!(0x42, emulator.bus.read(0xe005));

    emulator.bus.write(0xe105, 0x24);
    assert_eq!(0x24, emulator.bus.read(0xc105));
}

#[test]
fn unknown_opcodes_accumulate_diagnostics_without_stopping_the_frame() {
    let mut emulator = Emulator::new();
    let mut image = nop_image(0x00, 2);
    image[0x100] = 0xd3;
    image[0x101] = 0xfc;
    emulator.load_cartridge(&image).expect("valid image");

    emulator.run_frame();

    let events = emulator.diagnostics().unimplemented_opcodes();
    assert_eq!(2, events.len());
    assert_eq!(0xd3, events[0].opcode);
    assert_eq!(0x0100, events[0].address);
    assert_eq!(0xfc, events[1].opcode);
}

#[test]
fn button_edges_reach_the_polled_register_and_the_interrupt_flag() {
    let mut emulator = Emulator::new();
    emulator.bus.write(0xff00, 0x10); // select the button group

    emulator.button_pressed(Button::A);

    assert_eq!(0xde, emulator.bus.read(0xff00));
    assert_eq!(0x10, emulator.bus.read(0xff0f) & 0x10);

    emulator.button_released(Button::A);

    assert_eq!(0xdf, emulator.bus.read(0xff00));
}

#[test]
fn audio_samples_come_back_interleaved() {
    let mut emulator = Emulator::new();
    emulator
        .load_cartridge(&nop_image(0x00, 2))
        .expect("valid image");

    emulator.run_frame();
    let samples = emulator.audio_samples(128);

    assert_eq!(256, samples.len());
    assert!(samples.iter().all(|sample| (-1.0..=1.0).contains(sample)));
}
