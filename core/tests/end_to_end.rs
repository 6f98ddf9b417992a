use octet_core::constants::{MAX_ROM_SIZE, SPRITE_SHEET};
use octet_core::{Chip8, Chip8Error};

fn boot(image: &[u8]) -> Chip8 {
    let mut chip8 = Chip8::with_seed(1);
    chip8.load_image(image).unwrap();
    chip8
}

#[test]
fn draws_digit_zero_in_the_top_left() {
    // LD V0, 0x0A; LD F, V1; DRW V1, V1, 5
    let mut chip8 = boot(&[0x60, 0x0A, 0xF1, 0x29, 0xD1, 0x15]);
    for _ in 0..3 {
        chip8.advance_cpu().unwrap();
    }

    let frame = chip8.take_frame().expect("the draw should mark the frame dirty");
    for (row, glyph_row) in SPRITE_SHEET[0..5].iter().enumerate() {
        for col in 0..8 {
            let expected = (glyph_row >> (7 - col)) & 0x1;
            assert_eq!(frame[row][col], expected, "pixel ({}, {})", col, row);
        }
    }
    let lit: usize = frame.iter().flatten().map(|&pixel| pixel as usize).sum();
    assert_eq!(lit, 14);
    assert_eq!(chip8.state().v[0xF], 0);
    assert_eq!(chip8.state().v[0x0], 0x0A);
}

#[test]
fn delay_timer_counts_down_and_stops_at_zero() {
    // LD V0, 5; LD DT, V0; JP 0x204
    let mut chip8 = boot(&[0x60, 0x05, 0xF0, 0x15, 0x12, 0x04]);
    chip8.advance_cpu().unwrap();

    // The cycle that loads the timer also gives it its first tick
    let mut remaining = Vec::new();
    for _ in 0..6 {
        chip8.advance_cpu().unwrap();
        remaining.push(chip8.state().delay_timer);
    }
    assert_eq!(remaining, [4, 3, 2, 1, 0, 0]);
}

#[test]
fn key_wait_spins_until_a_key_is_pressed() {
    // LD V5, K; LD V6, 0x01
    let mut chip8 = boot(&[0xF5, 0x0A, 0x66, 0x01]);
    for _ in 0..10 {
        chip8.advance_cpu().unwrap();
        assert_eq!(chip8.state().pc, 0x200);
    }
    chip8.key_press(0x7);
    chip8.advance_cpu().unwrap();
    assert_eq!(chip8.state().pc, 0x202);
    assert_eq!(chip8.state().v[0x5], 0x7);
    chip8.key_release(0x7);
    chip8.advance_cpu().unwrap();
    assert_eq!(chip8.state().v[0x6], 0x1);
}

#[test]
fn subroutine_nesting_is_limited_to_sixteen_frames() {
    // CALL 0x200 forever
    let mut chip8 = boot(&[0x22, 0x00]);
    for depth in 1..=16 {
        chip8.advance_cpu().unwrap();
        assert_eq!(chip8.state().sp, depth);
    }
    let result = chip8.advance_cpu();
    assert!(matches!(result, Err(Chip8Error::StackOverflow { pc: 0x200 })));
    assert_eq!(chip8.state().sp, 16);
    // The fault is sticky; the same instruction fails again
    assert!(chip8.advance_cpu().is_err());
}

#[test]
fn returning_from_the_top_level_is_an_error() {
    let mut chip8 = boot(&[0x00, 0xEE]);
    assert!(matches!(
        chip8.advance_cpu(),
        Err(Chip8Error::StackUnderflow { pc: 0x200 })
    ));
}

#[test]
fn undefined_opcodes_are_skipped() {
    // three undefined opcodes then LD V2, 0x42
    let mut chip8 = boot(&[0x00, 0x01, 0x81, 0x2F, 0xF0, 0xFF, 0x62, 0x42]);
    for _ in 0..4 {
        chip8.advance_cpu().unwrap();
    }
    assert_eq!(chip8.state().pc, 0x208);
    assert_eq!(chip8.state().v[0x2], 0x42);
}

#[test]
fn storing_registers_past_memory_faults() {
    // LD I, 0xFFE; LD [I], V3
    let mut chip8 = boot(&[0xAF, 0xFE, 0xF3, 0x55]);
    chip8.advance_cpu().unwrap();
    assert!(matches!(
        chip8.advance_cpu(),
        Err(Chip8Error::MemoryFault { address: 0x1000 })
    ));
    assert_eq!(chip8.state().pc, 0x202);
}

#[test]
fn oversized_rom_is_rejected() {
    let mut chip8 = Chip8::with_seed(1);
    let error = chip8.load_image(&[0u8; MAX_ROM_SIZE + 2]).unwrap_err();
    assert_eq!(
        error.to_string(),
        "ROM is too large (3586 bytes), max size is 3584 bytes"
    );
}

#[test]
fn oversized_rom_file_is_rejected() {
    let mut chip8 = Chip8::with_seed(1);
    let mut rom: &[u8] = &[0u8; MAX_ROM_SIZE + 2];
    let error = chip8.load_rom(&mut rom).unwrap_err();
    assert!(matches!(error, Chip8Error::RomTooLarge { max: 3584, .. }));
}
