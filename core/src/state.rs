use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, MEMORY_SIZE, PROGRAM_START, SPRITE_SHEET, SPRITE_SHEET_START,
    STACK_DEPTH,
};
use crate::error::{Chip8Error, Result};

/// A snapshot of the Chip8 internal state
///
/// ## CPU
/// Registers
/// - (v) 16 primary 8-bit registers (V0..VF)
///     - the first 15 (V0..VE) are general purpose registers
///     - the 16th (VF) is also the carry/borrow/collision flag
/// - (i) a 16-bit memory address register
///
/// Counter
/// - (pc) a 16-bit program counter
///
/// Pointer
/// - (sp) the number of return addresses on the stack, 0..=16
///
/// Timers
/// - 2 8-bit timers (delay & sound), decremented once per cycle while non-zero
///
/// ## Memory
/// - 16 entry call stack of return addresses
/// - 4096 bytes of addressable memory
///     - 0x000..0x200 is reserved for the interpreter; the font lives at 0x050
///     - 0x200.. holds the loaded program
/// - 32x64 byte frame buffer where each byte is a pixel that is either 0 or 1
///
/// ## Input
/// - a snapshot of which of the keys 0..F are held; instructions only read it
#[derive(Clone, Debug)]
pub struct State {
    pub v: [u8; 16],
    pub i: u16,
    pub pc: u16,
    pub sp: u8,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub stack: [u16; STACK_DEPTH],
    pub memory: [u8; MEMORY_SIZE],
    pub frame_buffer: FrameBuffer,
    pub draw_flag: bool,
    pub pressed_keys: Keypad,
    pub rng: StdRng,
}

impl State {
    /// Creates a powered-on state whose random number generator is seeded from the clock.
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or_default();
        Self::with_seed(seed)
    }

    /// Creates a powered-on state with a fixed seed, making RND reproducible.
    pub fn with_seed(seed: u64) -> Self {
        let mut memory = [0; MEMORY_SIZE];
        let font = SPRITE_SHEET_START as usize;
        memory[font..font + SPRITE_SHEET.len()].copy_from_slice(&SPRITE_SHEET);

        State {
            v: [0; 16],
            i: 0,
            pc: PROGRAM_START,
            sp: 0,
            delay_timer: 0,
            sound_timer: 0,
            stack: [0; STACK_DEPTH],
            memory,
            frame_buffer: [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
            draw_flag: false,
            pressed_keys: [false; 16],
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Borrows `len` bytes of memory starting at `addr`.
    ///
    /// Fails with the first address that falls outside of memory.
    pub fn memory_slice(&self, addr: u16, len: usize) -> Result<&[u8]> {
        let start = addr as usize;
        check_range(start, len)?;
        Ok(&self.memory[start..start + len])
    }

    /// Mutably borrows `len` bytes of memory starting at `addr`.
    pub fn memory_slice_mut(&mut self, addr: u16, len: usize) -> Result<&mut [u8]> {
        let start = addr as usize;
        check_range(start, len)?;
        Ok(&mut self.memory[start..start + len])
    }
}

fn check_range(start: usize, len: usize) -> Result<()> {
    if start + len > MEMORY_SIZE {
        return Err(Chip8Error::MemoryFault {
            address: start.max(MEMORY_SIZE),
        });
    }
    Ok(())
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

/// The FrameBuffer is indexed as [y][x]
pub type FrameBuffer = [[u8; DISPLAY_WIDTH]; DISPLAY_HEIGHT];

/// Pressed status of the keys 0..F
pub type Keypad = [bool; 16];
