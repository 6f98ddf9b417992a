use std::collections::VecDeque;
use std::io::Read;

use log::{debug, log_enabled, trace, warn, Level};

use crate::constants::{MAX_ROM_SIZE, MAX_SAVED_STATES, PROGRAM_START};
use crate::error::{Chip8Error, Result};
use crate::instruction::Instruction;
use crate::state::{FrameBuffer, Keypad, State};

/// # Chip-8
/// Chip-8 is a virtual machine and corresponding interpreted language.
///
/// Tracks:
///  - current `state`, including the pressed keys
///  - `previous_states` for rewinding
///
/// Supplies interfaces for:
/// - loading roms
/// - pressing and releasing keys
/// - advancing and reversing the CPU one cycle at a time
/// - inspecting its frame buffer for rendering by some display
/// - inspecting its sound timer for some audio device
///
/// It never sleeps; whoever owns it decides how often to call `advance_cpu`.
pub struct Chip8 {
    state: State,
    previous_states: VecDeque<State>,
}

impl Chip8 {
    pub fn new() -> Self {
        Self::from_state(State::new())
    }

    /// A Chip8 whose random number generator starts from `seed`
    pub fn with_seed(seed: u64) -> Self {
        Self::from_state(State::with_seed(seed))
    }

    fn from_state(state: State) -> Self {
        Chip8 {
            state,
            previous_states: VecDeque::with_capacity(MAX_SAVED_STATES),
        }
    }

    /// Load a rom from a source file
    ///
    /// # Arguments
    /// * `reader` a reader that yields the whole ROM
    ///
    /// Reading stops one byte past `MAX_ROM_SIZE`, so an oversized source is
    /// rejected without being buffered in full.
    pub fn load_rom(&mut self, reader: &mut dyn Read) -> Result<()> {
        let mut image = Vec::with_capacity(MAX_ROM_SIZE + 1);
        reader
            .take(MAX_ROM_SIZE as u64 + 1)
            .read_to_end(&mut image)?;
        self.load_image(&image)
    }

    /// Copy a program image into memory at 0x200
    ///
    /// # Arguments
    /// * `image` the raw program bytes; at most `MAX_ROM_SIZE` of them
    pub fn load_image(&mut self, image: &[u8]) -> Result<()> {
        if image.len() > MAX_ROM_SIZE {
            return Err(Chip8Error::RomTooLarge {
                size: image.len(),
                max: MAX_ROM_SIZE,
            });
        }
        let start = PROGRAM_START as usize;
        self.state.memory[start..start + image.len()].copy_from_slice(image);
        debug!("loaded {} byte ROM at {:#06X}", image.len(), PROGRAM_START);
        Ok(())
    }

    /// The current contents of the display
    pub fn frame(&self) -> &FrameBuffer {
        &self.state.frame_buffer
    }

    /// Returns the FrameBuffer if the display should be redrawn, and marks it as drawn
    pub fn take_frame(&mut self) -> Option<FrameBuffer> {
        if self.state.draw_flag {
            self.state.draw_flag = false;
            Some(self.state.frame_buffer)
        } else {
            None
        }
    }

    /// Set the pressed status of key
    ///
    /// # Arguments
    /// * `key` the 8-bit representation of the key that was pressed; only the low nibble is used
    pub fn key_press(&mut self, key: u8) {
        self.state.pressed_keys[(key & 0xF) as usize] = true;
    }

    /// Unset the pressed status of key
    ///
    /// # Arguments
    /// * `key` the 8-bit representation of the key that was released; only the low nibble is used
    pub fn key_release(&mut self, key: u8) {
        self.state.pressed_keys[(key & 0xF) as usize] = false;
    }

    /// Replace the pressed status of every key at once
    pub fn set_keys(&mut self, keys: Keypad) {
        self.state.pressed_keys = keys;
    }

    pub fn sound_timer(&self) -> u8 {
        self.state.sound_timer
    }

    /// Whether an audio device should currently be emitting a tone
    pub fn is_beeping(&self) -> bool {
        self.state.sound_timer > 0
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Advances the CPU by a single cycle
    /// - fetches the opcode at the pc and moves the pc past it
    /// - decodes and executes it
    /// - decrements the timers
    ///
    /// A failing cycle leaves the state exactly as it was before the cycle began.
    pub fn advance_cpu(&mut self) -> Result<()> {
        let snapshot = self.state.clone();
        match self.cycle() {
            Ok(()) => {
                self.save_state(snapshot);
                Ok(())
            }
            Err(e) => {
                warn!("cycle at {:#06X} failed: {}", snapshot.pc, e);
                self.state = snapshot;
                Err(e)
            }
        }
    }

    fn cycle(&mut self) -> Result<()> {
        let pc = self.state.pc;
        let op = self.get_op()?;
        self.state.pc = pc.wrapping_add(0x2);

        let instruction = Instruction::decode(&op);
        if log_enabled!(Level::Trace) {
            trace!(
                "{:04X}: {:04X} {:<16} v{:02X?} i{:04X}",
                pc,
                op,
                instruction.mnemonic(&op),
                self.state.v,
                self.state.i
            );
        }
        instruction.execute(&op, &mut self.state)?;

        self.advance_timers();
        Ok(())
    }

    /// Reverses the CPU by a single cycle if possible
    /// - if there are previous_states, pops the last one and restores it
    pub fn reverse_cpu(&mut self) {
        if let Some(state) = self.previous_states.pop_front() {
            debug!("rewound to {:#06X}", state.pc);
            // The keys being held right now still apply to the restored state
            let pressed_keys = self.state.pressed_keys;
            self.state = state;
            self.state.pressed_keys = pressed_keys;
            self.state.draw_flag = true;
        }
    }

    /// Puts a state in previous_states
    /// - if there are already MAX_SAVED_STATES saved then the oldest is dropped
    fn save_state(&mut self, state: State) {
        if self.previous_states.len() == MAX_SAVED_STATES {
            self.previous_states.pop_back();
        }
        self.previous_states.push_front(state);
    }

    /// Decrements each timer that hasn't already run out
    fn advance_timers(&mut self) {
        self.state.delay_timer = self.state.delay_timer.saturating_sub(1);
        self.state.sound_timer = self.state.sound_timer.saturating_sub(1);
    }

    /// Gets the opcode currently pointed at by the pc.
    /// Memory is stored as bytes, but opcodes are 16 bits so we combine two subsequent bytes.
    fn get_op(&self) -> Result<u16> {
        let bytes = self.state.memory_slice(self.state.pc, 2)?;
        Ok(u16::from(bytes[0]) << 8 | u16::from(bytes[1]))
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chip8_with(program: &[u8]) -> Chip8 {
        let mut chip8 = Chip8::with_seed(0);
        chip8.load_image(program).unwrap();
        chip8
    }

    #[test]
    fn test_chip8_gets_op() {
        let chip8 = chip8_with(&[0xAA, 0xBB]);
        assert_eq!(chip8.get_op().unwrap(), 0xAABB);
    }

    #[test]
    fn test_fetch_past_end_of_memory_faults() {
        let mut chip8 = Chip8::with_seed(0);
        chip8.state.pc = 0xFFF;
        chip8.state.delay_timer = 0x3;
        let result = chip8.advance_cpu();
        assert!(matches!(result, Err(Chip8Error::MemoryFault { address: 0x1000 })));
        assert_eq!(chip8.state.pc, 0xFFF);
        assert_eq!(chip8.state.delay_timer, 0x3);
    }

    #[test]
    fn test_cycle_advances_pc() {
        // a cls opcode
        let mut chip8 = chip8_with(&[0x00, 0xE0]);
        chip8.advance_cpu().unwrap();
        assert_eq!(chip8.state.pc, 0x202);
    }

    #[test]
    fn test_cycle_decrements_timers_down_to_zero() {
        let mut chip8 = chip8_with(&[0x12, 0x00]);
        chip8.state.delay_timer = 0x2;
        chip8.state.sound_timer = 0x1;
        assert!(chip8.is_beeping());
        chip8.advance_cpu().unwrap();
        assert_eq!((chip8.state.delay_timer, chip8.sound_timer()), (0x1, 0x0));
        assert!(!chip8.is_beeping());
        chip8.advance_cpu().unwrap();
        chip8.advance_cpu().unwrap();
        assert_eq!((chip8.state.delay_timer, chip8.sound_timer()), (0x0, 0x0));
    }

    #[test]
    fn test_failed_cycle_restores_state() {
        // RET with nothing on the stack
        let mut chip8 = chip8_with(&[0x00, 0xEE]);
        chip8.state.sound_timer = 0x5;
        let result = chip8.advance_cpu();
        assert!(matches!(result, Err(Chip8Error::StackUnderflow { pc: 0x200 })));
        assert_eq!(chip8.state.pc, 0x200);
        assert_eq!(chip8.state.sound_timer, 0x5);
        assert!(chip8.previous_states.is_empty());
    }

    #[test]
    fn test_key_wait_holds_pc_until_pressed() {
        let mut chip8 = chip8_with(&[0xF3, 0x0A]);
        for _ in 0..4 {
            chip8.advance_cpu().unwrap();
            assert_eq!(chip8.state.pc, 0x200);
        }
        chip8.key_press(0xB);
        chip8.advance_cpu().unwrap();
        assert_eq!(chip8.state.pc, 0x202);
        assert_eq!(chip8.state.v[0x3], 0xB);
    }

    #[test]
    fn test_key_press_and_release() {
        let mut chip8 = Chip8::with_seed(0);
        chip8.key_press(0xE);
        assert!(chip8.state.pressed_keys[0xE]);
        chip8.key_release(0xE);
        assert!(!chip8.state.pressed_keys[0xE]);
        let mut keys = [false; 16];
        keys[0x1] = true;
        chip8.set_keys(keys);
        assert_eq!(chip8.state.pressed_keys, keys);
    }

    #[test]
    fn test_take_frame_only_after_draw() {
        let mut chip8 = chip8_with(&[0x00, 0xE0]);
        assert!(chip8.take_frame().is_none());
        chip8.advance_cpu().unwrap();
        assert!(chip8.take_frame().is_some());
        assert!(chip8.take_frame().is_none());
    }

    #[test]
    fn test_load_rom_from_reader() {
        let mut chip8 = Chip8::with_seed(0);
        let mut rom: &[u8] = &[0x00, 0xE0, 0x12, 0x00];
        chip8.load_rom(&mut rom).unwrap();
        assert_eq!(chip8.state.memory[0x200..0x204], [0x00, 0xE0, 0x12, 0x00]);
    }

    #[test]
    fn test_load_rom_stops_reading_past_max_size() {
        let mut chip8 = Chip8::with_seed(0);
        let mut endless = std::io::repeat(0xAB);
        let result = chip8.load_rom(&mut endless);
        assert!(matches!(
            result,
            Err(Chip8Error::RomTooLarge { size: 3585, max: 3584 })
        ));
        assert!(chip8.state.memory[0x200..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_load_largest_rom() {
        let mut chip8 = Chip8::with_seed(0);
        chip8.load_image(&[0xAB; MAX_ROM_SIZE]).unwrap();
        assert_eq!(chip8.state.memory[0xFFF], 0xAB);
    }

    #[test]
    fn test_load_oversized_rom_fails() {
        let mut chip8 = Chip8::with_seed(0);
        let result = chip8.load_image(&[0xAB; MAX_ROM_SIZE + 1]);
        assert!(matches!(
            result,
            Err(Chip8Error::RomTooLarge { size: 3585, max: 3584 })
        ));
        assert!(chip8.state.memory[0x200..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_chip8_saves_state() {
        let mut chip8 = chip8_with(&[0x12, 0x00]);
        chip8.advance_cpu().unwrap();
        assert_eq!(chip8.previous_states.len(), 1);
    }

    #[test]
    fn test_chip8_drops_old_saved_states() {
        let mut chip8 = Chip8::with_seed(0);
        for _ in 0..MAX_SAVED_STATES {
            chip8.save_state(State::with_seed(0));
        }
        assert_eq!(MAX_SAVED_STATES, chip8.previous_states.len());
        chip8.save_state(State::with_seed(0));
        assert_eq!(MAX_SAVED_STATES, chip8.previous_states.len());
    }

    #[test]
    fn test_reverse_restores_previous_cycle() {
        // LD V1, 0x22; LD V1, 0x33
        let mut chip8 = chip8_with(&[0x61, 0x22, 0x61, 0x33]);
        chip8.advance_cpu().unwrap();
        chip8.advance_cpu().unwrap();
        assert_eq!(chip8.state.v[0x1], 0x33);
        chip8.reverse_cpu();
        assert_eq!((chip8.state.pc, chip8.state.v[0x1]), (0x202, 0x22));
        chip8.reverse_cpu();
        assert_eq!((chip8.state.pc, chip8.state.v[0x1]), (0x200, 0x00));
        // Nothing left to rewind
        chip8.reverse_cpu();
        assert_eq!(chip8.state.pc, 0x200);
    }
}
