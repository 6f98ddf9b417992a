use rand::Rng;

use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, SPRITE_HEIGHT, SPRITE_SHEET_START, STACK_DEPTH,
};
use crate::error::{Chip8Error, Result};
use crate::opcode::Opcode;
use crate::state::State;

// Every operation runs after the pc has already been bumped past its own opcode,
// so `state.pc - 2` is the address of the instruction being executed.

/// no-op; undefined opcodes land here
pub fn nop(_op: &dyn Opcode, _state: &mut State) -> Result<()> {
    Ok(())
}

/// clear
pub fn clr(_op: &dyn Opcode, state: &mut State) -> Result<()> {
    state.frame_buffer = [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
    state.draw_flag = true;
    Ok(())
}

/// PC = STACK.pop()
pub fn rts(_op: &dyn Opcode, state: &mut State) -> Result<()> {
    if state.sp == 0 {
        return Err(Chip8Error::StackUnderflow {
            pc: state.pc.wrapping_sub(0x2),
        });
    }
    state.sp -= 1;
    state.pc = state.stack[state.sp as usize];
    Ok(())
}

/// PC = addr
pub fn jump(op: &dyn Opcode, state: &mut State) -> Result<()> {
    state.pc = op.addr();
    Ok(())
}

/// STACK.push(PC); PC = addr
pub fn call(op: &dyn Opcode, state: &mut State) -> Result<()> {
    let sp = state.sp as usize;
    if sp >= STACK_DEPTH {
        return Err(Chip8Error::StackOverflow {
            pc: state.pc.wrapping_sub(0x2),
        });
    }
    state.stack[sp] = state.pc;
    state.sp += 1;
    state.pc = op.addr();
    Ok(())
}

/// Skips the next instruction when `condition` holds
fn skip_if(state: &mut State, condition: bool) -> Result<()> {
    if condition {
        state.pc = state.pc.wrapping_add(0x2);
    }
    Ok(())
}

/// if Vx == kk then pc += 2
pub fn ske(op: &dyn Opcode, state: &mut State) -> Result<()> {
    let equal = state.v[op.x()] == op.kk();
    skip_if(state, equal)
}

/// if Vx != kk then pc += 2
pub fn skne(op: &dyn Opcode, state: &mut State) -> Result<()> {
    let differ = state.v[op.x()] != op.kk();
    skip_if(state, differ)
}

/// if Vx == Vy then pc += 2
pub fn skre(op: &dyn Opcode, state: &mut State) -> Result<()> {
    let equal = state.v[op.x()] == state.v[op.y()];
    skip_if(state, equal)
}

/// Vx = kk
pub fn load(op: &dyn Opcode, state: &mut State) -> Result<()> {
    state.v[op.x()] = op.kk();
    Ok(())
}

/// Vx += kk
/// Add kk to Vx; allow for overflow but implicitly drop it
pub fn add(op: &dyn Opcode, state: &mut State) -> Result<()> {
    state.v[op.x()] = state.v[op.x()].wrapping_add(op.kk());
    Ok(())
}

/// Vx = Vy
pub fn mv(op: &dyn Opcode, state: &mut State) -> Result<()> {
    state.v[op.x()] = state.v[op.y()];
    Ok(())
}

/// Vx |= Vy
pub fn or(op: &dyn Opcode, state: &mut State) -> Result<()> {
    state.v[op.x()] |= state.v[op.y()];
    Ok(())
}

/// Vx &= Vy
pub fn and(op: &dyn Opcode, state: &mut State) -> Result<()> {
    state.v[op.x()] &= state.v[op.y()];
    Ok(())
}

/// Vx ^= Vy
pub fn xor(op: &dyn Opcode, state: &mut State) -> Result<()> {
    state.v[op.x()] ^= state.v[op.y()];
    Ok(())
}

/// Writes an ALU result to Vx and then the flag to VF.
/// VF is written last so that it wins when x is 0xF.
fn set_with_flag(state: &mut State, x: usize, result: u8, flag: bool) -> Result<()> {
    state.v[x] = result;
    state.v[0xF] = u8::from(flag);
    Ok(())
}

/// Vx += Vy; VF = carry
pub fn addr(op: &dyn Opcode, state: &mut State) -> Result<()> {
    let sum = u16::from(state.v[op.x()]) + u16::from(state.v[op.y()]);
    set_with_flag(state, op.x(), (sum & 0xFF) as u8, sum > 0xFF)
}

/// Vx -= Vy; VF = !borrow
pub fn sub(op: &dyn Opcode, state: &mut State) -> Result<()> {
    let (vx, vy) = (state.v[op.x()], state.v[op.y()]);
    set_with_flag(state, op.x(), vx.wrapping_sub(vy), vx >= vy)
}

/// Vx >>= 1; VF = the bit shifted out
pub fn shr(op: &dyn Opcode, state: &mut State) -> Result<()> {
    let vx = state.v[op.x()];
    set_with_flag(state, op.x(), vx >> 1, vx & 0x1 == 0x1)
}

/// Vx = Vy - Vx; VF = !borrow
pub fn subn(op: &dyn Opcode, state: &mut State) -> Result<()> {
    let (vx, vy) = (state.v[op.x()], state.v[op.y()]);
    set_with_flag(state, op.x(), vy.wrapping_sub(vx), vy >= vx)
}

/// Vx <<= 1; VF = the bit shifted out
pub fn shl(op: &dyn Opcode, state: &mut State) -> Result<()> {
    let vx = state.v[op.x()];
    set_with_flag(state, op.x(), vx << 1, vx & 0x80 == 0x80)
}

/// if Vx != Vy then pc += 2
pub fn skrne(op: &dyn Opcode, state: &mut State) -> Result<()> {
    let differ = state.v[op.x()] != state.v[op.y()];
    skip_if(state, differ)
}

/// I = addr
pub fn loadi(op: &dyn Opcode, state: &mut State) -> Result<()> {
    state.i = op.addr();
    Ok(())
}

/// PC = addr + V0
/// Anything past 0xFFF faults on the next fetch
pub fn jumpi(op: &dyn Opcode, state: &mut State) -> Result<()> {
    state.pc = op.addr().wrapping_add(u16::from(state.v[0x0]));
    Ok(())
}

/// Vx = rand_byte & kk
pub fn rnd(op: &dyn Opcode, state: &mut State) -> Result<()> {
    let rand_byte: u8 = state.rng.gen();
    state.v[op.x()] = rand_byte & op.kk();
    Ok(())
}

/// draw_sprite(x=Vx y=Vy size=n)
/// XORs a sprite from memory i..i+n at position x, y on the FrameBuffer.
/// The origin wraps around the display but the sprite itself is clipped at the edges.
/// Sets VF if any pixels are erased
pub fn draw(op: &dyn Opcode, state: &mut State) -> Result<()> {
    let height = op.n() as usize;
    let mut sprite = [0u8; 0xF];
    sprite[..height].copy_from_slice(state.memory_slice(state.i, height)?);

    let origin_x = state.v[op.x()] as usize % DISPLAY_WIDTH;
    let origin_y = state.v[op.y()] as usize % DISPLAY_HEIGHT;

    // Collision is gathered across the whole sprite and only then stored in VF
    let mut collision = 0x0;
    for (row, byte) in sprite[..height].iter().enumerate() {
        let y = origin_y + row;
        if y >= DISPLAY_HEIGHT {
            break;
        }
        for bit in 0..8 {
            let x = origin_x + bit;
            if x >= DISPLAY_WIDTH {
                break;
            }
            let pixel_value = (byte >> (7 - bit)) & 0x1;
            collision |= pixel_value & state.frame_buffer[y][x];
            state.frame_buffer[y][x] ^= pixel_value;
        }
    }

    state.v[0xF] = collision;
    state.draw_flag = true;
    Ok(())
}

/// Whether the key named by the low nibble of Vx is held
fn key_held(op: &dyn Opcode, state: &State) -> bool {
    state.pressed_keys[(state.v[op.x()] & 0xF) as usize]
}

/// if Vx.pressed then pc += 2
pub fn skpr(op: &dyn Opcode, state: &mut State) -> Result<()> {
    let held = key_held(op, state);
    skip_if(state, held)
}

/// if !Vx.pressed then pc += 2
pub fn skup(op: &dyn Opcode, state: &mut State) -> Result<()> {
    let held = key_held(op, state);
    skip_if(state, !held)
}

/// Vx = DT
pub fn moved(op: &dyn Opcode, state: &mut State) -> Result<()> {
    state.v[op.x()] = state.delay_timer;
    Ok(())
}

/// await keypress for Vx
///
/// The stepper has already moved the pc past this instruction. Without a held
/// key the pc is wound back by exactly that step, so the cycle leaves the pc
/// unchanged and the instruction runs again next cycle. Handlers never see
/// the pre-fetch pc, which keeps advancing in one place.
pub fn keyd(op: &dyn Opcode, state: &mut State) -> Result<()> {
    match state.pressed_keys.iter().position(|&pressed| pressed) {
        Some(key) => state.v[op.x()] = key as u8,
        None => state.pc = state.pc.wrapping_sub(0x2),
    }
    Ok(())
}

/// DT = Vx
pub fn loads(op: &dyn Opcode, state: &mut State) -> Result<()> {
    state.delay_timer = state.v[op.x()];
    Ok(())
}

/// ST = Vx
pub fn ld(op: &dyn Opcode, state: &mut State) -> Result<()> {
    state.sound_timer = state.v[op.x()];
    Ok(())
}

/// I += Vx
pub fn addi(op: &dyn Opcode, state: &mut State) -> Result<()> {
    state.i = state.i.wrapping_add(u16::from(state.v[op.x()]));
    Ok(())
}

/// I = SPRITE_SHEET_START + Vx * 5
/// Set I to the memory address of the sprite for the hex digit in the low nibble of Vx
/// See constants::SPRITE_SHEET for more details
pub fn ldspr(op: &dyn Opcode, state: &mut State) -> Result<()> {
    let digit = u16::from(state.v[op.x()] & 0xF);
    state.i = SPRITE_SHEET_START + digit * SPRITE_HEIGHT;
    Ok(())
}

/// mem[I..I+3] = bcd(Vx)
/// Store BCD repr of Vx in memory starting at address i
pub fn bcd(op: &dyn Opcode, state: &mut State) -> Result<()> {
    let mut value = state.v[op.x()];
    let digits = state.memory_slice_mut(state.i, 3)?;
    for digit in digits.iter_mut().rev() {
        *digit = value % 10;
        value /= 10;
    }
    Ok(())
}

/// mem[I..=I+x] = V0..=Vx
pub fn stor(op: &dyn Opcode, state: &mut State) -> Result<()> {
    let count = op.x() + 1;
    let v = state.v;
    state
        .memory_slice_mut(state.i, count)?
        .copy_from_slice(&v[..count]);
    Ok(())
}

/// V0..=Vx = mem[I..=I+x]
pub fn read(op: &dyn Opcode, state: &mut State) -> Result<()> {
    let count = op.x() + 1;
    let mut loaded = [0u8; 16];
    loaded[..count].copy_from_slice(state.memory_slice(state.i, count)?);
    state.v[..count].copy_from_slice(&loaded[..count]);
    Ok(())
}
