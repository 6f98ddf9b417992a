pub use chip8::Chip8;
pub use error::{Chip8Error, Result};
pub use instruction::Instruction;
pub use opcode::Opcode;
pub use state::{FrameBuffer, Keypad, State};

mod chip8;
pub mod constants;
mod error;
mod instruction;
mod opcode;
mod operations;
pub mod state;
