use crate::error::Result;
use crate::opcode::Opcode;
use crate::operations::*;
use crate::state::State;

/// The signature shared by every operation
pub type Operation = fn(op: &dyn Opcode, state: &mut State) -> Result<()>;

/// # Instructions
/// The 34 Chip-8 instructions plus `Nop`, which every undefined opcode decodes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    Nop,
    Cls,
    Ret,
    Jp,
    Call,
    SeByte,
    SneByte,
    SeReg,
    LdByte,
    AddByte,
    LdReg,
    Or,
    And,
    Xor,
    AddReg,
    Sub,
    Shr,
    Subn,
    Shl,
    SneReg,
    LdI,
    JpV0,
    Rnd,
    Drw,
    Skp,
    Sknp,
    LdVxDt,
    LdVxK,
    LdDtVx,
    LdStVx,
    AddI,
    LdF,
    LdB,
    LdIVx,
    LdVxI,
}

impl Instruction {
    /// Selects the correct Instruction for a given Opcode
    pub fn decode(op: &dyn Opcode) -> Self {
        use Instruction::*;

        match op.nibbles() {
            (0x0, .., 0x0) => Cls,
            (0x0, .., 0xE) => Ret,
            (0x1, ..) => Jp,
            (0x2, ..) => Call,
            (0x3, ..) => SeByte,
            (0x4, ..) => SneByte,
            (0x5, ..) => SeReg,
            (0x6, ..) => LdByte,
            (0x7, ..) => AddByte,
            (0x8, .., 0x0) => LdReg,
            (0x8, .., 0x1) => Or,
            (0x8, .., 0x2) => And,
            (0x8, .., 0x3) => Xor,
            (0x8, .., 0x4) => AddReg,
            (0x8, .., 0x5) => Sub,
            (0x8, .., 0x6) => Shr,
            (0x8, .., 0x7) => Subn,
            (0x8, .., 0xE) => Shl,
            (0x9, ..) => SneReg,
            (0xA, ..) => LdI,
            (0xB, ..) => JpV0,
            (0xC, ..) => Rnd,
            (0xD, ..) => Drw,
            (0xE, .., 0xE) => Skp,
            (0xE, .., 0x1) => Sknp,
            (0xF, ..) => match op.kk() {
                0x07 => LdVxDt,
                0x0A => LdVxK,
                0x15 => LdDtVx,
                0x18 => LdStVx,
                0x1E => AddI,
                0x29 => LdF,
                0x33 => LdB,
                0x55 => LdIVx,
                0x65 => LdVxI,
                _ => Nop,
            },
            _ => Nop,
        }
    }

    /// The operation that carries out this Instruction
    pub fn operation(self) -> Operation {
        use Instruction::*;

        match self {
            Nop => nop,
            Cls => clr,
            Ret => rts,
            Jp => jump,
            Call => call,
            SeByte => ske,
            SneByte => skne,
            SeReg => skre,
            LdByte => load,
            AddByte => add,
            LdReg => mv,
            Or => or,
            And => and,
            Xor => xor,
            AddReg => addr,
            Sub => sub,
            Shr => shr,
            Subn => subn,
            Shl => shl,
            SneReg => skrne,
            LdI => loadi,
            JpV0 => jumpi,
            Rnd => rnd,
            Drw => draw,
            Skp => skpr,
            Sknp => skup,
            LdVxDt => moved,
            LdVxK => keyd,
            LdDtVx => loads,
            LdStVx => ld,
            AddI => addi,
            LdF => ldspr,
            LdB => bcd,
            LdIVx => stor,
            LdVxI => read,
        }
    }

    /// Runs this Instruction's operation against `state`
    pub fn execute(self, op: &dyn Opcode, state: &mut State) -> Result<()> {
        (self.operation())(op, state)
    }

    /// Renders the opcode in conventional assembler syntax, e.g. `LD V1, 0x22`
    pub fn mnemonic(self, op: &dyn Opcode) -> String {
        use Instruction::*;

        let (x, y, n, kk, addr) = (op.x(), op.y(), op.n(), op.kk(), op.addr());
        match self {
            Nop => "NOP".to_string(),
            Cls => "CLS".to_string(),
            Ret => "RET".to_string(),
            Jp => format!("JP {:#05X}", addr),
            Call => format!("CALL {:#05X}", addr),
            SeByte => format!("SE V{:X}, {:#04X}", x, kk),
            SneByte => format!("SNE V{:X}, {:#04X}", x, kk),
            SeReg => format!("SE V{:X}, V{:X}", x, y),
            LdByte => format!("LD V{:X}, {:#04X}", x, kk),
            AddByte => format!("ADD V{:X}, {:#04X}", x, kk),
            LdReg => format!("LD V{:X}, V{:X}", x, y),
            Or => format!("OR V{:X}, V{:X}", x, y),
            And => format!("AND V{:X}, V{:X}", x, y),
            Xor => format!("XOR V{:X}, V{:X}", x, y),
            AddReg => format!("ADD V{:X}, V{:X}", x, y),
            Sub => format!("SUB V{:X}, V{:X}", x, y),
            Shr => format!("SHR V{:X}", x),
            Subn => format!("SUBN V{:X}, V{:X}", x, y),
            Shl => format!("SHL V{:X}", x),
            SneReg => format!("SNE V{:X}, V{:X}", x, y),
            LdI => format!("LD I, {:#05X}", addr),
            JpV0 => format!("JP V0, {:#05X}", addr),
            Rnd => format!("RND V{:X}, {:#04X}", x, kk),
            Drw => format!("DRW V{:X}, V{:X}, {}", x, y, n),
            Skp => format!("SKP V{:X}", x),
            Sknp => format!("SKNP V{:X}", x),
            LdVxDt => format!("LD V{:X}, DT", x),
            LdVxK => format!("LD V{:X}, K", x),
            LdDtVx => format!("LD DT, V{:X}", x),
            LdStVx => format!("LD ST, V{:X}", x),
            AddI => format!("ADD I, V{:X}", x),
            LdF => format!("LD F, V{:X}", x),
            LdB => format!("LD B, V{:X}", x),
            LdIVx => format!("LD [I], V{:X}", x),
            LdVxI => format!("LD V{:X}, [I]", x),
        }
    }
}
