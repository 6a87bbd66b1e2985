//! # instruction
//!
//! The CHIP-8 instruction set as a closed enum. Opcodes are decoded in two
//! levels: the top nibble picks a group, then (depending on the group) the
//! low nibble, the low byte or the whole word picks the instruction.
//!
//! Field naming follows the usual CHIP-8 notation:
//!  - X, Y  register selectors from the middle nibbles
//!  - NN    low byte
//!  - NNN   low 12 bits (an address)
//!  - N     low nibble
use crate::error::Chip8Error;

/// A register selector, 0x0-0xf
pub type Reg = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0
    ClearScreen,
    /// 00EE
    Return,
    /// 1NNN
    Jump(u16),
    /// 2NNN
    Call(u16),
    /// 3XNN
    SkipEqImm(Reg, u8),
    /// 4XNN
    SkipNeImm(Reg, u8),
    /// 5XY0
    SkipEqReg(Reg, Reg),
    /// 6XNN
    LoadImm(Reg, u8),
    /// 7XNN
    AddImm(Reg, u8),
    /// 8XY0
    Move(Reg, Reg),
    /// 8XY1
    Or(Reg, Reg),
    /// 8XY2
    And(Reg, Reg),
    /// 8XY3
    Xor(Reg, Reg),
    /// 8XY4
    AddReg(Reg, Reg),
    /// 8XY5
    Sub(Reg, Reg),
    /// 8XY6
    ShiftRight(Reg),
    /// 8XY7
    SubNeg(Reg, Reg),
    /// 8XYE
    ShiftLeft(Reg),
    /// 9XY0
    SkipNeReg(Reg, Reg),
    /// ANNN
    LoadIndex(u16),
    /// BNNN
    JumpOffset(u16),
    /// CXNN
    Random(Reg, u8),
    /// DXYN
    Draw(Reg, Reg, u8),
    /// EX9E
    SkipKeyDown(Reg),
    /// EXA1
    SkipKeyUp(Reg),
    /// FX07
    GetDelay(Reg),
    /// FX0A
    WaitKey(Reg),
    /// FX15
    SetDelay(Reg),
    /// FX18
    SetSound(Reg),
    /// FX1E
    AddIndex(Reg),
    /// FX29
    FontChar(Reg),
    /// FX33
    Bcd(Reg),
    /// FX55
    StoreRegs(Reg),
    /// FX65
    LoadRegs(Reg),
}

impl Instruction {
    /// decode a raw opcode; `addr` is only used to report where an unknown
    /// opcode was fetched from
    pub fn decode(opcode: u16, addr: u16) -> Result<Instruction, Chip8Error> {
        use Instruction::*;

        let x = ((opcode & 0x0f00) >> 8) as Reg;
        let y = ((opcode & 0x00f0) >> 4) as Reg;
        let n = (opcode & 0x000f) as u8;
        let nn = (opcode & 0x00ff) as u8;
        let nnn = opcode & 0x0fff;

        let instruction = match opcode & 0xf000 {
            0x0000 => match opcode {
                0x00e0 => Some(ClearScreen),
                0x00ee => Some(Return),
                // 0NNN calls into COSMAC machine code, which we can't run
                _ => None,
            },
            0x1000 => Some(Jump(nnn)),
            0x2000 => Some(Call(nnn)),
            0x3000 => Some(SkipEqImm(x, nn)),
            0x4000 => Some(SkipNeImm(x, nn)),
            0x5000 if n == 0 => Some(SkipEqReg(x, y)),
            0x6000 => Some(LoadImm(x, nn)),
            0x7000 => Some(AddImm(x, nn)),
            0x8000 => match n {
                0x0 => Some(Move(x, y)),
                0x1 => Some(Or(x, y)),
                0x2 => Some(And(x, y)),
                0x3 => Some(Xor(x, y)),
                0x4 => Some(AddReg(x, y)),
                0x5 => Some(Sub(x, y)),
                0x6 => Some(ShiftRight(x)),
                0x7 => Some(SubNeg(x, y)),
                0xe => Some(ShiftLeft(x)),
                _ => None,
            },
            0x9000 if n == 0 => Some(SkipNeReg(x, y)),
            0xa000 => Some(LoadIndex(nnn)),
            0xb000 => Some(JumpOffset(nnn)),
            0xc000 => Some(Random(x, nn)),
            0xd000 => Some(Draw(x, y, n)),
            0xe000 => match nn {
                0x9e => Some(SkipKeyDown(x)),
                0xa1 => Some(SkipKeyUp(x)),
                _ => None,
            },
            0xf000 => match nn {
                0x07 => Some(GetDelay(x)),
                0x0a => Some(WaitKey(x)),
                0x15 => Some(SetDelay(x)),
                0x18 => Some(SetSound(x)),
                0x1e => Some(AddIndex(x)),
                0x29 => Some(FontChar(x)),
                0x33 => Some(Bcd(x)),
                0x55 => Some(StoreRegs(x)),
                0x65 => Some(LoadRegs(x)),
                _ => None,
            },
            _ => None,
        };
        instruction.ok_or(Chip8Error::UnknownOpcode { opcode, addr })
    }
}

#[cfg(test)]
mod tests {
    use super::Instruction::*;
    use super::*;

    #[test]
    fn test_decode_whole_set() -> Result<(), Chip8Error> {
        let cases = [
            (0x00e0, ClearScreen),
            (0x00ee, Return),
            (0x1234, Jump(0x234)),
            (0x2456, Call(0x456)),
            (0x342a, SkipEqImm(0x4, 0x2a)),
            (0x4a75, SkipNeImm(0xa, 0x75)),
            (0x5ae0, SkipEqReg(0xa, 0xe)),
            (0x63f5, LoadImm(0x3, 0xf5)),
            (0x7b12, AddImm(0xb, 0x12)),
            (0x8590, Move(0x5, 0x9)),
            (0x8101, Or(0x1, 0x0)),
            (0x8642, And(0x6, 0x4)),
            (0x87f3, Xor(0x7, 0xf)),
            (0x8264, AddReg(0x2, 0x6)),
            (0x8c45, Sub(0xc, 0x4)),
            (0x8106, ShiftRight(0x1)),
            (0x86d7, SubNeg(0x6, 0xd)),
            (0x8e0e, ShiftLeft(0xe)),
            (0x9990, SkipNeReg(0x9, 0x9)),
            (0xa568, LoadIndex(0x568)),
            (0xbabc, JumpOffset(0xabc)),
            (0xc5af, Random(0x5, 0xaf)),
            (0xd7b3, Draw(0x7, 0xb, 3)),
            (0xe49e, SkipKeyDown(0x4)),
            (0xeca1, SkipKeyUp(0xc)),
            (0xf907, GetDelay(0x9)),
            (0xfd0a, WaitKey(0xd)),
            (0xf315, SetDelay(0x3)),
            (0xf718, SetSound(0x7)),
            (0xf91e, AddIndex(0x9)),
            (0xff29, FontChar(0xf)),
            (0xf533, Bcd(0x5)),
            (0xf655, StoreRegs(0x6)),
            (0xf865, LoadRegs(0x8)),
        ];
        for (opcode, expected) in cases {
            assert_eq!(Instruction::decode(opcode, 0x200)?, expected, "{:#06x}", opcode);
        }
        Ok(())
    }

    #[test]
    fn test_unknown_opcodes_rejected() {
        for opcode in [
            0x0000, 0x00e1, 0x0123, 0x5121, 0x8008, 0x800f, 0x9ab1, 0xe100, 0xe19f, 0xf000,
            0xf156, 0xffff,
        ] {
            match Instruction::decode(opcode, 0x2a4) {
                Err(Chip8Error::UnknownOpcode { opcode: raw, addr }) => {
                    assert_eq!(raw, opcode);
                    assert_eq!(addr, 0x2a4);
                }
                other => panic!("{:#06x} decoded to {:?}", opcode, other),
            }
        }
    }
}
