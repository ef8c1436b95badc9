/// The closed LS-8 instruction set.
///
/// The byte value itself carries the instruction layout: bits 7-6 encode how
/// many operand bytes follow (0-2), and bit 4 marks instructions that write
/// the program counter themselves, so the engine must not auto-advance after
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Hlt = 0b0000_0001,
    Ret = 0b0001_0001,
    Push = 0b0100_0101,
    Pop = 0b0100_0110,
    Prn = 0b0100_0111,
    Call = 0b0101_0000,
    Jmp = 0b0101_0100,
    Jeq = 0b0101_0101,
    Jne = 0b0101_0110,
    Ldi = 0b1000_0010,
    Add = 0b1010_0000,
    Mul = 0b1010_0010,
    Cmp = 0b1010_0111,
}

impl Opcode {
    /// Decodes one memory byte. Any byte outside the instruction set is
    /// `None`, which the engine reports as an unknown-opcode error.
    pub fn from_byte(byte: u8) -> Option<Opcode> {
        Some(match byte {
            0b0000_0001 => Opcode::Hlt,
            0b0001_0001 => Opcode::Ret,
            0b0100_0101 => Opcode::Push,
            0b0100_0110 => Opcode::Pop,
            0b0100_0111 => Opcode::Prn,
            0b0101_0000 => Opcode::Call,
            0b0101_0100 => Opcode::Jmp,
            0b0101_0101 => Opcode::Jeq,
            0b0101_0110 => Opcode::Jne,
            0b1000_0010 => Opcode::Ldi,
            0b1010_0000 => Opcode::Add,
            0b1010_0010 => Opcode::Mul,
            0b1010_0111 => Opcode::Cmp,
            _ => return None,
        })
    }

    /// Number of operand bytes following the opcode, from the top two bits.
    pub const fn operand_count(self) -> usize {
        (self as u8 >> 6) as usize
    }

    /// Total instruction width in bytes, including the opcode itself.
    pub const fn width(self) -> usize {
        self.operand_count() + 1
    }

    /// True for instructions that set the PC as part of their effect.
    pub const fn sets_pc(self) -> bool {
        self as u8 & 0b0001_0000 != 0
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Hlt => "HLT",
            Opcode::Ret => "RET",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Prn => "PRN",
            Opcode::Call => "CALL",
            Opcode::Jmp => "JMP",
            Opcode::Jeq => "JEQ",
            Opcode::Jne => "JNE",
            Opcode::Ldi => "LDI",
            Opcode::Add => "ADD",
            Opcode::Mul => "MUL",
            Opcode::Cmp => "CMP",
        }
    }
}
