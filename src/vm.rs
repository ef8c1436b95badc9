use std::io::{self, Write};

use log::trace;
use thiserror::Error;

use crate::opcode::Opcode;

pub const MEMORY_SIZE: usize = 256;
pub const NUM_REGISTERS: usize = 8;
/// Register index reserved for the stack pointer.
pub const SP: usize = 7;

const SP_INIT: u8 = 0xF4;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown opcode {opcode:#04x} at pc {pc:#04x}")]
    UnknownOpcode { pc: usize, opcode: u8 },
    #[error("memory access out of bounds: {0:#x}")]
    MemoryOutOfBounds(usize),
    #[error("register index out of bounds: {0}")]
    RegisterOutOfBounds(u8),
    #[error("write to reserved stack pointer register r{0}")]
    ReservedRegister(u8),
    #[error("stack overflow")]
    StackOverflow,
    #[error("stack underflow")]
    StackUnderflow,
    #[error("program of {0} bytes does not fit in memory")]
    ProgramTooLarge(usize),
    #[error("output channel failure: {0}")]
    Output(#[from] io::Error),
}

/// Condition flags written by CMP and read by the conditional jumps.
/// Exactly one is set per compare; they persist until the next CMP.
#[derive(Debug, Default, Clone, Copy)]
struct Flags {
    equal: bool,
    less: bool,
    greater: bool,
}

enum AluOp {
    Add,
    Mul,
}

pub struct Vm<W> {
    memory: [u8; MEMORY_SIZE],
    registers: [u8; NUM_REGISTERS], // r7 is the stack pointer
    pc: usize,
    flags: Flags,
    running: bool,
    output: W,
}

impl Vm<io::Stdout> {
    pub fn new() -> Vm<io::Stdout> {
        Vm::with_output(io::stdout())
    }
}

impl Default for Vm<io::Stdout> {
    fn default() -> Self {
        Vm::new()
    }
}

impl<W: Write> Vm<W> {
    pub fn with_output(output: W) -> Vm<W> {
        let mut registers = [0; NUM_REGISTERS];
        registers[SP] = SP_INIT;
        Vm {
            memory: [0; MEMORY_SIZE],
            registers,
            pc: 0,
            flags: Flags::default(),
            running: false,
            output,
        }
    }

    /// Copies a program into memory starting at address 0.
    pub fn load(&mut self, program: &[u8]) -> Result<(), Error> {
        if program.len() > MEMORY_SIZE {
            return Err(Error::ProgramTooLarge(program.len()));
        }
        self.memory[..program.len()].copy_from_slice(program);
        Ok(())
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn register(&self, index: usize) -> u8 {
        self.registers[index]
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    fn read(&self, address: usize) -> Result<u8, Error> {
        self.memory
            .get(address)
            .copied()
            .ok_or(Error::MemoryOutOfBounds(address))
    }

    fn write(&mut self, address: usize, value: u8) -> Result<(), Error> {
        match self.memory.get_mut(address) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::MemoryOutOfBounds(address)),
        }
    }

    fn reg_index(&self, operand: u8) -> Result<usize, Error> {
        if (operand as usize) < NUM_REGISTERS {
            Ok(operand as usize)
        } else {
            Err(Error::RegisterOutOfBounds(operand))
        }
    }

    fn get_reg(&self, operand: u8) -> Result<u8, Error> {
        Ok(self.registers[self.reg_index(operand)?])
    }

    /// Register writes go through here so nothing can silently clobber the
    /// stack pointer; only PUSH/POP/CALL/RET move r7.
    fn set_reg(&mut self, operand: u8, value: u8) -> Result<(), Error> {
        let index = self.reg_index(operand)?;
        if index == SP {
            return Err(Error::ReservedRegister(operand));
        }
        self.registers[index] = value;
        Ok(())
    }

    fn push(&mut self, value: u8) -> Result<(), Error> {
        let sp = self.registers[SP]
            .checked_sub(1)
            .ok_or(Error::StackOverflow)?;
        self.registers[SP] = sp;
        self.write(sp as usize, value)
    }

    fn pop(&mut self) -> Result<u8, Error> {
        let sp = self.registers[SP];
        let value = self.read(sp as usize)?;
        self.registers[SP] = sp.checked_add(1).ok_or(Error::StackUnderflow)?;
        Ok(value)
    }

    fn alu(&mut self, op: AluOp, reg_a: u8, reg_b: u8) -> Result<(), Error> {
        let a = self.get_reg(reg_a)?;
        let b = self.get_reg(reg_b)?;
        let value = match op {
            AluOp::Add => a.wrapping_add(b),
            AluOp::Mul => a.wrapping_mul(b),
        };
        self.set_reg(reg_a, value)
    }

    /// Runs the fetch-decode-execute loop until HLT or a fatal error.
    pub fn run(&mut self) -> Result<(), Error> {
        self.running = true;
        while self.running {
            self.step()?;
        }
        Ok(())
    }

    /// Executes the single instruction at the current PC.
    pub fn step(&mut self) -> Result<(), Error> {
        let byte = self.read(self.pc)?;
        let opcode = Opcode::from_byte(byte).ok_or(Error::UnknownOpcode {
            pc: self.pc,
            opcode: byte,
        })?;
        trace!(
            "{:#04x}: {} {:02x} {:02x}",
            self.pc,
            opcode.mnemonic(),
            self.peek(self.pc + 1),
            self.peek(self.pc + 2),
        );
        self.execute(opcode)?;
        if !opcode.sets_pc() {
            self.pc += opcode.width();
        }
        Ok(())
    }

    fn execute(&mut self, opcode: Opcode) -> Result<(), Error> {
        match opcode {
            Opcode::Hlt => {
                self.running = false;
                Ok(())
            }
            Opcode::Ldi => {
                let reg = self.read(self.pc + 1)?;
                let value = self.read(self.pc + 2)?;
                self.set_reg(reg, value)
            }
            Opcode::Prn => {
                let value = self.get_reg(self.read(self.pc + 1)?)?;
                writeln!(self.output, "{}", value)?;
                Ok(())
            }
            Opcode::Add => {
                let reg_a = self.read(self.pc + 1)?;
                let reg_b = self.read(self.pc + 2)?;
                self.alu(AluOp::Add, reg_a, reg_b)
            }
            Opcode::Mul => {
                let reg_a = self.read(self.pc + 1)?;
                let reg_b = self.read(self.pc + 2)?;
                self.alu(AluOp::Mul, reg_a, reg_b)
            }
            Opcode::Push => {
                let value = self.get_reg(self.read(self.pc + 1)?)?;
                self.push(value)
            }
            Opcode::Pop => {
                let value = self.pop()?;
                let reg = self.read(self.pc + 1)?;
                self.set_reg(reg, value)
            }
            Opcode::Call => {
                let target = self.get_reg(self.read(self.pc + 1)?)?;
                let ret = u8::try_from(self.pc + 2)
                    .map_err(|_| Error::MemoryOutOfBounds(self.pc + 2))?;
                self.push(ret)?;
                self.pc = target as usize;
                Ok(())
            }
            Opcode::Ret => {
                self.pc = self.pop()? as usize;
                Ok(())
            }
            Opcode::Jmp => {
                self.pc = self.get_reg(self.read(self.pc + 1)?)? as usize;
                Ok(())
            }
            Opcode::Jeq => self.branch(true),
            Opcode::Jne => self.branch(false),
            Opcode::Cmp => {
                let a = self.get_reg(self.read(self.pc + 1)?)?;
                let b = self.get_reg(self.read(self.pc + 2)?)?;
                self.flags = Flags {
                    equal: a == b,
                    less: a < b,
                    greater: a > b,
                };
                Ok(())
            }
        }
    }

    /// JEQ/JNE are sets-PC instructions, so the fall-through path advances
    /// past the two-byte instruction itself.
    fn branch(&mut self, when_equal: bool) -> Result<(), Error> {
        if self.flags.equal == when_equal {
            self.pc = self.get_reg(self.read(self.pc + 1)?)? as usize;
        } else {
            self.pc += 2;
        }
        Ok(())
    }

    fn peek(&self, address: usize) -> u8 {
        self.memory.get(address).copied().unwrap_or(0)
    }

    /// Logs the PC, the three bytes at the PC, and the register file.
    pub fn trace(&self) {
        trace!(
            "pc={:02X} | {:02X} {:02X} {:02X} | registers {:02X?}",
            self.pc,
            self.peek(self.pc),
            self.peek(self.pc + 1),
            self.peek(self.pc + 2),
            self.registers,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vm() -> Vm<Vec<u8>> {
        Vm::with_output(Vec::new())
    }

    #[test]
    fn stack_pointer_starts_at_0xf4() {
        assert_eq!(vm().register(SP), 0xF4);
    }

    #[test]
    fn push_stores_below_sp_and_pop_reads_it_back() {
        let mut vm = vm();
        vm.push(0xAB).unwrap();
        assert_eq!(vm.register(SP), 0xF3);
        assert_eq!(vm.memory[0xF3], 0xAB);
        assert_eq!(vm.pop().unwrap(), 0xAB);
        assert_eq!(vm.register(SP), 0xF4);
    }

    #[test]
    fn push_at_bottom_of_memory_overflows() {
        let mut vm = vm();
        vm.registers[SP] = 1;
        vm.push(1).unwrap();
        assert!(matches!(vm.push(2), Err(Error::StackOverflow)));
    }

    #[test]
    fn pop_at_top_of_memory_underflows() {
        let mut vm = vm();
        vm.registers[SP] = 0xFF;
        assert!(matches!(vm.pop(), Err(Error::StackUnderflow)));
    }

    #[test]
    fn load_rejects_oversized_programs() {
        let mut vm = vm();
        assert!(matches!(
            vm.load(&[0; MEMORY_SIZE + 1]),
            Err(Error::ProgramTooLarge(257))
        ));
        assert!(vm.load(&[0; MEMORY_SIZE]).is_ok());
    }
}
