use std::{
    collections::HashMap,
    error::Error,
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use indexmap::IndexMap;
use num_derive::{FromPrimitive, ToPrimitive};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use thiserror::Error;

pub mod native;

/// Number of addressable bytes.
pub const MEMORY_SIZE: usize = 256;
/// Number of general purpose registers, including the stack pointer.
pub const REGISTER_COUNT: usize = 8;
/// Register 7 holds the stack pointer.
pub const STACK_POINTER: u8 = 7;
/// Initial stack pointer value. The stack grows down from here.
pub const STACK_START: u8 = 0xF4;

const OPERAND_COUNT_MASK: u8 = 0b1100_0000;
const OPERAND_COUNT_SHIFT: u8 = 6;
const SETS_PC_MASK: u8 = 0b0001_0000;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Unknown opcode: {:#010b} at (@{:#04x}/@{})", .0, .1, .1)]
    InvalidOpcode(u8, u32),
    #[error("Unsupported ALU operation: {0}")]
    UnsupportedAluOperation(String),
    #[error("Division by zero at (@{:#04x}/@{})", .address, .address)]
    DivisionByZero { address: u32 },
    #[error("Trying to access invalid memory location (@{:#04x}/@{})", .0, .0)]
    InvalidMemoryLocation(u32),
    #[error("Trying to access invalid register R{0}")]
    InvalidRegister(u8),
    #[error("Stack Underflow at (@{:#04x}/@{})", .address, .address)]
    StackUnderflow { address: u32 },
    #[error("Stack Overflow at (@{:#04x}/@{})", .address, .address)]
    StackOverflow { address: u32 },
    #[error("Program of {size} bytes does not fit into {capacity} bytes of memory")]
    ProgramTooLarge { size: usize, capacity: usize },
    #[error("Failed to write program output")]
    Output(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuStats {
    pub instructions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Run,
    RunFor(usize),
}

#[derive(Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ProgramFileHeader {
    pub labels: IndexMap<String, u8>,
}

#[derive(Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ProgramFile {
    pub header: ProgramFileHeader,
    pub data: Vec<u8>,
}

impl ProgramFile {
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }
    pub fn load<P: AsRef<Path>>(p: P) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let reader = BufReader::new(File::open(p.as_ref())?);
        Ok(bincode::deserialize_from(reader)?)
    }
    pub fn save<P: AsRef<Path>>(&self, p: P) -> Result<(), Box<dyn Error + Send + Sync>> {
        let writer = BufWriter::new(File::create(p.as_ref())?);
        Ok(bincode::serialize_into(writer, self)?)
    }
}

impl From<Vec<u8>> for ProgramFile {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

/// The instruction set. Each discriminant is the encoded opcode byte:
/// bits 7-6 hold the operand count, bit 5 marks ALU instructions and
/// bit 4 marks instructions that set the program counter themselves.
#[derive(
    Debug,
    Display,
    PartialEq,
    PartialOrd,
    Copy,
    Clone,
    Hash,
    Eq,
    Ord,
    FromPrimitive,
    ToPrimitive,
    EnumIter,
)]
#[strum(serialize_all = "UPPERCASE")]
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
    /// Number of operand bytes following the opcode byte.
    pub const fn operand_count(self) -> u8 {
        (self as u8 & OPERAND_COUNT_MASK) >> OPERAND_COUNT_SHIFT
    }

    /// Whether the instruction moves the program counter itself, in which
    /// case the engine must not advance past it.
    pub const fn sets_pc(self) -> bool {
        self as u8 & SETS_PC_MASK != 0
    }

    /// Total encoded length in bytes.
    pub const fn encoded_len(self) -> u8 {
        self.operand_count() + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    Register,
    Immediate,
}

#[derive(Debug, Clone)]
pub struct InstructionPattern {
    pub opcode: Opcode,
    pub operands: &'static [OperandType],
    pub mnemonic: &'static str,
}

impl InstructionPattern {
    const fn new(opcode: Opcode, operands: &'static [OperandType], mnemonic: &'static str) -> Self {
        Self {
            opcode,
            operands,
            mnemonic,
        }
    }
}

pub static INSTRUCTION_PATTERNS: Lazy<HashMap<Opcode, &'static InstructionPattern>> =
    Lazy::new(|| {
        use OperandType::{Immediate, Register};

        static PATTERNS: &[InstructionPattern] = &[
            InstructionPattern::new(Opcode::Ldi, &[Register, Immediate], "LDI"),
            InstructionPattern::new(Opcode::Prn, &[Register], "PRN"),
            InstructionPattern::new(Opcode::Hlt, &[], "HLT"),
            // ALU
            InstructionPattern::new(Opcode::Add, &[Register, Register], "ADD"),
            InstructionPattern::new(Opcode::Mul, &[Register, Register], "MUL"),
            InstructionPattern::new(Opcode::Cmp, &[Register, Register], "CMP"),
            // Stack
            InstructionPattern::new(Opcode::Push, &[Register], "PUSH"),
            InstructionPattern::new(Opcode::Pop, &[Register], "POP"),
            InstructionPattern::new(Opcode::Call, &[Register], "CALL"),
            InstructionPattern::new(Opcode::Ret, &[], "RET"),
            // Jumps
            InstructionPattern::new(Opcode::Jmp, &[Register], "JMP"),
            InstructionPattern::new(Opcode::Jeq, &[Register], "JEQ"),
            InstructionPattern::new(Opcode::Jne, &[Register], "JNE"),
        ];

        let mut map = HashMap::new();
        for pattern in PATTERNS {
            map.insert(pattern.opcode, pattern);
        }
        map
    });

pub fn get_pattern(opcode: Opcode) -> Option<&'static InstructionPattern> {
    INSTRUCTION_PATTERNS.get(&opcode).copied()
}

pub fn get_pattern_by_mnemonic(mnemonic: &str) -> Option<&'static InstructionPattern> {
    INSTRUCTION_PATTERNS
        .values()
        .find(|pattern| pattern.mnemonic.eq_ignore_ascii_case(mnemonic))
        .copied()
}
