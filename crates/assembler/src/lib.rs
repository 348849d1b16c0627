use indexmap::IndexMap;
use ls8_common::{
    get_pattern_by_mnemonic, OperandType, ProgramFile, ProgramFileHeader, MEMORY_SIZE,
    REGISTER_COUNT,
};
use thiserror::Error;

mod disassembler;
mod loader;

pub use disassembler::{Disassembler, DisassemblerError};
pub use loader::{format_program, parse_program, LoaderError};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AssemblerError {
    #[error("Unknown instruction: {0}")]
    UnknownInstruction(String),
    #[error("Wrong number of operands for {mnemonic}: expected {expected}, got {got}")]
    WrongOperandCount {
        mnemonic: String,
        expected: usize,
        got: usize,
    },
    #[error("Invalid register name: {0}")]
    InvalidRegister(String),
    #[error("Invalid immediate value: {0}")]
    InvalidImmediate(String),
    #[error("Invalid label: {0}")]
    InvalidLabel(String),
    #[error("Duplicate label: {0}")]
    DuplicateLabel(String),
    #[error("Undefined label: {0}")]
    UndefinedLabel(String),
    #[error("Program of {size} bytes does not fit into {capacity} bytes of memory")]
    ProgramTooLarge { size: usize, capacity: usize },
}

/// Turns mnemonic source into program bytes.
///
/// One instruction per line, operands separated by commas. `;` and `#`
/// start comments and `name:` defines a label for the next instruction's
/// address. Labels can be used wherever an immediate is expected.
#[derive(Debug, Default)]
pub struct Assembler {
    labels: IndexMap<String, u8>,
    current_address: usize,
}

enum Line<'a> {
    Empty,
    Label(&'a str),
    Instruction(&'a str, Vec<&'a str>),
}

fn split_line(line: &str) -> Line<'_> {
    let line = line
        .split_once([';', '#'])
        .map_or(line, |(code, _)| code)
        .trim();

    if line.is_empty() {
        return Line::Empty;
    }

    if let Some(label) = line.strip_suffix(':') {
        return Line::Label(label.trim());
    }

    let (mnemonic, operands) = line
        .split_once(char::is_whitespace)
        .unwrap_or((line, ""));
    let operands = if operands.trim().is_empty() {
        vec![]
    } else {
        operands.split(',').map(str::trim).collect()
    };
    Line::Instruction(mnemonic, operands)
}

fn is_valid_label(label: &str) -> bool {
    let mut chars = label.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_register(reg: &str) -> Result<u8, AssemblerError> {
        reg.strip_prefix(['R', 'r'])
            .and_then(|index| index.parse::<u8>().ok())
            .filter(|&index| (index as usize) < REGISTER_COUNT)
            .ok_or_else(|| AssemblerError::InvalidRegister(reg.to_string()))
    }

    fn parse_immediate(&self, operand: &str) -> Result<u8, AssemblerError> {
        let parsed = if let Some(hex) = operand.strip_prefix("0x") {
            u8::from_str_radix(hex, 16)
        } else if let Some(bin) = operand.strip_prefix("0b") {
            u8::from_str_radix(bin, 2)
        } else if operand.starts_with(|c: char| c.is_ascii_digit()) {
            operand.parse::<u8>()
        } else if is_valid_label(operand) {
            return self
                .labels
                .get(operand)
                .copied()
                .ok_or_else(|| AssemblerError::UndefinedLabel(operand.to_string()));
        } else {
            return Err(AssemblerError::InvalidImmediate(operand.to_string()));
        };

        parsed.map_err(|_| AssemblerError::InvalidImmediate(operand.to_string()))
    }

    pub fn assemble_line(&mut self, line: &str) -> Result<Vec<u8>, AssemblerError> {
        let (mnemonic, operands) = match split_line(line) {
            Line::Empty | Line::Label(_) => return Ok(vec![]),
            Line::Instruction(mnemonic, operands) => (mnemonic, operands),
        };

        let pattern = get_pattern_by_mnemonic(mnemonic)
            .ok_or_else(|| AssemblerError::UnknownInstruction(mnemonic.to_string()))?;

        if operands.len() != pattern.operands.len() {
            return Err(AssemblerError::WrongOperandCount {
                mnemonic: mnemonic.to_string(),
                expected: pattern.operands.len(),
                got: operands.len(),
            });
        }

        let mut result = vec![pattern.opcode as u8];
        for (operand, &operand_type) in operands.iter().zip(pattern.operands) {
            let byte = match operand_type {
                OperandType::Register => Self::parse_register(operand)?,
                OperandType::Immediate => self.parse_immediate(operand)?,
            };
            result.push(byte);
        }

        self.current_address += result.len();
        Ok(result)
    }

    pub fn assemble_program(&mut self, program: &str) -> Result<ProgramFile, AssemblerError> {
        self.labels.clear();
        self.current_address = 0;

        // First pass: collect labels
        for line in program.lines() {
            match split_line(line) {
                Line::Empty => {}
                Line::Label(label) => {
                    if !is_valid_label(label) {
                        return Err(AssemblerError::InvalidLabel(label.to_string()));
                    }
                    let address = u8::try_from(self.current_address).map_err(|_| {
                        AssemblerError::ProgramTooLarge {
                            size: self.current_address,
                            capacity: MEMORY_SIZE,
                        }
                    })?;
                    if self.labels.insert(label.to_string(), address).is_some() {
                        return Err(AssemblerError::DuplicateLabel(label.to_string()));
                    }
                }
                Line::Instruction(mnemonic, _) => {
                    let pattern = get_pattern_by_mnemonic(mnemonic)
                        .ok_or_else(|| AssemblerError::UnknownInstruction(mnemonic.to_string()))?;
                    self.current_address += pattern.opcode.encoded_len() as usize;
                }
            }
        }

        // Second pass: generate bytes
        self.current_address = 0;
        let mut data = Vec::new();
        for line in program.lines() {
            let mut line_code = self.assemble_line(line)?;
            data.append(&mut line_code);
        }

        if data.len() > MEMORY_SIZE {
            return Err(AssemblerError::ProgramTooLarge {
                size: data.len(),
                capacity: MEMORY_SIZE,
            });
        }

        Ok(ProgramFile {
            header: ProgramFileHeader {
                labels: self.labels.clone(),
            },
            data,
        })
    }
}
