use std::collections::HashMap;

use ls8_common::{get_pattern, Opcode, OperandType, ProgramFile};
use num_traits::FromPrimitive;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DisassemblerError {
    #[error("Invalid opcode: {0:#010b}")]
    InvalidOpcode(u8),
    #[error("Unexpected end of program")]
    UnexpectedEnd,
}

#[derive(Debug, Default)]
pub struct Disassembler {
    labels: HashMap<u8, String>,
}

impl Disassembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_program_file(file: &ProgramFile) -> Self {
        let labels = file
            .header
            .labels
            .iter()
            .map(|(name, &address)| (address, name.clone()))
            .collect();
        Self { labels }
    }

    pub fn label_at(&self, offset: usize) -> Option<&str> {
        let address = u8::try_from(offset).ok()?;
        self.labels.get(&address).map(String::as_str)
    }

    fn format_operand(value: u8, operand_type: OperandType) -> String {
        match operand_type {
            OperandType::Register => format!("R{value}"),
            OperandType::Immediate => format!("{value}"),
        }
    }

    pub fn disassemble_instruction(&self, code: &[u8]) -> Result<(String, usize), DisassemblerError> {
        let &opcode = code.first().ok_or(DisassemblerError::UnexpectedEnd)?;
        let pattern = Opcode::from_u8(opcode)
            .and_then(get_pattern)
            .ok_or(DisassemblerError::InvalidOpcode(opcode))?;

        let operands = code
            .get(1..=pattern.operands.len())
            .ok_or(DisassemblerError::UnexpectedEnd)?;

        let mut result = pattern.mnemonic.to_string();
        if !operands.is_empty() {
            let operands = operands
                .iter()
                .zip(pattern.operands)
                .map(|(&value, &operand_type)| Self::format_operand(value, operand_type))
                .collect::<Vec<_>>();
            result.push(' ');
            result.push_str(&operands.join(", "));
        }

        Ok((result, 1 + pattern.operands.len()))
    }

    pub fn disassemble_program(&self, code: &[u8]) -> Result<String, DisassemblerError> {
        let mut result = String::new();
        let mut offset = 0;

        while offset < code.len() {
            if let Some(label) = self.label_at(offset) {
                result.push_str(&format!("{label}:\n"));
            }

            let (instruction, size) = self.disassemble_instruction(&code[offset..])?;
            result.push_str(&format!("    {instruction}\n"));
            offset += size;
        }

        Ok(result)
    }
}
