use ls8_common::MEMORY_SIZE;
use thiserror::Error;

use crate::Disassembler;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LoaderError {
    #[error("line {line}: expected 8 binary digits, found `{token}`")]
    InvalidByte { line: usize, token: String },
    #[error("Program of {size} bytes does not fit into {capacity} bytes of memory")]
    ProgramTooLarge { size: usize, capacity: usize },
}

/// Parses the `.ls8` text format: one byte per line written as 8 binary
/// digits, optionally followed by a `#` comment.
pub fn parse_program(source: &str) -> Result<Vec<u8>, LoaderError> {
    let mut program = Vec::new();

    for (index, line) in source.lines().enumerate() {
        let code = line.split_once('#').map_or(line, |(code, _)| code);
        let Some(token) = code.split_whitespace().next() else {
            continue;
        };

        if token.len() != 8 || !token.bytes().all(|b| b == b'0' || b == b'1') {
            return Err(LoaderError::InvalidByte {
                line: index + 1,
                token: token.to_owned(),
            });
        }

        let byte = u8::from_str_radix(token, 2).map_err(|_| LoaderError::InvalidByte {
            line: index + 1,
            token: token.to_owned(),
        })?;
        program.push(byte);
    }

    if program.len() > MEMORY_SIZE {
        return Err(LoaderError::ProgramTooLarge {
            size: program.len(),
            capacity: MEMORY_SIZE,
        });
    }

    Ok(program)
}

/// Writes `program` in the `.ls8` text format, annotating each opcode
/// byte with its disassembly. Bytes that do not decode are written bare.
pub fn format_program(program: &[u8], disassembler: &Disassembler) -> String {
    let mut result = String::new();
    let mut offset = 0;

    while offset < program.len() {
        if let Some(label) = disassembler.label_at(offset) {
            result.push_str(&format!("# {label}:\n"));
        }

        match disassembler.disassemble_instruction(&program[offset..]) {
            Ok((instruction, size)) => {
                result.push_str(&format!("{:08b} # {instruction}\n", program[offset]));
                for byte in &program[offset + 1..offset + size] {
                    result.push_str(&format!("{byte:08b}\n"));
                }
                offset += size;
            }
            Err(_) => {
                result.push_str(&format!("{:08b}\n", program[offset]));
                offset += 1;
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_program() {
        let source = "\
# print8.ls8
10000010 # LDI R0,8
00000000
00001000

01000111 # PRN R0
00000000
00000001 # HLT
";
        let program = parse_program(source).unwrap();
        assert_eq!(program, vec![0x82, 0x00, 0x08, 0x47, 0x00, 0x01]);
    }

    #[test]
    fn test_parse_ignores_trailing_text() {
        let program = parse_program("  10100000   ADD\n00000001\t# HLT").unwrap();
        assert_eq!(program, vec![0xA0, 0x01]);
    }

    #[test]
    fn test_invalid_byte() {
        let err = parse_program("10000010\n0000000\n").unwrap_err();
        assert_eq!(
            err,
            LoaderError::InvalidByte {
                line: 2,
                token: "0000000".to_owned()
            }
        );

        let err = parse_program("1000001x").unwrap_err();
        assert!(matches!(err, LoaderError::InvalidByte { line: 1, .. }));
    }

    #[test]
    fn test_program_too_large() {
        let source = "00000001\n".repeat(257);
        let err = parse_program(&source).unwrap_err();
        assert_eq!(
            err,
            LoaderError::ProgramTooLarge {
                size: 257,
                capacity: 256
            }
        );
    }

    #[test]
    fn test_format_program() {
        let program = vec![0x82, 0x00, 0x08, 0x47, 0x00, 0xFF];
        let text = format_program(&program, &Disassembler::new());
        insta::assert_snapshot!(text, @r"
        10000010 # LDI R0, 8
        00000000
        00001000
        01000111 # PRN R0
        00000000
        11111111
        ");
        assert_eq!(parse_program(&text).unwrap(), program);
    }
}
