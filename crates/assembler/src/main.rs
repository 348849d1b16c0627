use clap::Parser;
use ls8_assembler::{format_program, parse_program, Assembler, Disassembler};
use ls8_common::ProgramFile;
use std::path::{Path, PathBuf};

#[derive(Parser)]
struct Args {
    input: PathBuf,
    output: PathBuf,
    #[clap(long, short)]
    /// disassemble a program image (or `.ls8` file) into mnemonic source
    disassemble: bool,
    #[clap(long, short)]
    /// write the `.ls8` text format instead of a program image
    text: bool,
}

fn load_image(path: &Path) -> Result<ProgramFile, Box<dyn std::error::Error + Send + Sync>> {
    if path.extension().is_some_and(|ext| ext == "ls8") {
        let source = std::fs::read_to_string(path)?;
        Ok(ProgramFile::new(parse_program(&source)?))
    } else {
        ProgramFile::load(path)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let Args {
        input,
        output,
        disassemble,
        text,
    } = Args::parse();

    let contents = if disassemble {
        let program = load_image(&input)?;
        let disassembler = Disassembler::from_program_file(&program);
        disassembler.disassemble_program(&program.data)?
    } else {
        let source = std::fs::read_to_string(&input)?;
        let mut assembler = Assembler::new();
        let program = assembler.assemble_program(&source)?;
        if !text {
            program.save(&output)?;
            return Ok(());
        }
        format_program(&program.data, &Disassembler::from_program_file(&program))
    };

    std::fs::write(&output, contents)
        .map_err(|e| format!("Failed to write output file '{}': {e}", output.display()))?;

    Ok(())
}
