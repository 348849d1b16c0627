use std::{
    io::{self, Write},
    path::PathBuf,
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use ls8_common::{
    native::{HostIO, NativeCpu},
    ExecutionError, ProgramFile, RunMode,
};

#[derive(Parser)]
struct Args {
    #[arg(short, long, global = true)]
    verbose: bool,
    #[arg(short, long, global = true)]
    show_cpu_state: bool,
    /// stop after this many instructions even if HLT was not reached
    #[arg(short, long, global = true)]
    max_instructions: Option<usize>,
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Run a program in the `.ls8` text format
    Run { path: PathBuf },
    /// Assemble mnemonic source and run it
    RunAsm { path: PathBuf },
    /// Run a program image written by `ls8asm`
    RunBin { path: PathBuf },
}

#[derive(Debug)]
struct StdoutHostIo;

impl HostIO for StdoutHostIo {
    fn print(&mut self, value: u8) -> Result<(), ExecutionError> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "PRN -> {value}")?;
        Ok(())
    }
}

fn run(
    program: &[u8],
    verbose: bool,
    show_cpu_state: bool,
    max_instructions: Option<usize>,
) -> anyhow::Result<()> {
    let mut cpu = NativeCpu::new(StdoutHostIo);
    cpu.set_verbose(verbose);
    cpu.load_program(program)?;

    let run_mode = match max_instructions {
        Some(limit) => RunMode::RunFor(limit),
        None => RunMode::Run,
    };
    let result = cpu.execute(run_mode);

    if verbose {
        println!();
        println!("========== RESULT/STATS ===========");
        println!();
        println!("{:#?}", result);
    }

    if show_cpu_state {
        cpu.print_state();
    }

    let stats = result?;
    if cpu.is_running() {
        eprintln!(
            "Stopped after {} instructions without reaching HLT",
            stats.instructions
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let Args {
        action,
        verbose,
        show_cpu_state,
        max_instructions,
    } = Args::parse();

    let program = match action {
        Action::Run { path } => {
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read '{}'", path.display()))?;
            ls8_assembler::parse_program(&source)?
        }
        Action::RunAsm { path } => {
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read '{}'", path.display()))?;
            let mut assembler = ls8_assembler::Assembler::new();
            assembler.assemble_program(&source)?.data
        }
        Action::RunBin { path } => {
            ProgramFile::load(&path)
                .map_err(|e| anyhow::anyhow!(e))
                .with_context(|| format!("Failed to load '{}'", path.display()))?
                .data
        }
    };

    run(&program, verbose, show_cpu_state, max_instructions)
}
