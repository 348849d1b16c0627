use std::{cmp::Ordering, collections::BTreeMap, fmt, str::FromStr};

use num_traits::FromPrimitive;
use strum::{Display, EnumString};

use crate::{
    CpuStats, ExecutionError, Opcode, RunMode, MEMORY_SIZE, REGISTER_COUNT, STACK_POINTER,
    STACK_START,
};

const FLAG_LESS: u8 = 0b0000_0100;
const FLAG_GREATER: u8 = 0b0000_0010;
const FLAG_EQUAL: u8 = 0b0000_0001;

/// Flat byte addressable memory. Every access is bounds checked.
#[derive(Debug, Clone)]
pub struct Memory {
    cells: [u8; MEMORY_SIZE],
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    pub fn new() -> Self {
        Self {
            cells: [0; MEMORY_SIZE],
        }
    }

    pub fn read(&self, address: u32) -> Result<u8, ExecutionError> {
        self.cells
            .get(address as usize)
            .copied()
            .ok_or(ExecutionError::InvalidMemoryLocation(address))
    }

    pub fn write(&mut self, address: u32, value: u8) -> Result<(), ExecutionError> {
        let cell = self
            .cells
            .get_mut(address as usize)
            .ok_or(ExecutionError::InvalidMemoryLocation(address))?;
        *cell = value;
        Ok(())
    }

    /// Copies `data` into memory starting at address 0.
    pub fn load(&mut self, data: &[u8]) -> Result<(), ExecutionError> {
        if data.len() > MEMORY_SIZE {
            return Err(ExecutionError::ProgramTooLarge {
                size: data.len(),
                capacity: MEMORY_SIZE,
            });
        }
        self.cells[..data.len()].copy_from_slice(data);
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }
}

/// General purpose registers. R7 is the stack pointer, but the file itself
/// does not treat it differently from the others.
#[derive(Debug, Clone)]
pub struct RegisterFile {
    values: [u8; REGISTER_COUNT],
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    pub fn new() -> Self {
        let mut values = [0; REGISTER_COUNT];
        values[STACK_POINTER as usize] = STACK_START;
        Self { values }
    }

    pub fn get(&self, index: u8) -> Result<u8, ExecutionError> {
        self.values
            .get(index as usize)
            .copied()
            .ok_or(ExecutionError::InvalidRegister(index))
    }

    pub fn set(&mut self, index: u8, value: u8) -> Result<(), ExecutionError> {
        let register = self
            .values
            .get_mut(index as usize)
            .ok_or(ExecutionError::InvalidRegister(index))?;
        *register = value;
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.values
    }
}

/// Result of the most recent CMP. At most one field is set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Flags {
    pub less: bool,
    pub greater: bool,
    pub equal: bool,
}

impl Flags {
    pub fn from_ordering(ordering: Ordering) -> Self {
        Self {
            less: ordering == Ordering::Less,
            greater: ordering == Ordering::Greater,
            equal: ordering == Ordering::Equal,
        }
    }

    /// The `FL` register encoding: `0b00000LGE`.
    pub fn bits(&self) -> u8 {
        let mut bits = 0;
        if self.less {
            bits |= FLAG_LESS;
        }
        if self.greater {
            bits |= FLAG_GREATER;
        }
        if self.equal {
            bits |= FLAG_EQUAL;
        }
        bits
    }
}

#[derive(Debug, Display, EnumString, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "UPPERCASE")]
pub enum AluOp {
    Add,
    Sub,
    Mul,
    Div,
    Cmp,
}

/// Read-only view of the machine used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trace {
    pub pc: u32,
    pub bytes: [Option<u8>; 3],
    pub registers: [u8; REGISTER_COUNT],
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TRACE: {:02X} |", self.pc)?;
        for byte in self.bytes {
            match byte {
                Some(byte) => write!(f, " {byte:02X}")?,
                None => write!(f, " --")?,
            }
        }
        write!(f, " |")?;
        for register in self.registers {
            write!(f, " {register:02X}")?;
        }
        Ok(())
    }
}

/// Receives the values printed by PRN.
pub trait HostIO: fmt::Debug {
    fn print(&mut self, value: u8) -> Result<(), ExecutionError>;
}

#[derive(Debug)]
pub struct NullHostIO;

impl HostIO for NullHostIO {
    fn print(&mut self, _value: u8) -> Result<(), ExecutionError> {
        Ok(())
    }
}

/// Keeps every printed value in order.
#[derive(Debug, Default)]
pub struct BufferedHostIO {
    pub values: Vec<u8>,
}

impl HostIO for BufferedHostIO {
    fn print(&mut self, value: u8) -> Result<(), ExecutionError> {
        self.values.push(value);
        Ok(())
    }
}

#[derive(Debug)]
pub struct NativeCpu<IO: HostIO> {
    memory: Memory,
    registers: RegisterFile,
    program_counter: u32,
    flags: Flags,
    running: bool,
    stats: CpuStats,
    host_io: IO,
    verbose: bool,
}

impl<IO: HostIO> NativeCpu<IO> {
    pub fn new(host_io: IO) -> Self {
        Self {
            memory: Memory::new(),
            registers: RegisterFile::new(),
            program_counter: 0,
            flags: Flags::default(),
            running: true,
            stats: CpuStats::default(),
            host_io,
            verbose: false,
        }
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn load_program(&mut self, program: &[u8]) -> Result<(), ExecutionError> {
        self.memory.load(program)
    }

    pub fn execute(&mut self, run_mode: RunMode) -> Result<CpuStats, ExecutionError> {
        match run_mode {
            RunMode::Run => self.run(None),
            RunMode::RunFor(instructions) => self.run(Some(instructions)),
        }
    }

    pub fn get_registers(&self) -> &[u8] {
        self.registers.as_slice()
    }

    pub fn get_memory(&self) -> &[u8] {
        self.memory.as_slice()
    }

    pub fn program_counter(&self) -> u32 {
        self.program_counter
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn host_io(&self) -> &IO {
        &self.host_io
    }

    pub fn trace(&self) -> Trace {
        let byte_at = |offset: u32| self.memory.read(self.program_counter + offset).ok();
        let mut registers = [0; REGISTER_COUNT];
        registers.copy_from_slice(self.registers.as_slice());
        Trace {
            pc: self.program_counter,
            bytes: [byte_at(0), byte_at(1), byte_at(2)],
            registers,
        }
    }

    pub fn print_state(&self) {
        println!();
        println!("========== VM STATE ===========");
        println!();
        println!("PC: {:#04x}", self.program_counter);
        println!("SP: {:#04x}", self.registers.as_slice()[STACK_POINTER as usize]);
        println!("FL: {:#010b}", self.flags.bits());
        println!(
            "Registers: {:#?}",
            self.registers
                .as_slice()
                .iter()
                .enumerate()
                .collect::<BTreeMap<_, _>>()
        );
        println!("Memory:");
        for (row, chunk) in self.memory.as_slice().chunks(16).enumerate() {
            let bytes = chunk
                .iter()
                .map(|byte| format!("{byte:02X}"))
                .collect::<Vec<_>>()
                .join(" ");
            println!("  {:02X}: {}", row * 16, bytes);
        }
    }

    /// Runs one ALU operation over two registers.
    pub fn alu(&mut self, op: AluOp, reg_a: u8, reg_b: u8) -> Result<(), ExecutionError> {
        let a = self.registers.get(reg_a)?;
        let b = self.registers.get(reg_b)?;

        let result = match op {
            AluOp::Add => a.wrapping_add(b),
            AluOp::Sub => a.wrapping_sub(b),
            AluOp::Mul => a.wrapping_mul(b),
            AluOp::Div => {
                if b == 0 {
                    return Err(ExecutionError::DivisionByZero {
                        address: self.program_counter,
                    });
                }
                a / b
            }
            AluOp::Cmp => {
                self.flags = Flags::from_ordering(a.cmp(&b));
                if self.verbose {
                    println!("CMP R{reg_a}({a}), R{reg_b}({b}) => {:#010b}", self.flags.bits());
                }
                return Ok(());
            }
        };

        if self.verbose {
            println!("{op} R{reg_a}({a}), R{reg_b}({b}) => {result}");
        }

        self.registers.set(reg_a, result)
    }

    pub fn alu_by_name(&mut self, op: &str, reg_a: u8, reg_b: u8) -> Result<(), ExecutionError> {
        let op = AluOp::from_str(op)
            .map_err(|_| ExecutionError::UnsupportedAluOperation(op.to_owned()))?;
        self.alu(op, reg_a, reg_b)
    }

    fn run(&mut self, limit: Option<usize>) -> Result<CpuStats, ExecutionError> {
        let mut executed = 0;

        while self.running && limit.map_or(true, |limit| executed < limit) {
            self.step()?;
            executed += 1;
        }

        Ok(self.stats)
    }

    /// Fetches, decodes and executes the instruction at the program counter.
    pub fn step(&mut self) -> Result<(), ExecutionError> {
        let byte = self.memory.read(self.program_counter)?;
        let opcode = Opcode::from_u8(byte)
            .ok_or(ExecutionError::InvalidOpcode(byte, self.program_counter))?;

        if self.verbose {
            println!("{} {opcode}", self.trace());
        }

        match opcode {
            Opcode::Ldi => {
                let reg = self.read_operand(1)?;
                let value = self.read_operand(2)?;
                self.registers.set(reg, value)?;
            }
            Opcode::Prn => {
                let reg = self.read_operand(1)?;
                let value = self.registers.get(reg)?;
                self.host_io.print(value)?;
            }
            Opcode::Hlt => {
                self.running = false;
            }
            Opcode::Add => self.alu_from_operands(AluOp::Add)?,
            Opcode::Mul => self.alu_from_operands(AluOp::Mul)?,
            Opcode::Cmp => self.alu_from_operands(AluOp::Cmp)?,
            Opcode::Push => {
                let reg = self.read_operand(1)?;
                let value = self.registers.get(reg)?;
                self.push_stack(value)?;
            }
            Opcode::Pop => {
                let reg = self.read_operand(1)?;
                let value = self.pop_stack()?;
                self.registers.set(reg, value)?;
            }
            Opcode::Call => {
                let reg = self.read_operand(1)?;
                let target = self.registers.get(reg)?;
                let return_address = self.program_counter + 2;
                let return_address = u8::try_from(return_address)
                    .map_err(|_| ExecutionError::InvalidMemoryLocation(return_address))?;
                self.push_stack(return_address)?;
                self.program_counter = target as u32;
            }
            Opcode::Ret => {
                self.program_counter = self.pop_stack()? as u32;
            }
            Opcode::Jmp => self.jump()?,
            Opcode::Jeq => {
                if self.flags.equal {
                    self.jump()?;
                } else {
                    self.program_counter += 2;
                }
            }
            Opcode::Jne => {
                if !self.flags.equal {
                    self.jump()?;
                } else {
                    self.program_counter += 2;
                }
            }
        }

        if !opcode.sets_pc() {
            self.program_counter += opcode.encoded_len() as u32;
        }
        self.stats.instructions += 1;

        Ok(())
    }

    fn read_operand(&self, offset: u32) -> Result<u8, ExecutionError> {
        self.memory.read(self.program_counter + offset)
    }

    /// ALU instructions name their registers in the two bytes after the opcode.
    fn alu_from_operands(&mut self, op: AluOp) -> Result<(), ExecutionError> {
        let reg_a = self.read_operand(1)?;
        let reg_b = self.read_operand(2)?;
        self.alu(op, reg_a, reg_b)
    }

    fn jump(&mut self) -> Result<(), ExecutionError> {
        let reg = self.read_operand(1)?;
        let target = self.registers.get(reg)?;
        self.program_counter = target as u32;
        Ok(())
    }

    fn push_stack(&mut self, value: u8) -> Result<(), ExecutionError> {
        let stack_pointer = self.registers.get(STACK_POINTER)?;
        let stack_pointer = stack_pointer
            .checked_sub(1)
            .ok_or(ExecutionError::StackOverflow {
                address: self.program_counter,
            })?;

        self.memory.write(stack_pointer as u32, value)?;
        self.registers.set(STACK_POINTER, stack_pointer)
    }

    fn pop_stack(&mut self) -> Result<u8, ExecutionError> {
        let stack_pointer = self.registers.get(STACK_POINTER)?;
        if stack_pointer >= STACK_START {
            return Err(ExecutionError::StackUnderflow {
                address: self.program_counter,
            });
        }

        let value = self.memory.read(stack_pointer as u32)?;
        self.registers.set(STACK_POINTER, stack_pointer + 1)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LDI: u8 = Opcode::Ldi as u8;
    const PRN: u8 = Opcode::Prn as u8;
    const HLT: u8 = Opcode::Hlt as u8;
    const ADD: u8 = Opcode::Add as u8;
    const MUL: u8 = Opcode::Mul as u8;
    const CMP: u8 = Opcode::Cmp as u8;
    const PUSH: u8 = Opcode::Push as u8;
    const POP: u8 = Opcode::Pop as u8;
    const CALL: u8 = Opcode::Call as u8;
    const RET: u8 = Opcode::Ret as u8;
    const JMP: u8 = Opcode::Jmp as u8;
    const JEQ: u8 = Opcode::Jeq as u8;
    const JNE: u8 = Opcode::Jne as u8;

    fn run_program(program: &[u8]) -> NativeCpu<BufferedHostIO> {
        let mut cpu = NativeCpu::new(BufferedHostIO::default());
        cpu.load_program(program).unwrap();
        cpu.execute(RunMode::Run).unwrap();
        cpu
    }

    fn run_program_err(program: &[u8]) -> ExecutionError {
        let mut cpu = NativeCpu::new(NullHostIO);
        cpu.load_program(program).unwrap();
        cpu.execute(RunMode::Run).unwrap_err()
    }

    #[test]
    fn test_initial_state() {
        let cpu = NativeCpu::new(NullHostIO);
        assert_eq!(cpu.program_counter(), 0);
        assert_eq!(cpu.get_registers(), &[0, 0, 0, 0, 0, 0, 0, 0xF4]);
        assert_eq!(cpu.get_memory().len(), 256);
        assert!(cpu.is_running());
    }

    #[test]
    fn test_load_value() {
        for (reg, value) in [(0, 0), (3, 42), (6, 255)] {
            let cpu = run_program(&[LDI, reg, value, HLT]);
            assert_eq!(cpu.get_registers()[reg as usize], value);
            assert!(!cpu.is_running());
            assert_eq!(cpu.program_counter(), 4);
        }
    }

    #[test]
    fn test_add_and_print() {
        let cpu = run_program(&[
            LDI, 0, 8, // R0 = 8
            LDI, 1, 9, // R1 = 9
            ADD, 0, 1, // R0 += R1
            PRN, 0, //
            HLT,
        ]);
        assert_eq!(cpu.host_io().values, vec![17]);
        assert!(!cpu.is_running());
    }

    #[test]
    fn test_mul() {
        let cpu = run_program(&[LDI, 0, 8, LDI, 1, 9, MUL, 0, 1, PRN, 0, HLT]);
        assert_eq!(cpu.get_registers()[0], 72);
        assert_eq!(cpu.host_io().values, vec![72]);
    }

    #[test]
    fn test_arithmetic_wraps() {
        let cpu = run_program(&[LDI, 0, 200, LDI, 1, 100, ADD, 0, 1, HLT]);
        assert_eq!(cpu.get_registers()[0], 44);
    }

    #[test]
    fn test_alu_by_name() {
        let mut cpu = run_program(&[LDI, 0, 20, LDI, 1, 6, HLT]);

        cpu.alu_by_name("SUB", 0, 1).unwrap();
        assert_eq!(cpu.get_registers()[0], 14);

        cpu.alu_by_name("DIV", 0, 1).unwrap();
        assert_eq!(cpu.get_registers()[0], 2);

        cpu.alu_by_name("ADD", 0, 1).unwrap();
        assert_eq!(cpu.get_registers()[0], 8);

        cpu.alu_by_name("CMP", 0, 1).unwrap();
        assert!(cpu.flags().greater);
        assert_eq!(cpu.flags().bits(), 0b0000_0010);
    }

    #[test]
    fn test_div_by_zero() {
        let mut cpu = run_program(&[LDI, 0, 20, HLT]);
        let err = cpu.alu(AluOp::Div, 0, 1).unwrap_err();
        assert!(matches!(err, ExecutionError::DivisionByZero { .. }));
        assert_eq!(cpu.get_registers()[0], 20);
    }

    #[test]
    fn test_unsupported_alu_operation() {
        let mut cpu = NativeCpu::new(NullHostIO);
        let err = cpu.alu_by_name("MOD", 0, 1).unwrap_err();
        assert!(matches!(err, ExecutionError::UnsupportedAluOperation(ref op) if op == "MOD"));
    }

    #[test]
    fn test_stack_operations() {
        let cpu = run_program(&[
            LDI, 0, 42, //
            PUSH, 0, //
            LDI, 0, 0, //
            POP, 1, //
            HLT,
        ]);
        assert_eq!(cpu.get_registers()[1], 42);
        assert_eq!(cpu.get_registers()[STACK_POINTER as usize], STACK_START);
        assert_eq!(cpu.get_memory()[STACK_START as usize - 1], 42);
    }

    #[test]
    fn test_push_moves_stack_pointer() {
        let cpu = run_program(&[LDI, 0, 1, PUSH, 0, PUSH, 0, HLT]);
        assert_eq!(cpu.get_registers()[STACK_POINTER as usize], STACK_START - 2);
    }

    #[test]
    fn test_pop_underflow() {
        let err = run_program_err(&[POP, 0, HLT]);
        assert!(matches!(err, ExecutionError::StackUnderflow { address: 0 }));
    }

    #[test]
    fn test_ret_underflow() {
        let err = run_program_err(&[LDI, 0, 1, RET]);
        assert!(matches!(err, ExecutionError::StackUnderflow { address: 3 }));
    }

    #[test]
    fn test_stack_overflow() {
        let err = run_program_err(&[LDI, 7, 0, PUSH, 0, HLT]);
        assert!(matches!(err, ExecutionError::StackOverflow { address: 3 }));
    }

    #[test]
    fn test_call_ret() {
        let cpu = run_program(&[
            LDI, 1, 8, // 0: R1 = subroutine
            CALL, 1, // 3
            PRN, 0, // 5: return lands here
            HLT, // 7
            LDI, 0, 42, // 8: subroutine
            RET, // 11
        ]);
        assert_eq!(cpu.host_io().values, vec![42]);
        assert_eq!(cpu.get_memory()[STACK_START as usize - 1], 5);
        assert_eq!(cpu.get_registers()[STACK_POINTER as usize], STACK_START);
        assert_eq!(cpu.program_counter(), 8);
    }

    #[test]
    fn test_jmp() {
        let cpu = run_program(&[
            LDI, 0, 8, // 0
            JMP, 0, // 3
            PRN, 0, // 5: skipped
            HLT, // 7
            HLT, // 8
        ]);
        assert!(cpu.host_io().values.is_empty());
        assert_eq!(cpu.program_counter(), 9);
    }

    /// Compares R0 with R1 and branches over `LDI R3, 1` when taken.
    fn branch_program(jump: u8, a: u8, b: u8) -> Vec<u8> {
        vec![
            LDI, 0, a, // 0
            LDI, 1, b, // 3
            LDI, 2, 17, // 6: branch target
            CMP, 0, 1, // 9
            jump, 2, // 12
            LDI, 3, 1, // 14: only reached when not taken
            HLT, // 17
        ]
    }

    fn branch_taken(jump: u8, a: u8, b: u8) -> bool {
        let mut cpu = NativeCpu::new(NullHostIO);
        cpu.load_program(&branch_program(jump, a, b)).unwrap();
        cpu.execute(RunMode::RunFor(100)).unwrap();
        assert!(!cpu.is_running(), "program did not halt");
        cpu.get_registers()[3] == 0
    }

    #[test]
    fn test_cmp_flags() {
        let mut cpu = NativeCpu::new(NullHostIO);
        cpu.load_program(&branch_program(JEQ, 1, 2)).unwrap();
        cpu.execute(RunMode::RunFor(4)).unwrap();
        assert_eq!(cpu.flags().bits(), FLAG_LESS);

        let mut cpu = NativeCpu::new(NullHostIO);
        cpu.load_program(&branch_program(JEQ, 3, 2)).unwrap();
        cpu.execute(RunMode::RunFor(4)).unwrap();
        assert_eq!(cpu.flags().bits(), FLAG_GREATER);

        let mut cpu = NativeCpu::new(NullHostIO);
        cpu.load_program(&branch_program(JEQ, 2, 2)).unwrap();
        cpu.execute(RunMode::RunFor(4)).unwrap();
        assert_eq!(cpu.flags().bits(), FLAG_EQUAL);
    }

    #[test]
    fn test_cmp_jeq() {
        assert!(!branch_taken(JEQ, 1, 2));
        assert!(!branch_taken(JEQ, 3, 2));
        assert!(branch_taken(JEQ, 2, 2));
    }

    #[test]
    fn test_cmp_jne() {
        assert!(branch_taken(JNE, 1, 2));
        assert!(branch_taken(JNE, 3, 2));
        assert!(!branch_taken(JNE, 2, 2));
    }

    #[test]
    fn test_jne_not_taken_advances() {
        let mut cpu = NativeCpu::new(NullHostIO);
        cpu.load_program(&branch_program(JNE, 2, 2)).unwrap();
        cpu.execute(RunMode::RunFor(5)).unwrap();
        assert_eq!(cpu.program_counter(), 14);
    }

    #[test]
    fn test_unknown_opcode() {
        let err = run_program_err(&[0xFF]);
        assert!(matches!(err, ExecutionError::InvalidOpcode(0xFF, 0)));

        let err = run_program_err(&[LDI, 0, 1, 0b1010_0001]);
        assert!(matches!(err, ExecutionError::InvalidOpcode(0b1010_0001, 3)));
        assert!(err.to_string().contains("0b10100001"));
    }

    #[test]
    fn test_invalid_register() {
        let err = run_program_err(&[LDI, 8, 1, HLT]);
        assert!(matches!(err, ExecutionError::InvalidRegister(8)));
    }

    #[test]
    fn test_runs_off_end_of_memory() {
        let mut program = vec![0; 256];
        program[0] = LDI;
        program[1] = 0;
        program[2] = 254;
        program[3] = JMP;
        program[4] = 0;
        program[254] = LDI;
        let err = run_program_err(&program);
        assert!(matches!(err, ExecutionError::InvalidMemoryLocation(256)));
    }

    #[test]
    fn test_program_too_large() {
        let mut cpu = NativeCpu::new(NullHostIO);
        let err = cpu.load_program(&[HLT; 257]).unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::ProgramTooLarge {
                size: 257,
                capacity: 256
            }
        ));
        assert!(cpu.load_program(&[HLT; 256]).is_ok());
    }

    #[test]
    fn test_run_for() {
        let mut cpu = NativeCpu::new(NullHostIO);
        cpu.load_program(&[LDI, 0, 1, LDI, 1, 2, HLT]).unwrap();

        let stats = cpu.execute(RunMode::RunFor(1)).unwrap();
        assert_eq!(stats.instructions, 1);
        assert_eq!(cpu.program_counter(), 3);
        assert!(cpu.is_running());

        let stats = cpu.execute(RunMode::RunFor(10)).unwrap();
        assert_eq!(stats.instructions, 3);
        assert!(!cpu.is_running());

        let stats = cpu.execute(RunMode::Run).unwrap();
        assert_eq!(stats.instructions, 3);
    }

    #[test]
    fn test_trace() {
        let mut cpu = NativeCpu::new(NullHostIO);
        cpu.load_program(&[LDI, 0, 8, HLT]).unwrap();
        cpu.execute(RunMode::RunFor(1)).unwrap();

        let trace = cpu.trace();
        assert_eq!(trace.pc, 3);
        assert_eq!(trace.bytes, [Some(HLT), Some(0), Some(0)]);
        assert_eq!(
            trace.to_string(),
            "TRACE: 03 | 01 00 00 | 08 00 00 00 00 00 00 F4"
        );
        assert!(cpu.is_running());
    }

    #[test]
    fn test_trace_at_end_of_memory() {
        let mut program = vec![0; 256];
        program[0] = LDI;
        program[1] = 0;
        program[2] = 255;
        program[3] = JMP;
        program[4] = 0;
        let mut cpu = NativeCpu::new(NullHostIO);
        cpu.load_program(&program).unwrap();
        cpu.execute(RunMode::RunFor(2)).unwrap();

        let trace = cpu.trace();
        assert_eq!(trace.bytes, [Some(0), None, None]);
        assert!(trace.to_string().starts_with("TRACE: FF | 00 -- -- |"));
    }
}
