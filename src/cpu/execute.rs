//! CPU execution engine for the LC-3.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use crate::cpu::decode::{self, DecodeError, Instruction, Operand};
use crate::cpu::registers::Reg;
use crate::cpu::{Memory, Registers};
use crate::image::Image;
use crate::io::Console;
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Instructions executed between interrupt checks.
pub const INTERRUPT_CHECK_INTERVAL: u64 = 1024;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (executed TRAP HALT). Terminal.
    Halted,
}

/// The LC-3 CPU.
///
/// Owns the register file and memory. Console I/O is supplied per call,
/// so the same machine can be driven by a terminal, a pipe or a buffer.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instructions executed so far.
    pub cycles: u64,
}

impl Cpu {
    /// Create a CPU in power-on state: PC = 0x3000, COND = ZERO, memory zeroed.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            state: CpuState::Running,
            cycles: 0,
        }
    }

    /// Reset the CPU to power-on state.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
    }

    /// Place an image in memory. Later images overwrite earlier ones.
    ///
    /// Returns the number of words loaded.
    pub fn load_image(&mut self, image: &Image) -> usize {
        self.mem.load_image(image)
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed, or an error.
    pub fn step<C: Console + ?Sized>(&mut self, io: &mut C) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        // Fetch
        let pc = self.regs.pc;
        let raw = self.mem.read(pc, io)?;

        // Offsets are relative to the incremented PC
        self.regs.advance_pc();

        // Decode
        let instr = decode::decode(raw).map_err(|source| CpuError::Decode { pc, source })?;

        // Execute
        self.execute(instr, io)?;

        self.cycles += 1;
        Ok(instr)
    }

    /// Run until halt or error.
    ///
    /// Returns the number of instructions executed.
    pub fn run<C: Console + ?Sized>(&mut self, io: &mut C) -> Result<u64, CpuError> {
        self.run_limited(u64::MAX, io)
    }

    /// Run for at most `max_cycles` instructions.
    ///
    /// The console is asked about pending interrupts every
    /// [`INTERRUPT_CHECK_INTERVAL`] instructions, so a guest spinning
    /// without I/O can still be stopped.
    pub fn run_limited<C: Console + ?Sized>(
        &mut self,
        max_cycles: u64,
        io: &mut C,
    ) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles.saturating_add(max_cycles);

        while self.state == CpuState::Running && self.cycles < limit {
            if (self.cycles - start_cycles) % INTERRUPT_CHECK_INTERVAL == 0 {
                io.check_interrupt()?;
            }
            self.step(io)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Execute a decoded instruction.
    fn execute<C: Console + ?Sized>(&mut self, instr: Instruction, io: &mut C) -> Result<(), CpuError> {
        match instr {
            // ==================== Operate ====================

            Instruction::Add { dst, src1, src2 } => {
                let value = self.regs[src1].wrapping_add(self.operand(src2));
                self.regs.set_with_flags(dst, value);
            }

            Instruction::And { dst, src1, src2 } => {
                let value = self.regs[src1] & self.operand(src2);
                self.regs.set_with_flags(dst, value);
            }

            Instruction::Not { dst, src } => {
                let value = !self.regs[src];
                self.regs.set_with_flags(dst, value);
            }

            // ==================== Control ====================

            Instruction::Br { mask, offset } => {
                if mask & self.regs.cond.bits() != 0 {
                    self.regs.pc = self.regs.pc_relative(offset);
                }
            }

            Instruction::Jmp { base } => {
                self.regs.pc = self.regs[base];
            }

            Instruction::Jsr { offset } => {
                self.regs[Reg::R7] = self.regs.pc;
                self.regs.pc = self.regs.pc_relative(offset);
            }

            Instruction::Jsrr { base } => {
                self.regs[Reg::R7] = self.regs.pc;
                self.regs.pc = self.regs[base];
            }

            Instruction::Trap { vector } => {
                self.regs[Reg::R7] = self.regs.pc;
                self.trap(vector, io)?;
            }

            // ==================== Data Movement ====================

            Instruction::Ld { dst, offset } => {
                let addr = self.regs.pc_relative(offset);
                let value = self.mem.read(addr, io)?;
                self.regs.set_with_flags(dst, value);
            }

            Instruction::Ldi { dst, offset } => {
                let pointer = self.mem.read(self.regs.pc_relative(offset), io)?;
                let value = self.mem.read(pointer, io)?;
                self.regs.set_with_flags(dst, value);
            }

            Instruction::Ldr { dst, base, offset } => {
                let addr = self.regs[base].wrapping_add(offset);
                let value = self.mem.read(addr, io)?;
                self.regs.set_with_flags(dst, value);
            }

            Instruction::Lea { dst, offset } => {
                let addr = self.regs.pc_relative(offset);
                self.regs.set_with_flags(dst, addr);
            }

            Instruction::St { src, offset } => {
                let addr = self.regs.pc_relative(offset);
                self.mem.write(addr, self.regs[src]);
            }

            Instruction::Sti { src, offset } => {
                let pointer = self.mem.read(self.regs.pc_relative(offset), io)?;
                self.mem.write(pointer, self.regs[src]);
            }

            Instruction::Str { src, base, offset } => {
                let addr = self.regs[base].wrapping_add(offset);
                self.mem.write(addr, self.regs[src]);
            }
        }

        Ok(())
    }

    /// Value of the second ALU operand.
    #[inline]
    fn operand(&self, operand: Operand) -> u16 {
        match operand {
            Operand::Reg(reg) => self.regs[reg],
            Operand::Imm(imm) => imm,
        }
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("decode error at {pc:#06x}: {source}")]
    Decode {
        pc: u16,
        #[source]
        source: DecodeError,
    },

    #[error("unknown trap vector {0:#04x}")]
    UnknownTrap(u8),

    #[error("interrupted")]
    Interrupted,

    #[error("console I/O error: {0}")]
    Io(#[source] io::Error),
}

impl From<io::Error> for CpuError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::Interrupted => CpuError::Interrupted,
            _ => CpuError::Io(err),
        }
    }
}
