//! CPU emulation for the LC-3.
//!
//! This module implements the complete LC-3 machine:
//! - 65,536 sixteen-bit memory words with a memory-mapped keyboard
//! - 10 registers: R0-R7, PC, COND
//! - 15-instruction set plus six console trap routines

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;
pub mod trap;

pub use memory::{Memory, MemoryError};
pub use registers::{Flag, Reg, Registers};
pub use decode::{Instruction, Opcode, Operand, DecodeError};
pub use execute::{Cpu, CpuError, CpuState};
pub use trap::TrapCode;
