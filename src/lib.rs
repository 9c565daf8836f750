//! # LC-3 Virtual Machine
//!
//! A virtual machine for the LC-3, a 16-bit instruction set used to teach
//! computer architecture. It loads big-endian object images into a flat
//! 64K-word memory and runs them with console I/O provided by trap
//! routines and a memory-mapped keyboard.

pub mod word;
pub mod cpu;
pub mod image;
pub mod io;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{Cpu, CpuState, CpuError, Memory, Registers, Reg, Flag, Instruction};
pub use image::{Image, ImageError, load_image};
pub use io::{Console, Keyboard, BufferConsole, InterruptFlag, StdioConsole};

#[cfg(feature = "terminal")]
pub use io::TerminalConsole;
