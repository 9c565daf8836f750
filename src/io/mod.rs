//! Console collaborators.
//!
//! The engine never touches stdin/stdout directly. It talks to:
//! - [`Keyboard`]: a non-blocking poll used by the memory-mapped keyboard
//! - [`Console`]: blocking byte input and byte output used by the traps
//!
//! Implementations:
//! - [`BufferConsole`]: in-memory, for tests and the WASM wrapper
//! - [`StdioConsole`]: piped stdin/stdout
//! - [`TerminalConsole`]: raw-mode terminal (feature `terminal`)
//!
//! An [`InterruptFlag`] shared with the SIGINT/SIGTERM handlers lets a
//! console report an interrupt even while the guest never reads input.

mod buffer;
mod interrupt;
mod stdio;

#[cfg(feature = "terminal")]
mod terminal;

pub use buffer::BufferConsole;
pub use interrupt::InterruptFlag;
pub use stdio::StdioConsole;

#[cfg(feature = "terminal")]
pub use terminal::TerminalConsole;

use std::io;

/// Source of pending keystrokes.
pub trait Keyboard {
    /// Take the next pending input byte without blocking.
    ///
    /// Returns `Ok(None)` when nothing is waiting.
    fn poll_key(&mut self) -> io::Result<Option<u8>>;

    /// Fail with [`io::ErrorKind::Interrupted`] if the user asked to stop.
    ///
    /// The engine calls this periodically, so a guest that never touches
    /// the keyboard can still be stopped.
    fn check_interrupt(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Byte-stream console used by the trap routines.
///
/// Errors of kind [`io::ErrorKind::Interrupted`] mean the user asked to stop;
/// [`io::ErrorKind::UnexpectedEof`] means input is exhausted, which the
/// traps turn into the end-of-file character rather than a fault.
pub trait Console: Keyboard {
    /// Block until one input byte is available.
    fn read_byte(&mut self) -> io::Result<u8>;

    /// Write raw bytes to the output stream.
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Flush buffered output.
    fn flush(&mut self) -> io::Result<()>;
}
