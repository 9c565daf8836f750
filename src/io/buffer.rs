//! In-memory console.

use super::{Console, InterruptFlag, Keyboard};
use std::collections::VecDeque;
use std::io;

/// A console backed by byte buffers.
///
/// Input is queued up front (or pushed between steps); everything the
/// guest writes is collected in [`BufferConsole::output`].
#[derive(Debug, Clone, Default)]
pub struct BufferConsole {
    input: VecDeque<u8>,
    output: Vec<u8>,
    flushes: usize,
    interrupt: InterruptFlag,
}

impl BufferConsole {
    /// Create an empty console.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a console with `input` already queued.
    pub fn with_input(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            ..Self::default()
        }
    }

    /// Queue more input bytes.
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.input.extend(bytes.iter().copied());
    }

    /// Number of input bytes not yet consumed.
    pub fn pending_input(&self) -> usize {
        self.input.len()
    }

    /// Everything written so far.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Output decoded lossily as UTF-8.
    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// Drain and return the collected output.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    /// The flag that stops the engine when raised.
    pub fn interrupt_flag(&self) -> InterruptFlag {
        self.interrupt.clone()
    }

    /// How many times the guest flushed.
    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl Keyboard for BufferConsole {
    fn poll_key(&mut self) -> io::Result<Option<u8>> {
        Ok(self.input.pop_front())
    }

    fn check_interrupt(&mut self) -> io::Result<()> {
        self.interrupt.check()
    }
}

impl Console for BufferConsole {
    fn read_byte(&mut self) -> io::Result<u8> {
        self.input
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "input exhausted"))
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.output.extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
