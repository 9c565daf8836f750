//! Console over plain stdin/stdout, for piped input.

use super::{Console, InterruptFlag, Keyboard};
use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::Duration;

/// How often a blocked read rechecks the interrupt flag.
const INTERRUPT_POLL: Duration = Duration::from_millis(50);

/// A console reading stdin on a background thread.
///
/// Bytes are forwarded through a channel so that [`Keyboard::poll_key`]
/// can check for input without blocking the engine.
pub struct StdioConsole {
    rx: Receiver<io::Result<u8>>,
    out: io::Stdout,
    interrupt: InterruptFlag,
}

impl StdioConsole {
    /// Spawn the stdin reader. Raising `interrupt` stops the engine.
    pub fn spawn(interrupt: InterruptFlag) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let stdin = io::stdin();
            for byte in stdin.lock().bytes() {
                let failed = byte.is_err();
                if tx.send(byte).is_err() || failed {
                    break;
                }
            }
        });
        Self {
            rx,
            out: io::stdout(),
            interrupt,
        }
    }
}

impl Keyboard for StdioConsole {
    fn poll_key(&mut self) -> io::Result<Option<u8>> {
        match self.rx.try_recv() {
            Ok(byte) => byte.map(Some),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => Ok(None),
        }
    }

    fn check_interrupt(&mut self) -> io::Result<()> {
        self.interrupt.check()
    }
}

impl Console for StdioConsole {
    fn read_byte(&mut self) -> io::Result<u8> {
        loop {
            self.interrupt.check()?;
            match self.rx.recv_timeout(INTERRUPT_POLL) {
                Ok(byte) => return byte,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
                }
            }
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
