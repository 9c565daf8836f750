//! Raw-mode terminal console.
//!
//! Raw mode turns off line buffering and echo so the guest sees each
//! keystroke as it is typed. The terminal is restored when the console is
//! dropped, which covers normal halt, error returns and panics alike.

use super::{Console, InterruptFlag, Keyboard};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::time::Duration;

/// What a key event means to the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyInput {
    Byte(u8),
    Interrupt,
    Ignore,
}

/// Map a terminal key event to the byte an LC-3 program expects.
fn translate(key: &KeyEvent) -> KeyInput {
    if key.kind != KeyEventKind::Press {
        return KeyInput::Ignore;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c' | 'C') if ctrl => KeyInput::Interrupt,
        KeyCode::Char(c) if ctrl && c.is_ascii_alphabetic() => {
            KeyInput::Byte(c.to_ascii_lowercase() as u8 - b'a' + 1)
        }
        KeyCode::Char(c) if c.is_ascii() => KeyInput::Byte(c as u8),
        KeyCode::Enter => KeyInput::Byte(b'\n'),
        KeyCode::Tab => KeyInput::Byte(b'\t'),
        KeyCode::Backspace => KeyInput::Byte(0x7F),
        KeyCode::Esc => KeyInput::Byte(0x1B),
        _ => KeyInput::Ignore,
    }
}

fn interrupted() -> io::Error {
    io::Error::new(io::ErrorKind::Interrupted, "interrupted by user")
}

/// How long a blocked read waits before rechecking the interrupt flag.
const INTERRUPT_POLL: Duration = Duration::from_millis(50);

/// A console on the controlling terminal in raw mode.
pub struct TerminalConsole {
    pending: VecDeque<u8>,
    out: io::Stdout,
    interrupt: InterruptFlag,
}

impl TerminalConsole {
    /// Switch the terminal into raw mode. Raising `interrupt` stops the engine.
    pub fn enter(interrupt: InterruptFlag) -> io::Result<Self> {
        enable_raw_mode()?;
        log::debug!("terminal switched to raw mode");
        Ok(Self {
            pending: VecDeque::new(),
            out: io::stdout(),
            interrupt,
        })
    }

    /// Queue the byte for `ev`, or fail if it was Ctrl-C.
    fn accept(&mut self, ev: Event) -> io::Result<()> {
        if let Event::Key(key) = ev {
            match translate(&key) {
                KeyInput::Byte(b) => self.pending.push_back(b),
                KeyInput::Interrupt => {
                    self.interrupt.raise();
                    return Err(interrupted());
                }
                KeyInput::Ignore => {}
            }
        }
        Ok(())
    }

    /// Move every event already waiting into `pending`.
    fn drain_events(&mut self) -> io::Result<()> {
        self.interrupt.check()?;
        while event::poll(Duration::ZERO)? {
            let ev = event::read()?;
            self.accept(ev)?;
        }
        Ok(())
    }
}

impl Keyboard for TerminalConsole {
    fn poll_key(&mut self) -> io::Result<Option<u8>> {
        self.drain_events()?;
        Ok(self.pending.pop_front())
    }

    fn check_interrupt(&mut self) -> io::Result<()> {
        self.drain_events()
    }
}

impl Console for TerminalConsole {
    fn read_byte(&mut self) -> io::Result<u8> {
        loop {
            if let Some(b) = self.pending.pop_front() {
                return Ok(b);
            }
            self.interrupt.check()?;
            if event::poll(INTERRUPT_POLL)? {
                let ev = event::read()?;
                self.accept(ev)?;
            }
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        // Raw mode disables output post-processing, so add the carriage return.
        let mut lock = self.out.lock();
        for chunk in bytes.split_inclusive(|&b| b == b'\n') {
            match chunk.split_last() {
                Some((b'\n', body)) => {
                    lock.write_all(body)?;
                    lock.write_all(b"\r\n")?;
                }
                _ => lock.write_all(chunk)?,
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

impl Drop for TerminalConsole {
    fn drop(&mut self) {
        let _ = self.out.flush();
        let _ = disable_raw_mode();
        log::debug!("terminal restored");
    }
}
