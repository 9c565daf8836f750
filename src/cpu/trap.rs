//! Trap service routines.
//!
//! The LC-3 OS exposes console I/O through six trap vectors. They are
//! implemented natively here instead of running guest service code.

use crate::cpu::execute::{Cpu, CpuError, CpuState};
use crate::cpu::memory::MEMORY_SIZE;
use crate::cpu::registers::Reg;
use crate::io::Console;
use serde::{Deserialize, Serialize};

/// Text printed by TRAP IN before reading.
pub const IN_PROMPT: &str = "Enter a character: ";

/// Text printed by TRAP HALT.
pub const HALT_NOTICE: &str = "HALT\n";

/// Value GETC and IN leave in R0 once input is exhausted.
pub const EOF_CHAR: u16 = 0xFFFF;

/// A trap vector with a service routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TrapCode {
    /// Read one character into R0, no echo.
    Getc = 0x20,
    /// Write the character in R0.
    Out = 0x21,
    /// Write the string at R0, one character per word.
    Puts = 0x22,
    /// Prompt, read and echo one character into R0.
    In = 0x23,
    /// Write the string at R0, two characters per word.
    Putsp = 0x24,
    /// Stop the machine.
    Halt = 0x25,
}

impl TryFrom<u8> for TrapCode {
    type Error = u8;

    fn try_from(vector: u8) -> Result<Self, u8> {
        Ok(match vector {
            0x20 => TrapCode::Getc,
            0x21 => TrapCode::Out,
            0x22 => TrapCode::Puts,
            0x23 => TrapCode::In,
            0x24 => TrapCode::Putsp,
            0x25 => TrapCode::Halt,
            other => return Err(other),
        })
    }
}

/// Read one input byte, or `None` once the input has ended.
fn read_char<C: Console + ?Sized>(io: &mut C) -> Result<Option<u8>, CpuError> {
    match io.read_byte() {
        Ok(byte) => Ok(Some(byte)),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            log::debug!("input exhausted");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

impl Cpu {
    /// Run the service routine for `vector`. R7 is already saved.
    pub(crate) fn trap<C: Console + ?Sized>(&mut self, vector: u8, io: &mut C) -> Result<(), CpuError> {
        let code = TrapCode::try_from(vector).map_err(CpuError::UnknownTrap)?;
        log::debug!("trap {:?} at {:#06x}", code, self.regs.pc.wrapping_sub(1));

        match code {
            TrapCode::Getc => {
                let ch = read_char(io)?;
                self.regs.set_with_flags(Reg::R0, ch.map_or(EOF_CHAR, u16::from));
            }

            TrapCode::Out => {
                io.write_bytes(&[self.regs[Reg::R0] as u8])?;
                io.flush()?;
            }

            TrapCode::Puts => {
                let text: Vec<u8> = self.string_words().map(|w| w as u8).collect();
                io.write_bytes(&text)?;
                io.flush()?;
            }

            TrapCode::In => {
                io.write_bytes(IN_PROMPT.as_bytes())?;
                io.flush()?;
                let ch = read_char(io)?;
                if let Some(byte) = ch {
                    io.write_bytes(&[byte])?;
                    io.flush()?;
                }
                self.regs.set_with_flags(Reg::R0, ch.map_or(EOF_CHAR, u16::from));
            }

            TrapCode::Putsp => {
                let mut text = Vec::new();
                for word in self.string_words() {
                    let [low, high] = word.to_le_bytes();
                    text.push(low);
                    if high != 0 {
                        text.push(high);
                    }
                }
                io.write_bytes(&text)?;
                io.flush()?;
            }

            TrapCode::Halt => {
                io.write_bytes(HALT_NOTICE.as_bytes())?;
                io.flush()?;
                self.state = CpuState::Halted;
                log::debug!("halted after {} instructions", self.cycles + 1);
            }
        }

        Ok(())
    }

    /// Words of the zero-terminated string at R0.
    ///
    /// Reads bypass the keyboard device, wrap at the top of memory and
    /// stop after one full pass if no terminator is found.
    fn string_words(&self) -> impl Iterator<Item = u16> + '_ {
        let start = self.regs[Reg::R0];
        (0..MEMORY_SIZE)
            .map(move |i| self.mem.peek(start.wrapping_add(i as u16)))
            .take_while(|&w| w != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::registers::Flag;
    use crate::io::BufferConsole;

    fn trap(cpu: &mut Cpu, code: TrapCode, io: &mut BufferConsole) -> Result<(), CpuError> {
        cpu.mem.write(cpu.regs.pc, 0xF000 | code as u16);
        cpu.step(io).map(|_| ())
    }

    fn write_words(cpu: &mut Cpu, at: u16, words: &[u16]) {
        for (i, &w) in words.iter().enumerate() {
            cpu.mem.write(at + i as u16, w);
        }
    }

    #[test]
    fn test_trap_code_conversion() {
        assert_eq!(TrapCode::try_from(0x25), Ok(TrapCode::Halt));
        assert_eq!(TrapCode::try_from(0x20), Ok(TrapCode::Getc));
        assert_eq!(TrapCode::try_from(0x26), Err(0x26));
        assert_eq!(TrapCode::try_from(0x1F), Err(0x1F));
    }

    #[test]
    fn test_trap_saves_return_address() {
        let mut cpu = Cpu::new();
        let mut io = BufferConsole::new();
        cpu.regs[Reg::R0] = u16::from(b'x');
        trap(&mut cpu, TrapCode::Out, &mut io).unwrap();

        assert_eq!(cpu.regs[Reg::R7], 0x3001);
    }

    #[test]
    fn test_getc() {
        let mut cpu = Cpu::new();
        let mut io = BufferConsole::with_input(b"z");
        trap(&mut cpu, TrapCode::Getc, &mut io).unwrap();

        assert_eq!(cpu.regs[Reg::R0], u16::from(b'z'));
        assert_eq!(cpu.regs.cond, Flag::Pos);
        assert!(io.output().is_empty());
    }

    #[test]
    fn test_getc_end_of_input() {
        let mut cpu = Cpu::new();
        let mut io = BufferConsole::new();
        trap(&mut cpu, TrapCode::Getc, &mut io).unwrap();

        assert_eq!(cpu.regs[Reg::R0], EOF_CHAR);
        assert_eq!(cpu.regs.cond, Flag::Neg);
        assert!(cpu.is_running());

        // The program keeps going after the read.
        trap(&mut cpu, TrapCode::Halt, &mut io).unwrap();
        assert_eq!(cpu.state, CpuState::Halted);
    }

    #[test]
    fn test_in_end_of_input() {
        let mut cpu = Cpu::new();
        let mut io = BufferConsole::new();
        trap(&mut cpu, TrapCode::In, &mut io).unwrap();

        assert_eq!(cpu.regs[Reg::R0], EOF_CHAR);
        assert_eq!(cpu.regs.cond, Flag::Neg);
        assert_eq!(io.output_string(), IN_PROMPT);
    }

    #[test]
    fn test_out_writes_low_byte() {
        let mut cpu = Cpu::new();
        let mut io = BufferConsole::new();
        cpu.regs[Reg::R0] = 0x1241;
        trap(&mut cpu, TrapCode::Out, &mut io).unwrap();

        assert_eq!(io.output(), b"A");
        assert_eq!(io.flushes(), 1);
        assert!(cpu.is_running());
    }

    #[test]
    fn test_puts() {
        let mut cpu = Cpu::new();
        let mut io = BufferConsole::new();
        write_words(&mut cpu, 0x4000, &[0x0041, 0x0042, 0x0000]);
        cpu.regs[Reg::R0] = 0x4000;
        trap(&mut cpu, TrapCode::Puts, &mut io).unwrap();

        assert_eq!(io.output_string(), "AB");
        assert!(cpu.is_running());
    }

    #[test]
    fn test_puts_empty_string() {
        let mut cpu = Cpu::new();
        let mut io = BufferConsole::new();
        cpu.regs[Reg::R0] = 0x4000;
        trap(&mut cpu, TrapCode::Puts, &mut io).unwrap();

        assert!(io.output().is_empty());
    }

    #[test]
    fn test_putsp() {
        let mut cpu = Cpu::new();
        let mut io = BufferConsole::new();
        write_words(&mut cpu, 0x4000, &[0x4241, 0x0000]);
        cpu.regs[Reg::R0] = 0x4000;
        trap(&mut cpu, TrapCode::Putsp, &mut io).unwrap();

        assert_eq!(io.output_string(), "AB");
    }

    #[test]
    fn test_putsp_odd_length() {
        let mut cpu = Cpu::new();
        let mut io = BufferConsole::new();
        write_words(&mut cpu, 0x4000, &[0x6548, 0x006C, 0x0000]);
        cpu.regs[Reg::R0] = 0x4000;
        trap(&mut cpu, TrapCode::Putsp, &mut io).unwrap();

        assert_eq!(io.output_string(), "Hel");
    }

    #[test]
    fn test_in_prompts_and_echoes() {
        let mut cpu = Cpu::new();
        let mut io = BufferConsole::with_input(b"q");
        trap(&mut cpu, TrapCode::In, &mut io).unwrap();

        assert_eq!(io.output_string(), "Enter a character: q");
        assert_eq!(cpu.regs[Reg::R0], u16::from(b'q'));
        assert!(cpu.is_running());
    }

    #[test]
    fn test_halt() {
        let mut cpu = Cpu::new();
        let mut io = BufferConsole::new();
        trap(&mut cpu, TrapCode::Halt, &mut io).unwrap();

        assert!(cpu.is_halted());
        assert_eq!(io.output_string(), HALT_NOTICE);
    }

    #[test]
    fn test_each_trap_returns_independently() {
        // Every non-halting routine must leave the machine running and
        // produce only its own output.
        for code in [TrapCode::Getc, TrapCode::Out, TrapCode::Puts, TrapCode::In, TrapCode::Putsp] {
            let mut cpu = Cpu::new();
            let mut io = BufferConsole::with_input(b"a");
            trap(&mut cpu, code, &mut io).unwrap();

            assert!(cpu.is_running(), "{:?} halted the machine", code);
            assert!(
                !io.output_string().contains("HALT"),
                "{:?} fell through to HALT",
                code
            );
        }
    }

    #[test]
    fn test_unknown_trap() {
        let mut cpu = Cpu::new();
        let mut io = BufferConsole::new();
        cpu.mem.write(0x3000, 0xF0FF);
        let err = cpu.step(&mut io).unwrap_err();

        assert!(matches!(err, CpuError::UnknownTrap(0xFF)));
        assert!(io.output().is_empty());
    }
}
