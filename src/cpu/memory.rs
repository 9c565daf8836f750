//! LC-3 memory subsystem.
//!
//! A flat array of 65,536 sixteen-bit words. Two addresses near the top
//! are wired to the keyboard device instead of plain storage:
//! - `KBSR` (0xFE00): status, bit 15 set when a key is ready
//! - `KBDR` (0xFE02): the last key received

use crate::image::Image;
use crate::io::Keyboard;
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// The number of addressable words.
pub const MEMORY_SIZE: usize = 1 << 16;

/// Keyboard status register.
pub const KBSR: u16 = 0xFE00;

/// Keyboard data register.
pub const KBDR: u16 = 0xFE02;

/// Status bit reported in `KBSR` when a key is waiting in `KBDR`.
pub const KBSR_READY: u16 = 1 << 15;

/// Errors building a memory from raw words.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryError {
    #[error("memory must hold 65536 words, got {0}")]
    WrongSize(usize),
}

/// LC-3 memory: 65,536 sixteen-bit words.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<u16>", into = "Vec<u16>")]
pub struct Memory {
    cells: Vec<u16>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    /// Read a word the way the CPU does.
    ///
    /// Reading `KBSR` polls the keyboard first: a pending key sets the
    /// ready bit and lands in `KBDR`, otherwise the status becomes 0. This
    /// can consume one keystroke. Every other address is a plain load.
    pub fn read<K: Keyboard + ?Sized>(&mut self, addr: u16, kbd: &mut K) -> io::Result<u16> {
        if addr == KBSR {
            match kbd.poll_key()? {
                Some(byte) => {
                    self.cells[KBSR as usize] = KBSR_READY;
                    self.cells[KBDR as usize] = u16::from(byte);
                }
                None => self.cells[KBSR as usize] = 0,
            }
        }
        Ok(self.cells[addr as usize])
    }

    /// Read a word with no device side effects.
    #[inline]
    pub fn peek(&self, addr: u16) -> u16 {
        self.cells[addr as usize]
    }

    /// Store a word. Every 16-bit address is valid.
    #[inline]
    pub fn write(&mut self, addr: u16, value: u16) {
        self.cells[addr as usize] = value;
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Copy an image into memory at its origin.
    ///
    /// Words that would land past 0xFFFF are dropped. Returns the number
    /// of words actually placed.
    pub fn load_image(&mut self, image: &Image) -> usize {
        let start = image.origin as usize;
        let room = MEMORY_SIZE - start;
        let count = image.words.len().min(room);
        if count < image.words.len() {
            log::warn!(
                "image at {:#06x} truncated: {} of {} words fit",
                image.origin,
                count,
                image.words.len()
            );
        }
        self.cells[start..start + count].copy_from_slice(&image.words[..count]);
        count
    }

    /// Dump memory contents (for debugging).
    pub fn dump(&self, start: u16, count: usize) -> Vec<(u16, u16)> {
        let end = (start as usize + count).min(MEMORY_SIZE);
        (start as usize..end)
            .map(|i| (i as u16, self.cells[i]))
            .collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Vec<u16>> for Memory {
    type Error = MemoryError;

    fn try_from(cells: Vec<u16>) -> Result<Self, MemoryError> {
        if cells.len() != MEMORY_SIZE {
            return Err(MemoryError::WrongSize(cells.len()));
        }
        Ok(Self { cells })
    }
}

impl From<Memory> for Vec<u16> {
    fn from(mem: Memory) -> Self {
        mem.cells
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&w| w != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}
