//! LC-3 register file.
//!
//! Ten registers in total:
//! - R0-R7: general purpose (R7 doubles as the link register)
//! - PC: program counter
//! - COND: condition flags, exactly one of POS/ZERO/NEG

use crate::word::is_negative;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Address the program counter starts at.
pub const PC_START: u16 = 0x3000;

/// A general-purpose register index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reg {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
}

impl Reg {
    /// All general-purpose registers in index order.
    pub const ALL: [Reg; 8] = [
        Reg::R0,
        Reg::R1,
        Reg::R2,
        Reg::R3,
        Reg::R4,
        Reg::R5,
        Reg::R6,
        Reg::R7,
    ];

    /// Register named by a 3-bit instruction field. Higher bits are ignored.
    #[inline]
    pub fn from_bits(bits: u16) -> Self {
        Self::ALL[(bits & 0x7) as usize]
    }

    /// The 3-bit encoding of this register.
    #[inline]
    pub const fn index(self) -> u16 {
        self as u16
    }
}

/// A condition flag.
///
/// The discriminants are the bit positions BR tests against, so a
/// branch's `nzp` mask can be ANDed directly with [`Flag::bits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum Flag {
    Pos = 1 << 0,
    Zero = 1 << 1,
    Neg = 1 << 2,
}

impl Flag {
    /// The flag describing a result value.
    #[inline]
    pub fn from_value(value: u16) -> Self {
        if value == 0 {
            Flag::Zero
        } else if is_negative(value) {
            Flag::Neg
        } else {
            Flag::Pos
        }
    }

    /// The raw COND register contents for this flag.
    #[inline]
    pub const fn bits(self) -> u16 {
        self as u16
    }
}

/// The LC-3 register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// R0-R7
    pub gpr: [u16; 8],

    /// Program counter. Already points past the current instruction
    /// by the time that instruction executes.
    pub pc: u16,

    /// Condition flags, set from the last flag-producing result.
    pub cond: Flag,
}

impl Registers {
    /// Power-on state: GPRs zeroed, PC at [`PC_START`], COND = ZERO.
    pub fn new() -> Self {
        Self {
            gpr: [0; 8],
            pc: PC_START,
            cond: Flag::Zero,
        }
    }

    /// Return to power-on state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Set COND from the current value of `reg`.
    #[inline]
    pub fn set_flags(&mut self, reg: Reg) {
        self.cond = Flag::from_value(self[reg]);
    }

    /// Write `value` to `reg` and set COND from it.
    #[inline]
    pub fn set_with_flags(&mut self, reg: Reg, value: u16) {
        self[reg] = value;
        self.set_flags(reg);
    }

    /// Increment the program counter by 1, wrapping.
    /// Returns the old value.
    #[inline]
    pub fn advance_pc(&mut self) -> u16 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }

    /// PC plus an already sign-extended offset, wrapping.
    #[inline]
    pub fn pc_relative(&self, offset: u16) -> u16 {
        self.pc.wrapping_add(offset)
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<Reg> for Registers {
    type Output = u16;

    fn index(&self, reg: Reg) -> &u16 {
        &self.gpr[reg as usize]
    }
}

impl IndexMut<Reg> for Registers {
    fn index_mut(&mut self, reg: Reg) -> &mut u16 {
        &mut self.gpr[reg as usize]
    }
}
