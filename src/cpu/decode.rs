//! Instruction decoder for the LC-3.
//!
//! Every instruction is one 16-bit word. Bits [15:12] select the opcode;
//! the remaining twelve bits are opcode-specific fields. All offsets and
//! immediates are sign-extended here, so the engine only ever sees
//! full-width values.

use crate::cpu::registers::Reg;
use crate::word::{field, sign_extend};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The sixteen opcodes, by their 4-bit encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum Opcode {
    Br = 0x0,
    Add = 0x1,
    Ld = 0x2,
    St = 0x3,
    Jsr = 0x4,
    And = 0x5,
    Ldr = 0x6,
    Str = 0x7,
    Rti = 0x8,
    Not = 0x9,
    Ldi = 0xA,
    Sti = 0xB,
    Jmp = 0xC,
    Res = 0xD,
    Lea = 0xE,
    Trap = 0xF,
}

impl Opcode {
    const TABLE: [Opcode; 16] = [
        Opcode::Br,
        Opcode::Add,
        Opcode::Ld,
        Opcode::St,
        Opcode::Jsr,
        Opcode::And,
        Opcode::Ldr,
        Opcode::Str,
        Opcode::Rti,
        Opcode::Not,
        Opcode::Ldi,
        Opcode::Sti,
        Opcode::Jmp,
        Opcode::Res,
        Opcode::Lea,
        Opcode::Trap,
    ];

    /// The opcode of an instruction word.
    #[inline]
    pub fn of(word: u16) -> Self {
        Self::TABLE[(word >> 12) as usize]
    }
}

/// Second operand of ADD and AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// Register mode (bit 5 clear): SR2 in bits [2:0].
    Reg(Reg),
    /// Immediate mode (bit 5 set): imm5, sign-extended.
    Imm(u16),
}

/// Decoded LC-3 instruction.
///
/// Offsets are stored sign-extended to 16 bits and are added to the
/// already-incremented PC (or to a base register) with wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    // ==================== Operate ====================

    /// DR := SR1 + operand
    Add { dst: Reg, src1: Reg, src2: Operand },

    /// DR := SR1 & operand
    And { dst: Reg, src1: Reg, src2: Operand },

    /// DR := !SR
    Not { dst: Reg, src: Reg },

    // ==================== Control ====================

    /// Branch if any flag in `mask` (n=4, z=2, p=1) is set
    Br { mask: u16, offset: u16 },

    /// PC := base (RET when base is R7)
    Jmp { base: Reg },

    /// R7 := PC; PC := PC + offset
    Jsr { offset: u16 },

    /// R7 := PC; PC := base
    Jsrr { base: Reg },

    /// R7 := PC; run the service routine for `vector`
    Trap { vector: u8 },

    // ==================== Data Movement ====================

    /// DR := mem[PC + offset]
    Ld { dst: Reg, offset: u16 },

    /// DR := mem[mem[PC + offset]]
    Ldi { dst: Reg, offset: u16 },

    /// DR := mem[base + offset]
    Ldr { dst: Reg, base: Reg, offset: u16 },

    /// DR := PC + offset
    Lea { dst: Reg, offset: u16 },

    /// mem[PC + offset] := SR
    St { src: Reg, offset: u16 },

    /// mem[mem[PC + offset]] := SR
    Sti { src: Reg, offset: u16 },

    /// mem[base + offset] := SR
    Str { src: Reg, base: Reg, offset: u16 },
}

fn reg(word: u16, lo: u32) -> Reg {
    Reg::from_bits(field(word, lo + 2, lo))
}

fn pc_offset9(word: u16) -> u16 {
    sign_extend(word, 9)
}

fn operand(word: u16) -> Operand {
    if field(word, 5, 5) == 1 {
        Operand::Imm(sign_extend(word, 5))
    } else {
        Operand::Reg(reg(word, 0))
    }
}

/// Decode a 16-bit instruction word.
pub fn decode(word: u16) -> Result<Instruction, DecodeError> {
    let instruction = match Opcode::of(word) {
        Opcode::Add => Instruction::Add {
            dst: reg(word, 9),
            src1: reg(word, 6),
            src2: operand(word),
        },
        Opcode::And => Instruction::And {
            dst: reg(word, 9),
            src1: reg(word, 6),
            src2: operand(word),
        },
        Opcode::Not => Instruction::Not {
            dst: reg(word, 9),
            src: reg(word, 6),
        },
        Opcode::Br => Instruction::Br {
            mask: field(word, 11, 9),
            offset: pc_offset9(word),
        },
        Opcode::Jmp => Instruction::Jmp { base: reg(word, 6) },
        Opcode::Jsr => {
            if field(word, 11, 11) == 1 {
                Instruction::Jsr {
                    offset: sign_extend(word, 11),
                }
            } else {
                Instruction::Jsrr { base: reg(word, 6) }
            }
        }
        Opcode::Ld => Instruction::Ld {
            dst: reg(word, 9),
            offset: pc_offset9(word),
        },
        Opcode::Ldi => Instruction::Ldi {
            dst: reg(word, 9),
            offset: pc_offset9(word),
        },
        Opcode::Ldr => Instruction::Ldr {
            dst: reg(word, 9),
            base: reg(word, 6),
            offset: sign_extend(word, 6),
        },
        Opcode::Lea => Instruction::Lea {
            dst: reg(word, 9),
            offset: pc_offset9(word),
        },
        Opcode::St => Instruction::St {
            src: reg(word, 9),
            offset: pc_offset9(word),
        },
        Opcode::Sti => Instruction::Sti {
            src: reg(word, 9),
            offset: pc_offset9(word),
        },
        Opcode::Str => Instruction::Str {
            src: reg(word, 9),
            base: reg(word, 6),
            offset: sign_extend(word, 6),
        },
        Opcode::Trap => Instruction::Trap {
            vector: field(word, 7, 0) as u8,
        },
        opcode @ (Opcode::Rti | Opcode::Res) => {
            return Err(DecodeError::Reserved { opcode, word });
        }
    };

    Ok(instruction)
}

/// Encode an instruction back to a 16-bit word.
///
/// Offsets are truncated to their field width, so any value that came out
/// of [`decode`] encodes to the same word (modulo ignored bits).
pub fn encode(instr: &Instruction) -> u16 {
    let op = |o: Opcode| (o as u16) << 12;
    let r = |reg: Reg, lo: u32| reg.index() << lo;
    let alu = |o: Opcode, dst: Reg, src1: Reg, src2: &Operand| {
        let tail = match *src2 {
            Operand::Reg(sr2) => sr2.index(),
            Operand::Imm(imm) => 0x20 | (imm & 0x1F),
        };
        op(o) | r(dst, 9) | r(src1, 6) | tail
    };

    match instr {
        Instruction::Add { dst, src1, src2 } => alu(Opcode::Add, *dst, *src1, src2),
        Instruction::And { dst, src1, src2 } => alu(Opcode::And, *dst, *src1, src2),
        Instruction::Not { dst, src } => op(Opcode::Not) | r(*dst, 9) | r(*src, 6) | 0x3F,
        Instruction::Br { mask, offset } => op(Opcode::Br) | (mask & 0x7) << 9 | (offset & 0x1FF),
        Instruction::Jmp { base } => op(Opcode::Jmp) | r(*base, 6),
        Instruction::Jsr { offset } => op(Opcode::Jsr) | 1 << 11 | (offset & 0x7FF),
        Instruction::Jsrr { base } => op(Opcode::Jsr) | r(*base, 6),
        Instruction::Trap { vector } => op(Opcode::Trap) | u16::from(*vector),
        Instruction::Ld { dst, offset } => op(Opcode::Ld) | r(*dst, 9) | (offset & 0x1FF),
        Instruction::Ldi { dst, offset } => op(Opcode::Ldi) | r(*dst, 9) | (offset & 0x1FF),
        Instruction::Lea { dst, offset } => op(Opcode::Lea) | r(*dst, 9) | (offset & 0x1FF),
        Instruction::St { src, offset } => op(Opcode::St) | r(*src, 9) | (offset & 0x1FF),
        Instruction::Sti { src, offset } => op(Opcode::Sti) | r(*src, 9) | (offset & 0x1FF),
        Instruction::Ldr { dst, base, offset } => {
            op(Opcode::Ldr) | r(*dst, 9) | r(*base, 6) | (offset & 0x3F)
        }
        Instruction::Str { src, base, offset } => {
            op(Opcode::Str) | r(*src, 9) | r(*base, 6) | (offset & 0x3F)
        }
    }
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("reserved opcode {opcode:?} in instruction {word:#06x}")]
    Reserved { opcode: Opcode, word: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_add_register() {
        // ADD R2, R3, R4
        let instr = decode(0b0001_010_011_0_00_100).unwrap();
        assert_eq!(
            instr,
            Instruction::Add {
                dst: Reg::R2,
                src1: Reg::R3,
                src2: Operand::Reg(Reg::R4),
            }
        );
    }

    #[test]
    fn test_decode_add_immediate_negative() {
        // ADD R1, R1, #-1
        let instr = decode(0b0001_001_001_1_11111).unwrap();
        assert_eq!(
            instr,
            Instruction::Add {
                dst: Reg::R1,
                src1: Reg::R1,
                src2: Operand::Imm(0xFFFF),
            }
        );
    }

    #[test]
    fn test_decode_br() {
        // BRnp #-2
        let instr = decode(0b0000_101_111111110).unwrap();
        assert_eq!(instr, Instruction::Br { mask: 0b101, offset: 0xFFFE });
    }

    #[test]
    fn test_decode_jsr_and_jsrr() {
        assert_eq!(
            decode(0b0100_1_00000000011).unwrap(),
            Instruction::Jsr { offset: 3 }
        );
        assert_eq!(
            decode(0b0100_0_00_101_000000).unwrap(),
            Instruction::Jsrr { base: Reg::R5 }
        );
    }

    #[test]
    fn test_decode_ret() {
        assert_eq!(decode(0xC1C0).unwrap(), Instruction::Jmp { base: Reg::R7 });
    }

    #[test]
    fn test_decode_ldr_offset() {
        // LDR R0, R6, #-32
        let instr = decode(0b0110_000_110_100000).unwrap();
        assert_eq!(
            instr,
            Instruction::Ldr {
                dst: Reg::R0,
                base: Reg::R6,
                offset: 0xFFE0,
            }
        );
    }

    #[test]
    fn test_decode_trap() {
        assert_eq!(decode(0xF025).unwrap(), Instruction::Trap { vector: 0x25 });
    }

    #[test]
    fn test_decode_reserved() {
        assert_eq!(
            decode(0x8000),
            Err(DecodeError::Reserved { opcode: Opcode::Rti, word: 0x8000 })
        );
        assert_eq!(
            decode(0xD123),
            Err(DecodeError::Reserved { opcode: Opcode::Res, word: 0xD123 })
        );
    }

    #[test]
    fn test_encode_known_words() {
        assert_eq!(encode(&Instruction::Trap { vector: 0x25 }), 0xF025);
        assert_eq!(encode(&Instruction::Jmp { base: Reg::R7 }), 0xC1C0);
        assert_eq!(
            encode(&Instruction::Lea { dst: Reg::R0, offset: 2 }),
            0xE002
        );
    }

    proptest! {
        #[test]
        fn decode_then_encode_agrees(word in any::<u16>()) {
            if let Ok(instr) = decode(word) {
                prop_assert_eq!(decode(encode(&instr)), Ok(instr));
            }
        }

        #[test]
        fn register_mode_ignores_bits_4_3(base in any::<u16>(), unused in 0u16..4) {
            // ADD with bit 5 clear: bits 4:3 must not change the decode.
            let word = 0x1000 | (base & 0x0FC7);
            let noisy = word | (unused << 3);
            prop_assert_eq!(decode(word), decode(noisy));
        }
    }
}
