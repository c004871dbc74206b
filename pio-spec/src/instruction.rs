//! PIO Instruction Set
//!
//! Nine instruction kinds, plus the two V1 forms that index the RX FIFO as a
//! register file. An [`Instruction`] carries operands only; delay and side-set
//! live in bits 12:8 and are applied on top of [`Instruction::encode`].
//!
//! ## Operand Layout
//! - JMP:   arg1 = condition, arg2 = address
//! - WAIT:  arg1 = polarity:1 source:2, arg2 = index (IRQ: mode:2 num:3)
//! - IN:    arg1 = source, arg2 = bit count (32 encoded as 0)
//! - OUT:   arg1 = destination, arg2 = bit count (32 encoded as 0)
//! - PUSH:  arg1 = 0 if_full block, arg2 = 0
//! - PULL:  arg1 = 1 if_empty block, arg2 = 0
//! - MOV:   arg1 = destination, arg2 = op:2 source:3
//! - IRQ:   arg1 = 0 clear wait, arg2 = mode:2 num:3
//! - SET:   arg1 = destination, arg2 = data
//! - MOV RXFIFO (V1): PUSH/PULL opcode, bit 4 set, bit 3 = index by immediate,
//!   bits 1:0 = index

use crate::encoding::{encode_raw, extract_arg1, extract_arg2, extract_opcode};
use crate::error::{Result, SpecError};
use crate::operand::{
    InSource, IrqIndexMode, JmpCondition, MovDestination, MovOperation, MovSource, OutDestination,
    SetDestination, WaitSource,
};
use crate::{Opcode, PioVersion};
use serde::{Deserialize, Serialize};

/// arg1 bit that turns PUSH into PULL
const PULL_BIT: u8 = 0b100;

/// arg2 bit marking the V1 MOV to/from RX FIFO forms
const MOV_RX_BIT: u8 = 0b1_0000;

/// arg2 bit selecting an immediate RX FIFO index
const MOV_RX_IMMEDIATE_BIT: u8 = 0b0_1000;

/// PIO Instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instruction {
    /// JMP: jump to `address` when `condition` holds
    Jmp { condition: JmpCondition, address: u8 },

    /// WAIT: stall until `source[index]` equals `polarity`
    Wait {
        polarity: bool,
        source: WaitSource,
        index: u8,
        /// Only meaningful for `WaitSource::Irq`
        mode: IrqIndexMode,
    },

    /// IN: shift `bit_count` bits from `source` into the ISR
    In { source: InSource, bit_count: u8 },

    /// OUT: shift `bit_count` bits from the OSR to `destination`
    Out { destination: OutDestination, bit_count: u8 },

    /// PUSH: ISR to RX FIFO
    Push { if_full: bool, block: bool },

    /// PULL: TX FIFO to OSR
    Pull { if_empty: bool, block: bool },

    /// MOV: `destination = op(source)`
    Mov {
        destination: MovDestination,
        op: MovOperation,
        source: MovSource,
    },

    /// V1: ISR to RX FIFO entry `index`, or entry Y when not indexed by immediate
    MovToRx { index_by_immediate: bool, index: u8 },

    /// V1: RX FIFO entry `index` (or Y) to OSR
    MovFromRx { index_by_immediate: bool, index: u8 },

    /// IRQ: set, wait on, or clear flag `index`
    Irq {
        clear: bool,
        wait: bool,
        index: u8,
        mode: IrqIndexMode,
    },

    /// SET: write the 5-bit immediate `data` to `destination`
    Set { destination: SetDestination, data: u8 },
}

impl Instruction {
    /// `mov y, y`
    pub const NOP: Instruction = Instruction::Mov {
        destination: MovDestination::Y,
        op: MovOperation::None,
        source: MovSource::Y,
    };

    /// Get the assembly mnemonic
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Jmp { .. } => "jmp",
            Instruction::Wait { .. } => "wait",
            Instruction::In { .. } => "in",
            Instruction::Out { .. } => "out",
            Instruction::Push { .. } => "push",
            Instruction::Pull { .. } => "pull",
            Instruction::Mov { .. } | Instruction::MovToRx { .. } | Instruction::MovFromRx { .. } => {
                "mov"
            }
            Instruction::Irq { .. } => "irq",
            Instruction::Set { .. } => "set",
        }
    }

    /// Major opcode this instruction encodes to
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Jmp { .. } => Opcode::Jmp,
            Instruction::Wait { .. } => Opcode::Wait,
            Instruction::In { .. } => Opcode::In,
            Instruction::Out { .. } => Opcode::Out,
            Instruction::Push { .. }
            | Instruction::Pull { .. }
            | Instruction::MovToRx { .. }
            | Instruction::MovFromRx { .. } => Opcode::PushPull,
            Instruction::Mov { .. } => Opcode::Mov,
            Instruction::Irq { .. } => Opcode::Irq,
            Instruction::Set { .. } => Opcode::Set,
        }
    }

    /// Check if this is the canonical no-op
    pub fn is_nop(&self) -> bool {
        *self == Self::NOP
    }

    /// Earliest hardware generation able to execute this instruction
    pub fn min_version(&self) -> PioVersion {
        match self {
            Instruction::Wait { source, mode, .. } => source.min_version().max(mode.min_version()),
            Instruction::Mov { destination, .. } => destination.min_version(),
            Instruction::MovToRx { .. } | Instruction::MovFromRx { .. } => PioVersion::V1,
            Instruction::Irq { mode, .. } => mode.min_version(),
            _ => PioVersion::V0,
        }
    }

    /// Reject instructions the given generation cannot execute
    pub fn check_version(&self, version: PioVersion) -> Result<()> {
        let required = self.min_version();
        if required > version {
            return Err(SpecError::UnsupportedOnVersion {
                feature: self.feature_name(),
                required,
                actual: version,
            });
        }
        Ok(())
    }

    fn feature_name(&self) -> &'static str {
        match self {
            Instruction::Wait { source: WaitSource::JmpPin, .. } => "wait jmppin",
            Instruction::Wait { .. } | Instruction::Irq { .. } => "irq prev/next",
            Instruction::Mov { .. } => "mov pindirs",
            Instruction::MovToRx { .. } | Instruction::MovFromRx { .. } => "mov rxfifo[]",
            _ => self.mnemonic(),
        }
    }

    /// Encode to a 16-bit word with a zero delay/side-set field.
    ///
    /// Operands are masked to their field widths, not range checked.
    pub fn encode(&self) -> u16 {
        match *self {
            Instruction::Jmp { condition, address } => {
                encode_raw(Opcode::Jmp, 0, condition.to_u8(), address)
            }
            Instruction::Wait { polarity, source, index, mode } => {
                let arg1 = (polarity as u8) << 2 | source.to_u8();
                let arg2 = match source {
                    WaitSource::Irq => irq_index(index, mode),
                    _ => index,
                };
                encode_raw(Opcode::Wait, 0, arg1, arg2)
            }
            Instruction::In { source, bit_count } => {
                encode_raw(Opcode::In, 0, source.to_u8(), bit_count_field(bit_count))
            }
            Instruction::Out { destination, bit_count } => {
                encode_raw(Opcode::Out, 0, destination.to_u8(), bit_count_field(bit_count))
            }
            Instruction::Push { if_full, block } => {
                encode_raw(Opcode::PushPull, 0, (if_full as u8) << 1 | block as u8, 0)
            }
            Instruction::Pull { if_empty, block } => encode_raw(
                Opcode::PushPull,
                0,
                PULL_BIT | (if_empty as u8) << 1 | block as u8,
                0,
            ),
            Instruction::Mov { destination, op, source } => {
                encode_raw(Opcode::Mov, 0, destination.to_u8(), op.to_u8() << 3 | source.to_u8())
            }
            Instruction::MovToRx { index_by_immediate, index } => {
                encode_raw(Opcode::PushPull, 0, 0, mov_rx_index(index_by_immediate, index))
            }
            Instruction::MovFromRx { index_by_immediate, index } => encode_raw(
                Opcode::PushPull,
                0,
                PULL_BIT,
                mov_rx_index(index_by_immediate, index),
            ),
            Instruction::Irq { clear, wait, index, mode } => encode_raw(
                Opcode::Irq,
                0,
                (clear as u8) << 1 | wait as u8,
                irq_index(index, mode),
            ),
            Instruction::Set { destination, data } => {
                encode_raw(Opcode::Set, 0, destination.to_u8(), data)
            }
        }
    }

    /// Decode the operand part of a word. Bits 12:8 are ignored; splitting them
    /// into delay and side-set needs the program's side-set width.
    pub fn decode(word: u16) -> Result<Self> {
        let arg1 = extract_arg1(word);
        let arg2 = extract_arg2(word);

        let instr = match extract_opcode(word) {
            Opcode::Jmp => Instruction::Jmp {
                condition: JmpCondition::from_u8(arg1)
                    .ok_or(SpecError::InvalidEncoding(word))?,
                address: arg2,
            },
            Opcode::Wait => {
                let source = WaitSource::from_u8(arg1 & 0b11)
                    .ok_or(SpecError::InvalidEncoding(word))?;
                let (index, mode) = match source {
                    WaitSource::Irq => split_irq_index(word, arg2)?,
                    _ => (arg2, IrqIndexMode::Direct),
                };
                Instruction::Wait {
                    polarity: arg1 & 0b100 != 0,
                    source,
                    index,
                    mode,
                }
            }
            Opcode::In => Instruction::In {
                source: InSource::from_u8(arg1).ok_or(SpecError::ReservedEncoding {
                    word,
                    field: "in source",
                    value: arg1,
                })?,
                bit_count: bit_count_value(arg2),
            },
            Opcode::Out => Instruction::Out {
                destination: OutDestination::from_u8(arg1)
                    .ok_or(SpecError::InvalidEncoding(word))?,
                bit_count: bit_count_value(arg2),
            },
            Opcode::PushPull => decode_push_pull(word, arg1, arg2)?,
            Opcode::Mov => {
                let op = arg2 >> 3;
                let source = arg2 & 0b111;
                Instruction::Mov {
                    destination: MovDestination::from_u8(arg1)
                        .ok_or(SpecError::InvalidEncoding(word))?,
                    op: MovOperation::from_u8(op).ok_or(SpecError::ReservedEncoding {
                        word,
                        field: "mov operation",
                        value: op,
                    })?,
                    source: MovSource::from_u8(source).ok_or(SpecError::ReservedEncoding {
                        word,
                        field: "mov source",
                        value: source,
                    })?,
                }
            }
            Opcode::Irq => {
                if arg1 & 0b100 != 0 {
                    return Err(SpecError::ReservedEncoding {
                        word,
                        field: "irq flags",
                        value: arg1,
                    });
                }
                let (index, mode) = split_irq_index(word, arg2)?;
                Instruction::Irq {
                    clear: arg1 & 0b010 != 0,
                    wait: arg1 & 0b001 != 0,
                    index,
                    mode,
                }
            }
            Opcode::Set => Instruction::Set {
                destination: SetDestination::from_u8(arg1).ok_or(SpecError::ReservedEncoding {
                    word,
                    field: "set destination",
                    value: arg1,
                })?,
                data: arg2,
            },
        };

        Ok(instr)
    }
}

fn decode_push_pull(word: u16, arg1: u8, arg2: u8) -> Result<Instruction> {
    let pull = arg1 & PULL_BIT != 0;

    if arg2 & MOV_RX_BIT != 0 {
        // 0b?00 1 I 0 NN
        if arg1 & 0b011 != 0 || arg2 & 0b100 != 0 {
            return Err(SpecError::InvalidEncoding(word));
        }
        let index_by_immediate = arg2 & MOV_RX_IMMEDIATE_BIT != 0;
        let index = arg2 & 0b11;
        return Ok(if pull {
            Instruction::MovFromRx { index_by_immediate, index }
        } else {
            Instruction::MovToRx { index_by_immediate, index }
        });
    }

    if arg2 != 0 {
        return Err(SpecError::InvalidEncoding(word));
    }

    let flag = arg1 & 0b010 != 0;
    let block = arg1 & 0b001 != 0;
    Ok(if pull {
        Instruction::Pull { if_empty: flag, block }
    } else {
        Instruction::Push { if_full: flag, block }
    })
}

fn irq_index(index: u8, mode: IrqIndexMode) -> u8 {
    mode.to_u8() << 3 | (index & 0b111)
}

fn split_irq_index(word: u16, arg2: u8) -> Result<(u8, IrqIndexMode)> {
    let mode = IrqIndexMode::from_u8(arg2 >> 3).ok_or(SpecError::InvalidEncoding(word))?;
    Ok((arg2 & 0b111, mode))
}

fn mov_rx_index(index_by_immediate: bool, index: u8) -> u8 {
    MOV_RX_BIT | (index_by_immediate as u8) << 3 | (index & 0b11)
}

/// 32 is stored as 0
fn bit_count_field(bit_count: u8) -> u8 {
    bit_count & 0x1F
}

fn bit_count_value(field: u8) -> u8 {
    if field == 0 {
        32
    } else {
        field
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Instruction::Jmp { condition: JmpCondition::Always, address } => {
                write!(f, "jmp {}", address)
            }
            Instruction::Jmp { condition, address } => write!(f, "jmp {}, {}", condition, address),
            Instruction::Wait { polarity, source, index, mode } => {
                write!(f, "wait {} {}", polarity as u8, source)?;
                match (source, mode) {
                    (WaitSource::Irq, IrqIndexMode::Prev | IrqIndexMode::Next) => {
                        write!(f, " {} {}", mode, index)
                    }
                    (WaitSource::Irq, IrqIndexMode::Relative) => write!(f, " {} rel", index),
                    _ => write!(f, " {}", index),
                }
            }
            Instruction::In { source, bit_count } => write!(f, "in {}, {}", source, bit_count),
            Instruction::Out { destination, bit_count } => {
                write!(f, "out {}, {}", destination, bit_count)
            }
            Instruction::Push { if_full, block } => {
                write!(f, "push")?;
                if if_full {
                    write!(f, " iffull")?;
                }
                write!(f, " {}", if block { "block" } else { "noblock" })
            }
            Instruction::Pull { if_empty, block } => {
                write!(f, "pull")?;
                if if_empty {
                    write!(f, " ifempty")?;
                }
                write!(f, " {}", if block { "block" } else { "noblock" })
            }
            _ if self.is_nop() => write!(f, "nop"),
            Instruction::Mov { destination, op, source } => {
                write!(f, "mov {}, {}{}", destination, op, source)
            }
            Instruction::MovToRx { index_by_immediate, index } => {
                write!(f, "mov rxfifo[{}], isr", rx_index_text(index_by_immediate, index))
            }
            Instruction::MovFromRx { index_by_immediate, index } => {
                write!(f, "mov osr, rxfifo[{}]", rx_index_text(index_by_immediate, index))
            }
            Instruction::Irq { clear, wait, index, mode } => {
                let action = if clear {
                    "clear"
                } else if wait {
                    "wait"
                } else {
                    "nowait"
                };
                write!(f, "irq {}", action)?;
                match mode {
                    IrqIndexMode::Prev | IrqIndexMode::Next => write!(f, " {} {}", mode, index),
                    IrqIndexMode::Relative => write!(f, " {} rel", index),
                    IrqIndexMode::Direct => write!(f, " {}", index),
                }
            }
            Instruction::Set { destination, data } => write!(f, "set {}, {}", destination, data),
        }
    }
}

fn rx_index_text(index_by_immediate: bool, index: u8) -> String {
    if index_by_immediate {
        index.to_string()
    } else {
        "y".to_string()
    }
}
