//! Operand selectors for the PIO instruction set
//!
//! Every selector is a small field packed into the low byte of an instruction.
//! Reserved encodings have no variant, so `from_u8` returns `None` for them.

use crate::PioVersion;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! operand_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $value:literal => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(u8)]
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $value, )+
        }

        impl $name {
            /// Every encodable value, in encoding order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            #[inline]
            pub fn from_u8(value: u8) -> Option<Self> {
                match value {
                    $( $value => Some($name::$variant), )+
                    _ => None,
                }
            }

            #[inline]
            pub const fn to_u8(self) -> u8 {
                self as u8
            }

            /// Assembly spelling
            pub fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => $text, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.name())
            }
        }
    };
}

operand_enum! {
    /// JMP condition (3 bits)
    JmpCondition {
        /// No condition, always jumps
        Always = 0b000 => "",
        /// Scratch X is zero
        XIsZero = 0b001 => "!x",
        /// Scratch X non-zero, decremented after the test
        XDecNonZero = 0b010 => "x--",
        /// Scratch Y is zero
        YIsZero = 0b011 => "!y",
        /// Scratch Y non-zero, decremented after the test
        YDecNonZero = 0b100 => "y--",
        XNotEqualY = 0b101 => "x!=y",
        /// The pin selected by EXECCTRL_JMP_PIN is high
        Pin = 0b110 => "pin",
        /// Output shift register not empty
        OsrNotEmpty = 0b111 => "!osre",
    }
}

operand_enum! {
    /// WAIT source (low 2 bits of arg1; bit 2 is the polarity)
    WaitSource {
        Gpio = 0b00 => "gpio",
        Pin = 0b01 => "pin",
        Irq = 0b10 => "irq",
        /// V1 only: the JMP pin plus an offset 0-3
        JmpPin = 0b11 => "jmppin",
    }
}

operand_enum! {
    /// IN source
    InSource {
        Pins = 0b000 => "pins",
        X = 0b001 => "x",
        Y = 0b010 => "y",
        Null = 0b011 => "null",
        Isr = 0b110 => "isr",
        Osr = 0b111 => "osr",
    }
}

operand_enum! {
    /// OUT destination
    OutDestination {
        Pins = 0b000 => "pins",
        X = 0b001 => "x",
        Y = 0b010 => "y",
        Null = 0b011 => "null",
        Pindirs = 0b100 => "pindirs",
        Pc = 0b101 => "pc",
        Isr = 0b110 => "isr",
        Exec = 0b111 => "exec",
    }
}

operand_enum! {
    /// MOV destination
    MovDestination {
        Pins = 0b000 => "pins",
        X = 0b001 => "x",
        Y = 0b010 => "y",
        /// V1 only
        Pindirs = 0b011 => "pindirs",
        Exec = 0b100 => "exec",
        Pc = 0b101 => "pc",
        Isr = 0b110 => "isr",
        Osr = 0b111 => "osr",
    }
}

operand_enum! {
    /// MOV operation applied to the source on the way through
    MovOperation {
        None = 0b00 => "",
        Invert = 0b01 => "~",
        BitReverse = 0b10 => "::",
    }
}

operand_enum! {
    /// MOV source
    MovSource {
        Pins = 0b000 => "pins",
        X = 0b001 => "x",
        Y = 0b010 => "y",
        Null = 0b011 => "null",
        Status = 0b101 => "status",
        Isr = 0b110 => "isr",
        Osr = 0b111 => "osr",
    }
}

operand_enum! {
    /// SET destination
    SetDestination {
        Pins = 0b000 => "pins",
        X = 0b001 => "x",
        Y = 0b010 => "y",
        Pindirs = 0b100 => "pindirs",
    }
}

operand_enum! {
    /// How the 3-bit IRQ number of WAIT IRQ / IRQ is interpreted
    ///
    /// Occupies bits 4:3 of the index field. `V0` hardware only decodes bit 4
    /// (the relative flag), so only `Direct` and `Relative` are valid there.
    IrqIndexMode {
        /// Flag of this block, numbered as written
        Direct = 0b00 => "",
        /// V1 only: flag of the previous block
        Prev = 0b01 => "prev",
        /// Flag number added modulo 4 to the state machine index
        Relative = 0b10 => "rel",
        /// V1 only: flag of the next block
        Next = 0b11 => "next",
    }
}

impl WaitSource {
    /// Earliest hardware generation that decodes this source
    pub const fn min_version(self) -> PioVersion {
        match self {
            WaitSource::JmpPin => PioVersion::V1,
            _ => PioVersion::V0,
        }
    }
}

impl MovDestination {
    /// Earliest hardware generation that decodes this destination
    pub const fn min_version(self) -> PioVersion {
        match self {
            MovDestination::Pindirs => PioVersion::V1,
            _ => PioVersion::V0,
        }
    }
}

impl IrqIndexMode {
    /// Earliest hardware generation that decodes this mode
    pub const fn min_version(self) -> PioVersion {
        match self {
            IrqIndexMode::Prev | IrqIndexMode::Next => PioVersion::V1,
            _ => PioVersion::V0,
        }
    }
}

impl SetDestination {
    /// The SET destination that drives pin levels or pin directions
    pub const fn for_pins(directions: bool) -> Self {
        if directions {
            SetDestination::Pindirs
        } else {
            SetDestination::Pins
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_encodings_rejected() {
        assert_eq!(InSource::from_u8(0b100), None);
        assert_eq!(InSource::from_u8(0b101), None);
        assert_eq!(MovSource::from_u8(0b100), None);
        assert_eq!(MovOperation::from_u8(0b11), None);
        assert_eq!(SetDestination::from_u8(0b011), None);
        assert_eq!(SetDestination::from_u8(0b111), None);
    }

    #[test]
    fn test_all_roundtrip() {
        for c in JmpCondition::ALL {
            assert_eq!(JmpCondition::from_u8(c.to_u8()), Some(*c));
        }
        for d in OutDestination::ALL {
            assert_eq!(OutDestination::from_u8(d.to_u8()), Some(*d));
        }
        assert_eq!(JmpCondition::ALL.len(), 8);
        assert_eq!(SetDestination::ALL.len(), 4);
    }

    #[test]
    fn test_names() {
        assert_eq!(JmpCondition::XDecNonZero.to_string(), "x--");
        assert_eq!(JmpCondition::OsrNotEmpty.to_string(), "!osre");
        assert_eq!(MovOperation::Invert.name(), "~");
        assert_eq!(SetDestination::Pindirs.name(), "pindirs");
    }

    #[test]
    fn test_min_versions() {
        assert_eq!(WaitSource::Pin.min_version(), PioVersion::V0);
        assert_eq!(WaitSource::JmpPin.min_version(), PioVersion::V1);
        assert_eq!(MovDestination::Pindirs.min_version(), PioVersion::V1);
        assert_eq!(IrqIndexMode::Relative.min_version(), PioVersion::V0);
        assert_eq!(IrqIndexMode::Next.min_version(), PioVersion::V1);
    }
}
