//! Command-stream encoding.
//!
//! Each micro-op extern call becomes one 32-bit word: the opcode in the low
//! 16 bits and, for memory operations, an 8-bit buffer index in bits 16..24.

use std::fmt;

use accel_offload::ExternCall;

/// Argument position of the buffer index in a micro-op call.
pub const OPERAND_ARG: usize = 4;

const OPCODE_MASK: u32 = 0xFFFF;
const INDEX_SHIFT: u32 = 16;
const INDEX_MASK: u32 = 0xFF;

/// Errors raised while encoding or decoding a command stream.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// A memory micro-op lacks its buffer index.
    #[error("'{routine}' has no integer operand at argument {index}")]
    MissingOperand { routine: String, index: usize },

    /// A word carries an opcode outside [`Opcode::ALL`].
    #[error("unknown opcode {0:#06x} in command word")]
    UnknownOpcode(u32),

    /// A byte stream whose length is not a multiple of four.
    #[error("command stream of {0} bytes is not a whole number of words")]
    Truncated(usize),
}

/// A command-stream operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Load an input tile.
    LoadInput,
    /// Load a weight tile.
    LoadWeight,
    /// Store the accumulator.
    StoreResult,
    /// Multiply-accumulate the loaded tiles.
    Gemm,
}

impl Opcode {
    /// Every opcode.
    pub const ALL: [Self; 4] = [Self::LoadInput, Self::LoadWeight, Self::StoreResult, Self::Gemm];

    /// The value stored in the low 16 bits of a word.
    pub fn code(self) -> u32 {
        match self {
            Self::LoadInput => 0x0001,
            Self::LoadWeight => 0x0002,
            Self::StoreResult => 0x0003,
            Self::Gemm => 0x0100,
        }
    }

    /// Inverse of [`Opcode::code`].
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.code() == code)
    }

    /// The micro-op routine that encodes to this opcode.
    pub fn routine(self) -> &'static str {
        match self {
            Self::LoadInput => "uop_load_inp",
            Self::LoadWeight => "uop_load_wgt",
            Self::StoreResult => "uop_store",
            Self::Gemm => "uop_gemm",
        }
    }

    /// Inverse of [`Opcode::routine`].
    pub fn from_routine(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.routine() == name)
    }

    /// Whether the word carries a buffer index.
    pub fn has_operand(self) -> bool {
        !matches!(self, Self::Gemm)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LoadInput => "LOAD_A",
            Self::LoadWeight => "LOAD_B",
            Self::StoreResult => "STORE_RES",
            Self::Gemm => "GEMM",
        })
    }
}

/// One encoded command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CommandWord(pub u32);

impl CommandWord {
    /// Packs `opcode` with the low 8 bits of `index`.
    pub fn new(opcode: Opcode, index: i64) -> Self {
        let index = if opcode.has_operand() {
            (index as u32) & INDEX_MASK
        } else {
            0
        };
        Self(opcode.code() | (index << INDEX_SHIFT))
    }

    /// The opcode, or `None` for an unknown code.
    pub fn opcode(self) -> Option<Opcode> {
        Opcode::from_code(self.0 & OPCODE_MASK)
    }

    /// The buffer index; zero for operations without one.
    pub fn operand(self) -> u8 {
        ((self.0 >> INDEX_SHIFT) & INDEX_MASK) as u8
    }
}

impl fmt::Display for CommandWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode() {
            Some(op) if op.has_operand() => write!(f, "{op} {}", self.operand()),
            Some(op) => write!(f, "{op}"),
            None => write!(f, "?{:#010x}", self.0),
        }
    }
}

/// Encodes micro-op calls in order. Calls to other routines are skipped.
pub fn encode(calls: &[ExternCall]) -> Result<Vec<CommandWord>, EncodeError> {
    let mut words = Vec::with_capacity(calls.len());
    for call in calls {
        let Some(opcode) = Opcode::from_routine(&call.name) else {
            log::debug!("command stream: skipping '{}'", call.name);
            continue;
        };
        let index = if opcode.has_operand() {
            call.int_arg(OPERAND_ARG)
                .ok_or_else(|| EncodeError::MissingOperand {
                    routine: call.name.clone(),
                    index: OPERAND_ARG,
                })?
        } else {
            0
        };
        words.push(CommandWord::new(opcode, index));
    }
    Ok(words)
}

/// Checks that every word carries a known opcode.
pub fn decode(words: &[CommandWord]) -> Result<Vec<(Opcode, u8)>, EncodeError> {
    words
        .iter()
        .map(|w| {
            w.opcode()
                .map(|op| (op, w.operand()))
                .ok_or(EncodeError::UnknownOpcode(w.0 & OPCODE_MASK))
        })
        .collect()
}

/// Serializes words as little-endian bytes.
pub fn to_le_bytes(words: &[CommandWord]) -> Vec<u8> {
    words.iter().flat_map(|w| w.0.to_le_bytes()).collect()
}

/// Reads little-endian words back.
pub fn from_le_bytes(bytes: &[u8]) -> Result<Vec<CommandWord>, EncodeError> {
    if bytes.len() % 4 != 0 {
        return Err(EncodeError::Truncated(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| CommandWord(u32::from_le_bytes([c[0], c[1], c[2], c[3]])))
        .collect())
}
