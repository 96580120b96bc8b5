//! Instruction stream, per-byte line table and constant pool.
//!
//! A [`Chunk`] is filled by the translator (or the assembler), handed to the
//! VM for one pass, then released. All three buffers grow through
//! [`GrowableBuffer`], hence through the allocator primitive.

use thiserror::Error;

use crate::memory::GrowableBuffer;
use crate::value::Value;

/// Upper bound on constants per chunk (the operand is one byte).
pub const MAX_CONSTANTS: usize = u8::MAX as usize + 1;

/* ─────────────────────────── OpCode ─────────────────────────── */

/// Instruction set. Discriminants follow declaration order; they are not a
/// stable wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Push `constants[operand]`.
    Constant,
    /// Push `nil`.
    Nil,
    /// Push `true`.
    True,
    /// Push `false`.
    False,
    /// Pop b, a; push `a == b`.
    Equal,
    /// Pop b, a; push `a > b`.
    Greater,
    /// Pop b, a; push `a < b`.
    Less,
    /// Pop b, a; push `a + b` (numbers) or the concatenation (strings).
    Add,
    /// Pop b, a; push `a - b`.
    Subtract,
    /// Pop b, a; push `a * b`.
    Multiply,
    /// Pop b, a; push `a / b`.
    Divide,
    /// Pop a; push its falseyness.
    Not,
    /// Pop a; push `-a`.
    Negate,
    /// Pop the result and end the pass.
    Return,
}

/// Byte that does not decode to an [`OpCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown opcode {0}")]
pub struct UnknownOpcode(pub u8);

impl OpCode {
    /// Every opcode, in discriminant order.
    pub const ALL: [Self; 14] = [
        Self::Constant,
        Self::Nil,
        Self::True,
        Self::False,
        Self::Equal,
        Self::Greater,
        Self::Less,
        Self::Add,
        Self::Subtract,
        Self::Multiply,
        Self::Divide,
        Self::Not,
        Self::Negate,
        Self::Return,
    ];

    /// Listing name (`OP_CONSTANT`, ...).
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Constant => "OP_CONSTANT",
            Self::Nil => "OP_NIL",
            Self::True => "OP_TRUE",
            Self::False => "OP_FALSE",
            Self::Equal => "OP_EQUAL",
            Self::Greater => "OP_GREATER",
            Self::Less => "OP_LESS",
            Self::Add => "OP_ADD",
            Self::Subtract => "OP_SUBTRACT",
            Self::Multiply => "OP_MULTIPLY",
            Self::Divide => "OP_DIVIDE",
            Self::Not => "OP_NOT",
            Self::Negate => "OP_NEGATE",
            Self::Return => "OP_RETURN",
        }
    }

    /// Parse a mnemonic, with or without the `OP_` prefix, any case.
    #[must_use]
    pub fn from_mnemonic(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        let bare = upper.strip_prefix("OP_").unwrap_or(&upper);
        Self::ALL.into_iter().find(|op| &op.mnemonic()[3..] == bare)
    }

    /// Number of operand bytes following the opcode.
    #[must_use]
    pub const fn operand_width(self) -> usize {
        match self {
            Self::Constant => 1,
            _ => 0,
        }
    }

    /// Net change of the operand stack depth.
    #[must_use]
    pub const fn stack_effect(self) -> isize {
        match self {
            Self::Constant | Self::Nil | Self::True | Self::False => 1,
            Self::Not | Self::Negate => 0,
            Self::Equal
            | Self::Greater
            | Self::Less
            | Self::Add
            | Self::Subtract
            | Self::Multiply
            | Self::Divide
            | Self::Return => -1,
        }
    }
}

impl TryFrom<u8> for OpCode {
    type Error = UnknownOpcode;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::ALL.get(usize::from(byte)).copied().ok_or(UnknownOpcode(byte))
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> Self { op as Self }
}

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Structural chunk errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    /// The constant pool is full.
    #[error("Too many constants in one chunk.")]
    TooManyConstants,
    /// `code` and `lines` differ in length.
    #[error("line table out of sync: {code} code bytes, {lines} line entries")]
    LineTableMismatch {
        /// Code bytes.
        code: usize,
        /// Line entries.
        lines: usize,
    },
    /// Byte at `offset` is not an opcode.
    #[error("unknown opcode {byte} at offset {offset}")]
    UnknownOpcode {
        /// Offending offset.
        offset: usize,
        /// Offending byte.
        byte: u8,
    },
    /// Instruction at `offset` is cut short by the end of the code.
    #[error("{op} at offset {offset} is missing its operand")]
    MissingOperand {
        /// Instruction offset.
        offset: usize,
        /// Instruction mnemonic.
        op: &'static str,
    },
    /// Constant operand outside the pool.
    #[error("constant {index} at offset {offset} is out of range (pool has {count})")]
    ConstantOutOfRange {
        /// Instruction offset.
        offset: usize,
        /// Operand value.
        index: u8,
        /// Pool size.
        count: usize,
    },
}

impl ChunkError {
    /// Code offset the error points at, if any.
    #[must_use]
    pub const fn offset(&self) -> Option<usize> {
        match self {
            Self::UnknownOpcode { offset, .. }
            | Self::MissingOperand { offset, .. }
            | Self::ConstantOutOfRange { offset, .. } => Some(*offset),
            Self::TooManyConstants | Self::LineTableMismatch { .. } => None,
        }
    }
}

/* ─────────────────────────── Chunk ─────────────────────────── */

/// Bytecode chunk: code bytes, one source line per byte, constant pool.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    code: GrowableBuffer<u8>,
    lines: GrowableBuffer<u32>,
    constants: GrowableBuffer<Value>,
}

impl Chunk {
    /// Empty chunk, no storage.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            code: GrowableBuffer::new(),
            lines: GrowableBuffer::new(),
            constants: GrowableBuffer::new(),
        }
    }

    /// Append a byte produced by source line `line`.
    pub fn write(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    /// Append an opcode.
    pub fn write_op(&mut self, op: OpCode, line: u32) { self.write(op.into(), line); }

    /// Add `value` to the pool and return its index.
    ///
    /// # Errors
    /// [`ChunkError::TooManyConstants`] once the pool holds [`MAX_CONSTANTS`].
    pub fn add_constant(&mut self, value: Value) -> Result<u8, ChunkError> {
        let index = u8::try_from(self.constants.len()).map_err(|_| ChunkError::TooManyConstants)?;
        self.constants.push(value);
        Ok(index)
    }

    /// Free all three buffers and return to the empty state.
    pub fn release(&mut self) {
        self.code.release();
        self.lines.release();
        self.constants.release();
    }

    /// Instruction bytes.
    #[must_use]
    pub fn code(&self) -> &[u8] { self.code.as_slice() }

    /// Source line of each code byte.
    #[must_use]
    pub fn lines(&self) -> &[u32] { self.lines.as_slice() }

    /// Constant pool.
    #[must_use]
    pub fn constants(&self) -> &[Value] { self.constants.as_slice() }

    /// Constant at `index`, if present.
    #[must_use]
    pub fn constant(&self, index: u8) -> Option<Value> {
        self.constants.get(usize::from(index)).copied()
    }

    /// Source line of the byte at `offset`.
    #[must_use]
    pub fn line_at(&self, offset: usize) -> Option<u32> { self.lines.get(offset).copied() }

    /// Number of code bytes.
    #[must_use]
    pub fn len(&self) -> usize { self.code.len() }

    /// Whether no byte was written.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.code.is_empty() }
}

/* ─────────────────────────── Tests ─────────────────────────── */
