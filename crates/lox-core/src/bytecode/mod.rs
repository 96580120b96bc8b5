//! Bytecode: chunk and opcodes, textual (dis)assembly, structural checks.

/// Chunk storage and the instruction set.
pub mod chunk;
/// Listing of a chunk, one line per instruction.
pub mod disasm;
/// Line-based assembler.
pub mod asm;
/// Chunk validation.
pub mod helpers;

pub use asm::{assemble, AsmError};
pub use chunk::{Chunk, ChunkError, OpCode, UnknownOpcode, MAX_CONSTANTS};
pub use disasm::{disassemble_chunk, disassemble_instruction};
pub use helpers::validate_chunk;
