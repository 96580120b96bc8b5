//! Structural validation of chunks.

use crate::bytecode::chunk::{Chunk, ChunkError, OpCode};

/// Check that `chunk` can be executed without hitting a structural fault.
///
/// - the line table has one entry per code byte;
/// - every instruction byte decodes to an [`OpCode`];
/// - every operand is present;
/// - every constant operand indexes the pool.
///
/// Type errors are not checked; they are the interpreter's business.
///
/// # Errors
/// The first [`ChunkError`] found, scanning from offset 0.
pub fn validate_chunk(chunk: &Chunk) -> Result<(), ChunkError> {
    let code = chunk.code();
    if code.len() != chunk.lines().len() {
        return Err(ChunkError::LineTableMismatch { code: code.len(), lines: chunk.lines().len() });
    }

    let mut offset = 0;
    while offset < code.len() {
        let byte = code[offset];
        let op = OpCode::try_from(byte).map_err(|_| ChunkError::UnknownOpcode { offset, byte })?;
        if offset + op.operand_width() >= code.len() {
            return Err(ChunkError::MissingOperand { offset, op: op.mnemonic() });
        }
        if op == OpCode::Constant {
            let index = code[offset + 1];
            if chunk.constant(index).is_none() {
                return Err(ChunkError::ConstantOutOfRange {
                    offset,
                    index,
                    count: chunk.constants().len(),
                });
            }
        }
        offset += 1 + op.operand_width();
    }

    Ok(())
}
