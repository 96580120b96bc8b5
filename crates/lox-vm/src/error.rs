//! Runtime errors.
//!
//! A runtime error aborts the current pass, never the process. Its rendering
//! is the user-facing protocol: the message, then `[line N] in script`.

use lox_core::bytecode::ChunkError;
use thiserror::Error;

/// What went wrong while dispatching.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeErrorKind {
    /// `ADD` on anything but two numbers or two strings.
    #[error("Operands must be two numbers or two strings.")]
    AddOperands,
    /// Numeric binary operator on a non-number.
    #[error("Operands must be numbers.")]
    NumberOperands,
    /// `NEGATE` on a non-number.
    #[error("Operand must be a number.")]
    NumberOperand,
    /// Push beyond the configured capacity.
    #[error("Stack overflow.")]
    StackOverflow,
    /// Pop or peek past the bottom of the stack.
    #[error("Stack underflow.")]
    StackUnderflow,
    /// Byte that is not an opcode.
    #[error("Unknown opcode {0}.")]
    UnknownOpcode(u8),
    /// Operand cut off by the end of the code.
    #[error("Truncated instruction.")]
    MissingOperand,
    /// Constant operand outside the pool.
    #[error("Constant index {0} out of range.")]
    BadConstant(u8),
    /// Object handle not present in the registry.
    #[error("Dangling object reference.")]
    DanglingObject,
    /// Dispatch ran past the last byte without `RETURN`.
    #[error("Reached end of code without RETURN.")]
    EndOfCode,
    /// Chunk rejected by validation before execution.
    #[error("Invalid chunk: {0}.")]
    InvalidChunk(#[from] ChunkError),
}

/// Runtime error with the source line of the failing instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}\n[line {line}] in script")]
pub struct RuntimeError {
    /// Cause.
    pub kind: RuntimeErrorKind,
    /// Line of the opcode that failed.
    pub line: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn protocol_rendering() {
        let err = RuntimeError { kind: RuntimeErrorKind::NumberOperand, line: 3 };
        assert_eq!(err.to_string(), "Operand must be a number.\n[line 3] in script");
    }

    #[test]
    fn chunk_errors_convert() {
        let kind = RuntimeErrorKind::from(ChunkError::UnknownOpcode { offset: 2, byte: 99 });
        assert_eq!(kind.to_string(), "Invalid chunk: unknown opcode 99 at offset 2.");
    }
}
