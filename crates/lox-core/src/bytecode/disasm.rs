//! Textual disassembly of a [`Chunk`].
//!
//! ```text
//! == expr ==
//! 0000    1 OP_CONSTANT         0 '1'
//! 0002    | OP_CONSTANT         1 '2'
//! 0004    | OP_ADD
//! 0005    2 OP_RETURN
//! ```

use core::fmt::Write;

use crate::bytecode::chunk::{Chunk, OpCode};
use crate::object::Heap;

/// Disassemble the whole chunk under a `== name ==` header.
#[must_use]
pub fn disassemble_chunk(chunk: &Chunk, heap: &Heap, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {name} ==");
    let mut offset = 0;
    while offset < chunk.len() {
        let (text, next) = disassemble_instruction(chunk, heap, offset);
        let _ = writeln!(out, "{text}");
        offset = next;
    }
    out
}

/// Render the instruction at `offset` (no trailing newline) and return the
/// offset of the next one.
#[must_use]
pub fn disassemble_instruction(chunk: &Chunk, heap: &Heap, offset: usize) -> (String, usize) {
    let mut out = String::new();
    let _ = write!(out, "{offset:04} ");
    match chunk.line_at(offset) {
        Some(line) if offset > 0 && chunk.line_at(offset - 1) == Some(line) => out.push_str("   | "),
        Some(line) => {
            let _ = write!(out, "{line:4} ");
        }
        None => out.push_str("   ? "),
    }

    let Some(&byte) = chunk.code().get(offset) else {
        out.push_str("<end of code>");
        return (out, offset + 1);
    };

    match OpCode::try_from(byte) {
        Ok(op @ OpCode::Constant) => constant_instruction(&mut out, op, chunk, heap, offset),
        Ok(op) => {
            out.push_str(op.mnemonic());
            (out, offset + 1)
        }
        Err(_) => {
            let _ = write!(out, "Unknown opcode {byte}");
            (out, offset + 1)
        }
    }
}

fn constant_instruction(
    out: &mut String,
    op: OpCode,
    chunk: &Chunk,
    heap: &Heap,
    offset: usize,
) -> (String, usize) {
    let Some(&index) = chunk.code().get(offset + 1) else {
        let _ = write!(out, "{:<16} <missing operand>", op.mnemonic());
        return (core::mem::take(out), chunk.len());
    };
    let _ = write!(out, "{:<16} {index:4} ", op.mnemonic());
    match chunk.constant(index) {
        Some(value) => {
            let _ = write!(out, "'{}'", heap.display(value));
        }
        None => out.push_str("<out of range>"),
    }
    (core::mem::take(out), offset + 2)
}
