//! Small line-based assembler, handy to build chunks by hand in tests and
//! benchmarks.
//!
//! ```text
//! ; comment
//! CONSTANT 1.5
//! OP_CONSTANT "hello"     ; mnemonics with or without OP_, any case
//! @42 negate              ; @N sets the source line of the instruction
//! BYTE 200                ; raw byte, for malformed chunks
//! return
//! ```
//!
//! `CONSTANT` takes a number, a double-quoted string (escapes `\"`, `\\`,
//! `\n`, `\t`), `true`, `false` or `nil`. String constants are allocated in the
//! given [`Heap`].

use thiserror::Error;

use crate::bytecode::chunk::{Chunk, ChunkError, OpCode};
use crate::object::Heap;
use crate::value::Value;

/// Assembly failure, tagged with the 1-based text line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmError {
    /// Not a known mnemonic.
    #[error("line {line}: unknown instruction `{name}`")]
    UnknownInstruction {
        /// Text line.
        line: usize,
        /// Offending word.
        name: String,
    },
    /// Instruction needs an operand.
    #[error("line {line}: {op} expects an operand")]
    MissingOperand {
        /// Text line.
        line: usize,
        /// Instruction mnemonic.
        op: &'static str,
    },
    /// Instruction takes no operand.
    #[error("line {line}: {op} takes no operand")]
    UnexpectedOperand {
        /// Text line.
        line: usize,
        /// Instruction mnemonic.
        op: &'static str,
    },
    /// Operand could not be parsed.
    #[error("line {line}: invalid operand `{operand}`")]
    BadOperand {
        /// Text line.
        line: usize,
        /// Operand text.
        operand: String,
    },
    /// `@N` prefix is not a line number.
    #[error("line {line}: invalid line marker `@{text}`")]
    BadLineMarker {
        /// Text line.
        line: usize,
        /// Marker text.
        text: String,
    },
    /// The chunk refused the instruction.
    #[error("line {line}: {source}")]
    Chunk {
        /// Text line.
        line: usize,
        /// Underlying error.
        source: ChunkError,
    },
}

/// Assemble `source` into a fresh [`Chunk`].
///
/// # Errors
/// The first [`AsmError`] encountered; the partial chunk is dropped.
pub fn assemble(source: &str, heap: &mut Heap) -> Result<Chunk, AsmError> {
    let mut chunk = Chunk::new();

    for (idx, raw) in source.lines().enumerate() {
        let text_line = idx + 1;
        let mut line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        let mut src_line = u32::try_from(text_line).unwrap_or(u32::MAX);
        if let Some(rest) = line.strip_prefix('@') {
            let (marker, tail) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            src_line = marker.parse().map_err(|_| AsmError::BadLineMarker {
                line: text_line,
                text: marker.to_owned(),
            })?;
            line = tail.trim();
            if line.is_empty() {
                continue;
            }
        }

        let (name, operand) = match line.split_once(char::is_whitespace) {
            Some((name, operand)) => (name, operand.trim()),
            None => (line, ""),
        };

        if name.eq_ignore_ascii_case("BYTE") {
            let byte = operand.parse::<u8>().map_err(|_| AsmError::BadOperand {
                line: text_line,
                operand: operand.to_owned(),
            })?;
            chunk.write(byte, src_line);
            continue;
        }

        let op = OpCode::from_mnemonic(name).ok_or_else(|| AsmError::UnknownInstruction {
            line: text_line,
            name: name.to_owned(),
        })?;

        match (op.operand_width(), operand.is_empty()) {
            (0, true) => chunk.write_op(op, src_line),
            (0, false) => {
                return Err(AsmError::UnexpectedOperand { line: text_line, op: op.mnemonic() })
            }
            (_, true) => {
                return Err(AsmError::MissingOperand { line: text_line, op: op.mnemonic() })
            }
            (_, false) => {
                let value = parse_constant(operand, heap).ok_or_else(|| AsmError::BadOperand {
                    line: text_line,
                    operand: operand.to_owned(),
                })?;
                let index = chunk
                    .add_constant(value)
                    .map_err(|source| AsmError::Chunk { line: text_line, source })?;
                chunk.write_op(op, src_line);
                chunk.write(index, src_line);
            }
        }
    }

    Ok(chunk)
}

fn parse_constant(text: &str, heap: &mut Heap) -> Option<Value> {
    match text {
        "nil" => Some(Value::Nil),
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        _ if text.starts_with('"') => {
            let bytes = parse_string_literal(text)?;
            Some(Value::Obj(heap.take_string(bytes)))
        }
        _ => text.parse::<f64>().ok().map(Value::Number),
    }
}

fn parse_string_literal(input: &str) -> Option<Vec<u8>> {
    let inner = input.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = Vec::with_capacity(inner.len());
    let mut escaping = false;
    for &b in inner.as_bytes() {
        if escaping {
            out.push(match b {
                b'n' => b'\n',
                b't' => b'\t',
                other => other,
            });
            escaping = false;
        } else if b == b'\\' {
            escaping = true;
        } else if b == b'"' {
            return None;
        } else {
            out.push(b);
        }
    }
    if escaping { None } else { Some(out) }
}

/// Cut a trailing `;` comment, ignoring semicolons inside string literals.
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaping = false;
    for (i, b) in line.bytes().enumerate() {
        match b {
            _ if escaping => escaping = false,
            b'\\' if in_string => escaping = true,
            b'"' => in_string = !in_string,
            b';' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::StringObject;
    use pretty_assertions::assert_eq;

    #[test]
    fn assembles_a_small_program() {
        let mut heap = Heap::new();
        let chunk = assemble(
            "; 1 + 2\nCONSTANT 1\nop_constant 2\n\n@7 ADD ; sum\nRETURN\n",
            &mut heap,
        )
        .expect("valid source");
        assert_eq!(chunk.code(), &[0, 0, 0, 1, 7, 13]);
        assert_eq!(chunk.lines(), &[2, 2, 3, 3, 7, 6]);
        assert_eq!(chunk.constants(), &[Value::Number(1.0), Value::Number(2.0)]);
    }

    #[test]
    fn string_literals() {
        let mut heap = Heap::new();
        let chunk = assemble(r#"CONSTANT "a;b\n\"c\"""#, &mut heap).expect("valid source");
        let r = chunk.constant(0).and_then(Value::as_obj).expect("string constant");
        assert_eq!(heap.as_string(r).map(StringObject::as_bytes), Some(&b"a;b\n\"c\""[..]));
    }

    #[test]
    fn literal_keywords_and_raw_bytes() {
        let mut heap = Heap::new();
        let chunk = assemble("CONSTANT nil\nCONSTANT true\nBYTE 250", &mut heap).expect("valid");
        assert_eq!(chunk.constants(), &[Value::Nil, Value::Bool(true)]);
        assert_eq!(chunk.code(), &[0, 0, 0, 1, 250]);
    }

    #[test]
    fn errors_carry_the_text_line() {
        let mut heap = Heap::new();
        assert_eq!(
            assemble("NIL\nPRINT", &mut heap).unwrap_err(),
            AsmError::UnknownInstruction { line: 2, name: "PRINT".into() }
        );
        assert_eq!(
            assemble("CONSTANT", &mut heap).unwrap_err(),
            AsmError::MissingOperand { line: 1, op: "OP_CONSTANT" }
        );
        assert_eq!(
            assemble("RETURN 3", &mut heap).unwrap_err(),
            AsmError::UnexpectedOperand { line: 1, op: "OP_RETURN" }
        );
        assert_eq!(
            assemble("CONSTANT \"open", &mut heap).unwrap_err(),
            AsmError::BadOperand { line: 1, operand: "\"open".into() }
        );
        assert_eq!(
            assemble("@x NIL", &mut heap).unwrap_err(),
            AsmError::BadLineMarker { line: 1, text: "x".into() }
        );
    }

    #[test]
    fn pool_overflow_is_reported() {
        let mut heap = Heap::new();
        let source = "CONSTANT 0\n".repeat(257);
        assert_eq!(
            assemble(&source, &mut heap).unwrap_err(),
            AsmError::Chunk { line: 257, source: ChunkError::TooManyConstants }
        );
    }
}
