//! Virtual machine core: lifecycle, dispatch loop, runtime error protocol.

use core::fmt;
use std::io::{self, Write};

use lox_core::bytecode::{disassemble_instruction, validate_chunk, Chunk, OpCode};
use lox_core::diagnostic::{CompileError, CompileFn};
use lox_core::object::{Heap, ReleaseStats};
use lox_core::value::Value;

use crate::config::VmConfig;
use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::stack::Stack;

/// Outcome of [`Vm::interpret`] / [`Vm::run_chunk`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InterpretResult {
    /// The pass completed; carries the value popped by `RETURN`.
    Ok(Value),
    /// The translator rejected the source.
    CompileError,
    /// Dispatch failed; the error was reported and the stack reset.
    RuntimeError,
}

impl InterpretResult {
    /// Process exit status for this outcome: 0, 65 or 70.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Ok(_) => 0,
            Self::CompileError => 65,
            Self::RuntimeError => 70,
        }
    }

    /// Whether the pass completed.
    #[must_use]
    pub const fn is_ok(self) -> bool { matches!(self, Self::Ok(_)) }
}

/// Result of a single [`Vm::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Instruction executed; dispatch continues at this offset.
    Continue(usize),
    /// `RETURN` executed with this value.
    Return(Value),
}

/// Lox virtual machine.
///
/// Owns the operand stack and the heap registry; both persist across
/// [`interpret`](Self::interpret) calls. Chunks are borrowed for one pass.
pub struct Vm {
    config: VmConfig,
    stack: Stack,
    heap: Heap,
    compiler: CompileFn,
    errors: Box<dyn Write>,
    last_error: Option<RuntimeError>,
}

impl fmt::Debug for Vm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vm")
            .field("config", &self.config)
            .field("stack", &self.stack)
            .field("heap", &self.heap)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

impl Default for Vm {
    fn default() -> Self { Self::new(VmConfig::default()) }
}

impl Vm {
    /// VM using the bundled expression compiler, reporting errors on stderr.
    #[must_use]
    pub fn new(config: VmConfig) -> Self { Self::with_compiler(config, lox_compiler::compile) }

    /// VM using `compiler` as its translator hook.
    #[must_use]
    pub fn with_compiler(config: VmConfig, compiler: CompileFn) -> Self {
        Self {
            stack: Stack::new(config.stack_max),
            heap: Heap::new(),
            compiler,
            errors: Box::new(io::stderr()),
            last_error: None,
            config,
        }
    }

    /// Redirect compile and runtime error reports to `sink`.
    #[must_use]
    pub fn with_error_sink(mut self, sink: impl Write + 'static) -> Self {
        self.errors = Box::new(sink);
        self
    }

    /// Translate `source` and run it.
    ///
    /// Compile errors are written to the error sink; the chunk is released in
    /// every case.
    pub fn interpret(&mut self, source: &str) -> InterpretResult {
        let mut chunk = match self.compile(source) {
            Ok(chunk) => chunk,
            Err(err) => {
                tracing::debug!(diagnostics = err.diagnostics.len(), "compile failed");
                let _ = writeln!(self.errors, "{err}");
                return InterpretResult::CompileError;
            }
        };
        let result = self.run_chunk(&chunk);
        chunk.release();
        result
    }

    /// Translate `source` into a fresh chunk without running it.
    ///
    /// # Errors
    /// The translator's [`CompileError`]; the partial chunk is released.
    pub fn compile(&mut self, source: &str) -> Result<Chunk, CompileError> {
        let mut chunk = Chunk::new();
        match (self.compiler)(source, &mut chunk, &mut self.heap) {
            Ok(()) => Ok(chunk),
            Err(err) => {
                chunk.release();
                Err(err)
            }
        }
    }

    /// Execute a finished chunk.
    ///
    /// On a runtime error the message and `[line N] in script` go to the
    /// error sink, the stack is emptied and the heap is kept.
    pub fn run_chunk(&mut self, chunk: &Chunk) -> InterpretResult {
        tracing::debug!(bytes = chunk.len(), constants = chunk.constants().len(), "pass start");

        if self.config.verify_chunks {
            if let Err(err) = validate_chunk(chunk) {
                let line = err.offset().and_then(|o| chunk.line_at(o)).unwrap_or(0);
                return self.runtime_error(RuntimeError { kind: err.into(), line });
            }
        }

        let outcome = match self.execute(chunk) {
            Ok(value) => InterpretResult::Ok(value),
            Err(err) => self.runtime_error(err),
        };
        tracing::debug!(?outcome, depth = self.stack.len(), "pass end");
        outcome
    }

    /// Execute the instruction at `ip`.
    ///
    /// Single-step primitive for tooling: errors are returned as is, without
    /// the reporting and stack reset done by [`run_chunk`](Self::run_chunk).
    ///
    /// # Errors
    /// [`RuntimeError`] located at the line of the instruction at `ip`.
    pub fn step(&mut self, chunk: &Chunk, ip: usize) -> Result<Step, RuntimeError> {
        let mut next = ip;
        match self.dispatch(chunk, &mut next) {
            Ok(Some(value)) => Ok(Step::Return(value)),
            Ok(None) => Ok(Step::Continue(next)),
            Err(kind) => Err(RuntimeError { kind, line: line_of(chunk, ip) }),
        }
    }

    /// Release every heap object and report what was freed.
    pub fn teardown(mut self) -> ReleaseStats {
        self.stack.reset();
        let stats = self.heap.release_all();
        tracing::debug!(objects = stats.objects, bytes = stats.bytes, "vm teardown");
        stats
    }

    /// Heap registry.
    #[must_use]
    pub const fn heap(&self) -> &Heap { &self.heap }

    /// Heap registry, mutable (hand-built chunks allocate their strings here).
    pub fn heap_mut(&mut self) -> &mut Heap { &mut self.heap }

    /// Current operand stack depth.
    #[must_use]
    pub fn stack_depth(&self) -> usize { self.stack.len() }

    /// Most recent runtime error, if any.
    #[must_use]
    pub const fn last_error(&self) -> Option<&RuntimeError> { self.last_error.as_ref() }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &VmConfig { &self.config }

    /* ────────── Boucle ────────── */

    fn execute(&mut self, chunk: &Chunk) -> Result<Value, RuntimeError> {
        let mut ip = 0;
        loop {
            if self.config.trace_execution {
                let (text, _) = disassemble_instruction(chunk, &self.heap, ip);
                tracing::trace!("{}\n{text}", self.stack.render(&self.heap));
            }
            match self.step(chunk, ip)? {
                Step::Continue(next) => ip = next,
                Step::Return(value) => return Ok(value),
            }
        }
    }

    fn runtime_error(&mut self, err: RuntimeError) -> InterpretResult {
        let top = self.stack.peek(0).map_or("empty", Value::type_name);
        tracing::warn!(line = err.line, top, "{}", err.kind);
        let _ = writeln!(self.errors, "{err}");
        self.stack.reset();
        self.last_error = Some(err);
        InterpretResult::RuntimeError
    }

    /// Decode and execute one instruction, advancing `ip` past it.
    fn dispatch(&mut self, chunk: &Chunk, ip: &mut usize) -> Result<Option<Value>, RuntimeErrorKind> {
        let code = chunk.code();
        let byte = *code.get(*ip).ok_or(RuntimeErrorKind::EndOfCode)?;
        *ip += 1;
        let op = OpCode::try_from(byte).map_err(|e| RuntimeErrorKind::UnknownOpcode(e.0))?;

        match op {
            OpCode::Constant => {
                let index = *code.get(*ip).ok_or(RuntimeErrorKind::MissingOperand)?;
                *ip += 1;
                let value = chunk.constant(index).ok_or(RuntimeErrorKind::BadConstant(index))?;
                self.stack.push(value)?;
            }
            OpCode::Nil => self.stack.push(Value::Nil)?,
            OpCode::True => self.stack.push(Value::Bool(true))?,
            OpCode::False => self.stack.push(Value::Bool(false))?,
            OpCode::Equal => {
                let b = self.stack.peek(0)?;
                let a = self.stack.peek(1)?;
                self.replace_top_two(Value::Bool(self.heap.values_equal(a, b)))?;
            }
            OpCode::Greater => self.binary_number(|a, b| Value::Bool(a > b))?,
            OpCode::Less => self.binary_number(|a, b| Value::Bool(a < b))?,
            OpCode::Add => self.add()?,
            OpCode::Subtract => self.binary_number(|a, b| Value::Number(a - b))?,
            OpCode::Multiply => self.binary_number(|a, b| Value::Number(a * b))?,
            OpCode::Divide => self.binary_number(|a, b| Value::Number(a / b))?,
            OpCode::Not => {
                let value = self.stack.pop()?;
                self.stack.push(Value::Bool(value.is_falsey()))?;
            }
            OpCode::Negate => {
                let Value::Number(n) = self.stack.peek(0)? else {
                    return Err(RuntimeErrorKind::NumberOperand);
                };
                self.stack.pop()?;
                self.stack.push(Value::Number(-n))?;
            }
            OpCode::Return => return self.stack.pop().map(Some),
        }
        Ok(None)
    }

    /// Both operands are inspected before anything is popped.
    fn binary_number(&mut self, f: impl FnOnce(f64, f64) -> Value) -> Result<(), RuntimeErrorKind> {
        let (Value::Number(a), Value::Number(b)) = (self.stack.peek(1)?, self.stack.peek(0)?) else {
            return Err(RuntimeErrorKind::NumberOperands);
        };
        self.replace_top_two(f(a, b))
    }

    fn add(&mut self) -> Result<(), RuntimeErrorKind> {
        let result = match (self.stack.peek(1)?, self.stack.peek(0)?) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            (Value::Obj(a), Value::Obj(b)) => {
                if self.heap.get(a).is_none() || self.heap.get(b).is_none() {
                    return Err(RuntimeErrorKind::DanglingObject);
                }
                let joined = self.heap.concatenate(a, b).ok_or(RuntimeErrorKind::AddOperands)?;
                Value::Obj(joined)
            }
            _ => return Err(RuntimeErrorKind::AddOperands),
        };
        self.replace_top_two(result)
    }

    fn replace_top_two(&mut self, value: Value) -> Result<(), RuntimeErrorKind> {
        self.stack.pop()?;
        self.stack.pop()?;
        self.stack.push(value)
    }
}

/// Line of the byte at `offset`; past the end, the last recorded line.
fn line_of(chunk: &Chunk, offset: usize) -> u32 {
    chunk.line_at(offset).or_else(|| chunk.lines().last().copied()).unwrap_or(0)
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use lox_core::bytecode::assemble;
    use pretty_assertions::assert_eq;

    fn run(vm: &mut Vm, asm: &str) -> InterpretResult {
        let chunk = assemble(asm, vm.heap_mut()).expect("valid assembly");
        vm.run_chunk(&chunk)
    }

    fn quiet(config: VmConfig) -> Vm { Vm::new(config).with_error_sink(io::sink()) }

    #[test]
    fn arithmetic() {
        let mut vm = quiet(VmConfig::default());
        assert_eq!(
            run(&mut vm, "CONSTANT 10\nCONSTANT 4\nSUBTRACT\nCONSTANT 2\nDIVIDE\nRETURN"),
            InterpretResult::Ok(Value::Number(3.0))
        );
        assert_eq!(
            run(&mut vm, "CONSTANT 1\nCONSTANT 0\nDIVIDE\nRETURN"),
            InterpretResult::Ok(Value::Number(f64::INFINITY))
        );
    }

    #[test]
    fn comparisons_and_not() {
        let mut vm = quiet(VmConfig::default());
        assert_eq!(run(&mut vm, "CONSTANT 1\nCONSTANT 2\nLESS\nRETURN"), InterpretResult::Ok(Value::Bool(true)));
        assert_eq!(run(&mut vm, "CONSTANT 1\nCONSTANT 2\nGREATER\nRETURN"), InterpretResult::Ok(Value::Bool(false)));
        assert_eq!(run(&mut vm, "NIL\nNOT\nRETURN"), InterpretResult::Ok(Value::Bool(true)));
        assert_eq!(run(&mut vm, "CONSTANT 0\nNOT\nRETURN"), InterpretResult::Ok(Value::Bool(false)));
        assert_eq!(run(&mut vm, "NIL\nFALSE\nEQUAL\nRETURN"), InterpretResult::Ok(Value::Bool(false)));
    }

    #[test]
    fn type_errors_name_the_operator_line() {
        let mut vm = quiet(VmConfig::default());
        assert_eq!(run(&mut vm, "TRUE\n@9 NEGATE\nRETURN"), InterpretResult::RuntimeError);
        assert_eq!(
            vm.last_error(),
            Some(&RuntimeError { kind: RuntimeErrorKind::NumberOperand, line: 9 })
        );
        assert_eq!(vm.stack_depth(), 0);

        assert_eq!(run(&mut vm, "CONSTANT 1\nNIL\n@4 MULTIPLY\nRETURN"), InterpretResult::RuntimeError);
        assert_eq!(vm.last_error().map(|e| &e.kind), Some(&RuntimeErrorKind::NumberOperands));
        assert_eq!(run(&mut vm, "CONSTANT 1\nCONSTANT \"a\"\nADD\nRETURN"), InterpretResult::RuntimeError);
        assert_eq!(vm.last_error().map(|e| &e.kind), Some(&RuntimeErrorKind::AddOperands));
    }

    #[test]
    fn malformed_chunks_fail_cleanly() {
        let mut vm = quiet(VmConfig::default());
        assert_eq!(run(&mut vm, "NIL"), InterpretResult::RuntimeError);
        assert_eq!(vm.last_error().map(|e| &e.kind), Some(&RuntimeErrorKind::EndOfCode));
        assert_eq!(vm.last_error().map(|e| e.line), Some(1));

        assert_eq!(run(&mut vm, "BYTE 77"), InterpretResult::RuntimeError);
        assert_eq!(vm.last_error().map(|e| &e.kind), Some(&RuntimeErrorKind::UnknownOpcode(77)));

        assert_eq!(run(&mut vm, "BYTE 0"), InterpretResult::RuntimeError);
        assert_eq!(vm.last_error().map(|e| &e.kind), Some(&RuntimeErrorKind::MissingOperand));

        assert_eq!(run(&mut vm, "BYTE 0\nBYTE 3\nRETURN"), InterpretResult::RuntimeError);
        assert_eq!(vm.last_error().map(|e| &e.kind), Some(&RuntimeErrorKind::BadConstant(3)));

        assert_eq!(run(&mut vm, "RETURN"), InterpretResult::RuntimeError);
        assert_eq!(vm.last_error().map(|e| &e.kind), Some(&RuntimeErrorKind::StackUnderflow));
    }

    #[test]
    fn verify_chunks_rejects_before_running() {
        let mut vm = quiet(VmConfig::default().with_verify_chunks(true));
        assert_eq!(run(&mut vm, "NIL\n@5 BYTE 99\nRETURN"), InterpretResult::RuntimeError);
        let err = vm.last_error().expect("reported");
        assert_eq!(err.line, 5);
        assert!(matches!(err.kind, RuntimeErrorKind::InvalidChunk(_)));
        assert_eq!(vm.stack_depth(), 0);
    }

    #[test]
    fn stack_capacity_is_enforced() {
        let mut vm = quiet(VmConfig::default().with_stack_max(2));
        assert_eq!(run(&mut vm, "NIL\nNIL\n@3 NIL\nRETURN"), InterpretResult::RuntimeError);
        assert_eq!(
            vm.last_error(),
            Some(&RuntimeError { kind: RuntimeErrorKind::StackOverflow, line: 3 })
        );
    }

    #[test]
    fn exit_codes() {
        assert_eq!(InterpretResult::Ok(Value::Nil).exit_code(), 0);
        assert_eq!(InterpretResult::CompileError.exit_code(), 65);
        assert_eq!(InterpretResult::RuntimeError.exit_code(), 70);
    }

    #[test]
    fn custom_compiler_hook() {
        fn always_nil(_: &str, chunk: &mut Chunk, _: &mut Heap) -> Result<(), CompileError> {
            chunk.write_op(OpCode::Nil, 1);
            chunk.write_op(OpCode::Return, 1);
            Ok(())
        }
        let mut vm = Vm::with_compiler(VmConfig::default(), always_nil).with_error_sink(io::sink());
        assert_eq!(vm.interpret("whatever"), InterpretResult::Ok(Value::Nil));
    }
}
