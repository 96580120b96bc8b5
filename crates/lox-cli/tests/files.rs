use std::cell::RefCell;
use std::fs;
use std::io::{self, Write};
use std::rc::Rc;

use lox_cli::{disassemble_file, exit, run_file, RunOptions};
use lox_vm::Vm;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    fn text(&self) -> String { String::from_utf8(self.0.borrow().clone()).unwrap() }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

fn vm_with_sink(opts: RunOptions) -> (Vm, SharedBuf) {
    let sink = SharedBuf::default();
    (opts.vm().with_error_sink(sink.clone()), sink)
}

/// Runs `source` from a temp file; returns (exit code, stdout, vm errors).
fn run(source: &str, opts: RunOptions) -> (u8, String, String) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("script.lox");
    fs::write(&path, source).unwrap();

    let (vm, sink) = vm_with_sink(opts);
    let mut out = Vec::new();
    let mut err = Vec::new();
    let code = run_file(&path, vm, &mut out, &mut err).unwrap();
    assert!(err.is_empty());
    (code, String::from_utf8(out).unwrap(), sink.text())
}

#[test]
fn successful_script_prints_its_value() {
    let (code, out, errors) = run("(1 + 2) * 3 - 4 / 2\n", RunOptions::default());
    assert_eq!(code, exit::OK);
    assert_eq!(out, "7\n");
    assert_eq!(errors, "");

    let (code, out, _) = run("\"con\" + \"cat\"", RunOptions::default());
    assert_eq!(code, exit::OK);
    assert_eq!(out, "concat\n");
}

#[test]
fn compile_error_exits_65() {
    let (code, out, errors) = run("1 +\n* 2", RunOptions::default());
    assert_eq!(code, exit::DATAERR);
    assert_eq!(out, "");
    assert_eq!(errors, "[line 2] Error at '*': Expect expression.\n");
}

#[test]
fn runtime_error_exits_70() {
    let (code, out, errors) = run("1\n<\nnil", RunOptions::default());
    assert_eq!(code, exit::SOFTWARE);
    assert_eq!(out, "");
    assert_eq!(errors, "Operands must be numbers.\n[line 2] in script\n");
}

#[test]
fn small_stack_overflows() {
    let opts = RunOptions { stack_max: 2, ..RunOptions::default() };
    let (code, _, errors) = run("1 + (2 + 3)", opts);
    assert_eq!(code, exit::SOFTWARE);
    assert_eq!(errors, "Stack overflow.\n[line 1] in script\n");
}

#[test]
fn disassembly_lists_without_running() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("neg.lox");
    fs::write(&path, "-true").unwrap();

    let (vm, _) = vm_with_sink(RunOptions::default());
    let mut out = Vec::new();
    let mut err = Vec::new();
    let code = disassemble_file(&path, vm, &mut out, &mut err).unwrap();
    assert_eq!(code, exit::OK);

    let listing = String::from_utf8(out).unwrap();
    let expected = format!(
        "== {} ==\n0000    1 OP_TRUE\n0001    | OP_NEGATE\n0002    | OP_RETURN\n",
        path.display()
    );
    assert_eq!(listing, expected);
}

#[test]
fn disassembly_reports_compile_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.lox");
    fs::write(&path, "(1").unwrap();

    let (vm, _) = vm_with_sink(RunOptions::default());
    let mut out = Vec::new();
    let mut err = Vec::new();
    let code = disassemble_file(&path, vm, &mut out, &mut err).unwrap();
    assert_eq!(code, exit::DATAERR);
    assert!(out.is_empty());
    assert_eq!(String::from_utf8(err).unwrap(), "[line 1] Error at end: Expect ')' after expression.\n");
}
