//! Lox Compiler - source → bytecode en une passe
//!
//! - Entrée : texte source (une expression)
//! - Sortie : instructions écrites dans un `lox_core::bytecode::Chunk`
//! - Littéraux chaîne alloués dans le `Heap` du VM
//! - Diagnostics : première erreur seulement (mode panique)
//!
//! API principale :
//! ```
//! use lox_compiler::{Compiler, CompilerOptions};
//! use lox_core::prelude::*;
//!
//! let mut chunk = Chunk::new();
//! let mut heap = Heap::new();
//! Compiler::new(CompilerOptions::default()).compile("1 + 2", &mut chunk, &mut heap).unwrap();
//! assert_eq!(chunk.code().last(), Some(&u8::from(OpCode::Return)));
//! ```
//!
//! `compile` a la signature `lox_core::diagnostic::CompileFn` et se branche
//! directement sur le VM.

#![deny(missing_docs)]

use lox_core::bytecode::{disassemble_chunk, Chunk, OpCode};
use lox_core::diagnostic::{CompileError, Diagnostic};
use lox_core::object::Heap;
use lox_core::value::Value;
use lox_lexer::{Scanner, Token, TokenKind};

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

/// Options du compilateur
#[derive(Debug, Clone, Copy, Default)]
pub struct CompilerOptions {
    /// Journaliser le listing du chunk (niveau `debug`) après une compilation réussie
    pub print_code: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
/* Précédences + table des règles */
// ─────────────────────────────────────────────────────────────────────────────

/// Niveaux de précédence, du plus faible au plus fort
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    /// Aucune
    None,
    /// `=`
    Assignment,
    /// `or`
    Or,
    /// `and`
    And,
    /// `== !=`
    Equality,
    /// `< > <= >=`
    Comparison,
    /// `+ -`
    Term,
    /// `* /`
    Factor,
    /// `! -`
    Unary,
    /// `. ()`
    Call,
    /// Littéraux
    Primary,
}

impl Precedence {
    /// Niveau immédiatement supérieur (opérandes droits des binaires)
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::None => Self::Assignment,
            Self::Assignment => Self::Or,
            Self::Or => Self::And,
            Self::And => Self::Equality,
            Self::Equality => Self::Comparison,
            Self::Comparison => Self::Term,
            Self::Term => Self::Factor,
            Self::Factor => Self::Unary,
            Self::Unary => Self::Call,
            Self::Call | Self::Primary => Self::Primary,
        }
    }
}

/// Règle de parsing (préfixe ou infixe) associée à un jeton
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseFn {
    Grouping,
    Unary,
    Binary,
    Number,
    String,
    Literal,
}

#[derive(Clone, Copy)]
struct ParseRule {
    prefix: Option<ParseFn>,
    infix: Option<ParseFn>,
    precedence: Precedence,
}

const fn rule(prefix: Option<ParseFn>, infix: Option<ParseFn>, precedence: Precedence) -> ParseRule {
    ParseRule { prefix, infix, precedence }
}

const fn rule_for(kind: TokenKind) -> ParseRule {
    use ParseFn as F;
    use Precedence as P;
    match kind {
        TokenKind::LeftParen => rule(Some(F::Grouping), None, P::None),
        TokenKind::Minus => rule(Some(F::Unary), Some(F::Binary), P::Term),
        TokenKind::Plus => rule(None, Some(F::Binary), P::Term),
        TokenKind::Slash | TokenKind::Star => rule(None, Some(F::Binary), P::Factor),
        TokenKind::Bang => rule(Some(F::Unary), None, P::None),
        TokenKind::BangEqual | TokenKind::EqualEqual => rule(None, Some(F::Binary), P::Equality),
        TokenKind::Greater
        | TokenKind::GreaterEqual
        | TokenKind::Less
        | TokenKind::LessEqual => rule(None, Some(F::Binary), P::Comparison),
        TokenKind::Number => rule(Some(F::Number), None, P::None),
        TokenKind::String => rule(Some(F::String), None, P::None),
        TokenKind::False | TokenKind::True | TokenKind::Nil => rule(Some(F::Literal), None, P::None),
        _ => rule(None, None, P::None),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
/* Parser */
// ─────────────────────────────────────────────────────────────────────────────

/// Profondeur maximale d'imbrication de `parse_precedence`
pub const MAX_NESTING: usize = 1024;

struct Parser<'src, 'c> {
    scanner: Scanner<'src>,
    current: Token<'src>,
    previous: Token<'src>,
    chunk: &'c mut Chunk,
    heap: &'c mut Heap,
    diagnostics: Vec<Diagnostic>,
    panic_mode: bool,
    depth: usize,
}

impl<'src, 'c> Parser<'src, 'c> {
    fn new(source: &'src str, chunk: &'c mut Chunk, heap: &'c mut Heap) -> Self {
        let start = Token { kind: TokenKind::Eof, lexeme: "", line: 1 };
        Self {
            scanner: Scanner::new(source),
            current: start,
            previous: start,
            chunk,
            heap,
            diagnostics: Vec::new(),
            panic_mode: false,
            depth: 0,
        }
    }

    /* ────────── Jetons ────────── */

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            match self.scanner.scan_token() {
                Ok(token) => {
                    self.current = token;
                    break;
                }
                Err(err) => self.report(Diagnostic::bare(err.line, err.to_string())),
            }
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
        } else {
            self.error_at(self.current, message);
        }
    }

    /* ────────── Erreurs ────────── */

    fn error_at(&mut self, token: Token<'_>, message: &str) {
        let diagnostic = match token.kind {
            TokenKind::Eof => Diagnostic::at_end(token.line, message),
            _ => Diagnostic::at(token.line, token.lexeme, message),
        };
        self.report(diagnostic);
    }

    fn error(&mut self, message: &str) { self.error_at(self.previous, message); }

    fn report(&mut self, diagnostic: Diagnostic) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.diagnostics.push(diagnostic);
    }

    /* ────────── Émission ────────── */

    fn emit_byte(&mut self, byte: u8) { self.chunk.write(byte, self.previous.line); }

    fn emit_op(&mut self, op: OpCode) { self.emit_byte(op.into()); }

    fn emit_constant(&mut self, value: Value) {
        let index = match self.chunk.add_constant(value) {
            Ok(index) => index,
            Err(err) => {
                self.error(&err.to_string());
                0
            }
        };
        self.emit_op(OpCode::Constant);
        self.emit_byte(index);
    }

    /* ────────── Grammaire ────────── */

    fn expression(&mut self) { self.parse_precedence(Precedence::Assignment); }

    fn parse_precedence(&mut self, precedence: Precedence) {
        if self.depth >= MAX_NESTING {
            self.error_at(self.current, "Expression nests too deeply.");
            return;
        }
        self.depth += 1;
        self.parse_operand(precedence);
        self.depth -= 1;
    }

    fn parse_operand(&mut self, precedence: Precedence) {
        self.advance();
        let Some(prefix) = rule_for(self.previous.kind).prefix else {
            self.error("Expect expression.");
            return;
        };
        self.apply(prefix);

        while precedence <= rule_for(self.current.kind).precedence {
            self.advance();
            if let Some(infix) = rule_for(self.previous.kind).infix {
                self.apply(infix);
            }
        }
    }

    fn apply(&mut self, f: ParseFn) {
        match f {
            ParseFn::Grouping => self.grouping(),
            ParseFn::Unary => self.unary(),
            ParseFn::Binary => self.binary(),
            ParseFn::Number => self.number(),
            ParseFn::String => self.string(),
            ParseFn::Literal => self.literal(),
        }
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn number(&mut self) {
        match self.previous.lexeme.parse::<f64>() {
            Ok(n) => self.emit_constant(Value::Number(n)),
            Err(_) => self.error("Invalid number literal."),
        }
    }

    fn string(&mut self) {
        let lexeme = self.previous.lexeme;
        let body = lexeme.get(1..lexeme.len().saturating_sub(1)).unwrap_or_default();
        let r = self.heap.copy_string(body.as_bytes());
        self.emit_constant(Value::Obj(r));
    }

    fn literal(&mut self) {
        match self.previous.kind {
            TokenKind::False => self.emit_op(OpCode::False),
            TokenKind::True => self.emit_op(OpCode::True),
            TokenKind::Nil => self.emit_op(OpCode::Nil),
            _ => {}
        }
    }

    fn unary(&mut self) {
        let operator = self.previous;
        self.parse_precedence(Precedence::Unary);
        let op = match operator.kind {
            TokenKind::Minus => OpCode::Negate,
            TokenKind::Bang => OpCode::Not,
            _ => return,
        };
        self.chunk.write_op(op, operator.line);
    }

    fn binary(&mut self) {
        let operator = self.previous;
        self.parse_precedence(rule_for(operator.kind).precedence.next());
        let (op, negate) = match operator.kind {
            TokenKind::Plus => (OpCode::Add, false),
            TokenKind::Minus => (OpCode::Subtract, false),
            TokenKind::Star => (OpCode::Multiply, false),
            TokenKind::Slash => (OpCode::Divide, false),
            TokenKind::EqualEqual => (OpCode::Equal, false),
            TokenKind::BangEqual => (OpCode::Equal, true),
            TokenKind::Greater => (OpCode::Greater, false),
            TokenKind::GreaterEqual => (OpCode::Less, true),
            TokenKind::Less => (OpCode::Less, false),
            TokenKind::LessEqual => (OpCode::Greater, true),
            _ => return,
        };
        self.chunk.write_op(op, operator.line);
        if negate {
            self.chunk.write_op(OpCode::Not, operator.line);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
/* Compiler façade */
// ─────────────────────────────────────────────────────────────────────────────

/// Le compilateur Lox : parse + émission en une passe
#[derive(Debug, Clone, Copy, Default)]
pub struct Compiler {
    /// Options
    pub options: CompilerOptions,
}

impl Compiler {
    /// Crée un compilateur
    #[must_use]
    pub const fn new(options: CompilerOptions) -> Self { Self { options } }

    /// Compile `source` dans `chunk`
    ///
    /// # Errors
    /// [`CompileError`] avec le premier diagnostic rencontré ; le contenu du
    /// chunk est alors à jeter.
    pub fn compile(&self, source: &str, chunk: &mut Chunk, heap: &mut Heap) -> Result<(), CompileError> {
        let mut parser = Parser::new(source, chunk, heap);
        parser.advance();
        parser.expression();
        parser.consume(TokenKind::Eof, "Expect end of expression.");
        parser.emit_op(OpCode::Return);

        if !parser.diagnostics.is_empty() {
            return Err(CompileError { diagnostics: parser.diagnostics });
        }

        if self.options.print_code {
            tracing::debug!("\n{}", disassemble_chunk(chunk, heap, "code"));
        }
        Ok(())
    }
}

/// Compile avec les options par défaut (hook `CompileFn` du VM)
///
/// # Errors
/// Voir [`Compiler::compile`].
pub fn compile(source: &str, chunk: &mut Chunk, heap: &mut Heap) -> Result<(), CompileError> {
    Compiler::default().compile(source, chunk, heap)
}

/// Comme [`compile`], en journalisant le listing du chunk produit
///
/// # Errors
/// Voir [`Compiler::compile`].
pub fn compile_and_print(source: &str, chunk: &mut Chunk, heap: &mut Heap) -> Result<(), CompileError> {
    Compiler::new(CompilerOptions { print_code: true }).compile(source, chunk, heap)
}
