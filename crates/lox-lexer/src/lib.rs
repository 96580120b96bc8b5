//! lox-lexer : analyse lexicale pour Lox
//!
//! Faits saillants :
//! - `Scanner` : jetons à la demande (`scan_token`) ou via `Iterator`, `Eof` toujours émis
//! - lexèmes empruntés à la source (`&str`), numéros de ligne 1-based
//! - commentaires `//`, chaînes `"..."` multi-lignes sans échappements
//! - erreurs `Unexpected character.` / `Unterminated string.` avec la ligne
//!
//! Exemple éclair :
//! ```
//! use lox_lexer::{Scanner, TokenKind};
//!
//! let kinds: Vec<TokenKind> = Scanner::new("1 + 2")
//!     .map(|t| t.map(|t| t.kind))
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(kinds, [TokenKind::Number, TokenKind::Plus, TokenKind::Number, TokenKind::Eof]);
//! ```

#![deny(missing_docs)]

use thiserror::Error;

/* ─────────────────────────── Tokens ─────────────────────────── */

/// Genre de jeton lexical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `-`
    Minus,
    /// `+`
    Plus,
    /// `;`
    Semicolon,
    /// `/`
    Slash,
    /// `*`
    Star,
    /// `!`
    Bang,
    /// `!=`
    BangEqual,
    /// `=`
    Equal,
    /// `==`
    EqualEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// Identifiant.
    Identifier,
    /// Chaîne, guillemets compris dans le lexème.
    String,
    /// Nombre décimal.
    Number,
    /// `and`
    And,
    /// `class`
    Class,
    /// `else`
    Else,
    /// `false`
    False,
    /// `for`
    For,
    /// `fun`
    Fun,
    /// `if`
    If,
    /// `nil`
    Nil,
    /// `or`
    Or,
    /// `print`
    Print,
    /// `return`
    Return,
    /// `super`
    Super,
    /// `this`
    This,
    /// `true`
    True,
    /// `var`
    Var,
    /// `while`
    While,
    /// Fin de source.
    Eof,
}

/// Jeton : genre, texte source, ligne.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// Genre.
    pub kind: TokenKind,
    /// Texte exact dans la source (vide pour `Eof`).
    pub lexeme: &'a str,
    /// Ligne (1-based). Pour une chaîne multi-ligne, la ligne de fin.
    pub line: u32,
}

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Genre d'erreur lexicale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    /// Caractère hors grammaire.
    #[error("Unexpected character.")]
    UnexpectedChar(char),
    /// Guillemet fermant manquant.
    #[error("Unterminated string.")]
    UnterminatedString,
}

/// Erreur lexicale avec sa ligne.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct LexError {
    /// Ligne où l'erreur est détectée.
    pub line: u32,
    /// Genre d'erreur.
    pub kind: LexErrorKind,
}

/* ─────────────────────────── Scanner ─────────────────────────── */

/// Analyseur lexical (itératif, sans allocation).
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    /// Début du lexème courant.
    start: usize,
    /// Position courante en bytes.
    off: usize,
    line: u32,
    /// `Eof` déjà rendu par l'itérateur.
    done: bool,
}

impl<'a> Scanner<'a> {
    /// Scanner positionné au début de `src`, ligne 1.
    #[must_use]
    pub const fn new(src: &'a str) -> Self {
        Self { src, bytes: src.as_bytes(), start: 0, off: 0, line: 1, done: false }
    }

    /// Ligne courante.
    #[must_use]
    pub const fn line(&self) -> u32 { self.line }

    /// Prochain jeton. Une fois la source épuisée, renvoie `Eof` à chaque appel.
    ///
    /// # Errors
    /// [`LexError`] sur un caractère inconnu ou une chaîne non terminée ;
    /// le caractère fautif est consommé, l'appel suivant reprend après.
    pub fn scan_token(&mut self) -> Result<Token<'a>, LexError> {
        self.skip_ws_and_comments();
        self.start = self.off;

        let Some(c) = self.bump() else {
            return Ok(self.make(TokenKind::Eof));
        };

        let kind = match c {
            c if is_ident_start(c) => self.identifier(),
            c if c.is_ascii_digit() => self.number(),
            b'"' => self.string()?,

            b'(' => TokenKind::LeftParen,
            b')' => TokenKind::RightParen,
            b'{' => TokenKind::LeftBrace,
            b'}' => TokenKind::RightBrace,
            b';' => TokenKind::Semicolon,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b'-' => TokenKind::Minus,
            b'+' => TokenKind::Plus,
            b'/' => TokenKind::Slash,
            b'*' => TokenKind::Star,

            b'!' => if self.eat(b'=') { TokenKind::BangEqual } else { TokenKind::Bang },
            b'=' => if self.eat(b'=') { TokenKind::EqualEqual } else { TokenKind::Equal },
            b'<' => if self.eat(b'=') { TokenKind::LessEqual } else { TokenKind::Less },
            b'>' => if self.eat(b'=') { TokenKind::GreaterEqual } else { TokenKind::Greater },

            _ => return Err(self.unexpected()),
        };

        Ok(self.make(kind))
    }

    /* ────────── Primitives internes ────────── */

    #[inline] fn peek(&self) -> Option<u8> { self.bytes.get(self.off).copied() }
    #[inline] fn peek2(&self) -> Option<u8> { self.bytes.get(self.off + 1).copied() }
    #[inline] fn bump(&mut self) -> Option<u8> { let b = self.peek(); if b.is_some() { self.off += 1; } b }
    #[inline] fn eat(&mut self, b: u8) -> bool { if self.peek() == Some(b) { self.off += 1; true } else { false } }

    fn consume_while(&mut self, mut p: impl FnMut(u8) -> bool) {
        while let Some(b) = self.peek() {
            if p(b) { self.off += 1; } else { break; }
        }
    }

    fn make(&self, kind: TokenKind) -> Token<'a> {
        Token { kind, lexeme: &self.src[self.start..self.off], line: self.line }
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\r' | b'\t') => self.off += 1,
                Some(b'\n') => {
                    self.line += 1;
                    self.off += 1;
                }
                Some(b'/') if self.peek2() == Some(b'/') => self.consume_while(|b| b != b'\n'),
                _ => break,
            }
        }
    }

    fn identifier(&mut self) -> TokenKind {
        self.consume_while(|b| is_ident_start(b) || b.is_ascii_digit());
        keyword_of(&self.src[self.start..self.off]).unwrap_or(TokenKind::Identifier)
    }

    fn number(&mut self) -> TokenKind {
        self.consume_while(|b| b.is_ascii_digit());
        if self.peek() == Some(b'.') && self.peek2().is_some_and(|b| b.is_ascii_digit()) {
            self.off += 1;
            self.consume_while(|b| b.is_ascii_digit());
        }
        TokenKind::Number
    }

    fn string(&mut self) -> Result<TokenKind, LexError> {
        while let Some(b) = self.peek() {
            if b == b'"' {
                break;
            }
            if b == b'\n' {
                self.line += 1;
            }
            self.off += 1;
        }
        if !self.eat(b'"') {
            return Err(LexError { line: self.line, kind: LexErrorKind::UnterminatedString });
        }
        Ok(TokenKind::String)
    }

    /// Consomme le caractère complet (UTF-8) commencé en `start`.
    fn unexpected(&mut self) -> LexError {
        let ch = self.src[self.start..].chars().next().unwrap_or('\u{FFFD}');
        self.off = self.start + ch.len_utf8();
        LexError { line: self.line, kind: LexErrorKind::UnexpectedChar(ch) }
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>, LexError>;

    /// Jetons jusqu'à `Eof` inclus, puis `None`.
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.scan_token();
        if matches!(item, Ok(Token { kind: TokenKind::Eof, .. })) {
            self.done = true;
        }
        Some(item)
    }
}

/* ─────────────────────────── Helpers ─────────────────────────── */

#[inline]
const fn is_ident_start(b: u8) -> bool { b == b'_' || b.is_ascii_alphabetic() }

fn keyword_of(s: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match s {
        "and" => And,
        "class" => Class,
        "else" => Else,
        "false" => False,
        "for" => For,
        "fun" => Fun,
        "if" => If,
        "nil" => Nil,
        "or" => Or,
        "print" => Print,
        "return" => Return,
        "super" => Super,
        "this" => This,
        "true" => True,
        "var" => Var,
        "while" => While,
        _ => return None,
    })
}

/* ─────────────────────────── Tests ─────────────────────────── */
