// Copyright 2025 The Fieldexpr Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::str::CharIndices;

use lazy_static::lazy_static;
use unicode_xid::UnicodeXID;

use self::Token::*;
use crate::common::ErrorCode::*;
use crate::common::{EquationError, ErrorCode, Loc};

#[cfg(test)]
mod test;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Token<'input> {
    Question,
    Colon,
    Comma,
    LParen,
    RParen,
    Dot,
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    Amp,
    Caret,
    Lt,
    Lte,
    Gt,
    Gte,
    EqEq,
    Neq,
    And,
    Or,
    Not,
    True,
    False,
    Ident(&'input str),
    Num(&'input str),
}

fn error<T>(code: ErrorCode, start: usize, end: usize) -> Result<T, EquationError> {
    Err(EquationError {
        start: start as u16,
        end: end as u16,
        code,
        details: None,
    })
}

pub type Spanned<T> = (usize, T, usize);

pub fn span_loc<T>(spanned: &Spanned<T>) -> Loc {
    Loc::new(spanned.0, spanned.2)
}

// the expression language is case-sensitive: `true` is a keyword, `True` is
// an identifier for the driver to resolve
const KEYWORDS: &[(&str, Token<'static>)] = &[("true", True), ("false", False)];

/// A char-at-a-time lexer over a single expression string.
///
/// Unlike most lexers it is seekable: after a plugin function consumes a span
/// of raw text that the main grammar cannot tokenize, the parser calls
/// `seek()` to restart lexing at the first unconsumed byte.
pub struct Lexer<'input> {
    text: &'input str,
    chars: CharIndices<'input>,
    base: usize,
    lookahead: Option<(usize, char)>,
}

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str) -> Self {
        let mut t = Lexer {
            text: input,
            chars: input.char_indices(),
            base: 0,
            lookahead: None,
        };
        t.bump();
        t
    }

    /// Restart lexing at the given byte offset, discarding any lookahead.
    pub fn seek(&mut self, pos: usize) {
        let pos = pos.min(self.text.len());
        self.base = pos;
        self.chars = self.text[pos..].char_indices();
        self.bump();
    }

    pub fn text(&self) -> &'input str {
        self.text
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        self.bump_n(1)
    }

    fn bump_n(&mut self, n: usize) -> Option<(usize, char)> {
        assert!(n > 0);
        self.lookahead = self.chars.nth(n - 1).map(|(i, c)| (i + self.base, c));
        self.lookahead
    }

    fn word(&mut self, idx0: usize) -> Spanned<&'input str> {
        match self.take_while(is_identifier_continue) {
            Some(end) => (idx0, &self.text[idx0..end], end),
            None => (idx0, &self.text[idx0..], self.text.len()),
        }
    }

    fn take_while<F>(&mut self, mut keep_going: F) -> Option<usize>
    where
        F: FnMut(char) -> bool,
    {
        self.take_until(|c| !keep_going(c))
    }

    fn take_until<F>(&mut self, mut terminate: F) -> Option<usize>
    where
        F: FnMut(char) -> bool,
    {
        loop {
            match self.lookahead {
                None => {
                    return None;
                }
                Some((idx1, c)) => {
                    if terminate(c) {
                        return Some(idx1);
                    } else {
                        self.bump();
                    }
                }
            }
        }
    }

    fn identifierish(&mut self, idx0: usize) -> Spanned<Token<'input>> {
        let (start, word, end) = self.word(idx0);

        let tok = KEYWORDS
            .iter()
            .filter(|&&(w, _)| w == word)
            .map(|(_, t)| *t)
            .next()
            .unwrap_or(Ident(word));

        (start, tok, end)
    }

    fn number(&mut self, idx0: usize) -> Spanned<Token<'input>> {
        use regex::{Match, Regex};

        lazy_static! {
            static ref NUMBER_RE: Regex =
                Regex::new(r"^(\d+(\.\d*)?|\.\d+)([eE][-+]?\d+)?").unwrap();
        }

        let m: Match = NUMBER_RE.find(&self.text[idx0..]).unwrap();

        self.bump_n(m.end());

        let end = idx0 + m.end();
        (idx0, Num(&self.text[idx0..end]), end)
    }

    /// Is the next character (after the current lookahead) a digit?
    fn peek_digit(&self) -> bool {
        match self.lookahead {
            Some((i, _)) => self.text[i..]
                .chars()
                .nth(1)
                .map(|c| c.is_ascii_digit())
                .unwrap_or(false),
            None => false,
        }
    }

    #[allow(clippy::unnecessary_wraps)]
    fn consume(
        &mut self,
        i: usize,
        tok: Token<'input>,
        len: usize,
    ) -> Option<Result<Spanned<Token<'input>>, EquationError>> {
        self.bump();
        Some(Ok((i, tok, i + len)))
    }
}

impl<'input> Iterator for Lexer<'input> {
    type Item = Result<Spanned<Token<'input>>, EquationError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            return match self.lookahead {
                Some((i, '?')) => self.consume(i, Question, 1),
                Some((i, ':')) => self.consume(i, Colon, 1),
                Some((i, ',')) => self.consume(i, Comma, 1),
                Some((i, '(')) => self.consume(i, LParen, 1),
                Some((i, ')')) => self.consume(i, RParen, 1),
                Some((i, '+')) => self.consume(i, Plus, 1),
                Some((i, '-')) => self.consume(i, Minus, 1),
                Some((i, '*')) => self.consume(i, Mul, 1),
                Some((i, '/')) => self.consume(i, Div, 1),
                Some((i, '%')) => self.consume(i, Mod, 1),
                Some((i, '^')) => self.consume(i, Caret, 1),
                Some((i, '&')) => {
                    match self.bump() {
                        Some((_, '&')) => self.consume(i, And, 2),
                        // we've already bumped, don't consume
                        _ => Some(Ok((i, Amp, i + 1))),
                    }
                }
                Some((i, '|')) => {
                    match self.bump() {
                        Some((_, '|')) => self.consume(i, Or, 2),
                        // we've already bumped, don't consume
                        _ => Some(error(InvalidToken, i, i + 2)),
                    }
                }
                Some((i, '=')) => {
                    match self.bump() {
                        Some((_, '=')) => self.consume(i, EqEq, 2),
                        // `=` on its own isn't part of the language
                        _ => Some(error(InvalidToken, i, i + 1)),
                    }
                }
                Some((i, '!')) => {
                    match self.bump() {
                        Some((_, '=')) => self.consume(i, Neq, 2),
                        // we've already bumped, don't consume
                        _ => Some(Ok((i, Not, i + 1))),
                    }
                }
                Some((i, '<')) => {
                    match self.bump() {
                        Some((_, '=')) => self.consume(i, Lte, 2),
                        // we've already bumped, don't consume
                        _ => Some(Ok((i, Lt, i + 1))),
                    }
                }
                Some((i, '>')) => {
                    match self.bump() {
                        Some((_, '=')) => self.consume(i, Gte, 2),
                        // we've already bumped, don't consume
                        _ => Some(Ok((i, Gt, i + 1))),
                    }
                }
                Some((i, '.')) => {
                    // `.5` is a number; `v.x` is component selection
                    if self.peek_digit() {
                        Some(Ok(self.number(i)))
                    } else {
                        self.consume(i, Dot, 1)
                    }
                }
                Some((i, c)) if c.is_ascii_digit() => Some(Ok(self.number(i))),
                Some((i, c)) if is_identifier_start(c) => Some(Ok(self.identifierish(i))),
                Some((_, c)) if c.is_whitespace() => {
                    self.bump();
                    continue;
                }
                Some((i, _)) => {
                    self.bump(); // eat whatever is killing us
                    let end = match self.lookahead {
                        Some((end, _)) => end,
                        None => self.text.len(),
                    };
                    Some(error(UnrecognizedToken, i, end))
                }
                None => None,
            };
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    UnicodeXID::is_xid_start(c) || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    UnicodeXID::is_xid_continue(c) || c == '_'
}
