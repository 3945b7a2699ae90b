// Copyright 2025 The Fieldexpr Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use super::ErrorCode::*;
use super::Token::*;
use super::{EquationError, ErrorCode, Lexer, Token};

fn test(input: &str, expected: Vec<(&str, Token)>) {
    let tokenizer = Lexer::new(input);
    let len = expected.len();
    for (token, (expected_span, expected_tok)) in tokenizer.zip(expected.into_iter()) {
        let expected_start = expected_span.find('~').unwrap();
        let expected_end = expected_span.rfind('~').unwrap() + 1;
        assert_eq!(Ok((expected_start, expected_tok, expected_end)), token);
    }

    let tokenizer = Lexer::new(input);
    assert_eq!(None, tokenizer.skip(len).next());
}

fn test_err(input: &str, expected: (&str, ErrorCode)) {
    let tokenizer = Lexer::new(input);
    let token = tokenizer
        .into_iter()
        .find(|t| t.is_err())
        .expect("expected a lex error");
    let (expected_span, expected_code) = expected;
    let expected_start = expected_span.find('~').unwrap();
    let expected_end = expected_span.rfind('~').unwrap() + 1;
    let expected_err = EquationError {
        start: expected_start as u16,
        end: expected_end as u16,
        code: expected_code,
        details: None,
    };
    assert_eq!(Err(expected_err), token);
}

#[test]
fn arithmetic() {
    test(
        "2 + 3 * 4",
        vec![
            ("~        ", Num("2")),
            ("  ~      ", Plus),
            ("    ~    ", Num("3")),
            ("      ~  ", Mul),
            ("        ~", Num("4")),
        ],
    );
}

#[test]
fn numbers() {
    test(
        "1.5 .25 2e3 1.5e-4",
        vec![
            ("~~~               ", Num("1.5")),
            ("    ~~~           ", Num(".25")),
            ("        ~~~       ", Num("2e3")),
            ("            ~~~~~~", Num("1.5e-4")),
        ],
    );
}

#[test]
fn component_selection_vs_decimal() {
    test(
        "U.x",
        vec![
            ("~  ", Ident("U")),
            (" ~ ", Dot),
            ("  ~", Ident("x")),
        ],
    );
    test(
        "T.xx",
        vec![
            ("~   ", Ident("T")),
            (" ~  ", Dot),
            ("  ~~", Ident("xx")),
        ],
    );
    test("0.5", vec![("~~~", Num("0.5"))]);
}

#[test]
fn inner_product_and_logical_and() {
    test(
        "a & b && c",
        vec![
            ("~         ", Ident("a")),
            ("  ~       ", Amp),
            ("    ~     ", Ident("b")),
            ("      ~~  ", And),
            ("         ~", Ident("c")),
        ],
    );
}

#[test]
fn comparisons() {
    test(
        "a < b <= c > d >= e == f != g",
        vec![
            ("~                            ", Ident("a")),
            ("  ~                          ", Lt),
            ("    ~                        ", Ident("b")),
            ("      ~~                     ", Lte),
            ("         ~                   ", Ident("c")),
            ("           ~                 ", Gt),
            ("             ~               ", Ident("d")),
            ("               ~~            ", Gte),
            ("                  ~          ", Ident("e")),
            ("                    ~~       ", EqEq),
            ("                       ~     ", Ident("f")),
            ("                         ~~  ", Neq),
            ("                            ~", Ident("g")),
        ],
    );
}

#[test]
fn conditional() {
    test(
        "p ? a : b",
        vec![
            ("~        ", Ident("p")),
            ("  ~      ", Question),
            ("    ~    ", Ident("a")),
            ("      ~  ", Colon),
            ("        ~", Ident("b")),
        ],
    );
}

#[test]
fn keywords_are_case_sensitive() {
    test(
        "true True",
        vec![("~~~~     ", True), ("     ~~~~", Ident("True"))],
    );
    test("false", vec![("~~~~~", False)]);
}

#[test]
fn cross_and_mod() {
    test(
        "a ^ b % c",
        vec![
            ("~        ", Ident("a")),
            ("  ~      ", Caret),
            ("    ~    ", Ident("b")),
            ("      ~  ", Mod),
            ("        ~", Ident("c")),
        ],
    );
}

#[test]
fn not_and_neq() {
    test(
        "!a != b",
        vec![
            ("~      ", Not),
            (" ~     ", Ident("a")),
            ("   ~~  ", Neq),
            ("      ~", Ident("b")),
        ],
    );
}

#[test]
fn function_call() {
    test(
        "mag(U)",
        vec![
            ("~~~   ", Ident("mag")),
            ("   ~  ", LParen),
            ("    ~ ", Ident("U")),
            ("     ~", RParen),
        ],
    );
}

#[test]
fn bad_tokens() {
    test_err("a | b", ("  ~~ ", InvalidToken));
    test_err("a = b", ("  ~  ", InvalidToken));
    test_err("a # b", ("  ~  ", UnrecognizedToken));
}

#[test]
fn seek_restarts_lexing() {
    let input = "myPlugin(1,2,3) + 1";
    let mut lexer = Lexer::new(input);
    // consume the plugin name
    assert_eq!(Some(Ok((0, Ident("myPlugin"), 8))), lexer.next());
    // a plugin consumed "(1,2,3)" -- 7 bytes starting at offset 8
    lexer.seek(8 + 7);
    assert_eq!(Some(Ok((16, Plus, 17))), lexer.next());
    assert_eq!(Some(Ok((18, Num("1"), 19))), lexer.next());
    assert_eq!(None, lexer.next());
}

#[test]
fn seek_past_end_is_eof() {
    let mut lexer = Lexer::new("ab");
    lexer.seek(10);
    assert_eq!(None, lexer.next());
}
