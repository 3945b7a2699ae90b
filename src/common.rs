// Copyright 2025 The Fieldexpr Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;
use std::{error, result};

/// Loc describes a location in an expression by the starting point and ending
/// point. Expressions are strings typed by humans -- u16 is long enough.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default, Hash)]
pub struct Loc {
    pub start: u16,
    pub end: u16,
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

impl Loc {
    pub fn new(start: usize, end: usize) -> Self {
        Loc {
            start: start as u16,
            end: end as u16,
        }
    }

    /// union takes a second Loc and returns the inclusive range from the
    /// start of the earlier token to the end of the later token.
    pub fn union(&self, rhs: &Self) -> Self {
        Loc {
            start: self.start.min(rhs.start),
            end: self.end.max(rhs.end),
        }
    }
}

#[test]
fn test_loc_basics() {
    let a = Loc { start: 3, end: 7 };
    assert_eq!(a, Loc::new(3, 7));

    let b = Loc { start: 4, end: 11 };
    assert_eq!(Loc::new(3, 11), a.union(&b));

    let c = Loc { start: 1, end: 5 };
    assert_eq!(Loc::new(1, 7), a.union(&c));
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoError, // will never be produced
    InvalidToken,
    UnrecognizedEof,
    UnrecognizedToken,
    ExtraToken,
    ExpectedNumber,
    ExpectedInteger,
    EmptyEquation,
    UnknownIdentifier,
    UnknownFunction,
    UnknownComponent,
    UnknownTable,
    UnknownPlugin,
    BadArity,
    SizeMismatch,
    SortMismatch,
    ResultSortMismatch,
    BadPluginResult,
    Generic,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ErrorCode::*;
        let name = match self {
            NoError => "no_error",
            InvalidToken => "invalid_token",
            UnrecognizedEof => "unrecognized_eof",
            UnrecognizedToken => "unrecognized_token",
            ExtraToken => "extra_token",
            ExpectedNumber => "expected_number",
            ExpectedInteger => "expected_integer",
            EmptyEquation => "empty_equation",
            UnknownIdentifier => "unknown_identifier",
            UnknownFunction => "unknown_function",
            UnknownComponent => "unknown_component",
            UnknownTable => "unknown_table",
            UnknownPlugin => "unknown_plugin",
            BadArity => "bad_arity",
            SizeMismatch => "size_mismatch",
            SortMismatch => "sort_mismatch",
            ResultSortMismatch => "result_sort_mismatch",
            BadPluginResult => "bad_plugin_result",
            Generic => "generic",
        };

        write!(f, "{name}")
    }
}

/// EquationError is a spanned error in a single expression string.
///
/// `details` carries the human-readable specifics where the code alone is not
/// enough, e.g. the two operand lengths of a size_mismatch.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EquationError {
    pub start: u16,
    pub end: u16,
    pub code: ErrorCode,
    pub details: Option<String>,
}

impl EquationError {
    pub fn new(code: ErrorCode, loc: Loc) -> Self {
        EquationError {
            start: loc.start,
            end: loc.end,
            code,
            details: None,
        }
    }

    pub fn with_details<S: Into<String>>(code: ErrorCode, loc: Loc, details: S) -> Self {
        EquationError {
            start: loc.start,
            end: loc.end,
            code,
            details: Some(details.into()),
        }
    }

    pub fn loc(&self) -> Loc {
        Loc {
            start: self.start,
            end: self.end,
        }
    }
}

impl fmt::Display for EquationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.details {
            Some(ref details) => write!(f, "{}:{}:{}: {}", self.start, self.end, self.code, details),
            None => write!(f, "{}:{}:{}", self.start, self.end, self.code),
        }
    }
}

impl error::Error for EquationError {}

pub type EquationResult<T> = result::Result<T, EquationError>;

#[macro_export]
macro_rules! eqn_err(
    ($code:tt, $start:expr, $end:expr) => {{
        use $crate::common::{EquationError, ErrorCode};
        Err(EquationError{ start: $start as u16, end: $end as u16, code: ErrorCode::$code, details: None })
    }};
    ($code:tt, $start:expr, $end:expr, $($arg:tt)+) => {{
        use $crate::common::{EquationError, ErrorCode};
        Err(EquationError{ start: $start as u16, end: $end as u16, code: ErrorCode::$code, details: Some(format!($($arg)+)) })
    }};
);

#[test]
fn test_equation_error_display() {
    let err = EquationError {
        start: 2,
        end: 5,
        code: ErrorCode::UnrecognizedToken,
        details: None,
    };
    assert_eq!("2:5:unrecognized_token", format!("{err}"));

    let err = EquationError::with_details(
        ErrorCode::SizeMismatch,
        Loc::new(0, 9),
        "operands have different sizes: 10 and 9",
    );
    assert_eq!(
        "0:9:size_mismatch: operands have different sizes: 10 and 9",
        format!("{err}")
    );
}
