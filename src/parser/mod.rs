// Copyright 2025 The Fieldexpr Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Recursive-descent parser and evaluator for field expressions.
//!
//! Parsing and evaluation are a single pass: each grammar rule returns the
//! fully evaluated field for its subexpression. This is not an optimization
//! dodge -- plugin functions consume raw text the grammar cannot tokenize,
//! so by the time we know how to continue lexing we must already have
//! evaluated everything to the plugin's left.

use crate::builtins::{ReduceOp, UnaryMathFn, is_0_arity_builtin_fn, is_builtin_fn};
use crate::common::{EquationResult, Loc};
use crate::driver::Driver;
use crate::eqn_err;
use crate::eval::{
    self, Args, BinaryOp, CompareOp, LogicalOp, apply_math_fn, binary_op, compare, compose_spherical_tensor,
    compose_symm_tensor, compose_tensor, compose_vector, conditional, elementwise_extremum,
    logical_not, logical_op, reduce, tensor_fn, unary_neg,
};
use crate::field::{same_size, uniform, zip_map};
use crate::tensor::Tensor;
use crate::token::{Lexer, Spanned, Token};
use crate::value::{Sort, Value};


/// What an expression is required to produce: which mesh it is evaluated
/// over, and (optionally) the sort the caller demands of the result.
///
/// The generated grammar this replaces had one start symbol per
/// sort/mesh combination; here the same information is a plain parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseMode {
    pub sort: Option<Sort>,
    pub on_points: bool,
}

impl ParseMode {
    pub fn cell(sort: Sort) -> Self {
        ParseMode {
            sort: Some(sort),
            on_points: false,
        }
    }

    pub fn point(sort: Sort) -> Self {
        ParseMode {
            sort: Some(sort),
            on_points: true,
        }
    }

    pub fn any_cell() -> Self {
        ParseMode::default()
    }

    pub fn any_point() -> Self {
        ParseMode {
            sort: None,
            on_points: true,
        }
    }
}

/// Where a parse is allowed to stop. `Eof` is the normal whole-string
/// entry point; `Comma` and `CloseParen` exist for plugin functions that
/// parse their own argument lists with nested parsers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Terminator {
    Eof,
    Comma,
    CloseParen,
}

/// Evaluate a complete expression string against a driver.
pub fn evaluate(text: &str, mode: ParseMode, driver: &dyn Driver) -> EquationResult<Value> {
    let (value, _) = parse_partial(text, mode, Terminator::Eof, driver)?;
    Ok(value)
}

/// Evaluate a leading subexpression of `text`, stopping at `terminator`.
///
/// Returns the value and the number of bytes consumed, including the
/// terminating `,` or `)`. This is the building block for plugin functions
/// whose arguments are themselves expressions.
pub fn parse_partial(
    text: &str,
    mode: ParseMode,
    terminator: Terminator,
    driver: &dyn Driver,
) -> EquationResult<(Value, usize)> {
    let mut p = Parser::new(text, mode, driver)?;
    if p.cur.is_none() {
        return eqn_err!(EmptyEquation, 0, 0);
    }
    let (value, _) = p.expr()?;
    let consumed = p.finish(terminator)?;

    if let Some(want) = mode.sort {
        let got = value.sort();
        if got != want {
            return eqn_err!(
                ResultSortMismatch,
                0,
                text.len(),
                "expected a {want} result, got {got}"
            );
        }
    }

    Ok((value, consumed))
}

struct Parser<'input, 'a> {
    lexer: Lexer<'input>,
    cur: Option<Spanned<Token<'input>>>,
    driver: &'a dyn Driver,
    mode: ParseMode,
    /// Element count of the evaluation mesh; literals materialize at this
    /// size so every operation goes through the same-size check.
    n: usize,
    trace: bool,
}

impl<'input, 'a> Parser<'input, 'a> {
    fn new(text: &'input str, mode: ParseMode, driver: &'a dyn Driver) -> EquationResult<Self> {
        let n = if mode.on_points {
            driver.point_size()
        } else {
            driver.size()
        };
        let mut p = Parser {
            lexer: Lexer::new(text),
            cur: None,
            driver,
            mode,
            n,
            trace: driver.trace_parsing(),
        };
        p.refill()?;
        Ok(p)
    }

    fn refill(&mut self) -> EquationResult<()> {
        self.cur = match self.lexer.next() {
            Some(Ok(t)) => Some(t),
            Some(Err(err)) => return Err(err),
            None => None,
        };
        Ok(())
    }

    fn advance(&mut self) -> EquationResult<()> {
        self.refill()
    }

    fn eof_loc(&self) -> Loc {
        let n = self.lexer.text().len();
        Loc::new(n, n)
    }

    /// Consume the current token if it equals `want`, otherwise produce a
    /// spanned error naming what was expected.
    fn expect(&mut self, want: Token<'static>, what: &str) -> EquationResult<Loc> {
        match self.cur {
            Some((start, tok, end)) if tok == want => {
                self.advance()?;
                Ok(Loc::new(start, end))
            }
            Some((start, _, end)) => {
                eqn_err!(UnrecognizedToken, start, end, "expected {what}")
            }
            None => {
                let loc = self.eof_loc();
                eqn_err!(UnrecognizedEof, loc.start, loc.end, "expected {what}")
            }
        }
    }

    fn finish(&mut self, terminator: Terminator) -> EquationResult<usize> {
        match terminator {
            Terminator::Eof => match self.cur {
                None => Ok(self.lexer.text().len()),
                Some((start, _, end)) => {
                    eqn_err!(ExtraToken, start, end, "unexpected trailing input")
                }
            },
            Terminator::Comma => {
                let loc = self.expect(Token::Comma, "','")?;
                Ok(loc.end as usize)
            }
            Terminator::CloseParen => {
                let loc = self.expect(Token::RParen, "')'")?;
                Ok(loc.end as usize)
            }
        }
    }

    /// conditional: or_expr ('?' expr ':' expr)?
    ///
    /// The condition does not short-circuit: both branches are whole fields
    /// and selection happens per element.
    fn expr(&mut self) -> EquationResult<(Value, Loc)> {
        let (cond, cond_loc) = self.or_expr()?;

        if let Some((_, Token::Question, _)) = self.cur {
            self.advance()?;
            let (then, _) = self.expr()?;
            self.expect(Token::Colon, "':'")?;
            let (otherwise, else_loc) = self.expr()?;
            let loc = cond_loc.union(&else_loc);
            if self.trace {
                eprintln!("fieldexpr: conditional at {loc}");
            }
            return Ok((conditional(cond, then, otherwise, loc)?, loc));
        }

        Ok((cond, cond_loc))
    }

    fn or_expr(&mut self) -> EquationResult<(Value, Loc)> {
        let (mut lhs, mut loc) = self.and_expr()?;
        while let Some((_, Token::Or, _)) = self.cur {
            self.advance()?;
            let (rhs, rhs_loc) = self.and_expr()?;
            loc = loc.union(&rhs_loc);
            lhs = logical_op(LogicalOp::Or, lhs, rhs, loc)?;
        }
        Ok((lhs, loc))
    }

    fn and_expr(&mut self) -> EquationResult<(Value, Loc)> {
        let (mut lhs, mut loc) = self.equality_expr()?;
        while let Some((_, Token::And, _)) = self.cur {
            self.advance()?;
            let (rhs, rhs_loc) = self.equality_expr()?;
            loc = loc.union(&rhs_loc);
            lhs = logical_op(LogicalOp::And, lhs, rhs, loc)?;
        }
        Ok((lhs, loc))
    }

    fn equality_expr(&mut self) -> EquationResult<(Value, Loc)> {
        let (mut lhs, mut loc) = self.comparison_expr()?;
        loop {
            let op = match self.cur {
                Some((_, Token::EqEq, _)) => CompareOp::Eq,
                Some((_, Token::Neq, _)) => CompareOp::Neq,
                _ => break,
            };
            self.advance()?;
            let (rhs, rhs_loc) = self.comparison_expr()?;
            loc = loc.union(&rhs_loc);
            lhs = compare(op, lhs, rhs, loc)?;
        }
        Ok((lhs, loc))
    }

    fn comparison_expr(&mut self) -> EquationResult<(Value, Loc)> {
        let (mut lhs, mut loc) = self.additive_expr()?;
        loop {
            let op = match self.cur {
                Some((_, Token::Lt, _)) => CompareOp::Lt,
                Some((_, Token::Lte, _)) => CompareOp::Lte,
                Some((_, Token::Gt, _)) => CompareOp::Gt,
                Some((_, Token::Gte, _)) => CompareOp::Gte,
                _ => break,
            };
            self.advance()?;
            let (rhs, rhs_loc) = self.additive_expr()?;
            loc = loc.union(&rhs_loc);
            lhs = compare(op, lhs, rhs, loc)?;
        }
        Ok((lhs, loc))
    }

    fn additive_expr(&mut self) -> EquationResult<(Value, Loc)> {
        let (mut lhs, mut loc) = self.multiplicative_expr()?;
        loop {
            let op = match self.cur {
                Some((_, Token::Plus, _)) => BinaryOp::Add,
                Some((_, Token::Minus, _)) => BinaryOp::Sub,
                _ => break,
            };
            self.advance()?;
            let (rhs, rhs_loc) = self.multiplicative_expr()?;
            loc = loc.union(&rhs_loc);
            if self.trace {
                eprintln!("fieldexpr: {} {op} {} at {loc}", lhs.sort(), rhs.sort());
            }
            lhs = binary_op(op, lhs, rhs, loc)?;
        }
        Ok((lhs, loc))
    }

    fn multiplicative_expr(&mut self) -> EquationResult<(Value, Loc)> {
        let (mut lhs, mut loc) = self.unary_expr()?;
        loop {
            let op = match self.cur {
                Some((_, Token::Mul, _)) => BinaryOp::Mul,
                Some((_, Token::Div, _)) => BinaryOp::Div,
                Some((_, Token::Mod, _)) => BinaryOp::Mod,
                Some((_, Token::Amp, _)) => BinaryOp::Inner,
                Some((_, Token::Caret, _)) => BinaryOp::Cross,
                _ => break,
            };
            self.advance()?;
            let (rhs, rhs_loc) = self.unary_expr()?;
            loc = loc.union(&rhs_loc);
            if self.trace {
                eprintln!("fieldexpr: {} {op} {} at {loc}", lhs.sort(), rhs.sort());
            }
            lhs = binary_op(op, lhs, rhs, loc)?;
        }
        Ok((lhs, loc))
    }

    fn unary_expr(&mut self) -> EquationResult<(Value, Loc)> {
        match self.cur {
            Some((start, Token::Minus, end)) => {
                self.advance()?;
                let (operand, operand_loc) = self.unary_expr()?;
                let loc = Loc::new(start, end).union(&operand_loc);
                Ok((unary_neg(operand, loc)?, loc))
            }
            Some((start, Token::Not, end)) => {
                self.advance()?;
                let (operand, operand_loc) = self.unary_expr()?;
                let loc = Loc::new(start, end).union(&operand_loc);
                Ok((logical_not(operand, loc)?, loc))
            }
            _ => self.postfix_expr(),
        }
    }

    /// postfix: atom ('.' component)*
    fn postfix_expr(&mut self) -> EquationResult<(Value, Loc)> {
        let (mut value, mut loc) = self.atom()?;
        while let Some((_, Token::Dot, _)) = self.cur {
            self.advance()?;
            match self.cur {
                Some((start, Token::Ident(name), end)) => {
                    self.advance()?;
                    loc = loc.union(&Loc::new(start, end));
                    value = eval::component(value, name, loc)?;
                }
                Some((start, _, end)) => {
                    return eqn_err!(UnrecognizedToken, start, end, "expected a component name");
                }
                None => {
                    let l = self.eof_loc();
                    return eqn_err!(UnrecognizedEof, l.start, l.end, "expected a component name");
                }
            }
        }
        Ok((value, loc))
    }

    fn atom(&mut self) -> EquationResult<(Value, Loc)> {
        match self.cur {
            Some((start, Token::Num(text), end)) => {
                self.advance()?;
                let loc = Loc::new(start, end);
                let x = match text.parse::<f64>() {
                    Ok(x) => x,
                    Err(_) => {
                        return eqn_err!(ExpectedNumber, start, end, "bad numeric literal");
                    }
                };
                Ok((Value::scalar(uniform(x, self.n), self.mode.on_points), loc))
            }
            Some((start, Token::True, end)) => {
                self.advance()?;
                Ok((
                    Value::logical(uniform(true, self.n), self.mode.on_points),
                    Loc::new(start, end),
                ))
            }
            Some((start, Token::False, end)) => {
                self.advance()?;
                Ok((
                    Value::logical(uniform(false, self.n), self.mode.on_points),
                    Loc::new(start, end),
                ))
            }
            Some((start, Token::LParen, _)) => {
                self.advance()?;
                let (value, _) = self.expr()?;
                let close = self.expect(Token::RParen, "')'")?;
                Ok((value, Loc::new(start, close.end as usize)))
            }
            Some((start, Token::Ident(name), end)) => {
                self.advance()?;
                let loc = Loc::new(start, end);
                if self.trace {
                    eprintln!("fieldexpr: ident '{name}' at {loc}");
                }
                if let Some((lparen, Token::LParen, _)) = self.cur {
                    self.call(name, loc, lparen)
                } else {
                    self.bare_ident(name, loc)
                }
            }
            Some((start, _, end)) => {
                eqn_err!(UnrecognizedToken, start, end, "expected an expression")
            }
            None => {
                let loc = self.eof_loc();
                eqn_err!(UnrecognizedEof, loc.start, loc.end, "expected an expression")
            }
        }
    }

    /// Bare identifiers resolve to driver fields first; builtin constants
    /// like `pi` or `time` only apply when no field shadows them.
    fn bare_ident(&mut self, name: &str, loc: Loc) -> EquationResult<(Value, Loc)> {
        if let Some(value) = self.driver.field(name, self.mode.on_points) {
            if value.on_points != self.mode.on_points {
                return eqn_err!(
                    Generic,
                    loc.start,
                    loc.end,
                    "field '{name}' lives on the wrong mesh"
                );
            }
            return Ok((value, loc));
        }
        if is_0_arity_builtin_fn(name) {
            return Ok((self.builtin_constant(name, loc)?, loc));
        }
        eqn_err!(UnknownIdentifier, loc.start, loc.end, "unknown field '{name}'")
    }

    /// `name(` ... -- a builtin call or a plugin call-out. `lparen` is the
    /// byte offset of the opening paren, which the plugin path needs.
    fn call(&mut self, name: &str, name_loc: Loc, lparen: usize) -> EquationResult<(Value, Loc)> {
        if is_builtin_fn(name) {
            self.advance()?; // consume '('
            return self.builtin_call(name, name_loc);
        }
        if self.driver.plugin(name).is_some() {
            return self.plugin_call(name, name_loc, lparen);
        }
        eqn_err!(
            UnknownFunction,
            name_loc.start,
            name_loc.end,
            "unknown function or plugin '{name}'"
        )
    }

    /// Hand the raw text from the opening paren onward to the plugin, then
    /// resume lexing right after the bytes it reports having consumed.
    fn plugin_call(
        &mut self,
        name: &str,
        name_loc: Loc,
        lparen: usize,
    ) -> EquationResult<(Value, Loc)> {
        let driver = self.driver;
        let plugin = match driver.plugin(name) {
            Some(p) => p,
            None => {
                return eqn_err!(
                    UnknownPlugin,
                    name_loc.start,
                    name_loc.end,
                    "unknown plugin '{name}'"
                );
            }
        };

        let suffix = &self.lexer.text()[lparen..];
        if self.trace {
            eprintln!("fieldexpr: plugin '{name}' takes over at byte {lparen}");
        }
        let (value, consumed) = plugin
            .evaluate(suffix, self.mode.on_points, driver)
            .map_err(|mut err| {
                // plugin errors are spanned relative to the suffix
                err.start += lparen as u16;
                err.end += lparen as u16;
                err
            })?;

        if consumed == 0 || consumed > suffix.len() {
            return eqn_err!(
                BadPluginResult,
                name_loc.start,
                name_loc.end,
                "plugin '{name}' reported consuming {consumed} of {} bytes",
                suffix.len()
            );
        }
        if value.on_points != self.mode.on_points || value.len() != self.n {
            return eqn_err!(
                BadPluginResult,
                name_loc.start,
                name_loc.end,
                "plugin '{name}' returned a field of size {}, expected {}",
                value.len(),
                self.n
            );
        }

        let resume = lparen + consumed;
        if !self.lexer.text().is_char_boundary(resume) {
            return eqn_err!(
                BadPluginResult,
                name_loc.start,
                name_loc.end,
                "plugin '{name}' stopped mid-character at byte {consumed}"
            );
        }
        self.lexer.seek(resume);
        self.refill()?;

        Ok((value, Loc::new(name_loc.start as usize, resume)))
    }

    /// Comma-separated argument expressions through the closing paren.
    fn call_args(&mut self) -> EquationResult<(Args, Loc)> {
        let mut args = Args::new();
        if let Some((start, Token::RParen, end)) = self.cur {
            self.advance()?;
            return Ok((args, Loc::new(start, end)));
        }
        loop {
            let (arg, _) = self.expr()?;
            args.push(arg);
            match self.cur {
                Some((_, Token::Comma, _)) => {
                    self.advance()?;
                }
                Some((start, Token::RParen, end)) => {
                    self.advance()?;
                    return Ok((args, Loc::new(start, end)));
                }
                Some((start, _, end)) => {
                    return eqn_err!(UnrecognizedToken, start, end, "expected ',' or ')'");
                }
                None => {
                    let loc = self.eof_loc();
                    return eqn_err!(UnrecognizedEof, loc.start, loc.end, "expected ',' or ')'");
                }
            }
        }
    }

    fn builtin_call(&mut self, name: &str, name_loc: Loc) -> EquationResult<(Value, Loc)> {
        // the rand family takes an optional integer literal seed, not a
        // general expression
        if matches!(name, "rand" | "randFixed" | "randNormal" | "randNormalFixed") {
            return self.random_call(name, name_loc);
        }

        // lookup and timeline name a table; a table name is not an
        // expression, so these parse their first argument specially
        if name == "lookup" {
            let (table, _) = self.table_name()?;
            self.expect(Token::Comma, "','")?;
            let (keys, _) = self.expr()?;
            let close = self.expect(Token::RParen, "')'")?;
            let loc = name_loc.union(&close);
            return Ok((eval::lookup(&table, keys, self.driver, loc)?, loc));
        }
        if name == "timeline" {
            let (table, table_loc) = self.table_name()?;
            let close = self.expect(Token::RParen, "')'")?;
            let loc = name_loc.union(&close);
            let value = match self.driver.timeline(&table, self.driver.run_time()) {
                Some(x) => x,
                None => {
                    return eqn_err!(
                        UnknownTable,
                        table_loc.start,
                        table_loc.end,
                        "no timeline named '{table}'"
                    );
                }
            };
            return Ok((
                Value::scalar(uniform(value, self.n), self.mode.on_points),
                loc,
            ));
        }

        // row and col select by a bare integer literal index, like the
        // rand family's seed
        if matches!(name, "row" | "col") {
            let (operand, _) = self.expr()?;
            self.expect(Token::Comma, "','")?;
            let index = self.index_literal()?;
            let close = self.expect(Token::RParen, "')'")?;
            let loc = name_loc.union(&close);
            return Ok((eval::row_col(name == "col", operand, index, loc)?, loc));
        }

        let (args, close) = self.call_args()?;
        let loc = name_loc.union(&close);
        let argc = args.len();

        let value = if let Some(f) = UnaryMathFn::from_name(name) {
            apply_math_fn(f, one_arg(args, name, loc)?, loc)?
        } else {
            match name {
                "pow" => {
                    let (base, exp) = two_args(args, name, loc)?;
                    eval::pow(base, exp, loc)?
                }
                "sqr" => eval::sqr(one_arg(args, name, loc)?, loc)?,
                "mag" => eval::mag(one_arg(args, name, loc)?, loc)?,
                "magSqr" => eval::mag_sqr(one_arg(args, name, loc)?, loc)?,
                "transpose" | "diag" | "tr" | "dev" | "dev2" | "symm" | "twoSymm" | "skew"
                | "det" | "cof" | "inv" | "sph" | "eigenValues" | "eigenVectors" => {
                    tensor_fn(name, one_arg(args, name, loc)?, loc)?
                }
                "min" | "max" => {
                    let op = if name == "min" {
                        ReduceOp::Min
                    } else {
                        ReduceOp::Max
                    };
                    match argc {
                        1 => reduce(op, one_arg(args, name, loc)?, self.driver, loc)?,
                        2 => {
                            let (a, b) = two_args(args, name, loc)?;
                            elementwise_extremum(op, a, b, loc)?
                        }
                        _ => {
                            return eqn_err!(
                                BadArity,
                                loc.start,
                                loc.end,
                                "{name} expects 1 or 2 arguments, got {argc}"
                            );
                        }
                    }
                }
                "sum" => reduce(ReduceOp::Sum, one_arg(args, name, loc)?, self.driver, loc)?,
                "average" => reduce(
                    ReduceOp::Average,
                    one_arg(args, name, loc)?,
                    self.driver,
                    loc,
                )?,
                "minPosition" => {
                    eval::extremum_position(ReduceOp::Min, one_arg(args, name, loc)?, self.driver, loc)?
                }
                "maxPosition" => {
                    eval::extremum_position(ReduceOp::Max, one_arg(args, name, loc)?, self.driver, loc)?
                }
                "vector" => compose_vector(args, loc)?,
                "tensor" => compose_tensor(args, loc)?,
                "symmTensor" => compose_symm_tensor(args, loc)?,
                "sphericalTensor" => compose_spherical_tensor(args, loc)?,
                _ if is_0_arity_builtin_fn(name) => {
                    if argc != 0 {
                        return eqn_err!(
                            BadArity,
                            loc.start,
                            loc.end,
                            "{name} expects no arguments, got {argc}"
                        );
                    }
                    self.builtin_constant(name, loc)?
                }
                _ => {
                    return eqn_err!(
                        UnknownFunction,
                        name_loc.start,
                        name_loc.end,
                        "unknown function '{name}'"
                    );
                }
            }
        };

        Ok((value, loc))
    }

    fn table_name(&mut self) -> EquationResult<(String, Loc)> {
        match self.cur {
            Some((start, Token::Ident(name), end)) => {
                self.advance()?;
                Ok((name.to_string(), Loc::new(start, end)))
            }
            Some((start, _, end)) => {
                eqn_err!(UnrecognizedToken, start, end, "expected a table name")
            }
            None => {
                let loc = self.eof_loc();
                eqn_err!(UnrecognizedEof, loc.start, loc.end, "expected a table name")
            }
        }
    }

    /// A bare integer literal in `0..=2`, selecting a row or column.
    fn index_literal(&mut self) -> EquationResult<usize> {
        match self.cur {
            Some((start, Token::Num(text), end)) => {
                self.advance()?;
                let x = match text.parse::<f64>() {
                    Ok(x) => x,
                    Err(_) => {
                        return eqn_err!(ExpectedNumber, start, end, "bad numeric literal");
                    }
                };
                if x.fract() != 0.0 || !(0.0..=2.0).contains(&x) {
                    return eqn_err!(ExpectedInteger, start, end, "index must be 0, 1, or 2");
                }
                Ok(x as usize)
            }
            Some((start, _, end)) => {
                eqn_err!(ExpectedNumber, start, end, "expected an index")
            }
            None => {
                let loc = self.eof_loc();
                eqn_err!(UnrecognizedEof, loc.start, loc.end, "expected an index")
            }
        }
    }

    /// `rand()`, `rand(3)`, `randFixed()`, ... -- the seed must be a bare
    /// non-negative integer literal.
    fn random_call(&mut self, name: &str, name_loc: Loc) -> EquationResult<(Value, Loc)> {
        let gaussian = matches!(name, "randNormal" | "randNormalFixed");
        let fixed = matches!(name, "randFixed" | "randNormalFixed");

        let seed = match self.cur {
            Some((_, Token::RParen, _)) => 0,
            Some((start, Token::Num(text), end)) => {
                self.advance()?;
                let x = match text.parse::<f64>() {
                    Ok(x) => x,
                    Err(_) => {
                        return eqn_err!(ExpectedNumber, start, end, "bad numeric literal");
                    }
                };
                if x.fract() != 0.0 || x < 0.0 {
                    return eqn_err!(
                        ExpectedInteger,
                        start,
                        end,
                        "seed must be a non-negative integer"
                    );
                }
                x as u32
            }
            Some((start, _, end)) => {
                return eqn_err!(ExpectedNumber, start, end, "expected an integer seed");
            }
            None => {
                let loc = self.eof_loc();
                return eqn_err!(UnrecognizedEof, loc.start, loc.end, "expected an integer seed");
            }
        };
        let close = self.expect(Token::RParen, "')'")?;
        let loc = name_loc.union(&close);

        let f = self
            .driver
            .random_field(gaussian, fixed, seed, self.mode.on_points);
        Ok((Value::scalar(f, self.mode.on_points), loc))
    }

    /// Nullary builtins: constants, time state, and mesh geometry.
    fn builtin_constant(&mut self, name: &str, loc: Loc) -> EquationResult<Value> {
        let p = self.mode.on_points;
        let n = self.n;
        let value = match name {
            "pi" => Value::scalar(uniform(std::f64::consts::PI, n), p),
            "time" => Value::scalar(uniform(self.driver.run_time(), n), p),
            "deltaT" => Value::scalar(uniform(self.driver.delta_t(), n), p),
            "id" => Value::scalar((0..n).map(|i| i as f64).collect(), p),
            "cpu" => Value::scalar(uniform(self.driver.processor_id() as f64, n), p),
            "unitTensor" => Value::tensor(uniform(Tensor::identity(), n), p),
            "weight" => match self.driver.weights(p) {
                Some(w) => Value::scalar(w, p),
                None => {
                    return eqn_err!(Generic, loc.start, loc.end, "the driver supplies no weights");
                }
            },
            "position" => match self.driver.positions(p) {
                Some(pos) => Value::vector(pos, p),
                None => {
                    return eqn_err!(
                        Generic,
                        loc.start,
                        loc.end,
                        "the driver supplies no mesh positions"
                    );
                }
            },
            "normal" => match self.driver.face_normals() {
                Some(f) => Value::vector(f, p),
                None => {
                    return eqn_err!(
                        Generic,
                        loc.start,
                        loc.end,
                        "the driver supplies no face normals"
                    );
                }
            },
            "area" => match self.driver.face_areas() {
                Some(f) => Value::scalar(f, p),
                None => {
                    return eqn_err!(
                        Generic,
                        loc.start,
                        loc.end,
                        "the driver supplies no face areas"
                    );
                }
            },
            "volume" | "vol" => match self.driver.cell_volumes() {
                Some(f) => Value::scalar(f, p),
                None => {
                    return eqn_err!(
                        Generic,
                        loc.start,
                        loc.end,
                        "the driver supplies no cell volumes"
                    );
                }
            },
            "Sf" => {
                let normals = match self.driver.face_normals() {
                    Some(f) => f,
                    None => {
                        return eqn_err!(
                            Generic,
                            loc.start,
                            loc.end,
                            "the driver supplies no face normals"
                        );
                    }
                };
                let areas = match self.driver.face_areas() {
                    Some(f) => f,
                    None => {
                        return eqn_err!(
                            Generic,
                            loc.start,
                            loc.end,
                            "the driver supplies no face areas"
                        );
                    }
                };
                same_size(normals.len(), areas.len(), loc)?;
                Value::vector(zip_map(normals, areas, loc, |nv, a| nv * a)?, p)
            }
            "rand" | "randFixed" | "randNormal" | "randNormalFixed" => {
                let gaussian = matches!(name, "randNormal" | "randNormalFixed");
                let fixed = matches!(name, "randFixed" | "randNormalFixed");
                Value::scalar(self.driver.random_field(gaussian, fixed, 0, p), p)
            }
            _ => {
                return eqn_err!(
                    UnknownFunction,
                    loc.start,
                    loc.end,
                    "unknown builtin '{name}'"
                );
            }
        };
        Ok(value)
    }
}

fn one_arg(mut args: Args, name: &str, loc: Loc) -> EquationResult<Value> {
    if args.len() != 1 {
        return eqn_err!(
            BadArity,
            loc.start,
            loc.end,
            "{name} expects 1 argument, got {}",
            args.len()
        );
    }
    Ok(args.remove(0))
}

fn two_args(mut args: Args, name: &str, loc: Loc) -> EquationResult<(Value, Value)> {
    if args.len() != 2 {
        return eqn_err!(
            BadArity,
            loc.start,
            loc.end,
            "{name} expects 2 arguments, got {}",
            args.len()
        );
    }
    let b = args.remove(1);
    let a = args.remove(0);
    Ok((a, b))
}
