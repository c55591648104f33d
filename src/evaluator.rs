//! # Expression evaluator (component E)
//!
//! Recursive descent over one token of lookahead, `self.token`, already
//! cached by `Interpreter::advance`. Every rule here ends by leaving
//! `self.token` sitting on the token *after* what it consumed, the same
//! convention `tokenizer::nexttoken` itself follows — callers never have
//! to "un-read" a token.
//!
//! Precedence, loosest to tightest: `OR`, `AND`, `NOT`, relational
//! (`=`,`<`,`>`,`<=`,`>=`,`<>`), additive (`+`,`-`, with an optional
//! leading sign), multiplicative (`*`,`/`,`%`). A bare factor with no
//! operator applied to it passes its `Value` through untouched, so a
//! lone string reaches `compare_expr` as a `Value::Str` and gets real
//! string comparison rather than being coerced to a number early.

use crate::config::Number;
use crate::error::{BasicError, ErrorKind, Result};
use crate::interpreter::Interpreter;
use crate::rng;
use crate::token::{Builtin, Keyword, TokenKind};
use crate::value::Value;

enum CmpOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

pub fn to_i32(n: Number) -> i32 {
    n as i32
}

fn bool_to_num(b: bool) -> Number {
    if b {
        1 as Number
    } else {
        0 as Number
    }
}

fn abs_num(n: Number) -> Number {
    if n < 0 as Number {
        0 as Number - n
    } else {
        n
    }
}

fn signum_num(n: Number) -> Number {
    if n > 0 as Number {
        1 as Number
    } else if n < 0 as Number {
        -(1 as Number)
    } else {
        0 as Number
    }
}

fn sqrt_num(n: Number) -> Result<Number> {
    if n < 0 as Number {
        return Err(BasicError::new(ErrorKind::Function));
    }
    #[cfg(feature = "float")]
    {
        Ok(n.sqrt())
    }
    #[cfg(not(feature = "float"))]
    {
        Ok((n as f64).sqrt() as Number)
    }
}

fn divide(a: Number, b: Number) -> Result<Number> {
    if b == 0 as Number {
        return Err(BasicError::new(ErrorKind::DivByZero));
    }
    Ok(a / b)
}

fn modulus(a: Number, b: Number) -> Result<Number> {
    if b == 0 as Number {
        return Err(BasicError::new(ErrorKind::DivByZero));
    }
    Ok(a % b)
}

impl Interpreter {
    pub fn expression(&mut self) -> Result<Value> {
        log::trace!("expression: token={:?}", self.token);
        let mut left = self.and_expr()?;
        while self.token == TokenKind::Keyword(Keyword::Or) {
            self.advance()?;
            let right = self.and_expr()?;
            left = Value::Num(bool_to_num(left.is_truthy()? || right.is_truthy()?));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Value> {
        log::trace!("and_expr: token={:?}", self.token);
        let mut left = self.not_expr()?;
        while self.token == TokenKind::Keyword(Keyword::And) {
            self.advance()?;
            let right = self.not_expr()?;
            left = Value::Num(bool_to_num(left.is_truthy()? && right.is_truthy()?));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Value> {
        log::trace!("not_expr: token={:?}", self.token);
        if self.token == TokenKind::Keyword(Keyword::Not) {
            self.advance()?;
            let v = self.not_expr()?;
            return Ok(Value::Num(bool_to_num(!v.is_truthy()?)));
        }
        self.compare_expr()
    }

    fn compare_expr(&mut self) -> Result<Value> {
        log::trace!("compare_expr: token={:?}", self.token);
        let left = self.add_expr()?;
        let op = match &self.token {
            TokenKind::Char('=') => Some(CmpOp::Eq),
            TokenKind::Char('<') => Some(CmpOp::Lt),
            TokenKind::Char('>') => Some(CmpOp::Gt),
            TokenKind::GreaterEqual => Some(CmpOp::Ge),
            TokenKind::LesserEqual => Some(CmpOp::Le),
            TokenKind::NotEqual => Some(CmpOp::Ne),
            _ => None,
        };
        let Some(op) = op else { return Ok(left) };
        self.advance()?;
        let right = self.add_expr()?;
        let truth = match (&left, &right) {
            (Value::Str(a), Value::Str(b)) => match op {
                CmpOp::Eq => a == b,
                CmpOp::Ne => a != b,
                CmpOp::Lt => a < b,
                CmpOp::Gt => a > b,
                CmpOp::Le => a <= b,
                CmpOp::Ge => a >= b,
            },
            _ => {
                let (a, b) = (left.as_num()?, right.as_num()?);
                match op {
                    CmpOp::Eq => a == b,
                    CmpOp::Ne => a != b,
                    CmpOp::Lt => a < b,
                    CmpOp::Gt => a > b,
                    CmpOp::Le => a <= b,
                    CmpOp::Ge => a >= b,
                }
            }
        };
        Ok(Value::Num(bool_to_num(truth)))
    }

    fn add_expr(&mut self) -> Result<Value> {
        log::trace!("add_expr: token={:?}", self.token);
        let mut negate = false;
        if self.token == TokenKind::Char('+') {
            self.advance()?;
        } else if self.token == TokenKind::Char('-') {
            negate = true;
            self.advance()?;
        }
        let mut left = self.term()?;
        if negate {
            left = Value::Num(0 as Number - left.as_num()?);
        }
        loop {
            match &self.token {
                TokenKind::Char('+') => {
                    self.advance()?;
                    let right = self.term()?;
                    left = if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) {
                        Value::Str(format!("{}{}", left.as_str(), right.as_str()))
                    } else {
                        Value::Num(left.as_num()? + right.as_num()?)
                    };
                }
                TokenKind::Char('-') => {
                    self.advance()?;
                    let right = self.term()?;
                    left = Value::Num(left.as_num()? - right.as_num()?);
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Value> {
        log::trace!("term: token={:?}", self.token);
        let mut left = self.factor()?;
        loop {
            match &self.token {
                TokenKind::Char('*') => {
                    self.advance()?;
                    let right = self.factor()?;
                    left = Value::Num(left.as_num()? * right.as_num()?);
                }
                TokenKind::Char('/') => {
                    self.advance()?;
                    let right = self.factor()?;
                    left = Value::Num(divide(left.as_num()?, right.as_num()?)?);
                }
                TokenKind::Char('%') => {
                    self.advance()?;
                    let right = self.factor()?;
                    left = Value::Num(modulus(left.as_num()?, right.as_num()?)?);
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<Value> {
        log::trace!("factor: token={:?}", self.token);
        match self.token.clone() {
            TokenKind::Number(n) => {
                self.advance()?;
                Ok(Value::Num(n))
            }
            TokenKind::Str(s) => {
                self.advance()?;
                Ok(Value::Str(s))
            }
            TokenKind::Char('(') => {
                self.advance()?;
                let v = self.expression()?;
                self.expect_char(')')?;
                Ok(v)
            }
            TokenKind::Char('-') => {
                self.advance()?;
                let v = self.factor()?;
                Ok(Value::Num(0 as Number - v.as_num()?))
            }
            TokenKind::Char('+') => {
                self.advance()?;
                self.factor()
            }
            TokenKind::Variable(n1, n2) => {
                self.advance()?;
                Ok(Value::Num(self.get_scalar(n1, n2)?))
            }
            TokenKind::ArrayVar(n1, n2) => {
                self.advance()?;
                self.expect_char('(')?;
                let idx = to_i32(self.expression()?.as_num()?) as u16;
                self.expect_char(')')?;
                Ok(Value::Num(self.array_get(n1, n2, idx)?))
            }
            TokenKind::StringVar(n1, n2) => {
                self.advance()?;
                let s = self.string_get(n1, n2)?;
                if self.token == TokenKind::Char('(') {
                    self.advance()?;
                    let start = to_i32(self.expression()?.as_num()?);
                    self.expect_char(')')?;
                    let start0 = start.max(1) as usize - 1;
                    let sub: String = s.chars().skip(start0).collect();
                    Ok(Value::Str(sub))
                } else {
                    Ok(Value::Str(s))
                }
            }
            TokenKind::Builtin(b) => {
                self.advance()?;
                self.apply_builtin(b)
            }
            _ => Err(BasicError::new(ErrorKind::Unknown)),
        }
    }

    fn eval_args(&mut self, arity: usize) -> Result<Vec<Value>> {
        let has_parens = self.token == TokenKind::Char('(');
        let mut args = Vec::new();
        if has_parens {
            self.advance()?;
            if self.token != TokenKind::Char(')') {
                loop {
                    args.push(self.expression()?);
                    if self.token == TokenKind::Char(',') {
                        self.advance()?;
                    } else {
                        break;
                    }
                }
            }
            self.expect_char(')')?;
        }
        if args.len() != arity {
            return Err(BasicError::new(ErrorKind::Args));
        }
        Ok(args)
    }

    fn peek(&self, addr: i32) -> Result<Number> {
        if addr >= 0 {
            let a = addr as usize;
            if a >= self.mem.len() {
                return Err(BasicError::new(ErrorKind::Range));
            }
            Ok(self.mem.read8(a as u16) as Number)
        } else {
            let idx = (-addr - 1) as usize;
            self.eeprom_cells
                .get(idx)
                .map(|&b| b as Number)
                .ok_or_else(|| BasicError::new(ErrorKind::Range))
        }
    }

    /// Dispatch a builtin already consumed from `self.token`; its
    /// parenthesized argument list (if any — `SIZE`/`LOMEM`/`HIMEM` may be
    /// bare) is read here.
    fn apply_builtin(&mut self, b: Builtin) -> Result<Value> {
        let args = self.eval_args(b.arity())?;
        let n = |i: usize| args[i].as_num();
        let result = match b {
            Builtin::Abs => abs_num(n(0)?),
            Builtin::Rnd => {
                let arg = to_i32(n(0)?);
                self.rng_state = rng::advance(self.rng_state);
                rng::rnd(self.rng_state, arg) as Number
            }
            Builtin::Sgn => signum_num(n(0)?),
            Builtin::Peek => self.peek(to_i32(n(0)?))?,
            Builtin::Len => args[0].as_str().chars().count() as Number,
            Builtin::Sqr => sqrt_num(n(0)?)?,
            Builtin::Fre => self.mem.free() as Number,
            Builtin::Usr => {
                let a0 = to_i32(n(0)?);
                let a1 = to_i32(n(1)?);
                let f = self.usr_fn.as_mut().ok_or_else(|| BasicError::new(ErrorKind::Function))?;
                f(a0, a1) as Number
            }
            Builtin::Aread => self.hardware.analog_read(to_i32(n(0)?)) as Number,
            Builtin::Dread => self.hardware.digital_read(to_i32(n(0)?)) as Number,
            Builtin::Millis => self.hardware.millis() as Number,
            Builtin::Pulsein => {
                let (a, s, t) = (to_i32(n(0)?), to_i32(n(1)?), to_i32(n(2)?));
                self.hardware.pulse_in(a, s, t) as Number
            }
            Builtin::Azero => {
                self.hardware.analog_zero();
                0 as Number
            }
            Builtin::Size => self.mem.len() as Number,
            Builtin::Lomem => self.mem.top() as Number,
            Builtin::Himem => self.mem.himem() as Number,
        };
        Ok(Value::Num(result))
    }
}
