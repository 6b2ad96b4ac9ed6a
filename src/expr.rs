//! A small expression language used to evaluate bang-command arguments and to
//! run host scripts.
//!
//! Parsing and evaluation happen in a single pass: an identifier is resolved
//! against the [`Scope`] the moment it is read. This makes an unbound leading
//! name (`hello world`) report [`EvalError::NameNotFound`] rather than a syntax
//! error about whatever follows it, which is what the dispatcher's literal
//! fallback keys on.
//!
//! Grammar:
//! ```text
//! program := stmt ((NEWLINE | ';') stmt)*
//! stmt    := IDENT '=' expr | expr | <empty>
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := '-' unary | postfix
//! postfix := primary ('(' (expr (',' expr)*)? ')')*
//! primary := INT | FLOAT | STRING | IDENT | 'True' | 'False' | 'None' | '(' expr ')'
//! ```

use crate::env::Bindings;
use crate::value::Value;

/// Errors raised while evaluating an expression.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// An identifier had no binding. The dispatcher recovers from this one.
    #[error("name '{0}' is not defined")]
    NameNotFound(String),
    #[error("syntax error at {pos}: {msg}")]
    Syntax { pos: usize, msg: String },
    #[error("type error: {0}")]
    Type(String),
    #[error("'{0}' is not callable")]
    NotCallable(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    Overflow,
    /// A call made during evaluation failed.
    #[error(transparent)]
    Call(anyhow::Error),
}

impl EvalError {
    fn syntax(pos: usize, msg: impl Into<String>) -> Self {
        EvalError::Syntax {
            pos,
            msg: msg.into(),
        }
    }
}

/// Name resolution and call support for the evaluator.
pub trait Scope {
    /// Value bound to `name`, or `None` if the name is unknown.
    fn lookup(&self, name: &str) -> Option<Value>;

    /// Calls `callee` with already evaluated arguments.
    fn call(&self, callee: Value, args: Vec<Value>) -> Result<Value, EvalError>;
}

/// Plain bindings can be read but hold nothing callable.
impl Scope for Bindings {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get_var(name).cloned()
    }

    fn call(&self, callee: Value, _args: Vec<Value>) -> Result<Value, EvalError> {
        Err(EvalError::NotCallable(callee.to_string()))
    }
}

/// A scope that also accepts assignments, as needed to run whole programs.
pub trait ProgramScope: Scope {
    fn assign(&mut self, name: &str, value: Value);
}

/// The expression evaluator consulted for every bang-command argument token.
pub trait Evaluator {
    fn evaluate(&self, expr: &str, bindings: &Bindings) -> Result<Value, EvalError>;
}

/// [`Evaluator`] backed by this module's expression language.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExprEvaluator;

impl Evaluator for ExprEvaluator {
    fn evaluate(&self, expr: &str, bindings: &Bindings) -> Result<Value, EvalError> {
        eval_expr(expr, bindings)
    }
}

/// Evaluates a single expression; anything after it is a syntax error.
pub fn eval_expr(src: &str, scope: &dyn Scope) -> Result<Value, EvalError> {
    let mut parser = Parser::new(src);
    let value = parser.expr(scope)?;
    match parser.next_tok()? {
        (Tok::End, _) => Ok(value),
        (_, pos) => Err(EvalError::syntax(pos, "unexpected trailing input")),
    }
}

/// Runs every statement of `src`, returning the value of the last expression
/// statement (or `Value::None`).
pub fn exec_program<S: ProgramScope>(src: &str, scope: &mut S) -> Result<Value, EvalError> {
    let mut parser = Parser::new(src);
    let mut last = Value::None;

    loop {
        match parser.peek_tok()? {
            Tok::End => return Ok(last),
            Tok::Sep => {
                parser.next_tok()?;
                continue;
            }
            _ => {}
        }

        if let Some(name) = parser.assignment_target()? {
            let value = parser.expr(&*scope)?;
            scope.assign(&name, value);
            last = Value::None;
        } else {
            last = parser.expr(&*scope)?;
        }

        match parser.next_tok()? {
            (Tok::Sep | Tok::End, _) => {}
            (_, pos) => return Err(EvalError::syntax(pos, "expected end of statement")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
    Assign,
    Sep,
    End,
}

struct Parser {
    input: Vec<char>,
    pos: usize,
    peeked: Option<(Tok, usize)>,
}

impl Parser {
    fn new(src: &str) -> Self {
        Parser {
            input: src.chars().collect(),
            pos: 0,
            peeked: None,
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.peek_char();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_tok(&mut self) -> Result<&Tok, EvalError> {
        let tok = match self.peeked.take() {
            Some(tok) => tok,
            None => self.scan()?,
        };
        Ok(&self.peeked.insert(tok).0)
    }

    fn next_tok(&mut self) -> Result<(Tok, usize), EvalError> {
        match self.peeked.take() {
            Some(tok) => Ok(tok),
            None => self.scan(),
        }
    }

    /// If the statement starts with `IDENT '='`, consumes both and returns the name.
    fn assignment_target(&mut self) -> Result<Option<String>, EvalError> {
        let saved_pos = self.pos;
        let saved_peek = self.peeked.clone();

        if let (Tok::Ident(name), _) = self.next_tok()? {
            if let (Tok::Assign, _) = self.next_tok()? {
                return Ok(Some(name));
            }
        }

        self.pos = saved_pos;
        self.peeked = saved_peek;
        Ok(None)
    }

    /// Reads one token, returning it with its starting offset.
    fn scan(&mut self) -> Result<(Tok, usize), EvalError> {
        loop {
            match self.peek_char() {
                Some(' ' | '\t' | '\r') => self.pos += 1,
                Some('#') => {
                    while self.peek_char().is_some_and(|c| c != '\n') {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }

        let start = self.pos;
        let Some(ch) = self.read_char() else {
            return Ok((Tok::End, start));
        };

        let tok = match ch {
            '\n' | ';' => Tok::Sep,
            '+' => Tok::Plus,
            '-' => Tok::Minus,
            '*' => Tok::Star,
            '/' => Tok::Slash,
            '(' => Tok::LParen,
            ')' => Tok::RParen,
            ',' => Tok::Comma,
            '=' => Tok::Assign,
            '"' | '\'' => Tok::Str(self.scan_string(ch, start)?),
            c if c.is_ascii_digit() => self.scan_number(start)?,
            c if c.is_alphabetic() || c == '_' => {
                while self
                    .peek_char()
                    .is_some_and(|c| c.is_alphanumeric() || c == '_')
                {
                    self.pos += 1;
                }
                Tok::Ident(self.input[start..self.pos].iter().collect())
            }
            c => return Err(EvalError::syntax(start, format!("unexpected character '{}'", c))),
        };
        Ok((tok, start))
    }

    fn scan_string(&mut self, quote: char, start: usize) -> Result<String, EvalError> {
        let mut s = String::new();
        while let Some(ch) = self.read_char() {
            match ch {
                c if c == quote => return Ok(s),
                '\\' => match self.read_char() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some(c @ ('\\' | '"' | '\'')) => s.push(c),
                    Some('x') => s.push(self.scan_hex_escape(start)?),
                    Some(c) => {
                        s.push('\\');
                        s.push(c);
                    }
                    None => break,
                },
                '\n' => break,
                c => s.push(c),
            }
        }
        Err(EvalError::syntax(start, "unterminated string literal"))
    }

    /// Two hex digits following `\x`.
    fn scan_hex_escape(&mut self, start: usize) -> Result<char, EvalError> {
        let digits: String = (0..2).filter_map(|_| self.read_char()).collect();
        if digits.len() != 2 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(EvalError::syntax(start, "truncated \\xXX escape"));
        }
        u32::from_str_radix(&digits, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| EvalError::syntax(start, "invalid \\xXX escape"))
    }

    fn scan_number(&mut self, start: usize) -> Result<Tok, EvalError> {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let is_float = self.peek_char() == Some('.')
            && self
                .input
                .get(self.pos + 1)
                .is_some_and(|c| c.is_ascii_digit());
        if is_float {
            self.pos += 1;
            while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if self.peek_char().is_some_and(|c| c.is_alphabetic() || c == '_') {
            return Err(EvalError::syntax(self.pos, "invalid numeric literal"));
        }

        let text: String = self.input[start..self.pos].iter().collect();
        if is_float {
            text.parse()
                .map(Tok::Float)
                .map_err(|_| EvalError::syntax(start, "invalid float literal"))
        } else {
            text.parse()
                .map(Tok::Int)
                .map_err(|_| EvalError::syntax(start, "integer literal too large"))
        }
    }

    fn expr(&mut self, scope: &dyn Scope) -> Result<Value, EvalError> {
        let mut lhs = self.term(scope)?;
        loop {
            let op = match self.peek_tok()? {
                Tok::Plus => BinOp::Add,
                Tok::Minus => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.next_tok()?;
            let rhs = self.term(scope)?;
            lhs = binary(op, lhs, rhs)?;
        }
    }

    fn term(&mut self, scope: &dyn Scope) -> Result<Value, EvalError> {
        let mut lhs = self.unary(scope)?;
        loop {
            let op = match self.peek_tok()? {
                Tok::Star => BinOp::Mul,
                Tok::Slash => BinOp::Div,
                _ => return Ok(lhs),
            };
            self.next_tok()?;
            let rhs = self.unary(scope)?;
            lhs = binary(op, lhs, rhs)?;
        }
    }

    fn unary(&mut self, scope: &dyn Scope) -> Result<Value, EvalError> {
        if matches!(self.peek_tok()?, Tok::Minus) {
            self.next_tok()?;
            return match self.unary(scope)? {
                Value::Int(i) => i.checked_neg().map(Value::Int).ok_or(EvalError::Overflow),
                Value::Float(x) => Ok(Value::Float(-x)),
                v => Err(EvalError::Type(format!(
                    "bad operand type for unary -: '{}'",
                    v.type_name()
                ))),
            };
        }
        self.postfix(scope)
    }

    fn postfix(&mut self, scope: &dyn Scope) -> Result<Value, EvalError> {
        let mut value = self.primary(scope)?;
        while matches!(self.peek_tok()?, Tok::LParen) {
            self.next_tok()?;
            let mut args = Vec::new();
            if !matches!(self.peek_tok()?, Tok::RParen) {
                loop {
                    args.push(self.expr(scope)?);
                    if !matches!(self.peek_tok()?, Tok::Comma) {
                        break;
                    }
                    self.next_tok()?;
                }
            }
            self.expect(Tok::RParen, "expected ')' after arguments")?;
            value = scope.call(value, args)?;
        }
        Ok(value)
    }

    fn primary(&mut self, scope: &dyn Scope) -> Result<Value, EvalError> {
        match self.next_tok()? {
            (Tok::Int(i), _) => Ok(Value::Int(i)),
            (Tok::Float(x), _) => Ok(Value::Float(x)),
            (Tok::Str(s), _) => Ok(Value::Str(s)),
            (Tok::Ident(name), _) => match name.as_str() {
                "True" => Ok(Value::Bool(true)),
                "False" => Ok(Value::Bool(false)),
                "None" => Ok(Value::None),
                _ => scope.lookup(&name).ok_or(EvalError::NameNotFound(name)),
            },
            (Tok::LParen, _) => {
                let value = self.expr(scope)?;
                self.expect(Tok::RParen, "expected ')'")?;
                Ok(value)
            }
            (Tok::End | Tok::Sep, pos) => Err(EvalError::syntax(pos, "unexpected end of input")),
            (tok, pos) => Err(EvalError::syntax(pos, format!("unexpected token {:?}", tok))),
        }
    }

    fn expect(&mut self, expected: Tok, msg: &str) -> Result<(), EvalError> {
        match self.next_tok()? {
            (tok, _) if tok == expected => Ok(()),
            (_, pos) => Err(EvalError::syntax(pos, msg)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        }
    }
}

/// Longest string repetition may produce, in bytes.
pub(crate) const MAX_STR_LEN: usize = 1 << 24;

/// `times` copies of `s` joined by `sep`, or `None` past [`MAX_STR_LEN`].
pub(crate) fn repeat_str(s: &str, times: usize, sep: &str) -> Option<String> {
    let len = s
        .len()
        .checked_add(sep.len())?
        .checked_mul(times)?;
    if len > MAX_STR_LEN {
        return None;
    }
    if len == 0 {
        return Some(String::new());
    }
    Some(vec![s; times].join(sep))
}

fn binary(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    match (op, &lhs, &rhs) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        (BinOp::Mul, Value::Str(s), Value::Int(n)) | (BinOp::Mul, Value::Int(n), Value::Str(s)) => {
            let times = usize::try_from(*n).unwrap_or(0);
            repeat_str(s, times, "").map(Value::Str).ok_or(EvalError::Overflow)
        }
        (BinOp::Div, _, _) => {
            let (Some(a), Some(b)) = (lhs.as_float(), rhs.as_float()) else {
                return Err(type_mismatch(op, &lhs, &rhs));
            };
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Value::Float(a / b))
        }
        (BinOp::Add | BinOp::Sub | BinOp::Mul, Value::Int(a), Value::Int(b)) => {
            let result = match op {
                BinOp::Add => a.checked_add(*b),
                BinOp::Sub => a.checked_sub(*b),
                _ => a.checked_mul(*b),
            };
            result.map(Value::Int).ok_or(EvalError::Overflow)
        }
        (_, Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let (Some(a), Some(b)) = (lhs.as_float(), rhs.as_float()) else {
                return Err(type_mismatch(op, &lhs, &rhs));
            };
            Ok(Value::Float(match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div => a / b,
            }))
        }
        _ => Err(type_mismatch(op, &lhs, &rhs)),
    }
}

/// `lhs + rhs` with the language's coercion rules.
pub(crate) fn add(lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    binary(BinOp::Add, lhs, rhs)
}

fn type_mismatch(op: BinOp, lhs: &Value, rhs: &Value) -> EvalError {
    EvalError::Type(format!(
        "unsupported operand types for {}: '{}' and '{}'",
        op.symbol(),
        lhs.type_name(),
        rhs.type_name()
    ))
}
