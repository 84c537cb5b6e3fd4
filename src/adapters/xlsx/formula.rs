//! Small formula evaluator for cells saved without a cached result.
//!
//! Supports numbers, strings, booleans, `A1` references (with `$` anchors and
//! shared-formula offsets), ranges inside functions, `+ - * / ^ & %`, unary
//! signs, parentheses and `SUM PRODUCT MIN MAX AVERAGE COUNT ROUND ABS`.
//! Anything else evaluates to an Excel error value.

use super::parse_cell_ref;
use crate::domain::model::CellScalar;
use crate::domain::services::extractor::scalar_to_text;
use std::sync::Arc;
use thiserror::Error;

const MAX_RANGE_CELLS: u64 = 1_000_000;
// Excel 的巢狀上限
const MAX_NESTING: usize = 64;

pub(crate) trait CellLookup {
    fn value_at(&self, row: u32, col: u32, depth: usize) -> CellScalar;
}

/// Formula text and the cell it was written for.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FormulaSource {
    text: Arc<str>,
    origin: (u32, u32),
}

impl FormulaSource {
    pub(crate) fn new(text: String, origin: (u32, u32)) -> Self {
        Self {
            text: Arc::from(text),
            origin,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
enum FormulaError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unexpected end of formula")]
    UnexpectedEnd,
    #[error("unexpected token {0}")]
    UnexpectedToken(String),
    #[error("unsupported {0}")]
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Text(String),
    Bool(bool),
    Func(String),
    Ref(super::CellRef),
    Op(char),
    LParen,
    RParen,
    Comma,
    Colon,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Text(String),
    Bool(bool),
    Error(&'static str),
    Ref(u32, u32),
    Range((u32, u32), (u32, u32)),
    Neg(Box<Expr>),
    Percent(Box<Expr>),
    Binary(char, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

pub(crate) fn evaluate<L: CellLookup + ?Sized>(
    sheet: &L,
    source: &FormulaSource,
    at: (u32, u32),
    depth: usize,
) -> CellScalar {
    let offset = (
        i64::from(at.0) - i64::from(source.origin.0),
        i64::from(at.1) - i64::from(source.origin.1),
    );

    let parsed = tokenize(&source.text).and_then(|tokens| Parser::new(tokens, offset).parse());
    match parsed {
        Ok(expr) => {
            let evaluator = Evaluator { sheet, depth };
            match evaluator.eval(&expr) {
                CellScalar::Number(n) if !n.is_finite() => CellScalar::Error("#NUM!".to_string()),
                other => other,
            }
        }
        Err(e) => {
            tracing::debug!("Cannot evaluate formula '{}': {}", source.text, e);
            CellScalar::Error("#NAME?".to_string())
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, FormulaError> {
    let chars: Vec<char> = text.trim().trim_start_matches('=').chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let n = literal
                    .parse::<f64>()
                    .map_err(|_| FormulaError::UnexpectedToken(literal.clone()))?;
                tokens.push(Token::Number(n));
            }
            '"' => {
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(FormulaError::UnexpectedEnd),
                        Some('"') if chars.get(i + 1) == Some(&'"') => {
                            s.push('"');
                            i += 2;
                        }
                        Some('"') => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            s.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Text(s));
            }
            c if c.is_ascii_alphabetic() || c == '$' || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || matches!(chars[i], '$' | '_' | '.'))
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let mut next = i;
                while next < chars.len() && chars[next] == ' ' {
                    next += 1;
                }
                match chars.get(next) {
                    Some('(') => tokens.push(Token::Func(word.to_ascii_uppercase())),
                    Some('!') => return Err(FormulaError::Unsupported(format!("sheet reference {}", word))),
                    _ => {
                        if let Some(cell) = parse_cell_ref(&word) {
                            tokens.push(Token::Ref(cell));
                        } else if word.eq_ignore_ascii_case("TRUE") {
                            tokens.push(Token::Bool(true));
                        } else if word.eq_ignore_ascii_case("FALSE") {
                            tokens.push(Token::Bool(false));
                        } else {
                            return Err(FormulaError::Unsupported(format!("name {}", word)));
                        }
                    }
                }
            }
            '+' | '-' | '*' | '/' | '^' | '&' | '%' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            ':' => {
                tokens.push(Token::Colon);
                i += 1;
            }
            other => return Err(FormulaError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    offset: (i64, i64),
    nesting: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>, offset: (i64, i64)) -> Self {
        Self {
            tokens,
            pos: 0,
            offset,
            nesting: 0,
        }
    }

    /// Runs `f` one nesting level deeper, failing past [`MAX_NESTING`].
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, FormulaError>,
    ) -> Result<T, FormulaError> {
        if self.nesting >= MAX_NESTING {
            return Err(FormulaError::Unsupported(format!(
                "nesting deeper than {} levels",
                MAX_NESTING
            )));
        }
        self.nesting += 1;
        let result = f(self);
        self.nesting -= 1;
        result
    }

    fn parse(mut self) -> Result<Expr, FormulaError> {
        let expr = self.concat()?;
        match self.tokens.get(self.pos) {
            None => Ok(expr),
            Some(token) => Err(FormulaError::UnexpectedToken(format!("{:?}", token))),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat_op(&mut self, ops: &[char]) -> Option<char> {
        match self.peek() {
            Some(Token::Op(op)) if ops.contains(op) => {
                let op = *op;
                self.pos += 1;
                Some(op)
            }
            _ => None,
        }
    }

    fn binary_level(
        &mut self,
        ops: &[char],
        next: fn(&mut Self) -> Result<Expr, FormulaError>,
    ) -> Result<Expr, FormulaError> {
        let mut lhs = next(self)?;
        while let Some(op) = self.eat_op(ops) {
            let rhs = next(self)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn concat(&mut self) -> Result<Expr, FormulaError> {
        self.binary_level(&['&'], Self::additive)
    }

    fn additive(&mut self) -> Result<Expr, FormulaError> {
        self.binary_level(&['+', '-'], Self::term)
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        self.binary_level(&['*', '/'], Self::power)
    }

    fn power(&mut self) -> Result<Expr, FormulaError> {
        self.binary_level(&['^'], Self::unary)
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        match self.eat_op(&['-', '+']) {
            Some('-') => Ok(Expr::Neg(Box::new(self.nested(Self::unary)?))),
            Some(_) => self.nested(Self::unary),
            None => self.postfix(),
        }
    }

    fn postfix(&mut self) -> Result<Expr, FormulaError> {
        let mut expr = self.primary()?;
        while self.eat_op(&['%']).is_some() {
            expr = Expr::Percent(Box::new(expr));
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        match self.next().ok_or(FormulaError::UnexpectedEnd)? {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::Text(s) => Ok(Expr::Text(s)),
            Token::Bool(b) => Ok(Expr::Bool(b)),
            Token::Ref(start) => {
                let from = self.shift(start);
                if self.peek() == Some(&Token::Colon) {
                    self.pos += 1;
                    let end = match self.next() {
                        Some(Token::Ref(end)) => self.shift(end),
                        Some(other) => return Err(FormulaError::UnexpectedToken(format!("{:?}", other))),
                        None => return Err(FormulaError::UnexpectedEnd),
                    };
                    return Ok(match (from, end) {
                        (Some(a), Some(b)) => Expr::Range(a, b),
                        _ => Expr::Error("#REF!"),
                    });
                }
                Ok(from.map(|(r, c)| Expr::Ref(r, c)).unwrap_or(Expr::Error("#REF!")))
            }
            Token::Func(name) => self.nested(|p| p.call_args(name)),
            Token::LParen => self.nested(|p| {
                let expr = p.concat()?;
                p.expect(Token::RParen)?;
                Ok(expr)
            }),
            other => Err(FormulaError::UnexpectedToken(format!("{:?}", other))),
        }
    }

    fn call_args(&mut self, name: String) -> Result<Expr, FormulaError> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(Expr::Call(name, args));
        }
        loop {
            args.push(self.concat()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => break,
                Some(other) => return Err(FormulaError::UnexpectedToken(format!("{:?}", other))),
                None => return Err(FormulaError::UnexpectedEnd),
            }
        }
        Ok(Expr::Call(name, args))
    }

    fn expect(&mut self, wanted: Token) -> Result<(), FormulaError> {
        match self.next() {
            Some(token) if token == wanted => Ok(()),
            Some(other) => Err(FormulaError::UnexpectedToken(format!("{:?}", other))),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    /// Moves relative parts of a reference by the shared-formula offset.
    fn shift(&self, cell: super::CellRef) -> Option<(u32, u32)> {
        let row = if cell.row_absolute {
            i64::from(cell.row)
        } else {
            i64::from(cell.row) + self.offset.0
        };
        let col = if cell.col_absolute {
            i64::from(cell.col)
        } else {
            i64::from(cell.col) + self.offset.1
        };
        if row < 1 || col < 1 {
            return None;
        }
        Some((u32::try_from(row).ok()?, u32::try_from(col).ok()?))
    }
}

struct Evaluator<'a, L: CellLookup + ?Sized> {
    sheet: &'a L,
    depth: usize,
}

impl<L: CellLookup + ?Sized> Evaluator<'_, L> {
    fn eval(&self, expr: &Expr) -> CellScalar {
        match expr {
            Expr::Number(n) => CellScalar::Number(*n),
            Expr::Text(s) => CellScalar::Text(s.clone()),
            Expr::Bool(b) => CellScalar::Bool(*b),
            Expr::Error(code) => error(code),
            Expr::Ref(row, col) => self.sheet.value_at(*row, *col, self.depth),
            Expr::Range(..) => error("#VALUE!"),
            Expr::Neg(inner) => match to_number(&self.eval(inner)) {
                Ok(n) => CellScalar::Number(-n),
                Err(e) => e,
            },
            Expr::Percent(inner) => match to_number(&self.eval(inner)) {
                Ok(n) => CellScalar::Number(n / 100.0),
                Err(e) => e,
            },
            Expr::Binary('&', lhs, rhs) => {
                let (l, r) = (self.eval(lhs), self.eval(rhs));
                match (&l, &r) {
                    (CellScalar::Error(_), _) => l,
                    (_, CellScalar::Error(_)) => r,
                    _ => CellScalar::Text(format!("{}{}", scalar_to_text(&l), scalar_to_text(&r))),
                }
            }
            Expr::Binary(op, lhs, rhs) => {
                let l = match to_number(&self.eval(lhs)) {
                    Ok(n) => n,
                    Err(e) => return e,
                };
                let r = match to_number(&self.eval(rhs)) {
                    Ok(n) => n,
                    Err(e) => return e,
                };
                match op {
                    '+' => CellScalar::Number(l + r),
                    '-' => CellScalar::Number(l - r),
                    '*' => CellScalar::Number(l * r),
                    '/' if r == 0.0 => error("#DIV/0!"),
                    '/' => CellScalar::Number(l / r),
                    '^' => CellScalar::Number(l.powf(r)),
                    _ => error("#VALUE!"),
                }
            }
            Expr::Call(name, args) => self.call(name, args),
        }
    }

    fn call(&self, name: &str, args: &[Expr]) -> CellScalar {
        let name = name.trim_start_matches("_XLFN.");
        match name {
            "SUM" | "PRODUCT" | "MIN" | "MAX" | "AVERAGE" | "COUNT" => {
                let values = match self.numbers(args) {
                    Ok(values) => values,
                    Err(e) => return e,
                };
                let result: f64 = match name {
                    "SUM" => values.iter().sum(),
                    "PRODUCT" => values.iter().product(),
                    "MIN" => values.iter().copied().reduce(f64::min).unwrap_or(0.0),
                    "MAX" => values.iter().copied().reduce(f64::max).unwrap_or(0.0),
                    "COUNT" => values.len() as f64,
                    _ if values.is_empty() => return error("#DIV/0!"),
                    _ => values.iter().sum::<f64>() / values.len() as f64,
                };
                CellScalar::Number(result)
            }
            "ROUND" => {
                let [value, digits] = args else {
                    return error("#VALUE!");
                };
                let (value, digits) = match (to_number(&self.eval(value)), to_number(&self.eval(digits))) {
                    (Ok(v), Ok(d)) => (v, d.trunc() as i32),
                    (Err(e), _) | (_, Err(e)) => return e,
                };
                let factor = 10f64.powi(digits);
                CellScalar::Number((value * factor).round() / factor)
            }
            "ABS" => {
                let [value] = args else {
                    return error("#VALUE!");
                };
                match to_number(&self.eval(value)) {
                    Ok(n) => CellScalar::Number(n.abs()),
                    Err(e) => e,
                }
            }
            _ => error("#NAME?"),
        }
    }

    /// Numeric arguments of an aggregate. Referenced cells contribute only
    /// numbers; literal arguments are coerced.
    fn numbers(&self, args: &[Expr]) -> Result<Vec<f64>, CellScalar> {
        let mut out = Vec::new();
        for arg in args {
            match arg {
                Expr::Range(from, to) => {
                    let (r1, r2) = (from.0.min(to.0), from.0.max(to.0));
                    let (c1, c2) = (from.1.min(to.1), from.1.max(to.1));
                    let cells = u64::from(r2 - r1 + 1) * u64::from(c2 - c1 + 1);
                    if cells > MAX_RANGE_CELLS {
                        return Err(error("#VALUE!"));
                    }
                    for row in r1..=r2 {
                        for col in c1..=c2 {
                            self.collect_referenced(self.sheet.value_at(row, col, self.depth), &mut out)?;
                        }
                    }
                }
                Expr::Ref(row, col) => {
                    self.collect_referenced(self.sheet.value_at(*row, *col, self.depth), &mut out)?;
                }
                other => out.push(to_number(&self.eval(other))?),
            }
        }
        Ok(out)
    }

    fn collect_referenced(&self, value: CellScalar, out: &mut Vec<f64>) -> Result<(), CellScalar> {
        match value {
            CellScalar::Number(n) => out.push(n),
            CellScalar::Error(_) => return Err(value),
            _ => {}
        }
        Ok(())
    }
}

fn error(code: &str) -> CellScalar {
    CellScalar::Error(code.to_string())
}

fn to_number(value: &CellScalar) -> Result<f64, CellScalar> {
    match value {
        CellScalar::Number(n) => Ok(*n),
        CellScalar::Blank => Ok(0.0),
        CellScalar::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        CellScalar::Text(s) if s.trim().is_empty() => Err(error("#VALUE!")),
        CellScalar::Text(s) => s.trim().parse::<f64>().map_err(|_| error("#VALUE!")),
        CellScalar::Error(_) => Err(value.clone()),
    }
}
