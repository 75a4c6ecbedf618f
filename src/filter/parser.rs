//! Recursive-descent parser for filter expressions.
//!
//! Precedence, loosest first: `||`, `&&`, `== !=`, `< <= > >=`, `+ -`,
//! `* /`, unary `- !`.

use super::{BinaryOp, FilterExpr, Function, UnaryOp};
use crate::error::{ExtractError, Result};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

/// Deepest nesting of parentheses, calls and unary operators accepted
const MAX_NESTING: usize = 128;

const OPERATORS: &[&str] = &[
    "&&", "||", "==", "!=", "<=", ">=", "<", ">", "!", "+", "-", "*", "/",
];

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        match c {
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            '[' => tokens.push(Token::LBracket),
            ']' => tokens.push(Token::RBracket),
            ',' => tokens.push(Token::Comma),
            _ if c.is_ascii_digit() || c == '.' => {
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
                let text: String = chars[start..i].iter().collect();
                let value = text.parse::<f64>().map_err(|_| {
                    ExtractError::configuration(format!("invalid number '{}' in filter", text))
                })?;
                tokens.push(Token::Number(value));
                continue;
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
                continue;
            }
            _ => {
                let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
                let op = OPERATORS
                    .iter()
                    .find(|op| rest.starts_with(**op))
                    .ok_or_else(|| {
                        ExtractError::configuration(format!(
                            "unexpected character '{}' in filter at position {}",
                            c, i
                        ))
                    })?;
                tokens.push(Token::Op(*op));
                i += op.len();
                continue;
            }
        }
        i += 1;
    }

    Ok(tokens)
}

pub(super) fn parse(input: &str) -> Result<FilterExpr> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.or()?;
    if let Some(token) = parser.peek() {
        return Err(ExtractError::configuration(format!(
            "unexpected {:?} after end of filter expression",
            token
        )));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_op(&mut self, candidates: &[&'static str]) -> Option<&'static str> {
        match self.peek().cloned() {
            Some(Token::Op(op)) if candidates.contains(&op) => {
                self.pos += 1;
                Some(op)
            }
            _ => None,
        }
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            other => Err(ExtractError::configuration(format!(
                "expected {:?} in filter, found {:?}",
                expected, other
            ))),
        }
    }

    fn binary_level(
        &mut self,
        ops: &[&'static str],
        next: fn(&mut Self) -> Result<FilterExpr>,
    ) -> Result<FilterExpr> {
        let mut lhs = next(self)?;
        while let Some(op) = self.eat_op(ops) {
            let rhs = next(self)?;
            lhs = FilterExpr::Binary(BinaryOp::from_symbol(op), Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn or(&mut self) -> Result<FilterExpr> {
        self.binary_level(&["||"], Self::and)
    }

    fn and(&mut self) -> Result<FilterExpr> {
        self.binary_level(&["&&"], Self::equality)
    }

    fn equality(&mut self) -> Result<FilterExpr> {
        self.binary_level(&["==", "!="], Self::relational)
    }

    fn relational(&mut self) -> Result<FilterExpr> {
        self.binary_level(&["<=", ">=", "<", ">"], Self::additive)
    }

    fn additive(&mut self) -> Result<FilterExpr> {
        self.binary_level(&["+", "-"], Self::multiplicative)
    }

    fn multiplicative(&mut self) -> Result<FilterExpr> {
        self.binary_level(&["*", "/"], Self::unary)
    }

    fn unary(&mut self) -> Result<FilterExpr> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ExtractError::configuration(format!(
                "filter expression nested deeper than {} levels",
                MAX_NESTING
            )));
        }
        let expr = self.prefix();
        self.depth -= 1;
        expr
    }

    fn prefix(&mut self) -> Result<FilterExpr> {
        if self.eat_op(&["-"]).is_some() {
            return Ok(FilterExpr::Unary(UnaryOp::Neg, Box::new(self.unary()?)));
        }
        if self.eat_op(&["!"]).is_some() {
            return Ok(FilterExpr::Unary(UnaryOp::Not, Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<FilterExpr> {
        match self.next() {
            Some(Token::Number(v)) => Ok(FilterExpr::Number(v)),
            Some(Token::LParen) => {
                let inner = self.or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => match self.peek().cloned() {
                Some(Token::LParen) => {
                    self.pos += 1;
                    self.call(&name)
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let index = match self.next() {
                        Some(Token::Number(v)) if v >= 0.0 && v.fract() == 0.0 => v as usize,
                        other => {
                            return Err(ExtractError::configuration(format!(
                                "expected a non-negative integer index after {}[, found {:?}",
                                name, other
                            )));
                        }
                    };
                    self.expect(Token::RBracket)?;
                    Ok(FilterExpr::Index(name, index))
                }
                _ => Ok(FilterExpr::Field(name)),
            },
            other => Err(ExtractError::configuration(format!(
                "unexpected {:?} in filter expression",
                other
            ))),
        }
    }

    fn call(&mut self, name: &str) -> Result<FilterExpr> {
        let function = Function::from_name(name).ok_or_else(|| {
            ExtractError::configuration(format!("unknown function {} in filter", name))
        })?;

        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            args.push(self.or()?);
            while self.peek() == Some(&Token::Comma) {
                self.pos += 1;
                args.push(self.or()?);
            }
        }
        self.expect(Token::RParen)?;

        if args.len() != function.arity() {
            return Err(ExtractError::configuration(format!(
                "{} takes {} argument(s), got {}",
                name,
                function.arity(),
                args.len()
            )));
        }
        Ok(FilterExpr::Call(function, args))
    }
}
