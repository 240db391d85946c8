//! A recursive-descent parser that turns one side of a normalized equation
//! into a polynomial in the single unknown.
//!
//! Grammar, with implicit multiplication between adjacent factors:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/') unary | power)*
//! unary  := ('+' | '-') unary | power
//! power  := atom ('^' unary)?
//! atom   := number | symbol | '(' expr ')'
//! ```
//!
//! Every letter is its own symbol, so `xy` reads as `x*y`. Words that name
//! functions are rejected outright.

use std::collections::BTreeSet;

use super::poly::{Poly, MAX_DEGREE};
use super::rational::Rational;

const FUNCTION_NAMES: &[&str] = &[
    "sin", "cos", "tan", "sec", "csc", "cot", "log", "ln", "exp", "sqrt", "abs", "arcsin",
    "arccos", "arctan", "sinh", "cosh", "tanh", "lim", "int", "sum",
];

const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Num(Rational),
    Symbol(char),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

/// Splits normalized text into tokens. Fails on any character the grammar
/// does not know and on function names.
pub fn tokenize(text: &str) -> Option<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                tokens.push(Token::Num(Rational::from_decimal(&literal)?));
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_alphabetic() {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                if FUNCTION_NAMES.contains(&word.to_ascii_lowercase().as_str()) {
                    return None;
                }
                tokens.extend(word.chars().map(Token::Symbol));
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '(' | '[' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' | ']' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            _ => return None,
        }
    }
    Some(tokens)
}

/// All distinct symbols appearing in a token stream.
pub fn symbols(tokens: &[Token]) -> BTreeSet<char> {
    tokens
        .iter()
        .filter_map(|t| match t {
            Token::Symbol(c) => Some(*c),
            _ => None,
        })
        .collect()
}

/// Parses a full token stream. Every symbol is treated as the unknown, so the
/// caller must check beforehand that at most one distinct symbol occurs.
pub fn parse_polynomial(tokens: &[Token]) -> Option<Poly> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let poly = parser.expr()?;
    if parser.pos != tokens.len() {
        return None;
    }
    Some(poly)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        self.pos += 1;
        t
    }

    fn expr(&mut self) -> Option<Poly> {
        let mut acc = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    acc = acc.checked_add(&self.term()?)?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    acc = acc.checked_sub(&self.term()?)?;
                }
                _ => return Some(acc),
            }
        }
    }

    fn term(&mut self) -> Option<Poly> {
        let mut acc = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    acc = acc.checked_mul(&self.unary()?)?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    // Only constant divisors keep the result a polynomial.
                    let divisor = self.unary()?.as_constant()?;
                    acc = acc.checked_div_const(divisor)?;
                }
                Some(Token::Num(_) | Token::Symbol(_) | Token::LParen) => {
                    acc = acc.checked_mul(&self.power()?)?;
                }
                _ => return Some(acc),
            }
        }
    }

    fn unary(&mut self) -> Option<Poly> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                self.nested(|p| p.unary())?.checked_neg()
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.nested(|p| p.unary())
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Option<Poly> {
        let base = self.atom()?;
        if self.peek() != Some(&Token::Caret) {
            return Some(base);
        }
        self.pos += 1;
        let exponent = self.nested(|p| p.unary())?.as_constant()?;
        if !exponent.is_integer() {
            return None;
        }
        let n = exponent.numer();
        if n >= 0 {
            let n = u32::try_from(n).ok().filter(|&n| n as usize <= MAX_DEGREE)?;
            base.checked_pow(n)
        } else {
            // Negative powers only make sense for a constant base.
            let c = base.as_constant()?;
            let n = u32::try_from(n.checked_neg()?).ok()?;
            let denom = c.checked_pow(n)?;
            Some(Poly::constant(Rational::ONE.checked_div(denom)?))
        }
    }

    fn atom(&mut self) -> Option<Poly> {
        match self.bump()?.clone() {
            Token::Num(r) => Some(Poly::constant(r)),
            Token::Symbol(_) => Some(Poly::var()),
            Token::LParen => {
                let inner = self.nested(|p| p.expr())?;
                match self.bump()? {
                    Token::RParen => Some(inner),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self) -> Option<Poly>) -> Option<Poly> {
        if self.depth >= MAX_NESTING {
            return None;
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Option<Poly> {
        parse_polynomial(&tokenize(text)?)
    }

    fn int_poly(coeffs: &[i128]) -> Poly {
        Poly::from_coeffs(coeffs.iter().map(|&c| Rational::integer(c)).collect())
    }

    #[test]
    fn honours_precedence() {
        assert_eq!(parse("2*x + 3").unwrap(), int_poly(&[3, 2]));
        assert_eq!(parse("-x^2").unwrap(), int_poly(&[0, 0, -1]));
    }

    #[test]
    fn supports_implicit_multiplication() {
        assert_eq!(parse("2x").unwrap(), int_poly(&[0, 2]));
        assert_eq!(parse("(x+1)(x-1)").unwrap(), int_poly(&[-1, 0, 1]));
        assert_eq!(parse("3(x + 2)").unwrap(), int_poly(&[6, 3]));
    }

    #[test]
    fn divides_by_constants_only() {
        assert_eq!(
            parse("x/2").unwrap(),
            Poly::from_coeffs(vec![Rational::ZERO, Rational::new(1, 2).unwrap()])
        );
        assert_eq!(parse("1/x"), None);
    }

    #[test]
    fn rejects_functions_and_stray_characters() {
        assert_eq!(tokenize("sin(x)"), None);
        assert_eq!(tokenize("x % 2"), None);
        assert_eq!(parse("(x + 1"), None);
    }

    #[test]
    fn splits_words_into_symbols() {
        let tokens = tokenize("xy + 2").unwrap();
        assert_eq!(symbols(&tokens).len(), 2);
    }

    #[test]
    fn deep_nesting_is_refused() {
        let text = format!("{}x{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(parse(&text), None);
    }
}
