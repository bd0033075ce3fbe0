//! Tokenizer for the filter language.

use super::ast::ComparisonOp;
use crate::error::{FeatureError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Bare word: identifier or keyword, decided by the parser
    Word(String),
    /// Double-quoted identifier, never a keyword
    QuotedIdent(String),
    String(String),
    Number(String),
    Op(ComparisonOp),
    LParen,
    RParen,
    Comma,
}

/// A token and the byte offset it starts at
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

pub fn tokenize(input: &str) -> Result<Vec<Spanned>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];

        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let start = pos;
        let token = match c {
            b'(' => {
                pos += 1;
                Token::LParen
            }
            b')' => {
                pos += 1;
                Token::RParen
            }
            b',' => {
                pos += 1;
                Token::Comma
            }
            b'=' => {
                pos += 1;
                Token::Op(ComparisonOp::Eq)
            }
            b'!' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    pos += 2;
                    Token::Op(ComparisonOp::NotEq)
                } else {
                    return Err(FeatureError::filter_syntax(start, "expected '=' after '!'"));
                }
            }
            b'<' => match bytes.get(pos + 1) {
                Some(b'=') => {
                    pos += 2;
                    Token::Op(ComparisonOp::LtEq)
                }
                Some(b'>') => {
                    pos += 2;
                    Token::Op(ComparisonOp::NotEq)
                }
                _ => {
                    pos += 1;
                    Token::Op(ComparisonOp::Lt)
                }
            },
            b'>' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    pos += 2;
                    Token::Op(ComparisonOp::GtEq)
                } else {
                    pos += 1;
                    Token::Op(ComparisonOp::Gt)
                }
            }
            b'\'' => {
                let (text, next) = read_quoted(input, pos, b'\'')
                    .ok_or_else(|| FeatureError::filter_syntax(start, "unterminated string"))?;
                pos = next;
                Token::String(text)
            }
            b'"' => {
                let (text, next) = read_quoted(input, pos, b'"').ok_or_else(|| {
                    FeatureError::filter_syntax(start, "unterminated quoted identifier")
                })?;
                if text.is_empty() {
                    return Err(FeatureError::filter_syntax(start, "empty quoted identifier"));
                }
                pos = next;
                Token::QuotedIdent(text)
            }
            b'-' | b'.' | b'0'..=b'9' => {
                let end = scan_number(bytes, pos)
                    .ok_or_else(|| FeatureError::filter_syntax(start, "malformed number"))?;
                let text = &input[pos..end];
                pos = end;
                Token::Number(text.to_string())
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let end = bytes[pos..]
                    .iter()
                    .position(|b| !(b.is_ascii_alphanumeric() || *b == b'_'))
                    .map(|offset| pos + offset)
                    .unwrap_or(bytes.len());
                let word = &input[pos..end];
                pos = end;
                Token::Word(word.to_string())
            }
            _ => {
                let ch = input[pos..].chars().next().unwrap_or('?');
                return Err(FeatureError::filter_syntax(
                    start,
                    format!("unexpected character '{}'", ch),
                ));
            }
        };

        tokens.push(Spanned {
            token,
            position: start,
        });
    }

    Ok(tokens)
}

/// Read a quoted run starting at `start` (which holds the quote byte).
/// A doubled quote inside the run stands for one literal quote.
fn read_quoted(input: &str, start: usize, quote: u8) -> Option<(String, usize)> {
    let bytes = input.as_bytes();
    let mut out = String::new();
    let mut pos = start + 1;
    let mut run_start = pos;

    while pos < bytes.len() {
        if bytes[pos] == quote {
            out.push_str(&input[run_start..pos]);
            if bytes.get(pos + 1) == Some(&quote) {
                out.push(quote as char);
                pos += 2;
                run_start = pos;
                continue;
            }
            return Some((out, pos + 1));
        }
        pos += 1;
    }

    None
}

/// `-?digits[.digits][(e|E)[+-]digits]`, also `.5`; returns the end offset
fn scan_number(bytes: &[u8], start: usize) -> Option<usize> {
    let mut pos = start;
    if bytes.get(pos) == Some(&b'-') {
        pos += 1;
    }

    let int_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    let mut digits = pos - int_start;

    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        let frac_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        digits += pos - frac_start;
    }

    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(pos), Some(b'e') | Some(b'E')) {
        let mut exp = pos + 1;
        if matches!(bytes.get(exp), Some(b'+') | Some(b'-')) {
            exp += 1;
        }
        let exp_digits = exp;
        while exp < bytes.len() && bytes[exp].is_ascii_digit() {
            exp += 1;
        }
        if exp == exp_digits {
            return None;
        }
        pos = exp;
    }

    // "12abc" is not a number followed by a word
    if matches!(bytes.get(pos), Some(b) if b.is_ascii_alphabetic() || *b == b'_') {
        return None;
    }

    Some(pos)
}
