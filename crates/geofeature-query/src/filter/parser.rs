//! Recursive-descent parser for the CQL-like filter language.
//!
//! ```text
//! expr      := and_expr ( OR and_expr )*
//! and_expr  := unary ( AND unary )*
//! unary     := NOT unary | '(' expr ')' | predicate
//! predicate := ident cmp literal
//!            | ident [NOT] LIKE string | ident [NOT] ILIKE string
//!            | ident [NOT] BETWEEN literal AND literal
//!            | ident [NOT] IN '(' literal (',' literal)* ')'
//!            | ident IS [NOT] NULL
//! literal   := string | number | TRUE | FALSE
//! ```

use super::ast::{FilterExpr, Literal};
use super::lexer::{tokenize, Spanned, Token};
use crate::error::{FeatureError, Result};

const RESERVED_WORDS: &[&str] = &[
    "AND", "OR", "NOT", "LIKE", "ILIKE", "BETWEEN", "IN", "IS", "NULL", "TRUE", "FALSE",
];

/// Parse filter text. Blank text means "no filter".
pub fn parse_filter(input: &str) -> Result<Option<FilterExpr>> {
    if input.trim().is_empty() {
        return Ok(None);
    }

    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: input.len(),
    };

    let expr = parser.parse_or()?;

    if let Some(extra) = parser.peek() {
        return Err(FeatureError::filter_syntax(
            extra.position,
            "unexpected input after expression",
        ));
    }

    Ok(Some(expr))
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn position(&self) -> usize {
        self.peek().map(|t| t.position).unwrap_or(self.end)
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T> {
        Err(FeatureError::filter_syntax(self.position(), message))
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Spanned { token: Token::Word(w), .. }) if w.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            self.error(format!("expected {}", keyword))
        }
    }

    fn expect(&mut self, expected: Token, label: &str) -> Result<()> {
        match self.peek() {
            Some(t) if t.token == expected => {
                self.pos += 1;
                Ok(())
            }
            _ => self.error(format!("expected {}", label)),
        }
    }

    fn parse_or(&mut self) -> Result<FilterExpr> {
        let mut children = vec![self.parse_and()?];
        while self.eat_keyword("OR") {
            children.push(self.parse_and()?);
        }

        Ok(if children.len() == 1 {
            children.remove(0)
        } else {
            FilterExpr::Or(children)
        })
    }

    fn parse_and(&mut self) -> Result<FilterExpr> {
        let mut children = vec![self.parse_unary()?];
        while self.eat_keyword("AND") {
            children.push(self.parse_unary()?);
        }

        Ok(if children.len() == 1 {
            children.remove(0)
        } else {
            FilterExpr::And(children)
        })
    }

    fn parse_unary(&mut self) -> Result<FilterExpr> {
        if self.eat_keyword("NOT") {
            return Ok(FilterExpr::Not(Box::new(self.parse_unary()?)));
        }

        if matches!(self.peek(), Some(Spanned { token: Token::LParen, .. })) {
            self.pos += 1;
            let inner = self.parse_or()?;
            self.expect(Token::RParen, "')'")?;
            return Ok(inner);
        }

        self.parse_predicate()
    }

    fn parse_identifier(&mut self) -> Result<String> {
        match self.peek().map(|t| t.token.clone()) {
            Some(Token::QuotedIdent(name)) => {
                self.pos += 1;
                Ok(name)
            }
            Some(Token::Word(word))
                if !RESERVED_WORDS
                    .iter()
                    .any(|r| r.eq_ignore_ascii_case(&word)) =>
            {
                // Unquoted identifiers fold to lower case
                self.pos += 1;
                Ok(word.to_lowercase())
            }
            _ => self.error("expected column name"),
        }
    }

    fn parse_predicate(&mut self) -> Result<FilterExpr> {
        let column = self.parse_identifier()?;

        if let Some(Spanned {
            token: Token::Op(op),
            ..
        }) = self.peek().cloned()
        {
            self.pos += 1;
            let value = self.parse_literal()?;
            return Ok(FilterExpr::Comparison { column, op, value });
        }

        if self.eat_keyword("IS") {
            let negated = self.eat_keyword("NOT");
            self.expect_keyword("NULL")?;
            return Ok(FilterExpr::IsNull { column, negated });
        }

        let negated = self.eat_keyword("NOT");

        if self.peek_keyword("LIKE") || self.peek_keyword("ILIKE") {
            let case_insensitive = self.peek_keyword("ILIKE");
            self.pos += 1;
            let pattern = match self.peek().map(|t| t.token.clone()) {
                Some(Token::String(s)) => s,
                _ => return self.error("expected string pattern"),
            };
            self.pos += 1;
            return Ok(FilterExpr::Like {
                column,
                pattern,
                case_insensitive,
                negated,
            });
        }

        if self.eat_keyword("BETWEEN") {
            let low = self.parse_literal()?;
            self.expect_keyword("AND")?;
            let high = self.parse_literal()?;
            return Ok(FilterExpr::Between {
                column,
                low,
                high,
                negated,
            });
        }

        if self.eat_keyword("IN") {
            self.expect(Token::LParen, "'('")?;
            let mut values = vec![self.parse_literal()?];
            while matches!(self.peek(), Some(Spanned { token: Token::Comma, .. })) {
                self.pos += 1;
                values.push(self.parse_literal()?);
            }
            self.expect(Token::RParen, "')'")?;
            return Ok(FilterExpr::In {
                column,
                values,
                negated,
            });
        }

        if negated {
            self.error("expected LIKE, ILIKE, BETWEEN or IN after NOT")
        } else {
            self.error("expected comparison operator")
        }
    }

    fn parse_literal(&mut self) -> Result<Literal> {
        let literal = match self.peek().map(|t| t.token.clone()) {
            Some(Token::String(s)) => Literal::String(s),
            Some(Token::Number(n)) => Literal::Number(n),
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("TRUE") => Literal::Boolean(true),
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("FALSE") => Literal::Boolean(false),
            _ => return self.error("expected literal value"),
        };
        self.pos += 1;
        Ok(literal)
    }
}
