use std::iter::Peekable;

use crate::error::ParseError;

use super::{
    lexer::{Token, TokenIter, TokenKind},
    SExpr,
};

pub(super) struct Parser<'a> {
    input: &'a str,
    iter: Peekable<TokenIter<'a>>,
}

pub type Span = logos::Span;

/// An S-expression that remembers where each node sits in its source text.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ParsedSExpr {
    SExpr {
        label: Span,
        /// From the opening to the closing parenthesis, inclusive
        span: Span,
        children: Vec<ParsedSExpr>,
    },
    String(Span),
}

impl ParsedSExpr {
    pub fn span(&self) -> Span {
        match self {
            ParsedSExpr::SExpr { span, .. } => span.clone(),
            ParsedSExpr::String(span) => span.clone(),
        }
    }

    pub fn label<'a>(&self, input: &'a str) -> Option<&'a str> {
        match self {
            ParsedSExpr::SExpr { label, .. } => Some(&input[label.clone()]),
            ParsedSExpr::String(_) => None,
        }
    }

    pub fn children(&self) -> &[ParsedSExpr] {
        match self {
            ParsedSExpr::SExpr { children, .. } => children,
            ParsedSExpr::String(_) => &[],
        }
    }

    /// The first bare or quoted string directly inside this expression
    pub fn first_string(&self) -> Option<Span> {
        self.children().iter().find_map(|child| match child {
            ParsedSExpr::String(span) => Some(span.clone()),
            ParsedSExpr::SExpr { .. } => None,
        })
    }

    pub fn into_sexpr(self, input: &str) -> SExpr {
        match self {
            ParsedSExpr::SExpr {
                label, children, ..
            } => {
                let label = &input[label];
                let children: Box<[SExpr]> =
                    children.into_iter().map(|c| c.into_sexpr(input)).collect();
                SExpr::SExpr(label, children)
            }
            ParsedSExpr::String(span) => SExpr::String(&input[span]),
        }
    }
}

impl<'a> Parser<'a> {
    pub(super) fn new(input: &'a str) -> Self {
        Self {
            input,
            iter: TokenIter::new(input).peekable(),
        }
    }

    fn eof(&self) -> ParseError {
        let end = self.input.len();
        ParseError::UnexpectedEof { at: end..end }
    }

    fn get(&mut self) -> Result<Token, ParseError> {
        self.iter.next().ok_or_else(|| self.eof())
    }

    fn peek(&mut self) -> Option<TokenKind> {
        self.iter.peek().map(|tok| tok.kind)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        let tok = self.get()?;
        if tok.kind == kind {
            Ok(tok)
        } else {
            Err(ParseError::UnexpectedToken {
                expected: format!("{:?}", kind),
                found: format!("{:?}", tok.kind),
                at: tok.span.clone(),
            })
        }
    }

    pub(super) fn at_end(&mut self) -> bool {
        self.peek().is_none()
    }

    pub(super) fn expect_end(&mut self) -> Result<(), ParseError> {
        match self.iter.next() {
            None => Ok(()),
            Some(tok) => Err(ParseError::TrailingInput { at: tok.span }),
        }
    }

    pub(super) fn parse_sexpr(&mut self) -> Result<ParsedSExpr, ParseError> {
        let open = self.expect(TokenKind::LParen)?;
        let label = self.expect(TokenKind::String)?;

        let mut children = Vec::new();
        loop {
            match self.peek() {
                Some(TokenKind::RParen) => {
                    let close = self.get()?;
                    break Ok(ParsedSExpr::SExpr {
                        label: label.span.clone(),
                        span: open.span.start..close.span.end,
                        children,
                    });
                }
                Some(TokenKind::LParen) => {
                    children.push(self.parse_sexpr()?);
                }
                Some(TokenKind::String) => {
                    children.push(ParsedSExpr::String(self.get()?.span.clone()));
                }
                Some(TokenKind::Error) => {
                    let tok = self.get()?;
                    break Err(ParseError::UnknownToken {
                        found: self.input[tok.span.clone()].to_owned(),
                        at: tok.span,
                    });
                }
                None => break Err(self.eof()),
            }
        }
    }
}

impl<'a> TryFrom<&'a str> for SExpr<'a> {
    type Error = ParseError;

    fn try_from(input: &'a str) -> Result<Self, Self::Error> {
        let mut parser = Parser::new(input);
        let sexpr = parser.parse_sexpr()?;
        parser.expect_end()?;
        let sexpr = sexpr.into_sexpr(input);
        Ok(sexpr)
    }
}
