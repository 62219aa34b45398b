use logos::{Logos, SpannedIter};

pub(super) struct Token {
    pub(super) kind: TokenKind,
    pub(super) span: logos::Span,
}

pub(super) struct TokenIter<'a> {
    iter: SpannedIter<'a, LogosTokenKind>,
}

impl<'a> TokenIter<'a> {
    pub(super) fn new(input: &'a str) -> Self {
        Self {
            iter: LogosTokenKind::lexer(input).spanned(),
        }
    }
}

impl<'a> Iterator for TokenIter<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let (kind, span) = match self.iter.next()? {
            (Ok(LogosTokenKind::LParen), span) => (TokenKind::LParen, span),
            (Ok(LogosTokenKind::RParen), span) => (TokenKind::RParen, span),
            // The span of a quoted string excludes the quotes, escapes are kept as written
            (Ok(LogosTokenKind::QuotedString), span) => {
                (TokenKind::String, (span.start + 1)..(span.end - 1))
            }
            (Ok(LogosTokenKind::Atom), span) => (TokenKind::String, span),
            (Ok(LogosTokenKind::WS), _) => unreachable!(),
            (Err(_), span) => (TokenKind::Error, span),
        };
        Some(Token { kind, span })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum TokenKind {
    LParen,
    RParen,
    String,
    Error,
}

#[derive(Logos, Clone, Copy, Debug, PartialEq, Eq)]
enum LogosTokenKind {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[regex(r#""([^"\\]|\\.)*""#)]
    QuotedString,
    #[regex(r#"[^"() \t\r\f\n]+"#)]
    Atom,
    #[regex(r"[ \t\r\f\n]+", logos::skip)]
    WS,
}
