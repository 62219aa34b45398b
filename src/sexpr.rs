use std::fmt::Display;

use crate::error::ParseError;

mod lexer;
mod parser;

pub use parser::{ParsedSExpr, Span};

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SExpr<'a> {
    SExpr(&'a str, Box<[SExpr<'a>]>),
    String(&'a str),
}

impl<'a> Display for SExpr<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SExpr::SExpr(label, children) => {
                write!(f, "({}", label)?;
                for child in children.iter() {
                    write!(f, " {}", child)?;
                }
                write!(f, ")")
            }
            SExpr::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl<'a> SExpr<'a> {
    /// All strings directly inside this expression, in order
    pub fn strings<'b>(&'b self) -> impl Iterator<Item = &'a str> + 'b {
        let children: &'b [SExpr<'a>] = match self {
            SExpr::String(_) => &[],
            SExpr::SExpr(_, children) => children,
        };
        children.iter().filter_map(|child| match child {
            SExpr::String(s) => Some(*s),
            SExpr::SExpr(_, _) => None,
        })
    }

    pub fn children<'b, 'c>(&'b self, label: &'c str) -> LabeledChildIterator<'a, 'b, 'c> {
        let iter = match self {
            SExpr::String(_) => None,
            SExpr::SExpr(_, children) => Some(children.iter()),
        };
        LabeledChildIterator { iter, label }
    }

    pub fn child<'b>(&self, label: &'b str) -> Result<&SExpr<'a>, ParseError> {
        let mut iter = self.children(label);
        iter.next()
            .ok_or(ParseError::MissingChild(label.to_owned()))
    }
}

#[derive(Debug)]
pub struct LabeledChildIterator<'a, 'b, 'c> {
    iter: Option<std::slice::Iter<'b, SExpr<'a>>>,
    label: &'c str,
}

impl<'a, 'b, 'c> Iterator for LabeledChildIterator<'a, 'b, 'c> {
    type Item = &'b SExpr<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let iter = self.iter.as_mut()?;
        loop {
            let item = iter.next();
            match &item {
                None => return None,
                Some(SExpr::String(_)) => continue,
                Some(SExpr::SExpr(label, _)) => {
                    if *label == self.label {
                        return item;
                    }
                }
            }
        }
    }
}

/// Parses exactly one expression, surrounded by nothing but whitespace.
pub fn parse_spanned(input: &str) -> Result<ParsedSExpr, ParseError> {
    let mut parser = parser::Parser::new(input);
    let root = parser.parse_sexpr()?;
    parser.expect_end()?;
    Ok(root)
}

/// Parses a run of zero or more sibling expressions, such as the body of a
/// captured symbol template.
pub fn parse_sequence(input: &str) -> Result<Vec<ParsedSExpr>, ParseError> {
    let mut parser = parser::Parser::new(input);
    let mut items = Vec::new();
    while !parser.at_end() {
        items.push(parser.parse_sexpr()?);
    }
    Ok(items)
}

/// Canonical single-line form of a run of expressions.
///
/// Whitespace between tokens and the quoting of bare atoms are not
/// significant, string contents are kept exactly as written.
pub fn canonical(input: &str) -> Result<String, ParseError> {
    let items = parse_sequence(input)?;
    let printed: Vec<String> = items
        .into_iter()
        .map(|item| item.into_sexpr(input).to_string())
        .collect();
    Ok(printed.join(" "))
}

/// Escapes a value for use inside a quoted string.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

/// A value written bare when it lexes as a single atom, quoted otherwise
pub fn atom(value: &str) -> String {
    let bare = !value.is_empty()
        && !value
            .chars()
            .any(|c| matches!(c, '"' | '(' | ')' | ' ' | '\t' | '\r' | '\n' | '\x0c'));
    if bare {
        value.to_owned()
    } else {
        format!("\"{}\"", escape(value))
    }
}

/// Reverses [`escape`] for a string as it appears between quotes.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
