pub mod token;

use logos::Logos;
use crate::span::{Span, Spanned};
use crate::diagnostics::CheckError;
use token::Token;

/// One logical source line: newlines inside brackets and after a backslash are joined.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Indentation width of the first token (tabs advance to the next multiple of 8).
    pub indent: usize,
    pub tokens: Vec<Spanned<Token>>,
}

impl Line {
    pub fn span(&self) -> Span {
        match (self.tokens.first(), self.tokens.last()) {
            (Some(first), Some(last)) => first.span.to(last.span),
            _ => Span::dummy(),
        }
    }
}

pub fn lex(source: &str) -> Result<Vec<Spanned<Token>>, CheckError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(Token::Comment) => continue,
            Ok(tok) => tokens.push(Spanned::new(tok, Span::new(span.start, span.end))),
            Err(()) => {
                let found = source.get(span.start..span.end).unwrap_or("");
                let msg = if found.starts_with(['"', '\'']) || found.ends_with(['"', '\'']) {
                    "unterminated string literal".to_string()
                } else {
                    format!("unexpected character '{found}'")
                };
                return Err(CheckError::syntax(msg, Span::new(span.start, span.end)));
            }
        }
    }

    Ok(tokens)
}

/// Lex `source` and group the tokens into logical lines.
pub fn lex_lines(source: &str) -> Result<Vec<Line>, CheckError> {
    let tokens = lex(source)?;
    let mut lines = Vec::new();
    let mut current: Vec<Spanned<Token>> = Vec::new();
    let mut depth = 0usize;

    for tok in tokens {
        if matches!(tok.node, Token::Newline) {
            if depth == 0 && !current.is_empty() {
                let indent = indent_of(source, current[0].span.start);
                lines.push(Line { indent, tokens: std::mem::take(&mut current) });
            }
            continue;
        }
        if tok.node.opens_bracket() {
            depth += 1;
        } else if tok.node.closes_bracket() {
            depth = depth.saturating_sub(1);
        }
        current.push(tok);
    }
    if !current.is_empty() {
        let indent = indent_of(source, current[0].span.start);
        lines.push(Line { indent, tokens: current });
    }

    Ok(lines)
}

fn indent_of(source: &str, offset: usize) -> usize {
    let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    let mut width = 0;
    for c in source[line_start..offset].chars() {
        match c {
            '\t' => width = (width / 8 + 1) * 8,
            _ => width += 1,
        }
    }
    width
}
