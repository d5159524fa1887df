use logos::{Lexer, Logos};

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\f]+")]
#[logos(skip r"\\\r?\n")]
pub enum Token {
    // Keywords
    #[token("class")]
    Class,
    #[token("def")]
    Def,
    #[token("async")]
    Async,
    #[token("import")]
    Import,
    #[token("from")]
    From,
    #[token("as")]
    As,
    #[token("pass")]
    Pass,
    #[token("None")]
    None,
    #[token("True")]
    True,
    #[token("False")]
    False,

    // Literals
    #[regex(r"0[xXoObB][0-9a-fA-F_]+|[0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9]+)?j?")]
    Number,

    #[regex(r#"[rRbBuUfF]?[rRbBuUfF]?"([^"\\\n]|\\.)*""#, |lex| Some(quoted(lex.slice(), 1)))]
    #[regex(r#"[rRbBuUfF]?[rRbBuUfF]?'([^'\\\n]|\\.)*'"#, |lex| Some(quoted(lex.slice(), 1)))]
    #[regex(r#"[rRbBuUfF]?[rRbBuUfF]?""""#, |lex| triple_quoted(lex, "\"\"\""))]
    #[regex(r#"[rRbBuUfF]?[rRbBuUfF]?'''"#, |lex| triple_quoted(lex, "'''"))]
    StringLit(String),

    // Identifiers
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("->")]
    Arrow,
    #[token("...")]
    Ellipsis,
    #[token(".")]
    Dot,
    #[token("=")]
    Eq,
    #[token("**")]
    StarStar,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("|")]
    Pipe,
    #[token("@")]
    At,

    // Operators that never matter outside skipped bodies
    #[regex(r"[+\-%<>!&^~;?$`]")]
    #[regex(r"[^\x00-\x7F]")]
    Other,

    #[token("\n")]
    Newline,

    #[regex(r"#[^\n]*")]
    Comment,
}

/// Strip an optional prefix plus `quote_len` quote chars from both ends.
fn quoted(slice: &str, quote_len: usize) -> String {
    let body_start = slice
        .find(|c| c == '"' || c == '\'')
        .map_or(0, |i| i + quote_len);
    let body_end = slice.len().saturating_sub(quote_len).max(body_start);
    slice[body_start..body_end].to_string()
}

/// Consume up to the matching closing triple quote; unterminated strings are a lex error.
fn triple_quoted(lex: &mut Lexer<'_, Token>, close: &str) -> Option<String> {
    let rest = lex.remainder();
    let end = rest.find(close)?;
    let body = rest[..end].to_string();
    lex.bump(end + close.len());
    Some(body)
}

impl Token {
    pub fn opens_bracket(&self) -> bool {
        matches!(self, Token::LParen | Token::LBracket | Token::LBrace)
    }

    pub fn closes_bracket(&self) -> bool {
        matches!(self, Token::RParen | Token::RBracket | Token::RBrace)
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Class => write!(f, "'class'"),
            Token::Def => write!(f, "'def'"),
            Token::Async => write!(f, "'async'"),
            Token::Import => write!(f, "'import'"),
            Token::From => write!(f, "'from'"),
            Token::As => write!(f, "'as'"),
            Token::Pass => write!(f, "'pass'"),
            Token::None => write!(f, "'None'"),
            Token::True => write!(f, "'True'"),
            Token::False => write!(f, "'False'"),
            Token::Number => write!(f, "number"),
            Token::StringLit(_) => write!(f, "string"),
            Token::Ident => write!(f, "identifier"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::Comma => write!(f, "','"),
            Token::Colon => write!(f, "':'"),
            Token::Arrow => write!(f, "'->'"),
            Token::Ellipsis => write!(f, "'...'"),
            Token::Dot => write!(f, "'.'"),
            Token::Eq => write!(f, "'='"),
            Token::StarStar => write!(f, "'**'"),
            Token::Star => write!(f, "'*'"),
            Token::Slash => write!(f, "'/'"),
            Token::Pipe => write!(f, "'|'"),
            Token::At => write!(f, "'@'"),
            Token::Other => write!(f, "operator"),
            Token::Newline => write!(f, "newline"),
            Token::Comment => write!(f, "comment"),
        }
    }
}
