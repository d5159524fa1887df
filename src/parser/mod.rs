pub mod ast;

use crate::diagnostics::CheckError;
use crate::lexer::{self, Line, token::Token};
use crate::span::{Span, Spanned};
use ast::*;

/// Lex and parse one source file into its declaration skeleton.
///
/// Only declarations matter to the checker: imports, classes (bases, attribute
/// annotations, method signatures), module-level functions, `TypeVar`s and
/// assignments. Function bodies and all other statements are skipped by
/// indentation, except that `self.x: T` annotations inside method bodies are
/// collected as class attributes.
pub fn parse_module(source: &str) -> Result<Module, CheckError> {
    let lines = lexer::lex_lines(source)?;
    Parser::new(&lines, source).parse_module()
}

/// Parse a standalone type expression (e.g. the contents of a forward reference).
pub fn parse_type_str(source: &str) -> Result<Spanned<TypeExpr>, CheckError> {
    let tokens: Vec<_> = lexer::lex(source)?
        .into_iter()
        .filter(|t| !matches!(t.node, Token::Newline))
        .collect();
    let mut c = Cursor::new(&tokens, source);
    let ty = parse_type(&mut c)?;
    c.expect_end()?;
    Ok(ty)
}

/// Token cursor over one logical line, or a slice of one.
struct Cursor<'a> {
    tokens: &'a [Spanned<Token>],
    source: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(tokens: &'a [Spanned<Token>], source: &'a str) -> Self {
        Self { tokens, source, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Spanned<Token>> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Spanned<Token>> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, expected: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(&t.node) == std::mem::discriminant(expected))
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.at(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn is_done(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn rest(&self) -> &'a [Spanned<Token>] {
        &self.tokens[self.pos.min(self.tokens.len())..]
    }

    fn text(&self, tok: &Spanned<Token>) -> &'a str {
        &self.source[tok.span.start..tok.span.end]
    }

    fn eol_span(&self) -> Span {
        match self.tokens.last() {
            Some(last) => Span::new(last.span.end, last.span.end),
            None => Span::dummy(),
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<&'a Spanned<Token>, CheckError> {
        match self.peek() {
            Some(tok) if std::mem::discriminant(&tok.node) == std::mem::discriminant(expected) => {
                self.pos += 1;
                Ok(tok)
            }
            Some(tok) => Err(CheckError::syntax(
                format!("expected {expected}, found {}", tok.node),
                tok.span,
            )),
            None => Err(CheckError::syntax(
                format!("expected {expected}, found end of line"),
                self.eol_span(),
            )),
        }
    }

    fn expect_ident(&mut self) -> Result<Spanned<String>, CheckError> {
        match self.peek() {
            Some(tok) if matches!(tok.node, Token::Ident) => {
                self.pos += 1;
                Ok(Spanned::new(self.text(tok).to_string(), tok.span))
            }
            Some(tok) => Err(CheckError::syntax(
                format!("expected identifier, found {}", tok.node),
                tok.span,
            )),
            None => Err(CheckError::syntax(
                "expected identifier, found end of line",
                self.eol_span(),
            )),
        }
    }

    /// `ident (. ident)*`
    fn dotted_name(&mut self) -> Result<Spanned<String>, CheckError> {
        let first = self.expect_ident()?;
        let mut name = first.node;
        let mut span = first.span;
        while self.at(&Token::Dot) && self.tokens.get(self.pos + 1).is_some_and(|t| matches!(t.node, Token::Ident)) {
            self.pos += 1;
            let seg = self.expect_ident()?;
            name.push('.');
            name.push_str(&seg.node);
            span = span.to(seg.span);
        }
        Ok(Spanned::new(name, span))
    }

    fn expect_end(&self) -> Result<(), CheckError> {
        match self.peek() {
            None => Ok(()),
            Some(tok) => Err(CheckError::syntax(format!("unexpected {}", tok.node), tok.span)),
        }
    }
}

/// Split `tokens` (which start just after an opening bracket) on top-level commas
/// up to the matching `close`. Returns the groups and the index of `close`.
fn split_top_level<'a>(
    tokens: &'a [Spanned<Token>],
    close: &Token,
) -> Option<(Vec<&'a [Spanned<Token>]>, usize)> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, tok) in tokens.iter().enumerate() {
        if depth == 0 && std::mem::discriminant(&tok.node) == std::mem::discriminant(close) {
            if i > start {
                groups.push(&tokens[start..i]);
            }
            return Some((groups, i));
        }
        if tok.node.opens_bracket() {
            depth += 1;
        } else if tok.node.closes_bracket() {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && matches!(tok.node, Token::Comma) {
            if i > start {
                groups.push(&tokens[start..i]);
            }
            start = i + 1;
        }
    }
    None
}

fn group_span(group: &[Spanned<Token>]) -> Span {
    match (group.first(), group.last()) {
        (Some(first), Some(last)) => first.span.to(last.span),
        _ => Span::dummy(),
    }
}

/// `name=value` inside a call or class header.
fn is_keyword_arg(group: &[Spanned<Token>]) -> bool {
    group.len() >= 2 && matches!(group[0].node, Token::Ident) && matches!(group[1].node, Token::Eq)
}

/// Statement keywords our lexer treats as plain identifiers.
fn is_statement_keyword(s: &str) -> bool {
    matches!(
        s,
        "if" | "elif" | "else" | "for" | "while" | "try" | "except" | "finally" | "with"
            | "return" | "raise" | "del" | "global" | "nonlocal" | "assert" | "yield"
            | "lambda" | "not" | "and" | "or" | "in" | "is" | "await" | "break"
            | "continue" | "match" | "case" | "type"
    )
}

fn parse_type(c: &mut Cursor<'_>) -> Result<Spanned<TypeExpr>, CheckError> {
    let first = parse_type_atom(c)?;
    if !c.at(&Token::Pipe) {
        return Ok(first);
    }
    let mut items = vec![first];
    while c.eat(&Token::Pipe) {
        items.push(parse_type_atom(c)?);
    }
    let span = items[0].span.to(items[items.len() - 1].span);
    Ok(Spanned::new(TypeExpr::Union(items), span))
}

fn parse_type_atom(c: &mut Cursor<'_>) -> Result<Spanned<TypeExpr>, CheckError> {
    let Some(tok) = c.peek() else {
        return Err(CheckError::syntax("expected type, found end of line", c.eol_span()));
    };
    match &tok.node {
        Token::None => {
            c.advance();
            Ok(Spanned::new(TypeExpr::None, tok.span))
        }
        Token::Ellipsis => {
            c.advance();
            Ok(Spanned::new(TypeExpr::Ellipsis, tok.span))
        }
        Token::StringLit(s) => {
            c.advance();
            Ok(Spanned::new(TypeExpr::Str(s.trim().to_string()), tok.span))
        }
        Token::Number | Token::True | Token::False => {
            c.advance();
            Ok(Spanned::new(TypeExpr::Literal(c.text(tok).to_string()), tok.span))
        }
        Token::LBracket => {
            c.advance();
            let items = parse_type_list(c, &Token::RBracket)?;
            let close = c.expect(&Token::RBracket)?;
            Ok(Spanned::new(TypeExpr::List(items), tok.span.to(close.span)))
        }
        Token::Ident => {
            let name = c.dotted_name()?;
            if c.eat(&Token::LBracket) {
                let args = parse_type_list(c, &Token::RBracket)?;
                let close = c.expect(&Token::RBracket)?;
                Ok(Spanned::new(
                    TypeExpr::Subscript { base: name.node, args },
                    name.span.to(close.span),
                ))
            } else {
                Ok(Spanned::new(TypeExpr::Name(name.node), name.span))
            }
        }
        other => Err(CheckError::syntax(format!("expected type, found {other}"), tok.span)),
    }
}

fn parse_type_list(c: &mut Cursor<'_>, close: &Token) -> Result<Vec<Spanned<TypeExpr>>, CheckError> {
    let mut items = Vec::new();
    loop {
        if c.at(close) {
            break;
        }
        items.push(parse_type(c)?);
        if !c.eat(&Token::Comma) {
            break;
        }
    }
    Ok(items)
}

/// Parse the rest of the cursor as one type expression, or give up.
fn parse_whole_type(c: &mut Cursor<'_>) -> Option<Spanned<TypeExpr>> {
    let ty = parse_type(c).ok()?;
    c.is_done().then_some(ty)
}

pub struct Parser<'a> {
    lines: &'a [Line],
    source: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(lines: &'a [Line], source: &'a str) -> Self {
        Self { lines, source, pos: 0 }
    }

    pub fn parse_module(&mut self) -> Result<Module, CheckError> {
        let mut items = Vec::new();
        while self.pos < self.lines.len() {
            self.parse_top_level(&mut items)?;
        }
        Ok(Module { items })
    }

    fn skip_block(&mut self, indent: usize) {
        while self.pos < self.lines.len() && self.lines[self.pos].indent > indent {
            self.pos += 1;
        }
    }

    /// Skip the current line and everything nested under it.
    fn skip_statement(&mut self) {
        let indent = self.lines[self.pos].indent;
        self.pos += 1;
        self.skip_block(indent);
    }

    fn parse_top_level(&mut self, items: &mut Vec<Item>) -> Result<(), CheckError> {
        let lines = self.lines;
        let line = &lines[self.pos];
        let first = &line.tokens[0];
        match first.node {
            Token::At => {
                let decorators = self.parse_decorators()?;
                match lines.get(self.pos).map(|l| &l.tokens[0].node) {
                    Some(Token::Class) => items.push(Item::Class(self.parse_class(decorators)?)),
                    Some(Token::Def) | Some(Token::Async) => {
                        let (func, _) = self.parse_function(decorators)?;
                        items.push(Item::Function(func));
                    }
                    _ => {
                        let span = decorators.last().map_or(first.span, |d| d.span);
                        return Err(CheckError::syntax("expected 'class' or 'def' after decorator", span));
                    }
                }
            }
            Token::Class => items.push(Item::Class(self.parse_class(Vec::new())?)),
            Token::Def | Token::Async => {
                let (func, _) = self.parse_function(Vec::new())?;
                items.push(Item::Function(func));
            }
            Token::Import | Token::From => {
                items.extend(self.parse_import(line)?.into_iter().map(Item::Import));
                self.skip_statement();
            }
            Token::Ident if self.is_type_checking_guard(line) => {
                self.pos += 1;
                while lines.get(self.pos).is_some_and(|l| l.indent > line.indent) {
                    self.parse_top_level(items)?;
                }
            }
            Token::Ident => {
                if let Some(item) = self.parse_assignment(line) {
                    items.push(item);
                }
                self.skip_statement();
            }
            _ => self.skip_statement(),
        }
        Ok(())
    }

    /// `if TYPE_CHECKING:` blocks hold declarations, so they are parsed, not skipped.
    fn is_type_checking_guard(&self, line: &Line) -> bool {
        self.text_of(&line.tokens[0]) == "if"
            && line.tokens.iter().any(|t| self.text_of(t) == "TYPE_CHECKING")
    }

    fn text_of(&self, tok: &Spanned<Token>) -> &'a str {
        &self.source[tok.span.start..tok.span.end]
    }

    fn parse_decorators(&mut self) -> Result<Vec<Spanned<Decorator>>, CheckError> {
        let lines = self.lines;
        let mut decorators = Vec::new();
        while let Some(line) = lines.get(self.pos) {
            if !matches!(line.tokens[0].node, Token::At) {
                break;
            }
            decorators.push(self.parse_decorator(line)?);
            self.pos += 1;
        }
        Ok(decorators)
    }

    fn parse_decorator(&self, line: &'a Line) -> Result<Spanned<Decorator>, CheckError> {
        let mut c = Cursor::new(&line.tokens, self.source);
        let at = c.expect(&Token::At)?;
        let callee = c.dotted_name()?;
        let args = if c.eat(&Token::LParen) {
            let (groups, close) = split_top_level(c.rest(), &Token::RParen)
                .ok_or_else(|| CheckError::syntax("unclosed '(' in decorator", at.span.to(callee.span)))?;
            c.pos += close + 1;
            Some(groups.into_iter().map(|g| self.call_arg(g)).collect())
        } else {
            None
        };
        c.expect_end()?;
        Ok(Spanned::new(Decorator { callee, args }, at.span.to(line.span())))
    }

    fn call_arg(&self, group: &[Spanned<Token>]) -> Spanned<Expr> {
        let span = group_span(group);
        if group.iter().all(|t| matches!(t.node, Token::StringLit(_))) {
            // Adjacent literals concatenate.
            let joined: String = group
                .iter()
                .filter_map(|t| match &t.node {
                    Token::StringLit(s) => Some(s.as_str()),
                    _ => None,
                })
                .collect();
            return Spanned::new(Expr::Str(joined), span);
        }
        let mut c = Cursor::new(group, self.source);
        match c.dotted_name() {
            Ok(name) if c.is_done() => Spanned::new(Expr::Name(name.node), span),
            _ => Spanned::new(Expr::Other, span),
        }
    }

    fn parse_class(&mut self, decorators: Vec<Spanned<Decorator>>) -> Result<Spanned<ClassDef>, CheckError> {
        let lines = self.lines;
        let line = &lines[self.pos];
        let mut c = Cursor::new(&line.tokens, self.source);
        let kw = c.expect(&Token::Class)?;
        let name = c.expect_ident()?;
        let mut bases = Vec::new();
        if c.eat(&Token::LParen) {
            let (groups, close) = split_top_level(c.rest(), &Token::RParen)
                .ok_or_else(|| CheckError::syntax("unclosed '(' in class bases", kw.span.to(name.span)))?;
            for group in groups {
                if is_keyword_arg(group) {
                    continue;
                }
                let mut gc = Cursor::new(group, self.source);
                let base = parse_type(&mut gc)?;
                gc.expect_end()?;
                bases.push(base);
            }
            c.pos += close + 1;
        }
        c.expect(&Token::Colon)?;
        let inline_body = !c.is_done();
        let span = kw.span.to(name.span);
        self.pos += 1;

        let mut class = ClassDef { name, decorators, bases, attrs: Vec::new(), methods: Vec::new() };
        if !inline_body {
            self.parse_class_body(line.indent, &mut class)?;
        }
        Ok(Spanned::new(class, span))
    }

    fn parse_class_body(&mut self, class_indent: usize, class: &mut ClassDef) -> Result<(), CheckError> {
        let lines = self.lines;
        while let Some(line) = lines.get(self.pos) {
            if line.indent <= class_indent {
                break;
            }
            match line.tokens[0].node {
                Token::At => {
                    let decorators = self.parse_decorators()?;
                    self.parse_method(decorators, class)?;
                }
                Token::Def | Token::Async => self.parse_method(Vec::new(), class)?,
                Token::Ident => {
                    if let Some(attr) = self.parse_attr_decl(&line.tokens) {
                        class.attrs.push(attr);
                    }
                    self.skip_statement();
                }
                _ => self.skip_statement(),
            }
        }
        Ok(())
    }

    fn parse_method(&mut self, decorators: Vec<Spanned<Decorator>>, class: &mut ClassDef) -> Result<(), CheckError> {
        let lines = self.lines;
        match lines.get(self.pos).map(|l| &l.tokens[0].node) {
            Some(Token::Def) | Some(Token::Async) => {
                let (func, self_attrs) = self.parse_function(decorators)?;
                class.methods.push(func);
                class.attrs.extend(self_attrs);
                Ok(())
            }
            Some(Token::Class) => {
                // Nested classes are not part of the outer class's attribute surface.
                self.skip_statement();
                Ok(())
            }
            _ => {
                let span = decorators.last().map_or(Span::dummy(), |d| d.span);
                Err(CheckError::syntax("expected 'def' after decorator", span))
            }
        }
    }

    fn parse_function(
        &mut self,
        decorators: Vec<Spanned<Decorator>>,
    ) -> Result<(Spanned<FuncDef>, Vec<AttrDecl>), CheckError> {
        let lines = self.lines;
        let line = &lines[self.pos];
        let mut c = Cursor::new(&line.tokens, self.source);
        c.eat(&Token::Async);
        let kw = c.expect(&Token::Def)?;
        let name = c.expect_ident()?;
        c.expect(&Token::LParen)?;
        let (groups, close) = split_top_level(c.rest(), &Token::RParen)
            .ok_or_else(|| CheckError::syntax("unclosed '(' in parameter list", kw.span.to(name.span)))?;
        let params = self.parse_params(&groups)?;
        c.pos += close + 1;
        let returns = if c.eat(&Token::Arrow) { Some(parse_type(&mut c)?) } else { None };
        c.expect(&Token::Colon)?;
        let inline_body = !c.is_done();
        let span = kw.span.to(name.span);
        self.pos += 1;

        let mut self_attrs = Vec::new();
        if !inline_body {
            let receiver = params.first().map(|p| p.name.node.as_str());
            while let Some(body_line) = lines.get(self.pos) {
                if body_line.indent <= line.indent {
                    break;
                }
                if let Some(attr) = receiver.and_then(|r| self.parse_receiver_attr(body_line, r)) {
                    self_attrs.push(attr);
                }
                self.pos += 1;
            }
        }

        Ok((Spanned::new(FuncDef { name, decorators, params, returns }, span), self_attrs))
    }

    fn parse_params(&self, groups: &[&'a [Spanned<Token>]]) -> Result<Vec<Param>, CheckError> {
        let mut params = Vec::new();
        let mut keyword_only = false;
        for group in groups {
            let mut c = Cursor::new(group, self.source);
            match group[0].node {
                // Positional-only marker; the parameters before it stay positional.
                Token::Slash if group.len() == 1 => {}
                Token::Star if group.len() == 1 => keyword_only = true,
                Token::Star | Token::StarStar => {
                    let kind = if c.eat(&Token::Star) {
                        ArgKind::Star
                    } else {
                        c.expect(&Token::StarStar)?;
                        ArgKind::Star2
                    };
                    let name = c.expect_ident()?;
                    let annotation = if c.eat(&Token::Colon) { Some(parse_type(&mut c)?) } else { None };
                    c.expect_end()?;
                    if kind == ArgKind::Star {
                        keyword_only = true;
                    }
                    params.push(Param { name, kind, annotation });
                }
                _ => {
                    let name = c.expect_ident()?;
                    let annotation = if c.eat(&Token::Colon) { Some(parse_type(&mut c)?) } else { None };
                    // Default values are never inspected.
                    let has_default = c.eat(&Token::Eq);
                    if !has_default {
                        c.expect_end()?;
                    }
                    let kind = match (keyword_only, has_default) {
                        (false, false) => ArgKind::Positional,
                        (false, true) => ArgKind::Optional,
                        (true, false) => ArgKind::Named,
                        (true, true) => ArgKind::NamedOpt,
                    };
                    params.push(Param { name, kind, annotation });
                }
            }
        }
        Ok(params)
    }

    /// `name: T [= value]`; anything else (or an unparsable annotation) is not an attribute.
    fn parse_attr_decl(&self, tokens: &'a [Spanned<Token>]) -> Option<AttrDecl> {
        let mut c = Cursor::new(tokens, self.source);
        let name = c.expect_ident().ok()?;
        if is_statement_keyword(&name.node) || !c.eat(&Token::Colon) {
            return None;
        }
        let annotation = parse_type(&mut c).ok()?;
        (c.is_done() || c.at(&Token::Eq)).then_some(AttrDecl { name, annotation })
    }

    /// `self.name: T [= value]` inside a method body.
    fn parse_receiver_attr(&self, line: &'a Line, receiver: &str) -> Option<AttrDecl> {
        let tokens = &line.tokens;
        if tokens.len() < 4
            || !matches!(tokens[0].node, Token::Ident)
            || self.text_of(&tokens[0]) != receiver
            || !matches!(tokens[1].node, Token::Dot)
        {
            return None;
        }
        self.parse_attr_decl(&tokens[2..])
    }

    fn parse_assignment(&self, line: &'a Line) -> Option<Item> {
        let mut c = Cursor::new(&line.tokens, self.source);
        let name = c.expect_ident().ok()?;
        if is_statement_keyword(&name.node) {
            return None;
        }
        let span = line.span();
        match c.peek()?.node {
            Token::Colon => {
                c.advance();
                let annotation = parse_type(&mut c).ok()?;
                let value = if c.eat(&Token::Eq) {
                    parse_whole_type(&mut c)
                } else if c.is_done() {
                    None
                } else {
                    return None;
                };
                Some(Item::Assign(Spanned::new(Assign { name, annotation: Some(annotation), value }, span)))
            }
            Token::Eq => {
                c.advance();
                if let Some(variance) = self.typevar_call(&c) {
                    return Some(Item::TypeVar(Spanned::new(TypeVarDecl { name, variance }, span)));
                }
                let value = parse_whole_type(&mut c);
                Some(Item::Assign(Spanned::new(Assign { name, annotation: None, value }, span)))
            }
            _ => None,
        }
    }

    /// `TypeVar("T", ..., covariant=True)` at the cursor; returns the declared variance.
    fn typevar_call(&self, c: &Cursor<'a>) -> Option<Variance> {
        let mut ahead = Cursor { tokens: c.tokens, source: c.source, pos: c.pos };
        let callee = ahead.dotted_name().ok()?;
        if callee.node.rsplit('.').next() != Some("TypeVar") || !ahead.at(&Token::LParen) {
            return None;
        }
        let rest = ahead.rest();
        let flag = |kw: &str| {
            rest.windows(3).any(|w| {
                matches!(w[0].node, Token::Ident)
                    && self.text_of(&w[0]) == kw
                    && matches!(w[1].node, Token::Eq)
                    && matches!(w[2].node, Token::True)
            })
        };
        Some(if flag("covariant") {
            Variance::Covariant
        } else if flag("contravariant") {
            Variance::Contravariant
        } else {
            Variance::Invariant
        })
    }

    fn parse_import(&self, line: &'a Line) -> Result<Vec<Spanned<Import>>, CheckError> {
        let mut c = Cursor::new(&line.tokens, self.source);
        if c.eat(&Token::Import) {
            let mut out = Vec::new();
            loop {
                let path = c.dotted_name()?;
                let alias = if c.eat(&Token::As) { Some(c.expect_ident()?.node) } else { None };
                out.push(Spanned::new(Import::Module { path: path.node, alias }, path.span));
                if !c.eat(&Token::Comma) {
                    break;
                }
            }
            c.expect_end()?;
            return Ok(out);
        }

        c.expect(&Token::From)?;
        // Relative imports resolve against loaded module names as if absolute.
        while c.eat(&Token::Dot) || c.eat(&Token::Ellipsis) {}
        let module = if c.at(&Token::Import) { String::new() } else { c.dotted_name()?.node };
        c.expect(&Token::Import)?;
        let parenthesized = c.eat(&Token::LParen);
        let mut names = Vec::new();
        if c.eat(&Token::Star) {
            names.push(("*".to_string(), None));
        } else {
            loop {
                if parenthesized && c.at(&Token::RParen) {
                    break;
                }
                let name = c.expect_ident()?.node;
                let alias = if c.eat(&Token::As) { Some(c.expect_ident()?.node) } else { None };
                names.push((name, alias));
                if !c.eat(&Token::Comma) {
                    break;
                }
            }
        }
        if parenthesized {
            c.expect(&Token::RParen)?;
        }
        c.expect_end()?;
        Ok(vec![Spanned::new(Import::From { module, names }, line.span())])
    }
}
