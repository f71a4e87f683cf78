//! The expression translator.
//!
//! Directive arguments are written in a restricted expression sub-language:
//! literals, sequence and mapping literals, property access, computed
//! indexing, calls to a closed set of globals and helpers, and comparisons.
//! There is no assignment, arithmetic, or user-defined functions.
//!
//! [`parse`] builds the syntax tree and [`resolve`] rewrites every bare
//! identifier into a context-qualified form: a register slot if an
//! enclosing block bound the name, otherwise a field lookup on the root
//! data context. A bare `=` is accepted and normalized to `==` so natural
//! comparison syntax works even though assignment is never meaningful.

use crate::compile::scope::Scopes;
use crate::types::expr::{
    Call, Cmp, CmpOp, Expr, Global, GlobalKind, Ident, Index, Literal, MapLit, Member, Seq, Slot,
};
use crate::types::span::Span;
use crate::{Error, Result, Value};

/// Parse the expression occupying `span` within `source`.
///
/// The whole region must be consumed; trailing input is an error.
pub(crate) fn parse(source: &str, span: Span) -> Result<Expr> {
    let mut parser = Parser::new(source, span);
    let expr = parser.parse_expr()?;
    match parser.next()? {
        None => Ok(expr),
        Some((tk, sp)) => Err(Error::syntax(
            format!("expected end of expression, found {}", tk.human()),
            source,
            sp,
        )),
    }
}

/// Substitute identifiers according to the current scope bindings.
///
/// Names after a property-access dot and mapping-literal keys are left
/// untouched; everything else either becomes the bound slot or qualifies as
/// a root-context field. This pass has no side effects on the scopes.
pub(crate) fn resolve(expr: &mut Expr, source: &str, scopes: &Scopes) {
    match expr {
        Expr::Ident(id) => {
            let id = *id;
            let name = &source[id.span];
            *expr = match scopes.lookup(name) {
                Some(index) => Expr::Slot(Slot {
                    index,
                    span: id.span,
                }),
                None => Expr::Field(id),
            };
        }
        Expr::Seq(seq) => {
            for item in &mut seq.items {
                resolve(item, source, scopes);
            }
        }
        Expr::Map(map) => {
            for (_, value) in &mut map.entries {
                resolve(value, source, scopes);
            }
        }
        Expr::Member(member) => resolve(&mut member.expr, source, scopes),
        Expr::Index(index) => {
            resolve(&mut index.expr, source, scopes);
            resolve(&mut index.index, source, scopes);
        }
        Expr::Call(call) => {
            resolve(&mut call.callee, source, scopes);
            for arg in &mut call.args {
                resolve(arg, source, scopes);
            }
        }
        Expr::Cmp(cmp) => {
            resolve(&mut cmp.lhs, source, scopes);
            resolve(&mut cmp.rhs, source, scopes);
        }
        Expr::Lit(_)
        | Expr::Root(_)
        | Expr::Slot(_)
        | Expr::Field(_)
        | Expr::Helper(_)
        | Expr::Global(_) => {}
    }
}

/// Split a loop argument region `expr -> a, b` at its last top-level arrow.
///
/// Returns `None` if the region has no arrow or the name list is not one or
/// two identifiers.
pub(crate) fn split_loop_args(source: &str, span: Span) -> Option<(Span, Ident, Option<Ident>)> {
    let region = &source[span];
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut arrow = None;

    let mut iter = region.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        if in_string {
            match c {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => in_string = false,
                _ => escaped = false,
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            '-' if depth == 0 => {
                if let Some((_, '>')) = iter.peek() {
                    iter.next();
                    arrow = Some(i);
                }
            }
            _ => {}
        }
    }

    let arrow = arrow?;
    let expr = Span::from(span.m..span.m + arrow);
    let names = &region[arrow + 2..];
    let base = span.m + arrow + 2;

    let mut idents = Vec::new();
    let mut rest = names;
    let mut offset = 0;
    loop {
        let trimmed = rest.trim_start();
        offset += rest.len() - trimmed.len();
        let len = ident_len(trimmed)?;
        idents.push(Ident {
            span: Span::from(base + offset..base + offset + len),
        });
        let after = trimmed[len..].trim_start();
        offset += len + (trimmed[len..].len() - after.len());
        if after.is_empty() {
            break;
        }
        if let Some(stripped) = after.strip_prefix(',') {
            offset += 1;
            rest = stripped;
        } else {
            return None;
        }
    }

    match idents.len() {
        1 => Some((expr, idents[0], None)),
        2 => Some((expr, idents[0], Some(idents[1]))),
        _ => None,
    }
}

/// Returns the byte length of the identifier at the start of `s`, if any.
fn ident_len(s: &str) -> Option<usize> {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if is_ident_start(c) => {}
        _ => return None,
    }
    for (i, c) in chars {
        if !is_ident(c) {
            return Some(i);
        }
    }
    Some(s.len())
}

struct Parser<'source> {
    source: &'source str,
    cursor: usize,
    end: usize,
    peeked: Option<Option<(Tk, Span)>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tk {
    Ident,
    Number,
    String,
    Dot,
    Comma,
    Colon,
    Minus,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Dollar,
    At,
    Cmp(CmpOp),
}

impl<'source> Parser<'source> {
    fn new(source: &'source str, span: Span) -> Self {
        Self {
            source,
            cursor: span.m,
            end: span.n,
            peeked: None,
        }
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_postfix()?;
        while let Some((Tk::Cmp(op), _)) = self.peek()? {
            self.next()?;
            let rhs = self.parse_postfix()?;
            let span = lhs.span().combine(rhs.span());
            lhs = Expr::Cmp(Cmp {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            });
        }
        Ok(lhs)
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek()? {
                Some((Tk::Dot, _)) => {
                    self.next()?;
                    let name = self.parse_ident()?;
                    let span = expr.span().combine(name.span);
                    expr = Expr::Member(Member {
                        expr: Box::new(expr),
                        name,
                        span,
                    });
                }
                Some((Tk::LBracket, _)) => {
                    self.next()?;
                    let index = self.parse_expr()?;
                    let end = self.expect(Tk::RBracket)?;
                    let span = expr.span().combine(end);
                    expr = Expr::Index(Index {
                        expr: Box::new(expr),
                        index: Box::new(index),
                        span,
                    });
                }
                Some((Tk::LParen, _)) => {
                    self.next()?;
                    let mut args = Vec::new();
                    if !self.is_next(Tk::RParen)? {
                        loop {
                            args.push(self.parse_expr()?);
                            if !self.is_next(Tk::Comma)? {
                                break;
                            }
                            self.next()?;
                        }
                    }
                    let end = self.expect(Tk::RParen)?;
                    let span = expr.span().combine(end);
                    expr = Expr::Call(Call {
                        callee: Box::new(expr),
                        args,
                        span,
                    });
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let expr = match self.parse()? {
            (Tk::String, span) => {
                let value = Value::String(self.parse_string(span)?);
                Expr::Lit(Literal { value, span })
            }

            (Tk::Number, span) => {
                let value = self.parse_number(span, false)?;
                Expr::Lit(Literal { value, span })
            }

            (Tk::Minus, sign) => {
                let span = self.expect(Tk::Number)?;
                let value = self.parse_number(span, true)?;
                Expr::Lit(Literal {
                    value,
                    span: sign.combine(span),
                })
            }

            (Tk::Dollar, span) => Expr::Root(span),

            (Tk::At, at) => {
                let name = self.parse_ident()?;
                Expr::Helper(Ident {
                    span: at.combine(name.span),
                })
            }

            (Tk::Ident, span) => match &self.source[span] {
                "true" => Expr::Lit(Literal {
                    value: Value::Bool(true),
                    span,
                }),
                "false" => Expr::Lit(Literal {
                    value: Value::Bool(false),
                    span,
                }),
                "null" => Expr::Lit(Literal {
                    value: Value::None,
                    span,
                }),
                name => match GlobalKind::from_str(name) {
                    Some(kind) => Expr::Global(Global { kind, span }),
                    None => Expr::Ident(Ident { span }),
                },
            },

            (Tk::LBracket, begin) => {
                let mut items = Vec::new();
                if !self.is_next(Tk::RBracket)? {
                    loop {
                        items.push(self.parse_expr()?);
                        if !self.is_next(Tk::Comma)? {
                            break;
                        }
                        self.next()?;
                    }
                }
                let end = self.expect(Tk::RBracket)?;
                Expr::Seq(Seq {
                    items,
                    span: begin.combine(end),
                })
            }

            (Tk::LBrace, begin) => {
                let mut entries = Vec::new();
                if !self.is_next(Tk::RBrace)? {
                    loop {
                        let key = self.parse_ident()?;
                        self.expect(Tk::Colon)?;
                        let value = self.parse_expr()?;
                        entries.push((key, value));
                        if !self.is_next(Tk::Comma)? {
                            break;
                        }
                        self.next()?;
                    }
                }
                let end = self.expect(Tk::RBrace)?;
                Expr::Map(MapLit {
                    entries,
                    span: begin.combine(end),
                })
            }

            (Tk::LParen, _) => {
                let expr = self.parse_expr()?;
                self.expect(Tk::RParen)?;
                expr
            }

            (tk, span) => {
                return Err(Error::syntax(
                    format!("expected expression, found {}", tk.human()),
                    self.source,
                    span,
                ));
            }
        };
        Ok(expr)
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        let span = self.expect(Tk::Ident)?;
        Ok(Ident { span })
    }

    /// Parses a string and handles escape characters.
    fn parse_string(&self, span: Span) -> Result<String> {
        let raw = &self.source[span];
        let string = if raw.contains('\\') {
            let mut iter = raw.char_indices().map(|(i, c)| (span.m + i, c));
            let mut string = String::new();
            while let Some((i, c)) = iter.next() {
                match c {
                    '"' => continue,
                    '\\' => {
                        let (j, esc) = match iter.next() {
                            Some(next) => next,
                            None => {
                                return Err(Error::syntax(
                                    "unknown escape character",
                                    self.source,
                                    i..span.n,
                                ));
                            }
                        };
                        let c = match esc {
                            'n' => '\n',
                            'r' => '\r',
                            't' => '\t',
                            '\\' => '\\',
                            '"' => '"',
                            _ => {
                                return Err(Error::syntax(
                                    "unknown escape character",
                                    self.source,
                                    i..j + esc.len_utf8(),
                                ));
                            }
                        };
                        string.push(c);
                    }
                    c => string.push(c),
                }
            }
            string
        } else {
            raw[1..raw.len() - 1].to_owned()
        };
        Ok(string)
    }

    /// Parses an integer or a float.
    fn parse_number(&self, span: Span, negate: bool) -> Result<Value> {
        let raw = &self.source[span];
        if !raw.contains(['.', 'e', 'E']) {
            if let Ok(int) = raw.parse::<i64>() {
                return Ok(Value::Integer(if negate { -int } else { int }));
            }
        }
        match raw.parse::<f64>() {
            Ok(float) => Ok(Value::Float(if negate { -float } else { float })),
            Err(_) => Err(Error::syntax("invalid number literal", self.source, span)),
        }
    }

    /// Parses any token.
    fn parse(&mut self) -> Result<(Tk, Span)> {
        match self.next()? {
            Some((tk, sp)) => Ok((tk, sp)),
            None => Err(Error::syntax(
                "expected expression, found end of arguments",
                self.source,
                self.end..self.end,
            )),
        }
    }

    /// Parses the specified token and returns its span.
    fn expect(&mut self, exp: Tk) -> Result<Span> {
        match self.next()? {
            Some((tk, span)) if tk == exp => Ok(span),
            Some((tk, span)) => Err(Error::syntax(
                format!("expected {}, found {}", exp.human(), tk.human()),
                self.source,
                span,
            )),
            None => Err(Error::syntax(
                format!("expected {}, found end of arguments", exp.human()),
                self.source,
                self.end..self.end,
            )),
        }
    }

    fn is_next(&mut self, token: Tk) -> Result<bool> {
        Ok(self.peek()?.map(|(tk, _)| tk == token).unwrap_or(false))
    }

    fn peek(&mut self) -> Result<Option<(Tk, Span)>> {
        if let o @ None = &mut self.peeked {
            *o = Some(lex(self.source, &mut self.cursor, self.end)?);
        }
        Ok(self.peeked.unwrap())
    }

    fn next(&mut self) -> Result<Option<(Tk, Span)>> {
        match self.peeked.take() {
            Some(v) => Ok(v),
            None => lex(self.source, &mut self.cursor, self.end),
        }
    }
}

/// Returns the next token in `source[*cursor..end]`, skipping whitespace.
///
/// Line breaks count as whitespace, so expressions may span lines.
fn lex(source: &str, cursor: &mut usize, end: usize) -> Result<Option<(Tk, Span)>> {
    let start = *cursor;
    let mut iter = source[..end]
        .char_indices()
        .skip_while(move |(i, _)| *i < start)
        .skip_while(|(_, c)| c.is_whitespace());

    let (i, c) = match iter.next() {
        Some(next) => next,
        None => {
            *cursor = end;
            return Ok(None);
        }
    };

    let (tk, j) = match c {
        '.' => (Tk::Dot, i + 1),
        ',' => (Tk::Comma, i + 1),
        ':' => (Tk::Colon, i + 1),
        '-' => (Tk::Minus, i + 1),
        '(' => (Tk::LParen, i + 1),
        ')' => (Tk::RParen, i + 1),
        '[' => (Tk::LBracket, i + 1),
        ']' => (Tk::RBracket, i + 1),
        '{' => (Tk::LBrace, i + 1),
        '}' => (Tk::RBrace, i + 1),
        '$' => (Tk::Dollar, i + 1),
        '@' => (Tk::At, i + 1),

        // `=` on its own is normalized to a comparison.
        '=' => match iter.next() {
            Some((_, '=')) => (Tk::Cmp(CmpOp::Eq), i + 2),
            _ => (Tk::Cmp(CmpOp::Eq), i + 1),
        },
        '!' => match iter.next() {
            Some((_, '=')) => (Tk::Cmp(CmpOp::Ne), i + 2),
            _ => {
                return Err(Error::syntax("unexpected character", source, i..i + 1));
            }
        },
        '<' => match iter.next() {
            Some((_, '=')) => (Tk::Cmp(CmpOp::Le), i + 2),
            _ => (Tk::Cmp(CmpOp::Lt), i + 1),
        },
        '>' => match iter.next() {
            Some((_, '=')) => (Tk::Cmp(CmpOp::Ge), i + 2),
            _ => (Tk::Cmp(CmpOp::Gt), i + 1),
        },

        '"' => lex_string(source, end, i)?,
        c if c.is_ascii_digit() => lex_number(source, end, i),
        c if is_ident_start(c) => lex_while(source, end, i, c.len_utf8(), is_ident),

        c => {
            return Err(Error::syntax(
                "unexpected character",
                source,
                i..i + c.len_utf8(),
            ));
        }
    };

    *cursor = j;
    Ok(Some((tk, Span::from(i..j))))
}

fn lex_string(source: &str, end: usize, i: usize) -> Result<(Tk, usize)> {
    let mut escaped = false;
    for (j, c) in source[..end].char_indices().skip_while(|(j, _)| *j <= i) {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return Ok((Tk::String, j + 1)),
            _ => escaped = false,
        }
    }
    Err(Error::syntax("undelimited string", source, i..end))
}

fn lex_number(source: &str, end: usize, i: usize) -> (Tk, usize) {
    let mut j = i;
    let mut exp = false;
    for (k, c) in source[..end].char_indices().skip_while(|(k, _)| *k < i) {
        match c {
            '0'..='9' | '.' => {}
            'e' | 'E' => exp = true,
            '+' | '-' if exp && matches!(source.as_bytes()[k - 1], b'e' | b'E') => {}
            _ => break,
        }
        j = k + c.len_utf8();
    }
    (Tk::Number, j)
}

fn lex_while(
    source: &str,
    end: usize,
    i: usize,
    first: usize,
    pred: fn(char) -> bool,
) -> (Tk, usize) {
    let mut j = i + first;
    let start = j;
    for (k, c) in source[..end].char_indices().skip_while(|(k, _)| *k < start) {
        if !pred(c) {
            break;
        }
        j = k + c.len_utf8();
    }
    (Tk::Ident, j)
}

#[cfg(feature = "unicode")]
pub(crate) fn is_ident_start(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_start(c)
}

#[cfg(feature = "unicode")]
pub(crate) fn is_ident(c: char) -> bool {
    unicode_ident::is_xid_continue(c)
}

#[cfg(not(feature = "unicode"))]
pub(crate) fn is_ident_start(c: char) -> bool {
    matches!(c, 'A'..='Z' | 'a'..='z' | '_')
}

#[cfg(not(feature = "unicode"))]
pub(crate) fn is_ident(c: char) -> bool {
    matches!(c, '0'..='9' | 'A'..='Z' | 'a'..='z' | '_')
}

impl Tk {
    fn human(&self) -> &'static str {
        match self {
            Self::Ident => "identifier",
            Self::Number => "number",
            Self::String => "string",
            Self::Dot => "member access operator",
            Self::Comma => "comma",
            Self::Colon => "colon",
            Self::Minus => "minus",
            Self::LParen => "open paren",
            Self::RParen => "close paren",
            Self::LBracket => "open bracket",
            Self::RBracket => "close bracket",
            Self::LBrace => "open brace",
            Self::RBrace => "close brace",
            Self::Dollar => "data context sigil",
            Self::At => "helper sigil",
            Self::Cmp(_) => "comparison operator",
        }
    }
}
