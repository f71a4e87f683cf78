//! The scanner.
//!
//! An explicit character-scanning state machine that splits template text
//! into a linear sequence of literal runs, comments, and directive
//! occurrences. Block-form directives are matched here with an explicit
//! stack: a `}` closes the innermost open block, an unmatched close and a
//! block left open at the end of input are both fatal.
//!
//! Leniency rules: an unregistered directive name is not consumed as a
//! directive, it passes through as ordinary literal text. A registered
//! directive whose arguments fail to match its grammar is also left as
//! literal text, unless [`Settings::strict`][crate::Settings] is enabled in
//! which case it is a compile error.

use crate::compile::expr;
use crate::types::expr::Ident;
use crate::types::span::Span;
use crate::types::token::{Args, Close, Descriptor, LoopArgs, NameArg, Op, OpToken, Token};
use crate::value::Value;
use crate::{Engine, Error, Result};

pub struct Scanner<'engine, 'source> {
    engine: &'engine Engine,
    source: &'source str,
    tokens: Vec<Token>,
    stack: Vec<(Op, Span)>,
}

enum Scan {
    /// A directive or close marker was recognized
    Directive { token: Token, next: usize },
    /// A comment to exclude from output
    Comment { span: Span, next: usize },
    /// Nothing recognized, the text stays literal; resume scanning at this
    /// position
    Literal { resume: usize },
}

impl<'engine, 'source> Scanner<'engine, 'source> {
    pub fn new(engine: &'engine Engine, source: &'source str) -> Self {
        Self {
            engine,
            source,
            tokens: Vec::new(),
            stack: Vec::new(),
        }
    }

    pub fn scan(mut self) -> Result<Vec<Token>> {
        let sigil = self.engine.settings.sigil;
        let mut lit = 0;
        let mut i = 0;

        while i < self.source.len() {
            let c = match self.source[i..].chars().next() {
                Some(c) => c,
                None => break,
            };

            if c == sigil {
                match self.directive(i)? {
                    Scan::Directive { token, next } => {
                        self.flush(lit, i);
                        if let Token::Open(t) = &token {
                            if t.desc.block {
                                self.stack.push((t.desc.kind, t.span));
                            }
                        }
                        self.tokens.push(token);
                        i = next;
                        lit = next;
                    }
                    Scan::Comment { span, next } => {
                        self.flush(lit, i);
                        self.tokens.push(Token::Comment(span));
                        i = next;
                        lit = next;
                    }
                    Scan::Literal { resume } => {
                        i = resume;
                    }
                }
            } else if c == '}' {
                match self.stack.pop() {
                    Some((op, _)) => {
                        self.flush(lit, i);
                        self.tokens.push(Token::Close(Close {
                            op,
                            span: Span::from(i..i + 1),
                        }));
                        i += 1;
                        lit = i;
                    }
                    None => {
                        // A close brace with no block open is literal text,
                        // unless only whitespace separates it from a sigil.
                        let j = skip_whitespace(self.source, i + 1);
                        if self.source[j..].starts_with(sigil) {
                            return Err(Error::unbalanced(
                                "close of block with no open block",
                                self.source,
                                i..i + 1,
                            ));
                        }
                        i += 1;
                    }
                }
            } else {
                i += c.len_utf8();
            }
        }

        self.flush(lit, self.source.len());

        if let Some((op, span)) = self.stack.first() {
            return Err(Error::unbalanced(
                format!("unclosed `{}` block", op.human()),
                self.source,
                *span,
            ));
        }

        Ok(self.tokens)
    }

    fn flush(&mut self, m: usize, n: usize) {
        if m < n {
            self.tokens.push(Token::Literal(Span::from(m..n)));
        }
    }

    /// Classify what follows the sigil at `i`: a comment, a directive name,
    /// or nothing recognizable.
    fn directive(&mut self, i: usize) -> Result<Scan> {
        let sigil = self.engine.settings.sigil;
        let j = i + sigil.len_utf8();
        let rest = &self.source[j..];

        // Line comment, runs to the end of the line. The newline itself
        // stays literal.
        if rest.starts_with(sigil) {
            let end = match rest.find('\n') {
                Some(n) => j + n,
                None => self.source.len(),
            };
            return Ok(Scan::Comment {
                span: Span::from(i..end),
                next: end,
            });
        }

        // Block comment, runs to the paired close marker. Unterminated
        // comments pass through as literal text.
        if rest.starts_with('*') {
            let close = format!("*{sigil}");
            return match self.source[j + 1..].find(&close) {
                Some(n) => {
                    let end = j + 1 + n + close.len();
                    Ok(Scan::Comment {
                        span: Span::from(i..end),
                        next: end,
                    })
                }
                None => Ok(Scan::Literal { resume: j + 1 }),
            };
        }

        let mut k = j;
        let unsafe_ = rest.starts_with('!');
        if unsafe_ {
            k += 1;
        }
        let name_end = ident_end(self.source, k);
        let name = &self.source[k..name_end];
        let resume = if name_end > j { name_end } else { j };

        let desc = match self.engine.registry.get(name) {
            Some(desc) => desc,
            None => return Ok(Scan::Literal { resume }),
        };

        match self.args(desc, name_end)? {
            Some((args, pipes, end)) => Ok(Scan::Directive {
                token: Token::Open(OpToken {
                    desc,
                    args,
                    unsafe_,
                    pipes,
                    span: Span::from(i..end),
                }),
                next: end,
            }),
            None => Ok(Scan::Literal { resume }),
        }
    }

    /// Match the directive's argument grammar at `pos`. Returns `None` on a
    /// grammar mismatch in lenient mode; strict mode returns the error.
    fn args(&self, desc: Descriptor, pos: usize) -> Result<Option<(Args, Vec<Ident>, usize)>> {
        if desc.kind == Op::Else {
            return match self.block_open(pos) {
                Some(end) => Ok(Some((Args::None, Vec::new(), end))),
                None => self.mismatch("expected `{` to open the block", pos),
            };
        }

        let (inner, after) = match self.parens(pos) {
            Some(parens) => parens,
            None => return self.mismatch("expected directive arguments", pos),
        };

        let args = match desc.kind {
            Op::Interp | Op::Json | Op::If | Op::ElseIf => {
                match expr::parse(self.source, inner) {
                    Ok(expr) => Args::Expr(expr),
                    Err(err) => return self.invalid(err),
                }
            }

            Op::Each | Op::For => {
                let (espan, a, b) = match expr::split_loop_args(self.source, inner) {
                    Some(split) => split,
                    None => {
                        return self.mismatch("expected loop bindings after `->`", inner.m);
                    }
                };
                if desc.kind == Op::Each && b.is_none() {
                    return self.mismatch("expected key and value loop bindings", inner.m);
                }
                let source = match expr::parse(self.source, espan) {
                    Ok(expr) => expr,
                    Err(err) => return self.invalid(err),
                };
                Args::Loop(LoopArgs { source, a, b })
            }

            Op::Def | Op::Use => match expr::parse(self.source, inner) {
                Ok(crate::types::expr::Expr::Lit(lit)) => match lit.value {
                    Value::String(value) => Args::Name(NameArg {
                        value,
                        span: lit.span,
                    }),
                    _ => {
                        return self.mismatch("expected a string literal name", inner.m);
                    }
                },
                Ok(_) => {
                    return self.mismatch("expected a string literal name", inner.m);
                }
                Err(err) => return self.invalid(err),
            },

            Op::Else => unreachable!(),
        };

        let mut end = after;
        let mut pipes = Vec::new();

        if !desc.block {
            // trailing helper-pipe modifiers, e.g. `:upper`
            while self.source[end..].starts_with(':') {
                let s = end + 1;
                let e = ident_end(self.source, s);
                if e == s {
                    return self.mismatch("expected helper name after `:`", s);
                }
                pipes.push(Ident {
                    span: Span::from(s..e),
                });
                end = e;
            }
        } else {
            end = match self.block_open(end) {
                Some(end) => end,
                None => {
                    return self.mismatch("expected `{` after directive arguments", end);
                }
            };
        }

        Ok(Some((args, pipes, end)))
    }

    fn mismatch<T>(&self, msg: &str, at: usize) -> Result<Option<T>> {
        if self.engine.settings.strict {
            Err(Error::syntax(msg, self.source, at..at))
        } else {
            Ok(None)
        }
    }

    fn invalid<T>(&self, err: Error) -> Result<Option<T>> {
        if self.engine.settings.strict {
            Err(err)
        } else {
            Ok(None)
        }
    }

    /// Extract the balanced paren region at `pos`, respecting nested
    /// delimiters and string literals. Returns the inner span and the
    /// position just after the closing paren.
    fn parens(&self, pos: usize) -> Option<(Span, usize)> {
        let open = skip_whitespace(self.source, pos);
        if !self.source[open..].starts_with('(') {
            return None;
        }

        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        for (d, c) in self.source[open..].char_indices() {
            let k = open + d;
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
                ')' if depth == 1 => {
                    return Some((Span::from(open + 1..k), k + 1));
                }
                ')' | ']' | '}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        None
    }

    /// Consume the block-open marker `{` at `pos`, allowing leading
    /// whitespace.
    fn block_open(&self, pos: usize) -> Option<usize> {
        let open = skip_whitespace(self.source, pos);
        if self.source[open..].starts_with('{') {
            Some(open + 1)
        } else {
            None
        }
    }
}

fn skip_whitespace(source: &str, pos: usize) -> usize {
    match source[pos..].find(|c: char| !c.is_whitespace()) {
        Some(n) => pos + n,
        None => source.len(),
    }
}

/// Returns the end of the identifier starting at `start`, which is `start`
/// itself if there is none.
fn ident_end(source: &str, start: usize) -> usize {
    let mut iter = source[start..].char_indices();
    match iter.next() {
        Some((_, c)) if expr::is_ident_start(c) => {}
        _ => return start,
    }
    for (d, c) in iter {
        if !expr::is_ident(c) {
            return start + d;
        }
    }
    source.len()
}
