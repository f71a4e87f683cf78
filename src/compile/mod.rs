//! Compile the template into a program that can be executed by the renderer.
//!
//! This process has three stages:
//! - An optional normalization pass collapses indentation when the `strip`
//!   setting is enabled.
//! - The scanner chunks the template source into a matched token sequence.
//! - The code generator walks the tokens once and constructs the program,
//!   consulting the operator registry, the expression translator, the scope
//!   manager, and the partial registry.

pub mod expr;
pub mod ops;
pub mod scan;
pub mod scope;

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::compile::scan::Scanner;
use crate::compile::scope::{Scopes, Undo};
use crate::types::program::{EachSpec, ForSpec, Instr, Interp, Template, FIXME};
use crate::types::span::Span;
use crate::types::token::{Args, Close, Op, OpToken, Token};
use crate::{Engine, Error, Result};

/// Compile a template into a program.
pub fn template<'engine, 'source>(
    engine: &'engine Engine,
    source: &'source str,
) -> Result<Template<'source>> {
    let source: Cow<'source, str> = if engine.settings.strip {
        Cow::Owned(strip(source))
    } else {
        Cow::Borrowed(source)
    };
    let tokens = Scanner::new(engine, &source).scan()?;
    let (instrs, slots) = Compiler::new(engine, &source).compile(tokens)?;
    Ok(Template {
        source,
        instrs,
        slots,
    })
}

/// Collapse indentation-only leading and trailing whitespace on each line
/// and join the lines with single spaces. A formatting convenience only.
fn strip(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    for line in source.lines() {
        let line = line.trim_matches([' ', '\t']);
        if line.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(line);
    }
    out
}

/// A code generator that constructs a program from a token sequence.
struct Compiler<'engine, 'source> {
    engine: &'engine Engine,
    source: &'source str,
    instrs: Vec<Instr>,
    scopes: Scopes,
    /// The partial registry, scoped to this compile invocation.
    partials: BTreeMap<String, Vec<Token>>,
    /// Open blocks awaiting their close.
    blocks: Vec<BlockState>,
    /// A just-closed conditional that an `elseif`/`else` may still attach to.
    pending: Option<PendingChain>,
    /// Whitespace-only literals held back while a chain is pending.
    held: Vec<Span>,
    /// Capture frame for an open `def` block.
    capture: Option<Capture>,
    /// Current partial expansion depth.
    depth: usize,
}

enum BlockState {
    If {
        /// The conditional jump to patch once the branch end is known.
        jump: usize,
        /// Jumps to the end of the whole chain.
        end_jumps: Vec<usize>,
    },
    Else {
        end_jumps: Vec<usize>,
    },
    Loop {
        /// Index of the `LoopNext` instruction.
        next: usize,
        undo: Undo,
    },
}

struct PendingChain {
    jump: usize,
    end_jumps: Vec<usize>,
}

struct Capture {
    name: String,
    tokens: Vec<Token>,
    /// Nesting depth of block directives inside the captured body.
    depth: usize,
}

impl<'engine, 'source> Compiler<'engine, 'source> {
    fn new(engine: &'engine Engine, source: &'source str) -> Self {
        Self {
            engine,
            source,
            instrs: Vec::new(),
            scopes: Scopes::new(),
            partials: BTreeMap::new(),
            blocks: Vec::new(),
            pending: None,
            held: Vec::new(),
            capture: None,
            depth: 0,
        }
    }

    fn compile(mut self, tokens: Vec<Token>) -> Result<(Vec<Instr>, usize)> {
        self.compile_tokens(tokens)?;
        self.finish_pending();
        assert!(
            self.blocks.is_empty() && self.capture.is_none(),
            "compiler bug: unclosed block survived scanning"
        );
        Ok((self.instrs, self.scopes.slots()))
    }

    fn compile_tokens(&mut self, tokens: Vec<Token>) -> Result<()> {
        for token in tokens {
            self.token(token)?;
        }
        Ok(())
    }

    fn token(&mut self, token: Token) -> Result<()> {
        // While a capturing block is open, tokens are stored instead of
        // compiled so partial bodies can contain arbitrary directives.
        if self.capture.is_some() {
            return self.capture(token);
        }

        match token {
            Token::Literal(span) => {
                // Whitespace between a close and a possible `elseif`/`else`
                // is held back; the original's close pattern swallowed it.
                if self.pending.is_some() && self.source[span].trim().is_empty() {
                    self.held.push(span);
                    return Ok(());
                }
                self.finish_pending();
                self.push_raw(span);
            }

            Token::Comment(_) => {}

            Token::Open(t) => self.open(t)?,

            Token::Close(c) => self.close(c),
        }

        Ok(())
    }

    fn open(&mut self, t: OpToken) -> Result<()> {
        match t.desc.kind {
            Op::ElseIf | Op::Else => return self.chain(t),
            _ => self.finish_pending(),
        }

        match t.desc.kind {
            Op::Interp | Op::Json => {
                let mut expr = match t.args {
                    Args::Expr(expr) => expr,
                    _ => unreachable!("compiler bug: non-expression arguments"),
                };
                expr::resolve(&mut expr, self.source, &self.scopes);
                self.push(Instr::Emit(Interp {
                    expr,
                    json: t.desc.kind == Op::Json,
                    unsafe_: t.unsafe_ || !t.desc.escapes,
                    pipes: t.pipes,
                    span: t.span,
                }));
            }

            Op::If => {
                let mut cond = match t.args {
                    Args::Expr(expr) => expr,
                    _ => unreachable!("compiler bug: non-expression arguments"),
                };
                expr::resolve(&mut cond, self.source, &self.scopes);
                let jump = self.push(Instr::JumpIfFalsy(cond, FIXME));
                self.blocks.push(BlockState::If {
                    jump,
                    end_jumps: Vec::new(),
                });
            }

            Op::Each | Op::For => {
                let args = match t.args {
                    Args::Loop(args) => args,
                    _ => unreachable!("compiler bug: non-loop arguments"),
                };
                // The iterable is translated before the loop names are
                // bound, so it can refer to outer bindings of the same name.
                let mut source = args.source;
                expr::resolve(&mut source, self.source, &self.scopes);

                let mut undo = Undo::default();
                if t.desc.kind == Op::Each {
                    let key = self.scopes.alloc();
                    let value = self.scopes.alloc();
                    let value_name = args.b.expect("scanner bug: each without value name");
                    self.bind(value_name.span, value, &mut undo);
                    self.bind(args.a.span, key, &mut undo);
                    self.push(Instr::EachStart(EachSpec {
                        source,
                        key,
                        value,
                        span: t.span,
                    }));
                } else {
                    let value = self.scopes.alloc();
                    let index = args.b.map(|_| self.scopes.alloc());
                    self.bind(args.a.span, value, &mut undo);
                    if let (Some(name), Some(slot)) = (args.b, index) {
                        self.bind(name.span, slot, &mut undo);
                    }
                    self.push(Instr::ForStart(ForSpec {
                        source,
                        value,
                        index,
                        span: t.span,
                    }));
                }
                let next = self.push(Instr::LoopNext(FIXME));
                self.blocks.push(BlockState::Loop { next, undo });
            }

            Op::Def => {
                let name = match t.args {
                    Args::Name(name) => name.value,
                    _ => unreachable!("compiler bug: non-name arguments"),
                };
                self.capture = Some(Capture {
                    name,
                    tokens: Vec::new(),
                    depth: 0,
                });
            }

            Op::Use => {
                let name = match t.args {
                    Args::Name(name) => name,
                    _ => unreachable!("compiler bug: non-name arguments"),
                };
                // A partial only resolves once its `def` has closed earlier
                // in the walk; an undefined name simply emits nothing.
                if let Some(tokens) = self.partials.get(&name.value) {
                    if self.depth >= self.engine.max_partial_depth {
                        return Err(Error::syntax(
                            format!(
                                "maximum partial expansion depth ({}) exceeded",
                                self.engine.max_partial_depth
                            ),
                            self.source,
                            name.span,
                        ));
                    }
                    let tokens = tokens.clone();
                    self.depth += 1;
                    self.compile_tokens(tokens)?;
                    self.depth -= 1;
                }
            }

            Op::ElseIf | Op::Else => unreachable!(),
        }

        Ok(())
    }

    /// Attach an `elseif` or `else` to the chain that just closed.
    fn chain(&mut self, t: OpToken) -> Result<()> {
        let name = t.desc.kind.human();
        let mut chain = match self.pending.take() {
            Some(chain) => chain,
            None => {
                return Err(Error::syntax(
                    format!("unexpected `{name}` block"),
                    self.source,
                    t.span,
                ));
            }
        };
        self.held.clear();

        let j = self.push(Instr::Jump(FIXME));
        chain.end_jumps.push(j);
        self.patch(chain.jump);

        match t.desc.kind {
            Op::ElseIf => {
                let mut cond = match t.args {
                    Args::Expr(expr) => expr,
                    _ => unreachable!("compiler bug: non-expression arguments"),
                };
                expr::resolve(&mut cond, self.source, &self.scopes);
                let jump = self.push(Instr::JumpIfFalsy(cond, FIXME));
                self.blocks.push(BlockState::If {
                    jump,
                    end_jumps: chain.end_jumps,
                });
            }
            Op::Else => {
                self.blocks.push(BlockState::Else {
                    end_jumps: chain.end_jumps,
                });
            }
            _ => unreachable!(),
        }

        Ok(())
    }

    fn close(&mut self, c: Close) {
        self.finish_pending();

        match self.blocks.pop() {
            Some(BlockState::If { jump, end_jumps }) => {
                self.pending = Some(PendingChain { jump, end_jumps });
            }
            Some(BlockState::Else { end_jumps }) => {
                for j in end_jumps {
                    self.patch(j);
                }
            }
            Some(BlockState::Loop { next, undo }) => {
                self.push(Instr::Jump(next));
                self.patch(next);
                self.scopes.restore(undo);
            }
            None => panic!("compiler bug: close `{}` with no open block", c.op.human()),
        }
    }

    /// Resolve a just-closed conditional chain that nothing attached to.
    fn finish_pending(&mut self) {
        if let Some(chain) = self.pending.take() {
            self.patch(chain.jump);
            for j in chain.end_jumps {
                self.patch(j);
            }
        }
        let held: Vec<_> = self.held.drain(..).collect();
        for span in held {
            self.push_raw(span);
        }
    }

    fn capture(&mut self, token: Token) -> Result<()> {
        let capture = self.capture.as_mut().unwrap();
        match &token {
            Token::Open(t) if t.desc.block => {
                capture.depth += 1;
            }
            Token::Close(c) => {
                if capture.depth == 0 {
                    assert!(c.op == Op::Def, "compiler bug: mismatched capture close");
                    let Capture { name, tokens, .. } = self.capture.take().unwrap();
                    // The name was evaluated when the block opened; storing
                    // at close keeps use-before-def unresolvable.
                    self.partials.insert(name, tokens);
                    return Ok(());
                }
                capture.depth -= 1;
            }
            _ => {}
        }
        capture.tokens.push(token);
        Ok(())
    }

    fn bind(&mut self, name: Span, slot: usize, undo: &mut Undo) {
        let name = &self.source[name];
        self.scopes.bind(name, slot, undo);
    }

    fn push_raw(&mut self, span: Span) {
        // In append mode adjacent literal emissions coalesce into one
        // instruction; split mode keeps them separate. Output is identical.
        if self.engine.settings.append {
            if let Some(Instr::EmitRaw(prev)) = self.instrs.last_mut() {
                if prev.n == span.m {
                    prev.n = span.n;
                    return;
                }
            }
        }
        self.push(Instr::EmitRaw(span));
    }

    fn patch(&mut self, i: usize) {
        let n = self.instrs.len();
        let j = match &mut self.instrs[i] {
            Instr::Jump(j) | Instr::JumpIfFalsy(_, j) | Instr::LoopNext(j) => j,
            _ => panic!("compiler bug: not a jump instr"),
        };
        *j = n;
    }

    fn push(&mut self, instr: Instr) -> usize {
        let i = self.instrs.len();
        self.instrs.push(instr);
        i
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_collapses_indentation() {
        let s = "  <ul>\n    <li>\n  </ul>  \n";
        assert_eq!(strip(s), "<ul> <li> </ul>");
    }

    #[test]
    fn strip_drops_blank_lines() {
        assert_eq!(strip("a\n\n   \nb"), "a b");
    }
}
