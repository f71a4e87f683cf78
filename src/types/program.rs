//! Defines a compiled [`Template`] which is a sequence of [`Instr`] that can
//! be executed by the renderer.

use std::borrow::Cow;

use crate::types::expr;
use crate::types::expr::Ident;
use crate::types::span::Span;

pub const FIXME: usize = !0;

pub struct Template<'source> {
    pub source: Cow<'source, str>,
    pub instrs: Vec<Instr>,
    /// Number of registers the renderer must allocate
    pub slots: usize,
}

pub enum Instr {
    /// Emit raw template text
    EmitRaw(Span),

    /// Evaluate an expression and emit it through the interpolation pipeline
    Emit(Interp),

    /// Jump to an instruction
    Jump(usize),

    /// Evaluate the expression and jump to the instruction if it is falsy
    JumpIfFalsy(expr::Expr, usize),

    /// Evaluate the expression as a mapping and start enumerating its entries
    EachStart(EachSpec),

    /// Evaluate the expression as a sequence and start iterating it
    ForStart(ForSpec),

    /// Advance the innermost loop, or exit by jumping to the instruction
    LoopNext(usize),
}

pub struct Interp {
    pub expr: expr::Expr,
    /// Serialize the value as JSON before output
    pub json: bool,
    /// Skip HTML escaping
    pub unsafe_: bool,
    /// Helpers the value is piped through, in order
    pub pipes: Vec<Ident>,
    pub span: Span,
}

pub struct EachSpec {
    pub source: expr::Expr,
    pub key: usize,
    pub value: usize,
    pub span: Span,
}

pub struct ForSpec {
    pub source: expr::Expr,
    pub value: usize,
    pub index: Option<usize>,
    pub span: Span,
}

impl std::fmt::Debug for Template<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<compiled>")
    }
}
