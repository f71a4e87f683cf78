//! The token sequence produced by the scanner.
//!
//! Tokens are produced in source order and consumed exactly once by the
//! code generator. Block-form directives always arrive pre-matched: the
//! scanner pairs every [`Close`] with its `Open` using an explicit stack,
//! so the generator never sees an unbalanced sequence.

use crate::types::expr;
use crate::types::expr::Ident;
use crate::types::span::Span;

#[derive(Clone)]
pub enum Token {
    /// A run of raw template text
    Literal(Span),
    /// A comment, excluded from output
    Comment(Span),
    /// A directive occurrence
    Open(OpToken),
    /// The close marker of a block-form directive
    Close(Close),
}

#[derive(Clone)]
pub struct OpToken {
    pub desc: Descriptor,
    pub args: Args,
    /// Whether the directive carried the leading unsafe marker `!`
    pub unsafe_: bool,
    /// Trailing helper-pipe modifiers, e.g. `#(name):upper`
    pub pipes: Vec<Ident>,
    pub span: Span,
}

#[derive(Clone)]
pub struct Close {
    pub op: Op,
    pub span: Span,
}

/// The parsed arguments of a directive.
#[derive(Clone)]
pub enum Args {
    /// No arguments, e.g. `#else`
    None,
    /// A single expression, e.g. `#if(logged_in)`
    Expr(expr::Expr),
    /// A loop binding, e.g. `#each(users -> id, user)`
    Loop(LoopArgs),
    /// A compile-time constant name, e.g. `#def("header")`
    Name(NameArg),
}

#[derive(Clone)]
pub struct LoopArgs {
    /// The iterable expression, translated before the names are bound
    pub source: expr::Expr,
    /// `each`: the key name; `for`: the value name
    pub a: Ident,
    /// `each`: the value name; `for`: the optional index name
    pub b: Option<Ident>,
}

#[derive(Clone)]
pub struct NameArg {
    pub value: String,
    pub span: Span,
}

/// Identifies the generation logic of a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// The empty-name interpolation directive `#(expr)`
    Interp,
    Each,
    For,
    If,
    ElseIf,
    Else,
    Json,
    Def,
    Use,
}

/// A directive descriptor, registered in the operator registry and carried
/// on every `Open` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub kind: Op,
    /// Block-form: has a body delimited by `{` and `}`
    pub block: bool,
    /// Output is HTML-escaped unless the unsafe marker is present
    pub escapes: bool,
    /// Outflow: body tokens are captured rather than evaluated inline
    pub captures: bool,
}

impl Op {
    pub fn human(&self) -> &'static str {
        match self {
            Self::Interp => "interpolation",
            Self::Each => "each",
            Self::For => "for",
            Self::If => "if",
            Self::ElseIf => "elseif",
            Self::Else => "else",
            Self::Json => "json",
            Self::Def => "def",
            Self::Use => "use",
        }
    }
}
