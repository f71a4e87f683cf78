//! AST for the directive expression sub-language.
//!
//! Expressions are parsed into this tree by `compile::expr` and then run
//! through a resolution pass which replaces every bare [`Ident`] with either
//! a [`Slot`] (a loop variable bound by an enclosing block) or a [`Field`]
//! (a lookup on the root data context). The renderer never sees an
//! unresolved identifier.

use crate::types::span::Span;
use crate::Value;

#[derive(Clone)]
pub enum Expr {
    /// A literal value, e.g. `"hi"`, `1.5`, `true`, `null`
    Lit(Literal),
    /// A sequence literal, e.g. `["a", "b"]`
    Seq(Seq),
    /// A mapping literal, e.g. `{x: 1, y: 2}`
    Map(MapLit),
    /// The data context root `$`
    Root(Span),
    /// An identifier that has not been resolved yet
    Ident(Ident),
    /// A loop variable bound by an enclosing block
    Slot(Slot),
    /// A field lookup on the root data context
    Field(Ident),
    /// A reference into the helper namespace, e.g. `@upper`
    Helper(Ident),
    /// One of the allowed globals, e.g. `Math` or `parseInt`
    Global(Global),
    /// Member access, e.g. `user.name`
    Member(Member),
    /// Computed index, e.g. `users[0]`
    Index(Index),
    /// A call, e.g. `@join(items, ", ")` or `Math.floor(x)`
    Call(Call),
    /// A comparison, e.g. `count == 3`
    Cmp(Cmp),
}

#[derive(Clone)]
pub struct Literal {
    pub value: Value,
    pub span: Span,
}

#[derive(Clone)]
pub struct Seq {
    pub items: Vec<Expr>,
    pub span: Span,
}

#[derive(Clone)]
pub struct MapLit {
    pub entries: Vec<(Ident, Expr)>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ident {
    pub span: Span,
}

#[derive(Clone, Copy)]
pub struct Slot {
    pub index: usize,
    pub span: Span,
}

#[derive(Clone, Copy)]
pub struct Global {
    pub kind: GlobalKind,
    pub span: Span,
}

/// The closed set of globals that expressions may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalKind {
    Math,
    Date,
    ParseInt,
    ParseFloat,
    IsNan,
    IsFinite,
}

#[derive(Clone)]
pub struct Member {
    pub expr: Box<Expr>,
    pub name: Ident,
    pub span: Span,
}

#[derive(Clone)]
pub struct Index {
    pub expr: Box<Expr>,
    pub index: Box<Expr>,
    pub span: Span,
}

#[derive(Clone)]
pub struct Call {
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Clone)]
pub struct Cmp {
    pub op: CmpOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Self::Lit(lit) => lit.span,
            Self::Seq(seq) => seq.span,
            Self::Map(map) => map.span,
            Self::Root(span) => *span,
            Self::Ident(id) => id.span,
            Self::Slot(slot) => slot.span,
            Self::Field(id) => id.span,
            Self::Helper(id) => id.span,
            Self::Global(global) => global.span,
            Self::Member(member) => member.span,
            Self::Index(index) => index.span,
            Self::Call(call) => call.span,
            Self::Cmp(cmp) => cmp.span,
        }
    }
}

impl GlobalKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Math" => Some(Self::Math),
            "Date" => Some(Self::Date),
            "parseInt" => Some(Self::ParseInt),
            "parseFloat" => Some(Self::ParseFloat),
            "isNaN" => Some(Self::IsNan),
            "isFinite" => Some(Self::IsFinite),
            _ => None,
        }
    }

    pub fn human(&self) -> &'static str {
        match self {
            Self::Math => "Math",
            Self::Date => "Date",
            Self::ParseInt => "parseInt",
            Self::ParseFloat => "parseFloat",
            Self::IsNan => "isNaN",
            Self::IsFinite => "isFinite",
        }
    }
}
