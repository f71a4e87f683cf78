use std::cmp::max;
use std::fmt;
use std::io;

use crate::types::span::Span;

/// A convenient type alias for results in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur during template compilation or rendering.
pub struct Error {
    kind: ErrorKind,
    msg: String,
    ctx: Option<(String, Span)>,
}

/// A classification of template errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A close marker with no matching open, or a block left unclosed at the
    /// end of the template.
    UnbalancedBlock,
    /// Any other error raised while compiling a template.
    Syntax,
    /// An error raised while rendering a compiled template.
    Render,
    /// A value could not be formatted into the output.
    Format,
    /// The data context could not be serialized.
    Serialize,
    /// An underlying IO error, only possible when rendering to a writer.
    Io,
}

impl Error {
    fn new(kind: ErrorKind, msg: impl Into<String>, source: &str, span: impl Into<Span>) -> Self {
        Self {
            kind,
            msg: msg.into(),
            ctx: Some((source.to_string(), span.into())),
        }
    }

    pub(crate) fn unbalanced(
        msg: impl Into<String>,
        source: &str,
        span: impl Into<Span>,
    ) -> Self {
        Self::new(ErrorKind::UnbalancedBlock, msg, source, span)
    }

    pub(crate) fn syntax(msg: impl Into<String>, source: &str, span: impl Into<Span>) -> Self {
        Self::new(ErrorKind::Syntax, msg, source, span)
    }

    pub(crate) fn render(msg: impl Into<String>, source: &str, span: impl Into<Span>) -> Self {
        Self::new(ErrorKind::Render, msg, source, span)
    }

    pub(crate) fn format(err: crate::fmt::Error, source: &str, span: impl Into<Span>) -> Self {
        let msg = match err.message() {
            Some(msg) => msg,
            None => String::from("format error"),
        };
        Self::new(ErrorKind::Format, msg, source, span)
    }

    pub(crate) fn serialize(err: serde_json::Error) -> Self {
        Self {
            kind: ErrorKind::Serialize,
            msg: err.to_string(),
            ctx: None,
        }
    }

    pub(crate) fn io(err: io::Error) -> Self {
        Self {
            kind: ErrorKind::Io,
            msg: err.to_string(),
            ctx: None,
        }
    }

    /// Attach source context to an error that was raised without any, e.g. by
    /// a helper function.
    pub(crate) fn enrich(mut self, source: &str, span: impl Into<Span>) -> Self {
        if self.ctx.is_none() {
            self.ctx = Some((source.to_string(), span.into()));
        }
        self
    }

    /// The classification of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Allows helper functions to return simple message errors.
impl From<String> for Error {
    fn from(msg: String) -> Self {
        Self {
            kind: ErrorKind::Render,
            msg,
            ctx: None,
        }
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Self::from(msg.to_owned())
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Self {
        Self {
            kind: ErrorKind::Format,
            msg: String::from("a formatting trait implementation returned an error"),
            ctx: None,
        }
    }
}

impl std::error::Error for Error {}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ctx {
            Some((source, span)) => fmt_pretty(&self.msg, source, *span, f),
            None => write!(f, "{}", self.msg),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ctx {
            Some((source, span)) => {
                if f.alternate() {
                    fmt_pretty(&self.msg, source, *span, f)
                } else {
                    write!(f, "{} between bytes {} and {}", self.msg, span.m, span.n)
                }
            }
            None => write!(f, "{}", self.msg),
        }
    }
}

fn fmt_pretty(msg: &str, source: &str, span: Span, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let lines: Vec<_> = source.split_terminator('\n').collect();
    let (line, col) = to_line_col(&lines, span.m);
    let width = max(1, display_width(&source[span]));
    let code = lines
        .get(line)
        .or_else(|| lines.last())
        .copied()
        .unwrap_or("");

    let num = (line + 1).to_string();
    let pad = display_width(&num);
    let pipe = "|";
    let underline = "^".repeat(width);

    write!(
        f,
        "\n \
        {0:pad$} {pipe}\n \
        {num:>} {pipe} {code}\n \
        {0:pad$} {pipe} {underline:>width$} {msg}\n",
        "",
        pad = pad,
        pipe = pipe,
        num = num,
        code = code,
        underline = underline,
        width = col + width,
        msg = msg
    )
}

fn to_line_col(lines: &[&str], offset: usize) -> (usize, usize) {
    let mut n = 0;
    for (i, line) in lines.iter().enumerate() {
        let len = display_width(line) + 1;
        if n + len > offset {
            return (i, offset - n);
        }
        n += len;
    }
    (
        lines.len(),
        lines.last().map(|l| display_width(l)).unwrap_or(0),
    )
}

#[cfg(feature = "unicode")]
fn display_width(s: &str) -> usize {
    unicode_width::UnicodeWidthStr::width(s)
}

#[cfg(not(feature = "unicode"))]
fn display_width(s: &str) -> usize {
    s.chars().count()
}
