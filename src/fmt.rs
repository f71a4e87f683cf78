//! Output formatting and HTML-entity escaping.
//!
//! This module defines a [`Formatter`] type that is similar to
//! [`std::fmt::Formatter`]. Rendering writes to it whether the destination
//! is a [`String`] or an arbitrary [`std::io::Write`] buffer.

use std::borrow::Cow;
use std::fmt;
use std::fmt::Write;
use std::io;

use crate::Value;

/// A [`std::fmt::Write`] façade.
pub struct Formatter<'a> {
    buf: &'a mut (dyn fmt::Write + 'a),
}

/// The result type returned from a formatting function.
pub type Result = std::result::Result<(), Error>;

/// The error type returned from a formatting function.
#[derive(Debug, Clone)]
pub struct Error(Option<String>);

pub(crate) struct Writer<W> {
    writer: W,
    err: Option<io::Error>,
}

impl<'a> Formatter<'a> {
    pub(crate) fn with_string(buf: &'a mut String) -> Self {
        Self { buf }
    }

    pub(crate) fn with_writer<W>(buf: &'a mut Writer<W>) -> Self
    where
        W: io::Write,
    {
        Self { buf }
    }
}

impl fmt::Write for Formatter<'_> {
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        fmt::Write::write_str(self.buf, s)
    }

    #[inline]
    fn write_char(&mut self, c: char) -> fmt::Result {
        fmt::Write::write_char(self.buf, c)
    }

    #[inline]
    fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        fmt::Write::write_fmt(self.buf, args)
    }
}

impl Error {
    pub(crate) fn message(self) -> Option<String> {
        self.0
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(msg) => write!(f, "{msg}"),
            None => write!(f, "format error"),
        }
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Self(Some(msg.to_owned()))
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Self(Some(msg))
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Self {
        Self(None)
    }
}

impl<W> Writer<W>
where
    W: io::Write,
{
    pub fn new(writer: W) -> Self {
        Self { writer, err: None }
    }

    pub fn take_err(&mut self) -> Option<io::Error> {
        self.err.take()
    }
}

impl<W> fmt::Write for Writer<W>
where
    W: io::Write,
{
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.writer.write_all(s.as_bytes()).map_err(|e| {
            self.err = Some(e);
            fmt::Error
        })
    }

    #[inline]
    fn write_char(&mut self, c: char) -> fmt::Result {
        self.writer
            .write_all(c.encode_utf8(&mut [0; 4]).as_bytes())
            .map_err(|e| {
                self.err = Some(e);
                fmt::Error
            })
    }
}

fn entity(c: char) -> Option<&'static str> {
    match c {
        '&' => Some("&#38;"),
        '<' => Some("&#60;"),
        '>' => Some("&#62;"),
        '"' => Some("&#34;"),
        '\'' => Some("&#39;"),
        '/' => Some("&#47;"),
        _ => None,
    }
}

/// Returns `true` if the text already starts with an entity-shaped sequence,
/// i.e. an optional `#` followed by word characters and a `;`.
fn is_entity(s: &str) -> bool {
    let s = s.strip_prefix('#').unwrap_or(s);
    let n = s
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .count();
    n > 0 && s[n..].starts_with(';')
}

/// Replace `& < > " ' /` with their numeric entity forms.
///
/// An ampersand that already begins an entity is left alone, so escaping is
/// idempotent over its own output.
pub fn escape(s: &str) -> Cow<'_, str> {
    let mut iter = s.char_indices();
    let found = loop {
        match iter.next() {
            Some((i, '&')) if !is_entity(&s[i + 1..]) => break i,
            Some((i, c)) if c != '&' && entity(c).is_some() => break i,
            Some(_) => continue,
            None => return Cow::Borrowed(s),
        }
    };

    let mut out = String::with_capacity(s.len() + 8);
    out.push_str(&s[..found]);
    for (i, c) in s[found..].char_indices() {
        match entity(c) {
            Some(e) if c != '&' || !is_entity(&s[found + i + 1..]) => out.push_str(e),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Write a value through the interpolation pipeline: none becomes the empty
/// string, scalars are stringified, and the result is escaped unless `safe`.
///
/// Errors if the value is a [`Value::List`] or [`Value::Map`].
pub(crate) fn interpolate(f: &mut Formatter<'_>, value: &Value, safe: bool) -> Result {
    match value {
        Value::None => {}
        Value::Bool(b) => write!(f, "{b}")?,
        Value::Integer(n) => write!(f, "{n}")?,
        Value::Float(n) => write!(f, "{n}")?,
        Value::String(s) => {
            if safe {
                f.write_str(s)?;
            } else {
                f.write_str(&escape(s))?;
            }
        }
        value => {
            return Err(Error::from(format!(
                "expected renderable value, but expression evaluated to {}",
                value.human()
            )));
        }
    }
    Ok(())
}
