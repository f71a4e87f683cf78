mod core;
mod eval;
mod iter;

use std::io;

use crate::fmt::{Formatter, Writer};
use crate::helpers::HelperSet;
use crate::render::core::RendererImpl;
use crate::types::program::Template;
use crate::{Engine, Error, Result, Value};

/// Render a template to a string.
pub(crate) fn template<'render>(
    engine: &'render Engine,
    template: &'render Template<'render>,
    globals: Value,
    overrides: Option<&'render HelperSet>,
) -> Result<String> {
    let mut s = String::with_capacity(template.source.len());
    let mut f = Formatter::with_string(&mut s);
    RendererImpl::new(engine, template, &globals, overrides).render(&mut f)?;
    Ok(s)
}

/// Render a template to a writer.
pub(crate) fn template_to<'render, W>(
    engine: &'render Engine,
    template: &'render Template<'render>,
    writer: W,
    globals: Value,
    overrides: Option<&'render HelperSet>,
) -> Result<()>
where
    W: io::Write,
{
    let mut w = Writer::new(writer);
    let mut f = Formatter::with_writer(&mut w);
    RendererImpl::new(engine, template, &globals, overrides)
        .render(&mut f)
        .map_err(|err| w.take_err().map(Error::io).unwrap_or(err))
}
