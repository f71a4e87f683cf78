//! A compact template engine with `#`-directive syntax.
//!
//! # Features
//!
//! ### Syntax
//!
//! - Interpolation: `Hello #(user.name)!`
//! - Unsafe (unescaped) interpolation: `#!(article.body)`
//! - Conditionals: `#if(user.enabled){ ... }#elseif(user.invited){ ... }#else{ ... }`
//! - Mapping enumeration: `#each(user.settings -> key, value){ ... }`
//! - Sequence iteration: `#for(user.roles -> role, i){ ... }`
//! - Compile-time partials: `#def("header"){ ... }` and `#use("header")`
//! - JSON output: `#json(user)`
//! - Helper pipes: `#(user.name):upper` and calls: `#(@upper(user.name))`
//! - Comments: `## to end of line` and `#* anywhere *#`
//!
//! ### Engine
//!
//! - Interpolated output is HTML-entity escaped by default
//! - Templates compile to an inspectable instruction program, no runtime
//!   code generation
//! - Render to a [`String`] or any [`std::io::Write`] implementor
//! - Render using any [`serde`] serializable values
//! - Convenient macro for quick rendering:
//!   `octo::data!{ name: "John", age: 42 }`
//! - Minimal dependencies and decent runtime performance
//!
//! # Getting started
//!
//! Your entry point is the [`Engine`] struct. The engine stores the
//! settings, the directive registry, helper functions, and compiled
//! templates. Generally, you only need to construct one engine during the
//! lifetime of a program.
//!
//! ```
//! let engine = octo::Engine::new();
//! ```
//!
//! Compiling and rendering a template:
//!
//! ```
//! let engine = octo::Engine::new();
//! let template = engine.compile("Hello #(user.name)!")?;
//! let result = template.render(octo::data! { user: { name: "John Smith" } })?;
//! assert_eq!(result, "Hello John Smith!");
//! # Ok::<(), octo::Error>(())
//! ```
//!
//! Interpolated values are escaped unless the directive carries the unsafe
//! marker.
//!
//! ```
//! # let engine = octo::Engine::new();
//! let result = engine
//!     .compile("#(value)")?
//!     .render(octo::data! { value: "<b>" })?;
//! assert_eq!(result, "&#60;b&#62;");
//!
//! let result = engine
//!     .compile("#!(value)")?
//!     .render(octo::data! { value: "<b>" })?;
//! assert_eq!(result, "<b>");
//! # Ok::<(), octo::Error>(())
//! ```
//!
//! Templates can also be compiled and stored under a name.
//!
//! ```
//! let mut engine = octo::Engine::new();
//! engine.add_template("hello", "Hello #(user.name)!")?;
//!
//! let result = engine
//!     .get_template("hello")
//!     .unwrap()
//!     .render(octo::data! { user: { name: "John Smith" } })?;
//! assert_eq!(result, "Hello John Smith!");
//! # Ok::<(), octo::Error>(())
//! ```
//!
//! # Examples
//!
//! ### Render using structured data
//!
//! ```
//! #[derive(serde::Serialize)]
//! struct Context {
//!     user: User,
//! }
//!
//! #[derive(serde::Serialize)]
//! struct User {
//!     name: String,
//! }
//!
//! let ctx = Context {
//!     user: User {
//!         name: "John Smith".into(),
//!     },
//! };
//!
//! let result = octo::Engine::new()
//!     .compile("Hello #(user.name)")?
//!     .render(&ctx)?;
//!
//! assert_eq!(result, "Hello John Smith");
//! # Ok::<(), octo::Error>(())
//! ```
//!
//! ### Transform data using helpers
//!
//! ```
//! let mut engine = octo::Engine::new();
//! engine.add_helper("exclaim", |s: String| s + "!");
//!
//! let result = engine
//!     .compile("Hello #(value):exclaim")?
//!     .render(octo::data! { value: "world" })?;
//!
//! assert_eq!(result, "Hello world!");
//! # Ok::<(), octo::Error>(())
//! ```
//!
//! See the [`Helper`] trait documentation for more information on helpers.
//!
//! ### Custom settings
//!
//! ```
//! use octo::{Engine, Settings};
//!
//! let settings = Settings::new().sigil('@').strict(true);
//! let engine = Engine::with_settings(settings);
//!
//! let result = engine
//!     .compile("Hello @(user.name)")?
//!     .render(octo::data! { user: { name: "John Smith" } })?;
//! assert_eq!(result, "Hello John Smith");
//! # Ok::<(), octo::Error>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

mod compile;
mod error;
pub mod fmt;
mod helpers;
mod macros;
mod render;
mod types;
mod value;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io;

use crate::compile::ops::Registry;
pub use crate::error::{Error, ErrorKind, Result};
#[cfg(feature = "builtins")]
pub use crate::helpers::builtins;
pub use crate::helpers::{Helper, HelperArg, HelperArgs, HelperReturn, HelperSet, HelperState};
use crate::types::program;
pub use crate::types::token::{Descriptor, Op};
pub use crate::value::{to_value, List, Map, Value};

/// The compilation and rendering engine.
pub struct Engine {
    pub(crate) settings: Settings,
    pub(crate) registry: Registry,
    pub(crate) helpers: HelperSet,
    pub(crate) max_partial_depth: usize,
    templates: BTreeMap<String, program::Template<'static>>,
}

/// Compile-time settings for an [`Engine`].
///
/// - `sigil`: the character that introduces a directive, `#` by default.
/// - `strip`: collapse indentation-only whitespace on each line.
/// - `append`: coalesce adjacent literal output into single instructions;
///   disabling keeps them separate. The rendered output is identical.
/// - `strict`: turn directive argument grammar mismatches into compile
///   errors instead of leaving the directive as literal text.
#[derive(Debug, Clone)]
pub struct Settings {
    pub(crate) sigil: char,
    pub(crate) strip: bool,
    pub(crate) append: bool,
    pub(crate) strict: bool,
}

/// A compiled template.
pub struct Template<'engine, 'source> {
    engine: &'engine Engine,
    template: program::Template<'source>,
}

/// A reference to a compiled template stored in an [`Engine`].
#[derive(Clone, Copy)]
pub struct TemplateRef<'engine> {
    engine: &'engine Engine,
    template: &'engine program::Template<'static>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sigil: '#',
            strip: false,
            append: true,
            strict: false,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directive sigil character.
    pub fn sigil(mut self, sigil: char) -> Self {
        self.sigil = sigil;
        self
    }

    /// Collapse indentation-only whitespace on each line of the template.
    pub fn strip(mut self, strip: bool) -> Self {
        self.strip = strip;
        self
    }

    /// Choose between appending and statement-style output assembly.
    pub fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// Reject directives whose arguments fail to match their grammar.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

impl Default for Engine {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Construct a new engine.
    #[inline]
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    /// Construct a new engine with the given settings.
    ///
    /// # Examples
    ///
    /// ```
    /// use octo::{Engine, Settings};
    ///
    /// let engine = Engine::with_settings(Settings::new().strip(true));
    /// ```
    pub fn with_settings(settings: Settings) -> Self {
        #[allow(unused_mut)]
        let mut helpers = HelperSet::new();
        #[cfg(feature = "builtins")]
        helpers::builtins::register(&mut helpers);
        Self {
            settings,
            registry: Registry::default(),
            helpers,
            max_partial_depth: 64,
            templates: BTreeMap::new(),
        }
    }

    /// Add a new helper to the engine.
    ///
    /// Helper registration is first-write-wins: if the name is already
    /// registered this does nothing.
    #[inline]
    pub fn add_helper<F, R, A>(&mut self, name: impl Into<String>, f: F)
    where
        F: Helper<R, A> + Send + Sync + 'static,
        R: HelperReturn,
        A: HelperArgs,
    {
        self.helpers.add(name, f);
    }

    /// Register a directive descriptor, e.g. to alias a built-in directive
    /// under another name.
    ///
    /// Registering an existing name silently replaces the prior entry.
    #[inline]
    pub fn add_directive(&mut self, name: impl Into<String>, desc: Descriptor) {
        self.registry.register(name, desc);
    }

    /// Set the maximum partial expansion depth, which guards compilation
    /// against self-referential partials. Defaults to 64.
    #[inline]
    pub fn set_max_partial_depth(&mut self, depth: usize) {
        self.max_partial_depth = depth;
    }

    /// Compile a template.
    #[inline]
    pub fn compile<'source>(&self, source: &'source str) -> Result<Template<'_, 'source>> {
        let template = compile::template(self, source)?;
        Ok(Template {
            engine: self,
            template,
        })
    }

    /// Compile a template and store it under the given name.
    #[inline]
    pub fn add_template(&mut self, name: impl Into<String>, source: &str) -> Result<()> {
        let template = compile::template(self, source)?;
        let template = program::Template {
            source: Cow::Owned(template.source.into_owned()),
            instrs: template.instrs,
            slots: template.slots,
        };
        self.templates.insert(name.into(), template);
        Ok(())
    }

    /// Lookup a template by name.
    #[inline]
    pub fn get_template(&self, name: &str) -> Option<TemplateRef<'_>> {
        self.templates.get(name).map(|template| TemplateRef {
            engine: self,
            template,
        })
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("settings", &self.settings)
            .field("registry", &self.registry)
            .field("helpers", &self.helpers)
            .field("templates", &self.templates.keys())
            .finish()
    }
}

impl<'engine, 'source> Template<'engine, 'source> {
    /// Render the template to a string using the provided value.
    #[inline]
    pub fn render<S>(&self, ctx: S) -> Result<String>
    where
        S: serde::Serialize,
    {
        render::template(self.engine, &self.template, to_value(ctx)?, None)
    }

    /// Render the template with an additional set of helpers that take
    /// precedence over the engine's for this render only.
    #[inline]
    pub fn render_with_helpers<S>(&self, ctx: S, helpers: &HelperSet) -> Result<String>
    where
        S: serde::Serialize,
    {
        render::template(self.engine, &self.template, to_value(ctx)?, Some(helpers))
    }

    /// Render the template to a writer using the provided value.
    #[inline]
    pub fn render_to_writer<W, S>(&self, writer: W, ctx: S) -> Result<()>
    where
        W: io::Write,
        S: serde::Serialize,
    {
        render::template_to(self.engine, &self.template, writer, to_value(ctx)?, None)
    }

    /// Returns the template source, after any normalization.
    #[inline]
    pub fn source(&self) -> &str {
        &self.template.source
    }
}

impl std::fmt::Debug for Template<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Template")
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

impl<'engine> TemplateRef<'engine> {
    /// Render the template to a string using the provided value.
    #[inline]
    pub fn render<S>(&self, ctx: S) -> Result<String>
    where
        S: serde::Serialize,
    {
        render::template(self.engine, self.template, to_value(ctx)?, None)
    }

    /// Render the template with an additional set of helpers that take
    /// precedence over the engine's for this render only.
    #[inline]
    pub fn render_with_helpers<S>(&self, ctx: S, helpers: &HelperSet) -> Result<String>
    where
        S: serde::Serialize,
    {
        render::template(self.engine, self.template, to_value(ctx)?, Some(helpers))
    }

    /// Render the template to a writer using the provided value.
    #[inline]
    pub fn render_to_writer<W, S>(&self, writer: W, ctx: S) -> Result<()>
    where
        W: io::Write,
        S: serde::Serialize,
    {
        render::template_to(self.engine, self.template, writer, to_value(ctx)?, None)
    }

    /// Returns the template source, after any normalization.
    #[inline]
    pub fn source(&self) -> &'engine str {
        &self.template.source
    }
}

impl std::fmt::Debug for TemplateRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRef")
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}
