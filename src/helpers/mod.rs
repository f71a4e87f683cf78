//! The helper namespace.
//!
//! Helpers are named functions callable from templates, either as a
//! trailing pipe modifier (`#(name):upper`) or through the helper sigil in
//! expressions (`@upper(name)`). Registration is first-write-wins: adding a
//! helper under an existing name is a no-op.

mod args;
#[cfg(feature = "builtins")]
pub mod builtins;

use std::collections::BTreeMap;

use crate::types::expr::Ident;
use crate::{Error, Result, Value};

/// The state passed to a helper invocation. The piped or first call
/// argument is `args[0]`.
pub struct HelperState<'a> {
    pub(crate) source: &'a str,
    pub(crate) name: Ident,
    pub args: Vec<Value>,
}

pub type HelperFn = dyn Fn(HelperState<'_>) -> Result<Value> + Send + Sync + 'static;

/// A set of named helpers.
///
/// The engine owns one; another can be passed at render time to override or
/// extend it for a single render call.
pub struct HelperSet {
    map: BTreeMap<String, Box<HelperFn>>,
}

impl Default for HelperSet {
    fn default() -> Self {
        Self::new()
    }
}

impl HelperSet {
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    /// Add a helper under the given name.
    ///
    /// If the name is already registered this does nothing.
    pub fn add<F, R, A>(&mut self, name: impl Into<String>, f: F)
    where
        F: Helper<R, A> + Send + Sync + 'static,
        R: HelperReturn,
        A: HelperArgs,
    {
        self.map.entry(name.into()).or_insert_with(|| new(f));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&HelperFn> {
        self.map.get(name).map(|f| &**f)
    }
}

impl std::fmt::Debug for HelperSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelperSet")
            .field("helpers", &self.map.keys())
            .finish()
    }
}

pub(crate) fn new<F, R, A>(f: F) -> Box<HelperFn>
where
    F: Helper<R, A> + Send + Sync + 'static,
    R: HelperReturn,
    A: HelperArgs,
{
    Box::new(move |state: HelperState<'_>| -> Result<Value> {
        let args = A::from_state(state)?;
        HelperReturn::to_value(Helper::call(&f, args))
    })
}

/// Represents any helper function.
///
/// This trait is used by [`Engine::add_helper`][crate::Engine::add_helper]
/// to abstract over a variety of function and closure types, with variable
/// argument types, return types, and arity. The first argument always
/// receives the piped value or the first call argument; up to two more may
/// follow. Argument count and types are checked when the helper is called.
///
/// [`Helper`] is implemented for functions that return any of the following
/// types.
///
/// - `R` where `R` implements `Into<Value>`
/// - `Result<R>` where `R` implements `Into<Value>`
/// - `Result<R, String>` where `R` implements `Into<Value>`
///
/// And that take any of the following argument types.
///
/// - [`bool`]
/// - [`i64`]
/// - [`f64`]
/// - [`String`]
/// - [`Vec<Value>`]
/// - [`BTreeMap<String, Value>`][std::collections::BTreeMap]
/// - [`Value`]
///
/// # Examples
///
/// ```
/// let mut engine = octo::Engine::new();
/// engine.add_helper("repeat", |s: String, n: i64| s.repeat(n as usize));
///
/// let result = engine
///     .compile("#(@repeat(word, 3))")?
///     .render(octo::data! { word: "ha" })?;
/// assert_eq!(result, "hahaha");
/// # Ok::<(), octo::Error>(())
/// ```
pub trait Helper<R, A>
where
    A: HelperArgs,
{
    #[doc(hidden)]
    fn call(&self, args: A) -> R;
}

pub trait HelperArgs: Sized {
    #[doc(hidden)]
    fn from_state(state: HelperState<'_>) -> Result<Self>;
}

pub trait HelperArg: Sized {
    #[doc(hidden)]
    fn from_value(v: Value) -> args::Result<Self>;
}

pub trait HelperReturn {
    #[doc(hidden)]
    fn to_value(self) -> Result<Value>;
}

////////////////////////////////////////////////////////////////////////////////
// Helper
////////////////////////////////////////////////////////////////////////////////

impl<Func, R, V> Helper<R, (V,)> for Func
where
    Func: Fn(V) -> R,
    R: HelperReturn,
    V: HelperArg,
{
    #[doc(hidden)]
    fn call(&self, (v,): (V,)) -> R {
        self(v)
    }
}

impl<Func, R, V, A> Helper<R, (V, A)> for Func
where
    Func: Fn(V, A) -> R,
    R: HelperReturn,
    V: HelperArg,
    A: HelperArg,
{
    #[doc(hidden)]
    fn call(&self, (v, a): (V, A)) -> R {
        self(v, a)
    }
}

impl<Func, R, V, A, B> Helper<R, (V, A, B)> for Func
where
    Func: Fn(V, A, B) -> R,
    R: HelperReturn,
    V: HelperArg,
    A: HelperArg,
    B: HelperArg,
{
    #[doc(hidden)]
    fn call(&self, (v, a, b): (V, A, B)) -> R {
        self(v, a, b)
    }
}

////////////////////////////////////////////////////////////////////////////////
// HelperArgs
////////////////////////////////////////////////////////////////////////////////

impl<V> HelperArgs for (V,)
where
    V: HelperArg,
{
    fn from_state(state: HelperState<'_>) -> Result<Self> {
        let (source, name) = (state.source, state.name);
        check_args(source, name, &state.args, 1)?;
        let mut iter = state.args.into_iter();
        let v = next_arg(source, name, &mut iter)?;
        Ok((v,))
    }
}

impl<V, A> HelperArgs for (V, A)
where
    V: HelperArg,
    A: HelperArg,
{
    fn from_state(state: HelperState<'_>) -> Result<Self> {
        let (source, name) = (state.source, state.name);
        check_args(source, name, &state.args, 2)?;
        let mut iter = state.args.into_iter();
        let v = next_arg(source, name, &mut iter)?;
        let a = next_arg(source, name, &mut iter)?;
        Ok((v, a))
    }
}

impl<V, A, B> HelperArgs for (V, A, B)
where
    V: HelperArg,
    A: HelperArg,
    B: HelperArg,
{
    fn from_state(state: HelperState<'_>) -> Result<Self> {
        let (source, name) = (state.source, state.name);
        check_args(source, name, &state.args, 3)?;
        let mut iter = state.args.into_iter();
        let v = next_arg(source, name, &mut iter)?;
        let a = next_arg(source, name, &mut iter)?;
        let b = next_arg(source, name, &mut iter)?;
        Ok((v, a, b))
    }
}

fn check_args(source: &str, name: Ident, args: &[Value], exp: usize) -> Result<()> {
    if args.len() == exp {
        Ok(())
    } else {
        Err(Error::render(
            format!("helper expected {} arguments, found {}", exp, args.len()),
            source,
            name.span,
        ))
    }
}

fn next_arg<T>(
    source: &str,
    name: Ident,
    iter: &mut std::vec::IntoIter<Value>,
) -> Result<T>
where
    T: HelperArg,
{
    let value = iter.next().expect("arity already checked");
    T::from_value(value).map_err(|err| {
        let args::Error::Type(exp, got) = err;
        Error::render(
            format!("helper expected {exp} argument, found {got}"),
            source,
            name.span,
        )
    })
}

////////////////////////////////////////////////////////////////////////////////
// HelperReturn
////////////////////////////////////////////////////////////////////////////////

impl<T> HelperReturn for T
where
    T: Into<Value>,
{
    fn to_value(self) -> Result<Value> {
        Ok(self.into())
    }
}

impl<T> HelperReturn for Result<T>
where
    T: Into<Value>,
{
    fn to_value(self) -> Result<Value> {
        self.map(Into::into)
    }
}

impl<T> HelperReturn for std::result::Result<T, String>
where
    T: Into<Value>,
{
    fn to_value(self) -> Result<Value> {
        self.map(Into::into).map_err(Error::from)
    }
}
