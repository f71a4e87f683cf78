//! The tree-walking expression evaluator.
//!
//! Lookup semantics follow the original engine: a missing field on the root
//! context or a mapping evaluates to none, which interpolates as the empty
//! string; member access on none, indexing a scalar, and calling something
//! that is not callable are render-time errors surfaced to the caller.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::render::core::RendererImpl;
use crate::types::expr::{Cmp, CmpOp, Expr, GlobalKind, Ident};
use crate::types::span::Span;
use crate::value::ValueCow;
use crate::{Error, Result, Value};

impl<'render> RendererImpl<'render> {
    pub(crate) fn eval(&self, expr: &Expr) -> Result<ValueCow<'render>> {
        let source = self.source();
        match expr {
            Expr::Lit(lit) => Ok(ValueCow::Owned(lit.value.clone())),

            Expr::Seq(seq) => {
                let mut items = Vec::with_capacity(seq.items.len());
                for item in &seq.items {
                    items.push(self.eval(item)?.into_owned());
                }
                Ok(ValueCow::Owned(Value::List(items)))
            }

            Expr::Map(map) => {
                let mut entries = crate::value::Map::new();
                for (key, value) in &map.entries {
                    let key = source[key.span].to_owned();
                    entries.insert(key, self.eval(value)?.into_owned());
                }
                Ok(ValueCow::Owned(Value::Map(entries)))
            }

            Expr::Root(_) => Ok(ValueCow::Borrowed(self.globals)),

            Expr::Field(id) => {
                let name = &source[id.span];
                match self.globals {
                    Value::Map(map) => Ok(map
                        .get(name)
                        .map(ValueCow::Borrowed)
                        .unwrap_or(ValueCow::Owned(Value::None))),
                    _ => Ok(ValueCow::Owned(Value::None)),
                }
            }

            Expr::Slot(slot) => Ok(match &self.regs[slot.index] {
                ValueCow::Borrowed(v) => ValueCow::Borrowed(*v),
                ValueCow::Owned(v) => ValueCow::Owned(v.clone()),
            }),

            Expr::Ident(_) => {
                panic!("renderer bug: unresolved identifier reached the renderer")
            }

            Expr::Helper(id) => Err(Error::render(
                "helper reference is not a value",
                source,
                id.span,
            )),

            Expr::Global(global) => Err(Error::render(
                format!("`{}` is not a value", global.kind.human()),
                source,
                global.span,
            )),

            Expr::Member(member) => {
                let value = self.eval(&member.expr)?;
                self.access(value, member.name)
            }

            Expr::Index(index) => {
                let value = self.eval(&index.expr)?;
                let key = self.eval(&index.index)?;
                self.index(value, key, index.span)
            }

            Expr::Call(call) => Ok(ValueCow::Owned(self.call(call)?)),

            Expr::Cmp(cmp) => Ok(ValueCow::Owned(Value::Bool(self.compare(cmp)?))),
        }
    }

    /// Member access `value.name`.
    fn access(&self, value: ValueCow<'render>, name: Ident) -> Result<ValueCow<'render>> {
        let source = self.source();
        let raw = &source[name.span];
        match value {
            ValueCow::Borrowed(v) => match v {
                Value::Map(map) => Ok(map
                    .get(raw)
                    .map(ValueCow::Borrowed)
                    .unwrap_or(ValueCow::Owned(Value::None))),
                Value::List(list) if raw == "length" => {
                    Ok(ValueCow::Owned(Value::Integer(list.len() as i64)))
                }
                Value::String(s) if raw == "length" => {
                    Ok(ValueCow::Owned(Value::Integer(s.chars().count() as i64)))
                }
                v => Err(self.err_access(raw, v, name.span)),
            },
            ValueCow::Owned(v) => match v {
                Value::Map(mut map) => Ok(map
                    .remove(raw)
                    .map(ValueCow::Owned)
                    .unwrap_or(ValueCow::Owned(Value::None))),
                Value::List(list) if raw == "length" => {
                    Ok(ValueCow::Owned(Value::Integer(list.len() as i64)))
                }
                Value::String(s) if raw == "length" => {
                    Ok(ValueCow::Owned(Value::Integer(s.chars().count() as i64)))
                }
                v => Err(self.err_access(raw, &v, name.span)),
            },
        }
    }

    fn err_access(&self, raw: &str, value: &Value, span: Span) -> Error {
        Error::render(
            format!("cannot access `{raw}` of {}", value.human()),
            self.source(),
            span,
        )
    }

    /// Computed index `value[key]`.
    fn index(
        &self,
        value: ValueCow<'render>,
        key: ValueCow<'render>,
        span: Span,
    ) -> Result<ValueCow<'render>> {
        let source = self.source();
        let missing = || ValueCow::Owned(Value::None);
        match value {
            ValueCow::Borrowed(v) => match (v, &*key) {
                (Value::List(list), Value::Integer(i)) => Ok(usize::try_from(*i)
                    .ok()
                    .and_then(|i| list.get(i))
                    .map(ValueCow::Borrowed)
                    .unwrap_or_else(missing)),
                (Value::Map(map), Value::String(s)) => Ok(map
                    .get(s)
                    .map(ValueCow::Borrowed)
                    .unwrap_or_else(missing)),
                (v, k) => Err(self.err_index(v, k, span)),
            },
            ValueCow::Owned(v) => match (v, &*key) {
                (Value::List(mut list), Value::Integer(i)) => Ok(usize::try_from(*i)
                    .ok()
                    .filter(|i| *i < list.len())
                    .map(|i| ValueCow::Owned(list.swap_remove(i)))
                    .unwrap_or_else(missing)),
                (Value::Map(mut map), Value::String(s)) => Ok(map
                    .remove(s)
                    .map(ValueCow::Owned)
                    .unwrap_or_else(missing)),
                (v, k) => Err(self.err_index(&v, k, span)),
            },
        }
    }

    fn err_index(&self, value: &Value, key: &Value, span: Span) -> Error {
        let msg = match value {
            Value::List(_) => format!("cannot index sequence with {}", key.human()),
            Value::Map(_) => format!("cannot index mapping with {}", key.human()),
            value => format!("cannot index into {}", value.human()),
        };
        Error::render(msg, self.source(), span)
    }

    /// Dispatch a call. Only helpers and the closed set of globals are
    /// callable; data values never are.
    fn call(&self, call: &crate::types::expr::Call) -> Result<Value> {
        let source = self.source();

        match &*call.callee {
            Expr::Helper(id) => {
                let args = self.eval_args(&call.args)?;
                self.call_helper(*id, args)
            }

            Expr::Global(global) => {
                let args = self.eval_args(&call.args)?;
                match global.kind {
                    GlobalKind::ParseInt => unary(args, global.span, source, parse_int),
                    GlobalKind::ParseFloat => unary(args, global.span, source, parse_float),
                    GlobalKind::IsNan => {
                        unary(args, global.span, source, |v| {
                            Value::Bool(coerce_number(&v).is_nan())
                        })
                    }
                    GlobalKind::IsFinite => {
                        unary(args, global.span, source, |v| {
                            Value::Bool(coerce_number(&v).is_finite())
                        })
                    }
                    kind => Err(Error::render(
                        format!("`{}` is not callable", kind.human()),
                        source,
                        global.span,
                    )),
                }
            }

            Expr::Member(member) => {
                let ns = match &*member.expr {
                    Expr::Global(global) => global,
                    _ => {
                        return Err(Error::render(
                            "expression is not callable",
                            source,
                            call.callee.span(),
                        ));
                    }
                };
                let name = &source[member.name.span];
                let args = self.eval_args(&call.args)?;
                match ns.kind {
                    GlobalKind::Math => math(name, args, source, member.name.span),
                    GlobalKind::Date => date(name, args, source, member.name.span),
                    kind => Err(Error::render(
                        format!("`{}` is not a namespace", kind.human()),
                        source,
                        ns.span,
                    )),
                }
            }

            callee => Err(Error::render(
                "expression is not callable",
                source,
                callee.span(),
            )),
        }
    }

    fn eval_args(&self, args: &[Expr]) -> Result<Vec<Value>> {
        args.iter()
            .map(|arg| Ok(self.eval(arg)?.into_owned()))
            .collect()
    }

    /// Call a helper by name, checking any render-scoped overrides first.
    pub(crate) fn call_helper(&self, name: Ident, args: Vec<Value>) -> Result<Value> {
        let source = self.source();
        let raw = source[name.span].strip_prefix('@').unwrap_or(&source[name.span]);
        let helper = self
            .overrides
            .and_then(|set| set.get(raw))
            .or_else(|| self.engine.helpers.get(raw));
        match helper {
            Some(helper) => helper(crate::helpers::HelperState { source, name, args })
                .map_err(|err| err.enrich(source, name.span)),
            None => Err(Error::render("unknown helper", source, name.span)),
        }
    }

    fn compare(&self, cmp: &Cmp) -> Result<bool> {
        let lhs = self.eval(&cmp.lhs)?;
        let rhs = self.eval(&cmp.rhs)?;
        match cmp.op {
            CmpOp::Eq => Ok(value_eq(&lhs, &rhs)),
            CmpOp::Ne => Ok(!value_eq(&lhs, &rhs)),
            op => {
                let ord = match (&*lhs, &*rhs) {
                    (Value::Integer(a), Value::Integer(b)) => a.partial_cmp(b),
                    (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
                    (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
                    (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
                    (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                    (a, b) => {
                        return Err(Error::render(
                            format!("cannot compare {} with {}", a.human(), b.human()),
                            self.source(),
                            cmp.span,
                        ));
                    }
                };
                Ok(match ord {
                    Some(ord) => match op {
                        CmpOp::Lt => ord.is_lt(),
                        CmpOp::Le => ord.is_le(),
                        CmpOp::Gt => ord.is_gt(),
                        CmpOp::Ge => ord.is_ge(),
                        CmpOp::Eq | CmpOp::Ne => unreachable!(),
                    },
                    // NaN comparisons
                    None => false,
                })
            }
        }
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Integer(a), Value::Float(b)) => (*a as f64) == *b,
        (Value::Float(a), Value::Integer(b)) => *a == (*b as f64),
        (a, b) => a == b,
    }
}

fn unary(
    mut args: Vec<Value>,
    span: Span,
    source: &str,
    f: impl FnOnce(Value) -> Value,
) -> Result<Value> {
    if args.len() != 1 {
        return Err(Error::render("expected one argument", source, span));
    }
    Ok(f(args.remove(0)))
}

/// JS-style numeric coercion used by the number-parsing globals.
fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::None => f64::NAN,
        Value::Bool(b) => *b as u8 as f64,
        Value::Integer(n) => *n as f64,
        Value::Float(n) => *n,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse().unwrap_or(f64::NAN)
            }
        }
        Value::List(_) | Value::Map(_) => f64::NAN,
    }
}

/// Parse the leading integer of a string, like the original host's
/// `parseInt`: `parseInt("12px")` is 12.
fn parse_int(value: Value) -> Value {
    match value {
        Value::Integer(n) => Value::Integer(n),
        Value::Float(f) if f.is_finite() => Value::Integer(f.trunc() as i64),
        Value::String(s) => {
            let s = s.trim_start();
            let (neg, digits) = match s.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, s.strip_prefix('+').unwrap_or(s)),
            };
            let len = digits.bytes().take_while(|b| b.is_ascii_digit()).count();
            match digits[..len].parse::<i64>() {
                Ok(n) => Value::Integer(if neg { -n } else { n }),
                Err(_) => Value::Float(f64::NAN),
            }
        }
        _ => Value::Float(f64::NAN),
    }
}

/// Parse the leading float of a string, `parseFloat` style.
fn parse_float(value: Value) -> Value {
    match value {
        Value::Integer(n) => Value::Float(n as f64),
        Value::Float(f) => Value::Float(f),
        Value::String(s) => {
            let s = s.trim_start();
            let mut len = 0;
            let mut seen_dot = false;
            let mut seen_exp = false;
            for (i, c) in s.char_indices() {
                match c {
                    '0'..='9' => {}
                    '+' | '-' if i == 0 => {}
                    '.' if !seen_dot && !seen_exp => seen_dot = true,
                    'e' | 'E' if !seen_exp && i > 0 => seen_exp = true,
                    '+' | '-' if seen_exp && matches!(s.as_bytes()[i - 1], b'e' | b'E') => {}
                    _ => break,
                }
                len = i + c.len_utf8();
            }
            s[..len]
                .parse::<f64>()
                .map(Value::Float)
                .unwrap_or(Value::Float(f64::NAN))
        }
        _ => Value::Float(f64::NAN),
    }
}

fn math(name: &str, args: Vec<Value>, source: &str, span: Span) -> Result<Value> {
    let fold = |args: &[Value], f: fn(f64, f64) -> f64, init: f64| {
        Value::Float(args.iter().map(coerce_number).fold(init, f))
    };
    match name {
        "abs" => unary(args, span, source, |v| match v {
            Value::Integer(n) => Value::Integer(n.abs()),
            v => Value::Float(coerce_number(&v).abs()),
        }),
        "floor" => unary(args, span, source, |v| trunc(coerce_number(&v).floor())),
        "ceil" => unary(args, span, source, |v| trunc(coerce_number(&v).ceil())),
        "round" => unary(args, span, source, |v| trunc(coerce_number(&v).round())),
        "sqrt" => unary(args, span, source, |v| {
            Value::Float(coerce_number(&v).sqrt())
        }),
        "min" => Ok(fold(&args, f64::min, f64::INFINITY)),
        "max" => Ok(fold(&args, f64::max, f64::NEG_INFINITY)),
        name => Err(Error::render(
            format!("unknown function `Math.{name}`"),
            source,
            span,
        )),
    }
}

fn trunc(f: f64) -> Value {
    if f.is_finite() {
        Value::Integer(f as i64)
    } else {
        Value::Float(f)
    }
}

fn date(name: &str, args: Vec<Value>, source: &str, span: Span) -> Result<Value> {
    match name {
        "now" => {
            if !args.is_empty() {
                return Err(Error::render("expected no arguments", source, span));
            }
            let ms = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as i64)
                .unwrap_or(0);
            Ok(Value::Integer(ms))
        }
        name => Err(Error::render(
            format!("unknown function `Date.{name}`"),
            source,
            span,
        )),
    }
}
