use std::fmt::Write;

use crate::fmt::Formatter;
use crate::helpers::HelperSet;
use crate::render::iter::LoopState;
use crate::types::program::{Instr, Template};
use crate::value::ValueCow;
use crate::{Engine, Error, Result, Value};

/// A renderer that interprets a compiled [`Template`].
///
/// The program is read-only; all mutable state lives here, so a template can
/// be rendered repeatedly and concurrently against independent contexts.
pub struct RendererImpl<'render> {
    pub(crate) engine: &'render Engine,
    pub(crate) template: &'render Template<'render>,
    pub(crate) globals: &'render Value,
    pub(crate) overrides: Option<&'render HelperSet>,
    /// The register file holding loop variable bindings.
    pub(crate) regs: Vec<ValueCow<'render>>,
    /// The stack of in-progress loops.
    pub(crate) loops: Vec<LoopState<'render>>,
}

impl<'render> RendererImpl<'render> {
    pub(crate) fn new(
        engine: &'render Engine,
        template: &'render Template<'render>,
        globals: &'render Value,
        overrides: Option<&'render HelperSet>,
    ) -> Self {
        Self {
            engine,
            template,
            globals,
            overrides,
            regs: vec![ValueCow::Owned(Value::None); template.slots],
            loops: Vec::new(),
        }
    }

    pub(crate) fn source(&self) -> &'render str {
        &self.template.source
    }

    pub(crate) fn render(mut self, f: &mut Formatter<'_>) -> Result<()> {
        let t = self.template;
        let mut pc = 0;

        while let Some(instr) = t.instrs.get(pc) {
            match instr {
                Instr::EmitRaw(span) => {
                    f.write_str(&t.source[*span])?;
                }

                Instr::Emit(interp) => {
                    let mut value = self.eval(&interp.expr)?;
                    for pipe in &interp.pipes {
                        let piped = self.call_helper(*pipe, vec![value.into_owned()])?;
                        value = ValueCow::Owned(piped);
                    }
                    if interp.json {
                        let json = serde_json::to_string(&*value).map_err(|err| {
                            Error::render(
                                format!("failed to serialize value: {err}"),
                                self.source(),
                                interp.span,
                            )
                        })?;
                        if interp.unsafe_ {
                            f.write_str(&json)?;
                        } else {
                            f.write_str(&crate::fmt::escape(&json))?;
                        }
                    } else {
                        crate::fmt::interpolate(f, &value, interp.unsafe_)
                            .map_err(|err| Error::format(err, self.source(), interp.span))?;
                    }
                }

                Instr::Jump(j) => {
                    pc = *j;
                    continue;
                }

                Instr::JumpIfFalsy(expr, j) => {
                    let value = self.eval(expr)?;
                    if !value.is_truthy() {
                        pc = *j;
                        continue;
                    }
                }

                Instr::EachStart(each) => {
                    let source = self.eval(&each.source)?;
                    self.loops
                        .push(LoopState::entries(source, each.key, each.value));
                }

                Instr::ForStart(spec) => {
                    let source = self.eval(&spec.source)?;
                    self.loops
                        .push(LoopState::sequence(source, spec.value, spec.index));
                }

                Instr::LoopNext(exit) => {
                    let state = self
                        .loops
                        .last_mut()
                        .expect("renderer bug: loop next with no loop state");
                    match state.advance() {
                        Some((a, b)) => {
                            self.regs[a.slot] = a.value;
                            if let Some(b) = b {
                                self.regs[b.slot] = b.value;
                            }
                        }
                        None => {
                            self.loops.pop();
                            pc = *exit;
                            continue;
                        }
                    }
                }
            }
            pc += 1;
        }

        assert!(pc == t.instrs.len());
        Ok(())
    }
}
