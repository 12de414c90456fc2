//! Evaluation context for variables and template call depth.

use std::mem;

use crate::interpreter::ExecErrorKind;
use crate::types::Value;

/// Variable bindings and call depth during one render.
///
/// Variables live on a stack; blocks take a [`mark`](Self::mark) on entry and
/// [`restore`](Self::restore) it on exit so their declarations go out of
/// scope. `$` is always the first binding.
pub struct EvalContext<'m> {
    variables: Vec<(String, Value<'m>)>,
    /// Current `{{template}}` nesting depth.
    depth: usize,
    max_depth: usize,
}

impl<'m> EvalContext<'m> {
    /// Create a context with `$` bound to `root`.
    pub fn new(root: Value<'m>, max_depth: usize) -> Self {
        Self {
            variables: vec![(String::new(), root)],
            depth: 0,
            max_depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn mark(&self) -> usize {
        self.variables.len()
    }

    pub fn restore(&mut self, mark: usize) {
        self.variables.truncate(mark);
    }

    /// Bind a new variable, shadowing any outer one with the same name.
    pub fn declare(&mut self, name: &str, value: Value<'m>) {
        self.variables.push((name.to_string(), value));
    }

    /// Overwrite the innermost binding of `name`.
    pub fn assign(&mut self, name: &str, value: Value<'m>) -> Result<(), ExecErrorKind> {
        let slot = self
            .variables
            .iter_mut()
            .rev()
            .find(|(declared, _)| declared == name)
            .ok_or_else(|| ExecErrorKind::UndefinedVariable {
                name: name.to_string(),
            })?;
        slot.1 = value;
        Ok(())
    }

    /// Look up the innermost binding of `name` (`""` for `$`).
    pub fn get(&self, name: &str) -> Result<Value<'m>, ExecErrorKind> {
        self.variables
            .iter()
            .rev()
            .find(|(declared, _)| declared == name)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| ExecErrorKind::UndefinedVariable {
                name: name.to_string(),
            })
    }

    /// Enter a `{{template}}` body: a fresh scope with `$` bound to `dot`.
    ///
    /// Returns the caller's bindings, to be handed back to
    /// [`leave_template`](Self::leave_template).
    pub fn enter_template(
        &mut self,
        dot: Value<'m>,
    ) -> Result<Vec<(String, Value<'m>)>, ExecErrorKind> {
        if self.depth >= self.max_depth {
            return Err(ExecErrorKind::MaxDepthExceeded {
                max: self.max_depth,
            });
        }
        self.depth += 1;
        Ok(mem::replace(
            &mut self.variables,
            vec![(String::new(), dot)],
        ))
    }

    pub fn leave_template(&mut self, saved: Vec<(String, Value<'m>)>) {
        self.variables = saved;
        self.depth = self.depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_drops_inner_declarations() {
        let mut ctx = EvalContext::new(Value::Nil, 10);
        let mark = ctx.mark();
        ctx.declare("x", Value::from("inner"));
        assert_eq!(ctx.get("x"), Ok(Value::from("inner")));
        ctx.restore(mark);
        assert!(ctx.get("x").is_err());
        assert_eq!(ctx.get(""), Ok(Value::Nil));
    }

    #[test]
    fn assign_updates_innermost() {
        let mut ctx = EvalContext::new(Value::Nil, 10);
        ctx.declare("x", Value::from("outer"));
        ctx.declare("x", Value::from("inner"));
        ctx.assign("x", Value::from("changed")).unwrap();
        assert_eq!(ctx.get("x"), Ok(Value::from("changed")));
    }

    #[test]
    fn depth_is_limited() {
        let mut ctx = EvalContext::new(Value::Nil, 1);
        let saved = ctx.enter_template(Value::Nil).unwrap();
        assert_eq!(
            ctx.enter_template(Value::Nil).unwrap_err(),
            ExecErrorKind::MaxDepthExceeded { max: 1 }
        );
        ctx.leave_template(saved);
        assert_eq!(ctx.depth(), 0);
    }
}
