//! Traversal state for one compilation unit.

use crate::error::{Result, SprigError};
use crate::options::LowerOptions;
use crate::pattern::bound_names;
use crate::registry::FunctionRegistry;
use rhizome_sprig_ir::{Node, Position};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// An active `loop`: the label `recur` jumps back to, its arity, and the
/// `recur` forms lowered against it so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoopFrame {
    pub name: String,
    pub arity: usize,
    pub recurs: usize,
    pub first_recur: Option<Position>,
}

impl LoopFrame {
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
            recurs: 0,
            first_recur: None,
        }
    }
}

/// Suspension points (`await`, `yield`) seen in a stretch of lowered code,
/// not counting nested functions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Suspension {
    pub awaits: bool,
    pub yields: bool,
}

impl Suspension {
    pub fn union(self, other: Suspension) -> Self {
        Self {
            awaits: self.awaits || other.awaits,
            yields: self.yields || other.yields,
        }
    }
}

/// Owns everything a lowering pass mutates. Independent units each get
/// their own context and can be lowered on separate threads.
#[derive(Debug)]
pub struct LoweringContext {
    pub(crate) options: LowerOptions,
    pub(crate) registry: FunctionRegistry,
    context_dir: PathBuf,
    /// Enclosing expression wrappers since the innermost function body.
    pub(crate) iife_depth: usize,
    pub(crate) function_depth: usize,
    /// Set when the current function body needed the throw-based return.
    pub(crate) early_return: bool,
    /// Enclosing `loop` forms, innermost last.
    pub(crate) loops: Vec<LoopFrame>,
    /// Suspension points since the innermost wrapper or function body.
    pub(crate) suspension: Suspension,
    /// Names bound by enclosing parameters and local bindings, innermost
    /// last. A call through one of these never resolves against the
    /// registry.
    scopes: Vec<HashSet<String>>,
    gensym: usize,
}

impl LoweringContext {
    pub fn new(context_dir: impl Into<PathBuf>) -> Self {
        Self::with_options(context_dir, LowerOptions::default())
    }

    pub fn with_options(context_dir: impl Into<PathBuf>, options: LowerOptions) -> Self {
        Self {
            registry: FunctionRegistry::new(options.redefinition),
            options,
            context_dir: context_dir.into(),
            iife_depth: 0,
            function_depth: 0,
            early_return: false,
            loops: Vec::new(),
            suspension: Suspension::default(),
            scopes: Vec::new(),
            gensym: 0,
        }
    }

    pub fn options(&self) -> &LowerOptions {
        &self.options
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Directory of the unit being lowered; relative imports resolve
    /// against it.
    pub fn context_dir(&self) -> &Path {
        &self.context_dir
    }

    /// A fresh name such as `loop_0`, unique within this context.
    pub(crate) fn gensym(&mut self, prefix: &str) -> String {
        let name = format!("{}_{}", prefix, self.gensym);
        self.gensym += 1;
        name
    }

    /// Run `f` one expression wrapper deeper. Also returns the suspension
    /// points `f` produced, which decide how the wrapper is invoked.
    pub(crate) fn in_expression<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<(T, Suspension)> {
        self.iife_depth += 1;
        let result = self.tracking(f);
        self.iife_depth -= 1;
        result
    }

    /// Run `f` and report the suspension points it produced. They also stay
    /// visible to the enclosing tracker.
    pub(crate) fn tracking<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<(T, Suspension)> {
        let saved = std::mem::take(&mut self.suspension);
        let result = f(self);
        let inner = self.suspension;
        self.suspension = saved.union(inner);
        result.map(|value| (value, inner))
    }

    /// Run `f` as a new function body. Returns whether the body used the
    /// throw-based early return, so the caller can install the unwrapping
    /// handler. State is restored on both success and failure.
    pub(crate) fn in_function<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<(T, bool)> {
        let saved_depth = std::mem::replace(&mut self.iife_depth, 0);
        let saved_flag = std::mem::replace(&mut self.early_return, false);
        let saved_loops = std::mem::take(&mut self.loops);
        let saved_suspension = std::mem::take(&mut self.suspension);
        self.function_depth += 1;

        let result = f(self);
        let used_early_return = self.early_return;

        self.function_depth -= 1;
        self.suspension = saved_suspension;
        self.loops = saved_loops;
        self.early_return = saved_flag;
        self.iife_depth = saved_depth;

        result.map(|value| (value, used_early_return))
    }

    /// Run `f` as the body of a `loop`. Hands the frame back so the caller
    /// can see which `recur` forms were lowered against it.
    pub(crate) fn in_loop<T>(
        &mut self,
        frame: LoopFrame,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<(T, LoopFrame)> {
        self.loops.push(frame);
        let result = f(self);
        let frame = self
            .loops
            .pop()
            .ok_or_else(|| SprigError::transform("loop stack underflow"));
        result.and_then(|value| frame.map(|frame| (value, frame)))
    }

    /// Run `f` inside a new lexical scope that starts with `names` bound.
    pub(crate) fn in_scope<T>(
        &mut self,
        names: impl IntoIterator<Item = String>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.scopes.push(names.into_iter().collect());
        let result = f(self);
        self.scopes.pop();
        result
    }

    /// Record the names a lowered binding target introduces in the
    /// innermost scope. Top-level bindings are not tracked.
    pub(crate) fn bind(&mut self, target: &Node) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.extend(bound_names(target).into_iter().map(str::to_string));
        }
    }

    /// Whether `name` refers to a local binding rather than a declared
    /// function.
    pub(crate) fn is_local(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|scope| scope.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gensym_is_unique() {
        let mut ctx = LoweringContext::new(".");
        assert_eq!(ctx.gensym("loop"), "loop_0");
        assert_eq!(ctx.gensym("loop"), "loop_1");
        assert_eq!(ctx.gensym("tmp"), "tmp_2");
    }

    #[test]
    fn test_function_scope_restores_state() {
        let mut ctx = LoweringContext::new(".");
        ctx.iife_depth = 3;
        ctx.suspension.awaits = true;
        let frame = LoopFrame::new("loop_0", 1);
        ctx.loops.push(frame.clone());

        let ((), used) = ctx
            .in_function(|c| {
                assert_eq!(c.iife_depth, 0);
                assert!(c.loops.is_empty());
                assert_eq!(c.suspension, Suspension::default());
                c.early_return = true;
                c.suspension.yields = true;
                Ok(())
            })
            .unwrap();

        assert!(used);
        assert!(!ctx.early_return);
        assert_eq!(ctx.iife_depth, 3);
        assert_eq!(ctx.loops, vec![frame]);
        assert_eq!(ctx.function_depth, 0);
        assert_eq!(ctx.suspension, Suspension { awaits: true, yields: false });
    }

    #[test]
    fn test_loop_body_hands_back_its_frame() {
        let mut ctx = LoweringContext::new(".");
        ctx.function_depth = 1;
        let ((), frame) = ctx
            .in_loop(LoopFrame::new("loop_0", 0), |c| {
                assert_eq!(c.function_depth, 1);
                assert_eq!(c.loops.len(), 1);
                if let Some(top) = c.loops.last_mut() {
                    top.recurs += 1;
                }
                Ok(())
            })
            .unwrap();
        assert!(ctx.loops.is_empty());
        assert_eq!(frame.recurs, 1);
    }

    #[test]
    fn test_wrapper_reports_inner_suspension() {
        let mut ctx = LoweringContext::new(".");
        let ((), outer) = ctx
            .tracking(|c| {
                let ((), inner) = c.in_expression(|c| {
                    assert_eq!(c.iife_depth, 1);
                    c.suspension.awaits = true;
                    Ok(())
                })?;
                assert!(inner.awaits && !inner.yields);
                let ((), quiet) = c.in_expression(|_| Ok(()))?;
                assert_eq!(quiet, Suspension::default());
                Ok(())
            })
            .unwrap();
        assert!(outer.awaits);
        assert_eq!(ctx.iife_depth, 0);
    }

    #[test]
    fn test_scopes_shadow_by_name() {
        let mut ctx = LoweringContext::new(".");
        ctx.bind(&Node::ident("top"));
        assert!(!ctx.is_local("top"));

        ctx.in_scope(vec!["f".to_string()], |c| {
            assert!(c.is_local("f"));
            c.in_scope(Vec::new(), |c| {
                c.bind(&Node::array_pattern(vec![Some(Node::ident("g")), None]));
                assert!(c.is_local("f") && c.is_local("g"));
                Ok(())
            })?;
            assert!(!c.is_local("g"));
            Ok(())
        })
        .unwrap();
        assert!(!ctx.is_local("f"));
    }

    #[test]
    fn test_state_restored_after_error() {
        let mut ctx = LoweringContext::new(".");
        let result = ctx.in_expression(|c| {
            c.in_function(|_| Err::<(), _>(SprigError::validation("boom")))
                .map(|_| ())
        });
        assert!(result.is_err());
        assert_eq!(ctx.iife_depth, 0);
        assert_eq!(ctx.function_depth, 0);
    }
}
