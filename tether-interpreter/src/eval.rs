//! The evaluator.

use tracing::trace;

use crate::interpreter::Interpreter;
use crate::protect::Shield;
use crate::sexp::{Arg, BuiltinKind, Closure, Language, Object, Sexp};

/// Decrements the evaluation depth when dropped
struct DepthGuard<'a> {
    interp: &'a Interpreter,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        let depth = &self.interp.state.eval_depth;
        depth.set(depth.get().saturating_sub(1));
    }
}

/// Match call arguments to `formals`: exact names first, then positions.
///
/// Returns one slot per formal, or a message describing the mismatch.
pub(crate) fn match_args(formals: &[&str], args: &[Arg]) -> Result<Vec<Option<Sexp>>, String> {
    let mut matched: Vec<Option<Sexp>> = vec![None; formals.len()];
    let mut positional = Vec::new();

    for arg in args {
        match &arg.name {
            Some(name) => {
                let slot = formals
                    .iter()
                    .position(|formal| formal == name)
                    .ok_or_else(|| format!("unused argument ({} = ...)", name))?;
                if matched[slot].is_some() {
                    return Err(format!(
                        "formal argument \"{}\" matched by multiple actual arguments",
                        name
                    ));
                }
                matched[slot] = Some(arg.value);
            }
            None => positional.push(arg.value),
        }
    }

    let mut positional = positional.into_iter();
    for slot in matched.iter_mut().filter(|slot| slot.is_none()) {
        match positional.next() {
            Some(value) => *slot = Some(value),
            None => break,
        }
    }

    match positional.len() {
        0 => Ok(matched),
        extra => Err(format!("unused argument{}", if extra > 1 { "s" } else { "" })),
    }
}

impl Interpreter {
    /// Evaluate `expr` in `env`.
    ///
    /// Errors and interrupts leave this function by unwinding; run it inside
    /// `toplevel_exec` or `unwind_protect` to observe them.
    pub fn eval(&self, expr: Sexp, env: Sexp) -> Sexp {
        self.check_interrupt();
        let _depth = self.enter_eval();

        let object = self.with_node(expr, |node| match &node.object {
            Object::Symbol(_) | Object::Language(_) | Object::Expression(_) => {
                Some(node.object.clone())
            }
            _ => None,
        });

        match object {
            Some(Object::Symbol(name)) => self.eval_symbol(&name, env),
            Some(Object::Language(call)) => self.eval_call(&call, env),
            Some(Object::Expression(exprs)) => exprs
                .iter()
                .fold(Sexp::NULL, |_, expr| self.eval(*expr, env)),
            _ => expr,
        }
    }

    fn enter_eval(&self) -> DepthGuard<'_> {
        let depth = self.state.eval_depth.get() + 1;
        if depth > self.state.options.max_eval_depth {
            self.stop(format!(
                "evaluation nested too deeply: infinite recursion? (limit {})",
                self.state.options.max_eval_depth
            ));
        }
        self.state.eval_depth.set(depth);
        DepthGuard { interp: self }
    }

    fn eval_symbol(&self, name: &str, env: Sexp) -> Sexp {
        match self.find_var(name, env) {
            Some(value) if value == Sexp::MISSING_ARG => self.stop(format!(
                "argument \"{}\" is missing, with no default",
                name
            )),
            Some(value) => value,
            None => self.stop(format!("object '{}' not found", name)),
        }
    }

    fn eval_call(&self, call: &Language, env: Sexp) -> Sexp {
        let function = match self.symbol_name(call.function) {
            Some(name) => self
                .find_fun(&name, env)
                .unwrap_or_else(|| self.stop(format!("could not find function \"{}\"", name))),
            None => self.eval(call.function, env),
        };
        self.apply(function, &call.args, env)
    }

    /// Evaluate every argument in `env`, keeping names
    pub(crate) fn eval_args(&self, args: &[Arg], env: Sexp) -> Vec<Arg> {
        args.iter()
            .map(|arg| Arg {
                name: arg.name.clone(),
                value: self.eval(arg.value, env),
            })
            .collect()
    }

    /// Apply `function` to unevaluated `args` from a call made in `env`
    pub fn apply(&self, function: Sexp, args: &[Arg], env: Sexp) -> Sexp {
        match self.object(function) {
            Object::Builtin(builtin) => match builtin.kind {
                BuiltinKind::Special => (builtin.func)(self, args, env),
                BuiltinKind::Builtin => {
                    let evaluated = self.eval_args(args, env);
                    (builtin.func)(self, &evaluated, env)
                }
            },
            Object::Native(native) => {
                let values: Vec<Sexp> = self
                    .eval_args(args, env)
                    .into_iter()
                    .map(|arg| arg.value)
                    .collect();
                native(self, &values)
            }
            Object::Closure(closure) => {
                let evaluated = self.eval_args(args, env);
                self.apply_closure(&closure, &evaluated)
            }
            other => self.stop(format!(
                "attempt to apply non-function of type '{}'",
                other.type_name()
            )),
        }
    }

    /// Call `function` with already evaluated positional arguments
    pub fn call_function(&self, function: Sexp, values: &[Sexp]) -> Sexp {
        let args: Vec<Arg> = values.iter().copied().map(Arg::positional).collect();
        match self.object(function) {
            Object::Builtin(builtin) => (builtin.func)(self, &args, self.global_env()),
            Object::Native(native) => native(self, values),
            Object::Closure(closure) => self.apply_closure(&closure, &args),
            other => self.stop(format!(
                "attempt to apply non-function of type '{}'",
                other.type_name()
            )),
        }
    }

    fn apply_closure(&self, closure: &Closure, args: &[Arg]) -> Sexp {
        let formals: Vec<&str> = closure.params.iter().map(|p| p.name.as_str()).collect();
        let matched = match match_args(&formals, args) {
            Ok(matched) => matched,
            Err(message) => self.stop(message),
        };

        let env = self.new_env(closure.env);
        let _env = Shield::new(self, env);

        for (param, value) in closure.params.iter().zip(&matched) {
            self.define_var(&param.name, value.unwrap_or(Sexp::MISSING_ARG), env);
        }
        // Defaults see the supplied arguments and earlier defaults
        for (param, value) in closure.params.iter().zip(&matched) {
            if value.is_none() && param.default != Sexp::MISSING_ARG {
                let default = self.eval(param.default, env);
                self.define_var(&param.name, default, env);
            }
        }

        trace!(
            depth = self.state.eval_depth.get(),
            params = formals.len(),
            "apply closure"
        );
        self.eval(closure.body, env)
    }
}
