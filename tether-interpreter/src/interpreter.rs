//! The interpreter handle and its object-model API.

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use tether_parser::ParseError;
use tracing::{debug, error, trace, warn};

use crate::builtins;
use crate::context::ContextFrame;
use crate::heap::Heap;
use crate::options::InterpreterOptions;
use crate::sexp::{Arg, Environment, Language, NativeFn, Node, Object, Sexp};

pub(crate) struct State {
    pub(crate) heap: RefCell<Heap>,
    pub(crate) protect_stack: RefCell<Vec<Sexp>>,
    pub(crate) preserved: RefCell<HashMap<Sexp, usize>>,
    pub(crate) contexts: RefCell<Vec<ContextFrame>>,
    pub(crate) next_context_id: Cell<u64>,
    pub(crate) interrupt_pending: Cell<bool>,
    pub(crate) eval_depth: Cell<usize>,
    pub(crate) collections: Cell<u64>,
    pub(crate) output: RefCell<Vec<String>>,
    pub(crate) extensions: RefCell<HashMap<TypeId, Rc<dyn Any>>>,
    pub(crate) last_parse_error: RefCell<Option<ParseError>>,
    pub(crate) base_env: Sexp,
    pub(crate) global_env: Sexp,
    pub(crate) options: InterpreterOptions,
}

/// Handle to an interpreter instance.
///
/// Cloning is cheap and yields another handle to the same interpreter. The
/// handle is `!Send`: an interpreter belongs to the thread that created it.
#[derive(Clone)]
pub struct Interpreter {
    pub(crate) state: Rc<State>,
}

/// Snapshot of interpreter bookkeeping, for diagnostics and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterStats {
    pub live_objects: usize,
    pub allocations: u64,
    pub protect_height: usize,
    pub preserved_objects: usize,
    pub context_depth: usize,
    pub collections: u64,
}

impl Interpreter {
    pub fn new(options: InterpreterOptions) -> Self {
        let mut heap = Heap::new();
        let base_env = heap.alloc(Node::new(Object::Environment(Environment::default())));
        let global_env = heap.alloc(Node::new(Object::Environment(Environment {
            parent: Some(base_env),
            ..Environment::default()
        })));

        let interp = Self {
            state: Rc::new(State {
                heap: RefCell::new(heap),
                protect_stack: RefCell::new(Vec::new()),
                preserved: RefCell::new(HashMap::new()),
                contexts: RefCell::new(Vec::new()),
                next_context_id: Cell::new(1),
                interrupt_pending: Cell::new(false),
                eval_depth: Cell::new(0),
                collections: Cell::new(0),
                output: RefCell::new(Vec::new()),
                extensions: RefCell::new(HashMap::new()),
                last_parse_error: RefCell::new(None),
                base_env,
                global_env,
                options,
            }),
        };

        builtins::install(&interp);
        debug!(
            builtins = interp.with_env(base_env, |env| env.frame.len()),
            "interpreter initialised"
        );
        interp
    }

    pub fn options(&self) -> &InterpreterOptions {
        &self.state.options
    }

    /// True if both handles refer to the same interpreter
    pub fn ptr_eq(&self, other: &Interpreter) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    pub fn null(&self) -> Sexp {
        Sexp::NULL
    }

    pub fn base_env(&self) -> Sexp {
        self.state.base_env
    }

    pub fn global_env(&self) -> Sexp {
        self.state.global_env
    }

    // Object access

    /// Run `f` against the node behind `sexp`.
    ///
    /// `f` must not call back into the interpreter. A collected handle
    /// signals an interpreter error.
    pub fn with_node<R>(&self, sexp: Sexp, f: impl FnOnce(&Node) -> R) -> R {
        let result = {
            let heap = self.state.heap.borrow();
            heap.get(sexp).map(f)
        };
        match result {
            Some(result) => result,
            None => self.stale_handle(sexp),
        }
    }

    pub(crate) fn with_node_mut<R>(&self, sexp: Sexp, f: impl FnOnce(&mut Node) -> R) -> R {
        let result = {
            let mut heap = self.state.heap.borrow_mut();
            heap.get_mut(sexp).map(f)
        };
        match result {
            Some(result) => result,
            None => self.stale_handle(sexp),
        }
    }

    fn stale_handle(&self, sexp: Sexp) -> ! {
        error!(?sexp, "access through a collected handle");
        self.stop(format!("invalid handle {:?}: object has been collected", sexp))
    }

    /// True while `sexp` still refers to a live object
    pub fn is_live(&self, sexp: Sexp) -> bool {
        self.state.heap.borrow().contains(sexp)
    }

    pub fn object(&self, sexp: Sexp) -> Object {
        self.with_node(sexp, |node| node.object.clone())
    }

    pub fn type_name(&self, sexp: Sexp) -> &'static str {
        self.with_node(sexp, |node| node.object.type_name())
    }

    pub fn length(&self, sexp: Sexp) -> usize {
        self.with_node(sexp, |node| node.object.length())
    }

    pub fn class(&self, sexp: Sexp) -> Vec<String> {
        self.with_node(sexp, |node| node.class())
    }

    /// Explicit `class` attribute, if any
    pub fn class_attribute(&self, sexp: Sexp) -> Option<Vec<String>> {
        self.with_node(sexp, |node| node.attributes.class.clone())
    }

    pub fn set_class(&self, sexp: Sexp, class: Option<Vec<String>>) {
        self.with_node_mut(sexp, |node| node.attributes.class = class);
    }

    pub fn names(&self, sexp: Sexp) -> Option<Vec<String>> {
        self.with_node(sexp, |node| node.attributes.names.clone())
    }

    pub fn set_names(&self, sexp: Sexp, names: Option<Vec<String>>) {
        self.with_node_mut(sexp, |node| node.attributes.names = names);
    }

    /// True if `class` appears in the explicit class attribute
    pub fn inherits(&self, sexp: Sexp, class: &str) -> bool {
        self.with_node(sexp, |node| {
            node.attributes
                .class
                .as_ref()
                .is_some_and(|classes| classes.iter().any(|c| c == class))
        })
    }

    pub fn is_list(&self, sexp: Sexp) -> bool {
        self.with_node(sexp, |node| matches!(node.object, Object::List(_)))
    }

    pub fn is_function(&self, sexp: Sexp) -> bool {
        self.with_node(sexp, |node| node.object.is_function())
    }

    pub fn is_environment(&self, sexp: Sexp) -> bool {
        self.with_node(sexp, |node| matches!(node.object, Object::Environment(_)))
    }

    /// Element `index` of a list or expression vector
    pub fn vector_elt(&self, sexp: Sexp, index: usize) -> Sexp {
        let element = self.with_node(sexp, |node| match &node.object {
            Object::List(items) | Object::Expression(items) => Ok(items.get(index).copied()),
            other => Err(other.type_name()),
        });
        match element {
            Ok(Some(element)) => element,
            Ok(None) => self.stop("subscript out of bounds"),
            Err(type_name) => self.stop(format!(
                "cannot index into an object of type '{}'",
                type_name
            )),
        }
    }

    /// Element `index` of a character vector
    pub fn string_elt(&self, sexp: Sexp, index: usize) -> String {
        let element = self.with_node(sexp, |node| match &node.object {
            Object::Str(items) => Ok(items.get(index).cloned()),
            other => Err(other.type_name()),
        });
        match element {
            Ok(Some(element)) => element,
            Ok(None) => self.stop("subscript out of bounds"),
            Err(type_name) => self.stop(format!(
                "expected a character vector, found '{}'",
                type_name
            )),
        }
    }

    /// List element whose name is `name`
    pub fn list_elt(&self, sexp: Sexp, name: &str) -> Option<Sexp> {
        self.with_node(sexp, |node| {
            let names = node.attributes.names.as_ref()?;
            let position = names.iter().position(|n| n == name)?;
            match &node.object {
                Object::List(items) => items.get(position).copied(),
                _ => None,
            }
        })
    }

    pub fn symbol_name(&self, sexp: Sexp) -> Option<String> {
        self.with_node(sexp, |node| match &node.object {
            Object::Symbol(name) => Some(name.clone()),
            _ => None,
        })
    }

    pub fn external_ptr(&self, sexp: Sexp) -> Option<Rc<dyn Any>> {
        self.with_node(sexp, |node| match &node.object {
            Object::ExternalPtr(ptr) => Some(ptr.clone()),
            _ => None,
        })
    }

    // Constructors

    pub fn alloc(&self, object: Object) -> Sexp {
        let sexp = self.state.heap.borrow_mut().alloc(Node::new(object));
        trace!(?sexp, "alloc");
        sexp
    }

    /// Shallow copy with attributes
    pub fn duplicate(&self, sexp: Sexp) -> Sexp {
        let node = self.with_node(sexp, |node| node.clone());
        self.state.heap.borrow_mut().alloc(node)
    }

    pub fn mk_string(&self, value: impl Into<String>) -> Sexp {
        self.alloc(Object::Str(vec![value.into()]))
    }

    pub fn mk_strings(&self, values: Vec<String>) -> Sexp {
        self.alloc(Object::Str(values))
    }

    pub fn mk_double(&self, value: f64) -> Sexp {
        self.alloc(Object::Double(vec![value]))
    }

    pub fn mk_integer(&self, value: i64) -> Sexp {
        self.alloc(Object::Integer(vec![value]))
    }

    pub fn mk_logical(&self, value: bool) -> Sexp {
        self.alloc(Object::Logical(vec![value]))
    }

    pub fn mk_list(&self, items: Vec<Sexp>) -> Sexp {
        self.alloc(Object::List(items))
    }

    pub fn mk_named_list(&self, items: Vec<(String, Sexp)>) -> Sexp {
        let (names, values): (Vec<String>, Vec<Sexp>) = items.into_iter().unzip();
        let list = self.alloc(Object::List(values));
        self.set_names(list, Some(names));
        list
    }

    pub fn mk_symbol(&self, name: impl Into<String>) -> Sexp {
        self.alloc(Object::Symbol(name.into()))
    }

    /// Build an unevaluated call `function(args...)`
    pub fn mk_lang(&self, function: Sexp, args: Vec<Arg>) -> Sexp {
        self.alloc(Object::Language(Language { function, args }))
    }

    pub fn mk_external_ptr(&self, value: Rc<dyn Any>) -> Sexp {
        self.alloc(Object::ExternalPtr(value))
    }

    // Environments

    pub fn new_env(&self, parent: Sexp) -> Sexp {
        self.alloc(Object::Environment(Environment {
            frame: Default::default(),
            parent: Some(parent),
        }))
    }

    fn with_env<R>(&self, env: Sexp, f: impl FnOnce(&Environment) -> R) -> R {
        let result = self.with_node(env, |node| match &node.object {
            Object::Environment(environment) => Some(f(environment)),
            _ => None,
        });
        match result {
            Some(result) => result,
            None => self.stop("use of a non-environment as a scope"),
        }
    }

    pub fn define_var(&self, name: &str, value: Sexp, env: Sexp) {
        let defined = self.with_node_mut(env, |node| match &mut node.object {
            Object::Environment(environment) => {
                environment.frame.insert(name.to_string(), value);
                true
            }
            _ => false,
        });
        if !defined {
            self.stop(format!("cannot assign '{}' in a non-environment", name));
        }
    }

    /// Binding in `env` itself, ignoring parents
    pub fn find_var_in_frame(&self, name: &str, env: Sexp) -> Option<Sexp> {
        self.with_env(env, |environment| environment.frame.get(name).copied())
    }

    /// Look `name` up through the scope chain starting at `env`
    pub fn find_var(&self, name: &str, env: Sexp) -> Option<Sexp> {
        let mut current = Some(env);
        while let Some(env) = current {
            let (value, parent) =
                self.with_env(env, |environment| (environment.frame.get(name).copied(), environment.parent));
            if value.is_some() {
                return value;
            }
            current = parent;
        }
        None
    }

    /// Like `find_var`, skipping bindings that are not functions
    pub fn find_fun(&self, name: &str, env: Sexp) -> Option<Sexp> {
        let mut current = Some(env);
        while let Some(env) = current {
            let (value, parent) =
                self.with_env(env, |environment| (environment.frame.get(name).copied(), environment.parent));
            if let Some(value) = value {
                if self.is_function(value) {
                    return Some(value);
                }
            }
            current = parent;
        }
        None
    }

    pub fn env_parent(&self, env: Sexp) -> Option<Sexp> {
        self.with_env(env, |environment| environment.parent)
    }

    /// Names bound directly in `env`, in definition order
    pub fn env_names(&self, env: Sexp) -> Vec<String> {
        self.with_env(env, |environment| environment.frame.keys().cloned().collect())
    }

    /// Register a host function under `name` in the base scope.
    pub fn define_native<F>(&self, name: &str, function: F) -> Sexp
    where
        F: Fn(&Interpreter, &[Sexp]) -> Sexp + 'static,
    {
        let native: NativeFn = Rc::new(function);
        let sexp = self.alloc(Object::Native(native));
        self.define_var(name, sexp, self.base_env());
        debug!(name, "registered native function");
        sexp
    }

    // Protection

    pub fn protect(&self, sexp: Sexp) -> Sexp {
        self.state.protect_stack.borrow_mut().push(sexp);
        trace!(?sexp, "protect");
        sexp
    }

    /// Pop the top `count` entries of the protect stack
    pub fn unprotect(&self, count: usize) {
        let mut stack = self.state.protect_stack.borrow_mut();
        if count > stack.len() {
            warn!(count, height = stack.len(), "unprotect below the protect stack");
        }
        let height = stack.len().saturating_sub(count);
        stack.truncate(height);
    }

    /// Remove the most recent protection of `sexp`
    pub fn unprotect_ptr(&self, sexp: Sexp) {
        let mut stack = self.state.protect_stack.borrow_mut();
        match stack.iter().rposition(|protected| *protected == sexp) {
            Some(position) => {
                stack.remove(position);
                trace!(?sexp, "unprotect");
            }
            // Already discarded by a context that caught a jump
            None => trace!(?sexp, "unprotect of an unprotected value"),
        }
    }

    pub fn protect_height(&self) -> usize {
        self.state.protect_stack.borrow().len()
    }

    /// Drop protections above `height`
    pub fn restore_protect_height(&self, height: usize) {
        let mut stack = self.state.protect_stack.borrow_mut();
        if stack.len() > height {
            trace!(from = stack.len(), to = height, "restore protect height");
            stack.truncate(height);
        }
    }

    /// Keep `sexp` alive until a matching `release_object`
    pub fn preserve_object(&self, sexp: Sexp) {
        *self.state.preserved.borrow_mut().entry(sexp).or_insert(0) += 1;
        trace!(?sexp, "preserve");
    }

    pub fn release_object(&self, sexp: Sexp) {
        let mut preserved = self.state.preserved.borrow_mut();
        match preserved.get_mut(&sexp) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                preserved.remove(&sexp);
            }
            None => warn!(?sexp, "release of an object that is not preserved"),
        }
        trace!(?sexp, "release");
    }

    pub fn is_preserved(&self, sexp: Sexp) -> bool {
        self.state.preserved.borrow().contains_key(&sexp)
    }

    /// Run the collector. Returns the number of objects freed.
    ///
    /// Collection only happens at top level: while any context is live
    /// (an evaluation is in progress) this is a no-op.
    pub fn collect(&self) -> usize {
        if !self.state.contexts.borrow().is_empty() {
            debug!("collection skipped: evaluation in progress");
            return 0;
        }

        let mut roots = vec![self.state.base_env, self.state.global_env];
        roots.extend(self.state.protect_stack.borrow().iter().copied());
        roots.extend(self.state.preserved.borrow().keys().copied());

        let freed = self.state.heap.borrow_mut().collect(roots);
        self.state.collections.set(self.state.collections.get() + 1);
        debug!(freed, live = self.state.heap.borrow().live(), "collection finished");
        freed
    }

    pub fn stats(&self) -> InterpreterStats {
        let heap = self.state.heap.borrow();
        InterpreterStats {
            live_objects: heap.live(),
            allocations: heap.allocations(),
            protect_height: self.protect_height(),
            preserved_objects: self.state.preserved.borrow().len(),
            context_depth: self.context_depth(),
            collections: self.state.collections.get(),
        }
    }

    // Per-interpreter extension state

    /// Shared state of type `T` attached to this interpreter, created by
    /// `init` on first use.
    pub fn extension<T: 'static>(&self, init: impl FnOnce() -> T) -> Rc<T> {
        let existing = self
            .state
            .extensions
            .borrow()
            .get(&TypeId::of::<T>())
            .cloned();
        if let Some(Ok(value)) = existing.map(|any| any.downcast::<T>()) {
            return value;
        }

        let value = Rc::new(init());
        self.state
            .extensions
            .borrow_mut()
            .insert(TypeId::of::<T>(), value.clone());
        value
    }

    // Captured output of `print`

    pub(crate) fn write_output(&self, text: String) {
        self.state.output.borrow_mut().push(text);
    }

    /// Take everything printed since the last call
    pub fn take_output(&self) -> Vec<String> {
        std::mem::take(&mut *self.state.output.borrow_mut())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(InterpreterOptions::default())
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("stats", &self.stats())
            .finish()
    }
}
