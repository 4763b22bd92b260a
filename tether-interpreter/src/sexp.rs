//! Interpreter values.
//!
//! Every value lives in the interpreter's handle table and is referred to by
//! a [`Sexp`] handle. Handles are plain `Copy` data: holding one does not keep
//! the value alive, protection does (see [`crate::protect`]).

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::context::Jump;
use crate::interpreter::Interpreter;

/// Generation-checked handle into the interpreter's object table.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sexp {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl Sexp {
    /// The `NULL` singleton. Always slot zero, never collected.
    pub const NULL: Sexp = Sexp {
        index: 0,
        generation: 0,
    };

    /// Marker for a formal parameter without a default.
    pub const MISSING_ARG: Sexp = Sexp {
        index: 1,
        generation: 0,
    };

    pub fn is_null(self) -> bool {
        self == Sexp::NULL
    }
}

impl fmt::Debug for Sexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sexp({}@{})", self.index, self.generation)
    }
}

/// Host function callable from interpreted code. Arguments arrive evaluated.
pub type NativeFn = Rc<dyn Fn(&Interpreter, &[Sexp]) -> Sexp>;

/// Built-in implemented inside the interpreter.
///
/// Specials receive their arguments unevaluated, builtins evaluated.
pub type BuiltinFn = fn(&Interpreter, &[Arg], Sexp) -> Sexp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    Builtin,
    Special,
}

#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub kind: BuiltinKind,
    pub func: BuiltinFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// A (possibly named) argument of a call.
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub name: Option<String>,
    pub value: Sexp,
}

impl Arg {
    pub fn positional(value: Sexp) -> Self {
        Self { name: None, value }
    }

    pub fn named(name: impl Into<String>, value: Sexp) -> Self {
        Self {
            name: Some(name.into()),
            value,
        }
    }
}

/// An unevaluated function call.
#[derive(Debug, Clone, PartialEq)]
pub struct Language {
    pub function: Sexp,
    pub args: Vec<Arg>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    /// `Sexp::MISSING_ARG` when the parameter has no default
    pub default: Sexp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    pub params: Vec<Param>,
    pub body: Sexp,
    pub env: Sexp,
}

#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub frame: IndexMap<String, Sexp>,
    pub parent: Option<Sexp>,
}

#[derive(Clone)]
pub enum Object {
    Null,
    MissingArg,
    Logical(Vec<bool>),
    Integer(Vec<i64>),
    Double(Vec<f64>),
    Str(Vec<String>),
    List(Vec<Sexp>),
    Symbol(String),
    Language(Language),
    Closure(Closure),
    Builtin(Builtin),
    Native(NativeFn),
    Environment(Environment),
    Expression(Vec<Sexp>),
    ExternalPtr(Rc<dyn Any>),
    /// Pending non-local exit captured by `unwind_protect`
    UnwindCont(Option<Jump>),
}

impl Object {
    /// Name of the value's storage type, as reported in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "NULL",
            Object::MissingArg => "missing",
            Object::Logical(_) => "logical",
            Object::Integer(_) => "integer",
            Object::Double(_) => "double",
            Object::Str(_) => "character",
            Object::List(_) => "list",
            Object::Symbol(_) => "symbol",
            Object::Language(_) => "language",
            Object::Closure(_) => "closure",
            Object::Builtin(b) if b.kind == BuiltinKind::Special => "special",
            Object::Builtin(_) => "builtin",
            Object::Native(_) => "builtin",
            Object::Environment(_) => "environment",
            Object::Expression(_) => "expression",
            Object::ExternalPtr(_) => "externalptr",
            Object::UnwindCont(_) => "unwindcont",
        }
    }

    /// Implicit class used when no `class` attribute is set
    pub fn implicit_class(&self) -> &'static str {
        match self {
            Object::Double(_) => "numeric",
            Object::Symbol(_) => "name",
            Object::Language(_) => "call",
            Object::Closure(_) | Object::Builtin(_) | Object::Native(_) => "function",
            other => other.type_name(),
        }
    }

    pub fn length(&self) -> usize {
        match self {
            Object::Null | Object::MissingArg => 0,
            Object::Logical(v) => v.len(),
            Object::Integer(v) => v.len(),
            Object::Double(v) => v.len(),
            Object::Str(v) => v.len(),
            Object::List(v) | Object::Expression(v) => v.len(),
            Object::Language(call) => call.args.len() + 1,
            Object::Environment(env) => env.frame.len(),
            _ => 1,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(
            self,
            Object::Closure(_) | Object::Builtin(_) | Object::Native(_)
        )
    }

    /// Handles this object refers to, for the collector's mark phase
    pub(crate) fn children(&self, out: &mut Vec<Sexp>) {
        match self {
            Object::List(items) | Object::Expression(items) => out.extend(items.iter().copied()),
            Object::Language(call) => {
                out.push(call.function);
                out.extend(call.args.iter().map(|arg| arg.value));
            }
            Object::Closure(closure) => {
                out.push(closure.body);
                out.push(closure.env);
                out.extend(closure.params.iter().map(|param| param.default));
            }
            Object::Environment(env) => {
                out.extend(env.frame.values().copied());
                out.extend(env.parent);
            }
            Object::UnwindCont(Some(jump)) => jump.children(out),
            _ => {}
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Null => write!(f, "Null"),
            Object::MissingArg => write!(f, "MissingArg"),
            Object::Logical(v) => f.debug_tuple("Logical").field(v).finish(),
            Object::Integer(v) => f.debug_tuple("Integer").field(v).finish(),
            Object::Double(v) => f.debug_tuple("Double").field(v).finish(),
            Object::Str(v) => f.debug_tuple("Str").field(v).finish(),
            Object::List(v) => f.debug_tuple("List").field(v).finish(),
            Object::Symbol(name) => f.debug_tuple("Symbol").field(name).finish(),
            Object::Language(call) => f.debug_tuple("Language").field(call).finish(),
            Object::Closure(closure) => f.debug_tuple("Closure").field(closure).finish(),
            Object::Builtin(builtin) => f.debug_tuple("Builtin").field(&builtin.name).finish(),
            Object::Native(_) => write!(f, "Native"),
            Object::Environment(env) => f
                .debug_struct("Environment")
                .field("bindings", &env.frame.len())
                .field("parent", &env.parent)
                .finish(),
            Object::Expression(v) => f.debug_tuple("Expression").field(v).finish(),
            Object::ExternalPtr(_) => write!(f, "ExternalPtr"),
            Object::UnwindCont(jump) => f.debug_tuple("UnwindCont").field(jump).finish(),
        }
    }
}

/// Attributes carried alongside an object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    pub class: Option<Vec<String>>,
    pub names: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub object: Object,
    pub attributes: Attributes,
}

impl Node {
    pub fn new(object: Object) -> Self {
        Self {
            object,
            attributes: Attributes::default(),
        }
    }

    /// Class vector: the `class` attribute, or the implicit class
    pub fn class(&self) -> Vec<String> {
        match &self.attributes.class {
            Some(class) => class.clone(),
            None => vec![self.object.implicit_class().to_string()],
        }
    }
}
