use std::fmt;
use std::sync::Arc;

use goat_gc::Trace;
use parking_lot::Mutex;

use crate::attributes::Key;
use crate::error::{Error, Result};
use crate::object::ObjectKind;
use crate::scope::Scope;
use crate::universe::Universe;
use crate::value::Value;
use crate::ObjectRef;

/// The output capability of the `print` built-in, supplied by the host.
pub trait Printer: Send + Sync {
    fn print(&self, text: &str);
}

/// Prints to the process' standard output, one line per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutPrinter;

impl Printer for StdoutPrinter {
    fn print(&self, text: &str) {
        println!("{}", text);
    }
}

/// The body of a built-in function.
pub type NativeFn = Arc<dyn Fn(&Universe, &[Value]) -> Result<Value> + Send + Sync>;

/// A built-in function.
pub struct Function {
    name: Box<str>,
    body: NativeFn,
}

impl Function {
    pub fn new(name: impl Into<Box<str>>, body: NativeFn) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the function with the given arguments.
    pub fn invoke(&self, universe: &Universe, args: &[Value]) -> Result<Value> {
        (self.body)(universe, args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function").field("name", &self.name).finish()
    }
}

/// A user-defined function.
///
/// The body itself belongs to the evaluator, which only gets handed back its `entry`.
pub struct Closure {
    /// The scope the closure was created in (taken away if the closure gets swept).
    context: Mutex<Option<ObjectRef>>,
    parameters: Vec<Key>,
    entry: usize,
}

impl Closure {
    pub fn new(context: ObjectRef, parameters: Vec<Key>, entry: usize) -> Self {
        Self {
            context: Mutex::new(Some(context)),
            parameters,
            entry,
        }
    }

    /// Get the captured scope.
    pub fn context(&self) -> Option<ObjectRef> {
        self.context.lock().clone()
    }

    pub(crate) fn take_context(&self) -> Option<ObjectRef> {
        self.context.lock().take()
    }

    pub fn parameters(&self) -> &[Key] {
        self.parameters.as_slice()
    }

    /// The evaluator's handle to the closure's body.
    pub fn entry(&self) -> usize {
        self.entry
    }

    /// Build the activation scope of a call.
    ///
    /// With a receiver, the activation scope is a composite of the receiver and the captured scope.
    /// Parameters are then declared in it, so they shadow everything else.
    pub fn activate(
        &self,
        universe: &Universe,
        this: Option<&ObjectRef>,
        args: &[Value],
    ) -> Result<ObjectRef> {
        let context = self.context().ok_or_else(|| {
            Error::OperationNotSupported(String::from("call of a collected closure"))
        })?;
        if args.len() != self.parameters.len() {
            return Err(Error::IllegalArgument(format!(
                "expected {} argument(s), got {}",
                self.parameters.len(),
                args.len(),
            )));
        }

        let activation = match this {
            Some(receiver) => context.clone_scope_with(universe, receiver),
            None => context.clone_scope(universe),
        };
        for (parameter, arg) in self.parameters.iter().zip(args.iter()) {
            activation.declare(parameter.clone(), arg.clone())?;
        }
        Ok(activation)
    }
}

impl Trace for Closure {
    fn trace(&self) {
        self.context.trace();
        self.parameters.trace();
    }
}

/// Invoke a built-in function value.
pub fn call(universe: &Universe, callee: &Value, args: &[Value]) -> Result<Value> {
    match callee.object().kind() {
        ObjectKind::Function(function) => function.invoke(universe, args),
        _ => Err(callee.object().unsupported("call")),
    }
}

/// The `print` built-in: prints the string forms of its arguments, concatenated.
pub(crate) fn print(printer: Arc<dyn Printer>) -> NativeFn {
    Arc::new(move |universe: &Universe, args: &[Value]| {
        let text: String = args.iter().map(|arg| arg.to_string()).collect();
        printer.print(&text);
        Ok(universe.void())
    })
}
