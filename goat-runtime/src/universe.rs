use std::sync::Arc;

use goat_gc::{Gc, GcStats, Trace};
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use once_cell::sync::Lazy;

use crate::attributes::Key;
use crate::error::Result;
use crate::function::{self, Closure, Function, NativeFn, Printer};
use crate::object::{Lifetime, Object, ObjectKind};
use crate::scope::Scope;
use crate::value::{Payload, Value};
use crate::{ObjectRef, Registry};

/// The core objects of the Goat runtime.
///
/// This struct allows to always keep a reference to important prototypes,
/// even in case of user code shadowing their global bindings.
/// They are all static and read-only: built once per process, shared by every universe,
/// and never reclaimed.
#[derive(Debug)]
pub struct CoreObjects {
    /// The root **Object**, the only object without prototypes.
    pub object: ObjectRef,
    /// The **Function** prototype.
    pub function: ObjectRef,
    /// The **String** prototype.
    pub string: ObjectRef,
    /// The **Number** prototype.
    pub number: ObjectRef,
    /// The **Integer** prototype.
    pub integer: ObjectRef,
    /// The **Real** prototype.
    pub real: ObjectRef,

    /// The **Exception** prototype.
    pub exception: ObjectRef,
    /// The **OperationNotSupported** prototype.
    pub operation_not_supported: ObjectRef,
    /// The **IllegalArgument** prototype.
    pub illegal_argument: ObjectRef,
    /// The **ReferenceError** prototype.
    pub reference_error: ObjectRef,

    /// The value of expressions that produce nothing.
    pub void: ObjectRef,

    /// The shared handler of inline integers.
    pub integer_handler: ObjectRef,
    /// The shared handler of inline reals.
    pub real_handler: ObjectRef,

    /// The scope holding the global bindings of the prototypes above.
    pub root_scope: ObjectRef,
}

static CORE: Lazy<CoreObjects> = Lazy::new(CoreObjects::bootstrap);

fn new_static(kind: ObjectKind, prototypes: Vec<ObjectRef>) -> ObjectRef {
    Gc::new_static(Object::new(kind, Lifetime::Static, prototypes))
}

impl CoreObjects {
    fn bootstrap() -> Self {
        let object = new_static(ObjectKind::Plain, Vec::new());
        let function = new_static(ObjectKind::Plain, vec![object.clone()]);
        let string = new_static(ObjectKind::Plain, vec![object.clone()]);
        let number = new_static(ObjectKind::Plain, vec![object.clone()]);
        let integer = new_static(ObjectKind::Plain, vec![number.clone()]);
        let real = new_static(ObjectKind::Plain, vec![number.clone()]);

        let exception = new_static(ObjectKind::Plain, vec![object.clone()]);
        let operation_not_supported = new_static(ObjectKind::Plain, vec![exception.clone()]);
        let illegal_argument = new_static(ObjectKind::Plain, vec![exception.clone()]);
        let reference_error = new_static(ObjectKind::Plain, vec![exception.clone()]);

        let void = new_static(ObjectKind::Plain, vec![object.clone()]);

        let integer_handler = new_static(ObjectKind::IntegerHandler, vec![integer.clone()]);
        let real_handler = new_static(ObjectKind::RealHandler, vec![real.clone()]);

        let root_scope = new_static(ObjectKind::Scope, vec![object.clone()]);

        let globals = [
            ("Object", &object),
            ("Function", &function),
            ("String", &string),
            ("Number", &number),
            ("Integer", &integer),
            ("Real", &real),
            ("Exception", &exception),
            ("OperationNotSupported", &operation_not_supported),
            ("IllegalArgument", &illegal_argument),
            ("ReferenceError", &reference_error),
        ];
        for (name, prototype) in globals.iter() {
            let name = new_static(ObjectKind::String(Box::from(*name)), vec![string.clone()]);
            // bootstrap is the only place where static objects get written to.
            root_scope.set_attribute_unchecked(Key::new(name), Value::from((*prototype).clone()));
        }

        Self {
            object,
            function,
            string,
            number,
            integer,
            real,
            exception,
            operation_not_supported,
            illegal_argument,
            reference_error,
            void,
            integer_handler,
            real_handler,
            root_scope,
        }
    }
}

/// The runtime context of one run.
///
/// It owns the registry every dynamic allocation goes through.
/// Several universes can coexist, even across threads: the only thing they share
/// are the core objects, which cannot be written to.
#[derive(Debug)]
pub struct Universe {
    registry: Registry,
    /// The runtime's core objects.
    pub core: &'static CoreObjects,
}

impl Universe {
    /// Initialize a universe with a fresh registry, using the default collection parameters.
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    /// Initialize a universe around the given registry.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            core: &CORE,
        }
    }

    /// Get the registry of this universe's dynamic objects.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Get the collection statistics of this universe.
    pub fn stats(&self) -> GcStats {
        self.registry.stats()
    }

    /// Allocates a dynamic object.
    pub fn allocate(&self, kind: ObjectKind, prototypes: Vec<ObjectRef>) -> ObjectRef {
        debug_assert!(
            !prototypes.is_empty(),
            "only the root object can be without prototypes"
        );
        self.registry
            .allocate(Object::new(kind, Lifetime::Dynamic, prototypes))
    }

    /// Creates a plain object deriving from **Object**.
    pub fn new_object(&self) -> ObjectRef {
        self.allocate(ObjectKind::Plain, vec![self.core.object.clone()])
    }

    /// Creates a plain object deriving from the given prototypes.
    pub fn new_object_with(&self, prototypes: Vec<ObjectRef>) -> ObjectRef {
        self.allocate(ObjectKind::Plain, prototypes)
    }

    /// Creates a dynamic string.
    pub fn new_string(&self, text: impl Into<Box<str>>) -> Value {
        let string = self.allocate(ObjectKind::String(text.into()), vec![self.core.string.clone()]);
        Value::from(string)
    }

    /// Creates a string attribute key.
    pub fn key(&self, name: &str) -> Key {
        Key::new(self.new_string(name).into_object())
    }

    /// Creates an inline integer, which does not allocate.
    pub fn integer(&self, value: i64) -> Value {
        Value::new(self.core.integer_handler.clone(), Payload::Integer(value))
    }

    /// Creates an inline real, which does not allocate.
    pub fn real(&self, value: f64) -> Value {
        Value::new(self.core.real_handler.clone(), Payload::Real(value))
    }

    /// Creates an integer of arbitrary size, stored inline if it fits.
    pub fn big_integer(&self, value: BigInt) -> Value {
        match value.to_i64() {
            Some(value) => self.integer(value),
            None => {
                let big = self.allocate(ObjectKind::BigInteger(value), vec![self.core.integer.clone()]);
                Value::from(big)
            }
        }
    }

    /// Get the value of expressions that produce nothing.
    pub fn void(&self) -> Value {
        Value::from(self.core.void.clone())
    }

    /// Creates a built-in function.
    pub fn new_function(&self, name: &str, body: NativeFn) -> Value {
        let function = self.allocate(
            ObjectKind::Function(Function::new(name, body)),
            vec![self.core.function.clone()],
        );
        Value::from(function)
    }

    /// Creates a user-defined function, capturing the scope it is defined in.
    pub fn create_closure(&self, context: &ObjectRef, parameters: Vec<Key>, entry: usize) -> Value {
        let closure = self.allocate(
            ObjectKind::Closure(Closure::new(context.clone(), parameters, entry)),
            vec![self.core.function.clone()],
        );
        Value::from(closure)
    }

    /// Builds the scope a program gets evaluated in.
    ///
    /// Its prototype is a scope of built-in functions (`print`, bound to the given printer),
    /// which itself derives from the root scope of global prototypes.
    pub fn create_main_scope(&self, printer: Arc<dyn Printer>) -> Result<ObjectRef> {
        let builtins = self.core.root_scope.clone_scope(self);
        builtins.declare(
            self.key("print"),
            self.new_function("print", function::print(printer)),
        )?;

        let main = builtins.clone_scope(self);
        log::debug!(
            "created main scope ({} live objects)",
            self.registry.live_count()
        );
        Ok(main)
    }

    /// Performs garbage collection, starting from the given roots.
    ///
    /// Every dynamic object that is not reachable from `roots` is torn down.
    /// The caller must ensure no other thread mutates this universe's objects meanwhile.
    /// Returns the number of objects swept.
    pub fn collect_garbage(&self, roots: &[&dyn Trace]) -> usize {
        self.registry.collect_garbage(|| {
            for root in roots {
                root.trace();
            }
        })
    }

    /// Performs garbage collection, only if the registry grew past its threshold.
    pub fn maybe_collect_garbage(&self, roots: &[&dyn Trace]) -> bool {
        self.registry.maybe_collect_garbage(|| {
            for root in roots {
                root.trace();
            }
        })
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_does_not_allocate() {
        let universe = Universe::new();
        assert_eq!(universe.registry().live_count(), 0);
        assert!(universe.core.object.prototypes().is_empty());
        assert!(universe.core.root_scope.is_static());
    }

    #[test]
    fn every_core_object_derives_from_the_root() {
        let universe = Universe::new();
        let core = &universe.core;
        let all = [
            &core.function,
            &core.string,
            &core.number,
            &core.integer,
            &core.real,
            &core.exception,
            &core.operation_not_supported,
            &core.illegal_argument,
            &core.reference_error,
            &core.void,
            &core.integer_handler,
            &core.real_handler,
            &core.root_scope,
        ];
        for object in all.iter() {
            assert!(object.is_instance_of(&core.object));
        }
        assert!(core.integer_handler.is_instance_of(&core.number));
        assert!(core.reference_error.is_instance_of(&core.exception));
    }

    #[test]
    fn root_scope_binds_the_prototypes() {
        let universe = Universe::new();
        let integer = universe
            .core
            .root_scope
            .lookup(&universe.key("Integer"))
            .unwrap();
        assert!(integer.object().ptr_eq(&universe.core.integer));
        assert_eq!(
            universe
                .core
                .root_scope
                .lookup(&universe.key("print"))
                .unwrap_err()
                .kind_name(),
            "ReferenceError"
        );
    }

    #[test]
    fn universes_share_core_objects_only() {
        let a = Universe::new();
        let b = Universe::new();
        assert!(a.core.object.ptr_eq(&b.core.object));
        assert!(a.core.root_scope.ptr_eq(&b.core.root_scope));
        assert!(!a.registry().ptr_eq(b.registry()));
    }

    #[test]
    fn core_objects_are_built_once() {
        let first = Universe::new();
        for _ in 0..1000 {
            let universe = Universe::new();
            assert!(std::ptr::eq(universe.core, first.core));
            assert!(universe.core.integer_handler.ptr_eq(&first.core.integer_handler));
            drop(universe);
        }
    }

    #[test]
    fn only_core_objects_are_static() {
        let universe = Universe::new();
        let core = universe.core;
        for object in [&core.object, &core.string, &core.void, &core.root_scope].iter() {
            assert!(object.is_static());
            assert_eq!(object.lifetime(), Lifetime::Static);
        }

        let object = universe.new_object();
        assert!(!object.is_static());
        assert_eq!(object.lifetime(), Lifetime::Dynamic);
        let text = universe.new_string("goat");
        assert_eq!(text.object().lifetime(), Lifetime::Dynamic);
    }

    #[test]
    fn big_integers_demote_when_they_fit() {
        let universe = Universe::new();
        let small = universe.big_integer(BigInt::from(42));
        assert_eq!(small.payload(), Payload::Integer(42));
        assert_eq!(universe.registry().live_count(), 0);

        let big = universe.big_integer(BigInt::from(i64::MAX) * 4);
        assert_eq!(big.payload(), Payload::None);
        assert!(big.is_instance_of(&universe.core.integer));
        assert_eq!(universe.registry().live_count(), 1);
    }
}
