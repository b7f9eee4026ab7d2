use std::fmt;
use std::mem;

use goat_gc::{Finalize, Trace};
use num_bigint::BigInt;
use parking_lot::RwLock;

use crate::attributes::{AttributeMap, Key};
use crate::error::{Error, Result};
use crate::function::{Closure, Function};
use crate::primitives;
use crate::topology::Topology;
use crate::universe::Universe;
use crate::value::Value;
use crate::ObjectRef;

/// The kind of an object, which decides the capabilities it supports.
pub enum ObjectKind {
    /// An ordinary object, only made of attributes.
    Plain,
    /// A lexical environment, whose attributes are variable bindings.
    Scope,
    /// An immutable string.
    String(Box<str>),
    /// The shared handler of inline integers.
    IntegerHandler,
    /// The shared handler of inline reals.
    RealHandler,
    /// An integer too big to be stored inline.
    BigInteger(BigInt),
    /// A built-in function.
    Function(Function),
    /// A user-defined function, along with its captured scope.
    Closure(Closure),
    /// A runtime exception, carrying its rendered message.
    Exception(Box<str>),
}

impl Trace for ObjectKind {
    fn trace(&self) {
        if let ObjectKind::Closure(closure) = self {
            closure.trace();
        }
    }
}

/// Whether an object takes part in reclamation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// Built once per process, never reclaimed, and read-only after bootstrap.
    Static,
    /// Created during execution, reference-counted and traced.
    Dynamic,
}

/// The direct prototypes of an object.
pub(crate) enum Prototypes {
    /// Only for the root object.
    None,
    Single(ObjectRef),
    /// Two or more prototypes, along with their cached linearization.
    Composite {
        direct: Vec<ObjectRef>,
        topology: Topology,
    },
}

impl Prototypes {
    fn from_vec(mut prototypes: Vec<ObjectRef>) -> Self {
        match prototypes.len() {
            0 => Prototypes::None,
            1 => match prototypes.pop() {
                Some(prototype) => Prototypes::Single(prototype),
                None => Prototypes::None,
            },
            _ => {
                let topology = Topology::compute(&prototypes);
                Prototypes::Composite {
                    direct: prototypes,
                    topology,
                }
            }
        }
    }
}

impl Trace for Prototypes {
    fn trace(&self) {
        match self {
            Prototypes::None => {}
            Prototypes::Single(prototype) => prototype.trace(),
            Prototypes::Composite { direct, topology } => {
                direct.trace();
                topology.trace();
            }
        }
    }
}

/// The mutable part of an object.
struct ObjectState {
    attributes: AttributeMap,
    prototypes: Prototypes,
    /// Set once a sweep has torn the object down.
    collected: bool,
}

impl Trace for ObjectState {
    fn trace(&self) {
        self.attributes.trace();
        self.prototypes.trace();
    }
}

/// The outcome of looking for a key in one object.
enum Lookup {
    Found(Value),
    Missing,
    Delegate(ObjectRef),
}

/// Represents any runtime object.
///
/// Identity is the object's address (see `Gc::ptr_eq`).
pub struct Object {
    kind: ObjectKind,
    lifetime: Lifetime,
    state: RwLock<ObjectState>,
}

impl Object {
    /// Construct an object from its kind and its direct prototypes.
    ///
    /// Only the root object has no prototypes. With two or more prototypes,
    /// the object is a composite and its topology gets computed here, once.
    /// Objects only get built by a `Universe`, so that the lifetime always matches
    /// how the object was allocated.
    pub(crate) fn new(kind: ObjectKind, lifetime: Lifetime, prototypes: Vec<ObjectRef>) -> Self {
        Self {
            kind,
            lifetime,
            state: RwLock::new(ObjectState {
                attributes: AttributeMap::new(),
                prototypes: Prototypes::from_vec(prototypes),
                collected: false,
            }),
        }
    }

    /// Get the object's kind.
    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    /// Get the object's lifetime.
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Is this object exempt from counting and collection ?
    pub fn is_static(&self) -> bool {
        self.lifetime == Lifetime::Static
    }

    /// Has this object been torn down by a sweep ?
    pub fn is_collected(&self) -> bool {
        self.state.read().collected
    }

    /// The name of the object's type, as used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            ObjectKind::Plain => "Object",
            ObjectKind::Scope => "Scope",
            ObjectKind::String(_) => "String",
            ObjectKind::IntegerHandler | ObjectKind::BigInteger(_) => "Integer",
            ObjectKind::RealHandler => "Real",
            ObjectKind::Function(_) | ObjectKind::Closure(_) => "Function",
            ObjectKind::Exception(_) => "Exception",
        }
    }

    /// Get the object's direct prototypes, in order.
    pub fn prototypes(&self) -> Vec<ObjectRef> {
        match &self.state.read().prototypes {
            Prototypes::None => Vec::new(),
            Prototypes::Single(prototype) => vec![prototype.clone()],
            Prototypes::Composite { direct, .. } => direct.clone(),
        }
    }

    /// Is this object made of more than one direct prototype ?
    pub fn is_composite(&self) -> bool {
        matches!(self.state.read().prototypes, Prototypes::Composite { .. })
    }

    /// Get every transitive prototype, in the order attribute lookup visits them.
    pub fn resolution_order(&self) -> Vec<ObjectRef> {
        let mut order = Vec::new();
        let mut next = match &self.state.read().prototypes {
            Prototypes::None => return order,
            Prototypes::Single(prototype) => prototype.clone(),
            Prototypes::Composite { topology, .. } => return topology.as_slice().to_vec(),
        };
        loop {
            order.push(next.clone());
            let following = match &next.state.read().prototypes {
                Prototypes::None => None,
                Prototypes::Single(prototype) => Some(prototype.clone()),
                Prototypes::Composite { topology, .. } => {
                    order.extend(topology.iter().cloned());
                    None
                }
            };
            match following {
                Some(prototype) => next = prototype,
                None => return order,
            }
        }
    }

    /// Does `prototype` appear anywhere in this object's prototype chain ?
    pub fn is_instance_of(&self, prototype: &ObjectRef) -> bool {
        let mut next = match &self.state.read().prototypes {
            Prototypes::None => return false,
            Prototypes::Single(direct) => direct.clone(),
            Prototypes::Composite { topology, .. } => return topology.contains(prototype),
        };
        loop {
            if next.ptr_eq(prototype) {
                return true;
            }
            let following = match &next.state.read().prototypes {
                Prototypes::None => return false,
                Prototypes::Single(direct) => direct.clone(),
                Prototypes::Composite { topology, .. } => return topology.contains(prototype),
            };
            next = following;
        }
    }

    /// Search for an attribute within this object only.
    pub fn get_own_attribute(&self, key: &Key) -> Option<Value> {
        self.state.read().attributes.get(key).cloned()
    }

    /// Does this object itself define the given attribute ?
    pub fn has_own_attribute(&self, key: &Key) -> bool {
        self.state.read().attributes.contains_key(key)
    }

    /// Get a snapshot of this object's own attributes, in insertion order.
    pub fn attributes(&self) -> Vec<(Key, Value)> {
        let state = self.state.read();
        state
            .attributes
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    fn lookup_step(&self, key: &Key) -> Lookup {
        let state = self.state.read();
        if let Some(value) = state.attributes.get(key) {
            return Lookup::Found(value.clone());
        }
        match &state.prototypes {
            Prototypes::None => Lookup::Missing,
            Prototypes::Single(prototype) => Lookup::Delegate(prototype.clone()),
            Prototypes::Composite { topology, .. } => topology
                .iter()
                .find_map(|ancestor| ancestor.get_own_attribute(key))
                .map_or(Lookup::Missing, Lookup::Found),
        }
    }

    /// Search for an attribute, through the prototype chain.
    ///
    /// Single prototypes are followed depth-first, while composites walk their topology.
    pub fn get_attribute(&self, key: &Key) -> Option<Value> {
        let mut next = match self.lookup_step(key) {
            Lookup::Found(value) => return Some(value),
            Lookup::Missing => return None,
            Lookup::Delegate(prototype) => prototype,
        };
        loop {
            next = match next.lookup_step(key) {
                Lookup::Found(value) => return Some(value),
                Lookup::Missing => return None,
                Lookup::Delegate(prototype) => prototype,
            };
        }
    }

    /// Assign a value to an attribute of this object.
    ///
    /// Fails for static objects and for objects torn down by a sweep.
    pub fn set_attribute(&self, key: Key, value: Value) -> Result<()> {
        if self.is_static() {
            return Err(Error::OperationNotSupported(format!(
                "cannot write attribute '{}' of a static {}",
                key,
                self.type_name(),
            )));
        }
        if self.is_collected() {
            return Err(Error::OperationNotSupported(format!(
                "cannot write attribute '{}' of a collected {}",
                key,
                self.type_name(),
            )));
        }
        self.set_attribute_unchecked(key, value);
        Ok(())
    }

    /// Assign a value to an attribute, without checking whether the object is writable.
    ///
    /// If the slot already holds the same object, only the inline payload gets overwritten.
    pub(crate) fn set_attribute_unchecked(&self, key: Key, value: Value) {
        let released = {
            let mut state = self.state.write();
            match state.attributes.get_mut(&key) {
                Some(slot) if slot.object().ptr_eq(value.object()) => {
                    slot.set_payload(value.payload());
                    None
                }
                Some(slot) => Some(mem::replace(slot, value)),
                None => {
                    state.attributes.insert(key, value);
                    None
                }
            }
        };
        // the previous value is released once the lock is gone.
        drop(released);
    }

    /// Performs `left + right`, where `left` is handled by this object.
    pub fn do_addition(&self, universe: &Universe, left: &Value, right: &Value) -> Result<Value> {
        match self.kind {
            ObjectKind::IntegerHandler | ObjectKind::BigInteger(_) => {
                primitives::integer::plus(universe, left, right)
            }
            ObjectKind::RealHandler => primitives::real::plus(universe, left, right),
            ObjectKind::String(_) => primitives::string::concatenate(universe, left, right),
            _ => Err(self.unsupported("addition")),
        }
    }

    /// Performs `left - right`, where `left` is handled by this object.
    pub fn do_subtraction(&self, universe: &Universe, left: &Value, right: &Value) -> Result<Value> {
        match self.kind {
            ObjectKind::IntegerHandler | ObjectKind::BigInteger(_) => {
                primitives::integer::minus(universe, left, right)
            }
            ObjectKind::RealHandler => primitives::real::minus(universe, left, right),
            _ => Err(self.unsupported("subtraction")),
        }
    }

    /// Performs `left * right`, where `left` is handled by this object.
    pub fn do_multiplication(
        &self,
        universe: &Universe,
        left: &Value,
        right: &Value,
    ) -> Result<Value> {
        match self.kind {
            ObjectKind::IntegerHandler | ObjectKind::BigInteger(_) => {
                primitives::integer::times(universe, left, right)
            }
            ObjectKind::RealHandler => primitives::real::times(universe, left, right),
            _ => Err(self.unsupported("multiplication")),
        }
    }

    pub(crate) fn unsupported(&self, operation: &str) -> Error {
        Error::OperationNotSupported(format!("{} on {}", operation, self.type_name()))
    }
}

impl Trace for Object {
    fn trace(&self) {
        self.kind.trace();
        self.state.trace();
    }
}

impl Finalize for Object {
    fn finalize(&self) {
        let (attributes, prototypes) = {
            let mut state = self.state.write();
            state.collected = true;
            (
                mem::take(&mut state.attributes),
                mem::replace(&mut state.prototypes, Prototypes::None),
            )
        };
        let context = match &self.kind {
            ObjectKind::Closure(closure) => closure.take_context(),
            _ => None,
        };
        drop(attributes);
        drop(prototypes);
        drop(context);
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ObjectKind::Plain => f.write_str("[object]"),
            ObjectKind::Scope => f.write_str("[scope]"),
            ObjectKind::String(text) => f.write_str(text),
            ObjectKind::IntegerHandler => f.write_str("[integer]"),
            ObjectKind::RealHandler => f.write_str("[real]"),
            ObjectKind::BigInteger(value) => write!(f, "{}", value),
            ObjectKind::Function(function) => write!(f, "function {}", function.name()),
            ObjectKind::Closure(_) => f.write_str("function"),
            ObjectKind::Exception(message) => f.write_str(message),
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("type", &self.type_name())
            .field("lifetime", &self.lifetime)
            // .field("attributes", ...) would recurse through cycles
            .finish()
    }
}
