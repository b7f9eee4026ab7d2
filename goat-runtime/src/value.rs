use std::cmp::Ordering;
use std::fmt;

use goat_gc::Trace;
use num_traits::ToPrimitive;

use crate::error::{Error, Result};
use crate::object::ObjectKind;
use crate::primitives::{self, Number};
use crate::universe::Universe;
use crate::ObjectRef;

/// The inline part of a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload {
    /// The value is entirely described by its object.
    None,
    /// An inline integer (handled by the **Integer** handler).
    Integer(i64),
    /// An inline real (handled by the **Real** handler).
    Real(f64),
}

/// Represents a value slot.
///
/// A slot owns exactly one strong reference to its object:
/// cloning it adds a reference, dropping it releases it.
/// Scalars are stored inline, next to a shared static handler object,
/// so that arithmetic on them never allocates.
#[derive(Clone)]
pub struct Value {
    object: ObjectRef,
    payload: Payload,
}

impl Value {
    /// Construct a value from its parts.
    pub fn new(object: ObjectRef, payload: Payload) -> Self {
        Self { object, payload }
    }

    /// Get the object of this value (the handler, for inline scalars).
    pub fn object(&self) -> &ObjectRef {
        &self.object
    }

    /// Get the object of this value, consuming it.
    pub fn into_object(self) -> ObjectRef {
        self.object
    }

    /// Get the inline payload of this value.
    pub fn payload(&self) -> Payload {
        self.payload
    }

    pub(crate) fn set_payload(&mut self, payload: Payload) {
        self.payload = payload;
    }

    /// Get the text of this value, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self.object.kind() {
            ObjectKind::String(text) => Some(text),
            _ => None,
        }
    }

    /// Get this value as a number, if it is one.
    pub(crate) fn number(&self) -> Option<Number<'_>> {
        match (self.payload, self.object.kind()) {
            (Payload::Integer(value), _) => Some(Number::Integer(value)),
            (Payload::Real(value), _) => Some(Number::Real(value)),
            (Payload::None, ObjectKind::BigInteger(value)) => Some(Number::BigInteger(value)),
            _ => None,
        }
    }

    /// Coerce this value to an integer (reals are truncated).
    pub fn as_integer(&self) -> Result<i64> {
        match self.number() {
            Some(Number::Integer(value)) => Ok(value),
            Some(Number::Real(value)) if value.is_finite() => Ok(value.trunc() as i64),
            Some(Number::Real(value)) => Err(Error::IllegalArgument(format!(
                "{} cannot be converted to an integer",
                value
            ))),
            Some(Number::BigInteger(value)) => value.to_i64().ok_or_else(|| {
                Error::IllegalArgument(format!("{} does not fit in an integer", value))
            }),
            None => Err(self.object.unsupported("integer coercion")),
        }
    }

    /// Coerce this value to a real.
    pub fn as_real(&self) -> Result<f64> {
        match self.number() {
            Some(number) => number.to_f64(),
            None => Err(self.object.unsupported("real coercion")),
        }
    }

    /// Compare this value to another one (numbers between themselves, strings between themselves).
    pub fn compare(&self, other: &Self) -> Result<Ordering> {
        if let (Some(a), Some(b)) = (self.as_str(), other.as_str()) {
            return Ok(a.cmp(b));
        }
        primitives::compare_numbers(self, other)
    }

    /// Performs `self + other`.
    pub fn add(&self, universe: &Universe, other: &Self) -> Result<Self> {
        self.object.do_addition(universe, self, other)
    }

    /// Performs `self - other`.
    pub fn subtract(&self, universe: &Universe, other: &Self) -> Result<Self> {
        self.object.do_subtraction(universe, self, other)
    }

    /// Performs `self * other`.
    pub fn multiply(&self, universe: &Universe, other: &Self) -> Result<Self> {
        self.object.do_multiplication(universe, self, other)
    }

    /// Does `prototype` appear in this value's prototype chain ?
    pub fn is_instance_of(&self, prototype: &ObjectRef) -> bool {
        self.object.is_instance_of(prototype)
    }
}

impl From<ObjectRef> for Value {
    fn from(object: ObjectRef) -> Self {
        Self::new(object, Payload::None)
    }
}

impl Trace for Value {
    #[inline]
    fn trace(&self) {
        self.object.trace();
    }
}

/// Strings compare by content, scalars by payload, every other object by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self.as_str(), other.as_str()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.payload == other.payload && self.object.ptr_eq(&other.object),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.payload {
            Payload::Integer(value) => write!(f, "{}", value),
            Payload::Real(value) => write!(f, "{:?}", value),
            Payload::None => write!(f, "{}", &*self.object),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.payload {
            Payload::Integer(val) => f.debug_tuple("Integer").field(&val).finish(),
            Payload::Real(val) => f.debug_tuple("Real").field(&val).finish(),
            Payload::None => f
                .debug_tuple(self.object.type_name())
                .field(&self.to_string())
                .finish(),
        }
    }
}
