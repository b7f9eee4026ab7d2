use std::fmt;
use std::hash::{Hash, Hasher};

use goat_gc::Trace;
use indexmap::IndexMap;

use crate::object::ObjectKind;
use crate::value::Value;
use crate::ObjectRef;

/// The attributes owned by an object, in insertion order.
///
/// The map owns a strong reference to every key and every value it stores.
pub type AttributeMap = IndexMap<Key, Value>;

/// An attribute key.
///
/// Keys are objects themselves: string keys compare by content,
/// every other key compares by identity.
#[derive(Clone)]
pub struct Key(ObjectRef);

impl Key {
    /// Uses the given object as a key.
    pub fn new(object: ObjectRef) -> Self {
        Self(object)
    }

    /// Get the object used as this key.
    pub fn object(&self) -> &ObjectRef {
        &self.0
    }

    /// Get the key's text, if it is a string key.
    pub fn as_str(&self) -> Option<&str> {
        match self.0.kind() {
            ObjectKind::String(text) => Some(text),
            _ => None,
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        match (self.as_str(), other.as_str()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.0.ptr_eq(&other.0),
            _ => false,
        }
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.as_str() {
            Some(text) => {
                state.write_u8(0);
                text.hash(state);
            }
            None => {
                state.write_u8(1);
                self.0.addr().hash(state);
            }
        }
    }
}

impl Trace for Key {
    #[inline]
    fn trace(&self) {
        self.0.trace();
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(text) => f.write_str(text),
            None => write!(f, "<{} {:#x}>", self.0.type_name(), self.0.addr()),
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Key").field(&self.to_string()).finish()
    }
}
